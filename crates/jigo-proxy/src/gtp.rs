//! GTP wire types shared by the engine side and the client side.
//!
//! A response is a status line (`=` or `?`, optional id, first content line),
//! any number of continuation lines, then one blank line:
//!
//! ```text
//! =
//! info move D4 visits 12 winrate 0.51 ...
//! play D4
//!
//! ```

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::ProxyError;

/// A parsed GTP command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub id: Option<u32>,
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: None,
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a client line. Returns `None` for blank and comment-only lines.
    pub fn parse(line: &str) -> Option<Self> {
        let without_comment = line.split('#').next().unwrap_or_default();
        let cleaned: String = without_comment
            .chars()
            .filter_map(|c| match c {
                '\t' => Some(' '),
                c if c.is_control() => None,
                c => Some(c),
            })
            .collect();

        let mut tokens = cleaned.split_whitespace();
        let first = tokens.next()?;
        let (id, name) = match first.parse::<u32>() {
            Ok(id) => (Some(id), tokens.next()?),
            Err(_) => (None, first),
        };

        Some(Self {
            id,
            name: name.to_string(),
            args: tokens.map(String::from).collect(),
        })
    }

    /// Engine-side line; ids are never forwarded
    pub fn to_line(&self) -> String {
        std::iter::once(self.name.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A complete (or in-progress) engine response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub error: bool,
    pub content: String,
}

impl Response {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            error: false,
            content: content.into(),
        }
    }

    pub fn err(content: impl Into<String>) -> Self {
        Self {
            error: true,
            content: content.into(),
        }
    }
}

/// One streamed response line.
///
/// `response` holds everything received so far, including `line`. Handlers
/// may rewrite both before the event reaches later subscribers.
#[derive(Debug)]
pub struct ResponseEvent<'a> {
    pub line: String,
    pub response: &'a mut Response,
    pub end: bool,
}

/// Fire-and-forget abort signal for the engine
#[derive(Debug, Clone)]
pub struct AbortHandle {
    stdin: mpsc::UnboundedSender<String>,
}

impl AbortHandle {
    pub fn new(stdin: mpsc::UnboundedSender<String>) -> Self {
        Self { stdin }
    }

    /// Write an empty line to the engine; KataGo stops streaming analysis on new input
    pub fn abort(&self) {
        debug!("Forwarding abort to engine");
        let _ = self.stdin.send(String::new());
    }
}

/// Request/response access to a GTP engine.
#[allow(async_fn_in_trait)]
pub trait EngineSession {
    /// Send a command and stream every response line to `on_event`, followed
    /// by one `end` event. Error responses are `Ok` with `error` set.
    async fn send_command(
        &mut self,
        command: &Command,
        on_event: &mut dyn FnMut(&mut ResponseEvent<'_>),
    ) -> Result<Response, ProxyError>;

    fn abort_handle(&self) -> AbortHandle;
}

/// Split a status line into (is_error, first content line)
pub fn parse_status_line(line: &str) -> Option<(bool, &str)> {
    let error = match line.chars().next()? {
        '=' => false,
        '?' => true,
        _ => return None,
    };
    let rest = line[1..].trim_start_matches(|c: char| c.is_ascii_digit());
    Some((error, rest.trim()))
}

/// Assembles a response from raw engine lines, emitting events as it goes
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    response: Response,
    started: bool,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw line. Returns the response once its blank terminator arrives.
    pub fn push_line(
        &mut self,
        line: &str,
        on_event: &mut dyn FnMut(&mut ResponseEvent<'_>),
    ) -> Option<Response> {
        let line = line.trim_end_matches('\r');

        if !self.started {
            let Some((error, content)) = parse_status_line(line) else {
                if !line.trim().is_empty() {
                    debug!(line, "Skipping engine output outside a response");
                }
                return None;
            };
            self.started = true;
            self.response = Response {
                error,
                content: content.to_string(),
            };
            self.emit(content.to_string(), false, on_event);
            return None;
        }

        if line.trim().is_empty() {
            self.emit(String::new(), true, on_event);
            self.started = false;
            return Some(std::mem::take(&mut self.response));
        }

        self.response.content.push('\n');
        self.response.content.push_str(line);
        self.emit(line.to_string(), false, on_event);
        None
    }

    fn emit(
        &mut self,
        line: String,
        end: bool,
        on_event: &mut dyn FnMut(&mut ResponseEvent<'_>),
    ) {
        let mut event = ResponseEvent {
            line,
            response: &mut self.response,
            end,
        };
        on_event(&mut event);
    }
}

/// Client-facing response writer.
///
/// The first write opens the response with `=` (or `?` via [`OutputSink::err`]),
/// [`OutputSink::end`] closes it with a blank line. Writes after the end are
/// ignored.
#[derive(Debug)]
pub struct OutputSink {
    id: Option<u32>,
    tx: mpsc::UnboundedSender<String>,
    started: bool,
    finished: bool,
}

impl OutputSink {
    pub fn new(id: Option<u32>, tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id,
            tx,
            started: false,
            finished: false,
        }
    }

    pub fn write(&mut self, text: &str) {
        if self.finished {
            return;
        }
        if self.started {
            self.emit(text.to_string());
        } else {
            self.begin('=', text);
        }
    }

    /// Single-shot success
    pub fn send(&mut self, text: &str) {
        self.write(text);
        self.end();
    }

    /// Single-shot failure. Once success output has started the status can
    /// no longer change, so the response is only closed.
    pub fn err(&mut self, text: &str) {
        if self.finished {
            return;
        }
        if self.started {
            debug!(text, "Error after response started, closing response");
        } else {
            self.begin('?', text);
        }
        self.end();
    }

    pub fn end(&mut self) {
        if self.finished {
            return;
        }
        if !self.started {
            self.begin('=', "");
        }
        self.emit("\n\n".to_string());
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn begin(&mut self, marker: char, text: &str) {
        let mut head = String::from(marker);
        if let Some(id) = self.id {
            head.push_str(&id.to_string());
        }
        if !text.is_empty() && !text.starts_with('\n') {
            head.push(' ');
        }
        head.push_str(text);
        self.started = true;
        self.emit(head);
    }

    fn emit(&self, text: String) {
        // A closed writer means the client is gone
        let _ = self.tx.send(text);
    }
}
