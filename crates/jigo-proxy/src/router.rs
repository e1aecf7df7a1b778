//! Per-command dispatch: answer locally, intercept, translate, or pass through.

use std::sync::LazyLock;

use jigo_core::{parse_analysis, to_leela_zero};
use regex::Regex;
use tracing::debug;

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::gtp::{Command, EngineSession, OutputSink, Response, ResponseEvent};
use crate::intercept::{InterceptionController, DECISION_PREFIX, INFO_PREFIX};

/// GTP protocol version reported to clients
pub const PROTOCOL_VERSION: &str = "2";

/// Engine-native analysis commands hidden from `list_commands`
static GENMOVE_ANALYZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w+-)?genmove_analyze$").expect("genmove_analyze pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Name,
    Version,
    ProtocolVersion,
    ListCommands,
    /// `kata-genmove_analyze`, streamed verbatim apart from the decision
    GenmoveAnalyze,
    /// `lz-genmove_analyze`, streamed through the Leela Zero translator
    LeelaZeroGenmoveAnalyze,
    /// `genmove`, only the final move is reported
    Genmove,
    Passthrough,
}

pub fn route(name: &str) -> Route {
    match name {
        "name" => Route::Name,
        "version" => Route::Version,
        "protocol_version" => Route::ProtocolVersion,
        "list_commands" => Route::ListCommands,
        "kata-genmove_analyze" => Route::GenmoveAnalyze,
        "lz-genmove_analyze" => Route::LeelaZeroGenmoveAnalyze,
        "genmove" => Route::Genmove,
        _ => Route::Passthrough,
    }
}

/// Whether `list_commands` should advertise `name`
pub fn is_listed(name: &str) -> bool {
    !GENMOVE_ANALYZE_RE.is_match(name.trim())
}

#[derive(Debug, Clone)]
pub struct CommandRouter {
    controller: InterceptionController,
    engine_name: String,
    version: String,
    genmove_interval: u32,
}

impl CommandRouter {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            controller: InterceptionController::new(config.policy),
            engine_name: config.engine_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            genmove_interval: config.genmove_interval,
        }
    }

    /// Handle one client command, always closing `out`.
    ///
    /// Returns an error only for engine-level failures (engine gone,
    /// corrective sequence failed) after the client has been answered.
    pub async fn handle<S: EngineSession>(
        &self,
        session: &mut S,
        command: &Command,
        out: &mut OutputSink,
    ) -> Result<(), ProxyError> {
        let route = route(&command.name);
        debug!(command = %command.name, ?route, "Routing command");

        match route {
            Route::Name => out.send(&self.engine_name),
            Route::Version => out.send(&self.version),
            Route::ProtocolVersion => out.send(PROTOCOL_VERSION),
            Route::ListCommands => return self.list_commands(session, command, out).await,
            Route::GenmoveAnalyze => {
                let mut first = true;
                let result = self
                    .controller
                    .genmove_analyze(session, &command.args, &mut |event| {
                        forward_line(out, &mut first, event, &event.line);
                    })
                    .await;
                return complete(out, result);
            }
            Route::LeelaZeroGenmoveAnalyze => {
                let mut first = true;
                let result = self
                    .controller
                    .genmove_analyze(session, &command.args, &mut |event| {
                        if event.line.starts_with(INFO_PREFIX) {
                            let translated = to_leela_zero(&parse_analysis(&event.line));
                            // A blank body line would end the client's response early
                            if !translated.is_empty() {
                                forward_line(out, &mut first, event, &translated);
                            }
                        } else {
                            forward_line(out, &mut first, event, &event.line);
                        }
                    })
                    .await;
                return complete(out, result);
            }
            Route::Genmove => return self.genmove(session, command, out).await,
            Route::Passthrough => {
                let mut first = true;
                let result = session
                    .send_command(command, &mut |event| {
                        forward_line(out, &mut first, event, &event.line);
                    })
                    .await;
                return complete(out, result);
            }
        }

        Ok(())
    }

    async fn genmove<S: EngineSession>(
        &self,
        session: &mut S,
        command: &Command,
        out: &mut OutputSink,
    ) -> Result<(), ProxyError> {
        let mut args: Vec<String> = command.args.iter().take(1).cloned().collect();
        args.push(self.genmove_interval.to_string());

        let result = self
            .controller
            .genmove_analyze(session, &args, &mut |event| {
                if let Some(vertex) = event.line.strip_prefix(DECISION_PREFIX) {
                    out.send(vertex.trim());
                }
            })
            .await;
        complete(out, result)
    }

    async fn list_commands<S: EngineSession>(
        &self,
        session: &mut S,
        command: &Command,
        out: &mut OutputSink,
    ) -> Result<(), ProxyError> {
        let result = session.send_command(command, &mut |_| {}).await;
        let response = match result {
            Ok(response) if !response.error => response,
            other => return complete(out, other),
        };

        let commands: Vec<&str> = response
            .content
            .split('\n')
            .map(str::trim)
            .filter(|name| !name.is_empty() && is_listed(name))
            .collect();
        out.send(&commands.join("\n"));
        Ok(())
    }
}

/// Stream one line to the client, newline-separated after the first
fn forward_line(out: &mut OutputSink, first: &mut bool, event: &ResponseEvent<'_>, text: &str) {
    if event.response.error || event.end {
        return;
    }
    if !*first {
        out.write("\n");
    }
    out.write(text);
    *first = false;
}

/// Close the client response according to the engine outcome
fn complete(out: &mut OutputSink, result: Result<Response, ProxyError>) -> Result<(), ProxyError> {
    match result {
        Ok(response) if response.error => {
            out.err(&response.content);
            Ok(())
        }
        Ok(_) => {
            out.end();
            Ok(())
        }
        Err(e @ ProxyError::CorrectiveSequence { .. }) => {
            out.end();
            Err(e)
        }
        Err(e) => {
            out.err(&e.to_string());
            Err(e)
        }
    }
}
