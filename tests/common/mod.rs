#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use jigo_proxy::config::ProxyConfig;
use jigo_proxy::error::ProxyError;
use jigo_proxy::gtp::{AbortHandle, Command, EngineSession, OutputSink, Response, ResponseBuilder, ResponseEvent};
use tokio::sync::mpsc;

/// Two candidates: D4 wins big, Q16 wins narrowly
pub const INFO_LINE: &str = "info move D4 visits 100 winrate 0.9 scoreLead 5.0 prior 0.5 lcb 0.88 order 0 pv D4 Q16 \
    info move Q16 visits 50 winrate 0.6 scoreLead 1.0 prior 0.2 lcb 0.55 order 1 pv Q16 D4";

/// Scripted engine: replies from per-command queues, records what it was sent.
pub struct FakeEngine {
    scripts: HashMap<String, VecDeque<String>>,
    pub sent: Vec<Command>,
    abort_tx: mpsc::UnboundedSender<String>,
    pub aborts: mpsc::UnboundedReceiver<String>,
}

impl FakeEngine {
    pub fn new() -> Self {
        let (abort_tx, aborts) = mpsc::unbounded_channel();
        Self {
            scripts: HashMap::new(),
            sent: Vec::new(),
            abort_tx,
            aborts,
        }
    }

    /// Queue a raw response (status line, body, blank terminator) for `name`
    pub fn script(mut self, name: &str, raw: &str) -> Self {
        self.scripts
            .entry(name.to_string())
            .or_default()
            .push_back(raw.to_string());
        self
    }

    /// Detach the abort receiver so it outlives a moved engine
    pub fn take_aborts(&mut self) -> mpsc::UnboundedReceiver<String> {
        std::mem::replace(&mut self.aborts, mpsc::unbounded_channel().1)
    }

    pub fn sent_lines(&self) -> Vec<String> {
        self.sent.iter().map(Command::to_line).collect()
    }
}

impl EngineSession for FakeEngine {
    async fn send_command(
        &mut self,
        command: &Command,
        on_event: &mut dyn FnMut(&mut ResponseEvent<'_>),
    ) -> Result<Response, ProxyError> {
        self.sent.push(command.clone());
        let raw = self
            .scripts
            .get_mut(&command.name)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| "=\n\n".to_string());

        let mut builder = ResponseBuilder::new();
        for line in raw.split('\n') {
            if let Some(response) = builder.push_line(line, on_event) {
                return Ok(response);
            }
        }
        Err(ProxyError::EngineStopped)
    }

    fn abort_handle(&self) -> AbortHandle {
        AbortHandle::new(self.abort_tx.clone())
    }
}

/// Raw `kata-genmove_analyze` response announcing `engine_move`
pub fn analyze_response(info_lines: &[&str], engine_move: &str) -> String {
    let mut raw = String::from("=\n");
    for line in info_lines {
        raw.push_str(line);
        raw.push('\n');
    }
    raw.push_str(&format!("play {engine_move}\n\n"));
    raw
}

pub fn config() -> ProxyConfig {
    ProxyConfig::from_sources(["katago".to_string(), "gtp".to_string()], |_| None)
        .expect("default config")
}

/// Output sink plus the receiver collecting what the client would see
pub fn sink(id: Option<u32>) -> (OutputSink, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (OutputSink::new(id, tx), rx)
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    let mut out = String::new();
    while let Ok(chunk) = rx.try_recv() {
        out.push_str(&chunk);
    }
    out
}
