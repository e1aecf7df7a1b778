//! GTP engine subprocess controller (async I/O)

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command as ProcessCommand};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::ProxyError;
use crate::gtp::{AbortHandle, Command, EngineSession, Response, ResponseBuilder, ResponseEvent};

/// Exit status of the engine process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineExit {
    pub code: Option<i32>,
}

/// Lifecycle notifications from the engine process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Started,
    Stderr(String),
    Stopped(EngineExit),
}

/// Engine process speaking GTP over stdio
pub struct GtpController {
    stdin: mpsc::UnboundedSender<String>,
    lines: mpsc::UnboundedReceiver<String>,
}

impl GtpController {
    /// Spawn the engine and start its stdio tasks.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn spawn(
        path: &str,
        args: &[String],
    ) -> Result<(Self, mpsc::UnboundedReceiver<EngineEvent>), ProxyError> {
        let mut process = ProcessCommand::new(path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProxyError::Engine(format!("Failed to spawn {path}: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| ProxyError::Engine("Engine stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| ProxyError::Engine("Engine stdout unavailable".into()))?;
        let stderr = process
            .stderr
            .take()
            .ok_or_else(|| ProxyError::Engine("Engine stderr unavailable".into()))?;

        let (stdin_tx, mut stdin_rx) = mpsc::unbounded_channel::<String>();
        let (lines_tx, lines_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        // Writer: one command line per message
        tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(line) = stdin_rx.recv().await {
                debug!(cmd = %line, "GTP <");
                let written = async {
                    stdin.write_all(format!("{line}\n").as_bytes()).await?;
                    stdin.flush().await
                };
                if let Err(e) = written.await {
                    warn!(error = %e, "Failed to write to engine");
                    break;
                }
            }
        });

        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                debug!(line = %line, "GTP >");
                if lines_tx.send(line).is_err() {
                    break;
                }
            }
        });

        let stderr_events = events_tx.clone();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                if stderr_events.send(EngineEvent::Stderr(line)).is_err() {
                    break;
                }
            }
        });

        let _ = events_tx.send(EngineEvent::Started);
        tokio::spawn(wait_for_exit(process, events_tx));

        info!(engine = path, ?args, "Engine spawned");

        Ok((
            Self {
                stdin: stdin_tx,
                lines: lines_rx,
            },
            events_rx,
        ))
    }
}

async fn wait_for_exit(mut process: Child, events: mpsc::UnboundedSender<EngineEvent>) {
    let code = match process.wait().await {
        Ok(status) => status.code(),
        Err(e) => {
            warn!(error = %e, "Failed to wait for engine");
            None
        }
    };
    let _ = events.send(EngineEvent::Stopped(EngineExit { code }));
}

impl EngineSession for GtpController {
    async fn send_command(
        &mut self,
        command: &Command,
        on_event: &mut dyn FnMut(&mut ResponseEvent<'_>),
    ) -> Result<Response, ProxyError> {
        self.stdin
            .send(command.to_line())
            .map_err(|_| ProxyError::EngineStopped)?;

        let mut builder = ResponseBuilder::new();
        loop {
            let line = self.lines.recv().await.ok_or(ProxyError::EngineStopped)?;
            if let Some(response) = builder.push_line(&line, on_event) {
                return Ok(response);
            }
        }
    }

    fn abort_handle(&self) -> AbortHandle {
        AbortHandle::new(self.stdin.clone())
    }
}
