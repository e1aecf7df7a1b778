//! Client-facing GTP frontend.
//!
//! Commands from the client are handled one at a time; a blank client line is
//! the abort signal and reaches the engine immediately, even mid-command.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::engine::{EngineEvent, EngineExit};
use crate::error::ProxyError;
use crate::gtp::{AbortHandle, Command, EngineSession, OutputSink};
use crate::router::CommandRouter;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Client sent `quit`
    Quit,
    /// Client closed its input
    ClientClosed,
    /// Engine process exited
    EngineStopped(EngineExit),
}

pub struct GtpServer<S> {
    session: S,
    router: CommandRouter,
}

impl<S: EngineSession> GtpServer<S> {
    pub fn new(session: S, router: CommandRouter) -> Self {
        Self { session, router }
    }

    /// Serve until `quit`, client EOF or engine exit.
    ///
    /// Engine stderr is copied to our stderr as it arrives.
    pub async fn run<R, W>(
        mut self,
        input: R,
        output: W,
        events: mpsc::UnboundedReceiver<EngineEvent>,
    ) -> Result<SessionEnd, ProxyError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
        let (commands_tx, mut commands) = mpsc::unbounded_channel::<Command>();
        let (stopped_tx, mut stopped) = watch::channel(None::<EngineExit>);

        let writer = tokio::spawn(write_output(output, out_rx));
        let reader = tokio::spawn(read_input(input, commands_tx, self.session.abort_handle()));
        tokio::spawn(forward_events(events, stopped_tx));

        let end = loop {
            let command = tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => command,
                    None => break SessionEnd::ClientClosed,
                },
                Some(exit) = engine_stopped(&mut stopped) => break SessionEnd::EngineStopped(exit),
            };

            let mut out = OutputSink::new(command.id, out_tx.clone());
            match self.router.handle(&mut self.session, &command, &mut out).await {
                Ok(()) => {}
                Err(ProxyError::EngineStopped) => {
                    let exit = (*stopped.borrow()).unwrap_or(EngineExit { code: None });
                    break SessionEnd::EngineStopped(exit);
                }
                Err(e) => error!(command = %command.name, error = %e, "Command failed"),
            }

            if command.name == "quit" {
                break SessionEnd::Quit;
            }
        };

        reader.abort();
        drop(out_tx);
        if let Err(e) = writer.await {
            warn!(error = %e, "Output writer task failed");
        }

        info!(?end, "GTP session ended");
        Ok(end)
    }
}

/// Resolves once the engine has exited; `None` if that can no longer be observed
async fn engine_stopped(stopped: &mut watch::Receiver<Option<EngineExit>>) -> Option<EngineExit> {
    let state = stopped.wait_for(Option::is_some).await.ok()?;
    *state
}

async fn read_input<R: AsyncRead + Unpin>(
    input: R,
    commands: mpsc::UnboundedSender<Command>,
    abort: AbortHandle,
) {
    let mut lines = BufReader::new(input).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            abort.abort();
            continue;
        }
        let Some(command) = Command::parse(&line) else {
            continue;
        };
        if commands.send(command).is_err() {
            break;
        }
    }
}

async fn write_output<W: AsyncWrite + Unpin>(mut output: W, mut chunks: mpsc::UnboundedReceiver<String>) {
    while let Some(chunk) = chunks.recv().await {
        let written = async {
            output.write_all(chunk.as_bytes()).await?;
            output.flush().await
        };
        if let Err(e) = written.await {
            warn!(error = %e, "Failed to write to client");
            break;
        }
    }
    let _ = output.shutdown().await;
}

async fn forward_events(
    mut events: mpsc::UnboundedReceiver<EngineEvent>,
    stopped: watch::Sender<Option<EngineExit>>,
) {
    let mut stderr = tokio::io::stderr();
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::Started => info!("Engine started"),
            EngineEvent::Stderr(content) => {
                let _ = stderr.write_all(format!("{content}\n").as_bytes()).await;
            }
            EngineEvent::Stopped(exit) => {
                info!(code = ?exit.code, "Engine stopped");
                let _ = stopped.send(Some(exit));
            }
        }
    }
}
