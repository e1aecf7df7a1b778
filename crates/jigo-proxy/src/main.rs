//! KataJigo GTP proxy
//!
//! Wraps a KataGo engine and swaps its moves for the candidate that keeps
//! the game won by the smallest margin.
//!
//! Usage: `katajigo <engine> gtp [engine args...]`

use tracing::info;

use jigo_proxy::config::ProxyConfig;
use jigo_proxy::engine::GtpController;
use jigo_proxy::raw;
use jigo_proxy::router::CommandRouter;
use jigo_proxy::server::{GtpServer, SessionEnd};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol, logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let config = ProxyConfig::load(std::env::args().skip(1))?;

    if !config.speaks_gtp() {
        let exit = raw::run_raw(&config).await?;
        std::process::exit(exit.code.unwrap_or(1));
    }

    let (controller, events) = GtpController::spawn(&config.engine_path, &config.engine_args)?;
    let server = GtpServer::new(controller, CommandRouter::new(&config));

    let end = server
        .run(tokio::io::stdin(), tokio::io::stdout(), events)
        .await?;
    info!(?end, "Shutting down");

    // Exit explicitly: a blocking stdin read would otherwise hold the runtime open
    let code = match end {
        SessionEnd::EngineStopped(exit) => exit.code.unwrap_or(1),
        SessionEnd::Quit | SessionEnd::ClientClosed => 0,
    };
    std::process::exit(code);
}
