//! Raw mode for engines not started in GTP mode (e.g. `katago benchmark`).
//!
//! Nothing is intercepted; the engine inherits our stdio and we only wait
//! for it to exit.

use std::process::Stdio;

use tokio::process::Command as ProcessCommand;
use tracing::info;

use crate::config::ProxyConfig;
use crate::engine::EngineExit;
use crate::error::ProxyError;

pub async fn run_raw(config: &ProxyConfig) -> Result<EngineExit, ProxyError> {
    info!(engine = %config.engine_path, args = ?config.engine_args, "Running engine in raw mode");

    let status = ProcessCommand::new(&config.engine_path)
        .args(&config.engine_args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|e| ProxyError::Engine(format!("Failed to run {}: {e}", config.engine_path)))?;

    Ok(EngineExit {
        code: status.code(),
    })
}
