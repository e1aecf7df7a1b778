//! Proxy configuration from command-line arguments and environment variables

use std::env;

use jigo_core::selector::DEFAULT_MIN_WINRATE;
use jigo_core::{SelectionMode, SelectionPolicy};
use tracing::info;

use crate::error::ProxyError;

/// First engine argument of an engine running in GTP mode
const GTP_MODE_ARG: &str = "gtp";

#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// Path to the wrapped engine binary
    pub engine_path: String,

    /// Arguments passed to the engine (e.g. `gtp -model ... -config ...`)
    pub engine_args: Vec<String>,

    /// Candidate selection policy
    pub policy: SelectionPolicy,

    /// Analysis interval in centiseconds used when intercepting `genmove`
    pub genmove_interval: u32,

    /// Name reported for the `name` command
    pub engine_name: String,
}

impl ProxyConfig {
    /// Load configuration from CLI arguments (without the program name) and
    /// environment variables.
    pub fn load(args: impl IntoIterator<Item = String>) -> Result<Self, ProxyError> {
        Self::from_sources(args, |key| env::var(key).ok())
    }

    /// Load configuration with settings looked up through `var` instead of
    /// the process environment.
    pub fn from_sources(
        args: impl IntoIterator<Item = String>,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ProxyError> {
        let mut args = args.into_iter();
        let engine_path = args
            .next()
            .ok_or(ProxyError::Config("usage: katajigo <engine> [engine args...]"))?;
        let engine_args: Vec<String> = args.collect();

        let mode = match var("JIGO_POLICY") {
            Some(value) => value.parse::<SelectionMode>()?,
            None => SelectionMode::WinrateGated,
        };

        let min_winrate = match var("JIGO_MIN_WINRATE") {
            Some(value) => value
                .trim()
                .parse::<f64>()
                .map_err(|_| ProxyError::Config("JIGO_MIN_WINRATE must be a number"))?,
            None => DEFAULT_MIN_WINRATE,
        };
        let policy = SelectionPolicy::new(mode, min_winrate)?;

        let genmove_interval = var("JIGO_GENMOVE_INTERVAL")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(50);

        let engine_name = var("JIGO_ENGINE_NAME").unwrap_or_else(|| "KataJigo".to_string());

        info!(
            engine = %engine_path,
            ?mode,
            min_winrate,
            genmove_interval,
            "Proxy config loaded"
        );

        Ok(Self {
            engine_path,
            engine_args,
            policy,
            genmove_interval,
            engine_name,
        })
    }

    /// Whether the engine was started in GTP mode; otherwise it is run raw
    pub fn speaks_gtp(&self) -> bool {
        self.engine_args.first().map(String::as_str) == Some(GTP_MODE_ARG)
    }
}
