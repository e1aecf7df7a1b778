//! Proxy error types

use jigo_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Configuration error: {0}")]
    Config(&'static str),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Engine stopped")]
    EngineStopped,

    #[error("Corrective `{step}` failed, engine board may disagree with the announced move: {message}")]
    CorrectiveSequence { step: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}
