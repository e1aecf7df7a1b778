//! Core error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Unknown selection mode: {0} (expected `gated` or `legacy`)")]
    UnknownSelectionMode(String),

    #[error("Minimum winrate must be within [0, 1], got {0}")]
    InvalidWinrate(f64),
}
