//! Margin-minimizing ("jigo") move selection. Pure functions only.
//!
//! Among the candidates that keep the game won, pick the one that concedes
//! the most margin: smallest non-negative `scoreLead`, then highest
//! `winrate`, then first reported.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analysis::CandidateRecord;
use crate::error::CoreError;

/// Default winrate floor for the gated mode
pub const DEFAULT_MIN_WINRATE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// `winrate >= min_winrate` and `scoreLead >= 0`
    WinrateGated,
    /// Legacy: `scoreLead >= 0` only
    Unconditional,
}

impl FromStr for SelectionMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gated" | "winrate-gated" => Ok(Self::WinrateGated),
            "legacy" | "unconditional" => Ok(Self::Unconditional),
            other => Err(CoreError::UnknownSelectionMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionPolicy {
    pub mode: SelectionMode,
    pub min_winrate: f64,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            mode: SelectionMode::WinrateGated,
            min_winrate: DEFAULT_MIN_WINRATE,
        }
    }
}

impl SelectionPolicy {
    pub fn new(mode: SelectionMode, min_winrate: f64) -> Result<Self, CoreError> {
        if !(0.0..=1.0).contains(&min_winrate) {
            return Err(CoreError::InvalidWinrate(min_winrate));
        }
        Ok(Self { mode, min_winrate })
    }

    /// NaN in either metric never qualifies
    pub fn qualifies(&self, candidate: &CandidateRecord) -> bool {
        if candidate.winrate.is_nan() || candidate.score_lead.is_nan() || candidate.score_lead < 0.0 {
            return false;
        }
        match self.mode {
            SelectionMode::WinrateGated => candidate.winrate >= self.min_winrate,
            SelectionMode::Unconditional => true,
        }
    }
}

/// Pick the candidate to play instead of the engine's choice, if any.
///
/// Ties use exact float equality and resolve to snapshot order.
pub fn select_move<'a>(
    snapshot: &'a [CandidateRecord],
    policy: &SelectionPolicy,
) -> Option<&'a CandidateRecord> {
    let qualifying: Vec<&CandidateRecord> =
        snapshot.iter().filter(|c| policy.qualifies(c)).collect();

    let min_lead = qualifying
        .iter()
        .map(|c| c.score_lead)
        .fold(f64::INFINITY, f64::min);

    let max_winrate = qualifying
        .iter()
        .filter(|c| c.score_lead == min_lead)
        .map(|c| c.winrate)
        .fold(f64::NEG_INFINITY, f64::max);

    qualifying
        .into_iter()
        .find(|c| c.score_lead == min_lead && c.winrate == max_winrate)
}
