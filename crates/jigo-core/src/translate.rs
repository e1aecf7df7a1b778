//! Re-encode KataGo analysis in the Leela Zero `lz-genmove_analyze` dialect.
//!
//! Leela Zero reports probabilities as integers scaled by 10000:
//!
//! ```text
//! info move D4 visits 120 winrate 5512 prior 1830 lcb 5390 order 0 pv D4 Q16
//! ```

use crate::analysis::{CandidateRecord, INFO_KEYWORD, PASS};

/// Scale applied to winrate, prior and lcb
pub const QUANTIZATION_SCALE: f64 = 10000.0;

/// Scale a [0, 1] probability to the integer domain, rounding half away
/// from zero. Missing (NaN) or infinite values become 0.
pub fn quantize(value: f64) -> i64 {
    if value.is_finite() {
        (value * QUANTIZATION_SCALE).round() as i64
    } else {
        0
    }
}

/// Encode a snapshot as one Leela Zero analysis line.
///
/// Candidates keep their order; fields outside the Leela Zero set are dropped.
pub fn to_leela_zero(snapshot: &[CandidateRecord]) -> String {
    snapshot
        .iter()
        .map(leela_zero_block)
        .collect::<Vec<_>>()
        .join(" ")
}

fn leela_zero_block(candidate: &CandidateRecord) -> String {
    let mut tokens: Vec<String> = vec![
        INFO_KEYWORD.to_string(),
        "move".to_string(),
        candidate.vertex.clone(),
        "visits".to_string(),
        candidate.field("visits").unwrap_or("0").to_string(),
        "winrate".to_string(),
        quantize(candidate.winrate).to_string(),
        "prior".to_string(),
        quantize(candidate.numeric_field("prior")).to_string(),
        "lcb".to_string(),
        quantize(candidate.numeric_field("lcb")).to_string(),
        "order".to_string(),
        candidate.field("order").unwrap_or("0").to_string(),
        "pv".to_string(),
    ];

    // An empty variation still needs a trailing move token to stay parseable
    if candidate.pv.is_empty() {
        tokens.push(PASS.to_string());
    } else {
        tokens.extend(candidate.pv.iter().cloned());
    }

    tokens.join(" ")
}
