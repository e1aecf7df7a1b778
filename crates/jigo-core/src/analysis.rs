//! KataGo analysis line parser.
//!
//! A single `info` line reported by `kata-genmove_analyze` carries every
//! candidate of the current search snapshot, each one introduced by the
//! `info` keyword:
//!
//! ```text
//! info move D4 visits 120 winrate 0.55 scoreLead 2.1 order 0 pv D4 Q16 info move Q16 ...
//! ```
//!
//! Each block is a flat list of key/value pairs followed by the principal
//! variation, which is always the trailing run of vertex tokens.

use serde::{Deserialize, Serialize};

/// Keyword introducing each candidate block
pub const INFO_KEYWORD: &str = "info";

/// Pass move token
pub const PASS: &str = "pass";

/// One analysed move option within a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Vertex such as `D4`, or `pass`
    #[serde(rename = "move")]
    pub vertex: String,
    /// Every other reported key/value pair, in report order
    pub fields: Vec<(String, String)>,
    /// Win probability in [0, 1]; NaN when missing or non-numeric
    pub winrate: f64,
    /// Estimated score margin; NaN when missing or non-numeric
    #[serde(rename = "scoreLead")]
    pub score_lead: f64,
    /// Predicted continuation, cut at the first pass
    pub pv: Vec<String>,
}

impl CandidateRecord {
    /// Raw value of a reported field
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Field value parsed as a float, NaN when missing or malformed
    pub fn numeric_field(&self, key: &str) -> f64 {
        self.field(key)
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(f64::NAN)
    }
}

/// A board coordinate: one ASCII letter followed by one or more digits.
pub fn is_vertex(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    let rest = chars.as_str();
    !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())
}

/// A vertex or the pass sentinel
pub fn is_move_token(token: &str) -> bool {
    token == PASS || is_vertex(token)
}

/// Parse one analysis line into its candidates.
///
/// Text before the first `info` keyword is discarded. Blocks without a
/// trailing variation, or whose `move` is not a vertex/pass, are dropped.
pub fn parse_analysis(line: &str) -> Vec<CandidateRecord> {
    split_blocks(line)
        .into_iter()
        .filter_map(|tokens| parse_block(&tokens))
        .collect()
}

/// Tokenize and group tokens by the `info` delimiter
fn split_blocks(line: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for token in line.split_whitespace() {
        if token == INFO_KEYWORD {
            blocks.extend(current.take());
            current = Some(Vec::new());
        } else if let Some(block) = current.as_mut() {
            block.push(token);
        }
    }
    blocks.extend(current);

    blocks
}

/// Start index of the greedy trailing run of move tokens
fn trailing_run_start(tokens: &[&str]) -> usize {
    tokens
        .iter()
        .rposition(|t| !is_move_token(t))
        .map_or(0, |i| i + 1)
}

fn parse_block(tokens: &[&str]) -> Option<CandidateRecord> {
    let run_start = trailing_run_start(tokens);
    if run_start == tokens.len() {
        return None;
    }

    let (head, run) = tokens.split_at(run_start);

    // Anything at or after a pass is dropped from the variation
    let pv: Vec<String> = run
        .iter()
        .take_while(|t| **t != PASS)
        .map(|t| t.to_string())
        .collect();

    // The last head token names the variation (`pv`), it is not a field
    let pairs = head.split_last().map_or(&[][..], |(_, rest)| rest);

    let mut vertex = None;
    let mut fields: Vec<(String, String)> = Vec::new();
    for pair in pairs.chunks(2) {
        let [key, value] = pair else {
            continue;
        };
        if *key == "move" {
            vertex = Some(value.to_string());
        } else if let Some(slot) = fields.iter_mut().find(|(k, _)| k.as_str() == *key) {
            slot.1 = value.to_string();
        } else {
            fields.push((key.to_string(), value.to_string()));
        }
    }

    let vertex = vertex.filter(|v| is_move_token(v))?;

    let mut record = CandidateRecord {
        vertex,
        fields,
        winrate: f64::NAN,
        score_lead: f64::NAN,
        pv,
    };
    record.winrate = record.numeric_field("winrate");
    record.score_lead = record.numeric_field("scoreLead");

    Some(record)
}
