//! Interception of `kata-genmove_analyze`.
//!
//! The engine's streaming `info` lines are parsed into snapshots; when it
//! announces `play <move>`, the jigo selector may pick a different candidate.
//! The announcement and the pending response are rewritten in flight, and
//! once the response is complete the engine's board is corrected with
//! `undo` + `play <color> <move>`.

use jigo_core::{parse_analysis, select_move, CandidateRecord, SelectionPolicy};
use tracing::{debug, error, info};

use crate::error::ProxyError;
use crate::gtp::{Command, EngineSession, Response, ResponseEvent};

/// Engine command carrying analysis and a final decision
pub const ANALYZE_COMMAND: &str = "kata-genmove_analyze";

/// Prefix of analysis lines
pub const INFO_PREFIX: &str = "info ";

/// Prefix of the decision line
pub const DECISION_PREFIX: &str = "play ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptionState {
    Issued,
    Streaming,
    DecisionSeen,
    Substituted,
    Unsubstituted,
    Completed,
}

/// A move swap that the engine's board has to be told about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub engine_move: String,
    pub selected_move: String,
}

/// State of one intercepted command
#[derive(Debug)]
pub struct InterceptionSession {
    snapshot: Option<Vec<CandidateRecord>>,
    engine_move: Option<String>,
    selected: Option<CandidateRecord>,
    state: InterceptionState,
}

impl Default for InterceptionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl InterceptionSession {
    pub fn new() -> Self {
        Self {
            snapshot: None,
            engine_move: None,
            selected: None,
            state: InterceptionState::Issued,
        }
    }

    pub fn state(&self) -> InterceptionState {
        self.state
    }

    pub fn snapshot(&self) -> Option<&[CandidateRecord]> {
        self.snapshot.as_deref()
    }

    /// Process one response event, rewriting it when a substitution applies
    pub fn observe(&mut self, event: &mut ResponseEvent<'_>, policy: &SelectionPolicy) {
        if event.end {
            self.state = match self.substitution() {
                Some(_) => InterceptionState::Substituted,
                None => InterceptionState::Unsubstituted,
            };
        } else if event.line.starts_with(INFO_PREFIX) {
            // Each line is a full snapshot, never merged
            self.snapshot = Some(parse_analysis(&event.line));
            self.state = InterceptionState::Streaming;
        } else if let Some(rest) = event.line.strip_prefix(DECISION_PREFIX) {
            let engine_move = rest.trim().to_string();
            self.state = InterceptionState::DecisionSeen;

            match self.snapshot.as_deref().map(|s| select_move(s, policy)) {
                Some(Some(candidate)) => {
                    info!(
                        score_lead = candidate.score_lead,
                        winrate = candidate.winrate,
                        engine_move = %engine_move,
                        selected = %candidate.vertex,
                        "Jigo candidate selected"
                    );
                    event.line = format!("{DECISION_PREFIX}{}", candidate.vertex);
                    self.selected = Some(candidate.clone());
                }
                Some(None) => debug!(engine_move = %engine_move, "No qualifying candidate"),
                None => debug!(engine_move = %engine_move, "Decision without analysis"),
            }
            self.engine_move = Some(engine_move);
        }

        if let (Some(engine_move), Some(selected)) = (&self.engine_move, &self.selected) {
            patch_decision(&mut event.response.content, engine_move, &selected.vertex);
        }
    }

    /// Mark the command cycle finished, corrections included
    pub fn complete(&mut self) {
        debug!(state = ?self.state, "Interception finished");
        self.state = InterceptionState::Completed;
    }

    /// The swap to apply, if the selector disagrees with the engine
    pub fn substitution(&self) -> Option<Substitution> {
        let engine_move = self.engine_move.as_ref()?;
        let selected = self.selected.as_ref()?;
        if selected.vertex.eq_ignore_ascii_case(engine_move) {
            return None;
        }
        Some(Substitution {
            engine_move: engine_move.clone(),
            selected_move: selected.vertex.clone(),
        })
    }
}

/// Replace the `play <engine_move>` announcement line in a response body
pub fn patch_decision(content: &mut String, engine_move: &str, selected_move: &str) {
    let from = format!("{DECISION_PREFIX}{engine_move}");
    if !content.lines().any(|l| l.trim_end() == from) {
        return;
    }
    *content = content
        .split('\n')
        .map(|l| {
            if l.trim_end() == from {
                format!("{DECISION_PREFIX}{selected_move}")
            } else {
                l.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
}

/// Runs intercepted generate-move commands against an engine session
#[derive(Debug, Clone)]
pub struct InterceptionController {
    policy: SelectionPolicy,
}

impl InterceptionController {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self { policy }
    }

    /// Issue `kata-genmove_analyze <args>`, substituting the jigo choice.
    ///
    /// `subscriber` sees every event after any rewrite. Engine error
    /// responses are returned untouched. A failed correction is returned as
    /// [`ProxyError::CorrectiveSequence`] after the response has streamed.
    pub async fn genmove_analyze<S: EngineSession>(
        &self,
        session: &mut S,
        args: &[String],
        subscriber: &mut dyn FnMut(&ResponseEvent<'_>),
    ) -> Result<Response, ProxyError> {
        let command = Command::new(ANALYZE_COMMAND, args.iter().cloned());
        let mut interception = InterceptionSession::new();

        let response = session
            .send_command(&command, &mut |event| {
                interception.observe(event, &self.policy);
                subscriber(event);
            })
            .await?;

        if response.error {
            debug!(content = %response.content, "Engine rejected analysis command");
            return Ok(response);
        }

        if let Some(substitution) = interception.substitution() {
            let color = args.first().map(String::as_str).unwrap_or_default();
            if let Err(e) = correct_board(session, color, &substitution).await {
                error!(
                    error = %e,
                    engine_move = %substitution.engine_move,
                    selected = %substitution.selected_move,
                    "Engine board out of sync"
                );
                return Err(e);
            }
        }

        interception.complete();
        Ok(response)
    }
}

/// Replace the engine's move on its own board with the announced one
async fn correct_board<S: EngineSession>(
    session: &mut S,
    color: &str,
    substitution: &Substitution,
) -> Result<(), ProxyError> {
    if color.is_empty() {
        return Err(ProxyError::CorrectiveSequence {
            step: "play".to_string(),
            message: "missing color argument".to_string(),
        });
    }

    run_corrective_step(session, Command::new("undo", Vec::<String>::new())).await?;
    run_corrective_step(
        session,
        Command::new("play", [color, substitution.selected_move.as_str()]),
    )
    .await
}

async fn run_corrective_step<S: EngineSession>(
    session: &mut S,
    command: Command,
) -> Result<(), ProxyError> {
    let step = command.name.clone();
    let response = session
        .send_command(&command, &mut |_| {})
        .await
        .map_err(|e| ProxyError::CorrectiveSequence {
            step: step.clone(),
            message: e.to_string(),
        })?;

    if response.error {
        return Err(ProxyError::CorrectiveSequence {
            step,
            message: response.content,
        });
    }
    Ok(())
}
