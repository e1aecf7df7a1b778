/// Tests for the interception controller against a scripted engine.
///
/// The flow being tested:
/// 1. `kata-genmove_analyze` streams `info` snapshots and a `play` decision
/// 2. The jigo selector may pick another candidate; the decision is rewritten
/// 3. If the move changed, the engine's board is fixed with `undo` + `play`

mod common;

use common::{analyze_response, FakeEngine, INFO_LINE};
use jigo_core::{SelectionMode, SelectionPolicy};
use jigo_proxy::error::ProxyError;
use jigo_proxy::intercept::InterceptionController;

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_substitutes_narrow_win_and_corrects_board() {
    let mut engine = FakeEngine::new()
        .script("kata-genmove_analyze", &analyze_response(&[INFO_LINE], "D4"));
    let controller = InterceptionController::new(SelectionPolicy::default());

    let mut lines = Vec::new();
    let response = controller
        .genmove_analyze(&mut engine, &args(&["b", "50"]), &mut |event| {
            if !event.end {
                lines.push(event.line.clone());
            }
        })
        .await
        .unwrap();

    assert!(!response.error);
    assert!(response.content.ends_with("play Q16"));
    assert!(!response.content.contains("play D4"));
    assert_eq!(lines, vec!["".to_string(), INFO_LINE.to_string(), "play Q16".to_string()]);

    // Correction strictly after the analysis command
    assert_eq!(
        engine.sent_lines(),
        vec!["kata-genmove_analyze b 50", "undo", "play b Q16"]
    );
}

#[tokio::test]
async fn test_all_losing_passes_through() {
    let losing = "info move D4 visits 10 winrate 0.3 scoreLead -2.5 pv D4 \
                  info move Q16 visits 8 winrate 0.2 scoreLead -7 pv Q16";
    let mut engine = FakeEngine::new()
        .script("kata-genmove_analyze", &analyze_response(&[losing], "D4"));
    let controller = InterceptionController::new(SelectionPolicy::default());

    let response = controller
        .genmove_analyze(&mut engine, &args(&["w", "50"]), &mut |_| {})
        .await
        .unwrap();

    assert_eq!(response.content, format!("\n{losing}\nplay D4"));
    assert_eq!(engine.sent_lines(), vec!["kata-genmove_analyze w 50"]);
}

#[tokio::test]
async fn test_engine_error_is_returned_verbatim() {
    let mut engine = FakeEngine::new().script("kata-genmove_analyze", "? illegal color\n\n");
    let controller = InterceptionController::new(SelectionPolicy::default());

    let response = controller
        .genmove_analyze(&mut engine, &args(&["x"]), &mut |_| {})
        .await
        .unwrap();

    assert!(response.error);
    assert_eq!(response.content, "illegal color");
    assert_eq!(engine.sent.len(), 1);
}

#[tokio::test]
async fn test_decision_without_analysis_passes_through() {
    let mut engine = FakeEngine::new()
        .script("kata-genmove_analyze", &analyze_response(&[], "C3"));
    let controller = InterceptionController::new(SelectionPolicy::default());

    let response = controller
        .genmove_analyze(&mut engine, &args(&["b"]), &mut |_| {})
        .await
        .unwrap();

    assert_eq!(response.content, "\nplay C3");
    assert_eq!(engine.sent.len(), 1);
}

#[tokio::test]
async fn test_engine_already_playing_jigo_move() {
    let mut engine = FakeEngine::new()
        .script("kata-genmove_analyze", &analyze_response(&[INFO_LINE], "Q16"));
    let controller = InterceptionController::new(SelectionPolicy::default());

    let response = controller
        .genmove_analyze(&mut engine, &args(&["b", "50"]), &mut |_| {})
        .await
        .unwrap();

    assert!(response.content.ends_with("play Q16"));
    assert_eq!(engine.sent.len(), 1, "no correction when the move is unchanged");
}

#[tokio::test]
async fn test_legacy_mode_ignores_winrate_floor() {
    let line = "info move D4 visits 100 winrate 0.9 scoreLead 5.0 pv D4 \
                info move K10 visits 20 winrate 0.4 scoreLead 0.5 pv K10";
    let controller = InterceptionController::new(
        SelectionPolicy::new(SelectionMode::Unconditional, 0.5).unwrap(),
    );

    let mut engine = FakeEngine::new()
        .script("kata-genmove_analyze", &analyze_response(&[line], "D4"));
    let response = controller
        .genmove_analyze(&mut engine, &args(&["w", "50"]), &mut |_| {})
        .await
        .unwrap();
    assert!(response.content.ends_with("play K10"));
    assert_eq!(engine.sent_lines()[2], "play w K10");

    let gated = InterceptionController::new(SelectionPolicy::default());
    let mut engine = FakeEngine::new()
        .script("kata-genmove_analyze", &analyze_response(&[line], "D4"));
    let response = gated
        .genmove_analyze(&mut engine, &args(&["w", "50"]), &mut |_| {})
        .await
        .unwrap();
    assert!(response.content.ends_with("play D4"));
}

#[tokio::test]
async fn test_failed_undo_is_surfaced() {
    let mut engine = FakeEngine::new()
        .script("kata-genmove_analyze", &analyze_response(&[INFO_LINE], "D4"))
        .script("undo", "? cannot undo\n\n");
    let controller = InterceptionController::new(SelectionPolicy::default());

    let result = controller
        .genmove_analyze(&mut engine, &args(&["b", "50"]), &mut |_| {})
        .await;

    match result {
        Err(ProxyError::CorrectiveSequence { step, message }) => {
            assert_eq!(step, "undo");
            assert_eq!(message, "cannot undo");
        }
        other => panic!("expected corrective failure, got {other:?}"),
    }
    // No replay after a failed undo
    assert_eq!(engine.sent_lines(), vec!["kata-genmove_analyze b 50", "undo"]);
}

#[tokio::test]
async fn test_failed_replay_is_surfaced() {
    let mut engine = FakeEngine::new()
        .script("kata-genmove_analyze", &analyze_response(&[INFO_LINE], "D4"))
        .script("play", "? illegal move\n\n");
    let controller = InterceptionController::new(SelectionPolicy::default());

    let result = controller
        .genmove_analyze(&mut engine, &args(&["b", "50"]), &mut |_| {})
        .await;

    assert!(matches!(
        result,
        Err(ProxyError::CorrectiveSequence { ref step, .. }) if step == "play"
    ));
}

#[tokio::test]
async fn test_unterminated_response_is_engine_stopped() {
    let mut engine = FakeEngine::new().script("kata-genmove_analyze", "=\ninfo move D4 pv D4");
    let controller = InterceptionController::new(SelectionPolicy::default());

    let result = controller
        .genmove_analyze(&mut engine, &args(&["b"]), &mut |_| {})
        .await;
    assert!(matches!(result, Err(ProxyError::EngineStopped)));
}
