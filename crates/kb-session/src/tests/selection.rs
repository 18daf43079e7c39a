use kb_core::settings::CompatSettings;

use super::*;
use crate::selection::{HostSelection, SelectionTracker, SelectionVerdict, TrackerStatus};

fn tracker_at(caret: usize) -> SelectionTracker {
    let mut t = SelectionTracker::new(MAX_RECORDS);
    t.on_focus(Some((caret, caret)), false);
    t
}

// --- Tracker verdicts ---

#[test]
fn test_echo_of_own_render_does_nothing() {
    let mut t = tracker_at(0);
    t.on_render(&preedit_response("ねこ", 2));
    let report = HostSelection::caret(0, 2).with_composition(0, 2);
    assert_eq!(
        t.on_host_selection_changed(report, false),
        SelectionVerdict::DoNothing
    );
    assert_eq!(t.status(), TrackerStatus::Normal);
}

#[test]
fn test_echo_discards_older_predictions() {
    let mut t = tracker_at(0);
    t.on_render(&preedit_response("ね", 1));
    t.on_render(&preedit_response("ねこ", 2));
    let before = t.record_count();
    let report = HostSelection::caret(0, 1).with_composition(0, 1);
    assert_eq!(
        t.on_host_selection_changed(report, false),
        SelectionVerdict::DoNothing
    );
    assert!(t.record_count() < before);
    // The later prediction is still matchable.
    let report = HostSelection::caret(1, 2).with_composition(0, 2);
    assert_eq!(
        t.on_host_selection_changed(report, false),
        SelectionVerdict::DoNothing
    );
}

#[test]
fn test_web_field_resets_on_unexpected_move() {
    let mut t = SelectionTracker::new(MAX_RECORDS);
    t.on_focus(Some((0, 0)), true);
    t.on_render(&preedit_response("ねこ", 2));
    // Inside the composition, but web fields never get cursor moves.
    let report = HostSelection::caret(2, 1).with_composition(0, 2);
    assert_eq!(
        t.on_host_selection_changed(report, false),
        SelectionVerdict::ResetContext
    );
    assert_eq!(t.status(), TrackerStatus::NeedsReset);
}

#[test]
fn test_tap_inside_composition_moves_cursor() {
    let mut t = tracker_at(3);
    t.on_render(&preedit_response("ねこだ", 3));
    let report = HostSelection::caret(6, 4).with_composition(3, 6);
    assert_eq!(
        t.on_host_selection_changed(report, false),
        SelectionVerdict::MoveCursor(4)
    );
    assert_eq!(t.status(), TrackerStatus::Normal);
}

#[test]
fn test_tap_back_to_echoed_caret_moves_cursor() {
    let mut t = tracker_at(0);
    t.on_render(&preedit_response("ねこ", 1));
    let at_one = HostSelection::caret(2, 1).with_composition(0, 2);
    assert_eq!(
        t.on_host_selection_changed(at_one, false),
        SelectionVerdict::DoNothing
    );

    let at_two = HostSelection::caret(1, 2).with_composition(0, 2);
    assert_eq!(
        t.on_host_selection_changed(at_two, false),
        SelectionVerdict::MoveCursor(2)
    );
    // Engine follows; the caret is already there, so no report comes back.
    t.on_render(&preedit_response("ねこ", 2));

    // The echo seen earlier is history, not a pending prediction.
    assert_eq!(
        t.on_host_selection_changed(at_one, false),
        SelectionVerdict::MoveCursor(1)
    );
    assert_eq!(t.last_selection(), Some((1, 1)));
}

#[test]
fn test_tail_move_ignored_when_configured() {
    let mut t = tracker_at(0);
    t.on_render(&preedit_response("ねこだ", 1));
    let report = HostSelection::caret(1, 3).with_composition(0, 3);
    assert_eq!(
        t.on_host_selection_changed(report, true),
        SelectionVerdict::DoNothing
    );
    assert_eq!(
        t.on_host_selection_changed(report, false),
        SelectionVerdict::MoveCursor(3)
    );
}

#[test]
fn test_range_selection_inside_composition_resets() {
    let mut t = tracker_at(0);
    t.on_render(&preedit_response("ねこだ", 3));
    let report = HostSelection {
        old_start: 3,
        old_end: 3,
        new_start: 1,
        new_end: 2,
        composition: Some((0, 3)),
    };
    assert_eq!(
        t.on_host_selection_changed(report, false),
        SelectionVerdict::ResetContext
    );
}

#[test]
fn test_foreign_change_resets_and_relearns() {
    let mut t = tracker_at(0);
    t.on_render(&commit_response("猫"));
    assert_eq!(
        t.on_host_selection_changed(HostSelection::caret(1, 7), false),
        SelectionVerdict::ResetContext
    );
    assert_eq!(t.last_selection(), Some((7, 7)));
    assert_eq!(t.preedit_start(), Some(7));
}

#[test]
fn test_unknown_start_renders_without_prediction() {
    let mut t = SelectionTracker::new(MAX_RECORDS);
    t.on_focus(None, false);
    t.on_render(&preedit_response("か", 1));
    assert_eq!(t.status(), TrackerStatus::AwaitingOwnEdit);
    assert_eq!(t.record_count(), 0);
    // First report is foreign and seeds the queue.
    let verdict = t.on_host_selection_changed(HostSelection::caret(0, 5), false);
    assert_eq!(verdict, SelectionVerdict::ResetContext);
    assert_eq!(t.preedit_start(), Some(5));
}

// --- Through the session ---

#[test]
fn test_session_move_cursor_is_relative_to_composition() {
    let mut session = make_session();
    session.set_input_bound(true);
    session.on_focus(FieldInfo::text("com.example.notes").with_selection(3, 3));
    let job = session.dispatch(&char_key('ね')).pop().unwrap();
    let Action::Engine(job) = job else {
        panic!("expected engine job");
    };
    let completion = job.run(Some(&mut ToyEngine::default() as &mut dyn ConversionEngine));
    session.complete(completion);

    let report = HostSelection::caret(4, 3).with_composition(3, 4);
    let actions = session.on_selection_changed(report);
    assert_eq!(requests(&actions), vec![&EngineRequest::MoveCursor(0)]);
}

#[test]
fn test_session_reset_sequence() {
    let mut session = make_session();
    session.set_input_bound(true);
    session.on_focus(FieldInfo::text("com.example.notes").with_selection(0, 0));
    session.on_window_shown();

    let actions = session.on_selection_changed(HostSelection::caret(0, 9));
    assert_eq!(request_names(&actions), vec!["reset_context"]);
    let emits = emitted(&actions);
    assert_eq!(
        emits,
        vec![
            &CommandResult::surface(vec![SurfaceEdit::FinishComposingText]),
            &CommandResult::RenderToView(crate::ViewUpdate::Reset),
            &CommandResult::RenderCandidates(crate::CandidateUpdate::Clear),
        ]
    );
    assert_eq!(session.tracker().status(), TrackerStatus::Normal);
    assert!(!session.is_composing());
}

#[test]
fn test_session_reset_without_view_keeps_composition() {
    let mut session = make_session();
    session.set_input_bound(true);
    session.on_focus(FieldInfo::text("com.example.notes").with_selection(0, 0));

    let actions = session.on_selection_changed(HostSelection::caret(0, 9));
    assert!(emitted(&actions)
        .iter()
        .all(|r| !matches!(r, CommandResult::RenderToSurface(_))));
}

#[test]
fn test_pretend_web_field_from_compat() {
    let mut session = make_session_with_compat(CompatSettings {
        web_field_packages: vec!["com.example.browser".into()],
        ..CompatSettings::default()
    });
    session.on_focus(FieldInfo::text("com.example.browser").with_selection(0, 0));
    assert!(session.tracker().is_web_field());
    assert!(session.compat().pretend_web_field);

    session.on_focus(FieldInfo::text("com.example.notes").with_selection(0, 0));
    assert!(!session.tracker().is_web_field());
}

#[test]
fn test_ignore_tail_moves_from_compat() {
    let mut d = SyncDriver::new(
        make_session_with_compat(CompatSettings {
            ignore_tail_move_packages: vec!["com.example.legacy".into()],
            ..CompatSettings::default()
        }),
        Some(ToyEngine::default()),
    );
    d.focus(FieldInfo::text("com.example.legacy").with_selection(0, 0));
    d.window_shown();
    type_str(&mut d, "ねこ");
    d.key(&special_key(SpecialKey::Left));
    assert_eq!(engine(&d).cursor, 1);

    d.engine.as_mut().unwrap().requests.clear();
    d.tap(2);
    assert!(engine(&d).requests.is_empty());
    assert_eq!(engine(&d).cursor, 1);
}
