use super::*;
use crate::command::{CandidateUpdate, CursorPlacement, ViewUpdate};
use crate::job::{Completion, Job, Outcome};

fn focused_session() -> InputSession {
    let mut session = make_session();
    session.set_input_bound(true);
    session.on_focus(FieldInfo::text("com.example.notes").with_selection(0, 0));
    session.on_window_shown();
    session
}

/// Last engine job among `actions`.
fn last_job(actions: Vec<Action>) -> Job {
    actions
        .into_iter()
        .rev()
        .find_map(|a| match a {
            Action::Engine(job) => Some(job),
            Action::Emit(_) => None,
        })
        .expect("no engine job")
}

fn respond(job: Job, response: EngineResponse) -> Completion {
    Completion {
        job,
        outcome: Outcome::Response(response),
    }
}

// --- Ordering and idempotence ---

#[test]
fn test_duplicate_completion_renders_once() {
    let mut session = focused_session();
    let job = last_job(session.dispatch(&char_key('ね')));

    let first = session.complete(respond(job.clone(), preedit_response("ね", 1)));
    assert!(!first.is_empty());
    let second = session.complete(respond(job, preedit_response("ね", 1)));
    assert!(second.is_empty());
}

#[test]
fn test_older_completion_after_newer_dropped() {
    let mut session = focused_session();
    let older = last_job(session.dispatch(&char_key('ね')));
    let newer = last_job(session.dispatch(&char_key('こ')));

    assert!(!session
        .complete(respond(newer, preedit_response("ねこ", 2)))
        .is_empty());
    assert!(session
        .complete(respond(older, preedit_response("ね", 1)))
        .is_empty());
}

#[test]
fn test_stale_completion_after_blur_dropped() {
    let mut session = focused_session();
    let job = last_job(session.dispatch(&char_key('ね')));
    session.on_blur();
    assert!(session
        .complete(respond(job, preedit_response("ね", 1)))
        .is_empty());
}

#[test]
fn test_stale_completion_after_hide_dropped() {
    let mut session = focused_session();
    let job = last_job(session.dispatch(&char_key('ね')));
    let generation = session.generation();
    session.on_window_hidden();
    assert!(session.generation() > generation);
    assert!(session
        .complete(respond(job, preedit_response("ね", 1)))
        .is_empty());
}

#[test]
fn test_cancelled_completion_is_silent() {
    let mut session = focused_session();
    let job = last_job(session.dispatch(&char_key('ね')));
    assert!(session.complete(job.cancel()).is_empty());
}

// --- Result composition ---

#[test]
fn test_render_then_refresh_then_candidates() {
    let mut session = focused_session();
    let job = last_job(session.dispatch(&char_key('ね')));
    let mut resp = preedit_response("ね", 1);
    resp.mode = Some(CompositionMode::Hiragana);
    let results = session.complete(respond(job, resp));

    assert_eq!(results.len(), 3);
    assert!(matches!(results[0], CommandResult::RenderToSurface(_)));
    assert_eq!(
        results[1],
        CommandResult::RenderToView(ViewUpdate::Refresh {
            mode: Some(CompositionMode::Hiragana),
            composing: true,
        })
    );
    assert_eq!(
        results[2],
        CommandResult::RenderCandidates(CandidateUpdate::Clear)
    );
    assert!(session.is_composing());
}

#[test]
fn test_conversion_candidates_shown() {
    let mut session = focused_session();
    let job = last_job(session.dispatch(&special_key(SpecialKey::Space)));
    let resp = EngineResponse {
        candidates: Some(CandidateList {
            category: CandidateCategory::Conversion,
            candidates: vec![Candidate {
                id: 0,
                value: "猫".into(),
                annotation: None,
            }],
            focused_index: Some(0),
        }),
        ..preedit_response("猫", 1)
    };
    let results = session.complete(respond(job, resp));
    assert!(matches!(
        results.last(),
        Some(CommandResult::RenderCandidates(CandidateUpdate::Show {
            category: CandidateCategory::Conversion,
            focused_index: Some(0),
            ..
        }))
    ));
}

#[test]
fn test_mode_switch_without_preedit_keeps_composing() {
    let mut session = focused_session();
    let job = last_job(session.dispatch(&char_key('ね')));
    session.complete(respond(job, preedit_response("ね", 1)));
    assert!(session.is_composing());

    let job = last_job(session.on_window_shown());
    assert!(job.request.is_mode_switch());
    let results = session.complete(respond(job, EngineResponse::consumed()));
    assert!(session.is_composing());
    assert!(results.contains(&CommandResult::RenderToView(ViewUpdate::Refresh {
        mode: None,
        composing: true,
    })));
    assert!(surface_edits(&results).is_empty());
}

#[test]
fn test_unconsumed_commit_then_fallback() {
    let mut session = focused_session();
    let job = last_job(session.dispatch(&special_key(SpecialKey::Space)));
    let resp = EngineResponse {
        consumed: false,
        result: Some(CommitResult {
            value: "ね".into(),
            cursor_offset: None,
        }),
        ..EngineResponse::default()
    };
    let results = session.complete(respond(job, resp));
    let edits = surface_edits(&results);
    assert_eq!(
        edits,
        vec![
            &SurfaceEdit::CommitText {
                text: "ね".into(),
                cursor: CursorPlacement::Tail,
            },
            &SurfaceEdit::CommitText {
                text: " ".into(),
                cursor: CursorPlacement::Tail,
            },
        ]
    );
}

#[test]
fn test_failed_request_without_trigger_is_silent() {
    let mut session = focused_session();
    let job = last_job(session.on_submit_preedit());
    let results = session.complete(Completion {
        job,
        outcome: Outcome::Failed(EngineError::Unavailable),
    });
    assert!(results.is_empty());
}

#[test]
fn test_acknowledged_request_is_silent() {
    let mut session = focused_session();
    let job = last_job(session.on_candidate_selected(3, None));
    let results = session.complete(Completion {
        job,
        outcome: Outcome::Acknowledged,
    });
    assert!(results.is_empty());
}
