//! Scripted sessions: a TOML description of a field, a sequence of host
//! events and the engine's answers, replayed on the in-memory surface.
//!
//! ```toml
//! text = "今日は"
//!
//! [field]
//! package_name = "com.example.notes"
//! initial_selection = [3, 3]
//!
//! [[steps]]
//! type = "key"
//! envelope = { engine_key = { key_code = 12397 } }
//! responses = [{ consumed = true, preedit = { segments = [{ value = "ね" }], cursor = 1 } }]
//! ```
//!
//! Every request that returns a response takes the next queued one. When the
//! queue is empty, keys come back unconsumed and everything else consumed.

use std::collections::VecDeque;
use std::path::Path;

use kb_core::compat::CompatPolicy;
use kb_core::engine::{ConversionEngine, EngineError, EngineResponse, RequestUpdate};
use kb_core::field::{FieldInfo, InputFieldType};
use kb_core::key::{EngineKey, KeyEnvelope, TouchSample};
use kb_core::settings::{settings, CompatSettings};
use kb_core::spec::CompositionMode;
use kb_session::driver::SyncDriver;
use kb_session::memory::MemorySurface;
use kb_session::InputSession;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("cannot read {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("script parse error: {0}")]
    Parse(String),
    #[error("script has no steps")]
    Empty,
}

// ---------------------------------------------------------------------------
// Script model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    /// Field content before the session starts.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub field: Option<FieldInfo>,
    /// Overrides the global `[compat]` table for this run.
    #[serde(default)]
    pub compat: Option<CompatSettings>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    Key {
        envelope: KeyEnvelope,
        #[serde(default)]
        responses: Vec<EngineResponse>,
    },
    /// Caret moves inside a composition ask the engine to move its cursor.
    Tap {
        position: usize,
        #[serde(default)]
        responses: Vec<EngineResponse>,
    },
    Rewrite {
        text: String,
    },
    Focus {
        field: FieldInfo,
    },
    Blur,
    WindowShown,
    WindowHidden,
    Submit {
        #[serde(default)]
        responses: Vec<EngineResponse>,
    },
    SelectCandidate {
        id: i32,
        #[serde(default)]
        row: Option<u32>,
        #[serde(default)]
        responses: Vec<EngineResponse>,
    },
    Undo {
        #[serde(default)]
        touch_trace: Vec<TouchSample>,
        #[serde(default)]
        responses: Vec<EngineResponse>,
    },
    ExpandSuggestion {
        #[serde(default)]
        responses: Vec<EngineResponse>,
    },
}

pub fn parse_script(toml_str: &str) -> Result<Script, ScriptError> {
    let script: Script = toml::from_str(toml_str).map_err(|e| ScriptError::Parse(e.to_string()))?;
    if script.steps.is_empty() {
        return Err(ScriptError::Empty);
    }
    Ok(script)
}

pub fn load_script(path: &Path) -> Result<Script, ScriptError> {
    let content = std::fs::read_to_string(path).map_err(|e| ScriptError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_script(&content)
}

// ---------------------------------------------------------------------------
// Scripted engine
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ScriptedEngine {
    queue: VecDeque<EngineResponse>,
    requests: Vec<&'static str>,
}

impl ScriptedEngine {
    pub fn push(&mut self, responses: impl IntoIterator<Item = EngineResponse>) {
        self.queue.extend(responses);
    }

    pub fn requests(&self) -> &[&'static str] {
        &self.requests
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn next(&mut self, request: &'static str, fallback: EngineResponse) -> EngineResponse {
        self.requests.push(request);
        self.queue.pop_front().unwrap_or_else(|| {
            debug!(request, "no scripted response; using default");
            fallback
        })
    }

    fn ack(&mut self, request: &'static str) -> Result<(), EngineError> {
        self.requests.push(request);
        Ok(())
    }
}

impl ConversionEngine for ScriptedEngine {
    fn send_key(
        &mut self,
        _key: &EngineKey,
        _touch_trace: &[TouchSample],
    ) -> Result<EngineResponse, EngineError> {
        Ok(self.next("send_key", EngineResponse::default()))
    }

    fn update_request(&mut self, _request: &RequestUpdate) -> Result<(), EngineError> {
        self.ack("update_request")
    }

    fn switch_input_mode(&mut self, _mode: CompositionMode) -> Result<EngineResponse, EngineError> {
        Ok(self.next("switch_input_mode", EngineResponse::consumed()))
    }

    fn reset_context(&mut self) -> Result<(), EngineError> {
        self.ack("reset_context")
    }

    fn submit(&mut self) -> Result<EngineResponse, EngineError> {
        Ok(self.next("submit", EngineResponse::consumed()))
    }

    fn move_cursor(&mut self, _position: u32) -> Result<EngineResponse, EngineError> {
        Ok(self.next("move_cursor", EngineResponse::consumed()))
    }

    fn submit_candidate(
        &mut self,
        _id: i32,
        _row: Option<u32>,
    ) -> Result<EngineResponse, EngineError> {
        Ok(self.next("submit_candidate", EngineResponse::consumed()))
    }

    fn undo_or_rewind(
        &mut self,
        _touch_trace: &[TouchSample],
    ) -> Result<EngineResponse, EngineError> {
        Ok(self.next("undo_or_rewind", EngineResponse::consumed()))
    }

    fn expand_suggestion(&mut self) -> Result<EngineResponse, EngineError> {
        Ok(self.next("expand_suggestion", EngineResponse::consumed()))
    }

    fn switch_input_field_type(&mut self, _field_type: InputFieldType) -> Result<(), EngineError> {
        self.ack("switch_input_field_type")
    }

    fn sync_data(&mut self) -> Result<(), EngineError> {
        self.ack("sync_data")
    }

    fn delete_session(&mut self) -> Result<(), EngineError> {
        self.ack("delete_session")
    }
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub text: String,
    pub selection: (usize, usize),
    pub composition: Option<(usize, usize)>,
    pub composing: bool,
    pub spec: &'static str,
    pub requests: Vec<&'static str>,
    pub commands: Vec<String>,
    /// Scripted responses no request consumed.
    pub unused_responses: usize,
}

pub fn replay(script: &Script) -> ReplayReport {
    let global = settings();
    let session = match &script.compat {
        Some(compat) => InputSession::new(
            CompatPolicy::from_settings(compat),
            global.selection.max_records,
        ),
        None => InputSession::from_settings(global),
    };
    let mut driver = SyncDriver::new(session, Some(ScriptedEngine::default()))
        .with_surface(MemorySurface::with_text(&script.text));

    if let Some(field) = &script.field {
        driver.focus(field.clone());
        driver.window_shown();
    }

    for step in &script.steps {
        debug!(?step, "replay step");
        match step {
            Step::Key {
                envelope,
                responses,
            } => {
                push(&mut driver, responses);
                driver.key(envelope);
            }
            Step::Tap {
                position,
                responses,
            } => {
                push(&mut driver, responses);
                driver.tap(*position);
            }
            Step::Rewrite { text } => {
                driver.surface.replace_all(text);
                driver.pump_selection();
            }
            Step::Focus { field } => driver.focus(field.clone()),
            Step::Blur => driver.blur(),
            Step::WindowShown => driver.window_shown(),
            Step::WindowHidden => driver.window_hidden(),
            Step::Submit { responses } => {
                push(&mut driver, responses);
                driver.submit_preedit();
            }
            Step::SelectCandidate {
                id,
                row,
                responses,
            } => {
                push(&mut driver, responses);
                driver.candidate_selected(*id, *row);
            }
            Step::Undo {
                touch_trace,
                responses,
            } => {
                push(&mut driver, responses);
                driver.undo(touch_trace.clone());
            }
            Step::ExpandSuggestion { responses } => {
                push(&mut driver, responses);
                driver.expand_suggestion();
            }
        }
    }

    let (requests, unused_responses) = driver
        .engine
        .as_ref()
        .map(|e| (e.requests().to_vec(), e.pending()))
        .unwrap_or_default();
    ReplayReport {
        text: driver.surface.text(),
        selection: driver.surface.selection(),
        composition: driver.surface.composing_range(),
        composing: driver.session.is_composing(),
        spec: driver.session.current_spec().name(),
        requests,
        commands: driver.log().iter().map(|r| format!("{r:?}")).collect(),
        unused_responses,
    }
}

fn push(driver: &mut SyncDriver<ScriptedEngine>, responses: &[EngineResponse]) {
    if let Some(engine) = driver.engine.as_mut() {
        engine.push(responses.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPE_AND_COMMIT: &str = r#"
text = "今日は"

[field]
package_name = "com.example.notes"
initial_selection = [3, 3]

[[steps]]
type = "key"
envelope = { engine_key = { key_code = 12397 } }
responses = [{ consumed = true, preedit = { segments = [{ value = "ね" }], cursor = 1 } }]

[[steps]]
type = "key"
envelope = { engine_key = { key_code = 12371 } }
responses = [{ consumed = true, preedit = { segments = [{ value = "ねこ" }], cursor = 2 } }]

[[steps]]
type = "key"
envelope = { key_code = 66, engine_key = { special = "enter" } }
responses = [{ consumed = true, result = { value = "猫" } }]
"#;

    #[test]
    fn test_replay_type_and_commit() {
        let script = parse_script(TYPE_AND_COMMIT).unwrap();
        let report = replay(&script);
        assert_eq!(report.text, "今日は猫");
        assert_eq!(report.selection, (4, 4));
        assert_eq!(report.composition, None);
        assert!(!report.composing);
        assert_eq!(report.unused_responses, 0);
        assert_eq!(
            report.requests.iter().filter(|r| **r == "send_key").count(),
            3
        );
    }

    #[test]
    fn test_tap_outside_composition_resets() {
        let script = parse_script(
            r#"
text = "ab"

[field]
package_name = "com.example.notes"
initial_selection = [2, 2]

[[steps]]
type = "key"
envelope = { engine_key = { key_code = 12397 } }
responses = [{ consumed = true, preedit = { segments = [{ value = "ね" }], cursor = 1 } }]

[[steps]]
type = "tap"
position = 0
"#,
        )
        .unwrap();
        let report = replay(&script);
        assert_eq!(report.text, "abね");
        assert_eq!(report.selection, (0, 0));
        assert_eq!(report.composition, None);
        assert_eq!(report.requests.last(), Some(&"reset_context"));
    }

    #[test]
    fn test_unanswered_key_falls_back() {
        let script = parse_script(
            r#"
[field]
package_name = "com.example.notes"
initial_selection = [0, 0]

[[steps]]
type = "key"
envelope = { key_code = 62, engine_key = { special = "space" } }
"#,
        )
        .unwrap();
        assert_eq!(replay(&script).text, " ");
    }

    #[test]
    fn test_undo_step_renders_reply() {
        let script = parse_script(
            r#"
text = "猫"

[field]
package_name = "com.example.notes"
initial_selection = [1, 1]

[[steps]]
type = "undo"
responses = [{ consumed = true, deletion_range = { offset = -1, length = 1 }, preedit = { segments = [{ value = "ねこ" }], cursor = 2 } }]
"#,
        )
        .unwrap();
        let report = replay(&script);
        assert_eq!(report.text, "ねこ");
        assert_eq!(report.composition, Some((0, 2)));
        assert!(report.requests.contains(&"undo_or_rewind"));
        assert_eq!(report.unused_responses, 0);
    }

    #[test]
    fn test_empty_script_rejected() {
        assert!(matches!(
            parse_script("steps = []"),
            Err(ScriptError::Empty)
        ));
    }

    #[test]
    fn test_unknown_step_rejected() {
        let err = parse_script("[[steps]]\ntype = \"shake\"\n").unwrap_err();
        assert!(matches!(err, ScriptError::Parse(_)));
    }
}
