mod completion;
mod selection;

use kb_core::compat::CompatPolicy;
use kb_core::engine::{
    Candidate, CandidateCategory, CandidateList, CommitResult, ConversionEngine, DeletionRange,
    EngineError, EngineResponse, Preedit, PreeditSegment, RequestUpdate,
};
use kb_core::field::{FieldInfo, InputFieldType};
use kb_core::key::{keycode, EngineKey, KeyEnvelope, SpecialKey, TouchSample};
use kb_core::settings::CompatSettings;
use kb_core::spec::CompositionMode;

use super::command::{CommandResult, SurfaceEdit};
use super::driver::SyncDriver;
use super::job::{Action, EngineRequest};
use super::InputSession;

pub(super) const MAX_RECORDS: usize = 10;

pub(super) fn make_session() -> InputSession {
    InputSession::new(CompatPolicy::default(), MAX_RECORDS)
}

pub(super) fn make_session_with_compat(compat: CompatSettings) -> InputSession {
    InputSession::new(CompatPolicy::from_settings(&compat), MAX_RECORDS)
}

/// Small composing engine: characters accumulate in the preedit, space
/// converts, enter commits. Enough behaviour to drive a session end to end.
#[derive(Debug, Default)]
pub(super) struct ToyEngine {
    pub preedit: Vec<char>,
    pub cursor: usize,
    pub converted: Option<String>,
    /// Committed value and its reading, for undo.
    pub last_commit: Option<(String, String)>,
    pub expanded: bool,
    pub requests: Vec<&'static str>,
    pub unavailable: bool,
}

impl ToyEngine {
    pub fn preedit_text(&self) -> String {
        match &self.converted {
            Some(c) => c.clone(),
            None => self.preedit.iter().collect(),
        }
    }

    fn check(&mut self, name: &'static str) -> Result<(), EngineError> {
        self.requests.push(name);
        if self.unavailable {
            return Err(EngineError::Unavailable);
        }
        Ok(())
    }

    fn composing_response(&self) -> EngineResponse {
        if self.preedit.is_empty() {
            return EngineResponse::consumed();
        }
        if let Some(converted) = &self.converted {
            let len = converted.chars().count() as u32;
            return EngineResponse {
                consumed: true,
                preedit: Some(Preedit {
                    segments: vec![PreeditSegment::highlighted(converted.clone())],
                    cursor: len,
                }),
                candidates: Some(CandidateList {
                    category: CandidateCategory::Conversion,
                    candidates: vec![
                        Candidate {
                            id: 0,
                            value: converted.clone(),
                            annotation: None,
                        },
                        Candidate {
                            id: 1,
                            value: self.preedit.iter().collect(),
                            annotation: None,
                        },
                    ],
                    focused_index: Some(0),
                }),
                ..EngineResponse::default()
            };
        }
        EngineResponse {
            consumed: true,
            preedit: Some(Preedit {
                segments: vec![PreeditSegment::new(self.preedit.iter().collect::<String>())],
                cursor: self.cursor as u32,
            }),
            mode: Some(CompositionMode::Hiragana),
            ..EngineResponse::default()
        }
    }

    fn commit(&mut self) -> EngineResponse {
        let value = self.preedit_text();
        self.last_commit = Some((value.clone(), self.preedit.iter().collect()));
        self.clear();
        EngineResponse {
            consumed: true,
            result: Some(CommitResult {
                value,
                cursor_offset: None,
            }),
            ..EngineResponse::default()
        }
    }

    fn clear(&mut self) {
        self.preedit.clear();
        self.cursor = 0;
        self.converted = None;
    }

    fn convert(reading: &str) -> String {
        match reading {
            "ねこ" => "猫".to_string(),
            "いぬ" => "犬".to_string(),
            other => other.to_string(),
        }
    }
}

impl ConversionEngine for ToyEngine {
    fn send_key(
        &mut self,
        key: &EngineKey,
        _touch_trace: &[TouchSample],
    ) -> Result<EngineResponse, EngineError> {
        self.check("send_key")?;
        if let Some(c) = key.key_code.and_then(char::from_u32) {
            if self.converted.is_some() {
                // Typing during conversion commits the conversion first.
                let mut resp = self.commit();
                self.preedit.push(c);
                self.cursor = 1;
                let composing = self.composing_response();
                resp.preedit = composing.preedit;
                resp.mode = composing.mode;
                return Ok(resp);
            }
            self.preedit.insert(self.cursor, c);
            self.cursor += 1;
            return Ok(self.composing_response());
        }
        let empty = self.preedit.is_empty();
        match key.special {
            _ if empty => Ok(EngineResponse::default()),
            Some(SpecialKey::Enter) => Ok(self.commit()),
            Some(SpecialKey::Space) => {
                let reading: String = self.preedit.iter().collect();
                self.converted = Some(Self::convert(&reading));
                Ok(self.composing_response())
            }
            Some(SpecialKey::Backspace) => {
                self.converted = None;
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.preedit.remove(self.cursor);
                }
                Ok(self.composing_response())
            }
            Some(SpecialKey::Left) => {
                self.cursor = self.cursor.saturating_sub(1);
                Ok(self.composing_response())
            }
            Some(SpecialKey::Right) => {
                self.cursor = (self.cursor + 1).min(self.preedit.len());
                Ok(self.composing_response())
            }
            _ => Ok(self.composing_response()),
        }
    }

    fn update_request(&mut self, _request: &RequestUpdate) -> Result<(), EngineError> {
        self.check("update_request")
    }

    fn switch_input_mode(&mut self, mode: CompositionMode) -> Result<EngineResponse, EngineError> {
        self.check("switch_input_mode")?;
        let mut resp = self.composing_response();
        resp.mode = Some(mode);
        Ok(resp)
    }

    fn reset_context(&mut self) -> Result<(), EngineError> {
        self.check("reset_context")?;
        self.clear();
        Ok(())
    }

    fn submit(&mut self) -> Result<EngineResponse, EngineError> {
        self.check("submit")?;
        if self.preedit.is_empty() {
            return Ok(EngineResponse::consumed());
        }
        Ok(self.commit())
    }

    fn move_cursor(&mut self, position: u32) -> Result<EngineResponse, EngineError> {
        self.check("move_cursor")?;
        self.converted = None;
        self.cursor = (position as usize).min(self.preedit.len());
        Ok(self.composing_response())
    }

    fn submit_candidate(
        &mut self,
        id: i32,
        _row: Option<u32>,
    ) -> Result<EngineResponse, EngineError> {
        self.check("submit_candidate")?;
        if id == 1 {
            self.converted = Some(self.preedit.iter().collect());
        }
        Ok(self.commit())
    }

    /// Reopens the last commit as its reading, or drops the last character.
    fn undo_or_rewind(
        &mut self,
        _touch_trace: &[TouchSample],
    ) -> Result<EngineResponse, EngineError> {
        self.check("undo_or_rewind")?;
        if self.preedit.is_empty() {
            let Some((value, reading)) = self.last_commit.take() else {
                return Ok(EngineResponse::consumed());
            };
            let len = value.chars().count() as i32;
            self.preedit = reading.chars().collect();
            self.cursor = self.preedit.len();
            return Ok(EngineResponse {
                deletion_range: Some(DeletionRange {
                    offset: -len,
                    length: len,
                }),
                ..self.composing_response()
            });
        }
        self.converted = None;
        if self.cursor > 0 {
            self.cursor -= 1;
            self.preedit.remove(self.cursor);
        }
        Ok(self.composing_response())
    }

    fn expand_suggestion(&mut self) -> Result<EngineResponse, EngineError> {
        self.check("expand_suggestion")?;
        self.expanded = true;
        Ok(self.composing_response())
    }

    fn switch_input_field_type(&mut self, _field_type: InputFieldType) -> Result<(), EngineError> {
        self.check("switch_input_field_type")
    }

    fn sync_data(&mut self) -> Result<(), EngineError> {
        self.check("sync_data")
    }

    fn delete_session(&mut self) -> Result<(), EngineError> {
        self.check("delete_session")?;
        self.clear();
        Ok(())
    }
}

pub(super) type Driver = SyncDriver<ToyEngine>;

/// Session focused on a plain text field with the keyboard shown.
pub(super) fn make_driver() -> Driver {
    let mut d = SyncDriver::new(make_session(), Some(ToyEngine::default()));
    d.focus(FieldInfo::text("com.example.notes").with_selection(0, 0));
    d.window_shown();
    d.take_log();
    d
}

pub(super) fn engine(d: &Driver) -> &ToyEngine {
    d.engine.as_ref().unwrap()
}

pub(super) fn char_key(c: char) -> KeyEnvelope {
    KeyEnvelope::soft(keycode::UNKNOWN, Some(EngineKey::char(c)))
}

pub(super) fn special_key(key: SpecialKey) -> KeyEnvelope {
    let code = match key {
        SpecialKey::Enter => keycode::ENTER,
        SpecialKey::Backspace => keycode::DEL,
        SpecialKey::Space => keycode::SPACE,
        SpecialKey::Left => keycode::DPAD_LEFT,
        SpecialKey::Right => keycode::DPAD_RIGHT,
        _ => keycode::UNKNOWN,
    };
    KeyEnvelope::soft(code, Some(EngineKey::special(key)))
}

pub(super) fn type_str(d: &mut Driver, s: &str) {
    for c in s.chars() {
        d.key(&char_key(c));
    }
}

pub(super) fn requests(actions: &[Action]) -> Vec<&EngineRequest> {
    actions
        .iter()
        .filter_map(|a| a.as_job().map(|j| &j.request))
        .collect()
}

pub(super) fn request_names(actions: &[Action]) -> Vec<&'static str> {
    requests(actions).iter().map(|r| r.name()).collect()
}

pub(super) fn emitted(actions: &[Action]) -> Vec<&CommandResult> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::Emit(r) => Some(r),
            Action::Engine(_) => None,
        })
        .collect()
}

/// All surface edits in `results`, flattened across batches.
pub(super) fn surface_edits(results: &[CommandResult]) -> Vec<&SurfaceEdit> {
    results
        .iter()
        .filter_map(|r| match r {
            CommandResult::RenderToSurface(batch) => Some(batch.edits.iter()),
            _ => None,
        })
        .flatten()
        .collect()
}

pub(super) fn preedit_response(text: &str, cursor: u32) -> EngineResponse {
    EngineResponse {
        consumed: true,
        preedit: Some(Preedit {
            segments: vec![PreeditSegment::new(text)],
            cursor,
        }),
        ..EngineResponse::default()
    }
}

pub(super) fn commit_response(text: &str) -> EngineResponse {
    EngineResponse {
        consumed: true,
        result: Some(CommitResult {
            value: text.to_string(),
            cursor_offset: None,
        }),
        ..EngineResponse::default()
    }
}

pub(super) fn deletion(offset: i32, length: i32) -> Option<DeletionRange> {
    Some(DeletionRange { offset, length })
}
