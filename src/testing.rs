//! Recording engine shared by the host-layer tests.

use std::sync::{Arc, Mutex};

use kb_core::engine::{
    CommitResult, ConversionEngine, EngineError, EngineResponse, Preedit, PreeditSegment,
    RequestUpdate,
};
use kb_core::field::InputFieldType;
use kb_core::key::{EngineKey, SpecialKey, TouchSample};
use kb_core::spec::CompositionMode;

pub(crate) type CallLog = Arc<Mutex<Vec<&'static str>>>;

/// Composes every character key; Enter commits, other special keys pass
/// through when nothing is composed.
#[derive(Default)]
pub(crate) struct RecordingEngine {
    pub calls: CallLog,
    preedit: String,
}

impl RecordingEngine {
    pub fn new() -> (Self, CallLog) {
        let engine = Self::default();
        let calls = Arc::clone(&engine.calls);
        (engine, calls)
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }

    fn composing(&self) -> EngineResponse {
        EngineResponse {
            consumed: true,
            preedit: (!self.preedit.is_empty()).then(|| Preedit {
                segments: vec![PreeditSegment::new(self.preedit.as_str())],
                cursor: self.preedit.chars().count() as u32,
            }),
            ..EngineResponse::default()
        }
    }

    fn commit(&mut self) -> EngineResponse {
        if self.preedit.is_empty() {
            return EngineResponse::consumed();
        }
        EngineResponse {
            consumed: true,
            result: Some(CommitResult {
                value: std::mem::take(&mut self.preedit),
                cursor_offset: None,
            }),
            ..EngineResponse::default()
        }
    }
}

impl ConversionEngine for RecordingEngine {
    fn send_key(
        &mut self,
        key: &EngineKey,
        _touch_trace: &[TouchSample],
    ) -> Result<EngineResponse, EngineError> {
        self.record("send_key");
        if let Some(c) = key.key_code.and_then(char::from_u32) {
            self.preedit.push(c);
            return Ok(self.composing());
        }
        match key.special {
            Some(SpecialKey::Enter) if !self.preedit.is_empty() => Ok(self.commit()),
            _ if self.preedit.is_empty() => Ok(EngineResponse::default()),
            _ => Ok(self.composing()),
        }
    }

    fn update_request(&mut self, _request: &RequestUpdate) -> Result<(), EngineError> {
        self.record("update_request");
        Ok(())
    }

    fn switch_input_mode(&mut self, mode: CompositionMode) -> Result<EngineResponse, EngineError> {
        self.record("switch_input_mode");
        Ok(EngineResponse {
            mode: Some(mode),
            ..self.composing()
        })
    }

    fn reset_context(&mut self) -> Result<(), EngineError> {
        self.record("reset_context");
        self.preedit.clear();
        Ok(())
    }

    fn submit(&mut self) -> Result<EngineResponse, EngineError> {
        self.record("submit");
        Ok(self.commit())
    }

    fn move_cursor(&mut self, _position: u32) -> Result<EngineResponse, EngineError> {
        self.record("move_cursor");
        Ok(self.composing())
    }

    fn submit_candidate(
        &mut self,
        _id: i32,
        _row: Option<u32>,
    ) -> Result<EngineResponse, EngineError> {
        self.record("submit_candidate");
        Ok(self.commit())
    }

    fn undo_or_rewind(
        &mut self,
        _touch_trace: &[TouchSample],
    ) -> Result<EngineResponse, EngineError> {
        self.record("undo_or_rewind");
        self.preedit.pop();
        if self.preedit.is_empty() {
            return Ok(EngineResponse::consumed());
        }
        Ok(self.composing())
    }

    fn expand_suggestion(&mut self) -> Result<EngineResponse, EngineError> {
        self.record("expand_suggestion");
        Ok(self.composing())
    }

    fn switch_input_field_type(&mut self, _field_type: InputFieldType) -> Result<(), EngineError> {
        self.record("switch_input_field_type");
        Ok(())
    }

    fn sync_data(&mut self) -> Result<(), EngineError> {
        self.record("sync_data");
        Ok(())
    }

    fn delete_session(&mut self) -> Result<(), EngineError> {
        self.record("delete_session");
        self.preedit.clear();
        Ok(())
    }
}
