use std::sync::Arc;

use kb_core::engine::{ConversionEngine, EngineError, EngineResponse, RequestUpdate};
use kb_core::field::InputFieldType;
use kb_core::key::{EngineKey, TouchSample};
use kb_core::spec::CompositionMode;

use super::types::{
    KbCompositionMode, KbEngineKey, KbEngineResponse, KbError, KbInputFieldType, KbRequestUpdate,
    KbTouchSample,
};

/// Conversion engine implemented by the host. Calls arrive on the engine
/// worker thread, one at a time, in the order the session issued them.
#[uniffi::export(with_foreign)]
pub trait KbEngine: Send + Sync {
    fn send_key(
        &self,
        key: KbEngineKey,
        touch_trace: Vec<KbTouchSample>,
    ) -> Result<KbEngineResponse, KbError>;

    fn update_request(&self, request: KbRequestUpdate) -> Result<(), KbError>;

    fn switch_input_mode(&self, mode: KbCompositionMode) -> Result<KbEngineResponse, KbError>;

    fn reset_context(&self) -> Result<(), KbError>;

    fn submit(&self) -> Result<KbEngineResponse, KbError>;

    /// `position` counts code points from the start of the composition.
    fn move_cursor(&self, position: u32) -> Result<KbEngineResponse, KbError>;

    fn submit_candidate(&self, id: i32, row: Option<u32>) -> Result<KbEngineResponse, KbError>;

    fn undo_or_rewind(
        &self,
        touch_trace: Vec<KbTouchSample>,
    ) -> Result<KbEngineResponse, KbError>;

    fn expand_suggestion(&self) -> Result<KbEngineResponse, KbError>;

    fn switch_input_field_type(&self, field_type: KbInputFieldType) -> Result<(), KbError>;

    fn sync_data(&self) -> Result<(), KbError>;

    fn delete_session(&self) -> Result<(), KbError>;
}

/// Adapts a host engine to the session's engine protocol.
pub(crate) struct ForeignEngine {
    inner: Arc<dyn KbEngine>,
}

impl ForeignEngine {
    pub(crate) fn new(inner: Arc<dyn KbEngine>) -> Self {
        Self { inner }
    }
}

fn engine_error(request: &'static str, e: KbError) -> EngineError {
    match e {
        KbError::EngineUnavailable => EngineError::Unavailable,
        other => EngineError::Rejected {
            request,
            reason: other.to_string(),
        },
    }
}

fn response(
    request: &'static str,
    r: Result<KbEngineResponse, KbError>,
) -> Result<EngineResponse, EngineError> {
    r.map(Into::into).map_err(|e| engine_error(request, e))
}

impl ConversionEngine for ForeignEngine {
    fn send_key(
        &mut self,
        key: &EngineKey,
        touch_trace: &[TouchSample],
    ) -> Result<EngineResponse, EngineError> {
        let trace = touch_trace.iter().copied().map(Into::into).collect();
        response("send_key", self.inner.send_key(key.clone().into(), trace))
    }

    fn update_request(&mut self, request: &RequestUpdate) -> Result<(), EngineError> {
        self.inner
            .update_request(request.into())
            .map_err(|e| engine_error("update_request", e))
    }

    fn switch_input_mode(&mut self, mode: CompositionMode) -> Result<EngineResponse, EngineError> {
        response("switch_input_mode", self.inner.switch_input_mode(mode.into()))
    }

    fn reset_context(&mut self) -> Result<(), EngineError> {
        self.inner
            .reset_context()
            .map_err(|e| engine_error("reset_context", e))
    }

    fn submit(&mut self) -> Result<EngineResponse, EngineError> {
        response("submit", self.inner.submit())
    }

    fn move_cursor(&mut self, position: u32) -> Result<EngineResponse, EngineError> {
        response("move_cursor", self.inner.move_cursor(position))
    }

    fn submit_candidate(
        &mut self,
        id: i32,
        row: Option<u32>,
    ) -> Result<EngineResponse, EngineError> {
        response("submit_candidate", self.inner.submit_candidate(id, row))
    }

    fn undo_or_rewind(
        &mut self,
        touch_trace: &[TouchSample],
    ) -> Result<EngineResponse, EngineError> {
        let trace = touch_trace.iter().copied().map(Into::into).collect();
        response("undo_or_rewind", self.inner.undo_or_rewind(trace))
    }

    fn expand_suggestion(&mut self) -> Result<EngineResponse, EngineError> {
        response("expand_suggestion", self.inner.expand_suggestion())
    }

    fn switch_input_field_type(&mut self, field_type: InputFieldType) -> Result<(), EngineError> {
        self.inner
            .switch_input_field_type(field_type.into())
            .map_err(|e| engine_error("switch_input_field_type", e))
    }

    fn sync_data(&mut self) -> Result<(), EngineError> {
        self.inner
            .sync_data()
            .map_err(|e| engine_error("sync_data", e))
    }

    fn delete_session(&mut self) -> Result<(), EngineError> {
        self.inner
            .delete_session()
            .map_err(|e| engine_error("delete_session", e))
    }
}
