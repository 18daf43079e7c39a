//! Engine work items and their completions.

use kb_core::engine::{ConversionEngine, EngineError, EngineResponse, RequestUpdate};
use kb_core::field::InputFieldType;
use kb_core::key::{EngineKey, KeyTrigger, TouchSample};
use kb_core::spec::CompositionMode;

use crate::command::CommandResult;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineRequest {
    SendKey {
        key: EngineKey,
        touch_trace: Vec<TouchSample>,
    },
    UpdateRequest(RequestUpdate),
    SwitchInputMode(CompositionMode),
    ResetContext,
    Submit,
    /// Caret offset from the start of the composition.
    MoveCursor(u32),
    SubmitCandidate {
        id: i32,
        row: Option<u32>,
    },
    UndoOrRewind {
        touch_trace: Vec<TouchSample>,
    },
    ExpandSuggestion,
    SwitchInputFieldType(InputFieldType),
    SyncData,
    DeleteSession,
}

impl EngineRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SendKey { .. } => "send_key",
            Self::UpdateRequest(_) => "update_request",
            Self::SwitchInputMode(_) => "switch_input_mode",
            Self::ResetContext => "reset_context",
            Self::Submit => "submit",
            Self::MoveCursor(_) => "move_cursor",
            Self::SubmitCandidate { .. } => "submit_candidate",
            Self::UndoOrRewind { .. } => "undo_or_rewind",
            Self::ExpandSuggestion => "expand_suggestion",
            Self::SwitchInputFieldType(_) => "switch_input_field_type",
            Self::SyncData => "sync_data",
            Self::DeleteSession => "delete_session",
        }
    }

    pub fn is_mode_switch(&self) -> bool {
        matches!(self, Self::SwitchInputMode(_))
    }

    /// Run the request. Acknowledgement-only calls yield `Ok(None)`.
    pub fn execute(
        &self,
        engine: &mut dyn ConversionEngine,
    ) -> Result<Option<EngineResponse>, EngineError> {
        match self {
            Self::SendKey { key, touch_trace } => engine.send_key(key, touch_trace).map(Some),
            Self::UpdateRequest(request) => engine.update_request(request).map(|()| None),
            Self::SwitchInputMode(mode) => engine.switch_input_mode(*mode).map(Some),
            Self::ResetContext => engine.reset_context().map(|()| None),
            Self::Submit => engine.submit().map(Some),
            Self::MoveCursor(position) => engine.move_cursor(*position).map(Some),
            Self::SubmitCandidate { id, row } => engine.submit_candidate(*id, *row).map(Some),
            Self::UndoOrRewind { touch_trace } => engine.undo_or_rewind(touch_trace).map(Some),
            Self::ExpandSuggestion => engine.expand_suggestion().map(Some),
            Self::SwitchInputFieldType(field_type) => {
                engine.switch_input_field_type(*field_type).map(|()| None)
            }
            Self::SyncData => engine.sync_data().map(|()| None),
            Self::DeleteSession => engine.delete_session().map(|()| None),
        }
    }
}

/// One engine call issued by a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub seq: u64,
    pub generation: u64,
    pub request: EngineRequest,
    /// Key to hand to the application if the engine does not take it.
    pub trigger: Option<KeyTrigger>,
}

impl Job {
    /// Run against `engine`; a missing engine fails every request as unavailable.
    pub fn run(self, engine: Option<&mut (dyn ConversionEngine + '_)>) -> Completion {
        let outcome = match engine {
            None => Outcome::Failed(EngineError::Unavailable),
            Some(engine) => match self.request.execute(engine) {
                Ok(Some(response)) => Outcome::Response(response),
                Ok(None) => Outcome::Acknowledged,
                Err(e) => Outcome::Failed(e),
            },
        };
        Completion { job: self, outcome }
    }

    pub fn cancel(self) -> Completion {
        Completion {
            job: self,
            outcome: Outcome::Cancelled,
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Response(EngineResponse),
    Acknowledged,
    Failed(EngineError),
    /// Skipped because its generation went stale before it ran.
    Cancelled,
}

#[derive(Debug)]
pub struct Completion {
    pub job: Job,
    pub outcome: Outcome,
}

/// Output of a session operation, in the order it must take effect.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Engine(Job),
    /// Result needing no engine round trip. Still ordered after earlier jobs.
    Emit(CommandResult),
}

impl Action {
    pub fn as_job(&self) -> Option<&Job> {
        match self {
            Self::Engine(job) => Some(job),
            Self::Emit(_) => None,
        }
    }
}
