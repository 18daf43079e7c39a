//! Boundary with the external conversion engine.
//!
//! The engine is an opaque request/response service. Nothing here inspects its
//! internal state; `EngineResponse` is the whole contract.

use serde::{Deserialize, Serialize};

use crate::field::InputFieldType;
use crate::key::{EngineKey, TouchSample};
use crate::spec::{CompositionMode, KeyboardSpecification};
use crate::unicode::char_len;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine unavailable")]
    Unavailable,
    #[error("engine rejected {request}: {reason}")]
    Rejected {
        request: &'static str,
        reason: String,
    },
    #[error("engine protocol error: {0}")]
    Protocol(String),
}

/// Surrounding-text deletion relative to the caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRange {
    pub offset: i32,
    pub length: i32,
}

impl DeletionRange {
    /// Code points to delete before and after the caret, or `None` when the
    /// range does not contain the caret.
    pub fn spans(&self) -> Option<(usize, usize)> {
        let left = -i64::from(self.offset);
        let right = i64::from(self.length) - left;
        if left < 0 || right < 0 {
            return None;
        }
        Some((left as usize, right as usize))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResult {
    pub value: String,
    #[serde(default)]
    pub cursor_offset: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentAnnotation {
    #[default]
    None,
    Underline,
    Highlight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreeditSegment {
    pub value: String,
    #[serde(default)]
    pub annotation: SegmentAnnotation,
}

impl PreeditSegment {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            annotation: SegmentAnnotation::None,
        }
    }

    pub fn highlighted(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            annotation: SegmentAnnotation::Highlight,
        }
    }
}

/// Inline composition. `cursor` is measured in code points from the start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preedit {
    pub segments: Vec<PreeditSegment>,
    pub cursor: u32,
}

impl Preedit {
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.value.as_str()).collect()
    }

    pub fn char_len(&self) -> usize {
        self.segments.iter().map(|s| char_len(&s.value)).sum()
    }

    /// Cursor strictly inside the composition (not on either boundary).
    pub fn has_inner_cursor(&self) -> bool {
        let cursor = self.cursor as usize;
        cursor > 0 && cursor < self.char_len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateCategory {
    Conversion,
    Prediction,
    Suggestion,
    Transliteration,
    Usage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i32,
    pub value: String,
    #[serde(default)]
    pub annotation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateList {
    pub category: CandidateCategory,
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub focused_index: Option<u32>,
}

/// Output of one engine round trip. Owned by the engine, read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineResponse {
    #[serde(default)]
    pub consumed: bool,
    #[serde(default)]
    pub deletion_range: Option<DeletionRange>,
    #[serde(default)]
    pub result: Option<CommitResult>,
    #[serde(default)]
    pub preedit: Option<Preedit>,
    #[serde(default)]
    pub candidates: Option<CandidateList>,
    #[serde(default)]
    pub mode: Option<CompositionMode>,
}

impl EngineResponse {
    pub fn consumed() -> Self {
        Self {
            consumed: true,
            ..Self::default()
        }
    }

    /// The response belongs to an active conversion-candidate session.
    pub fn in_conversion(&self) -> bool {
        self.candidates
            .as_ref()
            .is_some_and(|c| c.category == CandidateCategory::Conversion)
    }

    pub fn committed_text(&self) -> Option<&str> {
        self.result.as_ref().map(|r| r.value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Device configuration sent with every request update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub hardware_keyboard: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestUpdate {
    pub spec: KeyboardSpecification,
    pub device: DeviceConfig,
}

/// The conversion engine as consumed by the session. Every call is a full
/// round trip; implementations may block.
pub trait ConversionEngine: Send {
    fn send_key(
        &mut self,
        key: &EngineKey,
        touch_trace: &[TouchSample],
    ) -> Result<EngineResponse, EngineError>;

    fn update_request(&mut self, request: &RequestUpdate) -> Result<(), EngineError>;

    fn switch_input_mode(&mut self, mode: CompositionMode) -> Result<EngineResponse, EngineError>;

    fn reset_context(&mut self) -> Result<(), EngineError>;

    fn submit(&mut self) -> Result<EngineResponse, EngineError>;

    /// Move the engine caret to `position`, counted from the start of the composition.
    fn move_cursor(&mut self, position: u32) -> Result<EngineResponse, EngineError>;

    fn submit_candidate(
        &mut self,
        id: i32,
        row: Option<u32>,
    ) -> Result<EngineResponse, EngineError>;

    /// Undo the last commit, or step a toggle key back through its cycle.
    fn undo_or_rewind(
        &mut self,
        touch_trace: &[TouchSample],
    ) -> Result<EngineResponse, EngineError>;

    /// Replace the first page of suggestions with the full list.
    fn expand_suggestion(&mut self) -> Result<EngineResponse, EngineError>;

    fn switch_input_field_type(&mut self, field_type: InputFieldType) -> Result<(), EngineError>;

    fn sync_data(&mut self) -> Result<(), EngineError>;

    fn delete_session(&mut self) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_spans() {
        let r = DeletionRange {
            offset: -2,
            length: 3,
        };
        assert_eq!(r.spans(), Some((2, 1)));
    }

    #[test]
    fn test_deletion_spans_reject_negative() {
        // Range entirely after the caret.
        let r = DeletionRange {
            offset: 1,
            length: 2,
        };
        assert_eq!(r.spans(), None);
        // Range ending before the caret.
        let r = DeletionRange {
            offset: -3,
            length: 1,
        };
        assert_eq!(r.spans(), None);
    }

    #[test]
    fn test_preedit_lengths() {
        let p = Preedit {
            segments: vec![PreeditSegment::new("ね"), PreeditSegment::highlighted("こ")],
            cursor: 1,
        };
        assert_eq!(p.text(), "ねこ");
        assert_eq!(p.char_len(), 2);
        assert!(p.has_inner_cursor());
    }

    #[test]
    fn test_preedit_boundary_cursor() {
        let p = Preedit {
            segments: vec![PreeditSegment::new("ねこ")],
            cursor: 2,
        };
        assert!(!p.has_inner_cursor());
    }

    #[test]
    fn test_preedit_cursor_past_end_not_inner() {
        let p = Preedit {
            segments: vec![PreeditSegment::new("ねこ")],
            cursor: 5,
        };
        assert!(!p.has_inner_cursor());
    }

    #[test]
    fn test_in_conversion() {
        let mut resp = EngineResponse::consumed();
        assert!(!resp.in_conversion());
        resp.candidates = Some(CandidateList {
            category: CandidateCategory::Conversion,
            candidates: vec![],
            focused_index: None,
        });
        assert!(resp.in_conversion());
    }

    #[test]
    fn test_response_from_toml() {
        let resp: EngineResponse = toml::from_str(
            r#"
consumed = true
deletion_range = { offset = -1, length = 1 }
result = { value = "猫" }
preedit = { cursor = 1, segments = [{ value = "に", annotation = "underline" }] }
"#,
        )
        .unwrap();
        assert!(resp.consumed);
        assert_eq!(resp.committed_text(), Some("猫"));
        assert_eq!(resp.preedit.unwrap().segments[0].annotation, SegmentAnnotation::Underline);
    }
}
