//! Composition renderer: one engine response to one ordered surface batch.
//!
//! Steps run in a fixed order: delete surrounding text, commit, set the
//! composing text, set the selection. A malformed step is logged and skipped;
//! the rest of the batch still applies.

use kb_core::engine::{CommitResult, EngineResponse, Preedit, SegmentAnnotation};
use kb_core::unicode::{char_len, offset_position};
use tracing::{debug_span, error, warn};

use crate::command::{CursorPlacement, SpanStyle, StyledText, SurfaceBatch, SurfaceEdit};

/// Inputs to a render pass besides the response itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderContext {
    /// The response answers a pure mode switch; an absent preedit must not
    /// clear composing text the host may be showing as a selection.
    pub mode_switch: bool,
    /// Composition start tracked before this render.
    pub preedit_start: Option<usize>,
}

pub fn render(response: &EngineResponse, ctx: RenderContext) -> SurfaceBatch {
    let _span = debug_span!("render", mode_switch = ctx.mode_switch).entered();
    let mut edits = Vec::with_capacity(4);

    if let Some(edit) = deletion_edit(response) {
        edits.push(edit);
    }
    if let Some(edit) = response.result.as_ref().and_then(commit_edit) {
        edits.push(edit);
    }
    match &response.preedit {
        Some(preedit) => edits.push(composing_edit(preedit, response.in_conversion())),
        None if ctx.mode_switch => {}
        None => edits.push(SurfaceEdit::SetComposingText {
            text: StyledText::default(),
            cursor: CursorPlacement::Tail,
        }),
    }
    if let Some(edit) = selection_edit(response, ctx.preedit_start) {
        edits.push(edit);
    }

    SurfaceBatch { edits }
}

fn deletion_edit(response: &EngineResponse) -> Option<SurfaceEdit> {
    let range = response.deletion_range?;
    match range.spans() {
        Some((left, right)) => Some(SurfaceEdit::DeleteSurrounding { left, right }),
        None => {
            warn!(
                offset = range.offset,
                length = range.length,
                "deletion range does not contain the caret; skipped"
            );
            None
        }
    }
}

/// Commit step, shared with the unconsumed-response path.
pub fn commit_edit(result: &CommitResult) -> Option<SurfaceEdit> {
    if result.value.is_empty() {
        return None;
    }
    let mut cursor = CursorPlacement::Tail;
    if let Some(offset) = result.cursor_offset {
        if i64::from(offset) == -(char_len(&result.value) as i64) {
            cursor = CursorPlacement::Head;
        } else {
            error!(offset, "unsupported commit cursor offset; using tail");
        }
    }
    Some(SurfaceEdit::CommitText {
        text: result.value.clone(),
        cursor,
    })
}

fn composing_edit(preedit: &Preedit, in_conversion: bool) -> SurfaceEdit {
    let mut styled = StyledText::plain(preedit.text());
    let len = char_len(&styled.text);
    if preedit.cursor as usize > len {
        warn!(
            cursor = preedit.cursor,
            len, "preedit cursor past the composition; clamped to its tail"
        );
    }
    let cursor = (preedit.cursor as usize).min(len);

    styled.push_span(0, len, SpanStyle::Underline);
    if in_conversion {
        let mut pos = 0;
        for segment in &preedit.segments {
            let seg_len = char_len(&segment.value);
            let style = if segment.annotation == SegmentAnnotation::Highlight {
                SpanStyle::ConversionHighlight
            } else {
                SpanStyle::ConversionNormal
            };
            styled.push_span(pos, pos + seg_len, style);
            pos += seg_len;
        }
    } else {
        if cursor != len {
            styled.push_span(cursor, len, SpanStyle::AfterCursor);
        }
        if cursor > 0 {
            styled.push_span(0, cursor, SpanStyle::BeforeCursor);
        }
    }

    let placement = if cursor > 0 {
        CursorPlacement::Tail
    } else {
        CursorPlacement::Head
    };
    SurfaceEdit::SetComposingText {
        text: styled,
        cursor: placement,
    }
}

fn selection_edit(response: &EngineResponse, preedit_start: Option<usize>) -> Option<SurfaceEdit> {
    let preedit = response.preedit.as_ref()?;
    if !preedit.has_inner_cursor() {
        return None;
    }
    let Some(start) = preedit_start else {
        warn!("composition start unknown; selection step skipped");
        return None;
    };
    let mut caret = start;
    if let Some(range) = response.deletion_range {
        caret = offset_position(caret, i64::from(range.offset));
    }
    if let Some(text) = response.committed_text() {
        caret += char_len(text);
    }
    caret += preedit.cursor as usize;
    Some(SurfaceEdit::SetSelection {
        start: caret,
        end: caret,
    })
}
