//! Selection tracking: classify each host-reported selection change as an
//! echo of our own edit, a caret move inside the composition, or a foreign
//! change that needs a context reset.
//!
//! The tracker never queries the surface. It keeps a short queue of the
//! selections our renders are expected to produce and matches host reports
//! against it; a matched report also discards every older prediction, since
//! the host reports changes in order.

use std::collections::VecDeque;

use kb_core::engine::EngineResponse;
use kb_core::unicode::{char_len, offset_position};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerStatus {
    Normal,
    /// A render was issued and its selection echo has not been seen yet.
    AwaitingOwnEdit,
    /// A foreign change was detected; the caller must reset the context.
    NeedsReset,
}

/// Selection change reported by the host, in code points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostSelection {
    pub old_start: usize,
    pub old_end: usize,
    pub new_start: usize,
    pub new_end: usize,
    /// Composition range as the host sees it, if any.
    pub composition: Option<(usize, usize)>,
}

impl HostSelection {
    /// Caret report with no composition.
    pub fn caret(old: usize, new: usize) -> Self {
        Self {
            old_start: old,
            old_end: old,
            new_start: new,
            new_end: new,
            composition: None,
        }
    }

    pub fn with_composition(mut self, start: usize, end: usize) -> Self {
        self.composition = Some((start, end));
        self
    }

    fn record(&self) -> Record {
        Record {
            composition: self.composition,
            selection: (self.new_start, self.new_end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionVerdict {
    DoNothing,
    ResetContext,
    /// Absolute caret position to move the engine cursor to.
    MoveCursor(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Record {
    composition: Option<(usize, usize)>,
    selection: (usize, usize),
}

impl Record {
    fn start(&self) -> usize {
        match self.composition {
            Some((start, _)) => start,
            None => self.selection.0.min(self.selection.1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectionTracker {
    records: VecDeque<Record>,
    max_records: usize,
    web_field: bool,
    status: TrackerStatus,
}

impl SelectionTracker {
    pub fn new(max_records: usize) -> Self {
        let max_records = max_records.max(1);
        Self {
            records: VecDeque::with_capacity(max_records),
            max_records,
            web_field: false,
            status: TrackerStatus::Normal,
        }
    }

    pub fn status(&self) -> TrackerStatus {
        self.status
    }

    pub fn is_web_field(&self) -> bool {
        self.web_field
    }

    /// Start of the composition as of the last prediction or report.
    pub fn preedit_start(&self) -> Option<usize> {
        self.records.back().map(Record::start)
    }

    /// Last selection we know about, predicted or reported.
    pub fn last_selection(&self) -> Option<(usize, usize)> {
        self.records.back().map(|r| r.selection)
    }

    pub fn on_focus(&mut self, initial: Option<(usize, usize)>, web_field: bool) {
        self.web_field = web_field;
        self.clear();
        if let Some((start, end)) = initial {
            self.offer(Record {
                composition: None,
                selection: (start, end),
            });
        }
    }

    /// Blur, window hide and configuration change all drop every prediction.
    pub fn clear(&mut self) {
        self.records.clear();
        self.status = TrackerStatus::Normal;
    }

    /// Predict the selection produced by rendering `response`.
    pub fn on_render(&mut self, response: &EngineResponse) {
        let Some(mut start) = self.preedit_start() else {
            debug!("render with unknown composition start; no prediction");
            self.status = TrackerStatus::AwaitingOwnEdit;
            return;
        };
        if let Some(range) = response.deletion_range {
            start = offset_position(start, i64::from(range.offset));
        }
        if let Some(text) = response.committed_text() {
            start += char_len(text);
        }
        let record = match &response.preedit {
            None => Record {
                composition: None,
                selection: (start, start),
            },
            Some(preedit) => {
                let len = preedit.char_len();
                let cursor = (preedit.cursor as usize).min(len);
                let caret = start + cursor;
                Record {
                    composition: Some((start, start + len)),
                    selection: (caret, caret),
                }
            }
        };
        self.offer(record);
        self.status = TrackerStatus::AwaitingOwnEdit;
    }

    pub fn on_host_selection_changed(
        &mut self,
        report: HostSelection,
        ignore_tail_moves: bool,
    ) -> SelectionVerdict {
        let record = report.record();

        if let Some(pos) = self.records.iter().position(|r| *r == record) {
            self.records.drain(..pos);
            self.status = TrackerStatus::Normal;
            debug!(?record, "selection echo of own edit");
            return SelectionVerdict::DoNothing;
        }

        if self.web_field {
            debug!(?record, "unexpected selection on web field");
            return self.reset_to(record);
        }

        if let Some((cs, ce)) = report.composition {
            let caret = report.new_start;
            if report.new_start == report.new_end && cs <= caret && caret <= ce {
                if ignore_tail_moves && caret == ce {
                    debug!(caret, "ignoring caret move to composition tail");
                    self.status = TrackerStatus::Normal;
                    return SelectionVerdict::DoNothing;
                }
                // The user moved the caret; older predictions no longer apply.
                self.records.clear();
                self.offer(record);
                self.status = TrackerStatus::Normal;
                debug!(caret, "caret moved inside composition");
                return SelectionVerdict::MoveCursor(caret);
            }
        }

        debug!(?record, "foreign selection change");
        self.reset_to(record)
    }

    /// The caller finished the reset sequence.
    pub fn acknowledge_reset(&mut self) {
        if self.status == TrackerStatus::NeedsReset {
            self.status = TrackerStatus::Normal;
        }
    }

    fn reset_to(&mut self, record: Record) -> SelectionVerdict {
        self.records.clear();
        self.offer(record);
        // The reset finishes the host composition; its echo is ours.
        if record.composition.is_some() {
            self.offer(Record {
                composition: None,
                ..record
            });
        }
        self.status = TrackerStatus::NeedsReset;
        SelectionVerdict::ResetContext
    }

    fn offer(&mut self, record: Record) {
        if self.records.len() == self.max_records {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    #[cfg(test)]
    pub(crate) fn record_count(&self) -> usize {
        self.records.len()
    }
}
