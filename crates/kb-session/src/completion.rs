use kb_core::engine::EngineResponse;
use tracing::{debug, debug_span, warn};

use super::command::{CandidateUpdate, CommandResult, SurfaceEdit, ViewUpdate};
use super::job::{Completion, EngineRequest, Job, Outcome};
use super::render::{self, RenderContext};
use super::InputSession;

impl InputSession {
    /// Turn a finished engine job into command results.
    ///
    /// Completions from an earlier generation (issued before a blur or window
    /// hide) and completions already seen are dropped, so a duplicated
    /// delivery renders once.
    pub fn complete(&mut self, completion: Completion) -> Vec<CommandResult> {
        let Completion { job, outcome } = completion;
        let _span = debug_span!("complete", seq = job.seq, request = job.request.name()).entered();

        if job.generation != self.generation {
            debug!(
                job_generation = job.generation,
                generation = self.generation,
                "stale completion dropped"
            );
            return Vec::new();
        }
        if job.seq <= self.last_completed_seq {
            debug!(last = self.last_completed_seq, "duplicate completion dropped");
            return Vec::new();
        }
        self.last_completed_seq = job.seq;

        match outcome {
            Outcome::Cancelled | Outcome::Acknowledged => Vec::new(),
            Outcome::Failed(err) => {
                warn!(error = %err, "engine request failed");
                match (&job.request, job.trigger) {
                    (EngineRequest::SendKey { .. }, Some(trigger)) => self.fallback(&trigger),
                    _ => Vec::new(),
                }
            }
            Outcome::Response(response) => self.render_response(&job, &response),
        }
    }

    fn render_response(&mut self, job: &Job, response: &EngineResponse) -> Vec<CommandResult> {
        let mut results = Vec::new();

        if !response.consumed {
            if let Some(edit) = response.result.as_ref().and_then(render::commit_edit) {
                results.push(CommandResult::surface(vec![edit]));
            }
            if let Some(trigger) = job.trigger {
                results.extend(self.fallback(&trigger));
            }
        } else {
            // The engine took a modifier key; the application still needs to see it.
            if let Some(raw) = job.trigger.and_then(|t| t.raw).filter(|r| r.is_meta_key()) {
                let now = self.uptime_ms();
                results.push(CommandResult::surface(vec![SurfaceEdit::SendKeyEvent(
                    raw.replayed(raw.action, now, raw.repeat_count),
                )]));
            }
            let batch = render::render(
                response,
                RenderContext {
                    mode_switch: job.request.is_mode_switch(),
                    preedit_start: self.tracker.preedit_start(),
                },
            );
            results.push(CommandResult::RenderToSurface(batch));
            self.tracker.on_render(response);
            if response.preedit.is_some() || !job.request.is_mode_switch() {
                self.composing = response.preedit.is_some();
            }
        }

        results.push(CommandResult::RenderToView(ViewUpdate::Refresh {
            mode: response.mode,
            composing: self.composing,
        }));
        results.push(CommandResult::RenderCandidates(CandidateUpdate::from_list(
            response.candidates.as_ref(),
        )));
        results
    }
}
