//! Engine worker: one dedicated thread that owns the conversion engine and
//! runs its calls in submission order.
//!
//! Session actions go through a single FIFO queue. Engine jobs are executed;
//! results that need no engine are relayed untouched, so they reach the host
//! after every job queued before them. A generation counter, bumped by the
//! session on blur and window hide, cancels jobs that were queued for a
//! field that is gone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use kb_core::engine::ConversionEngine;
use kb_session::{Action, CommandResult, Completion, EngineRequest, Job};
use tracing::{debug, debug_span, warn};

// ---------------------------------------------------------------------------
// Work / output types
// ---------------------------------------------------------------------------

enum WorkItem {
    Job(Job),
    Relay {
        generation: u64,
        result: CommandResult,
    },
    /// Engine call nobody waits for (housekeeping).
    Detached(EngineRequest),
}

/// One reply per submitted action, in submission order.
#[derive(Debug)]
pub enum WorkOutput {
    Completed(Completion),
    Relayed(CommandResult),
    /// A relayed result whose generation went stale in the queue.
    Dropped,
}

// ---------------------------------------------------------------------------
// EngineWorker
// ---------------------------------------------------------------------------

pub struct EngineWorker {
    work_tx: mpsc::Sender<WorkItem>,
    output_rx: mpsc::Receiver<WorkOutput>,
    generation: Arc<AtomicU64>,
}

impl EngineWorker {
    /// Start the worker thread. Without an engine every job completes as
    /// unavailable.
    pub fn spawn(engine: Option<Box<dyn ConversionEngine>>) -> Self {
        let generation = Arc::new(AtomicU64::new(0));
        let (work_tx, work_rx) = mpsc::channel::<WorkItem>();
        let (output_tx, output_rx) = mpsc::channel::<WorkOutput>();
        {
            let generation = Arc::clone(&generation);
            thread::Builder::new()
                .name("kanabridge-engine".into())
                .spawn(move || engine_worker(work_rx, output_tx, generation, engine))
                .expect("failed to spawn engine worker");
        }
        Self {
            work_tx,
            output_rx,
            generation,
        }
    }

    /// Queue one session action. The action comes back if the worker is gone.
    pub fn submit(&self, action: Action, generation: u64) -> Result<(), Action> {
        let item = match action {
            Action::Engine(job) => WorkItem::Job(job),
            Action::Emit(result) => WorkItem::Relay { generation, result },
        };
        self.work_tx.send(item).map_err(|mpsc::SendError(item)| match item {
            WorkItem::Job(job) => Action::Engine(job),
            WorkItem::Relay { result, .. } => Action::Emit(result),
            WorkItem::Detached(_) => unreachable!("detached work is never submitted here"),
        })
    }

    pub fn set_generation(&self, generation: u64) {
        self.generation.store(generation, Ordering::SeqCst);
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            work_tx: self.work_tx.clone(),
        }
    }

    pub fn try_recv(&self) -> Option<WorkOutput> {
        self.output_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<WorkOutput> {
        self.output_rx.recv_timeout(timeout).ok()
    }
}

/// Sender for engine calls whose results are not rendered.
#[derive(Clone)]
pub struct EngineHandle {
    work_tx: mpsc::Sender<WorkItem>,
}

impl EngineHandle {
    /// Returns `false` once the worker has shut down.
    pub fn send_detached(&self, request: EngineRequest) -> bool {
        self.work_tx.send(WorkItem::Detached(request)).is_ok()
    }
}

// ---------------------------------------------------------------------------
// Worker thread
// ---------------------------------------------------------------------------

fn engine_worker(
    rx: mpsc::Receiver<WorkItem>,
    tx: mpsc::Sender<WorkOutput>,
    generation: Arc<AtomicU64>,
    mut engine: Option<Box<dyn ConversionEngine>>,
) {
    while let Ok(item) = rx.recv() {
        let current = generation.load(Ordering::SeqCst);
        let output = match item {
            WorkItem::Job(job) if job.generation < current => {
                debug!(seq = job.seq, request = job.request.name(), "stale job cancelled");
                WorkOutput::Completed(job.cancel())
            }
            WorkItem::Job(job) => {
                let _span =
                    debug_span!("engine_job", seq = job.seq, request = job.request.name())
                        .entered();
                WorkOutput::Completed(job.run(engine.as_deref_mut()))
            }
            WorkItem::Relay { generation, .. } if generation < current => WorkOutput::Dropped,
            WorkItem::Relay { result, .. } => WorkOutput::Relayed(result),
            WorkItem::Detached(request) => {
                match engine.as_deref_mut() {
                    Some(engine) => {
                        if let Err(e) = request.execute(engine) {
                            warn!(request = request.name(), error = %e, "detached engine call failed");
                        }
                    }
                    None => debug!(request = request.name(), "no engine for detached call"),
                }
                continue;
            }
        };
        if tx.send(output).is_err() {
            break;
        }
    }
    debug!("engine worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingEngine;
    use kb_core::engine::EngineError;
    use kb_core::key::EngineKey;
    use kb_session::{HostAction, Outcome};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn job(seq: u64, generation: u64, request: EngineRequest) -> Action {
        Action::Engine(Job {
            seq,
            generation,
            request,
            trigger: None,
        })
    }

    fn send_key(c: char) -> EngineRequest {
        EngineRequest::SendKey {
            key: EngineKey::char(c),
            touch_trace: Vec::new(),
        }
    }

    fn recv(worker: &EngineWorker) -> WorkOutput {
        worker.recv_timeout(TIMEOUT).expect("worker reply")
    }

    #[test]
    fn test_outputs_follow_submission_order() {
        let (engine, _) = RecordingEngine::new();
        let worker = EngineWorker::spawn(Some(Box::new(engine)));
        let hide = CommandResult::InteractHost(HostAction::RequestHide);
        worker.submit(job(1, 0, send_key('a')), 0).unwrap();
        worker.submit(Action::Emit(hide.clone()), 0).unwrap();
        worker.submit(job(2, 0, send_key('b')), 0).unwrap();

        assert!(matches!(recv(&worker), WorkOutput::Completed(c) if c.job.seq == 1));
        assert!(matches!(recv(&worker), WorkOutput::Relayed(r) if r == hide));
        assert!(matches!(recv(&worker), WorkOutput::Completed(c) if c.job.seq == 2));
    }

    #[test]
    fn test_stale_generation_cancels_and_drops() {
        let (engine, calls) = RecordingEngine::new();
        let worker = EngineWorker::spawn(Some(Box::new(engine)));
        worker.set_generation(2);
        worker.submit(job(1, 1, send_key('a')), 1).unwrap();
        worker
            .submit(
                Action::Emit(CommandResult::InteractHost(HostAction::HideStatusIcon)),
                1,
            )
            .unwrap();

        match recv(&worker) {
            WorkOutput::Completed(c) => assert!(matches!(c.outcome, Outcome::Cancelled)),
            other => panic!("expected completion, got {other:?}"),
        }
        assert!(matches!(recv(&worker), WorkOutput::Dropped));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_engine_fails_unavailable() {
        let worker = EngineWorker::spawn(None);
        worker.submit(job(1, 0, EngineRequest::Submit), 0).unwrap();
        match recv(&worker) {
            WorkOutput::Completed(c) => {
                assert!(matches!(c.outcome, Outcome::Failed(EngineError::Unavailable)))
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn test_detached_runs_in_queue_without_reply() {
        let (engine, calls) = RecordingEngine::new();
        let worker = EngineWorker::spawn(Some(Box::new(engine)));
        assert!(worker.handle().send_detached(EngineRequest::SyncData));
        worker.submit(job(1, 0, EngineRequest::ResetContext), 0).unwrap();

        assert!(matches!(recv(&worker), WorkOutput::Completed(c) if c.job.seq == 1));
        assert!(worker.try_recv().is_none());
        assert_eq!(*calls.lock().unwrap(), vec!["sync_data", "reset_context"]);
    }
}
