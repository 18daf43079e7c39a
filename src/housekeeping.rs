//! Engine maintenance on a timer thread: periodic data sync, and a memory
//! trim some time after the keyboard window hides unless it is shown again.
//! The thread only issues engine calls; nothing it does is rendered.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use kb_session::EngineRequest;
use tracing::debug;

use crate::executor::EngineHandle;

enum Signal {
    WindowShown,
    WindowHidden,
    Shutdown,
}

pub struct Housekeeping {
    tx: mpsc::Sender<Signal>,
    thread: Option<JoinHandle<()>>,
}

impl Housekeeping {
    pub fn start(engine: EngineHandle, sync_interval: Duration, trim_delay: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("kanabridge-housekeeping".into())
            .spawn(move || housekeeping_loop(rx, engine, sync_interval, trim_delay))
            .expect("failed to spawn housekeeping thread");
        Self {
            tx,
            thread: Some(thread),
        }
    }

    /// Cancels a pending memory trim.
    pub fn window_shown(&self) {
        let _ = self.tx.send(Signal::WindowShown);
    }

    /// Schedules a memory trim after the configured delay.
    pub fn window_hidden(&self) {
        let _ = self.tx.send(Signal::WindowHidden);
    }
}

impl Drop for Housekeeping {
    fn drop(&mut self) {
        let _ = self.tx.send(Signal::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn housekeeping_loop(
    rx: mpsc::Receiver<Signal>,
    engine: EngineHandle,
    sync_interval: Duration,
    trim_delay: Duration,
) {
    let mut next_sync = Instant::now() + sync_interval;
    let mut trim_at: Option<Instant> = None;

    loop {
        let deadline = trim_at.map_or(next_sync, |t| t.min(next_sync));
        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(Signal::WindowShown) => {
                if trim_at.take().is_some() {
                    debug!("memory trim cancelled");
                }
            }
            Ok(Signal::WindowHidden) => trim_at = Some(Instant::now() + trim_delay),
            Ok(Signal::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let now = Instant::now();
        if now >= next_sync {
            debug!("periodic data sync");
            if !engine.send_detached(EngineRequest::SyncData) {
                break;
            }
            next_sync = now + sync_interval;
        }
        if trim_at.is_some_and(|t| now >= t) {
            trim_at = None;
            debug!("memory trim");
            if !engine.send_detached(EngineRequest::DeleteSession) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{EngineWorker, WorkOutput};
    use crate::testing::{CallLog, RecordingEngine};
    use kb_session::{Action, Job};

    const HOUR: Duration = Duration::from_secs(3600);

    /// Queue a job behind everything housekeeping sent and wait for it.
    fn barrier(worker: &EngineWorker) {
        let job = Job {
            seq: 1,
            generation: 0,
            request: EngineRequest::ResetContext,
            trigger: None,
        };
        worker.submit(Action::Engine(job), 0).unwrap();
        assert!(matches!(
            worker.recv_timeout(Duration::from_secs(5)),
            Some(WorkOutput::Completed(_))
        ));
    }

    fn count(calls: &CallLog, name: &str) -> usize {
        calls.lock().unwrap().iter().filter(|c| **c == name).count()
    }

    #[test]
    fn test_periodic_sync() {
        let (engine, calls) = RecordingEngine::new();
        let worker = EngineWorker::spawn(Some(Box::new(engine)));
        let housekeeping = Housekeeping::start(worker.handle(), Duration::from_millis(20), HOUR);
        thread::sleep(Duration::from_millis(150));
        drop(housekeeping);
        barrier(&worker);
        assert!(count(&calls, "sync_data") >= 2);
        assert_eq!(count(&calls, "delete_session"), 0);
    }

    #[test]
    fn test_trim_after_hide() {
        let (engine, calls) = RecordingEngine::new();
        let worker = EngineWorker::spawn(Some(Box::new(engine)));
        let housekeeping = Housekeeping::start(worker.handle(), HOUR, Duration::from_millis(20));
        housekeeping.window_hidden();
        thread::sleep(Duration::from_millis(200));
        drop(housekeeping);
        barrier(&worker);
        assert_eq!(count(&calls, "delete_session"), 1);
    }

    #[test]
    fn test_show_cancels_trim() {
        let (engine, calls) = RecordingEngine::new();
        let worker = EngineWorker::spawn(Some(Box::new(engine)));
        let housekeeping =
            Housekeeping::start(worker.handle(), HOUR, Duration::from_millis(100));
        housekeeping.window_hidden();
        housekeeping.window_shown();
        thread::sleep(Duration::from_millis(250));
        drop(housekeeping);
        barrier(&worker);
        assert_eq!(count(&calls, "delete_session"), 0);
    }
}
