//! Background task runner.
//!
//! Runs blocking work (engine initialization, recognition) on ad-hoc worker
//! threads and hands the outcome back to the UI thread as a boxed completion
//! closure. The UI thread drains completions once per frame with [`TaskRunner::poll`],
//! which is the only place state is mutated, so workers never touch UI-owned
//! data directly.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;

/// A completion closure, applied to the shared state on the polling thread.
type Completion<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Executes work off the UI thread and marshals results back onto it.
///
/// `S` is the state type completions are applied to (the application
/// controller in production, plain test structs in unit tests).
pub struct TaskRunner<S> {
    tx: Sender<Completion<S>>,
    rx: Receiver<Completion<S>>,
    /// Invoked from the worker after a completion is queued, to wake the
    /// event loop (`egui::Context::request_repaint` in the app).
    waker: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl<S> TaskRunner<S> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            waker: None,
        }
    }

    /// Install the event-loop wake hook. Call before submitting work.
    pub fn set_waker(&mut self, waker: impl Fn() + Send + Sync + 'static) {
        self.waker = Some(Arc::new(waker));
    }

    /// Run `work` on a new worker thread; deliver `on_done(state, outcome)`
    /// through the completion queue.
    ///
    /// `on_done` runs exactly once, asynchronously relative to this call,
    /// and only ever on the thread that calls [`poll`]. No ordering is
    /// guaranteed between independently submitted tasks.
    pub fn run<T, W, D>(&self, work: W, on_done: D)
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
        D: FnOnce(&mut S, T) + Send + 'static,
        S: 'static,
    {
        let tx = self.tx.clone();
        let waker = self.waker.clone();

        std::thread::spawn(move || {
            let outcome = work();
            // The receiver lives as long as the runner; a send failure means
            // the app is shutting down and the result can only be ignored.
            let _ = tx.send(Box::new(move |state: &mut S| on_done(state, outcome)));
            if let Some(wake) = waker {
                wake();
            }
        });
    }

    /// Apply every queued completion to `state`. Must be called from the
    /// UI thread; returns how many completions ran.
    pub fn poll(&self, state: &mut S) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            completion(state);
            applied += 1;
        }
        applied
    }

    /// Whether at least one completion is waiting to be polled.
    #[allow(dead_code)]
    pub fn has_pending(&self) -> bool {
        !self.rx.is_empty()
    }
}

impl<S> Default for TaskRunner<S> {
    fn default() -> Self {
        Self::new()
    }
}
