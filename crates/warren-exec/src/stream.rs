//! Ordered asynchronous work queues for the batched backend.
//!
//! A [`Stream`] executes enqueued ops strictly in FIFO order on a
//! dedicated worker thread. Enqueueing returns immediately; completion
//! is only observable through [`Stream::synchronize`], which blocks
//! until every previously enqueued op has retired. Ops on different
//! streams are unordered with respect to each other.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::thread::JoinHandle;

enum Op {
    Run(Box<dyn FnOnce() + Send + 'static>),
    Fence(Sender<()>),
}

/// One in-order work queue.
pub struct Stream {
    tx: Option<Sender<Op>>,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream").finish_non_exhaustive()
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::new()
    }
}

impl Stream {
    /// Spawn the worker and return an empty stream.
    ///
    /// # Panics
    ///
    /// Panics if the worker thread cannot be spawned.
    pub fn new() -> Self {
        let (tx, rx): (Sender<Op>, Receiver<Op>) = unbounded();
        let worker = std::thread::Builder::new()
            .name("warren-stream".into())
            .spawn(move || {
                for op in rx {
                    match op {
                        Op::Run(f) => f(),
                        Op::Fence(done) => {
                            // A dropped receiver means synchronize() was
                            // abandoned; the fence still retires.
                            let _ = done.send(());
                        }
                    }
                }
            })
            .unwrap_or_else(|e| panic!("failed to spawn stream worker: {e}"));
        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    /// Enqueue `f` behind every op already in the queue and return
    /// without waiting for it.
    ///
    /// # Panics
    ///
    /// Panics if an earlier op brought the worker down; the original
    /// panic also resurfaces when the stream drops.
    pub fn enqueue(&self, f: impl FnOnce() + Send + 'static) {
        if let Some(tx) = &self.tx {
            // A closed channel means the worker died mid-op; surface it
            // as the panic it already is rather than dropping work.
            if tx.send(Op::Run(Box::new(f))).is_err() {
                panic!("stream worker terminated with ops pending");
            }
        }
    }

    /// Block until every op enqueued before this call has retired.
    ///
    /// # Panics
    ///
    /// Panics if an earlier op brought the worker down.
    pub fn synchronize(&self) {
        let Some(tx) = &self.tx else { return };
        let (done_tx, done_rx) = bounded(1);
        if tx.send(Op::Fence(done_tx)).is_err() {
            panic!("stream worker terminated with ops pending");
        }
        if done_rx.recv().is_err() {
            panic!("stream worker terminated before the fence retired");
        }
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain and exit; joining
        // afterwards makes drop a full barrier.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if let Err(panic) = worker.join() {
                std::panic::resume_unwind(panic);
            }
        }
    }
}

// Streams are handed across threads by the batched backend.
const _: () = {
    const fn assert_send<T: Send>() {}
    assert_send::<Stream>();
};
