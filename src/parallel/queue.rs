use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::{error, warn};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Fixed pool of worker threads draining a FIFO task queue.
///
/// `execute` never blocks the caller; `finish` blocks until every pending
/// task has completed, counting tasks that running tasks enqueue, so a
/// recursive fan-out (the crawler) ends with one barrier. The queue stays
/// usable after `finish`, letting the build, crawl, and query phases share
/// one pool.
pub struct WorkQueue {
    sender: Mutex<Option<Sender<Task>>>,
    pending: Arc<Pending>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

struct Pending {
    count: Mutex<usize>,
    zero: Condvar,
}

impl Pending {
    fn increment(&self) {
        *self.count.lock() += 1;
    }

    fn decrement(&self) {
        let mut count = self.count.lock();
        *count -= 1;
        if *count == 0 {
            self.zero.notify_all();
        }
    }

    fn wait_for_zero(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.zero.wait(&mut count);
        }
    }
}

impl WorkQueue {
    /// Spawns `threads` workers (at least one).
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        let (sender, receiver) = channel::unbounded::<Task>();
        let pending = Arc::new(Pending {
            count: Mutex::new(0),
            zero: Condvar::new(),
        });

        let workers = (0..threads)
            .map(|id| {
                let receiver = receiver.clone();
                let pending = Arc::clone(&pending);
                thread::Builder::new()
                    .name(format!("worker-{}", id))
                    .spawn(move || Self::run_worker(receiver, pending))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        WorkQueue {
            sender: Mutex::new(Some(sender)),
            pending,
            workers: Mutex::new(workers),
        }
    }

    fn run_worker(receiver: Receiver<Task>, pending: Arc<Pending>) {
        while let Ok(task) = receiver.recv() {
            if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                error!("worker task panicked; pool continues");
            }
            pending.decrement();
        }
    }

    /// Enqueues a task and returns immediately. After `shutdown` the task
    /// is dropped with a warning.
    pub fn execute<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(sender) => {
                self.pending.increment();
                if sender.send(Box::new(task)).is_err() {
                    self.pending.decrement();
                    warn!("task dropped: worker pool unavailable");
                }
            }
            None => warn!("task dropped: queue is shut down"),
        }
    }

    /// Blocks the caller until the pending count reaches zero. The queue
    /// remains usable afterward.
    pub fn finish(&self) {
        self.pending.wait_for_zero();
    }

    /// Stops accepting new tasks; workers exit once the queue drains.
    pub fn shutdown(&self) {
        self.sender.lock().take();
    }

    /// Waits for worker threads to terminate. Call after `shutdown`.
    pub fn join(&self) {
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for worker in workers {
            if worker.join().is_err() {
                error!("worker thread terminated abnormally");
            }
        }
    }
}
