use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use thiserror::Error;
use tracing::{debug, error};

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("thread pool needs at least one worker")]
    NoWorkers,
    #[error("can't spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("thread pool is shut down")]
    ShutDown,
}

struct Worker {
    id: usize,
    thread: thread::JoinHandle<()>,
}

impl Worker {
    fn new(id: usize, receiver: Arc<Mutex<Receiver<Job>>>) -> Result<Worker, PoolError> {
        let thread = thread::Builder::new()
            .name(format!("worker-{}", id))
            .spawn(move || loop {
                // The guard is dropped at the end of this statement, before the job runs.
                let message = match receiver.lock() {
                    Ok(rx) => rx.recv(),
                    Err(poisoned) => poisoned.into_inner().recv(),
                };

                match message {
                    Ok(job) => {
                        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                            error!(worker = id, "job panicked");
                        }
                    }
                    Err(_) => {
                        debug!(worker = id, "channel closed, worker exiting");
                        break;
                    }
                }
            })?;

        Ok(Worker { id, thread })
    }
}

/// Fixed set of threads, each running one connection at a time.
pub struct ThreadPool {
    workers: Vec<Worker>,
    sender: Option<Sender<Job>>,
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        drop(self.sender.take());

        for worker in self.workers.drain(..) {
            if worker.thread.join().is_err() {
                error!(worker = worker.id, "worker thread panicked");
            }
        }
    }
}

impl ThreadPool {
    pub fn new(size: usize) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::NoWorkers);
        }

        let (sender, receiver) = mpsc::channel();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(size);

        for id in 0..size {
            workers.push(Worker::new(id, Arc::clone(&receiver))?);
        }

        Ok(ThreadPool {
            workers,
            sender: Some(sender),
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn execute<F>(&self, f: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let job = Box::new(f) as Job;
        self.sender
            .as_ref()
            .ok_or(PoolError::ShutDown)?
            .send(job)
            .map_err(|_| PoolError::ShutDown)
    }
}
