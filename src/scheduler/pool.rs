//! Bounded pool of background worker threads.
//!
//! Workers share one job queue. Dropping the pool closes the queue; workers
//! finish the job in hand and exit. Nothing is joined or killed, so a
//! session can end while a slow collection is still running.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Queued {
    not_before: Option<Instant>,
    job: Job,
}

pub struct WorkerPool {
    queue: Sender<Queued>,
    size: usize,
}

impl WorkerPool {
    /// Spawn `size` workers (at least one).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (queue, jobs) = mpsc::channel::<Queued>();
        let jobs = Arc::new(Mutex::new(jobs));

        for index in 0..size {
            let jobs = Arc::clone(&jobs);
            let spawned = thread::Builder::new()
                .name(format!("devtopo-worker-{}", index))
                .spawn(move || worker_loop(&jobs));
            if let Err(e) = spawned {
                tracing::warn!("Could not start worker {}: {}", index, e);
            }
        }
        tracing::debug!("Started {} background worker(s)", size);

        Self { queue, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Queue a job to run as soon as a worker is free.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
        self.enqueue(None, Box::new(job));
    }

    /// Queue a job that must not start before `not_before`.
    pub fn submit_after(&self, not_before: Instant, job: impl FnOnce() + Send + 'static) {
        self.enqueue(Some(not_before), Box::new(job));
    }

    fn enqueue(&self, not_before: Option<Instant>, job: Job) {
        if self.queue.send(Queued { not_before, job }).is_err() {
            tracing::warn!("Worker pool has shut down; job dropped");
        }
    }
}

fn worker_loop(jobs: &Mutex<Receiver<Queued>>) {
    loop {
        let next = {
            let receiver = jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            receiver.recv()
        };
        let Ok(Queued { not_before, job }) = next else {
            // Queue closed: the pool was dropped.
            break;
        };
        if let Some(at) = not_before {
            let now = Instant::now();
            if at > now {
                thread::sleep(at - now);
            }
        }
        job();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::time::Duration;

    #[test]
    fn runs_submitted_jobs() {
        let pool = WorkerPool::new(2);
        let (tx, rx) = mpsc::channel();
        for i in 0..5 {
            let tx = tx.clone();
            pool.submit(move || tx.send(i).unwrap());
        }
        let mut got: Vec<i32> = (0..5)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        got.sort();
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn size_is_at_least_one() {
        assert_eq!(WorkerPool::new(0).size(), 1);
    }

    #[test]
    fn jobs_run_concurrently_up_to_size() {
        let pool = WorkerPool::new(2);
        let barrier = Arc::new(Barrier::new(3));
        let (tx, rx) = mpsc::channel();
        for _ in 0..2 {
            let barrier = Arc::clone(&barrier);
            let tx = tx.clone();
            pool.submit(move || {
                barrier.wait();
                tx.send(()).unwrap();
            });
        }
        // Both jobs must be running at once to pass the barrier.
        barrier.wait();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn delayed_job_waits() {
        let pool = WorkerPool::new(1);
        let (tx, rx) = mpsc::channel();
        let start = Instant::now();
        pool.submit_after(start + Duration::from_millis(100), move || {
            tx.send(Instant::now()).unwrap();
        });
        let ran_at = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(ran_at.duration_since(start) >= Duration::from_millis(100));
    }

    #[test]
    fn dropping_pool_abandons_running_job() {
        let pool = WorkerPool::new(1);
        let finished = Arc::new(AtomicUsize::new(0));
        let (started_tx, started_rx) = mpsc::channel();
        {
            let finished = Arc::clone(&finished);
            pool.submit(move || {
                started_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(100));
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        drop(pool);
        // Dropping does not wait for the job.
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }
}
