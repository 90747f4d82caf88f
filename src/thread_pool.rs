//! A fixed-size worker pool, and a blocking, range-partitioned `parallel_for` built on it.
//!
//! Workers live for the lifetime of the pool; no threads are created per call. The job queue is
//! the only lock shared across calls. Batches handed out by `parallel_for` cover disjoint index
//! ranges, so callers that write only to their own indices need no further synchronization.
//!
//! `parallel_for` and `parallel_for_each_mut` are scoped: their batches borrow from the caller's
//! stack, so jobs are queued with their lifetime erased (the one `unsafe` block, in
//! `run_batches`). This is sound only because `run_batches` cannot return, or unwind, before every
//! batch it queued has counted down on its latch. Any new path that queues borrowed jobs must go
//! through `run_batches`.

use std::{
    any::Any,
    collections::VecDeque,
    io, mem,
    num::NonZeroUsize,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
};

use log::{debug, error};

type Job = Box<dyn FnOnce() + Send + 'static>;
type PanicPayload = Box<dyn Any + Send + 'static>;

struct Queue {
    jobs: VecDeque<Job>,
    /// Tells workers to stop looking for jobs.
    should_terminate: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    /// Wakes workers on new jobs, or on termination.
    condition: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        // Jobs never run while the lock is held, so a poisoned queue is still consistent.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct ThreadPool {
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
    num_workers: usize,
}

impl ThreadPool {
    /// Start a pool with one worker per available hardware thread.
    pub fn start() -> io::Result<Self> {
        let num_workers = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);

        Self::with_workers(num_workers)
    }

    /// Start a pool with a fixed number of workers. A request for 0 workers starts 1.
    pub fn with_workers(num_workers: usize) -> io::Result<Self> {
        let num_workers = num_workers.max(1);

        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                jobs: VecDeque::new(),
                should_terminate: false,
            }),
            condition: Condvar::new(),
        });

        let mut result = Self {
            shared,
            threads: Vec::with_capacity(num_workers),
            num_workers,
        };

        for id in 0..num_workers {
            let shared = Arc::clone(&result.shared);
            // On failure, `result` drops here and joins the workers already started.
            let handle = thread::Builder::new()
                .name(format!("sph-worker-{id}"))
                .spawn(move || search(&shared, id))?;

            result.threads.push(handle);
        }

        debug!("Started thread pool with {num_workers} workers");
        Ok(result)
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Queue a job, and wake one waiting worker.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(Box::new(job));
    }

    /// Whether any job is still waiting in the queue. This is a snapshot; it says nothing about
    /// jobs that a worker has already picked up.
    pub fn is_busy(&self) -> bool {
        !self.shared.lock().jobs.is_empty()
    }

    /// Shut down: wake every worker and join them all. Jobs still queued are dropped unrun.
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Call `func` once for each index in `start..end`, split into contiguous batches, one per
    /// job. Returns only after every batch has completed. Order across batches is unspecified.
    ///
    /// If `func` panics, the remaining batches still run to completion, and the first panic is
    /// then resumed on the calling thread.
    ///
    /// Must not be called from inside a job running on this same pool: the caller would block a
    /// worker that its own batches may need.
    pub fn parallel_for<F>(&self, start: usize, end: usize, func: F)
    where
        F: Fn(usize) + Sync,
    {
        if end <= start {
            return;
        }

        let batch_size = self.batch_size(end - start);
        let func = &func;

        let batches = (start..end).step_by(batch_size).map(|batch_start| {
            let batch_end = (batch_start + batch_size).min(end);
            move || {
                for i in batch_start..batch_end {
                    func(i);
                }
            }
        });

        self.run_batches(batches);
    }

    /// As `parallel_for` over `0..items.len()`, but each call also receives exclusive access to
    /// its own item. Batches are disjoint `chunks_mut` of `items`.
    pub fn parallel_for_each_mut<T, F>(&self, items: &mut [T], func: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync,
    {
        if items.is_empty() {
            return;
        }

        let batch_size = self.batch_size(items.len());
        let func = &func;

        let batches = items
            .chunks_mut(batch_size)
            .enumerate()
            .map(|(batch, chunk)| {
                let offset = batch * batch_size;
                move || {
                    for (i, item) in chunk.iter_mut().enumerate() {
                        func(offset + i, item);
                    }
                }
            });

        self.run_batches(batches);
    }

    fn batch_size(&self, len: usize) -> usize {
        (len / self.num_workers).max(1)
    }

    fn push(&self, job: Job) {
        {
            let mut queue = self.shared.lock();
            queue.jobs.push_back(job);
        }
        self.shared.condition.notify_one();
    }

    /// Submit borrowed batches, and block until every one of them has finished.
    fn run_batches<'a, I, B>(&self, batches: I)
    where
        I: Iterator<Item = B>,
        B: FnOnce() + Send + 'a,
    {
        let latch = Arc::new(Latch::default());

        {
            // Waits on drop, so no batch can outlive this scope, even on unwind.
            let _wait = WaitOnDrop(&latch);

            for batch in batches {
                latch.add();
                let latch_job = Arc::clone(&latch);

                let job: Box<dyn FnOnce() + Send + 'a> = Box::new(move || {
                    let result = panic::catch_unwind(AssertUnwindSafe(batch));
                    latch_job.count_down(result.err());
                });

                // SAFETY: the job only borrows data that lives for `'a`, which outlives this
                // call. `_wait` blocks until the job has counted down, and the job has dropped
                // everything it borrows by then; only the `'static` latch handle remains.
                let job = unsafe { mem::transmute::<Box<dyn FnOnce() + Send + 'a>, Job>(job) };
                self.push(job);
            }
        }

        if let Some(payload) = latch.take_panic() {
            panic::resume_unwind(payload);
        }
    }

    fn shutdown(&mut self) {
        if self.threads.is_empty() {
            return;
        }

        {
            let mut queue = self.shared.lock();
            queue.should_terminate = true;
        }
        self.shared.condition.notify_all();

        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                error!("A thread pool worker exited abnormally");
            }
        }

        debug!("Stopped thread pool");
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Infinite loop that searches for jobs, until termination.
fn search(shared: &Shared, id: usize) {
    loop {
        let job = {
            let mut queue = shared
                .condition
                .wait_while(shared.lock(), |q| q.jobs.is_empty() && !q.should_terminate)
                .unwrap_or_else(PoisonError::into_inner);

            if queue.should_terminate {
                return;
            }

            match queue.jobs.pop_front() {
                Some(job) => job,
                None => continue,
            }
        };

        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!("Job panicked on worker {id}");
        }
    }
}

#[derive(Default)]
struct LatchState {
    pending: usize,
    panic: Option<PanicPayload>,
}

/// Counts outstanding batches of one `parallel_for` call.
#[derive(Default)]
struct Latch {
    state: Mutex<LatchState>,
    done: Condvar,
}

impl Latch {
    fn lock(&self) -> MutexGuard<'_, LatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add(&self) {
        self.lock().pending += 1;
    }

    fn count_down(&self, panic: Option<PanicPayload>) {
        let mut state = self.lock();
        state.pending -= 1;
        if state.panic.is_none() {
            state.panic = panic;
        }
        if state.pending == 0 {
            self.done.notify_all();
        }
    }

    fn wait(&self) {
        let _state = self
            .done
            .wait_while(self.lock(), |s| s.pending > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    fn take_panic(&self) -> Option<PanicPayload> {
        self.lock().panic.take()
    }
}

struct WaitOnDrop<'l>(&'l Latch);

impl Drop for WaitOnDrop<'_> {
    fn drop(&mut self) {
        self.0.wait();
    }
}
