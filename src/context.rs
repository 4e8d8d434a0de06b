//! Execution contexts: an abstraction over schedulers (§4.B).
//!
//! Grounded in `seen_std::reactive::scheduler::{Scheduler, ImmediateScheduler,
//! ThreadPoolScheduler, VirtualTimeScheduler}`. The teacher's
//! `ThreadPoolScheduler` spawns one OS thread per `schedule` call — its own
//! doc comments mark this a placeholder ("In a real implementation, this
//! would manage a thread pool"). `ThreadPoolContext` here is the real thing:
//! a fixed pool of worker threads fed by `crossbeam_channel::unbounded`,
//! the lock-free queue already in this workspace's dependency set.

use crate::cancellation::Cancellation;
use crossbeam_channel::{unbounded, Sender};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

type Job = Box<dyn FnOnce() + Send>;

/// Enqueues actions for execution, possibly on another thread. Operators
/// that shift work onto a context must still guarantee an observer's
/// `receive` calls are serialized per subscription (§5); the context
/// itself only owns *when* and *where* a job runs.
pub trait ExecutionContext: Send + Sync {
    /// Enqueue `action` for execution as soon as the context can run it.
    fn schedule(&self, action: Job);

    /// Enqueue `action` to run after `delay`. The returned cancellation
    /// disarms the timer; disposing it before the timer fires prevents
    /// `action` from ever running.
    fn schedule_after(&self, delay: Duration, action: Job) -> Cancellation;
}

/// Runs work synchronously on the calling thread, before `schedule`
/// returns.
pub struct ImmediateContext;

impl ImmediateContext {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImmediateContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext for ImmediateContext {
    fn schedule(&self, action: Job) {
        action();
    }

    fn schedule_after(&self, delay: Duration, action: Job) -> Cancellation {
        // There is no later turn to cancel into: the call blocks until the
        // timer elapses and then runs inline, same as the teacher's
        // `ImmediateScheduler::schedule_delayed`.
        thread::sleep(delay);
        action();
        Cancellation::non_disposable()
    }
}

/// A fixed pool of worker threads draining a shared lock-free queue.
pub struct ThreadPoolContext {
    sender: Sender<Job>,
    _workers: Vec<thread::JoinHandle<()>>,
}

impl ThreadPoolContext {
    pub fn new(worker_count: usize) -> Self {
        let (sender, receiver) = unbounded::<Job>();
        let worker_count = worker_count.max(1);
        let workers = (0..worker_count)
            .map(|_| {
                let receiver = receiver.clone();
                thread::spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        job();
                    }
                })
            })
            .collect();
        Self {
            sender,
            _workers: workers,
        }
    }
}

impl ExecutionContext for ThreadPoolContext {
    fn schedule(&self, action: Job) {
        // A closed channel means every worker has already shut down
        // (the context is being torn down); dropping the job is correct.
        let _ = self.sender.send(action);
    }

    fn schedule_after(&self, delay: Duration, action: Job) -> Cancellation {
        let fired = Arc::new(AtomicBool::new(false));
        let sender = self.sender.clone();
        let fired_for_timer = Arc::clone(&fired);
        thread::spawn(move || {
            thread::sleep(delay);
            if !fired_for_timer.load(Ordering::SeqCst) {
                let _ = sender.send(action);
            }
        });
        Cancellation::new(move || {
            fired.store(true, Ordering::SeqCst);
        })
    }
}

/// Queues actions for a caller-drained loop, for consumers (UI main
/// threads and similar) that pump their own event loop.
pub struct MainLoopContext {
    queue: Arc<Mutex<Vec<Job>>>,
}

impl MainLoopContext {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Run every action enqueued so far, in order.
    pub fn drain(&self) {
        let jobs = std::mem::take(&mut *self.queue.lock().unwrap());
        for job in jobs {
            job();
        }
    }
}

impl Default for MainLoopContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext for MainLoopContext {
    fn schedule(&self, action: Job) {
        self.queue.lock().unwrap().push(action);
    }

    fn schedule_after(&self, delay: Duration, action: Job) -> Cancellation {
        // Delayed work still needs a real clock to decide when it is due;
        // a dedicated thread hands it back to the loop's queue once the
        // delay elapses, the same split VirtualTimeContext makes between
        // "time has passed" and "someone drains the queue".
        let fired = Arc::new(AtomicBool::new(false));
        let queue = Arc::clone(&self.queue);
        let fired_for_timer = Arc::clone(&fired);
        thread::spawn(move || {
            thread::sleep(delay);
            if !fired_for_timer.load(Ordering::SeqCst) {
                queue.lock().unwrap().push(action);
            }
        });
        Cancellation::new(move || {
            fired.store(true, Ordering::SeqCst);
        })
    }
}

/// A manually driven clock for deterministic tests. Grounded directly in
/// `seen_std::reactive::scheduler::VirtualTimeScheduler`: a `BinaryHeap` of
/// `Reverse`-ordered scheduled work, drained by `advance_time`/`flush`.
pub struct VirtualTimeContext {
    current_time: Mutex<Instant>,
    queue: Mutex<BinaryHeap<Reverse<ScheduledJob>>>,
    next_id: AtomicU64,
}

struct ScheduledJob {
    time: Instant,
    id: u64,
    job: Job,
    armed: Arc<AtomicBool>,
}

impl PartialEq for ScheduledJob {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}
impl Eq for ScheduledJob {}
impl PartialOrd for ScheduledJob {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ScheduledJob {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.time.cmp(&other.time).then_with(|| self.id.cmp(&other.id))
    }
}

impl VirtualTimeContext {
    pub fn new() -> Self {
        Self {
            current_time: Mutex::new(Instant::now()),
            queue: Mutex::new(BinaryHeap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn now(&self) -> Instant {
        *self.current_time.lock().unwrap()
    }

    /// Advance virtual time by `duration`, running every job whose
    /// deadline has now passed, in deadline order.
    pub fn advance_time(&self, duration: Duration) {
        let target = {
            let mut current = self.current_time.lock().unwrap();
            *current += duration;
            *current
        };

        let mut due = Vec::new();
        {
            let mut queue = self.queue.lock().unwrap();
            while let Some(Reverse(next)) = queue.peek() {
                if next.time <= target {
                    if let Some(Reverse(job)) = queue.pop() {
                        due.push(job);
                    }
                } else {
                    break;
                }
            }
        }
        for job in due {
            if !job.armed.load(Ordering::SeqCst) {
                (job.job)();
            }
        }
    }

    /// Run every scheduled job regardless of its deadline.
    pub fn flush(&self) {
        let due: Vec<_> = self.queue.lock().unwrap().drain().collect();
        for Reverse(job) in due {
            if !job.armed.load(Ordering::SeqCst) {
                (job.job)();
            }
        }
    }
}

impl Default for VirtualTimeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext for VirtualTimeContext {
    fn schedule(&self, action: Job) {
        self.schedule_after(Duration::from_nanos(0), action);
    }

    fn schedule_after(&self, delay: Duration, action: Job) -> Cancellation {
        let time = self.now() + delay;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let armed = Arc::new(AtomicBool::new(false));
        self.queue.lock().unwrap().push(Reverse(ScheduledJob {
            time,
            id,
            job: action,
            armed: Arc::clone(&armed),
        }));
        Cancellation::new(move || {
            armed.store(true, Ordering::SeqCst);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn immediate_runs_synchronously() {
        let ctx = ImmediateContext::new();
        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = Arc::clone(&ran);
        ctx.schedule(Box::new(move || ran2.store(true, Ordering::SeqCst)));
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn thread_pool_runs_job() {
        let ctx = ThreadPoolContext::new(2);
        let count = Arc::new(AtomicU32::new(0));
        let count2 = Arc::clone(&count);
        ctx.schedule(Box::new(move || {
            count2.fetch_add(1, Ordering::SeqCst);
        }));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn virtual_time_holds_work_until_advanced() {
        let ctx = VirtualTimeContext::new();
        let count = Arc::new(AtomicU32::new(0));
        let count2 = Arc::clone(&count);
        let _c = ctx.schedule_after(
            Duration::from_millis(100),
            Box::new(move || {
                count2.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(count.load(Ordering::SeqCst), 0);
        ctx.advance_time(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        ctx.advance_time(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn virtual_time_cancellation_disarms_timer() {
        let ctx = VirtualTimeContext::new();
        let count = Arc::new(AtomicU32::new(0));
        let count2 = Arc::clone(&count);
        let c = ctx.schedule_after(
            Duration::from_millis(10),
            Box::new(move || {
                count2.fetch_add(1, Ordering::SeqCst);
            }),
        );
        c.dispose();
        ctx.advance_time(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn main_loop_defers_until_drained() {
        let ctx = MainLoopContext::new();
        let count = Arc::new(AtomicU32::new(0));
        let count2 = Arc::clone(&count);
        ctx.schedule(Box::new(move || {
            count2.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        ctx.drain();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
