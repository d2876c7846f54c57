/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Fixed-priority preemptive kernel: one OS thread per task plus a tick
//! thread.
//!
//! ```text
//!   tick thread ──(every tick)──► timer.tick() per task
//!                                   │ fired & Waiting   → Ready (enqueue)
//!                                   │ fired & queued    → collapsed
//!                                   │ fired & started   → pending release
//!                                   ▼
//!                       ┌─────── KernelState (Mutex) ───────┐
//!                       │ tasks[] · ReadyQueue · running    │
//!                       └───────────────┬───────────────────┘
//!                                       │ CPU token (Condvar)
//!                     ┌─────────────────┼─────────────────┐
//!                     ▼                 ▼                 ▼
//!                task thread 0    task thread 1  …   task thread n
//! ```
//!
//! # The CPU token
//! The token (`running`) always belongs to the highest-priority ready task.
//! Every change to the ready set goes through [`KernelState::dispatch`]:
//! when the head of the [`ReadyQueue`] has a strictly higher priority than
//! the holder, the holder is preempted on the spot.  It goes back to
//! `Ready` at the tail of its priority level and the token moves to the
//! higher-priority task, whose thread starts immediately.
//!
//! An OS thread cannot be frozen from outside, so a preempted task keeps
//! executing until it reaches its next suspension point, where it parks
//! until the token comes back:
//!
//! | Point | Effect |
//! |---|---|
//! | channel `send` / `receive` (any variant), [`preemption_point`] | parks while preempted |
//! | [`blocking_section`] entered | `Blocked(reason)`, token released |
//! | unit of work returned `Ok` | `Waiting` (or `Ready` again if a release is pending) |
//! | unit of work failed or panicked | `Terminated` |
//!
//! A blocked task that is woken re-enters the ready queue and competes for
//! the token like any release, so a high-priority consumer parked on an
//! empty channel never stops a low-priority producer from running.
//!
//! # Releases
//! All tasks start `Ready` so every task runs once at start-up, in priority
//! order.  After that the tick thread releases a task when its timer fires:
//!
//! * `Waiting`: released, joins the ready queue.
//! * `Ready` and not yet started: the queued activation already covers it;
//!   the release is counted in `collapsed_releases`.
//! * started (running, preempted or blocked): remembered as `pending` and
//!   served right after the current activation; further releases in that
//!   window are counted in `collapsed_releases`.

use std::cell::RefCell;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::task::{
    BlockReason, PeriodSpec, PeriodicTask, PeriodicTimer, TaskState, TaskStats, Work,
};

use super::dispatch::ReadyQueue;
use super::{
    describe_task_set, record_completion, run_contained, validate_task_set, Activation,
    SchedulerError, SchedulerReport, SchedulingMode, TaskError, TaskSummary,
};

// ── Kernel state ──────────────────────────────────────────────────────────────

struct TaskControl {
    name: String,
    spec: PeriodSpec,
    timer: PeriodicTimer,
    state: TaskState,
    stats: TaskStats,
    /// Sequence number of the task's live ready-queue entry.
    ticket: u64,
    /// The current activation has been given the CPU at least once.
    started: bool,
    /// Release time of the current activation.
    released_at: Duration,
    /// First time the current activation got the CPU.
    started_at: Duration,
    /// Release that arrived after the current activation started.
    pending: Option<Duration>,
}

struct KernelState {
    tasks: Vec<TaskControl>,
    ready: ReadyQueue,
    running: Option<usize>,
    shutdown: bool,
}

impl KernelState {
    /// Give the CPU token to the highest-priority ready task, preempting the
    /// holder if it has a strictly lower priority.
    fn dispatch(&mut self, now: Duration) {
        let Some((next, priority)) = self.next_ready() else {
            return;
        };
        if let Some(current) = self.running {
            if priority <= self.tasks[current].spec.priority {
                return;
            }
        }
        self.ready.pop();

        if let Some(current) = self.running.take() {
            self.tasks[current].stats.preemptions += 1;
            debug!(
                task = %self.tasks[current].name,
                by   = %self.tasks[next].name,
                "task preempted"
            );
            self.enqueue(current);
        }

        let task = &mut self.tasks[next];
        if !task.started {
            task.started = true;
            task.started_at = now;
        }
        task.state = TaskState::Running;
        self.running = Some(next);
    }

    /// Head of the ready queue, dropping stale entries on the way.
    fn next_ready(&mut self) -> Option<(usize, i32)> {
        while let Some(entry) = self.ready.peek() {
            let task = &self.tasks[entry.id];
            if task.state == TaskState::Ready && task.ticket == entry.seq {
                return Some((entry.id, entry.priority));
            }
            self.ready.pop();
        }
        None
    }

    /// Queue task `id` for the CPU without touching its activation.
    fn enqueue(&mut self, id: usize) {
        let task = &mut self.tasks[id];
        task.state = TaskState::Ready;
        task.ticket = self.ready.push(id, task.spec.priority);
    }

    /// Queue a new activation of task `id`.
    fn release(&mut self, id: usize, released_at: Duration) {
        let task = &mut self.tasks[id];
        task.started = false;
        task.released_at = released_at;
        self.enqueue(id);
    }

    fn report(&self) -> SchedulerReport {
        let mut order: Vec<&TaskControl> = self.tasks.iter().collect();
        order.sort_by_key(|t| std::cmp::Reverse(t.spec.priority));
        SchedulerReport {
            tasks: order
                .into_iter()
                .map(|t| TaskSummary {
                    name: t.name.clone(),
                    priority: t.spec.priority,
                    state: t.state,
                    stats: t.stats,
                })
                .collect(),
        }
    }
}

struct Shared {
    state: Mutex<KernelState>,
    cpu: Condvar,
    clock: Arc<dyn Clock>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, KernelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Park until task `id` holds the CPU.  `false` once shutdown started.
    fn wait_for_cpu(&self, id: usize) -> bool {
        let mut st = self.lock();
        loop {
            if st.shutdown {
                return false;
            }
            if st.running == Some(id) {
                return true;
            }
            st = self.cpu.wait(st).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Park a preempted task until it gets the CPU back.
    fn yield_if_preempted(&self, id: usize) {
        let mut st = self.lock();
        if st.running == Some(id) || st.tasks[id].state != TaskState::Ready {
            return;
        }
        debug!(task = %st.tasks[id].name, "parked at preemption point");
        while st.running != Some(id) && !st.shutdown {
            st = self.cpu.wait(st).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// End of one activation.
    fn complete(&self, id: usize, result: Result<(), TaskError>) {
        let mut st = self.lock();
        let now = self.clock.now();
        let shutting_down = st.shutdown;

        let task = &mut st.tasks[id];
        record_completion(
            &task.name,
            &task.spec,
            &mut task.stats,
            Activation {
                released_at: task.released_at,
                started_at: task.started_at,
                finished_at: now,
            },
        );
        task.started = false;
        let next = match result {
            Ok(()) => {
                task.state = TaskState::Waiting;
                task.pending.take()
            }
            Err(e) => {
                if shutting_down {
                    debug!(task = %task.name, "task stopped during shutdown: {e}");
                } else {
                    error!(task = %task.name, "task failed, terminating: {e}");
                }
                task.pending = None;
                task.state = TaskState::Terminated;
                None
            }
        };

        if let Some(released_at) = next {
            st.release(id, released_at);
        }
        if st.running == Some(id) {
            st.running = None;
        }
        st.dispatch(now);
        drop(st);
        self.cpu.notify_all();
    }

    /// Give up the CPU for the duration of a blocking operation.
    fn suspend(&self, id: usize, reason: BlockReason) {
        let mut st = self.lock();
        st.tasks[id].state = TaskState::Blocked(reason);
        if st.running == Some(id) {
            st.running = None;
        }
        st.dispatch(self.clock.now());
        drop(st);
        self.cpu.notify_all();
    }

    /// Rejoin the ready queue after a blocking operation and wait for the
    /// CPU.  Returns immediately once shutdown started.
    fn resume(&self, id: usize) {
        let mut st = self.lock();
        if st.shutdown {
            st.tasks[id].state = TaskState::Running;
            return;
        }
        st.enqueue(id);
        st.dispatch(self.clock.now());
        self.cpu.notify_all();
        while st.running != Some(id) && !st.shutdown {
            st = self.cpu.wait(st).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Advance every live timer by one tick and release what fired.
    fn on_tick(&self, tick_ms: u64) -> bool {
        let mut st = self.lock();
        if st.shutdown {
            return false;
        }
        let now = self.clock.now();

        let mut released = Vec::new();
        for (id, task) in st.tasks.iter_mut().enumerate() {
            if task.state == TaskState::Terminated || !task.timer.tick(tick_ms) {
                continue;
            }
            match task.state {
                TaskState::Waiting => released.push(id),
                TaskState::Ready if !task.started => {
                    task.stats.collapsed_releases += 1;
                    debug!(
                        task      = %task.name,
                        collapsed = task.stats.collapsed_releases,
                        "release collapsed into queued activation"
                    );
                }
                _ if task.pending.is_some() => {
                    task.stats.collapsed_releases += 1;
                    debug!(
                        task      = %task.name,
                        collapsed = task.stats.collapsed_releases,
                        "release collapsed into pending activation"
                    );
                }
                _ => task.pending = Some(now),
            }
        }
        for id in released {
            st.release(id, now);
        }

        st.dispatch(now);
        drop(st);
        self.cpu.notify_all();
        true
    }
}

// ── Thread binding ────────────────────────────────────────────────────────────

thread_local! {
    static CURRENT: RefCell<Option<(Arc<Shared>, usize)>> = const { RefCell::new(None) };
}

fn current() -> Option<(Arc<Shared>, usize)> {
    CURRENT.with(|c| c.borrow().clone())
}

/// Run `f` as a blocking operation of the current task.
///
/// On a kernel task thread the task is marked `Blocked(reason)` and releases
/// the CPU while `f` runs, then queues for the CPU again before returning.
/// Anywhere else (cyclic executive, tests, plain threads) `f` just runs.
pub fn blocking_section<R>(reason: BlockReason, f: impl FnOnce() -> R) -> R {
    match current() {
        None => f(),
        Some((shared, id)) => {
            shared.suspend(id, reason);
            let out = f();
            shared.resume(id);
            out
        }
    }
}

/// Let a preempted task stop here until it gets the CPU back.
///
/// Long computations call this between chunks of work so a higher-priority
/// task that took the CPU does not share it with them.  Returns at once if
/// the calling task still holds the CPU, and outside the kernel.
pub fn preemption_point() {
    if let Some((shared, id)) = current() {
        shared.yield_if_preempted(id);
    }
}

fn task_main(shared: Arc<Shared>, id: usize, mut work: Work) {
    CURRENT.with(|c| *c.borrow_mut() = Some((Arc::clone(&shared), id)));
    while shared.wait_for_cpu(id) {
        let result = run_contained(|| work());
        shared.complete(id, result);
    }
    CURRENT.with(|c| *c.borrow_mut() = None);
}

fn tick_main(shared: Arc<Shared>, tick: Duration) {
    // whole milliseconds, checked by validate_task_set
    let tick_ms = tick.as_millis() as u64;
    loop {
        shared.clock.sleep(tick);
        if !shared.on_tick(tick_ms) {
            break;
        }
    }
}

// ── PreemptiveKernel ──────────────────────────────────────────────────────────

/// A validated task set, ready to start.
pub struct PreemptiveKernel {
    tasks: Vec<PeriodicTask>,
    tick: Duration,
    clock: Arc<dyn Clock>,
}

impl PreemptiveKernel {
    pub fn new(
        tasks: Vec<PeriodicTask>,
        tick: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SchedulerError> {
        validate_task_set(&tasks, tick)?;
        Ok(Self { tasks, tick, clock })
    }

    /// Spawn the task threads and the tick thread.
    ///
    /// Every task is `Ready` on return; the highest-priority one already
    /// holds the CPU.
    pub fn start(self) -> Result<KernelHandle, SchedulerError> {
        let table: Vec<(&str, &PeriodSpec)> =
            self.tasks.iter().map(|t| (t.name(), t.spec())).collect();
        describe_task_set(SchedulingMode::Preemptive, &table);

        let now = self.clock.now();
        let mut controls = Vec::with_capacity(self.tasks.len());
        let mut works = Vec::with_capacity(self.tasks.len());
        for task in self.tasks {
            let (name, spec, timer, work) = task.into_parts();
            controls.push(TaskControl {
                name,
                spec,
                timer,
                state: TaskState::Waiting,
                stats: TaskStats::default(),
                ticket: 0,
                started: false,
                released_at: now,
                started_at: now,
                pending: None,
            });
            works.push(work);
        }

        let mut state = KernelState {
            tasks: controls,
            ready: ReadyQueue::new(),
            running: None,
            shutdown: false,
        };
        for id in 0..state.tasks.len() {
            state.release(id, now);
        }
        state.dispatch(now);

        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            cpu: Condvar::new(),
            clock: self.clock,
        });

        let mut handle = KernelHandle {
            shared: Arc::clone(&shared),
            tick_thread: None,
            task_threads: Vec::with_capacity(works.len()),
        };

        for (id, work) in works.into_iter().enumerate() {
            let name = shared.lock().tasks[id].name.clone();
            let thread_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("task-{name}"))
                .spawn(move || task_main(thread_shared, id, work));
            match spawned {
                Ok(h) => handle.task_threads.push(h),
                Err(source) => {
                    handle.shutdown();
                    return Err(SchedulerError::Spawn { task: name, source });
                }
            }
        }

        let tick_shared = Arc::clone(&shared);
        let tick = self.tick;
        match thread::Builder::new()
            .name("kernel-tick".into())
            .spawn(move || tick_main(tick_shared, tick))
        {
            Ok(h) => handle.tick_thread = Some(h),
            Err(source) => {
                handle.shutdown();
                return Err(SchedulerError::Spawn {
                    task: "kernel-tick".into(),
                    source,
                });
            }
        }

        info!(threads = handle.task_threads.len() + 1, "preemptive kernel started");
        Ok(handle)
    }
}

// ── KernelHandle ──────────────────────────────────────────────────────────────

/// A running kernel.  Dropping it without [`shutdown`](Self::shutdown)
/// leaves the threads running.
pub struct KernelHandle {
    shared: Arc<Shared>,
    tick_thread: Option<JoinHandle<()>>,
    task_threads: Vec<JoinHandle<()>>,
}

impl KernelHandle {
    /// Live snapshot of every task, highest priority first.
    pub fn report(&self) -> SchedulerReport {
        self.shared.lock().report()
    }

    pub fn state_of(&self, name: &str) -> Option<TaskState> {
        self.shared
            .lock()
            .tasks
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.state)
    }

    /// Stop releasing tasks, wake every thread and join them.
    ///
    /// The report reflects each task as it was when shutdown began.  A task
    /// parked inside a channel operation finishes once its peer's thread
    /// exits and drops the other end.
    pub fn shutdown(self) -> SchedulerReport {
        let report = {
            let mut st = self.shared.lock();
            st.shutdown = true;
            st.report()
        };
        self.shared.cpu.notify_all();
        info!("preemptive kernel shutting down");

        if let Some(h) = self.tick_thread {
            if h.join().is_err() {
                warn!("tick thread panicked");
            }
        }
        for h in self.task_threads {
            let name = h.thread().name().unwrap_or("task").to_string();
            if h.join().is_err() {
                warn!(thread = %name, "task thread panicked");
            }
        }

        let mut st = self.shared.lock();
        for task in &mut st.tasks {
            task.state = TaskState::Terminated;
        }
        report
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::time::Instant;

    use crate::channel::{self, RecvError};
    use crate::clock::MonotonicClock;

    const TICK: Duration = Duration::from_millis(1);

    fn start(tasks: Vec<PeriodicTask>) -> KernelHandle {
        PreemptiveKernel::new(tasks, TICK, Arc::new(MonotonicClock::new()))
            .unwrap()
            .start()
            .unwrap()
    }

    #[test]
    fn higher_priority_runs_first_at_start() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let tasks = [("t2", 2), ("t1", 6)]
            .into_iter()
            .map(|(name, priority)| {
                let log = Arc::clone(&log);
                PeriodicTask::new(name, PeriodSpec::implicit(1_000, priority), move || {
                    log.lock().unwrap().push(name);
                    Ok(())
                })
            })
            .collect();

        let kernel = start(tasks);
        thread::sleep(Duration::from_millis(50));
        let report = kernel.shutdown();

        assert_eq!(*log.lock().unwrap(), vec!["t1", "t2"]);
        assert_eq!(report.tasks[0].name, "t1");
        assert_eq!(report.get("t2").unwrap().stats.activations, 1);
    }

    #[test]
    fn blocked_consumer_does_not_stall_producer() {
        let (tx, rx) = channel::bounded::<u64>(NonZeroUsize::new(4).unwrap());
        let received = Arc::new(AtomicU64::new(0));

        let seen = Arc::clone(&received);
        let consumer = PeriodicTask::new("consumer", PeriodSpec::implicit(5, 5), move || {
            match rx.receive(None) {
                Ok(_) => {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
                Err(RecvError::Disconnected) => Err(TaskError::ChannelClosed {
                    channel: "numbers",
                }),
                Err(e) => Err(TaskError::Failed(e.to_string())),
            }
        });
        let mut n = 0;
        let producer = PeriodicTask::new("producer", PeriodSpec::implicit(5, 1), move || {
            n += 1;
            tx.send(n).map_err(|_| TaskError::ChannelClosed { channel: "numbers" })
        });

        let kernel = start(vec![consumer, producer]);
        thread::sleep(Duration::from_millis(150));
        let report = kernel.shutdown();

        assert!(received.load(Ordering::SeqCst) >= 5);
        assert!(report.get("producer").unwrap().stats.activations >= 5);
        assert_ne!(report.get("consumer").unwrap().state, TaskState::Terminated);
    }

    #[test]
    fn failing_task_is_terminated_without_stopping_others() {
        let ok_runs = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&ok_runs);
        let tasks = vec![
            PeriodicTask::new("broken", PeriodSpec::implicit(2, 9), || {
                Err(TaskError::Failed("sensor offline".into()))
            }),
            PeriodicTask::new("healthy", PeriodSpec::implicit(2, 1), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        ];

        let kernel = start(tasks);
        thread::sleep(Duration::from_millis(60));
        assert_eq!(kernel.state_of("broken"), Some(TaskState::Terminated));
        let report = kernel.shutdown();

        assert_eq!(report.get("broken").unwrap().stats.activations, 1);
        assert!(ok_runs.load(Ordering::SeqCst) > 1);
    }

    #[test]
    fn releases_during_a_long_activation_collapse() {
        let tasks = vec![PeriodicTask::new("slow", PeriodSpec::implicit(2, 1), || {
            thread::sleep(Duration::from_millis(10));
            Ok(())
        })];

        let kernel = start(tasks);
        thread::sleep(Duration::from_millis(80));
        let report = kernel.shutdown();

        let stats = report.get("slow").unwrap().stats;
        assert!(stats.collapsed_releases > 0, "{stats:?}");
        assert!(stats.deadline_misses > 0, "{stats:?}");
    }

    #[test]
    fn shutdown_unblocks_a_task_waiting_on_an_idle_channel() {
        let (tx, rx) = channel::bounded::<u8>(NonZeroUsize::new(1).unwrap());
        let tasks = vec![
            PeriodicTask::new("waiter", PeriodSpec::implicit(10, 2), move || {
                rx.receive(None)
                    .map(|_| ())
                    .map_err(|_| TaskError::ChannelClosed { channel: "idle" })
            }),
            // holds the only sender and never sends
            PeriodicTask::new("owner", PeriodSpec::implicit(10, 1), move || {
                assert!(tx.is_empty());
                Ok(())
            }),
        ];

        let kernel = start(tasks);
        thread::sleep(Duration::from_millis(80));
        assert_eq!(
            kernel.state_of("waiter"),
            Some(TaskState::Blocked(BlockReason::ChannelEmpty))
        );

        let report = kernel.shutdown();
        let waiter = report.get("waiter").unwrap();
        assert_eq!(waiter.state, TaskState::Blocked(BlockReason::ChannelEmpty));
        assert!(waiter.stats.collapsed_releases > 0);
        assert!(report.get("owner").unwrap().stats.activations >= 1);
    }

    fn spin_for(d: Duration) {
        let until = Instant::now() + d;
        while Instant::now() < until {
            std::hint::spin_loop();
        }
    }

    #[test]
    fn higher_priority_release_preempts_a_long_activation() {
        let high_runs = Arc::new(AtomicU64::new(0));
        let during_low = Arc::new(AtomicU64::new(u64::MAX));

        let counter = Arc::clone(&high_runs);
        let high = PeriodicTask::new("high", PeriodSpec::implicit(5, 9), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let seen = Arc::clone(&high_runs);
        let result = Arc::clone(&during_low);
        let mut first = true;
        let low = PeriodicTask::new("low", PeriodSpec::implicit(1_000, 1), move || {
            if first {
                first = false;
                let before = seen.load(Ordering::SeqCst);
                spin_for(Duration::from_millis(150));
                result.store(seen.load(Ordering::SeqCst) - before, Ordering::SeqCst);
            }
            Ok(())
        });

        let kernel = start(vec![low, high]);
        thread::sleep(Duration::from_millis(250));
        let report = kernel.shutdown();

        let during = during_low.load(Ordering::SeqCst);
        assert_ne!(during, u64::MAX, "low never finished its activation");
        assert!(during >= 5, "high ran {during} times during low's activation");
        assert!(report.get("low").unwrap().stats.preemptions >= 5);
        assert_eq!(report.get("high").unwrap().stats.preemptions, 0);
    }

    #[test]
    fn preempted_task_parks_at_preemption_point() {
        let low_steps = Arc::new(AtomicU64::new(0));
        let max_overlap = Arc::new(AtomicU64::new(0));
        let high_runs = Arc::new(AtomicU64::new(0));
        let low_done = Arc::new(AtomicBool::new(false));

        let steps = Arc::clone(&low_steps);
        let overlap = Arc::clone(&max_overlap);
        let runs = Arc::clone(&high_runs);
        let done = Arc::clone(&low_done);
        let high = PeriodicTask::new("high", PeriodSpec::implicit(5, 9), move || {
            if done.load(Ordering::SeqCst) {
                return Ok(());
            }
            let before = steps.load(Ordering::SeqCst);
            spin_for(Duration::from_millis(2));
            let after = steps.load(Ordering::SeqCst);
            // at most the step already past its preemption point finishes
            overlap.fetch_max(after - before, Ordering::SeqCst);
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let steps = Arc::clone(&low_steps);
        let done = Arc::clone(&low_done);
        let mut first = true;
        let low = PeriodicTask::new("low", PeriodSpec::implicit(1_000, 1), move || {
            if first {
                first = false;
                let until = Instant::now() + Duration::from_millis(100);
                while Instant::now() < until {
                    preemption_point();
                    spin_for(Duration::from_micros(50));
                    steps.fetch_add(1, Ordering::SeqCst);
                }
                done.store(true, Ordering::SeqCst);
            }
            Ok(())
        });

        let kernel = start(vec![low, high]);
        thread::sleep(Duration::from_millis(200));
        kernel.shutdown();

        assert!(low_done.load(Ordering::SeqCst));
        assert!(low_steps.load(Ordering::SeqCst) > 0);
        assert!(high_runs.load(Ordering::SeqCst) >= 3);
        assert!(max_overlap.load(Ordering::SeqCst) <= 1);
    }

    #[test]
    fn release_while_queued_collapses_into_the_queued_activation() {
        let runs = Arc::new(Mutex::new(Vec::new()));

        let hog = PeriodicTask::new("hog", PeriodSpec::implicit(1_000, 9), || {
            thread::sleep(Duration::from_millis(35));
            Ok(())
        });
        let log = Arc::clone(&runs);
        let victim = PeriodicTask::new("victim", PeriodSpec::implicit(10, 1), move || {
            log.lock().unwrap().push(Instant::now());
            Ok(())
        });

        let kernel = start(vec![hog, victim]);
        thread::sleep(Duration::from_millis(80));
        let report = kernel.shutdown();

        let runs = runs.lock().unwrap();
        assert!(runs.len() >= 2, "victim ran {} times", runs.len());
        let gap = runs[1] - runs[0];
        assert!(gap >= Duration::from_millis(2), "back-to-back runs, gap {gap:?}");
        assert!(report.get("victim").unwrap().stats.collapsed_releases >= 2);
    }

    #[test]
    fn producer_on_a_full_channel_is_blocked_while_others_run() {
        let (tx, rx) = channel::bounded::<u32>(NonZeroUsize::new(1).unwrap());
        let ticks = Arc::new(AtomicU64::new(0));

        let mut n = 0;
        let producer = PeriodicTask::new("producer", PeriodSpec::implicit(5, 3), move || {
            n += 1;
            tx.send(n).map_err(|_| TaskError::ChannelClosed { channel: "full" })
        });
        // holds the only receiver and never drains it
        let sink = PeriodicTask::new("sink", PeriodSpec::implicit(10, 1), move || {
            assert!(rx.len() <= 1);
            Ok(())
        });
        let counter = Arc::clone(&ticks);
        let ticker = PeriodicTask::new("ticker", PeriodSpec::implicit(5, 2), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let kernel = start(vec![producer, sink, ticker]);
        thread::sleep(Duration::from_millis(40));
        assert_eq!(
            kernel.state_of("producer"),
            Some(TaskState::Blocked(BlockReason::ChannelFull))
        );
        let seen = ticks.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(40));
        assert!(ticks.load(Ordering::SeqCst) > seen);

        let report = kernel.shutdown();
        assert_eq!(report.get("producer").unwrap().stats.activations, 1);
        assert_ne!(report.get("ticker").unwrap().state, TaskState::Terminated);
    }

    #[test]
    fn preemption_point_outside_the_kernel_returns() {
        preemption_point();
    }

    #[test]
    fn blocking_section_outside_the_kernel_just_runs() {
        assert_eq!(blocking_section(BlockReason::SensorUnavailable, || 7), 7);
    }
}
