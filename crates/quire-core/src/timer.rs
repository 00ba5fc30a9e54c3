//! Scheduled-task handles backed by parked worker threads.
//!
//! Two primitives cover every periodic concern in the workspace:
//!
//! - [`DebounceTimer`] fires its callback once after a quiescence window;
//!   restarting while armed replaces the pending fire (restart-cancels-pending).
//! - [`IntervalTimer`] fires its callback on a fixed period until stopped.
//!
//! Both own a single worker thread that parks on a condvar between fires.
//! Dropping a handle shuts the worker down and joins it, so no periodic work
//! outlives its owner.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

struct DebounceState {
    deadline: Option<Instant>,
    shutdown: bool,
}

struct DebounceShared {
    state: Mutex<DebounceState>,
    signal: Condvar,
}

/// One-shot timer with restart semantics.
///
/// The callback runs on the timer's worker thread. Callers that need the
/// result on their own thread should have the callback post through a channel.
pub struct DebounceTimer {
    shared: Arc<DebounceShared>,
    worker: Option<JoinHandle<()>>,
}

impl DebounceTimer {
    /// Spawns the worker thread. The timer starts disarmed.
    pub fn new<F>(name: &str, callback: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let shared = Arc::new(DebounceShared {
            state: Mutex::new(DebounceState {
                deadline: None,
                shutdown: false,
            }),
            signal: Condvar::new(),
        });

        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name(format!("debounce-{name}"))
            .spawn(move || loop {
                {
                    let mut state = worker_shared.state.lock();
                    loop {
                        if state.shutdown {
                            return;
                        }
                        match state.deadline {
                            None => {
                                worker_shared.signal.wait(&mut state);
                            }
                            Some(deadline) => {
                                let now = Instant::now();
                                if now >= deadline {
                                    state.deadline = None;
                                    break;
                                }
                                worker_shared
                                    .signal
                                    .wait_for(&mut state, deadline - now);
                            }
                        }
                    }
                }
                callback();
            })
            .expect("spawn debounce worker");

        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Arms the timer to fire after `delay`, replacing any pending fire.
    pub fn restart(&self, delay: Duration) {
        let mut state = self.shared.state.lock();
        state.deadline = Some(Instant::now() + delay);
        self.shared.signal.notify_one();
    }

    /// Disarms the timer without firing.
    pub fn cancel(&self) {
        let mut state = self.shared.state.lock();
        state.deadline = None;
        self.shared.signal.notify_one();
    }

    /// Returns true if a fire is currently pending.
    pub fn is_armed(&self) -> bool {
        self.shared.state.lock().deadline.is_some()
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            self.shared.signal.notify_one();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl std::fmt::Debug for DebounceTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebounceTimer")
            .field("armed", &self.is_armed())
            .finish()
    }
}

struct IntervalState {
    running: bool,
    shutdown: bool,
}

struct IntervalShared {
    state: Mutex<IntervalState>,
    signal: Condvar,
}

/// Repeating timer with start/stop control.
pub struct IntervalTimer {
    shared: Arc<IntervalShared>,
    worker: Option<JoinHandle<()>>,
}

impl IntervalTimer {
    /// Spawns the worker thread. The timer starts stopped.
    pub fn new<F>(name: &str, period: Duration, callback: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let shared = Arc::new(IntervalShared {
            state: Mutex::new(IntervalState {
                running: false,
                shutdown: false,
            }),
            signal: Condvar::new(),
        });

        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name(format!("interval-{name}"))
            .spawn(move || loop {
                {
                    let mut state = worker_shared.state.lock();
                    while !state.shutdown && !state.running {
                        worker_shared.signal.wait(&mut state);
                    }
                    if state.shutdown {
                        return;
                    }
                    let timed_out = worker_shared
                        .signal
                        .wait_for(&mut state, period)
                        .timed_out();
                    if state.shutdown {
                        return;
                    }
                    if !timed_out || !state.running {
                        // Woken by start/stop churn; re-evaluate before firing.
                        continue;
                    }
                }
                callback();
            })
            .expect("spawn interval worker");

        Self {
            shared,
            worker: Some(worker),
        }
    }

    pub fn start(&self) {
        let mut state = self.shared.state.lock();
        state.running = true;
        self.shared.signal.notify_one();
    }

    pub fn stop(&self) {
        let mut state = self.shared.state.lock();
        state.running = false;
        self.shared.signal.notify_one();
    }
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            self.shared.signal.notify_one();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl std::fmt::Debug for IntervalTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalTimer")
            .field("running", &self.shared.state.lock().running)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn debounce_fires_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let timer = DebounceTimer::new("test", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        timer.restart(Duration::from_millis(30));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        std::thread::sleep(Duration::from_millis(120));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn debounce_restart_replaces_pending_fire() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let timer = DebounceTimer::new("test", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        timer.restart(Duration::from_millis(60));
        std::thread::sleep(Duration::from_millis(30));
        timer.restart(Duration::from_millis(60));
        std::thread::sleep(Duration::from_millis(30));
        // The original deadline has passed but the restart superseded it.
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn debounce_cancel_suppresses_fire() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let timer = DebounceTimer::new("test", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        timer.restart(Duration::from_millis(30));
        timer.cancel();
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!timer.is_armed());
    }

    #[test]
    fn interval_ticks_repeatedly_until_stopped() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let timer = IntervalTimer::new("test", Duration::from_millis(20), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        timer.start();
        std::thread::sleep(Duration::from_millis(130));
        timer.stop();
        let ticks = fired.load(Ordering::SeqCst);
        assert!(ticks >= 2, "expected repeated ticks, got {ticks}");

        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(fired.load(Ordering::SeqCst), ticks);
    }

    #[test]
    fn drop_joins_worker_without_firing() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let timer = DebounceTimer::new("test", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        timer.restart(Duration::from_millis(200));
        drop(timer);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
