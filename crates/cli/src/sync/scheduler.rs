// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Timers and wall-clock time for the connection state machine.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use ul_core::{ClockSource, SystemClock};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// The timers a connection owns. At most one of each is armed at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Repeating keepalive while connected.
    Heartbeat,
    /// One-shot delay before the next connection attempt.
    Reconnect,
}

/// Arms and cancels timers, and tells the time.
///
/// Arming a timer of a kind that is already armed replaces it. Fired
/// timers are delivered back to the connection's `handle_timer`.
pub trait Scheduler: ClockSource {
    /// Fire `timer` once after `delay`.
    fn set_timeout(&mut self, timer: TimerKind, delay: Duration);

    /// Fire `timer` every `period`, first after one period.
    fn set_interval(&mut self, timer: TimerKind, period: Duration);

    /// Disarm `timer`. Disarming an idle timer is a no-op.
    fn cancel(&mut self, timer: TimerKind);
}

/// A fired timer, tagged with the epoch it was armed in.
pub type TimerFired = (TimerKind, u64);

/// Scheduler backed by tokio tasks.
///
/// Every arm bumps an epoch; a fired timer whose epoch is not the current
/// one for its kind was cancelled after it fired and must be ignored.
pub struct TokioScheduler {
    fired: mpsc::UnboundedSender<TimerFired>,
    timers: HashMap<TimerKind, (u64, JoinHandle<()>)>,
    epoch: u64,
    clock: SystemClock,
}

impl TokioScheduler {
    /// Create a scheduler reporting fired timers to `fired`.
    pub fn new(fired: mpsc::UnboundedSender<TimerFired>) -> Self {
        TokioScheduler { fired, timers: HashMap::new(), epoch: 0, clock: SystemClock }
    }

    /// Returns true if `epoch` is the live arming of `timer`.
    pub fn is_current(&self, timer: TimerKind, epoch: u64) -> bool {
        self.timers.get(&timer).is_some_and(|(current, _)| *current == epoch)
    }

    /// Returns true if `timer` is armed.
    pub fn is_armed(&self, timer: TimerKind) -> bool {
        self.timers.get(&timer).is_some_and(|(_, task)| !task.is_finished())
    }

    fn arm(&mut self, timer: TimerKind, period: Duration, repeat: bool) {
        self.cancel(timer);
        self.epoch += 1;
        let epoch = self.epoch;
        let fired = self.fired.clone();

        let task = tokio::spawn(async move {
            if !repeat {
                tokio::time::sleep(period).await;
                let _ = fired.send((timer, epoch));
                return;
            }
            // interval() rejects a zero period
            let period = period.max(MIN_INTERVAL);
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if fired.send((timer, epoch)).is_err() {
                    break;
                }
            }
        });
        self.timers.insert(timer, (epoch, task));
    }
}

impl ClockSource for TokioScheduler {
    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

impl Scheduler for TokioScheduler {
    fn set_timeout(&mut self, timer: TimerKind, delay: Duration) {
        self.arm(timer, delay, false);
    }

    fn set_interval(&mut self, timer: TimerKind, period: Duration) {
        self.arm(timer, period, true);
    }

    fn cancel(&mut self, timer: TimerKind) {
        if let Some((_, task)) = self.timers.remove(&timer) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.timers.values() {
            task.abort();
        }
    }
}
