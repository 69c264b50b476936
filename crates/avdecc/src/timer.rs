// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Clock and countdown timers
//!
//! Timers count in per-timer units (centiseconds for the advertise pair
//! gap, 2-second ticks for re-advertise and discovery). Expiry is reported
//! once per arming: the first `expired()` call after the deadline returns
//! true and disarms the timer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic millisecond clock
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin
    fn now_ms(&self) -> u64;
}

/// Wall clock backed by `Instant`
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Clock with origin at the moment of creation
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Manually advanced clock
///
/// Clones share the same time, so a test keeps one handle and gives
/// another to the engine.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Clock starting at 0 ms
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward
    pub fn advance_ms(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    /// Jump to an absolute time
    pub fn set_ms(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Named engine timers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Gap between the two frames of an advertise/depart pair
    SdpAdvertise = 0,
    /// Time until the next advertise cycle
    SdpReadvertise = 1,
    /// 2-second discovery tick
    SdpDiscovery = 2,
}

const TIMER_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
struct Timer {
    unit_ms: u64,
    deadline: Option<u64>,
}

/// Bounded set of countdown timers over a [`Clock`]
#[derive(Debug)]
pub struct TimerService<C: Clock> {
    clock: C,
    timers: [Timer; TIMER_COUNT],
}

impl<C: Clock> TimerService<C> {
    /// All timers uninitialised (unit 1 ms) and stopped
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            timers: [Timer {
                unit_ms: 1,
                deadline: None,
            }; TIMER_COUNT],
        }
    }

    /// Current time from the underlying clock
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Underlying clock
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Set the tick unit of a timer and stop it
    pub fn init(&mut self, timer: TimerId, unit_ms: u64) {
        self.timers[timer as usize] = Timer {
            unit_ms: unit_ms.max(1),
            deadline: None,
        };
    }

    /// Arm a timer for `ticks` units from now
    pub fn start(&mut self, timer: TimerId, ticks: u32) {
        let now = self.clock.now_ms();
        let t = &mut self.timers[timer as usize];
        t.deadline = Some(now.saturating_add(t.unit_ms.saturating_mul(u64::from(ticks))));
    }

    /// Disarm a timer
    pub fn stop(&mut self, timer: TimerId) {
        self.timers[timer as usize].deadline = None;
    }

    /// True if the timer is armed
    pub fn is_running(&self, timer: TimerId) -> bool {
        self.timers[timer as usize].deadline.is_some()
    }

    /// True once when the deadline has passed; the timer is then disarmed
    pub fn expired(&mut self, timer: TimerId) -> bool {
        let now = self.clock.now_ms();
        let t = &mut self.timers[timer as usize];
        match t.deadline {
            Some(deadline) if now >= deadline => {
                t.deadline = None;
                true
            }
            _ => false,
        }
    }
}
