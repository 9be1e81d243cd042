//! Cooperative task scheduler.
//!
//! One timer per bridge task, polled from the main loop.  Each poll fires
//! every due task exactly once, in a fixed priority order, through the
//! [`TaskRunner`] callback:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  main loop:  now = clock.now_ms()                            │
//! │              scheduler.poll(now, &mut runner)                │
//! │                                                              │
//! │   LinkCheck ─▶ PublisherService ─▶ SensorSample ─▶ BusRead   │
//! │                                                 ─▶ Publish   │
//! │        (each only if now - last_fired >= interval)           │
//! │                                                              │
//! │                          ▼                                   │
//! │                TaskRunner::run(task, now)                    │
//! │                (BridgeService::run_task)                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A fired timer records `now` as its last fire time, not the time it
//! was due.  Under load the intervals stretch; a late poll never
//! produces a burst of back-to-back fires.
//!
//! Timestamps are wrapping `u32` milliseconds (the device uptime counter
//! rolls over after ~49.7 days); elapsed time is computed with
//! `wrapping_sub` so the rollover is invisible.

use log::{info, trace};

use crate::app::ports::TaskRunner;
use crate::config::BridgeConfig;

// ═══════════════════════════════════════════════════════════════
//  Task identities
// ═══════════════════════════════════════════════════════════════

/// The bridge's periodic activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    /// Check the network link, reconnect when down.
    LinkCheck,
    /// Service the publish client, reconnect when disconnected.
    PublisherService,
    /// Sample the load cell and forward the reading to the peer.
    SensorSample,
    /// Drain the RS-485 receive buffer.
    BusRead,
    /// Push the telemetry store to the publish client.
    Publish,
}

impl TaskId {
    /// Order in which due tasks fire within one poll.
    pub const PRIORITY_ORDER: [TaskId; 5] = [
        TaskId::LinkCheck,
        TaskId::PublisherService,
        TaskId::SensorSample,
        TaskId::BusRead,
        TaskId::Publish,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::LinkCheck => "link-check",
            Self::PublisherService => "publisher-service",
            Self::SensorSample => "sensor-sample",
            Self::BusRead => "bus-read",
            Self::Publish => "publish",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::LinkCheck => 0,
            Self::PublisherService => 1,
            Self::SensorSample => 2,
            Self::BusRead => 3,
            Self::Publish => 4,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Timers
// ═══════════════════════════════════════════════════════════════

/// Interval bookkeeping for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTimer {
    /// Minimum time between fires.  Zero fires on every poll.
    pub interval_ms: u32,
    /// Clock reading at the most recent fire (or at construction).
    pub last_fired_ms: u32,
    /// Total number of fires.
    pub fire_count: u32,
}

impl TaskTimer {
    pub fn new(interval_ms: u32, now_ms: u32) -> Self {
        Self {
            interval_ms,
            last_fired_ms: now_ms,
            fire_count: 0,
        }
    }

    /// Whether at least one full interval has elapsed since the last fire.
    pub fn is_due(&self, now_ms: u32) -> bool {
        now_ms.wrapping_sub(self.last_fired_ms) >= self.interval_ms
    }

    fn mark_fired(&mut self, now_ms: u32) {
        self.last_fired_ms = now_ms;
        self.fire_count = self.fire_count.wrapping_add(1);
    }
}

/// Per-task interval table, indexed by [`TaskId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskIntervals {
    pub link_check_ms: u32,
    pub publisher_service_ms: u32,
    pub sensor_sample_ms: u32,
    pub bus_read_ms: u32,
    pub publish_ms: u32,
}

impl TaskIntervals {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            link_check_ms: config.link_check_interval_ms,
            publisher_service_ms: config.publisher_service_interval_ms,
            sensor_sample_ms: config.sensor_sample_interval_ms,
            bus_read_ms: config.bus_read_interval_ms,
            publish_ms: config.publish_interval_ms,
        }
    }

    pub fn get(&self, task: TaskId) -> u32 {
        match task {
            TaskId::LinkCheck => self.link_check_ms,
            TaskId::PublisherService => self.publisher_service_ms,
            TaskId::SensorSample => self.sensor_sample_ms,
            TaskId::BusRead => self.bus_read_ms,
            TaskId::Publish => self.publish_ms,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// The scheduler engine.
///
/// Knows nothing about what the tasks do: when a timer is due it hands
/// the [`TaskId`] to a [`TaskRunner`], which keeps the scheduler testable
/// on its own.
pub struct Scheduler {
    timers: [TaskTimer; 5],
    polls: u64,
}

impl Scheduler {
    /// Create the timer set.  Every timer starts counting at `now_ms`.
    pub fn new(intervals: TaskIntervals, now_ms: u32) -> Self {
        let timers = TaskId::PRIORITY_ORDER.map(|t| TaskTimer::new(intervals.get(t), now_ms));
        info!(
            "Scheduler: link={}ms publisher={}ms sensor={}ms bus={}ms publish={}ms",
            intervals.link_check_ms,
            intervals.publisher_service_ms,
            intervals.sensor_sample_ms,
            intervals.bus_read_ms,
            intervals.publish_ms
        );
        Self { timers, polls: 0 }
    }

    pub fn from_config(config: &BridgeConfig, now_ms: u32) -> Self {
        Self::new(TaskIntervals::from_config(config), now_ms)
    }

    /// Run one scheduler iteration.
    ///
    /// Fires each due task once, in [`TaskId::PRIORITY_ORDER`], and
    /// returns the number of tasks fired.  Never loops to catch up.
    pub fn poll(&mut self, now_ms: u32, runner: &mut dyn TaskRunner) -> usize {
        self.polls = self.polls.wrapping_add(1);
        let mut fired = 0;
        for task in TaskId::PRIORITY_ORDER {
            let timer = &mut self.timers[task.index()];
            if !timer.is_due(now_ms) {
                continue;
            }
            timer.mark_fired(now_ms);
            trace!("Scheduler: {} fired at {}ms", task.label(), now_ms);
            runner.run(task, now_ms);
            fired += 1;
        }
        fired
    }

    pub fn timer(&self, task: TaskId) -> &TaskTimer {
        &self.timers[task.index()]
    }

    pub fn fire_count(&self, task: TaskId) -> u32 {
        self.timers[task.index()].fire_count
    }

    /// Number of `poll` calls so far.
    pub fn polls(&self) -> u64 {
        self.polls
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
