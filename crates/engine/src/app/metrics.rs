use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Loop health over one reporting window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub tps: f32,
    pub mean_tick_ms: f32,
    pub worst_tick_ms: f32,
    /// Frames whose backlog overflowed `max_ticks_per_frame`.
    pub clamped_frames: u32,
    pub dropped_backlog_ms: u64,
    pub hard_resets: u32,
    pub entity_count: usize,
}

/// Latest published window, readable while the loop runs.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle(Arc<RwLock<LoopMetricsSnapshot>>);

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        *self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}

#[derive(Debug)]
pub(crate) struct LoopStats {
    window: Duration,
    window_start: Instant,
    ticks: u32,
    busy: Duration,
    worst_tick: Duration,
    clamped_frames: u32,
    dropped_backlog: Duration,
    hard_resets: u32,
}

impl LoopStats {
    pub(crate) fn new(window: Duration, now: Instant) -> Self {
        Self {
            window,
            window_start: now,
            ticks: 0,
            busy: Duration::ZERO,
            worst_tick: Duration::ZERO,
            clamped_frames: 0,
            dropped_backlog: Duration::ZERO,
            hard_resets: 0,
        }
    }

    pub(crate) fn record_tick(&mut self, elapsed: Duration) {
        self.ticks = self.ticks.saturating_add(1);
        self.busy = self.busy.saturating_add(elapsed);
        self.worst_tick = self.worst_tick.max(elapsed);
    }

    pub(crate) fn record_clamp(&mut self, dropped: Duration) {
        self.clamped_frames = self.clamped_frames.saturating_add(1);
        self.dropped_backlog = self.dropped_backlog.saturating_add(dropped);
    }

    pub(crate) fn record_hard_reset(&mut self) {
        self.hard_resets = self.hard_resets.saturating_add(1);
    }

    /// Closes the window once it has run its length and starts a new one.
    pub(crate) fn flush(&mut self, now: Instant, entity_count: usize) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return None;
        }

        let mean_tick = self.busy.checked_div(self.ticks).unwrap_or_default();
        let snapshot = LoopMetricsSnapshot {
            tps: self.ticks as f32 / elapsed.as_secs_f32().max(f32::EPSILON),
            mean_tick_ms: millis(mean_tick),
            worst_tick_ms: millis(self.worst_tick),
            clamped_frames: self.clamped_frames,
            dropped_backlog_ms: self.dropped_backlog.as_millis() as u64,
            hard_resets: self.hard_resets,
            entity_count,
        };
        *self = Self::new(self.window, now);
        Some(snapshot)
    }
}

fn millis(duration: Duration) -> f32 {
    duration.as_secs_f32() * 1000.0
}
