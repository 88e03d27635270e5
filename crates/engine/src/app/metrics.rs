use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    /// Scheduler ticks per second, including paused and finished ticks.
    pub tps: f32,
    /// Ticks per second in which robots actually ran.
    pub steps_per_second: f32,
    pub frame_time_ms: f32,
}

/// Per-interval counters for the window loop. Emits one snapshot per elapsed interval.
#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    frames: u32,
    ticks: u32,
    actor_ticks: u32,
    frame_time_sum: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval_start: now,
            interval,
            frames: 0,
            ticks: 0,
            actor_ticks: 0,
            frame_time_sum: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
    }

    pub(crate) fn record_tick(&mut self, actors_updated: bool) {
        self.ticks = self.ticks.saturating_add(1);
        if actors_updated {
            self.actor_ticks = self.actor_ticks.saturating_add(1);
        }
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = if self.frames == 0 {
            0.0
        } else {
            self.frame_time_sum.as_secs_f32() * 1000.0 / self.frames as f32
        };
        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / seconds,
            tps: self.ticks as f32 / seconds,
            steps_per_second: self.actor_ticks as f32 / seconds,
            frame_time_ms,
        };

        *self = Self::new(self.interval, now);
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_separates_actor_ticks_from_idle_ticks() {
        let base = Instant::now();
        let mut metrics = MetricsAccumulator::new(Duration::from_secs(1), base);

        metrics.record_frame(Duration::from_millis(20));
        metrics.record_frame(Duration::from_millis(10));
        metrics.record_tick(true);
        metrics.record_tick(true);
        metrics.record_tick(false);

        let snapshot = metrics
            .maybe_snapshot(base + Duration::from_secs(1))
            .expect("snapshot after interval");

        assert!((snapshot.fps - 2.0).abs() < 0.01);
        assert!((snapshot.tps - 3.0).abs() < 0.01);
        assert!((snapshot.steps_per_second - 2.0).abs() < 0.01);
        assert!((snapshot.frame_time_ms - 15.0).abs() < 0.001);
    }

    #[test]
    fn no_snapshot_before_interval_and_counters_reset_after() {
        let base = Instant::now();
        let mut metrics = MetricsAccumulator::new(Duration::from_secs(1), base);
        metrics.record_tick(true);

        assert!(metrics
            .maybe_snapshot(base + Duration::from_millis(400))
            .is_none());
        assert!(metrics
            .maybe_snapshot(base + Duration::from_secs(1))
            .is_some());

        let empty = metrics
            .maybe_snapshot(base + Duration::from_secs(2))
            .expect("second interval");
        assert_eq!(empty.tps, 0.0);
    }
}
