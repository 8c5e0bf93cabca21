//! Frame-rate guard
//!
//! A stalled host (sustained low frame rate) cannot produce trustworthy
//! closure timings. The guard watches inter-frame intervals, forces a Danger
//! verdict once the stall has lasted long enough, and asks the capture driver
//! to shut down after a grace delay. It trips at most once per session.

use crate::DmsConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Guard outcome for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardVerdict {
    Nominal,
    /// Fired on this frame; overrides every other verdict
    Tripped,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GuardPhase {
    Armed,
    /// Waiting for the grace delay before requesting shutdown
    Tripped { shutdown_at: f64 },
    /// Shutdown requested; disabled until reset
    Spent,
}

/// Sustained low-fps detector
#[derive(Debug, Clone)]
pub struct FrameRateGuard {
    low_fps_threshold: f64,
    max_low_fps_seconds: f64,
    grace_seconds: f64,
    last_frame_time: Option<f64>,
    /// Accumulated time spent below `low_fps_threshold`
    low_fps_duration: f64,
    instant_fps: Option<f64>,
    phase: GuardPhase,
}

impl FrameRateGuard {
    pub fn new(config: &DmsConfig) -> Self {
        Self {
            low_fps_threshold: config.low_fps_threshold,
            max_low_fps_seconds: config.max_low_fps_seconds,
            grace_seconds: config.shutdown_grace_seconds,
            last_frame_time: None,
            low_fps_duration: 0.0,
            instant_fps: None,
            phase: GuardPhase::Armed,
        }
    }

    /// Account for a frame processed at `now` (seconds)
    pub fn observe(&mut self, now: f64) -> GuardVerdict {
        let Some(last) = self.last_frame_time else {
            self.last_frame_time = Some(now);
            return GuardVerdict::Nominal;
        };

        let delta = now - last;
        if !(delta > 0.0) {
            // Duplicate or out-of-order timestamp
            debug!("Ignoring non-positive frame interval {}", delta);
            return GuardVerdict::Nominal;
        }
        self.last_frame_time = Some(now);

        let fps = 1.0 / delta;
        self.instant_fps = Some(fps);

        if self.phase != GuardPhase::Armed {
            return GuardVerdict::Nominal;
        }

        if fps < self.low_fps_threshold {
            self.low_fps_duration += delta;
        } else {
            self.low_fps_duration = 0.0;
        }

        if self.low_fps_duration >= self.max_low_fps_seconds {
            let shutdown_at = now + self.grace_seconds;
            warn!(
                "Frame rate below {} fps for {:.1}s, shutdown requested in {}s",
                self.low_fps_threshold, self.low_fps_duration, self.grace_seconds
            );
            metrics::counter!("dms_guard_trips_total").increment(1);
            self.phase = GuardPhase::Tripped { shutdown_at };
            return GuardVerdict::Tripped;
        }

        GuardVerdict::Nominal
    }

    /// Returns `true` exactly once, when the grace delay has elapsed
    pub fn poll(&mut self, now: f64) -> bool {
        match self.phase {
            GuardPhase::Tripped { shutdown_at } if now >= shutdown_at => {
                info!("Protective shutdown due");
                self.phase = GuardPhase::Spent;
                true
            }
            _ => false,
        }
    }

    /// Re-arm for a new session
    pub fn reset(&mut self) {
        self.last_frame_time = None;
        self.low_fps_duration = 0.0;
        self.instant_fps = None;
        self.phase = GuardPhase::Armed;
    }

    /// Rate implied by the last positive frame interval
    pub fn instant_fps(&self) -> Option<f64> {
        self.instant_fps
    }

    pub fn low_fps_duration(&self) -> f64 {
        self.low_fps_duration
    }

    pub fn is_armed(&self) -> bool {
        self.phase == GuardPhase::Armed
    }

    /// Pending shutdown deadline, if tripped and not yet delivered
    pub fn shutdown_at(&self) -> Option<f64> {
        match self.phase {
            GuardPhase::Tripped { shutdown_at } => Some(shutdown_at),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> FrameRateGuard {
        FrameRateGuard::new(&DmsConfig::default())
    }

    #[test]
    fn test_trips_after_accumulated_stall() {
        let mut guard = guard();
        let mut verdicts = Vec::new();
        for i in 0..=12 {
            verdicts.push(guard.observe(i as f64 * 0.25));
        }

        // 12 intervals of 0.25 s reach exactly 3 s on the last frame
        assert!(verdicts[..12].iter().all(|v| *v == GuardVerdict::Nominal));
        assert_eq!(verdicts[12], GuardVerdict::Tripped);
        assert_eq!(guard.shutdown_at(), Some(6.0));
        assert_eq!(guard.instant_fps(), Some(4.0));
    }

    #[test]
    fn test_fast_frame_resets_accumulator() {
        let mut guard = guard();
        let mut t = 0.0;
        guard.observe(t);
        for _ in 0..8 {
            t += 0.25;
            guard.observe(t);
        }
        assert!((guard.low_fps_duration() - 2.0).abs() < 1e-9);

        t += 0.01;
        guard.observe(t);
        assert_eq!(guard.low_fps_duration(), 0.0);

        for _ in 0..8 {
            t += 0.25;
            assert_eq!(guard.observe(t), GuardVerdict::Nominal);
        }
    }

    #[test]
    fn test_fires_once_per_session() {
        let mut guard = guard();
        let mut t = 0.0;
        let mut trips = 0;
        let mut shutdowns = 0;
        for _ in 0..100 {
            if guard.observe(t) == GuardVerdict::Tripped {
                trips += 1;
            }
            if guard.poll(t) {
                shutdowns += 1;
            }
            t += 0.3;
        }
        assert_eq!(trips, 1);
        assert_eq!(shutdowns, 1);
        assert!(!guard.is_armed());

        guard.reset();
        assert!(guard.is_armed());
        assert_eq!(guard.instant_fps(), None);
    }

    #[test]
    fn test_poll_waits_for_grace() {
        let mut guard = guard();
        for i in 0..=12 {
            guard.observe(i as f64 * 0.25);
        }
        assert!(!guard.poll(5.9));
        assert!(guard.poll(6.0));
        assert!(!guard.poll(7.0));
    }

    #[test]
    fn test_non_positive_interval_ignored() {
        let mut guard = guard();
        guard.observe(1.0);
        assert_eq!(guard.observe(1.0), GuardVerdict::Nominal);
        assert_eq!(guard.observe(0.5), GuardVerdict::Nominal);
        assert_eq!(guard.instant_fps(), None);

        guard.observe(1.1);
        assert!((guard.instant_fps().unwrap() - 10.0).abs() < 1e-9);
    }
}
