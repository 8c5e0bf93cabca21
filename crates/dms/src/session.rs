//! Driver monitoring session
//!
//! [`DmsSession`] owns every piece of per-session state: feature extraction,
//! the calibration warm-up, temporal windows, the alert state machine, the
//! frame-rate guard and the alarm latch. A capture driver feeds it one
//! [`Frame`] at a time through [`DmsSession::process_frame`] and reads the
//! results back through the accessors.

use crate::aggregator::{ChartPoint, TemporalAggregator};
use crate::analysis::{Frame, FrameReport, SessionMetrics, SessionSummary};
use crate::calibration::{CalibrationController, CalibrationPhase};
use crate::config::ClosureTiming;
use crate::guard::{FrameRateGuard, GuardVerdict};
use crate::machine::{AlertInputs, AlertStateMachine};
use crate::state::{AlertCause, AlertState, AlertStatus};
use crate::{DmsConfig, DmsError};
use alerting::AlarmLatch;
use feature_engine::{FeatureExtractor, FeatureSample, HeadPoseEstimator};
use tracing::{debug, info};

/// Callback invoked when the frame-rate guard asks for capture to stop
pub type ShutdownListener = Box<dyn FnMut() + Send>;

pub struct DmsSession {
    config: DmsConfig,
    extractor: FeatureExtractor,
    calibration: CalibrationController,
    aggregator: TemporalAggregator,
    machine: AlertStateMachine,
    guard: FrameRateGuard,
    latch: AlarmLatch,
    shutdown_listeners: Vec<ShutdownListener>,

    capture_active: bool,
    status: AlertStatus,
    /// Timestamp of the frame that completed calibration
    origin: Option<f64>,
    /// Frames since `origin`
    frame_count: u64,
    last_timestamp: Option<f64>,
    /// Features of the last frame, `None` if it had no face
    last_sample: Option<FeatureSample>,
    closed_seconds: f64,
}

impl DmsSession {
    /// Create an idle session using the viewport pose heuristic
    pub fn new(config: DmsConfig) -> Result<Self, DmsError> {
        config.validate()?;
        let extractor = FeatureExtractor::new(&config.features)?;
        Self::build(config, extractor)
    }

    /// Create an idle session with a custom pose estimator
    pub fn with_estimator(
        config: DmsConfig,
        estimator: Box<dyn HeadPoseEstimator>,
    ) -> Result<Self, DmsError> {
        config.validate()?;
        let extractor = FeatureExtractor::with_estimator(config.features.eyes, estimator);
        Self::build(config, extractor)
    }

    fn build(config: DmsConfig, extractor: FeatureExtractor) -> Result<Self, DmsError> {
        let calibration_frames = config.calibration_frames()?;
        info!(
            "DMS session created: {} calibration frames, pose estimator '{}'",
            calibration_frames,
            extractor.estimator_name()
        );
        Ok(Self {
            calibration: CalibrationController::new(calibration_frames),
            aggregator: TemporalAggregator::new(&config)?,
            machine: AlertStateMachine::new((&config).into()),
            guard: FrameRateGuard::new(&config),
            latch: AlarmLatch::new(),
            shutdown_listeners: Vec::new(),
            capture_active: false,
            status: AlertStatus::default(),
            origin: None,
            frame_count: 0,
            last_timestamp: None,
            last_sample: None,
            closed_seconds: 0.0,
            extractor,
            config,
        })
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    /// Capture started: clear the session and enter calibration
    pub fn start(&mut self, now: f64) {
        self.reset_session();
        self.capture_active = true;
        self.calibration.start();
        self.last_timestamp = Some(now);
        self.status = self.calibrating_cause().into();
        info!("Capture started at {:.3}s", now);
    }

    /// Capture stopped: silence the alarm and disarm the guard
    ///
    /// The chart series and counters are kept for the summary.
    pub fn stop(&mut self) {
        if !self.capture_active {
            return;
        }
        self.capture_active = false;
        self.latch.force_stop();
        self.guard.reset();
        self.status = AlertStatus::default();
        info!(
            "Capture stopped after {} frames, {} alarm(s)",
            self.frame_count,
            self.latch.activations()
        );
    }

    /// Drop every window, counter and the calibration; capture goes idle
    pub fn reset_session(&mut self) {
        self.latch.reset();
        self.calibration.reset();
        self.aggregator.reset();
        self.guard.reset();
        self.capture_active = false;
        self.status = AlertStatus::default();
        self.origin = None;
        self.frame_count = 0;
        self.last_timestamp = None;
        self.last_sample = None;
        self.closed_seconds = 0.0;
        debug!("Session reset");
    }

    pub fn is_capture_active(&self) -> bool {
        self.capture_active
    }

    /// Subscribe to alarm start (`true`) and stop (`false`) edges
    pub fn on_alarm_edge<F>(&mut self, callback: F)
    where
        F: FnMut(bool) + Send + 'static,
    {
        self.latch.subscribe(Box::new(callback));
    }

    /// Subscribe to the frame-rate guard's shutdown request
    pub fn on_protective_shutdown_requested<F>(&mut self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.shutdown_listeners.push(Box::new(callback));
    }

    /// Consume one frame
    pub fn process_frame(&mut self, frame: &Frame) -> FrameReport {
        if !self.capture_active {
            debug!("Frame at {:.3}s ignored, capture inactive", frame.timestamp);
            return FrameReport::ignored(self.status.clone());
        }
        metrics::counter!("dms_frames_processed_total").increment(1);

        let now = frame.timestamp;
        self.last_timestamp = Some(now);
        let verdict = self.guard.observe(now);
        let mut alarm_edge = None;

        let cause = match (frame.face(), verdict) {
            // A trip bypasses every other check for this frame
            (face, GuardVerdict::Tripped) => {
                let sample = face.map(|landmarks| self.extractor.extract(landmarks, now));
                self.last_sample = sample;
                AlertCause::StalledPipeline
            }
            (None, GuardVerdict::Nominal) => {
                self.last_sample = None;
                self.closed_seconds = 0.0;
                AlertCause::NoFace
            }
            (Some(landmarks), GuardVerdict::Nominal) => {
                let sample = self.extractor.extract(landmarks, now);
                self.last_sample = Some(sample);

                if self.calibration.is_complete() {
                    let cause = self.classify(&sample, now);
                    if let Some(demand) = cause.alarm_demand() {
                        alarm_edge = self.latch.update(demand);
                    }
                    cause
                } else {
                    if self.calibration.on_qualifying_frame() {
                        self.origin = Some(now);
                        self.frame_count = 0;
                    }
                    self.calibrating_cause()
                }
            }
        };
        self.set_status(cause);

        let shutdown_requested = self.poll(now);

        FrameReport {
            processed: true,
            status: self.status.clone(),
            sample: self.last_sample,
            fps: self.guard.instant_fps(),
            closed_seconds: self.closed_seconds,
            alarm_edge,
            shutdown_requested,
        }
    }

    /// Calibrated frame with a face: update windows and run the machine
    fn classify(&mut self, sample: &FeatureSample, now: f64) -> AlertCause {
        self.frame_count += 1;

        let closed = sample.eye_aspect_ratio < self.config.ear_threshold;
        let update = self.aggregator.record(closed, self.frame_count, now);
        self.closed_seconds = self.closed_run_seconds(update.closed_frames, now);

        let perclos = self.aggregator.perclos().unwrap_or(0.0);
        metrics::gauge!("dms_perclos").set(perclos);

        let elapsed = self.elapsed_seconds(now);
        self.aggregator.maybe_snapshot(self.frame_count, elapsed);

        debug!(
            "ear {:.3} closed {:.2}s perclos {:.3} fps {:.1}",
            sample.eye_aspect_ratio,
            self.closed_seconds,
            perclos,
            self.guard.instant_fps().unwrap_or(0.0)
        );

        self.machine.evaluate(&AlertInputs {
            sample,
            eyes_closed: closed,
            closed_seconds: self.closed_seconds,
            perclos,
            guard: GuardVerdict::Nominal,
        })
    }

    fn set_status(&mut self, cause: AlertCause) {
        let status = AlertStatus::from(cause);
        if status.level != self.status.level {
            info!("Alert level {} -> {}: {}", self.status.level, status.level, status.message);
        }
        self.status = status;
    }

    fn calibrating_cause(&self) -> AlertCause {
        match self.calibration.phase() {
            CalibrationPhase::NotStarted => AlertCause::Idle,
            _ => AlertCause::Calibrating {
                seconds_left: self.calibration.seconds_left(self.config.assumed_fps),
            },
        }
    }

    fn closed_run_seconds(&self, closed_frames: u32, now: f64) -> f64 {
        match self.config.closure_timing {
            ClosureTiming::AverageFps => self
                .average_fps(now)
                .map(|fps| closed_frames as f64 / fps)
                .unwrap_or(0.0),
            ClosureTiming::WallClock => self.aggregator.closed_run_seconds(now),
        }
    }

    fn elapsed_seconds(&self, now: f64) -> f64 {
        self.origin.map(|origin| (now - origin).max(0.0)).unwrap_or(0.0)
    }

    /// Frames per second since the post-calibration origin
    fn average_fps(&self, now: f64) -> Option<f64> {
        let elapsed = self.elapsed_seconds(now);
        (self.frame_count > 0 && elapsed > 0.0).then(|| self.frame_count as f64 / elapsed)
    }

    /// Deliver a due protective-shutdown request
    ///
    /// Called from `process_frame`; a driver may also call it from a timer
    /// when frames stop arriving. Returns `true` once per guard trip.
    pub fn poll(&mut self, now: f64) -> bool {
        if !self.capture_active || !self.guard.poll(now) {
            return false;
        }
        info!("Requesting protective shutdown");
        for listener in self.shutdown_listeners.iter_mut() {
            listener();
        }
        true
    }

    /// Latest level and message
    pub fn alert_status(&self) -> &AlertStatus {
        &self.status
    }

    pub fn alert_state(&self) -> AlertState {
        AlertState {
            level: self.status.level,
            is_alarm_active: self.latch.is_active(),
        }
    }

    pub fn session_metrics(&self) -> SessionMetrics {
        let now = self.last_timestamp.unwrap_or(0.0);
        let calibrated = self.calibration.is_complete();
        let face = self.last_sample;
        let aggregated = face.is_some() && calibrated;

        SessionMetrics {
            capture_active: self.capture_active,
            calibration: self.calibration.state(),
            elapsed_seconds: self.elapsed_seconds(now),
            total_alarms: self.latch.activations(),
            alarm_active: self.latch.is_active(),
            frame_count: self.frame_count,
            perclos_percent: self
                .aggregator
                .perclos()
                .filter(|_| aggregated)
                .map(|p| p * 100.0),
            blink_rate_bpm: aggregated.then(|| {
                let fps = self.average_fps(now).unwrap_or(0.0);
                self.aggregator.blink_rate(self.frame_count, fps)
            }),
            pitch_deg: face.map(|s| s.pitch_deg),
            yaw_deg: face.map(|s| s.yaw_deg),
            eye_aspect_ratio: face.map(|s| s.eye_aspect_ratio),
            closed_seconds: self.closed_seconds,
            fps: self.guard.instant_fps(),
        }
    }

    /// PERCLOS history; call again to restart from the first point
    pub fn chart_series(&self) -> impl Iterator<Item = ChartPoint> + Clone + '_ {
        self.aggregator.chart().iter().copied()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            metrics: self.session_metrics(),
            status: self.status.clone(),
            chart: self.chart_series().collect(),
            perclos_threshold_percent: self.config.perclos_threshold * 100.0,
        }
    }
}

impl std::fmt::Debug for DmsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DmsSession")
            .field("capture_active", &self.capture_active)
            .field("calibration", &self.calibration.phase())
            .field("status", &self.status.level)
            .field("frame_count", &self.frame_count)
            .field("latch", &self.latch)
            .finish()
    }
}
