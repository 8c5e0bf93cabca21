use dms::{AlertCause, AlertLevel, AlertStatus, DmsConfig, DmsError, DmsSession, Frame, FrameReport};
use feature_engine::landmarks::mesh;
use feature_engine::{EyeIndices, HeadPose, HeadPoseEstimator, Landmark, LandmarkSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const OPEN: f64 = 0.35;
const CLOSED: f64 = 0.1;

/// Pose estimator driven by the test
#[derive(Clone, Default)]
struct ScriptedPose(Arc<Mutex<HeadPose>>);

impl HeadPoseEstimator for ScriptedPose {
    fn estimate(&self, _landmarks: &LandmarkSet) -> HeadPose {
        *self.0.lock().unwrap()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Eye contour with EAR = `ear`
fn place_eye(set: &mut LandmarkSet, idx: &EyeIndices, cx: f64, ear: f64) {
    let (cy, w) = (0.4, 0.1);
    let h = ear * w;
    set.set(idx[0], Landmark::new(cx - w / 2.0, cy, 0.0));
    set.set(idx[1], Landmark::new(cx - w / 4.0, cy - h / 2.0, 0.0));
    set.set(idx[2], Landmark::new(cx + w / 4.0, cy - h / 2.0, 0.0));
    set.set(idx[3], Landmark::new(cx + w / 2.0, cy, 0.0));
    set.set(idx[4], Landmark::new(cx + w / 4.0, cy + h / 2.0, 0.0));
    set.set(idx[5], Landmark::new(cx - w / 4.0, cy + h / 2.0, 0.0));
}

fn face(ear: f64) -> LandmarkSet {
    let mut set = LandmarkSet::new(vec![Landmark::default(); mesh::MESH_POINTS]);
    place_eye(&mut set, &mesh::LEFT_EYE, 0.4, ear);
    place_eye(&mut set, &mesh::RIGHT_EYE, 0.6, ear);
    set
}

struct Rig {
    session: DmsSession,
    pose: Arc<Mutex<HeadPose>>,
    edges: Arc<Mutex<Vec<bool>>>,
    shutdowns: Arc<AtomicUsize>,
    frame: u64,
    fps: f64,
}

impl Rig {
    fn new() -> Self {
        Self::with_rate(30.0)
    }

    fn with_rate(fps: f64) -> Self {
        let estimator = ScriptedPose::default();
        let pose = Arc::clone(&estimator.0);
        let mut session =
            DmsSession::with_estimator(DmsConfig::default(), Box::new(estimator)).unwrap();

        let edges = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&edges);
        session.on_alarm_edge(move |active| sink.lock().unwrap().push(active));

        let shutdowns = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&shutdowns);
        session.on_protective_shutdown_requested(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.start(0.0);
        Self {
            session,
            pose,
            edges,
            shutdowns,
            frame: 0,
            fps,
        }
    }

    fn set_pose(&self, pitch_deg: f64, yaw_deg: f64) {
        *self.pose.lock().unwrap() = HeadPose { pitch_deg, yaw_deg };
    }

    fn next_timestamp(&mut self) -> f64 {
        self.frame += 1;
        self.frame as f64 / self.fps
    }

    fn step(&mut self, ear: f64) -> FrameReport {
        let t = self.next_timestamp();
        self.session.process_frame(&Frame::new(t, face(ear)))
    }

    /// Frame at an explicit time; later steps continue from it
    fn step_at(&mut self, t: f64, ear: f64) -> FrameReport {
        self.frame = (t * self.fps).round() as u64;
        self.session.process_frame(&Frame::new(t, face(ear)))
    }

    fn step_no_face(&mut self) -> FrameReport {
        let t = self.next_timestamp();
        self.session.process_frame(&Frame::no_face(t))
    }

    fn run(&mut self, frames: usize, ear: f64) -> FrameReport {
        let mut last = None;
        for _ in 0..frames {
            last = Some(self.step(ear));
        }
        last.unwrap()
    }

    fn calibrate(&mut self) {
        self.run(150, OPEN);
        assert!(self.session.session_metrics().calibration.is_complete);
    }

    fn edges(&self) -> Vec<bool> {
        self.edges.lock().unwrap().clone()
    }
}

#[test]
fn calibration_takes_exact_frame_count_and_suppresses_alerts() {
    let mut rig = Rig::new();
    rig.set_pose(30.0, 0.0);

    for i in 0..150 {
        let report = rig.step(CLOSED);
        assert!(
            matches!(report.status.cause, AlertCause::Calibrating { .. }),
            "frame {i}: {:?}",
            report.status.cause
        );
        assert_eq!(report.level(), AlertLevel::Warning);
    }
    let metrics = rig.session.session_metrics();
    assert!(metrics.calibration.is_complete);
    assert_eq!(metrics.total_alarms, 0);
    assert_eq!(metrics.frame_count, 0);
    assert!(rig.edges().is_empty());

    let report = rig.step(OPEN);
    assert!(matches!(report.status.cause, AlertCause::LookingDown { .. }));
    assert_eq!(rig.edges(), vec![true]);
}

#[test]
fn calibration_message_counts_down() {
    let mut rig = Rig::new();
    let report = rig.run(60, OPEN);
    match report.status.cause {
        AlertCause::Calibrating { seconds_left } => assert!((seconds_left - 3.0).abs() < 1e-9),
        other => panic!("unexpected cause {other:?}"),
    }
    assert!(rig.session.session_metrics().perclos_percent.is_none());
    assert!(rig.session.session_metrics().pitch_deg.is_some());
}

#[test]
fn pitch_outranks_prolonged_closure() {
    let mut rig = Rig::new();
    rig.calibrate();
    rig.run(600, OPEN);

    rig.set_pose(20.0, 0.0);
    let report = rig.run(60, CLOSED);
    assert!(report.closed_seconds > 1.5);
    assert_eq!(report.status.cause, AlertCause::LookingDown { pitch_deg: 20.0 });
    assert_eq!(report.level(), AlertLevel::Danger);

    rig.set_pose(0.0, 0.0);
    let report = rig.step(CLOSED);
    assert!(matches!(report.status.cause, AlertCause::EyesClosed { .. }));
    assert_eq!(report.level(), AlertLevel::Danger);
}

#[test]
fn prolonged_closure_needs_threshold_duration() {
    let mut rig = Rig::new();
    rig.calibrate();
    rig.run(600, OPEN);

    let report = rig.run(30, CLOSED);
    assert_eq!(report.level(), AlertLevel::Safe);

    let report = rig.run(20, CLOSED);
    assert!(matches!(report.status.cause, AlertCause::EyesClosed { seconds } if seconds >= 1.5));

    let report = rig.step(OPEN);
    assert_eq!(report.status.cause, AlertCause::Awake);
    assert_eq!(report.closed_seconds, 0.0);
    assert_eq!(rig.edges(), vec![true, false]);
}

#[test]
fn looking_away_is_a_warning_that_still_alarms() {
    let mut rig = Rig::new();
    rig.calibrate();
    rig.set_pose(0.0, -25.0);

    let report = rig.step(OPEN);
    assert_eq!(report.status.cause, AlertCause::LookingAway { yaw_deg: -25.0 });
    assert_eq!(report.level(), AlertLevel::Warning);
    assert!(rig.session.alert_state().is_alarm_active);
}

#[test]
fn sustained_danger_counts_one_alarm() {
    let mut rig = Rig::new();
    rig.calibrate();

    rig.set_pose(20.0, 0.0);
    rig.run(50, OPEN);
    assert_eq!(rig.session.session_metrics().total_alarms, 1);
    assert_eq!(rig.edges(), vec![true]);

    rig.set_pose(0.0, 0.0);
    let report = rig.step(OPEN);
    assert_eq!(report.level(), AlertLevel::Safe);
    assert_eq!(rig.edges(), vec![true, false]);

    rig.set_pose(20.0, 0.0);
    rig.run(5, OPEN);
    assert_eq!(rig.session.session_metrics().total_alarms, 2);
}

#[test]
fn high_perclos_raises_fatigue_alarm() {
    let mut rig = Rig::new();
    rig.calibrate();

    // 10 closed / 20 open: never a long closure, one third closed overall
    let mut last = None;
    for _ in 0..20 {
        rig.run(10, CLOSED);
        last = Some(rig.run(20, OPEN));
    }
    let report = last.unwrap();
    assert!(matches!(report.status.cause, AlertCause::HighPerclos { .. }));
    let perclos = rig.session.session_metrics().perclos_percent.unwrap();
    assert!((perclos - 100.0 / 3.0).abs() < 1e-9);
}

#[test]
fn frame_stall_forces_danger_and_one_shutdown() {
    let mut rig = Rig::with_rate(4.0);

    let mut stalled = Vec::new();
    let mut shutdown_frames = Vec::new();
    for _ in 0..60 {
        let report = rig.step(OPEN);
        if report.status.cause == AlertCause::StalledPipeline {
            assert_eq!(report.level(), AlertLevel::Danger);
            stalled.push(rig.frame);
        }
        if report.shutdown_requested {
            shutdown_frames.push(rig.frame);
        }
    }

    // The first frame only sets the clock; 12 intervals of 0.25 s after it
    // reach 3 s at t = 3.25 and the request follows 3 s later
    assert_eq!(stalled, vec![13]);
    assert_eq!(shutdown_frames, vec![25]);
    assert_eq!(rig.shutdowns.load(Ordering::SeqCst), 1);
    assert!(rig.edges().is_empty());
}

#[test]
fn poll_delivers_shutdown_without_frames() {
    let mut rig = Rig::with_rate(4.0);
    rig.run(13, OPEN);

    assert!(!rig.session.poll(5.0));
    assert!(rig.session.poll(6.5));
    assert!(!rig.session.poll(10.0));
    assert_eq!(rig.shutdowns.load(Ordering::SeqCst), 1);
}

#[test]
fn slow_first_frame_after_start_does_not_trip() {
    let mut rig = Rig::new();

    // Detector warm-up: nothing arrives for 3.5 s after capture starts
    let first = rig.step_at(3.5, OPEN);
    assert!(matches!(first.status.cause, AlertCause::Calibrating { .. }));
    assert_eq!(first.fps, None);

    for _ in 0..200 {
        let report = rig.step(OPEN);
        assert_ne!(report.status.cause, AlertCause::StalledPipeline);
        assert!(!report.shutdown_requested);
    }
    assert!(!rig.session.poll(20.0));
    assert_eq!(rig.shutdowns.load(Ordering::SeqCst), 0);
}

#[test]
fn tripping_frame_is_not_aggregated() {
    let mut rig = Rig::new();
    rig.calibrate();

    // 4 fps from t = 5.0: the twelfth interval completes 3 s below the floor
    for k in 1..=11 {
        let report = rig.step_at(5.0 + 0.25 * k as f64, CLOSED);
        assert_ne!(report.status.cause, AlertCause::StalledPipeline);
    }
    let before = rig.session.session_metrics();
    assert_eq!(before.frame_count, 11);

    let report = rig.step_at(8.0, CLOSED);
    assert_eq!(report.status.cause, AlertCause::StalledPipeline);
    assert_eq!(report.level(), AlertLevel::Danger);
    assert!(report.sample.is_some());

    let after = rig.session.session_metrics();
    assert_eq!(after.frame_count, 11);
    assert_eq!(after.perclos_percent, before.perclos_percent);
    assert_eq!(after.total_alarms, before.total_alarms);
}

#[test]
fn reset_mid_alarm_returns_to_defaults() {
    let mut rig = Rig::new();
    rig.calibrate();
    rig.set_pose(20.0, 0.0);
    rig.run(10, OPEN);
    assert!(rig.session.alert_state().is_alarm_active);

    rig.session.reset_session();

    assert_eq!(rig.edges(), vec![true, false]);
    assert_eq!(rig.session.alert_status(), &AlertStatus::default());
    let metrics = rig.session.session_metrics();
    assert!(!metrics.capture_active);
    assert!(!metrics.alarm_active);
    assert_eq!(metrics.total_alarms, 0);
    assert_eq!(metrics.perclos_percent, None);
    assert_eq!(metrics.frame_count, 0);
    assert_eq!(metrics.calibration.frames_remaining, 150);
    assert!(!metrics.calibration.is_complete);
    assert_eq!(rig.session.chart_series().count(), 0);

    let report = rig.step(OPEN);
    assert!(!report.processed);

    rig.session.start(100.0);
    assert!(matches!(
        rig.session.alert_status().cause,
        AlertCause::Calibrating { .. }
    ));
}

#[test]
fn blink_rate_tracks_recent_blinks() {
    let mut rig = Rig::new();
    rig.calibrate();

    rig.step(OPEN);
    assert_eq!(rig.session.session_metrics().blink_rate_bpm, Some(0.0));

    // One blink (3 closed frames) per second
    for _ in 0..20 {
        rig.run(3, CLOSED);
        rig.run(27, OPEN);
    }
    let bpm = rig.session.session_metrics().blink_rate_bpm.unwrap();
    assert!((bpm - 60.0).abs() < 0.5, "bpm {bpm}");
}

#[test]
fn missing_face_reports_unavailable_metrics() {
    let mut rig = Rig::new();
    rig.calibrate();
    rig.set_pose(20.0, 0.0);
    rig.run(5, OPEN);
    assert!(rig.session.alert_state().is_alarm_active);

    let report = rig.step_no_face();
    assert_eq!(report.status.cause, AlertCause::NoFace);
    assert_eq!(report.level(), AlertLevel::Danger);
    assert!(report.sample.is_none());

    let metrics = rig.session.session_metrics();
    assert_eq!(metrics.perclos_percent, None);
    assert_eq!(metrics.blink_rate_bpm, None);
    assert_eq!(metrics.pitch_deg, None);
    assert_eq!(metrics.yaw_deg, None);
    // Latch untouched while the face is missing
    assert!(metrics.alarm_active);
    assert_eq!(rig.edges(), vec![true]);

    rig.set_pose(0.0, 0.0);
    let report = rig.step(OPEN);
    assert_eq!(report.status.cause, AlertCause::Awake);
    assert_eq!(rig.edges(), vec![true, false]);
}

#[test]
fn stop_silences_alarm_and_keeps_chart() {
    let mut rig = Rig::new();
    rig.calibrate();
    rig.run(300, OPEN);

    let times: Vec<f64> = rig.session.chart_series().map(|p| p.time_seconds).collect();
    assert_eq!(times, vec![5.0, 10.0]);

    rig.set_pose(20.0, 0.0);
    rig.step(OPEN);
    rig.session.stop();

    assert_eq!(rig.edges(), vec![true, false]);
    assert!(!rig.step(OPEN).processed);

    let summary = rig.session.summary();
    assert_eq!(summary.chart.len(), 2);
    assert_eq!(summary.metrics.total_alarms, 1);
    assert_eq!(summary.perclos_threshold_percent, 25.0);
    assert!(!summary.metrics.capture_active);
}

#[test]
fn default_estimator_session_runs() {
    let mut session = DmsSession::new(DmsConfig::default()).unwrap();
    session.start(0.0);
    let mut report = None;
    for i in 1..=200 {
        report = Some(session.process_frame(&Frame::new(i as f64 / 30.0, face(OPEN))));
    }
    assert_eq!(report.unwrap().status.cause, AlertCause::Awake);
}

#[test]
fn invalid_configuration_fails_fast() {
    let config = DmsConfig {
        calibration_seconds: 0.0,
        ..Default::default()
    };
    assert!(matches!(DmsSession::new(config), Err(DmsError::Config(_))));
}
