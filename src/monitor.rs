//! Frame loop driver.
//!
//! One tick = one frame: estimate poses, classify the first pose, feed the
//! debounce state and hand any alert to the sink. Ticks are strictly
//! sequential. Pacing is injected through [`TickScheduler`] so the loop can run
//! without a display or a real clock.
//!
//! A failing tick never stops the loop: estimation errors are logged and the
//! debounce state is left untouched for that tick.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::alert::AlertSink;
use crate::debounce::{AlertEvent, DebounceState, FRAMES_THRESHOLD};
use crate::detect::PoseEstimator;
use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::overlay::{self, NoopOverlay, OverlaySink};
use crate::pose::{KeypointName, Pose};
use crate::proximity;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorStatus {
    Starting,
    Active,
    Warning,
    NoPose,
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MonitorStatus::Starting => "Starting",
            MonitorStatus::Active => "Monitoring active",
            MonitorStatus::Warning => "Warning: Hand near head detected!",
            MonitorStatus::NoPose => "No pose detected",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Estimator or frame not ready; nothing was evaluated.
    NotReady,
    /// Estimation failed; the error was logged.
    Failed,
    /// The estimator returned no pose.
    NoPose,
    Classified {
        near: bool,
        consecutive_hits: u32,
        alert: Option<AlertEvent>,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub ticks: u64,
    pub not_ready: u64,
    pub failures: u64,
    pub no_pose: u64,
    pub classified: u64,
    pub near_frames: u64,
    pub alerts: u64,
}

/// Decides when the next tick may run.
pub trait TickScheduler {
    /// Block until the next tick is due. Returns false to stop the loop.
    fn next_tick(&mut self) -> bool;
}

/// Runs exactly `n` ticks without waiting, or fewer if the shutdown flag is raised.
#[derive(Clone, Debug)]
pub struct FixedTicks {
    remaining: u64,
    shutdown: Option<Arc<AtomicBool>>,
}

impl FixedTicks {
    pub fn new(ticks: u64) -> Self {
        Self {
            remaining: ticks,
            shutdown: None,
        }
    }

    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }
}

impl TickScheduler for FixedTicks {
    fn next_tick(&mut self) -> bool {
        if self.remaining == 0 || is_raised(self.shutdown.as_ref()) {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Paces ticks to a target frame rate until the shutdown flag is raised or the
/// optional tick limit is reached.
pub struct PacedScheduler {
    interval: Duration,
    last_tick: Option<Instant>,
    remaining: Option<u64>,
    shutdown: Arc<AtomicBool>,
}

impl PacedScheduler {
    pub fn new(target_fps: u32, shutdown: Arc<AtomicBool>) -> Self {
        let interval = Duration::from_secs(1) / target_fps.max(1);
        Self {
            interval,
            last_tick: None,
            remaining: None,
            shutdown,
        }
    }

    /// Stop after `ticks` ticks.
    pub fn with_tick_limit(mut self, ticks: u64) -> Self {
        self.remaining = Some(ticks);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl TickScheduler for PacedScheduler {
    fn next_tick(&mut self) -> bool {
        if self.remaining == Some(0) || is_raised(Some(&self.shutdown)) {
            return false;
        }
        if let Some(last) = self.last_tick {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                std::thread::sleep(self.interval - elapsed);
            }
        }
        self.last_tick = Some(Instant::now());
        if is_raised(Some(&self.shutdown)) {
            return false;
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        true
    }
}

/// Per-frame diagnostics: debounce count plus pose, nose and wrist scores.
fn describe_scores(pose: &Pose, near: bool, consecutive_hits: u32) -> String {
    let score = |name: KeypointName| pose.get(name).map_or(0.0, |kp| kp.score);
    format!(
        "near={} count={}/{} pose={:.2} nose={:.2} left_wrist={:.2} right_wrist={:.2}",
        near,
        consecutive_hits,
        FRAMES_THRESHOLD,
        pose.score,
        score(KeypointName::Nose),
        score(KeypointName::LeftWrist),
        score(KeypointName::RightWrist)
    )
}

fn is_raised(flag: Option<&Arc<AtomicBool>>) -> bool {
    flag.is_some_and(|flag| flag.load(Ordering::SeqCst))
}

/// Owns the debounce state and drives one estimator and one alert sink.
pub struct Monitor<E, A> {
    estimator: E,
    alerts: A,
    overlay: Box<dyn OverlaySink>,
    state: DebounceState,
    status: MonitorStatus,
    stats: MonitorStats,
}

impl<E: PoseEstimator, A: AlertSink> Monitor<E, A> {
    pub fn new(estimator: E, alerts: A) -> Self {
        Self {
            estimator,
            alerts,
            overlay: Box::new(NoopOverlay),
            state: DebounceState::new(),
            status: MonitorStatus::Starting,
            stats: MonitorStats::default(),
        }
    }

    pub fn with_overlay(mut self, overlay: Box<dyn OverlaySink>) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn state(&self) -> &DebounceState {
        &self.state
    }

    pub fn status(&self) -> MonitorStatus {
        self.status
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    pub fn alerts(&self) -> &A {
        &self.alerts
    }

    pub fn alerts_mut(&mut self) -> &mut A {
        &mut self.alerts
    }

    pub fn estimator_mut(&mut self) -> &mut E {
        &mut self.estimator
    }

    /// Consume the monitor, returning the alert sink.
    pub fn into_alerts(self) -> A {
        self.alerts
    }

    /// Run a single tick on an optional frame.
    pub fn tick(&mut self, frame: Option<&Frame>) -> TickOutcome {
        self.stats.ticks += 1;
        self.alerts.poll();

        let frame = match frame {
            Some(frame) if frame.has_dimensions() && self.estimator.is_ready() => frame,
            _ => {
                log::debug!("estimator or frame not ready");
                self.stats.not_ready += 1;
                return TickOutcome::NotReady;
            }
        };

        let poses = match self.estimator.estimate(frame) {
            Ok(poses) => poses,
            Err(e) => {
                log::error!("pose estimation failed on frame {}: {:#}", frame.sequence, e);
                self.stats.failures += 1;
                return TickOutcome::Failed;
            }
        };

        // Debounce state is held across pose dropouts.
        let Some(pose) = poses.first() else {
            log::debug!("no poses detected on frame {}", frame.sequence);
            self.stats.no_pose += 1;
            self.status = MonitorStatus::NoPose;
            return TickOutcome::NoPose;
        };

        let report = proximity::classify(pose, frame.width);
        overlay::draw_keypoints(self.overlay.as_mut(), pose, frame.width);
        overlay::draw_report(self.overlay.as_mut(), &report);

        self.stats.classified += 1;
        self.status = MonitorStatus::Active;
        let alert = self.state.observe(report.near);
        if report.near {
            self.stats.near_frames += 1;
        }
        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "frame {}: {}",
                frame.sequence,
                describe_scores(pose, report.near, self.state.consecutive_hits())
            );
        }
        if let Some(event) = alert.as_ref() {
            self.stats.alerts += 1;
            self.status = MonitorStatus::Warning;
            log::warn!(
                "hand near head for {} consecutive frames (frame {}, pose score {:.2}, {}ms old)",
                event.consecutive_hits,
                frame.sequence,
                pose.score,
                frame.age_ms()
            );
            self.alerts.dispatch(event);
        }

        TickOutcome::Classified {
            near: report.near,
            consecutive_hits: self.state.consecutive_hits(),
            alert,
        }
    }

    /// Drive ticks until the scheduler stops. Source errors are logged and the
    /// tick is treated as not ready.
    pub fn run<S: FrameSource + ?Sized>(
        &mut self,
        source: &mut S,
        scheduler: &mut dyn TickScheduler,
    ) -> MonitorStats {
        log::info!(
            "monitor running with {} estimator (threshold {} frames)",
            self.estimator.name(),
            FRAMES_THRESHOLD
        );
        let mut last_health_log = Instant::now();

        while scheduler.next_tick() {
            let frame = match source.next_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    log::error!("frame source error: {:#}", e);
                    None
                }
            };
            self.tick(frame.as_ref());

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                log::info!(
                    "source health={} status=\"{}\" ticks={} classified={} no_pose={} failures={} alerts={}",
                    source.is_healthy(),
                    self.status,
                    self.stats.ticks,
                    self.stats.classified,
                    self.stats.no_pose,
                    self.stats.failures,
                    self.stats.alerts
                );
                last_health_log = Instant::now();
            }
        }

        log::info!("monitor stopped after {} ticks", self.stats.ticks);
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::RecordedAlerts;
    use crate::detect::ScriptedEstimator;
    use crate::pose::{Keypoint, KeypointName, Pose};
    use anyhow::Result;

    fn frame() -> Frame {
        Frame::new(vec![0u8; 640 * 480 * 3], 640, 480, 1).unwrap()
    }

    fn pose(near: bool) -> Pose {
        let wrist_y = if near { 210.0 } else { 470.0 };
        Pose::new(
            vec![
                Keypoint::new(KeypointName::Nose, 320.0, 215.0, 0.9),
                Keypoint::new(KeypointName::LeftEye, 300.0, 200.0, 0.9),
                Keypoint::new(KeypointName::RightEye, 340.0, 200.0, 0.9),
                Keypoint::new(KeypointName::LeftWrist, 280.0, wrist_y, 0.9),
            ],
            0.8,
        )
    }

    fn monitor(script: ScriptedEstimator) -> Monitor<ScriptedEstimator, RecordedAlerts> {
        Monitor::new(script, RecordedAlerts::default())
    }

    #[test]
    fn sustained_run_alerts_once() {
        let script = ScriptedEstimator::from_poses((0..60).map(|_| pose(true)));
        let mut monitor = monitor(script);
        let frame = frame();

        let mut alerted_on = Vec::new();
        for i in 1..=60 {
            if let TickOutcome::Classified { alert: Some(_), .. } = monitor.tick(Some(&frame)) {
                alerted_on.push(i);
            }
        }
        assert_eq!(alerted_on, vec![FRAMES_THRESHOLD]);
        assert_eq!(monitor.alerts().events.len(), 1);
        assert_eq!(monitor.stats().near_frames, 60);
    }

    #[test]
    fn warning_status_only_on_alert_tick() {
        let script = ScriptedEstimator::from_poses((0..31).map(|_| pose(true)));
        let mut monitor = monitor(script);
        let frame = frame();
        for _ in 0..FRAMES_THRESHOLD {
            monitor.tick(Some(&frame));
        }
        assert_eq!(monitor.status(), MonitorStatus::Warning);
        monitor.tick(Some(&frame));
        assert_eq!(monitor.status(), MonitorStatus::Active);
    }

    #[test]
    fn not_ready_ticks_leave_state_alone() {
        let script = ScriptedEstimator::from_poses((0..10).map(|_| pose(true)));
        let mut monitor = monitor(script);
        let frame = frame();
        for _ in 0..10 {
            monitor.tick(Some(&frame));
        }

        assert_eq!(monitor.tick(None), TickOutcome::NotReady);
        assert_eq!(monitor.tick(Some(&Frame::pending(2))), TickOutcome::NotReady);
        monitor.estimator_mut().set_ready(false);
        assert_eq!(monitor.tick(Some(&frame)), TickOutcome::NotReady);

        assert_eq!(monitor.state().consecutive_hits(), 10);
        assert_eq!(monitor.estimator_mut().calls(), 10);
        assert_eq!(monitor.stats().not_ready, 3);
    }

    #[test]
    fn failures_and_dropouts_hold_state() {
        let mut script = ScriptedEstimator::new();
        for _ in 0..(FRAMES_THRESHOLD - 2) {
            script.push_pose(pose(true));
        }
        script.push_failure("inference backend lost");
        script.push_empty();
        script.push_pose(pose(true));
        script.push_pose(pose(true));

        let mut monitor = monitor(script);
        let frame = frame();
        let outcomes: Vec<TickOutcome> = (0..FRAMES_THRESHOLD + 2)
            .map(|_| monitor.tick(Some(&frame)))
            .collect();

        assert_eq!(outcomes[(FRAMES_THRESHOLD - 2) as usize], TickOutcome::Failed);
        assert_eq!(outcomes[(FRAMES_THRESHOLD - 1) as usize], TickOutcome::NoPose);
        assert_eq!(
            outcomes.last().copied(),
            Some(TickOutcome::Classified {
                near: true,
                consecutive_hits: FRAMES_THRESHOLD,
                alert: Some(AlertEvent {
                    consecutive_hits: FRAMES_THRESHOLD
                }),
            })
        );
        assert_eq!(monitor.stats().failures, 1);
        assert_eq!(monitor.stats().no_pose, 1);
    }

    #[test]
    fn negative_frame_rearms_monitor() {
        let mut script = ScriptedEstimator::new();
        for _ in 0..FRAMES_THRESHOLD {
            script.push_pose(pose(true));
        }
        script.push_pose(pose(false));
        for _ in 0..FRAMES_THRESHOLD {
            script.push_pose(pose(true));
        }
        let mut monitor = monitor(script);
        let frame = frame();
        for _ in 0..(2 * FRAMES_THRESHOLD + 1) {
            monitor.tick(Some(&frame));
        }
        assert_eq!(monitor.alerts().events.len(), 2);
    }

    struct FlakySource {
        polls: u64,
    }

    impl FrameSource for FlakySource {
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            self.polls += 1;
            match self.polls {
                1 => Ok(None),
                2 => Err(anyhow::anyhow!("device busy")),
                n => Frame::new(vec![0u8; 640 * 480 * 3], 640, 480, n).map(Some),
            }
        }
    }

    #[test]
    fn run_survives_source_errors() {
        let script = ScriptedEstimator::from_poses((0..40).map(|_| pose(true)));
        let mut monitor = monitor(script);
        let mut source = FlakySource { polls: 0 };
        let stats = monitor.run(&mut source, &mut FixedTicks::new(2 + u64::from(FRAMES_THRESHOLD)));

        assert_eq!(stats.ticks, 2 + u64::from(FRAMES_THRESHOLD));
        assert_eq!(stats.not_ready, 2);
        assert_eq!(stats.classified, u64::from(FRAMES_THRESHOLD));
        assert_eq!(stats.alerts, 1);
    }

    #[test]
    fn paced_scheduler_stops_on_shutdown() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut scheduler = PacedScheduler::new(1000, shutdown.clone());
        assert_eq!(scheduler.interval(), Duration::from_millis(1));
        assert!(scheduler.next_tick());
        assert!(scheduler.next_tick());
        shutdown.store(true, Ordering::SeqCst);
        assert!(!scheduler.next_tick());
    }

    #[test]
    fn fixed_ticks_counts_down() {
        let mut scheduler = FixedTicks::new(2);
        assert!(scheduler.next_tick());
        assert!(scheduler.next_tick());
        assert!(!scheduler.next_tick());
    }

    #[test]
    fn paced_scheduler_honours_tick_limit() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut scheduler = PacedScheduler::new(1000, shutdown).with_tick_limit(2);
        assert!(scheduler.next_tick());
        assert!(scheduler.next_tick());
        assert!(!scheduler.next_tick());
    }

    /// Raises the shutdown flag after handing out `stop_after` frames.
    struct InterruptingSource {
        shutdown: Arc<AtomicBool>,
        stop_after: u64,
        served: u64,
    }

    impl FrameSource for InterruptingSource {
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            self.served += 1;
            if self.served == self.stop_after {
                self.shutdown.store(true, Ordering::SeqCst);
            }
            Frame::new(vec![0u8; 640 * 480 * 3], 640, 480, self.served).map(Some)
        }
    }

    #[test]
    fn shutdown_flag_stops_tick_limited_runs() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut source = InterruptingSource {
            shutdown: shutdown.clone(),
            stop_after: 5,
            served: 0,
        };
        let script = ScriptedEstimator::from_poses((0..10).map(|_| pose(false)));
        let mut fixed = FixedTicks::new(1_000_000).with_shutdown(shutdown.clone());
        let stats = monitor(script).run(&mut source, &mut fixed);
        assert_eq!(stats.ticks, 5);

        shutdown.store(false, Ordering::SeqCst);
        let mut source = InterruptingSource {
            shutdown: shutdown.clone(),
            stop_after: 3,
            served: 0,
        };
        let script = ScriptedEstimator::from_poses((0..10).map(|_| pose(false)));
        let mut paced = PacedScheduler::new(1000, shutdown).with_tick_limit(1_000_000);
        let stats = monitor(script).run(&mut source, &mut paced);
        assert_eq!(stats.ticks, 3);
    }

    #[test]
    fn diagnostics_report_nose_and_wrist_scores() {
        let text = describe_scores(&pose(true), true, 12);
        assert_eq!(
            text,
            "near=true count=12/30 pose=0.80 nose=0.90 left_wrist=0.90 right_wrist=0.00"
        );
    }
}
