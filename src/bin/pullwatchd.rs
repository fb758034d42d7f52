//! pullwatchd - webcam hair-pulling monitor
//!
//! Opens the configured camera, runs the pose estimator on every frame and
//! sends a desktop notification when one hand stays near the head for
//! `FRAMES_THRESHOLD` consecutive frames. Stops on Ctrl-C or after `--ticks`.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pullwatch::alert::{CommandNotifier, HeadlessWindow, LogNotifier, Notifier};
use pullwatch::config::{AlertSettings, EstimatorBackend, EstimatorSettings, MonitorConfig, NotifierKind};
use pullwatch::ui::{Ui, UiMode};
use pullwatch::{
    AlertChannel, CameraSource, Monitor, PacedScheduler, PoseEstimator, SyntheticConfig,
    SyntheticEstimator, FRAMES_THRESHOLD,
};

const ALERT_DRAIN_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "PULLWATCH_CONFIG")]
    config: Option<PathBuf>,
    /// Stop after this many ticks (Ctrl-C still stops earlier).
    #[arg(long)]
    ticks: Option<u64>,
    /// Startup progress output.
    #[arg(long, value_enum, default_value_t = UiMode::Auto)]
    ui: UiMode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = Ui::new(args.ui, std::io::stderr().is_terminal());

    let cfg = {
        let mut stage = ui.stage("Loading configuration");
        let cfg = MonitorConfig::load_from(args.config.as_deref())?;
        stage.set_detail(match &args.config {
            Some(path) => path.display().to_string(),
            None => "defaults".to_string(),
        });
        cfg
    };

    let mut source = {
        let mut stage = ui.stage("Opening camera");
        let mut source = CameraSource::new(cfg.camera.clone())?;
        source.connect()?;
        stage.set_detail(format!(
            "{} {}x{} @ {} fps",
            cfg.camera.device, cfg.camera.width, cfg.camera.height, cfg.camera.target_fps
        ));
        source
    };

    let estimator = {
        let mut stage = ui.stage("Loading pose estimator");
        let mut estimator = build_estimator(&cfg.estimator)?;
        estimator.warm_up()?;
        stage.set_detail(estimator.name());
        estimator
    };

    let alerts = {
        let mut stage = ui.stage("Starting alert channel");
        let alerts = build_alert_channel(&cfg.alert)?;
        stage.set_detail(alerts.notifier_name());
        alerts
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    let mut scheduler = PacedScheduler::new(cfg.camera.target_fps, shutdown);
    if let Some(ticks) = args.ticks {
        scheduler = scheduler.with_tick_limit(ticks);
    }

    log::info!(
        "pullwatchd monitoring; alert after {} consecutive frames (Ctrl-C to stop)",
        FRAMES_THRESHOLD
    );
    let mut monitor = Monitor::new(estimator, alerts);
    let stats = monitor.run(&mut source, &mut scheduler);
    log::info!(
        "stopped after {} ticks: {} classified, {} near-head, {} alerts, {} without pose, {} failures",
        stats.ticks,
        stats.classified,
        stats.near_frames,
        stats.alerts,
        stats.no_pose,
        stats.failures
    );

    let mut alerts = monitor.into_alerts();
    if !alerts.wait_idle(ALERT_DRAIN_TIMEOUT) {
        log::warn!("notification still pending at shutdown");
    }
    let channel_stats = alerts.close()?;
    log::info!(
        "notifications: {} sent, {} failed, {} held, {} coalesced",
        channel_stats.delivered,
        channel_stats.failed,
        channel_stats.held,
        channel_stats.coalesced
    );
    Ok(())
}

fn build_estimator(settings: &EstimatorSettings) -> Result<Box<dyn PoseEstimator>> {
    match settings.backend {
        EstimatorBackend::Synthetic => Ok(Box::new(SyntheticEstimator::new(SyntheticConfig {
            seed: settings.seed,
            ..SyntheticConfig::default()
        }))),
        EstimatorBackend::Tract => build_tract(settings),
    }
}

#[cfg(feature = "backend-tract")]
fn build_tract(settings: &EstimatorSettings) -> Result<Box<dyn PoseEstimator>> {
    let model_path = settings
        .model_path
        .as_deref()
        .ok_or_else(|| anyhow!("tract estimator requires a model_path"))?;
    let estimator = pullwatch::detect::TractMoveNet::new(model_path, settings.input_size)?;
    Ok(Box::new(estimator))
}

#[cfg(not(feature = "backend-tract"))]
fn build_tract(_settings: &EstimatorSettings) -> Result<Box<dyn PoseEstimator>> {
    Err(anyhow!(
        "tract estimator requested but pullwatchd was built without the backend-tract feature"
    ))
}

fn build_alert_channel(settings: &AlertSettings) -> Result<AlertChannel> {
    let primary: Box<dyn Notifier> = match settings.notifier {
        NotifierKind::Command => Box::new(CommandNotifier::new(&settings.command)),
        NotifierKind::Log => Box::new(LogNotifier),
    };
    AlertChannel::spawn(primary, Box::new(LogNotifier), Box::new(HeadlessWindow))
}
