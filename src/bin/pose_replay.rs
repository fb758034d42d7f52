//! pose_replay - run recorded poses through the detector offline
//!
//! Reads a JSON-lines pose file (one pose object or `null` per frame), feeds it
//! through proximity classification and debounce, and prints each alert as
//! `frame=<n> hits=<count>` followed by a summary line.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;

use pullwatch::frame::rgb_len;
use pullwatch::monitor::MonitorStatus;
use pullwatch::{Frame, Monitor, RecordedAlerts, ScriptedEstimator, TickOutcome};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON-lines pose file.
    input: PathBuf,
    /// Width of the frames the poses were estimated on (used for mirroring).
    #[arg(long, default_value_t = 640)]
    frame_width: u32,
    /// Height of the frames the poses were estimated on.
    #[arg(long, default_value_t = 480)]
    frame_height: u32,
    /// Print the classification of every frame, not only alerts.
    #[arg(long)]
    trace: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    if args.frame_width == 0 || args.frame_height == 0 {
        return Err(anyhow!("frame dimensions must be >= 1"));
    }

    let file = File::open(&args.input)
        .with_context(|| format!("failed to open pose file {}", args.input.display()))?;
    let estimator = ScriptedEstimator::from_jsonl(BufReader::new(file))?;
    let total = estimator.remaining();

    let pixels = vec![0u8; rgb_len(args.frame_width, args.frame_height)?];
    let mut monitor = Monitor::new(estimator, RecordedAlerts::default());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for index in 0..total {
        let frame_number = index as u64 + 1;
        let frame = Frame::new(
            pixels.clone(),
            args.frame_width,
            args.frame_height,
            frame_number,
        )?;
        match monitor.tick(Some(&frame)) {
            TickOutcome::Classified {
                near,
                consecutive_hits,
                alert,
            } => {
                if args.trace {
                    writeln!(out, "frame={} near={} hits={}", frame_number, near, consecutive_hits)?;
                }
                if let Some(event) = alert {
                    writeln!(out, "frame={} hits={}", frame_number, event.consecutive_hits)?;
                }
            }
            outcome => {
                if args.trace {
                    writeln!(out, "frame={} {:?}", frame_number, outcome)?;
                }
            }
        }
    }

    let stats = monitor.stats();
    let status = monitor.status();
    writeln!(
        out,
        "frames={} classified={} near={} no_pose={} alerts={} latched={} status=\"{}\"",
        stats.ticks,
        stats.classified,
        stats.near_frames,
        stats.no_pose,
        monitor.alerts().events.len(),
        monitor.state().is_latched(),
        if status == MonitorStatus::Starting {
            "No frames".to_string()
        } else {
            status.to_string()
        }
    )?;
    Ok(())
}
