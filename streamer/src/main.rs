use anyhow::Context;
use clap::Parser;
use generator::capture::{write_capture, CaptureConfig};
use gui_bridge::bridge::{gui_bind_address, GuiBridge};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use transport::serial::SerialTransport;
use workflow::config::WorkflowConfig;
use workflow::runner::{RunSummary, Runner};

mod generator;
mod gui_bridge;
mod transport;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "mmWave UART detection streamer")]
struct Args {
    /// Radar chirp configuration (.cfg) to upload and derive scaling from
    #[arg(long)]
    radar_config: Option<PathBuf>,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Decode a captured byte stream instead of opening serial ports
    #[arg(long)]
    replay: Option<PathBuf>,
    /// Sleep the poll interval between replayed frames
    #[arg(long, default_value_t = false)]
    paced: bool,
    #[arg(long)]
    cli_port: Option<String>,
    #[arg(long)]
    data_port: Option<String>,
    #[arg(long)]
    snr_floor: Option<f64>,
    #[arg(long)]
    sensor_id: Option<u32>,
    /// Write a synthetic capture to this path and exit
    #[arg(long)]
    generate: Option<PathBuf>,
    #[arg(long, default_value_t = 100)]
    frames: u32,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Serve the latest detections over HTTP
    #[arg(long, default_value_t = false)]
    serve: bool,
    /// Append the run summary to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

fn load_workflow(args: &Args) -> anyhow::Result<WorkflowConfig> {
    let mut config = match (&args.workflow, &args.radar_config) {
        (Some(path), radar_config) => {
            let mut config = WorkflowConfig::load(path)?;
            if let Some(radar_config) = radar_config {
                config.radar_config = radar_config.clone();
            }
            config
        }
        (None, Some(radar_config)) => WorkflowConfig::from_args(radar_config.clone()),
        (None, None) => anyhow::bail!("either --workflow or --radar-config is required"),
    };
    if let Some(snr_floor) = args.snr_floor {
        config.pipeline.snr_floor = snr_floor;
    }
    if let Some(sensor_id) = args.sensor_id {
        config.pipeline.sensor_id = sensor_id;
    }
    if let Some(port) = &args.cli_port {
        config.serial.cli_port = port.clone();
    }
    if let Some(port) = &args.data_port {
        config.serial.data_port = port.clone();
    }
    Ok(config)
}

/// Flag raised once Ctrl+C arrives.
fn ctrl_c_flag() -> anyhow::Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating runtime for signal handling")?;
    let flag = stop.clone();
    thread::spawn(move || {
        if let Err(err) = runtime.block_on(signal::ctrl_c()) {
            log::error!("awaiting Ctrl+C: {}", err);
        }
        flag.store(true, Ordering::Relaxed);
    });
    Ok(stop)
}

fn append_report(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    let report = format!(
        "frames={} detections={} below_floor={} corrupt={} counters={}\n",
        summary.frames,
        summary.detections,
        summary.below_floor,
        summary.corrupt,
        serde_json::to_string(&summary.counters)?
    );
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening report {}", path.display()))?;
    file.write_all(report.as_bytes())?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if let Some(path) = &args.generate {
        let config = CaptureConfig {
            frames: args.frames,
            seed: args.seed,
            ..Default::default()
        };
        let written = write_capture(path, &config)?;
        println!(
            "Wrote {} frames ({} bytes) to {}",
            config.frames,
            written,
            path.display()
        );
        return Ok(());
    }

    let runner = Runner::new(load_workflow(&args)?)?;
    let mut pipeline = runner.pipeline();
    let bridge = GuiBridge::new(runner.radar().params, pipeline.metrics());
    if args.serve {
        bridge.serve(gui_bind_address());
    }

    let summary = if let Some(capture) = &args.replay {
        let summary = runner.replay(pipeline, capture, args.paced, |outcome| {
            bridge.publish(outcome)
        })?;
        bridge.publish_status("Replay finished.");
        summary
    } else {
        let stop = ctrl_c_flag()?;
        let mut transport = SerialTransport::open(&runner.config().serial)?;
        transport.upload_config(runner.radar())?;
        transport.start_sensor()?;
        bridge.publish_status("Streaming from sensor (Ctrl+C to stop)...");
        let result = runner.stream(&mut pipeline, &mut transport, &stop, |outcome| {
            bridge.publish(outcome)
        });
        transport.stop_sensor()?;
        result?
    };

    println!(
        "Run -> frames {}, detections {}, below floor {}, corrupt {}, discarded bytes {}",
        summary.frames,
        summary.detections,
        summary.below_floor,
        summary.corrupt,
        summary.counters.discarded_bytes
    );
    if let Some(path) = &args.report {
        append_report(path, &summary)?;
    }

    if args.serve && args.replay.is_some() {
        bridge.publish_status("HTTP bridge running (Ctrl+C to stop)...");
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
