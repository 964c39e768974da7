use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use log::{info, warn};
use mmwcore::source::{ByteSource, FileSource, Replay, SourceRead};
use mmwcore::telemetry::PipelineCounters;
use mmwcore::{Pipeline, PollOutcome, PollStatus, RadarConfig};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Totals for one replay or live session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: usize,
    pub detections: usize,
    pub below_floor: usize,
    pub corrupt: usize,
    pub counters: PipelineCounters,
}

impl RunSummary {
    fn observe(&mut self, outcome: &PollOutcome) {
        if !outcome.consumed_packet() {
            return;
        }
        self.frames += 1;
        self.detections += outcome.detections.len();
        match outcome.status {
            PollStatus::BelowSnrFloor => self.below_floor += 1,
            PollStatus::Resynchronizing => self.corrupt += 1,
            _ => {}
        }
    }
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    radar: RadarConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> anyhow::Result<Self> {
        let radar = RadarConfig::load(&config.radar_config)
            .with_context(|| format!("loading radar config {}", config.radar_config.display()))?;
        info!(
            "radar params: {} range bins, {} doppler bins, frame {:.3}s",
            radar.params.num_range_bins,
            radar.params.num_doppler_bins,
            radar.params.frame_duration_seconds
        );
        Ok(Self::from_parts(config, radar))
    }

    pub fn from_parts(config: WorkflowConfig, radar: RadarConfig) -> Self {
        Self { config, radar }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn radar(&self) -> &RadarConfig {
        &self.radar
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(&self.radar.params, &self.config.pipeline)
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.poll_interval_ms)
    }

    /// Decode a captured stream frame by frame until it runs out.
    pub fn replay<F>(
        &self,
        pipeline: Pipeline,
        capture: &Path,
        paced: bool,
        mut publish: F,
    ) -> anyhow::Result<RunSummary>
    where
        F: FnMut(&PollOutcome),
    {
        let source = FileSource::open(capture, self.config.chunk_size)
            .context("opening capture for replay")?;
        let metrics = pipeline.metrics();
        let mut summary = RunSummary::default();

        for outcome in Replay::new(source, pipeline) {
            let outcome = outcome.context("reading capture")?;
            summary.observe(&outcome);
            publish(&outcome);
            if paced {
                thread::sleep(self.poll_interval());
            }
        }

        summary.counters = metrics.snapshot();
        info!(
            "replay finished: {} frames, {} detections",
            summary.frames, summary.detections
        );
        Ok(summary)
    }

    /// Poll a live source until `stop` is raised or the source ends.
    pub fn stream<S, F>(
        &self,
        pipeline: &mut Pipeline,
        source: &mut S,
        stop: &AtomicBool,
        mut publish: F,
    ) -> anyhow::Result<RunSummary>
    where
        S: ByteSource,
        F: FnMut(&PollOutcome),
    {
        let mut summary = RunSummary::default();

        while !stop.load(Ordering::Relaxed) {
            let ended = match source.read_available().context("reading data port")? {
                SourceRead::Data(bytes) => {
                    if let Err(err) = pipeline.push_bytes(&bytes) {
                        warn!("{}", err);
                    }
                    false
                }
                SourceRead::EndOfStream => true,
            };

            drain(pipeline, &mut summary, &mut publish);
            if ended {
                break;
            }
            thread::sleep(self.poll_interval());
        }

        summary.counters = pipeline.metrics().snapshot();
        Ok(summary)
    }
}

/// Poll until a poll neither yields a packet nor shrinks the buffer.
fn drain<F>(pipeline: &mut Pipeline, summary: &mut RunSummary, publish: &mut F)
where
    F: FnMut(&PollOutcome),
{
    loop {
        let before = pipeline.buffered_len();
        let outcome = pipeline.poll();
        summary.observe(&outcome);
        publish(&outcome);
        if !outcome.consumed_packet() && pipeline.buffered_len() >= before {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::capture::{write_capture, CaptureConfig};
    use mmwcore::wire::{PacketWriter, MAGIC_WORD};
    use std::path::PathBuf;

    const RADAR_CFG: &str = "\
sensorStop
flushCfg
profileCfg 0 77 429 7 57.14 0 0 70 1 256 5209 0 0 30
frameCfg 0 1 16 0 100 1 0
sensorStart
";

    fn runner(poll_interval_ms: u64) -> Runner {
        let mut config = WorkflowConfig::from_args(PathBuf::from("inline.cfg"));
        config.poll_interval_ms = poll_interval_ms;
        config.chunk_size = 333;
        config.pipeline.snr_floor = 10.0;
        Runner::from_parts(config, RadarConfig::parse(RADAR_CFG).unwrap())
    }

    fn capture_config() -> CaptureConfig {
        CaptureConfig {
            frames: 20,
            max_garbage: 0,
            corrupt_every: Some(5),
            seed: 7,
            ..Default::default()
        }
    }

    #[test]
    fn runner_replays_every_generated_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.dat");
        write_capture(&path, &capture_config()).unwrap();

        let runner = runner(0);
        let mut published = Vec::new();
        let summary = runner
            .replay(runner.pipeline(), &path, false, |outcome| {
                published.push(outcome.header.map(|h| h.frame_number))
            })
            .unwrap();

        assert_eq!(summary.frames, 20);
        assert_eq!(summary.corrupt, 4);
        assert_eq!(summary.counters.corrupt_payloads, 4);
        assert_eq!(summary.counters.packets, 16);
        assert_eq!(published.first(), Some(&Some(1)));
        assert_eq!(published.last(), Some(&Some(20)));
    }

    #[test]
    fn runner_streams_until_end_of_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.dat");
        write_capture(&path, &capture_config()).unwrap();

        let runner = runner(0);
        let mut pipeline = runner.pipeline();
        let mut source = FileSource::open(&path, 97).unwrap();
        let stop = AtomicBool::new(false);
        let summary = runner
            .stream(&mut pipeline, &mut source, &stop, |_| {})
            .unwrap();

        assert_eq!(summary.frames, 20);
        assert_eq!(summary.detections as u64, summary.counters.detections);
    }

    #[test]
    fn interleaved_garbage_never_reorders_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noisy.dat");
        let config = CaptureConfig {
            max_garbage: 24,
            ..capture_config()
        };
        write_capture(&path, &config).unwrap();

        let runner = runner(0);
        let mut frames = Vec::new();
        let summary = runner
            .replay(runner.pipeline(), &path, false, |outcome| {
                if let Some(header) = outcome.header {
                    frames.push(header.frame_number);
                }
            })
            .unwrap();

        assert!(summary.frames >= 1 && summary.frames <= 20);
        assert!(frames.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(frames.last(), Some(&20));
    }

    #[test]
    fn stream_recovers_packet_behind_bad_sync_words_in_last_read() {
        let mut bytes = Vec::new();
        for _ in 0..2 {
            bytes.extend_from_slice(&MAGIC_WORD);
            bytes.extend_from_slice(&[0; 4]);
            bytes.extend_from_slice(&12u32.to_le_bytes());
        }
        bytes.extend(
            PacketWriter::new(3)
                .points(&[[0.5, 1.0, 0.0, 0.0]])
                .side_info(&[(40, 2)])
                .finish(),
        );

        let runner = runner(0);
        let mut pipeline = runner.pipeline();
        let mut source = FileSource::from_bytes(bytes, 4096);
        let stop = AtomicBool::new(false);
        let mut frames = Vec::new();
        let summary = runner
            .stream(&mut pipeline, &mut source, &stop, |outcome| {
                if let Some(header) = outcome.header {
                    frames.push(header.frame_number);
                }
            })
            .unwrap();

        assert_eq!(summary.frames, 1);
        assert_eq!(frames, vec![3]);
        assert_eq!(pipeline.buffered_len(), 0);
    }

    #[test]
    fn raised_stop_flag_ends_stream_before_reading() {
        let runner = runner(0);
        let mut pipeline = runner.pipeline();
        let mut source = FileSource::from_bytes(vec![0; 64], 8);
        let stop = AtomicBool::new(true);
        let summary = runner
            .stream(&mut pipeline, &mut source, &stop, |_| {})
            .unwrap();
        assert_eq!(summary, RunSummary::default());
        assert_eq!(source.remaining(), 64);
    }
}
