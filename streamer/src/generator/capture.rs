use anyhow::Context;
use mmwcore::wire::{PacketWriter, RawDetectedObject};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for generating a synthetic UART capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub frames: u32,
    pub first_frame: u32,
    pub max_objects: usize,
    /// Upper bound on junk bytes written before each packet.
    pub max_garbage: usize,
    pub extent_m: f32,
    pub max_speed_mps: f32,
    pub snr_range: (u16, u16),
    /// Every n-th packet carries an out-of-range TLV type.
    pub corrupt_every: Option<u32>,
    pub seed: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frames: 100,
            first_frame: 1,
            max_objects: 8,
            max_garbage: 16,
            extent_m: 8.0,
            max_speed_mps: 2.0,
            snr_range: (2, 400),
            corrupt_every: None,
            seed: 0,
        }
    }
}

fn random_objects(rng: &mut StdRng, config: &CaptureConfig) -> Vec<RawDetectedObject> {
    let count = rng.gen_range(0..=config.max_objects);
    let extent = config.extent_m.max(0.5);
    let speed = config.max_speed_mps.max(0.01);
    let (snr_low, snr_high) = config.snr_range;
    (0..count)
        .map(|_| RawDetectedObject {
            x: rng.gen_range(-extent..extent),
            y: rng.gen_range(0.2..extent),
            z: rng.gen_range(-1.0..1.0),
            velocity: rng.gen_range(-speed..speed),
            snr: rng.gen_range(snr_low.min(snr_high)..=snr_high.max(snr_low)),
            noise: rng.gen_range(0..64),
        })
        .collect()
}

pub fn build_capture(config: &CaptureConfig) -> anyhow::Result<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut bytes = Vec::new();

    for index in 0..config.frames {
        let frame = config
            .first_frame
            .checked_add(index)
            .context("frame number overflow in capture generator")?;
        let garbage = rng.gen_range(0..=config.max_garbage);
        bytes.extend((0..garbage).map(|_| rng.gen::<u8>()));

        let objects = random_objects(&mut rng, config);
        let mut writer = PacketWriter::new(frame)
            .cpu_cycle_time(rng.gen_range(100_000..400_000))
            .objects(&objects);
        if matches!(config.corrupt_every, Some(n) if n > 0 && (index + 1) % n == 0) {
            writer = writer.tlv(25, vec![0; 4]);
        }
        bytes.extend(writer.finish());
    }

    Ok(bytes)
}

/// Write a capture to `path` and return its size in bytes.
pub fn write_capture<P: AsRef<Path>>(path: P, config: &CaptureConfig) -> anyhow::Result<usize> {
    let path_ref = path.as_ref();
    let bytes = build_capture(config)?;
    if let Some(parent) = path_ref.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    fs::write(path_ref, &bytes)
        .with_context(|| format!("writing capture {}", path_ref.display()))?;
    Ok(bytes.len())
}
