//! Radar `.cfg` parsing and the resolution constants derived from it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const NUM_TX_ANTENNAS: u32 = 2;
pub const NUM_RX_ANTENNAS: u32 = 4;

const SPEED_OF_LIGHT: f64 = 3e8;
const PROFILE_COMMAND: &str = "profileCfg";
const FRAME_COMMAND: &str = "frameCfg";
const SENSOR_START: &str = "sensorStart";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("reading radar config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("radar config has no {0} line")]
    MissingCommand(&'static str),
    #[error("{command} field {index} missing")]
    MissingField { command: &'static str, index: usize },
    #[error("{command} field {index} has invalid value {value:?}")]
    InvalidField {
        command: &'static str,
        index: usize,
        value: String,
    },
    #[error("invalid radar config: {0}")]
    Invalid(String),
}

/// Fields of `profileCfg` the decoder depends on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub start_freq_ghz: f64,
    pub idle_time_us: f64,
    pub ramp_end_time_us: f64,
    pub freq_slope_mhz_per_us: f64,
    pub num_adc_samples: u32,
    pub dig_out_sample_rate_ksps: f64,
}

/// Fields of `frameCfg` the decoder depends on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameConfig {
    pub chirp_start_idx: u32,
    pub chirp_end_idx: u32,
    pub num_loops: u32,
    pub num_frames: u32,
    pub frame_periodicity_ms: f64,
}

struct Fields<'a> {
    command: &'static str,
    words: Vec<&'a str>,
}

impl<'a> Fields<'a> {
    fn parse<T: std::str::FromStr>(&self, index: usize) -> Result<T, ConfigError> {
        let raw = self.words.get(index).ok_or(ConfigError::MissingField {
            command: self.command,
            index,
        })?;
        raw.parse().map_err(|_| ConfigError::InvalidField {
            command: self.command,
            index,
            value: raw.to_string(),
        })
    }
}

impl ProfileConfig {
    fn from_fields(fields: &Fields<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            start_freq_ghz: fields.parse(2)?,
            idle_time_us: fields.parse(3)?,
            ramp_end_time_us: fields.parse(5)?,
            freq_slope_mhz_per_us: fields.parse(8)?,
            num_adc_samples: fields.parse(10)?,
            dig_out_sample_rate_ksps: fields.parse(11)?,
        })
    }
}

impl FrameConfig {
    fn from_fields(fields: &Fields<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            chirp_start_idx: fields.parse(1)?,
            chirp_end_idx: fields.parse(2)?,
            num_loops: fields.parse(3)?,
            num_frames: fields.parse(4)?,
            frame_periodicity_ms: fields.parse(5)?,
        })
    }

    /// `None` when the chirp range is inverted or the count overflows.
    pub fn chirps_per_frame(&self) -> Option<u32> {
        self.chirp_end_idx
            .checked_sub(self.chirp_start_idx)?
            .checked_add(1)?
            .checked_mul(self.num_loops)
    }
}

/// Resolution and scale constants derived once from the radar config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadarConfigParams {
    pub num_range_bins: u32,
    pub num_doppler_bins: u32,
    pub range_idx_to_meters: f64,
    pub range_resolution_meters: f64,
    pub doppler_resolution_mps: f64,
    pub max_range: f64,
    pub max_velocity: f64,
    pub frame_duration_seconds: f64,
}

impl RadarConfigParams {
    /// Pure derivation from the parsed profile and frame settings.
    pub fn derive(profile: &ProfileConfig, frame: &FrameConfig) -> Result<Self, ConfigError> {
        if profile.num_adc_samples == 0 {
            return Err(ConfigError::Invalid("numAdcSamples must be positive".into()));
        }
        if profile.freq_slope_mhz_per_us <= 0.0 {
            return Err(ConfigError::Invalid("freqSlopeConst must be positive".into()));
        }
        if profile.start_freq_ghz <= 0.0 {
            return Err(ConfigError::Invalid("startFreq must be positive".into()));
        }
        let chirp_time_us = profile.idle_time_us + profile.ramp_end_time_us;
        if chirp_time_us <= 0.0 {
            return Err(ConfigError::Invalid("idle + ramp end time must be positive".into()));
        }
        if frame.chirp_end_idx < frame.chirp_start_idx || frame.num_loops == 0 {
            return Err(ConfigError::Invalid(format!(
                "frameCfg chirps {}..={} x {} loops",
                frame.chirp_start_idx, frame.chirp_end_idx, frame.num_loops
            )));
        }
        if frame.frame_periodicity_ms <= 0.0 {
            return Err(ConfigError::Invalid("framePeriodicity must be positive".into()));
        }

        let chirps = frame.chirps_per_frame().ok_or_else(|| {
            ConfigError::Invalid(format!(
                "frameCfg chirps {}..={} x {} loops overflows",
                frame.chirp_start_idx, frame.chirp_end_idx, frame.num_loops
            ))
        })?;
        let num_doppler_bins = chirps / NUM_TX_ANTENNAS;
        if num_doppler_bins == 0 {
            return Err(ConfigError::Invalid("frame holds fewer chirps than TX antennas".into()));
        }
        let num_range_bins = profile
            .num_adc_samples
            .checked_next_power_of_two()
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "numAdcSamples {} has no u32 power of two above it",
                    profile.num_adc_samples
                ))
            })?;
        let num_tx = f64::from(NUM_TX_ANTENNAS);
        let sample_rate = profile.dig_out_sample_rate_ksps;
        let slope = profile.freq_slope_mhz_per_us;
        let start_freq_hz = profile.start_freq_ghz * 1e9;
        let chirp_time_s = chirp_time_us * 1e-6;
        let range_scale = SPEED_OF_LIGHT * sample_rate * 1e3 / (2.0 * slope * 1e12);

        Ok(Self {
            num_range_bins,
            num_doppler_bins,
            range_idx_to_meters: range_scale / f64::from(num_range_bins),
            range_resolution_meters: range_scale / f64::from(profile.num_adc_samples),
            doppler_resolution_mps: SPEED_OF_LIGHT
                / (2.0 * start_freq_hz * chirp_time_s * f64::from(num_doppler_bins) * num_tx),
            max_range: 300.0 * 0.9 * sample_rate / (2.0 * slope * 1e3),
            max_velocity: SPEED_OF_LIGHT / (4.0 * start_freq_hz * chirp_time_s * num_tx),
            frame_duration_seconds: frame.frame_periodicity_ms / 1000.0,
        })
    }
}

/// A loaded radar configuration: the command lines and their derived constants.
#[derive(Debug, Clone)]
pub struct RadarConfig {
    pub commands: Vec<String>,
    pub profile: ProfileConfig,
    pub frame: FrameConfig,
    pub params: RadarConfigParams,
}

impl RadarConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
            path: path_ref.display().to_string(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let commands = parse_commands(text);
        let mut profile = None;
        let mut frame = None;

        for line in &commands {
            let words: Vec<&str> = line.split_whitespace().collect();
            match words.first().copied() {
                Some(PROFILE_COMMAND) => {
                    let fields = Fields {
                        command: PROFILE_COMMAND,
                        words,
                    };
                    profile = Some(ProfileConfig::from_fields(&fields)?);
                }
                Some(FRAME_COMMAND) => {
                    let fields = Fields {
                        command: FRAME_COMMAND,
                        words,
                    };
                    frame = Some(FrameConfig::from_fields(&fields)?);
                }
                _ => {}
            }
        }

        let profile = profile.ok_or(ConfigError::MissingCommand(PROFILE_COMMAND))?;
        let frame = frame.ok_or(ConfigError::MissingCommand(FRAME_COMMAND))?;
        let params = RadarConfigParams::derive(&profile, &frame)?;
        Ok(Self {
            commands,
            profile,
            frame,
            params,
        })
    }

    /// Commands to upload before streaming; `sensorStart` is sent separately.
    pub fn upload_commands(&self) -> impl Iterator<Item = &str> {
        self.commands
            .iter()
            .map(String::as_str)
            .filter(|line| *line != SENSOR_START)
    }
}

/// Non-empty, non-comment lines of a radar config.
pub fn parse_commands(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('%'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE_CFG: &str = "\
% xwr16xx sample
sensorStop
flushCfg
dfeDataOutputMode 1
channelCfg 15 3 0
profileCfg 0 77 429 7 57.14 0 0 70 1 256 5209 0 0 30
chirpCfg 0 0 0 0 0 0 0 1
chirpCfg 1 1 0 0 0 0 0 2
frameCfg 0 1 16 0 100 1 0
sensorStart
";

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn derives_constants_from_profile_and_frame() {
        let cfg = RadarConfig::parse(SAMPLE_CFG).unwrap();
        let params = cfg.params;

        assert_eq!(params.num_range_bins, 256);
        assert_eq!(params.num_doppler_bins, 16);
        assert!(approx(
            params.range_resolution_meters,
            3e8 * 5209.0 * 1e3 / (2.0 * 70.0 * 1e12 * 256.0)
        ));
        assert!(approx(params.range_idx_to_meters, params.range_resolution_meters));
        assert!(approx(
            params.doppler_resolution_mps,
            3e8 / (2.0 * 77e9 * 486.14e-6 * 16.0 * 2.0)
        ));
        assert!(approx(params.max_range, 300.0 * 0.9 * 5209.0 / (2.0 * 70.0 * 1e3)));
        assert!(approx(params.max_velocity, 3e8 / (4.0 * 77e9 * 486.14e-6 * 2.0)));
        assert!(approx(params.frame_duration_seconds, 0.1));
    }

    #[test]
    fn adc_samples_round_up_to_power_of_two() {
        let text = SAMPLE_CFG.replace(" 256 5209", " 200 5209");
        let params = RadarConfig::parse(&text).unwrap().params;
        assert_eq!(params.num_range_bins, 256);
        assert!(params.range_resolution_meters > params.range_idx_to_meters);
    }

    #[test]
    fn comments_blank_lines_and_sensor_start_are_not_uploaded() {
        let cfg = RadarConfig::parse(SAMPLE_CFG).unwrap();
        let uploaded: Vec<&str> = cfg.upload_commands().collect();
        assert_eq!(uploaded.first(), Some(&"sensorStop"));
        assert!(!uploaded.contains(&"sensorStart"));
        assert!(uploaded.iter().all(|line| !line.starts_with('%')));
        assert_eq!(uploaded.len(), cfg.commands.len() - 1);
    }

    #[test]
    fn missing_frame_line_is_fatal() {
        let text = SAMPLE_CFG.replace("frameCfg", "% frameCfg");
        assert!(matches!(
            RadarConfig::parse(&text),
            Err(ConfigError::MissingCommand("frameCfg"))
        ));
    }

    #[test]
    fn malformed_field_names_its_position() {
        let text = SAMPLE_CFG.replace(" 256 5209", " many 5209");
        match RadarConfig::parse(&text) {
            Err(ConfigError::InvalidField { command, index, value }) => {
                assert_eq!(command, "profileCfg");
                assert_eq!(index, 10);
                assert_eq!(value, "many");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn overflowing_chirp_count_is_rejected() {
        let text = SAMPLE_CFG.replace("frameCfg 0 1 16", "frameCfg 0 4294967295 16");
        assert!(matches!(RadarConfig::parse(&text), Err(ConfigError::Invalid(_))));

        let text = SAMPLE_CFG.replace("frameCfg 0 1 16", "frameCfg 0 1 4294967295");
        assert!(matches!(RadarConfig::parse(&text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn oversized_adc_sample_count_is_rejected() {
        let text = SAMPLE_CFG.replace(" 256 5209", " 3000000000 5209");
        assert!(matches!(RadarConfig::parse(&text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_periodicity_is_rejected() {
        let text = SAMPLE_CFG.replace("frameCfg 0 1 16 0 100", "frameCfg 0 1 16 0 0");
        assert!(matches!(RadarConfig::parse(&text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn config_loads_from_file() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(SAMPLE_CFG.as_bytes()).unwrap();
        let path = temp.into_temp_path();
        let cfg = RadarConfig::load(&path).unwrap();
        assert_eq!(cfg.frame.num_loops, 16);
        assert_eq!(cfg.profile.num_adc_samples, 256);
    }
}
