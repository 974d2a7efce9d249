use crate::error::{GuardError, GuardResult};
use crate::protect::protect_path;
use crate::sensors::HDAPS_POSITION_FILE;
use std::path::PathBuf;
use std::time::Duration;

/// Default sampling frequency
pub const FREQ_HZ: u32 = 50;
/// Highest accepted sampling frequency; keeps the tick period at 1 ms or more
pub const MAX_FREQ_HZ: u32 = 1000;

/// Plain configuration values consumed by the daemon.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Block device name, e.g. "sda"
    pub device: String,
    /// User-facing sensitivity; lower parks more eagerly
    pub threshold: u32,
    pub verbose: bool,
    pub background: bool,
    pub protect_file: PathBuf,
    pub position_file: PathBuf,
    pub frequency_hz: u32,
    pub status_file: Option<PathBuf>,
}

impl Config {
    pub fn new(device: &str, threshold: u32) -> Self {
        Config {
            device: device.to_string(),
            threshold,
            verbose: false,
            background: false,
            protect_file: protect_path(device),
            position_file: PathBuf::from(HDAPS_POSITION_FILE),
            frequency_hz: FREQ_HZ,
            status_file: None,
        }
    }

    /// Reject values the daemon cannot start with. Background mode turns
    /// verbose diagnostics off since nothing would see them.
    pub fn validated(mut self) -> GuardResult<Self> {
        if self.threshold == 0 {
            return Err(GuardError::InvalidConfig(
                "sensitivity must be a positive integer (15 is a good start)".to_string(),
            ));
        }
        if self.device.is_empty() || self.device.contains('/') {
            return Err(GuardError::InvalidConfig(format!(
                "device must be a block device name like sda or hda, got {:?}",
                self.device
            )));
        }
        if self.frequency_hz == 0 || self.frequency_hz > MAX_FREQ_HZ {
            return Err(GuardError::InvalidConfig(format!(
                "sampling frequency must be between 1 and {} Hz, got {}",
                MAX_FREQ_HZ, self.frequency_hz
            )));
        }
        if self.background {
            self.verbose = false;
        }
        Ok(self)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frequency_hz.max(1)))
    }
}
