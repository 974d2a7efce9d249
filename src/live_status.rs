use crate::controller::ControllerStats;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Snapshot of the daemon written to the optional status file.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct LiveStatus {
    pub timestamp: f64,
    pub uptime_seconds: f64,
    pub device: String,
    pub threshold: u32,
    pub samples: u64,
    pub sensor_failures: u64,
    pub sensor_healthy: bool,
    pub parked: bool,
    pub paused: bool,
    // Controller counters
    pub parks: u64,
    pub refreezes: u64,
    pub unparks: u64,
    pub write_failures: u64,
    pub state_warnings: u64,
    pub pauses: u64,
}

impl LiveStatus {
    pub fn new() -> Self {
        Self {
            timestamp: current_timestamp(),
            sensor_healthy: true,
            ..Default::default()
        }
    }

    pub fn with_controller(mut self, stats: &ControllerStats) -> Self {
        self.parks = stats.parks;
        self.refreezes = stats.refreezes;
        self.unparks = stats.unparks;
        self.write_failures = stats.write_failures;
        self.state_warnings = stats.state_warnings;
        self.pauses = stats.pauses;
        self
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
