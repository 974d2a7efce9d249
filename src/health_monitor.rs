/// Sensor silence longer than this is reported (seconds)
pub const SENSOR_SILENCE_SECONDS: f64 = 1.0;

/// Tracks read failures of the motion sensor during the run.
/// Individual failures only skip a tick; a sustained outage is logged once
/// when it starts and once when it ends.
#[derive(Clone, Debug)]
pub struct SensorHealth {
    pub name: String,
    pub silence_threshold: f64,
    failing_since: Option<f64>,
    consecutive_failures: u64,
    total_failures: u64,
    reported_silent: bool,
}

impl SensorHealth {
    pub fn new(name: &str, silence_threshold: f64) -> Self {
        SensorHealth {
            name: name.to_string(),
            silence_threshold,
            failing_since: None,
            consecutive_failures: 0,
            total_failures: 0,
            reported_silent: false,
        }
    }

    /// Returns the outage length if this read ends a reported outage.
    pub fn record_success(&mut self, now: f64) -> Option<f64> {
        let outage = self.failing_since.take().map(|since| now - since);
        self.consecutive_failures = 0;

        if std::mem::take(&mut self.reported_silent) {
            let outage = outage.unwrap_or(0.0);
            log::info!("{} readings resumed after {:.1}s", self.name, outage);
            return Some(outage);
        }
        None
    }

    pub fn record_failure(&mut self, now: f64, reason: &str) {
        self.failing_since.get_or_insert(now);
        self.consecutive_failures += 1;
        self.total_failures += 1;
        log::debug!("{} read failed, skipping tick: {}", self.name, reason);

        if !self.reported_silent && self.is_silent(now) {
            self.reported_silent = true;
            log::warn!(
                "{} silent for {:.1}s ({} failed reads): {}",
                self.name,
                self.silence_duration(now),
                self.consecutive_failures,
                reason
            );
        }
    }

    pub fn silence_duration(&self, now: f64) -> f64 {
        self.failing_since.map_or(0.0, |since| now - since)
    }

    pub fn is_silent(&self, now: f64) -> bool {
        self.silence_duration(now) > self.silence_threshold
    }

    pub fn is_healthy(&self) -> bool {
        self.consecutive_failures == 0
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures
    }

    pub fn total_failures(&self) -> u64 {
        self.total_failures
    }

    /// Format health status for logging
    pub fn format_status(&self, now: f64) -> String {
        if self.is_healthy() {
            format!("{}: ok", self.name)
        } else {
            format!(
                "{}: failing for {:.1}s ({} reads)",
                self.name,
                self.silence_duration(now),
                self.consecutive_failures
            )
        }
    }
}
