use crate::error::{GuardError, GuardResult};
use crate::protect::ProtectionSwitch;
use crate::sensors::SensorSource;
use crate::types::Position;
use std::time::Duration;
use tokio::time::sleep;

/// Interval between readiness probes when running unattended (10 Hz)
pub const STARTUP_RETRY_INTERVAL: Duration = Duration::from_millis(100);
/// Retries after the first probe when running unattended (~10 seconds)
pub const STARTUP_RETRY_ATTEMPTS: u32 = 100;

/// How long to wait for the sysfs attributes to appear.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub retries: u32,
    pub interval: Duration,
}

impl ReadinessPolicy {
    /// Started by hand: a missing attribute is reported right away.
    pub fn attended() -> Self {
        Self {
            retries: 0,
            interval: STARTUP_RETRY_INTERVAL,
        }
    }

    /// Started from init scripts: the driver may still be creating attributes.
    pub fn unattended() -> Self {
        Self {
            retries: STARTUP_RETRY_ATTEMPTS,
            interval: STARTUP_RETRY_INTERVAL,
        }
    }

    pub fn for_background(background: bool) -> Self {
        if background {
            Self::unattended()
        } else {
            Self::attended()
        }
    }
}

/// Retry bookkeeping for one startup probe
#[derive(Clone, Debug)]
pub struct RetryState {
    pub name: String,
    pub attempts: u32,
    pub max_retries: u32,
    pub interval: Duration,
}

impl RetryState {
    pub fn new(name: &str, policy: ReadinessPolicy) -> Self {
        RetryState {
            name: name.to_string(),
            attempts: 0,
            max_retries: policy.retries,
            interval: policy.interval,
        }
    }

    /// Record a failed probe. Returns how long to wait before the next one,
    /// or None once the retry budget is spent.
    pub fn record_failed_attempt(&mut self) -> Option<Duration> {
        self.attempts += 1;
        if self.attempts > self.max_retries {
            return None;
        }
        log::debug!(
            "{} not ready, retry {}/{} in {:?}",
            self.name,
            self.attempts,
            self.max_retries,
            self.interval
        );
        Some(self.interval)
    }

    pub fn status(&self) -> String {
        format!(
            "{}: {} failed probe(s), {} retries allowed",
            self.name, self.attempts, self.max_retries
        )
    }
}

async fn retry<T>(
    state: &mut RetryState,
    mut probe: impl FnMut() -> GuardResult<T>,
) -> GuardResult<T> {
    loop {
        match probe() {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => match state.record_failed_attempt() {
                Some(wait) => sleep(wait).await,
                None => return Err(e),
            },
        }
    }
}

/// Confirm the protect attribute and the sensor are usable before sampling.
/// Returns the first position read.
pub async fn wait_until_ready<P, S>(
    switch: &mut P,
    sensor: &mut S,
    policy: ReadinessPolicy,
) -> GuardResult<Position>
where
    P: ProtectionSwitch + ?Sized,
    S: SensorSource + ?Sized,
{
    let mut protect_state = RetryState::new("protect attribute", policy);
    let probed = retry(&mut protect_state, || switch.probe()).await;
    probed.map_err(|e| {
        GuardError::StartupUnavailable(format!(
            "protect attribute {}: {} ({})",
            switch.describe(),
            e,
            protect_state.status()
        ))
    })?;

    let mut sensor_state = RetryState::new("sensor", policy);
    let first = retry(&mut sensor_state, || sensor.read()).await;
    first.map_err(|e| {
        GuardError::StartupUnavailable(format!(
            "sensor {}: {} ({})",
            sensor.describe(),
            e,
            sensor_state.status()
        ))
    })
}
