use crate::analyzer::{Analysis, MotionAnalyzer};
use crate::config::Config;
use crate::controller::{ProtectionController, StepOutcome, Transition, PAUSE_SECONDS};
use crate::health_monitor::{SensorHealth, SENSOR_SILENCE_SECONDS};
use crate::live_status::{current_timestamp, LiveStatus};
use crate::pause::PauseFlag;
use crate::platform;
use crate::protect::ProtectionSwitch;
use crate::sensors::SensorSource;
use crate::types::Sample;
use std::future::Future;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};

/// How often the status file is refreshed
const STATUS_INTERVAL: Duration = Duration::from_secs(2);

/// Sample timestamps in seconds since the loop started. Uses the boot clock so
/// time spent suspended is counted and the analyzer sees the gap on resume;
/// falls back to the monotonic clock where that is unavailable.
struct SampleClock {
    start: Instant,
    boot_start: Option<f64>,
}

impl SampleClock {
    fn new() -> Self {
        let boot_start = match platform::boot_time() {
            Ok(t) => Some(t),
            Err(e) => {
                log::warn!("boot clock unavailable, suspend will not reset motion history: {}", e);
                None
            }
        };
        SampleClock {
            start: Instant::now(),
            boot_start,
        }
    }

    fn now(&self) -> f64 {
        if let Some(boot_start) = self.boot_start {
            if let Ok(t) = platform::boot_time() {
                return t - boot_start;
            }
        }
        self.start.elapsed().as_secs_f64()
    }
}

/// Result of one sampling tick
#[derive(Clone, Debug)]
pub struct TickReport {
    pub sample: Sample,
    pub analysis: Analysis,
    pub outcome: StepOutcome,
}

/// The sampling loop: sensor -> analyzer -> controller -> protect attribute,
/// once per tick.
pub struct Daemon<S, P> {
    config: Config,
    sensor: S,
    switch: P,
    analyzer: MotionAnalyzer,
    controller: ProtectionController,
    health: SensorHealth,
    pause: PauseFlag,
    samples: u64,
}

impl<S: SensorSource, P: ProtectionSwitch> Daemon<S, P> {
    pub fn new(config: Config, sensor: S, switch: P, pause: PauseFlag) -> Self {
        Daemon {
            config,
            sensor,
            switch,
            analyzer: MotionAnalyzer::new(),
            controller: ProtectionController::new(),
            health: SensorHealth::new("sensor", SENSOR_SILENCE_SECONDS),
            pause,
            samples: 0,
        }
    }

    pub fn controller(&self) -> &ProtectionController {
        &self.controller
    }

    pub fn analyzer(&self) -> &MotionAnalyzer {
        &self.analyzer
    }

    pub fn switch(&self) -> &P {
        &self.switch
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// One read-analyze-decide-write cycle at monotonic time `now`.
    /// A failed sensor read skips the tick without touching any state; a
    /// pending pause request stays pending until a tick goes through.
    pub fn tick(&mut self, now: f64) -> Option<TickReport> {
        let position = match self.sensor.read() {
            Ok(position) => {
                self.health.record_success(now);
                position
            }
            Err(e) => {
                self.health.record_failure(now, &e.to_string());
                return None;
            }
        };
        let sample = Sample::new(position, now);
        self.samples += 1;

        let analysis = self
            .analyzer
            .evaluate(sample.position, sample.timestamp, self.config.threshold);
        if self.config.verbose {
            log::debug!("{}", analysis.diagnostic_line());
        }

        let pause_requested = self.pause.take();
        let outcome = self.controller.step(
            &mut self.switch,
            analysis.triggered,
            pause_requested,
            sample.timestamp,
        );
        log_outcome(&sample, &outcome);

        Some(TickReport {
            sample,
            analysis,
            outcome,
        })
    }

    pub fn status(&self, uptime_seconds: f64) -> LiveStatus {
        let state = self.controller.state();
        LiveStatus {
            timestamp: current_timestamp(),
            uptime_seconds,
            device: self.config.device.clone(),
            threshold: self.config.threshold,
            samples: self.samples,
            sensor_failures: self.health.total_failures(),
            sensor_healthy: self.health.is_healthy(),
            parked: state.is_parked(),
            paused: state.is_paused(),
            ..Default::default()
        }
        .with_controller(self.controller.stats())
    }

    fn save_status(&self, uptime_seconds: f64) {
        if let Some(path) = &self.config.status_file {
            if let Err(e) = self.status(uptime_seconds).save(path) {
                log::debug!("status file {} not written: {}", path.display(), e);
            }
        }
    }

    /// Leave the device unparked before exiting.
    pub fn release(&mut self) -> StepOutcome {
        let outcome = self.controller.release(&mut self.switch);
        if outcome.transition == Transition::Unpark {
            log::info!("un-parked on shutdown");
        }
        outcome
    }

    /// Sample at the configured frequency until `shutdown` resolves. The tick
    /// in progress always completes before the loop stops.
    pub async fn run<F: Future<Output = ()>>(&mut self, shutdown: F) {
        let clock = SampleClock::new();
        let mut ticker = interval(self.config.tick_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_status = Instant::now();

        log::info!(
            "protecting {} (sensitivity {}, {} Hz, sensor {})",
            self.switch.describe(),
            self.config.threshold,
            self.config.frequency_hz,
            self.sensor.describe()
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            let now = clock.now();
            self.tick(now);

            if last_status.elapsed() >= STATUS_INTERVAL {
                self.save_status(now);
                last_status = Instant::now();
            }
        }

        self.release();
        let uptime = clock.now();
        self.save_status(uptime);
        log::info!(
            "stopped after {} samples ({})",
            self.samples,
            self.health.format_status(uptime)
        );
    }
}

fn log_outcome(sample: &Sample, outcome: &StepOutcome) {
    // Logged after the write so a slow terminal cannot delay the park.
    match outcome.transition {
        Transition::Park => log::info!("{}: parking", sample.wall_clock_str()),
        Transition::Unpark => log::info!("{}: un-parking", sample.wall_clock_str()),
        _ => {}
    }
    if outcome.pause_started {
        log::info!(
            "{}: pausing for {} seconds",
            sample.wall_clock_str(),
            PAUSE_SECONDS
        );
    }
    if outcome.resumed {
        log::info!("{}: pause over, protection resumed", sample.wall_clock_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{FREEZE_SECONDS, PARK_SECONDS};
    use crate::error::GuardError;
    use crate::testing::{RecordingSwitch, ScriptedSensor};
    use crate::types::Position;

    const DT: f64 = 0.02;

    fn tick_time(i: u32) -> f64 {
        f64::from(i) * DT
    }

    fn harness(threshold: u32) -> (Daemon<ScriptedSensor, RecordingSwitch>, PauseFlag) {
        let pause = PauseFlag::new();
        let daemon = Daemon::new(
            Config::new("sda", threshold),
            ScriptedSensor::still(Position::new(0, 0)),
            RecordingSwitch::new(),
            pause.clone(),
        );
        (daemon, pause)
    }

    #[test]
    fn test_single_jolt_parks_once_then_unparks() {
        let (mut daemon, _) = harness(15);

        // One calm second at 50 Hz
        for i in 0..50 {
            daemon.tick(tick_time(i)).unwrap();
        }
        assert!(daemon.switch().writes.is_empty());

        // A single-sample jolt that reverts on the next tick
        daemon.sensor_mut().push(Ok(Position::new(500, 500)));
        daemon.sensor_mut().push(Ok(Position::new(0, 0)));

        let mut park_time = None;
        let mut last_park_write = None;
        let mut unpark_time = None;
        for i in 50..250 {
            let now = tick_time(i);
            let report = daemon.tick(now).unwrap();
            match report.outcome.transition {
                Transition::Park => {
                    assert!(park_time.is_none(), "second park at {}", now);
                    park_time = Some(now);
                    last_park_write = Some(now);
                }
                Transition::Refreeze => last_park_write = Some(now),
                Transition::Unpark => {
                    assert!(unpark_time.is_none(), "second unpark at {}", now);
                    unpark_time = Some(now);
                }
                _ => {}
            }
        }

        assert_eq!(park_time, Some(tick_time(50)));
        let last_park_write = last_park_write.unwrap();
        let unpark_time = unpark_time.expect("calm must unpark");
        assert!(unpark_time - last_park_write >= f64::from(FREEZE_SECONDS) - 1e-9);
        assert!(unpark_time - last_park_write < f64::from(FREEZE_SECONDS) + 2.0 * DT);

        let switch = daemon.switch();
        assert_eq!(daemon.controller().stats().parks, 1);
        assert_eq!(switch.unpark_writes(), 1);
        assert_eq!(switch.writes.last(), Some(&0));
        assert!(switch.writes[..switch.writes.len() - 1]
            .iter()
            .all(|&w| w == PARK_SECONDS));
    }

    #[test]
    fn test_motion_across_suspend_gap_does_not_park() {
        let (mut daemon, _) = harness(15);
        for i in 0..50 {
            daemon.tick(tick_time(i));
        }

        // Lid closed, machine carried around, resumed in a new orientation
        let resumed_at = tick_time(49) + 30.0;
        daemon.sensor_mut().push(Ok(Position::new(200, -200)));
        let report = daemon.tick(resumed_at).unwrap();
        assert!(report.analysis.reset);
        assert_eq!(report.outcome.transition, Transition::Idle);

        for i in 1..50 {
            let report = daemon.tick(resumed_at + tick_time(i)).unwrap();
            assert!(!report.analysis.triggered, "triggered {} ticks after resume", i);
        }
        assert!(daemon.switch().writes.is_empty());
    }

    #[test]
    fn test_sample_clock_counts_from_zero() {
        let clock = SampleClock::new();
        let first = clock.now();
        assert!((0.0..1.0).contains(&first));
        assert!(clock.now() >= first);
    }

    #[test]
    fn test_sensor_failure_skips_tick() {
        let (mut daemon, pause) = harness(15);
        for i in 0..5 {
            daemon.tick(tick_time(i));
        }
        let before = daemon.analyzer().state().clone();

        daemon.sensor_mut().fail_next(1);
        pause.request();
        assert!(daemon.tick(tick_time(5)).is_none());

        assert_eq!(daemon.analyzer().state(), &before);
        assert_eq!(daemon.samples(), 5);
        assert!(!daemon.controller().state().is_paused());

        // The pending pause is applied on the next good tick
        let report = daemon.tick(tick_time(6)).unwrap();
        assert!(report.outcome.pause_started);
        assert_eq!(daemon.status(0.0).sensor_failures, 1);
    }

    #[test]
    fn test_sensor_error_kinds_are_absorbed() {
        let (mut daemon, _) = harness(15);
        daemon
            .sensor_mut()
            .push(Err(GuardError::MalformedReading("(12".to_string())));

        assert!(daemon.tick(0.0).is_none());
        assert!(daemon.tick(DT).is_some());
        assert!(daemon.switch().writes.is_empty());
    }

    #[test]
    fn test_pause_request_unparks_and_holds_off() {
        let (mut daemon, pause) = harness(1);
        for i in 0..10 {
            daemon.tick(tick_time(i));
        }

        // Continuous shaking
        let mut i = 10;
        let shake = |daemon: &mut Daemon<ScriptedSensor, RecordingSwitch>, i: u32| {
            let x = if i % 2 == 0 { 300 } else { -300 };
            daemon.sensor_mut().push(Ok(Position::new(x, x)));
            daemon.tick(tick_time(i)).unwrap()
        };
        assert_eq!(shake(&mut daemon, i).outcome.transition, Transition::Park);
        i += 1;

        pause.request();
        let report = shake(&mut daemon, i);
        assert_eq!(report.outcome.transition, Transition::Unpark);
        let pause_end = tick_time(i) + PAUSE_SECONDS;
        let writes_at_pause = daemon.switch().writes.len();
        i += 1;

        while tick_time(i) < pause_end - 1e-9 {
            let report = shake(&mut daemon, i);
            assert_eq!(report.outcome.transition, Transition::Idle);
            i += 1;
        }
        assert_eq!(daemon.switch().writes.len(), writes_at_pause);

        // Pause has run out; shaking parks again within a tick
        let mut parked_again = false;
        for _ in 0..2 {
            if shake(&mut daemon, i).outcome.transition == Transition::Park {
                parked_again = true;
                break;
            }
            i += 1;
        }
        assert!(parked_again);
    }

    #[test]
    fn test_release_on_shutdown() {
        let (mut daemon, _) = harness(15);
        for i in 0..5 {
            daemon.tick(tick_time(i));
        }
        daemon.sensor_mut().push(Ok(Position::new(900, 900)));
        assert_eq!(daemon.tick(tick_time(5)).unwrap().outcome.transition, Transition::Park);

        assert_eq!(daemon.release().transition, Transition::Unpark);
        assert!(!daemon.controller().state().is_parked());
        assert_eq!(daemon.switch().writes, vec![PARK_SECONDS, 0]);
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let status_path =
            std::env::temp_dir().join(format!("shock_guard_run_{}.json", std::process::id()));
        let mut config = Config::new("sda", 15);
        config.status_file = Some(status_path.clone());

        let mut daemon = Daemon::new(
            config,
            ScriptedSensor::still(Position::new(3, 4)),
            RecordingSwitch::new(),
            PauseFlag::new(),
        );
        daemon.run(tokio::time::sleep(Duration::from_millis(150))).await;

        assert!(daemon.samples() >= 2);
        assert!(daemon.switch().writes.is_empty());

        let saved: LiveStatus =
            serde_json::from_str(&std::fs::read_to_string(&status_path).unwrap()).unwrap();
        assert_eq!(saved.samples, daemon.samples());
        assert_eq!(saved.device, "sda");
        assert!(!saved.parked);

        std::fs::remove_file(&status_path).ok();
    }
}
