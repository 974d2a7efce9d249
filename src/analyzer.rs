//! Motion analyzer
//! Turns a stream of timestamped (x, y) positions into a park / don't-park
//! decision by checking three quantities against one user sensitivity:
//!   velocity:         position delta / time delta
//!   acceleration:     velocity delta / time delta
//!   average velocity: exponentially decaying average of velocity, weighted
//!                     by time delta
//! Velocity and acceleration react to short sharp shocks; the average
//! catches long smooth movements and averages out sensor noise.

use crate::types::Position;

/// Averaging time depth for the velocity average (seconds)
pub const AVG_DEPTH_SECONDS: f64 = 0.3;

// Empirical scale factors that make a sensitivity of 10-20 behave sensibly.
pub const VELOC_ADJUST: f64 = 30.0;
pub const ACCEL_ADJUST: f64 = VELOC_ADJUST * 60.0;
pub const AVG_VELOC_ADJUST: f64 = 3.0;

/// A gap longer than this between samples is treated as suspend/resume
pub const DISCONTINUITY_SECONDS: f64 = 1.0;

/// Samples needed after a reset before a decision is trusted
pub const WARMUP_SAMPLES: u32 = 2;

/// Per-axis pair of derived quantities.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Axes {
    pub x: f64,
    pub y: f64,
}

impl Axes {
    pub const ZERO: Axes = Axes { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared magnitude (Pythagoras, no sqrt needed for threshold tests)
    pub fn norm_sqr(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    fn scaled(&self, factor: f64) -> Axes {
        Axes::new(self.x * factor, self.y * factor)
    }
}

/// Which of the three tests fired.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reasons {
    pub velocity: bool,
    pub acceleration: bool,
    pub avg_velocity: bool,
}

impl Reasons {
    pub fn any(&self) -> bool {
        self.velocity || self.acceleration || self.avg_velocity
    }

    /// Three-column flag string: "V", "A", "X" or a blank per test.
    pub fn flags(&self) -> String {
        [
            (self.velocity, 'V'),
            (self.acceleration, 'A'),
            (self.avg_velocity, 'X'),
        ]
        .iter()
        .map(|&(hit, c)| if hit { c } else { ' ' })
        .collect()
    }
}

/// Smoothed history owned by one analyzer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MotionState {
    pub last_position: Position,
    pub last_velocity: Axes,
    pub avg_velocity: Axes,
    /// Consecutive valid samples since the last reset, saturating at WARMUP_SAMPLES
    pub history: u32,
    /// None until the first sample has been seen
    pub last_timestamp: Option<f64>,
}

/// Everything computed for one sample, for diagnostics and tests.
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    /// Time since the previous sample; 0 on the first sample
    pub udelta: f64,
    pub delta: Axes,
    pub velocity: Axes,
    pub acceleration: Axes,
    pub avg_velocity: Axes,
    pub reasons: Reasons,
    pub reset: bool,
    pub warming_up: bool,
    pub triggered: bool,
}

impl Analysis {
    /// Values are divided by their adjust factor so they compare directly
    /// against the sensitivity.
    pub fn diagnostic_line(&self) -> String {
        format!(
            "dt={:5.3}  delta=({:3},{:3})  veloc=({:6.1},{:6.1})*{}  accel=({:6.1},{:6.1})*{}  avg_veloc=({:6.1},{:6.1})*{}  {}",
            self.udelta,
            self.delta.x,
            self.delta.y,
            self.velocity.x / VELOC_ADJUST,
            self.velocity.y / VELOC_ADJUST,
            VELOC_ADJUST,
            self.acceleration.x / ACCEL_ADJUST,
            self.acceleration.y / ACCEL_ADJUST,
            ACCEL_ADJUST,
            self.avg_velocity.x / AVG_VELOC_ADJUST,
            self.avg_velocity.y / AVG_VELOC_ADJUST,
            AVG_VELOC_ADJUST,
            self.reasons.flags(),
        )
    }
}

#[derive(Clone, Debug, Default)]
pub struct MotionAnalyzer {
    state: MotionState,
}

impl MotionAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &MotionState {
        &self.state
    }

    /// Decide whether the motion at `timestamp` exceeds `threshold`.
    pub fn analyze(&mut self, position: Position, timestamp: f64, threshold: u32) -> bool {
        self.evaluate(position, timestamp, threshold).triggered
    }

    /// Same as `analyze`, returning every intermediate value.
    pub fn evaluate(&mut self, position: Position, timestamp: f64, threshold: u32) -> Analysis {
        let state = &mut self.state;

        let first_sample = state.last_timestamp.is_none();
        let udelta = state.last_timestamp.map_or(0.0, |last| timestamp - last);
        let delta = if first_sample {
            Axes::ZERO
        } else {
            Axes::new(
                f64::from(position.x) - f64::from(state.last_position.x),
                f64::from(position.y) - f64::from(state.last_position.y),
            )
        };

        // No usable time base: report zero motion rather than divide.
        let usable_dt = !first_sample && udelta > 0.0;
        let (velocity, acceleration) = if usable_dt {
            let velocity = delta.scaled(1.0 / udelta);
            let acceleration = Axes::new(
                (velocity.x - state.last_velocity.x) / udelta,
                (velocity.y - state.last_velocity.y) / udelta,
            );
            (velocity, acceleration)
        } else {
            (Axes::ZERO, Axes::ZERO)
        };

        if usable_dt {
            let weight = udelta / AVG_DEPTH_SECONDS;
            let weight = weight / (1.0 + weight);
            state.avg_velocity = Axes::new(
                weight * velocity.x + (1.0 - weight) * state.avg_velocity.x,
                weight * velocity.y + (1.0 - weight) * state.avg_velocity.y,
            );
        }
        let avg_velocity = state.avg_velocity;

        let threshold = f64::from(threshold);
        let limit_sqr = |adjust: f64| {
            let limit = threshold * adjust;
            limit * limit
        };
        let reasons = Reasons {
            velocity: velocity.norm_sqr() > limit_sqr(VELOC_ADJUST),
            acceleration: acceleration.norm_sqr() > limit_sqr(ACCEL_ADJUST),
            avg_velocity: avg_velocity.norm_sqr() > limit_sqr(AVG_VELOC_ADJUST),
        };
        let mut triggered = reasons.any();

        let reset = first_sample || udelta > DISCONTINUITY_SECONDS;
        if reset {
            state.history = 0;
            state.avg_velocity = Axes::ZERO;
        }

        let warming_up = state.history < WARMUP_SAMPLES;
        if warming_up {
            triggered = false;
            state.history += 1;
        }

        state.last_position = position;
        // A zero or negative dt carries no velocity information; keep the old one.
        if usable_dt || first_sample {
            state.last_velocity = velocity;
        }
        state.last_timestamp = Some(timestamp);

        Analysis {
            udelta,
            delta,
            velocity,
            acceleration,
            avg_velocity,
            reasons,
            reset,
            warming_up,
            triggered,
        }
    }
}
