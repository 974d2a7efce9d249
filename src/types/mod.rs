use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Raw (x, y) reading from the chassis motion sensor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One position reading stamped with the monotonic clock (seconds since the
/// loop started) and the wall clock used in log lines.
#[derive(Clone, Debug)]
pub struct Sample {
    pub position: Position,
    pub timestamp: f64,
    pub wall_clock: DateTime<Local>,
}

impl Sample {
    pub fn new(position: Position, timestamp: f64) -> Self {
        Self {
            position,
            timestamp,
            wall_clock: Local::now(),
        }
    }

    /// ctime(3)-style rendering, e.g. "Wed Mar 22 10:14:03 2006".
    pub fn wall_clock_str(&self) -> String {
        self.wall_clock.format("%a %b %e %H:%M:%S %Y").to_string()
    }
}
