//! In-memory sensor and protect attribute used by the crate's tests.

use crate::error::{GuardError, GuardResult};
use crate::protect::ProtectionSwitch;
use crate::sensors::SensorSource;
use crate::types::Position;
use std::collections::VecDeque;

/// Replays queued readings, then repeats the last good one.
pub struct ScriptedSensor {
    pub queue: VecDeque<GuardResult<Position>>,
    pub current: Position,
    pub reads: usize,
}

impl ScriptedSensor {
    pub fn still(position: Position) -> Self {
        Self {
            queue: VecDeque::new(),
            current: position,
            reads: 0,
        }
    }

    pub fn push(&mut self, reading: GuardResult<Position>) {
        self.queue.push_back(reading);
    }

    pub fn fail_next(&mut self, times: usize) {
        for _ in 0..times {
            self.push(Err(GuardError::SensorUnavailable("scripted".to_string())));
        }
    }
}

impl SensorSource for ScriptedSensor {
    fn read(&mut self) -> GuardResult<Position> {
        self.reads += 1;
        match self.queue.pop_front() {
            Some(Ok(position)) => {
                self.current = position;
                Ok(position)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.current),
        }
    }

    fn describe(&self) -> String {
        "scripted sensor".to_string()
    }
}

/// Records every write; the stored value behaves like the kernel attribute.
#[derive(Default)]
pub struct RecordingSwitch {
    pub value: u32,
    pub writes: Vec<u32>,
    pub reads: usize,
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub missing: bool,
}

impl RecordingSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn park_writes(&self) -> usize {
        self.writes.iter().filter(|&&w| w > 0).count()
    }

    pub fn unpark_writes(&self) -> usize {
        self.writes.iter().filter(|&&w| w == 0).count()
    }
}

impl ProtectionSwitch for RecordingSwitch {
    fn read(&mut self) -> GuardResult<u32> {
        self.reads += 1;
        if self.fail_reads || self.missing {
            return Err(GuardError::SwitchIo("scripted read failure".to_string()));
        }
        Ok(self.value)
    }

    fn write(&mut self, seconds: u32) -> GuardResult<()> {
        if self.fail_writes || self.missing {
            return Err(GuardError::SwitchIo("scripted write failure".to_string()));
        }
        self.value = seconds;
        self.writes.push(seconds);
        Ok(())
    }

    fn describe(&self) -> String {
        "recording switch".to_string()
    }
}
