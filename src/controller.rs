use crate::protect::ProtectionSwitch;
use serde::{Deserialize, Serialize};

/// Period to keep the disk parked after the last trigger (seconds)
pub const FREEZE_SECONDS: u32 = 1;
/// Slack added to the kernel-side timer so it outlives our refresh cadence.
/// Never reduce it.
pub const FREEZE_EXTRA_SECONDS: u32 = 4;
/// Minimum interval between repeated park commands (seconds)
pub const REFREEZE_SECONDS: f64 = 0.1;
/// How long a pause request suspends parking (seconds)
pub const PAUSE_SECONDS: f64 = 8.0;

/// Value written to the protect attribute on every park
pub const PARK_SECONDS: u32 = FREEZE_SECONDS + FREEZE_EXTRA_SECONDS;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParkState {
    Unparked,
    /// `since` is the monotonic time of the last park command
    Parked { since: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProtectionState {
    pub park: ParkState,
    /// End of the active pause window, if any
    pub paused_until: Option<f64>,
}

impl Default for ProtectionState {
    fn default() -> Self {
        Self {
            park: ParkState::Unparked,
            paused_until: None,
        }
    }
}

impl ProtectionState {
    pub fn is_parked(&self) -> bool {
        matches!(self.park, ParkState::Parked { .. })
    }

    pub fn is_paused(&self) -> bool {
        self.paused_until.is_some()
    }
}

/// What one controller step did to the protect attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Nothing to do
    Idle,
    /// Unparked -> Parked
    Park,
    /// Still shaking, park command re-issued
    Refreeze,
    /// Still shaking, last park command is recent enough
    Hold,
    /// Parked -> Unparked
    Unpark,
    /// A write was attempted and failed; state is unchanged
    WriteFailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    pub transition: Transition,
    pub pause_started: bool,
    pub resumed: bool,
    /// Sanity read found the attribute unparked while we believed it parked
    pub inconsistent: bool,
}

impl Default for StepOutcome {
    fn default() -> Self {
        Self {
            transition: Transition::Idle,
            pause_started: false,
            resumed: false,
            inconsistent: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerStats {
    pub parks: u64,
    pub refreezes: u64,
    pub unparks: u64,
    pub write_failures: u64,
    pub state_warnings: u64,
    pub pauses: u64,
}

/// Park/unpark state machine with refreeze debounce, freeze hysteresis and
/// an externally requested pause window.
#[derive(Clone, Debug, Default)]
pub struct ProtectionController {
    state: ProtectionState,
    stats: ControllerStats,
}

impl ProtectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ProtectionState {
        &self.state
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    /// Apply one tick's decision. `pause_requested` is true at most once per
    /// external request; a request while already paused restarts the window.
    pub fn step<S: ProtectionSwitch + ?Sized>(
        &mut self,
        switch: &mut S,
        triggered: bool,
        pause_requested: bool,
        now: f64,
    ) -> StepOutcome {
        let mut outcome = StepOutcome::default();

        if pause_requested {
            self.state.paused_until = Some(now + PAUSE_SECONDS);
            self.stats.pauses += 1;
            outcome.pause_started = true;
        }
        if let Some(until) = self.state.paused_until {
            if now >= until {
                self.state.paused_until = None;
                outcome.resumed = true;
            }
        }
        let paused = self.state.is_paused();

        if triggered && !paused {
            outcome.transition = self.park(switch, now);
        } else if let ParkState::Parked { since } = self.state.park {
            if paused || now - since >= f64::from(FREEZE_SECONDS) {
                let transition = self.unpark(switch, &mut outcome);
                outcome.transition = transition;
            }
        }

        outcome
    }

    /// Unpark if parked, regardless of timing. Used on shutdown.
    pub fn release<S: ProtectionSwitch + ?Sized>(&mut self, switch: &mut S) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        if self.state.is_parked() {
            let transition = self.unpark(switch, &mut outcome);
            outcome.transition = transition;
        }
        outcome
    }

    fn park<S: ProtectionSwitch + ?Sized>(&mut self, switch: &mut S, now: f64) -> Transition {
        let was_parked = match self.state.park {
            ParkState::Parked { since } if now - since < REFREEZE_SECONDS => {
                return Transition::Hold;
            }
            ParkState::Parked { .. } => true,
            ParkState::Unparked => false,
        };

        match switch.write(PARK_SECONDS) {
            Ok(()) => {
                self.state.park = ParkState::Parked { since: now };
                if was_parked {
                    self.stats.refreezes += 1;
                    Transition::Refreeze
                } else {
                    self.stats.parks += 1;
                    Transition::Park
                }
            }
            Err(e) => {
                log::warn!("park command to {} failed: {}", switch.describe(), e);
                self.stats.write_failures += 1;
                Transition::WriteFailed
            }
        }
    }

    fn unpark<S: ProtectionSwitch + ?Sized>(
        &mut self,
        switch: &mut S,
        outcome: &mut StepOutcome,
    ) -> Transition {
        match switch.read() {
            Ok(0) => {
                log::warn!(
                    "{} not parked when we thought we were (paged out and timer expired?)",
                    switch.describe()
                );
                self.stats.state_warnings += 1;
                outcome.inconsistent = true;
            }
            Ok(_) => {}
            Err(e) => log::debug!("sanity read inconclusive: {}", e),
        }

        match switch.write(0) {
            Ok(()) => {
                self.state.park = ParkState::Unparked;
                self.stats.unparks += 1;
                Transition::Unpark
            }
            Err(e) => {
                log::warn!("unpark command to {} failed: {}", switch.describe(), e);
                self.stats.write_failures += 1;
                Transition::WriteFailed
            }
        }
    }
}
