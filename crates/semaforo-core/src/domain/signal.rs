//! Signal states and the timed cycle they move through.
//!
//! # The cycle
//!
//! ```text
//!   Green ──(green)──► Yellow ──(yellow)──► Red ──(red)──► Green
//! ```
//!
//! A run always starts by (re)asserting green, holds each colour for its
//! configured duration and finishes on green with no hold.  Transitions never
//! skip or reverse a step.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The colour currently shown by the panel.  Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalState {
    #[default]
    Green,
    Yellow,
    Red,
}

impl SignalState {
    /// Lowercase name, as used on the status page.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }

    /// The state that follows this one in the cycle.
    pub fn next(self) -> Self {
        match self {
            Self::Green => Self::Yellow,
            Self::Yellow => Self::Red,
            Self::Red => Self::Green,
        }
    }
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How long each colour is held during a run.  Fixed for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTimes {
    pub green: Duration,
    pub yellow: Duration,
    pub red: Duration,
}

impl CycleTimes {
    /// Builds cycle times from whole seconds.
    pub fn from_secs(green: u64, yellow: u64, red: u64) -> Self {
        Self {
            green: Duration::from_secs(green),
            yellow: Duration::from_secs(yellow),
            red: Duration::from_secs(red),
        }
    }

    /// Hold time for `state`.
    pub fn duration(&self, state: SignalState) -> Duration {
        match state {
            SignalState::Green => self.green,
            SignalState::Yellow => self.yellow,
            SignalState::Red => self.red,
        }
    }

    /// Time from the start of a run until the closing green.
    pub fn total(&self) -> Duration {
        self.green + self.yellow + self.red
    }

    /// The four steps of one run, in order.
    pub fn phases(&self) -> [Phase; 4] {
        [
            Phase::hold(SignalState::Green, self.green),
            Phase::hold(SignalState::Yellow, self.yellow),
            Phase::hold(SignalState::Red, self.red),
            Phase::closing(),
        ]
    }
}

impl Default for CycleTimes {
    fn default() -> Self {
        Self::from_secs(6, 6, 15)
    }
}

/// One step of a run: show `state`, then wait `hold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    pub state: SignalState,
    pub hold: Duration,
    /// `true` only for the final green that ends the run.
    pub closing: bool,
}

impl Phase {
    fn hold(state: SignalState, hold: Duration) -> Self {
        Self {
            state,
            hold,
            closing: false,
        }
    }

    fn closing() -> Self {
        Self {
            state: SignalState::Green,
            hold: Duration::ZERO,
            closing: true,
        }
    }

    /// Event-log text for entering this phase.
    pub fn describe(&self) -> String {
        if self.closing {
            "Cycle complete; returning to green".to_string()
        } else {
            format!("State: {}", self.state)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_green() {
        assert_eq!(SignalState::default(), SignalState::Green);
    }

    #[test]
    fn test_next_follows_fixed_order() {
        assert_eq!(SignalState::Green.next(), SignalState::Yellow);
        assert_eq!(SignalState::Yellow.next(), SignalState::Red);
        assert_eq!(SignalState::Red.next(), SignalState::Green);
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&SignalState::Yellow).unwrap();
        assert_eq!(json, "\"yellow\"");
    }

    #[test]
    fn test_display_matches_as_str() {
        for state in [SignalState::Green, SignalState::Yellow, SignalState::Red] {
            assert_eq!(state.to_string(), state.as_str());
        }
    }

    #[test]
    fn test_default_cycle_times() {
        let times = CycleTimes::default();
        assert_eq!(times.green, Duration::from_secs(6));
        assert_eq!(times.yellow, Duration::from_secs(6));
        assert_eq!(times.red, Duration::from_secs(15));
        assert_eq!(times.total(), Duration::from_secs(27));
    }

    #[test]
    fn test_phases_follow_cycle_and_end_on_green_without_hold() {
        // Arrange
        let times = CycleTimes::from_secs(1, 2, 3);

        // Act
        let phases = times.phases();

        // Assert
        let states: Vec<_> = phases.iter().map(|p| p.state).collect();
        assert_eq!(
            states,
            vec![
                SignalState::Green,
                SignalState::Yellow,
                SignalState::Red,
                SignalState::Green
            ]
        );
        assert_eq!(phases[0].hold, Duration::from_secs(1));
        assert_eq!(phases[1].hold, Duration::from_secs(2));
        assert_eq!(phases[2].hold, Duration::from_secs(3));
        assert_eq!(phases[3].hold, Duration::ZERO);
        assert!(phases[3].closing);
        assert!(phases[..3].iter().all(|p| !p.closing));
    }

    #[test]
    fn test_each_phase_is_the_successor_of_the_previous() {
        let phases = CycleTimes::default().phases();
        for pair in phases.windows(2) {
            assert_eq!(pair[0].state.next(), pair[1].state);
        }
    }

    #[test]
    fn test_phase_descriptions() {
        let phases = CycleTimes::default().phases();
        assert_eq!(phases[0].describe(), "State: green");
        assert_eq!(phases[1].describe(), "State: yellow");
        assert_eq!(phases[2].describe(), "State: red");
        assert_eq!(phases[3].describe(), "Cycle complete; returning to green");
    }

    #[test]
    fn test_duration_lookup() {
        let times = CycleTimes::from_secs(4, 5, 9);
        assert_eq!(times.duration(SignalState::Yellow), Duration::from_secs(5));
        assert_eq!(times.duration(SignalState::Red), Duration::from_secs(9));
    }
}
