//! Turn selection
//!
//! Left-hand-on-the-wall rule: always take the leftmost available exit.
//! This gives a consistent, retraceable traversal of a simply-connected
//! maze. The decision is purely local; no path is recorded.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::intersection::ExitFlags;

/// Discrete action chosen at an intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnAction {
    /// Spin left onto the left exit
    Left,
    /// Spin right onto the right exit
    Right,
    /// Keep going across a full-width crossing
    Through,
    /// No exit seen; back up (no maneuver is defined for this)
    DeadEndReverse,
}

impl TurnAction {
    /// Single-letter code: `L`, `R`, `T` or `B`
    pub fn code(self) -> char {
        match self {
            Self::Left => 'L',
            Self::Right => 'R',
            Self::Through => 'T',
            Self::DeadEndReverse => 'B',
        }
    }
}

impl fmt::Display for TurnAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Pick the turn for a set of exit flags
///
/// Priority is fixed: left, then right, then through, then dead end. A
/// full-width crossing also sets both side flags, so it resolves to `Left`;
/// `Through` is only reachable when `tee` is set without either side flag.
pub fn decide(flags: ExitFlags) -> TurnAction {
    if flags.left {
        TurnAction::Left
    } else if flags.right {
        TurnAction::Right
    } else if flags.tee {
        TurnAction::Through
    } else {
        TurnAction::DeadEndReverse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_always_wins() {
        for right in [false, true] {
            for tee in [false, true] {
                assert_eq!(decide(ExitFlags::new(true, right, tee)), TurnAction::Left);
            }
        }
    }

    #[test]
    fn test_right_beats_through() {
        assert_eq!(decide(ExitFlags::new(false, true, true)), TurnAction::Right);
        assert_eq!(decide(ExitFlags::new(false, true, false)), TurnAction::Right);
    }

    #[test]
    fn test_tee_alone_goes_through() {
        assert_eq!(decide(ExitFlags::new(false, false, true)), TurnAction::Through);
    }

    #[test]
    fn test_no_exits_is_dead_end() {
        assert_eq!(decide(ExitFlags::NONE), TurnAction::DeadEndReverse);
    }

    #[test]
    fn test_codes() {
        let codes: String = [
            TurnAction::Left,
            TurnAction::Right,
            TurnAction::Through,
            TurnAction::DeadEndReverse,
        ]
        .iter()
        .map(|a| a.to_string())
        .collect();
        assert_eq!(codes, "LRTB");
    }
}
