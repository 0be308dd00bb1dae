//! Servo directions and the single-character commands the firmware expects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where to move the servo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    FullLeft,
    Left,
    Right,
    FullRight,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::FullLeft,
        Direction::Left,
        Direction::Right,
        Direction::FullRight,
    ];

    /// Command byte sent to the microcontroller.
    pub fn command(self) -> char {
        match self {
            Self::FullLeft => 'F',
            Self::Left => 'L',
            Self::Right => 'R',
            Self::FullRight => 'G',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullLeft => "fullleft",
            Self::Left => "left",
            Self::Right => "right",
            Self::FullRight => "fullright",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a direction name the firmware has no command for.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid direction")]
pub struct InvalidDirection(pub String);

impl FromStr for Direction {
    type Err = InvalidDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| InvalidDirection(s.to_string()))
    }
}
