//! Queue lanes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three front-desk lanes a visit passes through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Lane {
    /// Checked in, not yet seen
    Waiting,
    /// With a doctor or resource
    InService,
    /// Visit finished, awaiting archival
    Completed,
}

impl Lane {
    /// All lanes in board order (left to right).
    pub const ALL: [Lane; 3] = [Lane::Waiting, Lane::InService, Lane::Completed];

    /// Position of the lane on the board.
    pub fn index(self) -> usize {
        match self {
            Lane::Waiting => 0,
            Lane::InService => 1,
            Lane::Completed => 2,
        }
    }

    /// Wire name of the lane.
    pub fn as_str(self) -> &'static str {
        match self {
            Lane::Waiting => "waiting",
            Lane::InService => "inService",
            Lane::Completed => "completed",
        }
    }

    /// Column heading shown on the board.
    pub fn title(self) -> &'static str {
        match self {
            Lane::Waiting => "Waiting",
            Lane::InService => "In Service",
            Lane::Completed => "Completed",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a lane name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lane: {0}")]
pub struct UnknownLane(pub String);

impl FromStr for Lane {
    type Err = UnknownLane;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "waiting" => Ok(Lane::Waiting),
            "inservice" | "in_service" | "in-service" => Ok(Lane::InService),
            "completed" => Ok(Lane::Completed),
            _ => Err(UnknownLane(s.to_string())),
        }
    }
}
