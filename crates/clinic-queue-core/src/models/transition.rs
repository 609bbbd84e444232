//! Lane transitions reported to the backend.

use serde::{Deserialize, Serialize};

use super::lane::Lane;

/// A completed lane move, as pushed to the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LaneTransition {
    /// Visit that moved
    pub record_id: String,
    /// Lane it left
    pub from_lane: Lane,
    /// Lane it entered
    pub to_lane: Lane,
}

impl LaneTransition {
    pub fn new(record_id: impl Into<String>, from_lane: Lane, to_lane: Lane) -> Self {
        Self {
            record_id: record_id.into(),
            from_lane,
            to_lane,
        }
    }

    /// Lanes whose contents this transition touched.
    pub fn affected_lanes(&self) -> Vec<Lane> {
        if self.from_lane == self.to_lane {
            vec![self.from_lane]
        } else {
            vec![self.from_lane, self.to_lane]
        }
    }
}
