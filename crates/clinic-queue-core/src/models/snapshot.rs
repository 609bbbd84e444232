//! Full-board snapshots.

use serde::{Deserialize, Serialize};

use super::lane::Lane;
use super::visit::VisitRecord;

/// Authoritative contents of all three lanes, as delivered after reconnect.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    #[serde(default)]
    pub waiting: Vec<VisitRecord>,
    #[serde(default)]
    pub in_service: Vec<VisitRecord>,
    #[serde(default)]
    pub completed: Vec<VisitRecord>,
}

impl BoardSnapshot {
    /// Records of one lane.
    pub fn lane(&self, lane: Lane) -> &[VisitRecord] {
        match lane {
            Lane::Waiting => &self.waiting,
            Lane::InService => &self.in_service,
            Lane::Completed => &self.completed,
        }
    }

    /// Split into per-lane sequences in board order.
    pub fn into_lanes(self) -> [(Lane, Vec<VisitRecord>); 3] {
        [
            (Lane::Waiting, self.waiting),
            (Lane::InService, self.in_service),
            (Lane::Completed, self.completed),
        ]
    }

    /// Total number of records across lanes.
    pub fn len(&self) -> usize {
        self.waiting.len() + self.in_service.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
