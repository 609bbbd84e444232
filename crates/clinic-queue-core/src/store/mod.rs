//! In-memory queue store.
//!
//! The board owns one ordered sequence per lane. Lane membership changes only
//! through [`QueueBoard::move_record`], [`QueueBoard::replace_snapshot`] and the
//! check-in / archival entry points, each of which keeps every visit ID in
//! exactly one lane.

mod lifecycle;
mod moves;
mod snapshots;

use std::collections::HashSet;

use thiserror::Error;

use crate::models::{BoardSnapshot, Lane, VisitRecord};

/// Queue store errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Record {id} not found in lane {lane}")]
    RecordNotFound { id: String, lane: Lane },

    #[error("Index {index} out of bounds for lane {lane} (insertion points 0..={len})")]
    InvalidIndex { lane: Lane, index: usize, len: usize },

    #[error("Record {id} is already on the board in lane {lane}")]
    DuplicateRecord { id: String, lane: Lane },

    #[error("Board invariant violated: {0}")]
    InvariantViolation(String),
}

pub type QueueResult<T> = Result<T, QueueError>;

/// The three-lane queue board.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueBoard {
    lanes: [Vec<VisitRecord>; 3],
}

impl QueueBoard {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a board from an authoritative snapshot.
    pub fn from_snapshot(snapshot: BoardSnapshot) -> Self {
        let mut board = Self::new();
        board.replace_all(snapshot);
        board
    }

    /// Read-only view of a lane, front of line first.
    pub fn get_lane(&self, lane: Lane) -> &[VisitRecord] {
        &self.lanes[lane.index()]
    }

    /// Find the lane and position of a visit.
    pub fn locate(&self, record_id: &str) -> Option<(Lane, usize)> {
        Lane::ALL.into_iter().find_map(|lane| {
            self.position_in(lane, record_id)
                .map(|index| (lane, index))
        })
    }

    /// Get a visit by ID.
    pub fn get(&self, record_id: &str) -> Option<&VisitRecord> {
        self.locate(record_id)
            .map(|(lane, index)| &self.lanes[lane.index()][index])
    }

    /// Total number of visits on the board.
    pub fn len(&self) -> usize {
        self.lanes.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.iter().all(Vec::is_empty)
    }

    /// Copy the current board into a snapshot.
    pub fn to_snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            waiting: self.get_lane(Lane::Waiting).to_vec(),
            in_service: self.get_lane(Lane::InService).to_vec(),
            completed: self.get_lane(Lane::Completed).to_vec(),
        }
    }

    /// Verify that every visit ID appears exactly once and that each record's
    /// `lane` field matches the sequence holding it.
    pub fn check_invariants(&self) -> QueueResult<()> {
        let mut seen = HashSet::new();
        for lane in Lane::ALL {
            for record in self.get_lane(lane) {
                if !seen.insert(record.id.as_str()) {
                    return Err(QueueError::InvariantViolation(format!(
                        "record {} appears more than once",
                        record.id
                    )));
                }
                if record.lane != lane {
                    return Err(QueueError::InvariantViolation(format!(
                        "record {} is held in {} but tagged {}",
                        record.id, lane, record.lane
                    )));
                }
            }
        }
        Ok(())
    }

    fn position_in(&self, lane: Lane, record_id: &str) -> Option<usize> {
        self.lanes[lane.index()]
            .iter()
            .position(|r| r.id == record_id)
    }

    fn lane_mut(&mut self, lane: Lane) -> &mut Vec<VisitRecord> {
        &mut self.lanes[lane.index()]
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{NaiveTime, TimeZone, Utc};

    use super::*;

    /// A visit with a predictable ID, entered at a fixed instant.
    pub fn visit(id: &str, lane: Lane) -> VisitRecord {
        VisitRecord {
            id: id.to_string(),
            patient_name: format!("Patient {}", id),
            service_label: "General consultation".to_string(),
            assigned_staff: "Dr. Lima".to_string(),
            scheduled_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            lane,
            entered_lane_at: Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap(),
        }
    }

    /// Board with the given IDs in each lane.
    pub fn board(waiting: &[&str], in_service: &[&str], completed: &[&str]) -> QueueBoard {
        QueueBoard::from_snapshot(BoardSnapshot {
            waiting: waiting.iter().map(|id| visit(id, Lane::Waiting)).collect(),
            in_service: in_service
                .iter()
                .map(|id| visit(id, Lane::InService))
                .collect(),
            completed: completed
                .iter()
                .map(|id| visit(id, Lane::Completed))
                .collect(),
        })
    }

    pub fn ids(board: &QueueBoard, lane: Lane) -> Vec<String> {
        board.get_lane(lane).iter().map(|r| r.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_empty_lane_is_empty_slice() {
        let board = QueueBoard::new();
        for lane in Lane::ALL {
            assert!(board.get_lane(lane).is_empty());
        }
        assert!(board.is_empty());
    }

    #[test]
    fn test_locate() {
        let board = board(&["P1", "P2"], &["P3"], &[]);
        assert_eq!(board.locate("P2"), Some((Lane::Waiting, 1)));
        assert_eq!(board.locate("P3"), Some((Lane::InService, 0)));
        assert_eq!(board.locate("P9"), None);
        assert_eq!(board.get("P3").unwrap().lane, Lane::InService);
        assert_eq!(board.len(), 3);
    }

    #[test]
    fn test_invariants_detect_mismatched_lane_tag() {
        let mut board = board(&["P1"], &[], &[]);
        board.lane_mut(Lane::Waiting)[0].lane = Lane::Completed;
        assert!(matches!(
            board.check_invariants(),
            Err(QueueError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let board = board(&["P1"], &["P2"], &["P3"]);
        let rebuilt = QueueBoard::from_snapshot(board.to_snapshot());
        assert_eq!(board, rebuilt);
    }
}
