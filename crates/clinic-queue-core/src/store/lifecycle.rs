//! Check-in and archival.

use chrono::Utc;

use super::{QueueBoard, QueueError, QueueResult};
use crate::models::{Lane, VisitRecord};

impl QueueBoard {
    /// Register an arrival at the back of the Waiting lane. A record tagged
    /// with another lane is re-tagged and its lane clock restarted.
    pub fn check_in(&mut self, mut record: VisitRecord) -> QueueResult<()> {
        if let Some((lane, _)) = self.locate(&record.id) {
            return Err(QueueError::DuplicateRecord {
                id: record.id,
                lane,
            });
        }
        if record.lane != Lane::Waiting {
            record.enter_lane(Lane::Waiting, Utc::now());
        }
        self.lane_mut(Lane::Waiting).push(record);
        Ok(())
    }

    /// Remove one finished visit from the board.
    pub fn archive(&mut self, record_id: &str) -> QueueResult<VisitRecord> {
        let index = self
            .position_in(Lane::Completed, record_id)
            .ok_or_else(|| QueueError::RecordNotFound {
                id: record_id.to_string(),
                lane: Lane::Completed,
            })?;
        Ok(self.lane_mut(Lane::Completed).remove(index))
    }

    /// End-of-day sweep: drain the Completed lane.
    pub fn archive_completed(&mut self) -> Vec<VisitRecord> {
        std::mem::take(self.lane_mut(Lane::Completed))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_check_in_appends_to_waiting() {
        let mut board = board(&["P1"], &[], &[]);
        board.check_in(visit("P2", Lane::Completed)).unwrap();

        assert_eq!(ids(&board, Lane::Waiting), vec!["P1", "P2"]);
        assert_eq!(board.get("P2").unwrap().lane, Lane::Waiting);
    }

    #[test]
    fn test_check_in_restarts_clock_for_retagged_record() {
        let mut board = QueueBoard::new();
        let stale = visit("P1", Lane::Completed);
        let stale_entry = stale.entered_lane_at;
        let before = Utc::now();

        board.check_in(stale).unwrap();
        board.check_in(visit("P2", Lane::Waiting)).unwrap();

        let p1 = board.get("P1").unwrap();
        assert_eq!(p1.lane, Lane::Waiting);
        assert!(p1.entered_lane_at >= before);
        assert_eq!(p1.minutes_in_lane(Utc::now()), 0);
        // Already tagged Waiting: the caller's timestamp stands.
        assert_eq!(board.get("P2").unwrap().entered_lane_at, stale_entry);
    }

    #[test]
    fn test_check_in_rejects_duplicate() {
        let mut board = board(&[], &["P1"], &[]);
        let err = board.check_in(visit("P1", Lane::Waiting)).unwrap_err();
        assert_eq!(
            err,
            QueueError::DuplicateRecord {
                id: "P1".into(),
                lane: Lane::InService
            }
        );
        assert!(board.get_lane(Lane::Waiting).is_empty());
    }

    #[test]
    fn test_archive_only_from_completed() {
        let mut board = board(&["P1"], &[], &["P2"]);

        assert!(matches!(
            board.archive("P1"),
            Err(QueueError::RecordNotFound { .. })
        ));
        let archived = board.archive("P2").unwrap();
        assert_eq!(archived.id, "P2");
        assert!(board.get_lane(Lane::Completed).is_empty());
    }

    #[test]
    fn test_archive_completed_drains_lane() {
        let mut board = board(&["P1"], &["P2"], &["P3", "P4"]);
        let archived = board.archive_completed();

        assert_eq!(archived.len(), 2);
        assert!(board.get_lane(Lane::Completed).is_empty());
        assert_eq!(board.len(), 2);
    }
}
