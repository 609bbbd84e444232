//! Lane moves.

use chrono::{DateTime, Utc};

use super::{QueueBoard, QueueError, QueueResult};
use crate::models::Lane;

impl QueueBoard {
    /// Move a visit from `from_lane` to `to_lane`, inserting it at `to_index`.
    ///
    /// `to_index` is an insertion point into the destination lane as it looks
    /// once the record has been taken out of its source, so valid values are
    /// `0..=len` of that lane. Both preconditions are checked before anything
    /// is touched; on error the board is unchanged.
    pub fn move_record(
        &mut self,
        record_id: &str,
        from_lane: Lane,
        to_lane: Lane,
        to_index: usize,
    ) -> QueueResult<()> {
        self.move_record_at(record_id, from_lane, to_lane, to_index, Utc::now())
    }

    /// [`move_record`](Self::move_record) with an explicit transition time.
    pub fn move_record_at(
        &mut self,
        record_id: &str,
        from_lane: Lane,
        to_lane: Lane,
        to_index: usize,
        at: DateTime<Utc>,
    ) -> QueueResult<()> {
        let from_index =
            self.position_in(from_lane, record_id)
                .ok_or_else(|| QueueError::RecordNotFound {
                    id: record_id.to_string(),
                    lane: from_lane,
                })?;

        let dest_len = self.destination_len(from_lane, to_lane);
        if to_index > dest_len {
            return Err(QueueError::InvalidIndex {
                lane: to_lane,
                index: to_index,
                len: dest_len,
            });
        }

        let mut record = self.lane_mut(from_lane).remove(from_index);
        if from_lane != to_lane {
            record.enter_lane(to_lane, at);
        }
        self.lane_mut(to_lane).insert(to_index, record);

        Ok(())
    }

    /// Length of the destination lane with the moving record removed. Passing
    /// it as `to_index` appends to the end of the lane.
    pub fn destination_len(&self, from_lane: Lane, to_lane: Lane) -> usize {
        let len = self.get_lane(to_lane).len();
        if from_lane == to_lane {
            len.saturating_sub(1)
        } else {
            len
        }
    }
}
