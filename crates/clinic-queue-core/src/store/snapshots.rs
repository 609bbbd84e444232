//! Authoritative snapshot application.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::QueueBoard;
use crate::models::{BoardSnapshot, Lane, VisitRecord};

impl QueueBoard {
    /// Replace a whole lane with the server's copy.
    ///
    /// Any local state for the lane is discarded. Records named by the
    /// snapshot are pulled out of the other lanes, so a visit that moved on
    /// another client ends up in exactly one place even before the snapshot of
    /// its old lane arrives. Duplicate IDs inside the snapshot keep their first
    /// occurrence.
    pub fn replace_snapshot(&mut self, lane: Lane, records: Vec<VisitRecord>) {
        let mut seen = HashSet::with_capacity(records.len());
        let mut incoming = Vec::with_capacity(records.len());

        for mut record in records {
            if !seen.insert(record.id.clone()) {
                warn!(lane = %lane, id = %record.id, "dropping duplicate record in lane snapshot");
                continue;
            }
            record.lane = lane;
            incoming.push(record);
        }

        for other in Lane::ALL.into_iter().filter(|l| *l != lane) {
            let displaced = self.lane_mut(other);
            let before = displaced.len();
            displaced.retain(|r| !seen.contains(&r.id));
            let removed = before - displaced.len();
            if removed > 0 {
                debug!(from = %other, to = %lane, removed, "snapshot moved records across lanes");
            }
        }

        debug!(lane = %lane, count = incoming.len(), "applied lane snapshot");
        *self.lane_mut(lane) = incoming;
    }

    /// Replace the whole board, e.g. after a reconnect.
    ///
    /// Lanes are applied in board order; a record listed in more than one lane
    /// ends up in the right-most one.
    pub fn replace_all(&mut self, snapshot: BoardSnapshot) {
        for lane in Lane::ALL {
            self.lane_mut(lane).clear();
        }
        for (lane, records) in snapshot.into_lanes() {
            self.replace_snapshot(lane, records);
        }
    }
}
