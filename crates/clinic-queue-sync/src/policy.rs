//! Backend transition rules.

use std::collections::HashSet;

use clinic_queue_core::models::{Lane, VisitRecord};
use clinic_queue_core::store::QueueBoard;

/// Business rules the backend applies before accepting a lane move.
#[derive(Debug, Clone)]
pub struct TransitionPolicy {
    allowed: HashSet<(Lane, Lane)>,
    /// Maximum visits one staff member may have in service at once
    max_in_service_per_staff: Option<usize>,
}

impl Default for TransitionPolicy {
    /// Front-desk flow: start service, finish service, or send back to wait.
    fn default() -> Self {
        Self {
            allowed: [
                (Lane::Waiting, Lane::InService),
                (Lane::InService, Lane::Completed),
                (Lane::InService, Lane::Waiting),
            ]
            .into_iter()
            .collect(),
            max_in_service_per_staff: None,
        }
    }
}

impl TransitionPolicy {
    /// Accept every lane change.
    pub fn permissive() -> Self {
        let allowed = Lane::ALL
            .into_iter()
            .flat_map(|from| Lane::ALL.into_iter().map(move |to| (from, to)))
            .filter(|(from, to)| from != to)
            .collect();
        Self {
            allowed,
            max_in_service_per_staff: None,
        }
    }

    pub fn allow(mut self, from: Lane, to: Lane) -> Self {
        self.allowed.insert((from, to));
        self
    }

    pub fn deny(mut self, from: Lane, to: Lane) -> Self {
        self.allowed.remove(&(from, to));
        self
    }

    pub fn with_staff_capacity(mut self, max_in_service: usize) -> Self {
        self.max_in_service_per_staff = Some(max_in_service);
        self
    }

    /// Check a move against the current server board. Returns the reason on
    /// refusal.
    pub fn check(
        &self,
        board: &QueueBoard,
        record: &VisitRecord,
        from: Lane,
        to: Lane,
    ) -> Result<(), String> {
        if from == to {
            return Ok(());
        }

        if !self.allowed.contains(&(from, to)) {
            return Err(match (from, to) {
                (Lane::Waiting, Lane::Completed) => "cannot skip in-service".to_string(),
                (Lane::Completed, _) => "visit is already completed".to_string(),
                _ => format!("moving from {} to {} is not allowed", from, to),
            });
        }

        if let (Lane::InService, Some(max)) = (to, self.max_in_service_per_staff) {
            let busy = board
                .get_lane(Lane::InService)
                .iter()
                .filter(|r| r.assigned_staff == record.assigned_staff)
                .count();
            if busy >= max {
                return Err(format!(
                    "{} already has {} patient(s) in service",
                    record.assigned_staff, busy
                ));
            }
        }

        Ok(())
    }
}
