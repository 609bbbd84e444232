//! Visit records.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::lane::Lane;

/// A patient's single pass through the queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    /// Visit ID - stable across lane moves
    pub id: String,
    /// Patient display name
    pub patient_name: String,
    /// Service being rendered (e.g., "General consultation")
    pub service_label: String,
    /// Doctor or resource handling the visit
    pub assigned_staff: String,
    /// Originally booked time of day
    pub scheduled_time: NaiveTime,
    /// Current lane
    pub lane: Lane,
    /// Timestamp of the most recent lane transition
    pub entered_lane_at: DateTime<Utc>,
}

impl VisitRecord {
    /// Register a new visit at check-in. New visits always start in Waiting.
    pub fn new(
        patient_name: String,
        service_label: String,
        assigned_staff: String,
        scheduled_time: NaiveTime,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_name,
            service_label,
            assigned_staff,
            scheduled_time,
            lane: Lane::Waiting,
            entered_lane_at: Utc::now(),
        }
    }

    /// Time spent in the current lane as of `now`. Never negative.
    pub fn time_in_lane(&self, now: DateTime<Utc>) -> Duration {
        let elapsed = now - self.entered_lane_at;
        if elapsed < Duration::zero() {
            Duration::zero()
        } else {
            elapsed
        }
    }

    /// Whole minutes spent in the current lane as of `now`.
    pub fn minutes_in_lane(&self, now: DateTime<Utc>) -> i64 {
        self.time_in_lane(now).num_minutes()
    }

    /// Record a lane change.
    pub(crate) fn enter_lane(&mut self, lane: Lane, at: DateTime<Utc>) {
        self.lane = lane;
        self.entered_lane_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nine_am() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 0, 0).unwrap()
    }

    #[test]
    fn test_new_visit() {
        let visit = VisitRecord::new(
            "Ana Souza".into(),
            "General consultation".into(),
            "Dr. Lima".into(),
            nine_am(),
        );
        assert_eq!(visit.lane, Lane::Waiting);
        assert_eq!(visit.patient_name, "Ana Souza");
        assert_eq!(visit.id.len(), 36); // UUID format
    }

    #[test]
    fn test_time_in_lane() {
        let mut visit =
            VisitRecord::new("Ana".into(), "Checkup".into(), "Dr. Lima".into(), nine_am());
        let entered = Utc::now();
        visit.enter_lane(Lane::InService, entered);

        assert_eq!(visit.minutes_in_lane(entered + Duration::minutes(17)), 17);
        // Clock skew never yields a negative wait
        assert_eq!(visit.time_in_lane(entered - Duration::minutes(5)), Duration::zero());
    }

    #[test]
    fn test_wire_shape() {
        let visit =
            VisitRecord::new("Ana".into(), "Checkup".into(), "Dr. Lima".into(), nine_am());
        let json: serde_json::Value = serde_json::to_value(&visit).unwrap();

        assert_eq!(json["patientName"], "Ana");
        assert_eq!(json["serviceLabel"], "Checkup");
        assert_eq!(json["assignedStaff"], "Dr. Lima");
        assert_eq!(json["scheduledTime"], "09:00:00");
        assert_eq!(json["lane"], "waiting");
        assert!(json["enteredLaneAt"].as_str().unwrap().contains('T'));
    }
}
