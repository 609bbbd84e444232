//! JSON wire format shared with the backend.
//!
//! Records travel in the `VisitRecord` shape (camelCase keys, RFC 3339
//! `enteredLaneAt`). Push-channel messages carry a `type` tag.

use clinic_queue_core::gateway::{Ack, SyncError, SyncEvent, SyncResult};
use clinic_queue_core::models::{BoardSnapshot, Lane, LaneTransition, VisitRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire decoding errors.
#[derive(Error, Debug)]
pub enum WireError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

pub type WireResult<T> = Result<T, WireError>;

impl From<WireError> for SyncError {
    fn from(e: WireError) -> Self {
        SyncError::Transport(e.to_string())
    }
}

/// Message received over the push channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PushMessage {
    /// Authoritative full contents of one lane
    #[serde(rename_all = "camelCase")]
    LaneUpdate {
        lane: Lane,
        records: Vec<VisitRecord>,
    },
    /// Backend asks every client to reload the whole board
    Resync,
}

impl From<PushMessage> for SyncEvent {
    fn from(message: PushMessage) -> Self {
        match message {
            PushMessage::LaneUpdate { lane, records } => SyncEvent::LaneUpdated { lane, records },
            PushMessage::Resync => SyncEvent::Reconnected,
        }
    }
}

/// Backend reply to a pushed transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum TransitionReply {
    Accepted(Ack),
    Rejected { reason: String },
}

impl TransitionReply {
    pub fn into_result(self) -> SyncResult<Ack> {
        match self {
            TransitionReply::Accepted(ack) => Ok(ack),
            TransitionReply::Rejected { reason } => Err(SyncError::Rejected(reason)),
        }
    }
}

impl From<SyncResult<Ack>> for TransitionReply {
    fn from(result: SyncResult<Ack>) -> Self {
        match result {
            Ok(ack) => TransitionReply::Accepted(ack),
            Err(SyncError::Rejected(reason)) => TransitionReply::Rejected { reason },
            Err(e) => TransitionReply::Rejected {
                reason: e.to_string(),
            },
        }
    }
}

/// Encode a transition request body.
pub fn encode_transition(transition: &LaneTransition) -> WireResult<String> {
    Ok(serde_json::to_string(transition)?)
}

/// Decode a transition request body.
pub fn decode_transition(json: &str) -> WireResult<LaneTransition> {
    Ok(serde_json::from_str(json)?)
}

/// Encode a push-channel message.
pub fn encode_push(message: &PushMessage) -> WireResult<String> {
    Ok(serde_json::to_string(message)?)
}

/// Decode a push-channel frame into a sync event.
///
/// Blank frames (keep-alives) are rejected as invalid so the caller can skip
/// them explicitly.
pub fn decode_push(frame: &str) -> WireResult<SyncEvent> {
    if frame.trim().is_empty() {
        return Err(WireError::InvalidMessage("empty frame".into()));
    }
    let message: PushMessage = serde_json::from_str(frame)?;
    Ok(message.into())
}

/// Decode a transition reply into the gateway result.
pub fn decode_reply(json: &str) -> SyncResult<Ack> {
    let reply: TransitionReply =
        serde_json::from_str(json).map_err(|e| SyncError::from(WireError::from(e)))?;
    reply.into_result()
}

/// Decode a lane snapshot (JSON array of records).
pub fn decode_lane(json: &str) -> WireResult<Vec<VisitRecord>> {
    Ok(serde_json::from_str(json)?)
}

/// Decode a full-board snapshot.
pub fn decode_board(json: &str) -> WireResult<BoardSnapshot> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANE_UPDATE: &str = r#"{
        "type": "laneUpdate",
        "lane": "inService",
        "records": [{
            "id": "V1",
            "patientName": "Ana Souza",
            "serviceLabel": "General consultation",
            "assignedStaff": "Dr. Lima",
            "scheduledTime": "09:30:00",
            "lane": "inService",
            "enteredLaneAt": "2024-01-15T09:42:00Z"
        }]
    }"#;

    #[test]
    fn test_decode_lane_update() {
        match decode_push(LANE_UPDATE).unwrap() {
            SyncEvent::LaneUpdated { lane, records } => {
                assert_eq!(lane, Lane::InService);
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].patient_name, "Ana Souza");
                assert_eq!(records[0].entered_lane_at.to_rfc3339(), "2024-01-15T09:42:00+00:00");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_decode_resync() {
        assert_eq!(decode_push(r#"{"type":"resync"}"#).unwrap(), SyncEvent::Reconnected);
    }

    #[test]
    fn test_decode_push_rejects_garbage() {
        assert!(matches!(decode_push("   "), Err(WireError::InvalidMessage(_))));
        assert!(matches!(
            decode_push(r#"{"type":"teleport"}"#),
            Err(WireError::JsonParse(_))
        ));
    }

    #[test]
    fn test_transition_body() {
        let transition = LaneTransition::new("V1", Lane::Waiting, Lane::InService);
        let json = encode_transition(&transition).unwrap();
        assert_eq!(
            json,
            r#"{"recordId":"V1","fromLane":"waiting","toLane":"inService"}"#
        );
        assert_eq!(decode_transition(&json).unwrap(), transition);
    }

    #[test]
    fn test_decode_reply() {
        let ack = decode_reply(
            r#"{"status":"accepted","recordId":"V1","lane":"inService","appliedAt":"2024-01-15T09:42:00Z"}"#,
        )
        .unwrap();
        assert_eq!(ack.record_id, "V1");
        assert_eq!(ack.lane, Lane::InService);

        assert_eq!(
            decode_reply(r#"{"status":"rejected","reason":"cannot skip in-service"}"#),
            Err(SyncError::Rejected("cannot skip in-service".into()))
        );
        assert!(matches!(decode_reply("nope"), Err(SyncError::Transport(_))));
    }

    #[test]
    fn test_decode_board_defaults_missing_lanes() {
        let board = decode_board(r#"{"waiting": []}"#).unwrap();
        assert!(board.is_empty());
    }
}
