//! Status sync gateway contract.
//!
//! The backend is the system of record. The board pushes lane transitions to
//! it and receives authoritative full-lane updates back over a subscription.
//!
//! Reconnect protocol:
//! 1. Gateway reports `Disconnected` when the push channel drops
//! 2. Gateway reports `Reconnected` once the channel is back
//! 3. The session fetches all three lanes and applies them before reading
//!    any further lane updates

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::{BoardSnapshot, Lane, LaneTransition, VisitRecord};

/// Sync errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Sync timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transition rejected: {0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Sync channel closed")]
    Closed,
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Backend confirmation of a pushed transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    /// Visit the backend accepted
    pub record_id: String,
    /// Lane the backend now holds it in
    pub lane: Lane,
    /// When the backend applied it
    pub applied_at: DateTime<Utc>,
}

/// Message delivered over a subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Authoritative full contents of one lane
    LaneUpdated {
        lane: Lane,
        records: Vec<VisitRecord>,
    },
    /// Push channel dropped; updates may be missed until `Reconnected`
    Disconnected,
    /// Push channel restored; local state must be refreshed in full
    Reconnected,
}

/// Live feed of [`SyncEvent`]s. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<SyncEvent>,
}

impl Subscription {
    pub fn new(rx: mpsc::UnboundedReceiver<SyncEvent>) -> Self {
        Self { rx }
    }

    /// Open a subscription together with the sender that feeds it.
    pub fn channel() -> (mpsc::UnboundedSender<SyncEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx))
    }

    /// Wait for the next event. `None` once the gateway has hung up.
    pub async fn recv(&mut self) -> Option<SyncEvent> {
        self.rx.recv().await
    }

    /// Take an already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<SyncEvent> {
        self.rx.try_recv().ok()
    }

    /// Stop receiving updates.
    pub fn unsubscribe(mut self) {
        self.rx.close();
    }
}

/// Backend collaborator used by the queue session.
#[async_trait]
pub trait StatusSyncGateway: Send + Sync {
    /// Report a completed lane move. The backend decides whether it is valid.
    async fn push_transition(&self, transition: &LaneTransition) -> SyncResult<Ack>;

    /// Fetch the authoritative contents of one lane.
    async fn fetch_lane(&self, lane: Lane) -> SyncResult<Vec<VisitRecord>>;

    /// Fetch the authoritative contents of all lanes.
    async fn fetch_board(&self) -> SyncResult<BoardSnapshot>;

    /// Open the real-time update feed.
    fn subscribe(&self) -> Subscription;
}

/// Bound a gateway call, mapping an elapsed deadline to [`SyncError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> SyncResult<T>
where
    F: Future<Output = SyncResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(SyncError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let result = with_timeout(Duration::from_millis(50), async { Ok::<_, SyncError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_with_timeout_elapses() {
        let limit = Duration::from_millis(10);
        let result: SyncResult<()> = with_timeout(limit, std::future::pending()).await;
        assert_eq!(result, Err(SyncError::Timeout(limit)));
    }

    #[tokio::test]
    async fn test_subscription_ends_when_sender_dropped() {
        let (tx, mut subscription) = Subscription::channel();
        tx.send(SyncEvent::Reconnected).unwrap();
        drop(tx);

        assert_eq!(subscription.recv().await, Some(SyncEvent::Reconnected));
        assert_eq!(subscription.recv().await, None);
    }

    #[test]
    fn test_unsubscribe_closes_channel() {
        let (tx, subscription) = Subscription::channel();
        subscription.unsubscribe();
        assert!(tx.send(SyncEvent::Disconnected).is_err());
    }
}
