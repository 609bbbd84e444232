//! In-process reference backend.
//!
//! Holds the authoritative board, applies [`TransitionPolicy`] to pushed
//! moves and broadcasts full-lane updates to every subscriber. Connection
//! drops, missed updates and stalled pushes can be simulated to exercise the
//! client's recovery paths.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use clinic_queue_core::gateway::{
    Ack, StatusSyncGateway, Subscription, SyncError, SyncEvent, SyncResult,
};
use clinic_queue_core::models::{BoardSnapshot, Lane, LaneTransition, VisitRecord};
use clinic_queue_core::store::{QueueBoard, QueueError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::policy::TransitionPolicy;
use crate::wire::{self, PushMessage, TransitionReply};

struct BackendState {
    board: QueueBoard,
    subscribers: Vec<mpsc::UnboundedSender<SyncEvent>>,
    connected: bool,
    stall_pushes: bool,
}

impl BackendState {
    /// Deliver to live subscribers, forgetting the ones that hung up. Updates
    /// raised while disconnected are lost, as they would be on a real socket.
    fn broadcast(&mut self, event: SyncEvent) {
        if !self.connected {
            debug!("dropping update while disconnected");
            return;
        }
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn broadcast_lanes(&mut self, lanes: &[Lane]) {
        for &lane in lanes {
            let records = self.board.get_lane(lane).to_vec();
            self.broadcast(SyncEvent::LaneUpdated { lane, records });
        }
    }
}

/// Authoritative queue backend living in the same process.
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
    policy: TransitionPolicy,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(QueueBoard::new(), TransitionPolicy::default())
    }
}

impl InMemoryBackend {
    pub fn new(board: QueueBoard, policy: TransitionPolicy) -> Self {
        Self {
            state: Mutex::new(BackendState {
                board,
                subscribers: Vec::new(),
                connected: true,
                stall_pushes: false,
            }),
            policy,
        }
    }

    pub fn from_snapshot(snapshot: BoardSnapshot, policy: TransitionPolicy) -> Self {
        Self::new(QueueBoard::from_snapshot(snapshot), policy)
    }

    /// Current authoritative board.
    pub fn snapshot(&self) -> SyncResult<BoardSnapshot> {
        Ok(self.lock()?.board.to_snapshot())
    }

    /// Number of open subscriptions.
    pub fn subscriber_count(&self) -> SyncResult<usize> {
        let mut state = self.lock()?;
        state.subscribers.retain(|tx| !tx.is_closed());
        Ok(state.subscribers.len())
    }

    /// Register an arrival and announce the new Waiting lane.
    pub fn check_in(&self, record: VisitRecord) -> SyncResult<()> {
        let mut state = self.lock()?;
        state
            .board
            .check_in(record)
            .map_err(|e| SyncError::Rejected(e.to_string()))?;
        state.broadcast_lanes(&[Lane::Waiting]);
        Ok(())
    }

    /// Apply a move made by another front-desk client, appending the visit
    /// to `to_lane`. Policy is not consulted.
    pub fn move_visit(&self, record_id: &str, to_lane: Lane) -> SyncResult<()> {
        let mut state = self.lock()?;
        let (from_lane, _) = state.board.locate(record_id).ok_or_else(|| {
            SyncError::Rejected(format!("unknown visit {}", record_id))
        })?;
        let end = state.board.destination_len(from_lane, to_lane);
        state
            .board
            .move_record(record_id, from_lane, to_lane, end)
            .map_err(|e| SyncError::Rejected(e.to_string()))?;
        state.broadcast_lanes(&LaneTransition::new(record_id, from_lane, to_lane).affected_lanes());
        Ok(())
    }

    /// End-of-day archival; announces the emptied Completed lane.
    pub fn archive_completed(&self) -> SyncResult<Vec<VisitRecord>> {
        let mut state = self.lock()?;
        let archived = state.board.archive_completed();
        info!(count = archived.len(), "archived completed visits");
        state.broadcast_lanes(&[Lane::Completed]);
        Ok(archived)
    }

    /// Drop the push channel. Subscribers are told once; later updates are
    /// lost until [`reconnect`](Self::reconnect).
    pub fn disconnect(&self) -> SyncResult<()> {
        let mut state = self.lock()?;
        state.broadcast(SyncEvent::Disconnected);
        state.connected = false;
        warn!("backend push channel dropped");
        Ok(())
    }

    /// Restore the push channel.
    pub fn reconnect(&self) -> SyncResult<()> {
        let mut state = self.lock()?;
        state.connected = true;
        state.broadcast(SyncEvent::Reconnected);
        info!("backend push channel restored");
        Ok(())
    }

    /// Make pushes hang forever (network stall).
    pub fn stall_pushes(&self, stalled: bool) -> SyncResult<()> {
        self.lock()?.stall_pushes = stalled;
        Ok(())
    }

    /// Handle a transition request body and return the reply body.
    pub fn handle_transition_json(&self, body: &str) -> SyncResult<String> {
        let transition = wire::decode_transition(body)?;
        let reply = TransitionReply::from(self.apply_transition(&transition));
        Ok(serde_json::to_string(&reply).map_err(wire::WireError::from)?)
    }

    /// Encode the current contents of a lane as a push frame.
    pub fn lane_frame(&self, lane: Lane) -> SyncResult<String> {
        let records = self.lock()?.board.get_lane(lane).to_vec();
        Ok(wire::encode_push(&PushMessage::LaneUpdate { lane, records })?)
    }

    fn apply_transition(&self, transition: &LaneTransition) -> SyncResult<Ack> {
        let mut state = self.lock()?;
        if !state.connected {
            return Err(SyncError::Transport("backend unreachable".into()));
        }

        let LaneTransition {
            record_id,
            from_lane,
            to_lane,
        } = transition;

        let record = state
            .board
            .get_lane(*from_lane)
            .iter()
            .find(|r| &r.id == record_id)
            .cloned()
            .ok_or_else(|| {
                SyncError::Rejected(format!("visit {} is no longer {}", record_id, from_lane))
            })?;

        if let Err(reason) = self
            .policy
            .check(&state.board, &record, *from_lane, *to_lane)
        {
            warn!(id = %record_id, from = %from_lane, to = %to_lane, reason = %reason, "transition rejected");
            return Err(SyncError::Rejected(reason));
        }

        let end = state.board.destination_len(*from_lane, *to_lane);
        state
            .board
            .move_record(record_id, *from_lane, *to_lane, end)
            .map_err(|e: QueueError| SyncError::Rejected(e.to_string()))?;

        debug!(id = %record_id, from = %from_lane, to = %to_lane, "transition accepted");
        state.broadcast_lanes(&transition.affected_lanes());

        Ok(Ack {
            record_id: record_id.clone(),
            lane: *to_lane,
            applied_at: Utc::now(),
        })
    }

    fn lock(&self) -> SyncResult<MutexGuard<'_, BackendState>> {
        self.state
            .lock()
            .map_err(|e| SyncError::Transport(format!("Lock poisoned: {}", e)))
    }

    fn ensure_connected(&self) -> SyncResult<()> {
        if self.lock()?.connected {
            Ok(())
        } else {
            Err(SyncError::Transport("backend unreachable".into()))
        }
    }
}

#[async_trait]
impl StatusSyncGateway for InMemoryBackend {
    async fn push_transition(&self, transition: &LaneTransition) -> SyncResult<Ack> {
        let stalled = self.lock()?.stall_pushes;
        if stalled {
            debug!(id = %transition.record_id, "push stalled");
            std::future::pending::<()>().await;
        }
        self.apply_transition(transition)
    }

    async fn fetch_lane(&self, lane: Lane) -> SyncResult<Vec<VisitRecord>> {
        self.ensure_connected()?;
        Ok(self.lock()?.board.get_lane(lane).to_vec())
    }

    async fn fetch_board(&self) -> SyncResult<BoardSnapshot> {
        self.ensure_connected()?;
        self.snapshot()
    }

    fn subscribe(&self) -> Subscription {
        let (tx, subscription) = Subscription::channel();
        match self.lock() {
            Ok(mut state) => state.subscribers.push(tx),
            // Sender dropped here; the subscription reports closed at once.
            Err(e) => warn!(error = %e, "subscribe failed"),
        }
        subscription
    }
}
