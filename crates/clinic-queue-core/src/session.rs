//! Front-desk queue session.
//!
//! Owns the board, the drag controller and the gateway handle. Every board
//! mutation happens on the task that owns the session: gestures are applied
//! immediately, while gateway calls run on spawned tasks and report back
//! through an internal channel that the owner drains with [`QueueSession::step`]
//! or [`QueueSession::settle`].
//!
//! Conflicts resolve as last write from the server wins. A lane snapshot
//! replaces whatever optimistic state the lane held. Each lane carries a
//! generation that moves on every live update touching it; a fetched lane is
//! applied only if its generation is unchanged since the fetch started, so a
//! slow fetch never overwrites a newer update.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::drag::{DragController, DragOutcome, Gesture};
use crate::gateway::{
    with_timeout, Ack, StatusSyncGateway, Subscription, SyncEvent, SyncResult,
};
use crate::models::{BoardSnapshot, Lane, LaneTransition, VisitRecord};
use crate::store::QueueBoard;

/// Severity of a transient notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// Transient user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

/// Result of a gateway call, delivered back to the session owner.
#[derive(Debug)]
enum SessionEvent {
    Pushed {
        transition: LaneTransition,
        result: SyncResult<Ack>,
    },
    LaneFetched {
        lane: Lane,
        generation: u64,
        result: SyncResult<Vec<VisitRecord>>,
    },
}

/// A single front-desk board bound to a backend gateway.
pub struct QueueSession<G: StatusSyncGateway + 'static> {
    board: QueueBoard,
    drag: DragController,
    gateway: Arc<G>,
    config: SessionConfig,
    notices: VecDeque<Notice>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    subscription: Option<Subscription>,
    in_flight: usize,
    lane_generations: [u64; 3],
    /// A full reload after reconnect failed; live updates wait until it succeeds
    needs_reload: bool,
}

impl<G: StatusSyncGateway + 'static> QueueSession<G> {
    /// Create a session with an empty board. Call [`connect`](Self::connect)
    /// to load it.
    pub fn new(gateway: Arc<G>, config: SessionConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            board: QueueBoard::new(),
            drag: DragController::new(),
            gateway,
            config,
            notices: VecDeque::new(),
            events_tx,
            events_rx,
            subscription: None,
            in_flight: 0,
            lane_generations: [0; 3],
            needs_reload: false,
        }
    }

    /// Subscribe to live updates and load the full board.
    pub async fn connect(&mut self) -> SyncResult<()> {
        self.subscription = Some(self.gateway.subscribe());
        let snapshot = self.fetch_board().await?;
        info!(records = snapshot.len(), "queue board loaded");
        self.replace_board(snapshot);
        Ok(())
    }

    pub fn board(&self) -> &QueueBoard {
        &self.board
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Gateway calls that have not reported back yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// A full board reload is pending after a failed reconnect.
    pub fn needs_reload(&self) -> bool {
        self.needs_reload
    }

    /// Apply a gesture optimistically and start any sync it calls for.
    ///
    /// Never waits on the network. Must run inside a Tokio runtime.
    pub fn handle_gesture(&mut self, gesture: Gesture) -> DragOutcome {
        let outcome = self.drag.handle(&mut self.board, gesture);
        match &outcome {
            DragOutcome::Moved(transition) => self.spawn_push(transition.clone()),
            DragOutcome::Rejected {
                record_id,
                error,
                resync,
            } => {
                warn!(id = %record_id, error = %error, "move rejected locally");
                self.notify(
                    NoticeLevel::Warning,
                    format!("Could not move visit {}: {}", record_id, error),
                );
                for lane in resync {
                    self.spawn_fetch(*lane);
                }
            }
            _ => {}
        }
        outcome
    }

    pub fn grab(&mut self, lane: Lane, index: usize) -> DragOutcome {
        self.handle_gesture(Gesture::Grab { lane, index })
    }

    pub fn drop_at(&mut self, lane: Lane, index: usize) -> DragOutcome {
        self.handle_gesture(Gesture::Drop { lane, index })
    }

    pub fn cancel(&mut self) -> DragOutcome {
        self.handle_gesture(Gesture::Cancel)
    }

    /// Re-read one lane from the backend.
    pub fn resync_lane(&mut self, lane: Lane) {
        self.spawn_fetch(lane);
    }

    /// Apply one message from the live feed.
    ///
    /// A `Reconnected` message reloads the whole board before returning, so
    /// no lane update queued behind it is applied on top of stale state. If
    /// that reload fails, lane updates are dropped until a retry succeeds.
    pub async fn apply_remote(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::LaneUpdated { lane, records } => {
                if self.needs_reload && !self.reload_board().await {
                    debug!(lane = %lane, "lane update dropped, full reload pending");
                    return;
                }
                debug!(lane = %lane, count = records.len(), "remote lane update");
                self.apply_lane_update(lane, records);
            }
            SyncEvent::Disconnected => {
                warn!("sync channel disconnected");
                self.notify(NoticeLevel::Warning, "Live updates paused, reconnecting".into());
            }
            SyncEvent::Reconnected => {
                self.reload_board().await;
            }
        }
    }

    /// Wait for and apply the next gateway result or live update.
    ///
    /// While a full reload is pending, a step makes one reload attempt
    /// instead, pausing `reload_retry_ms` after a failure. Returns `false`
    /// once the live feed has closed and nothing is in flight.
    pub async fn step(&mut self) -> bool {
        if self.subscription.is_none() && self.in_flight == 0 {
            return false;
        }

        if self.needs_reload {
            if !self.reload_board().await {
                tokio::time::sleep(self.config.reload_retry()).await;
            }
            return true;
        }

        tokio::select! {
            Some(event) = self.events_rx.recv(), if self.in_flight > 0 => {
                self.apply_event(event);
                true
            }
            remote = next_remote(&mut self.subscription) => {
                match remote {
                    Some(event) => self.apply_remote(event).await,
                    None => {
                        info!("sync subscription closed");
                        self.subscription = None;
                    }
                }
                true
            }
        }
    }

    /// Drive the session until the live feed closes.
    pub async fn run(&mut self) {
        while self.step().await {}
    }

    /// Wait for every in-flight gateway call, then apply live updates that
    /// have already arrived. A pending full reload is retried once; if it
    /// fails again the remaining updates are left unread.
    pub async fn settle(&mut self) {
        loop {
            while self.in_flight > 0 {
                match self.events_rx.recv().await {
                    Some(event) => self.apply_event(event),
                    None => break,
                }
            }

            if self.needs_reload {
                if self.reload_board().await {
                    continue;
                }
                break;
            }

            let pending = self.subscription.as_mut().and_then(Subscription::try_recv);
            match pending {
                Some(event) => self.apply_remote(event).await,
                None if self.in_flight == 0 => break,
                None => {}
            }
        }
    }

    /// Take the notices raised since the last call, oldest first.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    fn apply_event(&mut self, event: SessionEvent) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match event {
            SessionEvent::Pushed {
                transition,
                result: Ok(ack),
            } => {
                debug!(id = %ack.record_id, lane = %ack.lane, "transition acknowledged");
                if ack.lane != transition.to_lane {
                    self.spawn_fetch(ack.lane);
                }
            }
            SessionEvent::Pushed {
                transition,
                result: Err(e),
            } => {
                warn!(
                    id = %transition.record_id,
                    from = %transition.from_lane,
                    to = %transition.to_lane,
                    error = %e,
                    "transition not confirmed, reverting from server state"
                );
                let name = self
                    .board
                    .get(&transition.record_id)
                    .map(|r| r.patient_name.clone())
                    .unwrap_or_else(|| transition.record_id.clone());
                self.notify(
                    NoticeLevel::Warning,
                    format!("Move of {} to {} was not saved: {}", name, transition.to_lane.title(), e),
                );
                for lane in transition.affected_lanes() {
                    self.spawn_fetch(lane);
                }
            }
            SessionEvent::LaneFetched {
                lane,
                generation,
                result: Ok(records),
            } => {
                if generation == self.generation(lane) {
                    self.board.replace_snapshot(lane, records);
                } else {
                    debug!(lane = %lane, "discarding lane fetch superseded by a live update");
                }
            }
            SessionEvent::LaneFetched {
                lane,
                result: Err(e),
                ..
            } => {
                warn!(lane = %lane, error = %e, "lane refresh failed");
                self.notify(
                    NoticeLevel::Warning,
                    format!("Could not refresh {}: {}", lane.title(), e),
                );
            }
        }
    }

    async fn fetch_board(&self) -> SyncResult<BoardSnapshot> {
        with_timeout(self.config.fetch_timeout(), self.gateway.fetch_board()).await
    }

    /// Fetch and apply the whole board. Returns whether it succeeded; on
    /// failure the reload stays pending.
    async fn reload_board(&mut self) -> bool {
        match self.fetch_board().await {
            Ok(snapshot) => {
                info!(records = snapshot.len(), "board reloaded after reconnect");
                self.replace_board(snapshot);
                self.needs_reload = false;
                self.notify(NoticeLevel::Info, "Live updates resumed".into());
                true
            }
            Err(e) => {
                warn!(error = %e, "board reload after reconnect failed");
                if !self.needs_reload {
                    self.notify(
                        NoticeLevel::Warning,
                        format!("Could not reload the queue: {}", e),
                    );
                }
                self.needs_reload = true;
                false
            }
        }
    }

    fn replace_board(&mut self, snapshot: BoardSnapshot) {
        for lane in Lane::ALL {
            self.advance_generation(lane);
        }
        self.board.replace_all(snapshot);
    }

    /// Apply a live lane update, advancing that lane and every lane it takes
    /// records from.
    fn apply_lane_update(&mut self, lane: Lane, records: Vec<VisitRecord>) {
        let evicted_from: Vec<Lane> = records
            .iter()
            .filter_map(|r| self.board.locate(&r.id))
            .map(|(held, _)| held)
            .filter(|held| *held != lane)
            .collect();

        self.advance_generation(lane);
        for held in evicted_from {
            self.advance_generation(held);
        }
        self.board.replace_snapshot(lane, records);
    }

    fn generation(&self, lane: Lane) -> u64 {
        self.lane_generations[lane.index()]
    }

    fn advance_generation(&mut self, lane: Lane) {
        self.lane_generations[lane.index()] += 1;
    }

    fn spawn_push(&mut self, transition: LaneTransition) {
        let gateway = Arc::clone(&self.gateway);
        let tx = self.events_tx.clone();
        let limit = self.config.push_timeout();
        self.in_flight += 1;

        tokio::spawn(async move {
            let result = with_timeout(limit, gateway.push_transition(&transition)).await;
            // Receiver lives as long as the session; a send error means it is gone.
            let _ = tx.send(SessionEvent::Pushed { transition, result });
        });
    }

    fn spawn_fetch(&mut self, lane: Lane) {
        let gateway = Arc::clone(&self.gateway);
        let tx = self.events_tx.clone();
        let limit = self.config.fetch_timeout();
        let generation = self.generation(lane);
        self.in_flight += 1;

        tokio::spawn(async move {
            let result = with_timeout(limit, gateway.fetch_lane(lane)).await;
            let _ = tx.send(SessionEvent::LaneFetched {
                lane,
                generation,
                result,
            });
        });
    }

    fn notify(&mut self, level: NoticeLevel, message: String) {
        while self.notices.len() >= self.config.max_notices.max(1) {
            self.notices.pop_front();
        }
        self.notices.push_back(Notice {
            level,
            message,
            raised_at: Utc::now(),
        });
    }
}

async fn next_remote(subscription: &mut Option<Subscription>) -> Option<SyncEvent> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}
