//! Clinic Queue Core Library
//!
//! Real-time front-desk patient queue board for multi-clinic practices.
//!
//! # Architecture
//!
//! ```text
//!        Board View  ◄──────────── renders ─────────────┐
//!            │                                          │
//!       drag gesture                                    │
//!            ▼                                          │
//!     Drag Controller ── move_record (optimistic) ──► Queue Store
//!            │                                          ▲
//!     push transition                         replace_snapshot
//!      (fire-and-forget)                                │
//!            ▼                                          │
//!   ┌─────────────────────────────────────────────────┐ │
//!   │              Status Sync Gateway                │─┘
//!   │  push_transition · fetch_lane · subscribe       │
//!   └─────────────────────────────────────────────────┘
//! ```
//!
//! # Core Principle
//!
//! **The backend is the system of record.** Local moves are applied
//! immediately but are only guaranteed visible, not durable; any snapshot from
//! the server replaces them.
//!
//! # Modules
//!
//! - [`models`]: Domain types (VisitRecord, Lane, LaneTransition, BoardSnapshot)
//! - [`store`]: Three-lane queue board with atomic moves
//! - [`drag`]: Drag gesture state machine
//! - [`gateway`]: Backend sync contract
//! - [`session`]: Board + gateway coordination, rollback and reconnect
//! - [`view`]: Derived board view model and patient search
//! - [`config`]: Session timeouts and limits

pub mod config;
pub mod drag;
pub mod gateway;
pub mod models;
pub mod session;
pub mod store;
pub mod view;

// Re-export commonly used types
pub use config::SessionConfig;
pub use drag::{DragController, DragOutcome, DragState, Gesture};
pub use gateway::{Ack, StatusSyncGateway, Subscription, SyncError, SyncEvent};
pub use models::{BoardSnapshot, Lane, LaneTransition, VisitRecord};
pub use session::{Notice, NoticeLevel, QueueSession};
pub use store::{QueueBoard, QueueError};
pub use view::{BoardView, CardView, LaneView};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveTime, Utc};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicQueueError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Board error: {0}")]
    BoardError(String),
}

impl From<QueueError> for ClinicQueueError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::RecordNotFound { .. } => ClinicQueueError::NotFound(e.to_string()),
            QueueError::InvalidIndex { .. } | QueueError::DuplicateRecord { .. } => {
                ClinicQueueError::InvalidInput(e.to_string())
            }
            QueueError::InvariantViolation(_) => ClinicQueueError::BoardError(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for ClinicQueueError {
    fn from(e: serde_json::Error) -> Self {
        ClinicQueueError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicQueueError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicQueueError::BoardError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open an empty board.
#[uniffi::export]
pub fn open_board() -> Arc<FrontDeskBoard> {
    Arc::new(FrontDeskBoard::with_board(QueueBoard::new()))
}

/// Open a board from a full snapshot JSON (`{"waiting": [...], ...}`).
#[uniffi::export]
pub fn open_board_from_json(snapshot_json: String) -> Result<Arc<FrontDeskBoard>, ClinicQueueError> {
    let snapshot: BoardSnapshot = serde_json::from_str(&snapshot_json)?;
    Ok(Arc::new(FrontDeskBoard::with_board(QueueBoard::from_snapshot(
        snapshot,
    ))))
}

// =========================================================================
// Main API Object
// =========================================================================

struct BoardState {
    board: QueueBoard,
    drag: DragController,
}

/// Thread-safe board wrapper for a native host.
///
/// The host owns networking: it pushes the transitions returned by
/// [`FrontDeskBoard::drop_card`] and feeds server snapshots back in.
#[derive(uniffi::Object)]
pub struct FrontDeskBoard {
    state: Mutex<BoardState>,
}

impl FrontDeskBoard {
    fn with_board(board: QueueBoard) -> Self {
        Self {
            state: Mutex::new(BoardState {
                board,
                drag: DragController::new(),
            }),
        }
    }

    fn gesture(&self, gesture: Gesture) -> Result<FfiDragOutcome, ClinicQueueError> {
        let mut state = self.state.lock()?;
        let BoardState { board, drag } = &mut *state;
        Ok(drag.handle(board, gesture).into())
    }
}

#[uniffi::export]
impl FrontDeskBoard {
    // =========================================================================
    // Board Reads
    // =========================================================================

    /// Records of one lane, front of line first.
    pub fn get_lane(&self, lane: FfiLane) -> Result<Vec<FfiVisitRecord>, ClinicQueueError> {
        let state = self.state.lock()?;
        Ok(state
            .board
            .get_lane(lane.into())
            .iter()
            .map(FfiVisitRecord::from)
            .collect())
    }

    /// Render the board view model as JSON.
    pub fn render_json(&self) -> Result<String, ClinicQueueError> {
        let state = self.state.lock()?;
        let view = BoardView::render(&state.board, state.drag.dragging(), Utc::now());
        Ok(serde_json::to_string(&view)?)
    }

    /// Fuzzy search for a patient on the board.
    pub fn find_patient(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiPatientMatch>, ClinicQueueError> {
        let state = self.state.lock()?;
        Ok(view::find_patient(&state.board, &query, limit as usize)
            .into_iter()
            .map(|m| m.into())
            .collect())
    }

    // =========================================================================
    // Drag Gestures
    // =========================================================================

    /// Pick up the card at `index` of `lane`.
    pub fn grab(&self, lane: FfiLane, index: u32) -> Result<FfiDragOutcome, ClinicQueueError> {
        self.gesture(Gesture::Grab {
            lane: lane.into(),
            index: index as usize,
        })
    }

    /// Drop the held card at insertion point `index` of `lane`.
    pub fn drop_card(&self, lane: FfiLane, index: u32) -> Result<FfiDragOutcome, ClinicQueueError> {
        self.gesture(Gesture::Drop {
            lane: lane.into(),
            index: index as usize,
        })
    }

    /// Release the held card outside every lane.
    pub fn drop_outside(&self) -> Result<FfiDragOutcome, ClinicQueueError> {
        self.gesture(Gesture::DropOutside)
    }

    /// Abort the current drag.
    pub fn cancel_drag(&self) -> Result<FfiDragOutcome, ClinicQueueError> {
        self.gesture(Gesture::Cancel)
    }

    // =========================================================================
    // Server Updates
    // =========================================================================

    /// Apply an authoritative lane snapshot (JSON array of visit records).
    pub fn apply_lane_snapshot(
        &self,
        lane: FfiLane,
        records_json: String,
    ) -> Result<(), ClinicQueueError> {
        let records: Vec<VisitRecord> = serde_json::from_str(&records_json)?;
        let mut state = self.state.lock()?;
        state.board.replace_snapshot(lane.into(), records);
        Ok(())
    }

    /// Apply an authoritative lane snapshot already decoded by the host.
    pub fn apply_lane_records(
        &self,
        lane: FfiLane,
        records: Vec<FfiVisitRecord>,
    ) -> Result<(), ClinicQueueError> {
        let records = records
            .into_iter()
            .map(VisitRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let mut state = self.state.lock()?;
        state.board.replace_snapshot(lane.into(), records);
        Ok(())
    }

    /// Replace the whole board, e.g. after reconnect.
    pub fn apply_board_snapshot(&self, snapshot_json: String) -> Result<(), ClinicQueueError> {
        let snapshot: BoardSnapshot = serde_json::from_str(&snapshot_json)?;
        let mut state = self.state.lock()?;
        state.board.replace_all(snapshot);
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Register an arrival at the back of the Waiting lane.
    pub fn check_in(
        &self,
        patient_name: String,
        service_label: String,
        assigned_staff: String,
        scheduled_time: String,
    ) -> Result<FfiVisitRecord, ClinicQueueError> {
        let time = parse_time_of_day(&scheduled_time)?;
        let record = VisitRecord::new(patient_name, service_label, assigned_staff, time);
        let mut state = self.state.lock()?;
        state.board.check_in(record.clone())?;
        Ok((&record).into())
    }

    /// End-of-day sweep; returns how many visits were archived.
    pub fn archive_completed(&self) -> Result<u32, ClinicQueueError> {
        let mut state = self.state.lock()?;
        Ok(state.board.archive_completed().len() as u32)
    }
}

fn parse_time_of_day(value: &str) -> Result<NaiveTime, ClinicQueueError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|e| ClinicQueueError::InvalidInput(format!("scheduled time {:?}: {}", value, e)))
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiLane {
    Waiting,
    InService,
    Completed,
}

impl From<FfiLane> for Lane {
    fn from(lane: FfiLane) -> Self {
        match lane {
            FfiLane::Waiting => Lane::Waiting,
            FfiLane::InService => Lane::InService,
            FfiLane::Completed => Lane::Completed,
        }
    }
}

impl From<Lane> for FfiLane {
    fn from(lane: Lane) -> Self {
        match lane {
            Lane::Waiting => FfiLane::Waiting,
            Lane::InService => FfiLane::InService,
            Lane::Completed => FfiLane::Completed,
        }
    }
}

/// FFI-safe visit record.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisitRecord {
    pub id: String,
    pub patient_name: String,
    pub service_label: String,
    pub assigned_staff: String,
    pub scheduled_time: String,
    pub lane: FfiLane,
    pub entered_lane_at: String,
}

impl From<&VisitRecord> for FfiVisitRecord {
    fn from(record: &VisitRecord) -> Self {
        Self {
            id: record.id.clone(),
            patient_name: record.patient_name.clone(),
            service_label: record.service_label.clone(),
            assigned_staff: record.assigned_staff.clone(),
            scheduled_time: record.scheduled_time.format("%H:%M:%S").to_string(),
            lane: record.lane.into(),
            entered_lane_at: record.entered_lane_at.to_rfc3339(),
        }
    }
}

impl TryFrom<FfiVisitRecord> for VisitRecord {
    type Error = ClinicQueueError;

    fn try_from(record: FfiVisitRecord) -> Result<Self, Self::Error> {
        let entered_lane_at = DateTime::parse_from_rfc3339(&record.entered_lane_at)
            .map_err(|e| ClinicQueueError::InvalidInput(format!("entered_lane_at: {}", e)))?
            .with_timezone(&Utc);
        Ok(VisitRecord {
            id: record.id,
            patient_name: record.patient_name,
            service_label: record.service_label,
            assigned_staff: record.assigned_staff,
            scheduled_time: parse_time_of_day(&record.scheduled_time)?,
            lane: record.lane.into(),
            entered_lane_at,
        })
    }
}

/// FFI-safe lane transition.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTransition {
    pub record_id: String,
    pub from_lane: FfiLane,
    pub to_lane: FfiLane,
}

impl From<LaneTransition> for FfiTransition {
    fn from(t: LaneTransition) -> Self {
        Self {
            record_id: t.record_id,
            from_lane: t.from_lane.into(),
            to_lane: t.to_lane.into(),
        }
    }
}

/// FFI-safe gesture result.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum FfiDragOutcome {
    Ignored,
    Started { record_id: String },
    Cancelled,
    Unchanged,
    Reordered { record_id: String, to_index: u32 },
    /// Host must push this transition to the backend
    Moved { transition: FfiTransition },
    /// Host must re-fetch the listed lanes
    Rejected {
        record_id: String,
        reason: String,
        resync: Vec<FfiLane>,
    },
}

impl From<DragOutcome> for FfiDragOutcome {
    fn from(outcome: DragOutcome) -> Self {
        match outcome {
            DragOutcome::Ignored => FfiDragOutcome::Ignored,
            DragOutcome::Started(source) => FfiDragOutcome::Started {
                record_id: source.record_id,
            },
            DragOutcome::Cancelled => FfiDragOutcome::Cancelled,
            DragOutcome::Unchanged => FfiDragOutcome::Unchanged,
            DragOutcome::Reordered {
                record_id,
                to_index,
                ..
            } => FfiDragOutcome::Reordered {
                record_id,
                to_index: to_index as u32,
            },
            DragOutcome::Moved(transition) => FfiDragOutcome::Moved {
                transition: transition.into(),
            },
            DragOutcome::Rejected {
                record_id,
                error,
                resync,
            } => FfiDragOutcome::Rejected {
                record_id,
                reason: error.to_string(),
                resync: resync.into_iter().map(FfiLane::from).collect(),
            },
        }
    }
}

/// FFI-safe patient search hit.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientMatch {
    pub id: String,
    pub patient_name: String,
    pub lane: FfiLane,
    pub position: u32,
    pub score: f64,
}

impl From<view::PatientMatch> for FfiPatientMatch {
    fn from(m: view::PatientMatch) -> Self {
        Self {
            id: m.id,
            patient_name: m.patient_name,
            lane: m.lane.into(),
            position: m.position as u32,
            score: m.score,
        }
    }
}
