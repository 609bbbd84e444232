//! Drag-and-drop gesture handling.
//!
//! A gesture runs `Idle -> Dragging -> (dropped | cancelled) -> Idle`. Nothing
//! touches the board until the card is dropped over a lane; the drop is then
//! applied optimistically through [`QueueBoard::move_record`].

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{Lane, LaneTransition};
use crate::store::{QueueBoard, QueueError};

/// Where the dragged card was picked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSource {
    pub record_id: String,
    pub lane: Lane,
    pub index: usize,
}

/// Drag state between gestures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSource),
}

/// Pointer / keyboard input forwarded by the board view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Card at `index` of `lane` grabbed
    Grab { lane: Lane, index: usize },
    /// Card released over `lane`, at insertion point `index` counted without
    /// the dragged card
    Drop { lane: Lane, index: usize },
    /// Card released outside every lane
    DropOutside,
    /// Gesture aborted (e.g. Escape)
    Cancel,
}

/// What a gesture did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// Gesture has no meaning in the current state
    Ignored,
    /// A card was picked up
    Started(DragSource),
    /// Drag ended without touching the board
    Cancelled,
    /// Dropped where it was picked up
    Unchanged,
    /// Reordered inside its lane
    Reordered {
        record_id: String,
        lane: Lane,
        to_index: usize,
    },
    /// Changed lanes; the transition must be reported to the backend
    Moved(LaneTransition),
    /// The store refused the move; the listed lanes must be re-synced
    Rejected {
        record_id: String,
        error: QueueError,
        resync: Vec<Lane>,
    },
}

/// Per-board drag state machine.
#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// ID of the card under the pointer, if any.
    pub fn dragging(&self) -> Option<&str> {
        match &self.state {
            DragState::Dragging(source) => Some(source.record_id.as_str()),
            DragState::Idle => None,
        }
    }

    /// Feed one gesture through the state machine.
    pub fn handle(&mut self, board: &mut QueueBoard, gesture: Gesture) -> DragOutcome {
        self.handle_at(board, gesture, Utc::now())
    }

    /// [`handle`](Self::handle) with an explicit drop time.
    pub fn handle_at(
        &mut self,
        board: &mut QueueBoard,
        gesture: Gesture,
        at: DateTime<Utc>,
    ) -> DragOutcome {
        let state = std::mem::take(&mut self.state);
        let (next, outcome) = transition(state, gesture, board, at);
        self.state = next;
        outcome
    }

    pub fn grab(&mut self, board: &mut QueueBoard, lane: Lane, index: usize) -> DragOutcome {
        self.handle(board, Gesture::Grab { lane, index })
    }

    pub fn drop_at(&mut self, board: &mut QueueBoard, lane: Lane, index: usize) -> DragOutcome {
        self.handle(board, Gesture::Drop { lane, index })
    }

    pub fn cancel(&mut self, board: &mut QueueBoard) -> DragOutcome {
        self.handle(board, Gesture::Cancel)
    }
}

/// The gesture reducer. Only a `Drop` while dragging mutates the board.
fn transition(
    state: DragState,
    gesture: Gesture,
    board: &mut QueueBoard,
    at: DateTime<Utc>,
) -> (DragState, DragOutcome) {
    match (state, gesture) {
        (_, Gesture::Grab { lane, index }) => match board.get_lane(lane).get(index) {
            Some(record) => {
                let source = DragSource {
                    record_id: record.id.clone(),
                    lane,
                    index,
                };
                (
                    DragState::Dragging(source.clone()),
                    DragOutcome::Started(source),
                )
            }
            None => (DragState::Idle, DragOutcome::Ignored),
        },

        (DragState::Dragging(_), Gesture::DropOutside | Gesture::Cancel) => {
            (DragState::Idle, DragOutcome::Cancelled)
        }

        (DragState::Dragging(source), Gesture::Drop { lane, index }) => {
            (DragState::Idle, drop_card(source, lane, index, board, at))
        }

        (DragState::Idle, _) => (DragState::Idle, DragOutcome::Ignored),
    }
}

fn drop_card(
    source: DragSource,
    lane: Lane,
    index: usize,
    board: &mut QueueBoard,
    at: DateTime<Utc>,
) -> DragOutcome {
    // Compare against where the card is now; remote snapshots may have
    // shifted it since it was grabbed.
    if board.locate(&source.record_id) == Some((lane, index)) && source.lane == lane {
        return DragOutcome::Unchanged;
    }

    match board.move_record_at(&source.record_id, source.lane, lane, index, at) {
        Ok(()) if source.lane == lane => {
            debug!(id = %source.record_id, lane = %lane, index, "reordered card");
            DragOutcome::Reordered {
                record_id: source.record_id,
                lane,
                to_index: index,
            }
        }
        Ok(()) => {
            debug!(id = %source.record_id, from = %source.lane, to = %lane, index, "moved card");
            DragOutcome::Moved(LaneTransition::new(source.record_id, source.lane, lane))
        }
        Err(error) => {
            let resync = LaneTransition::new(source.record_id.as_str(), source.lane, lane)
                .affected_lanes();
            DragOutcome::Rejected {
                record_id: source.record_id,
                error,
                resync,
            }
        }
    }
}
