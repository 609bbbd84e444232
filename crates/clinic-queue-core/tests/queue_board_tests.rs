//! Queue board integration tests.

use chrono::{NaiveTime, TimeZone, Utc};
use clinic_queue_core::drag::{DragController, DragOutcome, Gesture};
use clinic_queue_core::models::{BoardSnapshot, Lane, VisitRecord};
use clinic_queue_core::store::{QueueBoard, QueueError};
use proptest::prelude::*;

fn make_visit(id: &str, lane: Lane) -> VisitRecord {
    VisitRecord {
        id: id.to_string(),
        patient_name: format!("Patient {}", id),
        service_label: "General consultation".to_string(),
        assigned_staff: "Dr. Lima".to_string(),
        scheduled_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        lane,
        entered_lane_at: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
    }
}

fn make_board(waiting: &[&str], in_service: &[&str], completed: &[&str]) -> QueueBoard {
    let records = |ids: &[&str], lane: Lane| -> Vec<VisitRecord> {
        ids.iter().map(|id| make_visit(id, lane)).collect()
    };
    QueueBoard::from_snapshot(BoardSnapshot {
        waiting: records(waiting, Lane::Waiting),
        in_service: records(in_service, Lane::InService),
        completed: records(completed, Lane::Completed),
    })
}

fn lane_ids(board: &QueueBoard, lane: Lane) -> Vec<&str> {
    board.get_lane(lane).iter().map(|r| r.id.as_str()).collect()
}

#[test]
fn test_start_service_for_first_patient() {
    let mut board = make_board(&["P1", "P2"], &[], &[]);
    board
        .move_record("P1", Lane::Waiting, Lane::InService, 0)
        .unwrap();

    assert_eq!(lane_ids(&board, Lane::Waiting), vec!["P2"]);
    assert_eq!(lane_ids(&board, Lane::InService), vec!["P1"]);
    assert!(lane_ids(&board, Lane::Completed).is_empty());
}

#[test]
fn test_bring_last_patient_to_front() {
    let mut board = make_board(&["P1", "P2", "P3"], &[], &[]);
    board
        .move_record("P3", Lane::Waiting, Lane::Waiting, 0)
        .unwrap();

    assert_eq!(lane_ids(&board, Lane::Waiting), vec!["P3", "P1", "P2"]);
}

#[test]
fn test_move_from_wrong_lane_is_not_found() {
    let mut board = make_board(&["P1"], &["P2"], &[]);
    let before = board.clone();

    let err = board
        .move_record("P1", Lane::InService, Lane::Completed, 0)
        .unwrap_err();

    assert!(matches!(err, QueueError::RecordNotFound { ref id, lane: Lane::InService } if id == "P1"));
    assert_eq!(board, before);
}

#[test]
fn test_insert_boundaries() {
    let mut board = make_board(&["P1", "P2"], &["P3"], &[]);

    board
        .move_record("P1", Lane::Waiting, Lane::InService, 1)
        .unwrap();
    assert_eq!(lane_ids(&board, Lane::InService), vec!["P3", "P1"]);

    let err = board
        .move_record("P2", Lane::Waiting, Lane::InService, 3)
        .unwrap_err();
    assert!(matches!(err, QueueError::InvalidIndex { index: 3, len: 2, .. }));
}

#[test]
fn test_service_round_trip() {
    let mut board = make_board(&["P1", "P2"], &[], &[]);
    board
        .move_record("P1", Lane::Waiting, Lane::InService, 0)
        .unwrap();
    board
        .move_record("P1", Lane::InService, Lane::Waiting, 0)
        .unwrap();

    assert_eq!(board.get("P1").unwrap().lane, Lane::Waiting);
    assert_eq!(lane_ids(&board, Lane::Waiting), vec!["P1", "P2"]);
}

#[test]
fn test_drop_in_place_changes_nothing() {
    let mut board = make_board(&["P1", "P2", "P3"], &["P4"], &[]);
    let before = board.clone();
    let mut controller = DragController::new();

    for (lane, index) in [(Lane::Waiting, 0), (Lane::Waiting, 2), (Lane::InService, 0)] {
        controller.handle(&mut board, Gesture::Grab { lane, index });
        let outcome = controller.handle(&mut board, Gesture::Drop { lane, index });
        assert_eq!(outcome, DragOutcome::Unchanged);
    }
    assert_eq!(board, before);
}

// =========================================================================
// Property tests
// =========================================================================

#[derive(Debug, Clone)]
enum Op {
    Drag(Gesture, Gesture),
    Move(usize, Lane, Lane, usize),
    Snapshot(Lane, Vec<usize>),
    CheckIn(usize),
    Archive,
}

fn lane_strategy() -> impl Strategy<Value = Lane> {
    prop_oneof![
        Just(Lane::Waiting),
        Just(Lane::InService),
        Just(Lane::Completed)
    ]
}

fn gesture_strategy() -> impl Strategy<Value = Gesture> {
    prop_oneof![
        (lane_strategy(), 0..6usize).prop_map(|(lane, index)| Gesture::Grab { lane, index }),
        (lane_strategy(), 0..6usize).prop_map(|(lane, index)| Gesture::Drop { lane, index }),
        Just(Gesture::DropOutside),
        Just(Gesture::Cancel),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (gesture_strategy(), gesture_strategy()).prop_map(|(a, b)| Op::Drag(a, b)),
        3 => (0..8usize, lane_strategy(), lane_strategy(), 0..6usize)
            .prop_map(|(id, from, to, index)| Op::Move(id, from, to, index)),
        2 => (lane_strategy(), prop::collection::vec(0..8usize, 0..5))
            .prop_map(|(lane, ids)| Op::Snapshot(lane, ids)),
        1 => (0..8usize).prop_map(Op::CheckIn),
        1 => Just(Op::Archive),
    ]
}

proptest! {
    #[test]
    fn prop_every_visit_in_exactly_one_lane(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut board = make_board(&["P0", "P1", "P2"], &["P3"], &["P4"]);
        let mut controller = DragController::new();

        for op in ops {
            match op {
                Op::Drag(first, second) => {
                    controller.handle(&mut board, first);
                    controller.handle(&mut board, second);
                }
                Op::Move(id, from, to, index) => {
                    let id = format!("P{}", id);
                    let before = board.clone();
                    if board.move_record(&id, from, to, index).is_err() {
                        prop_assert_eq!(&board, &before);
                    }
                }
                Op::Snapshot(lane, ids) => {
                    let records = ids
                        .into_iter()
                        .map(|id| make_visit(&format!("P{}", id), lane))
                        .collect();
                    board.replace_snapshot(lane, records);
                }
                Op::CheckIn(id) => {
                    let _ = board.check_in(make_visit(&format!("P{}", id), Lane::Waiting));
                }
                Op::Archive => {
                    board.archive_completed();
                }
            }
            prop_assert!(board.check_invariants().is_ok());
        }
    }

    #[test]
    fn prop_cross_lane_move_preserves_population(
        from in lane_strategy(),
        to in lane_strategy(),
        pick in 0..3usize,
        index in 0..5usize,
    ) {
        let mut board = make_board(&["P0", "P1", "P2"], &["P3", "P4", "P5"], &["P6", "P7", "P8"]);
        let id = board.get_lane(from)[pick].id.clone();

        let result = board.move_record(&id, from, to, index);
        let dest_len = if from == to { 2 } else { 3 };

        prop_assert_eq!(result.is_ok(), index <= dest_len);
        prop_assert_eq!(board.len(), 9);
        if result.is_ok() {
            prop_assert_eq!(board.locate(&id), Some((to, index)));
        }
    }
}
