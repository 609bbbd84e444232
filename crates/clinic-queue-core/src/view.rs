//! Board view model.
//!
//! Everything here is derived from a [`QueueBoard`] and the current drag; the
//! view owns no state of its own.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strsim::{jaro_winkler, normalized_levenshtein};

use crate::models::{Lane, VisitRecord};
use crate::store::QueueBoard;

/// Minimum similarity for a fuzzy patient search hit.
const MIN_SEARCH_SCORE: f64 = 0.75;

/// One card on the board.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub id: String,
    pub patient_name: String,
    pub service_label: String,
    pub assigned_staff: String,
    /// Booked slot, `HH:MM`
    pub scheduled_time: String,
    pub minutes_in_lane: i64,
    /// Card is currently held under the pointer
    pub is_dragging: bool,
}

/// One lane column.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LaneView {
    pub lane: Lane,
    pub title: &'static str,
    pub cards: Vec<CardView>,
}

impl LaneView {
    pub fn count(&self) -> usize {
        self.cards.len()
    }
}

/// The rendered three-lane board.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub lanes: Vec<LaneView>,
    pub rendered_at: DateTime<Utc>,
}

impl BoardView {
    /// Render the board as of `now`, marking the dragged card if any.
    pub fn render(board: &QueueBoard, dragging: Option<&str>, now: DateTime<Utc>) -> Self {
        let lanes = Lane::ALL
            .into_iter()
            .map(|lane| LaneView {
                lane,
                title: lane.title(),
                cards: board
                    .get_lane(lane)
                    .iter()
                    .map(|record| card(record, dragging, now))
                    .collect(),
            })
            .collect();

        Self {
            lanes,
            rendered_at: now,
        }
    }

    pub fn lane(&self, lane: Lane) -> &LaneView {
        &self.lanes[lane.index()]
    }

    /// Mean minutes spent so far by patients still waiting.
    pub fn average_wait_minutes(&self) -> Option<f64> {
        let waiting = &self.lane(Lane::Waiting).cards;
        if waiting.is_empty() {
            return None;
        }
        let total: i64 = waiting.iter().map(|c| c.minutes_in_lane).sum();
        Some(total as f64 / waiting.len() as f64)
    }
}

fn card(record: &VisitRecord, dragging: Option<&str>, now: DateTime<Utc>) -> CardView {
    CardView {
        id: record.id.clone(),
        patient_name: record.patient_name.clone(),
        service_label: record.service_label.clone(),
        assigned_staff: record.assigned_staff.clone(),
        scheduled_time: record.scheduled_time.format("%H:%M").to_string(),
        minutes_in_lane: record.minutes_in_lane(now),
        is_dragging: dragging == Some(record.id.as_str()),
    }
}

/// A patient search hit.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientMatch {
    pub id: String,
    pub patient_name: String,
    pub lane: Lane,
    pub position: usize,
    pub score: f64,
}

/// Find patients on the board by (possibly misspelled) name, best first.
pub fn find_patient(board: &QueueBoard, query: &str, limit: usize) -> Vec<PatientMatch> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<PatientMatch> = Lane::ALL
        .into_iter()
        .flat_map(|lane| {
            board
                .get_lane(lane)
                .iter()
                .enumerate()
                .map(move |(position, record)| (lane, position, record))
        })
        .filter_map(|(lane, position, record)| {
            let score = score_name(&query, &record.patient_name);
            (score >= MIN_SEARCH_SCORE).then(|| PatientMatch {
                id: record.id.clone(),
                patient_name: record.patient_name.clone(),
                lane,
                position,
                score,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(limit);
    matches
}

/// Score a name against a lowercase query (0.0 - 1.0).
fn score_name(query: &str, name: &str) -> f64 {
    let name_lower = name.to_lowercase();
    if name_lower.contains(query) {
        return 1.0;
    }

    // Best of whole-name and per-word similarity, so "souza" finds "Ana Souza".
    let whole = fuzzy_match(query, &name_lower);
    let best_word = name_lower
        .split_whitespace()
        .map(|word| fuzzy_match(query, word))
        .fold(0.0, f64::max);

    whole.max(best_word)
}

fn fuzzy_match(a: &str, b: &str) -> f64 {
    jaro_winkler(a, b) * 0.6 + normalized_levenshtein(a, b) * 0.4
}
