//! Shared run state and the merge contract that lets steps compose.
//!
//! Every pipeline step reads [`RunState`] and returns a sparse [`StateUpdate`].
//! The merge policy is declared per field here, once, instead of being
//! improvised by each step: overwrite fields replace, append fields extend,
//! counter deltas add. [`RunState::apply`] is the only place a step result
//! touches the state.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{PendingRow, Record};
use super::step::Step;

/// Batch-level progress counters.
///
/// `total` is set once when the queue is fetched; the rest only ever grow.
/// After every completed record, `processed == success + failed` holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub total: u32,
    pub processed: u32,
    pub success: u32,
    pub failed: u32,
}

/// One entry in the run's error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// The step whose collaborator call failed.
    pub step: Step,
    /// The row in flight, when the failure was tied to one.
    pub row_number: Option<u32>,
    pub detail: String,
}

/// The shared state of one batch execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunState {
    /// Pending rows in fetch order. Shrinks from the front, one row per
    /// selection; never re-ordered.
    pub queue: VecDeque<PendingRow>,
    /// The record currently moving through the pipeline, if any.
    pub current: Option<Record>,
    /// Records that reached a terminal status, in completion order. Append-only.
    pub processed_log: Vec<Record>,
    /// Step-by-step progress log. Append-only.
    pub messages: Vec<String>,
    /// Per-record and fetch failures. Append-only; a non-empty error log does
    /// not mean the run failed.
    pub error_log: Vec<ErrorEntry>,
    pub counters: Counters,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a step's partial update into the state.
    ///
    /// - `queue`, `current`, `total`: overwrite when present.
    /// - `processed`, `messages`, `errors`: concatenated in arrival order.
    /// - `*_delta`: added to the matching counter, never overwriting it.
    ///
    /// Fields a step leaves unset are untouched.
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(queue) = update.queue {
            self.queue = queue;
        }
        if let Some(current) = update.current {
            self.current = current;
        }
        if let Some(total) = update.total {
            self.counters.total = total;
        }
        self.processed_log.extend(update.processed);
        self.messages.extend(update.messages);
        self.error_log.extend(update.errors);
        self.counters.processed += update.processed_delta;
        self.counters.success += update.success_delta;
        self.counters.failed += update.failed_delta;
    }
}

/// A sparse, fixed-shape partial update returned by a step.
///
/// `current` is doubly optional: `None` leaves the in-flight record alone,
/// `Some(None)` clears it, `Some(Some(record))` replaces it.
#[derive(Debug, Default, PartialEq)]
pub struct StateUpdate {
    pub queue: Option<VecDeque<PendingRow>>,
    pub current: Option<Option<Record>>,
    pub total: Option<u32>,
    pub processed: Vec<Record>,
    pub messages: Vec<String>,
    pub errors: Vec<ErrorEntry>,
    pub processed_delta: u32,
    pub success_delta: u32,
    pub failed_delta: u32,
}

/// Summary of a finished (or guard-stopped) run, printed as JSON at exit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub total: u32,
    pub processed: u32,
    pub success: u32,
    pub failed: u32,
    pub error_count: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl RunReport {
    pub fn from_state(state: &RunState, started_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            total: state.counters.total,
            processed: state.counters.processed,
            success: state.counters.success,
            failed: state.counters.failed,
            error_count: state.error_log.len(),
            started_at,
            completed_at: now,
            duration_ms: (now - started_at).num_milliseconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::record::RecordStatus;

    fn row(n: u32) -> PendingRow {
        PendingRow {
            row_number: n,
            text: format!("text {n}"),
        }
    }

    #[test]
    fn overwrite_fields_replace() {
        let mut state = RunState::new();
        state.apply(StateUpdate {
            queue: Some(VecDeque::from([row(2), row(3)])),
            total: Some(2),
            ..Default::default()
        });
        assert_eq!(state.queue.len(), 2);
        assert_eq!(state.counters.total, 2);

        state.apply(StateUpdate {
            queue: Some(VecDeque::from([row(3)])),
            current: Some(Some(Record::new(row(2)))),
            ..Default::default()
        });
        assert_eq!(state.queue.len(), 1);
        assert_eq!(state.current.as_ref().unwrap().row_number, 2);
        // total untouched by the second update
        assert_eq!(state.counters.total, 2);
    }

    #[test]
    fn clearing_current_needs_explicit_some_none() {
        let mut state = RunState::new();
        state.apply(StateUpdate {
            current: Some(Some(Record::new(row(2)))),
            ..Default::default()
        });

        // An absent entry leaves the record in flight.
        state.apply(StateUpdate::default());
        assert!(state.current.is_some());

        state.apply(StateUpdate {
            current: Some(None),
            ..Default::default()
        });
        assert!(state.current.is_none());
    }

    #[test]
    fn append_fields_preserve_arrival_order() {
        let mut state = RunState::new();
        state.apply(StateUpdate {
            messages: vec!["first".into(), "second".into()],
            ..Default::default()
        });
        state.apply(StateUpdate {
            messages: vec!["third".into()],
            errors: vec![ErrorEntry {
                step: Step::ExtractFields,
                row_number: Some(2),
                detail: "boom".into(),
            }],
            ..Default::default()
        });

        assert_eq!(state.messages, vec!["first", "second", "third"]);
        assert_eq!(state.error_log.len(), 1);
        assert_eq!(state.error_log[0].step, Step::ExtractFields);
    }

    #[test]
    fn processed_log_extends_without_truncation() {
        let mut state = RunState::new();
        let mut done = Record::new(row(2));
        done.status = RecordStatus::CalendarRegistered;
        state.apply(StateUpdate {
            processed: vec![done],
            ..Default::default()
        });
        let mut failed = Record::new(row(3));
        failed.status = RecordStatus::Error;
        state.apply(StateUpdate {
            processed: vec![failed],
            ..Default::default()
        });

        let rows: Vec<u32> = state.processed_log.iter().map(|r| r.row_number).collect();
        assert_eq!(rows, vec![2, 3]);
    }

    #[test]
    fn counter_deltas_add_instead_of_overwriting() {
        let mut state = RunState::new();
        state.apply(StateUpdate {
            total: Some(3),
            ..Default::default()
        });
        state.apply(StateUpdate {
            processed_delta: 1,
            success_delta: 1,
            ..Default::default()
        });
        state.apply(StateUpdate {
            processed_delta: 1,
            failed_delta: 1,
            ..Default::default()
        });
        state.apply(StateUpdate {
            processed_delta: 1,
            success_delta: 1,
            ..Default::default()
        });

        assert_eq!(state.counters.total, 3);
        assert_eq!(state.counters.processed, 3);
        assert_eq!(state.counters.success, 2);
        assert_eq!(state.counters.failed, 1);
        assert_eq!(
            state.counters.processed,
            state.counters.success + state.counters.failed
        );
    }

    #[test]
    fn empty_update_is_a_no_op() {
        let mut state = RunState::new();
        state.apply(StateUpdate {
            queue: Some(VecDeque::from([row(2)])),
            total: Some(1),
            messages: vec!["loaded".into()],
            ..Default::default()
        });
        let before = format!("{state:?}");
        state.apply(StateUpdate::default());
        assert_eq!(format!("{state:?}"), before);
    }

    #[test]
    fn report_reflects_state() {
        let mut state = RunState::new();
        state.apply(StateUpdate {
            total: Some(2),
            processed_delta: 2,
            success_delta: 1,
            failed_delta: 1,
            errors: vec![ErrorEntry {
                step: Step::RegisterCalendar,
                row_number: Some(4),
                detail: "calendar down".into(),
            }],
            ..Default::default()
        });

        let started = Utc::now();
        let report = RunReport::from_state(&state, started);
        assert_eq!(report.total, 2);
        assert_eq!(report.processed, 2);
        assert_eq!(report.success, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.error_count, 1);
        assert!(report.duration_ms >= 0);
    }
}
