//! Drives a batch through the pipeline: execute the current step, merge its
//! partial update, consult the transition table, repeat until END.

use std::collections::VecDeque;

use chrono::{NaiveDate, NaiveTime};

use crate::calendar::CalendarStore;
use crate::error::RunError;
use crate::extract::FieldExtractor;
use crate::sheets::RowStore;
use crate::workflow::{
    ErrorEntry, Record, RecordStatus, RunState, StateUpdate, Step, Transition, route,
};

/// Default ceiling on record-loops before a run is declared stuck.
pub const DEFAULT_MAX_LOOPS: u32 = 100;

/// Sequences the pipeline over the three collaborators.
///
/// One engine instance handles one batch at a time; exactly one step executes
/// at any moment, so the merge rules in [`RunState::apply`] need no locking.
pub struct Engine<E, S, C> {
    extractor: E,
    rows: S,
    calendar: C,
    max_loops: u32,
}

impl<E, S, C> Engine<E, S, C>
where
    E: FieldExtractor,
    S: RowStore,
    C: CalendarStore,
{
    pub fn new(extractor: E, rows: S, calendar: C) -> Self {
        Self {
            extractor,
            rows,
            calendar,
            max_loops: DEFAULT_MAX_LOOPS,
        }
    }

    pub fn with_max_loops(mut self, max_loops: u32) -> Self {
        self.max_loops = max_loops;
        self
    }

    /// Run the batch to completion and return the final state.
    ///
    /// Starts at `fetch_queue` and terminates only at END. The iteration
    /// guard counts loop-backs into `select_next`; exceeding it aborts with
    /// [`RunError::GuardExceeded`], which still carries the partial state.
    pub async fn run(&self, mut state: RunState) -> Result<RunState, RunError> {
        let mut step = Step::FetchQueue;
        let mut loops: u32 = 0;

        loop {
            let update = self.execute(step, &state).await;
            state.apply(update);

            match route(step, &state) {
                Transition::End => return Ok(state),
                Transition::Next(next) => {
                    if step == Step::CheckRemaining && next == Step::SelectNext {
                        loops += 1;
                        if loops >= self.max_loops {
                            return Err(RunError::GuardExceeded {
                                iterations: loops,
                                state: Box::new(state),
                            });
                        }
                    }
                    step = next;
                }
            }
        }
    }

    async fn execute(&self, step: Step, state: &RunState) -> StateUpdate {
        match step {
            Step::FetchQueue => self.fetch_queue().await,
            Step::SelectNext => select_next(state),
            Step::ExtractFields => self.extract_fields(state).await,
            Step::Validate => validate(state),
            Step::PersistFields => self.persist_fields(state).await,
            Step::RegisterCalendar => self.register_calendar(state).await,
            Step::MarkSynced => self.mark_synced(state).await,
            Step::CheckRemaining => check_remaining(state),
        }
    }

    async fn fetch_queue(&self) -> StateUpdate {
        match self.rows.fetch_unprocessed().await {
            Ok(rows) => {
                let total = rows.len() as u32;
                StateUpdate {
                    queue: Some(VecDeque::from(rows)),
                    total: Some(total),
                    messages: vec![format!("loaded {total} pending rows")],
                    ..Default::default()
                }
            }
            Err(e) => StateUpdate {
                queue: Some(VecDeque::new()),
                total: Some(0),
                messages: vec![format!("failed to read pending rows: {e}")],
                errors: vec![ErrorEntry {
                    step: Step::FetchQueue,
                    row_number: None,
                    detail: e.to_string(),
                }],
                ..Default::default()
            },
        }
    }

    async fn extract_fields(&self, state: &RunState) -> StateUpdate {
        let Some(current) = &state.current else {
            return no_record(Step::ExtractFields);
        };
        let row = current.row_number;

        match self.extractor.extract(&current.original_text).await {
            Ok(fields) => {
                let title = if fields.title.is_empty() {
                    "(untitled)".to_string()
                } else {
                    fields.title.clone()
                };
                let mut updated = current.clone();
                updated.fields = fields;
                StateUpdate {
                    current: Some(Some(updated)),
                    messages: vec![format!("row {row} extracted: {title}")],
                    ..Default::default()
                }
            }
            // A failed extraction still flows downstream with whatever fields
            // it has; the failure must not halt the pipeline.
            Err(e) => {
                let mut updated = current.clone();
                updated.error = Some(e.to_string());
                StateUpdate {
                    current: Some(Some(updated)),
                    messages: vec![format!("row {row} extraction failed: {e}")],
                    errors: vec![ErrorEntry {
                        step: Step::ExtractFields,
                        row_number: Some(row),
                        detail: e.to_string(),
                    }],
                    ..Default::default()
                }
            }
        }
    }

    async fn persist_fields(&self, state: &RunState) -> StateUpdate {
        let Some(current) = &state.current else {
            return no_record(Step::PersistFields);
        };
        let row = current.row_number;

        let result = async {
            self.rows.write_fields(row, &current.fields).await?;
            self.rows.mark_processed(row).await
        }
        .await;

        match result {
            Ok(()) => StateUpdate {
                messages: vec![format!("row {row} fields written to sheet")],
                ..Default::default()
            },
            Err(e) => StateUpdate {
                messages: vec![format!("row {row} sheet write failed: {e}")],
                errors: vec![ErrorEntry {
                    step: Step::PersistFields,
                    row_number: Some(row),
                    detail: e.to_string(),
                }],
                ..Default::default()
            },
        }
    }

    async fn register_calendar(&self, state: &RunState) -> StateUpdate {
        let Some(current) = &state.current else {
            return no_record(Step::RegisterCalendar);
        };
        let row = current.row_number;

        if current.fields.date.is_empty() {
            let mut updated = current.clone();
            updated.status = RecordStatus::CompletedNoDate;
            return StateUpdate {
                current: Some(Some(updated)),
                messages: vec![format!(
                    "row {row}: no date extracted, skipping calendar registration"
                )],
                ..Default::default()
            };
        }

        match self.calendar.create_event(&current.fields).await {
            Ok(id) if !id.is_empty() => {
                let mut updated = current.clone();
                updated.status = RecordStatus::CalendarRegistered;
                updated.calendar_event_id = Some(id);
                StateUpdate {
                    current: Some(Some(updated)),
                    messages: vec![format!(
                        "row {row} registered in calendar: {}",
                        current.fields.title
                    )],
                    ..Default::default()
                }
            }
            Ok(_) => {
                let mut updated = current.clone();
                updated.status = RecordStatus::CalendarFailed;
                StateUpdate {
                    current: Some(Some(updated)),
                    messages: vec![format!(
                        "row {row} calendar registration returned no identifier"
                    )],
                    ..Default::default()
                }
            }
            Err(e) => {
                let mut updated = current.clone();
                updated.status = RecordStatus::Error;
                updated.error = Some(e.to_string());
                StateUpdate {
                    current: Some(Some(updated)),
                    messages: vec![format!("row {row} calendar registration failed: {e}")],
                    errors: vec![ErrorEntry {
                        step: Step::RegisterCalendar,
                        row_number: Some(row),
                        detail: e.to_string(),
                    }],
                    ..Default::default()
                }
            }
        }
    }

    // The single counting point: every record is archived here exactly once,
    // and the processed/success/failed deltas move here and nowhere else.
    async fn mark_synced(&self, state: &RunState) -> StateUpdate {
        let Some(current) = &state.current else {
            return no_record(Step::MarkSynced);
        };
        let row = current.row_number;

        if current.status == RecordStatus::CalendarRegistered {
            let mut update = StateUpdate {
                current: Some(None),
                processed: vec![current.clone()],
                processed_delta: 1,
                success_delta: 1,
                ..Default::default()
            };
            match self.rows.mark_calendar_synced(row).await {
                Ok(()) => update
                    .messages
                    .push(format!("row {row} marked calendar-synced")),
                Err(e) => {
                    update
                        .messages
                        .push(format!("row {row} sync-mark failed: {e}"));
                    update.errors.push(ErrorEntry {
                        step: Step::MarkSynced,
                        row_number: Some(row),
                        detail: e.to_string(),
                    });
                }
            }
            update
        } else {
            // Routing guarantees register_calendar already settled the status.
            debug_assert!(current.status.is_terminal());
            StateUpdate {
                current: Some(None),
                processed: vec![current.clone()],
                processed_delta: 1,
                failed_delta: 1,
                messages: vec![format!(
                    "row {row} finished with status: {}",
                    current.status
                )],
                ..Default::default()
            }
        }
    }
}

/// Dequeue the head row and put a fresh record in flight.
///
/// Pure: reads the state, returns the update. On an empty queue the update
/// clears `current` and touches nothing else, so re-running it is idempotent.
fn select_next(state: &RunState) -> StateUpdate {
    let mut queue = state.queue.clone();
    match queue.pop_front() {
        None => StateUpdate {
            current: Some(None),
            ..Default::default()
        },
        Some(row) => {
            let position = state.counters.processed + 1;
            let banner = format!(
                "[{position}/{total}] row {row_number}",
                total = state.counters.total,
                row_number = row.row_number
            );
            StateUpdate {
                current: Some(Some(Record::new(row))),
                queue: Some(queue),
                messages: vec![banner],
                ..Default::default()
            }
        }
    }
}

/// Advisory checks on the extracted fields.
///
/// Read-only: failures concatenate into one warning message and never block
/// progression to persistence.
fn validate(state: &RunState) -> StateUpdate {
    let Some(current) = &state.current else {
        return no_record(Step::Validate);
    };
    let row = current.row_number;
    let fields = &current.fields;

    let mut issues = Vec::new();
    if fields.title.is_empty() {
        issues.push("missing title".to_string());
    }
    if fields.date.is_empty() {
        issues.push("missing date".to_string());
    } else if !is_valid_date(&fields.date) {
        issues.push(format!("malformed date: {}", fields.date));
    }
    if !fields.time.is_empty() && !is_valid_time(&fields.time) {
        issues.push(format!("malformed time: {}", fields.time));
    }

    let message = if issues.is_empty() {
        format!("row {row} fields look complete")
    } else {
        format!("row {row} validation warnings: {}", issues.join(", "))
    };
    StateUpdate {
        messages: vec![message],
        ..Default::default()
    }
}

fn check_remaining(state: &RunState) -> StateUpdate {
    StateUpdate {
        messages: vec![format!("{} rows remaining", state.queue.len())],
        ..Default::default()
    }
}

fn no_record(step: Step) -> StateUpdate {
    StateUpdate {
        messages: vec![format!("{step}: no record in flight")],
        ..Default::default()
    }
}

// Dash-separated YYYY-MM-DD with zero padding; the length check rejects
// unpadded components chrono would otherwise accept.
fn is_valid_date(s: &str) -> bool {
    s.len() == 10 && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

// Colon-separated HH:MM, 24-hour, zero-padded.
fn is_valid_time(s: &str) -> bool {
    s.len() == 5 && NaiveTime::parse_from_str(s, "%H:%M").is_ok()
}
