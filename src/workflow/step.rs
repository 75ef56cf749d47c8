use std::fmt;

use serde::{Deserialize, Serialize};

use super::state::RunState;

/// The eight steps of the sync pipeline.
///
/// A batch flows FETCH_QUEUE → SELECT_NEXT → EXTRACT_FIELDS → VALIDATE →
/// PERSIST_FIELDS → REGISTER_CALENDAR → MARK_SYNCED → CHECK_REMAINING, looping
/// back to SELECT_NEXT while pending rows remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    FetchQueue,
    SelectNext,
    ExtractFields,
    Validate,
    PersistFields,
    RegisterCalendar,
    MarkSynced,
    CheckRemaining,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::FetchQueue => write!(f, "fetch_queue"),
            Step::SelectNext => write!(f, "select_next"),
            Step::ExtractFields => write!(f, "extract_fields"),
            Step::Validate => write!(f, "validate"),
            Step::PersistFields => write!(f, "persist_fields"),
            Step::RegisterCalendar => write!(f, "register_calendar"),
            Step::MarkSynced => write!(f, "mark_synced"),
            Step::CheckRemaining => write!(f, "check_remaining"),
        }
    }
}

/// Where the engine goes after a step's update has been merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Next(Step),
    End,
}

/// The static transition table.
///
/// Most edges are unconditional. Two steps route on the merged state:
/// after `SelectNext`, an empty selection ends the run; after
/// `CheckRemaining`, a non-empty queue loops back to `SelectNext`.
pub fn route(step: Step, state: &RunState) -> Transition {
    match step {
        Step::FetchQueue => Transition::Next(Step::SelectNext),
        Step::SelectNext => {
            if state.current.is_none() {
                Transition::End
            } else {
                Transition::Next(Step::ExtractFields)
            }
        }
        Step::ExtractFields => Transition::Next(Step::Validate),
        Step::Validate => Transition::Next(Step::PersistFields),
        Step::PersistFields => Transition::Next(Step::RegisterCalendar),
        Step::RegisterCalendar => Transition::Next(Step::MarkSynced),
        Step::MarkSynced => Transition::Next(Step::CheckRemaining),
        Step::CheckRemaining => {
            if state.queue.is_empty() {
                Transition::End
            } else {
                Transition::Next(Step::SelectNext)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::record::{PendingRow, Record};

    fn state_with(queue_rows: &[u32], current: Option<u32>) -> RunState {
        let mut state = RunState::new();
        state.queue = queue_rows
            .iter()
            .map(|&n| PendingRow {
                row_number: n,
                text: String::new(),
            })
            .collect();
        state.current = current.map(|n| {
            Record::new(PendingRow {
                row_number: n,
                text: String::new(),
            })
        });
        state
    }

    #[test]
    fn unconditional_edges() {
        let state = state_with(&[], None);
        assert_eq!(
            route(Step::FetchQueue, &state),
            Transition::Next(Step::SelectNext)
        );
        assert_eq!(
            route(Step::ExtractFields, &state),
            Transition::Next(Step::Validate)
        );
        assert_eq!(
            route(Step::Validate, &state),
            Transition::Next(Step::PersistFields)
        );
        assert_eq!(
            route(Step::PersistFields, &state),
            Transition::Next(Step::RegisterCalendar)
        );
        assert_eq!(
            route(Step::RegisterCalendar, &state),
            Transition::Next(Step::MarkSynced)
        );
        assert_eq!(
            route(Step::MarkSynced, &state),
            Transition::Next(Step::CheckRemaining)
        );
    }

    #[test]
    fn select_next_routes_on_current() {
        let empty = state_with(&[], None);
        assert_eq!(route(Step::SelectNext, &empty), Transition::End);

        let in_flight = state_with(&[], Some(2));
        assert_eq!(
            route(Step::SelectNext, &in_flight),
            Transition::Next(Step::ExtractFields)
        );
    }

    #[test]
    fn check_remaining_routes_on_queue() {
        let drained = state_with(&[], Some(2));
        assert_eq!(route(Step::CheckRemaining, &drained), Transition::End);

        let pending = state_with(&[3], Some(2));
        assert_eq!(
            route(Step::CheckRemaining, &pending),
            Transition::Next(Step::SelectNext)
        );
    }

    #[test]
    fn step_display_names() {
        assert_eq!(Step::FetchQueue.to_string(), "fetch_queue");
        assert_eq!(Step::SelectNext.to_string(), "select_next");
        assert_eq!(Step::ExtractFields.to_string(), "extract_fields");
        assert_eq!(Step::Validate.to_string(), "validate");
        assert_eq!(Step::PersistFields.to_string(), "persist_fields");
        assert_eq!(Step::RegisterCalendar.to_string(), "register_calendar");
        assert_eq!(Step::MarkSynced.to_string(), "mark_synced");
        assert_eq!(Step::CheckRemaining.to_string(), "check_remaining");
    }

    #[test]
    fn step_serializes_to_snake_case() {
        let json = serde_json::to_string(&Step::RegisterCalendar).unwrap();
        assert_eq!(json, r#""register_calendar""#);
    }
}
