use std::fmt;

use serde::{Deserialize, Serialize};

/// The event fields derived from a row's free text.
///
/// All fields are plain strings and default to empty; extraction fills in
/// whatever the text contains and leaves the rest blank, never null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFields {
    #[serde(default)]
    pub title: String,
    /// Date as `YYYY-MM-DD`.
    #[serde(default)]
    pub date: String,
    /// Time of day as `HH:MM`, 24-hour.
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    /// Warnings, preparation items, other details worth keeping.
    #[serde(default)]
    pub notes: String,
}

/// Where a record stands in its lifecycle.
///
/// Every variant except `InProgress` is terminal: once reached, no later step
/// mutates the record and it is archived into the processed log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    /// Selected from the queue, still moving through the pipeline.
    InProgress,
    /// Finished without a calendar entry because no date was extracted.
    CompletedNoDate,
    /// A calendar entry was created for this record.
    CalendarRegistered,
    /// The calendar call succeeded but returned no event identifier.
    CalendarFailed,
    /// A collaborator call failed outright.
    Error,
}

impl RecordStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RecordStatus::InProgress)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::InProgress => write!(f, "in progress"),
            RecordStatus::CompletedNoDate => write!(f, "completed (no date)"),
            RecordStatus::CalendarRegistered => write!(f, "calendar registered"),
            RecordStatus::CalendarFailed => write!(f, "completed (calendar registration failed)"),
            RecordStatus::Error => write!(f, "error"),
        }
    }
}

/// A raw queue item as fetched from the sheet: the 1-based row number and the
/// untouched cell text. Row numbers are assigned at fetch time and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRow {
    pub row_number: u32,
    pub text: String,
}

/// One row in flight through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub row_number: u32,
    pub original_text: String,
    pub fields: EventFields,
    pub status: RecordStatus,
    /// Diagnostic from the first failing collaborator call; never cleared.
    pub error: Option<String>,
    /// Identifier of the calendar entry, when registration succeeded.
    pub calendar_event_id: Option<String>,
}

impl Record {
    /// Construct a fresh in-progress record from a queue item.
    pub fn new(row: PendingRow) -> Self {
        Self {
            row_number: row.row_number,
            original_text: row.text,
            fields: EventFields::default(),
            status: RecordStatus::InProgress,
            error: None,
            calendar_event_id: None,
        }
    }
}
