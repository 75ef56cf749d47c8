//! The calendar-store collaborator: turns extracted fields into calendar
//! entries with a fixed one-hour duration.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::workflow::EventFields;

const API_URL: &str = "https://www.googleapis.com";

/// Start time used when the extracted fields carry a date but no time.
pub const DEFAULT_EVENT_TIME: &str = "09:00";

const EVENT_DURATION_HOURS: i64 = 1;

/// Failures from the calendar store.
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The record's date/time do not form a valid event start.
    #[error("invalid event start: {0}")]
    InvalidStart(String),
}

/// A calendar entry summary as returned by the upcoming-events listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingEvent {
    pub start: String,
    pub summary: String,
}

/// Operations the pipeline needs from the calendar store.
#[allow(async_fn_in_trait)]
pub trait CalendarStore {
    /// Create an entry and return its identifier. An empty identifier is the
    /// caller's signal that the store accepted the call but created nothing.
    async fn create_event(&self, fields: &EventFields) -> Result<String, CalendarError>;
    async fn list_upcoming(&self, max_results: u32) -> Result<Vec<UpcomingEvent>, CalendarError>;
}

/// Google Calendar v3 implementation of [`CalendarStore`], authenticated with
/// a bearer access token.
pub struct CalendarClient {
    access_token: String,
    calendar_id: String,
    timezone: String,
    default_time: String,
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct EventResource {
    summary: String,
    location: String,
    description: String,
    start: EventTime,
    end: EventTime,
    reminders: Reminders,
}

#[derive(Debug, Serialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: String,
    #[serde(rename = "timeZone")]
    time_zone: String,
}

#[derive(Debug, Serialize)]
struct Reminders {
    #[serde(rename = "useDefault")]
    use_default: bool,
    overrides: Vec<ReminderOverride>,
}

#[derive(Debug, Serialize)]
struct ReminderOverride {
    method: String,
    minutes: u32,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    start: EventItemStart,
}

#[derive(Debug, Default, Deserialize)]
struct EventItemStart {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

impl CalendarClient {
    pub fn new(
        access_token: String,
        calendar_id: String,
        timezone: String,
        default_time: String,
    ) -> Self {
        Self::with_base_url(
            access_token,
            calendar_id,
            timezone,
            default_time,
            API_URL.to_string(),
        )
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(
        access_token: String,
        calendar_id: String,
        timezone: String,
        default_time: String,
        base_url: String,
    ) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");
        Self {
            access_token,
            calendar_id,
            timezone,
            default_time,
            client,
            base_url,
        }
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendar/v3/calendars/{}/events",
            self.base_url, self.calendar_id
        )
    }
}

impl CalendarStore for CalendarClient {
    async fn create_event(&self, fields: &EventFields) -> Result<String, CalendarError> {
        let start = event_start(&fields.date, &fields.time, &self.default_time)?;
        let end = start + chrono::Duration::hours(EVENT_DURATION_HOURS);

        let resource = EventResource {
            summary: if fields.title.is_empty() {
                "Untitled event".to_string()
            } else {
                fields.title.clone()
            },
            location: fields.location.clone(),
            description: event_body(fields),
            start: EventTime {
                date_time: start.format("%Y-%m-%dT%H:%M:%S").to_string(),
                time_zone: self.timezone.clone(),
            },
            end: EventTime {
                date_time: end.format("%Y-%m-%dT%H:%M:%S").to_string(),
                time_zone: self.timezone.clone(),
            },
            reminders: Reminders {
                use_default: false,
                overrides: vec![
                    ReminderOverride {
                        method: "popup".into(),
                        minutes: 24 * 60,
                    },
                    ReminderOverride {
                        method: "popup".into(),
                        minutes: 60,
                    },
                ],
            },
        };

        let response = self
            .client
            .post(self.events_url())
            .bearer_auth(&self.access_token)
            .json(&resource)
            .send()
            .await?;

        let created = check_status(response).await?.json::<CreatedEvent>().await?;
        Ok(created.id)
    }

    async fn list_upcoming(&self, max_results: u32) -> Result<Vec<UpcomingEvent>, CalendarError> {
        let time_min = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let max_results = max_results.to_string();
        let response = self
            .client
            .get(self.events_url())
            .bearer_auth(&self.access_token)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("maxResults", max_results.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await?;

        let body = check_status(response).await?.json::<EventList>().await?;
        Ok(body
            .items
            .into_iter()
            .map(|item| UpcomingEvent {
                start: item
                    .start
                    .date_time
                    .or(item.start.date)
                    .unwrap_or_default(),
                summary: item.summary,
            })
            .collect())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CalendarError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        return Err(CalendarError::ApiError {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

/// Resolve the event start from the extracted date and time, falling back to
/// `default_time` when the time is blank.
fn event_start(
    date: &str,
    time: &str,
    default_time: &str,
) -> Result<NaiveDateTime, CalendarError> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| CalendarError::InvalidStart(format!("date {date:?}: {e}")))?;
    let time = if time.is_empty() { default_time } else { time };
    let time = NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|e| CalendarError::InvalidStart(format!("time {time:?}: {e}")))?;
    Ok(date.and_time(time))
}

// Description and notes share the event body, separated by a blank line.
fn event_body(fields: &EventFields) -> String {
    let mut parts = Vec::new();
    if !fields.description.is_empty() {
        parts.push(fields.description.clone());
    }
    if !fields.notes.is_empty() {
        parts.push(format!("Notes:\n{}", fields.notes));
    }
    parts.join("\n\n")
}
