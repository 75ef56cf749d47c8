use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;

use super::FieldExtractor;
use super::error::ExtractError;
use super::types::{Message, MessagesRequest, MessagesResponse};
use crate::workflow::EventFields;

const API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Model used for field extraction. The task is small and structured, so the
/// fast tier is enough.
const EXTRACTION_MODEL: &str = "claude-haiku-4-5-20251001";

/// LLM-backed implementation of [`FieldExtractor`] over the Anthropic
/// Messages API.
pub struct ExtractorClient {
    api_key: String,
    client: Client,
    base_url: String,
}

impl ExtractorClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, API_URL.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");
        Self {
            api_key,
            client,
            base_url,
        }
    }

    async fn send_message(
        &self,
        req: &MessagesRequest,
    ) -> Result<MessagesResponse, ExtractError> {
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(req)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return Err(ExtractError::RateLimited {
                retry_after_ms: retry_after,
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ExtractError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json::<MessagesResponse>().await?;
        Ok(body)
    }
}

impl FieldExtractor for ExtractorClient {
    async fn extract(&self, text: &str) -> Result<EventFields, ExtractError> {
        let today = chrono::Local::now().date_naive();
        let req = MessagesRequest {
            model: EXTRACTION_MODEL.to_string(),
            max_tokens: 1024,
            messages: vec![Message {
                role: "user".into(),
                content: extraction_prompt(today, text),
            }],
        };

        let response = self.send_message(&req).await?;
        let reply = response
            .content
            .first()
            .map(|b| b.text.trim().to_string())
            .unwrap_or_default();

        parse_fields(&reply)
    }
}

/// Build the extraction prompt for one row of text.
///
/// Today's date is embedded so the model can resolve year-less dates to the
/// nearest future occurrence.
fn extraction_prompt(today: NaiveDate, text: &str) -> String {
    format!(
        "Extract the event schedule information from this text. \
         Respond with ONLY valid JSON, no other text.\n\
         Today's date is {today}.\n\
         \n\
         Format:\n\
         {{\"title\": \"<short event title>\", \"date\": \"<YYYY-MM-DD>\", \"time\": \"<HH:MM>\", \
         \"location\": \"<place or address>\", \"description\": \"<short description>\", \
         \"notes\": \"<warnings, preparation items, other important details>\"}}\n\
         \n\
         Rules:\n\
         - date: if the text names a year, use it; otherwise pick the nearest future date \
         (this year if that day has not passed yet, next year if it has)\n\
         - time: 24-hour HH:MM\n\
         - Use an empty string for anything the text does not contain\n\
         \n\
         Text: {text}"
    )
}

/// Parse the model's JSON reply into event fields.
///
/// Members absent from the reply default to empty strings via serde defaults.
fn parse_fields(reply: &str) -> Result<EventFields, ExtractError> {
    serde_json::from_str(reply).map_err(|e| ExtractError::Parse(e.to_string()))
}
