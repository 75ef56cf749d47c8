//! The extraction collaborator: free text in, candidate event fields out.

pub mod client;
pub mod error;
pub mod types;

pub use client::ExtractorClient;
pub use error::ExtractError;

use crate::workflow::EventFields;

/// Turns one row's free text into candidate event fields.
///
/// Implementations carry no state the pipeline depends on beyond the returned
/// fields or the failure signal. Missing fields come back as empty strings.
#[allow(async_fn_in_trait)]
pub trait FieldExtractor {
    async fn extract(&self, text: &str) -> Result<EventFields, ExtractError>;
}
