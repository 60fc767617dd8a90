//! Background work behind the asset drawer: thumbnail polling, manual
//! thumbnail actions, metrics, the metadata batch and tag autocomplete.

pub mod actions;
pub mod metadata;
pub mod metrics;
pub mod poll;
pub mod tags;

use api_client::ApiClientError;
use thiserror::Error;

pub use actions::{generate_thumbnail, regenerate_styles, retry_thumbnail, GenerateGuard};
pub use metadata::{
    load_field_editor, plan_batch, submit_field_editor, BatchCall, BatchFailure, BatchReport,
    FieldEdit, FieldEditorData,
};
pub use metrics::{fetch_activity, fetch_metrics, Loadable, MetricsState, PerAsset};
pub use poll::{PollConfig, PollController, PollHandle, PollOutcome};
pub use tags::TagAutocomplete;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("API Client Error: {0}")]
    ApiClientError(String),
    #[error("Other task error: {0}")]
    Other(String),
}

impl From<ApiClientError> for TaskError {
    fn from(err: ApiClientError) -> Self {
        TaskError::ApiClientError(err.to_string())
    }
}
