//! Debounced tag autocomplete.

use crate::TaskError;
use api_client::{DamBackend, TagSuggestion};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Only the last query typed within the debounce window reaches the server.
///
/// Clones share the same window.
#[derive(Clone)]
pub struct TagAutocomplete {
    backend: Arc<dyn DamBackend>,
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl TagAutocomplete {
    pub fn new(backend: Arc<dyn DamBackend>, delay: Duration) -> Self {
        Self {
            backend,
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Resolves to `None` when a newer query superseded this one, either
    /// during the debounce window or while the request was in flight.
    pub async fn query(&self, query: String) -> Option<Result<Vec<TagSuggestion>, TaskError>> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = query.trim().to_string();
        if query.is_empty() {
            return Some(Ok(Vec::new()));
        }

        sleep(self.delay).await;
        if self.generation.load(Ordering::SeqCst) != ticket {
            return None;
        }

        tracing::debug!(%query, "tag autocomplete");
        let result = self.backend.autocomplete_tags(&query).await;
        if self.generation.load(Ordering::SeqCst) != ticket {
            return None;
        }
        Some(result.map_err(|e| {
            tracing::warn!(%query, error = %e, "tag autocomplete failed");
            e.into()
        }))
    }
}

impl std::fmt::Debug for TagAutocomplete {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagAutocomplete")
            .field("delay", &self.delay)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}
