//! Manual thumbnail actions.
//!
//! Each action is a single request. None of them touch the local asset
//! snapshot: the outcome becomes visible once the poller observes it.

use api_client::{
    ActionFailure, ActionResponse, ApiClientError, Asset, DamBackend, RegenerateStylesRequest,
    ThumbnailStatus,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_GENERATE_TIMEOUT: Duration = Duration::from_secs(30);

fn settle(asset_id: &str, action: &str, result: Result<ActionResponse, ApiClientError>) -> Result<(), ActionFailure> {
    match result {
        Ok(response) if response.success => {
            tracing::info!(asset = %asset_id, action, "thumbnail action accepted");
            Ok(())
        }
        Ok(response) => {
            let reason = response
                .error
                .or(response.message)
                .unwrap_or_else(|| "no reason given".to_string());
            tracing::warn!(asset = %asset_id, action, %reason, "thumbnail action rejected");
            Err(ActionFailure::Rejected(reason))
        }
        Err(e) => {
            tracing::error!(asset = %asset_id, action, error = %e, "thumbnail action failed");
            Err(e.into())
        }
    }
}

#[cfg_attr(feature = "trace-spans", tracing::instrument(skip(backend)))]
pub async fn retry_thumbnail(backend: Arc<dyn DamBackend>, asset_id: String) -> Result<(), ActionFailure> {
    let result = backend.retry_thumbnail(&asset_id).await;
    settle(&asset_id, "retry", result)
}

#[cfg_attr(feature = "trace-spans", tracing::instrument(skip(backend)))]
pub async fn generate_thumbnail(backend: Arc<dyn DamBackend>, asset_id: String) -> Result<(), ActionFailure> {
    let result = backend.generate_thumbnail(&asset_id).await;
    settle(&asset_id, "generate", result)
}

/// Rebuild the given styles of an asset. Admin only; an empty style list is
/// rejected locally.
#[cfg_attr(feature = "trace-spans", tracing::instrument(skip(backend)))]
pub async fn regenerate_styles(
    backend: Arc<dyn DamBackend>,
    asset_id: String,
    styles: Vec<String>,
    force_imagick: bool,
) -> Result<(), ActionFailure> {
    if styles.is_empty() {
        return Err(ActionFailure::Rejected("select at least one style".to_string()));
    }
    let request = RegenerateStylesRequest { styles, force_imagick };
    let result = backend.regenerate_styles(&asset_id, &request).await;
    settle(&asset_id, "regenerate-styles", result)
}

/// Keeps the retry and generate buttons disabled after a click until the
/// poller sees the status move, or until `timeout` passes without any movement.
#[derive(Debug, Clone)]
pub struct GenerateGuard {
    timeout: Duration,
    started: Option<(Instant, ThumbnailStatus)>,
}

impl Default for GenerateGuard {
    fn default() -> Self {
        Self::new(DEFAULT_GENERATE_TIMEOUT)
    }
}

impl GenerateGuard {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            started: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn begin(&mut self, asset: &Asset, now: Instant) {
        self.started = Some((now, asset.thumbnail_status));
    }

    /// Feed a fresh snapshot. Returns `true` when it released the guard.
    pub fn observe(&mut self, asset: &Asset) -> bool {
        match self.started {
            Some((_, baseline)) if baseline != asset.thumbnail_status => {
                self.started = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self, now: Instant) -> bool {
        self.started
            .map_or(false, |(at, _)| now.saturating_duration_since(at) < self.timeout)
    }

    /// Release the guard if the timeout has passed. Returns `true` if it did.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.started.is_some() && !self.is_pending(now) {
            tracing::warn!("no thumbnail status change observed after action, re-enabling");
            self.started = None;
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.started = None;
    }
}
