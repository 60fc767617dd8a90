//! Per-asset lookups the drawer makes once per asset change.

use crate::TaskError;
use api_client::{ActivityEvent, AssetMetrics, DamBackend};
use std::sync::Arc;

/// Loading state of one remote value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loadable<T> {
    Idle,
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Loadable::Idle
    }
}

impl<T> Loadable<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Loadable::Loaded(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Loadable::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Loadable<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Loadable::Loaded(v),
            Err(e) => Loadable::Failed(e.to_string()),
        }
    }
}

pub type MetricsState = Loadable<AssetMetrics>;

/// A [`Loadable`] tied to the asset it was requested for.
///
/// Responses for an asset that is no longer shown are dropped.
#[derive(Debug, Clone)]
pub struct PerAsset<T> {
    asset_id: Option<String>,
    state: Loadable<T>,
}

impl<T> Default for PerAsset<T> {
    fn default() -> Self {
        Self {
            asset_id: None,
            state: Loadable::Idle,
        }
    }
}

impl<T> PerAsset<T> {
    pub fn asset_id(&self) -> Option<&str> {
        self.asset_id.as_deref()
    }

    /// Switch to `asset_id`. Returns `true` when a fetch should be issued,
    /// i.e. the asset actually changed.
    pub fn begin(&mut self, asset_id: &str) -> bool {
        if self.asset_id.as_deref() == Some(asset_id) {
            return false;
        }
        self.asset_id = Some(asset_id.to_string());
        self.state = Loadable::Loading;
        true
    }

    pub fn finish<E: std::fmt::Display>(&mut self, asset_id: &str, result: Result<T, E>) -> bool {
        if self.asset_id.as_deref() != Some(asset_id) {
            tracing::debug!(asset = %asset_id, "dropping stale response");
            return false;
        }
        self.state = result.into();
        true
    }

    pub fn reset(&mut self) {
        self.asset_id = None;
        self.state = Loadable::Idle;
    }

    pub fn state(&self) -> &Loadable<T> {
        &self.state
    }
}

#[cfg_attr(feature = "trace-spans", tracing::instrument(skip(backend)))]
pub async fn fetch_metrics(backend: Arc<dyn DamBackend>, asset_id: String) -> Result<AssetMetrics, TaskError> {
    backend.asset_metrics(&asset_id).await.map_err(|e| {
        tracing::warn!(asset = %asset_id, error = %e, "failed to load asset metrics");
        e.into()
    })
}

#[cfg_attr(feature = "trace-spans", tracing::instrument(skip(backend)))]
pub async fn fetch_activity(backend: Arc<dyn DamBackend>, asset_id: String) -> Result<Vec<ActivityEvent>, TaskError> {
    let mut events = backend.asset_activity(&asset_id).await.map_err(|e| {
        tracing::warn!(asset = %asset_id, error = %e, "failed to load asset activity");
        TaskError::from(e)
    })?;
    events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(events)
}
