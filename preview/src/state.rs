//! Mapping from an asset snapshot to what its thumbnail can show.

use api_client::{Asset, Permissions, ThumbnailStatus};

/// Cosmetic retries a single preview may offer.
pub const MAX_UI_RETRIES: u32 = 2;
/// Retries the backend accepts before answering 429.
pub const MAX_SERVER_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThumbnailState {
    Pending,
    Available,
    Failed,
    Skipped,
    Unavailable,
}

impl ThumbnailState {
    /// Whether polling can stop. A failure is only final once no retry is left.
    pub fn is_terminal(&self, retry_available: bool) -> bool {
        match self {
            ThumbnailState::Pending => false,
            ThumbnailState::Failed => !retry_available,
            ThumbnailState::Available | ThumbnailState::Skipped | ThumbnailState::Unavailable => true,
        }
    }
}

impl std::fmt::Display for ThumbnailState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ThumbnailState::Pending => "pending",
            ThumbnailState::Available => "available",
            ThumbnailState::Failed => "failed",
            ThumbnailState::Skipped => "skipped",
            ThumbnailState::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedThumbnail {
    pub state: ThumbnailState,
    /// Only set when `state` is `Available`.
    pub thumbnail_url: Option<String>,
    pub error_message: Option<String>,
    pub retry_available: bool,
}

impl ResolvedThumbnail {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal(self.retry_available)
    }
}

fn non_empty(url: &Option<String>) -> Option<String> {
    url.as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

/// Resolve the display state of an asset's thumbnail.
///
/// Pure in `(asset, ui_retry_count)`. A URL is only trusted next to a
/// `completed` status; `completed` without a URL is still `Pending`.
pub fn resolve(asset: &Asset, ui_retry_count: u32) -> ResolvedThumbnail {
    let url = non_empty(&asset.thumbnail_url);
    let (state, thumbnail_url) = match (asset.thumbnail_status, url) {
        (ThumbnailStatus::Pending | ThumbnailStatus::Processing, _) => (ThumbnailState::Pending, None),
        (ThumbnailStatus::Completed, Some(url)) => (ThumbnailState::Available, Some(url)),
        (ThumbnailStatus::Completed, None) => (ThumbnailState::Pending, None),
        (ThumbnailStatus::Failed, _) => (ThumbnailState::Failed, None),
        (ThumbnailStatus::Skipped, _) => (ThumbnailState::Skipped, None),
        (ThumbnailStatus::Unknown, _) => (ThumbnailState::Unavailable, None),
    };
    let error_message = match state {
        ThumbnailState::Failed => asset
            .thumbnail_error
            .clone()
            .or_else(|| Some("Thumbnail generation failed".to_string())),
        _ => None,
    };
    ResolvedThumbnail {
        state,
        thumbnail_url,
        error_message,
        retry_available: can_retry(asset, ui_retry_count),
    }
}

/// Retry is offered for failed thumbnails of supported types while both the
/// cosmetic and the server-side counters have room.
pub fn can_retry(asset: &Asset, ui_retry_count: u32) -> bool {
    asset.thumbnail_status == ThumbnailStatus::Failed
        && asset.supports_thumbnail()
        && ui_retry_count < MAX_UI_RETRIES
        && asset.thumbnail_retry_count < MAX_SERVER_RETRIES
}

/// Skipped assets whose type is supported now (e.g. PDFs uploaded before PDF
/// thumbnails existed) can be sent back through generation.
pub fn can_generate(asset: &Asset) -> bool {
    asset.thumbnail_status == ThumbnailStatus::Skipped && asset.supports_thumbnail()
}

/// Which manual thumbnail buttons a drawer shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Affordances {
    pub show_retry: bool,
    pub show_generate: bool,
}

/// `action_in_flight` hides both buttons between a click and the first
/// observed status change.
pub fn affordances(
    asset: &Asset,
    ui_retry_count: u32,
    permissions: Permissions,
    action_in_flight: bool,
) -> Affordances {
    if !permissions.can_edit || action_in_flight {
        return Affordances::default();
    }
    Affordances {
        show_retry: can_retry(asset, ui_retry_count),
        show_generate: can_generate(asset),
    }
}
