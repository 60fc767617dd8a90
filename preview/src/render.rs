//! Decides what a thumbnail preview draws for the current snapshot.

use crate::state::{resolve, ResolvedThumbnail, ThumbnailState, MAX_UI_RETRIES};
use api_client::{Asset, AssetVersion};

/// Broad file family, used to pick a placeholder icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Image,
    Pdf,
    Video,
    Audio,
    Document,
    Spreadsheet,
    Presentation,
    Archive,
    Other,
}

impl FileKind {
    pub fn from_asset(asset: &Asset) -> Self {
        if asset.is_pdf() {
            return FileKind::Pdf;
        }
        let mime = asset.mime_type.as_str();
        if mime.starts_with("image/") {
            return FileKind::Image;
        }
        if mime.starts_with("video/") {
            return FileKind::Video;
        }
        if mime.starts_with("audio/") {
            return FileKind::Audio;
        }
        match asset.extension().as_deref() {
            Some("doc" | "docx" | "odt" | "rtf" | "txt" | "md") => FileKind::Document,
            Some("xls" | "xlsx" | "ods" | "csv") => FileKind::Spreadsheet,
            Some("ppt" | "pptx" | "odp" | "key") => FileKind::Presentation,
            Some("zip" | "rar" | "7z" | "tar" | "gz") => FileKind::Archive,
            _ if mime.starts_with("text/") => FileKind::Document,
            _ => FileKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewFrame {
    Placeholder(FileKind),
    InProgress,
    /// Low-resolution image shown blurred until `high_res` has loaded.
    Blurred { low_res: String, high_res: String },
    Image { url: String, fade_in: bool },
    Retry { error_message: Option<String> },
}

/// Per-preview state carried across renders.
///
/// Lives exactly as long as the preview it belongs to; dropping it resets
/// the cosmetic retry counter.
#[derive(Debug, Default)]
pub struct PreviewRenderer {
    snapshot: Option<Asset>,
    version: Option<AssetVersion>,
    resolved: Option<ResolvedThumbnail>,
    fade_in: bool,
    high_res_loaded: bool,
    ui_retry_count: u32,
}

impl PreviewRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a snapshot. Returns `false` when its version signal is unchanged.
    pub fn observe(&mut self, asset: &Asset) -> bool {
        let version = asset.version();
        if self.version.as_ref() == Some(&version) {
            return false;
        }

        let resolved = resolve(asset, self.ui_retry_count);
        let previous = self.resolved.as_ref().map(|r| r.state);
        self.fade_in = matches!(previous, Some(prev) if prev != ThumbnailState::Available)
            && resolved.state == ThumbnailState::Available;

        let large_changed = self.version.as_ref().map(|v| &v.url_large) != Some(&version.url_large);
        if large_changed {
            self.high_res_loaded = false;
        }

        tracing::trace!(asset = %asset.id, state = %resolved.state, fade_in = self.fade_in, "preview observed snapshot");
        self.snapshot = Some(asset.clone());
        self.version = Some(version);
        self.resolved = Some(resolved);
        true
    }

    pub fn frame(&self) -> PreviewFrame {
        let (asset, resolved) = match (&self.snapshot, &self.resolved) {
            (Some(a), Some(r)) => (a, r),
            _ => return PreviewFrame::Placeholder(FileKind::Other),
        };

        match resolved.state {
            ThumbnailState::Pending => PreviewFrame::InProgress,
            ThumbnailState::Available => {
                let url = resolved.thumbnail_url.clone().unwrap_or_default();
                match self.large_url() {
                    Some(large) if !self.high_res_loaded => PreviewFrame::Blurred {
                        low_res: url,
                        high_res: large,
                    },
                    Some(large) => PreviewFrame::Image {
                        url: large,
                        fade_in: self.fade_in,
                    },
                    None => PreviewFrame::Image {
                        url,
                        fade_in: self.fade_in,
                    },
                }
            }
            ThumbnailState::Failed if resolved.retry_available => PreviewFrame::Retry {
                error_message: resolved.error_message.clone(),
            },
            ThumbnailState::Failed | ThumbnailState::Skipped | ThumbnailState::Unavailable => {
                PreviewFrame::Placeholder(FileKind::from_asset(asset))
            }
        }
    }

    fn large_url(&self) -> Option<String> {
        let resolved = self.resolved.as_ref()?;
        if resolved.state != ThumbnailState::Available {
            return None;
        }
        self.snapshot
            .as_ref()?
            .thumbnail_url_large
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty() && Some(*u) != resolved.thumbnail_url.as_deref())
            .map(str::to_string)
    }

    /// The high-resolution image finished loading. Ignored for stale URLs.
    pub fn mark_high_res_loaded(&mut self, url: &str) -> bool {
        if self.large_url().as_deref() == Some(url) {
            self.high_res_loaded = true;
            true
        } else {
            false
        }
    }

    /// Count a user-triggered retry. Returns `false` once the cap is reached.
    pub fn register_retry(&mut self) -> bool {
        if self.ui_retry_count >= MAX_UI_RETRIES {
            return false;
        }
        self.ui_retry_count += 1;
        if let Some(asset) = &self.snapshot {
            self.resolved = Some(resolve(asset, self.ui_retry_count));
        }
        true
    }

    pub fn ui_retry_count(&self) -> u32 {
        self.ui_retry_count
    }

    pub fn fade_in(&self) -> bool {
        self.fade_in
    }

    pub fn state(&self) -> Option<ThumbnailState> {
        self.resolved.as_ref().map(|r| r.state)
    }

    pub fn resolved(&self) -> Option<&ResolvedThumbnail> {
        self.resolved.as_ref()
    }

    pub fn snapshot(&self) -> Option<&Asset> {
        self.snapshot.as_ref()
    }
}
