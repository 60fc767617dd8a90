//! Wire types exchanged with the asset-management backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend-owned progress of thumbnail generation for an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl ThumbnailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbnailStatus::Pending => "pending",
            ThumbnailStatus::Processing => "processing",
            ThumbnailStatus::Completed => "completed",
            ThumbnailStatus::Failed => "failed",
            ThumbnailStatus::Skipped => "skipped",
            ThumbnailStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ThumbnailStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    #[serde(default)]
    pub file_extension: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    pub thumbnail_status: ThumbnailStatus,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url_large: Option<String>,
    #[serde(default)]
    pub thumbnail_error: Option<String>,
    /// Server-side retry counter.
    #[serde(default)]
    pub thumbnail_retry_count: u32,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot of everything a preview has to react to.
///
/// Two snapshots compare equal exactly when nothing visible about the
/// thumbnail changed, so consumers re-evaluate only on inequality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetVersion {
    pub id: String,
    pub status: ThumbnailStatus,
    pub url: Option<String>,
    pub url_large: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    /// Lowercased extension, taken from the explicit field or the filename.
    pub fn extension(&self) -> Option<String> {
        self.file_extension
            .as_deref()
            .filter(|e| !e.is_empty())
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .or_else(|| {
                std::path::Path::new(&self.filename)
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_ascii_lowercase())
            })
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == "application/pdf" || self.extension().as_deref() == Some("pdf")
    }

    /// Only images and PDFs get thumbnails.
    pub fn supports_thumbnail(&self) -> bool {
        self.is_image() || self.is_pdf()
    }

    pub fn version(&self) -> AssetVersion {
        AssetVersion {
            id: self.id.clone(),
            status: self.thumbnail_status,
            url: self.thumbnail_url.clone(),
            url_large: self.thumbnail_url_large.clone(),
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetPage {
    pub data: Vec<Asset>,
    pub current_page: u32,
    pub last_page: u32,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThumbnailSize {
    Thumb,
    Medium,
    Large,
}

impl ThumbnailSize {
    pub const ALL: [ThumbnailSize; 3] = [ThumbnailSize::Thumb, ThumbnailSize::Medium, ThumbnailSize::Large];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbnailSize::Thumb => "thumb",
            ThumbnailSize::Medium => "medium",
            ThumbnailSize::Large => "large",
        }
    }
}

impl std::str::FromStr for ThumbnailSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thumb" => Ok(ThumbnailSize::Thumb),
            "medium" => Ok(ThumbnailSize::Medium),
            "large" => Ok(ThumbnailSize::Large),
            other => Err(format!("unknown thumbnail size '{}'", other)),
        }
    }
}

impl std::fmt::Display for ThumbnailSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetrics {
    pub views: u64,
    pub downloads: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: u64,
    pub action: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Body returned by the thumbnail action endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerateStylesRequest {
    pub styles: Vec<String>,
    pub force_imagick: bool,
}

/// What the signed-in user may do with assets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub can_edit: bool,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    #[serde(default)]
    pub id: Option<u64>,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataField {
    pub id: u64,
    pub name: String,
    pub label: String,
    pub field_type: String,
    #[serde(default)]
    pub options: Vec<FieldOption>,
    #[serde(default)]
    pub is_ai_eligible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldVisibility {
    pub category_id: u64,
    pub is_primary: bool,
    pub is_required: bool,
}

/// Category suppression map of a metadata field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCategories {
    pub categories: Vec<Category>,
    #[serde(default)]
    pub suppressed: Vec<u64>,
    #[serde(default)]
    pub visibility: Vec<FieldVisibility>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Existing,
    New,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagSuggestion {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    #[serde(default)]
    pub score: Option<f32>,
}
