//! Pure view logic for asset previews: thumbnail state resolution, the
//! preview renderer, drawer carousel navigation and metadata category diffs.
//!
//! Nothing in here performs I/O; the async side lives in `tasks`.

pub mod carousel;
pub mod categories;
pub mod render;
pub mod state;

pub use carousel::{Carousel, Direction};
pub use categories::{diff_categories, enabled_categories, CategoryDiff};
pub use render::{FileKind, PreviewFrame, PreviewRenderer};
pub use state::{
    affordances, can_generate, can_retry, resolve, Affordances, ResolvedThumbnail, ThumbnailState,
    MAX_SERVER_RETRIES, MAX_UI_RETRIES,
};
