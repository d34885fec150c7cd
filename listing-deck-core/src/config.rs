use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Edge length, in design units, of the square page every listing image fills.
pub const CANVAS_SIZE: u32 = 1080;

/// Literal prefix of the synthetic names given to extracted files.
pub const DEFAULT_NAME_PREFIX: &str = "exported";

pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(300);

/// Where each composed image sits on its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub top: i32,
    pub left: i32,
    pub width: u32,
    pub height: u32,
}

impl Default for Layout {
    /// Full-bleed square at the canonical canvas size.
    fn default() -> Self {
        Self {
            top: 0,
            left: 0,
            width: CANVAS_SIZE,
            height: CANVAS_SIZE,
        }
    }
}

/// Format tags the export request may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Png,
    Jpg,
    Gif,
    Svg,
    Video,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Png => "png",
            FileType::Jpg => "jpg",
            FileType::Gif => "gif",
            FileType::Svg => "svg",
            FileType::Video => "video",
        }
    }

    /// Still-image, vector and video formats.
    pub fn default_allow_list() -> Vec<FileType> {
        vec![
            FileType::Png,
            FileType::Jpg,
            FileType::Gif,
            FileType::Svg,
            FileType::Video,
        ]
    }
}

/// Settings for the export → extraction half of the pipeline.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub accepted_file_types: Vec<FileType>,
    /// Upper bound on the wait for a terminal export outcome.
    pub timeout: Duration,
    pub name_prefix: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            accepted_file_types: FileType::default_allow_list(),
            timeout: DEFAULT_EXPORT_TIMEOUT,
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
        }
    }
}

impl ExportSettings {
    pub fn trace_loaded(&self) {
        info!(
            accepted = ?self.accepted_file_types,
            timeout_secs = self.timeout.as_secs(),
            name_prefix = %self.name_prefix,
            "Loaded export settings"
        );
        debug!(?self, "Export settings (full debug)");
    }
}
