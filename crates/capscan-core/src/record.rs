use std::fmt;
use std::path::{Path, PathBuf};

use crate::platform;

/// Written in place of a caption path when an asset has no sidecar.
pub const NOT_AVAILABLE: &str = "N/A";

/// Written in place of an artifact path when no artifact could be saved.
pub const SAVE_FAILED: &str = "N/A_SAVE_FAILED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStatus {
    Matched,
    Unmatched,
    ReadError,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Matched => "Matched",
            Self::Unmatched => "Unmatched",
            Self::ReadError => "ReadError",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clickable reference to a file that existed when the link was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLink {
    pub text: String,
    pub target: String,
}

impl FileLink {
    /// Link to `path` showing `text`, or `None` if the file is gone.
    pub fn to_existing(path: &Path, text: impl Into<String>) -> Option<Self> {
        if path.exists() {
            Some(Self {
                text: text.into(),
                target: platform::link_target(path),
            })
        } else {
            None
        }
    }
}

/// One scanned asset. Built once during the scan and never modified.
#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub folder_path: PathBuf,
    pub file_path: PathBuf,
    pub file_extension: String,
    /// `None` when the asset no longer existed at inspection time.
    pub link: Option<FileLink>,
    pub caption_path: Option<PathBuf>,
    pub raw_caption: String,
    pub cleaned_caption: String,
    pub cleaned_caption_length: usize,
    pub category_labels: String,
    pub match_status: MatchStatus,
    pub read_error: Option<String>,
}

impl ScanRecord {
    pub fn file_name(&self) -> String {
        self.file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Caption path as written to the report.
    pub fn caption_path_text(&self) -> String {
        match &self.caption_path {
            Some(path) => platform::display_path(path),
            None => NOT_AVAILABLE.to_string(),
        }
    }
}

/// Where a run artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactPath {
    Saved(PathBuf),
    NotProduced,
}

impl ArtifactPath {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Saved(path) => Some(path),
            Self::NotProduced => None,
        }
    }

    /// Parse a persisted path cell; the save-failure sentinel and empty
    /// cells both mean no artifact.
    pub fn from_cell(cell: &str) -> Self {
        let cell = cell.trim();
        if cell.is_empty() || cell == SAVE_FAILED || cell == NOT_AVAILABLE {
            Self::NotProduced
        } else {
            Self::Saved(PathBuf::from(cell))
        }
    }

    pub fn to_cell(&self) -> String {
        match self {
            Self::Saved(path) => platform::display_path(path),
            Self::NotProduced => SAVE_FAILED.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_path_cells() {
        assert_eq!(ArtifactPath::from_cell(SAVE_FAILED), ArtifactPath::NotProduced);
        assert_eq!(ArtifactPath::from_cell("  "), ArtifactPath::NotProduced);
        assert_eq!(
            ArtifactPath::from_cell("/tmp/a.csv"),
            ArtifactPath::Saved(PathBuf::from("/tmp/a.csv"))
        );
        assert_eq!(ArtifactPath::NotProduced.to_cell(), SAVE_FAILED);
        assert!(ArtifactPath::NotProduced.path().is_none());
    }

    #[test]
    fn test_link_only_for_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("cat.png");
        std::fs::write(&present, b"png").unwrap();

        let link = FileLink::to_existing(&present, "cat.png").unwrap();
        assert_eq!(link.text, "cat.png");
        assert!(link.target.ends_with("cat.png"));

        assert!(FileLink::to_existing(&dir.path().join("gone.png"), "gone.png").is_none());
    }
}
