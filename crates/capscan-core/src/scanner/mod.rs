mod caption;
mod sidecar;
mod walk;

pub use caption::read_caption_line;
pub use sidecar::SidecarIndex;
pub use walk::{DirBatch, DirWalk, FileKind, WalkError, WalkRules, WalkedFile};

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::Error;
use crate::platform::display_path;
use crate::progress::ProgressReporter;
use crate::record::{FileLink, MatchStatus, ScanRecord};
use crate::tags::{CaptionNormalizer, CategoryClassifier, TagFrequency, NO_CATEGORY};

/// Check that `path` is an existing, readable directory and return it as an
/// absolute path.
pub fn validate_root(path: &Path) -> Result<PathBuf, Error> {
    if !path.exists() {
        return Err(Error::Other(format!("path '{}' does not exist", display_path(path))));
    }
    if !path.is_dir() {
        return Err(Error::Other(format!("path '{}' is not a directory", display_path(path))));
    }
    fs::read_dir(path).map_err(|e| {
        Error::Io(io::Error::new(
            e.kind(),
            format!("cannot read directory '{}': {}", display_path(path), e),
        ))
    })?;

    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionStatus {
    Processed,
    Skipped,
}

/// Every extension seen during a walk and whether its files were processed.
#[derive(Debug, Default, Clone)]
pub struct ExtensionOverview {
    seen: BTreeMap<String, ExtensionStatus>,
}

impl ExtensionOverview {
    fn note(&mut self, file: &WalkedFile) {
        let status = match file.kind {
            FileKind::Asset => ExtensionStatus::Processed,
            FileKind::Caption | FileKind::Skipped => ExtensionStatus::Skipped,
        };
        self.seen.entry(file.extension.clone()).or_insert(status);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ExtensionStatus)> {
        self.seen.iter().map(|(ext, status)| (ext.as_str(), *status))
    }

    pub fn log(&self) {
        if self.seen.is_empty() {
            info!("No file extensions seen");
            return;
        }
        for (ext, status) in self.iter() {
            let ext = if ext.is_empty() { "<none>" } else { ext };
            info!("Extension '{}': {:?}", ext, status);
        }
    }
}

/// Everything one folder scan produced.
#[derive(Debug)]
pub struct FolderScan {
    pub root: PathBuf,
    pub records: Vec<ScanRecord>,
    pub tags: TagFrequency,
    pub extensions: ExtensionOverview,
    pub walk_errors: Vec<WalkError>,
    pub skipped_dirs: Vec<PathBuf>,
}

impl FolderScan {
    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn matched(&self) -> usize {
        self.count(MatchStatus::Matched)
    }

    /// Assets without a usable caption: unmatched plus read errors.
    pub fn unmatched(&self) -> usize {
        self.total() - self.matched()
    }

    pub fn read_errors(&self) -> usize {
        self.count(MatchStatus::ReadError)
    }

    fn count(&self, status: MatchStatus) -> usize {
        self.records.iter().filter(|r| r.match_status == status).count()
    }
}

/// Walks one root, pairs assets with sidecar captions and cleans,
/// classifies and counts their tags.
pub struct FolderScanner {
    rules: WalkRules,
    normalizer: CaptionNormalizer,
    classifier: CategoryClassifier,
}

impl FolderScanner {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            rules: WalkRules::from_config(config),
            normalizer: CaptionNormalizer::new(&config.tags),
            classifier: CategoryClassifier::new(&config.tags.categories),
        }
    }

    pub fn scan(&self, root: &Path, reporter: &dyn ProgressReporter) -> FolderScan {
        info!("Scanning folder: {}", display_path(root));
        reporter.on_scan_start(root);
        let start = Instant::now();

        let mut scan = FolderScan {
            root: root.to_path_buf(),
            records: Vec::new(),
            tags: TagFrequency::new(),
            extensions: ExtensionOverview::default(),
            walk_errors: Vec::new(),
            skipped_dirs: Vec::new(),
        };

        let mut walk = self.rules.walk(root);
        for batch in walk.by_ref() {
            let batch = match batch {
                Ok(batch) => batch,
                Err(err) => {
                    warn!("{}", err);
                    scan.walk_errors.push(err);
                    continue;
                }
            };
            self.scan_batch(&batch, &mut scan);
            reporter.on_directory(&batch.dir, scan.records.len());
        }
        scan.skipped_dirs = walk.skipped_dirs().to_vec();

        let duration = start.elapsed().as_secs_f64();
        reporter.on_scan_complete(scan.total(), duration);
        info!(
            "Folder {} scanned in {:.2}s. Total files: {}, matched: {}, unmatched: {}, read errors: {}",
            display_path(root),
            duration,
            scan.total(),
            scan.matched(),
            scan.unmatched(),
            scan.read_errors(),
        );
        scan.extensions.log();

        scan
    }

    fn scan_batch(&self, batch: &DirBatch, scan: &mut FolderScan) {
        let sidecars = SidecarIndex::build(batch.captions().map(|f| f.path.as_path()));
        for (replaced, winner) in sidecars.collisions() {
            warn!(
                "Caption files {} and {} differ only by case; using {}",
                display_path(replaced),
                display_path(winner),
                display_path(winner),
            );
        }

        for file in &batch.files {
            scan.extensions.note(file);
        }

        for asset in batch.assets() {
            let record = self.inspect_asset(&batch.dir, asset, &sidecars, &mut scan.tags);
            scan.records.push(record);
        }
    }

    fn inspect_asset(
        &self,
        dir: &Path,
        asset: &WalkedFile,
        sidecars: &SidecarIndex,
        tags: &mut TagFrequency,
    ) -> ScanRecord {
        let file_name = asset
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let link = FileLink::to_existing(&asset.path, file_name);
        if link.is_none() {
            info!("File vanished before it could be linked: {}", display_path(&asset.path));
        }

        let mut record = ScanRecord {
            folder_path: dir.to_path_buf(),
            file_path: asset.path.clone(),
            file_extension: asset.extension.clone(),
            link,
            caption_path: None,
            raw_caption: String::new(),
            cleaned_caption: String::new(),
            cleaned_caption_length: 0,
            category_labels: NO_CATEGORY.to_string(),
            match_status: MatchStatus::Unmatched,
            read_error: None,
        };

        let Some(caption_path) = sidecars.lookup(&asset.path) else {
            debug!("No caption for {}", display_path(&asset.path));
            return record;
        };
        record.caption_path = Some(caption_path.to_path_buf());

        match read_caption_line(caption_path) {
            Ok(line) => {
                let normalized = self.normalizer.normalize(&line);
                tags.extend(normalized.tokens());
                record.cleaned_caption_length = normalized.cleaned_len();
                record.category_labels = self.classifier.classify(&line);
                record.cleaned_caption = normalized.cleaned;
                record.raw_caption = line;
                record.match_status = MatchStatus::Matched;
            }
            Err(err) => {
                warn!("Failed to read caption {}: {}", display_path(caption_path), err);
                record.match_status = MatchStatus::ReadError;
                record.read_error = Some(err.to_string());
            }
        }

        record
    }
}
