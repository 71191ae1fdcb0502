use std::path::Path;

/// Trait for reporting run progress.
///
/// CLI implements with indicatif spinners; tests use [`SilentReporter`].
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self, _root: &Path) {}
    fn on_directory(&self, _dir: &Path, _assets_so_far: usize) {}
    fn on_scan_complete(&self, _total_assets: usize, _duration_secs: f64) {}
    fn on_save_start(&self, _target: &Path) {}
    fn on_save_complete(&self, _saved: Option<&Path>) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
