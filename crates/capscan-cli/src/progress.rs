use capscan_core::platform::display_path;
use capscan_core::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif spinners.
///
/// - Scan phase: spinner updated per visited directory
/// - Save phase: spinner while the report is written (covers lock retries)
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_spinner(&self, message: String) {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(TICK_CHARS);
        pb.set_style(style);
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));

        let mut guard = self.slot();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.slot().take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, root: &Path) {
        self.start_spinner(format!("Scanning {}...", display_path(root)));
    }

    fn on_directory(&self, dir: &Path, assets_so_far: usize) {
        if let Some(pb) = self.slot().as_ref() {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            pb.set_message(format!("Scanning... {} files found ({})", assets_so_far, name));
        }
    }

    fn on_scan_complete(&self, total_assets: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Scan complete: {} files in {:.2}s",
            total_assets, duration_secs
        );
    }

    fn on_save_start(&self, target: &Path) {
        self.start_spinner(format!("Saving {}...", display_path(target)));
    }

    fn on_save_complete(&self, saved: Option<&Path>) {
        self.finish_bar();
        match saved {
            Some(path) => eprintln!("  \x1b[32m✓\x1b[0m Saved {}", display_path(path)),
            None => eprintln!("  \x1b[31m✗\x1b[0m Report could not be saved"),
        }
    }
}
