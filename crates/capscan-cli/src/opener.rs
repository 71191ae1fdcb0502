use std::io;
use std::path::Path;
use std::process::Command;

use capscan_core::platform::display_path;
use tracing::{info, warn};

fn launch(path: &Path) -> io::Result<()> {
    #[cfg(windows)]
    let mut command = {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]).arg(path);
        c
    };
    #[cfg(target_os = "macos")]
    let mut command = {
        let mut c = Command::new("open");
        c.arg(path);
        c
    };
    #[cfg(not(any(windows, target_os = "macos")))]
    let mut command = {
        let mut c = Command::new("xdg-open");
        c.arg(path);
        c
    };
    command.spawn().map(|_| ())
}

/// Hand each existing file to the desktop viewer. Missing files are warned
/// about and skipped.
pub fn open_all(paths: &[&Path]) {
    for path in paths {
        if !path.exists() {
            warn!("Not opening missing file {}", display_path(path));
            continue;
        }
        match launch(path) {
            Ok(()) => info!("Opened {}", display_path(path)),
            Err(e) => warn!("Could not open {}: {}", display_path(path), e),
        }
    }
}
