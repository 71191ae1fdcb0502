use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use capscan_core::platform::display_path;
use capscan_core::scanner::validate_root;
use tracing::{info, warn};

/// Typed at the interactive prompt to scan the batch file instead.
pub const BATCH_CHOICE: &str = "0";

pub const DEFAULT_BATCH_FILE: &str = "batchPath.txt";

/// Non-empty, non-comment lines of a batch list with their 1-based line
/// numbers. Surrounding quotes are stripped.
pub fn parse_batch_list(text: &str) -> Vec<(usize, PathBuf)> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let entry = line.trim().trim_matches('"').trim();
            if entry.is_empty() || entry.starts_with('#') {
                None
            } else {
                Some((idx + 1, PathBuf::from(entry)))
            }
        })
        .collect()
}

/// Valid folders listed in `batch_file`. Invalid entries are warned about
/// and skipped.
pub fn read_batch_file(batch_file: &Path) -> io::Result<Vec<PathBuf>> {
    let text = fs::read_to_string(batch_file)?;
    let mut roots = Vec::new();
    for (line, candidate) in parse_batch_list(&text) {
        match validate_root(&candidate) {
            Ok(root) => roots.push(root),
            Err(e) => warn!(
                "Invalid path in {} on line {}: {}. Skipping",
                display_path(batch_file),
                line,
                e
            ),
        }
    }
    info!(
        "{} valid folders read from {}",
        roots.len(),
        display_path(batch_file)
    );
    Ok(roots)
}

/// Keep the candidates that are readable directories.
pub fn valid_roots<I>(candidates: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    candidates
        .into_iter()
        .filter_map(|candidate| match validate_root(&candidate) {
            Ok(root) => Some(root),
            Err(e) => {
                warn!("Skipping {}: {}", display_path(&candidate), e);
                None
            }
        })
        .collect()
}

pub fn prompt_line(prompt: &str) -> io::Result<String> {
    let mut input = String::new();
    print!("{}: ", prompt);
    io::stdout().flush()?;
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().trim_matches('"').trim().to_string())
}
