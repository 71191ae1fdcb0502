use chrono::{DateTime, Local};
use std::path::Path;

pub const LEDGER_FILE_NAME: &str = "operation_records.csv";

const MAX_PREFIX_LEN: usize = 30;

/// File-name prefix for a scanned folder: the folder's own name when it is
/// plain ASCII (letters, digits, `_`, `.`, `-`), otherwise the first 8 hex
/// characters of its blake3 digest.
pub fn folder_prefix(folder: &Path) -> String {
    let name = match folder.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => folder.to_string_lossy().into_owned(),
    };

    let is_safe = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-');

    if is_safe {
        name.chars().take(MAX_PREFIX_LEN).collect()
    } else {
        blake3::hash(name.as_bytes()).to_hex()[..8].to_string()
    }
}

/// Timestamp used inside artifact file names.
pub fn file_stamp(now: &DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// Timestamp written into the ledger.
pub fn ledger_stamp(now: &DateTime<Local>) -> String {
    now.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn report_file_name(prefix: &str, stamp: &str) -> String {
    format!("{}_scan_results_{}.xlsx", prefix, stamp)
}

pub fn run_log_file_name(prefix: &str, stamp: &str) -> String {
    format!("{}_scan_log_{}.txt", prefix, stamp)
}

pub fn fallback_file_name(file_name: &str) -> String {
    format!("FALLBACK_{}", file_name)
}

pub fn snapshot_file_name(stamp: &str) -> String {
    format!("scan_history_cached_{}.csv", stamp)
}

/// `stamp`, or `stamp_N` with the smallest N from 2 up, such that none of
/// the run's artifacts already exist: the report and run log in
/// `output_dir`, the fallback report in `fallback_dir`.
pub fn free_stamp(output_dir: &Path, fallback_dir: &Path, prefix: &str, stamp: &str) -> String {
    let taken = |candidate: &str| {
        let report = report_file_name(prefix, candidate);
        output_dir.join(&report).exists()
            || output_dir.join(run_log_file_name(prefix, candidate)).exists()
            || fallback_dir.join(fallback_file_name(&report)).exists()
    };

    if !taken(stamp) {
        return stamp.to_string();
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{}_{}", stamp, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_ascii_folder_name_is_kept() {
        assert_eq!(folder_prefix(Path::new("/data/set_a-v2.0")), "set_a-v2.0");
    }

    #[test]
    fn test_long_folder_name_is_truncated() {
        let long = "a".repeat(45);
        let prefix = folder_prefix(&Path::new("/data").join(&long));
        assert_eq!(prefix.len(), 30);
    }

    #[test]
    fn test_non_ascii_folder_name_is_hashed() {
        let prefix = folder_prefix(Path::new("/data/训练集 一"));
        assert_eq!(prefix.len(), 8);
        assert!(prefix.chars().all(|c| c.is_ascii_hexdigit()));
        // stable across calls
        assert_eq!(prefix, folder_prefix(Path::new("/other/训练集 一")));
    }

    #[test]
    fn test_folder_name_with_space_is_hashed() {
        let prefix = folder_prefix(Path::new("/data/my set"));
        assert_eq!(prefix.len(), 8);
    }

    #[test]
    fn test_stamps_and_names() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let stamp = file_stamp(&now);
        assert_eq!(stamp, "20240309_070501");
        assert_eq!(ledger_stamp(&now), "2024-03-09 07:05:01");
        assert_eq!(
            report_file_name("cats", &stamp),
            "cats_scan_results_20240309_070501.xlsx"
        );
        assert_eq!(
            fallback_file_name(&report_file_name("cats", &stamp)),
            "FALLBACK_cats_scan_results_20240309_070501.xlsx"
        );
        assert_eq!(run_log_file_name("cats", &stamp), "cats_scan_log_20240309_070501.txt");
        assert_eq!(snapshot_file_name(&stamp), "scan_history_cached_20240309_070501.csv");
    }

    #[test]
    fn test_free_stamp_skips_existing_artifacts() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let logs = dir.path().join("logs");
        fs::create_dir_all(&out).unwrap();
        fs::create_dir_all(&logs).unwrap();
        let stamp = "20240309_070501";

        assert_eq!(free_stamp(&out, &logs, "train", stamp), stamp);

        fs::write(out.join(report_file_name("train", stamp)), "").unwrap();
        assert_eq!(free_stamp(&out, &logs, "train", stamp), "20240309_070501_2");

        fs::write(out.join(run_log_file_name("train", "20240309_070501_2")), "").unwrap();
        fs::write(
            logs.join(fallback_file_name(&report_file_name("train", "20240309_070501_3"))),
            "",
        )
        .unwrap();
        assert_eq!(free_stamp(&out, &logs, "train", stamp), "20240309_070501_4");

        // other prefixes are unaffected
        assert_eq!(free_stamp(&out, &logs, "val", stamp), stamp);
    }
}
