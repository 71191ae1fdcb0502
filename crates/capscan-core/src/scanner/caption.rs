use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// First non-empty line of a caption file, trimmed. Later lines are never
/// read. Invalid UTF-8 before that line is an `InvalidData` error.
pub fn read_caption_line(path: &Path) -> io::Result<String> {
    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim_start_matches('\u{feff}').trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_only_first_non_empty_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "\u{feff}\n  \n 1girl, solo \nsecond, line\n").unwrap();
        assert_eq!(read_caption_line(&path).unwrap(), "1girl, solo");
    }

    #[test]
    fn test_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "").unwrap();
        assert_eq!(read_caption_line(&path).unwrap(), "");
    }

    #[test]
    fn test_invalid_utf8_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x41, 0x0a]).unwrap();
        let err = read_caption_line(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempdir().unwrap();
        assert!(read_caption_line(&dir.path().join("nope.txt")).is_err());
    }
}
