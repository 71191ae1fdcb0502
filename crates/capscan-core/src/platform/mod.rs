#[cfg(target_os = "windows")]
pub mod windows;

use std::path::Path;

/// Uppercase a leading `x:` drive letter. Paths without one are returned as is.
pub fn uppercase_drive_letter(path_str: &str) -> String {
    let mut chars = path_str.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic() => {
            let mut out = String::with_capacity(path_str.len());
            out.push(letter.to_ascii_uppercase());
            out.push_str(&path_str[1..]);
            out
        }
        _ => path_str.to_string(),
    }
}

/// Path as shown in logs and reports.
#[cfg(target_os = "windows")]
pub fn display_path(path: &Path) -> String {
    uppercase_drive_letter(&path.to_string_lossy())
}

#[cfg(not(target_os = "windows"))]
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Target for a clickable link cell pointing at `path`.
#[cfg(target_os = "windows")]
pub fn link_target(path: &Path) -> String {
    display_path(path).replace('\\', "/")
}

#[cfg(not(target_os = "windows"))]
pub fn link_target(path: &Path) -> String {
    format!("file://{}", display_path(path))
}

/// True when the OS error code means the file is held open by another process.
#[cfg(target_os = "windows")]
pub fn is_sharing_violation(code: i32) -> bool {
    windows::is_sharing_violation(code)
}

#[cfg(not(target_os = "windows"))]
pub fn is_sharing_violation(_code: i32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uppercase_drive_letter() {
        assert_eq!(uppercase_drive_letter("c:\\data\\a.png"), "C:\\data\\a.png");
        assert_eq!(uppercase_drive_letter("D:/x"), "D:/x");
        assert_eq!(uppercase_drive_letter("/home/user"), "/home/user");
        assert_eq!(uppercase_drive_letter("1:odd"), "1:odd");
        assert_eq!(uppercase_drive_letter(""), "");
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_link_target_has_uri_prefix() {
        assert_eq!(
            link_target(Path::new("/data/set/cat.png")),
            "file:///data/set/cat.png"
        );
    }
}
