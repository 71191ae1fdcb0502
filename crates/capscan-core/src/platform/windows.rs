use winapi::shared::winerror::{ERROR_LOCK_VIOLATION, ERROR_SHARING_VIOLATION};

pub fn is_sharing_violation(code: i32) -> bool {
    code == ERROR_SHARING_VIOLATION as i32 || code == ERROR_LOCK_VIOLATION as i32
}
