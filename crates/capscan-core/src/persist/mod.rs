//! Durable artifact writes: atomic file replacement plus the bounded-retry
//! and fallback save protocol.

mod durable;

pub use durable::{DurableSaver, SaveOutcome, SaveState};

use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::platform;

/// Something that can be persisted as a single file.
pub trait Artifact {
    fn write_into(&self, out: &mut dyn Write) -> io::Result<()>;

    /// Write the whole artifact to `path`. The target is replaced only once
    /// the content is complete.
    fn write_to(&self, path: &Path) -> io::Result<()> {
        write_atomically(path, |out| self.write_into(out))
    }
}

/// Write through a temporary file in the target's directory, then move it
/// over `path`.
pub fn write_atomically<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        write(&mut out)?;
        out.flush()?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// True when a write failed because the target is held open or otherwise
/// denied to us. These failures are retried; everything else is not.
pub fn is_lock_error(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::PermissionDenied {
        return true;
    }
    err.raw_os_error()
        .map(platform::is_sharing_violation)
        .unwrap_or(false)
}
