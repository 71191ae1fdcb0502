use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

use super::{is_lock_error, Artifact};
use crate::config::SaveConfig;
use crate::platform::display_path;
use crate::record::ArtifactPath;

/// Save protocol states. `Saved` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveState {
    Attempting { attempt: u32 },
    FallingBack { attempts: u32 },
    Saved { path: PathBuf, attempts: u32, fallback: bool },
    Failed { attempts: u32 },
}

/// Terminal result of [`DurableSaver::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { path: PathBuf, attempts: u32 },
    SavedToFallback { path: PathBuf, attempts: u32 },
    Failed { attempts: u32 },
}

impl SaveOutcome {
    pub fn saved_path(&self) -> Option<&Path> {
        match self {
            SaveOutcome::Saved { path, .. } | SaveOutcome::SavedToFallback { path, .. } => {
                Some(path)
            }
            SaveOutcome::Failed { .. } => None,
        }
    }

    pub fn artifact_path(&self) -> ArtifactPath {
        match self.saved_path() {
            Some(path) => ArtifactPath::Saved(path.to_path_buf()),
            None => ArtifactPath::NotProduced,
        }
    }

    /// Primary-location write attempts made.
    pub fn attempts(&self) -> u32 {
        match self {
            SaveOutcome::Saved { attempts, .. }
            | SaveOutcome::SavedToFallback { attempts, .. }
            | SaveOutcome::Failed { attempts } => *attempts,
        }
    }

    pub fn used_fallback(&self) -> bool {
        !matches!(self, SaveOutcome::Saved { .. })
    }
}

/// Writes an artifact to its primary location, retrying a bounded number of
/// times while the target is locked, then falls back to a secondary
/// location. Blocks the calling thread for the retry delay between attempts.
#[derive(Debug, Clone)]
pub struct DurableSaver {
    max_attempts: u32,
    retry_delay: Duration,
}

impl DurableSaver {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    pub fn from_config(config: &SaveConfig) -> Self {
        Self::new(config.max_attempts, config.retry_delay())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn save<A>(&self, artifact: &A, primary: &Path, fallback: &Path) -> SaveOutcome
    where
        A: Artifact + ?Sized,
    {
        let mut state = SaveState::Attempting { attempt: 1 };
        loop {
            state = match state {
                SaveState::Saved {
                    path,
                    attempts,
                    fallback: false,
                } => return SaveOutcome::Saved { path, attempts },
                SaveState::Saved { path, attempts, .. } => {
                    return SaveOutcome::SavedToFallback { path, attempts }
                }
                SaveState::Failed { attempts } => return SaveOutcome::Failed { attempts },
                other => self.step(other, artifact, primary, fallback),
            };
        }
    }

    fn step<A>(&self, state: SaveState, artifact: &A, primary: &Path, fallback: &Path) -> SaveState
    where
        A: Artifact + ?Sized,
    {
        match state {
            SaveState::Attempting { attempt } => match artifact.write_to(primary) {
                Ok(()) => {
                    info!(
                        "Saved {} (attempt {}/{})",
                        display_path(primary),
                        attempt,
                        self.max_attempts
                    );
                    SaveState::Saved {
                        path: primary.to_path_buf(),
                        attempts: attempt,
                        fallback: false,
                    }
                }
                Err(err) if is_lock_error(&err) && attempt < self.max_attempts => {
                    warn!(
                        "Cannot write {}: {}. Is it open in another program? Retrying in {:?} (attempt {}/{})",
                        display_path(primary),
                        err,
                        self.retry_delay,
                        attempt,
                        self.max_attempts
                    );
                    thread::sleep(self.retry_delay);
                    SaveState::Attempting {
                        attempt: attempt + 1,
                    }
                }
                Err(err) if is_lock_error(&err) => {
                    error!(
                        critical = true,
                        "Still cannot write {} after {} attempts: {}. Trying fallback location",
                        display_path(primary),
                        attempt,
                        err
                    );
                    SaveState::FallingBack { attempts: attempt }
                }
                Err(err) => {
                    error!(
                        "Failed to write {}: {} (attempt {}/{}). Trying fallback location",
                        display_path(primary),
                        err,
                        attempt,
                        self.max_attempts
                    );
                    SaveState::FallingBack { attempts: attempt }
                }
            },
            SaveState::FallingBack { attempts } => {
                if let Some(parent) = fallback.parent() {
                    if let Err(err) = fs::create_dir_all(parent) {
                        warn!("Cannot create fallback directory {}: {}", display_path(parent), err);
                    }
                }
                match artifact.write_to(fallback) {
                    Ok(()) => {
                        warn!("Saved to fallback location {}", display_path(fallback));
                        SaveState::Saved {
                            path: fallback.to_path_buf(),
                            attempts,
                            fallback: true,
                        }
                    }
                    Err(err) => {
                        error!(
                            critical = true,
                            "Fallback write to {} failed as well: {}. No artifact was produced",
                            display_path(fallback),
                            err
                        );
                        SaveState::Failed { attempts }
                    }
                }
            }
            terminal => terminal,
        }
    }
}
