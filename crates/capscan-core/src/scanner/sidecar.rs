use ahash::AHashMap;
use std::path::{Path, PathBuf};

/// Per-directory map from lower-cased caption stem to caption path.
#[derive(Debug, Default)]
pub struct SidecarIndex {
    by_stem: AHashMap<String, PathBuf>,
    collisions: Vec<(PathBuf, PathBuf)>,
}

impl SidecarIndex {
    /// Index captions in the order given. Two captions whose stems differ
    /// only by case collide; the later one wins and the pair is recorded.
    pub fn build<'a, I>(captions: I) -> Self
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut index = Self::default();
        for caption in captions {
            let Some(key) = stem_key(caption) else {
                continue;
            };
            if let Some(replaced) = index.by_stem.insert(key, caption.to_path_buf()) {
                index.collisions.push((replaced, caption.to_path_buf()));
            }
        }
        index
    }

    pub fn lookup(&self, asset: &Path) -> Option<&Path> {
        stem_key(asset).and_then(|key| self.by_stem.get(&key).map(PathBuf::as_path))
    }

    /// `(replaced, winner)` pairs for case-folded stem collisions.
    pub fn collisions(&self) -> &[(PathBuf, PathBuf)] {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.by_stem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_stem.is_empty()
    }
}

fn stem_key(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_lowercase())
}
