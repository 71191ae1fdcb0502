use glob::Pattern;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::platform::display_path;

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("cannot read directory {}: {source}", display_path(.path))]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("traversal error at {}: {message}", display_path(.path))]
    Traverse { path: PathBuf, message: String },
}

impl WalkError {
    fn from_walkdir(root: &Path, err: walkdir::Error) -> Self {
        let path = err.path().unwrap_or(root).to_path_buf();
        WalkError::Traverse {
            path,
            message: err.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            WalkError::ReadDir { path, .. } | WalkError::Traverse { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Sidecar caption; consumed only through the sidecar index.
    Caption,
    /// Candidate asset.
    Asset,
    /// Excluded by extension or ignore pattern.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct WalkedFile {
    pub path: PathBuf,
    /// Lower-cased extension with its leading dot, empty when there is none.
    pub extension: String,
    pub kind: FileKind,
}

/// Files directly inside one directory, sorted by name.
#[derive(Debug, Clone)]
pub struct DirBatch {
    pub dir: PathBuf,
    pub files: Vec<WalkedFile>,
}

impl DirBatch {
    pub fn captions(&self) -> impl Iterator<Item = &WalkedFile> {
        self.files.iter().filter(|f| f.kind == FileKind::Caption)
    }

    pub fn assets(&self) -> impl Iterator<Item = &WalkedFile> {
        self.files.iter().filter(|f| f.kind == FileKind::Asset)
    }
}

/// Folder and file skip policy.
#[derive(Debug, Clone)]
pub struct WalkRules {
    skip_folders: Vec<String>,
    skip_extensions: Vec<String>,
    caption_extension: String,
    ignore_patterns: Vec<Pattern>,
}

impl WalkRules {
    pub fn new(
        skip_folders: &[String],
        skip_extensions: &[String],
        caption_extension: &str,
        ignore_globs: &[String],
    ) -> Self {
        let ignore_patterns = ignore_globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();

        Self {
            skip_folders: skip_folders.to_vec(),
            skip_extensions: skip_extensions.iter().map(|e| normalize_extension(e)).collect(),
            caption_extension: normalize_extension(caption_extension),
            ignore_patterns,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.skip_folders,
            &config.skip_extensions,
            &config.caption_extension,
            &config.ignore_patterns,
        )
    }

    /// A directory is skipped when its own name or any ancestor's name is a
    /// skip folder, or when it matches an ignore pattern.
    pub fn is_skipped_dir(&self, dir: &Path) -> bool {
        let named = dir.components().any(|component| match component {
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                self.skip_folders.iter().any(|skip| *skip == name)
            }
            _ => false,
        });
        named || self.ignore_patterns.iter().any(|p| p.matches_path(dir))
    }

    pub fn classify(&self, path: &Path) -> WalkedFile {
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        let kind = if !extension.is_empty() && extension == self.caption_extension {
            FileKind::Caption
        } else if self.skip_extensions.contains(&extension)
            || self.ignore_patterns.iter().any(|p| p.matches_path(path))
        {
            FileKind::Skipped
        } else {
            FileKind::Asset
        };

        WalkedFile {
            path: path.to_path_buf(),
            extension,
            kind,
        }
    }

    /// Depth-first walk of `root`, one [`DirBatch`] per visited directory.
    pub fn walk<'a>(&'a self, root: &Path) -> DirWalk<'a> {
        DirWalk {
            root: root.to_path_buf(),
            inner: walkdir::WalkDir::new(root).sort_by_file_name().into_iter(),
            rules: self,
            skipped_dirs: Vec::new(),
        }
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Lazy depth-first directory walk. A directory that cannot be read yields
/// an error and its subtree is abandoned; the walk continues with siblings.
pub struct DirWalk<'a> {
    root: PathBuf,
    inner: walkdir::IntoIter,
    rules: &'a WalkRules,
    skipped_dirs: Vec<PathBuf>,
}

impl<'a> DirWalk<'a> {
    pub fn skipped_dirs(&self) -> &[PathBuf] {
        &self.skipped_dirs
    }

    fn read_batch(&mut self, dir: &Path) -> Result<DirBatch, WalkError> {
        let entries = fs::read_dir(dir).map_err(|source| WalkError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| WalkError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() {
                files.push(self.rules.classify(&path));
            }
        }
        files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));

        Ok(DirBatch {
            dir: dir.to_path_buf(),
            files,
        })
    }
}

impl<'a> Iterator for DirWalk<'a> {
    type Item = Result<DirBatch, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(WalkError::from_walkdir(&self.root, err))),
            };

            if !entry.file_type().is_dir() {
                continue;
            }

            let dir = entry.path().to_path_buf();
            if self.rules.is_skipped_dir(&dir) {
                info!("Skipping folder and its subfolders: {}", display_path(&dir));
                self.skipped_dirs.push(dir);
                self.inner.skip_current_dir();
                continue;
            }

            let batch = self.read_batch(&dir);
            if batch.is_err() {
                // walkdir would report the same unreadable directory again
                self.inner.skip_current_dir();
            }
            return Some(batch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn rules() -> WalkRules {
        WalkRules::from_config(&AppConfig::default())
    }

    #[test]
    fn test_classify_files() {
        let r = rules();
        assert_eq!(r.classify(Path::new("/d/a.TXT")).kind, FileKind::Caption);
        assert_eq!(r.classify(Path::new("/d/a.png")).kind, FileKind::Asset);
        assert_eq!(r.classify(Path::new("/d/a.png")).extension, ".png");
        assert_eq!(r.classify(Path::new("/d/meta.json")).kind, FileKind::Skipped);
        assert_eq!(r.classify(Path::new("/d/report.csv")).kind, FileKind::Skipped);
        assert_eq!(r.classify(Path::new("/d/README")).kind, FileKind::Asset);
        assert_eq!(r.classify(Path::new("/d/README")).extension, "");
    }

    #[test]
    fn test_skip_folder_and_ancestors() {
        let r = rules();
        assert!(r.is_skipped_dir(Path::new("/data/.bf")));
        assert!(r.is_skipped_dir(Path::new("/data/.bf/nested/deeper")));
        assert!(!r.is_skipped_dir(Path::new("/data/x.bf")));
        assert!(!r.is_skipped_dir(Path::new("/data/set")));
    }

    #[test]
    fn test_ignore_patterns() {
        let r = WalkRules::new(
            &[],
            &[".txt".to_string()],
            "txt",
            &["**/thumbs".to_string(), "*.tmp".to_string(), "[".to_string()],
        );
        assert!(r.is_skipped_dir(Path::new("/data/set/thumbs")));
        assert_eq!(r.classify(Path::new("/data/a.tmp")).kind, FileKind::Skipped);
        // caption extension normalized with a leading dot
        assert_eq!(r.classify(Path::new("/data/a.txt")).kind, FileKind::Caption);
    }

    #[test]
    fn test_walk_is_depth_first_and_skips() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("a/inner")).unwrap();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::create_dir_all(root.join(".bf/hidden")).unwrap();
        fs::write(root.join("top.png"), b"x").unwrap();
        fs::write(root.join("a/one.png"), b"x").unwrap();
        fs::write(root.join("a/one.txt"), b"tag").unwrap();
        fs::write(root.join("a/inner/two.jpg"), b"x").unwrap();
        fs::write(root.join("b/three.webp"), b"x").unwrap();
        fs::write(root.join(".bf/secret.png"), b"x").unwrap();
        fs::write(root.join(".bf/hidden/deep.png"), b"x").unwrap();

        let r = rules();
        let mut walk = r.walk(root);
        let mut dirs = Vec::new();
        let mut assets = 0;
        let mut captions = 0;
        for batch in walk.by_ref() {
            let batch = batch.unwrap();
            dirs.push(batch.dir.strip_prefix(root).unwrap().to_path_buf());
            assets += batch.assets().count();
            captions += batch.captions().count();
        }

        assert_eq!(
            dirs,
            vec![
                PathBuf::from(""),
                PathBuf::from("a"),
                PathBuf::from("a/inner"),
                PathBuf::from("b"),
            ]
        );
        assert_eq!(assets, 4);
        assert_eq!(captions, 1);
        assert_eq!(walk.skipped_dirs(), &[root.join(".bf")]);
    }

    #[test]
    fn test_missing_root_yields_error() {
        let tmp = tempdir().unwrap();
        let r = rules();
        let results: Vec<_> = r.walk(&tmp.path().join("missing")).collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdir_is_error_and_siblings_continue() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let root = tmp.path();
        for dir in ["a", "b/inner", "c"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        fs::write(root.join("a/one.png"), b"x").unwrap();
        fs::write(root.join("b/inner/hidden.png"), b"x").unwrap();
        fs::write(root.join("c/three.png"), b"x").unwrap();

        let locked = root.join("b");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // permissions are not enforced for this user
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let r = rules();
        let results: Vec<_> = r.walk(root).collect();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let dirs: Vec<PathBuf> = results
            .iter()
            .filter_map(|res| res.as_ref().ok())
            .map(|batch| batch.dir.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            dirs,
            vec![PathBuf::from(""), PathBuf::from("a"), PathBuf::from("c")]
        );

        let errors: Vec<&WalkError> = results.iter().filter_map(|res| res.as_ref().err()).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), locked.as_path());
        assert!(matches!(errors[0], WalkError::ReadDir { .. }));

        // the error sits between its siblings
        assert!(results[2].is_err());
    }
}
