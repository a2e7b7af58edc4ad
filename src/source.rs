use crate::error::SourceError;
use std::fs;
use std::path::{Path, PathBuf};

/// The playlist's file list, scanned once and fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipSource {
    paths: Vec<PathBuf>,
}

impl ClipSource {
    /// List `dir` and sort by name; directory order differs between platforms.
    /// Hidden entries (`.DS_Store` and friends) and sub-directories are skipped.
    pub fn scan(dir: impl AsRef<Path>) -> Result<Self, SourceError> {
        let dir = dir.as_ref();
        let io_err = |source| SourceError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let hidden = entry
                .file_name()
                .to_str()
                .map(|n| n.starts_with('.'))
                .unwrap_or(false);
            if hidden {
                continue;
            }
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if is_file {
                paths.push(entry.path());
            }
        }

        if paths.is_empty() {
            return Err(SourceError::Empty(dir.to_path_buf()));
        }
        tracing::info!(dir = %dir.display(), count = paths.len(), "scanned clip directory");
        Ok(Self::from_paths(paths))
    }

    pub fn from_paths(mut paths: Vec<PathBuf>) -> Self {
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));
        Self { paths }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn path(&self, index: usize) -> Option<&Path> {
        self.paths.get(index).map(PathBuf::as_path)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}
