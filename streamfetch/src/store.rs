//! Scratch directory holding one file per segment.
//!
//! Layout:
//!
//! ```text
//! <save_path>/temp_<job>/
//!     segment_00000.ts
//!     segment_00001.ts
//!     ...
//!     file_list.txt        (concat list written by the reassembler)
//! ```
//!
//! Indices are zero-padded to five digits so lexicographic order matches
//! sequence order for typical playlists; [`SegmentStore::list_completed`]
//! still sorts numerically so longer playlists stay ordered.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StoreError;

/// File name prefix for segment files.
const SEGMENT_PREFIX: &str = "segment_";

/// Name of the concat list written next to the segments.
const CONCAT_LIST_NAME: &str = "file_list.txt";

/// Manages the scratch directory for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentStore {
    root: PathBuf,
    extension: String,
}

impl SegmentStore {
    /// Create a store rooted at `<save_path>/temp_<job_name>`.
    ///
    /// Nothing is touched on disk until [`reset`](Self::reset).
    pub fn new(save_path: &Path, job_name: &str, extension: impl Into<String>) -> Self {
        Self::at(save_path.join(format!("temp_{}", job_name)), extension)
    }

    /// Create a store rooted at an explicit directory.
    pub fn at(root: PathBuf, extension: impl Into<String>) -> Self {
        Self {
            root,
            extension: extension.into(),
        }
    }

    /// Root directory of the scratch area.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Segment file extension (without the dot).
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Whether the scratch directory currently exists.
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Remove the scratch directory if present, then recreate it empty.
    ///
    /// Runs once per job start so segments from an aborted earlier run can
    /// never leak into a later merge.
    pub fn reset(&self) -> Result<(), StoreError> {
        let reset_err = |source| StoreError::Reset {
            path: self.root.clone(),
            source,
        };

        match fs::remove_dir_all(&self.root) {
            Ok(()) => debug!(path = %self.root.display(), "Removed stale scratch directory"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(reset_err(e)),
        }

        fs::create_dir_all(&self.root).map_err(reset_err)
    }

    /// Path of the file for segment `index`.
    pub fn segment_path(&self, index: usize) -> PathBuf {
        self.root
            .join(format!("{}{:05}.{}", SEGMENT_PREFIX, index, self.extension))
    }

    /// Path of the concat list used by the external muxer.
    pub fn concat_list_path(&self) -> PathBuf {
        self.root.join(CONCAT_LIST_NAME)
    }

    /// Segment files on disk, in ascending index order.
    ///
    /// Files not following the segment naming scheme are ignored. A missing
    /// scratch directory yields an empty list.
    pub fn list_completed(&self) -> Result<Vec<PathBuf>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::List {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut indexed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::List {
                path: self.root.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(index) = self.parse_index(&path) {
                indexed.push((index, path));
            }
        }

        indexed.sort_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().map(|(_, path)| path).collect())
    }

    /// Remove the scratch directory entirely.
    ///
    /// A directory that is already gone is not an error.
    pub fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {
                debug!(path = %self.root.display(), "Cleared scratch directory");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Clear {
                path: self.root.clone(),
                source,
            }),
        }
    }

    /// Extract the index from a segment file name, if it is one of ours.
    fn parse_index(&self, path: &Path) -> Option<usize> {
        if path.extension()?.to_str()? != self.extension {
            return None;
        }
        path.file_stem()?
            .to_str()?
            .strip_prefix(SEGMENT_PREFIX)?
            .parse()
            .ok()
    }
}
