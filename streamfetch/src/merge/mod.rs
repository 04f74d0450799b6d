//! Reassembly of downloaded segments into one output file.
//!
//! Two methods are tried in order:
//!
//! 1. **Stream copy** through the configured muxer (ffmpeg concat demuxer)
//!    without re-encoding.
//! 2. **Concatenation** of the raw segment bytes when the muxer is not
//!    installed on the host.
//!
//! Both write the same artifact, `<output_dir>/output.<container>`.
//!
//! A muxer that is installed but fails is reported as an error; it does
//! not fall back.

mod concat;
mod muxer;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::DownloadConfig;
use crate::download::{ProgressEvent, ProgressSink};
use crate::error::MergeError;

use muxer::MuxResult;

/// Base name of the merged output file.
const OUTPUT_STEM: &str = "output";

/// How the output was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMethod {
    StreamCopy,
    Concatenate,
}

/// Result of a successful merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Path of the merged file.
    pub output: PathBuf,
    pub method: MergeMethod,
    /// Number of segment files merged.
    pub segments: usize,
    /// Size of the merged file in bytes.
    pub bytes: u64,
}

/// Merges segment files, in the order given, into a single output.
#[derive(Debug, Clone)]
pub struct Reassembler {
    output_dir: PathBuf,
    list_path: PathBuf,
    muxer: String,
    container: String,
}

impl Reassembler {
    /// Create a reassembler writing into `output_dir`.
    ///
    /// `list_path` is where the muxer's concat list is written, normally
    /// inside the job's scratch directory.
    pub fn new(output_dir: &Path, list_path: PathBuf, config: &DownloadConfig) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            list_path,
            muxer: config.muxer.clone(),
            container: config.container.clone(),
        }
    }

    /// Path of the merged artifact, whichever method produces it.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", OUTPUT_STEM, self.container))
    }

    /// Merge `segment_files` in order.
    ///
    /// The output is overwritten on every call.
    pub fn merge(
        &self,
        segment_files: &[PathBuf],
        sink: &dyn ProgressSink,
    ) -> Result<MergeReport, MergeError> {
        if segment_files.is_empty() {
            let dir = self
                .list_path
                .parent()
                .unwrap_or(&self.output_dir)
                .to_path_buf();
            return Err(MergeError::NoSegments { dir });
        }

        let count = segment_files.len();
        info!(segments = count, muxer = %self.muxer, "Merging segments");
        sink.on_progress(&ProgressEvent::message(
            count,
            count,
            format!("Merging {} segments...", count),
        ));

        muxer::write_concat_list(segment_files, &self.list_path)?;

        let output = self.output_path();
        let (method, bytes) =
            match muxer::stream_copy(&self.muxer, &self.list_path, &output)? {
                MuxResult::Completed => (MergeMethod::StreamCopy, file_size(&output)?),
                MuxResult::ToolMissing => {
                    warn!(muxer = %self.muxer, "Muxer not found, concatenating segments directly");
                    sink.on_progress(&ProgressEvent::message(
                        count,
                        count,
                        format!("{} not found, merging manually", self.muxer),
                    ));
                    let bytes = concat::concatenate(segment_files, &output)?;
                    (MergeMethod::Concatenate, bytes)
                }
            };

        info!(
            output = %output.display(),
            method = ?method,
            bytes,
            "Merge complete"
        );
        sink.on_progress(&ProgressEvent::message(
            count,
            count,
            format!("Merge complete: {}", output.display()),
        ));

        Ok(MergeReport {
            output,
            method,
            segments: count,
            bytes,
        })
    }
}

fn file_size(path: &Path) -> Result<u64, MergeError> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|source| MergeError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::NullSink;
    use crate::store::SegmentStore;
    use proptest::prelude::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn missing_muxer_config() -> DownloadConfig {
        DownloadConfig::default().with_muxer("streamfetch-no-such-muxer")
    }

    fn store_with(dir: &Path, chunks: &[&[u8]]) -> SegmentStore {
        let store = SegmentStore::new(dir, "test", "ts");
        store.reset().unwrap();
        for (i, chunk) in chunks.iter().enumerate() {
            fs::write(store.segment_path(i), chunk).unwrap();
        }
        store
    }

    #[test]
    fn test_fallback_concatenates_in_order() {
        let dir = TempDir::new().unwrap();
        let store = store_with(dir.path(), &[&[0x01], &[0x02], &[0x03]]);
        let reassembler =
            Reassembler::new(dir.path(), store.concat_list_path(), &missing_muxer_config());

        let files = store.list_completed().unwrap();
        let report = reassembler.merge(&files, &NullSink).unwrap();

        assert_eq!(report.method, MergeMethod::Concatenate);
        assert_eq!(report.output, dir.path().join("output.mp4"));
        assert_eq!(report.segments, 3);
        assert_eq!(report.bytes, 3);
        assert_eq!(fs::read(&report.output).unwrap(), vec![0x01, 0x02, 0x03]);
        assert!(store.concat_list_path().exists());
    }

    #[test]
    fn test_fallback_reported_to_sink() {
        let dir = TempDir::new().unwrap();
        let store = store_with(dir.path(), &[b"a"]);
        let reassembler =
            Reassembler::new(dir.path(), store.concat_list_path(), &missing_muxer_config());

        let messages = Mutex::new(Vec::new());
        let sink = |event: &ProgressEvent| {
            if let Some(ref msg) = event.message {
                messages.lock().unwrap().push(msg.clone());
            }
        };

        reassembler
            .merge(&store.list_completed().unwrap(), &sink)
            .unwrap();

        let messages = messages.into_inner().unwrap();
        assert!(messages
            .iter()
            .any(|m| m.contains("not found, merging manually")));
        assert!(messages.last().unwrap().starts_with("Merge complete"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_with(dir.path(), &[b"first ", b"second ", b"third"]);
        let reassembler =
            Reassembler::new(dir.path(), store.concat_list_path(), &missing_muxer_config());
        let files = store.list_completed().unwrap();

        let first = reassembler.merge(&files, &NullSink).unwrap();
        let first_bytes = fs::read(&first.output).unwrap();
        let second = reassembler.merge(&files, &NullSink).unwrap();
        let second_bytes = fs::read(&second.output).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_bytes, second_bytes);
        assert_eq!(first_bytes, b"first second third");
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = SegmentStore::new(dir.path(), "test", "ts");
        let reassembler =
            Reassembler::new(dir.path(), store.concat_list_path(), &missing_muxer_config());

        let err = reassembler.merge(&[], &NullSink).unwrap_err();

        assert!(matches!(err, MergeError::NoSegments { .. }));
        assert!(!reassembler.output_path().exists());
    }

    #[test]
    fn test_output_path_uses_container() {
        let config = DownloadConfig::default()
            .with_container("mkv")
            .with_segment_extension("m4s");
        let reassembler = Reassembler::new(Path::new("/out"), PathBuf::from("/out/l.txt"), &config);

        assert_eq!(reassembler.output_path(), PathBuf::from("/out/output.mkv"));
    }

    #[test]
    fn test_fallback_writes_container_artifact() {
        let dir = TempDir::new().unwrap();
        let store = SegmentStore::new(dir.path(), "test", "m4s");
        store.reset().unwrap();
        fs::write(store.segment_path(0), b"x").unwrap();
        let config = missing_muxer_config().with_container("mkv");
        let reassembler = Reassembler::new(dir.path(), store.concat_list_path(), &config);

        let report = reassembler
            .merge(&store.list_completed().unwrap(), &NullSink)
            .unwrap();

        assert_eq!(report.method, MergeMethod::Concatenate);
        assert_eq!(report.output, dir.path().join("output.mkv"));
        assert!(!dir.path().join("output.m4s").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_muxer_does_not_fall_back() {
        let dir = TempDir::new().unwrap();
        let store = store_with(dir.path(), &[b"a", b"b"]);
        let config = DownloadConfig::default().with_muxer("false");
        let reassembler = Reassembler::new(dir.path(), store.concat_list_path(), &config);

        let err = reassembler
            .merge(&store.list_completed().unwrap(), &NullSink)
            .unwrap_err();

        assert!(matches!(err, MergeError::ExternalToolFailed { .. }));
        assert!(!reassembler.output_path().exists());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// Segments finishing in any order merge back in index order.
        #[test]
        fn prop_merge_ignores_completion_order(
            chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..32), 1..12),
            seed in any::<u64>(),
        ) {
            let dir = TempDir::new().unwrap();
            let store = SegmentStore::new(dir.path(), "prop", "ts");
            store.reset().unwrap();

            // Write files in a scrambled order to mimic out-of-order completion.
            let n = chunks.len();
            let mut order: Vec<usize> = (0..n).collect();
            let mut state = seed;
            for i in (1..n).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                order.swap(i, (state >> 33) as usize % (i + 1));
            }
            for &i in &order {
                fs::write(store.segment_path(i), &chunks[i]).unwrap();
            }

            let reassembler =
                Reassembler::new(dir.path(), store.concat_list_path(), &missing_muxer_config());
            let report = reassembler
                .merge(&store.list_completed().unwrap(), &NullSink)
                .unwrap();

            let expected: Vec<u8> = chunks.concat();
            prop_assert_eq!(fs::read(&report.output).unwrap(), expected);
            prop_assert_eq!(report.segments, n);
        }
    }
}
