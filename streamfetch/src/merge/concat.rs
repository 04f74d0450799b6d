//! Raw byte concatenation fallback.
//!
//! Only valid for homogeneous transport-stream segments, which can be
//! joined back to back. Needs local I/O only.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::MergeError;

/// Append every segment, in the given order, into `output`.
///
/// `output` is truncated first, so repeating the call yields identical bytes.
/// Returns the number of bytes written.
pub(super) fn concatenate(segment_files: &[PathBuf], output: &Path) -> Result<u64, MergeError> {
    let write_err = |source| MergeError::Io {
        path: output.to_path_buf(),
        source,
    };

    let file = File::create(output).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    let mut total = 0u64;

    for segment in segment_files {
        let read_err = |source| MergeError::Io {
            path: segment.clone(),
            source,
        };
        let mut reader = BufReader::new(File::open(segment).map_err(read_err)?);

        total += io::copy(&mut reader, &mut writer).map_err(|e| {
            // io::copy does not say which side failed; attribute write
            // failures to the output and everything else to the segment.
            if e.kind() == io::ErrorKind::WriteZero {
                write_err(e)
            } else {
                read_err(e)
            }
        })?;
    }

    writer.flush().map_err(write_err)?;
    Ok(total)
}
