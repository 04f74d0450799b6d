//! Stream-copy concatenation through an external muxer (ffmpeg).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::MergeError;

/// Result of trying the external muxer.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum MuxResult {
    /// The muxer produced the output.
    Completed,
    /// The muxer is not installed; the caller should fall back.
    ToolMissing,
}

/// Write the concat demuxer list: one `file '<path>'` line per segment.
pub(super) fn write_concat_list(segment_files: &[PathBuf], list_path: &Path) -> Result<(), MergeError> {
    let io_err = |source| MergeError::Io {
        path: list_path.to_path_buf(),
        source,
    };

    let file = File::create(list_path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);

    for segment in segment_files {
        let absolute = absolute_path(segment).map_err(io_err)?;
        writeln!(writer, "file '{}'", escape_quotes(&absolute.to_string_lossy())).map_err(io_err)?;
    }

    writer.flush().map_err(io_err)
}

/// Run `program` to concatenate the listed segments without re-encoding.
pub(super) fn stream_copy(
    program: &str,
    list_path: &Path,
    output: &Path,
) -> Result<MuxResult, MergeError> {
    debug!(program, list = %list_path.display(), output = %output.display(), "Running muxer");

    let result = Command::new(program)
        .args(["-hide_banner", "-loglevel", "error", "-y"])
        .args(["-f", "concat", "-safe", "0", "-i"])
        .arg(list_path)
        .args(["-c", "copy"])
        .arg(output)
        .stdin(Stdio::null())
        .output();

    let output = match result {
        Ok(output) => output,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(MuxResult::ToolMissing),
        Err(e) => return Err(MergeError::tool_failed(program, None, &e.to_string())),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MergeError::tool_failed(program, Some(output.status), &stderr));
    }

    Ok(MuxResult::Completed)
}

/// Escape single quotes for the concat demuxer's quoting rules.
fn escape_quotes(path: &str) -> String {
    path.replace('\'', r"'\''")
}

fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
