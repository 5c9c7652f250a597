use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{Result, WatchmapError};

/// Serialize `data` as pretty JSON and move it into place atomically
///
/// The file is staged next to `output_path` and renamed over it, so readers
/// never see a partial document and a failed run leaves nothing behind.
pub fn export_json<T, P>(data: &T, output_path: P) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let output_path = output_path.as_ref();
    let fail = |reason: String| WatchmapError::Export {
        path: output_path.to_path_buf(),
        reason,
    };

    let json_data = serde_json::to_string_pretty(data).map_err(|e| fail(e.to_string()))?;

    let dir = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir).map_err(|e| fail(e.to_string()))?;
    staged
        .write_all(json_data.as_bytes())
        .and_then(|_| staged.flush())
        .map_err(|e| fail(e.to_string()))?;
    staged
        .persist(output_path)
        .map_err(|e| fail(e.error.to_string()))?;

    Ok(())
}
