//! Reading and replacing the committed artifact file.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Read the committed artifact. A missing file is `None`, not an error: the
/// first run in a repository has nothing to compare against.
pub fn read_committed(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => {
            debug!(path = %path.display(), size = bytes.len(), "Read committed artifact");
            Ok(Some(bytes))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No committed artifact yet");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Replace `path` with `bytes` without ever exposing a half-written file.
/// The temporary file lives next to the target so the final rename stays on
/// one filesystem.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    info!(path = %path.display(), size = bytes.len(), "Wrote artifact");
    Ok(())
}

/// Hex SHA-256 of the artifact bytes, shown in summaries and PR bodies.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
