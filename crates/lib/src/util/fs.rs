//! Filesystem helpers.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Write `content` to `path` atomically.
///
/// The bytes go to a temporary file in the same directory which is renamed over
/// `path` once fully written. On any failure the temporary file is removed and
/// `path` is left untouched.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
  let parent = match path.parent() {
    Some(p) if !p.as_os_str().is_empty() => p,
    _ => Path::new("."),
  };
  fs::create_dir_all(parent)?;

  let mut temp = NamedTempFile::new_in(parent)?;
  temp.write_all(content)?;
  temp.as_file().sync_all()?;
  temp.persist(path).map_err(|e| e.error)?;
  Ok(())
}

/// Remove `path` if it exists, then create it empty.
pub fn reset_dir(path: &Path) -> io::Result<()> {
  match fs::remove_dir_all(path) {
    Ok(()) => {}
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(e) => return Err(e),
  }
  fs::create_dir_all(path)
}
