//! Staging directories.
//!
//! A stage holds exactly the files a deploy (or rollback) needs, laid out with the
//! same relative paths they have in the repository. Stages are owned by a single
//! run: they are reset before use and never appended to.
//!
//! Two runs sharing one workspace must be serialized by the caller; the reset step
//! is not guarded against concurrent writers.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

use crate::classify::MetadataDescriptor;
use crate::util::fs::{reset_dir, write_atomic};
use crate::vcs::{ChangeSource, VcsError};

/// Errors that can occur while preparing a stage.
#[derive(Debug, Error)]
pub enum StageError {
  /// Failed to reset the stage directory.
  #[error("failed to reset stage directory '{path}': {source}")]
  Reset {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to copy a file into the stage.
  #[error("failed to copy '{from}' to '{to}': {source}")]
  Copy {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to retrieve historical content.
  #[error("failed to retrieve '{path}': {source}")]
  Retrieve {
    path: String,
    #[source]
    source: VcsError,
  },

  /// Failed to write a file into the stage.
  #[error("failed to write '{path}': {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to traverse the directory being archived.
  #[error("failed to traverse '{path}': {source}")]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  /// Failed to build the archive.
  #[error("failed to create archive '{path}': {source}")]
  Archive {
    path: PathBuf,
    #[source]
    source: zip::result::ZipError,
  },

  /// Failed to remove a directory.
  #[error("failed to remove directory '{path}': {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Remove any existing directory at `path` and recreate it empty.
pub fn reset(path: &Path) -> Result<(), StageError> {
  reset_dir(path).map_err(|source| StageError::Reset {
    path: path.to_path_buf(),
    source,
  })?;
  debug!(path = %path.display(), "reset stage directory");
  Ok(())
}

/// Copy each descriptor's file from `source_root` to `dest_root`, preserving its
/// relative path. Returns the number of files copied.
pub fn replicate(descriptors: &[MetadataDescriptor], source_root: &Path, dest_root: &Path) -> Result<usize, StageError> {
  for descriptor in descriptors {
    let relative = descriptor.path();
    let from = source_root.join(&relative);
    let to = dest_root.join(&relative);

    let copy_error = |source| StageError::Copy {
      from: from.clone(),
      to: to.clone(),
      source,
    };
    if let Some(parent) = to.parent() {
      fs::create_dir_all(parent).map_err(copy_error)?;
    }
    fs::copy(&from, &to).map_err(copy_error)?;
    debug!(path = %relative, "copied to stage");
  }

  info!(count = descriptors.len(), dest = %dest_root.display(), "replicated members");
  Ok(descriptors.len())
}

/// Write each descriptor's content at `rev` under `dest_root`. Returns the number
/// of files written.
pub fn materialize<S: ChangeSource + ?Sized>(
  source: &S,
  rev: &str,
  descriptors: &[MetadataDescriptor],
  dest_root: &Path,
) -> Result<usize, StageError> {
  for descriptor in descriptors {
    let relative = descriptor.path();
    let content = source.content_at(rev, &relative).map_err(|e| StageError::Retrieve {
      path: relative.clone(),
      source: e,
    })?;

    let to = dest_root.join(&relative);
    write_atomic(&to, &content).map_err(|e| StageError::Write { path: to.clone(), source: e })?;
    debug!(path = %relative, rev, "materialized");
  }

  info!(count = descriptors.len(), rev, dest = %dest_root.display(), "materialized members");
  Ok(descriptors.len())
}

/// Zip the contents of `dir` into `archive_path`.
///
/// Entry names are relative to `dir` and use `/` separators. The archive is
/// written to a temporary file first, so a failure leaves nothing at `archive_path`.
pub fn archive_dir(dir: &Path, archive_path: &Path) -> Result<PathBuf, StageError> {
  let archive_error = |source| StageError::Archive {
    path: archive_path.to_path_buf(),
    source,
  };
  let write_error = |source| StageError::Write {
    path: archive_path.to_path_buf(),
    source,
  };

  let parent = match archive_path.parent() {
    Some(p) if !p.as_os_str().is_empty() => p,
    _ => Path::new("."),
  };
  fs::create_dir_all(parent).map_err(write_error)?;
  let temp = NamedTempFile::new_in(parent).map_err(write_error)?;

  let mut writer = zip::ZipWriter::new(temp);
  let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

  for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
    let entry = entry.map_err(|source| StageError::Walk {
      path: dir.to_path_buf(),
      source,
    })?;
    let Ok(relative) = entry.path().strip_prefix(dir) else {
      continue;
    };
    let name = relative
      .components()
      .map(|c| c.as_os_str().to_string_lossy())
      .collect::<Vec<_>>()
      .join("/");

    if entry.file_type().is_dir() {
      writer.add_directory(name, options).map_err(archive_error)?;
    } else {
      writer.start_file(name, options).map_err(archive_error)?;
      let mut file = File::open(entry.path()).map_err(write_error)?;
      io::copy(&mut file, &mut writer).map_err(write_error)?;
    }
  }

  let mut temp = writer.finish().map_err(archive_error)?;
  temp.flush().map_err(write_error)?;
  temp.persist(archive_path).map_err(|e| write_error(e.error))?;

  info!(path = %archive_path.display(), "created archive");
  Ok(archive_path.to_path_buf())
}

/// Remove a directory and everything in it.
pub fn remove_dir(path: &Path) -> Result<(), StageError> {
  fs::remove_dir_all(path).map_err(|source| StageError::Remove {
    path: path.to_path_buf(),
    source,
  })?;
  debug!(path = %path.display(), "removed directory");
  Ok(())
}
