//! Movie folder discovery
//!
//! Lists the immediate subdirectories of the movies root. Each one is a
//! [Candidate] named after the folder. The walk is not recursive: anything
//! deeper than one level belongs to the movie itself.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::models::Candidate;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("movies directory does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("movies path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("failed to read movies directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// List candidate folders under `root`, sorted by name.
pub fn list_candidates(root: &Path) -> Result<Vec<Candidate>, ScanError> {
    let metadata = std::fs::metadata(root).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ScanError::RootNotFound(root.to_path_buf()),
        _ => ScanError::Io {
            path: root.to_path_buf(),
            source: e,
        },
    })?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    info!(path = %root.display(), "Scanning movies directory");

    let mut candidates = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(ScanError::Io {
                    path: root.to_path_buf(),
                    source: e.into(),
                });
            }
            Err(e) => {
                // Broken symlinks and entries that vanished mid-scan
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            warn!(path = %entry.path().display(), "Skipping folder with non UTF-8 name");
            continue;
        };

        debug!(movie = %name, "Found movie folder");
        candidates.push(Candidate::new(name, entry.path()));
    }

    info!(count = candidates.len(), "Found movie folders");
    Ok(candidates)
}
