//! Output files for a run.
//!
//! Every output is first written to a temporary file in its destination
//! directory. Nothing becomes visible at the destination paths until
//! `commit`, so a run that fails part-way leaves no output behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Result, SqlMaskError};

/// Outputs written to temporary files, waiting to be moved into place.
#[derive(Debug, Default)]
pub struct StagedOutputs {
    staged: Vec<(PathBuf, NamedTempFile)>,
}

impl StagedOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `contents` to a temporary sibling of `path`.
    pub fn stage(&mut self, path: &Path, contents: &str) -> Result<()> {
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(directory).map_err(|e| {
            SqlMaskError::io(
                format!("Failed to create temporary file in {}", directory.display()),
                e,
            )
        })?;
        file.write_all(contents.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| {
                SqlMaskError::io(format!("Failed to write output for {}", path.display()), e)
            })?;

        tracing::debug!(path = %path.display(), bytes = contents.len(), "Staged output");
        self.staged.push((path.to_path_buf(), file));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Moves every staged file to its destination.
    pub fn commit(self) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.staged.len());
        for (path, file) in self.staged {
            file.persist(&path).map_err(|e| {
                SqlMaskError::io(format!("Failed to write to {}", path.display()), e.error)
            })?;
            tracing::info!(path = %path.display(), "Wrote output");
            written.push(path);
        }
        Ok(written)
    }
}
