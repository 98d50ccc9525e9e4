//! Scoped work directories.
//!
//! A [`ScopedWorkspace`] owns the temporary artifacts of one video (proxy,
//! frame images, archives). Removal is attempted on every exit path, and a
//! failed removal is logged rather than returned.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::MediaResult;

/// Temporary directory for one video's pipeline run.
#[derive(Debug)]
pub struct ScopedWorkspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScopedWorkspace {
    /// Create a fresh workspace below `root`, named after `label`.
    pub fn create(root: impl AsRef<Path>, label: &str) -> MediaResult<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        let prefix = format!("{}-", sanitize_label(label));
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(root.as_ref())?;
        let path = dir.path().to_path_buf();
        debug!("Created workspace {}", path.display());
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.path.join(relative)
    }

    /// Remove the workspace now. Returns whether removal succeeded.
    pub fn cleanup(mut self) -> bool {
        self.remove()
    }

    fn remove(&mut self) -> bool {
        let Some(dir) = self.dir.take() else {
            return true;
        };
        match dir.close() {
            Ok(()) => {
                debug!("Cleaned up workspace {}", self.path.display());
                true
            }
            Err(e) => {
                warn!("Cleanup of {} failed: {}", self.path.display(), e);
                false
            }
        }
    }
}

impl Drop for ScopedWorkspace {
    fn drop(&mut self) {
        self.remove();
    }
}

fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(48)
        .collect();
    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned
    }
}
