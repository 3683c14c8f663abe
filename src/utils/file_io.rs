//! Filesystem capability used to allocate one isolated root per component.
//!
//! All other file I/O belongs to the master and tablet-server implementations.

use std::fs::create_dir_all;
use std::path::Path;
use std::path::PathBuf;

#[cfg(test)]
use mockall::automock;
use nanoid::nanoid;
use tracing::debug;
use tracing::error;

use crate::Error;
use crate::Result;

/// Directory name prefix of auto-generated cluster roots.
pub const CLUSTER_ROOT_PREFIX: &str = "minicluster-data";

#[cfg_attr(test, automock)]
pub trait Env: Send + Sync + 'static {
    /// Create `path` and any missing parents. Succeeds if it already exists.
    fn create_dir_all(
        &self,
        path: &Path,
    ) -> Result<()>;

    /// A fresh path no other cluster in this process (or a previous run)
    /// has used. The directory itself is not created.
    fn unique_cluster_root(&self) -> PathBuf;
}

/// Roots live under the OS temp dir unless a base dir is given.
#[derive(Debug, Clone)]
pub struct DefaultEnv {
    base_dir: PathBuf,
}

impl Default for DefaultEnv {
    fn default() -> Self {
        Self {
            base_dir: std::env::temp_dir(),
        }
    }
}

impl DefaultEnv {
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl Env for DefaultEnv {
    fn create_dir_all(
        &self,
        path: &Path,
    ) -> Result<()> {
        create_dir_all(path).map_err(|source| {
            error!("Failed to create directory {}: {:?}", path.display(), source);
            Error::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
        debug!("created directory: {}", path.display());
        Ok(())
    }

    fn unique_cluster_root(&self) -> PathBuf {
        self.base_dir.join(format!("{CLUSTER_ROOT_PREFIX}-{}", nanoid!(12)))
    }
}

/// Returns the id stored in `path`, writing a new one on first use.
pub(crate) fn read_or_create_instance_id(path: &Path) -> Result<String> {
    if let Ok(id) = std::fs::read_to_string(path) {
        let id = id.trim();
        if !id.is_empty() {
            return Ok(id.to_string());
        }
    }

    let id = nanoid!();
    std::fs::write(path, &id).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(id)
}
