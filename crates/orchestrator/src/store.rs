use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use toolbelt_core::CapabilitySpec;

use crate::error::Result;

/// Name-addressed storage for synthesized capability source.
///
/// A flat namespace under an explicit root path: the root is a parameter
/// rather than process-global state, so deployments can scope it. Writes
/// for an existing name overwrite the previous source; files outlive the
/// session that wrote them.
#[derive(Debug, Clone)]
pub struct CapabilityStore {
    root: PathBuf,
}

impl CapabilityStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Storage location for a capability name. Names are validated
    /// because they become file names.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        CapabilitySpec::validate_name(name)?;
        Ok(self.root.join(format!("{}.py", name)))
    }

    /// Persist a capability's source, creating directories as needed.
    pub async fn write(&self, name: &str, source: &str) -> Result<PathBuf> {
        let path = self.path_for(name)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, source).await?;

        debug!(capability = %name, path = %path.display(), "Capability source written");

        Ok(path)
    }
}
