//! Application descriptor (`package.json`)

use std::path::Path;

use serde::Deserialize;

use crate::error::{BuildError, BuildResult, IoContext};

/// Descriptor file name inside the application source tree
pub const MANIFEST_FILE: &str = "package.json";

/// Fields of the descriptor used to brand a bundle
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
}

impl Manifest {
    /// Parse descriptor JSON; other fields are ignored
    pub fn from_json(path: &Path, raw: &str) -> BuildResult<Self> {
        let manifest: Manifest =
            serde_json::from_str(raw).map_err(|e| BuildError::parse(path, e))?;

        if manifest.name.trim().is_empty() {
            return Err(BuildError::parse(path, "`name` must not be empty"));
        }

        Ok(manifest)
    }

    /// Read `package.json` from an application source directory
    pub async fn load(source_dir: &Path) -> BuildResult<Self> {
        let path = source_dir.join(MANIFEST_FILE);

        if !tokio::fs::try_exists(&path).await.io_ctx("stat", &path)? {
            return Err(BuildError::not_found("application descriptor", path));
        }

        let raw = tokio::fs::read_to_string(&path)
            .await
            .io_ctx("read", &path)?;
        Self::from_json(&path, &raw)
    }

    /// Reverse-domain bundle identifier, e.g. `io.nwjs-builder.demo`
    pub fn identifier(&self, prefix: &str) -> String {
        format!("{prefix}.{}", self.name.to_lowercase())
    }
}
