//! Error taxonomy for build and run pipelines
//!
//! Every stage of a pipeline returns `Result<_, BuildError>`; the first error
//! aborts the run and is handed back to the caller unchanged.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors produced while resolving, fetching, packaging or launching a runtime
#[derive(Debug, Error)]
pub enum BuildError {
    /// A required input (source tree, descriptor, codec file, icon...) is missing
    #[error("{what} not found: {}", path.display())]
    NotFound { what: &'static str, path: PathBuf },

    /// A descriptor or metadata file could not be parsed
    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// Filesystem operation failed
    #[error("{op} failed for {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Resetting the build directory would delete the application source
    #[error(
        "build directory {} would overwrite the application source {}",
        build_dir.display(),
        source_dir.display()
    )]
    OutputOverlapsSource {
        build_dir: PathBuf,
        source_dir: PathBuf,
    },

    /// Dependency install or executable launch failed
    #[error("`{command}` failed: {reason}")]
    ExternalProcess { command: String, reason: String },

    /// Runtime, codec or version list could not be fetched
    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    /// No pipeline exists for the normalized platform identifier
    #[error("no build pipeline for platform `{0}`")]
    UnsupportedPlatform(String),

    /// Version spec could not be interpreted
    #[error("invalid version `{0}`")]
    InvalidVersion(String),

    /// A stage read context state that an earlier stage should have produced
    #[error("build context has no {0}; stages ran out of order")]
    Context(&'static str),
}

impl BuildError {
    pub(crate) fn not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        BuildError::NotFound {
            what,
            path: path.into(),
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        BuildError::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn download(url: impl Into<String>, reason: impl ToString) -> Self {
        BuildError::Download {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Attach the failing operation and path to an `io::Error`
pub(crate) trait IoContext<T> {
    fn io_ctx(self, op: &'static str, path: &Path) -> Result<T, BuildError>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_ctx(self, op: &'static str, path: &Path) -> Result<T, BuildError> {
        self.map_err(|source| BuildError::Io {
            op,
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Result alias used across the crate
pub type BuildResult<T> = Result<T, BuildError>;
