//! Runtime sources: version resolution, runtime binaries and codec artifacts
//!
//! The pipelines only depend on the traits below. [`HttpMirror`] implements
//! all three against the public NW.js download mirrors; tests supply local
//! fakes.
//!
//! ## Module Organization
//!
//! - `version` - Version spec parsing and flavor selection
//! - `mirror` - HTTP mirror with on-disk cache
//! - `extract` - Zip / tar.gz extraction

mod extract;
mod mirror;
mod version;

use std::future::Future;
use std::path::{Path, PathBuf};

pub use mirror::HttpMirror;
pub use version::{Flavor, ResolvedVersion, VersionSelector, VersionSpec};

use crate::error::BuildResult;
use crate::target::Target;

/// Everything needed to locate one runtime distribution
#[derive(Debug, Clone)]
pub struct RuntimeRequest {
    pub version: String,
    pub flavor: Flavor,
    pub target: Target,
    /// Overrides the configured mirror
    pub mirror: Option<String>,
}

/// Turns a version spec into a concrete version and flavor
pub trait VersionResolver {
    fn resolve(&self, spec: &VersionSpec) -> impl Future<Output = BuildResult<ResolvedVersion>>;
}

/// Supplies an extracted runtime directory
pub trait BinaryProvider {
    fn fetch_runtime(&self, request: &RuntimeRequest) -> impl Future<Output = BuildResult<PathBuf>>;
}

/// Supplies a directory holding the codec library for a runtime version
pub trait CodecProvider {
    fn fetch_codec(
        &self,
        scratch_dir: &Path,
        version: &str,
        target: &Target,
    ) -> impl Future<Output = BuildResult<PathBuf>>;
}
