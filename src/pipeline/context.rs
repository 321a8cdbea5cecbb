//! Per-run build state

use std::path::{Path, PathBuf};

use super::BuildOptions;
use super::profile::PlatformProfile;
use crate::config::{BuilderConfig, CodecPolicy};
use crate::error::{BuildError, BuildResult};
use crate::manifest::Manifest;
use crate::target::Target;

/// Configuration values the stages read
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub identifier_prefix: String,
    pub install_command: Vec<String>,
    pub codec_policy: CodecPolicy,
}

impl From<&BuilderConfig> for PipelineSettings {
    fn from(config: &BuilderConfig) -> Self {
        Self {
            identifier_prefix: config.identifier_prefix.clone(),
            install_command: config.install_command.clone(),
            codec_policy: config.codec_policy,
        }
    }
}

/// State threaded through one pipeline run
///
/// Created when the run starts and dropped when it ends. Fields filled in by
/// a stage are read back through accessors that fail with
/// [`BuildError::Context`] if the producing stage has not run.
#[derive(Debug)]
pub struct BuildContext {
    pub source_dir: PathBuf,
    pub runtime_dir: PathBuf,
    pub version: String,
    pub target: Target,
    pub profile: &'static PlatformProfile,
    pub options: BuildOptions,
    pub settings: PipelineSettings,
    manifest: Option<Manifest>,
    build_dir: Option<PathBuf>,
    bundle_path: Option<PathBuf>,
}

impl BuildContext {
    pub fn new(
        source_dir: PathBuf,
        runtime_dir: PathBuf,
        version: String,
        target: Target,
        profile: &'static PlatformProfile,
        options: BuildOptions,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source_dir,
            runtime_dir,
            version,
            target,
            profile,
            options,
            settings,
            manifest: None,
            build_dir: None,
            bundle_path: None,
        }
    }

    pub fn manifest(&self) -> BuildResult<&Manifest> {
        self.manifest.as_ref().ok_or(BuildError::Context("manifest"))
    }

    pub fn build_dir(&self) -> BuildResult<&Path> {
        self.build_dir
            .as_deref()
            .ok_or(BuildError::Context("build directory"))
    }

    /// Renamed bundle if a rename happened, else the build directory
    pub fn bundle_path(&self) -> BuildResult<&Path> {
        match &self.bundle_path {
            Some(path) => Ok(path),
            None => self.build_dir(),
        }
    }

    pub(super) fn set_manifest(&mut self, manifest: Manifest, build_dir: PathBuf) {
        self.manifest = Some(manifest);
        self.build_dir = Some(build_dir);
    }

    pub(super) fn set_bundle_path(&mut self, path: PathBuf) {
        self.bundle_path = Some(path);
    }

    /// Name used for renamed bundles and launchers
    ///
    /// Separators are replaced so scoped names (`@acme/demo`) stay one path
    /// component.
    pub fn product_name(&self) -> BuildResult<String> {
        match &self.options.executable_name {
            Some(name) if !name.trim().is_empty() => Ok(path_component(name)),
            _ => Ok(path_component(&self.manifest()?.name)),
        }
    }

    /// Build directory name from the output name template
    ///
    /// Supported placeholders: `{name}`, `{version}`, `{target}`.
    pub fn build_name(&self, manifest: &Manifest) -> String {
        let template = self
            .options
            .output_name
            .as_deref()
            .unwrap_or(DEFAULT_OUTPUT_NAME);
        template
            .replace("{name}", &path_component(&manifest.name))
            .replace("{version}", &path_component(&manifest.version))
            .replace("{target}", &self.target.name())
    }
}

/// Make a descriptor value usable as a single file name
pub fn path_component(raw: &str) -> String {
    raw.replace(['/', '\\'], "-")
}

/// `Demo-osx-x64`
pub const DEFAULT_OUTPUT_NAME: &str = "{name}-{target}";
