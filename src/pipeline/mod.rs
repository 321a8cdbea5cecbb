//! Packaging pipeline: runtime distribution + application source -> bundle
//!
//! One pipeline serves every platform. A [`PlatformProfile`] supplies the
//! layout differences and [`stage::plan`] picks the stages that apply; the
//! stages then run strictly in order against a per-run [`BuildContext`],
//! stopping at the first error.
//!
//! ## Module Organization
//!
//! - `profile` - Per-platform layout and capabilities
//! - `context` - Mutable state of one run
//! - `stage` - Stage list and stage bodies
//! - `metadata` - Info.plist, assembly manifest and launcher writers
//! - `codec` - Codec library replacement (shared with run mode)

mod codec;
mod context;
mod metadata;
mod profile;
mod stage;

use std::path::{Path, PathBuf};

use log::info;

pub use codec::inject_codec;
pub use context::{BuildContext, DEFAULT_OUTPUT_NAME, PipelineSettings};
pub use metadata::four_part_version;
pub use profile::{BundleRename, MetadataFormat, PlatformProfile};
pub use stage::{Stage, plan};

use crate::error::{BuildResult, IoContext};
use crate::manifest::Manifest;
use crate::provider::CodecProvider;
use crate::target::{Platform, Target};

/// User-facing switches for a build
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Parent of the build directory (defaults to the source's parent)
    pub output_dir: Option<PathBuf>,
    /// Build directory name template, see [`DEFAULT_OUTPUT_NAME`]
    pub output_name: Option<String>,
    /// Overrides the manifest name for the bundle and launcher
    pub executable_name: Option<String>,
    pub with_codec: bool,
    pub side_by_side: bool,
    pub production: bool,
    pub mac_icns: Option<PathBuf>,
    pub win_ico: Option<PathBuf>,
}

impl BuildOptions {
    /// Icon supplied for `platform`, if any
    pub fn icon_for(&self, platform: &Platform) -> Option<&Path> {
        match platform {
            Platform::Darwin => self.mac_icns.as_deref(),
            Platform::Windows => self.win_ico.as_deref(),
            _ => None,
        }
    }
}

/// Inputs of one pipeline run
#[derive(Debug, Clone)]
pub struct BuildJob {
    pub source_dir: PathBuf,
    pub runtime_dir: PathBuf,
    pub version: String,
    pub target: Target,
    pub options: BuildOptions,
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub build_dir: PathBuf,
    /// Renamed `.app` on macOS, the build directory elsewhere
    pub bundle_path: PathBuf,
    pub target: Target,
    pub manifest: Manifest,
}

/// Runs the stage sequence for one target
pub struct BuildPipeline<'a, C> {
    codecs: &'a C,
    settings: PipelineSettings,
}

impl<'a, C: CodecProvider> BuildPipeline<'a, C> {
    pub fn new(codecs: &'a C, settings: PipelineSettings) -> Self {
        Self { codecs, settings }
    }

    pub async fn run(&self, job: BuildJob) -> BuildResult<BuildOutput> {
        let profile = PlatformProfile::for_platform(&job.target.platform)?;
        let source_dir =
            std::path::absolute(&job.source_dir).io_ctx("resolve path", &job.source_dir)?;

        let stages = plan(profile, &job.options);
        let mut ctx = BuildContext::new(
            source_dir,
            job.runtime_dir,
            job.version,
            job.target,
            profile,
            job.options,
            self.settings.clone(),
        );

        for (n, stage) in stages.into_iter().enumerate() {
            info!("{n}: {}", stage.description());
            stage.run(&mut ctx, self.codecs).await?;
        }
        info!("Done");

        Ok(BuildOutput {
            build_dir: ctx.build_dir()?.to_path_buf(),
            bundle_path: ctx.bundle_path()?.to_path_buf(),
            manifest: ctx.manifest()?.clone(),
            target: ctx.target,
        })
    }
}
