//! Multi-target build driver
//!
//! Resolves the version once, then fetches the runtime and runs the
//! packaging pipeline for each requested target in list order. The first
//! failure aborts the whole request.

use std::path::PathBuf;

use log::info;

use crate::config::BuilderConfig;
use crate::error::BuildResult;
use crate::pipeline::{BuildJob, BuildOptions, BuildOutput, BuildPipeline, PipelineSettings, PlatformProfile};
use crate::provider::{BinaryProvider, CodecProvider, RuntimeRequest, VersionResolver, VersionSpec};
use crate::target::{Target, UnrecognizedToken, parse_platform_list};

/// A packaging request as received from the command line
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    pub source_dir: PathBuf,
    pub version: VersionSpec,
    /// Comma-separated platform tokens; `None` means the host
    pub platforms: Option<String>,
    /// Overrides the configured runtime mirror
    pub mirror: Option<String>,
    pub options: BuildOptions,
}

/// Outputs of a whole request
#[derive(Debug, Default)]
pub struct BuildReport {
    pub outputs: Vec<BuildOutput>,
    pub unrecognized: Vec<UnrecognizedToken>,
}

/// Drives version resolution, runtime fetches and per-target pipelines
pub struct Builder<R, B, C> {
    resolver: R,
    binaries: B,
    codecs: C,
    config: BuilderConfig,
}

impl<R, B, C> Builder<R, B, C>
where
    R: VersionResolver,
    B: BinaryProvider,
    C: CodecProvider,
{
    pub fn new(resolver: R, binaries: B, codecs: C, config: BuilderConfig) -> Self {
        Self {
            resolver,
            binaries,
            codecs,
            config,
        }
    }

    /// Build every target named in the request's platform list
    pub async fn build(&self, request: &BuildRequest) -> BuildResult<BuildReport> {
        let parsed = parse_platform_list(request.platforms.as_deref());
        let outputs = self.build_targets(request, &parsed.targets).await?;
        Ok(BuildReport {
            outputs,
            unrecognized: parsed.unrecognized,
        })
    }

    /// Build an explicit target list, sequentially and fail-fast
    pub async fn build_targets(
        &self,
        request: &BuildRequest,
        targets: &[Target],
    ) -> BuildResult<Vec<BuildOutput>> {
        if request.options.side_by_side {
            info!("Side-by-side mode requested");
        }

        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let resolved = self.resolver.resolve(&request.version).await?;
        info!("Using NW.js {resolved}");

        let pipeline = BuildPipeline::new(&self.codecs, PipelineSettings::from(&self.config));
        let mut outputs = Vec::with_capacity(targets.len());

        for target in targets {
            // Reject unsupported hosts before downloading anything
            PlatformProfile::for_platform(&target.platform)?;

            let runtime_dir = self
                .binaries
                .fetch_runtime(&RuntimeRequest {
                    version: resolved.version.clone(),
                    flavor: resolved.flavor,
                    target: target.clone(),
                    mirror: request.mirror.clone(),
                })
                .await?;

            let output = pipeline
                .run(BuildJob {
                    source_dir: request.source_dir.clone(),
                    runtime_dir,
                    version: resolved.version.clone(),
                    target: target.clone(),
                    options: request.options.clone(),
                })
                .await?;

            info!("{target} build: {}", output.build_dir.display());
            outputs.push(output);
        }

        Ok(outputs)
    }
}
