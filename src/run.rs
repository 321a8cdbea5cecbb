//! Run mode: stage a host runtime in a scratch directory and launch it

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use log::info;

use crate::config::BuilderConfig;
use crate::error::{BuildError, BuildResult, IoContext};
use crate::fs_ops::{self, CopyFilter};
use crate::pipeline::{PlatformProfile, inject_codec};
use crate::provider::{BinaryProvider, CodecProvider, RuntimeRequest, VersionResolver, VersionSpec};
use crate::target::Target;

/// A run-mode request
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Arguments forwarded to the runtime (usually the application path first)
    pub args: Vec<String>,
    pub version: VersionSpec,
    pub mirror: Option<String>,
    pub with_codec: bool,
    pub detached: bool,
}

/// How a launched runtime ended, as far as we know
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Attached run finished with this exit code
    Exited(i32),
    /// Detached run outlived the settling delay; its working copy is kept
    Detached {
        pid: Option<u32>,
        working_dir: PathBuf,
    },
}

/// Launches a fresh copy of the host runtime
pub struct RunPipeline<'a, R, B, C> {
    resolver: &'a R,
    binaries: &'a B,
    codecs: &'a C,
    config: &'a BuilderConfig,
    target: Target,
}

impl<'a, R, B, C> RunPipeline<'a, R, B, C>
where
    R: VersionResolver,
    B: BinaryProvider,
    C: CodecProvider,
{
    pub fn new(resolver: &'a R, binaries: &'a B, codecs: &'a C, config: &'a BuilderConfig) -> Self {
        Self {
            resolver,
            binaries,
            codecs,
            config,
            target: Target::host(),
        }
    }

    /// Run against a target other than the host
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub async fn run(&self, request: &RunRequest) -> BuildResult<RunOutcome> {
        let profile = PlatformProfile::for_platform(&self.target.platform)?;
        let resolved = self.resolver.resolve(&request.version).await?;
        info!("Using NW.js {resolved} for {}", self.target);

        let runtime_dir = self
            .binaries
            .fetch_runtime(&RuntimeRequest {
                version: resolved.version.clone(),
                flavor: resolved.flavor,
                target: self.target.clone(),
                mirror: request.mirror.clone(),
            })
            .await?;

        let scratch = tempfile::Builder::new()
            .prefix("nwbuilder-run-")
            .tempdir()
            .io_ctx("create directory", &std::env::temp_dir())?;
        let working_dir = scratch.path().to_path_buf();
        info!("Working directory: {}", working_dir.display());

        fs_ops::copy_tree(&runtime_dir, &working_dir, CopyFilter::new()).await?;

        if request.with_codec {
            inject_codec(
                self.codecs,
                &working_dir,
                &resolved.version,
                &self.target,
                profile,
                self.config.codec_policy,
            )
            .await?;
        }

        let executable = working_dir.join(profile.executable);
        if !tokio::fs::try_exists(&executable)
            .await
            .io_ctx("stat", &executable)?
        {
            return Err(BuildError::not_found("runtime executable", executable));
        }

        let mut command = tokio::process::Command::new(&executable);
        command.args(&request.args);
        let display = executable.display().to_string();

        if request.detached {
            let mut child = command
                .stdin(Stdio::null())
                .spawn()
                .map_err(|e| BuildError::ExternalProcess {
                    command: display.clone(),
                    reason: e.to_string(),
                })?;
            let pid = child.id();

            tokio::time::sleep(Duration::from_millis(self.config.detach_settle_ms)).await;
            if let Ok(Some(status)) = child.try_wait() {
                info!("Runtime already exited with {status}");
            }

            // The child keeps using its copy of the runtime
            let working_dir = scratch.keep();
            info!("Exiting without waiting for the runtime process");
            return Ok(RunOutcome::Detached { pid, working_dir });
        }

        let status = command
            .status()
            .await
            .map_err(|e| BuildError::ExternalProcess {
                command: display.clone(),
                reason: e.to_string(),
            })?;

        match status.code() {
            Some(code) => {
                info!("Runtime exited with code {code}");
                Ok(RunOutcome::Exited(code))
            }
            None => Err(BuildError::ExternalProcess {
                command: display,
                reason: "terminated by signal".into(),
            }),
        }
    }
}
