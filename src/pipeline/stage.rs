//! Pipeline stages and their execution

use std::path::{Component, Path, PathBuf};

use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use super::codec::inject_codec;
use super::context::BuildContext;
use super::metadata::{self, Branding};
use super::profile::{MetadataFormat, PlatformProfile};
use super::BuildOptions;
use crate::error::{BuildError, BuildResult, IoContext};
use crate::fs_ops::{self, CopyFilter};
use crate::manifest::Manifest;
use crate::provider::CodecProvider;

static NODE_MODULES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|/)node_modules(/|$)").expect("node_modules pattern is valid"));

/// One unit of pipeline work, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadManifest,
    ResetBuildDir,
    CopyRuntime,
    InjectCodec,
    EmbedApp,
    PatchMetadata,
    ReplaceIcon,
    RenameBundle,
}

const ALL_STAGES: [Stage; 8] = [
    Stage::LoadManifest,
    Stage::ResetBuildDir,
    Stage::CopyRuntime,
    Stage::InjectCodec,
    Stage::EmbedApp,
    Stage::PatchMetadata,
    Stage::ReplaceIcon,
    Stage::RenameBundle,
];

/// Stages that apply to a target, in declared order
pub fn plan(profile: &PlatformProfile, options: &BuildOptions) -> Vec<Stage> {
    ALL_STAGES
        .into_iter()
        .filter(|stage| match stage {
            Stage::InjectCodec => options.with_codec,
            Stage::ReplaceIcon => {
                profile.icon_slot.is_some() && options.icon_for(&profile.platform).is_some()
            }
            Stage::RenameBundle => profile.rename.is_some(),
            _ => true,
        })
        .collect()
}

impl Stage {
    pub fn description(&self) -> &'static str {
        match self {
            Stage::LoadManifest => "Read package.json",
            Stage::ResetBuildDir => "Prepare build directory",
            Stage::CopyRuntime => "Copy runtime",
            Stage::InjectCodec => "Install codec",
            Stage::EmbedApp => "Copy application",
            Stage::PatchMetadata => "Write platform metadata",
            Stage::ReplaceIcon => "Copy icon",
            Stage::RenameBundle => "Rename application",
        }
    }

    pub async fn run<C: CodecProvider>(self, ctx: &mut BuildContext, codecs: &C) -> BuildResult<()> {
        match self {
            Stage::LoadManifest => load_manifest(ctx).await,
            Stage::ResetBuildDir => fs_ops::reset_dir(ctx.build_dir()?).await,
            Stage::CopyRuntime => copy_runtime(ctx).await,
            Stage::InjectCodec => {
                inject_codec(
                    codecs,
                    ctx.build_dir()?,
                    &ctx.version,
                    &ctx.target,
                    ctx.profile,
                    ctx.settings.codec_policy,
                )
                .await?;
                Ok(())
            }
            Stage::EmbedApp => embed_app(ctx).await,
            Stage::PatchMetadata => patch_metadata(ctx).await,
            Stage::ReplaceIcon => replace_icon(ctx).await,
            Stage::RenameBundle => rename_bundle(ctx).await,
        }
    }
}

async fn load_manifest(ctx: &mut BuildContext) -> BuildResult<()> {
    let source = &ctx.source_dir;
    if !tokio::fs::try_exists(source).await.io_ctx("stat", source)? {
        return Err(BuildError::not_found("application source", source.clone()));
    }

    let manifest = Manifest::load(source).await?;
    let build_name = ctx.build_name(&manifest);
    let parent = match &ctx.options.output_dir {
        Some(dir) => std::path::absolute(dir).io_ctx("resolve path", dir)?,
        None => source.parent().unwrap_or(source.as_path()).to_path_buf(),
    };
    let build_dir = parent.join(build_name);

    if overlaps_source(source, &build_dir).await {
        return Err(BuildError::OutputOverlapsSource {
            build_dir,
            source_dir: source.clone(),
        });
    }

    info!("Building {} {} into {}", manifest.name, manifest.version, build_dir.display());
    ctx.set_manifest(manifest, build_dir);
    Ok(())
}

/// Whether `build_dir` is the source directory or one of its ancestors
async fn overlaps_source(source: &Path, build_dir: &Path) -> bool {
    if lexical(source).starts_with(lexical(build_dir)) {
        return true;
    }
    // Symlinked parents only show up once resolved
    match (
        tokio::fs::canonicalize(source).await,
        tokio::fs::canonicalize(build_dir).await,
    ) {
        (Ok(source), Ok(build_dir)) => source.starts_with(build_dir),
        _ => false,
    }
}

/// Fold `.` and `..` without touching the filesystem
fn lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

async fn copy_runtime(ctx: &mut BuildContext) -> BuildResult<()> {
    let mut filter = CopyFilter::new();
    if let Some(locales) = ctx.profile.locale_filter {
        filter = filter.exclude(Regex::clone(locales));
    }
    let copied = fs_ops::copy_tree(&ctx.runtime_dir, ctx.build_dir()?, filter).await?;
    info!("Copied {copied} runtime files from {}", ctx.runtime_dir.display());
    Ok(())
}

async fn embed_app(ctx: &mut BuildContext) -> BuildResult<()> {
    let build_dir = ctx.build_dir()?;
    let app_dir = build_dir.join(ctx.profile.app_dir);
    let mut filter = CopyFilter::new().skip(build_dir.to_path_buf());

    if ctx.options.production {
        filter = filter.exclude(Regex::clone(&NODE_MODULES));
    }
    fs_ops::copy_tree(&ctx.source_dir, &app_dir, filter).await?;

    if ctx.options.production {
        install_dependencies(&ctx.settings.install_command, &app_dir).await?;
    }
    Ok(())
}

/// Run the dependency install command inside the embedded application
async fn install_dependencies(command: &[String], cwd: &Path) -> BuildResult<()> {
    let display = command.join(" ");
    let Some((program, args)) = command.split_first() else {
        return Err(BuildError::ExternalProcess {
            command: display,
            reason: "install command is empty".into(),
        });
    };

    info!("Running `{display}` in {}", cwd.display());
    let output = tokio::process::Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .await
        .map_err(|e| BuildError::ExternalProcess {
            command: display.clone(),
            reason: e.to_string(),
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        warn!("{display}: {}", stderr.trim());
    }

    if !output.status.success() {
        let reason = match output.status.code() {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".to_string(),
        };
        return Err(BuildError::ExternalProcess {
            command: display,
            reason,
        });
    }
    Ok(())
}

async fn patch_metadata(ctx: &mut BuildContext) -> BuildResult<()> {
    let manifest = ctx.manifest()?;
    let build_dir = ctx.build_dir()?;
    let branding = Branding {
        manifest,
        identifier: manifest.identifier(&ctx.settings.identifier_prefix),
        arch: ctx.target.arch,
    };

    match ctx.profile.metadata {
        MetadataFormat::PropertyList => {
            metadata::patch_property_list(&build_dir.join(ctx.profile.metadata_file), &branding)
                .await
        }
        MetadataFormat::ResourceManifest => {
            metadata::write_resource_manifest(
                &build_dir.join(ctx.profile.metadata_file),
                &branding,
            )
            .await
        }
        MetadataFormat::LauncherScript => {
            let product = ctx.product_name()?;
            metadata::write_launcher(build_dir, &product, ctx.profile.executable).await?;
            Ok(())
        }
    }
}

async fn replace_icon(ctx: &mut BuildContext) -> BuildResult<()> {
    let (Some(slot), Some(icon)) = (
        ctx.profile.icon_slot,
        ctx.options.icon_for(&ctx.profile.platform),
    ) else {
        return Ok(());
    };

    if !tokio::fs::try_exists(icon).await.io_ctx("stat", icon)? {
        return Err(BuildError::not_found("icon", icon));
    }
    fs_ops::copy_file_over(icon, &ctx.build_dir()?.join(slot)).await
}

async fn rename_bundle(ctx: &mut BuildContext) -> BuildResult<()> {
    let Some(rename) = ctx.profile.rename else {
        return Ok(());
    };

    let build_dir = ctx.build_dir()?;
    let from = build_dir.join(rename.from);
    let to = build_dir.join(format!("{}.{}", ctx.product_name()?, rename.extension));

    if from != to {
        tokio::fs::rename(&from, &to)
            .await
            .io_ctx("rename", &from)?;
    }
    info!("Bundle at {}", to.display());
    ctx.set_bundle_path(to);
    Ok(())
}
