mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use nwbuilder::{
    BuildOptions, BuildRequest, Builder, BuilderConfig, CodecPolicy, HttpMirror, RunOutcome,
    RunPipeline, RunRequest, VersionSpec,
};

fn main() {
    // Info by default, RUST_LOG overrides
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    match rt.block_on(real_main()) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    }
}

/// Returns the process exit code
async fn real_main() -> Result<i32> {
    let args = cli::Args::parse();
    let mut config = BuilderConfig::load(args.config.as_deref())?;

    match args.sub {
        cli::Cmd::Build {
            path,
            version,
            platforms,
            output_dir,
            output_name,
            executable_name,
            with_ffmpeg,
            strict_codec,
            side_by_side,
            production,
            mac_icns,
            win_ico,
            mirror,
        } => {
            if strict_codec {
                config.codec_policy = CodecPolicy::Strict;
            }
            let request = BuildRequest {
                source_dir: path,
                version: parse_version(&version)?,
                platforms,
                mirror,
                options: BuildOptions {
                    output_dir,
                    output_name,
                    executable_name,
                    with_codec: with_ffmpeg,
                    side_by_side,
                    production,
                    mac_icns,
                    win_ico,
                },
            };
            handle_build(config, request).await
        }
        cli::Cmd::Run {
            args,
            version,
            with_ffmpeg,
            detached,
            mirror,
        } => {
            let request = RunRequest {
                args,
                version: parse_version(&version)?,
                mirror,
                with_codec: with_ffmpeg,
                detached,
            };
            handle_run(config, request).await
        }
    }
}

fn parse_version(raw: &str) -> Result<VersionSpec> {
    raw.parse()
        .with_context(|| format!("Failed to parse version `{raw}`"))
}

async fn handle_build(config: BuilderConfig, request: BuildRequest) -> Result<i32> {
    let mirror = HttpMirror::new(&config)?;
    let builder = Builder::new(mirror.clone(), mirror.clone(), mirror, config);

    let report = builder
        .build(&request)
        .await
        .with_context(|| format!("Build of {} failed", request.source_dir.display()))?;

    if report.outputs.is_empty() {
        warn!("No recognized platforms, nothing was built");
    }
    info!("All done.");
    Ok(0)
}

async fn handle_run(config: BuilderConfig, request: RunRequest) -> Result<i32> {
    let mirror = HttpMirror::new(&config)?;
    let outcome = RunPipeline::new(&mirror, &mirror, &mirror, &config)
        .run(&request)
        .await
        .context("Failed to run application")?;

    match outcome {
        RunOutcome::Exited(code) => Ok(code),
        RunOutcome::Detached { .. } => Ok(0),
    }
}
