//! HTTP mirror for runtime distributions, codecs and the version list

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use super::extract::{ArchiveFormat, extract_archive, single_root};
use super::version::{ResolvedVersion, VersionSelector, VersionSpec};
use super::{BinaryProvider, CodecProvider, RuntimeRequest, VersionResolver};
use crate::config::BuilderConfig;
use crate::error::{BuildError, BuildResult, IoContext};
use crate::target::{Platform, Target};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30); // Initial connection
const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300); // 5 min no data
const USER_AGENT: &str = concat!("nwbuilder/", env!("CARGO_PKG_VERSION"));

/// Marker written once a cached runtime is fully extracted
const CACHE_COMPLETE_MARKER: &str = ".nwbuilder-complete";

/// `versions.json` as published by the mirror
#[derive(Deserialize, Debug)]
struct VersionList {
    latest: String,
    stable: String,
}

/// Downloads from the configured NW.js mirrors, caching extracted runtimes
#[derive(Debug, Clone)]
pub struct HttpMirror {
    mirror: String,
    codec_mirror: String,
    versions_url: String,
    cache_dir: PathBuf,
    client: reqwest::Client,
}

impl HttpMirror {
    pub fn new(config: &BuilderConfig) -> BuildResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BuildError::download(&config.mirror, e))?;

        Ok(Self {
            mirror: config.mirror.trim_end_matches('/').to_string(),
            codec_mirror: config.codec_mirror.trim_end_matches('/').to_string(),
            versions_url: config.versions_url.clone(),
            cache_dir: config.resolved_cache_dir(),
            client,
        })
    }

    /// Archive format the mirror publishes for a platform
    fn runtime_format(platform: &Platform) -> ArchiveFormat {
        match platform {
            Platform::Linux => ArchiveFormat::TarGz,
            _ => ArchiveFormat::Zip,
        }
    }

    /// Archive stem, e.g. `nwjs-sdk-v0.14.7-osx-x64`
    fn runtime_stem(request: &RuntimeRequest) -> String {
        format!(
            "nwjs{}-v{}-{}",
            request.flavor.archive_infix(),
            request.version,
            request.target.name()
        )
    }

    /// Stream `url` to `dest` with an inactivity timeout and a progress bar
    async fn download(&self, url: &str, dest: &Path) -> BuildResult<u64> {
        info!("Downloading {url}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BuildError::download(url, e))?;

        if !response.status().is_success() {
            return Err(BuildError::download(
                url,
                format!("HTTP {}", response.status()),
            ));
        }

        let total_bytes = response.content_length().unwrap_or(0);
        let progress = ProgressBar::new(total_bytes);
        if let Ok(style) =
            ProgressStyle::default_bar().template("   [{bar:40.cyan/blue}] {bytes}/{total_bytes}  {msg}")
        {
            progress.set_style(style.progress_chars("█▓░"));
        }
        progress.set_message(
            dest.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );

        let mut file = tokio::fs::File::create(dest)
            .await
            .io_ctx("create file", dest)?;
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;

        loop {
            let chunk = match timeout(INACTIVITY_TIMEOUT, stream.next()).await {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(e))) => {
                    progress.abandon();
                    return Err(BuildError::download(url, e));
                }
                Ok(None) => break,
                Err(_) => {
                    progress.abandon();
                    return Err(BuildError::download(
                        url,
                        format!(
                            "no data received for {} seconds after {downloaded} bytes",
                            INACTIVITY_TIMEOUT.as_secs()
                        ),
                    ));
                }
            };

            file.write_all(&chunk).await.io_ctx("write", dest)?;
            downloaded += chunk.len() as u64;
            progress.set_position(downloaded);
        }

        file.flush().await.io_ctx("write", dest)?;
        progress.finish_and_clear();
        debug!("Downloaded {downloaded} bytes to {}", dest.display());
        Ok(downloaded)
    }
}

impl VersionResolver for HttpMirror {
    async fn resolve(&self, spec: &VersionSpec) -> BuildResult<ResolvedVersion> {
        let version = match &spec.selector {
            VersionSelector::Exact(version) => version.clone(),
            selector => {
                let url = &self.versions_url;
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| BuildError::download(url, e))?;
                if !response.status().is_success() {
                    return Err(BuildError::download(
                        url,
                        format!("HTTP {}", response.status()),
                    ));
                }
                let list: VersionList = response
                    .json()
                    .await
                    .map_err(|e| BuildError::download(url, e))?;
                let raw = if *selector == VersionSelector::Stable {
                    list.stable
                } else {
                    list.latest
                };
                raw.trim_start_matches('v').to_string()
            }
        };

        Ok(ResolvedVersion {
            version,
            flavor: spec.flavor,
        })
    }
}

impl BinaryProvider for HttpMirror {
    async fn fetch_runtime(&self, request: &RuntimeRequest) -> BuildResult<PathBuf> {
        let stem = Self::runtime_stem(request);
        let cached = self.cache_dir.join(&stem);

        if tokio::fs::try_exists(cached.join(CACHE_COMPLETE_MARKER))
            .await
            .unwrap_or(false)
        {
            info!("Using cached runtime {stem}");
            return single_root(&cached);
        }

        let format = Self::runtime_format(&request.target.platform);
        let mirror = request
            .mirror
            .as_deref()
            .map(|m| m.trim_end_matches('/'))
            .unwrap_or(&self.mirror);
        let url = format!(
            "{mirror}/v{}/{stem}.{}",
            request.version,
            format.extension()
        );

        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .io_ctx("create directory", &self.cache_dir)?;

        // TempDir guard removes the archive and partial extraction on any failure
        let staging = tempfile::tempdir_in(&self.cache_dir).io_ctx("create directory", &self.cache_dir)?;
        let archive = staging.path().join(format!("{stem}.{}", format.extension()));
        self.download(&url, &archive).await?;

        let extracted = staging.path().join("extracted");
        extract_archive(&archive, &extracted, format).await?;
        tokio::fs::write(extracted.join(CACHE_COMPLETE_MARKER), b"")
            .await
            .io_ctx("write", &extracted)?;

        if tokio::fs::try_exists(&cached).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&cached)
                .await
                .io_ctx("remove directory", &cached)?;
        }
        tokio::fs::rename(&extracted, &cached)
            .await
            .io_ctx("rename", &extracted)?;

        single_root(&cached)
    }
}

impl CodecProvider for HttpMirror {
    async fn fetch_codec(
        &self,
        scratch_dir: &Path,
        version: &str,
        target: &Target,
    ) -> BuildResult<PathBuf> {
        let name = format!("{version}-{}", target.name());
        let url = format!("{}/{version}/{name}.zip", self.codec_mirror);
        let archive = scratch_dir.join(format!("{name}.zip"));

        self.download(&url, &archive).await?;
        extract_archive(&archive, scratch_dir, ArchiveFormat::Zip).await?;
        tokio::fs::remove_file(&archive)
            .await
            .io_ctx("remove file", &archive)?;

        Ok(scratch_dir.to_path_buf())
    }
}
