use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// What to do when codec injection finds no library to replace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodecPolicy {
    /// Log a warning and leave the runtime tree as copied
    #[default]
    BestEffort,
    /// Fail the pipeline with `NotFound`
    Strict,
}

/// Builder configuration, read from `nwbuilder.toml`
///
/// Every key is optional; missing keys take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Runtime download mirror
    pub mirror: String,
    /// Prebuilt codec release mirror
    pub codec_mirror: String,
    /// Version list used to resolve `latest` / `stable`
    pub versions_url: String,
    /// Where extracted runtimes are cached (defaults to the user cache dir)
    pub cache_dir: Option<PathBuf>,
    /// Namespace for synthesized bundle identifiers
    pub identifier_prefix: String,
    /// Dependency install command run in production mode
    pub install_command: Vec<String>,
    pub codec_policy: CodecPolicy,
    /// Settling delay before a detached run reports success
    pub detach_settle_ms: u64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            mirror: "https://dl.nwjs.io".into(),
            codec_mirror:
                "https://github.com/nwjs-ffmpeg-prebuilt/nwjs-ffmpeg-prebuilt/releases/download"
                    .into(),
            versions_url: "https://nwjs.io/versions.json".into(),
            cache_dir: None,
            identifier_prefix: "io.nwjs-builder".into(),
            install_command: vec!["npm".into(), "install".into()],
            codec_policy: CodecPolicy::BestEffort,
            detach_settle_ms: 1000,
        }
    }
}

impl BuilderConfig {
    /// Load configuration from an explicit path, the user config dir, or defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// `<config dir>/nwbuilder/nwbuilder.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("nwbuilder").join("nwbuilder.toml"))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg: BuilderConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Using config from: {}", path.display());
        Ok(cfg)
    }

    /// Directory holding extracted runtimes
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("nwbuilder")
        })
    }
}
