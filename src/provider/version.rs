//! Version spec parsing
//!
//! Accepted forms: `latest`, `stable`, `0.14.7`, `v0.14.7`, each with an
//! optional `-sdk` / `-normal` suffix (`latest-sdk`, `0.14.7-sdk`).

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::BuildError;

static EXACT_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^v?(\d+\.\d+\.\d+(?:-(?:alpha|beta|rc)\d*)?)$").expect("version pattern is valid")
});

/// Runtime build variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Flavor {
    #[default]
    Normal,
    Sdk,
}

impl Flavor {
    /// Archive name infix, e.g. `nwjs-sdk-v0.14.7-...`
    pub fn archive_infix(&self) -> &'static str {
        match self {
            Flavor::Normal => "",
            Flavor::Sdk => "-sdk",
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Flavor::Normal => "normal",
            Flavor::Sdk => "sdk",
        })
    }
}

/// Which version to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    Latest,
    Stable,
    Exact(String),
}

/// Parsed version spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpec {
    pub selector: VersionSelector,
    pub flavor: Flavor,
}

impl Default for VersionSpec {
    fn default() -> Self {
        Self {
            selector: VersionSelector::Latest,
            flavor: Flavor::Normal,
        }
    }
}

impl FromStr for VersionSpec {
    type Err = BuildError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        let (base, flavor) = if let Some(base) = trimmed.strip_suffix("-sdk") {
            (base, Flavor::Sdk)
        } else if let Some(base) = trimmed.strip_suffix("-normal") {
            (base, Flavor::Normal)
        } else {
            (trimmed, Flavor::Normal)
        };

        let selector = match base {
            "" | "latest" => VersionSelector::Latest,
            "stable" => VersionSelector::Stable,
            other => {
                let caps = EXACT_VERSION
                    .captures(other)
                    .ok_or_else(|| BuildError::InvalidVersion(raw.to_string()))?;
                VersionSelector::Exact(caps[1].to_string())
            }
        };

        Ok(Self { selector, flavor })
    }
}

/// Concrete version (without leading `v`) and flavor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub version: String,
    pub flavor: Flavor,
}

impl fmt::Display for ResolvedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{} ({})", self.version, self.flavor)
    }
}
