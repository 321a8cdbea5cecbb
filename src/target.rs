//! Build targets: (platform, architecture) pairs and the CLI token table

use std::fmt;

use log::warn;
use once_cell::sync::OnceCell;

/// Normalized platform identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Platform {
    Darwin,
    Windows,
    Linux,
    /// Host OS with no runtime distribution (e.g. `freebsd`)
    Unsupported(String),
}

impl Platform {
    /// Map a `std::env::consts::OS` value to a platform
    pub fn from_os(os: &str) -> Self {
        match os {
            "macos" => Platform::Darwin,
            "windows" => Platform::Windows,
            "linux" => Platform::Linux,
            other => Platform::Unsupported(other.to_string()),
        }
    }

    /// Normalized identifier used for pipeline dispatch
    pub fn id(&self) -> &str {
        match self {
            Platform::Darwin => "darwin",
            Platform::Windows => "win32",
            Platform::Linux => "linux",
            Platform::Unsupported(os) => os,
        }
    }

    /// Short token used in runtime archive names
    pub fn dist_token(&self) -> &str {
        match self {
            Platform::Darwin => "osx",
            Platform::Windows => "win",
            Platform::Linux => "linux",
            Platform::Unsupported(os) => os,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// CPU architecture of a runtime distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86,
    X64,
    Arm64,
}

impl Arch {
    /// Map a `std::env::consts::ARCH` value to an architecture
    pub fn from_host(arch: &str) -> Option<Self> {
        match arch {
            "x86" => Some(Arch::X86),
            "x86_64" => Some(Arch::X64),
            "aarch64" => Some(Arch::Arm64),
            _ => None,
        }
    }

    /// Token used in runtime archive names
    pub fn dist_token(&self) -> &'static str {
        match self {
            Arch::X86 => "ia32",
            Arch::X64 => "x64",
            Arch::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dist_token())
    }
}

/// Immutable (platform, architecture) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub platform: Platform,
    pub arch: Arch,
}

/// Host detection result, computed once
static HOST_TARGET: OnceCell<Target> = OnceCell::new();

impl Target {
    pub fn new(platform: Platform, arch: Arch) -> Self {
        Self { platform, arch }
    }

    /// Target describing the machine we are running on
    ///
    /// Unknown architectures fall back to x64; unknown operating systems are
    /// kept as [`Platform::Unsupported`] so dispatch can reject them.
    pub fn host() -> Self {
        HOST_TARGET
            .get_or_init(|| {
                let arch = Arch::from_host(std::env::consts::ARCH).unwrap_or_else(|| {
                    warn!(
                        "Unknown host architecture {}, assuming x64",
                        std::env::consts::ARCH
                    );
                    Arch::X64
                });
                Target::new(Platform::from_os(std::env::consts::OS), arch)
            })
            .clone()
    }

    /// Canonical build name, e.g. `osx-x64`
    pub fn name(&self) -> String {
        format!("{}-{}", self.platform.dist_token(), self.arch.dist_token())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Fixed CLI vocabulary of platform tokens
const PLATFORM_TOKENS: &[(&str, Platform, Arch)] = &[
    ("win32", Platform::Windows, Arch::X86),
    ("win64", Platform::Windows, Arch::X64),
    ("linux32", Platform::Linux, Arch::X86),
    ("linux64", Platform::Linux, Arch::X64),
    ("osx32", Platform::Darwin, Arch::X86),
    ("osx64", Platform::Darwin, Arch::X64),
    ("osxarm64", Platform::Darwin, Arch::Arm64),
];

/// Look up a single platform token
pub fn lookup_token(token: &str) -> Option<Target> {
    PLATFORM_TOKENS
        .iter()
        .find(|(name, _, _)| *name == token)
        .map(|(_, platform, arch)| Target::new(platform.clone(), *arch))
}

/// A platform token that is not in the fixed vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedToken(pub String);

impl fmt::Display for UnrecognizedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized platform `{}`", self.0)
    }
}

/// Parsed platform list
#[derive(Debug, Clone, Default)]
pub struct PlatformList {
    pub targets: Vec<Target>,
    pub unrecognized: Vec<UnrecognizedToken>,
}

/// Parse a comma-separated platform list
///
/// Unknown tokens are warned about once each and skipped. An absent or empty
/// list yields the host target.
pub fn parse_platform_list(list: Option<&str>) -> PlatformList {
    let mut parsed = PlatformList::default();

    let tokens = list
        .into_iter()
        .flat_map(|l| l.split(','))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    for token in tokens {
        match lookup_token(token) {
            Some(target) => parsed.targets.push(target),
            None => {
                let unknown = UnrecognizedToken(token.to_string());
                warn!("{unknown}, skipping");
                parsed.unrecognized.push(unknown);
            }
        }
    }

    if parsed.targets.is_empty() && parsed.unrecognized.is_empty() {
        parsed.targets.push(Target::host());
    }

    parsed
}
