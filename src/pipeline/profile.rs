//! Per-platform capability descriptors
//!
//! One [`PlatformProfile`] per supported platform tells the shared pipeline
//! where things live inside a runtime distribution and which optional stages
//! apply.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{BuildError, BuildResult};
use crate::target::Platform;

/// How platform metadata is branded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataFormat {
    /// Patch the bundle's `Info.plist`
    PropertyList,
    /// Write a side-by-side assembly manifest next to the executable
    ResourceManifest,
    /// Write a shell launcher named after the application
    LauncherScript,
}

/// Where a runtime distribution keeps the pieces the pipeline touches
#[derive(Debug)]
pub struct PlatformProfile {
    pub platform: Platform,
    /// Locale resources dropped while copying the runtime
    pub locale_filter: Option<&'static Lazy<Regex>>,
    /// File name of the replaceable codec library
    pub codec_library: &'static str,
    /// Directory the application is embedded into, relative to the build dir
    pub app_dir: &'static str,
    pub metadata: MetadataFormat,
    /// Metadata file, relative to the build dir
    pub metadata_file: &'static str,
    /// Icon destination, relative to the build dir
    pub icon_slot: Option<&'static str>,
    /// Bundle renamed to `<name>.<ext>` at the end of the build
    pub rename: Option<BundleRename>,
    /// Runtime executable, relative to the runtime root
    pub executable: &'static str,
}

/// Rename policy for bundle-style platforms
#[derive(Debug, Clone, Copy)]
pub struct BundleRename {
    pub from: &'static str,
    pub extension: &'static str,
}

static DARWIN_LOCALES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^nwjs\.app/Contents/Resources/[A-Za-z0-9_]+\.lproj(/|$)")
        .expect("locale pattern is valid")
});

static DARWIN: PlatformProfile = PlatformProfile {
    platform: Platform::Darwin,
    locale_filter: Some(&DARWIN_LOCALES),
    codec_library: "libffmpeg.dylib",
    app_dir: "nwjs.app/Contents/Resources/app.nw",
    metadata: MetadataFormat::PropertyList,
    metadata_file: "nwjs.app/Contents/Info.plist",
    icon_slot: Some("nwjs.app/Contents/Resources/app.icns"),
    rename: Some(BundleRename {
        from: "nwjs.app",
        extension: "app",
    }),
    executable: "nwjs.app/Contents/MacOS/nwjs",
};

static WINDOWS: PlatformProfile = PlatformProfile {
    platform: Platform::Windows,
    locale_filter: None,
    codec_library: "ffmpeg.dll",
    app_dir: "package.nw",
    metadata: MetadataFormat::ResourceManifest,
    metadata_file: "nw.exe.manifest",
    icon_slot: Some("app.ico"),
    rename: None,
    executable: "nw.exe",
};

static LINUX: PlatformProfile = PlatformProfile {
    platform: Platform::Linux,
    locale_filter: None,
    codec_library: "libffmpeg.so",
    app_dir: "package.nw",
    metadata: MetadataFormat::LauncherScript,
    // Launcher name is derived from the application name
    metadata_file: "",
    icon_slot: None,
    rename: None,
    executable: "nw",
};

impl PlatformProfile {
    /// Profile for a normalized platform, or `UnsupportedPlatform`
    pub fn for_platform(platform: &Platform) -> BuildResult<&'static PlatformProfile> {
        match platform {
            Platform::Darwin => Ok(&DARWIN),
            Platform::Windows => Ok(&WINDOWS),
            Platform::Linux => Ok(&LINUX),
            Platform::Unsupported(id) => Err(BuildError::UnsupportedPlatform(id.clone())),
        }
    }

    /// Pattern matching the codec library anywhere in a runtime tree
    pub fn codec_pattern(&self) -> Regex {
        Regex::new(&format!(r"(^|/){}$", regex::escape(self.codec_library)))
            .expect("escaped file name is a valid pattern")
    }
}
