//! Shared helpers for pipeline integration tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use nwbuilder::error::{BuildError, BuildResult};
use nwbuilder::provider::{
    BinaryProvider, CodecProvider, ResolvedVersion, RuntimeRequest, VersionResolver,
    VersionSelector, VersionSpec,
};
use nwbuilder::{Arch, BuilderConfig, Builder, Platform, Target};
use tempfile::TempDir;
use walkdir::WalkDir;

pub const RUNTIME_VERSION: &str = "0.14.7";
pub const STOCK_CODEC: &[u8] = b"stock codec";
pub const FULL_CODEC: &[u8] = b"full codec with proprietary decoders";

pub const INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>CFBundleDisplayName</key>
  <string>nwjs</string>
  <key>CFBundleExecutable</key>
  <string>nwjs</string>
  <key>CFBundleIdentifier</key>
  <string>io.nwjs.nwjs</string>
  <key>CFBundleName</key>
  <string>nwjs</string>
  <key>CFBundleVersion</key>
  <string>2743.116</string>
</dict>
</plist>
"#;

pub fn osx64() -> Target {
    Target::new(Platform::Darwin, Arch::X64)
}

pub fn win32() -> Target {
    Target::new(Platform::Windows, Arch::X86)
}

pub fn linux64() -> Target {
    Target::new(Platform::Linux, Arch::X64)
}

/// Write a file, creating parent directories.
pub fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

#[cfg(unix)]
fn write_executable(path: &Path, script: &str) {
    use std::os::unix::fs::PermissionsExt;
    write(path, script.as_bytes());
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(not(unix))]
fn write_executable(path: &Path, script: &str) {
    write(path, script.as_bytes());
}

/// Local stand-in for the download mirrors.
///
/// Runtime trees are synthesized on first fetch; every fetch is recorded.
#[derive(Clone)]
pub struct FakeProvider {
    root: PathBuf,
    codec: Option<Vec<u8>>,
    runtime_codec: bool,
    exit_code: i32,
    fetches: Arc<Mutex<Vec<Target>>>,
}

impl FakeProvider {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            codec: Some(FULL_CODEC.to_vec()),
            runtime_codec: true,
            exit_code: 0,
            fetches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Codec provider returns an archive without the library.
    pub fn without_supplied_codec(mut self) -> Self {
        self.codec = None;
        self
    }

    /// Runtime trees ship without a codec library.
    pub fn without_runtime_codec(mut self) -> Self {
        self.runtime_codec = false;
        self
    }

    /// Exit code of the fake runtime executable.
    pub fn exiting_with(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn fetches(&self) -> Vec<Target> {
        self.fetches.lock().unwrap().clone()
    }

    fn codec_library(platform: &Platform) -> &'static str {
        match platform {
            Platform::Darwin => "libffmpeg.dylib",
            Platform::Windows => "ffmpeg.dll",
            _ => "libffmpeg.so",
        }
    }

    fn populate(&self, dir: &Path, target: &Target) {
        let script = format!("#!/bin/sh\nexit {}\n", self.exit_code);
        match target.platform {
            Platform::Darwin => {
                let contents = dir.join("nwjs.app/Contents");
                write(&contents.join("Info.plist"), INFO_PLIST.as_bytes());
                write_executable(&contents.join("MacOS/nwjs"), &script);
                write(&contents.join("Resources/en.lproj/InfoPlist.strings"), b"en");
                write(&contents.join("Resources/zh_CN.lproj/InfoPlist.strings"), b"zh");
                write(&contents.join("Resources/nw.icns"), b"stock icon");

                let framework = contents.join("Frameworks/nwjs Framework.framework");
                if self.runtime_codec {
                    write(&framework.join("Versions/A/libffmpeg.dylib"), STOCK_CODEC);
                } else {
                    write(&framework.join("Versions/A/nwjs Framework"), b"framework");
                }
                #[cfg(unix)]
                std::os::unix::fs::symlink("A", framework.join("Versions/Current")).unwrap();
            }
            Platform::Windows => {
                write_executable(&dir.join("nw.exe"), &script);
                write(&dir.join("locales/en-US.pak"), b"en");
                if self.runtime_codec {
                    write(&dir.join("ffmpeg.dll"), STOCK_CODEC);
                }
            }
            _ => {
                write_executable(&dir.join("nw"), &script);
                write(&dir.join("locales/en-US.pak"), b"en");
                if self.runtime_codec {
                    write(&dir.join("lib/libffmpeg.so"), STOCK_CODEC);
                }
            }
        }
    }
}

impl VersionResolver for FakeProvider {
    async fn resolve(&self, spec: &VersionSpec) -> BuildResult<ResolvedVersion> {
        let version = match &spec.selector {
            VersionSelector::Exact(v) => v.clone(),
            _ => RUNTIME_VERSION.to_string(),
        };
        Ok(ResolvedVersion {
            version,
            flavor: spec.flavor,
        })
    }
}

impl BinaryProvider for FakeProvider {
    async fn fetch_runtime(&self, request: &RuntimeRequest) -> BuildResult<PathBuf> {
        self.fetches.lock().unwrap().push(request.target.clone());
        let dir = self
            .root
            .join(format!("nwjs-v{}-{}", request.version, request.target.name()));
        if !dir.exists() {
            self.populate(&dir, &request.target);
        }
        Ok(dir)
    }
}

impl CodecProvider for FakeProvider {
    async fn fetch_codec(
        &self,
        scratch_dir: &Path,
        _version: &str,
        target: &Target,
    ) -> BuildResult<PathBuf> {
        if let Some(codec) = &self.codec {
            write(
                &scratch_dir.join(Self::codec_library(&target.platform)),
                codec,
            );
        }
        Ok(scratch_dir.to_path_buf())
    }
}

/// Isolated workspace: application source, runtime cache and output dir.
pub struct TestEnv {
    pub temp: TempDir,
}

impl TestEnv {
    /// Application `{name: "Demo", version: "1.2.3"}` with a dependency tree.
    pub fn new() -> Self {
        let env = Self {
            temp: TempDir::new().unwrap(),
        };
        env.write_app(r#"{"name":"Demo","version":"1.2.3","main":"index.html"}"#);
        write(&env.app_dir().join("index.html"), b"<h1>Demo</h1>");
        write(
            &env.app_dir().join("node_modules/left-pad/index.js"),
            b"module.exports = 0;",
        );
        env
    }

    pub fn write_app(&self, package_json: &str) {
        write(&self.app_dir().join("package.json"), package_json.as_bytes());
    }

    pub fn app_dir(&self) -> PathBuf {
        self.temp.path().join("app")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.temp.path().join("out")
    }

    pub fn runtime_root(&self) -> PathBuf {
        self.temp.path().join("runtimes")
    }

    pub fn provider(&self) -> FakeProvider {
        FakeProvider::new(&self.runtime_root())
    }

    pub fn config(&self) -> BuilderConfig {
        BuilderConfig {
            cache_dir: Some(self.temp.path().join("cache")),
            ..BuilderConfig::default()
        }
    }

    pub fn builder(
        &self,
        provider: &FakeProvider,
        config: BuilderConfig,
    ) -> Builder<FakeProvider, FakeProvider, FakeProvider> {
        Builder::new(provider.clone(), provider.clone(), provider.clone(), config)
    }
}

/// Sorted `(relative path, content)` listing of a tree.
///
/// Directories list as `<dir>`, symlinks as `-> target`.
pub fn snapshot(root: &Path) -> Vec<(String, Vec<u8>)> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|e| e.unwrap())
        .map(|e| {
            let rel = e
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .into_owned();
            let content = if e.file_type().is_symlink() {
                format!("-> {}", std::fs::read_link(e.path()).unwrap().display()).into_bytes()
            } else if e.file_type().is_dir() {
                b"<dir>".to_vec()
            } else {
                std::fs::read(e.path()).unwrap()
            };
            (rel, content)
        })
        .collect()
}

/// Top-level entry names of a directory, sorted.
pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn is_not_found(err: &BuildError) -> bool {
    matches!(err, BuildError::NotFound { .. })
}
