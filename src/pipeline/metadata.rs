//! Platform metadata branding: `Info.plist`, assembly manifest, launcher

use std::io::Cursor;
use std::path::{Path, PathBuf};

use log::debug;
use plist::Value;

use super::context::path_component;
use crate::error::{BuildError, BuildResult, IoContext};
use crate::fs_ops;
use crate::manifest::Manifest;
use crate::target::Arch;

/// Values stamped into platform metadata
#[derive(Debug, Clone)]
pub struct Branding<'a> {
    pub manifest: &'a Manifest,
    pub identifier: String,
    pub arch: Arch,
}

/// Rewrite the bundle identity keys of an `Info.plist`, saving it as XML
pub async fn patch_property_list(path: &Path, branding: &Branding<'_>) -> BuildResult<()> {
    if !tokio::fs::try_exists(path).await.io_ctx("stat", path)? {
        return Err(BuildError::not_found("property list", path));
    }
    let raw = tokio::fs::read(path).await.io_ctx("read", path)?;

    let patched = patch_property_list_bytes(path, &raw, branding)?;
    tokio::fs::write(path, patched).await.io_ctx("write", path)
}

fn patch_property_list_bytes(
    path: &Path,
    raw: &[u8],
    branding: &Branding<'_>,
) -> BuildResult<Vec<u8>> {
    let mut value = Value::from_reader(Cursor::new(raw)).map_err(|e| BuildError::parse(path, e))?;
    let dict = value
        .as_dictionary_mut()
        .ok_or_else(|| BuildError::parse(path, "root element is not a dictionary"))?;

    let name = &branding.manifest.name;
    let version = &branding.manifest.version;
    dict.insert("CFBundleDisplayName".into(), Value::String(name.clone()));
    dict.insert("CFBundleName".into(), Value::String(name.clone()));
    dict.insert("CFBundleVersion".into(), Value::String(version.clone()));
    dict.insert(
        "CFBundleShortVersionString".into(),
        Value::String(version.clone()),
    );
    dict.insert(
        "CFBundleIdentifier".into(),
        Value::String(branding.identifier.clone()),
    );

    let mut out = Vec::new();
    value
        .to_writer_xml(&mut out)
        .map_err(|e| BuildError::parse(path, e))?;
    Ok(out)
}

/// `1.2.3-beta.1` -> `1.2.3.0`
///
/// Non-numeric components become 0; extra components are dropped.
pub fn four_part_version(version: &str) -> String {
    let core = version.split(['-', '+']).next().unwrap_or_default();
    let mut parts: Vec<u32> = core
        .split('.')
        .take(4)
        .map(|p| {
            let digits: String = p.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        })
        .collect();
    parts.resize(4, 0);
    parts
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn processor_architecture(arch: Arch) -> &'static str {
    match arch {
        Arch::X86 => "x86",
        Arch::X64 => "amd64",
        Arch::Arm64 => "arm64",
    }
}

/// Side-by-side assembly manifest for the runtime executable
pub fn resource_manifest(branding: &Branding<'_>) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<assembly xmlns="urn:schemas-microsoft-com:asm.v1" manifestVersion="1.0">
  <assemblyIdentity type="win32" name="{name}" version="{version}" processorArchitecture="{arch}"/>
  <description>{description}</description>
</assembly>
"#,
        name = xml_escape(&branding.identifier),
        version = four_part_version(&branding.manifest.version),
        arch = processor_architecture(branding.arch),
        description = xml_escape(&branding.manifest.name),
    )
}

pub async fn write_resource_manifest(path: &Path, branding: &Branding<'_>) -> BuildResult<()> {
    tokio::fs::write(path, resource_manifest(branding))
        .await
        .io_ctx("write", path)
}

/// File name for the launcher; never collides with the runtime binary
pub fn launcher_name(product: &str, executable: &str) -> String {
    let name = path_component(product);
    if name == executable {
        format!("{name}-launcher")
    } else {
        name
    }
}

/// `/bin/sh` wrapper that execs the runtime binary next to it
pub fn launcher_script(executable: &str) -> String {
    format!(
        "#!/bin/sh\nHERE=\"$(dirname \"$(readlink -f \"$0\")\")\"\nexec \"$HERE/{executable}\" \"$@\"\n"
    )
}

pub async fn write_launcher(
    build_dir: &Path,
    product: &str,
    executable: &str,
) -> BuildResult<PathBuf> {
    let path = build_dir.join(launcher_name(product, executable));
    tokio::fs::write(&path, launcher_script(executable))
        .await
        .io_ctx("write", &path)?;
    fs_ops::make_executable(&path).await?;
    debug!("Wrote launcher {}", path.display());
    Ok(path)
}
