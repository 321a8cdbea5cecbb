//! Archive extraction for runtime and codec downloads
//!
//! Handles the two formats the mirrors publish: `.zip` (macOS, Windows,
//! codecs) and `.tar.gz` (Linux).

use std::fs;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::{BuildError, BuildResult, IoContext};

/// Archive container format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
        }
    }
}

/// Extract `archive` into `dest` on the blocking pool
pub async fn extract_archive(archive: &Path, dest: &Path, format: ArchiveFormat) -> BuildResult<()> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    let err_path = archive.clone();

    tokio::task::spawn_blocking(move || match format {
        ArchiveFormat::Zip => extract_zip(&archive, &dest),
        ArchiveFormat::TarGz => extract_tar_gz(&archive, &dest),
    })
    .await
    .map_err(|e| BuildError::Io {
        op: "extract",
        path: err_path,
        source: std::io::Error::other(e),
    })?
}

fn extract_zip(zip_path: &Path, extract_dir: &Path) -> BuildResult<()> {
    let file = fs::File::open(zip_path).io_ctx("open archive", zip_path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| BuildError::parse(zip_path, e))?;

    fs::create_dir_all(extract_dir).io_ctx("create directory", extract_dir)?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| BuildError::parse(zip_path, e))?;

        // Entries escaping the extraction root are dropped
        let Some(relative) = file.enclosed_name() else {
            log::warn!("Skipping unsafe archive entry {}", file.name());
            continue;
        };
        let outpath = extract_dir.join(relative);

        if file.is_dir() {
            fs::create_dir_all(&outpath).io_ctx("create directory", &outpath)?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent).io_ctx("create directory", parent)?;
        }

        #[cfg(unix)]
        {
            if let Some(mode) = file.unix_mode()
                && mode & 0o170000 == 0o120000
            {
                // Symlink entries store their target as content
                let mut target = String::new();
                std::io::Read::read_to_string(&mut file, &mut target)
                    .io_ctx("read link", &outpath)?;
                let _ = fs::remove_file(&outpath);
                std::os::unix::fs::symlink(&target, &outpath)
                    .io_ctx("create symlink", &outpath)?;
                continue;
            }
        }

        let mut outfile = fs::File::create(&outpath).io_ctx("create file", &outpath)?;
        std::io::copy(&mut file, &mut outfile).io_ctx("write", &outpath)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode & 0o7777))
                    .io_ctx("set permissions", &outpath)?;
            }
        }
    }

    Ok(())
}

fn extract_tar_gz(tar_path: &Path, extract_dir: &Path) -> BuildResult<()> {
    let file = fs::File::open(tar_path).io_ctx("open archive", tar_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);
    fs::create_dir_all(extract_dir).io_ctx("create directory", extract_dir)?;
    archive.unpack(extract_dir).io_ctx("extract", tar_path)
}

/// Distributions wrap their contents in one top-level directory; return it
/// when present, otherwise the extraction root itself
pub fn single_root(extract_dir: &Path) -> BuildResult<PathBuf> {
    let mut dirs = Vec::new();
    let mut files = 0usize;
    for entry in fs::read_dir(extract_dir).io_ctx("read directory", extract_dir)? {
        let entry = entry.io_ctx("read directory", extract_dir)?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        if entry.file_type().io_ctx("stat", &entry.path())?.is_dir() {
            dirs.push(entry.path());
        } else {
            files += 1;
        }
    }

    match (dirs.as_slice(), files) {
        ([only], 0) => Ok(only.clone()),
        _ => Ok(extract_dir.to_path_buf()),
    }
}
