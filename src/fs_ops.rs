//! Filesystem helpers shared by the build and run pipelines
//!
//! Tree walks and copies are blocking and run on tokio's blocking pool; each
//! helper is awaited to completion before the caller continues.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::{DirEntry, WalkDir};

use crate::error::{BuildError, BuildResult, IoContext};

/// Path of `path` relative to `root`, with `/` separators
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Some(parts.join("/"))
}

/// Run blocking filesystem work on the blocking pool
async fn run_blocking<T, F>(path: &Path, f: F) -> BuildResult<T>
where
    F: FnOnce() -> BuildResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BuildError::Io {
            op: "blocking task",
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })?
}

/// Ensure `path` exists and is an empty directory
///
/// Existing contents are discarded; the directory itself is kept so that
/// handles held by other tools stay valid.
pub async fn reset_dir(path: &Path) -> BuildResult<()> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => {
            let mut entries = tokio::fs::read_dir(path)
                .await
                .io_ctx("read directory", path)?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .io_ctx("read directory", path)?
            {
                let child = entry.path();
                let file_type = entry.file_type().await.io_ctx("stat", &child)?;
                if file_type.is_dir() {
                    tokio::fs::remove_dir_all(&child)
                        .await
                        .io_ctx("remove directory", &child)?;
                } else {
                    tokio::fs::remove_file(&child)
                        .await
                        .io_ctx("remove file", &child)?;
                }
            }
            Ok(())
        }
        Ok(_) => {
            tokio::fs::remove_file(path)
                .await
                .io_ctx("remove file", path)?;
            tokio::fs::create_dir_all(path)
                .await
                .io_ctx("create directory", path)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => tokio::fs::create_dir_all(path)
            .await
            .io_ctx("create directory", path),
        Err(e) => Err(BuildError::Io {
            op: "stat",
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Entries excluded from a tree copy
#[derive(Debug, Clone, Default)]
pub struct CopyFilter {
    /// Pattern matched against the `/`-separated path relative to the copy root
    exclude: Option<Regex>,
    /// Absolute subtree never entered (the destination, when nested in the source)
    skip: Option<PathBuf>,
}

impl CopyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude(mut self, pattern: Regex) -> Self {
        self.exclude = Some(pattern);
        self
    }

    pub fn skip(mut self, subtree: PathBuf) -> Self {
        self.skip = Some(subtree);
        self
    }

    fn allows(&self, root: &Path, entry: &DirEntry) -> bool {
        if let Some(skip) = &self.skip
            && entry.path().starts_with(skip)
        {
            return false;
        }

        match (&self.exclude, relative_slash_path(root, entry.path())) {
            (Some(pattern), Some(rel)) => !pattern.is_match(&rel),
            _ => true,
        }
    }
}

/// Recursively copy `src` into `dst`, returning the number of files copied
///
/// Excluded directories are pruned with their whole subtree. Symlinks are
/// recreated rather than followed so framework layouts survive the copy.
pub async fn copy_tree(src: &Path, dst: &Path, filter: CopyFilter) -> BuildResult<u64> {
    let src = src.to_path_buf();
    let dst = dst.to_path_buf();
    let err_path = src.clone();
    run_blocking(&err_path, move || copy_tree_blocking(&src, &dst, &filter)).await
}

fn copy_tree_blocking(src: &Path, dst: &Path, filter: &CopyFilter) -> BuildResult<u64> {
    if !src.is_dir() {
        return Err(BuildError::not_found("directory", src));
    }

    fs::create_dir_all(dst).io_ctx("create directory", dst)?;

    let mut copied = 0u64;
    let walker = WalkDir::new(src)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| filter.allows(src, e));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            BuildError::Io {
                op: "walk",
                path,
                source: e.into(),
            }
        })?;

        let Ok(rel) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).io_ctx("create directory", &target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).io_ctx("copy", entry.path())?;
            copied += 1;
        }
    }

    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> BuildResult<()> {
    let points_to = fs::read_link(link).io_ctx("read link", link)?;
    if fs::symlink_metadata(target).is_ok() {
        fs::remove_file(target).io_ctx("remove file", target)?;
    }
    std::os::unix::fs::symlink(&points_to, target).io_ctx("create symlink", target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> BuildResult<()> {
    // Without unix symlinks, materialize file links and drop directory links.
    let meta = fs::metadata(link).io_ctx("stat", link)?;
    if meta.is_dir() {
        log::warn!("Skipping directory link {}", link.display());
        return Ok(());
    }
    fs::copy(link, target).io_ctx("copy", link).map(|_| ())
}

/// Find regular files under `root` whose relative path matches `pattern`
///
/// Results follow a sorted walk so the first match is stable across runs.
pub async fn find_files(root: &Path, pattern: Regex) -> BuildResult<Vec<PathBuf>> {
    let root = root.to_path_buf();
    let err_path = root.clone();
    run_blocking(&err_path, move || {
        let mut found = Vec::new();
        for entry in WalkDir::new(&root).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| BuildError::Io {
                op: "walk",
                path: root.clone(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(rel) = relative_slash_path(&root, entry.path())
                && pattern.is_match(&rel)
            {
                found.push(entry.into_path());
            }
        }
        Ok(found)
    })
    .await
}

/// Copy a single file, replacing whatever is at `dst`
pub async fn copy_file_over(src: &Path, dst: &Path) -> BuildResult<()> {
    if let Some(parent) = dst.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .io_ctx("create directory", parent)?;
    }
    tokio::fs::copy(src, dst).await.io_ctx("copy", src)?;
    Ok(())
}

/// Mark a file as executable (`0o755`) on unix hosts
pub async fn make_executable(path: &Path) -> BuildResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut perms = tokio::fs::metadata(path)
            .await
            .io_ctx("stat", path)?
            .permissions();
        perms.set_mode(0o755);
        tokio::fs::set_permissions(path, perms)
            .await
            .io_ctx("set permissions", path)?;
    }

    #[cfg(not(unix))]
    {
        let _ = path;
    }

    Ok(())
}
