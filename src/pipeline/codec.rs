//! Codec library replacement, shared by the build and run pipelines

use std::path::{Path, PathBuf};

use log::{info, warn};

use super::profile::PlatformProfile;
use crate::config::CodecPolicy;
use crate::error::{BuildError, BuildResult, IoContext};
use crate::fs_ops;
use crate::provider::CodecProvider;
use crate::target::Target;

/// Overwrite the runtime's codec library under `root` with the provider's
///
/// Returns the replaced file, or `None` when the runtime tree has no codec
/// library and `policy` is best-effort.
pub async fn inject_codec<C: CodecProvider>(
    codecs: &C,
    root: &Path,
    version: &str,
    target: &Target,
    profile: &PlatformProfile,
    policy: CodecPolicy,
) -> BuildResult<Option<PathBuf>> {
    let scratch = tempfile::tempdir().io_ctx("create directory", &std::env::temp_dir())?;
    let codec_dir = codecs.fetch_codec(scratch.path(), version, target).await?;

    let supplied = codec_dir.join(profile.codec_library);
    if !tokio::fs::try_exists(&supplied)
        .await
        .io_ctx("stat", &supplied)?
    {
        return Err(BuildError::not_found("codec library", supplied));
    }

    let found = fs_ops::find_files(root, profile.codec_pattern()).await?;
    let Some(existing) = found.into_iter().next() else {
        let missing = root.join(profile.codec_library);
        return match policy {
            CodecPolicy::Strict => Err(BuildError::not_found("runtime codec library", missing)),
            CodecPolicy::BestEffort => {
                warn!(
                    "No {} under {}, leaving runtime codec untouched",
                    profile.codec_library,
                    root.display()
                );
                Ok(None)
            }
        };
    };

    fs_ops::copy_file_over(&supplied, &existing).await?;
    info!("Replaced {}", existing.display());
    Ok(Some(existing))
}
