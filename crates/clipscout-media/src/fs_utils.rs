//! Filesystem helpers for byte-stream inputs.
//!
//! The decoders work on files, so uploaded bytes are spooled to a temporary
//! file that lives as long as the returned handle.

use std::io::Write;
use std::path::Path;

use tempfile::{Builder, NamedTempFile};
use tracing::debug;

use crate::error::MediaResult;

/// Write `bytes` into a temporary file under `work_dir`.
///
/// The file is removed when the returned handle is dropped.
pub async fn spool_bytes(bytes: Vec<u8>, work_dir: impl AsRef<Path>) -> MediaResult<NamedTempFile> {
    let work_dir = work_dir.as_ref().to_path_buf();
    tokio::fs::create_dir_all(&work_dir).await?;

    let len = bytes.len();
    let file = tokio::task::spawn_blocking(move || -> MediaResult<NamedTempFile> {
        let mut file = Builder::new()
            .prefix("clipscout-")
            .suffix(".video")
            .tempfile_in(&work_dir)?;
        file.write_all(&bytes)?;
        file.flush()?;
        Ok(file)
    })
    .await
    .map_err(|e| crate::error::MediaError::internal(format!("spool task failed: {}", e)))??;

    debug!(path = %file.path().display(), bytes = len, "Spooled input video");
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spool_bytes_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = spool_bytes(vec![1, 2, 3, 4], dir.path()).await.unwrap();

        assert!(file.path().starts_with(dir.path()));
        let written = tokio::fs::read(file.path()).await.unwrap();
        assert_eq!(written, vec![1, 2, 3, 4]);

        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists());
    }
}
