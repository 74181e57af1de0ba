//! Format conversion collaborator
//!
//! Conversion engines are opaque services to the pipeline: they get a path
//! and transcode the file in place.

use crate::error::{MediaripError, Result};
use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Transcodes a file in place
#[async_trait]
pub trait Converter: Send + Sync + Debug {
    /// Convert the file at `path`, replacing it
    async fn convert(&self, path: &Path) -> Result<()>;

    /// Converter name (for logging)
    fn name(&self) -> &'static str;
}

/// Lossless FLAC conversion through an `ffmpeg` executable
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    binary: PathBuf,
}

impl FfmpegConverter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn temp_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".converting.flac");
        path.with_file_name(name)
    }
}

impl Default for FfmpegConverter {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    async fn convert(&self, path: &Path) -> Result<()> {
        let temp = Self::temp_path(path);
        debug!("Converting {} to FLAC via {}", path.display(), temp.display());

        let output = Command::new(&self.binary)
            .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
            .arg(path)
            .args(["-map", "0:a", "-c:a", "flac"])
            .arg(&temp)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                MediaripError::Conversion(format!("failed to run {}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(MediaripError::Conversion(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        tokio::fs::rename(&temp, path).await?;
        info!("Converted {} to FLAC", path.display());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg-flac"
    }
}
