use super::Resource;
use crate::converter::{Converter, FfmpegConverter};
use crate::download::download_url;
use crate::error::Result;
use crate::session::Session;
use mediarip_types::Source;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Declared type of an uploader's original file
pub const ORIGINAL_FILE_TYPE: &str = "original";

/// Download descriptor resolved by the SoundCloud client
#[derive(Debug, Clone)]
pub struct SoundcloudDownloadInfo {
    pub url: String,
    /// `mp3` for transcoded streams, `original` for uploaded files
    pub file_type: String,
}

/// SoundCloud stream, plain bytes with an optional conversion afterwards
#[derive(Debug)]
pub struct SoundcloudDownloadable {
    pub(super) resource: Resource,
    file_type: String,
    converter: Arc<dyn Converter>,
}

impl SoundcloudDownloadable {
    pub fn new(session: Session, info: SoundcloudDownloadInfo) -> Self {
        let extension = if info.file_type == "mp3" { "mp3" } else { "flac" };
        Self {
            resource: Resource::new(session, info.url, extension, Source::Soundcloud, None),
            file_type: info.file_type,
            converter: Arc::new(FfmpegConverter::default()),
        }
    }

    /// Use `converter` for original uploads instead of ffmpeg
    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn file_type(&self) -> &str {
        &self.file_type
    }

    pub(super) async fn download<F>(&self, path: &Path, callback: &mut F) -> Result<()>
    where
        F: FnMut(u64) + Send,
    {
        let resource = &self.resource;
        download_url(resource.session(), resource.url(), None, path, callback).await?;

        if self.file_type == ORIGINAL_FILE_TYPE {
            info!(
                "Converting original upload {} with {}",
                path.display(),
                self.converter.name()
            );
            self.converter.convert(path).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downloadable(file_type: &str) -> SoundcloudDownloadable {
        SoundcloudDownloadable::new(
            Session::new(None, true).unwrap(),
            SoundcloudDownloadInfo {
                url: "https://cf-media.sndcdn.com/abc.128.mp3".to_string(),
                file_type: file_type.to_string(),
            },
        )
    }

    #[test]
    fn extension_follows_declared_type() {
        assert_eq!(downloadable("mp3").resource.extension(), "mp3");
        assert_eq!(downloadable("original").resource.extension(), "flac");
        assert_eq!(downloadable("wav").resource.extension(), "flac");
        assert_eq!(downloadable("original").resource.source(), Source::Soundcloud);
    }
}
