use super::Resource;
use crate::download::download_url;
use crate::error::Result;
use crate::session::Session;
use mediarip_types::Source;
use std::path::Path;

/// Plain URL with no backend-specific handling (cover art, unencrypted files)
#[derive(Debug)]
pub struct BasicDownloadable {
    pub(super) resource: Resource,
}

impl BasicDownloadable {
    pub fn new(
        session: Session,
        url: impl Into<String>,
        extension: impl Into<String>,
        source: Source,
    ) -> Self {
        Self {
            resource: Resource::new(session, url, extension, source, None),
        }
    }

    /// Same as [`BasicDownloadable::new`] with the length already known
    pub fn with_size(
        session: Session,
        url: impl Into<String>,
        extension: impl Into<String>,
        source: Source,
        size: u64,
    ) -> Self {
        Self {
            resource: Resource::new(session, url, extension, source, Some(size)),
        }
    }

    pub(super) async fn download<F>(&self, path: &Path, callback: &mut F) -> Result<()>
    where
        F: FnMut(u64) + Send,
    {
        let resource = &self.resource;
        download_url(resource.session(), resource.url(), None, path, callback).await?;
        Ok(())
    }
}
