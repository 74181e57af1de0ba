//! Downloadables - one fetchable, possibly encrypted, media stream
//!
//! A client hands out a [`Downloadable`] already carrying everything needed
//! to fetch and decrypt its stream. The caller only picks a path and a
//! progress callback. Progress is always reported in raw network bytes.

mod basic;
mod deezer;
mod soundcloud;

pub use basic::*;
pub use deezer::*;
pub use soundcloud::*;

use crate::download::content_length;
use crate::error::Result;
use crate::session::Session;
use mediarip_types::Source;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// State every downloadable variant carries
#[derive(Debug)]
pub struct Resource {
    session: Session,
    url: String,
    extension: String,
    source: Source,
    /// Byte length, supplied up front or filled by the first probe
    size: Mutex<Option<u64>>,
}

impl Resource {
    pub fn new(
        session: Session,
        url: impl Into<String>,
        extension: impl Into<String>,
        source: Source,
        size: Option<u64>,
    ) -> Self {
        Self {
            session,
            url: url.into(),
            extension: extension.into(),
            source,
            size: Mutex::new(size),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Cached length, or a HEAD probe whose result is cached
    ///
    /// The lock is held across the probe, so concurrent first calls
    /// issue a single request.
    pub async fn size(&self) -> Result<u64> {
        let mut cached = self.size.lock().await;
        if let Some(size) = *cached {
            return Ok(size);
        }

        debug!("Probing size of {}", self.url);
        let response = self
            .session
            .client()
            .head(&self.url)
            .send()
            .await?
            .error_for_status()?;

        let size = content_length(response.headers());
        *cached = Some(size);
        Ok(size)
    }

    pub(crate) async fn set_size(&self, size: u64) {
        *self.size.lock().await = Some(size);
    }
}

/// A media stream from one of the supported backends
#[derive(Debug)]
pub enum Downloadable {
    Basic(BasicDownloadable),
    Deezer(DeezerDownloadable),
    Soundcloud(SoundcloudDownloadable),
}

impl Downloadable {
    fn resource(&self) -> &Resource {
        match self {
            Downloadable::Basic(d) => &d.resource,
            Downloadable::Deezer(d) => &d.resource,
            Downloadable::Soundcloud(d) => &d.resource,
        }
    }

    pub fn url(&self) -> &str {
        self.resource().url()
    }

    /// File extension the downloaded file should carry (without the dot)
    pub fn extension(&self) -> &str {
        self.resource().extension()
    }

    pub fn source(&self) -> Source {
        self.resource().source()
    }

    /// Byte length of the stream
    pub async fn size(&self) -> Result<u64> {
        self.resource().size().await
    }

    /// Write the stream to `path`, decrypting if the backend requires it
    ///
    /// `callback` receives the number of raw bytes read from the network
    /// for every block processed.
    pub async fn download<F>(&self, path: impl AsRef<Path>, mut callback: F) -> Result<()>
    where
        F: FnMut(u64) + Send,
    {
        let path = path.as_ref();
        info!(
            "Downloading {} stream {} to {}",
            self.source(),
            self.url(),
            path.display()
        );

        match self {
            Downloadable::Basic(d) => d.download(path, &mut callback).await,
            Downloadable::Deezer(d) => d.download(path, &mut callback).await,
            Downloadable::Soundcloud(d) => d.download(path, &mut callback).await,
        }
    }
}

impl From<BasicDownloadable> for Downloadable {
    fn from(d: BasicDownloadable) -> Self {
        Downloadable::Basic(d)
    }
}

impl From<DeezerDownloadable> for Downloadable {
    fn from(d: DeezerDownloadable) -> Self {
        Downloadable::Deezer(d)
    }
}

impl From<SoundcloudDownloadable> for Downloadable {
    fn from(d: SoundcloudDownloadable) -> Self {
        Downloadable::Soundcloud(d)
    }
}
