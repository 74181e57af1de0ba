//! Backend clients
//!
//! Every backend implements [`Client`]. A client owns exactly one
//! [`Session`] and one [`RateLimiter`] for its whole lifetime; every
//! request it starts goes through the limiter first.

mod deezer;
mod soundcloud;

pub use deezer::*;
pub use soundcloud::*;

use crate::downloadable::Downloadable;
use crate::error::{MediaripError, Result};
use crate::rate_limiter::RateLimiter;
use crate::session::Session;
use async_trait::async_trait;
use mediarip_types::{MediaType, Settings, Source};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Default number of search results
pub const DEFAULT_SEARCH_LIMIT: usize = 500;

/// Operations every streaming backend provides
#[async_trait]
pub trait Client: Send + Sync {
    /// Backend this client talks to
    fn source(&self) -> Source;

    /// Highest quality tier the backend offers
    fn max_quality(&self) -> u8;

    fn logged_in(&self) -> bool;

    /// Establish an authenticated state
    ///
    /// Until this succeeds every other operation fails with `NotLoggedIn`.
    async fn login(&mut self) -> Result<()>;

    /// Fetch the metadata record of an item
    async fn get_metadata(&self, item_id: &str, media_type: MediaType) -> Result<Value>;

    /// Search the catalogue, returning at most `limit` results in backend order
    async fn search(&self, media_type: MediaType, query: &str, limit: usize) -> Result<Vec<Value>>;

    /// Resolve the stream of a track at (at most) `quality`
    async fn get_downloadable(&self, item_id: &str, quality: u8) -> Result<Downloadable>;
}

/// Build the client for `source` from settings (not logged in yet)
pub fn build_client(source: Source, settings: &Settings) -> Result<Box<dyn Client>> {
    match source {
        Source::Deezer => Ok(Box::new(DeezerClient::new(settings)?)),
        Source::Soundcloud => Ok(Box::new(SoundcloudClient::new(settings)?)),
        Source::Unknown => Err(MediaripError::Config(
            "no client exists for unknown sources".to_string(),
        )),
    }
}

/// Session plus limiter: the only way a client reaches the network
#[derive(Debug, Clone)]
pub struct Api {
    session: Session,
    limiter: RateLimiter,
}

impl Api {
    pub fn new(session: Session, limiter: RateLimiter) -> Self {
        Self { session, limiter }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn client(&self) -> &reqwest::Client {
        self.session.client()
    }

    /// Wait for a request slot, send, and fail on a non-success status
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.limiter.acquire().await;
        let response = request.send().await?;
        debug!("{} {}", response.status(), response.url());
        Ok(response.error_for_status()?)
    }

    /// Same as [`Api::send`], decoding the body as JSON
    pub async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Map a 404 transport error to `NotFound`, leaving everything else unchanged
pub(crate) fn not_found(error: MediaripError, what: impl FnOnce() -> String) -> MediaripError {
    match &error {
        MediaripError::Network(e) if e.status() == Some(StatusCode::NOT_FOUND) => {
            MediaripError::NotFound(what())
        }
        _ => error,
    }
}

/// Numbers some APIs send as strings ("12345") or as JSON numbers
pub(crate) fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Text form of an id that may be a JSON string or number
pub(crate) fn lenient_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
