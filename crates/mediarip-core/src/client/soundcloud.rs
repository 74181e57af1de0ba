use super::{not_found, Api, Client};
use crate::converter::{Converter, FfmpegConverter};
use crate::downloadable::{
    Downloadable, SoundcloudDownloadInfo, SoundcloudDownloadable, ORIGINAL_FILE_TYPE,
};
use crate::error::{MediaripError, Result};
use crate::rate_limiter::RateLimiter;
use crate::session::Session;
use async_trait::async_trait;
use mediarip_types::{MediaType, Settings, Source, SoundcloudSettings};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Largest page the search endpoint serves
const MAX_PAGE_SIZE: usize = 200;

/// Base URL of the SoundCloud API
#[derive(Debug, Clone)]
pub struct SoundcloudEndpoints {
    pub api: String,
}

impl Default for SoundcloudEndpoints {
    fn default() -> Self {
        Self {
            api: "https://api-v2.soundcloud.com".to_string(),
        }
    }
}

/// SoundCloud backend, authenticated by a web client id
#[derive(Debug)]
pub struct SoundcloudClient {
    api: Api,
    settings: SoundcloudSettings,
    endpoints: SoundcloudEndpoints,
    converter: Arc<dyn Converter>,
    logged_in: bool,
}

impl SoundcloudClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_endpoints(settings, SoundcloudEndpoints::default())
    }

    pub fn with_endpoints(settings: &Settings, endpoints: SoundcloudEndpoints) -> Result<Self> {
        let session = Session::from_settings(&settings.session, None)?;
        Ok(Self {
            api: Api::new(session, RateLimiter::new(settings.downloads.requests_per_minute)),
            settings: settings.soundcloud.clone(),
            endpoints,
            converter: Arc::new(FfmpegConverter::default()),
            logged_in: false,
        })
    }

    /// Converter handed to downloadables of original uploads
    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = converter;
        self
    }

    fn ensure_logged_in(&self) -> Result<()> {
        if self.logged_in {
            Ok(())
        } else {
            Err(MediaripError::NotLoggedIn)
        }
    }

    /// GET `url` with the client credentials attached
    fn get(&self, url: &str) -> RequestBuilder {
        self.api.client().get(url).query(&[
            ("client_id", self.settings.client_id.as_str()),
            ("app_version", self.settings.app_version.as_str()),
        ])
    }

    async fn search_page(&self, url: &str, query: Option<(&str, usize)>) -> Result<Value> {
        let mut request = self.get(url);
        if let Some((q, page_size)) = query {
            request = request.query(&[
                ("q", q),
                ("limit", &page_size.to_string()),
                ("offset", "0"),
                ("linked_partitioning", "1"),
            ]);
        }
        self.api.json(request).await
    }

    /// Resolve a transcoding entry to its stream URL
    async fn resolve_transcoding(&self, transcoding_url: &str) -> Result<String> {
        let response: Value = self.api.json(self.get(transcoding_url)).await?;
        response["url"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| MediaripError::NotStreamable("Transcoding has no stream URL".into()))
    }

    async fn original_download(&self, track_id: &str) -> Result<SoundcloudDownloadInfo> {
        let url = format!("{}/tracks/{}/download", self.endpoints.api, track_id);
        let response: Value = self.api.json(self.get(&url)).await?;
        let redirect = response["redirectUri"]
            .as_str()
            .ok_or_else(|| MediaripError::NotStreamable("Download has no redirect".into()))?;

        Ok(SoundcloudDownloadInfo {
            url: redirect.to_string(),
            file_type: ORIGINAL_FILE_TYPE.to_string(),
        })
    }

    async fn progressive_download(&self, track: &Value) -> Result<SoundcloudDownloadInfo> {
        let transcodings = track["media"]["transcodings"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default();

        let progressive = transcodings
            .iter()
            .find(|t| t["format"]["protocol"].as_str() == Some("progressive"))
            .and_then(|t| t["url"].as_str());

        let Some(transcoding_url) = progressive else {
            let title = track["title"].as_str().unwrap_or("track");
            return Err(MediaripError::NotStreamable(format!(
                "{} is only available as an HLS stream",
                title
            )));
        };

        Ok(SoundcloudDownloadInfo {
            url: self.resolve_transcoding(transcoding_url).await?,
            file_type: "mp3".to_string(),
        })
    }
}

#[async_trait]
impl Client for SoundcloudClient {
    fn source(&self) -> Source {
        Source::Soundcloud
    }

    fn max_quality(&self) -> u8 {
        1
    }

    fn logged_in(&self) -> bool {
        self.logged_in
    }

    async fn login(&mut self) -> Result<()> {
        self.logged_in = false;
        if self.settings.client_id.is_empty() || self.settings.app_version.is_empty() {
            return Err(MediaripError::Authentication(
                "SoundCloud client_id and app_version must be configured".to_string(),
            ));
        }

        let url = format!("{}/search/tracks", self.endpoints.api);
        match self.search_page(&url, Some(("qwertyuiop", 1))).await {
            Ok(_) => {}
            Err(MediaripError::Network(e))
                if matches!(
                    e.status(),
                    Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
                ) =>
            {
                return Err(MediaripError::Authentication(
                    "SoundCloud rejected the client id".to_string(),
                ));
            }
            Err(e) => return Err(e),
        }

        self.logged_in = true;
        info!("Logged in to SoundCloud");
        Ok(())
    }

    async fn get_metadata(&self, item_id: &str, media_type: MediaType) -> Result<Value> {
        self.ensure_logged_in()?;
        let collection = match media_type {
            MediaType::Track => "tracks",
            MediaType::Playlist | MediaType::Album => "playlists",
            other => return Err(MediaripError::UnsupportedMediaType(other.to_string())),
        };

        let url = format!("{}/{}/{}", self.endpoints.api, collection, item_id);
        self.api
            .json(self.get(&url))
            .await
            .map_err(|e| not_found(e, || format!("soundcloud {} {}", media_type, item_id)))
    }

    async fn search(&self, media_type: MediaType, query: &str, limit: usize) -> Result<Vec<Value>> {
        self.ensure_logged_in()?;
        let collection = match media_type {
            MediaType::Track => "tracks",
            MediaType::Playlist => "playlists",
            MediaType::Album => "albums",
            MediaType::Artist => "users",
            other => return Err(MediaripError::UnsupportedMediaType(other.to_string())),
        };

        let mut results = Vec::new();
        if limit == 0 {
            return Ok(results);
        }

        let first = format!("{}/search/{}", self.endpoints.api, collection);
        let mut page = self
            .search_page(&first, Some((query, limit.min(MAX_PAGE_SIZE))))
            .await?;

        loop {
            let items = page["collection"].as_array().cloned().unwrap_or_default();
            if items.is_empty() {
                break;
            }
            results.extend(items.into_iter().take(limit - results.len()));

            let next = match page["next_href"].as_str() {
                Some(next) if results.len() < limit => next.to_string(),
                _ => break,
            };
            debug!("Following SoundCloud page {}", next);
            page = self.search_page(&next, None).await?;
        }

        debug!("SoundCloud search {:?} returned {} results", query, results.len());
        Ok(results)
    }

    async fn get_downloadable(&self, item_id: &str, quality: u8) -> Result<Downloadable> {
        self.ensure_logged_in()?;
        let track = self.get_metadata(item_id, MediaType::Track).await?;

        let wants_original = quality.min(self.max_quality()) >= 1;
        let downloadable = track["downloadable"].as_bool().unwrap_or(false)
            && track["has_downloads_left"].as_bool().unwrap_or(false);

        let info = if wants_original && downloadable {
            match self.original_download(item_id).await {
                Ok(info) => info,
                Err(e) => {
                    warn!("Original upload of {} unavailable ({}), using stream", item_id, e);
                    self.progressive_download(&track).await?
                }
            }
        } else {
            self.progressive_download(&track).await?
        };

        Ok(SoundcloudDownloadable::new(self.api.session().clone(), info)
            .with_converter(self.converter.clone())
            .into())
    }
}
