use super::{lenient_string, lenient_u64, not_found, Api, Client};
use crate::downloadable::{select_quality, DeezerDownloadInfo, DeezerDownloadable, Downloadable};
use crate::error::{MediaripError, Result};
use crate::rate_limiter::RateLimiter;
use crate::session::Session;
use async_trait::async_trait;
use mediarip_types::{DeezerSettings, MediaType, Settings, Source};
use serde_json::{json, Value};
use tracing::{debug, info};

/// Format names of the quality tiers, indexed by tier
pub const DEEZER_FORMATS: [&str; 3] = ["MP3_128", "MP3_320", "FLAC"];

const BOOTSTRAP_API_TOKEN: &str = "null";

/// Base URLs of the Deezer services
#[derive(Debug, Clone)]
pub struct DeezerEndpoints {
    /// Public REST API (metadata and search)
    pub api: String,
    /// Private gateway used by the web player
    pub gateway: String,
    /// Media server issuing stream URLs
    pub media: String,
}

impl Default for DeezerEndpoints {
    fn default() -> Self {
        Self {
            api: "https://api.deezer.com".to_string(),
            gateway: "https://www.deezer.com/ajax/gw-light.php".to_string(),
            media: "https://media.deezer.com".to_string(),
        }
    }
}

/// Deezer backend, authenticated through the `arl` cookie
#[derive(Debug)]
pub struct DeezerClient {
    api: Api,
    settings: DeezerSettings,
    endpoints: DeezerEndpoints,
    /// Gateway `checkForm` token, set by login
    api_token: Option<String>,
    /// Media server license token, set by login
    license_token: Option<String>,
}

impl DeezerClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_endpoints(settings, DeezerEndpoints::default())
    }

    pub fn with_endpoints(settings: &Settings, endpoints: DeezerEndpoints) -> Result<Self> {
        let mut builder = Session::builder()
            .user_agent(&settings.session.user_agent)
            .verify_ssl(settings.session.verify_ssl);
        if !settings.deezer.arl.is_empty() {
            builder = builder.cookie(&format!("arl={}", settings.deezer.arl), &endpoints.gateway)?;
        }

        Ok(Self {
            api: Api::new(
                builder.build()?,
                RateLimiter::new(settings.downloads.requests_per_minute),
            ),
            settings: settings.deezer.clone(),
            endpoints,
            api_token: None,
            license_token: None,
        })
    }

    fn ensure_logged_in(&self) -> Result<()> {
        if self.logged_in() {
            Ok(())
        } else {
            Err(MediaripError::NotLoggedIn)
        }
    }

    /// Call a gateway method, returning its `results` member
    async fn gateway_call(&self, method: &str, body: Value) -> Result<Value> {
        // Calls made before login carry the literal "null" token
        let token = self.api_token.as_deref().unwrap_or(BOOTSTRAP_API_TOKEN);
        let request = self
            .api
            .client()
            .post(&self.endpoints.gateway)
            .query(&[
                ("method", method),
                ("input", "3"),
                ("api_version", "1.0"),
                ("api_token", token),
            ])
            .json(&body);

        let response: Value = self.api.json(request).await?;
        if let Some(error) = response.get("error").filter(|e| !is_empty_json(e)) {
            return Err(MediaripError::NotFound(format!("{}: {}", method, error)));
        }

        Ok(response.get("results").cloned().unwrap_or(Value::Null))
    }

    /// Ask the media server for the stream URL of a track token in `format`
    async fn get_track_url(&self, track_token: &str, format: &str) -> Result<String> {
        let license_token = self.license_token.as_deref().unwrap_or("");
        let request = self
            .api
            .client()
            .post(format!("{}/v1/get_url", self.endpoints.media))
            .json(&json!({
                "license_token": license_token,
                "media": [{
                    "type": "FULL",
                    "formats": [{ "cipher": "BF_CBC_STRIPE", "format": format }],
                }],
                "track_tokens": [track_token],
            }));

        let response: Value = self.api.json(request).await?;
        let entry = &response["data"][0];

        if let Some(url) = entry["media"][0]["sources"][0]["url"].as_str() {
            return Ok(url.to_string());
        }

        let message = entry["errors"][0]["message"]
            .as_str()
            .unwrap_or("No stream URL returned")
            .to_string();
        Err(MediaripError::NotStreamable(message))
    }
}

#[async_trait]
impl Client for DeezerClient {
    fn source(&self) -> Source {
        Source::Deezer
    }

    fn max_quality(&self) -> u8 {
        (DEEZER_FORMATS.len() - 1) as u8
    }

    fn logged_in(&self) -> bool {
        self.api_token.is_some()
    }

    async fn login(&mut self) -> Result<()> {
        if self.settings.arl.is_empty() {
            return Err(MediaripError::Authentication(
                "Deezer ARL is not configured".to_string(),
            ));
        }

        self.api_token = None;
        self.license_token = None;

        let results = self
            .gateway_call("deezer.getUserData", json!({}))
            .await
            .map_err(|e| match e {
                MediaripError::NotFound(msg) => MediaripError::Authentication(msg),
                other => other,
            })?;

        let user_id = lenient_u64(&results["USER"]["USER_ID"]).unwrap_or(0);
        if user_id == 0 {
            return Err(MediaripError::Authentication("Invalid Deezer ARL".to_string()));
        }

        let api_token = results["checkForm"]
            .as_str()
            .ok_or_else(|| MediaripError::Authentication("Missing gateway token".to_string()))?;

        self.license_token = results["USER"]["OPTIONS"]["license_token"]
            .as_str()
            .map(str::to_string);
        self.api_token = Some(api_token.to_string());

        info!("Logged in to Deezer as user {}", user_id);
        Ok(())
    }

    async fn get_metadata(&self, item_id: &str, media_type: MediaType) -> Result<Value> {
        self.ensure_logged_in()?;
        if media_type == MediaType::Label {
            return Err(MediaripError::UnsupportedMediaType(media_type.to_string()));
        }

        let url = format!("{}/{}/{}", self.endpoints.api, media_type, item_id);
        let value: Value = self
            .api
            .json(self.api.client().get(url))
            .await
            .map_err(|e| not_found(e, || format!("deezer {} {}", media_type, item_id)))?;

        // The public API answers errors with 200 and an `error` member
        if let Some(error) = value.get("error") {
            let message = error["message"].as_str().unwrap_or("unknown error");
            return Err(MediaripError::NotFound(format!(
                "deezer {} {}: {}",
                media_type, item_id, message
            )));
        }

        Ok(value)
    }

    async fn search(&self, media_type: MediaType, query: &str, limit: usize) -> Result<Vec<Value>> {
        self.ensure_logged_in()?;
        if media_type == MediaType::Label {
            return Err(MediaripError::UnsupportedMediaType(media_type.to_string()));
        }

        let request = self
            .api
            .client()
            .get(format!("{}/search/{}", self.endpoints.api, media_type))
            .query(&[("q", query), ("limit", &limit.to_string())]);
        let response: Value = self.api.json(request).await?;

        let results: Vec<Value> = response["data"]
            .as_array()
            .map(|items| items.iter().take(limit).cloned().collect())
            .unwrap_or_default();

        debug!("Deezer search {:?} returned {} results", query, results.len());
        Ok(results)
    }

    async fn get_downloadable(&self, item_id: &str, quality: u8) -> Result<Downloadable> {
        self.ensure_logged_in()?;

        let track = self
            .gateway_call("song.getData", json!({ "sng_id": item_id }))
            .await?;

        let quality_to_size: Vec<u64> = DEEZER_FORMATS
            .iter()
            .map(|format| lenient_u64(&track[format!("FILESIZE_{}", format)]).unwrap_or(0))
            .collect();

        let requested = quality.min(self.max_quality());
        let resolved = select_quality(&quality_to_size, requested)?;

        let track_token = track["TRACK_TOKEN"]
            .as_str()
            .ok_or_else(|| MediaripError::NotStreamable("Missing track token".to_string()))?;
        let url = self
            .get_track_url(track_token, DEEZER_FORMATS[resolved as usize])
            .await?;

        let id = lenient_string(&track["SNG_ID"]).unwrap_or_else(|| item_id.to_string());
        let info = DeezerDownloadInfo {
            id,
            url,
            quality: requested,
            quality_to_size,
        };

        Ok(DeezerDownloadable::new(self.api.session().clone(), info)?.into())
    }
}

fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
