//! Shared HTTP session
//!
//! One `Session` is built per client and handed (cloned) to every
//! downloadable the client produces. Clones share the connection pool.

use crate::error::{MediaripError, Result};
use mediarip_types::{SessionSettings, DEFAULT_USER_AGENT};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use tracing::{debug, warn};

/// Reusable HTTP client context: connection pool, default headers and TLS policy
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    headers: HeaderMap,
}

impl Session {
    /// Build a session with the default user agent, merging `extra` headers over it
    pub fn new(extra: Option<HeaderMap>, verify_ssl: bool) -> Result<Self> {
        SessionBuilder::new()
            .headers(extra.unwrap_or_default())
            .verify_ssl(verify_ssl)
            .build()
    }

    /// Build a session from configuration
    pub fn from_settings(settings: &SessionSettings, extra: Option<HeaderMap>) -> Result<Self> {
        SessionBuilder::new()
            .user_agent(&settings.user_agent)
            .headers(extra.unwrap_or_default())
            .verify_ssl(settings.verify_ssl)
            .build()
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Underlying reqwest client (shares the pool with this session)
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Default headers sent with every request of this session
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// Builder for [`Session`]
#[derive(Debug)]
pub struct SessionBuilder {
    user_agent: String,
    headers: HeaderMap,
    verify_ssl: bool,
    connect_timeout: Duration,
    cookies: Vec<(String, Url)>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: HeaderMap::new(),
            verify_ssl: true,
            connect_timeout: Duration::from_secs(30),
            cookies: Vec::new(),
        }
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        if !user_agent.is_empty() {
            self.user_agent = user_agent.to_string();
        }
        self
    }

    /// Extra default headers; these win over the user agent default
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| MediaripError::InvalidHeader(format!("{}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| MediaripError::InvalidHeader(format!("{}: {}", name.as_str(), e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn verify_ssl(mut self, verify_ssl: bool) -> Self {
        self.verify_ssl = verify_ssl;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Seed the cookie jar with `cookie` (a `name=value` string) for `url`
    pub fn cookie(mut self, cookie: &str, url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| MediaripError::Config(format!("{}: {}", url, e)))?;
        self.cookies.push((cookie.to_string(), url));
        Ok(self)
    }

    pub fn build(self) -> Result<Session> {
        let mut headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&self.user_agent)
            .map_err(|e| MediaripError::InvalidHeader(format!("user-agent: {}", e)))?;
        headers.insert(USER_AGENT, user_agent);
        headers.extend(self.headers);

        if !self.verify_ssl {
            warn!("TLS certificate verification is disabled");
        }

        let jar = Arc::new(Jar::default());
        for (cookie, url) in &self.cookies {
            jar.add_cookie_str(cookie, url);
        }

        let client = Client::builder()
            .default_headers(headers.clone())
            .cookie_provider(jar)
            .connect_timeout(self.connect_timeout)
            .danger_accept_invalid_certs(!self.verify_ssl)
            .build()?;

        debug!("Created HTTP session with {} default headers", headers.len());

        Ok(Session { client, headers })
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
