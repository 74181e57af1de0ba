//! Shared types for mediarip
//!
//! This crate contains the data structures shared between the CLI
//! and the core pipeline: backend identifiers, media types and settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// User agent sent with every request unless overridden
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:83.0) Gecko/20100101 Firefox/83.0";

// ============================================================================
// Backend Types
// ============================================================================

/// Streaming backend a downloadable or client belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Deezer,
    Soundcloud,
    Unknown,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Deezer => "deezer",
            Source::Soundcloud => "soundcloud",
            Source::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deezer" | "dz" => Ok(Source::Deezer),
            "soundcloud" | "sc" => Ok(Source::Soundcloud),
            other => Err(ParseError(format!("Unknown source: {}", other))),
        }
    }
}

/// Kind of item a client can look up or search for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Track,
    Album,
    Playlist,
    Artist,
    Label,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Track => "track",
            MediaType::Album => "album",
            MediaType::Playlist => "playlist",
            MediaType::Artist => "artist",
            MediaType::Label => "label",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim_end_matches('s') {
            "track" => Ok(MediaType::Track),
            "album" => Ok(MediaType::Album),
            "playlist" => Ok(MediaType::Playlist),
            "artist" => Ok(MediaType::Artist),
            "label" => Ok(MediaType::Label),
            _ => Err(ParseError(format!("Unknown media type: {}", s))),
        }
    }
}

/// Error returned when parsing a [`Source`] or [`MediaType`] from a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseError {}

// ============================================================================
// Settings Types
// ============================================================================

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub session: SessionSettings,
    pub downloads: DownloadSettings,
    pub deezer: DeezerSettings,
    pub soundcloud: SoundcloudSettings,
}

/// HTTP session settings shared by every client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub verify_ssl: bool,
    pub user_agent: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            verify_ssl: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// Maximum API requests per minute for each client (0 = unlimited)
    pub requests_per_minute: i64,
    pub folder: PathBuf,
    /// Keep only printable ASCII characters in file names
    pub restrict_characters: bool,
    /// Tracks downloaded at once when several are requested
    pub concurrency: usize,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            requests_per_minute: 0,
            folder: dirs::audio_dir()
                .or_else(dirs::download_dir)
                .map(|d| d.join("mediarip"))
                .unwrap_or_else(|| PathBuf::from("mediarip")),
            restrict_characters: false,
            concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeezerSettings {
    /// Value of the `arl` cookie of a logged-in browser session
    pub arl: String,
    /// 0 = MP3 128, 1 = MP3 320, 2 = FLAC
    pub quality: u8,
}

impl Default for DeezerSettings {
    fn default() -> Self {
        Self {
            arl: String::new(),
            quality: 2,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundcloudSettings {
    pub client_id: String,
    pub app_version: String,
    /// 0 = transcoded MP3, 1 = original upload when available
    pub quality: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_accepts_plural_and_case() {
        assert_eq!("Tracks".parse::<MediaType>().unwrap(), MediaType::Track);
        assert_eq!("album".parse::<MediaType>().unwrap(), MediaType::Album);
        assert!("podcast".parse::<MediaType>().is_err());
    }

    #[test]
    fn source_aliases() {
        assert_eq!("dz".parse::<Source>().unwrap(), Source::Deezer);
        assert_eq!("SoundCloud".parse::<Source>().unwrap(), Source::Soundcloud);
        assert_eq!(Source::Soundcloud.to_string(), "soundcloud");
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"deezer": {"arl": "abc"}, "session": {"verify_ssl": false}}"#)
                .unwrap();
        assert_eq!(settings.deezer.arl, "abc");
        assert_eq!(settings.deezer.quality, 2);
        assert!(!settings.session.verify_ssl);
        assert_eq!(settings.session.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(settings.downloads.requests_per_minute, 0);
    }
}
