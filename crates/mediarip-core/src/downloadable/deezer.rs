use super::Resource;
use crate::chunk::ChunkReader;
use crate::crypto::{blowfish_key, decrypt_chunk, CIPHER_CHUNK_SIZE};
use crate::download::{content_length, write_response};
use crate::error::{MediaripError, Result};
use crate::session::Session;
use mediarip_types::Source;
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Responses shorter than this are checked for a JSON error payload
pub const ERROR_PAYLOAD_THRESHOLD: u64 = 20_000;

const GENERIC_NOT_FOUND: &str = "File not found.";

static RE_ENCRYPTED: OnceLock<Regex> = OnceLock::new();

fn re_encrypted() -> &'static Regex {
    RE_ENCRYPTED.get_or_init(|| Regex::new(r"/m(?:obile|edia)/").expect("compile RE_ENCRYPTED"))
}

/// Download descriptor resolved by the Deezer client
#[derive(Debug, Clone)]
pub struct DeezerDownloadInfo {
    /// Track id, the key derivation input
    pub id: String,
    pub url: String,
    /// Requested quality tier
    pub quality: u8,
    /// Declared file size per quality tier, 0 when the tier is unavailable
    pub quality_to_size: Vec<u64>,
}

/// Deezer track stream, Blowfish encrypted when served from a media path
#[derive(Debug)]
pub struct DeezerDownloadable {
    pub(super) resource: Resource,
    track_id: String,
    quality: u8,
}

impl DeezerDownloadable {
    /// Resolve the quality tier and build the downloadable
    ///
    /// Fails with `NotStreamable` when no tier has a nonzero size.
    pub fn new(session: Session, info: DeezerDownloadInfo) -> Result<Self> {
        debug!("Deezer info for downloadable: {:?}", info);

        let quality = select_quality(&info.quality_to_size, info.quality)?;
        let size = info.quality_to_size[quality as usize];
        let extension = if quality <= 1 { "mp3" } else { "flac" };

        Ok(Self {
            resource: Resource::new(session, info.url, extension, Source::Deezer, Some(size)),
            track_id: info.id,
            quality,
        })
    }

    /// Quality tier actually selected
    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    pub fn is_encrypted(&self) -> bool {
        is_encrypted_url(self.resource.url())
    }

    pub(super) async fn download<F>(&self, path: &Path, callback: &mut F) -> Result<()>
    where
        F: FnMut(u64) + Send,
    {
        let url = self.resource.url();
        let response = self
            .resource
            .session()
            .client()
            .get(url)
            .send()
            .await?
            .error_for_status()?;

        let declared = content_length(response.headers());
        self.resource.set_size(declared).await;

        if declared < ERROR_PAYLOAD_THRESHOLD && !is_image_url(url) {
            let body = response.bytes().await?;
            return Err(error_from_payload(&body));
        }

        if !self.is_encrypted() {
            debug!("Deezer file at {} not encrypted", url);
            write_response(response, path, callback).await?;
            return Ok(());
        }

        let key = blowfish_key(&self.track_id);
        debug!(
            "Deezer file (id {}) at {} is encrypted. Decrypting with {}",
            self.track_id,
            url,
            hex::encode(key)
        );

        let mut file = File::create(path).await?;
        let mut chunks = ChunkReader::from_response(response, CIPHER_CHUNK_SIZE);
        let mut received = 0u64;

        while let Some(chunk) = chunks.next_chunk().await {
            let chunk = chunk?;
            let plain = decrypt_chunk(&key, &chunk)?;
            file.write_all(&plain).await?;

            // Report the ciphertext length read from the network
            received += chunk.len() as u64;
            callback(chunk.len() as u64);
        }

        file.flush().await?;
        file.sync_all().await?;

        info!("Decrypted {} bytes to {}", received, path.display());
        Ok(())
    }
}

/// Highest tier not above `requested` that has data
///
/// Falls back to the highest tier with data when every tier up to
/// `requested` is empty.
pub fn select_quality(quality_to_size: &[u64], requested: u8) -> Result<u8> {
    let available: Vec<usize> = quality_to_size
        .iter()
        .enumerate()
        .filter(|(_, size)| **size > 0)
        .map(|(i, _)| i)
        .collect();

    let highest = *available
        .last()
        .ok_or_else(|| MediaripError::NotStreamable("Missing download info. Skipping.".into()))?;

    let selected = available
        .iter()
        .rev()
        .copied()
        .find(|&i| i <= requested as usize)
        .unwrap_or(highest);

    Ok(selected as u8)
}

/// Encrypted streams are served from `/media/` or `/mobile/` paths
pub fn is_encrypted_url(url: &str) -> bool {
    re_encrypted().is_match(url)
}

fn is_image_url(url: &str) -> bool {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| url.to_lowercase());
    [".jpg", ".jpeg", ".png"].iter().any(|ext| path.ends_with(ext))
}

/// Error carried by a short body that should have been media
pub fn error_from_payload(body: &[u8]) -> MediaripError {
    let message = match serde_json::from_slice::<Value>(body) {
        Ok(payload) => match payload.get("error") {
            Some(Value::String(message)) => message.clone(),
            Some(Value::Object(error)) => error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(GENERIC_NOT_FOUND)
                .to_string(),
            _ => GENERIC_NOT_FOUND.to_string(),
        },
        Err(_) => GENERIC_NOT_FOUND.to_string(),
    };
    MediaripError::NotStreamable(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(sizes: Vec<u64>, quality: u8) -> DeezerDownloadInfo {
        DeezerDownloadInfo {
            id: "3135556".to_string(),
            url: "https://e-cdns-proxy-1.dzcdn.net/mobile/1/abc".to_string(),
            quality,
            quality_to_size: sizes,
        }
    }

    fn session() -> Session {
        Session::new(None, true).unwrap()
    }

    #[test]
    fn quality_clamps_to_highest_available() {
        assert_eq!(select_quality(&[0, 1000, 5000, 9000], 5).unwrap(), 3);
        assert_eq!(select_quality(&[0, 1000, 5000, 9000], 2).unwrap(), 2);
        assert_eq!(select_quality(&[700, 0, 0], 2).unwrap(), 0);
    }

    #[test]
    fn empty_requested_tier_falls_back() {
        assert_eq!(select_quality(&[100, 0, 300], 1).unwrap(), 0);
        assert_eq!(select_quality(&[0, 0, 300], 0).unwrap(), 2);
    }

    #[tokio::test]
    async fn empty_tier_is_never_selected() {
        let d = DeezerDownloadable::new(session(), info(vec![100, 0, 300], 1)).unwrap();
        assert_eq!(d.quality(), 0);
        assert_eq!(d.resource.extension(), "mp3");
        assert_eq!(d.resource.size().await.unwrap(), 100);

        let d = DeezerDownloadable::new(session(), info(vec![0, 0, 300], 0)).unwrap();
        assert_eq!(d.quality(), 2);
        assert_eq!(d.resource.size().await.unwrap(), 300);
    }

    #[test]
    fn no_tier_is_not_streamable() {
        let err = select_quality(&[0, 0, 0], 2).unwrap_err();
        assert!(matches!(err, MediaripError::NotStreamable(_)));
        assert!(select_quality(&[], 2).is_err());
    }

    #[tokio::test]
    async fn construction_records_tier_size_and_extension() {
        let d = DeezerDownloadable::new(session(), info(vec![0, 1000, 5000, 9000], 5)).unwrap();
        assert_eq!(d.quality(), 3);
        assert_eq!(d.resource.extension(), "flac");
        // Declared size is served from the cache, no probe is issued
        assert_eq!(d.resource.size().await.unwrap(), 9000);

        let d = DeezerDownloadable::new(session(), info(vec![128, 320, 0], 2)).unwrap();
        assert_eq!(d.quality(), 1);
        assert_eq!(d.resource.extension(), "mp3");
    }

    #[test]
    fn all_zero_sizes_fail_at_construction() {
        let err = DeezerDownloadable::new(session(), info(vec![0, 0, 0], 2)).unwrap_err();
        assert!(matches!(err, MediaripError::NotStreamable(_)));
    }

    #[test]
    fn encryption_detection_by_path_segment() {
        for url in [
            "https://e-cdns-proxy-a.dzcdn.net/mobile/1/123abc",
            "https://cdns-proxy.dzcdn.net/media/2/xyz?hdnea=1",
            "http://127.0.0.1:8080/media/track",
        ] {
            assert!(is_encrypted_url(url), "{}", url);
        }
        for url in [
            "https://cdns-preview-1.dzcdn.net/stream/c-123-1.mp3",
            "https://e-cdns-images.dzcdn.net/images/cover/abc/1200x1200.jpg",
            "https://example.com/mediafile/123",
            "https://example.com/multimedia",
        ] {
            assert!(!is_encrypted_url(url), "{}", url);
        }
    }

    #[test]
    fn image_urls_are_recognised() {
        assert!(is_image_url("https://e-cdns-images.dzcdn.net/images/cover/a/1200x1200.jpg"));
        assert!(is_image_url("https://host/art.PNG?size=large"));
        assert!(!is_image_url("https://host/media/1/track"));
    }

    #[test]
    fn payload_error_message_is_extracted() {
        match error_from_payload(br#"{"error":"not found"}"#) {
            MediaripError::NotStreamable(msg) => assert_eq!(msg, "not found"),
            other => panic!("unexpected error: {other:?}"),
        }
        match error_from_payload(br#"{"error":{"type":"DataException","message":"no data"}}"#) {
            MediaripError::NotStreamable(msg) => assert_eq!(msg, "no data"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unparseable_payload_gets_generic_message() {
        for body in [&b"<html>oops</html>"[..], &b"{}"[..], &b""[..]] {
            match error_from_payload(body) {
                MediaripError::NotStreamable(msg) => assert_eq!(msg, GENERIC_NOT_FOUND),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }
}
