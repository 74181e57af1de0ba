//! Chunked transfer primitive
//!
//! Streams a URL straight to a file in fixed-size blocks, calling the
//! progress callback after each block is written. No decryption happens
//! here. A failure mid-stream leaves the partial file on disk.

use crate::chunk::ChunkReader;
use crate::error::Result;
use crate::session::Session;
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use reqwest::Response;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Block size of plain transfers (1 MiB)
pub const DOWNLOAD_CHUNK_SIZE: usize = 1 << 20;

/// GET `url` (following redirects) and write the body to `path`
///
/// `headers` are added on top of the session defaults. Returns the number
/// of bytes written.
pub async fn download_url<F>(
    session: &Session,
    url: &str,
    headers: Option<&HeaderMap>,
    path: &Path,
    callback: &mut F,
) -> Result<u64>
where
    F: FnMut(u64) + ?Sized,
{
    debug!("Requesting {}", url);

    let mut request = session.client().get(url);
    if let Some(headers) = headers {
        request = request.headers(headers.clone());
    }

    let response = request.send().await?.error_for_status()?;
    write_response(response, path, callback).await
}

/// Stream an already successful response to `path`
pub async fn write_response<F>(response: Response, path: &Path, callback: &mut F) -> Result<u64>
where
    F: FnMut(u64) + ?Sized,
{
    let mut file = File::create(path).await?;
    let mut chunks = ChunkReader::from_response(response, DOWNLOAD_CHUNK_SIZE);
    let mut written = 0u64;

    while let Some(chunk) = chunks.next_chunk().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;

        let len = chunk.len() as u64;
        written += len;
        callback(len);
    }

    // Flush and sync to disk
    file.flush().await?;
    file.sync_all().await?;

    info!("Wrote {} bytes to {}", written, path.display());
    Ok(written)
}

/// Declared `Content-Length`, 0 when missing or unparseable
pub(crate) fn content_length(headers: &HeaderMap) -> u64 {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn content_length_parses_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_length(&headers), 0);

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("12345"));
        assert_eq!(content_length(&headers), 12345);

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("lots"));
        assert_eq!(content_length(&headers), 0);
    }
}
