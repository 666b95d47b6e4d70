use std::path::Path;

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::DownloadError;
use crate::http::HttpClient;

/// Download `url` to `output_path`, replacing any existing file
///
/// The body is streamed until the server closes it. When a Content-Length was
/// advertised the received byte count must match it, otherwise the download
/// counts as failed. Returns the number of bytes written.
pub async fn download_episode<C: HttpClient>(
    client: &C,
    url: &str,
    output_path: &Path,
) -> Result<u64, DownloadError> {
    let response = client
        .get_stream(url)
        .await
        .map_err(|e| DownloadError::HttpFailed {
            url: url.to_string(),
            source: e,
        })?;

    if response.status >= 400 {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    let mut file =
        File::create(output_path)
            .await
            .map_err(|e| DownloadError::FileCreateFailed {
                path: output_path.to_path_buf(),
                source: e,
            })?;

    let mut bytes_downloaded: u64 = 0;
    let mut stream = response.body;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::StreamFailed {
            url: url.to_string(),
            source: e,
        })?;

        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::FileWriteFailed {
                path: output_path.to_path_buf(),
                source: e,
            })?;

        bytes_downloaded += chunk.len() as u64;
    }

    // tokio's File buffers internally, flush before the tag rewriter reopens it
    file.flush()
        .await
        .map_err(|e| DownloadError::FileWriteFailed {
            path: output_path.to_path_buf(),
            source: e,
        })?;

    if let Some(expected) = response.content_length
        && expected != bytes_downloaded
    {
        return Err(DownloadError::Incomplete {
            url: url.to_string(),
            expected,
            received: bytes_downloaded,
        });
    }

    debug!(url, path = %output_path.display(), bytes = bytes_downloaded, "download complete");

    Ok(bytes_downloaded)
}
