// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io::Cursor;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::error::CoverError;
use crate::feed::is_url;
use crate::http::HttpClient;

/// Edge length of the embedded cover thumbnail in pixels
pub const COVER_SIZE: u32 = 300;

/// Retrieve a feed's artwork and turn it into the embedded cover thumbnail
///
/// `source` is normally an http(s) URL; anything else is read as a local path.
pub async fn fetch_cover<C: HttpClient>(client: &C, source: &str) -> Result<Vec<u8>, CoverError> {
    let bytes = if is_url(source) {
        let body = client
            .get_bytes(source)
            .await
            .map_err(|e| CoverError::Retrieval {
                url: source.to_string(),
                reason: e.to_string(),
            })?;

        if body.status >= 400 {
            return Err(CoverError::Retrieval {
                url: source.to_string(),
                reason: format!("HTTP status {}", body.status),
            });
        }
        body.bytes.to_vec()
    } else {
        std::fs::read(Path::new(source)).map_err(|e| CoverError::Retrieval {
            url: source.to_string(),
            reason: e.to_string(),
        })?
    };

    // Resampling large artwork is CPU bound and must not stall the runtime
    let url = source.to_string();
    tokio::task::spawn_blocking(move || transcode_cover(&url, &bytes))
        .await
        .map_err(|_| CoverError::TaskFailed {
            url: source.to_string(),
        })?
}

/// Decode any supported image and re-encode it as a 300x300 RGB PNG
///
/// The image is stretched to the square, aspect ratio is not preserved.
pub fn transcode_cover(source: &str, bytes: &[u8]) -> Result<Vec<u8>, CoverError> {
    let image = image::load_from_memory(bytes).map_err(|e| CoverError::Decode {
        url: source.to_string(),
        source: e,
    })?;

    debug!(
        source,
        width = image.width(),
        height = image.height(),
        "transcoding cover"
    );

    let resized = image.resize_exact(COVER_SIZE, COVER_SIZE, FilterType::Lanczos3);
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, ImageFormat::Png)
        .map_err(CoverError::Encode)?;

    Ok(out.into_inner())
}
