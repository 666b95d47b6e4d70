// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use id3::frame::{Picture, PictureType};
use id3::{Encoder, Frame, Tag, TagLike, Version};
use tracing::debug;

use crate::error::TagError;

pub const GENRE: &str = "Podcast";

/// Values written into every episode's tag
#[derive(Debug, Clone, Copy)]
pub struct TagValues<'a> {
    /// Written as both album and artist
    pub feed_title: &'a str,
    /// `"YYMMDD <title>"`
    pub display_title: &'a str,
    /// PNG thumbnail, see [`crate::cover`]
    pub cover_png: Option<&'a [u8]>,
}

/// Replace the ID3 tag of the file at `path` with a fixed frame set
///
/// Any existing ID3v1 and ID3v2 tags are stripped first, then an ID3v2.3 tag without
/// padding is written containing album, artist, title, genre, the front cover
/// and TLEN (duration in milliseconds, measured from the MPEG frames). Audio
/// data is left untouched.
pub fn rewrite_tags(path: &Path, values: &TagValues<'_>) -> Result<(), TagError> {
    id3::v1v2::remove_from_path(path).map_err(|e| TagError::StripFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let duration = mp3_duration::from_path(path).map_err(|e| TagError::DurationFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if duration.is_zero() {
        return Err(TagError::DurationFailed {
            path: path.to_path_buf(),
            reason: "no MPEG audio frames found".to_string(),
        });
    }

    let mut tag = Tag::new();
    tag.set_album(values.feed_title);
    tag.set_artist(values.feed_title);
    tag.set_title(values.display_title);
    tag.set_genre(GENRE);

    if let Some(png) = values.cover_png {
        tag.add_frame(Picture {
            mime_type: "image/png".to_string(),
            picture_type: PictureType::CoverFront,
            description: String::new(),
            data: png.to_vec(),
        });
    }

    tag.add_frame(Frame::text("TLEN", duration.as_millis().to_string()));

    Encoder::new()
        .version(Version::Id3v23)
        .padding(0)
        .write_to_path(&tag, path)
        .map_err(|e| TagError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    debug!(
        path = %path.display(),
        duration_ms = duration.as_millis() as u64,
        "tags rewritten"
    );

    Ok(())
}
