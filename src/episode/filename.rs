use std::path::{Path, PathBuf};

use url::Url;

use crate::feed::{Episode, Feed};

/// Character substituted for anything that is unsafe in a path segment
pub const REPLACEMENT_CHAR: char = '#';

/// Check whether a character may not appear in a path segment on FAT/NTFS
fn is_forbidden_char(c: char) -> bool {
    c < ' ' || matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*')
}

/// Map a title to a string that is safe as a single path segment
///
/// Control characters (0x00-0x1F) and `< > : " / \ | ? *` are each replaced by
/// [`REPLACEMENT_CHAR`]. Length is not limited, so very long titles can still
/// exceed what the target filesystem accepts.
pub fn sanitize(title: &str) -> String {
    title
        .chars()
        .map(|c| if is_forbidden_char(c) { REPLACEMENT_CHAR } else { c })
        .collect()
}

/// Title as shown on the device: `"YYMMDD <title>"`, date rendered in UTC
pub fn display_title(episode: &Episode) -> String {
    format!("{} {}", episode.published.format("%y%m%d"), episode.title)
}

/// File extension (with leading dot) for an episode's first enclosure
///
/// Taken from the last path segment of the URL, falling back to the MIME type
/// and finally to `.mp3`.
pub fn get_audio_extension(episode: &Episode) -> String {
    let Some(enclosure) = episode.enclosures.first() else {
        return ".mp3".to_string();
    };

    if let Some(ext) = url_extension(&enclosure.url) {
        return format!(".{}", ext.to_lowercase());
    }

    if let Some(ext) = enclosure.mime_type.as_deref().and_then(mime_to_extension) {
        return format!(".{ext}");
    }

    ".mp3".to_string()
}

fn url_extension(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let last_segment = url.path_segments()?.next_back()?;
    let (stem, ext) = last_segment.rsplit_once('.')?;

    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > 5
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }

    Some(ext.to_string())
}

/// Map MIME types to file extensions
fn mime_to_extension(mime: &str) -> Option<&'static str> {
    match mime.to_lowercase().as_str() {
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => Some("m4a"),
        "audio/aac" => Some("aac"),
        "audio/ogg" => Some("ogg"),
        "audio/opus" => Some("opus"),
        _ => None,
    }
}

/// Where an episode ends up on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub save_dir: PathBuf,
    pub filename: String,
    pub display_title: String,
}

impl DownloadTarget {
    /// Derive the target for an episode of `feed` below `download_root`
    pub fn new(download_root: &Path, feed: &Feed, episode: &Episode) -> Self {
        let display_title = display_title(episode);
        let filename = format!("{}{}", sanitize(&display_title), get_audio_extension(episode));

        Self {
            save_dir: download_root.join(sanitize(&feed.title)),
            filename,
            display_title,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.save_dir.join(&self.filename)
    }
}
