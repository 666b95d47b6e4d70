// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, FixedOffset, Utc};

use crate::error::FeedError;
use crate::store::normalize_guid;

/// A parsed podcast feed
#[derive(Debug, Clone)]
pub struct Feed {
    /// Used as the directory name and as album/artist tag
    pub title: String,
    pub cover_url: Option<String>,
    /// Episodes in source order (usually newest first)
    pub episodes: Vec<Episode>,
}

/// A single podcast episode
#[derive(Debug, Clone)]
pub struct Episode {
    /// Dedup key; empty only when the episode has nothing to download
    pub guid: String,
    pub title: String,
    pub published: DateTime<Utc>,
    pub enclosures: Vec<Enclosure>,
}

/// A downloadable media resource attached to an episode
#[derive(Debug, Clone)]
pub struct Enclosure {
    pub url: String,
    pub mime_type: Option<String>,
}

impl Episode {
    /// Whether the feed gave this episode anything to download
    pub fn has_content(&self) -> bool {
        !self.enclosures.is_empty()
    }
}

/// Parse RSS feed XML bytes into a Feed
pub fn parse_feed(xml_bytes: &[u8]) -> Result<Feed, FeedError> {
    let channel = rss::Channel::read_from(xml_bytes)?;

    let episodes = channel.items().iter().map(parse_episode).collect();

    let cover_url = channel
        .itunes_ext()
        .and_then(|ext| ext.image())
        .or_else(|| channel.image().map(|img| img.url()))
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(String::from);

    Ok(Feed {
        title: channel.title().trim().to_string(),
        cover_url,
        episodes,
    })
}

fn parse_episode(item: &rss::Item) -> Episode {
    let title = item
        .title()
        .map(|t| t.trim().to_string())
        .unwrap_or_else(|| "Untitled Episode".to_string());

    let enclosures: Vec<Enclosure> = item
        .enclosure()
        .filter(|enc| !enc.url().trim().is_empty())
        .map(|enc| Enclosure {
            url: enc.url().trim().to_string(),
            mime_type: Some(enc.mime_type().to_string()).filter(|s| !s.is_empty()),
        })
        .into_iter()
        .collect();

    let published = item
        .pub_date()
        .and_then(|date_str| {
            DateTime::parse_from_rfc2822(date_str.trim())
                .or_else(|_| parse_relaxed_date(date_str.trim()))
                .ok()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH);

    // Items without a <guid> fall back to their enclosure URL
    let guid = item
        .guid()
        .map(|g| normalize_guid(g.value().trim()))
        .filter(|g| !g.is_empty())
        .or_else(|| enclosures.first().map(|enc| normalize_guid(&enc.url)))
        .unwrap_or_default();

    Episode {
        guid,
        title,
        published,
        enclosures,
    }
}

/// Try to parse dates that don't strictly conform to RFC 2822
fn parse_relaxed_date(date_str: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    let formats = [
        "%a, %d %b %Y %H:%M %z",
        "%d %b %Y %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S %z",
    ];

    for format in formats {
        if let Ok(dt) = DateTime::parse_from_str(date_str, format) {
            return Ok(dt);
        }
    }

    DateTime::parse_from_rfc3339(date_str)
}
