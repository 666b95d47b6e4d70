// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Unknown key '{key}' in section [{section}]")]
    UnknownKey { section: String, key: String },

    #[error("Invalid boolean '{value}' for key '{key}'")]
    InvalidBool { key: String, value: String },

    #[error("Missing required setting '{0}'")]
    Missing(&'static str),

    #[error("No feeds configured")]
    NoFeeds,
}

/// Errors that can occur when fetching or parsing RSS feeds
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for feed {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to read feed file {path}: {source}")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse RSS feed: {0}")]
    ParseFailed(#[from] rss::Error),
}

/// Errors that can occur while producing the cover thumbnail
#[derive(Error, Debug)]
pub enum CoverError {
    #[error("Failed to retrieve cover image {url}: {reason}")]
    Retrieval { url: String, reason: String },

    #[error("Failed to decode cover image {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode cover thumbnail: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Cover transcoding for {url} panicked")]
    TaskFailed { url: String },
}

/// Errors that can occur while reading or appending to the GUID file
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open GUID file {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read GUID file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to append to GUID file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during episode downloads
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Incomplete download of {url}: got {received} of {expected} bytes")]
    Incomplete {
        url: String,
        expected: u64,
        received: u64,
    },
}

/// Errors that can occur while rewriting the ID3 tag of a downloaded file
#[derive(Error, Debug)]
pub enum TagError {
    #[error("Failed to strip existing tags from {path}: {source}")]
    StripFailed {
        path: PathBuf,
        #[source]
        source: id3::Error,
    },

    #[error("Failed to measure audio duration of {path}: {reason}")]
    DurationFailed { path: PathBuf, reason: String },

    #[error("Failed to write tags to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: id3::Error,
    },

    #[error("Tag rewriting for {path} panicked")]
    TaskFailed { path: PathBuf },
}

/// Errors that abort a single episode; the feed carries on with the next one
#[derive(Error, Debug)]
pub enum EpisodeError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Tag(#[from] TagError),
}

/// Errors that abort the processing of a single feed
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Failed to create directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cover error: {0}")]
    Cover(#[from] CoverError),

    #[error("GUID file error: {0}")]
    Store(#[from] StoreError),
}
