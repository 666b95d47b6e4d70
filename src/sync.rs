// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::path::Path;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::cover::fetch_cover;
use crate::episode::{DownloadTarget, download_episode};
use crate::error::{EpisodeError, StoreError, SyncError, TagError};
use crate::feed::{Episode, Feed, load_feed};
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::store::GuidStore;
use crate::tags::{TagValues, rewrite_tags};

/// Switches that change what happens to an eligible episode
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// List and record episodes without downloading them
    pub download_skip: bool,
}

impl From<&Config> for SyncOptions {
    fn from(config: &Config) -> Self {
        Self {
            download_skip: config.download_skip,
        }
    }
}

/// Outcome of processing one feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    /// Episodes downloaded, tagged and recorded
    pub downloaded: usize,
    /// Eligible episodes that were listed but not downloaded (download skip)
    pub listed_only: usize,
    /// Episodes whose GUID was already known
    pub skipped_known: usize,
    /// Episodes without an enclosure
    pub skipped_no_content: usize,
    /// Details of failed episodes (display title, error message)
    pub failed_episodes: Vec<(String, String)>,
}

/// Outcome of a whole run over every configured feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub feeds_completed: usize,
    pub downloaded: usize,
    pub listed_only: usize,
    pub skipped_known: usize,
    pub skipped_no_content: usize,
    pub failed_episodes: Vec<(String, String)>,
    /// Feeds that were abandoned (source, error message)
    pub failed_feeds: Vec<(String, String)>,
}

impl RunReport {
    fn add(&mut self, result: SyncResult) {
        self.feeds_completed += 1;
        self.downloaded += result.downloaded;
        self.listed_only += result.listed_only;
        self.skipped_known += result.skipped_known;
        self.skipped_no_content += result.skipped_no_content;
        self.failed_episodes.extend(result.failed_episodes);
    }

    /// True when every feed and every attempted episode went through
    pub fn is_success(&self) -> bool {
        self.failed_feeds.is_empty() && self.failed_episodes.is_empty()
    }
}

/// Episodes in the order they are processed: oldest first
///
/// Feeds list newest first, so the source order is reversed before the stable
/// sort; episodes sharing a timestamp keep that reversed order.
pub fn episodes_oldest_first(feed: &Feed) -> Vec<&Episode> {
    let mut episodes: Vec<&Episode> = feed.episodes.iter().rev().collect();
    episodes.sort_by_key(|episode| episode.published);
    episodes
}

/// Process every configured feed
///
/// The GUID file is opened once and stays open for the run. A failing feed is
/// reported and the run moves on to the next one.
pub async fn run<C: HttpClient>(
    client: &C,
    config: &Config,
    reporter: SharedProgressReporter,
) -> Result<RunReport, StoreError> {
    let mut store = GuidStore::open(&config.guid_file, !config.guid_skip)?;
    let mut known = store.load()?;
    let options = SyncOptions::from(config);

    info!(
        feeds = config.feed_urls.len(),
        known_guids = known.len(),
        guid_file = %store.path().display(),
        "starting run"
    );

    let mut report = RunReport::default();

    for source in &config.feed_urls {
        let result = match load_feed(client, source).await {
            Ok(feed) => {
                sync_feed(
                    client,
                    &feed,
                    &config.download_directory,
                    &options,
                    &mut known,
                    &mut store,
                    &reporter,
                )
                .await
            }
            Err(e) => Err(SyncError::Feed(e)),
        };

        match result {
            Ok(result) => report.add(result),
            Err(e) => {
                error!(feed = %source, error = %e, "feed failed");
                reporter.report(ProgressEvent::FeedFailed {
                    source: source.clone(),
                    error: e.to_string(),
                });
                report.failed_feeds.push((source.clone(), e.to_string()));
            }
        }
    }

    store.finish()?;

    info!(
        downloaded = report.downloaded,
        skipped = report.skipped_known,
        failed_episodes = report.failed_episodes.len(),
        failed_feeds = report.failed_feeds.len(),
        "run complete"
    );

    Ok(report)
}

/// Process one feed's episodes, oldest first
///
/// Episodes without content or with a known GUID are skipped. Every other
/// episode is announced through the reporter, then downloaded, re-tagged and
/// finally recorded in the GUID file. A failed episode is not recorded so the
/// next run retries it; failing to create the feed directory aborts the feed.
pub async fn sync_feed<C: HttpClient>(
    client: &C,
    feed: &Feed,
    download_root: &Path,
    options: &SyncOptions,
    known: &mut HashSet<String>,
    store: &mut GuidStore,
    reporter: &SharedProgressReporter,
) -> Result<SyncResult, SyncError> {
    let episodes = episodes_oldest_first(feed);

    let new_episodes = episodes
        .iter()
        .filter(|e| e.has_content() && !known.contains(&e.guid))
        .map(|e| e.guid.as_str())
        .collect::<HashSet<_>>()
        .len();

    info!(feed = %feed.title, total = episodes.len(), new = new_episodes, "feed loaded");
    reporter.report(ProgressEvent::FeedLoaded {
        feed_title: feed.title.clone(),
        total_episodes: episodes.len(),
        new_episodes,
    });

    let mut result = SyncResult::default();
    let mut cover: Option<Option<Vec<u8>>> = None;

    for episode in episodes {
        if !episode.has_content() || episode.guid.is_empty() {
            result.skipped_no_content += 1;
            continue;
        }

        if known.contains(&episode.guid) {
            result.skipped_known += 1;
            continue;
        }

        let target = DownloadTarget::new(download_root, feed, episode);

        reporter.report(ProgressEvent::EpisodeStarting {
            feed_title: feed.title.clone(),
            display_title: target.display_title.clone(),
        });

        if options.download_skip {
            store.record(&episode.guid, &target.display_title)?;
            known.insert(episode.guid.clone());
            result.listed_only += 1;
            continue;
        }

        tokio::fs::create_dir_all(&target.save_dir)
            .await
            .map_err(|e| SyncError::Directory {
                path: target.save_dir.clone(),
                source: e,
            })?;

        // Artwork is fetched once and shared by all episodes of the feed
        if cover.is_none() {
            let fetched = match &feed.cover_url {
                Some(url) => Some(fetch_cover(client, url).await?),
                None => None,
            };
            cover = Some(fetched);
        }
        let cover_png = cover.as_ref().and_then(|png| png.as_deref());

        match process_episode(client, feed, episode, &target, cover_png).await {
            Ok(bytes_downloaded) => {
                store.record(&episode.guid, &target.display_title)?;
                known.insert(episode.guid.clone());
                result.downloaded += 1;

                info!(
                    feed = %feed.title,
                    episode = %target.display_title,
                    bytes = bytes_downloaded,
                    "episode stored"
                );
                reporter.report(ProgressEvent::EpisodeCompleted {
                    feed_title: feed.title.clone(),
                    display_title: target.display_title.clone(),
                    bytes_downloaded,
                });
            }
            Err(e) => {
                warn!(
                    feed = %feed.title,
                    episode = %target.display_title,
                    guid = %episode.guid,
                    error = %e,
                    "episode failed, will retry next run"
                );
                reporter.report(ProgressEvent::EpisodeFailed {
                    feed_title: feed.title.clone(),
                    display_title: target.display_title.clone(),
                    error: e.to_string(),
                });
                result
                    .failed_episodes
                    .push((target.display_title.clone(), e.to_string()));
            }
        }
    }

    Ok(result)
}

/// Download the first enclosure and rewrite its tags
async fn process_episode<C: HttpClient>(
    client: &C,
    feed: &Feed,
    episode: &Episode,
    target: &DownloadTarget,
    cover_png: Option<&[u8]>,
) -> Result<u64, EpisodeError> {
    let path = target.path();
    let url = &episode.enclosures[0].url;

    let bytes = download_episode(client, url, &path).await?;

    // The rewrite reads and rewrites the whole file, keep it off the runtime thread
    let feed_title = feed.title.clone();
    let display_title = target.display_title.clone();
    let cover_png = cover_png.map(<[u8]>::to_vec);
    let tag_path = path.clone();

    tokio::task::spawn_blocking(move || {
        rewrite_tags(
            &tag_path,
            &TagValues {
                feed_title: &feed_title,
                display_title: &display_title,
                cover_png: cover_png.as_deref(),
            },
        )
    })
    .await
    .map_err(|_| TagError::TaskFailed { path })??;

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::DateTime;
    use id3::{Tag, TagLike};
    use tempfile::{TempDir, tempdir};

    use crate::http::{ByteStream, HttpBody, HttpResponse};
    use crate::progress::{NoopReporter, RecordingReporter};
    use crate::tags::tests::silent_mp3;

    const FEED_URL: &str = "https://example.com/feed.xml";
    const COVER_URL: &str = "https://example.com/cover.png";

    #[derive(Default)]
    struct MockHttpClient {
        routes: HashMap<String, (u16, Vec<u8>)>,
        streamed: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        fn route(mut self, url: &str, status: u16, body: Vec<u8>) -> Self {
            self.routes.insert(url.to_string(), (status, body));
            self
        }

        fn lookup(&self, url: &str) -> (u16, Vec<u8>) {
            self.routes
                .get(url)
                .cloned()
                .unwrap_or((404, b"Not Found".to_vec()))
        }

        fn streamed(&self) -> Vec<String> {
            self.streamed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn get_bytes(&self, url: &str) -> Result<HttpBody, reqwest::Error> {
            let (status, body) = self.lookup(url);
            Ok(HttpBody {
                status,
                bytes: Bytes::from(body),
            })
        }

        async fn get_stream(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
            self.streamed.lock().unwrap().push(url.to_string());

            let (status, body) = self.lookup(url);
            let len = body.len() as u64;
            let stream: ByteStream =
                Box::pin(futures::stream::once(async move { Ok(Bytes::from(body)) }));

            Ok(HttpResponse {
                status,
                content_length: Some(len),
                body: stream,
            })
        }
    }

    struct Item<'a> {
        guid: &'a str,
        title: &'a str,
        timestamp: i64,
        url: Option<&'a str>,
    }

    fn item<'a>(guid: &'a str, title: &'a str, timestamp: i64, url: Option<&'a str>) -> Item<'a> {
        Item {
            guid,
            title,
            timestamp,
            url,
        }
    }

    fn feed_xml(title: &str, items: &[Item<'_>]) -> Vec<u8> {
        let mut xml = format!(
            r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>{title}</title>
    <description>test</description>
    <image><url>{COVER_URL}</url><title>{title}</title><link>https://example.com</link></image>
"#
        );

        for item in items {
            let published = DateTime::from_timestamp(item.timestamp, 0).unwrap().to_rfc2822();
            xml.push_str(&format!(
                "    <item>\n      <title>{}</title>\n      <guid>{}</guid>\n      <pubDate>{published}</pubDate>\n",
                item.title, item.guid
            ));
            if let Some(url) = item.url {
                xml.push_str(&format!(
                    "      <enclosure url=\"{url}\" type=\"audio/mpeg\"/>\n"
                ));
            }
            xml.push_str("    </item>\n");
        }

        xml.push_str("  </channel>\n</rss>\n");
        xml.into_bytes()
    }

    fn cover_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(16, 16, image::Rgb([10, 120, 200]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn client_for(feed: Vec<u8>, audio_urls: &[&str]) -> MockHttpClient {
        let mut client = MockHttpClient::default()
            .route(FEED_URL, 200, feed)
            .route(COVER_URL, 200, cover_png());
        for url in audio_urls {
            client = client.route(url, 200, silent_mp3(12));
        }
        client
    }

    struct Fixture {
        _dir: TempDir,
        downloads: PathBuf,
        guid_file: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            Self {
                downloads: dir.path().join("downloads"),
                guid_file: dir.path().join("guids"),
                _dir: dir,
            }
        }

        fn config(&self, feeds: &[&str]) -> Config {
            Config {
                download_directory: self.downloads.clone(),
                guid_file: self.guid_file.clone(),
                feed_urls: feeds.iter().map(|s| s.to_string()).collect(),
                dry_run: false,
                download_skip: false,
                guid_skip: false,
                quiet: true,
            }
        }

        fn guid_lines(&self) -> Vec<String> {
            std::fs::read_to_string(&self.guid_file)
                .unwrap_or_default()
                .lines()
                .map(String::from)
                .collect()
        }

        fn recorded_guids(&self) -> Vec<String> {
            self.guid_lines()
                .into_iter()
                .filter(|line| !line.starts_with('#'))
                .map(|line| line.split('\t').next().unwrap_or_default().to_string())
                .collect()
        }

        fn files_in(&self, feed_title: &str) -> Vec<String> {
            let Ok(entries) = std::fs::read_dir(self.downloads.join(feed_title)) else {
                return vec![];
            };
            let mut names: Vec<String> = entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }
    }

    const T1: i64 = 1_700_000_000; // 2023-11-14
    const T2: i64 = T1 + 86_400;
    const T3: i64 = T2 + 86_400;

    fn two_episode_feed() -> Vec<u8> {
        feed_xml(
            "Test Podcast",
            &[
                item("ep2", "Episode 2", T2, Some("https://example.com/ep2.mp3")),
                item("ep1", "Episode 1", T1, Some("https://example.com/ep1.mp3")),
            ],
        )
    }

    const TWO_EPISODE_URLS: [&str; 2] = ["https://example.com/ep1.mp3", "https://example.com/ep2.mp3"];

    #[tokio::test]
    async fn first_run_downloads_and_second_run_skips() {
        let fx = Fixture::new();
        let client = client_for(two_episode_feed(), &TWO_EPISODE_URLS);
        let config = fx.config(&[FEED_URL]);

        let report = run(&client, &config, NoopReporter::shared()).await.unwrap();

        assert_eq!(report.downloaded, 2);
        assert!(report.is_success());
        assert_eq!(
            fx.files_in("Test Podcast"),
            ["231114 Episode 1.mp3", "231115 Episode 2.mp3"]
        );

        let lines = fx.guid_lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "ep1\t231114 Episode 1");
        assert_eq!(lines[1], "ep2\t231115 Episode 2");
        assert!(lines[2].starts_with('#'));

        let tag = Tag::read_from_path(
            fx.downloads.join("Test Podcast").join("231114 Episode 1.mp3"),
        )
        .unwrap();
        assert_eq!(tag.title(), Some("231114 Episode 1"));
        assert_eq!(tag.album(), Some("Test Podcast"));
        assert_eq!(tag.pictures().count(), 1);

        let report = run(&client, &config, NoopReporter::shared()).await.unwrap();

        assert_eq!(report.downloaded, 0);
        assert_eq!(report.skipped_known, 2);
        assert_eq!(fx.guid_lines().len(), 3);
        assert_eq!(fx.files_in("Test Podcast").len(), 2);
        assert_eq!(client.streamed().len(), 2);
    }

    #[tokio::test]
    async fn episodes_are_processed_oldest_first() {
        let fx = Fixture::new();
        let feed = feed_xml(
            "Order",
            &[
                item("g3", "Third", T3, Some("https://example.com/3.mp3")),
                item("g1", "First", T1, Some("https://example.com/1.mp3")),
                item("g2", "Second", T2, Some("https://example.com/2.mp3")),
            ],
        );
        let client = client_for(
            feed,
            &[
                "https://example.com/1.mp3",
                "https://example.com/2.mp3",
                "https://example.com/3.mp3",
            ],
        );
        let reporter = RecordingReporter::new();

        run(&client, &fx.config(&[FEED_URL]), reporter.clone())
            .await
            .unwrap();

        assert_eq!(fx.recorded_guids(), ["g1", "g2", "g3"]);
        assert_eq!(
            client.streamed(),
            [
                "https://example.com/1.mp3",
                "https://example.com/2.mp3",
                "https://example.com/3.mp3"
            ]
        );
        assert_eq!(
            reporter.listed_episodes(),
            ["Order 231114 First", "Order 231115 Second", "Order 231116 Third"]
        );
    }

    #[tokio::test]
    async fn known_guid_is_never_fetched_again() {
        let fx = Fixture::new();
        std::fs::write(&fx.guid_file, "# imported\nep1\tEpisode 1\n").unwrap();
        let client = client_for(two_episode_feed(), &TWO_EPISODE_URLS);

        let report = run(&client, &fx.config(&[FEED_URL]), NoopReporter::shared())
            .await
            .unwrap();

        assert_eq!(report.downloaded, 1);
        assert_eq!(report.skipped_known, 1);
        assert_eq!(client.streamed(), ["https://example.com/ep2.mp3"]);
        assert_eq!(fx.recorded_guids(), ["ep1", "ep2"]);
    }

    #[tokio::test]
    async fn guid_with_tab_and_newline_is_skipped_on_second_run() {
        let fx = Fixture::new();
        let feed = feed_xml(
            "Odd Guids",
            &[item(
                "tag:a&#9;b&#10;c",
                "Odd",
                T1,
                Some("https://example.com/odd.mp3"),
            )],
        );
        let client = client_for(feed, &["https://example.com/odd.mp3"]);
        let config = fx.config(&[FEED_URL]);

        let report = run(&client, &config, NoopReporter::shared()).await.unwrap();
        assert_eq!(report.downloaded, 1);
        assert_eq!(fx.guid_lines()[0], "tag:a b c\t231114 Odd");

        let report = run(&client, &config, NoopReporter::shared()).await.unwrap();
        assert_eq!(report.downloaded, 0);
        assert_eq!(report.skipped_known, 1);
        assert_eq!(client.streamed().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_guid_in_one_feed_is_fetched_once() {
        let fx = Fixture::new();
        let feed = feed_xml(
            "Dupes",
            &[
                item("same", "Repost", T2, Some("https://example.com/b.mp3")),
                item("same", "Original", T1, Some("https://example.com/a.mp3")),
            ],
        );
        let client = client_for(feed, &["https://example.com/a.mp3", "https://example.com/b.mp3"]);

        let report = run(&client, &fx.config(&[FEED_URL]), NoopReporter::shared())
            .await
            .unwrap();

        assert_eq!(report.downloaded, 1);
        assert_eq!(report.skipped_known, 1);
        assert_eq!(client.streamed(), ["https://example.com/a.mp3"]);
        assert_eq!(fx.recorded_guids(), ["same"]);
    }

    #[tokio::test]
    async fn episodes_without_enclosure_are_never_recorded() {
        let fx = Fixture::new();
        let feed = feed_xml(
            "Mixed",
            &[
                item("note", "Show notes only", T2, None),
                item("ep1", "Episode 1", T1, Some("https://example.com/ep1.mp3")),
            ],
        );
        let client = client_for(feed, &["https://example.com/ep1.mp3"]);
        let config = fx.config(&[FEED_URL]);

        for _ in 0..2 {
            let report = run(&client, &config, NoopReporter::shared()).await.unwrap();
            assert_eq!(report.skipped_no_content, 1);
        }

        assert_eq!(fx.recorded_guids(), ["ep1"]);
        assert_eq!(client.streamed(), ["https://example.com/ep1.mp3"]);
    }

    #[tokio::test]
    async fn dry_run_lists_without_touching_disk() {
        let fx = Fixture::new();
        std::fs::write(&fx.guid_file, "old\tOld\n").unwrap();
        let client = client_for(two_episode_feed(), &TWO_EPISODE_URLS);
        let reporter = RecordingReporter::new();

        let config = Config {
            dry_run: true,
            download_skip: true,
            guid_skip: true,
            ..fx.config(&[FEED_URL])
        };
        let report = run(&client, &config, reporter.clone()).await.unwrap();

        assert_eq!(report.listed_only, 2);
        assert_eq!(report.downloaded, 0);
        assert!(!fx.downloads.exists());
        assert!(client.streamed().is_empty());
        assert_eq!(std::fs::read_to_string(&fx.guid_file).unwrap(), "old\tOld\n");
        assert_eq!(
            reporter.listed_episodes(),
            [
                "Test Podcast 231114 Episode 1",
                "Test Podcast 231115 Episode 2"
            ]
        );
    }

    #[tokio::test]
    async fn download_skip_marks_episodes_as_seen() {
        let fx = Fixture::new();
        let client = client_for(two_episode_feed(), &TWO_EPISODE_URLS);
        let config = Config {
            download_skip: true,
            ..fx.config(&[FEED_URL])
        };

        let report = run(&client, &config, NoopReporter::shared()).await.unwrap();

        assert_eq!(report.listed_only, 2);
        assert!(client.streamed().is_empty());
        assert!(fx.files_in("Test Podcast").is_empty());
        assert_eq!(fx.recorded_guids(), ["ep1", "ep2"]);
    }

    #[tokio::test]
    async fn guid_skip_downloads_without_recording() {
        let fx = Fixture::new();
        let client = client_for(two_episode_feed(), &TWO_EPISODE_URLS);
        let config = Config {
            guid_skip: true,
            ..fx.config(&[FEED_URL, FEED_URL])
        };

        let report = run(&client, &config, NoopReporter::shared()).await.unwrap();

        // Same feed twice in one run: the in-memory set still deduplicates
        assert_eq!(report.downloaded, 2);
        assert_eq!(report.skipped_known, 2);
        assert_eq!(fx.files_in("Test Podcast").len(), 2);
        assert!(!fx.guid_file.exists());
    }

    #[tokio::test]
    async fn failed_episode_is_not_recorded_and_feed_continues() {
        let fx = Fixture::new();
        let client = client_for(two_episode_feed(), &["https://example.com/ep2.mp3"]);

        let report = run(&client, &fx.config(&[FEED_URL]), NoopReporter::shared())
            .await
            .unwrap();

        assert_eq!(report.downloaded, 1);
        assert_eq!(report.failed_episodes.len(), 1);
        assert_eq!(report.failed_episodes[0].0, "231114 Episode 1");
        assert!(!report.is_success());
        assert_eq!(fx.recorded_guids(), ["ep2"]);
    }

    #[tokio::test]
    async fn untaggable_episode_is_not_recorded() {
        let fx = Fixture::new();
        let client = client_for(two_episode_feed(), &["https://example.com/ep2.mp3"])
            .route("https://example.com/ep1.mp3", 200, Vec::new());

        let report = run(&client, &fx.config(&[FEED_URL]), NoopReporter::shared())
            .await
            .unwrap();

        assert_eq!(report.failed_episodes.len(), 1);
        assert_eq!(fx.recorded_guids(), ["ep2"]);
    }

    #[tokio::test]
    async fn unreachable_feed_does_not_stop_other_feeds() {
        let fx = Fixture::new();
        let client = client_for(two_episode_feed(), &TWO_EPISODE_URLS);
        let reporter = RecordingReporter::new();

        let report = run(
            &client,
            &fx.config(&["https://example.com/gone.xml", FEED_URL]),
            reporter.clone(),
        )
        .await
        .unwrap();

        assert_eq!(report.failed_feeds.len(), 1);
        assert_eq!(report.failed_feeds[0].0, "https://example.com/gone.xml");
        assert_eq!(report.feeds_completed, 1);
        assert_eq!(report.downloaded, 2);
        assert!(
            reporter
                .events()
                .iter()
                .any(|e| matches!(e, ProgressEvent::FeedFailed { .. }))
        );
    }

    #[tokio::test]
    async fn directory_failure_aborts_only_that_feed() {
        let fx = Fixture::new();
        // A regular file where the download root should be
        std::fs::write(&fx.downloads, b"not a directory").unwrap();
        let client = client_for(two_episode_feed(), &TWO_EPISODE_URLS);

        let report = run(&client, &fx.config(&[FEED_URL]), NoopReporter::shared())
            .await
            .unwrap();

        assert_eq!(report.failed_feeds.len(), 1);
        assert!(report.failed_feeds[0].1.contains("Failed to create directory"));
        assert!(client.streamed().is_empty());
        assert!(fx.recorded_guids().is_empty());
    }

    #[tokio::test]
    async fn sync_feed_creates_directory_and_uses_existing_one() {
        let fx = Fixture::new();
        std::fs::create_dir_all(fx.downloads.join("Test Podcast")).unwrap();
        let client = client_for(Vec::new(), &TWO_EPISODE_URLS);
        let feed = crate::feed::parse_feed(&two_episode_feed()).unwrap();

        let mut store = GuidStore::open(&fx.guid_file, true).unwrap();
        let mut known = store.load().unwrap();
        let result = sync_feed(
            &client,
            &feed,
            &fx.downloads,
            &SyncOptions::default(),
            &mut known,
            &mut store,
            &NoopReporter::shared(),
        )
        .await
        .unwrap();

        assert_eq!(result.downloaded, 2);
        assert!(known.contains("ep1") && known.contains("ep2"));
    }

    #[test]
    fn equal_timestamps_keep_reversed_feed_order() {
        let feed = crate::feed::parse_feed(&feed_xml(
            "Ties",
            &[
                item("b", "Newer", T1, Some("https://example.com/b.mp3")),
                item("a", "Older", T1, Some("https://example.com/a.mp3")),
            ],
        ))
        .unwrap();

        let order: Vec<_> = episodes_oldest_first(&feed)
            .into_iter()
            .map(|e| e.guid.as_str())
            .collect();
        assert_eq!(order, ["a", "b"]);
    }
}
