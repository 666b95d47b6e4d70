use std::sync::Arc;

/// Events emitted while feeds are processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A feed's episodes have been sorted and compared against the GUID file
    FeedLoaded {
        feed_title: String,
        total_episodes: usize,
        new_episodes: usize,
    },

    /// An episode is about to be processed (or would be, with downloads skipped)
    EpisodeStarting {
        feed_title: String,
        display_title: String,
    },

    /// An episode was downloaded, tagged and recorded
    EpisodeCompleted {
        feed_title: String,
        display_title: String,
        bytes_downloaded: u64,
    },

    /// Downloading or tagging an episode failed; it will be retried next run
    EpisodeFailed {
        feed_title: String,
        display_title: String,
        error: String,
    },

    /// A whole feed was abandoned
    FeedFailed { source: String, error: String },
}

/// Trait for reporting progress events during a run.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter, used for quiet mode
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {}
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}

/// Prints one `"<feed title> <display title>"` line per episode to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct EpisodeListReporter;

impl EpisodeListReporter {
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }

    /// The line printed for an episode
    pub fn format_line(feed_title: &str, display_title: &str) -> String {
        format!("{feed_title} {display_title}")
    }
}

impl ProgressReporter for EpisodeListReporter {
    fn report(&self, event: ProgressEvent) {
        if let ProgressEvent::EpisodeStarting {
            feed_title,
            display_title,
        } = event
        {
            println!("{}", Self::format_line(&feed_title, &display_title));
        }
    }
}

/// Keeps every event in memory
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    events: std::sync::Mutex<Vec<ProgressEvent>>,
}

#[cfg(test)]
impl RecordingReporter {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// The episode lines that [`EpisodeListReporter`] would have printed
    pub(crate) fn listed_episodes(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::EpisodeStarting {
                    feed_title,
                    display_title,
                } => Some(EpisodeListReporter::format_line(&feed_title, &display_title)),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl ProgressReporter for RecordingReporter {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
