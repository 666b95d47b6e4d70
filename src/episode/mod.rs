mod download;
mod filename;

pub use download::download_episode;
pub use filename::{
    DownloadTarget, REPLACEMENT_CHAR, display_title, get_audio_extension, sanitize,
};
