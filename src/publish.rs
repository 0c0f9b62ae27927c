use std::path::{Path, PathBuf};

use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedVideo {
    pub path: PathBuf,
    pub title: String,
}

/// Stand-in for a social network upload: logs the action and nothing else.
pub fn publish(video: &Path, title: &str) -> PublishedVideo {
    info!(path = %video.display(), title, "(simulated) publishing {} with title: {}", video.display(), title);
    PublishedVideo {
        path: video.to_path_buf(),
        title: title.to_string(),
    }
}
