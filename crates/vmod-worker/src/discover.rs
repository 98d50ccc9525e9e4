//! Video discovery for batch runs.

use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

const VIDEO_EXTENSION: &str = "mp4";

/// Whether `path` names an `.mp4` file, ignoring extension case.
pub fn is_mp4(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(VIDEO_EXTENSION))
}

/// Videos to process for a path argument, in sorted order.
///
/// A file is returned as is. A directory is walked recursively, following
/// links, for `.mp4` files.
pub fn discover_videos(path: &Path) -> io::Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is neither a file nor a directory", path.display()),
        ));
    }

    let mut videos = Vec::new();
    for entry in WalkDir::new(path).follow_links(true) {
        match entry {
            Ok(entry) if entry.file_type().is_file() && is_mp4(entry.path()) => {
                videos.push(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable entry: {}", e),
        }
    }

    videos.sort();
    Ok(videos)
}
