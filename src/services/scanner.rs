//! Filesystem scanner: walk a media tree and parse every file.
//!
//! The walk is lazy and restartable; `count_items` does a cheap first pass
//! so jobs can report progress totals before any parsing happens. File-type
//! sniffing reads magic bytes rather than trusting extensions, and skipping
//! a non-video file is an event worth logging, never an error.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::filename_parser;
use super::media::ParsedMediaItem;

#[derive(Debug, Clone)]
pub struct MediaScanner {
    scan_path: PathBuf,
    skip_filetype_checks: bool,
}

impl MediaScanner {
    pub fn new(scan_path: impl Into<PathBuf>, skip_filetype_checks: bool) -> Self {
        Self {
            scan_path: scan_path.into(),
            skip_filetype_checks,
        }
    }

    pub fn scan_path(&self) -> &Path {
        &self.scan_path
    }

    /// Total number of files under the scan root, video or not. Progress
    /// totals count everything the walk will visit.
    pub fn count_items(&self) -> usize {
        WalkDir::new(&self.scan_path)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .count()
    }

    /// Lazily walk the tree and parse each file into a media item.
    /// Unreadable entries are skipped with a warning; calling this again
    /// restarts the walk from scratch.
    pub fn items(&self) -> impl Iterator<Item = ParsedMediaItem> + '_ {
        WalkDir::new(&self.scan_path)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(error) => {
                    warn!(error = %error, "skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(move |entry| {
                let filename = entry.file_name().to_string_lossy().into_owned();
                if !self.skip_filetype_checks && !is_video_file(entry.path()) {
                    debug!(filename = %filename, "skipping non-video file");
                    return None;
                }
                let directory = entry
                    .path()
                    .parent()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let parsed = filename_parser::parse(&filename);
                Some(ParsedMediaItem::from_parsed_name(filename, directory, parsed))
            })
    }
}

/// Magic-byte sniff: is this actually a video file, whatever its name says?
fn is_video_file(path: &Path) -> bool {
    match infer::get_from_path(path) {
        Ok(Some(kind)) => kind.matcher_type() == infer::MatcherType::Video,
        Ok(None) => false,
        Err(error) => {
            warn!(path = %path.display(), error = %error, "failed to sniff file type");
            false
        }
    }
}
