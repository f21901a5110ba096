//! Media item domain model.
//!
//! A [`ParsedMediaItem`] is one file found during a scan together with
//! everything the filename parser extracted from it. It starts life as a
//! transient value and picks up database ids, a job id and target fields as
//! it moves through the pipeline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::filename_parser::ParsedName;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedMediaItem {
    pub id: Option<i64>,
    pub filename: String,
    /// Directory the file lives in, without the filename.
    pub path: String,
    pub target_filename: Option<String>,
    pub target_path: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub season: Option<i32>,
    pub episode: Option<i32>,
    pub episode_name: Option<String>,
    pub resolution: Option<String>,
    pub quality: Option<String>,
    pub codec: Option<String>,
    pub audio: Option<String>,
    pub group: Option<String>,
    pub region: Option<String>,
    pub container: Option<String>,
    pub website: Option<String>,
    pub language: Option<String>,
    pub sbs: Option<String>,
    pub size: Option<String>,
    pub extended: bool,
    pub hardcoded: bool,
    pub proper: bool,
    pub repack: bool,
    pub widescreen: bool,
    pub unrated: bool,
    pub three_d: bool,
    pub hdr: bool,
    pub excess: Vec<String>,
    pub job_id: Option<String>,
    pub ignored: bool,
    pub matched_movie_id: Option<i64>,
}

impl ParsedMediaItem {
    pub fn from_parsed_name(filename: impl Into<String>, path: impl Into<String>, parsed: ParsedName) -> Self {
        Self {
            filename: filename.into(),
            path: path.into(),
            title: if parsed.title.is_empty() {
                None
            } else {
                Some(parsed.title)
            },
            year: parsed.year,
            season: parsed.season,
            episode: parsed.episode,
            episode_name: parsed.episode_name,
            resolution: parsed.resolution,
            quality: parsed.quality,
            codec: parsed.codec,
            audio: parsed.audio,
            group: parsed.group,
            region: parsed.region,
            container: parsed.container,
            website: parsed.website,
            language: parsed.language,
            sbs: parsed.sbs,
            size: parsed.size,
            extended: parsed.extended,
            hardcoded: parsed.hardcoded,
            proper: parsed.proper,
            repack: parsed.repack,
            widescreen: parsed.widescreen,
            unrated: parsed.unrated,
            three_d: parsed.three_d,
            hdr: parsed.hdr,
            excess: parsed.excess,
            ..Self::default()
        }
    }

    /// Anything carrying a season or an episode marker is series content,
    /// which the movie pipeline leaves alone.
    pub fn is_movie(&self) -> bool {
        self.season.is_none() && self.episode.is_none()
    }

    pub fn absolute_path(&self) -> PathBuf {
        Path::new(&self.path).join(&self.filename)
    }

    pub fn absolute_target_path(&self) -> Option<PathBuf> {
        match (&self.target_path, &self.target_filename) {
            (Some(path), Some(filename)) => Some(Path::new(path).join(filename)),
            _ => None,
        }
    }

    pub fn already_linked(&self) -> bool {
        self.target_path.is_some() && self.target_filename.is_some()
    }

    /// Split an absolute target path into the directory/filename pair the
    /// item persists.
    pub fn set_target_absolute_path(&mut self, absolute: &Path) {
        self.target_filename = absolute
            .file_name()
            .map(|f| f.to_string_lossy().into_owned());
        self.target_path = absolute
            .parent()
            .map(|p| p.to_string_lossy().into_owned());
    }

    /// Fresh copy for re-matching: same parsed attributes, no persistence
    /// or target state.
    pub fn transient_copy(&self) -> Self {
        Self {
            id: None,
            target_filename: None,
            target_path: None,
            matched_movie_id: None,
            job_id: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::filename_parser;
    use pretty_assertions::assert_eq;

    fn item(filename: &str) -> ParsedMediaItem {
        ParsedMediaItem::from_parsed_name(filename, "/library/downloads", filename_parser::parse(filename))
    }

    #[test]
    fn movie_detection() {
        assert!(item("Aquaman.2018.2160p.WEB-DL.DD+2.0.HDR.HEVC-MOMA.mkv").is_movie());
        assert!(!item("Breaking.Bad.S01E05.720p.HDTV.x264-CTU.mkv").is_movie());
        assert!(!item("Future Boy Conan - 01 - Remnant Island.mkv").is_movie());
    }

    #[test]
    fn absolute_paths() {
        let mut media = item("Aquaman.2018.2160p.WEB-DL.DD+2.0.HDR.HEVC-MOMA.mkv");
        assert_eq!(
            media.absolute_path(),
            PathBuf::from("/library/downloads/Aquaman.2018.2160p.WEB-DL.DD+2.0.HDR.HEVC-MOMA.mkv")
        );
        assert!(!media.already_linked());
        assert!(media.absolute_target_path().is_none());

        media.set_target_absolute_path(Path::new("/library/movies/Aquaman (2018)/Aquaman (2018).mkv"));
        assert_eq!(media.target_path.as_deref(), Some("/library/movies/Aquaman (2018)"));
        assert_eq!(media.target_filename.as_deref(), Some("Aquaman (2018).mkv"));
        assert!(media.already_linked());
    }

    #[test]
    fn transient_copy_clears_state() {
        let mut media = item("Aquaman.2018.2160p.WEB-DL.DD+2.0.HDR.HEVC-MOMA.mkv");
        media.id = Some(7);
        media.matched_movie_id = Some(3);
        media.job_id = Some("abc".into());
        media.set_target_absolute_path(Path::new("/m/Aquaman (2018)/Aquaman (2018).mkv"));

        let copy = media.transient_copy();
        assert_eq!(copy.id, None);
        assert_eq!(copy.matched_movie_id, None);
        assert_eq!(copy.job_id, None);
        assert!(!copy.already_linked());
        assert_eq!(copy.title, media.title);
        assert_eq!(copy.filename, media.filename);
    }
}
