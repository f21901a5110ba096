//! Canonical library path rendering.
//!
//! A matched media item gets a deterministic home in the library, rendered
//! from a token template. The default layout is one directory per movie:
//! `{movies_path}/{canonical_title}/{canonical_title}.{container}`.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use super::media::ParsedMediaItem;
use super::movies::Movie;
use super::titles::canonical_movie_title;

pub const DEFAULT_MOVIE_TEMPLATE: &str =
    "{movies_path}/{canonical_title}/{canonical_title}.{container}";

/// Characters no mainstream filesystem accepts in file names.
static ILLEGAL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/*?:"<>|]"#).expect("regex"));

#[derive(Debug, Clone)]
pub struct NameFormatter {
    movies_path: String,
    template: String,
}

impl NameFormatter {
    pub fn new(movies_path: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            movies_path: movies_path.into(),
            template: template.into(),
        }
    }

    /// Render the absolute target path for a matched item. The movie title
    /// drives naming; the item contributes container and resolution.
    pub fn format(&self, movie: &Movie, media: &ParsedMediaItem) -> PathBuf {
        let safe_title = ILLEGAL_CHARS.replace_all(&movie.title, "");
        let safe_title = safe_title.trim();
        let canonical = canonical_movie_title(safe_title, movie.release_year);
        let container = media
            .container
            .clone()
            .or_else(|| {
                Path::new(&media.filename)
                    .extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
            })
            .unwrap_or_default();
        let year = movie
            .release_year
            .map(|y| y.to_string())
            .unwrap_or_default();

        let rendered = self
            .template
            .replace("{movies_path}", self.movies_path.trim_end_matches('/'))
            .replace("{canonical_title}", &canonical)
            .replace("{title}", safe_title)
            .replace("{year}", &year)
            .replace("{container}", &container)
            .replace("{resolution}", media.resolution.as_deref().unwrap_or(""))
            .replace("{filename}", &media.filename);
        // A missing container would otherwise leave a dangling dot.
        PathBuf::from(rendered.trim_end_matches('.'))
    }
}
