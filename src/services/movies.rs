//! Movie domain model: match candidates as returned by metadata sources and
//! the movie shape that ends up persisted.

use serde::{Deserialize, Serialize};

use super::media::ParsedMediaItem;
use super::titles::canonical_movie_title;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub name: Option<String>,
    pub genre_id: Option<i64>,
}

/// One scored candidate from a metadata source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieMatchCandidate {
    pub id: Option<i64>,
    pub title: String,
    pub original_title: Option<String>,
    pub release_year: Option<i32>,
    pub plot: Option<String>,
    /// Similarity score 0..=100 against the parsed title.
    #[serde(rename = "match")]
    pub score: i32,
    pub external_id: String,
    pub source: String,
    pub rating: Option<String>,
    pub poster: Option<String>,
    pub genres: Vec<Genre>,
    /// Alternative titles; used during scoring, not persisted.
    #[serde(default, skip_serializing)]
    pub akas: Vec<String>,
}

impl MovieMatchCandidate {
    pub fn canonical_title(&self) -> String {
        canonical_movie_title(&self.title, self.release_year)
    }

    pub fn to_movie(&self) -> Movie {
        Movie {
            id: None,
            title: self.title.clone(),
            original_title: self.original_title.clone(),
            release_year: self.release_year,
            plot: self.plot.clone(),
            external_id: self.external_id.clone(),
            source: self.source.clone(),
            rating: self.rating.clone(),
            poster: self.poster.clone(),
            genres: self.genres.clone(),
        }
    }
}

/// A matched movie. Unique per (source, external_id); several media items
/// may link to the same movie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: Option<i64>,
    pub title: String,
    pub original_title: Option<String>,
    pub release_year: Option<i32>,
    pub plot: Option<String>,
    pub external_id: String,
    pub source: String,
    pub rating: Option<String>,
    pub poster: Option<String>,
    pub genres: Vec<Genre>,
}

impl Movie {
    pub fn canonical_title(&self) -> String {
        canonical_movie_title(&self.title, self.release_year)
    }
}

/// Input for the manual-match and fix-match jobs: which source the chosen
/// candidate comes from, its id there, and the media item to link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieMatchRequest {
    /// Source tag: `tmdb`, `imdb` or `local`. Anything else fails the job
    /// before any work happens.
    pub match_type: String,
    pub source_id: String,
    pub media_item: ParsedMediaItem,
}

/// Why a scanned item ended up unmatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonMatchReason {
    /// Candidates existed but none reached the acceptance threshold.
    LowThreshold,
    /// More than one candidate tied at the acceptable top score.
    MultipleCandidates,
}

impl NonMatchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NonMatchReason::LowThreshold => "low_threshold",
            NonMatchReason::MultipleCandidates => "multiple_candidates",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "low_threshold" => Some(NonMatchReason::LowThreshold),
            "multiple_candidates" => Some(NonMatchReason::MultipleCandidates),
            _ => None,
        }
    }
}
