//! IMDB source adapter over the public suggestions endpoint.
//!
//! The suggestions API is the autocomplete backend of the IMDB search box:
//! no api key, sparse payloads (title, year, poster), ids shaped `tt1234567`.
//! Good enough for candidate matching and as a fallback when TMDB has no
//! answer.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::services::movies::MovieMatchCandidate;
use crate::services::sources::{MediaSource, SearchItem, SearchResults};

const SUGGESTIONS_BASE_URL: &str = "https://v2.sg.media-imdb.com";

#[derive(Debug, Deserialize)]
struct SuggestionResponse {
    #[serde(default)]
    d: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
struct Suggestion {
    /// Title.
    l: Option<String>,
    /// Release year.
    y: Option<i32>,
    /// Identifier, `tt`-prefixed for titles.
    id: Option<String>,
    /// Poster image.
    i: Option<SuggestionImage>,
}

#[derive(Debug, Deserialize)]
struct SuggestionImage {
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
}

pub struct ImdbSource {
    client: reqwest::Client,
    base_url: String,
}

impl ImdbSource {
    pub fn new() -> Self {
        Self::with_base_url(SUGGESTIONS_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    async fn suggestions(&self, query: &str) -> Result<Vec<Suggestion>> {
        let initial = query
            .chars()
            .next()
            .map(|c| c.to_ascii_lowercase())
            .unwrap_or('_');
        let url = format!(
            "{}/suggestion/{}/{}.json",
            self.base_url,
            initial,
            urlencoding::encode(query)
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("imdb suggestion request failed for '{query}'"))?;
        if !response.status().is_success() {
            bail!("imdb returned {} for '{query}'", response.status());
        }
        let body: SuggestionResponse = response
            .json()
            .await
            .with_context(|| format!("imdb returned invalid json for '{query}'"))?;
        debug!(query, results = body.d.len(), "imdb suggestion lookup");
        Ok(body.d)
    }
}

impl Default for ImdbSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaSource for ImdbSource {
    fn name(&self) -> &'static str {
        "imdb"
    }

    async fn match_title(&self, title: &str) -> Result<Vec<MovieMatchCandidate>> {
        let suggestions = self.suggestions(title).await?;
        Ok(suggestions
            .iter()
            .filter_map(candidate_from_suggestion)
            .collect())
    }

    async fn search(&self, title: &str) -> Result<SearchResults> {
        let suggestions = self.suggestions(title).await?;
        let results: Vec<SearchItem> = suggestions
            .iter()
            .filter_map(|s| {
                let candidate = candidate_from_suggestion(s)?;
                Some(SearchItem {
                    title: candidate.title,
                    release_year: candidate.release_year,
                    plot: None,
                    poster: candidate.poster,
                    source: "imdb".into(),
                    source_id: candidate.external_id,
                })
            })
            .collect();
        Ok(SearchResults {
            total_results: results.len(),
            results,
        })
    }

    async fn get_by_id(&self, id: &str) -> Result<MovieMatchCandidate> {
        // The suggestion endpoint resolves tt-ids directly.
        let query = format!("tt{id}");
        let suggestions = self.suggestions(&query).await?;
        suggestions
            .iter()
            .filter_map(candidate_from_suggestion)
            .find(|c| c.external_id == id)
            .with_context(|| format!("imdb has no title tt{id}"))
    }
}

/// Map a suggestion to a candidate. Non-title rows (people, keywords) carry
/// no `tt` id and are dropped.
fn candidate_from_suggestion(suggestion: &Suggestion) -> Option<MovieMatchCandidate> {
    let id = suggestion.id.as_deref()?;
    let external_id = id.strip_prefix("tt")?;
    let title = suggestion.l.clone()?;
    Some(MovieMatchCandidate {
        id: None,
        title,
        original_title: None,
        release_year: suggestion.y,
        plot: None,
        score: 0,
        external_id: external_id.to_string(),
        source: "imdb".into(),
        rating: None,
        poster: suggestion
            .i
            .as_ref()
            .and_then(|i| i.image_url.clone()),
        genres: Vec::new(),
        akas: Vec::new(),
    })
}
