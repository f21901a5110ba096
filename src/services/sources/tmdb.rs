//! TMDB (The Movie Database) source adapter over the v3 REST API.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::services::movies::{Genre, MovieMatchCandidate};
use crate::services::sources::{MediaSource, SearchItem, SearchResults};

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w600_and_h900_bestv2";
const PLOT_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Deserialize)]
struct TmdbMovie {
    id: i64,
    title: String,
    original_title: Option<String>,
    overview: Option<String>,
    release_date: Option<String>,
    poster_path: Option<String>,
    vote_average: Option<f64>,
    #[serde(default)]
    genre_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    total_results: usize,
    #[serde(default)]
    results: Vec<TmdbMovie>,
}

#[derive(Debug, Deserialize)]
struct TmdbAlternativeTitles {
    #[serde(default)]
    titles: Vec<TmdbAlternativeTitle>,
}

#[derive(Debug, Deserialize)]
struct TmdbAlternativeTitle {
    title: String,
}

#[derive(Debug, Deserialize)]
struct TmdbGenreList {
    #[serde(default)]
    genres: Vec<TmdbGenre>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbFindResponse {
    #[serde(default)]
    movie_results: Vec<TmdbMovie>,
}

pub struct TmdbSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    genres: tokio::sync::OnceCell<HashMap<i64, String>>,
}

impl TmdbSource {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, TMDB_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: Option<String>, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key: api_key.unwrap_or_default(),
            genres: tokio::sync::OnceCell::new(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .with_context(|| format!("tmdb request failed: {path}"))?;
        if !response.status().is_success() {
            bail!("tmdb returned {} for {path}", response.status());
        }
        response
            .json::<T>()
            .await
            .with_context(|| format!("tmdb returned invalid json for {path}"))
    }

    /// Genre id -> name mapping, fetched once per process. Genres are
    /// decoration; a failed fetch degrades to an empty map instead of
    /// failing the match.
    async fn genre_names(&self) -> &HashMap<i64, String> {
        self.genres
            .get_or_init(|| async {
                match self
                    .get_json::<TmdbGenreList>("/genre/movie/list", &[])
                    .await
                {
                    Ok(list) => list
                        .genres
                        .into_iter()
                        .map(|g| (g.id, g.name))
                        .collect(),
                    Err(error) => {
                        warn!(error = %error, "failed to fetch tmdb genre list");
                        HashMap::new()
                    }
                }
            })
            .await
    }

    async fn alternative_titles(&self, movie_id: i64) -> Vec<String> {
        match self
            .get_json::<TmdbAlternativeTitles>(
                &format!("/movie/{movie_id}/alternative_titles"),
                &[],
            )
            .await
        {
            Ok(akas) => akas.titles.into_iter().map(|t| t.title).collect(),
            Err(error) => {
                warn!(movie_id, error = %error, "failed to fetch tmdb alternative titles");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl MediaSource for TmdbSource {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    async fn match_title(&self, title: &str) -> Result<Vec<MovieMatchCandidate>> {
        let response: TmdbSearchResponse = self
            .get_json("/search/movie", &[("query", title)])
            .await?;
        debug!(title, results = response.results.len(), "tmdb title search");

        let genres = self.genre_names().await;
        let mut candidates = Vec::with_capacity(response.results.len());
        for movie in response.results {
            let akas = self.alternative_titles(movie.id).await;
            candidates.push(candidate_from_movie(&movie, akas, genres));
        }
        Ok(candidates)
    }

    async fn search(&self, title: &str) -> Result<SearchResults> {
        let response: TmdbSearchResponse = self
            .get_json("/search/movie", &[("query", title)])
            .await?;
        Ok(SearchResults {
            total_results: response.total_results,
            results: response
                .results
                .iter()
                .map(|movie| SearchItem {
                    title: movie.title.clone(),
                    release_year: release_year(movie),
                    plot: movie.overview.as_deref().map(shorten_plot),
                    poster: poster_url(movie),
                    source: "tmdb".into(),
                    source_id: movie.id.to_string(),
                })
                .collect(),
        })
    }

    async fn get_by_id(&self, id: &str) -> Result<MovieMatchCandidate> {
        let movie: TmdbMovie = self.get_json(&format!("/movie/{id}"), &[]).await?;
        let akas = self.alternative_titles(movie.id).await;
        let genres = self.genre_names().await;
        Ok(candidate_from_movie(&movie, akas, genres))
    }

    async fn get_by_imdb_id(&self, imdb_id: &str) -> Result<Option<MovieMatchCandidate>> {
        let response: TmdbFindResponse = self
            .get_json(
                &format!("/find/tt{imdb_id}"),
                &[("external_source", "imdb_id")],
            )
            .await?;
        let genres = self.genre_names().await;
        Ok(response
            .movie_results
            .first()
            .map(|movie| candidate_from_movie(movie, Vec::new(), genres)))
    }
}

fn candidate_from_movie(
    movie: &TmdbMovie,
    akas: Vec<String>,
    genre_names: &HashMap<i64, String>,
) -> MovieMatchCandidate {
    MovieMatchCandidate {
        id: None,
        title: movie.title.clone(),
        original_title: movie.original_title.clone(),
        release_year: release_year(movie),
        plot: movie.overview.as_deref().map(shorten_plot),
        score: 0,
        external_id: movie.id.to_string(),
        source: "tmdb".into(),
        rating: movie.vote_average.map(|v| v.to_string()),
        poster: poster_url(movie),
        genres: movie
            .genre_ids
            .iter()
            .map(|id| Genre {
                name: genre_names.get(id).cloned(),
                genre_id: Some(*id),
            })
            .collect(),
        akas,
    }
}

fn release_year(movie: &TmdbMovie) -> Option<i32> {
    movie
        .release_date
        .as_deref()
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse().ok())
}

fn poster_url(movie: &TmdbMovie) -> Option<String> {
    movie
        .poster_path
        .as_deref()
        .map(|path| format!("{POSTER_BASE_URL}{path}"))
}

fn shorten_plot(plot: &str) -> String {
    if plot.chars().count() <= PLOT_MAX_CHARS {
        return plot.to_string();
    }
    let cut: String = plot.chars().take(PLOT_MAX_CHARS).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn movie() -> TmdbMovie {
        TmdbMovie {
            id: 297802,
            title: "Aquaman".into(),
            original_title: Some("Aquaman".into()),
            overview: Some("Once home to the most advanced civilization on Earth, Atlantis is now an underwater kingdom ruled by the power-hungry King Orm.".into()),
            release_date: Some("2018-12-07".into()),
            poster_path: Some("/poster.jpg".into()),
            vote_average: Some(6.9),
            genre_ids: vec![28, 14],
        }
    }

    #[test]
    fn maps_search_movie_to_candidate() {
        let genres: HashMap<i64, String> = [(28, "Action".to_string())].into();
        let candidate =
            candidate_from_movie(&movie(), vec!["Aquaman und Atlantis".into()], &genres);
        assert_eq!(candidate.external_id, "297802");
        assert_eq!(candidate.source, "tmdb");
        assert_eq!(candidate.release_year, Some(2018));
        assert_eq!(
            candidate.poster.as_deref(),
            Some("https://image.tmdb.org/t/p/w600_and_h900_bestv2/poster.jpg")
        );
        assert_eq!(candidate.akas, vec!["Aquaman und Atlantis".to_string()]);
        assert_eq!(candidate.genres.len(), 2);
        assert_eq!(candidate.genres[0].name.as_deref(), Some("Action"));
        // Unknown genre ids keep the id but carry no name.
        assert_eq!(candidate.genres[1].name, None);
        assert_eq!(candidate.genres[1].genre_id, Some(14));
    }

    #[test]
    fn release_year_handles_missing_date() {
        let mut m = movie();
        m.release_date = None;
        assert_eq!(release_year(&m), None);
        m.release_date = Some("".into());
        assert_eq!(release_year(&m), None);
    }

    #[test]
    fn long_plots_are_shortened() {
        let long = "x".repeat(300);
        let short = shorten_plot(&long);
        assert_eq!(short.chars().count(), PLOT_MAX_CHARS + 3);
        assert!(short.ends_with("..."));
        assert_eq!(shorten_plot("brief"), "brief");
    }
}
