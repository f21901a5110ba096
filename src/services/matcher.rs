//! Candidate matching: score source results against a parsed title and
//! compose sources into strategies.
//!
//! Scoring is symmetric fuzzy similarity over canonical titles (lowercased,
//! transliterated, year-suffixed), so a year mismatch costs a couple of
//! points without sinking an otherwise perfect title match. When a query
//! year is known, a boost pass breaks ties at the top score in favor of
//! candidates released within a year of it.

use std::sync::Arc;

use anyhow::{Result, bail};
use rapidfuzz::fuzz;
use tracing::{debug, info, warn};

use super::media::ParsedMediaItem;
use super::movies::MovieMatchCandidate;
use super::sources::MediaSource;
use super::titles::canonical_movie_title;

/// At most this many candidates survive scoring.
const MAX_CANDIDATES: usize = 5;

/// Normalized indel similarity scaled to 0..=100 and rounded, matching the
/// classic fuzz ratio. `fuzz::ratio` itself reports 0.0..=1.0.
pub fn similarity(a: &str, b: &str) -> i32 {
    (fuzz::ratio(a.chars(), b.chars()) * 100.0).round() as i32
}

/// Best similarity between the canonical query and any of the candidate's
/// names: primary title first, then original title, then akas. Stops early
/// on a perfect score.
fn score_candidate(canonical_query: &str, candidate: &MovieMatchCandidate) -> i32 {
    let mut best = similarity(
        canonical_query,
        &candidate.canonical_title().to_lowercase(),
    );
    if best < 100
        && let Some(original) = &candidate.original_title
        && *original != candidate.title
    {
        let original_canonical =
            canonical_movie_title(original, candidate.release_year).to_lowercase();
        best = best.max(similarity(canonical_query, &original_canonical));
    }
    if best < 100 {
        for aka in &candidate.akas {
            let aka_canonical =
                canonical_movie_title(aka, candidate.release_year).to_lowercase();
            best = best.max(similarity(canonical_query, &aka_canonical));
            if best == 100 {
                break;
            }
        }
    }
    best
}

/// Among candidates tied at the top score, shave one point off those whose
/// release year is more than a year away from the query year. Candidates
/// without a year are left alone; with fewer than two candidates there is
/// no tie to break.
fn boost_by_year(candidates: &mut [MovieMatchCandidate], query_year: Option<i32>) {
    let Some(year) = query_year else { return };
    if candidates.len() < 2 {
        return;
    }
    let top_score = candidates[0].score;
    for candidate in candidates.iter_mut() {
        if candidate.score != top_score {
            continue;
        }
        match candidate.release_year {
            Some(release_year) if (release_year - year).abs() > 1 => {
                candidate.score -= 1;
            }
            _ => {}
        }
    }
}

/// How sources are combined for a single match attempt. Selected by config
/// key; the set is closed on purpose.
enum MatcherStrategy {
    Single {
        source: Arc<dyn MediaSource>,
    },
    /// Secondary is consulted only when the primary has nothing at all.
    Fallback {
        primary: Arc<dyn MediaSource>,
        secondary: Arc<dyn MediaSource>,
    },
    /// Both sources queried, duplicates resolved via the primary's imdb
    /// cross-reference.
    Parallel {
        primary: Arc<dyn MediaSource>,
        secondary: Arc<dyn MediaSource>,
    },
    /// Secondary kicks in when the primary's best score is below the
    /// acceptance threshold, not only when it is empty.
    LowThresholdFallback {
        primary: Arc<dyn MediaSource>,
        secondary: Arc<dyn MediaSource>,
        threshold: i32,
    },
}

pub struct Matcher {
    strategy: MatcherStrategy,
}

impl Matcher {
    pub fn single(source: Arc<dyn MediaSource>) -> Self {
        Self {
            strategy: MatcherStrategy::Single { source },
        }
    }

    pub fn fallback(primary: Arc<dyn MediaSource>, secondary: Arc<dyn MediaSource>) -> Self {
        Self {
            strategy: MatcherStrategy::Fallback { primary, secondary },
        }
    }

    pub fn parallel(primary: Arc<dyn MediaSource>, secondary: Arc<dyn MediaSource>) -> Self {
        Self {
            strategy: MatcherStrategy::Parallel { primary, secondary },
        }
    }

    pub fn low_threshold_fallback(
        primary: Arc<dyn MediaSource>,
        secondary: Arc<dyn MediaSource>,
        threshold: i32,
    ) -> Self {
        Self {
            strategy: MatcherStrategy::LowThresholdFallback {
                primary,
                secondary,
                threshold,
            },
        }
    }

    /// Build a matcher from its config key. Unknown keys fail at startup.
    pub fn from_key(
        key: &str,
        primary: Arc<dyn MediaSource>,
        secondary: Arc<dyn MediaSource>,
        threshold: i32,
    ) -> Result<Self> {
        match key {
            "single" => Ok(Self::single(primary)),
            "fallback" => Ok(Self::fallback(primary, secondary)),
            "parallel" => Ok(Self::parallel(primary, secondary)),
            "low_threshold_fallback" => {
                Ok(Self::low_threshold_fallback(primary, secondary, threshold))
            }
            other => bail!("unknown matcher '{other}'"),
        }
    }

    /// Top five scored candidates for the item, descending by score.
    pub async fn top5_matches(
        &self,
        item: &ParsedMediaItem,
    ) -> Result<Vec<MovieMatchCandidate>> {
        match &self.strategy {
            MatcherStrategy::Single { source } => self.scored(source.as_ref(), item).await,
            MatcherStrategy::Fallback { primary, secondary } => {
                let matches = self.scored(primary.as_ref(), item).await?;
                if matches.is_empty() {
                    info!(
                        title = item.title.as_deref().unwrap_or(""),
                        primary = primary.name(),
                        secondary = secondary.name(),
                        "primary source empty, falling back"
                    );
                    self.scored(secondary.as_ref(), item).await
                } else {
                    Ok(matches)
                }
            }
            MatcherStrategy::Parallel { primary, secondary } => {
                let (primary_matches, secondary_matches) = tokio::join!(
                    self.scored(primary.as_ref(), item),
                    self.scored(secondary.as_ref(), item)
                );
                Ok(merge_with_dedup(
                    primary.as_ref(),
                    primary_matches?,
                    secondary_matches?,
                )
                .await)
            }
            MatcherStrategy::LowThresholdFallback {
                primary,
                secondary,
                threshold,
            } => {
                let primary_matches = self.scored(primary.as_ref(), item).await?;
                let best = primary_matches.first().map(|c| c.score).unwrap_or(0);
                if best >= *threshold {
                    return Ok(primary_matches);
                }
                debug!(
                    best,
                    threshold,
                    secondary = secondary.name(),
                    "primary best score below threshold, consulting secondary"
                );
                let secondary_matches = self.scored(secondary.as_ref(), item).await?;
                Ok(merge_with_dedup(primary.as_ref(), primary_matches, secondary_matches).await)
            }
        }
    }

    async fn scored(
        &self,
        source: &dyn MediaSource,
        item: &ParsedMediaItem,
    ) -> Result<Vec<MovieMatchCandidate>> {
        let title = item.title.as_deref().unwrap_or("");
        let mut candidates = source.match_title(title).await?;
        if candidates.is_empty() {
            debug!(title, source = source.name(), "source returned no candidates");
            return Ok(candidates);
        }

        let canonical_query = canonical_movie_title(title, item.year).to_lowercase();
        for candidate in &mut candidates {
            candidate.score = score_candidate(&canonical_query, candidate);
        }
        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        candidates.truncate(MAX_CANDIDATES);
        boost_by_year(&mut candidates, item.year);
        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        candidates.truncate(MAX_CANDIDATES);
        Ok(candidates)
    }
}

/// Merge secondary results into primary ones, collapsing entities the
/// primary also knows. For each secondary candidate the primary is asked to
/// cross-reference its external id; when both lists carry the same entity
/// the higher-scored one survives. Cross-reference failures degrade to
/// "unknown" so a flaky primary cannot drop secondary results.
async fn merge_with_dedup(
    primary: &dyn MediaSource,
    mut primary_matches: Vec<MovieMatchCandidate>,
    secondary_matches: Vec<MovieMatchCandidate>,
) -> Vec<MovieMatchCandidate> {
    let mut merged = Vec::new();
    for secondary in secondary_matches {
        let cross = match primary.get_by_imdb_id(&secondary.external_id).await {
            Ok(found) => found,
            Err(error) => {
                warn!(
                    external_id = %secondary.external_id,
                    error = %error,
                    "imdb cross-reference failed, keeping secondary candidate"
                );
                None
            }
        };
        match cross {
            Some(known) => {
                let duplicate = primary_matches
                    .iter()
                    .position(|m| m.external_id == known.external_id);
                match duplicate {
                    Some(pos) if primary_matches[pos].score < secondary.score => {
                        primary_matches.remove(pos);
                        merged.push(secondary);
                    }
                    Some(_) => {} // primary's copy scores at least as high
                    None => merged.push(secondary),
                }
            }
            None => merged.push(secondary),
        }
    }
    merged.extend(primary_matches);
    merged.sort_by(|a, b| b.score.cmp(&a.score));
    merged.truncate(MAX_CANDIDATES);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::sources::SearchResults;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    struct StubSource {
        tag: &'static str,
        candidates: Vec<MovieMatchCandidate>,
        by_imdb: HashMap<String, MovieMatchCandidate>,
    }

    impl StubSource {
        fn new(tag: &'static str, candidates: Vec<MovieMatchCandidate>) -> Self {
            Self {
                tag,
                candidates,
                by_imdb: HashMap::new(),
            }
        }

        fn with_imdb_mapping(
            mut self,
            imdb_id: &str,
            candidate: MovieMatchCandidate,
        ) -> Self {
            self.by_imdb.insert(imdb_id.to_string(), candidate);
            self
        }
    }

    #[async_trait]
    impl MediaSource for StubSource {
        fn name(&self) -> &'static str {
            self.tag
        }

        async fn match_title(&self, _title: &str) -> Result<Vec<MovieMatchCandidate>> {
            Ok(self.candidates.clone())
        }

        async fn search(&self, _title: &str) -> Result<SearchResults> {
            Ok(SearchResults::default())
        }

        async fn get_by_id(&self, _id: &str) -> Result<MovieMatchCandidate> {
            bail!("not used in these tests")
        }

        async fn get_by_imdb_id(&self, imdb_id: &str) -> Result<Option<MovieMatchCandidate>> {
            Ok(self.by_imdb.get(imdb_id).cloned())
        }
    }

    fn candidate(title: &str, year: Option<i32>, external_id: &str) -> MovieMatchCandidate {
        MovieMatchCandidate {
            title: title.into(),
            release_year: year,
            external_id: external_id.into(),
            source: "tmdb".into(),
            ..Default::default()
        }
    }

    fn item(title: &str, year: Option<i32>) -> ParsedMediaItem {
        ParsedMediaItem {
            filename: format!("{title}.mkv"),
            path: "/downloads".into(),
            title: Some(title.into()),
            year,
            ..Default::default()
        }
    }

    #[test]
    fn similarity_spans_the_full_percent_scale() {
        assert_eq!(similarity("aquaman (2018)", "aquaman (2018)"), 100);
        assert_eq!(similarity("aquaman", "batman"), 62);
        // A one-year difference in the suffix costs points, not the match.
        assert_eq!(similarity("aquaman (2018)", "aquaman (2017)"), 93);
        assert_eq!(similarity("", "aquaman"), 0);
    }

    #[tokio::test]
    async fn scoring_is_case_insensitive() {
        let source = Arc::new(StubSource::new(
            "tmdb",
            vec![candidate("These Daughters of Mine", Some(2015), "1")],
        ));
        let matcher = Matcher::single(source);
        let matches = matcher
            .top5_matches(&item("THESE daughters of MINE", Some(2015)))
            .await
            .unwrap();
        assert_eq!(matches[0].score, 100);
    }

    #[tokio::test]
    async fn original_title_scores_when_primary_title_does_not() {
        let mut c = candidate("These Daughters of Mine", Some(2015), "1");
        c.original_title = Some("Moje córki krowy".into());
        let matcher = Matcher::single(Arc::new(StubSource::new("tmdb", vec![c])));
        let matches = matcher
            .top5_matches(&item("Moje córki krowy", Some(2015)))
            .await
            .unwrap();
        assert_eq!(matches[0].score, 100);
    }

    #[tokio::test]
    async fn aka_scores_when_titles_do_not() {
        let mut c = candidate("These Daughters of Mine", Some(2015), "1");
        c.akas = vec!["Ces filles qui sont miennes".into(), "Mine døtre kuene".into()];
        let matcher = Matcher::single(Arc::new(StubSource::new("tmdb", vec![c])));
        let matches = matcher
            .top5_matches(&item("Mine døtre kuene", Some(2015)))
            .await
            .unwrap();
        assert_eq!(matches[0].score, 100);
    }

    #[tokio::test]
    async fn at_most_five_candidates_survive() {
        let candidates: Vec<MovieMatchCandidate> = (0..8)
            .map(|i| candidate("Heat", Some(1995), &i.to_string()))
            .collect();
        let matcher = Matcher::single(Arc::new(StubSource::new("tmdb", candidates)));
        let matches = matcher.top5_matches(&item("Heat", Some(1995))).await.unwrap();
        assert_eq!(matches.len(), 5);
    }

    #[test]
    fn boost_decrements_top_ties_far_from_query_year() {
        let mut candidates = vec![
            candidate("Heat", Some(2013), "1"),
            candidate("Heat", Some(2012), "2"),
            candidate("Heat", Some(2010), "3"),
        ];
        for c in &mut candidates {
            c.score = 95;
        }
        boost_by_year(&mut candidates, Some(2014));
        let scores: Vec<i32> = candidates.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![95, 94, 94]);
    }

    #[test]
    fn boost_needs_two_candidates_and_a_query_year() {
        let mut single = vec![candidate("Heat", Some(1995), "1")];
        single[0].score = 95;
        boost_by_year(&mut single, Some(2014));
        assert_eq!(single[0].score, 95);

        let mut pair = vec![
            candidate("Heat", Some(1995), "1"),
            candidate("Heat", Some(1996), "2"),
        ];
        for c in &mut pair {
            c.score = 95;
        }
        boost_by_year(&mut pair, None);
        assert_eq!(pair[0].score, 95);
        assert_eq!(pair[1].score, 95);
    }

    #[tokio::test]
    async fn year_boost_orders_equal_titles() {
        let matcher = Matcher::single(Arc::new(StubSource::new(
            "tmdb",
            vec![
                candidate("These Daughters of Mine", Some(2015), "1"),
                candidate("These Daughters of Mine", Some(2012), "2"),
                candidate("These Daughters of Mine", Some(2011), "3"),
            ],
        )));
        let matches = matcher
            .top5_matches(&item("THESE daughters of MINE", Some(2014)))
            .await
            .unwrap();
        let scores: Vec<i32> = matches.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![97, 96, 96]);
        assert_eq!(matches[0].release_year, Some(2015));
    }

    #[tokio::test]
    async fn fallback_consults_secondary_only_when_primary_is_empty() {
        let primary = Arc::new(StubSource::new("tmdb", vec![]));
        let secondary = Arc::new(StubSource::new(
            "imdb",
            vec![candidate("Heat", Some(1995), "113277")],
        ));
        let matcher = Matcher::fallback(primary, secondary);
        let matches = matcher.top5_matches(&item("Heat", Some(1995))).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].external_id, "113277");
    }

    #[tokio::test]
    async fn parallel_keeps_higher_scored_duplicate() {
        // The primary knows the entity behind the secondary's imdb id and
        // scored it worse; the secondary's copy must win, once.
        let weak = candidate("DO NOT MATCH", Some(1995), "123456");
        let primary = Arc::new(
            StubSource::new("tmdb", vec![weak])
                .with_imdb_mapping("113277", candidate("Heat", Some(1995), "123456")),
        );
        let mut strong = candidate("Heat", Some(1995), "113277");
        strong.source = "imdb".into();
        let secondary = Arc::new(StubSource::new("imdb", vec![strong]));

        let matcher = Matcher::parallel(primary, secondary);
        let matches = matcher.top5_matches(&item("Heat", Some(1995))).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].source, "imdb");
        assert_eq!(matches[0].score, 100);
    }

    #[tokio::test]
    async fn low_threshold_fallback_merges_when_primary_scores_poorly() {
        let primary = Arc::new(StubSource::new(
            "tmdb",
            vec![candidate("Something Else Entirely", Some(1990), "42")],
        ));
        let secondary = Arc::new(StubSource::new(
            "imdb",
            vec![candidate("Heat", Some(1995), "113277")],
        ));
        let matcher = Matcher::low_threshold_fallback(primary, secondary, 90);
        let matches = matcher.top5_matches(&item("Heat", Some(1995))).await.unwrap();
        assert_eq!(matches[0].external_id, "113277");
        assert_eq!(matches[0].score, 100);
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn unknown_matcher_key_is_rejected() {
        let a: Arc<dyn MediaSource> = Arc::new(StubSource::new("tmdb", vec![]));
        let b: Arc<dyn MediaSource> = Arc::new(StubSource::new("imdb", vec![]));
        assert!(Matcher::from_key("psychic", a, b, 90).is_err());
    }
}
