//! Unmatched items and their retained match candidates.
//!
//! When a scan cannot settle on a movie, the item is parked together with
//! every candidate that was considered and the reason the decision failed.
//! Manual matching later picks one of the stored candidates back up through
//! the local source.

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteConnection;
use sqlx::{FromRow, SqlitePool};

use crate::services::movies::{Genre, MovieMatchCandidate, NonMatchReason};

#[derive(Debug, Clone, FromRow)]
struct CandidateRecord {
    id: i64,
    title: String,
    original_title: Option<String>,
    release_year: Option<i32>,
    plot: Option<String>,
    match_score: i32,
    external_id: String,
    source: String,
    rating: Option<String>,
    poster: Option<String>,
}

impl CandidateRecord {
    fn into_candidate(self, genres: Vec<Genre>) -> MovieMatchCandidate {
        MovieMatchCandidate {
            id: Some(self.id),
            title: self.title,
            original_title: self.original_title,
            release_year: self.release_year,
            plot: self.plot,
            score: self.match_score,
            external_id: self.external_id,
            source: self.source,
            rating: self.rating,
            poster: self.poster,
            genres,
            akas: Vec::new(),
        }
    }
}

const SELECT_CANDIDATE: &str = "SELECT id, title, original_title, release_year, plot, \
     match_score, external_id, source, rating, poster FROM match_candidates";

pub(crate) async fn insert_unmatched(
    conn: &mut SqliteConnection,
    reason: NonMatchReason,
) -> Result<i64> {
    let result = sqlx::query("INSERT INTO unmatched_items (non_match_reason) VALUES (?)")
        .bind(reason.as_str())
        .execute(&mut *conn)
        .await
        .context("failed to insert unmatched item")?;
    Ok(result.last_insert_rowid())
}

pub(crate) async fn insert_candidate(
    conn: &mut SqliteConnection,
    unmatched_item_id: i64,
    candidate: &MovieMatchCandidate,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO match_candidates (title, original_title, release_year, plot,
                                      match_score, external_id, source, rating,
                                      poster, unmatched_item_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&candidate.title)
    .bind(&candidate.original_title)
    .bind(candidate.release_year)
    .bind(&candidate.plot)
    .bind(candidate.score)
    .bind(&candidate.external_id)
    .bind(&candidate.source)
    .bind(&candidate.rating)
    .bind(&candidate.poster)
    .bind(unmatched_item_id)
    .execute(&mut *conn)
    .await
    .context("failed to insert match candidate")?;
    let candidate_id = result.last_insert_rowid();

    for genre in &candidate.genres {
        sqlx::query("INSERT INTO genres (name, genre_id, candidate_id) VALUES (?, ?, ?)")
            .bind(&genre.name)
            .bind(genre.genre_id)
            .bind(candidate_id)
            .execute(&mut *conn)
            .await
            .context("failed to insert candidate genre")?;
    }
    Ok(candidate_id)
}

/// Remove an unmatched item with its candidates and their genres. Media
/// rows pointing at it are left for the operations layer to handle.
pub(crate) async fn delete_unmatched(
    conn: &mut SqliteConnection,
    unmatched_item_id: i64,
) -> Result<()> {
    sqlx::query(
        "DELETE FROM genres WHERE candidate_id IN \
         (SELECT id FROM match_candidates WHERE unmatched_item_id = ?)",
    )
    .bind(unmatched_item_id)
    .execute(&mut *conn)
    .await
    .context("failed to delete candidate genres")?;
    sqlx::query("DELETE FROM match_candidates WHERE unmatched_item_id = ?")
        .bind(unmatched_item_id)
        .execute(&mut *conn)
        .await
        .context("failed to delete match candidates")?;
    sqlx::query("DELETE FROM unmatched_items WHERE id = ?")
        .bind(unmatched_item_id)
        .execute(&mut *conn)
        .await
        .context("failed to delete unmatched item")?;
    Ok(())
}

async fn genres_for_candidate(
    conn: &mut SqliteConnection,
    candidate_id: i64,
) -> Result<Vec<Genre>> {
    #[derive(FromRow)]
    struct GenreRecord {
        name: Option<String>,
        genre_id: Option<i64>,
    }
    let records: Vec<GenreRecord> =
        sqlx::query_as("SELECT name, genre_id FROM genres WHERE candidate_id = ? ORDER BY id")
            .bind(candidate_id)
            .fetch_all(&mut *conn)
            .await
            .context("failed to fetch candidate genres")?;
    Ok(records
        .into_iter()
        .map(|g| Genre {
            name: g.name,
            genre_id: g.genre_id,
        })
        .collect())
}

#[derive(Debug, Clone)]
pub struct UnmatchedRepository {
    pool: SqlitePool,
}

impl UnmatchedRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// One stored candidate by its row id, the local source's lookup.
    pub async fn candidate(&self, id: i64) -> Result<Option<MovieMatchCandidate>> {
        let mut conn = self.pool.acquire().await?;
        let record: Option<CandidateRecord> =
            sqlx::query_as(&format!("{SELECT_CANDIDATE} WHERE id = ?"))
                .bind(id)
                .fetch_optional(&mut *conn)
                .await
                .context("failed to fetch match candidate")?;
        match record {
            Some(record) => {
                let genres = genres_for_candidate(&mut *conn, record.id).await?;
                Ok(Some(record.into_candidate(genres)))
            }
            None => Ok(None),
        }
    }

    pub async fn candidates_for(&self, unmatched_item_id: i64) -> Result<Vec<MovieMatchCandidate>> {
        let mut conn = self.pool.acquire().await?;
        let records: Vec<CandidateRecord> = sqlx::query_as(&format!(
            "{SELECT_CANDIDATE} WHERE unmatched_item_id = ? ORDER BY match_score DESC, id"
        ))
        .bind(unmatched_item_id)
        .fetch_all(&mut *conn)
        .await
        .context("failed to list match candidates")?;
        let mut candidates = Vec::with_capacity(records.len());
        for record in records {
            let genres = genres_for_candidate(&mut *conn, record.id).await?;
            candidates.push(record.into_candidate(genres));
        }
        Ok(candidates)
    }

    pub async fn reason(&self, unmatched_item_id: i64) -> Result<Option<NonMatchReason>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT non_match_reason FROM unmatched_items WHERE id = ?")
                .bind(unmatched_item_id)
                .fetch_optional(&self.pool)
                .await
                .context("failed to fetch non-match reason")?;
        Ok(row.and_then(|(tag,)| NonMatchReason::from_str(&tag)))
    }
}
