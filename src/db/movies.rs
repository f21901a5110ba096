//! Movie persistence. Movies are unique per (source, external_id): a second
//! media item matching the same film links to the existing row.

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteConnection;
use sqlx::{FromRow, SqlitePool};

use crate::services::movies::{Genre, Movie};

#[derive(Debug, Clone, FromRow)]
pub struct MovieRecord {
    pub id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub release_year: Option<i32>,
    pub plot: Option<String>,
    pub external_id: String,
    pub source: String,
    pub rating: Option<String>,
    pub poster: Option<String>,
}

impl MovieRecord {
    fn into_movie(self, genres: Vec<Genre>) -> Movie {
        Movie {
            id: Some(self.id),
            title: self.title,
            original_title: self.original_title,
            release_year: self.release_year,
            plot: self.plot,
            external_id: self.external_id,
            source: self.source,
            rating: self.rating,
            poster: self.poster,
            genres,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct GenreRecord {
    name: Option<String>,
    genre_id: Option<i64>,
}

const SELECT_MOVIE: &str = "SELECT id, title, original_title, release_year, plot, \
     external_id, source, rating, poster FROM movies";

pub(crate) async fn genres_for_movie(
    conn: &mut SqliteConnection,
    movie_id: i64,
) -> Result<Vec<Genre>> {
    let records: Vec<GenreRecord> =
        sqlx::query_as("SELECT name, genre_id FROM genres WHERE movie_id = ? ORDER BY id")
            .bind(movie_id)
            .fetch_all(&mut *conn)
            .await
            .context("failed to fetch movie genres")?;
    Ok(records
        .into_iter()
        .map(|g| Genre {
            name: g.name,
            genre_id: g.genre_id,
        })
        .collect())
}

pub(crate) async fn find_by_external_id(
    conn: &mut SqliteConnection,
    source: &str,
    external_id: &str,
) -> Result<Option<Movie>> {
    let record: Option<MovieRecord> =
        sqlx::query_as(&format!("{SELECT_MOVIE} WHERE source = ? AND external_id = ?"))
            .bind(source)
            .bind(external_id)
            .fetch_optional(&mut *conn)
            .await
            .context("failed to look up movie by external id")?;
    match record {
        Some(record) => {
            let genres = genres_for_movie(conn, record.id).await?;
            Ok(Some(record.into_movie(genres)))
        }
        None => Ok(None),
    }
}

pub(crate) async fn insert_movie(conn: &mut SqliteConnection, movie: &Movie) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO movies (title, original_title, release_year, plot,
                            external_id, source, rating, poster)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&movie.title)
    .bind(&movie.original_title)
    .bind(movie.release_year)
    .bind(&movie.plot)
    .bind(&movie.external_id)
    .bind(&movie.source)
    .bind(&movie.rating)
    .bind(&movie.poster)
    .execute(&mut *conn)
    .await
    .context("failed to insert movie")?;
    let movie_id = result.last_insert_rowid();

    for genre in &movie.genres {
        sqlx::query("INSERT INTO genres (name, genre_id, movie_id) VALUES (?, ?, ?)")
            .bind(&genre.name)
            .bind(genre.genre_id)
            .bind(movie_id)
            .execute(&mut *conn)
            .await
            .context("failed to insert movie genre")?;
    }
    Ok(movie_id)
}

/// Delete a movie row and its genres. Media items are the caller's problem:
/// the aggregate rule (no movie without items, no orphaned items) lives in
/// the operations layer.
pub(crate) async fn delete_movie(conn: &mut SqliteConnection, movie_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM genres WHERE movie_id = ?")
        .bind(movie_id)
        .execute(&mut *conn)
        .await
        .context("failed to delete movie genres")?;
    sqlx::query("DELETE FROM movies WHERE id = ?")
        .bind(movie_id)
        .execute(&mut *conn)
        .await
        .context("failed to delete movie")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct MovieRepository {
    pool: SqlitePool,
}

impl MovieRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Option<Movie>> {
        let mut conn = self.pool.acquire().await?;
        let record: Option<MovieRecord> = sqlx::query_as(&format!("{SELECT_MOVIE} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .context("failed to fetch movie")?;
        match record {
            Some(record) => {
                let genres = genres_for_movie(&mut *conn, record.id).await?;
                Ok(Some(record.into_movie(genres)))
            }
            None => Ok(None),
        }
    }

    pub async fn find_by_external_id(
        &self,
        source: &str,
        external_id: &str,
    ) -> Result<Option<Movie>> {
        let mut conn = self.pool.acquire().await?;
        find_by_external_id(&mut *conn, source, external_id).await
    }

    pub async fn list(&self) -> Result<Vec<Movie>> {
        let mut conn = self.pool.acquire().await?;
        let records: Vec<MovieRecord> =
            sqlx::query_as(&format!("{SELECT_MOVIE} ORDER BY title"))
                .fetch_all(&mut *conn)
                .await
                .context("failed to list movies")?;
        let mut movies = Vec::with_capacity(records.len());
        for record in records {
            let genres = genres_for_movie(&mut *conn, record.id).await?;
            movies.push(record.into_movie(genres));
        }
        Ok(movies)
    }
}
