//! Media item persistence.
//!
//! One row per scanned file. The (filename, path) pair is the natural key:
//! re-scans look items up by it before attempting a new match. `excess`
//! round-trips as a JSON array in a TEXT column.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use sqlx::sqlite::SqliteConnection;
use sqlx::{FromRow, SqlitePool};

use crate::services::media::ParsedMediaItem;

#[derive(Debug, Clone, FromRow)]
pub struct MediaItemRecord {
    pub id: i64,
    pub filename: String,
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
    pub release_group: Option<String>,
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
    pub excess: Option<String>,
    pub job_id: Option<String>,
    pub ignored: bool,
    pub matched_movie_id: Option<i64>,
    pub unmatched_item_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

impl MediaItemRecord {
    pub fn into_item(self) -> ParsedMediaItem {
        ParsedMediaItem {
            id: Some(self.id),
            filename: self.filename,
            path: self.path,
            target_filename: self.target_filename,
            target_path: self.target_path,
            title: self.title,
            year: self.year,
            season: self.season,
            episode: self.episode,
            episode_name: self.episode_name,
            resolution: self.resolution,
            quality: self.quality,
            codec: self.codec,
            audio: self.audio,
            group: self.release_group,
            region: self.region,
            container: self.container,
            website: self.website,
            language: self.language,
            sbs: self.sbs,
            size: self.size,
            extended: self.extended,
            hardcoded: self.hardcoded,
            proper: self.proper,
            repack: self.repack,
            widescreen: self.widescreen,
            unrated: self.unrated,
            three_d: self.three_d,
            hdr: self.hdr,
            excess: self
                .excess
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_default(),
            job_id: self.job_id,
            ignored: self.ignored,
            matched_movie_id: self.matched_movie_id,
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT * FROM media_items";

/// Insert one item inside the caller's transaction.
pub(crate) async fn insert_media_item(
    conn: &mut SqliteConnection,
    item: &ParsedMediaItem,
    matched_movie_id: Option<i64>,
    unmatched_item_id: Option<i64>,
) -> Result<i64> {
    let excess = if item.excess.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&item.excess).context("failed to encode excess tokens")?)
    };
    let result = sqlx::query(
        r#"
        INSERT INTO media_items (
            filename, path, target_filename, target_path, title, year,
            season, episode, episode_name, resolution, quality, codec,
            audio, release_group, region, container, website, language,
            sbs, size, extended, hardcoded, proper, repack, widescreen,
            unrated, three_d, hdr, excess, job_id, ignored,
            matched_movie_id, unmatched_item_id
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&item.filename)
    .bind(&item.path)
    .bind(&item.target_filename)
    .bind(&item.target_path)
    .bind(&item.title)
    .bind(item.year)
    .bind(item.season)
    .bind(item.episode)
    .bind(&item.episode_name)
    .bind(&item.resolution)
    .bind(&item.quality)
    .bind(&item.codec)
    .bind(&item.audio)
    .bind(&item.group)
    .bind(&item.region)
    .bind(&item.container)
    .bind(&item.website)
    .bind(&item.language)
    .bind(&item.sbs)
    .bind(&item.size)
    .bind(item.extended)
    .bind(item.hardcoded)
    .bind(item.proper)
    .bind(item.repack)
    .bind(item.widescreen)
    .bind(item.unrated)
    .bind(item.three_d)
    .bind(item.hdr)
    .bind(excess)
    .bind(&item.job_id)
    .bind(item.ignored)
    .bind(matched_movie_id)
    .bind(unmatched_item_id)
    .execute(&mut *conn)
    .await
    .context("failed to insert media item")?;
    Ok(result.last_insert_rowid())
}

pub(crate) async fn delete_media_item(conn: &mut SqliteConnection, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM media_items WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("failed to delete media item")?;
    Ok(())
}

pub(crate) async fn delete_for_movie(conn: &mut SqliteConnection, movie_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM media_items WHERE matched_movie_id = ?")
        .bind(movie_id)
        .execute(&mut *conn)
        .await
        .context("failed to delete media items for movie")?;
    Ok(result.rows_affected())
}

pub(crate) async fn count_for_movie(conn: &mut SqliteConnection, movie_id: i64) -> Result<i64> {
    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM media_items WHERE matched_movie_id = ?")
            .bind(movie_id)
            .fetch_one(&mut *conn)
            .await
            .context("failed to count media items for movie")?;
    Ok(count.0)
}

#[derive(Debug, Clone)]
pub struct MediaItemRepository {
    pool: SqlitePool,
}

impl MediaItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Option<ParsedMediaItem>> {
        let record: Option<MediaItemRecord> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .context("failed to fetch media item")?;
        Ok(record.map(MediaItemRecord::into_item))
    }

    /// Lookup by natural key among already-matched items. A hit means the
    /// file was organized by an earlier scan.
    pub async fn find_matched(&self, filename: &str, path: &str) -> Result<Option<ParsedMediaItem>> {
        let record: Option<MediaItemRecord> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE filename = ? AND path = ? AND matched_movie_id IS NOT NULL"
        ))
        .bind(filename)
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .context("failed to look up media item by natural key")?;
        Ok(record.map(MediaItemRecord::into_item))
    }

    pub async fn list_for_movie(&self, movie_id: i64) -> Result<Vec<ParsedMediaItem>> {
        let records: Vec<MediaItemRecord> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE matched_movie_id = ? ORDER BY id"
        ))
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to list media items for movie")?;
        Ok(records.into_iter().map(MediaItemRecord::into_item).collect())
    }

    pub async fn count_for_movie(&self, movie_id: i64) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        count_for_movie(&mut *conn, movie_id).await
    }
}
