//! Transactional operations over the movie aggregate.
//!
//! The invariants live here, not in the repositories: a matched media item
//! always points at a movie row, an unmatched item always carries its
//! candidates, and a movie with no remaining items is removed. Filesystem
//! linking runs inside the transaction so a failed link rolls the rows back.

use anyhow::{Context, Result};
use tracing::debug;

use crate::services::media::ParsedMediaItem;
use crate::services::movies::{Movie, MovieMatchCandidate, NonMatchReason};
use crate::services::targets::MediaTarget;

use super::Database;
use super::{media_items, movies, unmatched};

/// Persist a successful match and execute the link. Returns the media and
/// movie row ids. Movies are deduplicated on (source, external_id), so two
/// releases of the same film share one movie row.
pub async fn match_movie(
    db: &Database,
    media: &ParsedMediaItem,
    movie: &Movie,
    target: &MediaTarget,
) -> Result<(i64, i64)> {
    let mut tx = db.pool().begin().await.context("failed to open transaction")?;

    let movie_id = match movies::find_by_external_id(&mut *tx, &movie.source, &movie.external_id)
        .await?
    {
        Some(existing) => existing.id.context("stored movie without id")?,
        None => movies::insert_movie(&mut *tx, movie).await?,
    };
    let media_id = media_items::insert_media_item(&mut *tx, media, Some(movie_id), None).await?;

    target.do_link()?;
    tx.commit().await.context("failed to commit match")?;
    debug!(media_id, movie_id, filename = %media.filename, "persisted movie match");
    Ok((media_id, movie_id))
}

/// Park an item that could not be matched, retaining every candidate so a
/// manual match can pick one later. Returns the unmatched row id.
pub async fn record_unmatched(
    db: &Database,
    media: &ParsedMediaItem,
    candidates: &[MovieMatchCandidate],
    reason: NonMatchReason,
) -> Result<i64> {
    let mut tx = db.pool().begin().await.context("failed to open transaction")?;

    let unmatched_id = unmatched::insert_unmatched(&mut *tx, reason).await?;
    media_items::insert_media_item(&mut *tx, media, None, Some(unmatched_id)).await?;
    for candidate in candidates {
        unmatched::insert_candidate(&mut *tx, unmatched_id, candidate).await?;
    }

    tx.commit().await.context("failed to commit unmatched item")?;
    debug!(
        unmatched_id,
        filename = %media.filename,
        reason = reason.as_str(),
        candidates = candidates.len(),
        "recorded unmatched item"
    );
    Ok(unmatched_id)
}

/// A manual match supersedes any parked state for the same file: earlier
/// unmatched rows for the natural key are dropped along with their
/// candidates, then the match is persisted like an automatic one.
pub async fn apply_manual_match(
    db: &Database,
    media: &ParsedMediaItem,
    movie: &Movie,
    target: &MediaTarget,
) -> Result<(i64, i64)> {
    let mut tx = db.pool().begin().await.context("failed to open transaction")?;

    let parked: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT id, unmatched_item_id FROM media_items \
         WHERE filename = ? AND path = ? AND unmatched_item_id IS NOT NULL",
    )
    .bind(&media.filename)
    .bind(&media.path)
    .fetch_all(&mut *tx)
    .await
    .context("failed to look up parked media items")?;
    for (media_id, unmatched_id) in parked {
        media_items::delete_media_item(&mut *tx, media_id).await?;
        unmatched::delete_unmatched(&mut *tx, unmatched_id).await?;
    }

    let movie_id = match movies::find_by_external_id(&mut *tx, &movie.source, &movie.external_id)
        .await?
    {
        Some(existing) => existing.id.context("stored movie without id")?,
        None => movies::insert_movie(&mut *tx, movie).await?,
    };
    let media_id = media_items::insert_media_item(&mut *tx, media, Some(movie_id), None).await?;

    target.do_link()?;
    tx.commit().await.context("failed to commit manual match")?;
    debug!(media_id, movie_id, filename = %media.filename, "applied manual match");
    Ok((media_id, movie_id))
}

/// Move a mis-matched item to its correct movie. The old link is replaced,
/// the old media row removed, and the old movie deleted once nothing else
/// points at it.
pub async fn apply_fix_match(
    db: &Database,
    old_media: &ParsedMediaItem,
    new_media: &ParsedMediaItem,
    movie: &Movie,
    target: &MediaTarget,
) -> Result<(i64, i64)> {
    let mut tx = db.pool().begin().await.context("failed to open transaction")?;

    // Any parked state for the file is resolved by the fix as well.
    let parked: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT id, unmatched_item_id FROM media_items \
         WHERE filename = ? AND path = ? AND unmatched_item_id IS NOT NULL",
    )
    .bind(&new_media.filename)
    .bind(&new_media.path)
    .fetch_all(&mut *tx)
    .await
    .context("failed to look up parked media items")?;
    for (media_id, unmatched_id) in parked {
        media_items::delete_media_item(&mut *tx, media_id).await?;
        unmatched::delete_unmatched(&mut *tx, unmatched_id).await?;
    }

    let movie_id = match movies::find_by_external_id(&mut *tx, &movie.source, &movie.external_id)
        .await?
    {
        Some(existing) => existing.id.context("stored movie without id")?,
        None => movies::insert_movie(&mut *tx, movie).await?,
    };
    let media_id =
        media_items::insert_media_item(&mut *tx, new_media, Some(movie_id), None).await?;

    if let Some(old_id) = old_media.id {
        media_items::delete_media_item(&mut *tx, old_id).await?;
    }
    if let Some(old_movie_id) = old_media.matched_movie_id
        && old_movie_id != movie_id
        && media_items::count_for_movie(&mut *tx, old_movie_id).await? == 0
    {
        movies::delete_movie(&mut *tx, old_movie_id).await?;
        debug!(old_movie_id, "removed movie left without media items");
    }

    let previous = old_media.absolute_target_path();
    target.do_relink(previous.as_deref())?;
    tx.commit().await.context("failed to commit fix match")?;
    debug!(media_id, movie_id, filename = %new_media.filename, "applied fix match");
    Ok((media_id, movie_id))
}

/// Remove a movie and every media item pointing at it.
pub async fn delete_movie(db: &Database, movie_id: i64) -> Result<()> {
    let mut tx = db.pool().begin().await.context("failed to open transaction")?;
    let removed = media_items::delete_for_movie(&mut *tx, movie_id).await?;
    movies::delete_movie(&mut *tx, movie_id).await?;
    tx.commit().await.context("failed to commit movie deletion")?;
    debug!(movie_id, removed_items = removed, "deleted movie");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::movies::Genre;
    use crate::services::targets::{MediaTarget, TargetKind};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    async fn database() -> Database {
        Database::connect("sqlite::memory:").await.unwrap()
    }

    fn media(filename: &str) -> ParsedMediaItem {
        ParsedMediaItem {
            filename: filename.into(),
            path: "/library/downloads".into(),
            title: Some("Aquaman".into()),
            year: Some(2018),
            container: Some("mkv".into()),
            excess: vec!["MOMA".into()],
            ..Default::default()
        }
    }

    fn movie(external_id: &str, title: &str) -> Movie {
        Movie {
            title: title.into(),
            release_year: Some(2018),
            external_id: external_id.into(),
            source: "tmdb".into(),
            genres: vec![Genre {
                name: Some("Action".into()),
                genre_id: Some(28),
            }],
            ..Default::default()
        }
    }

    fn noop_target() -> MediaTarget {
        MediaTarget::new(
            TargetKind::Noop,
            PathBuf::from("/library/downloads/a.mkv"),
            PathBuf::from("/library/movies/Aquaman (2018)/Aquaman (2018).mkv"),
        )
    }

    #[tokio::test]
    async fn two_items_for_the_same_film_share_one_movie_row() {
        let db = database().await;
        let film = movie("297802", "Aquaman");

        let (_, first_movie) = match_movie(
            &db,
            &media("Aquaman.2018.2160p.WEB-DL.mkv"),
            &film,
            &noop_target(),
        )
        .await
        .unwrap();
        let (_, second_movie) = match_movie(
            &db,
            &media("Aquaman.2018.720p.BluRay.mkv"),
            &film,
            &noop_target(),
        )
        .await
        .unwrap();

        assert_eq!(first_movie, second_movie);
        assert_eq!(db.movies().list().await.unwrap().len(), 1);
        assert_eq!(db.media_items().count_for_movie(first_movie).await.unwrap(), 2);

        let stored = db.movies().get(first_movie).await.unwrap().unwrap();
        assert_eq!(stored.title, "Aquaman");
        assert_eq!(stored.genres.len(), 1);
        assert_eq!(stored.genres[0].name.as_deref(), Some("Action"));
    }

    #[tokio::test]
    async fn recorded_unmatched_items_keep_their_candidates() {
        let db = database().await;
        let candidates = vec![
            MovieMatchCandidate {
                title: "Aquaman".into(),
                score: 85,
                external_id: "297802".into(),
                source: "tmdb".into(),
                ..Default::default()
            },
            MovieMatchCandidate {
                title: "Aquaman: King of Atlantis".into(),
                score: 71,
                external_id: "821881".into(),
                source: "tmdb".into(),
                ..Default::default()
            },
        ];

        let unmatched_id = record_unmatched(
            &db,
            &media("Aquamen.2018.mkv"),
            &candidates,
            NonMatchReason::LowThreshold,
        )
        .await
        .unwrap();

        let stored = db.unmatched().candidates_for(unmatched_id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].title, "Aquaman");
        assert_eq!(stored[0].score, 85);
        assert_eq!(
            db.unmatched().reason(unmatched_id).await.unwrap(),
            Some(NonMatchReason::LowThreshold)
        );

        let by_id = db.unmatched().candidate(stored[1].id.unwrap()).await.unwrap();
        assert_eq!(by_id.unwrap().external_id, "821881");
    }

    #[tokio::test]
    async fn manual_match_clears_the_parked_state() {
        let db = database().await;
        let item = media("Aquamen.2018.mkv");
        let candidate = MovieMatchCandidate {
            title: "Aquaman".into(),
            score: 85,
            external_id: "297802".into(),
            source: "tmdb".into(),
            ..Default::default()
        };
        let unmatched_id =
            record_unmatched(&db, &item, &[candidate], NonMatchReason::LowThreshold)
                .await
                .unwrap();

        let (media_id, movie_id) =
            apply_manual_match(&db, &item, &movie("297802", "Aquaman"), &noop_target())
                .await
                .unwrap();

        assert!(db.unmatched().reason(unmatched_id).await.unwrap().is_none());
        assert!(db.unmatched().candidates_for(unmatched_id).await.unwrap().is_empty());
        let stored = db.media_items().get(media_id).await.unwrap().unwrap();
        assert_eq!(stored.matched_movie_id, Some(movie_id));
    }

    #[tokio::test]
    async fn fix_match_removes_the_abandoned_movie() {
        let db = database().await;
        let wrong = movie("338970", "Tomb Raider");
        let (old_media_id, old_movie_id) = match_movie(
            &db,
            &media("Aquaman.2018.2160p.WEB-DL.mkv"),
            &wrong,
            &noop_target(),
        )
        .await
        .unwrap();

        let mut old_media = db.media_items().get(old_media_id).await.unwrap().unwrap();
        old_media.matched_movie_id = Some(old_movie_id);
        let new_media = old_media.transient_copy();

        let (_, new_movie_id) = apply_fix_match(
            &db,
            &old_media,
            &new_media,
            &movie("297802", "Aquaman"),
            &noop_target(),
        )
        .await
        .unwrap();

        assert!(db.movies().get(old_movie_id).await.unwrap().is_none());
        let remaining = db.movies().list().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, Some(new_movie_id));
        assert_eq!(db.media_items().count_for_movie(new_movie_id).await.unwrap(), 1);
        assert!(db.media_items().get(old_media_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fix_match_within_the_same_movie_keeps_it() {
        let db = database().await;
        let film = movie("297802", "Aquaman");
        let (old_media_id, movie_id) = match_movie(
            &db,
            &media("Aquaman.2018.2160p.WEB-DL.mkv"),
            &film,
            &noop_target(),
        )
        .await
        .unwrap();

        let mut old_media = db.media_items().get(old_media_id).await.unwrap().unwrap();
        old_media.matched_movie_id = Some(movie_id);
        let new_media = old_media.transient_copy();

        let (_, new_movie_id) =
            apply_fix_match(&db, &old_media, &new_media, &film, &noop_target())
                .await
                .unwrap();

        assert_eq!(new_movie_id, movie_id);
        assert!(db.movies().get(movie_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_movie_cascades_to_media_items() {
        let db = database().await;
        let film = movie("297802", "Aquaman");
        let (media_id, movie_id) = match_movie(
            &db,
            &media("Aquaman.2018.2160p.WEB-DL.mkv"),
            &film,
            &noop_target(),
        )
        .await
        .unwrap();

        delete_movie(&db, movie_id).await.unwrap();

        assert!(db.movies().get(movie_id).await.unwrap().is_none());
        assert!(db.media_items().get(media_id).await.unwrap().is_none());
    }
}
