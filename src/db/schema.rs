//! Embedded schema, applied at startup. Statements are idempotent so a
//! restart against an existing database is a no-op.

pub const CREATE_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS movies (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        original_title TEXT,
        release_year INTEGER,
        plot TEXT,
        external_id TEXT NOT NULL,
        source TEXT NOT NULL,
        rating TEXT,
        poster TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE (source, external_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS unmatched_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        non_match_reason TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS match_candidates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        original_title TEXT,
        release_year INTEGER,
        plot TEXT,
        match_score INTEGER NOT NULL DEFAULT 0,
        external_id TEXT NOT NULL,
        source TEXT NOT NULL,
        rating TEXT,
        poster TEXT,
        unmatched_item_id INTEGER NOT NULL REFERENCES unmatched_items (id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS genres (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT,
        genre_id INTEGER,
        movie_id INTEGER REFERENCES movies (id),
        candidate_id INTEGER REFERENCES match_candidates (id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS media_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        filename TEXT NOT NULL,
        path TEXT NOT NULL,
        target_filename TEXT,
        target_path TEXT,
        title TEXT,
        year INTEGER,
        season INTEGER,
        episode INTEGER,
        episode_name TEXT,
        resolution TEXT,
        quality TEXT,
        codec TEXT,
        audio TEXT,
        release_group TEXT,
        region TEXT,
        container TEXT,
        website TEXT,
        language TEXT,
        sbs TEXT,
        size TEXT,
        extended INTEGER NOT NULL DEFAULT 0,
        hardcoded INTEGER NOT NULL DEFAULT 0,
        proper INTEGER NOT NULL DEFAULT 0,
        repack INTEGER NOT NULL DEFAULT 0,
        widescreen INTEGER NOT NULL DEFAULT 0,
        unrated INTEGER NOT NULL DEFAULT 0,
        three_d INTEGER NOT NULL DEFAULT 0,
        hdr INTEGER NOT NULL DEFAULT 0,
        excess TEXT,
        job_id TEXT,
        ignored INTEGER NOT NULL DEFAULT 0,
        matched_movie_id INTEGER REFERENCES movies (id),
        unmatched_item_id INTEGER REFERENCES unmatched_items (id),
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_media_items_natural_key ON media_items (filename, path)",
    "CREATE INDEX IF NOT EXISTS idx_media_items_movie ON media_items (matched_movie_id)",
    "CREATE INDEX IF NOT EXISTS idx_candidates_unmatched ON match_candidates (unmatched_item_id)",
];
