//! SQL schema for the xtchd SQLite store.
//!
//! Executed once at connection startup. Every chained table carries the same
//! four envelope columns after its content columns.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Chained tables are append-only. The only DELETE ever issued removes the
-- current tail of one table, and only when nothing references it.

CREATE TABLE IF NOT EXISTS authors (
    auth_id         INTEGER PRIMARY KEY,
    name            TEXT NOT NULL UNIQUE,
    prior_id        INTEGER,
    prior_sha256    TEXT NOT NULL,
    write_timestamp TEXT NOT NULL,   -- RFC 3339 UTC
    new_sha256      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS articles (
    art_id          INTEGER PRIMARY KEY,
    auth_id         INTEGER NOT NULL,
    title           TEXT NOT NULL UNIQUE,
    prior_id        INTEGER,
    prior_sha256    TEXT NOT NULL,
    write_timestamp TEXT NOT NULL,
    new_sha256      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS article_paras (
    apara_id        INTEGER PRIMARY KEY,
    art_id          INTEGER NOT NULL,
    md              TEXT NOT NULL,
    prior_id        INTEGER,
    prior_sha256    TEXT NOT NULL,
    write_timestamp TEXT NOT NULL,
    new_sha256      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS images (
    img_id          INTEGER PRIMARY KEY,
    src_full        TEXT NOT NULL,   -- data URI
    src_thmb        TEXT NOT NULL,   -- data URI
    alt             TEXT NOT NULL,
    url             TEXT,
    archive         TEXT,            -- archive.is key
    prior_id        INTEGER,
    prior_sha256    TEXT NOT NULL,
    write_timestamp TEXT NOT NULL,
    new_sha256      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS youtube_channels (
    chan_id         INTEGER PRIMARY KEY,
    url             TEXT NOT NULL UNIQUE,
    name            TEXT NOT NULL,
    prior_id        INTEGER,
    prior_sha256    TEXT NOT NULL,
    write_timestamp TEXT NOT NULL,
    new_sha256      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS youtube_videos (
    vid_id          INTEGER PRIMARY KEY,
    chan_id         INTEGER NOT NULL,
    vid_pk          TEXT NOT NULL UNIQUE,
    title           TEXT NOT NULL,
    date_uploaded   TEXT NOT NULL,   -- YYYY-MM-DD
    prior_id        INTEGER,
    prior_sha256    TEXT NOT NULL,
    write_timestamp TEXT NOT NULL,
    new_sha256      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS article_ref_articles (
    aref_id         INTEGER PRIMARY KEY,
    from_art        INTEGER NOT NULL,
    from_para       INTEGER,         -- NULL: whole article
    comment         TEXT NOT NULL,
    refs_art        INTEGER NOT NULL,
    refs_para       INTEGER,
    prior_id        INTEGER,
    prior_sha256    TEXT NOT NULL,
    write_timestamp TEXT NOT NULL,
    new_sha256      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS article_ref_videos (
    vref_id         INTEGER PRIMARY KEY,
    art_id          INTEGER NOT NULL,
    apara_id        INTEGER,
    comment         TEXT NOT NULL,
    vid_id          INTEGER NOT NULL,
    vid_pk          TEXT NOT NULL,   -- hashed; must name the video at vid_id
    sec_req         INTEGER,         -- offset into the video, seconds
    prior_id        INTEGER,
    prior_sha256    TEXT NOT NULL,
    write_timestamp TEXT NOT NULL,
    new_sha256      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS article_ref_images (
    iref_id         INTEGER PRIMARY KEY,
    art_id          INTEGER NOT NULL,
    apara_id        INTEGER,
    comment         TEXT NOT NULL,
    img_id          INTEGER NOT NULL,
    prior_id        INTEGER,
    prior_sha256    TEXT NOT NULL,
    write_timestamp TEXT NOT NULL,
    new_sha256      TEXT NOT NULL
);

-- Mutable sidecar, one row per article. Never hashed.
CREATE TABLE IF NOT EXISTS article_covers (
    art_id   INTEGER PRIMARY KEY,
    cover_id TEXT NOT NULL,
    src_full TEXT NOT NULL,
    src_thmb TEXT NOT NULL,
    alt      TEXT NOT NULL,
    url      TEXT,
    archive  TEXT
);

CREATE TABLE IF NOT EXISTS topics (
    topic_key TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS topic_mentions (
    apara_id  INTEGER NOT NULL,
    topic_key TEXT NOT NULL REFERENCES topics(topic_key),
    UNIQUE (apara_id, topic_key)
);

CREATE INDEX IF NOT EXISTS topic_mentions_key_idx ON topic_mentions(topic_key);

PRAGMA user_version = 1;
";
