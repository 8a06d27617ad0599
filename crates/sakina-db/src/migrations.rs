use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS posts (
            id          TEXT PRIMARY KEY,
            category    TEXT NOT NULL,
            message     TEXT NOT NULL CHECK (length(trim(message)) > 0),
            author      TEXT NOT NULL,
            anonymous   INTEGER NOT NULL DEFAULT 0,
            secret_hash TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_posts_created
            ON posts(created_at DESC, id DESC);

        CREATE TABLE IF NOT EXISTS reactions (
            post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            label       TEXT NOT NULL,
            count       INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0),
            PRIMARY KEY (post_id, label)
        );

        CREATE TABLE IF NOT EXISTS responses (
            seq         INTEGER PRIMARY KEY AUTOINCREMENT,
            id          TEXT NOT NULL UNIQUE,
            post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            author      TEXT NOT NULL,
            text        TEXT NOT NULL CHECK (length(trim(text)) > 0),
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_responses_post
            ON responses(post_id, seq);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
