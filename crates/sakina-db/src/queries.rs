use crate::models::{PostRow, ReactionRow, ResponseRow};
use crate::Database;
use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;

/// Store-assigned timestamp. Fixed-width RFC 3339 so text order is time order.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    // -- Posts --

    /// Insert a post and return its store-assigned `created_at`.
    pub fn insert_post(
        &self,
        id: &str,
        category: &str,
        message: &str,
        author: &str,
        anonymous: bool,
        secret_hash: &str,
    ) -> Result<String> {
        let created_at = now_timestamp();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, category, message, author, anonymous, secret_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![id, category, message, author, anonymous, secret_hash, created_at],
            )?;
            Ok(())
        })?;
        Ok(created_at)
    }

    /// Remove a post with its reactions and responses. Returns false if it was already gone.
    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }

    pub fn get_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(query_posts)
    }

    // -- Reactions --

    /// Atomically bump one reaction counter. Returns false if the post does not exist.
    pub fn increment_reaction(&self, post_id: &str, label: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if !query_post_exists(&tx, post_id)? {
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO reactions (post_id, label, count) VALUES (?1, ?2, 1)
                 ON CONFLICT(post_id, label) DO UPDATE SET count = count + 1",
                (post_id, label),
            )?;
            tx.commit()?;
            Ok(true)
        })
    }

    pub fn get_reactions(&self) -> Result<Vec<ReactionRow>> {
        self.with_conn(query_reactions)
    }

    // -- Responses --

    /// Append a response to a post. Returns None if the post does not exist.
    pub fn append_response(
        &self,
        id: &str,
        post_id: &str,
        author: &str,
        text: &str,
    ) -> Result<Option<ResponseRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if !query_post_exists(&tx, post_id)? {
                return Ok(None);
            }
            let created_at = now_timestamp();
            tx.execute(
                "INSERT INTO responses (id, post_id, author, text, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, post_id, author, text, &created_at),
            )?;
            tx.commit()?;
            Ok(Some(ResponseRow {
                id: id.to_string(),
                post_id: post_id.to_string(),
                author: author.to_string(),
                text: text.to_string(),
                created_at,
            }))
        })
    }

    pub fn get_responses(&self) -> Result<Vec<ResponseRow>> {
        self.with_conn(query_responses)
    }

    // -- Snapshots --

    /// Read posts, reactions and responses under a single lock so the three
    /// lists describe the same instant.
    pub fn get_board_rows(&self) -> Result<(Vec<PostRow>, Vec<ReactionRow>, Vec<ResponseRow>)> {
        self.with_conn(|conn| {
            let posts = query_posts(conn)?;
            let reactions = query_reactions(conn)?;
            let responses = query_responses(conn)?;
            Ok((posts, reactions, responses))
        })
    }
}

fn query_post_exists(conn: &Connection, id: &str) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM posts WHERE id = ?1", [id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn query_posts(conn: &Connection) -> Result<Vec<PostRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, category, message, author, anonymous, secret_hash, created_at
         FROM posts
         ORDER BY created_at DESC, id DESC",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(PostRow {
                id: row.get(0)?,
                category: row.get(1)?,
                message: row.get(2)?,
                author: row.get(3)?,
                anonymous: row.get(4)?,
                secret_hash: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_reactions(conn: &Connection) -> Result<Vec<ReactionRow>> {
    let mut stmt = conn.prepare("SELECT post_id, label, count FROM reactions WHERE count > 0")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(ReactionRow {
                post_id: row.get(0)?,
                label: row.get(1)?,
                count: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_responses(conn: &Connection) -> Result<Vec<ResponseRow>> {
    // seq is the append order, which is the order the writes completed
    let mut stmt = conn.prepare(
        "SELECT id, post_id, author, text, created_at FROM responses ORDER BY post_id, seq",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(ResponseRow {
                id: row.get(0)?,
                post_id: row.get(1)?,
                author: row.get(2)?,
                text: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
