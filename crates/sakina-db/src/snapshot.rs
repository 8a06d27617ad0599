use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use sakina_types::models::{Category, Post, Response};

use crate::Database;
use crate::models::{PostRow, ReactionRow, ResponseRow};

impl Database {
    /// The full board, newest first, with reactions and responses attached.
    pub fn load_snapshot(&self) -> Result<Vec<Post>> {
        let (posts, reactions, responses) = self.get_board_rows()?;
        Ok(assemble(posts, reactions, responses))
    }
}

/// Rows that fail to parse are skipped with a warning rather than failing the
/// whole snapshot.
pub fn assemble(
    posts: Vec<PostRow>,
    reactions: Vec<ReactionRow>,
    responses: Vec<ResponseRow>,
) -> Vec<Post> {
    let mut reaction_map: HashMap<String, Vec<ReactionRow>> = HashMap::new();
    for r in reactions {
        reaction_map.entry(r.post_id.clone()).or_default().push(r);
    }

    let mut response_map: HashMap<String, Vec<ResponseRow>> = HashMap::new();
    for r in responses {
        response_map.entry(r.post_id.clone()).or_default().push(r);
    }

    posts
        .into_iter()
        .filter_map(|row| {
            let id = match row.id.parse::<Uuid>() {
                Ok(id) => id,
                Err(e) => {
                    warn!("Corrupt post id '{}': {}", row.id, e);
                    return None;
                }
            };
            let category = match row.category.parse::<Category>() {
                Ok(c) => c,
                Err(e) => {
                    warn!("Corrupt category on post '{}': {}", row.id, e);
                    return None;
                }
            };

            let reactions = reaction_map
                .remove(&row.id)
                .unwrap_or_default()
                .into_iter()
                .map(|r| (r.label, r.count.max(0) as u64))
                .collect();

            let responses = response_map
                .remove(&row.id)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|r| {
                    let rid = r
                        .id
                        .parse::<Uuid>()
                        .map_err(|e| warn!("Corrupt response id '{}': {}", r.id, e))
                        .ok()?;
                    Some(Response {
                        id: rid,
                        author: r.author,
                        text: r.text,
                        created_at: parse_timestamp(&r.created_at, &r.id),
                    })
                })
                .collect();

            Some(Post {
                id,
                category,
                created_at: parse_timestamp(&row.created_at, &row.id),
                message: row.message,
                author: row.author,
                anonymous: row.anonymous,
                secret_hash: row.secret_hash,
                reactions,
                responses,
            })
        })
        .collect()
}

fn parse_timestamp(raw: &str, owner: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by hand or by SQLite's datetime() lack a timezone.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on '{}': {}", raw, owner, e);
            DateTime::default()
        })
}
