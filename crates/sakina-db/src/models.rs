/// Database row types. These map directly to SQLite rows.
/// Distinct from sakina-types models to keep the DB layer independent.

pub struct PostRow {
    pub id: String,
    pub category: String,
    pub message: String,
    pub author: String,
    pub anonymous: bool,
    pub secret_hash: String,
    pub created_at: String,
}

pub struct ReactionRow {
    pub post_id: String,
    pub label: String,
    pub count: i64,
}

pub struct ResponseRow {
    pub id: String,
    pub post_id: String,
    pub author: String,
    pub text: String,
    pub created_at: String,
}
