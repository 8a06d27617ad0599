use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Category, Reaction};

// -- Posts --

/// Body of `POST /posts`. The author snapshot and secret digest travel with
/// the post; the store never sees the plaintext secret word.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePostRequest {
    pub category: Category,
    pub message: String,
    pub author: String,
    #[serde(default)]
    pub anonymous: bool,
    pub secret_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostResponse {
    pub id: Uuid,
}

// -- Reactions --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddReactionRequest {
    pub reaction: Reaction,
}

// -- Responses --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddResponseRequest {
    pub author: String,
    pub text: String,
}
