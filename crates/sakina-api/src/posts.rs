use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, info};
use uuid::Uuid;

use sakina_types::api::{CreatePostRequest, CreatePostResponse};
use sakina_types::models::{MAX_AUTHOR_CHARS, MAX_MESSAGE_CHARS};

use crate::state::AppState;

/// Digests are lowercase hex SHA-256.
pub fn is_valid_secret_hash(hash: &str) -> bool {
    hash.len() == 64 && hash.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

pub async fn list_posts(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let posts = state.blocking(|db| db.load_snapshot()).await?;
    Ok(Json(posts))
}

pub async fn create_post(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let message = req.message.trim().to_string();
    let author = req.author.trim().to_string();

    // Validate input
    if message.is_empty() || message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(StatusCode::BAD_REQUEST);
    }
    if author.is_empty() || author.chars().count() > MAX_AUTHOR_CHARS {
        return Err(StatusCode::BAD_REQUEST);
    }
    if !is_valid_secret_hash(&req.secret_hash) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let post_id = Uuid::new_v4();
    let pid = post_id.to_string();
    let category = req.category.label();
    let anonymous = req.anonymous;
    let secret_hash = req.secret_hash;
    state
        .blocking(move |db| db.insert_post(&pid, category, &message, &author, anonymous, &secret_hash))
        .await?;

    info!("Post {} created in {}", post_id, category);
    state.publish().await;

    Ok((StatusCode::CREATED, Json(CreatePostResponse { id: post_id })))
}

/// Removal is unconditional here. The secret-word check happens in the
/// client before this route is called.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let pid = post_id.to_string();
    let removed = state.blocking(move |db| db.delete_post(&pid)).await?;

    if !removed {
        debug!("Delete of missing post {}", post_id);
        return Err(StatusCode::NOT_FOUND);
    }

    info!("Post {} deleted", post_id);
    state.publish().await;

    Ok(StatusCode::NO_CONTENT)
}
