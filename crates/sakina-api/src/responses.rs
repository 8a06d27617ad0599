use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, warn};
use uuid::Uuid;

use sakina_types::api::AddResponseRequest;
use sakina_types::models::{MAX_AUTHOR_CHARS, MAX_RESPONSE_CHARS, Response};

use crate::state::AppState;

pub async fn add_response(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<AddResponseRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let text = req.text.trim().to_string();
    let author = req.author.trim().to_string();

    if text.is_empty() || text.chars().count() > MAX_RESPONSE_CHARS {
        return Err(StatusCode::BAD_REQUEST);
    }
    if author.is_empty() || author.chars().count() > MAX_AUTHOR_CHARS {
        return Err(StatusCode::BAD_REQUEST);
    }

    let response_id = Uuid::new_v4();
    let rid = response_id.to_string();
    let pid = post_id.to_string();
    let row = state
        .blocking(move |db| db.append_response(&rid, &pid, &author, &text))
        .await?
        .ok_or(StatusCode::NOT_FOUND)?;

    debug!("Response {} appended to post {}", response_id, post_id);
    state.publish().await;

    let created_at = row
        .created_at
        .parse::<chrono::DateTime<chrono::Utc>>()
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on response '{}': {}", row.created_at, row.id, e);
            chrono::Utc::now()
        });

    Ok((
        StatusCode::CREATED,
        Json(Response {
            id: response_id,
            author: row.author,
            text: row.text,
            created_at,
        }),
    ))
}
