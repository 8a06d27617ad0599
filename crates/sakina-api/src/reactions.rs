use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use sakina_types::api::AddReactionRequest;

use crate::state::AppState;

pub async fn add_reaction(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<AddReactionRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let pid = post_id.to_string();
    let label = req.reaction.label();
    let found = state
        .blocking(move |db| db.increment_reaction(&pid, label))
        .await?;

    if !found {
        return Err(StatusCode::NOT_FOUND);
    }

    debug!("Reaction {} on post {}", label, post_id);
    state.publish().await;

    Ok(StatusCode::NO_CONTENT)
}
