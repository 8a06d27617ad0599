use std::sync::Arc;

use tokio::net::TcpListener;
use uuid::Uuid;

use sakina_api::routes::router;
use sakina_api::state::AppStateInner;
use sakina_client::board::{Board, Submission};
use sakina_client::identity::IdentityGate;
use sakina_client::profile::LocalProfileStore;
use sakina_client::store::{FeedStatus, PostStore, RemotePostStore};
use sakina_client::BoardError;
use sakina_db::Database;
use sakina_types::models::{Category, Reaction};

/// Serve a fresh in-memory board on an ephemeral port and return its base URL.
async fn serve() -> String {
    let app = router(AppStateInner::new(Database::open_in_memory().unwrap()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn attached(base_url: &str) -> Board {
    let store = Arc::new(RemotePostStore::new(base_url).unwrap());
    let board = Board::new(store, IdentityGate::new(LocalProfileStore::in_memory()));
    board.attach();
    board.wait_until_loaded().await;
    assert_eq!(board.with_view(|v| v.status()), FeedStatus::Live);
    board
}

async fn only_post_id(board: &Board) -> Uuid {
    board.wait_until(|v| v.posts().len() == 1).await;
    board.with_view(|v| v.posts()[0].id)
}

#[tokio::test]
async fn created_post_reaches_every_remote_reader() {
    let base = serve().await;
    let author = attached(&base).await;
    let other = attached(&base).await;

    author.provide_identity("Ibrahim", "tawakkul", false).await.unwrap();
    let outcome = author
        .submit_post(Category::DuaRequest, " Pray for safe travels ")
        .await
        .unwrap();
    assert_eq!(outcome, Submission::Done);

    other.wait_until(|v| v.posts().len() == 1).await;
    let post = other.with_view(|v| v.posts()[0].clone());
    assert_eq!(post.category, Category::DuaRequest);
    assert_eq!(post.message, "Pray for safe travels");
    assert_eq!(post.author, "Ibrahim");
    assert!(post.reactions.is_empty());
    assert!(post.responses.is_empty());
}

#[tokio::test]
async fn two_remote_reactions_count_two() {
    let base = serve().await;
    let board = attached(&base).await;
    board.provide_identity("", "abcd", true).await.unwrap();
    board.submit_post(Category::Healing, "Recovery after surgery").await.unwrap();
    let id = only_post_id(&board).await;

    board.react(id, Reaction::Ameen).await.unwrap();
    board.react(id, Reaction::Ameen).await.unwrap();

    board
        .wait_until(|v| v.find(id).is_some_and(|p| p.reaction_count(Reaction::Ameen) == 2))
        .await;
    let post = board.with_view(|v| v.find(id).cloned()).unwrap();
    assert_eq!(post.total_reactions(), 2);
}

#[tokio::test]
async fn remote_delete_requires_matching_secret() {
    let base = serve().await;
    let board = attached(&base).await;
    board.provide_identity("Safiyyah", "Sabr", false).await.unwrap();
    board.submit_post(Category::Hardship, "Lost my job").await.unwrap();
    let id = only_post_id(&board).await;

    board.request_delete(id).unwrap();
    let err = board.confirm_delete("shukr").await.unwrap_err();
    assert!(matches!(err, BoardError::Auth(_)));
    assert!(board.with_view(|v| v.find(id).is_some()));

    board.confirm_delete("SABR").await.unwrap();
    board.wait_until(|v| v.posts().is_empty()).await;
}

#[tokio::test]
async fn missing_post_maps_to_not_found() {
    let base = serve().await;
    let store = RemotePostStore::new(&base).unwrap();
    let err = store.add_reaction(Uuid::new_v4(), Reaction::StayStrong).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(store.delete_post(Uuid::new_v4()).await.unwrap_err().is_not_found());
}
