use subtle::ConstantTimeEq;
use tracing::{info, warn};
use uuid::Uuid;

use sakina_types::models::Post;

use crate::error::{BoardError, Result};
use crate::identity::hash_secret;
use crate::store::PostStore;

/// An open "enter your secret word" prompt for one post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletePrompt {
    pub post_id: Uuid,
}

pub fn request_delete(post: &Post) -> DeletePrompt {
    DeletePrompt { post_id: post.id }
}

/// Whether `entered` digests to the hash stored on the post.
pub fn secret_matches(post: &Post, entered: &str) -> bool {
    let entered = hash_secret(entered);
    entered.as_bytes().ct_eq(post.secret_hash.as_bytes()).into()
}

/// Delete `post` if `entered_secret` is the word it was created with.
///
/// The store performs no authorization of its own; this comparison is the
/// only gate.
pub async fn confirm_delete(store: &dyn PostStore, post: &Post, entered_secret: &str) -> Result<()> {
    if !secret_matches(post, entered_secret) {
        warn!("Delete of post {} refused: secret mismatch", post.id);
        return Err(BoardError::Auth("incorrect secret".into()));
    }

    store.delete_post(post.id).await?;
    info!("Post {} deleted by its author", post.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EmbeddedPostStore;
    use sakina_types::models::{Category, Identity};

    fn post_with(secret: &str) -> Post {
        Post {
            id: Uuid::new_v4(),
            category: Category::Hardship,
            message: "Lost my job".into(),
            author: "Patient Soul".into(),
            anonymous: true,
            secret_hash: hash_secret(secret),
            created_at: chrono::Utc::now(),
            reactions: Default::default(),
            responses: vec![],
        }
    }

    #[test]
    fn secret_comparison_normalizes_input() {
        let post = post_with("tawakkul");
        assert!(secret_matches(&post, "tawakkul"));
        assert!(secret_matches(&post, "  TawakKul "));
        assert!(!secret_matches(&post, "tawakul"));
        assert!(!secret_matches(&post, ""));
    }

    #[test]
    fn prompt_targets_post() {
        let post = post_with("abcd");
        assert_eq!(request_delete(&post).post_id, post.id);
    }

    #[tokio::test]
    async fn wrong_secret_keeps_post() {
        let store = EmbeddedPostStore::in_memory().unwrap();
        let identity = Identity {
            name: "Patient Soul".into(),
            secret_hash: hash_secret("tawakkul"),
            anonymous: false,
        };
        store.create_post(Category::Hardship, "Lost my job", Some(&identity)).await.unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let _sub = store.subscribe(Box::new(move |s| {
            let _ = tx.send(s);
        }));
        let post = rx.recv().await.unwrap().posts.remove(0);

        let err = confirm_delete(&store, &post, "sabr").await.unwrap_err();
        assert!(matches!(err, BoardError::Auth(ref m) if m == "incorrect secret"));

        confirm_delete(&store, &post, "tawakkul").await.unwrap();
        assert!(rx.recv().await.unwrap().posts.is_empty());
    }
}
