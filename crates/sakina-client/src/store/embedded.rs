use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use sakina_db::Database;
use sakina_types::models::{Category, Identity, MAX_MESSAGE_CHARS, MAX_RESPONSE_CHARS, Reaction};

use crate::error::{BoardError, Result};
use crate::store::{PostStore, Snapshot, SnapshotCallback, SnapshotSink, Subscription, validate_authored};

/// A post store living in this process, over the same SQLite schema the
/// server uses. Every committed write wakes all subscribers, which re-read
/// the whole board.
#[derive(Clone)]
pub struct EmbeddedPostStore {
    db: Arc<Database>,
    changes: broadcast::Sender<()>,
}

impl EmbeddedPostStore {
    pub fn new(db: Database) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            db: Arc::new(db),
            changes,
        }
    }

    pub fn in_memory() -> Result<Self> {
        let db = Database::open_in_memory().map_err(|e| BoardError::Network(e.to_string()))?;
        Ok(Self::new(db))
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                BoardError::Network(e.to_string())
            })?
            .map_err(|e| BoardError::Network(e.to_string()))
    }

    fn notify(&self) {
        // No receivers just means nobody is subscribed
        let _ = self.changes.send(());
    }
}

async fn load(db: Arc<Database>) -> Snapshot {
    match tokio::task::spawn_blocking(move || db.load_snapshot()).await {
        Ok(Ok(posts)) => Snapshot::live(posts),
        Ok(Err(e)) => {
            warn!("Snapshot read failed: {}", e);
            Snapshot::unavailable()
        }
        Err(e) => {
            warn!("spawn_blocking join error: {}", e);
            Snapshot::unavailable()
        }
    }
}

#[async_trait]
impl PostStore for EmbeddedPostStore {
    fn subscribe(&self, on_snapshot: SnapshotCallback) -> Subscription {
        let sink = SnapshotSink::new(on_snapshot);
        let task_sink = sink.clone();
        let db = self.db.clone();
        // Subscribe before the first read so no change in between is missed
        let mut rx = self.changes.subscribe();

        let task = tokio::spawn(async move {
            task_sink.deliver(load(db.clone()).await);
            loop {
                match rx.recv().await {
                    Ok(()) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!("Embedded subscriber skipped {} change notices", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                task_sink.deliver(load(db.clone()).await);
            }
        });

        Subscription::new(sink, task)
    }

    async fn create_post(&self, category: Category, message: &str, identity: Option<&Identity>) -> Result<()> {
        let (message, identity) = validate_authored(message, MAX_MESSAGE_CHARS, identity, "message")?;
        let post_id = Uuid::new_v4();
        let pid = post_id.to_string();
        let author = identity.name.clone();
        let anonymous = identity.anonymous;
        let secret_hash = identity.secret_hash.clone();

        self.blocking(move |db| db.insert_post(&pid, category.label(), &message, &author, anonymous, &secret_hash))
            .await?;

        info!("Post {} created in {}", post_id, category);
        self.notify();
        Ok(())
    }

    async fn add_reaction(&self, post_id: Uuid, reaction: Reaction) -> Result<()> {
        let pid = post_id.to_string();
        let found = self
            .blocking(move |db| db.increment_reaction(&pid, reaction.label()))
            .await?;
        if !found {
            return Err(BoardError::NotFound(post_id));
        }

        debug!("Reaction {} on post {}", reaction, post_id);
        self.notify();
        Ok(())
    }

    async fn add_response(&self, post_id: Uuid, text: &str, identity: Option<&Identity>) -> Result<()> {
        let (text, identity) = validate_authored(text, MAX_RESPONSE_CHARS, identity, "response")?;
        let rid = Uuid::new_v4().to_string();
        let pid = post_id.to_string();
        let author = identity.name.clone();

        let appended = self
            .blocking(move |db| db.append_response(&rid, &pid, &author, &text))
            .await?;
        if appended.is_none() {
            return Err(BoardError::NotFound(post_id));
        }

        debug!("Response appended to post {}", post_id);
        self.notify();
        Ok(())
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<()> {
        let pid = post_id.to_string();
        let removed = self.blocking(move |db| db.delete_post(&pid)).await?;
        if !removed {
            return Err(BoardError::NotFound(post_id));
        }

        info!("Post {} deleted", post_id);
        self.notify();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn identity() -> Identity {
        Identity {
            name: "Grateful Sister".into(),
            secret_hash: crate::identity::hash_secret("sabr"),
            anonymous: true,
        }
    }

    #[tokio::test]
    async fn overlong_message_is_not_stored() {
        let store = EmbeddedPostStore::in_memory().unwrap();
        let message = "x".repeat(MAX_MESSAGE_CHARS + 1);
        let err = store.create_post(Category::Family, &message, Some(&identity())).await.unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));

        let at_cap = "x".repeat(MAX_MESSAGE_CHARS);
        store.create_post(Category::Family, &at_cap, Some(&identity())).await.unwrap();
    }

    #[tokio::test]
    async fn initial_snapshot_then_changes() {
        let store = EmbeddedPostStore::in_memory().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = store.subscribe(Box::new(move |s| {
            let _ = tx.send(s);
        }));

        let first = rx.recv().await.unwrap();
        assert_eq!(first, Snapshot::live(vec![]));

        store
            .create_post(Category::Healing, "Shifa for my father", Some(&identity()))
            .await
            .unwrap();
        let next = rx.recv().await.unwrap();
        assert_eq!(next.posts.len(), 1);
        assert_eq!(next.posts[0].author, "Grateful Sister");
    }

    #[tokio::test]
    async fn writes_on_missing_post_are_not_found() {
        let store = EmbeddedPostStore::in_memory().unwrap();
        let ghost = Uuid::new_v4();
        assert!(store.add_reaction(ghost, Reaction::Ameen).await.unwrap_err().is_not_found());
        assert!(store.add_response(ghost, "hi", Some(&identity())).await.unwrap_err().is_not_found());
        assert!(store.delete_post(ghost).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn blank_message_never_reaches_store() {
        let store = EmbeddedPostStore::in_memory().unwrap();
        let err = store.create_post(Category::Family, "  \n ", Some(&identity())).await.unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));
        let err = store.create_post(Category::Family, "hello", None).await.unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));
        assert!(store.db.load_snapshot().unwrap().is_empty());
    }
}
