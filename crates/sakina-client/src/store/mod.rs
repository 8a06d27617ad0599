//! Post Store Adapter: a live subscription to the shared post collection plus
//! the four write operations, each a single round trip to the store.
//!
//! Nothing here is applied optimistically. A write only becomes visible when
//! the store delivers the next snapshot.

mod embedded;
mod remote;

pub use embedded::EmbeddedPostStore;
pub use remote::RemotePostStore;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

use sakina_types::models::{Category, Identity, MAX_AUTHOR_CHARS, Post, Reaction};

use crate::error::{BoardError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// No snapshot received yet.
    Loading,
    /// Posts reflect the store.
    Live,
    /// The subscription failed; the list is empty.
    Unavailable,
}

/// The full post collection at one instant, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub posts: Vec<Post>,
    pub status: FeedStatus,
}

impl Snapshot {
    pub fn live(posts: Vec<Post>) -> Self {
        Self {
            posts,
            status: FeedStatus::Live,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            posts: Vec::new(),
            status: FeedStatus::Unavailable,
        }
    }
}

pub type SnapshotCallback = Box<dyn FnMut(Snapshot) + Send + 'static>;

/// Callback slot shared by a subscription task and its handle. Once closed,
/// no further snapshot reaches the callback.
#[derive(Clone)]
pub(crate) struct SnapshotSink {
    callback: Arc<Mutex<Option<SnapshotCallback>>>,
}

impl SnapshotSink {
    pub(crate) fn new(callback: SnapshotCallback) -> Self {
        Self {
            callback: Arc::new(Mutex::new(Some(callback))),
        }
    }

    pub(crate) fn deliver(&self, snapshot: Snapshot) {
        match self.callback.lock() {
            Ok(mut slot) => {
                if let Some(cb) = slot.as_mut() {
                    cb(snapshot);
                }
            }
            Err(e) => warn!("Snapshot callback lock poisoned: {}", e),
        }
    }

    fn close(&self) {
        if let Ok(mut slot) = self.callback.lock() {
            slot.take();
        }
    }
}

/// Handle to a live subscription. Dropping it unsubscribes.
pub struct Subscription {
    sink: SnapshotSink,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(sink: SnapshotSink, task: JoinHandle<()>) -> Self {
        Self {
            sink,
            task: Some(task),
        }
    }

    /// Stop delivery. After this returns the callback is never invoked again.
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|t| t.is_finished())
    }

    fn stop(&mut self) {
        self.sink.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The shared, real-time post collection.
///
/// `subscribe` must be called from within a Tokio runtime.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Deliver the full current list now and after every change by any client.
    /// A failed subscription delivers one empty `Unavailable` snapshot.
    fn subscribe(&self, on_snapshot: SnapshotCallback) -> Subscription;

    /// Create a post authored by `identity`. Rejected locally if the message
    /// is blank or there is no identity.
    async fn create_post(&self, category: Category, message: &str, identity: Option<&Identity>) -> Result<()>;

    /// Increment one reaction counter on a post.
    async fn add_reaction(&self, post_id: Uuid, reaction: Reaction) -> Result<()>;

    /// Append a response to a post. Concurrent appends are all kept.
    async fn add_response(&self, post_id: Uuid, text: &str, identity: Option<&Identity>) -> Result<()>;

    /// Remove a post. No authorization happens here; see `moderation`.
    async fn delete_post(&self, post_id: Uuid) -> Result<()>;
}

/// Reject text longer than `max` characters. `text` is expected trimmed.
pub(crate) fn check_length(text: &str, max: usize, what: &str) -> Result<()> {
    if text.chars().count() > max {
        return Err(BoardError::validation(format!("{} must be at most {} characters", what, max)));
    }
    Ok(())
}

/// Shared pre-flight checks for authored writes. Returns the trimmed text.
pub(crate) fn validate_authored<'a>(
    text: &str,
    max: usize,
    identity: Option<&'a Identity>,
    what: &str,
) -> Result<(String, &'a Identity)> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(BoardError::validation(format!("{} must not be empty", what)));
    }
    check_length(trimmed, max, what)?;
    let identity = identity.ok_or_else(|| BoardError::validation("an identity is required to post"))?;
    check_length(identity.name.trim(), MAX_AUTHOR_CHARS, "name")?;
    Ok((trimmed.to_string(), identity))
}
