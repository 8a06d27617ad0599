use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use sakina_types::models::{Category, Identity, MAX_MESSAGE_CHARS, MAX_RESPONSE_CHARS, Reaction};

use crate::error::{BoardError, Result};
use crate::identity::IdentityGate;
use crate::moderation::{self, DeletePrompt};
use crate::store::{PostStore, Subscription, check_length};
use crate::view::BoardView;

/// Outcome of an authored action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The store accepted the write; it shows up with the next snapshot.
    Done,
    /// No identity on this device yet. The action is parked and runs as soon
    /// as `provide_identity` succeeds.
    IdentityRequired,
}

/// What `provide_identity` produced, including the parked action's result.
#[derive(Debug)]
pub struct IdentityOutcome {
    pub identity: Identity,
    pub resumed: Option<Result<()>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingAction {
    Post { category: Category, message: String },
    Response { post_id: Uuid, text: String },
}

/// Action handler for one reader's board screen.
///
/// Owns the live subscription and the derived [`BoardView`]. Every write is a
/// single store round trip with `submitting` raised for its duration; the
/// view only changes when the store delivers the next snapshot.
pub struct Board {
    store: Arc<dyn PostStore>,
    gate: IdentityGate,
    view: Arc<Mutex<BoardView>>,
    changes: Arc<watch::Sender<u64>>,
    pending: Mutex<Option<PendingAction>>,
    prompt: Mutex<Option<DeletePrompt>>,
    subscription: Mutex<Option<Subscription>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // State here is plain data; a panicked writer leaves nothing half-updated
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Counts one write in flight until dropped, whether the write succeeded,
/// failed or was cancelled. `submitting` holds while any guard is alive.
struct Busy<'a> {
    board: &'a Board,
}

impl<'a> Busy<'a> {
    fn begin(board: &'a Board) -> Self {
        board.update_view(BoardView::begin_write);
        Self { board }
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.board.update_view(BoardView::end_write);
    }
}

impl Board {
    pub fn new(store: Arc<dyn PostStore>, gate: IdentityGate) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            store,
            gate,
            view: Arc::new(Mutex::new(BoardView::new())),
            changes: Arc::new(changes),
            pending: Mutex::new(None),
            prompt: Mutex::new(None),
            subscription: Mutex::new(None),
        }
    }

    /// Start receiving snapshots. Calling it again while attached is a no-op.
    pub fn attach(&self) {
        let mut slot = lock(&self.subscription);
        if slot.is_some() {
            return;
        }

        let view = self.view.clone();
        let changes = self.changes.clone();
        let subscription = self.store.subscribe(Box::new(move |snapshot| {
            debug!("Applying snapshot of {} posts ({:?})", snapshot.posts.len(), snapshot.status);
            lock(&view).apply_snapshot(snapshot);
            changes.send_modify(|n| *n += 1);
        }));
        *slot = Some(subscription);
        info!("Board attached");
    }

    /// Stop receiving snapshots. The last applied view is kept.
    pub fn detach(&self) {
        if let Some(subscription) = lock(&self.subscription).take() {
            subscription.unsubscribe();
            info!("Board detached");
        }
    }

    /// Ticks once per view change (snapshot, `submitting` flip).
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Read the current view.
    pub fn with_view<R>(&self, f: impl FnOnce(&BoardView) -> R) -> R {
        f(&lock(&self.view))
    }

    /// Mutate local-only view state (filter, expansion, drafts).
    pub fn update_view<R>(&self, f: impl FnOnce(&mut BoardView) -> R) -> R {
        let out = f(&mut lock(&self.view));
        self.changes.send_modify(|n| *n += 1);
        out
    }

    /// Resolve once `pred` holds for the view.
    pub async fn wait_until(&self, pred: impl Fn(&BoardView) -> bool) {
        let mut rx = self.changes();
        loop {
            if self.with_view(&pred) {
                return;
            }
            // The sender lives as long as `self`
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub async fn wait_until_loaded(&self) {
        self.wait_until(BoardView::is_loaded).await
    }

    pub fn identity(&self) -> Result<Option<Identity>> {
        self.gate.get_identity()
    }

    pub async fn submit_post(&self, category: Category, message: &str) -> Result<Submission> {
        let message = message.trim();
        if message.is_empty() {
            return Err(BoardError::validation("message must not be empty"));
        }
        check_length(message, MAX_MESSAGE_CHARS, "message")?;
        self.submit(PendingAction::Post {
            category,
            message: message.to_string(),
        })
        .await
    }

    /// Send the reader's draft response for `post_id`.
    pub async fn submit_response(&self, post_id: Uuid) -> Result<Submission> {
        let text = self.with_view(|v| v.draft(post_id).trim().to_string());
        if text.is_empty() {
            return Err(BoardError::validation("response must not be empty"));
        }
        check_length(&text, MAX_RESPONSE_CHARS, "response")?;
        self.submit(PendingAction::Response { post_id, text }).await
    }

    /// Reactions need no identity.
    pub async fn react(&self, post_id: Uuid, reaction: Reaction) -> Result<()> {
        let _busy = Busy::begin(self);
        match self.store.add_reaction(post_id, reaction).await {
            Err(e) if e.is_not_found() => {
                debug!("Reaction on vanished post {} dropped", post_id);
                Ok(())
            }
            other => other,
        }
    }

    /// Save a first identity and run whatever action was waiting for it.
    pub async fn provide_identity(&self, name: &str, secret_word: &str, anonymous: bool) -> Result<IdentityOutcome> {
        let identity = self.gate.save_identity(name, secret_word, anonymous)?;
        let parked = lock(&self.pending).take();

        let resumed = match parked {
            Some(action) => {
                debug!("Resuming parked action for '{}'", identity.name);
                Some(self.run(action, &identity).await)
            }
            None => None,
        };
        Ok(IdentityOutcome { identity, resumed })
    }

    /// Replace the identity used for future posts. Existing posts keep the
    /// author and secret they were created with.
    pub fn change_identity(&self, name: &str, secret_word: &str, anonymous: bool) -> Result<Identity> {
        self.gate.save_identity(name, secret_word, anonymous)
    }

    pub fn has_pending_action(&self) -> bool {
        lock(&self.pending).is_some()
    }

    /// Abandon the action waiting for an identity.
    pub fn cancel_pending(&self) {
        lock(&self.pending).take();
    }

    pub fn request_delete(&self, post_id: Uuid) -> Result<DeletePrompt> {
        let prompt = self
            .with_view(|v| v.find(post_id).map(moderation::request_delete))
            .ok_or(BoardError::NotFound(post_id))?;
        *lock(&self.prompt) = Some(prompt);
        Ok(prompt)
    }

    pub fn delete_prompt(&self) -> Option<DeletePrompt> {
        *lock(&self.prompt)
    }

    pub fn cancel_delete(&self) {
        lock(&self.prompt).take();
    }

    /// Check `secret_word` against the prompted post and delete it on a
    /// match. A mismatch leaves both the post and the prompt in place.
    pub async fn confirm_delete(&self, secret_word: &str) -> Result<()> {
        let prompt = self
            .delete_prompt()
            .ok_or_else(|| BoardError::validation("no delete in progress"))?;

        let Some(post) = self.with_view(|v| v.find(prompt.post_id).cloned()) else {
            debug!("Post {} vanished before delete", prompt.post_id);
            self.cancel_delete();
            return Ok(());
        };

        let _busy = Busy::begin(self);
        match moderation::confirm_delete(self.store.as_ref(), &post, secret_word).await {
            Ok(()) => {
                self.cancel_delete();
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                self.cancel_delete();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn submit(&self, action: PendingAction) -> Result<Submission> {
        match self.gate.get_identity()? {
            Some(identity) => {
                self.run(action, &identity).await?;
                Ok(Submission::Done)
            }
            None => {
                debug!("No identity yet; parking action");
                *lock(&self.pending) = Some(action);
                Ok(Submission::IdentityRequired)
            }
        }
    }

    async fn run(&self, action: PendingAction, identity: &Identity) -> Result<()> {
        let _busy = Busy::begin(self);
        match action {
            PendingAction::Post { category, message } => {
                self.store.create_post(category, &message, Some(identity)).await
            }
            PendingAction::Response { post_id, text } => {
                match self.store.add_response(post_id, &text, Some(identity)).await {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => debug!("Response to vanished post {} dropped", post_id),
                    Err(e) => return Err(e),
                }
                self.update_view(|v| v.clear_draft(post_id));
                Ok(())
            }
        }
    }
}

impl Drop for Board {
    fn drop(&mut self) {
        self.detach();
    }
}
