use std::sync::Arc;

use axum::http::StatusCode;
use tracing::error;

use sakina_db::Database;
use sakina_gateway::dispatcher::Dispatcher;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub dispatcher: Dispatcher,
}

impl AppStateInner {
    pub fn new(db: Database) -> AppState {
        Arc::new(Self {
            db: Arc::new(db),
            dispatcher: Dispatcher::new(),
        })
    }

    /// Run a blocking DB call off the async runtime, mapping failures to 500.
    pub async fn blocking<F, T>(&self, f: F) -> Result<T, StatusCode>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .map_err(|e| {
                error!("DB error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })
    }

    /// Push the current board to every gateway client.
    pub async fn publish(&self) {
        self.dispatcher.publish_snapshot(self.db.clone()).await;
    }
}
