use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, error};
use uuid::Uuid;

use sakina_db::Database;
use sakina_types::events::GatewayEvent;

/// Fans board snapshots out to every connected gateway client.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Pre-serialized events; every connected client receives every snapshot
    broadcast_tx: broadcast::Sender<Arc<str>>,

    /// Open gateway connections by conn_id
    connections: RwLock<HashSet<Uuid>>,

    /// Serializes read-then-send so a stale snapshot is never sent after a newer one
    publish_lock: Mutex<()>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                connections: RwLock::new(HashSet::new()),
                publish_lock: Mutex::new(()),
            }),
        }
    }

    /// Subscribe to gateway events. Returns a broadcast receiver of JSON frames.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to all connected clients.
    pub fn broadcast(&self, event: &GatewayEvent) {
        match serde_json::to_string(event) {
            Ok(json) => {
                let _ = self.inner.broadcast_tx.send(json.into());
            }
            Err(e) => error!("Failed to serialize gateway event: {}", e),
        }
    }

    /// Re-read the whole board and push it to every client.
    pub async fn publish_snapshot(&self, db: Arc<Database>) {
        let _guard = self.inner.publish_lock.lock().await;
        let event = snapshot_event(db).await;
        if let GatewayEvent::Snapshot { posts } = &event {
            debug!("Publishing snapshot of {} posts", posts.len());
        }
        self.broadcast(&event);
    }

    pub async fn connection_opened(&self) -> Uuid {
        let conn_id = Uuid::new_v4();
        let mut connections = self.inner.connections.write().await;
        connections.insert(conn_id);
        debug!("Gateway connection {} opened ({} open)", conn_id, connections.len());
        conn_id
    }

    pub async fn connection_closed(&self, conn_id: Uuid) {
        let mut connections = self.inner.connections.write().await;
        connections.remove(&conn_id);
        debug!("Gateway connection {} closed ({} open)", conn_id, connections.len());
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.connections.read().await.len()
    }
}

/// Load the current board as a gateway event, mapping failures to `Unavailable`.
pub async fn snapshot_event(db: Arc<Database>) -> GatewayEvent {
    let loaded = tokio::task::spawn_blocking(move || db.load_snapshot()).await;
    match loaded {
        Ok(Ok(posts)) => GatewayEvent::Snapshot { posts },
        Ok(Err(e)) => {
            error!("Snapshot read failed: {}", e);
            GatewayEvent::Unavailable {
                reason: "posts unavailable".into(),
            }
        }
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            GatewayEvent::Unavailable {
                reason: "posts unavailable".into(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscribers() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.insert_post(&Uuid::new_v4().to_string(), "Guidance", "How to keep focus in taraweeh?", "Hopeful Seeker", false, "aa")
            .unwrap();

        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();
        dispatcher.publish_snapshot(db).await;

        let frame = rx.recv().await.unwrap();
        let event: GatewayEvent = serde_json::from_str(&frame).unwrap();
        match event {
            GatewayEvent::Snapshot { posts } => assert_eq!(posts.len(), 1),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn tracks_connections() {
        let dispatcher = Dispatcher::new();
        let a = dispatcher.connection_opened().await;
        let _b = dispatcher.connection_opened().await;
        assert_eq!(dispatcher.connection_count().await, 2);
        dispatcher.connection_closed(a).await;
        assert_eq!(dispatcher.connection_count().await, 1);
    }
}
