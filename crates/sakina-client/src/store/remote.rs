use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{StatusCode, Url};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use uuid::Uuid;

use sakina_types::api::{AddReactionRequest, AddResponseRequest, CreatePostRequest, CreatePostResponse};
use sakina_types::events::GatewayEvent;
use sakina_types::models::{Category, Identity, MAX_MESSAGE_CHARS, MAX_RESPONSE_CHARS, Reaction};

use crate::error::{BoardError, Result};
use crate::store::{PostStore, Snapshot, SnapshotCallback, SnapshotSink, Subscription, validate_authored};

/// Post store behind a `sakina` server: REST for writes, the `/gateway`
/// WebSocket for snapshots.
#[derive(Clone)]
pub struct RemotePostStore {
    http: reqwest::Client,
    base_url: Url,
}

impl RemotePostStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| BoardError::validation(format!("invalid board url '{}': {}", base_url, e)))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| BoardError::Network(format!("bad endpoint '{}': {}", path, e)))
    }

    /// `http(s)://host/…/gateway` rewritten to `ws(s)://`.
    pub fn gateway_url(&self) -> Result<Url> {
        let mut url = self.endpoint("gateway")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| BoardError::Network(format!("cannot derive gateway url from {}", self.base_url)))?;
        Ok(url)
    }
}

/// Map a store reply onto the board error taxonomy.
fn check_status(status: StatusCode, post_id: Option<Uuid>) -> Result<()> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::NOT_FOUND => match post_id {
            Some(id) => Err(BoardError::NotFound(id)),
            None => Err(BoardError::Network("store endpoint not found".into())),
        },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            Err(BoardError::validation(format!("store rejected the request ({})", status)))
        }
        s => Err(BoardError::Network(format!("store returned {}", s))),
    }
}

async fn run_gateway(url: Url, sink: SnapshotSink) {
    let (mut stream, _) = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok(conn) => conn,
        Err(e) => {
            warn!("Gateway connect to {} failed: {}", url, e);
            sink.deliver(Snapshot::unavailable());
            return;
        }
    };
    info!("Subscribed to {}", url);

    while let Some(frame) = stream.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Gateway stream error: {}", e);
                break;
            }
        };

        match msg {
            Message::Text(text) => match serde_json::from_str::<GatewayEvent>(text.as_str()) {
                Ok(GatewayEvent::Snapshot { posts }) => {
                    debug!("Snapshot of {} posts", posts.len());
                    sink.deliver(Snapshot::live(posts));
                }
                Ok(GatewayEvent::Unavailable { reason }) => {
                    warn!("Store reports posts unavailable: {}", reason);
                    sink.deliver(Snapshot::unavailable());
                }
                Err(e) => warn!("Bad gateway frame: {}", e),
            },
            Message::Close(_) => break,
            // Pings are answered by tungstenite on the next read
            _ => {}
        }
    }

    // No automatic reconnect; the next subscribe opens a fresh connection
    info!("Gateway connection to {} closed", url);
    sink.deliver(Snapshot::unavailable());
}

#[async_trait]
impl PostStore for RemotePostStore {
    fn subscribe(&self, on_snapshot: SnapshotCallback) -> Subscription {
        let sink = SnapshotSink::new(on_snapshot);
        let task_sink = sink.clone();
        let url = self.gateway_url();

        let task = tokio::spawn(async move {
            match url {
                Ok(url) => run_gateway(url, task_sink).await,
                Err(e) => {
                    warn!("{}", e);
                    task_sink.deliver(Snapshot::unavailable());
                }
            }
        });

        Subscription::new(sink, task)
    }

    async fn create_post(&self, category: Category, message: &str, identity: Option<&Identity>) -> Result<()> {
        let (message, identity) = validate_authored(message, MAX_MESSAGE_CHARS, identity, "message")?;
        let body = CreatePostRequest {
            category,
            message,
            author: identity.name.clone(),
            anonymous: identity.anonymous,
            secret_hash: identity.secret_hash.clone(),
        };

        let resp = self.http.post(self.endpoint("posts")?).json(&body).send().await?;
        check_status(resp.status(), None)?;
        let created: CreatePostResponse = resp.json().await?;
        info!("Post {} created in {}", created.id, category);
        Ok(())
    }

    async fn add_reaction(&self, post_id: Uuid, reaction: Reaction) -> Result<()> {
        let url = self.endpoint(&format!("posts/{}/reactions", post_id))?;
        let resp = self
            .http
            .post(url)
            .json(&AddReactionRequest { reaction })
            .send()
            .await?;
        check_status(resp.status(), Some(post_id))
    }

    async fn add_response(&self, post_id: Uuid, text: &str, identity: Option<&Identity>) -> Result<()> {
        let (text, identity) = validate_authored(text, MAX_RESPONSE_CHARS, identity, "response")?;
        let url = self.endpoint(&format!("posts/{}/responses", post_id))?;
        let resp = self
            .http
            .post(url)
            .json(&AddResponseRequest {
                author: identity.name.clone(),
                text,
            })
            .send()
            .await?;
        check_status(resp.status(), Some(post_id))
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<()> {
        let url = self.endpoint(&format!("posts/{}", post_id))?;
        let resp = self.http.delete(url).send().await?;
        check_status(resp.status(), Some(post_id))?;
        info!("Post {} deleted", post_id);
        Ok(())
    }
}
