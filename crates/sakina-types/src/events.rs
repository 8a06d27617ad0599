use serde::{Deserialize, Serialize};

use crate::models::Post;

/// Events sent over the WebSocket gateway.
///
/// Every change to the board is delivered as a full snapshot; clients replace
/// their list wholesale and never patch a previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// The complete post collection, newest first.
    Snapshot { posts: Vec<Post> },

    /// The store could not produce a snapshot.
    Unavailable { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_tagged() {
        let json = serde_json::to_string(&GatewayEvent::Snapshot { posts: vec![] }).unwrap();
        assert_eq!(json, r#"{"type":"Snapshot","data":{"posts":[]}}"#);

        let parsed: GatewayEvent =
            serde_json::from_str(r#"{"type":"Unavailable","data":{"reason":"db"}}"#).unwrap();
        assert!(matches!(parsed, GatewayEvent::Unavailable { reason } if reason == "db"));
    }
}
