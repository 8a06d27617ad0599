use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound on a post body, in characters after trimming.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Upper bound on a response body, in characters after trimming.
pub const MAX_RESPONSE_CHARS: usize = 1000;

/// Upper bound on an author display name, in characters after trimming.
pub const MAX_AUTHOR_CHARS: usize = 64;

/// Fixed set of board categories. The wire form is the human label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Dua Request")]
    DuaRequest,
    Guidance,
    Gratitude,
    Healing,
    Family,
    Hardship,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::DuaRequest,
        Category::Guidance,
        Category::Gratitude,
        Category::Healing,
        Category::Family,
        Category::Hardship,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::DuaRequest => "Dua Request",
            Self::Guidance => "Guidance",
            Self::Gratitude => "Gratitude",
            Self::Healing => "Healing",
            Self::Family => "Family",
            Self::Hardship => "Hardship",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::DuaRequest
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel(pub String);

impl fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown label '{}'", self.0)
    }
}

impl std::error::Error for UnknownLabel {}

impl FromStr for Category {
    type Err = UnknownLabel;

    /// Accepts the wire label ("Dua Request") or a loose form ("dua-request", "dua").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .into_iter()
            .find(|c| {
                let label: String = c
                    .label()
                    .chars()
                    .filter(|ch| ch.is_alphanumeric())
                    .flat_map(char::to_lowercase)
                    .collect();
                label == wanted || (wanted == "dua" && *c == Category::DuaRequest)
            })
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

/// Reactions any viewer may add to a post. Counters are keyed by `label()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reaction {
    #[serde(rename = "🤲 Ameen")]
    Ameen,
    #[serde(rename = "❤️ In my du'a")]
    InMyDua,
    #[serde(rename = "🌙 May Allah ease")]
    MayAllahEase,
    #[serde(rename = "✨ SubhanAllah")]
    SubhanAllah,
    #[serde(rename = "💪 Stay strong")]
    StayStrong,
}

impl Reaction {
    pub const ALL: [Reaction; 5] = [
        Reaction::Ameen,
        Reaction::InMyDua,
        Reaction::MayAllahEase,
        Reaction::SubhanAllah,
        Reaction::StayStrong,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ameen => "🤲 Ameen",
            Self::InMyDua => "❤️ In my du'a",
            Self::MayAllahEase => "🌙 May Allah ease",
            Self::SubhanAllah => "✨ SubhanAllah",
            Self::StayStrong => "💪 Stay strong",
        }
    }

    /// The label without its leading emoji, e.g. "Ameen".
    pub fn short_name(&self) -> &'static str {
        self.label()
            .split_once(' ')
            .map(|(_, rest)| rest)
            .unwrap_or(self.label())
    }
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Reaction {
    type Err = UnknownLabel;

    /// Accepts the full label or its text part, case-insensitively ("ameen").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.label().to_lowercase() == wanted || r.short_name().to_lowercase() == wanted)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

/// A threaded reply attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: Uuid,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A board entry as held by the store and delivered in every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub category: Category,
    pub message: String,
    pub author: String,
    #[serde(default)]
    pub anonymous: bool,
    pub secret_hash: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reactions: BTreeMap<String, u64>,
    #[serde(default)]
    pub responses: Vec<Response>,
}

impl Post {
    pub fn reaction_count(&self, reaction: Reaction) -> u64 {
        self.reactions.get(reaction.label()).copied().unwrap_or(0)
    }

    pub fn total_reactions(&self) -> u64 {
        self.reactions.values().sum()
    }
}

/// Locally persisted pseudonymous author record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub name: String,
    pub secret_hash: String,
    pub anonymous: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_wire_label() {
        let json = serde_json::to_string(&Category::DuaRequest).unwrap();
        assert_eq!(json, "\"Dua Request\"");
        let back: Category = serde_json::from_str("\"Hardship\"").unwrap();
        assert_eq!(back, Category::Hardship);
    }

    #[test]
    fn category_from_loose_input() {
        assert_eq!("dua-request".parse::<Category>().unwrap(), Category::DuaRequest);
        assert_eq!("Dua Request".parse::<Category>().unwrap(), Category::DuaRequest);
        assert_eq!("healing".parse::<Category>().unwrap(), Category::Healing);
        assert!("sports".parse::<Category>().is_err());
    }

    #[test]
    fn reaction_parse_by_short_name() {
        assert_eq!("ameen".parse::<Reaction>().unwrap(), Reaction::Ameen);
        assert_eq!("🤲 Ameen".parse::<Reaction>().unwrap(), Reaction::Ameen);
        assert_eq!("stay strong".parse::<Reaction>().unwrap(), Reaction::StayStrong);
        assert!("boo".parse::<Reaction>().is_err());
    }

    #[test]
    fn post_uses_camel_case_document_shape() {
        let post = Post {
            id: Uuid::nil(),
            category: Category::Gratitude,
            message: "Alhamdulillah".into(),
            author: "Humble Soul".into(),
            anonymous: true,
            secret_hash: "ab".repeat(32),
            created_at: DateTime::<Utc>::default(),
            reactions: BTreeMap::from([(Reaction::Ameen.label().to_string(), 2)]),
            responses: vec![],
        };
        let value = serde_json::to_value(&post).unwrap();
        assert!(value.get("secretHash").is_some());
        assert!(value.get("createdAt").is_some());
        assert_eq!(value["reactions"]["🤲 Ameen"], 2);
        assert_eq!(post.total_reactions(), 2);
        assert_eq!(post.reaction_count(Reaction::InMyDua), 0);
    }
}
