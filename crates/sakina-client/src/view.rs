use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use sakina_types::models::{Category, Post, UnknownLabel};

use crate::store::{FeedStatus, Snapshot};

/// Category tab selection. `All` shows every post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Only(c) => c.fmt(f),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

pub fn filter_by_category(posts: &[Post], filter: CategoryFilter) -> Vec<&Post> {
    match filter {
        CategoryFilter::All => posts.iter().collect(),
        CategoryFilter::Only(category) => posts.iter().filter(|p| p.category == category).collect(),
    }
}

/// Board-wide totals shown in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Aggregate {
    pub post_count: usize,
    pub response_count: usize,
    pub reaction_count: u64,
}

pub fn aggregate(posts: &[Post]) -> Aggregate {
    Aggregate {
        post_count: posts.len(),
        response_count: posts.iter().map(|p| p.responses.len()).sum(),
        reaction_count: posts.iter().map(Post::total_reactions).sum(),
    }
}

/// Author line as shown on a post.
pub fn display_author(post: &Post) -> String {
    if post.anonymous {
        format!("{} (anonymous)", post.author)
    } else {
        post.author.clone()
    }
}

/// Coarse relative age: "just now", "5m ago", "3h ago", "2d ago".
pub fn time_ago(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let mins = (now - ts).num_minutes();
    if mins < 1 {
        return "just now".into();
    }
    if mins < 60 {
        return format!("{}m ago", mins);
    }
    let hours = mins / 60;
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    format!("{}d ago", hours / 24)
}

/// Local state of the board screen, derived from the latest snapshot.
/// Nothing here is persisted.
#[derive(Debug, Clone)]
pub struct BoardView {
    posts: Vec<Post>,
    status: FeedStatus,
    filter: CategoryFilter,
    expanded: Option<Uuid>,
    drafts: HashMap<Uuid, String>,
    in_flight: usize,
}

impl Default for BoardView {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardView {
    pub fn new() -> Self {
        Self {
            posts: Vec::new(),
            status: FeedStatus::Loading,
            filter: CategoryFilter::All,
            expanded: None,
            drafts: HashMap::new(),
            in_flight: 0,
        }
    }

    /// Replace the board with `snapshot`. State tied to posts that are no
    /// longer present (expansion, drafts) is dropped.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.posts = snapshot.posts;
        self.status = snapshot.status;

        if let Some(id) = self.expanded {
            if self.find(id).is_none() {
                self.expanded = None;
            }
        }
        let posts = &self.posts;
        self.drafts.retain(|id, _| posts.iter().any(|p| p.id == *id));
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn find(&self, id: Uuid) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    pub fn status(&self) -> FeedStatus {
        self.status
    }

    pub fn is_loaded(&self) -> bool {
        self.status != FeedStatus::Loading
    }

    pub fn filter(&self) -> CategoryFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: CategoryFilter) {
        self.filter = filter;
    }

    /// Posts under the active category filter.
    pub fn visible_posts(&self) -> Vec<&Post> {
        filter_by_category(&self.posts, self.filter)
    }

    /// Totals over the whole board, regardless of filter.
    pub fn stats(&self) -> Aggregate {
        aggregate(&self.posts)
    }

    pub fn expanded(&self) -> Option<Uuid> {
        self.expanded
    }

    /// Open a post's responses, or close them if already open.
    pub fn toggle_expanded(&mut self, id: Uuid) {
        self.expanded = if self.expanded == Some(id) { None } else { Some(id) };
    }

    pub fn set_draft(&mut self, id: Uuid, text: impl Into<String>) {
        self.drafts.insert(id, text.into());
    }

    pub fn draft(&self, id: Uuid) -> &str {
        self.drafts.get(&id).map(String::as_str).unwrap_or("")
    }

    pub fn clear_draft(&mut self, id: Uuid) {
        self.drafts.remove(&id);
    }

    /// True while any write started from this screen is outstanding.
    pub fn is_submitting(&self) -> bool {
        self.in_flight > 0
    }

    pub fn begin_write(&mut self) {
        self.in_flight += 1;
    }

    pub fn end_write(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sakina_types::models::Response;
    use std::collections::BTreeMap;

    fn post(category: Category, reactions: &[(&str, u64)], responses: usize) -> Post {
        Post {
            id: Uuid::new_v4(),
            category,
            message: "msg".into(),
            author: "Humble Believer".into(),
            anonymous: false,
            secret_hash: "0".repeat(64),
            created_at: Utc::now(),
            reactions: reactions.iter().map(|(k, v)| (k.to_string(), *v)).collect::<BTreeMap<_, _>>(),
            responses: (0..responses)
                .map(|i| Response {
                    id: Uuid::new_v4(),
                    author: "x".into(),
                    text: format!("r{}", i),
                    created_at: Utc::now(),
                })
                .collect(),
        }
    }

    #[test]
    fn aggregate_fixture() {
        let posts = vec![
            post(Category::DuaRequest, &[], 1),
            post(Category::Healing, &[("🤲 Ameen", 1), ("✨ SubhanAllah", 1)], 0),
            post(Category::Family, &[("💪 Stay strong", 1)], 3),
        ];
        assert_eq!(
            aggregate(&posts),
            Aggregate {
                post_count: 3,
                response_count: 4,
                reaction_count: 3,
            }
        );
    }

    #[test]
    fn filter_all_and_exact() {
        let posts = vec![
            post(Category::Healing, &[], 0),
            post(Category::Family, &[], 0),
            post(Category::Healing, &[], 0),
        ];
        assert_eq!(filter_by_category(&posts, CategoryFilter::All).len(), 3);
        let healing = filter_by_category(&posts, CategoryFilter::Only(Category::Healing));
        assert_eq!(healing.len(), 2);
        assert!(healing.iter().all(|p| p.category == Category::Healing));
        assert!(filter_by_category(&posts, CategoryFilter::Only(Category::Gratitude)).is_empty());
    }

    #[test]
    fn filter_parses() {
        assert_eq!("All".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "gratitude".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Only(Category::Gratitude)
        );
        assert!("nope".parse::<CategoryFilter>().is_err());
    }

    #[test]
    fn snapshot_clears_state_of_deleted_posts() {
        let keep = post(Category::Family, &[], 0);
        let gone = post(Category::Hardship, &[], 0);
        let mut view = BoardView::new();
        assert!(!view.is_loaded());

        view.apply_snapshot(Snapshot::live(vec![keep.clone(), gone.clone()]));
        view.toggle_expanded(gone.id);
        view.set_draft(gone.id, "half-written");
        view.set_draft(keep.id, "kept");

        view.apply_snapshot(Snapshot::live(vec![keep.clone()]));
        assert_eq!(view.expanded(), None);
        assert_eq!(view.draft(gone.id), "");
        assert_eq!(view.draft(keep.id), "kept");
    }

    #[test]
    fn expansion_survives_unrelated_snapshots() {
        let a = post(Category::Family, &[], 0);
        let b = post(Category::Family, &[], 0);
        let mut view = BoardView::new();
        view.apply_snapshot(Snapshot::live(vec![a.clone(), b.clone()]));
        view.toggle_expanded(a.id);
        view.apply_snapshot(Snapshot::live(vec![a.clone()]));
        assert_eq!(view.expanded(), Some(a.id));
        view.toggle_expanded(a.id);
        assert_eq!(view.expanded(), None);
    }

    #[test]
    fn unavailable_snapshot_is_loaded_and_empty() {
        let mut view = BoardView::new();
        view.apply_snapshot(Snapshot::live(vec![post(Category::Family, &[], 0)]));
        view.apply_snapshot(Snapshot::unavailable());
        assert!(view.is_loaded());
        assert_eq!(view.status(), FeedStatus::Unavailable);
        assert!(view.posts().is_empty());
    }

    #[test]
    fn submitting_counts_overlapping_writes() {
        let mut view = BoardView::new();
        view.begin_write();
        view.begin_write();
        view.end_write();
        assert!(view.is_submitting());
        view.end_write();
        assert!(!view.is_submitting());
        // Unbalanced end is ignored
        view.end_write();
        assert!(!view.is_submitting());
    }

    #[test]
    fn relative_times() {
        let now = Utc::now();
        assert_eq!(time_ago(now - Duration::seconds(20), now), "just now");
        assert_eq!(time_ago(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(time_ago(now - Duration::minutes(130), now), "2h ago");
        assert_eq!(time_ago(now - Duration::hours(50), now), "2d ago");
    }

    #[test]
    fn anonymous_suffix() {
        let mut p = post(Category::Family, &[], 0);
        assert_eq!(display_author(&p), "Humble Believer");
        p.anonymous = true;
        assert_eq!(display_author(&p), "Humble Believer (anonymous)");
    }
}
