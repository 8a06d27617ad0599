use reqwest::Url;

use sakina_types::models::Post;

use crate::config::DEFAULT_SHARE_SITE;
use crate::error::{BoardError, Result};

/// Plain-text rendering of a post for sharing outside the board.
pub fn format_share_text(post: &Post) -> String {
    format_share_text_for(post, DEFAULT_SHARE_SITE)
}

pub fn format_share_text_for(post: &Post, site: &str) -> String {
    format!(
        "🤲 {} · from the Community Prayer Board\n\n\"{}\"\n\nJoin us at {}",
        post.category, post.message, site
    )
}

/// Prefilled share intents for the common messengers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinks {
    pub whatsapp: Url,
    pub twitter: Url,
    pub telegram: Url,
}

pub fn share_links(post: &Post, site: &str) -> Result<ShareLinks> {
    let text = format_share_text_for(post, site);
    let site_url = if site.contains("://") {
        site.to_string()
    } else {
        format!("https://{}", site)
    };

    let build = |base: &str, params: &[(&str, &str)]| {
        Url::parse_with_params(base, params).map_err(|e| BoardError::validation(format!("bad share link: {}", e)))
    };

    Ok(ShareLinks {
        whatsapp: build("https://wa.me/", &[("text", &text)])?,
        twitter: build("https://twitter.com/intent/tweet", &[("text", &text)])?,
        telegram: build("https://t.me/share/url", &[("url", &site_url), ("text", &text)])?,
    })
}
