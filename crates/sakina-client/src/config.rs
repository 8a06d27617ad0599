use std::path::PathBuf;

/// Default board store address.
pub const DEFAULT_BOARD_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_PROFILE_PATH: &str = "sakina-profile.json";
pub const DEFAULT_PRAYER_API: &str = "https://api.aladhan.com/v1";
pub const DEFAULT_GEOCODE_API: &str = "https://geocoding-api.open-meteo.com/v1";
pub const DEFAULT_SHARE_SITE: &str = "sakina.community";

/// Client configuration, read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub board_url: String,
    pub profile_path: PathBuf,
    pub prayer_api: String,
    pub geocode_api: String,
    pub share_site: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            board_url: get("SAKINA_BOARD_URL", DEFAULT_BOARD_URL),
            profile_path: get("SAKINA_PROFILE_PATH", DEFAULT_PROFILE_PATH).into(),
            prayer_api: get("SAKINA_PRAYER_API", DEFAULT_PRAYER_API),
            geocode_api: get("SAKINA_GEOCODE_API", DEFAULT_GEOCODE_API),
            share_site: get("SAKINA_SHARE_SITE", DEFAULT_SHARE_SITE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_fall_back() {
        let config = ClientConfig::from_lookup(|k| match k {
            "SAKINA_BOARD_URL" => Some("https://board.example.org".into()),
            "SAKINA_SHARE_SITE" => Some("   ".into()),
            _ => None,
        });
        assert_eq!(config.board_url, "https://board.example.org");
        assert_eq!(config.share_site, DEFAULT_SHARE_SITE);
        assert_eq!(config.profile_path, PathBuf::from(DEFAULT_PROFILE_PATH));
    }
}
