use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{BoardError, Result};

/// Shortest query worth sending.
pub const MIN_QUERY_CHARS: usize = 2;
const MAX_RESULTS: u8 = 8;
const PROVIDER: &str = "city search";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct City {
    pub name: String,
    pub state: String,
    pub country: String,
}

impl City {
    /// "Name, State, Country" with empty parts left out.
    pub fn display(&self) -> String {
        [&self.name, &self.state, &self.country]
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// What gets handed to the prayer-time lookup.
    pub fn query_name(&self) -> String {
        if self.country.is_empty() {
            self.name.clone()
        } else {
            format!("{}, {}", self.name, self.country)
        }
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn search_cities(&self, query: &str) -> Result<Vec<City>>;
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    name: String,
    #[serde(default)]
    admin1: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

/// Parse a search reply, dropping entries that display identically.
pub fn parse_search_response(body: &str) -> Result<Vec<City>> {
    let resp: SearchResponse =
        serde_json::from_str(body).map_err(|e| BoardError::Unavailable(format!("{} ({})", PROVIDER, e)))?;

    let mut seen = HashSet::new();
    Ok(resp
        .results
        .into_iter()
        .map(|hit| City {
            name: hit.name,
            state: hit.admin1.unwrap_or_default(),
            country: hit.country.unwrap_or_default(),
        })
        .filter(|city| seen.insert(city.display()))
        .collect())
}

/// Client for the open-meteo.com geocoding API.
#[derive(Clone)]
pub struct OpenMeteoGeocoder {
    http: reqwest::Client,
    base_url: String,
}

impl OpenMeteoGeocoder {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self, query: &str) -> Result<Url> {
        let count = MAX_RESULTS.to_string();
        Url::parse_with_params(
            &format!("{}/search", self.base_url),
            &[
                ("name", query),
                ("count", count.as_str()),
                ("language", "en"),
                ("format", "json"),
            ],
        )
        .map_err(|e| BoardError::Unavailable(format!("{} (bad url: {})", PROVIDER, e)))
    }
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    async fn search_cities(&self, query: &str) -> Result<Vec<City>> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Ok(Vec::new());
        }

        let url = self.search_url(query)?;
        debug!("GET {}", url);
        let body = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!("City search failed: {}", e);
                BoardError::Unavailable(PROVIDER.into())
            })?
            .text()
            .await
            .map_err(|_| BoardError::Unavailable(PROVIDER.into()))?;
        parse_search_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedups_by_display() {
        let body = r#"{"results": [
            {"name": "Medina", "admin1": "Al Madinah", "country": "Saudi Arabia", "latitude": 24.47},
            {"name": "Medina", "admin1": "Al Madinah", "country": "Saudi Arabia", "latitude": 24.5},
            {"name": "Medina", "admin1": "Ohio", "country": "United States"},
            {"name": "Medina"}
        ]}"#;
        let cities = parse_search_response(body).unwrap();
        let shown: Vec<String> = cities.iter().map(City::display).collect();
        assert_eq!(
            shown,
            vec!["Medina, Al Madinah, Saudi Arabia", "Medina, Ohio, United States", "Medina"]
        );
        assert_eq!(cities[0].query_name(), "Medina, Saudi Arabia");
        assert_eq!(cities[2].query_name(), "Medina");
    }

    #[test]
    fn no_results_key_is_empty() {
        assert!(parse_search_response(r#"{"generationtime_ms": 0.4}"#).unwrap().is_empty());
    }

    #[tokio::test]
    async fn short_query_skips_request() {
        // Unroutable base: any request would fail
        let geocoder = OpenMeteoGeocoder::new("http://127.0.0.1:9");
        assert!(geocoder.search_cities(" K ").await.unwrap().is_empty());
    }

    #[test]
    fn search_url_encodes_query() {
        let geocoder = OpenMeteoGeocoder::new("https://geocoding-api.open-meteo.com/v1");
        let url = geocoder.search_url("São Paulo").unwrap();
        assert!(url.as_str().starts_with("https://geocoding-api.open-meteo.com/v1/search?name=S%C3%A3o+Paulo"));
        assert!(url.as_str().ends_with("count=8&language=en&format=json"));
    }
}
