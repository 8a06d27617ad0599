//! Daily prayer times from an external provider.
//!
//! The board never depends on this module; a provider failure surfaces as
//! [`BoardError::Unavailable`] and nothing else is affected.

use std::fmt;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{BoardError, Result};

/// Calculation method id sent to the provider (ISNA).
pub const CALCULATION_METHOD: u8 = 2;

const PROVIDER: &str = "prayer times";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prayer {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    pub const ALL: [Prayer; 6] = [
        Prayer::Fajr,
        Prayer::Sunrise,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    /// The five prayers that get reminders. Sunrise is informational.
    pub const NOTIFIED: [Prayer; 5] = [Prayer::Fajr, Prayer::Dhuhr, Prayer::Asr, Prayer::Maghrib, Prayer::Isha];

    pub fn name(self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Sunrise => "Sunrise",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
        }
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One day's times, local to the looked-up place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrayerTimes {
    pub fajr: NaiveTime,
    pub sunrise: NaiveTime,
    pub dhuhr: NaiveTime,
    pub asr: NaiveTime,
    pub maghrib: NaiveTime,
    pub isha: NaiveTime,
}

impl PrayerTimes {
    pub fn get(&self, prayer: Prayer) -> NaiveTime {
        match prayer {
            Prayer::Fajr => self.fajr,
            Prayer::Sunrise => self.sunrise,
            Prayer::Dhuhr => self.dhuhr,
            Prayer::Asr => self.asr,
            Prayer::Maghrib => self.maghrib,
            Prayer::Isha => self.isha,
        }
    }

    /// The next notified prayer after `now` and the whole minutes until it.
    /// After Isha this wraps to Fajr with no countdown.
    pub fn next_after(&self, now: NaiveTime) -> (Prayer, Option<i64>) {
        Prayer::NOTIFIED
            .iter()
            .map(|&p| (p, (self.get(p) - now).num_minutes()))
            .find(|(_, mins)| *mins > 0)
            .map(|(p, mins)| (p, Some(mins)))
            .unwrap_or((Prayer::Fajr, None))
    }
}

/// Times plus the provider's label for where they apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTimes {
    pub times: PrayerTimes,
    pub location: String,
}

/// "17:05" as "5:05 PM".
pub fn format_12h(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

#[async_trait]
pub trait PrayerTimeProvider: Send + Sync {
    async fn times_by_coordinates(&self, lat: f64, lng: f64) -> Result<DailyTimes>;
    async fn times_by_city(&self, city: &str) -> Result<DailyTimes>;
}

#[derive(Deserialize)]
struct TimingsEnvelope {
    code: u16,
    data: Option<TimingsData>,
}

#[derive(Deserialize)]
struct TimingsData {
    timings: RawTimings,
    meta: Option<TimingsMeta>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawTimings {
    fajr: String,
    sunrise: String,
    dhuhr: String,
    asr: String,
    maghrib: String,
    isha: String,
}

#[derive(Deserialize)]
struct TimingsMeta {
    timezone: Option<String>,
}

fn parse_clock(prayer: Prayer, raw: &str) -> Result<NaiveTime> {
    // Some responses append a zone, e.g. "05:12 (EET)"
    let clock = raw.split_whitespace().next().unwrap_or("");
    NaiveTime::parse_from_str(clock, "%H:%M")
        .map_err(|_| BoardError::Unavailable(format!("{} ({} time '{}' is not HH:MM)", PROVIDER, prayer, raw)))
}

/// Parse a provider reply. Returns the times and the provider's timezone
/// label, if any.
pub fn parse_timings_response(body: &str) -> Result<(PrayerTimes, Option<String>)> {
    let envelope: TimingsEnvelope =
        serde_json::from_str(body).map_err(|e| BoardError::Unavailable(format!("{} ({})", PROVIDER, e)))?;
    if envelope.code != 200 {
        return Err(BoardError::Unavailable(format!("{} (provider code {})", PROVIDER, envelope.code)));
    }
    let data = envelope
        .data
        .ok_or_else(|| BoardError::Unavailable(format!("{} (no data)", PROVIDER)))?;

    let t = &data.timings;
    let times = PrayerTimes {
        fajr: parse_clock(Prayer::Fajr, &t.fajr)?,
        sunrise: parse_clock(Prayer::Sunrise, &t.sunrise)?,
        dhuhr: parse_clock(Prayer::Dhuhr, &t.dhuhr)?,
        asr: parse_clock(Prayer::Asr, &t.asr)?,
        maghrib: parse_clock(Prayer::Maghrib, &t.maghrib)?,
        isha: parse_clock(Prayer::Isha, &t.isha)?,
    };
    let timezone = data.meta.and_then(|m| m.timezone).filter(|tz| !tz.is_empty());
    Ok((times, timezone))
}

/// Client for the aladhan.com timings API.
#[derive(Clone)]
pub struct AladhanClient {
    http: reqwest::Client,
    base_url: String,
}

impl AladhanClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str, date: NaiveDate, params: &[(&str, String)]) -> Result<Url> {
        let method = CALCULATION_METHOD.to_string();
        let mut pairs: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        pairs.push(("method", method.as_str()));
        Url::parse_with_params(
            &format!("{}/{}/{}", self.base_url, path, date.format("%d-%m-%Y")),
            &pairs,
        )
        .map_err(|e| BoardError::Unavailable(format!("{} (bad url: {})", PROVIDER, e)))
    }

    async fn fetch(&self, url: Url) -> Result<(PrayerTimes, Option<String>)> {
        debug!("GET {}", url);
        let body = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!("Prayer time request failed: {}", e);
                BoardError::Unavailable(PROVIDER.into())
            })?
            .text()
            .await
            .map_err(|_| BoardError::Unavailable(PROVIDER.into()))?;
        parse_timings_response(&body)
    }
}

#[async_trait]
impl PrayerTimeProvider for AladhanClient {
    async fn times_by_coordinates(&self, lat: f64, lng: f64) -> Result<DailyTimes> {
        let today = Utc::now().date_naive();
        let url = self.url(
            "timings",
            today,
            &[("latitude", lat.to_string()), ("longitude", lng.to_string())],
        )?;
        let (times, timezone) = self.fetch(url).await?;
        Ok(DailyTimes {
            times,
            location: timezone.unwrap_or_else(|| "Your Location".into()),
        })
    }

    async fn times_by_city(&self, city: &str) -> Result<DailyTimes> {
        let city = city.trim();
        if city.is_empty() {
            return Err(BoardError::validation("city must not be empty"));
        }
        let today = Utc::now().date_naive();
        let url = self.url(
            "timingsByCity",
            today,
            &[("city", city.to_string()), ("country", String::new())],
        )?;
        let (times, _) = self.fetch(url).await?;
        Ok(DailyTimes {
            times,
            location: city.to_string(),
        })
    }
}
