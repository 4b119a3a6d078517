//! Horaires quotidiens depuis le service web Aladhan
//!
//! Le fournisseur est un trait : le reste de l'application, et ses tests, ne
//! dépendent jamais du réseau. [`ScheduleCache`] mémorise les réponses par
//! (date, position, paramètres de calcul).

use crate::error::{Result, TimesError};
use crate::schedule::{Prayer, PrayerEntry, PrayerSchedule, PrayerTime};
use async_trait::async_trait;
use chrono::NaiveDate;
use miqqiblah::Coordinates;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// URL de base par défaut de l'API Aladhan
pub const DEFAULT_ALADHAN_URL: &str = "https://api.aladhan.com/v1";

/// Timeout par défaut des requêtes HTTP (30 secondes)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// User-Agent par défaut
pub const DEFAULT_USER_AGENT: &str = concat!("Miqat/", env!("CARGO_PKG_VERSION"));

/// Méthode « custom » d'Aladhan, requise pour des angles personnalisés
const CUSTOM_METHOD: u8 = 99;

/// Nom affiché quand le fuseau ne contient pas de ville
pub const FALLBACK_LOCATION_NAME: &str = "Local Area";

/// Paramètres d'une requête d'horaires
#[derive(Debug, Clone, PartialEq)]
pub struct TimesQuery {
    pub coordinates: Coordinates,
    pub date: NaiveDate,
    /// Identifiant de méthode de calcul Aladhan
    pub method: u8,
    /// 0 = Shafi, 1 = Hanafi
    pub school: u8,
    pub fajr_angle: Option<f64>,
    pub isha_angle: Option<f64>,
}

impl TimesQuery {
    pub fn new(coordinates: Coordinates, date: NaiveDate) -> Self {
        Self {
            coordinates,
            date,
            method: 2,
            school: 0,
            fajr_angle: None,
            isha_angle: None,
        }
    }

    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("latitude", self.coordinates.latitude.to_string()),
            ("longitude", self.coordinates.longitude.to_string()),
            ("school", self.school.to_string()),
        ];

        if self.fajr_angle.is_some() || self.isha_angle.is_some() {
            let angle = |a: Option<f64>| a.map_or_else(|| "null".to_string(), |a| a.to_string());
            pairs.push(("method", CUSTOM_METHOD.to_string()));
            pairs.push((
                "methodSettings",
                format!("{},null,{}", angle(self.fajr_angle), angle(self.isha_angle)),
            ));
        } else {
            pairs.push(("method", self.method.to_string()));
        }
        pairs
    }
}

/// Tout ce qu'il faut afficher pour une journée
#[derive(Debug, Clone, PartialEq)]
pub struct DailyTimes {
    pub schedule: PrayerSchedule,
    /// par ex. `1 Ramadan 1445 AH`
    pub hijri_date: String,
    pub hijri_arabic: String,
    /// Fuseau IANA renvoyé par le service
    pub timezone: String,
    /// Partie « ville » du fuseau
    pub location_name: String,
}

/// Source des horaires quotidiens
#[async_trait]
pub trait PrayerTimesProvider: Send + Sync {
    async fn daily_times(&self, query: &TimesQuery) -> Result<DailyTimes>;
}

/// `Europe/New_York` -> `New York`
pub fn location_name_from_timezone(timezone: &str) -> String {
    timezone
        .split('/')
        .nth(1)
        .filter(|city| !city.is_empty())
        .map(|city| city.replace('_', " "))
        .unwrap_or_else(|| FALLBACK_LOCATION_NAME.to_string())
}

#[derive(Debug, Deserialize)]
struct AladhanResponse {
    code: u16,
    #[serde(default)]
    status: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AladhanDay {
    timings: HashMap<String, String>,
    date: AladhanDate,
    meta: AladhanMeta,
}

#[derive(Debug, Deserialize)]
struct AladhanDate {
    hijri: Hijri,
}

#[derive(Debug, Deserialize)]
struct Hijri {
    day: String,
    month: HijriMonth,
    year: String,
}

#[derive(Debug, Deserialize)]
struct HijriMonth {
    en: String,
    ar: String,
}

#[derive(Debug, Deserialize)]
struct AladhanMeta {
    #[serde(default)]
    timezone: String,
}

/// Analyse le corps JSON d'une réponse `/timings`
pub fn parse_aladhan_response(body: &str) -> Result<DailyTimes> {
    let response: AladhanResponse = serde_json::from_str(body)?;
    if response.code != 200 {
        let detail = response
            .data
            .as_str()
            .map(str::to_string)
            .unwrap_or(response.status);
        return Err(TimesError::api_error(format!("code {}: {}", response.code, detail)));
    }

    let day: AladhanDay = serde_json::from_value(response.data)?;

    let entries = Prayer::ALL
        .iter()
        .map(|prayer| {
            let raw = day.timings.get(prayer.as_str()).ok_or_else(|| {
                TimesError::api_error(format!("missing timing for {}", prayer))
            })?;
            Ok(PrayerEntry::new(prayer.as_str(), PrayerTime::parse(raw)?))
        })
        .collect::<Result<Vec<_>>>()?;

    let hijri = &day.date.hijri;
    Ok(DailyTimes {
        schedule: PrayerSchedule::new(entries)?,
        hijri_date: format!("{} {} {} AH", hijri.day, hijri.month.en, hijri.year),
        hijri_arabic: format!("{} {} {}", hijri.day, hijri.month.ar, hijri.year),
        location_name: location_name_from_timezone(&day.meta.timezone),
        timezone: day.meta.timezone,
    })
}

/// Client HTTP pour <https://aladhan.com/prayer-times-api>
#[derive(Debug, Clone)]
pub struct AladhanClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl AladhanClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Crée un client à partir d'un reqwest::Client existant
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_ALADHAN_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PrayerTimesProvider for AladhanClient {
    async fn daily_times(&self, query: &TimesQuery) -> Result<DailyTimes> {
        let url = format!("{}/timings/{}", self.base_url, query.date.format("%d-%m-%Y"));
        tracing::debug!(url = %url, method = query.method, school = query.school, "Fetching prayer times");

        let response = self
            .client
            .get(&url)
            .query(&query.query_pairs())
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TimesError::api_error(format!(
                "API returned status: {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        let times = parse_aladhan_response(&body)?;
        tracing::info!(
            date = %query.date,
            location = %times.location_name,
            "Prayer times received"
        );
        Ok(times)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ScheduleKey {
    date: NaiveDate,
    // 1e-4 degré, soit environ 11 m
    lat_e4: i64,
    lng_e4: i64,
    method: u8,
    school: u8,
    fajr_bits: Option<u64>,
    isha_bits: Option<u64>,
}

impl From<&TimesQuery> for ScheduleKey {
    fn from(q: &TimesQuery) -> Self {
        Self {
            date: q.date,
            lat_e4: (q.coordinates.latitude * 1e4).round() as i64,
            lng_e4: (q.coordinates.longitude * 1e4).round() as i64,
            method: q.method,
            school: q.school,
            fajr_bits: q.fajr_angle.map(f64::to_bits),
            isha_bits: q.isha_angle.map(f64::to_bits),
        }
    }
}

/// Enveloppe qui répond de mémoire aux requêtes répétées
pub struct ScheduleCache<P> {
    inner: P,
    entries: Mutex<HashMap<ScheduleKey, DailyTimes>>,
}

impl<P: PrayerTimesProvider> ScheduleCache<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Oublie les jours autres que `keep`
    pub fn retain_date(&self, keep: NaiveDate) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|k, _| k.date == keep);
        }
    }
}

#[async_trait]
impl<P: PrayerTimesProvider> PrayerTimesProvider for ScheduleCache<P> {
    async fn daily_times(&self, query: &TimesQuery) -> Result<DailyTimes> {
        let key = ScheduleKey::from(query);
        if let Some(hit) = self.entries.lock().ok().and_then(|e| e.get(&key).cloned()) {
            tracing::debug!(date = %query.date, "Prayer times served from memory");
            return Ok(hit);
        }

        let times = self.inner.daily_times(query).await?;
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, times.clone());
        }
        Ok(times)
    }
}
