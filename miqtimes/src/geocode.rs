//! Recherche d'adresse pour la position manuelle (OpenStreetMap Nominatim)

use crate::error::{Result, TimesError};
use crate::provider::{DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use async_trait::async_trait;
use miqqiblah::Coordinates;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// URL de base par défaut de Nominatim
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Adresse résolue
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub display_name: String,
    pub coordinates: Coordinates,
}

/// Adresse libre vers coordonnées
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` si rien ne correspond
    async fn geocode(&self, address: &str) -> Result<Option<Place>>;
}

#[derive(Debug, Deserialize)]
struct NominatimHit {
    display_name: String,
    lat: String,
    lon: String,
}

/// Premier résultat exploitable d'une réponse `/search?format=json`
///
/// Tout ce qui ne s'analyse pas équivaut à « introuvable ».
pub fn parse_nominatim_response(body: &str) -> Option<Place> {
    let hits: Vec<NominatimHit> = match serde_json::from_str(body) {
        Ok(hits) => hits,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed geocoding response");
            return None;
        }
    };

    let hit = hits.into_iter().next()?;
    let coordinates = Coordinates::new(hit.lat.trim().parse().ok()?, hit.lon.trim().parse().ok()?);
    coordinates.is_valid().then_some(Place {
        display_name: hit.display_name,
        coordinates,
    })
}

#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl NominatimClient {
    pub fn new() -> Result<Self> {
        // la politique d'usage de Nominatim exige un User-Agent identifiable
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_NOMINATIM_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn geocode(&self, address: &str) -> Result<Option<Place>> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(None);
        }

        tracing::debug!(address = %address, "Geocoding");
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("format", "json"), ("q", address)])
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TimesError::api_error(format!(
                "Geocoder returned status: {}",
                response.status()
            )));
        }

        let place = parse_nominatim_response(&response.text().await?);
        match &place {
            Some(p) => tracing::info!(address = %address, found = %p.display_name, "Location resolved"),
            None => tracing::info!(address = %address, "Location not found"),
        }
        Ok(place)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_hit_wins() {
        let body = r#"[
            {"display_name": "London, Greater London, England", "lat": "51.5073219", "lon": "-0.1276474"},
            {"display_name": "London, Ontario, Canada", "lat": "42.98", "lon": "-81.24"}
        ]"#;
        let place = parse_nominatim_response(body).unwrap();
        assert!(place.display_name.starts_with("London, Greater London"));
        assert!((place.coordinates.latitude - 51.5073219).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_is_not_found() {
        assert!(parse_nominatim_response("[]").is_none());
        assert!(parse_nominatim_response("<html>rate limited</html>").is_none());
        assert!(parse_nominatim_response(r#"[{"display_name": "x", "lat": "north", "lon": "0"}]"#).is_none());
        assert!(parse_nominatim_response(r#"[{"display_name": "x", "lat": "200", "lon": "0"}]"#).is_none());
    }
}
