//! Catalogue des voix d'adhan

use crate::error::{PlaybackError, Result};
use miqcache::{AudioStore, DownloadReport};
use serde::{Deserialize, Serialize};

/// Jeu d'enregistrements d'un muezzin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdhanVoice {
    pub id: String,
    pub name: String,
    pub url: String,
    /// Enregistrement dédié à Fajr, quand la voix en a un
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fajr_url: Option<String>,
}

impl AdhanVoice {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            fajr_url: None,
        }
    }

    pub fn with_fajr_url(mut self, url: impl Into<String>) -> Self {
        self.fajr_url = Some(url.into());
        self
    }

    /// Enregistrement à jouer pour `prayer`
    pub fn url_for(&self, prayer: &str) -> &str {
        match &self.fajr_url {
            Some(fajr) if prayer.eq_ignore_ascii_case("fajr") => fajr,
            _ => &self.url,
        }
    }
}

pub fn find_voice<'a>(voices: &'a [AdhanVoice], id: &str) -> Result<&'a AdhanVoice> {
    voices
        .iter()
        .find(|v| v.id == id)
        .ok_or_else(|| PlaybackError::VoiceNotFound(id.to_string()))
}

/// Stocke les enregistrements de la voix `id` pour une lecture hors-ligne
///
/// L'enregistrement principal doit réussir ; la variante Fajr est facultative.
pub async fn download_voice(
    store: &AudioStore,
    voices: &[AdhanVoice],
    id: &str,
) -> Result<DownloadReport> {
    let voice = find_voice(voices, id)?;
    tracing::info!(voice = %voice.id, "Downloading adhan voice");
    Ok(store
        .download_set(&voice.url, voice.fajr_url.as_deref())
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_prefers_fajr_variant() {
        let voice = AdhanVoice::new("makkah", "Makkah", "https://a/regular.mp3")
            .with_fajr_url("https://a/fajr.mp3");
        assert_eq!(voice.url_for("Fajr"), "https://a/fajr.mp3");
        assert_eq!(voice.url_for("Isha"), "https://a/regular.mp3");

        let plain = AdhanVoice::new("alaqsa", "Al-Aqsa", "https://a/aqsa.mp3");
        assert_eq!(plain.url_for("fajr"), "https://a/aqsa.mp3");
    }

    #[tokio::test]
    async fn test_unknown_voice() {
        let store = AudioStore::unavailable();
        let err = download_voice(&store, &[], "nope").await.unwrap_err();
        assert!(matches!(err, PlaybackError::VoiceNotFound(id) if id == "nope"));
    }
}
