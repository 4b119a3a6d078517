//! Téléchargement des contenus audio
//!
//! Le cache ne parle jamais directement au réseau : il délègue à un
//! [`Fetcher`], ce qui permet de remplacer le client HTTP par une source
//! en mémoire dans les tests.

use crate::error::{CacheError, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Timeout global d'un téléchargement
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Source capable d'écrire le contenu d'une URL dans un fichier
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Télécharge `url` dans `dest` et retourne le nombre d'octets écrits
    ///
    /// `dest` est écrasé s'il existe. Un contenu vide est une erreur.
    async fn fetch_to(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Fetcher HTTP(S) basé sur reqwest
///
/// Accepte aussi les URLs `file://`, copiées depuis le disque local.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    /// Utilise un client reqwest existant (pool de connexions partagé, proxy...)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch_http(&self, url: &str, dest: &Path) -> Result<u64> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(CacheError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut total = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            total += chunk.len() as u64;
        }

        file.flush().await?;
        Ok(total)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_to(&self, url: &str, dest: &Path) -> Result<u64> {
        let written = if let Some(local) = url.strip_prefix("file://") {
            tokio::fs::copy(local, dest).await?
        } else if url.starts_with("http://") || url.starts_with("https://") {
            self.fetch_http(url, dest).await?
        } else {
            return Err(CacheError::UnsupportedUrl(url.to_string()));
        };

        if written == 0 {
            return Err(CacheError::EmptyPayload(url.to_string()));
        }
        Ok(written)
    }
}

/// Génère une clé à partir de l'URL (hash SHA1 en hexadécimal)
///
/// ```
/// let pk = miqcache::pk_from_url("https://example.com/azan.mp3");
/// assert_eq!(pk.len(), 40);
/// ```
pub fn pk_from_url(url: &str) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Nom du fichier stockant le contenu d'une URL : `{pk}.{ext}`
///
/// L'extension est reprise de l'URL quand elle est courte et alphanumérique
/// (indice utile pour le décodeur), `bin` sinon.
pub fn file_name_for_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.rsplit('/').next().unwrap_or("");
    let ext = match last.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => "bin".to_string(),
    };
    format!("{}.{}", pk_from_url(url), ext)
}
