//! Façade du cache audio tolérant l'absence de stockage persistant
//!
//! Quand aucun cache n'a pu être ouvert, [`AudioStore::unavailable`] se
//! comporte comme un cache toujours vide : `has` répond `false` et la lecture
//! se fait directement depuis le réseau. Seul `put` signale l'absence.

use crate::cache::AudioCache;
use crate::error::{CacheError, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Issue du stockage de la variante secondaire d'un jeu de contenus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecondaryOutcome {
    Stored(PathBuf),
    /// Même URL que le contenu principal, rien à faire
    SameAsPrimary,
    /// Échec journalisé, sans effet sur le résultat global
    Failed(String),
}

/// Résultat de [`AudioStore::download_set`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub primary: PathBuf,
    pub secondary: Option<SecondaryOutcome>,
}

/// Point d'accès partagé au cache audio
#[derive(Clone, Default)]
pub struct AudioStore {
    cache: Option<Arc<AudioCache>>,
}

impl AudioStore {
    pub fn new(cache: Arc<AudioCache>) -> Self {
        Self { cache: Some(cache) }
    }

    /// Store sans stockage persistant
    pub fn unavailable() -> Self {
        Self { cache: None }
    }

    pub fn is_available(&self) -> bool {
        self.cache.is_some()
    }

    pub fn cache(&self) -> Option<&Arc<AudioCache>> {
        self.cache.as_ref()
    }

    /// Indique si un contenu est stocké pour `url`
    ///
    /// Ne retourne jamais d'erreur : un stockage absent ou en échec
    /// équivaut à « pas en cache ».
    pub async fn has(&self, url: &str) -> bool {
        let Some(cache) = &self.cache else {
            return false;
        };
        match cache.has(url).await {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Cache check failed");
                false
            }
        }
    }

    /// Télécharge et stocke durablement le contenu de `url`
    pub async fn put(&self, url: &str) -> Result<PathBuf> {
        match &self.cache {
            Some(cache) => cache.put(url).await,
            None => Err(CacheError::Unavailable),
        }
    }

    /// Chemin local du contenu de `url` s'il est stocké
    pub async fn cached_path(&self, url: &str) -> Option<PathBuf> {
        let cache = self.cache.as_ref()?;
        match cache.get_path(url).await {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Cache lookup failed");
                None
            }
        }
    }

    /// Stocke un contenu principal et, au mieux, sa variante secondaire
    ///
    /// L'échec du principal est propagé. La variante secondaire n'est
    /// téléchargée que si elle diffère du principal, et son échec est
    /// seulement journalisé.
    pub async fn download_set(
        &self,
        primary_url: &str,
        secondary_url: Option<&str>,
    ) -> Result<DownloadReport> {
        let primary = self.put(primary_url).await?;

        let secondary = match secondary_url {
            None => None,
            Some(url) if url == primary_url => Some(SecondaryOutcome::SameAsPrimary),
            Some(url) => Some(match self.put(url).await {
                Ok(path) => SecondaryOutcome::Stored(path),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Optional audio variant not cached, ignoring");
                    SecondaryOutcome::Failed(e.to_string())
                }
            }),
        };

        Ok(DownloadReport { primary, secondary })
    }
}
