//! Types d'erreur du cache audio

/// Type Result pour les opérations du cache
pub type Result<T> = std::result::Result<T, CacheError>;

/// Erreurs du cache audio
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Aucun stockage persistant derrière ce store
    #[error("Audio cache is not available")]
    Unavailable,

    /// Échec de la requête HTTP
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Le serveur a répondu avec un statut d'erreur
    #[error("HTTP error {status} for {url}")]
    Status { url: String, status: u16 },

    /// Réponse sans contenu
    #[error("Empty payload for {0}")]
    EmptyPayload(String),

    /// Schéma d'URL non pris en charge par le fetcher
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    /// Aucune entrée pour cette URL
    #[error("Not cached: {0}")]
    NotCached(String),

    /// Erreur SQLite
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Erreur d'entrée/sortie
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache database lock poisoned")]
    LockPoisoned,
}
