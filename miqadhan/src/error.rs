//! Erreurs de lecture de l'adhan

use miqcache::CacheError;

/// Type Result pour les opérations de miqadhan
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// Aucune voix de ce nom dans le catalogue
    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    /// Échec du cache pendant le téléchargement d'une voix
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// La sortie n'a pas pu ouvrir la source (fichier absent, format...)
    #[error("Cannot open audio source {source_name}: {reason}")]
    Open { source_name: String, reason: String },

    /// Source ouverte, mais la lecture a été refusée
    #[error("Playback could not start: {0}")]
    Start(String),

    /// Pas de périphérique audio
    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),

    /// Un `stop` ou un `start` plus récent est arrivé pendant l'ouverture
    #[error("Playback request was superseded before it started")]
    Superseded,
}

impl PlaybackError {
    pub fn open(source: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::Open {
            source_name: source.to_string(),
            reason: reason.into(),
        }
    }
}
