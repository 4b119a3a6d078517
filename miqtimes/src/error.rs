//! Erreurs des horaires, du compte à rebours et des clients de service

/// Type Result pour les opérations de miqtimes
pub type Result<T> = std::result::Result<T, TimesError>;

#[derive(Debug, thiserror::Error)]
pub enum TimesError {
    /// Heure qui n'est pas au format `HH:MM`
    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    /// Échec de la requête HTTP
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Échec de l'analyse JSON
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Le service a répondu avec une erreur
    #[error("API error: {0}")]
    Api(String),

    /// Un horaire doit avoir au moins une entrée
    #[error("Prayer schedule is empty")]
    EmptySchedule,
}

impl TimesError {
    pub fn api_error(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }
}
