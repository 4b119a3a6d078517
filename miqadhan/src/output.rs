//! Interface de sortie audio
//!
//! Le lecteur ne touche jamais directement un périphérique : il demande à une
//! [`AudioOutput`] d'ouvrir une [`PlaybackSource`] et pilote le
//! [`PlayableHandle`] obtenu.

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use tokio::sync::oneshot;

/// Origine des données d'une session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSource {
    /// Copie locale complète issue du cache audio
    Cached(PathBuf),
    /// URL distante, lue en flux
    Network(String),
}

impl PlaybackSource {
    pub fn is_cached(&self) -> bool {
        matches!(self, PlaybackSource::Cached(_))
    }
}

impl fmt::Display for PlaybackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackSource::Cached(path) => write!(f, "{}", path.display()),
            PlaybackSource::Network(url) => f.write_str(url),
        }
    }
}

/// Ouvre des médias jouables sur un périphérique audio
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn open(&self, source: &PlaybackSource) -> Result<Box<dyn PlayableHandle>>;
}

/// Média ouvert
///
/// Le receiver renvoyé par [`PlayableHandle::play`] ne se résout en `Ok(())`
/// qu'à la fin naturelle du média. Libérer le handle détruit l'émetteur : le
/// receiver se résout alors en erreur.
pub trait PlayableHandle: Send {
    fn play(&mut self) -> Result<oneshot::Receiver<()>>;

    fn pause(&mut self);

    /// Retour au début
    fn rewind(&mut self);

    fn release(self: Box<Self>);
}
