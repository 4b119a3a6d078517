//! # miqadhan - Lecture de l'adhan
//!
//! Lecture « une seule à la fois » d'un enregistrement d'adhan, depuis le
//! cache audio quand il est présent, sinon depuis le réseau.
//!
//! ## Architecture
//!
//! ```text
//! miqadhan
//!     ├── style.rs        - AdhanStyle (arrêt automatique à 15 s / 30 s)
//!     ├── voice.rs        - Catalogue des voix, téléchargement hors-ligne
//!     ├── output.rs       - Traits AudioOutput / PlayableHandle
//!     ├── player.rs       - AdhanPlayer : session unique
//!     └── rodio_output.rs - Sortie audio réelle (feature `rodio`)
//! ```
//!
//! ## Utilisation
//!
//! ```rust,ignore
//! use miqadhan::{AdhanPlayer, AdhanStyle, RodioOutput};
//! use miqcache::AudioStore;
//! use std::sync::Arc;
//!
//! let player = AdhanPlayer::new(AudioStore::unavailable(), Arc::new(RodioOutput::new()));
//! player.start("https://example.com/adhan.mp3", AdhanStyle::Short, None).await?;
//! ```

pub mod error;
pub mod output;
pub mod player;
pub mod style;
pub mod voice;

#[cfg(feature = "rodio")]
pub mod rodio_output;

#[cfg(feature = "miqconfig")]
pub mod config_ext;

pub use error::{PlaybackError, Result};
pub use output::{AudioOutput, PlayableHandle, PlaybackSource};
pub use player::{AdhanPlayer, OnEnded, SessionId, StopReason};
pub use style::AdhanStyle;
pub use voice::{download_voice, find_voice, AdhanVoice};

#[cfg(feature = "rodio")]
pub use rodio_output::RodioOutput;

#[cfg(feature = "miqconfig")]
pub use config_ext::{AdhanConfigExt, ALERT_PRAYERS};
