//! Extension pour intégrer le cache audio dans miqconfig
//!
//! Ce module fournit le trait `AudioCacheConfigExt` qui ajoute à
//! `miqconfig::Config` les réglages du cache et une factory de [`AudioStore`].

use crate::cache::AudioCache;
use crate::store::AudioStore;
use anyhow::Result;
use miqconfig::Config;
use serde_yaml::Value;
use std::sync::Arc;

const CACHE_DIR_PATH: &[&str] = &["host", "audio_cache", "directory"];
const CACHE_ENABLED_PATH: &[&str] = &["host", "audio_cache", "enabled"];
const DEFAULT_CACHE_DIR: &str = "cache_audio";

/// Trait d'extension pour gérer le cache audio depuis la configuration
///
/// ```rust,no_run
/// use miqconfig::get_config;
/// use miqcache::AudioCacheConfigExt;
///
/// let store = get_config().create_audio_store();
/// println!("cache available: {}", store.is_available());
/// ```
pub trait AudioCacheConfigExt {
    /// Répertoire du cache (absolu, créé si besoin)
    fn get_audio_cache_dir(&self) -> Result<String>;

    /// Définit le répertoire du cache (absolu ou relatif au config_dir)
    fn set_audio_cache_dir(&self, directory: String) -> Result<()>;

    /// Indique si le cache persistant est activé (défaut : `true`)
    fn get_audio_cache_enabled(&self) -> Result<bool>;

    fn set_audio_cache_enabled(&self, enabled: bool) -> Result<()>;

    /// Crée le store configuré
    ///
    /// Un cache désactivé ou impossible à ouvrir donne un store
    /// indisponible : la lecture se fera depuis le réseau.
    fn create_audio_store(&self) -> AudioStore;
}

impl AudioCacheConfigExt for Config {
    fn get_audio_cache_dir(&self) -> Result<String> {
        self.get_managed_dir(CACHE_DIR_PATH, DEFAULT_CACHE_DIR)
    }

    fn set_audio_cache_dir(&self, directory: String) -> Result<()> {
        self.set_managed_dir(CACHE_DIR_PATH, directory)
    }

    fn get_audio_cache_enabled(&self) -> Result<bool> {
        match self.get_value(CACHE_ENABLED_PATH) {
            Ok(Value::Bool(b)) => Ok(b),
            _ => Ok(true),
        }
    }

    fn set_audio_cache_enabled(&self, enabled: bool) -> Result<()> {
        self.set_value(CACHE_ENABLED_PATH, Value::Bool(enabled))
    }

    fn create_audio_store(&self) -> AudioStore {
        if !self.get_audio_cache_enabled().unwrap_or(true) {
            tracing::info!("Audio cache disabled, streaming from network");
            return AudioStore::unavailable();
        }

        let opened = self
            .get_audio_cache_dir()
            .and_then(|dir| AudioCache::with_http(&dir).map_err(anyhow::Error::from));

        match opened {
            Ok(cache) => AudioStore::new(Arc::new(cache)),
            Err(e) => {
                tracing::warn!(error = %e, "Audio cache unavailable, streaming from network");
                AudioStore::unavailable()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_follows_enabled_flag() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();

        assert!(config.create_audio_store().is_available());
        assert!(dir.path().join("cache_audio").join("cache.db").exists());

        config.set_audio_cache_enabled(false).unwrap();
        assert!(!config.create_audio_store().is_available());
    }
}
