//! Module de gestion du cache audio
//!
//! Le cache associe chaque URL à un fichier sur disque, indexé dans une base
//! SQLite. Les téléchargements sont écrits dans un fichier `.part` puis
//! renommés : un fichier présent dans le répertoire est toujours complet.

use crate::db::{AudioEntry, DB};
use crate::download::{file_name_for_url, Fetcher, HttpFetcher};
use crate::error::{CacheError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

const DB_FILE: &str = "cache.db";
const PART_SUFFIX: &str = "part";

/// Cache persistant de contenus audio, indexé par URL
///
/// Note : ce type est conçu pour être utilisé derrière un `Arc<AudioCache>`.
/// Les écritures concurrentes d'une même URL sont sérialisées.
pub struct AudioCache {
    /// Répertoire de stockage
    dir: PathBuf,
    /// Index SQLite
    db: Arc<DB>,
    /// Source des téléchargements
    fetcher: Arc<dyn Fetcher>,
    /// Verrous par URL pour les stockages en cours
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AudioCache {
    /// Ouvre (ou crée) un cache dans `dir` avec le fetcher donné
    pub fn open(dir: impl AsRef<Path>, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let db = DB::init(&dir.join(DB_FILE))?;

        Ok(Self {
            dir,
            db: Arc::new(db),
            fetcher,
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    /// Ouvre un cache qui télécharge en HTTP(S)
    pub fn with_http(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(dir, Arc::new(HttpFetcher::new()?))
    }

    /// Retourne le répertoire du cache
    pub fn cache_dir(&self) -> &Path {
        &self.dir
    }

    pub fn database(&self) -> Arc<DB> {
        self.db.clone()
    }

    fn entry_path(&self, entry: &AudioEntry) -> PathBuf {
        self.dir.join(&entry.file)
    }

    /// Indique si un contenu complet est stocké pour cette URL
    pub async fn has(&self, url: &str) -> Result<bool> {
        Ok(match self.db.get(url)? {
            Some(entry) => tokio::fs::try_exists(self.entry_path(&entry)).await?,
            None => false,
        })
    }

    async fn url_lock(&self, url: &str) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().await;
        in_flight
            .entry(url.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn release_url_lock(&self, url: &str, lock: Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().await;
        // 2 = la map + notre clone : personne d'autre n'attend
        if Arc::strong_count(&lock) <= 2 {
            in_flight.remove(url);
        }
    }

    /// Télécharge et stocke le contenu de `url`
    ///
    /// Stocker à nouveau la même URL remplace le fichier et l'entrée
    /// existants, sans doublon. Retourne le chemin du fichier stocké.
    pub async fn put(&self, url: &str) -> Result<PathBuf> {
        let lock = self.url_lock(url).await;
        let result = {
            let _guard = lock.lock().await;
            self.store(url).await
        };
        self.release_url_lock(url, lock).await;
        result
    }

    async fn store(&self, url: &str) -> Result<PathBuf> {
        let file = file_name_for_url(url);
        let final_path = self.dir.join(&file);
        let part_path = self.dir.join(format!("{file}.{PART_SUFFIX}"));

        tracing::debug!(url = %url, file = %file, "Fetching audio payload");
        let size = match self.fetcher.fetch_to(url, &part_path).await {
            Ok(size) => size,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(e);
            }
        };

        tokio::fs::rename(&part_path, &final_path).await?;
        self.db.upsert(url, &file, size)?;

        tracing::info!(url = %url, size, "Cached audio");
        Ok(final_path)
    }

    /// Chemin du fichier stocké pour `url`, s'il existe
    ///
    /// Compte un accès dans les statistiques.
    pub async fn get_path(&self, url: &str) -> Result<Option<PathBuf>> {
        let Some(entry) = self.db.get(url)? else {
            return Ok(None);
        };

        let path = self.entry_path(&entry);
        if !tokio::fs::try_exists(&path).await? {
            tracing::warn!(url = %url, "Cache entry without file");
            return Ok(None);
        }

        self.db.update_hit(url)?;
        Ok(Some(path))
    }

    /// Lit le contenu stocké pour `url`
    pub async fn read(&self, url: &str) -> Result<Vec<u8>> {
        match self.get_path(url).await? {
            Some(path) => Ok(tokio::fs::read(path).await?),
            None => Err(CacheError::NotCached(url.to_string())),
        }
    }

    /// Supprime l'entrée et le fichier d'une URL
    pub async fn delete(&self, url: &str) -> Result<()> {
        let entry = self
            .db
            .get(url)?
            .ok_or_else(|| CacheError::NotCached(url.to_string()))?;

        if let Err(err) = tokio::fs::remove_file(self.entry_path(&entry)).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                return Err(err.into());
            }
        }

        self.db.delete(url)?;
        Ok(())
    }

    /// Toutes les entrées de l'index
    pub fn list(&self) -> Result<Vec<AudioEntry>> {
        self.db.get_all()
    }

    /// Supprime tous les fichiers et entrées du cache
    pub async fn purge(&self) -> Result<()> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() && !is_db_file(&path) {
                tokio::fs::remove_file(path).await?;
            }
        }

        self.db.purge()
    }

    /// Consolide le cache
    ///
    /// Supprime les entrées sans fichier, puis les fichiers sans entrée
    /// (dont les `.part` abandonnés). Retourne le nombre d'éléments supprimés.
    pub async fn consolidate(&self) -> Result<usize> {
        let mut removed = 0;
        let mut known = std::collections::HashSet::new();

        for entry in self.db.get_all()? {
            if tokio::fs::try_exists(self.entry_path(&entry)).await? {
                known.insert(entry.file);
            } else {
                tracing::warn!(url = %entry.url, "Dropping cache entry without file");
                self.db.delete(&entry.url)?;
                removed += 1;
            }
        }

        let mut dir_entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(dir_entry) = dir_entries.next_entry().await? {
            let path = dir_entry.path();
            if !path.is_file() || is_db_file(&path) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !known.contains(name) {
                tracing::debug!(file = %name, "Removing orphan cache file");
                tokio::fs::remove_file(&path).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(removed, "Cache consolidated");
        }
        Ok(removed)
    }
}

// cache.db, cache.db-journal, cache.db-wal...
fn is_db_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(DB_FILE))
}
