//! Module de gestion de la base de données SQLite pour le cache audio
//!
//! Chaque entrée associe une URL source (clé unique) au fichier qui contient
//! le contenu téléchargé, avec quelques statistiques d'utilisation.

use crate::error::{CacheError, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const TABLE_NAME: &str = "audio_entries";

/// Entrée de cache représentant un contenu audio stocké
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct AudioEntry {
    /// URL source, clé unique de l'entrée
    pub url: String,
    /// Nom du fichier dans le répertoire du cache
    pub file: String,
    /// Taille du contenu en octets
    pub size: u64,
    /// Date/heure du dernier stockage (RFC3339)
    pub stored_at: String,
    /// Nombre d'accès en lecture
    pub hits: i64,
    /// Date/heure du dernier accès (RFC3339)
    pub last_used: Option<String>,
}

impl AudioEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let size: i64 = row.get(2)?;
        Ok(Self {
            url: row.get(0)?,
            file: row.get(1)?,
            size: size.max(0) as u64,
            stored_at: row.get(3)?,
            hits: row.get(4)?,
            last_used: row.get(5)?,
        })
    }
}

/// Base de données SQLite pour l'index du cache
#[derive(Debug)]
pub struct DB {
    conn: Mutex<Connection>,
}

impl DB {
    /// Initialise la base de données et crée la table si nécessaire
    ///
    /// ```rust,no_run
    /// use miqcache::db::DB;
    /// use std::path::Path;
    ///
    /// let db = DB::init(Path::new("cache.db")).unwrap();
    /// ```
    pub fn init(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (
                    url TEXT PRIMARY KEY,
                    file TEXT NOT NULL,
                    size INTEGER NOT NULL DEFAULT 0,
                    stored_at TEXT NOT NULL,
                    hits INTEGER NOT NULL DEFAULT 0,
                    last_used TEXT
                )"
            ),
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    /// Ajoute ou remplace l'entrée d'une URL
    ///
    /// Un second stockage de la même URL écrase l'entrée existante
    /// sans en créer une nouvelle ; les compteurs d'accès sont conservés.
    pub fn upsert(&self, url: &str, file: &str, size: u64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO {TABLE_NAME} (url, file, size, stored_at, hits, last_used)
                 VALUES (?1, ?2, ?3, ?4, 0, NULL)
                 ON CONFLICT(url) DO UPDATE SET
                     file = excluded.file,
                     size = excluded.size,
                     stored_at = excluded.stored_at"
            ),
            params![url, file, size as i64, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Récupère l'entrée d'une URL si elle existe
    pub fn get(&self, url: &str) -> Result<Option<AudioEntry>> {
        let conn = self.conn()?;
        let entry = conn
            .query_row(
                &format!(
                    "SELECT url, file, size, stored_at, hits, last_used
                     FROM {TABLE_NAME} WHERE url = ?1"
                ),
                [url],
                AudioEntry::from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Met à jour le compteur d'accès et la date du dernier accès
    pub fn update_hit(&self, url: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!("UPDATE {TABLE_NAME} SET hits = hits + 1, last_used = ?1 WHERE url = ?2"),
            params![Utc::now().to_rfc3339(), url],
        )?;
        Ok(())
    }

    /// Supprime l'entrée d'une URL, retourne `true` si elle existait
    pub fn delete(&self, url: &str) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute(&format!("DELETE FROM {TABLE_NAME} WHERE url = ?1"), [url])?;
        Ok(n > 0)
    }

    /// Purge toutes les entrées
    pub fn purge(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(&format!("DELETE FROM {TABLE_NAME}"), [])?;
        Ok(())
    }

    /// Toutes les entrées, les plus récemment stockées en premier
    pub fn get_all(&self) -> Result<Vec<AudioEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT url, file, size, stored_at, hits, last_used
             FROM {TABLE_NAME} ORDER BY stored_at DESC"
        ))?;

        let entries = stmt
            .query_map([], AudioEntry::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {TABLE_NAME}"), [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
