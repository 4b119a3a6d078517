//! # miqconfig - Configuration de Miqat
//!
//! Un arbre YAML unique, partagé par tout le processus :
//!
//! - les valeurs par défaut sont embarquées dans le binaire (`miqat.yaml`) ;
//! - `config.yaml` dans le répertoire de configuration les surcharge clé par clé ;
//! - les variables `MIQAT_CONFIG__SECTION__CLE=valeur` ont le dernier mot ;
//! - toute modification est réécrite immédiatement sur disque.
//!
//! Les accesseurs métier (voix d'adhan, méthode de calcul, cache audio...)
//! vivent dans les crates concernées, sous forme de traits d'extension sur
//! [`Config`].
//!
//! ```no_run
//! use miqconfig::get_config;
//!
//! let config = get_config();
//! let level = config.get_log_min_level()?;
//! config.set_log_min_level("DEBUG".to_string())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{debug, info, warn};

const EMBEDDED_DEFAULTS: &str = include_str!("miqat.yaml");
const CONFIG_FILE: &str = "config.yaml";
const DIR_NAME: &str = ".miqat";

const ENV_CONFIG_DIR: &str = "MIQAT_CONFIG";
const ENV_OVERRIDE_PREFIX: &str = "MIQAT_CONFIG__";

const LOGGER_MIN_LEVEL: &[&str] = &["host", "logger", "min_level"];
const LOGGER_CONSOLE: &[&str] = &["host", "logger", "enable_console"];

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load Miqat configuration"));
}

/// Génère un couple getter/setter pour un réglage booléen
///
/// Une valeur absente ou non booléenne vaut `$default`.
#[macro_export]
macro_rules! bool_setting {
    ($get:ident, $set:ident, $key:expr, $default:expr) => {
        pub fn $get(&self) -> anyhow::Result<bool> {
            Ok(self.get_value($key).ok().and_then(|v| v.as_bool()).unwrap_or($default))
        }

        pub fn $set(&self, enabled: bool) -> anyhow::Result<()> {
            self.set_value($key, serde_yaml::Value::Bool(enabled))
        }
    };
}

/// Configuration courante de Miqat
#[derive(Debug)]
pub struct Config {
    dir: String,
    file: PathBuf,
    tree: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let tree = match self.tree.lock() {
            Ok(tree) => tree.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        Self {
            dir: self.dir.clone(),
            file: self.file.clone(),
            tree: Mutex::new(tree),
        }
    }
}

impl Config {
    /// Choisit le répertoire de configuration
    ///
    /// Le premier trouvé l'emporte : `directory` s'il n'est pas vide,
    /// `$MIQAT_CONFIG`, `./.miqat` s'il existe, `~/.miqat` s'il existe.
    /// À défaut, `./.miqat`.
    fn locate_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }
        if let Ok(from_env) = env::var(ENV_CONFIG_DIR) {
            debug!(env_var = ENV_CONFIG_DIR, path = %from_env, "Config directory from environment");
            return from_env;
        }

        let local = PathBuf::from(DIR_NAME);
        let home = dirs::home_dir().map(|h| h.join(DIR_NAME));
        std::iter::once(Some(local))
            .chain(std::iter::once(home))
            .flatten()
            .find(|candidate| candidate.is_dir())
            .map(|found| found.to_string_lossy().into_owned())
            .unwrap_or_else(|| DIR_NAME.to_string())
    }

    /// Crée `dir` si besoin et vérifie qu'on peut y écrire
    fn ensure_writable(dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        if !dir.is_dir() {
            return Err(anyhow!("{} exists but is not a directory", dir.display()));
        }

        let marker = dir.join(".miqat_marker");
        fs::write(&marker, b"")
            .map_err(|e| anyhow!("{} is not writable: {}", dir.display(), e))?;
        fs::remove_file(&marker)?;
        Ok(())
    }

    /// Détermine et prépare le répertoire de configuration
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir = Self::locate_dir(directory);
        Self::ensure_writable(Path::new(&dir))?;
        Ok(dir)
    }

    /// Charge la configuration depuis `directory` (ou le répertoire découvert)
    ///
    /// Défauts embarqués, puis `config.yaml`, puis variables d'environnement.
    /// Le résultat fusionné est réécrit dans `config.yaml`.
    pub fn load_config(directory: &str) -> Result<Self> {
        let dir = Self::config_dir(directory)?;
        let file = Path::new(&dir).join(CONFIG_FILE);
        info!(config_dir = %dir, "Using config directory");

        let mut tree: Value = serde_yaml::from_str(EMBEDDED_DEFAULTS)?;
        match fs::read_to_string(&file) {
            Ok(text) => {
                info!(config_file = %file.display(), "Loaded config file");
                let user: Value = serde_yaml::from_str(&text)?;
                tree::merge(&mut tree, user);
            }
            Err(_) => info!(config_file = %file.display(), "No config file, using embedded defaults"),
        }

        let mut tree = tree::lowercase_keys(tree);
        apply_overrides(&mut tree, env::vars());

        let config = Config {
            dir,
            file,
            tree: Mutex::new(tree),
        };
        config.save()?;
        Ok(config)
    }

    fn tree(&self) -> Result<MutexGuard<'_, Value>> {
        self.tree
            .lock()
            .map_err(|_| anyhow!("configuration lock poisoned"))
    }

    /// Répertoire contenant `config.yaml`
    pub fn directory(&self) -> &str {
        &self.dir
    }

    /// Réécrit l'arbre courant dans `config.yaml`
    pub fn save(&self) -> Result<()> {
        let tree = self.tree()?;
        let text = serde_yaml::to_string(&*tree)?;
        fs::write(&self.file, text)?;
        Ok(())
    }

    /// Définit la valeur à `path` (par ex. `&["adhan", "voice_id"]`) et sauvegarde
    ///
    /// Les sections intermédiaires absentes sont créées.
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut tree = self.tree()?;
            tree::insert(&mut tree, path, value)?;
        }
        self.save()
    }

    /// Copie de la valeur à `path` ; un chemin absent est une erreur
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let tree = self.tree()?;
        tree::lookup(&tree, path)
            .cloned()
            .ok_or_else(|| anyhow!("No configuration value at {}", path.join(".")))
    }

    /// Désérialise le sous-arbre `path`
    ///
    /// `Ok(None)` si la clé est absente ou nulle.
    pub fn get_typed<T: DeserializeOwned>(&self, path: &[&str]) -> Result<Option<T>> {
        match self.get_value(path) {
            Ok(Value::Null) | Err(_) => Ok(None),
            Ok(value) => Ok(Some(serde_yaml::from_value(value)?)),
        }
    }

    pub fn get_string_or(&self, path: &[&str], default: &str) -> String {
        self.get_value(path)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    }

    /// Répertoire géré par la configuration
    ///
    /// Un chemin relatif part du répertoire de configuration. Le répertoire
    /// est créé si besoin ; `default` est enregistré quand la clé est absente.
    ///
    /// ```no_run
    /// use miqconfig::get_config;
    ///
    /// let dir = get_config().get_managed_dir(&["host", "audio_cache", "directory"], "cache_audio")?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn get_managed_dir(&self, path: &[&str], default: &str) -> Result<String> {
        let configured = match self.get_value(path) {
            Ok(Value::String(dir)) => dir,
            _ => {
                self.set_managed_dir(path, default.to_string())?;
                default.to_string()
            }
        };

        let configured = Path::new(&configured);
        let resolved = if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            Path::new(&self.dir).join(configured)
        };
        if !resolved.is_dir() {
            fs::create_dir_all(&resolved)?;
            info!(directory = %resolved.display(), "Created managed directory");
        }
        Ok(resolved.to_string_lossy().into_owned())
    }

    pub fn set_managed_dir(&self, path: &[&str], directory: String) -> Result<()> {
        self.set_value(path, Value::String(directory))
    }

    bool_setting!(get_log_enable_console, set_log_enable_console, LOGGER_CONSOLE, true);

    /// Niveau minimal de log (`TRACE`, `DEBUG`, `INFO`, `WARN`, `ERROR`)
    pub fn get_log_min_level(&self) -> Result<String> {
        Ok(self.get_string_or(LOGGER_MIN_LEVEL, "INFO"))
    }

    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(LOGGER_MIN_LEVEL, Value::String(level))
    }
}

/// Configuration globale du processus, chargée au premier accès
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Applique les variables `MIQAT_CONFIG__A__B=valeur` sur `tree`
///
/// Les valeurs sont lues comme des scalaires YAML : `true` ou `12` gardent
/// leur type.
fn apply_overrides(tree: &mut Value, vars: impl IntoIterator<Item = (String, String)>) {
    for (name, raw) in vars {
        let Some(key) = name.strip_prefix(ENV_OVERRIDE_PREFIX) else {
            continue;
        };
        let path: Vec<&str> = key.split("__").filter(|part| !part.is_empty()).collect();
        if path.is_empty() {
            continue;
        }
        let value = serde_yaml::from_str(&raw).unwrap_or(Value::String(raw.clone()));
        match tree::insert(tree, &path, value) {
            Ok(()) => debug!(variable = %name, "Applied configuration override"),
            Err(e) => warn!(variable = %name, error = %e, "Ignoring configuration override"),
        }
    }
}

/// Navigation dans l'arbre YAML ; les clés sont toujours en minuscules
mod tree {
    use anyhow::{anyhow, Result};
    use serde_yaml::{Mapping, Value};

    fn key(part: &str) -> Value {
        Value::String(part.to_lowercase())
    }

    pub fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
        path.iter()
            .try_fold(root, |node, part| node.as_mapping()?.get(key(part)))
    }

    pub fn insert(root: &mut Value, path: &[&str], value: Value) -> Result<()> {
        let Some((last, parents)) = path.split_last() else {
            *root = value;
            return Ok(());
        };

        let mut node = root;
        for part in parents {
            let map = node
                .as_mapping_mut()
                .ok_or_else(|| anyhow!("'{}' is below a non-mapping value", part))?;
            node = map
                .entry(key(part))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
        }
        node.as_mapping_mut()
            .ok_or_else(|| anyhow!("'{}' is below a non-mapping value", last))?
            .insert(key(last), value);
        Ok(())
    }

    /// Superpose `user` à `base` : fusion récursive des maps, remplacement sinon
    pub fn merge(base: &mut Value, user: Value) {
        match (base, user) {
            (Value::Mapping(base), Value::Mapping(user)) => {
                for (k, v) in user {
                    match base.get_mut(&k) {
                        Some(existing) => merge(existing, v),
                        None => {
                            base.insert(k, v);
                        }
                    }
                }
            }
            (slot, other) => *slot = other,
        }
    }

    pub fn lowercase_keys(value: Value) -> Value {
        match value {
            Value::Mapping(map) => Value::Mapping(
                map.into_iter()
                    .map(|(k, v)| {
                        let k = match k {
                            Value::String(s) => Value::String(s.to_lowercase()),
                            other => other,
                        };
                        (k, lowercase_keys(v))
                    })
                    .collect(),
            ),
            Value::Sequence(items) => {
                Value::Sequence(items.into_iter().map(lowercase_keys).collect())
            }
            other => other,
        }
    }
}
