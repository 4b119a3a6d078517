//! Extension pour intégrer le choix de la voix et du style dans miqconfig

use crate::style::AdhanStyle;
use crate::voice::{find_voice, AdhanVoice};
use anyhow::{bail, Result};
use miqconfig::Config;
use serde_yaml::Value;

const VOICE_ID_PATH: &[&str] = &["adhan", "voice_id"];
const STYLE_ID_PATH: &[&str] = &["adhan", "style_id"];
const VOICES_PATH: &[&str] = &["adhan", "voices"];
const NOTIFICATIONS_KEY: [&str; 2] = ["adhan", "notifications"];

/// Prières pour lesquelles une alerte d'adhan peut être activée
pub const ALERT_PRAYERS: [&str; 5] = ["Fajr", "Dhuhr", "Asr", "Maghrib", "Isha"];

const DEFAULT_VOICE_ID: &str = "makkah";

/// Trait d'extension pour les réglages de l'adhan
///
/// ```rust,no_run
/// use miqconfig::get_config;
/// use miqadhan::AdhanConfigExt;
///
/// let voice = get_config().get_selected_voice().unwrap();
/// println!("{} -> {}", voice.name, voice.url_for("Fajr"));
/// ```
pub trait AdhanConfigExt {
    fn get_voice_id(&self) -> String;
    fn set_voice_id(&self, id: &str) -> Result<()>;

    fn get_adhan_style(&self) -> AdhanStyle;
    fn set_adhan_style(&self, style: AdhanStyle) -> Result<()>;

    /// Catalogue des voix (vide si absent)
    fn get_voices(&self) -> Result<Vec<AdhanVoice>>;

    /// Voix sélectionnée, erreur si l'id n'est pas au catalogue
    fn get_selected_voice(&self) -> Result<AdhanVoice>;

    /// L'adhan doit-il retentir pour `prayer` ?
    ///
    /// Activé par défaut pour les cinq prières ; toujours faux pour les autres
    /// événements (Sunrise...).
    fn get_prayer_alert(&self, prayer: &str) -> bool;

    /// Active ou coupe l'alerte d'une des cinq prières
    fn set_prayer_alert(&self, prayer: &str, enabled: bool) -> Result<()>;
}

fn alert_prayer(prayer: &str) -> Option<&'static str> {
    ALERT_PRAYERS
        .iter()
        .copied()
        .find(|p| p.eq_ignore_ascii_case(prayer))
}

impl AdhanConfigExt for Config {
    fn get_voice_id(&self) -> String {
        self.get_string_or(VOICE_ID_PATH, DEFAULT_VOICE_ID)
    }

    fn set_voice_id(&self, id: &str) -> Result<()> {
        self.set_value(VOICE_ID_PATH, Value::String(id.to_string()))
    }

    fn get_adhan_style(&self) -> AdhanStyle {
        AdhanStyle::from_id(&self.get_string_or(STYLE_ID_PATH, "full"))
    }

    fn set_adhan_style(&self, style: AdhanStyle) -> Result<()> {
        self.set_value(STYLE_ID_PATH, Value::String(style.id().to_string()))
    }

    fn get_voices(&self) -> Result<Vec<AdhanVoice>> {
        Ok(self.get_typed(VOICES_PATH)?.unwrap_or_default())
    }

    fn get_selected_voice(&self) -> Result<AdhanVoice> {
        let voices = self.get_voices()?;
        Ok(find_voice(&voices, &self.get_voice_id())?.clone())
    }

    fn get_prayer_alert(&self, prayer: &str) -> bool {
        let Some(prayer) = alert_prayer(prayer) else {
            return false;
        };
        let [section, key] = NOTIFICATIONS_KEY;
        self.get_value(&[section, key, prayer])
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(true)
    }

    fn set_prayer_alert(&self, prayer: &str, enabled: bool) -> Result<()> {
        let Some(prayer) = alert_prayer(prayer) else {
            bail!("No adhan alert for {prayer}");
        };
        let [section, key] = NOTIFICATIONS_KEY;
        self.set_value(&[section, key, prayer], Value::Bool(enabled))
    }
}
