//! Styles de lecture : enregistrement complet, ou une ou deux premières phrases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdhanStyle {
    /// Première phrase, coupée après 15 s environ (`1v`)
    Short,
    /// Deux phrases, coupées après 30 s environ (`2v`)
    Long,
    /// Enregistrement complet
    #[default]
    Full,
}

impl AdhanStyle {
    /// Un identifiant inconnu joue l'enregistrement complet
    pub fn from_id(id: &str) -> Self {
        match id.trim().to_ascii_lowercase().as_str() {
            "1v" => AdhanStyle::Short,
            "2v" => AdhanStyle::Long,
            _ => AdhanStyle::Full,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            AdhanStyle::Short => "1v",
            AdhanStyle::Long => "2v",
            AdhanStyle::Full => "full",
        }
    }

    /// Délai d'arrêt forcé, compté depuis le début de la session
    pub fn auto_stop_after(&self) -> Option<Duration> {
        match self {
            AdhanStyle::Short => Some(Duration::from_secs(15)),
            AdhanStyle::Long => Some(Duration::from_secs(30)),
            AdhanStyle::Full => None,
        }
    }
}

impl fmt::Display for AdhanStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_ids() {
        assert_eq!(AdhanStyle::from_id("1v"), AdhanStyle::Short);
        assert_eq!(AdhanStyle::from_id("2V"), AdhanStyle::Long);
        assert_eq!(AdhanStyle::from_id("full"), AdhanStyle::Full);
        assert_eq!(AdhanStyle::from_id("whatever"), AdhanStyle::Full);
    }

    #[test]
    fn test_auto_stop_delays() {
        assert_eq!(AdhanStyle::Short.auto_stop_after(), Some(Duration::from_secs(15)));
        assert_eq!(AdhanStyle::Long.auto_stop_after(), Some(Duration::from_secs(30)));
        assert_eq!(AdhanStyle::Full.auto_stop_after(), None);
    }
}
