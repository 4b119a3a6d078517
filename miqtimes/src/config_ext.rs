//! Extension pour intégrer les paramètres de calcul dans miqconfig
//!
//! Les horaires dépendent de la méthode de calcul, de l'école juridique
//! (Asr) et d'éventuels angles personnalisés, tous lus sous `adhan.*`.

use crate::provider::{DailyTimes, TimesQuery};
use anyhow::Result;
use chrono::NaiveDate;
use miqconfig::Config;
use miqqiblah::Coordinates;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

const METHOD_PATH: &[&str] = &["adhan", "method"];
const SCHOOL_PATH: &[&str] = &["adhan", "school"];
const FAJR_ANGLE_PATH: &[&str] = &["adhan", "fajr_angle"];
const ISHA_ANGLE_PATH: &[&str] = &["adhan", "isha_angle"];
const AUTO_LOCATION_PATH: &[&str] = &["adhan", "auto_location"];
const MANUAL_LOCATION_PATH: &[&str] = &["adhan", "manual_location"];

const DEFAULT_METHOD: u8 = 2;
const DEFAULT_SCHOOL: u8 = 0;

/// Adresse saisie par l'utilisateur et ses coordonnées géocodées
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualLocation {
    pub address: String,
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude", alias = "lon")]
    pub lng: f64,
}

impl ManualLocation {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }

    /// Première partie de l'adresse (`"Paris, France"` -> `"Paris"`)
    pub fn short_name(&self) -> &str {
        self.address.split(',').next().unwrap_or("").trim()
    }
}

/// Trait d'extension pour les paramètres de calcul des horaires
pub trait TimesConfigExt {
    fn get_calculation_method(&self) -> Result<u8>;
    fn set_calculation_method(&self, method: u8) -> Result<()>;

    /// 0 = Shafi, 1 = Hanafi
    fn get_school(&self) -> Result<u8>;
    fn set_school(&self, school: u8) -> Result<()>;

    fn get_fajr_angle(&self) -> Result<Option<f64>>;
    fn get_isha_angle(&self) -> Result<Option<f64>>;
    fn set_custom_angles(&self, fajr: Option<f64>, isha: Option<f64>) -> Result<()>;

    /// Position du terminal plutôt que l'adresse manuelle (défaut : `true`)
    fn get_auto_location(&self) -> Result<bool>;
    fn set_auto_location(&self, enabled: bool) -> Result<()>;

    fn get_manual_location(&self) -> Result<Option<ManualLocation>>;
    fn set_manual_location(&self, location: &ManualLocation) -> Result<()>;

    /// Requête pour `date` à `coordinates` avec les paramètres configurés
    fn times_query(&self, coordinates: Coordinates, date: NaiveDate) -> Result<TimesQuery>;

    /// Nom de lieu à afficher pour une journée reçue
    ///
    /// L'adresse manuelle l'emporte quand la localisation automatique est
    /// désactivée.
    fn display_location_name(&self, times: &DailyTimes) -> String;
}

fn angle_value(angle: Option<f64>) -> Value {
    angle.map_or(Value::Null, |a| Value::Number(a.into()))
}

impl TimesConfigExt for Config {
    fn get_calculation_method(&self) -> Result<u8> {
        Ok(self.get_typed(METHOD_PATH)?.unwrap_or(DEFAULT_METHOD))
    }

    fn set_calculation_method(&self, method: u8) -> Result<()> {
        self.set_value(METHOD_PATH, Value::Number(method.into()))
    }

    fn get_school(&self) -> Result<u8> {
        Ok(self.get_typed(SCHOOL_PATH)?.unwrap_or(DEFAULT_SCHOOL))
    }

    fn set_school(&self, school: u8) -> Result<()> {
        self.set_value(SCHOOL_PATH, Value::Number(school.into()))
    }

    fn get_fajr_angle(&self) -> Result<Option<f64>> {
        self.get_typed(FAJR_ANGLE_PATH)
    }

    fn get_isha_angle(&self) -> Result<Option<f64>> {
        self.get_typed(ISHA_ANGLE_PATH)
    }

    fn set_custom_angles(&self, fajr: Option<f64>, isha: Option<f64>) -> Result<()> {
        self.set_value(FAJR_ANGLE_PATH, angle_value(fajr))?;
        self.set_value(ISHA_ANGLE_PATH, angle_value(isha))
    }

    fn get_auto_location(&self) -> Result<bool> {
        match self.get_value(AUTO_LOCATION_PATH) {
            Ok(Value::Bool(b)) => Ok(b),
            _ => Ok(true),
        }
    }

    fn set_auto_location(&self, enabled: bool) -> Result<()> {
        self.set_value(AUTO_LOCATION_PATH, Value::Bool(enabled))
    }

    fn get_manual_location(&self) -> Result<Option<ManualLocation>> {
        self.get_typed(MANUAL_LOCATION_PATH)
    }

    fn set_manual_location(&self, location: &ManualLocation) -> Result<()> {
        self.set_value(MANUAL_LOCATION_PATH, serde_yaml::to_value(location)?)
    }

    fn times_query(&self, coordinates: Coordinates, date: NaiveDate) -> Result<TimesQuery> {
        Ok(TimesQuery {
            coordinates,
            date,
            method: self.get_calculation_method()?,
            school: self.get_school()?,
            fajr_angle: self.get_fajr_angle()?,
            isha_angle: self.get_isha_angle()?,
        })
    }

    fn display_location_name(&self, times: &DailyTimes) -> String {
        if !self.get_auto_location().unwrap_or(true) {
            if let Ok(Some(manual)) = self.get_manual_location() {
                if !manual.short_name().is_empty() {
                    return manual.short_name().to_string();
                }
            }
        }
        times.location_name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        (dir, config)
    }

    #[test]
    fn test_defaults() {
        let (_dir, config) = config();
        assert_eq!(config.get_calculation_method().unwrap(), 2);
        assert_eq!(config.get_school().unwrap(), 0);
        assert_eq!(config.get_fajr_angle().unwrap(), None);
        assert!(config.get_auto_location().unwrap());
        assert!(config.get_manual_location().unwrap().is_none());
    }

    #[test]
    fn test_query_carries_overrides() {
        let (_dir, config) = config();
        config.set_calculation_method(3).unwrap();
        config.set_school(1).unwrap();
        config.set_custom_angles(Some(18.5), None).unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let q = config.times_query(Coordinates::new(1.0, 2.0), date).unwrap();
        assert_eq!((q.method, q.school), (3, 1));
        assert_eq!(q.fajr_angle, Some(18.5));
        assert_eq!(q.isha_angle, None);
    }

    #[test]
    fn test_manual_location_round_trip() {
        let (_dir, config) = config();
        let paris = ManualLocation {
            address: "Paris, Île-de-France, France".into(),
            lat: 48.8566,
            lng: 2.3522,
        };
        config.set_manual_location(&paris).unwrap();
        assert_eq!(config.get_manual_location().unwrap(), Some(paris));
    }
}
