//! Modèle des horaires de prière
//!
//! Un horaire est la liste ordonnée des couples (nom, heure) d'une journée,
//! tels que renvoyés par le service de calcul. Les heures sont analysées une
//! seule fois, à la frontière du service : le compte à rebours ne voit que des
//! valeurs bien formées. La désérialisation passe par les mêmes constructeurs.

use crate::error::{Result, TimesError};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Événements quotidiens, dans l'ordre d'affichage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prayer {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    pub const ALL: [Prayer; 6] = [
        Prayer::Fajr,
        Prayer::Sunrise,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Sunrise => "Sunrise",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
        }
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heure de la journée sur 24 h, à la minute près
///
/// Sérialisée sous la forme `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrayerTime {
    hour: u8,
    minute: u8,
}

impl PrayerTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(TimesError::InvalidTime(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self { hour, minute })
    }

    /// Analyse `HH:MM` en ignorant une annotation finale comme ` (BST)`
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || TimesError::InvalidTime(s.to_string());
        let clock = s.split_whitespace().next().ok_or_else(invalid)?;
        let (h, m) = clock.split_once(':').ok_or_else(invalid)?;
        let hour = h.parse::<u8>().map_err(|_| invalid())?;
        let minute = m.parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        self.hour as u32 * 60 + self.minute as u32
    }

    pub fn to_naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, 0).unwrap_or(NaiveTime::MIN)
    }

    /// Affichage `5:07 AM`
    pub fn format_12h(&self) -> String {
        let period = if self.hour >= 12 { "PM" } else { "AM" };
        let h12 = match self.hour % 12 {
            0 => 12,
            h => h,
        };
        format!("{}:{:02} {}", h12, self.minute, period)
    }
}

impl FromStr for PrayerTime {
    type Err = TimesError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PrayerTime {
    type Error = TimesError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<PrayerTime> for String {
    fn from(time: PrayerTime) -> Self {
        time.to_string()
    }
}

impl fmt::Display for PrayerTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Entrée nommée d'un horaire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerEntry {
    pub name: String,
    pub time: PrayerTime,
}

impl PrayerEntry {
    pub fn new(name: impl Into<String>, time: PrayerTime) -> Self {
        Self {
            name: name.into(),
            time,
        }
    }
}

/// Liste ordonnée et non vide des entrées d'une journée
///
/// L'ordre d'origine est conservé ; le compte à rebours parcourt les entrées
/// dans cet ordre. Sérialisé comme un simple tableau d'entrées.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PrayerEntry>", into = "Vec<PrayerEntry>")]
pub struct PrayerSchedule {
    entries: Vec<PrayerEntry>,
}

impl PrayerSchedule {
    pub fn new(entries: Vec<PrayerEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(TimesError::EmptySchedule);
        }
        Ok(Self { entries })
    }

    /// Construit un horaire à partir de couples `(nom, "HH:MM")`
    ///
    /// ```
    /// use miqtimes::PrayerSchedule;
    ///
    /// let schedule = PrayerSchedule::from_pairs(&[("Fajr", "05:00"), ("Isha", "20:00")]).unwrap();
    /// assert_eq!(schedule.len(), 2);
    /// ```
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Result<Self> {
        let entries = pairs
            .iter()
            .map(|(name, time)| Ok(PrayerEntry::new(*name, PrayerTime::parse(time)?)))
            .collect::<Result<Vec<_>>>()?;
        Self::new(entries)
    }

    pub fn entries(&self) -> &[PrayerEntry] {
        &self.entries
    }

    /// Première entrée ; toujours présente
    pub fn first(&self) -> &PrayerEntry {
        &self.entries[0]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&PrayerEntry> {
        self.entries.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }
}

impl TryFrom<Vec<PrayerEntry>> for PrayerSchedule {
    type Error = TimesError;

    fn try_from(entries: Vec<PrayerEntry>) -> Result<Self> {
        Self::new(entries)
    }
}

impl From<PrayerSchedule> for Vec<PrayerEntry> {
    fn from(schedule: PrayerSchedule) -> Self {
        schedule.entries
    }
}
