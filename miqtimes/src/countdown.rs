//! Sélection de la prochaine prière et compte à rebours
//!
//! La sélection se fait à la minute près sur l'horaire ; le temps restant est
//! recalculé depuis l'horloge à chaque tick, sans décrément, pour ne jamais
//! dériver.

use crate::schedule::{PrayerEntry, PrayerSchedule, PrayerTime};
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, Timelike};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Période de rafraîchissement
pub const TICK: Duration = Duration::from_secs(1);

/// Source de l'heure locale courante
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Heure locale de la machine
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Horloge qui n'avance que sur demande
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: ChronoDuration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Prochaine entrée d'un horaire
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextPrayer {
    pub entry: PrayerEntry,
    /// `true` quand toutes les entrées du jour sont passées : la première
    /// entrée vaut pour le lendemain
    pub tomorrow: bool,
}

/// Première entrée strictement après `now`, sinon la première du lendemain
///
/// Comparaison à la minute : à 20:00:30, une entrée à 20:00 est passée.
pub fn next_prayer(schedule: &PrayerSchedule, now: NaiveDateTime) -> NextPrayer {
    let current = now.hour() * 60 + now.minute();
    match schedule
        .entries()
        .iter()
        .find(|e| e.time.minutes_since_midnight() > current)
    {
        Some(entry) => NextPrayer {
            entry: entry.clone(),
            tomorrow: false,
        },
        None => NextPrayer {
            entry: schedule.first().clone(),
            tomorrow: true,
        },
    }
}

/// Durée décomposée pour l'affichage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Remaining {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Remaining {
    pub fn total_seconds(&self) -> u64 {
        self.hours as u64 * 3600 + self.minutes as u64 * 60 + self.seconds as u64
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m {}s", self.hours, self.minutes, self.seconds)
    }
}

/// Temps restant jusqu'à `time`, aujourd'hui ou demain s'il est passé
///
/// La cible est `time` à la seconde zéro. Les composantes sont arrondies à
/// l'inférieur ; le résultat reste sous 24 heures.
pub fn remaining_until(now: NaiveDateTime, time: PrayerTime) -> Remaining {
    let mut target = now.date().and_time(time.to_naive_time());
    if target < now {
        target += ChronoDuration::days(1);
    }

    let total_ms = (target - now).num_milliseconds().max(0);
    Remaining {
        hours: (total_ms / 3_600_000) as u32,
        minutes: ((total_ms % 3_600_000) / 60_000) as u32,
        seconds: ((total_ms % 60_000) / 1000) as u32,
    }
}

/// Valeur publiée à chaque tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountdownState {
    pub next: NextPrayer,
    pub remaining: Remaining,
}

impl CountdownState {
    pub fn compute(schedule: &PrayerSchedule, now: NaiveDateTime) -> Self {
        let next = next_prayer(schedule, now);
        let remaining = remaining_until(now, next.entry.time);
        Self { next, remaining }
    }
}

/// Tâche de fond qui publie le compte à rebours chaque seconde
///
/// La tâche suit le canal d'horaire : un nouvel horaire provoque un recalcul
/// immédiat. Elle s'arrête à l'annulation ou à la destruction du
/// `Countdown`.
pub struct Countdown {
    state: watch::Receiver<Option<CountdownState>>,
    task: JoinHandle<()>,
}

impl Countdown {
    pub fn spawn(
        mut schedule: watch::Receiver<Option<Arc<PrayerSchedule>>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (tx, rx) = watch::channel(None);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut current = schedule.borrow_and_update().clone();
            let mut schedule_open = true;

            loop {
                tokio::select! {
                    changed = schedule.changed(), if schedule_open => {
                        if changed.is_err() {
                            tracing::debug!("Schedule source closed, keeping last schedule");
                            schedule_open = false;
                            continue;
                        }
                        current = schedule.borrow_and_update().clone();
                        tracing::debug!(entries = current.as_ref().map(|s| s.len()), "Schedule updated");
                        ticker.reset();
                    }
                    _ = ticker.tick() => {}
                }

                let state = current
                    .as_deref()
                    .map(|s| CountdownState::compute(s, clock.now()));
                tx.send_replace(state);
            }
        });

        Self { state: rx, task }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<CountdownState>> {
        self.state.clone()
    }

    pub fn current(&self) -> Option<CountdownState> {
        self.state.borrow().clone()
    }

    pub fn cancel(self) {
        // Drop fait le travail
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn schedule() -> PrayerSchedule {
        PrayerSchedule::from_pairs(&[
            ("Fajr", "05:00"),
            ("Sunrise", "06:30"),
            ("Dhuhr", "12:15"),
            ("Asr", "15:40"),
            ("Maghrib", "18:05"),
            ("Isha", "20:00"),
        ])
        .unwrap()
    }

    #[test]
    fn test_next_prayer_in_the_evening() {
        let state = CountdownState::compute(&schedule(), at(19, 0, 0));
        assert_eq!(state.next.entry.name, "Isha");
        assert!(!state.next.tomorrow);
        assert_eq!(state.remaining.to_string(), "1h 0m 0s");
    }

    #[test]
    fn test_wraps_to_first_entry_after_last() {
        let state = CountdownState::compute(&schedule(), at(21, 0, 0));
        assert_eq!(state.next.entry.name, "Fajr");
        assert!(state.next.tomorrow);
        assert_eq!(state.remaining.to_string(), "8h 0m 0s");
    }

    #[test]
    fn test_entry_of_current_minute_is_past() {
        let next = next_prayer(&schedule(), at(12, 15, 30));
        assert_eq!(next.entry.name, "Asr");
    }

    #[test]
    fn test_remaining_floors_components() {
        let now = at(19, 59, 58) + ChronoDuration::milliseconds(500);
        let r = remaining_until(now, PrayerTime::parse("20:00").unwrap());
        assert_eq!(r, Remaining { hours: 0, minutes: 0, seconds: 1 });
    }

    #[test]
    fn test_remaining_rolls_over_midnight() {
        let r = remaining_until(at(23, 30, 0), PrayerTime::parse("00:10").unwrap());
        assert_eq!(r.to_string(), "0h 40m 0s");
        assert!(r.total_seconds() < 24 * 3600);
    }

    #[test]
    fn test_fixed_clock_moves_on_demand() {
        let clock = FixedClock::new(at(10, 0, 0));
        clock.advance(ChronoDuration::seconds(90));
        assert_eq!(clock.now(), at(10, 1, 30));
        clock.set(at(8, 0, 0));
        assert_eq!(clock.now(), at(8, 0, 0));
    }
}
