//! # miqtimes - Horaires de prière et compte à rebours
//!
//! ## Architecture
//!
//! ```text
//! miqtimes
//!     ├── schedule.rs   - PrayerTime, PrayerSchedule (ordre d'affichage)
//!     ├── countdown.rs  - Sélection de la prochaine prière, tâche Countdown
//!     ├── provider.rs   - PrayerTimesProvider, client Aladhan, mémo par jour
//!     └── geocode.rs    - Geocoder, client Nominatim
//! ```
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use miqtimes::{AladhanClient, Countdown, PrayerTimesProvider, SystemClock, TimesQuery};
//! use miqqiblah::Coordinates;
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = AladhanClient::new()?;
//!     let today = chrono::Local::now().date_naive();
//!     let times = client
//!         .daily_times(&TimesQuery::new(Coordinates::new(51.5074, -0.1278), today))
//!         .await?;
//!
//!     let (_tx, rx) = watch::channel(Some(Arc::new(times.schedule)));
//!     let countdown = Countdown::spawn(rx, Arc::new(SystemClock));
//!     let mut state = countdown.subscribe();
//!     state.changed().await?;
//!     if let Some(s) = state.borrow().as_ref() {
//!         println!("{} in {}", s.next.entry.name, s.remaining);
//!     }
//!     Ok(())
//! }
//! ```

pub mod countdown;
pub mod error;
pub mod geocode;
pub mod provider;
pub mod schedule;

#[cfg(feature = "miqconfig")]
pub mod config_ext;

pub use countdown::{
    next_prayer, remaining_until, Clock, Countdown, CountdownState, FixedClock, NextPrayer,
    Remaining, SystemClock,
};
pub use error::{Result, TimesError};
pub use geocode::{parse_nominatim_response, Geocoder, NominatimClient, Place};
pub use provider::{
    location_name_from_timezone, parse_aladhan_response, AladhanClient, ScheduleCache,
    DailyTimes, PrayerTimesProvider, TimesQuery,
};
pub use schedule::{Prayer, PrayerEntry, PrayerSchedule, PrayerTime};

#[cfg(feature = "miqconfig")]
pub use config_ext::{ManualLocation, TimesConfigExt};
