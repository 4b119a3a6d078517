//! Implémentation des sous-commandes

use crate::cli::{CacheAction, LocationArgs, Switch};
use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use miqadhan::{
    download_voice, find_voice, AdhanConfigExt, AdhanPlayer, AdhanStyle, AudioOutput, ALERT_PRAYERS,
};
use miqcache::{AudioCacheConfigExt, AudioStore, SecondaryOutcome};
use miqconfig::Config;
use miqqiblah::{Compass, Coordinates, ManualSensor, OrientationEvent};
use miqtimes::{
    AladhanClient, Countdown, DailyTimes, Geocoder, ManualLocation, NominatimClient,
    PrayerTimesProvider, ScheduleCache, SystemClock, TimesConfigExt,
};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

#[cfg(feature = "audio")]
fn audio_output() -> Result<Arc<dyn AudioOutput>> {
    Ok(Arc::new(miqadhan::RodioOutput::new()))
}

#[cfg(not(feature = "audio"))]
fn audio_output() -> Result<Arc<dyn AudioOutput>> {
    bail!("miqat was built without audio support (rebuild with --features audio)")
}

/// Coordonnées en argument, sinon l'adresse manuelle configurée
fn resolve_coordinates(config: &Config, location: LocationArgs) -> Result<Coordinates> {
    if let (Some(lat), Some(lng)) = (location.lat, location.lng) {
        let coords = Coordinates::new(lat, lng);
        if !coords.is_valid() {
            bail!("Invalid coordinates: {lat}, {lng}");
        }
        return Ok(coords);
    }

    match config.get_manual_location()? {
        Some(manual) => {
            info!(address = %manual.address, "Using configured manual location");
            Ok(manual.coordinates())
        }
        None => Err(anyhow!(
            "No location: pass --lat/--lng or run `miqat locate <address>`"
        )),
    }
}

fn print_day(config: &Config, times: &DailyTimes) {
    println!("{}", config.display_location_name(times));
    println!("{}  |  {}", times.hijri_date, times.hijri_arabic);
    println!();
    for entry in times.schedule.entries() {
        println!("  {:<8} {:>8}", entry.name, entry.time.format_12h());
    }
    println!();
}

pub async fn next(config: &Config, location: LocationArgs, once: bool, adhan: bool) -> Result<()> {
    let coords = resolve_coordinates(config, location)?;
    let provider = ScheduleCache::new(AladhanClient::new()?);

    let mut date = Local::now().date_naive();
    let times = provider
        .daily_times(&config.times_query(coords, date)?)
        .await
        .context("Cannot fetch prayer times")?;
    print_day(config, &times);

    let player = if adhan {
        Some(AdhanPlayer::new(config.create_audio_store(), audio_output()?))
    } else {
        None
    };

    let (schedule_tx, schedule_rx) = watch::channel(Some(Arc::new(times.schedule)));
    let countdown = Countdown::spawn(schedule_rx, Arc::new(SystemClock));
    let mut state = countdown.subscribe();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut previous: Option<String> = None;
    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                println!();
                break;
            }
        }

        let Some(current) = state.borrow_and_update().clone() else {
            continue;
        };

        let next = &current.next.entry;
        if once {
            println!("{} at {} in {}", next.name, next.time.format_12h(), current.remaining);
            break;
        }
        print!(
            "\r{} at {} in {}        ",
            next.name,
            next.time.format_12h(),
            current.remaining
        );
        std::io::stdout().flush()?;

        if let Some(reached) = previous.replace(next.name.clone()) {
            if reached != next.name {
                println!();
                info!(prayer = %reached, "Prayer time reached");
                if let Some(player) = &player {
                    play_for_prayer(config, player, &reached).await;
                }
            }
        }

        let today = Local::now().date_naive();
        if today != date {
            date = today;
            match provider.daily_times(&config.times_query(coords, date)?).await {
                Ok(times) => {
                    provider.retain_date(date);
                    schedule_tx.send_replace(Some(Arc::new(times.schedule)));
                }
                Err(e) => warn!(error = %e, "Cannot refresh prayer times, keeping yesterday's"),
            }
        }
    }

    countdown.cancel();
    if let Some(player) = player {
        player.stop().await;
    }
    Ok(())
}

async fn play_for_prayer(config: &Config, player: &AdhanPlayer, prayer: &str) {
    if !config.get_prayer_alert(prayer) {
        debug!(prayer = %prayer, "Adhan alert disabled");
        return;
    }
    let voice = match config.get_selected_voice() {
        Ok(voice) => voice,
        Err(e) => {
            warn!(error = %e, "No adhan voice configured");
            return;
        }
    };
    // start() journalise ses propres échecs
    let _ = player
        .start(voice.url_for(prayer), config.get_adhan_style(), None)
        .await;
}

pub fn qiblah(config: &Config, location: LocationArgs, heading: Option<f64>) -> Result<()> {
    let coords = resolve_coordinates(config, location)?;

    let orientation = ManualSensor::<OrientationEvent>::new();
    let position = ManualSensor::<Coordinates>::new();
    let compass = Compass::attach(&orientation, &position);

    position.emit(coords);
    if let Some(heading) = heading {
        orientation.emit(OrientationEvent {
            compass_heading: Some(heading),
            ..Default::default()
        });
    }

    let snapshot = compass.snapshot();
    let bearing = snapshot
        .qiblah
        .ok_or_else(|| anyhow!("Cannot compute qiblah for {:?}", coords))?;
    println!("Qiblah: {:.1}° from true north", bearing);

    if let (Some(rotation), Some(deviation)) = (snapshot.pointer_rotation(), snapshot.deviation()) {
        println!("Turn:   {:.1}° clockwise ({:.1}° off)", rotation, deviation);
        if snapshot.is_aligned() {
            println!("Aligned with the qiblah");
        }
    }
    Ok(())
}

pub async fn locate(config: &Config, address: &str, dry_run: bool) -> Result<()> {
    let geocoder = NominatimClient::new()?;
    let Some(place) = geocoder.geocode(address).await? else {
        bail!("Location not found: {address}");
    };

    println!(
        "{} ({:.4}, {:.4})",
        place.display_name, place.coordinates.latitude, place.coordinates.longitude
    );
    if !dry_run {
        config.set_manual_location(&ManualLocation {
            address: place.display_name,
            lat: place.coordinates.latitude,
            lng: place.coordinates.longitude,
        })?;
        config.set_auto_location(false)?;
        println!("Saved as manual location");
    }
    Ok(())
}

pub async fn voices(config: &Config) -> Result<()> {
    let store = config.create_audio_store();
    let selected = config.get_voice_id();

    for voice in config.get_voices()? {
        let mark = if voice.id == selected { "*" } else { " " };
        let offline = if store.has(&voice.url).await { "offline" } else { "" };
        let fajr = if voice.fajr_url.is_some() { "+fajr" } else { "" };
        println!("{} {:<10} {:<12} {:<6} {}", mark, voice.id, voice.name, fajr, offline);
    }
    Ok(())
}

pub async fn download(config: &Config, voice: Option<String>) -> Result<()> {
    let store = config.create_audio_store();
    if !store.is_available() {
        bail!("Audio cache is disabled or unavailable");
    }

    let id = voice.unwrap_or_else(|| config.get_voice_id());
    let report = download_voice(&store, &config.get_voices()?, &id).await?;

    println!("{}: {}", id, report.primary.display());
    match report.secondary {
        Some(SecondaryOutcome::Stored(path)) => println!("fajr: {}", path.display()),
        Some(SecondaryOutcome::Failed(reason)) => println!("fajr: not cached ({reason})"),
        Some(SecondaryOutcome::SameAsPrimary) | None => {}
    }
    Ok(())
}

pub async fn play(
    config: &Config,
    voice: Option<String>,
    style: Option<String>,
    prayer: &str,
) -> Result<()> {
    let voices = config.get_voices()?;
    let id = voice.unwrap_or_else(|| config.get_voice_id());
    let voice = find_voice(&voices, &id)?;
    let style = style
        .map(|s| AdhanStyle::from_id(&s))
        .unwrap_or_else(|| config.get_adhan_style());

    let player = AdhanPlayer::new(config.create_audio_store(), audio_output()?);
    let (done_tx, done_rx) = oneshot::channel::<()>();
    let url = voice.url_for(prayer);
    player
        .start(
            url,
            style,
            Some(Box::new(move || {
                let _ = done_tx.send(());
            })),
        )
        .await?;
    println!("Playing {} ({}) [{}]", voice.name, prayer, style);

    // done_rx se résout aussi (en erreur) à l'arrêt automatique : le rappel est abandonné
    tokio::select! {
        _ = done_rx => {}
        _ = tokio::signal::ctrl_c() => {
            player.stop().await;
        }
    }
    Ok(())
}

pub fn alerts(config: &Config, prayer: Option<String>, state: Option<Switch>) -> Result<()> {
    if let (Some(prayer), Some(state)) = (prayer, state) {
        config.set_prayer_alert(&prayer, state == Switch::On)?;
    }
    for prayer in ALERT_PRAYERS {
        let state = if config.get_prayer_alert(prayer) { "on" } else { "off" };
        println!("  {:<8} {}", prayer, state);
    }
    Ok(())
}

pub async fn cache(config: &Config, action: CacheAction) -> Result<()> {
    let store: AudioStore = config.create_audio_store();
    let Some(cache) = store.cache() else {
        bail!("Audio cache is disabled or unavailable");
    };

    match action {
        CacheAction::List => {
            let entries = cache.list()?;
            for entry in &entries {
                println!(
                    "{:>10} B  {:>4} hits  {}  {}",
                    entry.size, entry.hits, entry.stored_at, entry.url
                );
            }
            println!("{} recording(s) in {}", entries.len(), cache.cache_dir().display());
        }
        CacheAction::Purge => {
            cache.purge().await?;
            println!("Cache purged");
        }
        CacheAction::Consolidate => {
            let removed = cache.consolidate().await?;
            println!("{removed} stale item(s) removed");
        }
    }
    Ok(())
}
