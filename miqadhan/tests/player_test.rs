use async_trait::async_trait;
use miqadhan::{
    AdhanPlayer, AdhanStyle, AudioOutput, OnEnded, PlayableHandle, PlaybackError, PlaybackSource,
};
use miqcache::{AudioCache, AudioStore, Fetcher};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_test::assert_ok;

const AZAN: &str = "https://audio.example/azan1.mp3";
const OTHER: &str = "https://audio.example/azan2.mp3";

#[derive(Default)]
struct Stats {
    opened: AtomicUsize,
    released: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
    sources: Mutex<Vec<PlaybackSource>>,
}

/// Sortie simulée : chaque média dure `media_len` en temps tokio
struct FakeOutput {
    media_len: Mutex<Duration>,
    open_delay: Mutex<Duration>,
    fail_open: AtomicBool,
    fail_play: AtomicBool,
    stats: Arc<Stats>,
}

impl FakeOutput {
    fn new(media_len: Duration) -> Arc<Self> {
        Arc::new(Self {
            media_len: Mutex::new(media_len),
            open_delay: Mutex::new(Duration::ZERO),
            fail_open: AtomicBool::new(false),
            fail_play: AtomicBool::new(false),
            stats: Arc::new(Stats::default()),
        })
    }

    fn set_media_len(&self, len: Duration) {
        *self.media_len.lock().unwrap() = len;
    }

    /// Simule un téléchargement avant que le média soit prêt
    fn set_open_delay(&self, delay: Duration) {
        *self.open_delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl AudioOutput for FakeOutput {
    async fn open(&self, source: &PlaybackSource) -> miqadhan::Result<Box<dyn PlayableHandle>> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(PlaybackError::open(source, "no such media"));
        }
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        self.stats.sources.lock().unwrap().push(source.clone());
        let delay = *self.open_delay.lock().unwrap();
        if !delay.is_zero() {
            sleep(delay).await;
        }
        Ok(Box::new(FakeHandle {
            media_len: *self.media_len.lock().unwrap(),
            refuse_play: self.fail_play.load(Ordering::SeqCst),
            stats: self.stats.clone(),
            playing: None,
        }))
    }
}

struct FakeHandle {
    media_len: Duration,
    refuse_play: bool,
    stats: Arc<Stats>,
    playing: Option<JoinHandle<()>>,
}

impl PlayableHandle for FakeHandle {
    fn play(&mut self) -> miqadhan::Result<oneshot::Receiver<()>> {
        if self.refuse_play {
            return Err(PlaybackError::Start("autoplay blocked".into()));
        }
        let live = self.stats.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_live.fetch_max(live, Ordering::SeqCst);

        let (tx, rx) = oneshot::channel();
        let len = self.media_len;
        self.playing = Some(tokio::spawn(async move {
            sleep(len).await;
            let _ = tx.send(());
        }));
        Ok(rx)
    }

    fn pause(&mut self) {}

    fn rewind(&mut self) {}

    fn release(self: Box<Self>) {
        if let Some(playing) = &self.playing {
            playing.abort();
            self.stats.live.fetch_sub(1, Ordering::SeqCst);
        }
        self.stats.released.fetch_add(1, Ordering::SeqCst);
    }
}

fn counter() -> (Arc<AtomicUsize>, OnEnded) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    (
        count,
        Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }),
    )
}

fn player(output: &Arc<FakeOutput>) -> AdhanPlayer {
    AdhanPlayer::new(AudioStore::unavailable(), output.clone())
}

#[tokio::test(start_paused = true)]
async fn test_stop_when_idle_is_noop() {
    let output = FakeOutput::new(Duration::from_secs(60));
    let player = player(&output);

    assert!(!player.stop().await);
    assert!(!player.is_playing().await);
    player.reset().await;
}

#[tokio::test(start_paused = true)]
async fn test_new_session_replaces_previous() {
    let output = FakeOutput::new(Duration::from_secs(60));
    let player = player(&output);

    let first = assert_ok!(player.start(AZAN, AdhanStyle::Full, None).await);
    let second = assert_ok!(player.start(OTHER, AdhanStyle::Full, None).await);

    assert_ne!(first, second);
    assert_eq!(player.active_session().await, Some(second));
    assert_eq!(player.active_url().await.as_deref(), Some(OTHER));
    assert_eq!(output.stats.released.load(Ordering::SeqCst), 1);
    assert_eq!(output.stats.live.load(Ordering::SeqCst), 1);
    assert_eq!(output.stats.max_live.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_starts_never_overlap() {
    let output = FakeOutput::new(Duration::from_secs(60));
    let player = player(&output);

    let starts = (0..8).map(|i| {
        let player = player.clone();
        tokio::spawn(async move {
            let url = format!("https://audio.example/{i}.mp3");
            player.start(&url, AdhanStyle::Full, None).await
        })
    });
    let mut started = Vec::new();
    for start in starts.collect::<Vec<_>>() {
        if let Ok(id) = start.await.unwrap() {
            started.push(id);
        }
    }

    assert!(player.is_playing().await);
    assert_eq!(player.active_session().await, started.iter().max().copied());
    assert_eq!(output.stats.opened.load(Ordering::SeqCst), 8);
    assert_eq!(output.stats.released.load(Ordering::SeqCst), 7);
    assert_eq!(output.stats.max_live.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_short_style_auto_stops_long_media() {
    let output = FakeOutput::new(Duration::from_secs(60));
    let player = player(&output);
    let (ended, on_ended) = counter();

    player
        .start(AZAN, AdhanStyle::Short, Some(on_ended))
        .await
        .unwrap();

    sleep(Duration::from_secs(14)).await;
    assert!(player.is_playing().await);

    sleep(Duration::from_secs(2)).await;
    assert!(!player.is_playing().await);
    assert_eq!(output.stats.released.load(Ordering::SeqCst), 1);

    // the media would have ended at 60 s
    sleep(Duration::from_secs(60)).await;
    assert_eq!(ended.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_long_style_auto_stops_at_thirty_seconds() {
    let output = FakeOutput::new(Duration::from_secs(120));
    let player = player(&output);

    player.start(AZAN, AdhanStyle::Long, None).await.unwrap();
    sleep(Duration::from_secs(29)).await;
    assert!(player.is_playing().await);
    sleep(Duration::from_secs(2)).await;
    assert!(!player.is_playing().await);
}

#[tokio::test(start_paused = true)]
async fn test_natural_end_fires_callback_once() {
    let output = FakeOutput::new(Duration::from_secs(20));
    let player = player(&output);
    let (ended, on_ended) = counter();

    player
        .start(AZAN, AdhanStyle::Full, Some(on_ended))
        .await
        .unwrap();

    sleep(Duration::from_secs(21)).await;
    assert_eq!(ended.load(Ordering::SeqCst), 1);
    assert!(!player.is_playing().await);

    sleep(Duration::from_secs(60)).await;
    assert_eq!(ended.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_media_shorter_than_auto_stop_ends_naturally() {
    let output = FakeOutput::new(Duration::from_secs(5));
    let player = player(&output);
    let (ended, on_ended) = counter();

    player
        .start(AZAN, AdhanStyle::Short, Some(on_ended))
        .await
        .unwrap();
    sleep(Duration::from_secs(20)).await;

    assert_eq!(ended.load(Ordering::SeqCst), 1);
    assert_eq!(output.stats.released.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_replaced_session_never_reports_its_end() {
    let output = FakeOutput::new(Duration::from_secs(10));
    let player = player(&output);
    let (ended, on_ended) = counter();

    player
        .start(AZAN, AdhanStyle::Full, Some(on_ended))
        .await
        .unwrap();
    output.set_media_len(Duration::from_secs(60));
    player.start(OTHER, AdhanStyle::Full, None).await.unwrap();

    sleep(Duration::from_secs(11)).await;
    assert_eq!(ended.load(Ordering::SeqCst), 0);
    assert_eq!(player.active_url().await.as_deref(), Some(OTHER));
}

#[tokio::test(start_paused = true)]
async fn test_stale_auto_stop_spares_later_session() {
    let output = FakeOutput::new(Duration::from_secs(60));
    let player = player(&output);

    player.start(AZAN, AdhanStyle::Short, None).await.unwrap();
    sleep(Duration::from_secs(5)).await;
    assert!(player.stop().await);

    let later = player.start(OTHER, AdhanStyle::Full, None).await.unwrap();
    sleep(Duration::from_secs(15)).await;
    assert_eq!(player.active_session().await, Some(later));
}

#[tokio::test(start_paused = true)]
async fn test_failed_start_leaves_player_inactive() {
    let output = FakeOutput::new(Duration::from_secs(60));
    let player = player(&output);

    player.start(AZAN, AdhanStyle::Full, None).await.unwrap();
    output.fail_open.store(true, Ordering::SeqCst);

    let err = player.start(OTHER, AdhanStyle::Full, None).await.unwrap_err();
    assert!(matches!(err, PlaybackError::Open { .. }));
    assert!(!player.is_playing().await);
    assert_eq!(output.stats.live.load(Ordering::SeqCst), 0);

    output.fail_open.store(false, Ordering::SeqCst);
    assert_ok!(player.start(OTHER, AdhanStyle::Full, None).await);
    assert!(player.is_playing().await);
}

#[tokio::test(start_paused = true)]
async fn test_refused_play_tears_down_and_stays_inactive() {
    let output = FakeOutput::new(Duration::from_secs(60));
    let player = player(&output);
    let (ended, on_ended) = counter();

    player
        .start(AZAN, AdhanStyle::Full, Some(on_ended))
        .await
        .unwrap();
    output.fail_play.store(true, Ordering::SeqCst);

    let err = player.start(OTHER, AdhanStyle::Full, None).await.unwrap_err();
    assert!(matches!(err, PlaybackError::Start(_)));
    assert!(!player.is_playing().await);
    assert_eq!(player.active_session().await, None);
    // la session précédente et le handle refusé sont tous deux libérés
    assert_eq!(output.stats.released.load(Ordering::SeqCst), 2);
    assert_eq!(output.stats.live.load(Ordering::SeqCst), 0);

    sleep(Duration::from_secs(120)).await;
    assert_eq!(ended.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_open_does_not_block_and_stop_cancels_it() {
    let output = FakeOutput::new(Duration::from_secs(60));
    output.set_open_delay(Duration::from_secs(10));
    let player = player(&output);

    let pending = {
        let player = player.clone();
        tokio::spawn(async move { player.start(AZAN, AdhanStyle::Full, None).await })
    };
    sleep(Duration::from_secs(1)).await;

    let playing = tokio::time::timeout(Duration::from_millis(10), player.is_playing()).await;
    assert_eq!(playing.ok(), Some(false));
    assert!(!player.stop().await);

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(PlaybackError::Superseded)));
    assert!(!player.is_playing().await);
    assert_eq!(output.stats.opened.load(Ordering::SeqCst), 1);
    assert_eq!(output.stats.released.load(Ordering::SeqCst), 1);
    assert_eq!(output.stats.max_live.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_newer_start_wins_over_slow_open() {
    let output = FakeOutput::new(Duration::from_secs(60));
    output.set_open_delay(Duration::from_secs(10));
    let player = player(&output);

    let slow = {
        let player = player.clone();
        tokio::spawn(async move { player.start(AZAN, AdhanStyle::Full, None).await })
    };
    sleep(Duration::from_secs(1)).await;

    output.set_open_delay(Duration::ZERO);
    let fast = assert_ok!(player.start(OTHER, AdhanStyle::Full, None).await);

    assert!(matches!(slow.await.unwrap(), Err(PlaybackError::Superseded)));
    assert_eq!(player.active_session().await, Some(fast));
    assert_eq!(player.active_url().await.as_deref(), Some(OTHER));
    assert_eq!(output.stats.max_live.load(Ordering::SeqCst), 1);
}

struct StaticFetcher;

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch_to(&self, _url: &str, dest: &Path) -> miqcache::Result<u64> {
        tokio::fs::write(dest, b"ID3 fake mp3").await?;
        Ok(12)
    }
}

#[tokio::test]
async fn test_cached_copy_is_preferred() {
    let dir = tempfile::tempdir().unwrap();
    let cache = AudioCache::open(dir.path(), Arc::new(StaticFetcher)).unwrap();
    let store = AudioStore::new(Arc::new(cache));
    let stored = store.put(AZAN).await.unwrap();

    let output = FakeOutput::new(Duration::from_secs(60));
    let player = AdhanPlayer::new(store, output.clone());

    player.start(AZAN, AdhanStyle::Full, None).await.unwrap();
    assert_eq!(player.active_source().await, Some(PlaybackSource::Cached(stored)));

    player.start(OTHER, AdhanStyle::Full, None).await.unwrap();
    assert_eq!(
        player.active_source().await,
        Some(PlaybackSource::Network(OTHER.to_string()))
    );
    player.stop().await;
}
