//! Sortie audio réelle avec rodio
//!
//! Le flux de sortie rodio doit rester sur le thread qui l'a créé : chaque
//! média ouvert a son propre thread, propriétaire du flux et du sink. Le
//! handle lui parle par un canal crossbeam.

use crate::error::{PlaybackError, Result};
use crate::output::{AudioOutput, PlayableHandle, PlaybackSource};
use async_trait::async_trait;
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::io::Cursor;
use std::time::Duration;
use tokio::sync::oneshot;

/// Fréquence de détection de la fin du média
const END_POLL: Duration = Duration::from_millis(100);

enum Command {
    Play(oneshot::Sender<()>),
    Pause,
    Rewind,
    Release,
}

/// Périphérique de sortie par défaut du système
#[derive(Debug, Clone, Default)]
pub struct RodioOutput {
    client: reqwest::Client,
}

impl RodioOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn load(&self, source: &PlaybackSource) -> Result<Vec<u8>> {
        match source {
            PlaybackSource::Cached(path) => tokio::fs::read(path)
                .await
                .map_err(|e| PlaybackError::open(source, e.to_string())),
            PlaybackSource::Network(url) => {
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| PlaybackError::open(source, e.to_string()))?;
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| PlaybackError::open(source, e.to_string()))?;
                Ok(bytes.to_vec())
            }
        }
    }
}

#[async_trait]
impl AudioOutput for RodioOutput {
    async fn open(&self, source: &PlaybackSource) -> Result<Box<dyn PlayableHandle>> {
        let bytes = self.load(source).await?;
        let (commands, inbox) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = oneshot::channel();
        let name = source.to_string();

        std::thread::Builder::new()
            .name("miqadhan-rodio".into())
            .spawn(move || run_player(bytes, inbox, ready_tx))
            .map_err(|e| PlaybackError::OutputUnavailable(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(Box::new(RodioHandle { commands })),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(PlaybackError::open(name, "player thread exited")),
        }
    }
}

fn run_player(
    bytes: Vec<u8>,
    inbox: crossbeam_channel::Receiver<Command>,
    ready: oneshot::Sender<Result<()>>,
) {
    let stream = match rodio::OutputStreamBuilder::open_default_stream() {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(PlaybackError::OutputUnavailable(e.to_string())));
            return;
        }
    };
    let sink = rodio::Sink::connect_new(stream.mixer());
    sink.pause();

    match rodio::Decoder::new(Cursor::new(bytes)) {
        Ok(decoded) => sink.append(decoded),
        Err(e) => {
            let _ = ready.send(Err(PlaybackError::open("audio data", e.to_string())));
            return;
        }
    }
    if ready.send(Ok(())).is_err() {
        return;
    }

    let mut ended: Option<oneshot::Sender<()>> = None;
    loop {
        match inbox.recv_timeout(END_POLL) {
            Ok(Command::Play(tx)) => {
                sink.play();
                ended = Some(tx);
            }
            Ok(Command::Pause) => sink.pause(),
            Ok(Command::Rewind) => {
                if let Err(e) = sink.try_seek(Duration::ZERO) {
                    tracing::debug!(error = %e, "Rewind not supported by this source");
                }
            }
            Ok(Command::Release) | Err(RecvTimeoutError::Disconnected) => {
                sink.stop();
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        if sink.empty() {
            if let Some(tx) = ended.take() {
                let _ = tx.send(());
            }
        }
    }
}

struct RodioHandle {
    commands: Sender<Command>,
}

impl PlayableHandle for RodioHandle {
    fn play(&mut self) -> Result<oneshot::Receiver<()>> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Play(tx))
            .map_err(|_| PlaybackError::Start("player thread exited".into()))?;
        Ok(rx)
    }

    fn pause(&mut self) {
        let _ = self.commands.send(Command::Pause);
    }

    fn rewind(&mut self) {
        let _ = self.commands.send(Command::Rewind);
    }

    fn release(self: Box<Self>) {
        let _ = self.commands.send(Command::Release);
    }
}
