//! Lecteur d'adhan à session unique
//!
//! Une seule session est audible à un instant donné. L'ouverture du média
//! (lecture du cache ou téléchargement) se fait hors verrou ; la session
//! précédente est ensuite arrêtée complètement (pause, retour au début,
//! libération, minuteries annulées) et la nouvelle démarrée sous un même
//! verrou, si bien que deux `start` ne s'entrelacent jamais.
//!
//! Chaque demande reçoit une génération. Un `stop` ou un `start` plus récent
//! invalide les demandes encore en cours d'ouverture.
//!
//! Les tâches de fond (arrêt automatique, fin de lecture) ne gardent qu'une
//! référence faible au lecteur et n'agissent que sur la session qui les a
//! créées, si elle est toujours active.

use crate::error::{PlaybackError, Result};
use crate::output::{AudioOutput, PlayableHandle, PlaybackSource};
use crate::style::AdhanStyle;
use miqcache::AudioStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

/// Identifiant d'une session de lecture
pub type SessionId = u64;

/// Rappel exécuté une fois quand une session arrive à sa fin naturelle
pub type OnEnded = Box<dyn FnOnce() + Send + 'static>;

/// Raison de l'arrêt d'une session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Stopped,
    Replaced,
    AutoStop,
    Ended,
}

struct ActiveSession {
    id: SessionId,
    url: String,
    source: PlaybackSource,
    handle: Box<dyn PlayableHandle>,
    auto_stop: Option<JoinHandle<()>>,
}

impl ActiveSession {
    fn teardown(mut self, reason: StopReason) {
        if let Some(timer) = self.auto_stop.take() {
            timer.abort();
        }
        self.handle.pause();
        self.handle.rewind();
        self.handle.release();
        tracing::info!(session = self.id, url = %self.url, ?reason, "Adhan stopped");
    }
}

struct Inner {
    store: AudioStore,
    output: Arc<dyn AudioOutput>,
    active: Mutex<Option<ActiveSession>>,
    /// Dernière génération demandée ; `start` et `stop` l'incrémentent
    generation: AtomicU64,
}

impl Inner {
    /// Termine la session `id` si elle est toujours active
    async fn finish_if(&self, id: SessionId, reason: StopReason) -> bool {
        let mut active = self.active.lock().await;
        match active.as_ref() {
            Some(session) if session.id == id => {
                if let Some(session) = active.take() {
                    session.teardown(reason);
                }
                true
            }
            _ => false,
        }
    }

    fn is_current(&self, id: SessionId) -> bool {
        self.generation.load(Ordering::SeqCst) == id
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(session) = self.active.get_mut().take() {
            session.teardown(StopReason::Stopped);
        }
    }
}

/// Gestionnaire de la session de lecture du processus
///
/// Les clones partagent la même session.
#[derive(Clone)]
pub struct AdhanPlayer {
    inner: Arc<Inner>,
}

impl AdhanPlayer {
    pub fn new(store: AudioStore, output: Arc<dyn AudioOutput>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                output,
                active: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn store(&self) -> &AudioStore {
        &self.inner.store
    }

    /// Copie locale si elle est en cache, l'URL sinon
    pub async fn resolve_source(&self, url: &str) -> PlaybackSource {
        match self.inner.store.cached_path(url).await {
            Some(path) => {
                tracing::debug!(url = %url, path = %path.display(), "Playing from cache");
                PlaybackSource::Cached(path)
            }
            None => {
                tracing::debug!(url = %url, "Not cached, streaming");
                PlaybackSource::Network(url.to_string())
            }
        }
    }

    /// Lance la lecture de `url` en remplaçant la session active
    ///
    /// En cas d'échec le lecteur reste inactif et l'erreur est renvoyée, sans
    /// panique. Si un `stop` ou un autre `start` arrive pendant l'ouverture,
    /// la demande est abandonnée avec [`PlaybackError::Superseded`].
    /// `on_ended` est appelé au plus une fois, seulement si la session
    /// atteint sa fin naturelle en étant toujours active.
    pub async fn start(
        &self,
        url: &str,
        style: AdhanStyle,
        on_ended: Option<OnEnded>,
    ) -> Result<SessionId> {
        let id = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let source = self.resolve_source(url).await;
        let opened = self.inner.output.open(&source).await;

        let mut active = self.inner.active.lock().await;
        if !self.inner.is_current(id) {
            tracing::debug!(session = id, url = %url, "Adhan request superseded");
            if let Ok(handle) = opened {
                handle.release();
            }
            return Err(PlaybackError::Superseded);
        }

        if let Some(previous) = active.take() {
            previous.teardown(StopReason::Replaced);
        }

        let mut handle = match opened {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(url = %url, source = %source, error = %e, "Cannot open adhan");
                return Err(e);
            }
        };

        let ended = match handle.play() {
            Ok(ended) => ended,
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Cannot start adhan");
                handle.release();
                return Err(e);
            }
        };

        self.watch_end(id, ended, on_ended);
        let auto_stop = style.auto_stop_after().map(|after| {
            let weak = Arc::downgrade(&self.inner);
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                if let Some(inner) = weak.upgrade() {
                    inner.finish_if(id, StopReason::AutoStop).await;
                }
            })
        });

        tracing::info!(
            session = id,
            url = %url,
            cached = source.is_cached(),
            style = %style,
            "Adhan started"
        );

        *active = Some(ActiveSession {
            id,
            url: url.to_string(),
            source,
            handle,
            auto_stop,
        });
        Ok(id)
    }

    fn watch_end(&self, id: SessionId, ended: oneshot::Receiver<()>, on_ended: Option<OnEnded>) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            // Err : handle libéré avant la fin
            if ended.await.is_err() {
                return;
            }
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.finish_if(id, StopReason::Ended).await {
                if let Some(callback) = on_ended {
                    callback();
                }
            }
        });
    }

    /// Arrête la session active et annule une demande en cours d'ouverture
    ///
    /// Sans session active, ne fait rien. Renvoie `true` si une session a
    /// été arrêtée.
    pub async fn stop(&self) -> bool {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        match self.inner.active.lock().await.take() {
            Some(session) => {
                session.teardown(StopReason::Stopped);
                true
            }
            None => false,
        }
    }

    /// Point d'entrée de démontage ; le lecteur reste utilisable ensuite
    ///
    /// Les identifiants continuent de croître : un signal tardif d'une
    /// session démontée ne peut pas viser une nouvelle session.
    pub async fn reset(&self) {
        self.stop().await;
    }

    pub async fn is_playing(&self) -> bool {
        self.inner.active.lock().await.is_some()
    }

    pub async fn active_session(&self) -> Option<SessionId> {
        self.inner.active.lock().await.as_ref().map(|s| s.id)
    }

    pub async fn active_url(&self) -> Option<String> {
        self.inner.active.lock().await.as_ref().map(|s| s.url.clone())
    }

    pub async fn active_source(&self) -> Option<PlaybackSource> {
        self.inner
            .active
            .lock()
            .await
            .as_ref()
            .map(|s| s.source.clone())
    }
}
