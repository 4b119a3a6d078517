//! Capteurs de l'appareil
//!
//! Les lectures d'orientation et de position arrivent par callbacks. Le trait
//! [`Sensor`] permet de remplacer la source de la plateforme par une source
//! déterministe.

use std::sync::{Arc, Mutex};

/// Callback appelé à chaque lecture
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Source de lectures à laquelle on s'abonne
pub trait Sensor<T>: Send + Sync {
    /// Enregistre `callback` ; les lectures cessent quand le handle est détruit
    fn subscribe(&self, callback: Callback<T>) -> Subscription;
}

/// Abonnement en cours
///
/// Se désabonne à la destruction, ou explicitement via
/// [`Subscription::unsubscribe`].
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Abonnement sans rien à libérer
    pub fn detached() -> Self {
        Self { unsubscribe: None }
    }

    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

struct Listeners<T> {
    next_id: u64,
    callbacks: Vec<(u64, Callback<T>)>,
}

/// Capteur piloté par des appels explicites à [`ManualSensor::emit`]
///
/// Sert aux tests et à la CLI, où les lectures viennent des arguments.
pub struct ManualSensor<T> {
    listeners: Arc<Mutex<Listeners<T>>>,
}

impl<T> Clone for ManualSensor<T> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<T> Default for ManualSensor<T> {
    fn default() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                callbacks: Vec::new(),
            })),
        }
    }
}

impl<T: Send + Sync + 'static> ManualSensor<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transmet `reading` à tous les abonnés actuels
    pub fn emit(&self, reading: T) {
        // callbacks appelés hors verrou : ils peuvent (se dés)abonner
        let callbacks: Vec<Callback<T>> = match self.listeners.lock() {
            Ok(listeners) => listeners.callbacks.iter().map(|(_, cb)| cb.clone()).collect(),
            Err(_) => {
                tracing::error!("Sensor listener lock poisoned, dropping reading");
                return;
            }
        };

        for callback in callbacks {
            callback(&reading);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners
            .lock()
            .map(|listeners| listeners.callbacks.len())
            .unwrap_or(0)
    }
}

impl<T: Send + Sync + 'static> Sensor<T> for ManualSensor<T> {
    fn subscribe(&self, callback: Callback<T>) -> Subscription {
        let id = match self.listeners.lock() {
            Ok(mut listeners) => {
                let id = listeners.next_id;
                listeners.next_id += 1;
                listeners.callbacks.push((id, callback));
                id
            }
            Err(_) => return Subscription::detached(),
        };

        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                if let Ok(mut listeners) = listeners.lock() {
                    listeners.callbacks.retain(|(cb_id, _)| *cb_id != id);
                }
            }
        })
    }
}
