//! Boussole de qiblah
//!
//! Combine le flux de caps de l'appareil avec la direction calculée pour la
//! position courante.

use crate::bearing::{angular_distance, is_aligned, normalize_degrees, qiblah_bearing, Coordinates};
use crate::sensor::{Sensor, Subscription};
use std::sync::{Arc, Mutex};

/// Lecture brute de l'orientation de l'appareil
///
/// `compass_heading` est un cap absolu (sens horaire depuis le nord) quand la
/// plateforme le fournit ; sinon `alpha` donne la rotation autour de l'axe z,
/// dans le sens antihoraire.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrientationEvent {
    pub alpha: Option<f64>,
    pub compass_heading: Option<f64>,
    pub compass_accuracy: Option<f64>,
}

/// Cap en degrés, sens horaire depuis le nord, dans [0, 360)
///
/// Une lecture sans aucun des deux champs est ignorée.
pub fn compass_heading(event: &OrientationEvent) -> Option<f64> {
    event
        .compass_heading
        .or_else(|| event.alpha.map(|alpha| 360.0 - alpha))
        .filter(|h| h.is_finite())
        .map(normalize_degrees)
}

/// État courant de la boussole
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompassSnapshot {
    /// Direction de la qiblah pour la dernière position connue
    pub qiblah: Option<f64>,
    /// Dernier cap de l'appareil
    pub heading: Option<f64>,
    pub accuracy: Option<f64>,
}

impl CompassSnapshot {
    /// Au moins une lecture d'orientation reçue
    pub fn has_orientation(&self) -> bool {
        self.heading.is_some()
    }

    /// Rotation de l'aiguille de qiblah par rapport au haut de l'appareil
    pub fn pointer_rotation(&self) -> Option<f64> {
        Some(normalize_degrees(self.qiblah? - self.heading?))
    }

    /// Écart restant entre cap et qiblah, dans [0, 180]
    pub fn deviation(&self) -> Option<f64> {
        Some(angular_distance(self.heading?, self.qiblah?))
    }

    pub fn is_aligned(&self) -> bool {
        match (self.heading, self.qiblah) {
            (Some(heading), Some(qiblah)) => is_aligned(heading, qiblah),
            _ => false,
        }
    }
}

/// Boussole abonnée aux capteurs d'orientation et de position
///
/// Les deux abonnements sont libérés quand la boussole est détruite ou via
/// [`Compass::detach`].
pub struct Compass {
    state: Arc<Mutex<CompassSnapshot>>,
    subscriptions: Vec<Subscription>,
}

impl Compass {
    /// Boussole sans capteur, alimentée par [`Compass::set_location`]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CompassSnapshot::default())),
            subscriptions: Vec::new(),
        }
    }

    /// Boussole qui suit les capteurs donnés
    pub fn attach(
        orientation: &dyn Sensor<OrientationEvent>,
        location: &dyn Sensor<Coordinates>,
    ) -> Self {
        let mut compass = Self::new();

        let state = compass.state.clone();
        compass
            .subscriptions
            .push(orientation.subscribe(Arc::new(move |event: &OrientationEvent| {
                if let Some(heading) = compass_heading(event) {
                    if let Ok(mut s) = state.lock() {
                        s.heading = Some(heading);
                        if event.compass_accuracy.is_some() {
                            s.accuracy = event.compass_accuracy;
                        }
                    }
                }
            })));

        let state = compass.state.clone();
        compass
            .subscriptions
            .push(location.subscribe(Arc::new(move |coords: &Coordinates| {
                Self::update_location(&state, *coords);
            })));

        compass
    }

    fn update_location(state: &Mutex<CompassSnapshot>, coords: Coordinates) {
        if !coords.is_valid() {
            tracing::warn!(?coords, "Ignoring invalid location");
            return;
        }
        let bearing = qiblah_bearing(coords);
        tracing::debug!(?coords, bearing, "Qiblah bearing updated");
        if let Ok(mut s) = state.lock() {
            s.qiblah = Some(bearing);
        }
    }

    /// Recalcule la direction pour une nouvelle position
    pub fn set_location(&self, coords: Coordinates) {
        Self::update_location(&self.state, coords);
    }

    pub fn snapshot(&self) -> CompassSnapshot {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or_default()
    }

    /// Cesse de suivre les capteurs en gardant le dernier état
    pub fn detach(&mut self) {
        self.subscriptions.clear();
    }
}

impl Default for Compass {
    fn default() -> Self {
        Self::new()
    }
}
