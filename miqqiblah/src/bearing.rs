//! Cap orthodromique vers la Kaaba

use serde::{Deserialize, Serialize};

/// Point du globe, en degrés décimaux
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Latitude dans [-90, 90] et longitude dans [-180, 180]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// La Kaaba, La Mecque
pub const KAABA: Coordinates = Coordinates::new(21.4225, 39.8262);

/// Écart angulaire maximal entre cap et qiblah pour être « aligné »
pub const ALIGNMENT_TOLERANCE_DEG: f64 = 5.0;

/// Ramène un angle en degrés dans [0, 360)
pub fn normalize_degrees(degrees: f64) -> f64 {
    let reduced = degrees.rem_euclid(360.0);
    // rem_euclid peut arrondir à 360.0 pour de très petites valeurs négatives
    if reduced >= 360.0 {
        0.0
    } else {
        reduced
    }
}

/// Cap initial de l'orthodromie de `from` vers `to`, dans [0, 360)
///
/// Sur la cible exacte, atan2(0, 0) = 0 : le nord.
/// La latitude de la cible ne doit pas être un pôle.
pub fn initial_bearing(from: Coordinates, to: Coordinates) -> f64 {
    if from == to {
        return 0.0;
    }

    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let delta_lambda = (to.longitude - from.longitude).to_radians();

    let y = delta_lambda.sin();
    let x = phi1.cos() * phi2.tan() - phi1.sin() * delta_lambda.cos();

    normalize_degrees(y.atan2(x).to_degrees())
}

/// Direction de la qiblah depuis `observer`, sens horaire depuis le nord vrai
pub fn qiblah_bearing(observer: Coordinates) -> f64 {
    initial_bearing(observer, KAABA)
}

/// Plus petit angle entre deux caps, dans [0, 180]
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let diff = normalize_degrees(a - b);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Le cap de l'appareil pointe-t-il vers la qiblah, à la tolérance près ?
///
/// Écart symétrique : moins de 5° d'un côté comme de l'autre de la qiblah
/// (choix noté dans la décision 5 de DESIGN.md).
pub fn is_aligned(heading: f64, qiblah: f64) -> bool {
    angular_distance(heading, qiblah) < ALIGNMENT_TOLERANCE_DEG
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() < tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_known_cities() {
        // London ~119°, New York ~58.5°, Jakarta ~295°
        assert_close(qiblah_bearing(Coordinates::new(51.5074, -0.1278)), 119.0, 0.5);
        assert_close(qiblah_bearing(Coordinates::new(40.7128, -74.0060)), 58.5, 0.5);
        assert_close(qiblah_bearing(Coordinates::new(-6.2088, 106.8456)), 295.1, 0.5);
    }

    #[test]
    fn test_due_directions() {
        // Same meridian, south of the Kaaba: face north
        assert_close(qiblah_bearing(Coordinates::new(0.0, KAABA.longitude)), 0.0, 1e-9);
        // Same meridian, north of the Kaaba: face south
        assert_close(qiblah_bearing(Coordinates::new(50.0, KAABA.longitude)), 180.0, 1e-9);
    }

    #[test]
    fn test_at_the_kaaba_is_north() {
        assert_eq!(qiblah_bearing(KAABA), 0.0);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(725.0), 5.0);
        assert!(normalize_degrees(-1e-20) < 360.0);
    }

    #[test]
    fn test_alignment_is_symmetric() {
        assert!(is_aligned(118.0, 119.0));
        assert!(is_aligned(120.0, 119.0));
        assert!(is_aligned(358.0, 2.0));
        assert!(!is_aligned(125.0, 119.0));
        assert_eq!(angular_distance(10.0, 350.0), 20.0);
    }

    #[test]
    fn test_coordinates_validation() {
        assert!(Coordinates::new(45.0, 7.0).is_valid());
        assert!(!Coordinates::new(95.0, 7.0).is_valid());
        assert!(!Coordinates::new(f64::NAN, 7.0).is_valid());
    }
}
