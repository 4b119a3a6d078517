//! # miqqiblah - Direction de la qiblah pour Miqat
//!
//! - [`bearing`] : cap orthodromique vers la Kaaba, fonction pure
//! - [`compass`] : normalisation du cap et état d'alignement
//! - [`sensor`] : abonnement/désabonnement aux lectures des capteurs
//!
//! ```
//! use miqqiblah::{qiblah_bearing, Coordinates};
//!
//! let london = Coordinates::new(51.5074, -0.1278);
//! let bearing = qiblah_bearing(london);
//! assert!((118.0..120.0).contains(&bearing));
//! ```

pub mod bearing;
pub mod compass;
pub mod sensor;

pub use bearing::{
    angular_distance, initial_bearing, is_aligned, normalize_degrees, qiblah_bearing,
    Coordinates, ALIGNMENT_TOLERANCE_DEG, KAABA,
};
pub use compass::{compass_heading, Compass, CompassSnapshot, OrientationEvent};
pub use sensor::{Callback, ManualSensor, Sensor, Subscription};
