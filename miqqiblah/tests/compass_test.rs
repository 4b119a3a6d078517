use miqqiblah::{
    compass_heading, qiblah_bearing, Compass, Coordinates, ManualSensor, OrientationEvent,
};
use proptest::prelude::*;

fn heading_event(heading: f64) -> OrientationEvent {
    OrientationEvent {
        compass_heading: Some(heading),
        ..Default::default()
    }
}

#[test]
fn test_compass_follows_sensors() {
    let orientation = ManualSensor::<OrientationEvent>::new();
    let location = ManualSensor::<Coordinates>::new();
    let compass = Compass::attach(&orientation, &location);

    assert!(!compass.snapshot().has_orientation());
    assert!(compass.snapshot().qiblah.is_none());

    let london = Coordinates::new(51.5074, -0.1278);
    location.emit(london);
    orientation.emit(OrientationEvent {
        compass_heading: Some(119.5),
        compass_accuracy: Some(10.0),
        alpha: None,
    });

    let snap = compass.snapshot();
    assert_eq!(snap.qiblah, Some(qiblah_bearing(london)));
    assert_eq!(snap.heading, Some(119.5));
    assert_eq!(snap.accuracy, Some(10.0));
    assert!(snap.is_aligned());

    orientation.emit(heading_event(200.0));
    assert!(!compass.snapshot().is_aligned());
    // la précision précédente est conservée
    assert_eq!(compass.snapshot().accuracy, Some(10.0));
}

#[test]
fn test_alpha_fallback() {
    let event = OrientationEvent {
        alpha: Some(90.0),
        ..Default::default()
    };
    assert_eq!(compass_heading(&event), Some(270.0));

    let event = OrientationEvent {
        alpha: Some(0.0),
        ..Default::default()
    };
    assert_eq!(compass_heading(&event), Some(0.0));

    assert_eq!(compass_heading(&OrientationEvent::default()), None);
}

#[test]
fn test_absolute_heading_wins_over_alpha() {
    let event = OrientationEvent {
        alpha: Some(90.0),
        compass_heading: Some(0.0),
        compass_accuracy: None,
    };
    assert_eq!(compass_heading(&event), Some(0.0));
}

#[test]
fn test_detach_stops_updates() {
    let orientation = ManualSensor::<OrientationEvent>::new();
    let location = ManualSensor::<Coordinates>::new();
    let mut compass = Compass::attach(&orientation, &location);
    assert_eq!(orientation.subscriber_count(), 1);

    orientation.emit(heading_event(10.0));
    compass.detach();
    orientation.emit(heading_event(20.0));

    assert_eq!(compass.snapshot().heading, Some(10.0));
    assert_eq!(orientation.subscriber_count(), 0);
    assert_eq!(location.subscriber_count(), 0);
}

#[test]
fn test_invalid_location_is_ignored() {
    let compass = Compass::new();
    compass.set_location(Coordinates::new(120.0, 0.0));
    assert!(compass.snapshot().qiblah.is_none());
}

#[test]
fn test_pointer_rotation() {
    let compass = Compass::new();
    compass.set_location(Coordinates::new(0.0, miqqiblah::KAABA.longitude));
    assert!(compass.snapshot().pointer_rotation().is_none());

    let orientation = ManualSensor::<OrientationEvent>::new();
    let location = ManualSensor::<Coordinates>::new();
    let compass = Compass::attach(&orientation, &location);
    location.emit(Coordinates::new(0.0, miqqiblah::KAABA.longitude));
    orientation.emit(heading_event(90.0));

    let rotation = compass.snapshot().pointer_rotation().unwrap();
    assert!((rotation - 270.0).abs() < 1e-9);
}

proptest! {
    #[test]
    fn bearing_is_within_range(lat in -90.0f64..=90.0, lng in -180.0f64..=180.0) {
        let bearing = qiblah_bearing(Coordinates::new(lat, lng));
        prop_assert!((0.0..360.0).contains(&bearing));
    }

    #[test]
    fn bearing_is_deterministic(lat in -90.0f64..=90.0, lng in -180.0f64..=180.0) {
        let coords = Coordinates::new(lat, lng);
        prop_assert_eq!(qiblah_bearing(coords).to_bits(), qiblah_bearing(coords).to_bits());
    }

    #[test]
    fn heading_is_normalized(alpha in -720.0f64..720.0) {
        let event = OrientationEvent { alpha: Some(alpha), ..Default::default() };
        let heading = compass_heading(&event).unwrap();
        prop_assert!((0.0..360.0).contains(&heading));
    }
}
