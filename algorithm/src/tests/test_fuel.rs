use crate::{FuelDerivation, derive_fuel_level, validate_fuel_level};
use common::error::Error;

#[test]
fn linear_consumption_over_range() {
    let level = derive_fuel_level(80.0, 5.0, Some(50.0)).unwrap();
    assert_eq!(level, FuelDerivation::Level(70.0));
}

#[test]
fn missing_or_zero_range_is_skipped() {
    assert_eq!(derive_fuel_level(80.0, 5.0, None).unwrap(), FuelDerivation::Skipped);
    assert_eq!(derive_fuel_level(80.0, 5.0, Some(0.0)).unwrap(), FuelDerivation::Skipped);
    assert_eq!(derive_fuel_level(80.0, 5.0, Some(-3.0)).unwrap(), FuelDerivation::Skipped);
    assert_eq!(
        derive_fuel_level(80.0, 5.0, Some(f64::NAN)).unwrap(),
        FuelDerivation::Skipped
    );
}

#[test]
fn level_never_drops_below_zero() {
    let level = derive_fuel_level(10.0, 500.0, Some(50.0)).unwrap();
    assert_eq!(level, FuelDerivation::Level(0.0));
}

#[test]
fn level_never_exceeds_hundred() {
    let level = derive_fuel_level(140.0, 0.0, Some(50.0)).unwrap();
    assert_eq!(level, FuelDerivation::Level(100.0));
}

#[test]
fn level_stays_in_bounds_for_many_inputs() {
    let levels = [-20.0, 0.0, 12.5, 50.0, 99.9, 100.0, 250.0];
    let distances = [0.0, 0.001, 1.0, 37.5, 1e6];
    let ranges = [Some(1e-9), Some(0.5), Some(50.0), Some(1e9), None, Some(0.0)];
    for current in levels {
        for distance in distances {
            for range in ranges {
                match derive_fuel_level(current, distance, range).unwrap() {
                    FuelDerivation::Level(level) => {
                        assert!(level.is_finite());
                        assert!((0.0..=100.0).contains(&level));
                    }
                    FuelDerivation::Skipped => assert!(!matches!(range, Some(r) if r > 0.0)),
                }
            }
        }
    }
}

#[test]
fn invalid_inputs_are_rejected() {
    assert!(matches!(
        derive_fuel_level(f64::NAN, 1.0, Some(50.0)),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        derive_fuel_level(80.0, f64::INFINITY, Some(50.0)),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        derive_fuel_level(80.0, -1.0, Some(50.0)),
        Err(Error::Validation(_))
    ));
}

#[test]
fn validate_rejects_non_finite_levels() {
    assert!(validate_fuel_level(f64::NAN).is_err());
    assert!(validate_fuel_level(f64::INFINITY).is_err());
    assert!(validate_fuel_level(-0.5).is_err());
    assert!(validate_fuel_level(100.5).is_err());
    assert_eq!(validate_fuel_level(42.0), Ok(42.0));
}
