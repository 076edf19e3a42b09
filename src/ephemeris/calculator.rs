//! Closed-form lunar position
//!
//! Mean elements with a single periodic term each for longitude and latitude,
//! rotated from ecliptic to equatorial coordinates. Accuracy is on the order
//! of a degree, which is all the stream needs.

use chrono::{Datelike, Local, NaiveDateTime, Timelike};

use crate::models::{EclipticPosition, EquatorialPosition};

/// Julian Day of the J2000.0 epoch
pub const J2000: f64 = 2451545.0;

// Mean elements at J2000.0 (degrees) and daily motion (degrees per day)
const MEAN_LONGITUDE_J2000: f64 = 218.316;
const MEAN_LONGITUDE_RATE: f64 = 13.176396;
const MEAN_ANOMALY_J2000: f64 = 134.963;
const MEAN_ANOMALY_RATE: f64 = 13.064993;
const LATITUDE_ARGUMENT_J2000: f64 = 93.272;
const LATITUDE_ARGUMENT_RATE: f64 = 13.229350;

// Amplitudes of the periodic terms (degrees)
const EQUATION_OF_CENTRE: f64 = 6.289;
const LATITUDE_AMPLITUDE: f64 = 5.128;

const OBLIQUITY_J2000: f64 = 23.439;
const OBLIQUITY_RATE: f64 = 0.0000004;

/// Normalize an angle into [0, 360)
pub fn normalize_degrees(angle: f64) -> f64 {
    let normalized = angle.rem_euclid(360.0);
    // rem_euclid rounds tiny negative angles up to exactly 360.0
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Convert a calendar date/time to Julian Day (Gregorian calendar).
///
/// Sub-second precision of `datetime` is kept in the day fraction.
pub fn datetime_to_julian_day(datetime: NaiveDateTime) -> f64 {
    let mut year = datetime.year();
    let mut month = datetime.month() as i32;
    let day = datetime.day() as f64;

    if month <= 2 {
        year -= 1;
        month += 12;
    }

    let century = (year as f64 / 100.0).floor();
    let leap_correction = 2.0 - century + (century / 4.0).floor();

    let julian_day = (365.25 * (year + 4716) as f64).floor()
        + (30.6001 * (month + 1) as f64).floor()
        + day
        + leap_correction
        - 1524.5;

    let time = datetime.time();
    let second = time.second() as f64 + time.nanosecond() as f64 / 1e9;
    let hour = time.hour() as f64 + time.minute() as f64 / 60.0 + second / 3600.0;

    julian_day + hour / 24.0
}

/// Days elapsed since J2000.0
pub fn days_since_j2000(julian_day: f64) -> f64 {
    julian_day - J2000
}

/// Mean obliquity of the ecliptic (degrees), linear in time
pub fn obliquity(days: f64) -> f64 {
    OBLIQUITY_J2000 - OBLIQUITY_RATE * days
}

/// Ecliptic position of the Moon `days` after J2000.0
pub fn moon_ecliptic_position(days: f64) -> EclipticPosition {
    let mean_longitude = normalize_degrees(MEAN_LONGITUDE_J2000 + MEAN_LONGITUDE_RATE * days);
    let mean_anomaly = normalize_degrees(MEAN_ANOMALY_J2000 + MEAN_ANOMALY_RATE * days);
    let latitude_argument =
        normalize_degrees(LATITUDE_ARGUMENT_J2000 + LATITUDE_ARGUMENT_RATE * days);

    EclipticPosition {
        mean_longitude,
        mean_anomaly,
        latitude_argument,
        longitude: mean_longitude + EQUATION_OF_CENTRE * mean_anomaly.to_radians().sin(),
        latitude: LATITUDE_AMPLITUDE * latitude_argument.to_radians().sin(),
    }
}

/// Rotate an ecliptic position into equatorial coordinates
pub fn ecliptic_to_equatorial(ecliptic: &EclipticPosition, obliquity: f64) -> EquatorialPosition {
    let lambda = ecliptic.longitude.to_radians();
    let beta = ecliptic.latitude.to_radians();
    let epsilon = obliquity.to_radians();

    let alpha = (epsilon.cos() * lambda.sin()).atan2(lambda.cos());
    let delta = (beta.sin() * epsilon.cos() + beta.cos() * epsilon.sin() * lambda.sin()).asin();

    EquatorialPosition {
        ra_hours: normalize_degrees(alpha.to_degrees()) / 15.0,
        declination: delta.to_degrees(),
    }
}

/// Apparent RA/Dec of the Moon at the given local instant
pub fn compute_position(instant: NaiveDateTime) -> EquatorialPosition {
    let days = days_since_j2000(datetime_to_julian_day(instant));
    let ecliptic = moon_ecliptic_position(days);
    ecliptic_to_equatorial(&ecliptic, obliquity(days))
}

/// Apparent RA/Dec of the Moon at the system wall-clock time
pub fn moon_position_now() -> EquatorialPosition {
    compute_position(Local::now().naive_local())
}
