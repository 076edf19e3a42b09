use std::fmt;

/// Message sent once to every client right after the upgrade
pub const WELCOME_MESSAGE: &str = "Calculating Moon RA/Dec... \n";

/// Geocentric ecliptic position of the Moon from the low-order series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EclipticPosition {
    /// Mean longitude (0-360 degrees)
    pub mean_longitude: f64,
    /// Mean anomaly (0-360 degrees)
    pub mean_anomaly: f64,
    /// Argument of latitude (0-360 degrees)
    pub latitude_argument: f64,
    /// Longitude after the equation-of-centre term (λ), not renormalised
    pub longitude: f64,
    /// Ecliptic latitude (β)
    pub latitude: f64,
}

/// Right ascension split into sexagesimal hour, minute and second
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RightAscension {
    pub hours: u32,
    pub minutes: u32,
    /// Exact remainder in [0, 60), not rounded
    pub seconds: f64,
}

impl RightAscension {
    /// Decompose decimal hours in [0, 24).
    ///
    /// Hour and minute are truncated; seconds keep the full remainder, so
    /// display rounding can produce `60.00` for a remainder of 59.995 or more.
    pub fn from_hours(decimal_hours: f64) -> Self {
        let hours = decimal_hours.trunc();
        let total_minutes = (decimal_hours - hours) * 60.0;
        let minutes = total_minutes.trunc();
        let seconds = (total_minutes - minutes) * 60.0;

        Self {
            hours: hours as u32,
            minutes: minutes as u32,
            seconds,
        }
    }
}

impl fmt::Display for RightAscension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:05.2}",
            self.hours, self.minutes, self.seconds
        )
    }
}

/// Apparent equatorial position of the Moon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquatorialPosition {
    /// Right ascension in decimal hours, [0, 24)
    pub ra_hours: f64,
    /// Declination in degrees (direct asin result, not clamped)
    pub declination: f64,
}

impl EquatorialPosition {
    pub fn right_ascension(&self) -> RightAscension {
        RightAscension::from_hours(self.ra_hours)
    }

    /// Text frame pushed to clients on every tick
    pub fn to_message(&self) -> String {
        format!(
            "Moon RA: {}, Dec: {:.3}°",
            self.right_ascension(),
            self.declination
        )
    }
}
