//! Low-order lunar ephemeris

mod calculator;

pub use calculator::*;
