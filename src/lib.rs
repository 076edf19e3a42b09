//! Lunacast - Moon position stream
//!
//! Computes the Moon's apparent right ascension and declination from a
//! low-order analytical series and pushes it to WebSocket clients on a fixed
//! cadence.

pub mod ephemeris;
pub mod models;
pub mod server;

pub use server::{MoonServer, ServerConfig};
