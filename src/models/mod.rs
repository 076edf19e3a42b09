pub mod lunar;

pub use lunar::*;
