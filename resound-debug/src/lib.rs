//! Debug logging for the sound pipeline crates.

pub mod logging;
