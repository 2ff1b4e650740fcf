//! Shared model, configuration and data sources for world-radio.

pub mod config;
pub mod directory;
pub mod geo;
pub mod insight;
pub mod platform;
pub mod protocol;
pub mod state;
