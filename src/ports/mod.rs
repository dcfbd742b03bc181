//! Port traits: the seams between the engine and its collaborators.

pub mod config_port;
pub mod ephemeris_port;
pub mod event_store_port;
pub mod market_data_port;
pub mod rule_store_port;
