//! Concrete adapter implementations for ports.

pub mod analytic_ephemeris;
pub mod csv_adapter;
pub mod ephemeris_factory;
pub mod file_config_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
pub mod stub_ephemeris;
#[cfg(feature = "swisseph")]
pub mod swisseph_adapter;
