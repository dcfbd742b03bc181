//! Combustion: a planet too close to the Sun.
//!
//! Orb resolution: the condition's own orb, else the configured override
//! for the planet, else [`DEFAULT_COMBUSTION_ORB`].

use crate::domain::relations::{RelationHandler, longitude_or_log};
use crate::domain::rule::Condition;
use crate::domain::zodiac::Planet;
use crate::ports::ephemeris_port::EphemerisProvider;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub const DEFAULT_COMBUSTION_ORB: f64 = 8.0;

pub struct CombustHandler {
    overrides: HashMap<Planet, f64>,
}

impl CombustHandler {
    pub fn new(overrides: HashMap<Planet, f64>) -> Self {
        Self { overrides }
    }

    pub fn orb_for(&self, condition: &Condition) -> f64 {
        condition
            .orb
            .or_else(|| self.overrides.get(&condition.planet).copied())
            .unwrap_or(DEFAULT_COMBUSTION_ORB)
    }
}

impl RelationHandler for CombustHandler {
    fn check(
        &self,
        provider: &dyn EphemerisProvider,
        condition: &Condition,
        at: DateTime<Utc>,
        _default_orb: f64,
    ) -> bool {
        let Some(lon) = longitude_or_log(provider, condition.planet, at) else {
            return false;
        };
        let Some(sun) = longitude_or_log(provider, Planet::Sun, at) else {
            return false;
        };
        provider.angular_distance(lon, sun) <= self.orb_for(condition)
    }
}
