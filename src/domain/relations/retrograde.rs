//! Retrograde motion, when the provider can report it.

use crate::domain::relations::RelationHandler;
use crate::domain::rule::Condition;
use crate::ports::ephemeris_port::EphemerisProvider;
use chrono::{DateTime, Utc};

pub struct RetrogradeHandler;

impl RelationHandler for RetrogradeHandler {
    fn check(
        &self,
        provider: &dyn EphemerisProvider,
        condition: &Condition,
        at: DateTime<Utc>,
        _default_orb: f64,
    ) -> bool {
        let Some(source) = provider.retrograde() else {
            log::debug!("{} cannot report retrograde motion", provider.name());
            return false;
        };
        match source.is_retrograde(condition.planet, at) {
            Ok(flag) => flag,
            Err(e) => {
                log::warn!("retrograde check for {} failed: {e}", condition.planet);
                false
            }
        }
    }
}
