//! Nakshatra ownership: the planet's lunar mansion is ruled by the target.

use crate::domain::relations::{RelationHandler, longitude_or_log};
use crate::domain::rule::Condition;
use crate::ports::ephemeris_port::EphemerisProvider;
use chrono::{DateTime, Utc};

pub struct NakshatraOwnerHandler;

impl RelationHandler for NakshatraOwnerHandler {
    fn check(
        &self,
        provider: &dyn EphemerisProvider,
        condition: &Condition,
        at: DateTime<Utc>,
        _default_orb: f64,
    ) -> bool {
        let Some(target) = condition.target.as_deref() else {
            log::warn!("nakshatra ownership on {} has no target", condition.planet);
            return false;
        };
        let Some(lon) = longitude_or_log(provider, condition.planet, at) else {
            return false;
        };
        let owner = provider.nakshatra_owner(provider.nakshatra_index(lon));
        owner.key().eq_ignore_ascii_case(target.trim())
    }
}
