//! Conjunction: two bodies within orb of each other.

use crate::domain::relations::{RelationHandler, pair_longitudes};
use crate::domain::rule::Condition;
use crate::ports::ephemeris_port::EphemerisProvider;
use chrono::{DateTime, Utc};

pub struct ConjunctionHandler;

impl RelationHandler for ConjunctionHandler {
    fn check(
        &self,
        provider: &dyn EphemerisProvider,
        condition: &Condition,
        at: DateTime<Utc>,
        default_orb: f64,
    ) -> bool {
        let Some((a, b)) = pair_longitudes(provider, condition, at) else {
            return false;
        };
        let distance = provider.angular_distance(a, b);
        let orb = condition.effective_orb(default_orb);
        log::debug!(
            "{} conjunct {:?}: distance {distance:.3} orb {orb}",
            condition.planet,
            condition.target
        );
        distance <= orb
    }
}
