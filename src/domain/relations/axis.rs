//! Axis: the two bodies sit on opposite ends of a line (within orb of 180°).

use crate::domain::relations::{RelationHandler, pair_longitudes};
use crate::domain::rule::Condition;
use crate::ports::ephemeris_port::EphemerisProvider;
use chrono::{DateTime, Utc};

pub struct AxisHandler;

impl RelationHandler for AxisHandler {
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
        (distance - 180.0).abs() <= condition.effective_orb(default_orb)
    }
}
