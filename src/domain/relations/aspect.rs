//! Angular aspects, generic or bound to a fixed angle.
//!
//! The angle comes from `condition.value` when numeric, else the bound
//! angle; with neither the condition cannot be met.

use crate::domain::relations::{RelationHandler, pair_longitudes};
use crate::domain::rule::Condition;
use crate::ports::ephemeris_port::EphemerisProvider;
use chrono::{DateTime, Utc};

pub struct AspectHandler {
    fixed_angle: Option<f64>,
}

impl AspectHandler {
    pub fn generic() -> Self {
        Self { fixed_angle: None }
    }

    pub fn fixed(angle: f64) -> Self {
        Self {
            fixed_angle: Some(angle),
        }
    }

    pub fn angle_for(&self, condition: &Condition) -> Option<f64> {
        condition.value.or(self.fixed_angle)
    }
}

impl RelationHandler for AspectHandler {
    fn check(
        &self,
        provider: &dyn EphemerisProvider,
        condition: &Condition,
        at: DateTime<Utc>,
        default_orb: f64,
    ) -> bool {
        let Some(angle) = self.angle_for(condition) else {
            log::warn!(
                "{} on {} has no aspect angle",
                condition.relation,
                condition.planet
            );
            return false;
        };
        let Some((a, b)) = pair_longitudes(provider, condition, at) else {
            return false;
        };
        let distance = provider.angular_distance(a, b);
        let orb = condition.effective_orb(default_orb);
        log::debug!(
            "{} {angle}° aspect to {:?}: distance {distance:.3} orb {orb}",
            condition.planet,
            condition.target
        );
        (distance - angle).abs() <= orb
    }
}
