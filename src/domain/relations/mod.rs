//! Relation handlers and the registry that dispatches conditions to them.
//!
//! Every handler is fail-closed: an ephemeris error, a malformed target or
//! a missing capability makes the condition unmet and is logged, never
//! raised. Nine named aspects share [`AspectHandler`] with different bound
//! angles.

pub mod aspect;
pub mod axis;
pub mod combust;
pub mod conjunction;
pub mod house;
pub mod nakshatra;
pub mod retrograde;
pub mod sign;

pub use aspect::AspectHandler;
pub use axis::AxisHandler;
pub use combust::{CombustHandler, DEFAULT_COMBUSTION_ORB};
pub use conjunction::ConjunctionHandler;
pub use house::HouseRelativeHandler;
pub use nakshatra::NakshatraOwnerHandler;
pub use retrograde::RetrogradeHandler;
pub use sign::SignHandler;

use crate::domain::relation::Relation;
use crate::domain::rule::Condition;
use crate::domain::zodiac::Planet;
use crate::ports::ephemeris_port::EphemerisProvider;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

pub trait RelationHandler: Send + Sync {
    fn check(
        &self,
        provider: &dyn EphemerisProvider,
        condition: &Condition,
        at: DateTime<Utc>,
        default_orb: f64,
    ) -> bool;
}

/// Longitude of `planet`, or `None` after logging the failure.
pub(crate) fn longitude_or_log(
    provider: &dyn EphemerisProvider,
    planet: Planet,
    at: DateTime<Utc>,
) -> Option<f64> {
    match provider.longitude(planet, at) {
        Ok(lon) => Some(lon),
        Err(e) => {
            log::warn!("{} longitude unavailable at {at}: {e}", planet);
            None
        }
    }
}

/// Longitudes of the condition's planet and its target planet.
pub(crate) fn pair_longitudes(
    provider: &dyn EphemerisProvider,
    condition: &Condition,
    at: DateTime<Utc>,
) -> Option<(f64, f64)> {
    let target = match condition.target_planet() {
        Ok(target) => target,
        Err(e) => {
            log::warn!("{} condition on {}: {e}", condition.relation, condition.planet);
            return None;
        }
    };
    let a = longitude_or_log(provider, condition.planet, at)?;
    let b = longitude_or_log(provider, target, at)?;
    Some((a, b))
}

pub struct RelationRegistry {
    handlers: HashMap<Relation, Arc<dyn RelationHandler>>,
}

impl RelationRegistry {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Every relation bound to its handler; `combustion_orbs` feeds the
    /// per-planet overrides of the combustion check.
    pub fn standard(combustion_orbs: HashMap<Planet, f64>) -> Self {
        let mut registry = Self::empty();
        registry.register(Relation::ConjunctWith, Arc::new(ConjunctionHandler));
        registry.register(Relation::AspectWith, Arc::new(AspectHandler::generic()));
        registry.register(Relation::InAxis, Arc::new(AxisHandler));
        registry.register(Relation::InNakshatraOwnedBy, Arc::new(NakshatraOwnerHandler));
        registry.register(Relation::InSign, Arc::new(SignHandler));
        registry.register(Relation::InHouseRelativeTo, Arc::new(HouseRelativeHandler));
        registry.register(
            Relation::CombustBySun,
            Arc::new(CombustHandler::new(combustion_orbs)),
        );
        registry.register(Relation::Retrograde, Arc::new(RetrogradeHandler));
        for relation in Relation::ALL {
            if let Some(angle) = relation.fixed_angle() {
                registry.register(relation, Arc::new(AspectHandler::fixed(angle)));
            }
        }
        registry
    }

    /// Binds `relation` to `handler`, replacing any previous binding.
    pub fn register(&mut self, relation: Relation, handler: Arc<dyn RelationHandler>) {
        self.handlers.insert(relation, handler);
    }

    pub fn get(&self, relation: Relation) -> Option<Arc<dyn RelationHandler>> {
        self.handlers.get(&relation).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for RelationRegistry {
    fn default() -> Self {
        Self::standard(HashMap::new())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::error::EphemerisError;
    use crate::ports::ephemeris_port::RetrogradeSource;
    use chrono::TimeZone;

    /// Fixed positions; bodies without a position fail to compute.
    pub struct FixedProvider {
        pub positions: HashMap<Planet, f64>,
        pub retrograde: Option<HashMap<Planet, bool>>,
    }

    impl FixedProvider {
        pub fn new(positions: &[(Planet, f64)]) -> Self {
            Self {
                positions: positions.iter().copied().collect(),
                retrograde: None,
            }
        }

        pub fn with_retrograde(mut self, flags: &[(Planet, bool)]) -> Self {
            self.retrograde = Some(flags.iter().copied().collect());
            self
        }
    }

    impl EphemerisProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn longitude(&self, planet: Planet, _at: DateTime<Utc>) -> Result<f64, EphemerisError> {
            self.positions
                .get(&planet)
                .copied()
                .ok_or_else(|| EphemerisError::CalculationFailed {
                    body: planet.key().into(),
                    jd: 0.0,
                    reason: "no position scripted".into(),
                })
        }

        fn retrograde(&self) -> Option<&dyn RetrogradeSource> {
            self.retrograde.as_ref().map(|_| self as &dyn RetrogradeSource)
        }
    }

    impl RetrogradeSource for FixedProvider {
        fn is_retrograde(&self, planet: Planet, _at: DateTime<Utc>) -> Result<bool, EphemerisError> {
            self.retrograde
                .as_ref()
                .and_then(|flags| flags.get(&planet).copied())
                .ok_or_else(|| EphemerisError::CalculationFailed {
                    body: planet.key().into(),
                    jd: 0.0,
                    reason: "no retrograde flag scripted".into(),
                })
        }
    }

    pub fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }
}
