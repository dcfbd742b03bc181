//! Sign membership. Boundaries are exact; no orb applies.

use crate::domain::relations::{RelationHandler, longitude_or_log};
use crate::domain::rule::Condition;
use crate::domain::zodiac::{Sign, sign_index};
use crate::ports::ephemeris_port::EphemerisProvider;
use chrono::{DateTime, Utc};

pub struct SignHandler;

impl RelationHandler for SignHandler {
    fn check(
        &self,
        provider: &dyn EphemerisProvider,
        condition: &Condition,
        at: DateTime<Utc>,
        _default_orb: f64,
    ) -> bool {
        let target = match condition.target.as_deref().map(str::parse::<Sign>) {
            Some(Ok(sign)) => sign,
            Some(Err(e)) => {
                log::warn!("in_sign on {}: {e}", condition.planet);
                return false;
            }
            None => {
                log::warn!("in_sign on {} has no target", condition.planet);
                return false;
            }
        };
        let Some(lon) = longitude_or_log(provider, condition.planet, at) else {
            return false;
        };
        sign_index(lon) == target.index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::relation::Relation;
    use crate::domain::relations::test_support::{FixedProvider, noon};
    use crate::domain::zodiac::Planet;

    fn in_sign(target: &str) -> Condition {
        Condition::new(Planet::Sun, Relation::InSign).with_target(target)
    }

    #[test]
    fn boundary_is_exact() {
        let inside = FixedProvider::new(&[(Planet::Sun, 29.9)]);
        let outside = FixedProvider::new(&[(Planet::Sun, 30.1)]);
        assert!(SignHandler.check(&inside, &in_sign("Aries"), noon(), 5.0));
        assert!(!SignHandler.check(&outside, &in_sign("Aries"), noon(), 5.0));
        assert!(SignHandler.check(&outside, &in_sign("taurus"), noon(), 5.0));
    }

    #[test]
    fn numeric_targets() {
        let provider = FixedProvider::new(&[(Planet::Sun, 345.0)]);
        assert!(SignHandler.check(&provider, &in_sign("11"), noon(), 5.0));
        assert!(!SignHandler.check(&provider, &in_sign("0"), noon(), 5.0));
    }

    #[test]
    fn unknown_sign_is_unmet() {
        let provider = FixedProvider::new(&[(Planet::Sun, 10.0)]);
        assert!(!SignHandler.check(&provider, &in_sign("ophiuchus"), noon(), 5.0));
        assert!(!SignHandler.check(&provider, &in_sign("12"), noon(), 5.0));
    }
}
