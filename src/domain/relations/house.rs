//! House counted from a reference planet, 1-indexed in 30° steps.

use crate::domain::relations::{RelationHandler, pair_longitudes};
use crate::domain::rule::Condition;
use crate::domain::zodiac::relative_house;
use crate::ports::ephemeris_port::EphemerisProvider;
use chrono::{DateTime, Utc};

pub struct HouseRelativeHandler;

impl RelationHandler for HouseRelativeHandler {
    fn check(
        &self,
        provider: &dyn EphemerisProvider,
        condition: &Condition,
        at: DateTime<Utc>,
        _default_orb: f64,
    ) -> bool {
        let Some(house) = condition.value else {
            log::warn!("in_house_relative_to on {} has no house value", condition.planet);
            return false;
        };
        if house.fract() != 0.0 || !(1.0..=12.0).contains(&house) {
            log::warn!("in_house_relative_to on {} has house {house}, expected 1..=12", condition.planet);
            return false;
        }
        let Some((lon, reference)) = pair_longitudes(provider, condition, at) else {
            return false;
        };
        relative_house(lon, reference) == house as u32
    }
}
