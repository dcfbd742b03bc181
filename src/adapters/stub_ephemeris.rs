//! Deterministic synthetic ephemeris for tests and dry runs.
//!
//! Each body starts at the sum of its key's ASCII codes (mod 360) on
//! 2000-01-01 and moves at a fixed mean daily rate. Ketu is Rahu + 180°.

use crate::domain::error::EphemerisError;
use crate::domain::zodiac::{Planet, normalize_degrees};
use crate::ports::ephemeris_port::EphemerisProvider;
use chrono::{DateTime, NaiveDate, Utc};

pub struct StubEphemeris;

impl StubEphemeris {
    pub fn new() -> Self {
        Self
    }

    fn daily_motion(planet: Planet) -> f64 {
        match planet {
            Planet::Sun => 0.9856,
            Planet::Moon => 13.1764,
            Planet::Mercury => 4.0923,
            Planet::Venus => 1.2,
            Planet::Mars => 0.524,
            Planet::Jupiter => 0.083,
            Planet::Saturn => 0.033,
            Planet::Rahu => -0.03,
            _ => 0.1,
        }
    }

    fn base_longitude(planet: Planet) -> f64 {
        let sum: u32 = planet.key().bytes().map(u32::from).sum();
        f64::from(sum % 360)
    }

    fn days_since_epoch(at: DateTime<Utc>) -> f64 {
        let epoch = NaiveDate::from_ymd_opt(2000, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        (at - epoch).num_seconds() as f64 / 86_400.0
    }
}

impl Default for StubEphemeris {
    fn default() -> Self {
        Self::new()
    }
}

impl EphemerisProvider for StubEphemeris {
    fn name(&self) -> &str {
        "stub"
    }

    fn longitude(&self, planet: Planet, at: DateTime<Utc>) -> Result<f64, EphemerisError> {
        if planet == Planet::Ketu {
            return Ok(normalize_degrees(self.longitude(Planet::Rahu, at)? + 180.0));
        }
        let days = Self::days_since_epoch(at);
        Ok(normalize_degrees(
            Self::base_longitude(planet) + days * Self::daily_motion(planet),
        ))
    }
}
