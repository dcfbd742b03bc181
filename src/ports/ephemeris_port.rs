//! Ephemeris provider port.
//!
//! Every backend answers the same question: where is a body on the ecliptic
//! at a given instant. Derived quantities (nakshatra, circular distance) are
//! provided methods so all backends agree on them exactly. Retrograde state
//! is an optional capability exposed through [`EphemerisProvider::retrograde`].

use crate::domain::error::{AstroError, EphemerisError};
use crate::domain::zodiac::{self, Planet};
use chrono::{DateTime, Utc};

pub trait EphemerisProvider: Send + Sync {
    /// Registry key of the backend, recorded on generated events.
    fn name(&self) -> &str;

    /// Ecliptic longitude in `[0, 360)`, in the provider's configured frame.
    fn longitude(&self, planet: Planet, at: DateTime<Utc>) -> Result<f64, EphemerisError>;

    fn longitude_by_name(&self, planet: &str, at: DateTime<Utc>) -> Result<f64, AstroError> {
        let planet: Planet = planet.parse()?;
        Ok(self.longitude(planet, at)?)
    }

    fn nakshatra_index(&self, longitude: f64) -> usize {
        zodiac::nakshatra_index(longitude)
    }

    fn nakshatra_owner(&self, index: usize) -> Planet {
        zodiac::nakshatra_owner(index)
    }

    fn angular_distance(&self, a: f64, b: f64) -> f64 {
        zodiac::angular_distance(a, b)
    }

    /// `None` when the backend cannot tell direct from retrograde motion.
    fn retrograde(&self) -> Option<&dyn RetrogradeSource> {
        None
    }
}

pub trait RetrogradeSource: Send + Sync {
    fn is_retrograde(&self, planet: Planet, at: DateTime<Utc>) -> Result<bool, EphemerisError>;
}
