//! Celestial bodies, zodiac signs, nakshatras and circular angle arithmetic.
//!
//! Longitudes are ecliptic degrees. Every index helper normalizes its input
//! into `[0, 360)` first, so negative or wrapped longitudes are accepted.

use crate::domain::error::AstroError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Span of one nakshatra: 13°20'.
pub const NAKSHATRA_SPAN: f64 = 360.0 / 27.0;
pub const SIGN_SPAN: f64 = 30.0;
/// Tolerance for longitudes that land on a house cusp.
const CUSP_EPSILON: f64 = 1e-6;
pub const NAKSHATRA_COUNT: usize = 27;

/// Rulers cycle through the 27 nakshatras in this fixed order.
pub const NAKSHATRA_OWNERS: [Planet; 7] = [
    Planet::Ketu,
    Planet::Venus,
    Planet::Sun,
    Planet::Moon,
    Planet::Mars,
    Planet::Rahu,
    Planet::Jupiter,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Planet {
    Sun,
    Moon,
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
    Rahu,
    Ketu,
}

impl Planet {
    pub const ALL: [Planet; 12] = [
        Planet::Sun,
        Planet::Moon,
        Planet::Mercury,
        Planet::Venus,
        Planet::Mars,
        Planet::Jupiter,
        Planet::Saturn,
        Planet::Uranus,
        Planet::Neptune,
        Planet::Pluto,
        Planet::Rahu,
        Planet::Ketu,
    ];

    /// Lowercase identifier used in config files and rule definitions.
    pub fn key(self) -> &'static str {
        match self {
            Planet::Sun => "sun",
            Planet::Moon => "moon",
            Planet::Mercury => "mercury",
            Planet::Venus => "venus",
            Planet::Mars => "mars",
            Planet::Jupiter => "jupiter",
            Planet::Saturn => "saturn",
            Planet::Uranus => "uranus",
            Planet::Neptune => "neptune",
            Planet::Pluto => "pluto",
            Planet::Rahu => "rahu",
            Planet::Ketu => "ketu",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Planet::Sun => "Sun",
            Planet::Moon => "Moon",
            Planet::Mercury => "Mercury",
            Planet::Venus => "Venus",
            Planet::Mars => "Mars",
            Planet::Jupiter => "Jupiter",
            Planet::Saturn => "Saturn",
            Planet::Uranus => "Uranus",
            Planet::Neptune => "Neptune",
            Planet::Pluto => "Pluto",
            Planet::Rahu => "Rahu",
            Planet::Ketu => "Ketu",
        }
    }
}

impl fmt::Display for Planet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Planet {
    type Err = AstroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Planet::ALL
            .iter()
            .copied()
            .find(|p| p.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AstroError::UnsupportedPlanet {
                name: s.to_string(),
            })
    }
}

impl TryFrom<String> for Planet {
    type Error = AstroError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Planet> for String {
    fn from(planet: Planet) -> Self {
        planet.key().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Sign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

impl Sign {
    /// Zodiacal order, Aries first.
    pub const ALL: [Sign; 12] = [
        Sign::Aries,
        Sign::Taurus,
        Sign::Gemini,
        Sign::Cancer,
        Sign::Leo,
        Sign::Virgo,
        Sign::Libra,
        Sign::Scorpio,
        Sign::Sagittarius,
        Sign::Capricorn,
        Sign::Aquarius,
        Sign::Pisces,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Sign> {
        Sign::ALL.get(index).copied()
    }

    pub fn from_longitude(longitude: f64) -> Sign {
        Sign::ALL[sign_index(longitude)]
    }

    pub fn name(self) -> &'static str {
        match self {
            Sign::Aries => "Aries",
            Sign::Taurus => "Taurus",
            Sign::Gemini => "Gemini",
            Sign::Cancer => "Cancer",
            Sign::Leo => "Leo",
            Sign::Virgo => "Virgo",
            Sign::Libra => "Libra",
            Sign::Scorpio => "Scorpio",
            Sign::Sagittarius => "Sagittarius",
            Sign::Capricorn => "Capricorn",
            Sign::Aquarius => "Aquarius",
            Sign::Pisces => "Pisces",
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts a sign name in any case, or a numeric index `0..=11`.
impl FromStr for Sign {
    type Err = AstroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        let unsupported = || AstroError::UnsupportedSign {
            name: s.to_string(),
        };
        if !wanted.is_empty() && wanted.bytes().all(|b| b.is_ascii_digit()) {
            let index: usize = wanted.parse().map_err(|_| unsupported())?;
            return Sign::from_index(index).ok_or_else(unsupported);
        }
        Sign::ALL
            .iter()
            .copied()
            .find(|sign| sign.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(unsupported)
    }
}

impl TryFrom<String> for Sign {
    type Error = AstroError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Sign> for String {
    fn from(sign: Sign) -> Self {
        sign.name().to_string()
    }
}

/// Normalize degrees to `[0, 360)`.
pub fn normalize_degrees(value: f64) -> f64 {
    let normalized = value.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if normalized >= 360.0 { 0.0 } else { normalized }
}

/// Shortest distance between two longitudes, in `[0, 180]`.
pub fn angular_distance(a: f64, b: f64) -> f64 {
    ((a - b + 180.0).rem_euclid(360.0) - 180.0).abs()
}

/// Signed difference `to - from` wrapped into `[-180, 180)`.
pub fn signed_delta(from: f64, to: f64) -> f64 {
    (to - from + 180.0).rem_euclid(360.0) - 180.0
}

pub fn sign_index(longitude: f64) -> usize {
    ((normalize_degrees(longitude) / SIGN_SPAN) as usize).min(11)
}

pub fn nakshatra_index(longitude: f64) -> usize {
    ((normalize_degrees(longitude) / NAKSHATRA_SPAN) as usize).min(NAKSHATRA_COUNT - 1)
}

/// Ruler of a nakshatra; indices past 26 wrap around the cycle.
pub fn nakshatra_owner(index: usize) -> Planet {
    NAKSHATRA_OWNERS[index % NAKSHATRA_OWNERS.len()]
}

/// House number `1..=12` of `longitude` counted from `reference`.
pub fn relative_house(longitude: f64, reference: f64) -> u32 {
    let rel_angle = (longitude - reference).rem_euclid(360.0);
    // lifts bodies sitting on a cusp up to rounding noise into the later house
    (((rel_angle + CUSP_EPSILON) / SIGN_SPAN) as u32 % 12) + 1
}
