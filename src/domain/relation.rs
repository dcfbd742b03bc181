//! Condition kinds a rule can test.

use crate::domain::error::AstroError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Relation {
    InNakshatraOwnedBy,
    ConjunctWith,
    InAxis,
    AspectWith,
    InSign,
    InHouseRelativeTo,
    OppositionWith,
    TrineWith,
    SquareWith,
    SextileWith,
    QuincunxWith,
    SemisextileWith,
    SemisquareWith,
    QuintileWith,
    SesquiquadrateWith,
    CombustBySun,
    Retrograde,
}

impl Relation {
    pub const ALL: [Relation; 17] = [
        Relation::InNakshatraOwnedBy,
        Relation::ConjunctWith,
        Relation::InAxis,
        Relation::AspectWith,
        Relation::InSign,
        Relation::InHouseRelativeTo,
        Relation::OppositionWith,
        Relation::TrineWith,
        Relation::SquareWith,
        Relation::SextileWith,
        Relation::QuincunxWith,
        Relation::SemisextileWith,
        Relation::SemisquareWith,
        Relation::QuintileWith,
        Relation::SesquiquadrateWith,
        Relation::CombustBySun,
        Relation::Retrograde,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Relation::InNakshatraOwnedBy => "in_nakshatra_owned_by",
            Relation::ConjunctWith => "conjunct_with",
            Relation::InAxis => "in_axis",
            Relation::AspectWith => "aspect_with",
            Relation::InSign => "in_sign",
            Relation::InHouseRelativeTo => "in_house_relative_to",
            Relation::OppositionWith => "opposition_with",
            Relation::TrineWith => "trine_with",
            Relation::SquareWith => "square_with",
            Relation::SextileWith => "sextile_with",
            Relation::QuincunxWith => "quincunx_with",
            Relation::SemisextileWith => "semisextile_with",
            Relation::SemisquareWith => "semisquare_with",
            Relation::QuintileWith => "quintile_with",
            Relation::SesquiquadrateWith => "sesquiquadrate_with",
            Relation::CombustBySun => "combust_by_sun",
            Relation::Retrograde => "retrograde",
        }
    }

    /// Human-readable label shown in rule editors.
    pub fn label(self) -> &'static str {
        match self {
            Relation::InNakshatraOwnedBy => "In Nakshatra Owned By",
            Relation::ConjunctWith => "Conjunct With",
            Relation::InAxis => "In Axis",
            Relation::AspectWith => "Aspect With",
            Relation::InSign => "In Sign",
            Relation::InHouseRelativeTo => "In House Relative To",
            Relation::OppositionWith => "Opposition (180°)",
            Relation::TrineWith => "Trine (120°)",
            Relation::SquareWith => "Square (90°)",
            Relation::SextileWith => "Sextile (60°)",
            Relation::QuincunxWith => "Quincunx / Inconjunct (150°)",
            Relation::SemisextileWith => "Semisextile (30°)",
            Relation::SemisquareWith => "Semisquare (45°)",
            Relation::QuintileWith => "Quintile (72°)",
            Relation::SesquiquadrateWith => "Sesquiquadrate (135°)",
            Relation::CombustBySun => "Combust by Sun",
            Relation::Retrograde => "Retrograde",
        }
    }

    /// Bound angle of the named aspects.
    pub fn fixed_angle(self) -> Option<f64> {
        match self {
            Relation::OppositionWith => Some(180.0),
            Relation::TrineWith => Some(120.0),
            Relation::SquareWith => Some(90.0),
            Relation::SextileWith => Some(60.0),
            Relation::QuincunxWith => Some(150.0),
            Relation::SemisextileWith => Some(30.0),
            Relation::SemisquareWith => Some(45.0),
            Relation::QuintileWith => Some(72.0),
            Relation::SesquiquadrateWith => Some(135.0),
            _ => None,
        }
    }

    /// Relations whose target names a second planet.
    pub fn needs_target_planet(self) -> bool {
        matches!(
            self,
            Relation::ConjunctWith | Relation::InAxis | Relation::AspectWith | Relation::InHouseRelativeTo
        ) || self.fixed_angle().is_some()
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Relation {
    type Err = AstroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Relation::ALL
            .iter()
            .copied()
            .find(|r| r.key().eq_ignore_ascii_case(wanted) || r.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AstroError::UnsupportedRelation {
                name: s.to_string(),
            })
    }
}

impl TryFrom<String> for Relation {
    type Error = AstroError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Relation> for String {
    fn from(relation: Relation) -> Self {
        relation.key().to_string()
    }
}
