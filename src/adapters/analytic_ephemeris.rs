//! Pure-Rust analytic ephemeris.
//!
//! Planets come from mean Keplerian elements with linear secular rates
//! (J2000 ecliptic, valid roughly 1800-2050), solved through Kepler's
//! equation and differenced against the Earth-Moon barycentre. The Moon
//! uses the principal periodic terms of its longitude series and the nodes
//! use the mean-node polynomial. Expect agreement with a full ephemeris to
//! well under a degree for the outer planets and a few tenths for the rest.

use crate::domain::ayanamsa::{AyanamsaMode, PRECESSION_PER_CENTURY, julian_centuries, julian_day, mean_node_longitude};
use crate::domain::error::EphemerisError;
use crate::domain::zodiac::{Planet, normalize_degrees, signed_delta};
use crate::ports::ephemeris_port::{EphemerisProvider, RetrogradeSource};
use chrono::{DateTime, Duration, Utc};

/// Semi-major axis (AU), eccentricity, inclination, mean longitude,
/// longitude of perihelion, longitude of ascending node (degrees).
#[derive(Debug, Clone, Copy)]
struct Elements {
    base: [f64; 6],
    rate: [f64; 6],
}

const MERCURY: Elements = Elements {
    base: [0.38709927, 0.20563593, 7.00497902, 252.25032350, 77.45779628, 48.33076593],
    rate: [0.00000037, 0.00001906, -0.00594749, 149472.67411175, 0.16047689, -0.12534081],
};
const VENUS: Elements = Elements {
    base: [0.72333566, 0.00677672, 3.39467605, 181.97909950, 131.60246718, 76.67984255],
    rate: [0.00000390, -0.00004107, -0.00078890, 58517.81538729, 0.00268329, -0.27769418],
};
const EARTH_MOON_BARYCENTRE: Elements = Elements {
    base: [1.00000261, 0.01671123, -0.00001531, 100.46457166, 102.93768193, 0.0],
    rate: [0.00000562, -0.00004392, -0.01294668, 35999.37244981, 0.32327364, 0.0],
};
const MARS: Elements = Elements {
    base: [1.52371034, 0.09339410, 1.84969142, -4.55343205, -23.94362959, 49.55953891],
    rate: [0.00001847, 0.00007882, -0.00813131, 19140.30268499, 0.44441088, -0.29257343],
};
const JUPITER: Elements = Elements {
    base: [5.20288700, 0.04838624, 1.30439695, 34.39644051, 14.72847983, 100.47390909],
    rate: [-0.00011607, -0.00013253, -0.00183714, 3034.74612775, 0.21252668, 0.20469106],
};
const SATURN: Elements = Elements {
    base: [9.53667594, 0.05386179, 2.48599187, 49.95424423, 92.59887831, 113.66242448],
    rate: [-0.00125060, -0.00050991, 0.00193609, 1222.49362201, -0.41897216, -0.28867794],
};
const URANUS: Elements = Elements {
    base: [19.18916464, 0.04725744, 0.77263783, 313.23810451, 170.95427630, 74.01692503],
    rate: [-0.00196176, -0.00004397, -0.00242939, 428.48202785, 0.40805281, 0.04240589],
};
const NEPTUNE: Elements = Elements {
    base: [30.06992276, 0.00859048, 1.77004347, -55.12002969, 44.96476227, 131.78422574],
    rate: [0.00026291, 0.00005105, 0.00035372, 218.45945325, -0.32241464, -0.00508664],
};
const PLUTO: Elements = Elements {
    base: [39.48211675, 0.24882730, 17.14001206, 238.92903833, 224.06891629, 110.30393684],
    rate: [-0.00031596, 0.00005170, 0.00004818, 145.20780515, -0.04062942, -0.01183482],
};

const KEPLER_TOLERANCE: f64 = 1e-12;
const KEPLER_MAX_ITERATIONS: usize = 30;

impl Elements {
    /// Heliocentric ecliptic x, y (AU) in the J2000 frame.
    fn heliocentric(&self, t: f64) -> Result<(f64, f64), f64> {
        let el: [f64; 6] = std::array::from_fn(|i| self.base[i] + self.rate[i] * t);
        let [a, e, incl, mean_lon, long_peri, long_node] = el;

        let arg_peri = (long_peri - long_node).to_radians();
        let mean_anomaly = ((mean_lon - long_peri + 180.0).rem_euclid(360.0) - 180.0).to_radians();
        let ecc_anomaly = solve_kepler(mean_anomaly, e)?;

        let xp = a * (ecc_anomaly.cos() - e);
        let yp = a * (1.0 - e * e).sqrt() * ecc_anomaly.sin();

        let (sw, cw) = arg_peri.sin_cos();
        let (so, co) = long_node.to_radians().sin_cos();
        let ci = incl.to_radians().cos();

        let x = (cw * co - sw * so * ci) * xp + (-sw * co - cw * so * ci) * yp;
        let y = (cw * so + sw * co * ci) * xp + (-sw * so + cw * co * ci) * yp;
        Ok((x, y))
    }
}

/// Newton iteration on `E - e sin E = M`; `Err` carries the last residual.
fn solve_kepler(mean_anomaly: f64, e: f64) -> Result<f64, f64> {
    let mut ecc = mean_anomaly + e * mean_anomaly.sin();
    let mut step = f64::INFINITY;
    for _ in 0..KEPLER_MAX_ITERATIONS {
        step = (ecc - e * ecc.sin() - mean_anomaly) / (1.0 - e * ecc.cos());
        ecc -= step;
        if step.abs() < KEPLER_TOLERANCE {
            return Ok(ecc);
        }
    }
    if step.abs() < 1e-9 { Ok(ecc) } else { Err(step) }
}

fn moon_longitude(t: f64) -> f64 {
    let l = 218.3164477 + 481267.88123421 * t;
    let d = 297.8501921 + 445267.1114034 * t;
    let m = 357.5291092 + 35999.0502909 * t;
    let mp = 134.9633964 + 477198.8675055 * t;
    let f = 93.2720950 + 483202.0175233 * t;
    let s = |deg: f64| deg.to_radians().sin();

    let terms = 6.288774 * s(mp) + 1.274027 * s(2.0 * d - mp) + 0.658314 * s(2.0 * d)
        + 0.213618 * s(2.0 * mp)
        - 0.185116 * s(m)
        - 0.114332 * s(2.0 * f)
        + 0.058793 * s(2.0 * d - 2.0 * mp)
        + 0.057066 * s(2.0 * d - m - mp)
        + 0.053322 * s(2.0 * d + mp)
        + 0.045758 * s(2.0 * d - m)
        - 0.040923 * s(m - mp)
        - 0.034720 * s(d)
        - 0.030383 * s(m + mp);
    normalize_degrees(l + terms)
}

pub struct AnalyticEphemeris {
    ayanamsa: AyanamsaMode,
}

impl AnalyticEphemeris {
    pub fn new(ayanamsa: AyanamsaMode) -> Self {
        Self { ayanamsa }
    }

    /// Geocentric tropical longitude of date.
    pub fn tropical_longitude(&self, planet: Planet, jd: f64) -> Result<f64, EphemerisError> {
        let t = julian_centuries(jd);
        let elements = match planet {
            Planet::Moon => return Ok(moon_longitude(t)),
            Planet::Rahu => return Ok(mean_node_longitude(jd)),
            Planet::Ketu => return Ok(normalize_degrees(mean_node_longitude(jd) + 180.0)),
            Planet::Sun => None,
            Planet::Mercury => Some(MERCURY),
            Planet::Venus => Some(VENUS),
            Planet::Mars => Some(MARS),
            Planet::Jupiter => Some(JUPITER),
            Planet::Saturn => Some(SATURN),
            Planet::Uranus => Some(URANUS),
            Planet::Neptune => Some(NEPTUNE),
            Planet::Pluto => Some(PLUTO),
        };

        let failed = |residual: f64| EphemerisError::CalculationFailed {
            body: planet.key().to_string(),
            jd,
            reason: format!("kepler solver did not converge (residual {residual:e})"),
        };
        let (ex, ey) = EARTH_MOON_BARYCENTRE.heliocentric(t).map_err(failed)?;
        let (x, y) = match elements {
            None => (-ex, -ey),
            Some(el) => {
                let (px, py) = el.heliocentric(t).map_err(failed)?;
                (px - ex, py - ey)
            }
        };
        Ok(normalize_degrees(
            y.atan2(x).to_degrees() + PRECESSION_PER_CENTURY * t,
        ))
    }
}

impl EphemerisProvider for AnalyticEphemeris {
    fn name(&self) -> &str {
        "analytic"
    }

    fn longitude(&self, planet: Planet, at: DateTime<Utc>) -> Result<f64, EphemerisError> {
        let jd = julian_day(at);
        if planet == Planet::Ketu {
            let rahu = self.longitude(Planet::Rahu, at)?;
            return Ok(normalize_degrees(rahu + 180.0));
        }
        let tropical = self.tropical_longitude(planet, jd)?;
        Ok(self.ayanamsa.apply(tropical, jd))
    }

    fn retrograde(&self) -> Option<&dyn RetrogradeSource> {
        Some(self)
    }
}

impl RetrogradeSource for AnalyticEphemeris {
    /// Sign of the longitude change across one day centred on `at`.
    fn is_retrograde(&self, planet: Planet, at: DateTime<Utc>) -> Result<bool, EphemerisError> {
        if planet == Planet::Sun || planet == Planet::Moon {
            return Ok(false);
        }
        let half_day = Duration::hours(12);
        let before = self.tropical_longitude(planet, julian_day(at - half_day))?;
        let after = self.tropical_longitude(planet, julian_day(at + half_day))?;
        Ok(signed_delta(before, after) < 0.0)
    }
}
