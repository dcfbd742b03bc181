//! Swiss Ephemeris backend (cargo feature `swisseph`).
//!
//! Longitudes are requested tropical and converted with the engine's own
//! ayanamsa, so sidereal output agrees with the analytic backend's frame.
//! Rahu is the mean node. The C library keeps global state, so every call
//! goes through one process-wide lock.

use crate::domain::ayanamsa::{AyanamsaMode, J2000, julian_day};
use crate::domain::error::EphemerisError;
use crate::domain::zodiac::{Planet, normalize_degrees};
use crate::ports::ephemeris_port::{EphemerisProvider, RetrogradeSource};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Mutex;
use swisseph::swe::{calc_ut, set_ephe_path};

const FLG_SWIEPH: u32 = 2;
const FLG_SPEED: u32 = 256;
const MEAN_NODE: u32 = 10;

static SWE_LOCK: Mutex<()> = Mutex::new(());

/// libswe clears the SWIEPH bit of its return flag when it had to fall back.
fn uses_data_files(return_flag: i32) -> bool {
    return_flag as u32 & FLG_SWIEPH != 0
}

fn body_code(planet: Planet) -> Option<u32> {
    match planet {
        Planet::Sun => Some(0),
        Planet::Moon => Some(1),
        Planet::Mercury => Some(2),
        Planet::Venus => Some(3),
        Planet::Mars => Some(4),
        Planet::Jupiter => Some(5),
        Planet::Saturn => Some(6),
        Planet::Uranus => Some(7),
        Planet::Neptune => Some(8),
        Planet::Pluto => Some(9),
        Planet::Rahu => Some(MEAN_NODE),
        Planet::Ketu => None,
    }
}

pub struct SwissEphemerisAdapter {
    ayanamsa: AyanamsaMode,
}

impl SwissEphemerisAdapter {
    pub fn new(ephemeris_path: &Path, ayanamsa: AyanamsaMode) -> Result<Self, EphemerisError> {
        if !ephemeris_path.exists() {
            return Err(EphemerisError::DataNotFound {
                path: ephemeris_path.display().to_string(),
                reason: "directory does not exist; install the Swiss Ephemeris data files".into(),
            });
        }
        let not_usable = |reason: &str| EphemerisError::DataNotFound {
            path: ephemeris_path.display().to_string(),
            reason: reason.to_string(),
        };
        let path = ephemeris_path
            .to_str()
            .filter(|p| !p.contains('\0'))
            .ok_or_else(|| not_usable("path is not valid UTF-8 without NUL bytes"))?;

        // the data path is library-global; later adapters replace it
        let _guard = SWE_LOCK
            .lock()
            .map_err(|_| not_usable("swiss ephemeris lock poisoned"))?;
        set_ephe_path(path);
        log::info!("swiss ephemeris data path set to {path}");

        let check = calc_ut(J2000, body_code(Planet::Sun).unwrap_or(0), FLG_SWIEPH)
            .map_err(|e| not_usable(&format!("test calculation failed: {e}")))?;
        if !uses_data_files(check.code) {
            log::warn!("no Swiss Ephemeris data files in {path}; libswe fell back to its Moshier model");
        }

        Ok(Self { ayanamsa })
    }

    /// Tropical longitude and daily speed in longitude.
    fn tropical(&self, planet: Planet, jd: f64) -> Result<(f64, f64), EphemerisError> {
        let code = body_code(planet).ok_or_else(|| EphemerisError::UnsupportedBody {
            provider: "swisseph".into(),
            body: planet.key().into(),
        })?;
        let failed = |reason: String| EphemerisError::CalculationFailed {
            body: planet.key().to_string(),
            jd,
            reason,
        };
        let _guard = SWE_LOCK
            .lock()
            .map_err(|_| failed("swiss ephemeris lock poisoned".into()))?;
        let result = calc_ut(jd, code, FLG_SWIEPH | FLG_SPEED)
            .map_err(|e| failed(format!("swiss ephemeris error: {e}")))?;
        Ok((normalize_degrees(result.out[0]), result.out[3]))
    }
}

impl EphemerisProvider for SwissEphemerisAdapter {
    fn name(&self) -> &str {
        "swisseph"
    }

    fn longitude(&self, planet: Planet, at: DateTime<Utc>) -> Result<f64, EphemerisError> {
        if planet == Planet::Ketu {
            let rahu = self.longitude(Planet::Rahu, at)?;
            return Ok(normalize_degrees(rahu + 180.0));
        }
        let jd = julian_day(at);
        let (tropical, _) = self.tropical(planet, jd)?;
        Ok(self.ayanamsa.apply(tropical, jd))
    }

    fn retrograde(&self) -> Option<&dyn RetrogradeSource> {
        Some(self)
    }
}

impl RetrogradeSource for SwissEphemerisAdapter {
    fn is_retrograde(&self, planet: Planet, at: DateTime<Utc>) -> Result<bool, EphemerisError> {
        let body = if planet == Planet::Ketu { Planet::Rahu } else { planet };
        let (_, speed) = self.tropical(body, julian_day(at))?;
        Ok(speed < 0.0)
    }
}
