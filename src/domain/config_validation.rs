//! Configuration validation.
//!
//! Validates settings and scan bounds before any evaluation runs.

use crate::domain::ayanamsa::AyanamsaMode;
use crate::domain::error::AstroError;
use crate::domain::settings::{ENV_AYANAMSA, ENV_PROVIDER, ProviderKind};
use crate::domain::zodiac::Planet;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), AstroError> {
    validate_provider(config)?;
    validate_ayanamsa(config)?;
    validate_default_orb(config)?;
    validate_combustion_orbs(config)?;
    Ok(())
}

pub fn validate_market_config(config: &dyn ConfigPort) -> Result<(), AstroError> {
    if let Some(list) = config.get_string("market", "horizons") {
        parse_horizons(&list)?;
    }
    Ok(())
}

pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), AstroError> {
    if end < start {
        return Err(AstroError::InvalidDateRange { start, end });
    }
    Ok(())
}

pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate, AstroError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| AstroError::ConfigInvalid {
        section: "cli".to_string(),
        key: field.to_string(),
        reason: format!("invalid {field} '{value}', expected YYYY-MM-DD"),
    })
}

/// Comma-separated list of positive trading-day offsets.
pub fn parse_horizons(list: &str) -> Result<Vec<usize>, AstroError> {
    let invalid = |reason: String| AstroError::ConfigInvalid {
        section: "market".to_string(),
        key: "horizons".to_string(),
        reason,
    };
    let mut horizons = Vec::new();
    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let h: usize = part
            .parse()
            .map_err(|_| invalid(format!("'{part}' is not a whole number of days")))?;
        if h == 0 {
            return Err(invalid("horizons must be at least 1".to_string()));
        }
        horizons.push(h);
    }
    if horizons.is_empty() {
        return Err(invalid("at least one horizon is required".to_string()));
    }
    Ok(horizons)
}

fn validate_provider(config: &dyn ConfigPort) -> Result<(), AstroError> {
    if let Some(key) = config.get_string_or_env("astro", "provider", ENV_PROVIDER) {
        key.parse::<ProviderKind>()?;
    }
    Ok(())
}

fn validate_ayanamsa(config: &dyn ConfigPort) -> Result<(), AstroError> {
    if let Some(mode) = config.get_string_or_env("astro", "ayanamsa", ENV_AYANAMSA) {
        mode.parse::<AyanamsaMode>()?;
    }
    Ok(())
}

fn validate_default_orb(config: &dyn ConfigPort) -> Result<(), AstroError> {
    let Some(raw) = config.get_string("astro", "default_orb") else {
        return Ok(());
    };
    match raw.trim().parse::<f64>() {
        Ok(orb) if orb > 0.0 && orb.is_finite() => Ok(()),
        _ => Err(AstroError::ConfigInvalid {
            section: "astro".to_string(),
            key: "default_orb".to_string(),
            reason: "default_orb must be a positive number of degrees".to_string(),
        }),
    }
}

fn validate_combustion_orbs(config: &dyn ConfigPort) -> Result<(), AstroError> {
    for (key, value) in config.section_entries("combustion") {
        key.parse::<Planet>().map_err(|_| AstroError::ConfigInvalid {
            section: "combustion".to_string(),
            key: key.clone(),
            reason: format!("unknown planet '{key}'"),
        })?;
        match value.trim().parse::<f64>() {
            Ok(orb) if orb >= 0.0 && orb.is_finite() => {}
            _ => {
                return Err(AstroError::ConfigInvalid {
                    section: "combustion".to_string(),
                    key,
                    reason: "combustion orb must be a non-negative number".to_string(),
                });
            }
        }
    }
    Ok(())
}
