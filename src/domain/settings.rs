//! Engine and market settings resolved once from configuration.

use crate::domain::ayanamsa::AyanamsaMode;
use crate::domain::config_validation;
use crate::domain::error::AstroError;
use crate::domain::zodiac::Planet;
use crate::ports::config_port::ConfigPort;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_ORB: f64 = 5.0;
pub const DEFAULT_TICKER: &str = "^GSPC";
pub const DEFAULT_HORIZONS: [usize; 3] = [1, 3, 5];

pub const ENV_PROVIDER: &str = "ASTRO_PROVIDER";
pub const ENV_AYANAMSA: &str = "ASTRO_AYANAMSA_MODE";
pub const ENV_EPHEMERIS_PATH: &str = "SWISS_EPHEMERIS_PATH";

/// Ephemeris backends known at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProviderKind {
    Stub,
    #[default]
    Analytic,
    Swisseph,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Stub, ProviderKind::Analytic, ProviderKind::Swisseph];

    pub fn key(self) -> &'static str {
        match self {
            ProviderKind::Stub => "stub",
            ProviderKind::Analytic => "analytic",
            ProviderKind::Swisseph => "swisseph",
        }
    }

    pub fn valid_keys() -> Vec<String> {
        Self::ALL.iter().map(|k| k.key().to_string()).collect()
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ProviderKind {
    type Err = AstroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ProviderKind::ALL
            .iter()
            .copied()
            .find(|k| k.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AstroError::UnknownProvider {
                key: s.to_string(),
                valid: Self::valid_keys(),
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub provider: ProviderKind,
    pub ayanamsa: AyanamsaMode,
    pub ephemeris_path: Option<PathBuf>,
    pub default_orb: f64,
    /// Per-planet combustion orbs from the `[combustion]` section.
    pub combustion_orbs: HashMap<Planet, f64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            ayanamsa: AyanamsaMode::default(),
            ephemeris_path: None,
            default_orb: DEFAULT_ORB,
            combustion_orbs: HashMap::new(),
        }
    }
}

impl EngineSettings {
    /// Validates the `[astro]` and `[combustion]` sections and resolves them.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AstroError> {
        config_validation::validate_engine_config(config)?;

        let provider = match config.get_string_or_env("astro", "provider", ENV_PROVIDER) {
            Some(key) => key.parse()?,
            None => ProviderKind::default(),
        };
        let ayanamsa = match config.get_string_or_env("astro", "ayanamsa", ENV_AYANAMSA) {
            Some(mode) => mode.parse()?,
            None => AyanamsaMode::default(),
        };
        let ephemeris_path = config
            .get_string_or_env("astro", "ephemeris_path", ENV_EPHEMERIS_PATH)
            .map(PathBuf::from);
        let default_orb = config.get_double("astro", "default_orb", DEFAULT_ORB);

        let mut combustion_orbs = HashMap::new();
        for (key, value) in config.section_entries("combustion") {
            let planet: Planet = key.parse()?;
            let orb: f64 = value.trim().parse().map_err(|_| AstroError::ConfigInvalid {
                section: "combustion".into(),
                key: key.clone(),
                reason: format!("'{value}' is not a number"),
            })?;
            combustion_orbs.insert(planet, orb);
        }

        Ok(Self {
            provider,
            ayanamsa,
            ephemeris_path,
            default_orb,
            combustion_orbs,
        })
    }

    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketSettings {
    pub data_dir: Option<PathBuf>,
    pub ticker: String,
    pub horizons: Vec<usize>,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            ticker: DEFAULT_TICKER.to_string(),
            horizons: DEFAULT_HORIZONS.to_vec(),
        }
    }
}

impl MarketSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AstroError> {
        config_validation::validate_market_config(config)?;

        let data_dir = config
            .get_string("market", "data_dir")
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from);
        let ticker = config
            .get_string("market", "ticker")
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TICKER.to_string());
        let horizons = match config.get_string("market", "horizons") {
            Some(list) => config_validation::parse_horizons(&list)?,
            None => DEFAULT_HORIZONS.to_vec(),
        };

        Ok(Self {
            data_dir,
            ticker,
            horizons,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn reads_astro_and_combustion_sections() {
        let settings = EngineSettings::from_config(&config(
            "[astro]\nprovider = stub\nayanamsa = raman\ndefault_orb = 3.5\nephemeris_path = /data/ephe\n\n[combustion]\nmercury = 12\nVenus = 10.5\n",
        ))
        .unwrap();
        assert_eq!(settings.provider, ProviderKind::Stub);
        assert_eq!(settings.ayanamsa, AyanamsaMode::Raman);
        assert_eq!(settings.default_orb, 3.5);
        assert_eq!(settings.ephemeris_path, Some(PathBuf::from("/data/ephe")));
        assert_eq!(settings.combustion_orbs.get(&Planet::Mercury), Some(&12.0));
        assert_eq!(settings.combustion_orbs.get(&Planet::Venus), Some(&10.5));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = EngineSettings::from_config(&config("[astro]\nprovider = jpl\n")).unwrap_err();
        assert!(matches!(err, AstroError::UnknownProvider { key, .. } if key == "jpl"));
    }

    #[test]
    fn provider_kind_round_trips_keys() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.key().parse::<ProviderKind>().unwrap(), kind);
        }
        assert_eq!(ProviderKind::valid_keys(), vec!["stub", "analytic", "swisseph"]);
    }

    #[test]
    fn market_defaults() {
        let market = MarketSettings::from_config(&config("[market]\n")).unwrap();
        assert_eq!(market.ticker, "^GSPC");
        assert_eq!(market.horizons, vec![1, 3, 5]);
        assert_eq!(market.data_dir, None);
    }

    #[test]
    fn market_reads_horizon_list() {
        let market = MarketSettings::from_config(&config(
            "[market]\ndata_dir = prices\nticker = ^NSEI\nhorizons = 2, 10 ,20\n",
        ))
        .unwrap();
        assert_eq!(market.ticker, "^NSEI");
        assert_eq!(market.horizons, vec![2, 10, 20]);
        assert_eq!(market.data_dir, Some(PathBuf::from("prices")));
    }
}
