//! Provider registry: maps a backend key to its constructor.

use crate::adapters::analytic_ephemeris::AnalyticEphemeris;
use crate::adapters::stub_ephemeris::StubEphemeris;
use crate::domain::error::AstroError;
use crate::domain::settings::{EngineSettings, ProviderKind};
use crate::ports::ephemeris_port::EphemerisProvider;
use std::sync::Arc;

type Constructor = fn(&EngineSettings) -> Result<Arc<dyn EphemerisProvider>, AstroError>;

const REGISTRY: [(ProviderKind, Constructor); 3] = [
    (ProviderKind::Stub, build_stub),
    (ProviderKind::Analytic, build_analytic),
    (ProviderKind::Swisseph, build_swisseph),
];

/// Builds the provider selected by `settings.provider`.
pub fn create_provider(settings: &EngineSettings) -> Result<Arc<dyn EphemerisProvider>, AstroError> {
    let (_, constructor) = REGISTRY
        .iter()
        .find(|(kind, _)| *kind == settings.provider)
        .ok_or_else(|| AstroError::UnknownProvider {
            key: settings.provider.key().to_string(),
            valid: ProviderKind::valid_keys(),
        })?;
    let provider = constructor(settings)?;
    log::info!(
        "ephemeris provider '{}' ready (ayanamsa {})",
        provider.name(),
        settings.ayanamsa
    );
    Ok(provider)
}

/// Resolves a string key and builds it with the remaining settings.
pub fn create_provider_by_key(
    key: &str,
    settings: &EngineSettings,
) -> Result<Arc<dyn EphemerisProvider>, AstroError> {
    let kind: ProviderKind = key.parse()?;
    create_provider(&settings.clone().with_provider(kind))
}

fn build_stub(_settings: &EngineSettings) -> Result<Arc<dyn EphemerisProvider>, AstroError> {
    Ok(Arc::new(StubEphemeris::new()))
}

fn build_analytic(settings: &EngineSettings) -> Result<Arc<dyn EphemerisProvider>, AstroError> {
    Ok(Arc::new(AnalyticEphemeris::new(settings.ayanamsa)))
}

#[cfg(feature = "swisseph")]
fn build_swisseph(settings: &EngineSettings) -> Result<Arc<dyn EphemerisProvider>, AstroError> {
    use crate::adapters::swisseph_adapter::SwissEphemerisAdapter;

    let path = settings
        .ephemeris_path
        .as_deref()
        .ok_or_else(|| AstroError::ProviderUnavailable {
            key: "swisseph".into(),
            reason: "no ephemeris_path configured and SWISS_EPHEMERIS_PATH is unset".into(),
        })?;
    let adapter = SwissEphemerisAdapter::new(path, settings.ayanamsa).map_err(|e| {
        AstroError::ProviderUnavailable {
            key: "swisseph".into(),
            reason: e.to_string(),
        }
    })?;
    Ok(Arc::new(adapter))
}

#[cfg(not(feature = "swisseph"))]
fn build_swisseph(_settings: &EngineSettings) -> Result<Arc<dyn EphemerisProvider>, AstroError> {
    Err(AstroError::ProviderUnavailable {
        key: "swisseph".into(),
        reason: "built without the `swisseph` feature".into(),
    })
}
