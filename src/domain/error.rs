//! Domain error types.

use chrono::NaiveDate;

/// Failures raised by an ephemeris backend while computing a position.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EphemerisError {
    #[error("{provider} does not support {body}")]
    UnsupportedBody { provider: String, body: String },

    #[error("failed to compute {body} at julian day {jd:.4}: {reason}")]
    CalculationFailed { body: String, jd: f64, reason: String },

    #[error("ephemeris data not found at {path}: {reason}")]
    DataNotFound { path: String, reason: String },
}

/// Top-level error type for astrorules.
#[derive(Debug, thiserror::Error)]
pub enum AstroError {
    #[error("unsupported planet: {name}")]
    UnsupportedPlanet { name: String },

    #[error("unsupported relation: {name}")]
    UnsupportedRelation { name: String },

    #[error("unsupported sign: {name}")]
    UnsupportedSign { name: String },

    #[error("unsupported outcome effect: {name}")]
    UnsupportedEffect { name: String },

    #[error("unknown provider '{key}', expected one of {valid:?}")]
    UnknownProvider { key: String, valid: Vec<String> },

    #[error("provider '{key}' is unavailable: {reason}")]
    ProviderUnavailable { key: String, reason: String },

    #[error(transparent)]
    Ephemeris(#[from] EphemerisError),

    #[error("invalid date range: end {end} is before start {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("rule {rule_id} not found")]
    RuleNotFound { rule_id: String },

    #[error("invalid rule: {reason}")]
    RuleInvalid { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("market data error: {reason}")]
    MarketData { reason: String },

    #[error("no price data for {ticker}")]
    NoPriceData { ticker: String },

    #[error("scan cancelled")]
    Cancelled,

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&AstroError> for std::process::ExitCode {
    fn from(err: &AstroError) -> Self {
        let code: u8 = match err {
            AstroError::Io(_) | AstroError::Json(_) => 1,
            AstroError::ConfigParse { .. }
            | AstroError::ConfigMissing { .. }
            | AstroError::ConfigInvalid { .. }
            | AstroError::InvalidDateRange { .. }
            | AstroError::UnknownProvider { .. } => 2,
            AstroError::Database { .. } | AstroError::DatabaseQuery { .. } => 3,
            AstroError::UnsupportedPlanet { .. }
            | AstroError::UnsupportedRelation { .. }
            | AstroError::UnsupportedSign { .. }
            | AstroError::UnsupportedEffect { .. }
            | AstroError::RuleNotFound { .. }
            | AstroError::RuleInvalid { .. } => 4,
            AstroError::MarketData { .. } | AstroError::NoPriceData { .. } => 5,
            AstroError::Ephemeris(_) | AstroError::ProviderUnavailable { .. } => 6,
            AstroError::Cancelled => 7,
        };
        std::process::ExitCode::from(code)
    }
}
