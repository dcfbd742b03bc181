//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::ephemeris_factory::create_provider;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{parse_date, parse_horizons, validate_date_range};
use crate::domain::correlation::{CorrelationReport, analyze_correlation, price_window};
use crate::domain::error::AstroError;
use crate::domain::evaluation::evaluate_rules_for_range;
use crate::domain::event::EvaluationRecord;
use crate::domain::event_generator::{EventGenerator, GenerationSummary};
use crate::domain::rule::Rule;
use crate::domain::rule_eval::{RuleEvaluator, day_start};
use crate::domain::settings::{EngineSettings, MarketSettings};
use crate::domain::zodiac::{Planet, Sign};
use crate::ports::config_port::ConfigPort;
use crate::ports::ephemeris_port::EphemerisProvider;
use crate::ports::event_store_port::EventStorePort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::rule_store_port::RuleStorePort;

#[derive(Parser, Debug)]
#[command(name = "astrorules", about = "Astrological rule evaluation and event generation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan rules over a date range and store the resulting events
    Generate {
        #[arg(short, long)]
        config: PathBuf,
        /// Rule to scan
        #[arg(long, conflicts_with = "all")]
        rule: Option<String>,
        /// Scan every enabled rule
        #[arg(long)]
        all: bool,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        /// Ephemeris backend, overriding the configuration
        #[arg(long)]
        provider: Option<String>,
        /// Replace stored events overlapping the range
        #[arg(long)]
        overwrite: bool,
    },
    /// Print evaluation records of enabled rules as JSON
    Evaluate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        /// Read rules from a JSON file instead of the store
        #[arg(long)]
        rules: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import rules from a JSON file into the store
    ImportRules {
        #[arg(short, long)]
        config: PathBuf,
        file: PathBuf,
    },
    /// List stored events of a rule as JSON
    Events {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        rule: String,
    },
    /// Correlate evaluation records with market returns
    Correlate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        rules: Option<PathBuf>,
        #[arg(long)]
        ticker: Option<String>,
        /// Comma-separated horizons in trading days
        #[arg(long)]
        horizons: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show planetary positions on a date
    Positions {
        #[arg(long)]
        date: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        provider: Option<String>,
    },
    /// Validate configuration and, optionally, a rule file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}

/// Rule and event persistence behind one handle.
pub trait RuleEventStore: RuleStorePort + EventStorePort {}

impl<T: RuleStorePort + EventStorePort> RuleEventStore for T {}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Generate {
            config,
            rule,
            all,
            start,
            end,
            provider,
            overwrite,
        } => run_generate(
            &config,
            rule.as_deref(),
            all,
            &start,
            &end,
            provider.as_deref(),
            overwrite,
        ),
        Command::Evaluate {
            config,
            start,
            end,
            rules,
            output,
        } => run_evaluate(&config, &start, &end, rules.as_ref(), output.as_ref()),
        Command::ImportRules { config, file } => run_import_rules(&config, &file),
        Command::Events { config, rule } => run_events(&config, &rule),
        Command::Correlate {
            config,
            start,
            end,
            rules,
            ticker,
            horizons,
            output,
        } => run_correlate(
            &config,
            &start,
            &end,
            rules.as_ref(),
            ticker.as_deref(),
            horizons.as_deref(),
            output.as_ref(),
        ),
        Command::Positions {
            date,
            config,
            provider,
        } => run_positions(&date, config.as_ref(), provider.as_deref()),
        Command::Validate { config, rules } => run_validate(&config, rules.as_ref()),
    }
}

fn fail(e: &AstroError) -> ExitCode {
    eprintln!("error: {e}");
    e.into()
}

fn finish(result: Result<(), AstroError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = AstroError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        fail(&err)
    })
}

pub fn parse_range(start: &str, end: &str) -> Result<(NaiveDate, NaiveDate), AstroError> {
    let start = parse_date(start, "start")?;
    let end = parse_date(end, "end")?;
    validate_date_range(start, end)?;
    Ok((start, end))
}

/// Engine settings from config, with an optional provider key override.
pub fn build_engine_settings(
    config: &dyn ConfigPort,
    provider_override: Option<&str>,
) -> Result<EngineSettings, AstroError> {
    let settings = EngineSettings::from_config(config)?;
    match provider_override {
        Some(key) => Ok(settings.with_provider(key.parse()?)),
        None => Ok(settings),
    }
}

pub fn build_evaluator(settings: &EngineSettings) -> Result<RuleEvaluator, AstroError> {
    let provider = create_provider(settings)?;
    Ok(RuleEvaluator::from_settings(provider, settings))
}

/// Reads a JSON array of rules and validates each one.
pub fn load_rules_file(path: &PathBuf) -> Result<Vec<Rule>, AstroError> {
    let content = fs::read_to_string(path)?;
    let rules: Vec<Rule> = serde_json::from_str(&content).map_err(|e| AstroError::RuleInvalid {
        reason: format!("{}: {e}", path.display()),
    })?;
    for rule in &rules {
        rule.validate()?;
    }
    Ok(rules)
}

fn emit_json<T: Serialize>(value: &T, output: Option<&PathBuf>) -> Result<(), AstroError> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            eprintln!("Written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(feature = "sqlite")]
fn with_store(
    config: &dyn ConfigPort,
    f: impl FnOnce(&dyn RuleEventStore) -> Result<(), AstroError>,
) -> Result<(), AstroError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;

    let store = SqliteAdapter::from_config(config)?;
    store.initialize_schema()?;
    f(&store)
}

#[cfg(not(feature = "sqlite"))]
fn with_store(
    _config: &dyn ConfigPort,
    _f: impl FnOnce(&dyn RuleEventStore) -> Result<(), AstroError>,
) -> Result<(), AstroError> {
    Err(AstroError::Database {
        reason: "built without the `sqlite` feature".into(),
    })
}

/// Rules from `--rules` when given, otherwise the enabled rules in the store.
fn resolve_rules(config: &dyn ConfigPort, rules_path: Option<&PathBuf>) -> Result<Vec<Rule>, AstroError> {
    if let Some(path) = rules_path {
        eprintln!("Loading rules from {}", path.display());
        return load_rules_file(path);
    }
    let mut rules = Vec::new();
    with_store(config, |store| {
        rules = store.list_enabled_rules()?;
        Ok(())
    })?;
    Ok(rules)
}

/// Generates events for one rule or for every enabled rule.
pub fn generate_events<S: RuleEventStore + ?Sized>(
    store: &S,
    generator: &EventGenerator,
    rule_id: Option<&str>,
    start: NaiveDate,
    end: NaiveDate,
    overwrite: bool,
) -> Result<Vec<GenerationSummary>, AstroError> {
    match rule_id {
        Some(id) => Ok(vec![
            generator.generate_for_rule(store, store, id, start, end, overwrite)?,
        ]),
        None => {
            let rules = store.list_enabled_rules()?;
            generator.generate_for_rules(&rules, store, start, end, overwrite)
        }
    }
}

/// Validates every rule before storing any of them.
pub fn import_rules<S: RuleStorePort + ?Sized>(store: &S, rules: &[Rule]) -> Result<usize, AstroError> {
    for rule in rules {
        rule.validate()?;
    }
    for rule in rules {
        store.upsert_rule(rule)?;
    }
    Ok(rules.len())
}

pub fn correlate(
    records: &[EvaluationRecord],
    market: &dyn MarketDataPort,
    ticker: &str,
    horizons: &[usize],
) -> Result<CorrelationReport, AstroError> {
    let prices = match price_window(records, horizons) {
        Some((first, last)) => market.fetch_prices(ticker, first, last)?,
        None => Vec::new(),
    };
    if prices.is_empty() && !records.is_empty() {
        return Err(AstroError::NoPriceData {
            ticker: ticker.to_string(),
        });
    }
    Ok(analyze_correlation(ticker, records, &prices, horizons))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanetPosition {
    pub planet: Planet,
    pub longitude: f64,
    pub sign: Sign,
    pub nakshatra: usize,
    pub nakshatra_owner: Planet,
    /// `None` when the provider cannot tell.
    pub retrograde: Option<bool>,
}

pub fn planet_positions(
    provider: &dyn EphemerisProvider,
    date: NaiveDate,
) -> Result<Vec<PlanetPosition>, AstroError> {
    let at = day_start(date);
    Planet::ALL
        .iter()
        .map(|&planet| {
            let longitude = provider.longitude(planet, at)?;
            let nakshatra = provider.nakshatra_index(longitude);
            let retrograde = match provider.retrograde() {
                Some(source) => Some(source.is_retrograde(planet, at)?),
                None => None,
            };
            Ok(PlanetPosition {
                planet,
                longitude,
                sign: Sign::from_longitude(longitude),
                nakshatra,
                nakshatra_owner: provider.nakshatra_owner(nakshatra),
                retrograde,
            })
        })
        .collect()
}

fn run_generate(
    config_path: &PathBuf,
    rule_id: Option<&str>,
    all: bool,
    start: &str,
    end: &str,
    provider: Option<&str>,
    overwrite: bool,
) -> ExitCode {
    if rule_id.is_none() && !all {
        eprintln!("error: pass --rule <ID> or --all");
        return ExitCode::from(2);
    }

    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let result = (|| -> Result<(), AstroError> {
        let (start, end) = parse_range(start, end)?;
        let evaluator = build_evaluator(&build_engine_settings(&config, provider)?)?;
        eprintln!(
            "Generating events {start} to {end} with provider {}",
            evaluator.provider_name()
        );
        let generator = EventGenerator::new(evaluator);
        with_store(&config, |store| {
            let summaries = generate_events(store, &generator, rule_id, start, end, overwrite)?;
            for s in &summaries {
                eprintln!(
                    "  {}: {} events ({} replaced)",
                    s.rule_id,
                    s.events.len(),
                    s.deleted
                );
            }
            emit_json(&summaries, None)
        })
    })();
    finish(result)
}

fn run_evaluate(
    config_path: &PathBuf,
    start: &str,
    end: &str,
    rules_path: Option<&PathBuf>,
    output: Option<&PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let result = (|| -> Result<(), AstroError> {
        let (start, end) = parse_range(start, end)?;
        let evaluator = build_evaluator(&build_engine_settings(&config, None)?)?;
        let rules = resolve_rules(&config, rules_path)?;
        let records = evaluate_rules_for_range(&rules, &evaluator, start, end)?;
        eprintln!("{} records from {} rules", records.len(), rules.len());
        emit_json(&records, output)
    })();
    finish(result)
}

fn run_import_rules(config_path: &PathBuf, file: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let result = load_rules_file(file).and_then(|rules| {
        with_store(&config, |store| {
            let count = import_rules(store, &rules)?;
            eprintln!("Imported {count} rules from {}", file.display());
            Ok(())
        })
    });
    finish(result)
}

fn run_events(config_path: &PathBuf, rule_id: &str) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    finish(with_store(&config, |store| {
        store.require_rule(rule_id)?;
        let events = store.list_events(rule_id)?;
        eprintln!("{} events for {rule_id}", events.len());
        emit_json(&events, None)
    }))
}

fn run_correlate(
    config_path: &PathBuf,
    start: &str,
    end: &str,
    rules_path: Option<&PathBuf>,
    ticker: Option<&str>,
    horizons: Option<&str>,
    output: Option<&PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let result = (|| -> Result<(), AstroError> {
        let (start, end) = parse_range(start, end)?;
        let market = MarketSettings::from_config(&config)?;
        let horizons = match horizons {
            Some(list) => parse_horizons(list)?,
            None => market.horizons.clone(),
        };
        let ticker = ticker.unwrap_or(market.ticker.as_str());
        let data_dir = market.data_dir.clone().ok_or_else(|| AstroError::ConfigMissing {
            section: "market".into(),
            key: "data_dir".into(),
        })?;

        let evaluator = build_evaluator(&build_engine_settings(&config, None)?)?;
        let rules = resolve_rules(&config, rules_path)?;
        let records = evaluate_rules_for_range(&rules, &evaluator, start, end)?;
        eprintln!("Correlating {} records against {ticker}", records.len());

        let report = correlate(&records, &CsvAdapter::new(data_dir), ticker, &horizons)?;
        for stats in &report.aggregate {
            eprintln!(
                "  {}d: n={} hit={:.1}% avg={:.3}%",
                stats.horizon,
                stats.count,
                stats.hit_rate * 100.0,
                stats.avg_return * 100.0
            );
        }
        emit_json(&report, output)
    })();
    finish(result)
}

fn run_positions(date: &str, config_path: Option<&PathBuf>, provider: Option<&str>) -> ExitCode {
    let config = match config_path {
        Some(path) => match load_config(path) {
            Ok(c) => c,
            Err(code) => return code,
        },
        None => FileConfigAdapter::empty(),
    };

    let result = (|| -> Result<(), AstroError> {
        let date = parse_date(date, "date")?;
        let settings = build_engine_settings(&config, provider)?;
        let provider: Arc<dyn EphemerisProvider> = create_provider(&settings)?;
        let positions = planet_positions(provider.as_ref(), date)?;
        eprintln!(
            "Positions on {date} ({}, ayanamsa {})",
            provider.name(),
            settings.ayanamsa
        );
        emit_json(&positions, None)
    })();
    finish(result)
}

fn run_validate(config_path: &PathBuf, rules_path: Option<&PathBuf>) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let result = (|| -> Result<(), AstroError> {
        let settings = EngineSettings::from_config(&config)?;
        let market = MarketSettings::from_config(&config)?;
        eprintln!(
            "  provider: {} (ayanamsa {}, default orb {})",
            settings.provider, settings.ayanamsa, settings.default_orb
        );
        eprintln!("  market: {} horizons {:?}", market.ticker, market.horizons);

        if let Some(path) = rules_path {
            let rules = load_rules_file(path)?;
            eprintln!("  {} rules in {} are valid", rules.len(), path.display());
        }
        eprintln!("\nConfiguration is valid.");
        Ok(())
    })();
    finish(result)
}
