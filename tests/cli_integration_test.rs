//! CLI orchestration tests.
//!
//! Tests cover:
//! - Config and rule file loading with real files on disk
//! - Provider overrides and date range parsing
//! - Rule import and event generation against in-memory stores
//! - Position listing and market correlation helpers
//! - Exit codes of full command runs

mod common;

use astrorules::adapters::file_config_adapter::FileConfigAdapter;
use astrorules::cli::{self, Cli, Command};
use astrorules::domain::error::AstroError;
use astrorules::domain::settings::ProviderKind;
use astrorules::ports::rule_store_port::RuleStorePort;
use common::*;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn code_of(code: ExitCode) -> String {
    format!("{code:?}")
}

const VALID_INI: &str = r#"
[astro]
provider = stub
ayanamsa = lahiri
default_orb = 4.0

[combustion]
mercury = 14

[market]
ticker = ^AXJO
horizons = 1,5,10
"#;

const VALID_RULES: &str = r#"[
  {
    "rule_id": "jup_sat",
    "name": "Jupiter conjunct Saturn",
    "confidence": 0.8,
    "conditions": [
      {"planet": "jupiter", "relation": "conjunct_with", "target": "saturn", "orb": 8}
    ],
    "outcomes": [{"sector_code": "BANKS", "effect": "bullish", "weight": 1.5}]
  },
  {
    "rule_id": "moon_house",
    "name": "Moon in the fourth from the Sun",
    "enabled": false,
    "conditions": [
      {"planet": "moon", "relation": "in_house_relative_to", "target": "sun", "value": "4"}
    ]
  }
]"#;

mod config_loading {
    use super::*;

    #[test]
    fn engine_settings_from_ini() {
        let file = write_temp(VALID_INI, ".ini");
        let config = cli::load_config(&file.path().to_path_buf()).unwrap();
        let settings = cli::build_engine_settings(&config, None).unwrap();
        assert_eq!(settings.provider, ProviderKind::Stub);
        assert_eq!(settings.default_orb, 4.0);
    }

    #[test]
    fn provider_override_wins_over_config() {
        let config = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let settings = cli::build_engine_settings(&config, Some("analytic")).unwrap();
        assert_eq!(settings.provider, ProviderKind::Analytic);
        let evaluator = cli::build_evaluator(&settings).unwrap();
        assert_eq!(evaluator.provider_name(), "analytic");
    }

    #[test]
    fn unknown_provider_override_lists_valid_keys() {
        let config = FileConfigAdapter::empty();
        let err = cli::build_engine_settings(&config, Some("jpl")).unwrap_err();
        match err {
            AstroError::UnknownProvider { key, valid } => {
                assert_eq!(key, "jpl");
                assert!(valid.contains(&"stub".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_config_file_fails_with_config_exit_code() {
        let code = cli::load_config(&PathBuf::from("/nonexistent/astro.ini")).unwrap_err();
        assert_eq!(code_of(code), code_of(ExitCode::from(2)));
    }
}

mod date_ranges {
    use super::*;

    #[test]
    fn valid_range_parses() {
        let (start, end) = cli::parse_range("2024-01-01", " 2024-01-31").unwrap();
        assert_eq!(start, day(1));
        assert_eq!(end, day(31));
    }

    #[test]
    fn single_day_range_is_allowed() {
        assert!(cli::parse_range("2024-01-05", "2024-01-05").is_ok());
    }

    #[test]
    fn malformed_and_inverted_ranges_are_rejected() {
        assert!(matches!(
            cli::parse_range("01/01/2024", "2024-01-31"),
            Err(AstroError::ConfigInvalid { .. })
        ));
        assert!(matches!(
            cli::parse_range("2024-02-01", "2024-01-31"),
            Err(AstroError::InvalidDateRange { .. })
        ));
    }
}

mod rule_files {
    use super::*;

    #[test]
    fn loads_and_validates_rules() {
        let file = write_temp(VALID_RULES, ".json");
        let rules = cli::load_rules_file(&file.path().to_path_buf()).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].outcomes[0].sector, "BANKS");
        assert_eq!(rules[0].outcomes[0].weight, 1.5);
        assert_eq!(rules[1].conditions[0].value, Some(4.0));
        assert!(!rules[1].enabled);
    }

    #[test]
    fn malformed_json_is_rule_invalid() {
        let file = write_temp("[{\"rule_id\": ", ".json");
        let err = cli::load_rules_file(&file.path().to_path_buf()).unwrap_err();
        assert!(matches!(err, AstroError::RuleInvalid { .. }));
    }

    #[test]
    fn conjunction_without_target_is_rejected() {
        let file = write_temp(
            r#"[{"rule_id": "x", "name": "x", "conditions": [{"planet": "sun", "relation": "conjunct_with"}]}]"#,
            ".json",
        );
        let err = cli::load_rules_file(&file.path().to_path_buf()).unwrap_err();
        assert!(matches!(err, AstroError::RuleInvalid { .. }));
    }

    #[test]
    fn import_stores_all_rules() {
        let file = write_temp(VALID_RULES, ".json");
        let rules = cli::load_rules_file(&file.path().to_path_buf()).unwrap();
        let store = MemoryStore::default();
        assert_eq!(cli::import_rules(&store, &rules).unwrap(), 2);
        assert!(store.get_rule("moon_house").unwrap().is_some());
        assert_eq!(store.rules.enabled_ids(), vec!["jup_sat".to_string()]);
    }

    #[test]
    fn import_stores_nothing_when_any_rule_is_invalid() {
        let mut broken = conjunction_rule("broken");
        broken.conditions[0].target = None;
        let store = MemoryStore::default();
        let err = cli::import_rules(&store, &[conjunction_rule("ok"), broken]).unwrap_err();
        assert!(matches!(err, AstroError::RuleInvalid { .. }));
        assert!(store.rules.enabled_ids().is_empty());
    }
}

mod generation {
    use super::*;
    use astrorules::domain::event_generator::EventGenerator;

    fn store() -> MemoryStore {
        let store = MemoryStore::default();
        let mut disabled = conjunction_rule("off");
        disabled.enabled = false;
        cli::import_rules(
            &store,
            &[conjunction_rule("a"), conjunction_rule("b"), disabled],
        )
        .unwrap();
        store
    }

    fn generator() -> EventGenerator {
        EventGenerator::new(scripted_evaluator(ScriptedProvider::signal(
            day(1),
            &[true, false, true, true],
        )))
    }

    #[test]
    fn all_covers_enabled_rules_only() {
        let store = store();
        let summaries =
            cli::generate_events(&store, &generator(), None, day(1), day(4), false).unwrap();
        let ids: Vec<_> = summaries.iter().map(|s| s.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(summaries.iter().all(|s| s.events.len() == 2));
        assert_eq!(store.events.all().len(), 4);
    }

    #[test]
    fn single_rule_generation() {
        let store = store();
        let summaries =
            cli::generate_events(&store, &generator(), Some("off"), day(1), day(4), false)
                .unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].rule_id, "off");
        assert_eq!(store.events.all().len(), 2);
    }

    #[test]
    fn overwrite_replaces_previous_run() {
        let store = store();
        for _ in 0..2 {
            cli::generate_events(&store, &generator(), Some("a"), day(1), day(4), true).unwrap();
        }
        assert_eq!(store.events.all().len(), 2);
    }

    #[test]
    fn unknown_rule_is_reported() {
        let store = store();
        let err = cli::generate_events(&store, &generator(), Some("zzz"), day(1), day(4), false)
            .unwrap_err();
        assert!(matches!(err, AstroError::RuleNotFound { .. }));
    }

    #[test]
    fn empty_store_generates_nothing() {
        let store = MemoryStore::default();
        let summaries =
            cli::generate_events(&store, &generator(), None, day(1), day(4), false).unwrap();
        assert!(summaries.is_empty());
    }
}

mod positions {
    use super::*;
    use astrorules::adapters::analytic_ephemeris::AnalyticEphemeris;
    use astrorules::adapters::stub_ephemeris::StubEphemeris;
    use astrorules::domain::ayanamsa::AyanamsaMode;
    use astrorules::domain::zodiac::{Planet, Sign};

    #[test]
    fn stub_positions_have_unknown_retrograde() {
        let positions = cli::planet_positions(&StubEphemeris::new(), day(15)).unwrap();
        assert_eq!(positions.len(), Planet::ALL.len());
        for p in &positions {
            assert!((0.0..360.0).contains(&p.longitude));
            assert_eq!(p.sign, Sign::from_longitude(p.longitude));
            assert!(p.nakshatra < 27);
            assert!(p.retrograde.is_none());
        }
    }

    #[test]
    fn analytic_positions_report_retrograde_nodes() {
        let positions =
            cli::planet_positions(&AnalyticEphemeris::new(AyanamsaMode::Lahiri), day(15)).unwrap();
        let by_planet = |planet: Planet| positions.iter().find(|p| p.planet == planet).unwrap();
        assert_eq!(by_planet(Planet::Sun).retrograde, Some(false));
        assert_eq!(by_planet(Planet::Rahu).retrograde, Some(true));
        let json = serde_json::to_value(by_planet(Planet::Moon)).unwrap();
        assert_eq!(json["planet"], "moon");
    }
}

mod correlation {
    use super::*;
    use astrorules::domain::evaluation::evaluate_rules_for_range;
    use astrorules::domain::rule::{Effect, Outcome};

    #[test]
    fn bearish_rules_hit_on_falling_prices() {
        let mut rule = conjunction_rule("bear");
        rule.outcomes = vec![Outcome::new("BANKS", Effect::Bearish)];
        let evaluator = scripted_evaluator(ScriptedProvider::signal(day(1), &[true, false, true]));
        let records = evaluate_rules_for_range(&[rule], &evaluator, day(1), day(3)).unwrap();

        let closes: Vec<f64> = (0..10).map(|i| 100.0 - f64::from(i)).collect();
        let market = MockMarketData::daily("^GSPC", day(1), &closes);
        let report = cli::correlate(&records, &market, "^GSPC", &[2]).unwrap();

        let stats = &report.per_rule[0].stats[0];
        assert_eq!(stats.horizon, 2);
        assert_eq!(stats.count, 2);
        assert!((stats.hit_rate - 1.0).abs() < f64::EPSILON);
        // bearish returns are scored with the sign flipped
        assert!(stats.avg_return > 0.0);
    }

    #[test]
    fn no_records_needs_no_prices() {
        let market = MockMarketData::daily("^GSPC", day(1), &[]);
        let report = cli::correlate(&[], &market, "^GSPC", &[1, 3]).unwrap();
        assert!(report.per_rule.is_empty());
        assert!(report.aggregate.iter().all(|s| s.count == 0));
    }

    #[test]
    fn empty_price_window_is_no_price_data() {
        let evaluator = scripted_evaluator(ScriptedProvider::signal(day(1), &[true]));
        let records =
            evaluate_rules_for_range(&[conjunction_rule("r")], &evaluator, day(1), day(1)).unwrap();
        let market = MockMarketData::daily("^GSPC", day(20), &[100.0, 101.0]);
        let err = cli::correlate(&records, &market, "^GSPC", &[1]).unwrap_err();
        assert!(matches!(err, AstroError::NoPriceData { ticker } if ticker == "^GSPC"));
    }
}

mod commands {
    use super::*;

    fn validate(config: &str, rules: Option<&str>) -> String {
        let config_file = write_temp(config, ".ini");
        let rules_file = rules.map(|r| write_temp(r, ".json"));
        code_of(cli::run(Cli {
            command: Command::Validate {
                config: config_file.path().to_path_buf(),
                rules: rules_file.as_ref().map(|f| f.path().to_path_buf()),
            },
        }))
    }

    #[test]
    fn validate_accepts_good_config_and_rules() {
        assert_eq!(validate(VALID_INI, Some(VALID_RULES)), code_of(ExitCode::SUCCESS));
    }

    #[test]
    fn validate_rejects_unknown_provider() {
        assert_eq!(
            validate("[astro]\nprovider = vsop87\n", None),
            code_of(ExitCode::from(2))
        );
    }

    #[test]
    fn validate_rejects_bad_horizons() {
        assert_eq!(
            validate("[market]\nhorizons = 1,0\n", None),
            code_of(ExitCode::from(2))
        );
    }

    #[test]
    fn validate_rejects_invalid_rules() {
        assert_eq!(
            validate(VALID_INI, Some(r#"[{"rule_id": "x", "name": "x", "conditions": [{"planet": "vulcan", "relation": "retrograde"}]}]"#)),
            code_of(ExitCode::from(4))
        );
    }

    #[test]
    fn generate_requires_rule_or_all() {
        let config_file = write_temp(VALID_INI, ".ini");
        let code = cli::run(Cli {
            command: Command::Generate {
                config: config_file.path().to_path_buf(),
                rule: None,
                all: false,
                start: "2024-01-01".into(),
                end: "2024-01-31".into(),
                provider: None,
                overwrite: false,
            },
        });
        assert_eq!(code_of(code), code_of(ExitCode::from(2)));
    }

    #[test]
    fn positions_without_config_uses_defaults() {
        let code = cli::run(Cli {
            command: Command::Positions {
                date: "2024-01-15".into(),
                config: None,
                provider: Some("stub".into()),
            },
        });
        assert_eq!(code_of(code), code_of(ExitCode::SUCCESS));
    }

    #[test]
    fn positions_rejects_bad_date() {
        let code = cli::run(Cli {
            command: Command::Positions {
                date: "15/01/2024".into(),
                config: None,
                provider: None,
            },
        });
        assert_eq!(code_of(code), code_of(ExitCode::from(2)));
    }
}
