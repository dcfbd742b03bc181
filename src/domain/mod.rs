//! Core domain types and logic: zodiac arithmetic, rules, relation
//! handlers, evaluation, event generation and correlation.

pub mod ayanamsa;
pub mod config_validation;
pub mod correlation;
pub mod error;
pub mod evaluation;
pub mod event;
pub mod event_generator;
pub mod relation;
pub mod relations;
pub mod rule;
pub mod rule_eval;
pub mod settings;
pub mod zodiac;
