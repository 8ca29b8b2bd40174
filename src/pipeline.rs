//! Top-level pipeline orchestration.
//!
//! Wires the phases together: tokenize → parse (which enriches `endpoints`
//! items inline as it builds them) → lower. Each phase function is a thin,
//! pure wrapper; callers who only need one phase (say, just the token
//! stream) can call it directly instead of going through [`run_all`].

use crate::ast::System;
use crate::error::SimalError;
use crate::token::Token;
use crate::{lexer, lower, parser};
use serde_json::Value as Json;

/// Phase 1: tokenize source text.
pub fn run_lexer(source: &str) -> Result<Vec<Token>, SimalError> {
    Ok(lexer::tokenize(source)?)
}

/// Phase 2: parse a token stream into a [`System`] AST.
pub fn run_parser(tokens: Vec<Token>) -> Result<System, SimalError> {
    Ok(parser::parse(tokens)?)
}

/// Runs the full tokenize → parse pipeline over source text.
pub fn run_all(source: &str) -> Result<System, SimalError> {
    run_parser(run_lexer(source)?)
}

/// Lowers a parsed system to full (tagged, round-trippable) JSON.
pub fn full_json(system: &System) -> Json {
    lower::full::to_json(system)
}

/// Lowers a parsed system to simple (flattened) JSON.
pub fn simple_json(system: &System) -> Json {
    lower::simple::to_json(system)
}

/// Lowers a parsed system to max-simple JSON (methods/endpoints compressed
/// into `def` strings where possible).
pub fn max_simple_json(system: &System) -> Json {
    lower::simple::to_max_simple_json(system)
}

/// Reconstructs a [`System`] from full JSON — the reverse of [`full_json`],
/// letting the two round-trip.
pub fn from_full_json(json: &Json) -> Result<System, SimalError> {
    Ok(lower::full::from_full_json(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_all_parses_a_minimal_system() {
        let sys = run_all("system { type: microservices }").unwrap();
        assert_eq!(sys.attributes[0].key, "type");
    }

    #[test]
    fn run_all_surfaces_lex_errors() {
        let err = run_all("system { notes: \"unterminated }").unwrap_err();
        assert!(matches!(err, SimalError::Lex(_)));
    }

    #[test]
    fn run_all_surfaces_parse_errors() {
        let err = run_all("not-a-system { }").unwrap_err();
        assert!(matches!(err, SimalError::Parse(_)));
    }

    #[test]
    fn full_json_round_trips_via_pipeline() {
        let sys = run_all("system { type: microservices  service s { langs: [go] } }").unwrap();
        let json = full_json(&sys);
        let back = from_full_json(&json).unwrap();
        assert_eq!(sys, back);
    }
}
