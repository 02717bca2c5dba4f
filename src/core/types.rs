// src/core/types.rs

use crate::models::ValueType;
use clap::builder::ValueParser;
use std::collections::HashMap;

/// A validating parser for an externally-registered value type. It receives
/// the raw command-line token and returns the (possibly normalized) string
/// form, or a human-readable rejection message.
pub type ExternalParser = fn(&str) -> Result<String, String>;

/// Static registry mapping declared type tokens to typed parsers.
///
/// The built-in set (`int`, `float`, `str`) is always available. Tokens
/// containing a `.` are treated as fully-qualified references to an external
/// type and must have been registered up front via [`TypeRegistry::register`];
/// there is no dynamic loading.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    external: HashMap<String, ExternalParser>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a parser for a fully-qualified external type token
    /// (e.g. `"mytool.Revision"`). Overwrites any previous registration.
    pub fn register(&mut self, token: &str, parser: ExternalParser) {
        self.external.insert(token.to_string(), parser);
    }

    /// Resolves a declared type token. Returns `None` for unknown built-in
    /// tokens and for external tokens that were never registered.
    pub fn resolve(&self, token: &str) -> Option<ValueType> {
        if token.contains('.') {
            return self
                .external
                .contains_key(token)
                .then(|| ValueType::External(token.to_string()));
        }
        match token {
            "int" => Some(ValueType::Int),
            "float" => Some(ValueType::Float),
            "str" => Some(ValueType::Str),
            _ => None,
        }
    }

    /// Builds the clap value parser for a resolved type. Typed values are
    /// validated but carried as strings; the child process receives strings
    /// through the environment either way.
    pub fn value_parser(&self, value_type: &ValueType) -> ValueParser {
        match value_type {
            ValueType::Int => ValueParser::new(parse_int),
            ValueType::Float => ValueParser::new(parse_float),
            ValueType::Str => ValueParser::new(parse_str),
            ValueType::External(token) => match self.external.get(token) {
                Some(parser) => ValueParser::new(*parser),
                // An unregistered token cannot come out of `resolve`; fall
                // back to the identity parser rather than panic.
                None => ValueParser::new(parse_str),
            },
        }
    }
}

fn parse_int(raw: &str) -> Result<String, String> {
    raw.parse::<i64>()
        .map(|_| raw.to_string())
        .map_err(|e| format!("'{}' is not a valid integer: {}", raw, e))
}

fn parse_float(raw: &str) -> Result<String, String> {
    raw.parse::<f64>()
        .map(|_| raw.to_string())
        .map_err(|e| format!("'{}' is not a valid float: {}", raw, e))
}

fn parse_str(raw: &str) -> Result<String, String> {
    Ok(raw.to_string())
}
