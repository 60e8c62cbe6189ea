use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A dynamic value held by a script variable.
///
/// Serialized untagged so IR JSON carries plain literals (`0`, `"x"`, `true`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// Variable environment, ordered by name so snapshots are deterministic.
pub type Variables = BTreeMap<String, Value>;

impl Value {
    /// Parse the right-hand side of a `VAR` declaration.
    ///
    /// Integers, decimals, quoted strings and `true`/`false` become typed
    /// values; anything else is kept verbatim as a string.
    pub fn parse_literal(input: &str) -> Value {
        let input = input.trim();
        if let Some(int) = parse_int(input) {
            return Value::Int(int);
        }
        if let Some(float) = parse_decimal(input) {
            return Value::Float(float);
        }
        for quote in ['"', '\''] {
            if input.len() >= 2 && input.starts_with(quote) && input.ends_with(quote) {
                return Value::String(input[1..input.len() - 1].to_string());
            }
        }
        match input.to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(input.to_string()),
        }
    }

    /// Truthiness used by conditionals and logical operators.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::String(s) => !s.is_empty(),
        }
    }

    /// Numeric view, if this value is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => f.write_str(s),
        }
    }
}

fn parse_int(s: &str) -> Option<i64> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_decimal(s: &str) -> Option<f64> {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let (whole, frac) = unsigned.split_once('.')?;
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if all_digits(whole) && all_digits(frac) {
        s.parse().ok().filter(|f: &f64| f.is_finite())
    } else {
        None
    }
}
