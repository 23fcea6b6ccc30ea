//! Branch condition evaluation
//!
//! A condition has the shape `<identifier> <operator> <literal>`, for example
//! `user_choice == 'Yes'` or `score >= 10`. The operator is the longest run of
//! `=`, `!`, `<`, `>` characters after the identifier, so `===` is never read
//! as `==` followed by `=`.
//!
//! # Coercion
//!
//! The literal is always text (quotes stripped). The recorded value is JSON.
//!
//! - `==` / `!=`: a string value compares textually; a number compares
//!   numerically against the literal parsed as a number (unparsable literal
//!   means unequal); a boolean compares against `true` / `false`; a missing
//!   or `null` value is unequal to every literal.
//! - `===` / `!==`: only a string value equal to the literal matches.
//! - `>`, `<`, `>=`, `<=`: numeric when both the value and the literal read
//!   as finite numbers (numeric strings included), otherwise a byte-wise
//!   string comparison when the value is a string, otherwise `false`.
//!
//! Evaluation never fails: a malformed condition evaluates to `false` and is
//! reported through `log` and through [`try_evaluate`].

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;


const OPERATOR_CHARS: &[char] = &['=', '!', '<', '>'];

/// Comparison operator of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    LooseEq,
    StrictEq,
    LooseNe,
    StrictNe,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Operator {
    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "==" => Operator::LooseEq,
            "===" => Operator::StrictEq,
            "!=" => Operator::LooseNe,
            "!==" => Operator::StrictNe,
            ">" => Operator::Gt,
            "<" => Operator::Lt,
            ">=" => Operator::Ge,
            "<=" => Operator::Le,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::LooseEq => "==",
            Operator::StrictEq => "===",
            Operator::LooseNe => "!=",
            Operator::StrictNe => "!==",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a condition could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionParseErrorKind {
    /// No operator characters were found
    MissingOperator,
    /// Nothing precedes the operator
    MissingIdentifier,
    /// Operator characters that do not form a known operator
    UnknownOperator(String),
}

/// Malformed branch condition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid condition '{condition}': {kind}")]
pub struct ConditionParseError {
    pub condition: String,
    pub kind: ConditionParseErrorKind,
}

impl fmt::Display for ConditionParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionParseErrorKind::MissingOperator => f.write_str("expected an operator"),
            ConditionParseErrorKind::MissingIdentifier => {
                f.write_str("expected a variable name before the operator")
            }
            ConditionParseErrorKind::UnknownOperator(op) => {
                write!(f, "unsupported operator '{op}'")
            }
        }
    }
}

/// A parsed condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub variable: String,
    pub operator: Operator,
    pub literal: String,
}

impl Condition {
    /// Parse a condition string
    pub fn parse(source: &str) -> Result<Self, ConditionParseError> {
        let error = |kind| ConditionParseError {
            condition: source.to_string(),
            kind,
        };

        let op_start = source
            .find(OPERATOR_CHARS)
            .ok_or_else(|| error(ConditionParseErrorKind::MissingOperator))?;
        let op_len = source[op_start..]
            .find(|c: char| !OPERATOR_CHARS.contains(&c))
            .unwrap_or(source.len() - op_start);

        let variable = source[..op_start].trim();
        let token = &source[op_start..op_start + op_len];
        let literal = source[op_start + op_len..].trim();

        if variable.is_empty() {
            return Err(error(ConditionParseErrorKind::MissingIdentifier));
        }
        let operator = Operator::from_token(token)
            .ok_or_else(|| error(ConditionParseErrorKind::UnknownOperator(token.to_string())))?;

        Ok(Self {
            variable: variable.to_string(),
            operator,
            literal: strip_quotes(literal).to_string(),
        })
    }

    /// Evaluate against the recorded choices
    pub fn evaluate(&self, choices: &HashMap<String, Value>) -> bool {
        let actual = choices.get(&self.variable).unwrap_or(&Value::Null);
        let expected = self.literal.as_str();

        match self.operator {
            Operator::LooseEq => loose_eq(actual, expected),
            Operator::LooseNe => !loose_eq(actual, expected),
            Operator::StrictEq => strict_eq(actual, expected),
            Operator::StrictNe => !strict_eq(actual, expected),
            Operator::Gt => compare(actual, expected).is_some_and(Ordering::is_gt),
            Operator::Lt => compare(actual, expected).is_some_and(Ordering::is_lt),
            Operator::Ge => compare(actual, expected).is_some_and(Ordering::is_ge),
            Operator::Le => compare(actual, expected).is_some_and(Ordering::is_le),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} '{}'", self.variable, self.operator, self.literal)
    }
}

/// Evaluate a condition, reporting malformed input as an error
pub fn try_evaluate(
    condition: &str,
    choices: &HashMap<String, Value>,
) -> Result<bool, ConditionParseError> {
    Condition::parse(condition).map(|parsed| parsed.evaluate(choices))
}

/// Evaluate a condition; malformed input is logged and yields `false`
pub fn evaluate(condition: &str, choices: &HashMap<String, Value>) -> bool {
    match try_evaluate(condition, choices) {
        Ok(result) => {
            log::trace!(target: "shiori::condition", "'{condition}' -> {result}");
            result
        }
        Err(err) => {
            log::warn!(target: "shiori::condition", "{err}; treating as false");
            false
        }
    }
}

fn strip_quotes(literal: &str) -> &str {
    for quote in ['\'', '"'] {
        if literal.len() >= 2 && literal.starts_with(quote) && literal.ends_with(quote) {
            return &literal[1..literal.len() - 1];
        }
    }
    literal
}

fn as_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn loose_eq(actual: &Value, expected: &str) -> bool {
    match actual {
        Value::String(s) => s == expected,
        Value::Number(n) => match (n.as_f64(), as_number(expected)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        Value::Bool(b) => expected == if *b { "true" } else { "false" },
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

fn strict_eq(actual: &Value, expected: &str) -> bool {
    matches!(actual, Value::String(s) if s == expected)
}

fn compare(actual: &Value, expected: &str) -> Option<Ordering> {
    let lhs = match actual {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => as_number(s),
        _ => None,
    };
    if let (Some(a), Some(b)) = (lhs, as_number(expected)) {
        return a.partial_cmp(&b);
    }
    match actual {
        Value::String(s) => Some(s.as_str().cmp(expected)),
        _ => None,
    }
}
