//! Parameter coercion and constraint checks.

use std::fmt;

use bridge_config::{ParameterSpec, ParameterType};
use serde_json::{Number, Value};

use super::RequestError;

/// A parameter value coerced to its declared type.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ParameterValue {
    Text(String),
    Number(Number),
    Flag(bool),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => formatter.write_str(text),
            Self::Number(number) => write!(formatter, "{number}"),
            Self::Flag(flag) => write!(formatter, "{flag}"),
        }
    }
}

impl ParameterValue {
    fn is_member_of(&self, allowed: &[Value]) -> bool {
        allowed.iter().any(|candidate| match (self, candidate) {
            (Self::Text(text), Value::String(member)) => text == member,
            (Self::Number(number), Value::Number(member)) => numbers_equal(number, member),
            (Self::Flag(flag), Value::Bool(member)) => flag == member,
            _ => false,
        })
    }
}

/// Coerces `raw` to the type declared by `spec` and applies its constraints.
pub(crate) fn check_parameter(
    spec: &ParameterSpec,
    raw: &Value,
) -> Result<ParameterValue, RequestError> {
    let value = coerce(spec, raw)?;

    if let Some(max_length) = spec.max_length()
        && value.to_string().chars().count() > max_length
    {
        return Err(RequestError::too_long(spec.name(), max_length));
    }

    if let (Some(pattern), ParameterValue::Text(text)) = (spec.pattern(), &value)
        && !pattern.is_match(text)
    {
        return Err(RequestError::pattern_mismatch(spec.name()));
    }

    if let Some(allowed) = spec.allowed_values()
        && !value.is_member_of(allowed)
    {
        return Err(RequestError::invalid_enum(spec.name()));
    }

    Ok(value)
}

fn coerce(spec: &ParameterSpec, raw: &Value) -> Result<ParameterValue, RequestError> {
    let coerced = match (spec.kind(), raw) {
        (ParameterType::String, Value::String(text)) => Some(ParameterValue::Text(text.clone())),
        (ParameterType::Number, Value::Number(number)) => {
            Some(ParameterValue::Number(number.clone()))
        }
        (ParameterType::Number, Value::String(text)) => {
            parse_number(text).map(ParameterValue::Number)
        }
        (ParameterType::Boolean, Value::Bool(flag)) => Some(ParameterValue::Flag(*flag)),
        (ParameterType::Boolean, Value::String(text)) => parse_flag(text).map(ParameterValue::Flag),
        _ => None,
    };
    coerced.ok_or_else(|| RequestError::invalid_type(spec.name(), spec.kind()))
}

fn parse_number(text: &str) -> Option<Number> {
    let trimmed = text.trim();
    if let Ok(integer) = trimmed.parse::<i64>() {
        return Some(Number::from(integer));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|float| float.is_finite())
        .and_then(Number::from_f64)
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn numbers_equal(left: &Number, right: &Number) -> bool {
    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (left.as_u64(), right.as_u64()) {
        return a == b;
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs()),
        _ => false,
    }
}
