//! Value semantics: truthiness, conversions, comparison and arithmetic
//!
//! These follow JavaScript's loose rules, since templates are written
//! against them. Null stands in for both `null` and `undefined`.

use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::parser::ast::BinaryOp;

/// Largest integer an f64 represents exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// `false`, null, `""`, `0` and NaN are falsy
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Zero-length array, key-less mapping, empty string or a scalar
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Null | Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Text a value renders as
pub fn to_display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => display_number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(to_display).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn display_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    format_float(n.as_f64().unwrap_or(f64::NAN))
}

pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        let text = if f > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if f == 0.0 {
        "0".to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e21 {
        format!("{:.0}", f)
    } else {
        f.to_string()
    }
}

/// Numeric value; NaN when there is none
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => f64::NAN,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_number(s),
        Value::Array(_) => parse_number(&to_display(value)),
        Value::Object(_) => f64::NAN,
    }
}

fn parse_number(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }
    match text {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let numeric = text
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if numeric {
        text.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// Store an arithmetic result; integral results become integers
pub fn number_value(f: f64) -> Value {
    if !f.is_finite() {
        return Value::Null;
    }
    if f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER {
        return Value::from(f as i64);
    }
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Containers collapse to their display text
fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::String(to_display(value)),
        other => other.clone(),
    }
}

/// `==` with type coercion
///
/// Two containers of the same kind compare structurally.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(_), Value::Number(_)) => to_number(a) == to_number(b),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => a == b,
        (Value::Bool(_), _) => loose_eq(&number_value(to_number(a)), b),
        (_, Value::Bool(_)) => loose_eq(a, &number_value(to_number(b))),
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            to_number(a) == to_number(b)
        }
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
            loose_eq(&to_primitive(a), &to_primitive(b))
        }
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    let (a, b) = (to_primitive(a), to_primitive(b));
    match (&a, &b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => to_number(&a).partial_cmp(&to_number(&b)),
    }
}

fn add(a: &Value, b: &Value) -> Value {
    let (a, b) = (to_primitive(a), to_primitive(b));
    if a.is_string() || b.is_string() {
        Value::String(to_display(&a) + &to_display(&b))
    } else {
        number_value(to_number(&a) + to_number(&b))
    }
}

/// Apply one operator of a chain
///
/// `&&` and `||` are evaluated lazily by the caller; here both operands are
/// already known.
pub fn binary(op: BinaryOp, a: &Value, b: &Value) -> Value {
    match op {
        BinaryOp::Eq => Value::Bool(loose_eq(a, b)),
        BinaryOp::NotEq => Value::Bool(!loose_eq(a, b)),
        BinaryOp::Add => add(a, b),
        BinaryOp::Sub => number_value(to_number(a) - to_number(b)),
        BinaryOp::And => (if truthy(a) { b } else { a }).clone(),
        BinaryOp::Or => (if truthy(a) { a } else { b }).clone(),
        BinaryOp::Less => Value::Bool(compare(a, b).is_some_and(Ordering::is_lt)),
        BinaryOp::LessOrEqual => Value::Bool(compare(a, b).is_some_and(Ordering::is_le)),
        BinaryOp::Greater => Value::Bool(compare(a, b).is_some_and(Ordering::is_gt)),
        BinaryOp::GreaterOrEqual => Value::Bool(compare(a, b).is_some_and(Ordering::is_ge)),
    }
}

/// Short type name for error messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mapping",
    }
}
