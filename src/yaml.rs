//! Decodes the two YAML shapes beanstalkd replies with: flat lists of names and
//! flat dictionaries of statistics.
//!
//! This is deliberately not a YAML parser. It scans line by line for `- value`
//! or `key: value`, and skips anything else (document markers included).
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Keys whose values stay strings even when they look numeric, e.g. a tube
/// called `1` or a server version of `1.10`.
const STRING_KEYS: [&str; 3] = ["name", "tube", "version"];

/// A single decoded statistics value.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

/// A decoded `stats`, `stats-tube` or `stats-job` reply.
pub type Dict = BTreeMap<String, Value>;

/// Returns the remainder of every line starting with `- `, in order.
pub fn parse_list(yaml: &str) -> Vec<String> {
    yaml.lines()
        .filter_map(|line| line.strip_prefix("- "))
        .map(str::to_owned)
        .collect()
}

/// Collects every `key: value` line into a [Dict]. A later duplicate key
/// replaces the earlier value.
///
/// Keys and values may not contain whitespace, and keys may not contain `:`;
/// lines that break either rule are skipped.
pub fn parse_dict(yaml: &str) -> Dict {
    yaml.lines()
        .filter_map(split_entry)
        .map(|(key, val)| (key.to_owned(), infer(key, val)))
        .collect()
}

fn split_entry(line: &str) -> Option<(&str, &str)> {
    let (key, val) = line.split_once(':')?;
    let (key, val) = (key.trim(), val.trim());

    let has_ws = |s: &str| s.chars().any(char::is_whitespace);
    if key.is_empty() || has_ws(key) || has_ws(val) {
        return None;
    }

    Some((key, val))
}

fn infer(key: &str, val: &str) -> Value {
    if STRING_KEYS.contains(&key) {
        return Value::Str(val.to_owned());
    }

    if is_int(val) {
        // Out of i64 range: keep the digits exactly rather than round them.
        return match val.parse() {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Str(val.to_owned()),
        };
    }

    if is_float(val) {
        if let Ok(f) = val.parse() {
            return Value::Float(f);
        }
    }

    Value::Str(val.to_owned())
}

/// `0`, or an optional `-` then digits without a leading zero.
fn is_int(val: &str) -> bool {
    if val == "0" {
        return true;
    }

    let digits = val.strip_prefix('-').unwrap_or(val);

    matches!(
        digits.as_bytes(),
        [b'1'..=b'9', rest @ ..] if rest.iter().all(u8::is_ascii_digit)
    )
}

/// An optional `-`, digits, an optional `.digits` fraction, then an optional
/// `e` exponent with optional sign whose digits don't start with zero.
fn is_float(val: &str) -> bool {
    let rest = val.strip_prefix('-').unwrap_or(val);

    let (mantissa, exponent) = match rest.split_once('e') {
        Some((m, e)) => (m, Some(e)),
        None => (rest, None),
    };

    let all_digits =
        |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    let mantissa_ok = match mantissa.split_once('.') {
        Some((whole, frac)) => all_digits(whole) && all_digits(frac),
        None => all_digits(mantissa),
    };

    let exponent_ok = match exponent {
        None => true,
        Some(e) => {
            let e = e.strip_prefix(['+', '-']).unwrap_or(e);
            all_digits(e) && !e.starts_with('0')
        },
    };

    mantissa_ok && exponent_ok
}
