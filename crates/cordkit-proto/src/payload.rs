//! Structural-subset comparison of command payloads.
//!
//! The platform echoes registered commands back with extra server-side
//! fields (`id`, `version`, `application_id`, defaulted flags), so a
//! declared payload can never be compared to the remote one with plain
//! equality. Instead a declared payload *matches* a remote payload when
//! everything the declaration says is also said by the remote copy.
//!
//! The relation is reflexive but not symmetric.

use serde_json::{Number, Value};

/// Returns true if `remote` carries everything `declared` specifies.
///
/// - objects: every declared key exists in `remote` and its value matches
/// - arrays: same length, and every declared element matches some remote
///   element (the platform does not guarantee option order in responses)
/// - scalars: equal, where a string made only of ASCII digits compares as
///   the integer it spells (`"123"` matches `123`)
pub fn payload_matches(declared: &Value, remote: &Value) -> bool {
    match (declared, remote) {
        (Value::Object(ours), Value::Object(theirs)) => ours.iter().all(|(key, value)| {
            theirs
                .get(key)
                .is_some_and(|other| payload_matches(value, other))
        }),
        (Value::Array(ours), Value::Array(theirs)) => {
            ours.len() == theirs.len()
                && ours
                    .iter()
                    .all(|item| theirs.iter().any(|other| payload_matches(item, other)))
        }
        (Value::Object(_), _) | (_, Value::Object(_)) => false,
        (Value::Array(_), _) | (_, Value::Array(_)) => false,
        (a, b) => scalar_eq(a, b),
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => number_eq(&x, &y),
        (None, None) => a == b,
        _ => false,
    }
}

/// Numbers, and strings that spell a non-negative integer.
fn as_number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse::<u64>().ok().map(Number::from)
        }
        _ => None,
    }
}

fn number_eq(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
