#![forbid(unsafe_code)]

//! Equality policies used to decide whether an observed output matches the
//! expected value recorded in a test case.
//!
//! Every policy is a pure function of `(expected, got)`. Numbers are
//! canonicalized before comparison so that `2` and `2.0` agree, which is the
//! behavior JSON fixtures authored in dynamically typed languages rely on.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt::Write as _;

/// Absolute tolerance applied by [`EqualityPolicy::FloatTolerant`].
pub const DEFAULT_FLOAT_EPSILON: f64 = 1e-5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqualityPolicy {
    #[default]
    Exact,
    OrderIndependent,
    FloatTolerant,
    Membership,
}

impl EqualityPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::OrderIndependent => "order_independent",
            Self::FloatTolerant => "float_tolerant",
            Self::Membership => "membership",
        }
    }

    /// Applies the policy. For `Membership`, `expected` is the set of
    /// acceptable answers.
    ///
    /// `Exact` still tolerates float noise when both sides are non-integral
    /// numbers; solutions computing averages would otherwise fail on the last
    /// ulp.
    #[must_use]
    pub fn evaluate(self, expected: &Value, got: &Value) -> bool {
        match self {
            Self::Exact => {
                if is_float(expected) && is_float(got) {
                    float_tolerant(expected, got, DEFAULT_FLOAT_EPSILON)
                } else {
                    exact(expected, got)
                }
            }
            Self::OrderIndependent => order_independent(expected, got),
            Self::FloatTolerant => float_tolerant(expected, got, DEFAULT_FLOAT_EPSILON),
            Self::Membership => membership(expected, got),
        }
    }
}

impl std::fmt::Display for EqualityPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deep structural equality after canonical encoding.
#[must_use]
pub fn exact(expected: &Value, got: &Value) -> bool {
    canonical_json(expected) == canonical_json(got)
}

/// Equality after recursively sorting grouping lists.
///
/// The outermost list is always treated as an unordered grouping. Nested
/// lists are sorted only when they contain lists themselves, so a leaf
/// sequence such as `[2, 1]` keeps its internal order while a list of
/// groups such as `[[2], [1]]` does not.
#[must_use]
pub fn order_independent(expected: &Value, got: &Value) -> bool {
    canonical_json(&normalize_unordered(expected)) == canonical_json(&normalize_unordered(got))
}

/// Numeric comparison with a strict absolute tolerance; non-numeric values
/// fall back to [`exact`].
#[must_use]
pub fn float_tolerant(expected: &Value, got: &Value, epsilon: f64) -> bool {
    match (expected.as_f64(), got.as_f64()) {
        (Some(lhs), Some(rhs)) => (lhs - rhs).abs() < epsilon,
        _ => exact(expected, got),
    }
}

/// True when `got` exactly matches any element of `acceptable`. A
/// non-list `acceptable` degrades to [`exact`].
#[must_use]
pub fn membership(acceptable: &Value, got: &Value) -> bool {
    match acceptable {
        Value::Array(options) => {
            let got_key = canonical_json(got);
            options
                .iter()
                .any(|option| canonical_json(option) == got_key)
        }
        other => exact(other, got),
    }
}

/// Recursively sorts grouping lists by their canonical text.
///
/// The ordering is textual, not numeric: `[10, 9, 100]` normalizes to
/// `[10, 100, 9]`. It only needs to be total and stable, which it is.
#[must_use]
pub fn normalize_unordered(value: &Value) -> Value {
    normalize_at_depth(value, 0)
}

fn normalize_at_depth(value: &Value, depth: usize) -> Value {
    match value {
        Value::Array(items) => {
            let mut normalized: Vec<Value> = items
                .iter()
                .map(|item| normalize_at_depth(item, depth + 1))
                .collect();
            if depth == 0 || normalized.iter().any(Value::is_array) {
                normalized.sort_by_cached_key(canonical_json);
            }
            Value::Array(normalized)
        }
        other => canonicalize(other),
    }
}

/// Rewrites integral floats as integers, recursively.
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Number(number) => Value::Number(canonical_number(number)),
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), canonicalize(item)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn canonical_number(number: &Number) -> Number {
    if number.is_i64() || number.is_u64() {
        return number.clone();
    }
    match number.as_f64() {
        Some(float)
            if float.is_finite()
                && float.fract() == 0.0
                && float >= i64::MIN as f64
                && float <= i64::MAX as f64 =>
        {
            Number::from(float as i64)
        }
        _ => number.clone(),
    }
}

fn is_float(value: &Value) -> bool {
    matches!(value, Value::Number(number) if number.is_f64())
}

/// Canonical text: sorted object keys, `", "` and `": "` separators, ASCII
/// escapes for everything outside printable ASCII, integral floats written
/// as integers. Other floats are spelled the way Python's `repr` spells
/// them, so sorting by this text orders values the way
/// `json.dumps(sort_keys=True)` keys do.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(flag) => out.push_str(if *flag { "true" } else { "false" }),
        Value::Number(number) => {
            let number = canonical_number(number);
            match number.as_f64().filter(|_| number.is_f64()) {
                Some(float) => write_python_float(float, out),
                None => {
                    let _ = write!(out, "{number}");
                }
            }
        }
        Value::String(text) => write_ascii_string(text, out),
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (idx, key) in keys.into_iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                write_ascii_string(key, out);
                out.push_str(": ");
                if let Some(item) = map.get(key) {
                    write_canonical(item, out);
                }
            }
            out.push('}');
        }
    }
}

/// Shortest round-trip digits; scientific notation with a signed, at least
/// two-digit exponent outside `1e-4 <= |x| < 1e16`.
fn write_python_float(value: f64, out: &mut String) {
    let scientific = format!("{value:e}");
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if (-4..16).contains(&exponent) {
        let _ = write!(out, "{value}");
        if value.fract() == 0.0 {
            out.push_str(".0");
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        let _ = write!(out, "{mantissa}e{sign}{:02}", exponent.unsigned_abs());
    }
}

fn write_ascii_string(text: &str, out: &mut String) {
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ' '..='~' => out.push(ch),
            _ => {
                let mut units = [0_u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::{
        EqualityPolicy, canonical_json, exact, float_tolerant, membership, normalize_unordered,
        order_independent,
    };
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn exact_treats_integral_floats_as_integers() {
        assert!(exact(&json!([1, 2.0, 3]), &json!([1, 2, 3.0])));
        assert!(!exact(&json!([1, 2]), &json!([2, 1])));
        assert!(exact(&json!({"b": 1, "a": [true, null]}), &json!({"a": [true, null], "b": 1.0})));
    }

    #[test]
    fn exact_policy_upgrades_to_tolerance_for_two_floats() {
        assert!(EqualityPolicy::Exact.evaluate(&json!(2.5), &json!(2.500_000_1)));
        assert!(!EqualityPolicy::Exact.evaluate(&json!(2.5), &json!(2.6)));
        assert!(!EqualityPolicy::Exact.evaluate(&json!(3), &json!(3.000_000_1)));
    }

    #[test]
    fn order_independent_sorts_outer_and_grouping_lists() {
        assert!(order_independent(
            &json!([[1, 2], [3]]),
            &json!([[3], [1, 2]])
        ));
        assert!(order_independent(
            &json!([[[1], [2]], [[3]]]),
            &json!([[[3]], [[2], [1]]])
        ));
        assert!(order_independent(&json!([3, 1, 2]), &json!([1, 2, 3])));
    }

    #[test]
    fn order_independent_keeps_leaf_sequence_order() {
        assert!(!order_independent(
            &json!([[1, 2], [3]]),
            &json!([[3], [2, 1]])
        ));
        assert!(!order_independent(&json!([[1, 2]]), &json!([[1, 2], [1, 2]])));
    }

    #[test]
    fn order_key_is_textual_not_numeric() {
        assert_eq!(normalize_unordered(&json!([10, 9, 100])), json!([10, 100, 9]));
        assert_eq!(
            normalize_unordered(&json!([["b"], ["a", "c"]])),
            json!([["a", "c"], ["b"]])
        );
    }

    #[test]
    fn float_tolerance_is_strict() {
        assert!(float_tolerant(&json!(2.5), &json!(2.500_001), 1e-5));
        assert!(!float_tolerant(&json!(0.0), &json!(0.5), 0.5));
        assert!(float_tolerant(&json!("x"), &json!("x"), 1e-5));
        assert!(!float_tolerant(&json!("x"), &json!(1.0), 1e-5));
    }

    #[test]
    fn float_tolerance_accepts_half_epsilon() {
        assert!(float_tolerant(&json!(1.0), &json!(1.000_005), 1e-5));
        assert!(EqualityPolicy::Exact.evaluate(&json!(1.0), &json!(1.000_005)));
        assert!(EqualityPolicy::FloatTolerant.evaluate(&json!(1.000_005), &json!(1.0)));
    }

    #[test]
    fn float_tolerance_rejects_exact_epsilon_boundary() {
        assert!(!float_tolerant(&json!(1.0), &json!(1.000_01), 1e-5));
        assert!(!EqualityPolicy::Exact.evaluate(&json!(1.0), &json!(1.000_01)));
        assert!(!EqualityPolicy::FloatTolerant.evaluate(&json!(1.000_01), &json!(1.0)));
    }

    #[test]
    fn membership_checks_each_acceptable_answer() {
        assert!(membership(&json!(["bab", "aba"]), &json!("aba")));
        assert!(!membership(&json!(["bab", "aba"]), &json!("abc")));
        assert!(membership(&json!("bb"), &json!("bb")));
        assert!(membership(&json!([[1, 2], [2, 1]]), &json!([2, 1])));
    }

    #[test]
    fn canonical_text_matches_python_json_dumps() {
        assert_eq!(
            canonical_json(&json!({"z": [1, 2.0], "a": "caf\u{e9}"})),
            r#"{"a": "caf\u00e9", "z": [1, 2]}"#
        );
        assert_eq!(canonical_json(&json!("\u{1f600}")), r#""\ud83d\ude00""#);
        assert_eq!(canonical_json(&json!([null, true, -3])), "[null, true, -3]");
    }

    #[test]
    fn float_text_follows_python_repr() {
        assert_eq!(canonical_json(&json!(0.1)), "0.1");
        assert_eq!(canonical_json(&json!(0.0001)), "0.0001");
        assert_eq!(canonical_json(&json!(-2.5)), "-2.5");
        assert_eq!(canonical_json(&json!(1e-7)), "1e-07");
        assert_eq!(canonical_json(&json!(2.5e-5)), "2.5e-05");
        assert_eq!(canonical_json(&json!(1.5e300)), "1.5e+300");
        assert_eq!(canonical_json(&json!(1e21)), "1e+21");
        assert_eq!(canonical_json(&json!(123_456_789_012_345.6)), "123456789012345.6");
    }

    #[test]
    fn policies_are_reflexive() {
        let samples = [
            json!(null),
            json!([[1, 2], [3]]),
            json!({"k": [0.5, "s"]}),
            json!(1.25),
        ];
        for sample in &samples {
            for policy in [
                EqualityPolicy::Exact,
                EqualityPolicy::OrderIndependent,
                EqualityPolicy::FloatTolerant,
            ] {
                assert!(policy.evaluate(sample, sample), "{policy} on {sample}");
            }
        }
    }

    fn groups() -> impl Strategy<Value = Vec<Vec<i64>>> {
        proptest::collection::vec(proptest::collection::vec(-20_i64..20, 0..4), 0..6)
    }

    proptest! {
        #[test]
        fn order_independent_is_an_equivalence_over_regroupings(
            (original, shuffled, reshuffled) in groups().prop_flat_map(|groups| {
                (
                    Just(groups.clone()),
                    Just(groups.clone()).prop_shuffle(),
                    Just(groups).prop_shuffle(),
                )
            }),
            other in groups(),
        ) {
            let (x, y, z, w) = (json!(original), json!(shuffled), json!(reshuffled), json!(other));
            prop_assert!(order_independent(&x, &x));
            prop_assert!(order_independent(&x, &y));
            prop_assert!(order_independent(&y, &x));
            prop_assert!(order_independent(&y, &z));
            prop_assert!(order_independent(&x, &z));
            prop_assert_eq!(order_independent(&x, &w), order_independent(&w, &x));
            if order_independent(&x, &w) {
                prop_assert!(order_independent(&y, &w));
            }
        }

        #[test]
        fn permuting_a_leaf_group_breaks_equality(
            others in groups(),
            leaf in proptest::collection::vec(-20_i64..20, 2..5)
                .prop_filter("leaf must not be a palindrome", |leaf| leaf.iter().ne(leaf.iter().rev())),
            at in 0_usize..6,
        ) {
            let mut original = others;
            let at = at.min(original.len());
            original.insert(at, leaf.clone());
            let mut permuted = original.clone();
            permuted[at].reverse();
            prop_assert!(!order_independent(&json!(original), &json!(permuted)));
        }
    }
}
