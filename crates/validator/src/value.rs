//! Dynamic value semantics for rule evaluation.
//!
//! Form values arrive as [`serde_json::Value`]s whose types are whatever the
//! value source produced: a number field may hold `"15"` or `15`. Rules
//! therefore compare values the way a loosely typed form runtime does. This
//! module is the single place those coercions live.

use serde_json::Value;

/// Returns `true` when the value counts as "filled in".
///
/// `null`, `false`, `0`, `NaN` and `""` are falsy; everything else,
/// including empty arrays and objects, is truthy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Parses a value as a finite number.
///
/// Only numbers and numeric strings qualify. Strings are trimmed and must
/// parse completely (`"15"` yes, `"15px"` no); infinities are rejected.
#[must_use]
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_numeric(s),
        _ => None,
    }
}

fn parse_numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Converts a value to the string a form runtime would display for it.
///
/// Integral floats drop their fraction (`1.0` is `"1"`). Arrays join their
/// elements with `,`; objects render as `[object Object]`.
#[must_use]
pub fn to_display(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_display(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_owned(),
    }
}

/// Loose equality with numeric coercion.
///
/// - same kinds compare structurally (numbers by value, so `1 == 1.0`)
/// - a number and a string compare numerically (`""` counts as `0`)
/// - a boolean is compared as `1` / `0`
/// - `null` only equals `null`
/// - an array compared with a primitive compares its display string
#[must_use]
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Bool(x), other) | (other, Value::Bool(x)) => {
            loose_eq(&Value::from(u8::from(*x)), other)
        }
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            coerce_string(s).is_some_and(|f| Some(f) == n.as_f64())
        }
        (Value::Array(_), Value::String(s)) | (Value::String(s), Value::Array(_)) => {
            let array = if a.is_array() { a } else { b };
            to_display(array) == *s
        }
        (Value::Array(_), Value::Number(_)) | (Value::Number(_), Value::Array(_)) => {
            let (array, number) = if a.is_array() { (a, b) } else { (b, a) };
            loose_eq(&Value::String(to_display(array)), number)
        }
        _ => a == b,
    }
}

/// Strict equality: no coercion across kinds, numbers compare by value.
#[must_use]
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// String-to-number coercion used by loose equality: blank is zero.
fn coerce_string(s: &str) -> Option<f64> {
    if s.trim().is_empty() {
        Some(0.0)
    } else {
        parse_numeric(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!(null), false)]
    #[case(json!(false), false)]
    #[case(json!(0), false)]
    #[case(json!(0.0), false)]
    #[case(json!(""), false)]
    #[case(json!("0"), true)]
    #[case(json!(" "), true)]
    #[case(json!(true), true)]
    #[case(json!(-1), true)]
    #[case(json!([]), true)]
    #[case(json!({}), true)]
    fn truthiness(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(is_truthy(&value), expected);
    }

    #[rstest]
    #[case(json!(15), Some(15.0))]
    #[case(json!("15"), Some(15.0))]
    #[case(json!(" -2.5 "), Some(-2.5))]
    #[case(json!("1e3"), Some(1000.0))]
    #[case(json!("15px"), None)]
    #[case(json!(""), None)]
    #[case(json!("inf"), None)]
    #[case(json!("NaN"), None)]
    #[case(json!(true), None)]
    #[case(json!(null), None)]
    fn numeric_parsing(#[case] value: Value, #[case] expected: Option<f64>) {
        assert_eq!(as_number(&value), expected);
    }

    #[test]
    fn display_matches_form_runtime() {
        assert_eq!(to_display(&json!("abc")), "abc");
        assert_eq!(to_display(&json!(18)), "18");
        assert_eq!(to_display(&json!(2.5)), "2.5");
        assert_eq!(to_display(&json!(1.0)), "1");
        assert_eq!(to_display(&json!(-0.0)), "0");
        assert_eq!(to_display(&json!(["a", 1, null])), "a,1,");
        assert_eq!(to_display(&json!({"a": 1})), "[object Object]");
    }

    #[rstest]
    #[case(json!(1), json!(1.0), true)]
    #[case(json!(1), json!("1"), false)]
    #[case(json!("abc"), json!("abc"), true)]
    #[case(json!(null), json!(false), false)]
    fn strict_equality(#[case] a: Value, #[case] b: Value, #[case] expected: bool) {
        assert_eq!(strict_eq(&a, &b), expected);
        assert_eq!(strict_eq(&b, &a), expected);
    }

    #[rstest]
    #[case(json!(1), json!("1"), true)]
    #[case(json!("1"), json!(1.0), true)]
    #[case(json!(0), json!(""), true)]
    #[case(json!(true), json!(1), true)]
    #[case(json!(true), json!("1"), true)]
    #[case(json!(false), json!("true"), false)]
    #[case(json!("a"), json!("A"), false)]
    #[case(json!(null), json!(0), false)]
    #[case(json!(null), json!(null), true)]
    #[case(json!(["a", "b"]), json!("a,b"), true)]
    #[case(json!([3]), json!(3), true)]
    fn loose_equality(#[case] a: Value, #[case] b: Value, #[case] expected: bool) {
        assert_eq!(loose_eq(&a, &b), expected);
        assert_eq!(loose_eq(&b, &a), expected);
    }
}
