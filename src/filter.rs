//! Metadata filter grammar and evaluator.
//!
//! A query filter maps a metadata field to an expression, and an expression
//! maps an operator to its operand. All field predicates are conjoined: a
//! record matches iff every field expression is satisfied.
//!
//! Operators: `eq`, `neq`, `lt`, `lte`, `gt`, `gte`, `between`, `contains`,
//! `in`, `exists`. Ordered comparisons parse both sides as floats and fall
//! back to lexicographic string comparison when either parse fails. An
//! unknown operator fails the predicate rather than erroring the query.

use serde_json::Value;
use std::collections::HashMap;

/// A single filter expression: operator name → operand.
pub type FilterExpr = HashMap<String, Value>;

/// A full filter: metadata field → expression. Conjunctive.
pub type Filters = HashMap<String, FilterExpr>;

/// Evaluates a filter against record metadata. An empty filter matches
/// everything.
pub fn matches(metadata: &HashMap<String, String>, filters: &Filters) -> bool {
    filters.iter().all(|(field, expr)| {
        let value = metadata.get(field).map(String::as_str);
        evaluate_expression(value, expr)
    })
}

fn evaluate_expression(value: Option<&str>, expr: &FilterExpr) -> bool {
    expr.iter()
        .all(|(op, operand)| evaluate_operator(value, op, operand))
}

fn evaluate_operator(value: Option<&str>, op: &str, operand: &Value) -> bool {
    if op == "exists" {
        return matches!(operand, Value::Bool(expected) if *expected == value.is_some());
    }
    // Every other operator fails when the field is absent.
    let Some(value) = value else {
        return false;
    };
    match op {
        "eq" => value == stringify(operand),
        "neq" => value != stringify(operand),
        "lt" => compare_less(value, operand, false),
        "lte" => compare_less(value, operand, true),
        "gt" => compare_greater(value, operand, false),
        "gte" => compare_greater(value, operand, true),
        "between" => compare_between(value, operand),
        "contains" => value
            .to_lowercase()
            .contains(&stringify(operand).to_lowercase()),
        "in" => compare_in(value, operand),
        _ => false,
    }
}

fn compare_less(value: &str, operand: &Value, or_equal: bool) -> bool {
    match (parse_f64(value), operand_to_f64(operand)) {
        (Some(v), Some(x)) => {
            if or_equal {
                v <= x
            } else {
                v < x
            }
        }
        _ => {
            let x = stringify(operand);
            if or_equal {
                value <= x.as_str()
            } else {
                value < x.as_str()
            }
        }
    }
}

fn compare_greater(value: &str, operand: &Value, or_equal: bool) -> bool {
    match (parse_f64(value), operand_to_f64(operand)) {
        (Some(v), Some(x)) => {
            if or_equal {
                v >= x
            } else {
                v > x
            }
        }
        _ => {
            let x = stringify(operand);
            if or_equal {
                value >= x.as_str()
            } else {
                value > x.as_str()
            }
        }
    }
}

fn compare_between(value: &str, operand: &Value) -> bool {
    let Value::Array(range) = operand else {
        return false;
    };
    if range.len() != 2 {
        return false;
    }
    match (
        parse_f64(value),
        operand_to_f64(&range[0]),
        operand_to_f64(&range[1]),
    ) {
        (Some(v), Some(lo), Some(hi)) => lo <= v && v <= hi,
        _ => false,
    }
}

fn compare_in(value: &str, operand: &Value) -> bool {
    match operand {
        Value::Array(items) => items.iter().any(|item| value == stringify(item)),
        _ => false,
    }
}

fn parse_f64(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

fn operand_to_f64(operand: &Value) -> Option<f64> {
    match operand {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_f64(s),
        _ => None,
    }
}

/// Renders a JSON operand the way it compares against stored string metadata:
/// strings without quotes, booleans as `true`/`false`, numbers in their
/// shortest decimal form.
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn filter(field: &str, op: &str, operand: Value) -> Filters {
        let mut expr = FilterExpr::new();
        expr.insert(op.to_string(), operand);
        let mut filters = Filters::new();
        filters.insert(field.to_string(), expr);
        filters
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let metadata = meta(&[("any", "value")]);
        assert!(matches(&metadata, &Filters::new()));
    }

    #[test]
    fn test_eq_string() {
        let metadata = meta(&[("author", "Einstein")]);
        assert!(matches(&metadata, &filter("author", "eq", json!("Einstein"))));
        assert!(!matches(&metadata, &filter("author", "eq", json!("Newton"))));
    }

    #[test]
    fn test_eq_number_stringified() {
        let metadata = meta(&[("year", "1925")]);
        assert!(matches(&metadata, &filter("year", "eq", json!(1925))));
        assert!(!matches(&metadata, &filter("year", "eq", json!(1926))));
    }

    #[test]
    fn test_neq() {
        let metadata = meta(&[("status", "active")]);
        assert!(matches(&metadata, &filter("status", "neq", json!("deleted"))));
        assert!(!matches(&metadata, &filter("status", "neq", json!("active"))));
    }

    #[test]
    fn test_numeric_comparisons() {
        let metadata = meta(&[("year", "1925")]);
        assert!(matches(&metadata, &filter("year", "gt", json!(1900))));
        assert!(matches(&metadata, &filter("year", "gte", json!(1925))));
        assert!(matches(&metadata, &filter("year", "lt", json!(1950))));
        assert!(matches(&metadata, &filter("year", "lte", json!(1925))));
        assert!(!matches(&metadata, &filter("year", "gt", json!(1925))));
        assert!(!matches(&metadata, &filter("year", "lt", json!(1925))));
    }

    #[test]
    fn test_numeric_comparison_with_string_operand() {
        let metadata = meta(&[("score", "0.8")]);
        assert!(matches(&metadata, &filter("score", "gte", json!("0.5"))));
    }

    #[test]
    fn test_lexicographic_fallback() {
        // Neither side parses as a number, so ordering is lexicographic.
        let metadata = meta(&[("name", "banana")]);
        assert!(matches(&metadata, &filter("name", "gt", json!("apple"))));
        assert!(matches(&metadata, &filter("name", "lt", json!("cherry"))));
    }

    #[test]
    fn test_between() {
        let metadata = meta(&[("year", "1925")]);
        assert!(matches(
            &metadata,
            &filter("year", "between", json!([1900, 1950]))
        ));
        assert!(!matches(
            &metadata,
            &filter("year", "between", json!([1930, 1950]))
        ));
    }

    #[test]
    fn test_between_inclusive_bounds() {
        let metadata = meta(&[("year", "1900")]);
        assert!(matches(
            &metadata,
            &filter("year", "between", json!([1900, 1950]))
        ));
    }

    #[test]
    fn test_between_rejects_malformed_range() {
        let metadata = meta(&[("year", "1925")]);
        assert!(!matches(&metadata, &filter("year", "between", json!([1900]))));
        assert!(!matches(&metadata, &filter("year", "between", json!(1900))));
        assert!(!matches(
            &metadata,
            &filter("year", "between", json!(["a", "b"]))
        ));
    }

    #[test]
    fn test_between_non_numeric_value_fails() {
        let metadata = meta(&[("year", "unknown")]);
        assert!(!matches(
            &metadata,
            &filter("year", "between", json!([1900, 1950]))
        ));
    }

    #[test]
    fn test_contains_case_insensitive() {
        let metadata = meta(&[("text", "The Quick Brown Fox")]);
        assert!(matches(&metadata, &filter("text", "contains", json!("quick"))));
        assert!(matches(&metadata, &filter("text", "contains", json!("BROWN"))));
        assert!(!matches(&metadata, &filter("text", "contains", json!("slow"))));
    }

    #[test]
    fn test_in_list() {
        let metadata = meta(&[("lang", "it")]);
        assert!(matches(
            &metadata,
            &filter("lang", "in", json!(["en", "it", "fr"]))
        ));
        assert!(!matches(&metadata, &filter("lang", "in", json!(["en", "fr"]))));
    }

    #[test]
    fn test_in_stringifies_elements() {
        let metadata = meta(&[("year", "1925")]);
        assert!(matches(&metadata, &filter("year", "in", json!([1925, 1687]))));
    }

    #[test]
    fn test_in_non_array_operand_fails() {
        let metadata = meta(&[("lang", "it")]);
        assert!(!matches(&metadata, &filter("lang", "in", json!("it"))));
    }

    #[test]
    fn test_exists() {
        let metadata = meta(&[("author", "Einstein")]);
        assert!(matches(&metadata, &filter("author", "exists", json!(true))));
        assert!(!matches(&metadata, &filter("author", "exists", json!(false))));
        assert!(matches(&metadata, &filter("missing", "exists", json!(false))));
        assert!(!matches(&metadata, &filter("missing", "exists", json!(true))));
    }

    #[test]
    fn test_exists_non_boolean_operand_fails() {
        let metadata = meta(&[("author", "Einstein")]);
        assert!(!matches(&metadata, &filter("author", "exists", json!("yes"))));
    }

    #[test]
    fn test_missing_field_fails_every_other_operator() {
        let metadata = meta(&[]);
        for op in ["eq", "neq", "lt", "lte", "gt", "gte", "contains", "in"] {
            assert!(
                !matches(&metadata, &filter("missing", op, json!("x"))),
                "operator {op} should fail on a missing field"
            );
        }
    }

    #[test]
    fn test_unknown_operator_fails() {
        let metadata = meta(&[("author", "Einstein")]);
        assert!(!matches(
            &metadata,
            &filter("author", "regex", json!("Ein.*"))
        ));
    }

    #[test]
    fn test_conjunction_across_fields() {
        let metadata = meta(&[("author", "Einstein"), ("year", "1925")]);
        let mut filters = filter("author", "eq", json!("Einstein"));
        let mut year_expr = FilterExpr::new();
        year_expr.insert("gte".to_string(), json!(1900));
        year_expr.insert("lte".to_string(), json!(1950));
        filters.insert("year".to_string(), year_expr);
        assert!(matches(&metadata, &filters));

        let newton = meta(&[("author", "Newton"), ("year", "1687")]);
        assert!(!matches(&newton, &filters));
    }

    #[test]
    fn test_stringify_forms() {
        assert_eq!(stringify(&json!("plain")), "plain");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&json!(42)), "42");
        assert_eq!(stringify(&json!(0.5)), "0.5");
        assert_eq!(stringify(&Value::Null), "null");
    }
}
