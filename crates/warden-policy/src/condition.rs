//! Conditional escalation expressions.
//!
//! A condition has the exact shape `<field> <op> <value>`, with `op` one of
//! `>`, `<`, `>=`, `<=`, `==`, `!=`. The field is a context key; dots walk
//! into nested objects (`order.total`). Numbers may carry a leading `$` and
//! thousands separators.
//!
//! Evaluation is fail-closed: a missing or null field, or an ordering
//! comparison against something that is not a number, is `false`.
//!
//! Conditions are parsed once, when a policy document loads; a malformed
//! condition rejects the whole document.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use warden_contracts::error::{GovernanceError, GovernanceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl Comparison {
    fn parse(op: &str) -> Option<Self> {
        Some(match op {
            ">" => Comparison::Gt,
            "<" => Comparison::Lt,
            ">=" => Comparison::Ge,
            "<=" => Comparison::Le,
            "==" => Comparison::Eq,
            "!=" => Comparison::Ne,
            _ => return None,
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            Comparison::Gt => ">",
            Comparison::Lt => "<",
            Comparison::Ge => ">=",
            Comparison::Le => "<=",
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
        }
    }
}

/// A parsed `<field> <op> <value>` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    field: String,
    op: Comparison,
    literal: String,
    number: Option<f64>,
}

static GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][\w.]*)\s*(>=|<=|==|!=|>|<)\s*(\S.*?)\s*$")
        .expect("condition grammar is a valid regex")
});

impl Condition {
    /// Parse a condition string.
    ///
    /// Returns `GovernanceError::ConfigError` when the string does not have
    /// the `<field> <op> <value>` shape.
    pub fn parse(expression: &str) -> GovernanceResult<Self> {
        let caps = GRAMMAR.captures(expression).ok_or_else(|| GovernanceError::ConfigError {
            reason: format!(
                "malformed condition '{expression}': expected '<field> <op> <value>' with op one of > < >= <= == !="
            ),
        })?;

        let op = Comparison::parse(&caps[2]).ok_or_else(|| GovernanceError::ConfigError {
            reason: format!("unknown operator '{}' in condition '{expression}'", &caps[2]),
        })?;
        let literal = unquote(&caps[3]).to_string();

        Ok(Self {
            field: caps[1].to_string(),
            op,
            number: parse_number(&literal),
            literal,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Evaluate against a request context.
    pub fn evaluate(&self, context: &Value) -> bool {
        let Some(actual) = lookup(context, &self.field) else {
            return false;
        };
        if actual.is_null() {
            return false;
        }

        let actual_number = match actual {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_number(s),
            _ => None,
        };

        if let (Some(lhs), Some(rhs)) = (actual_number, self.number) {
            return match self.op {
                Comparison::Gt => lhs > rhs,
                Comparison::Lt => lhs < rhs,
                Comparison::Ge => lhs >= rhs,
                Comparison::Le => lhs <= rhs,
                Comparison::Eq => lhs == rhs,
                Comparison::Ne => lhs != rhs,
            };
        }

        let actual_text = match actual {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        match self.op {
            Comparison::Eq => actual_text == self.literal,
            Comparison::Ne => actual_text != self.literal,
            _ => false,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op.as_str(), self.literal)
    }
}

fn lookup<'a>(context: &'a Value, field: &str) -> Option<&'a Value> {
    field.split('.').try_fold(context, |value, key| value.get(key))
}

fn unquote(s: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|rest| rest.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}

/// `$1,250.50` → `1250.5`. Anything else that is not a plain number → `None`.
fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed);
    let cleaned: String = trimmed.chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use warden_contracts::error::GovernanceError;

    use super::{Condition, GRAMMAR};

    fn eval(expr: &str, ctx: serde_json::Value) -> bool {
        Condition::parse(expr).unwrap().evaluate(&ctx)
    }

    #[test]
    fn numeric_operators() {
        let ctx = json!({ "amount": 600 });
        assert!(eval("amount > 500", ctx.clone()));
        assert!(!eval("amount < 500", ctx.clone()));
        assert!(eval("amount >= 600", ctx.clone()));
        assert!(eval("amount <= 600", ctx.clone()));
        assert!(eval("amount == 600", ctx.clone()));
        assert!(eval("amount != 601", ctx));
    }

    #[test]
    fn currency_and_thousands_separators() {
        assert!(eval("amount > $1,000", json!({ "amount": 1500.25 })));
        assert!(eval("amount > 1000", json!({ "amount": "$1,500" })));
        assert!(!eval("amount > $1,000", json!({ "amount": "$999.99" })));
    }

    #[test]
    fn whitespace_is_optional() {
        assert!(eval("amount>500", json!({ "amount": 501 })));
        assert!(eval("  amount   >=   500  ", json!({ "amount": 500 })));
    }

    #[test]
    fn missing_or_null_field_is_false() {
        assert!(!eval("amount > 500", json!({})));
        assert!(!eval("amount != 500", json!({})));
        assert!(!eval("amount > 500", json!({ "amount": null })));
        assert!(!eval("amount > 500", json!(null)));
    }

    #[test]
    fn string_equality_strips_quotes() {
        let ctx = json!({ "tier": "gold" });
        assert!(eval("tier == gold", ctx.clone()));
        assert!(eval("tier == \"gold\"", ctx.clone()));
        assert!(eval("tier == 'gold'", ctx.clone()));
        assert!(eval("tier != silver", ctx.clone()));
        assert!(!eval("tier > silver", ctx), "ordering on text is false");
    }

    #[test]
    fn booleans_compare_as_text() {
        assert!(eval("vip == true", json!({ "vip": true })));
        assert!(!eval("vip == true", json!({ "vip": false })));
    }

    #[test]
    fn dotted_fields_walk_objects() {
        assert!(eval("order.total > 100", json!({ "order": { "total": 250 } })));
        assert!(!eval("order.total > 100", json!({ "order": 5 })));
    }

    #[test]
    fn malformed_conditions_are_config_errors() {
        for bad in ["", "amount", "amount >", "> 500", "amount => 500", "amount ~ 5", "1x > 2"] {
            match Condition::parse(bad) {
                Err(GovernanceError::ConfigError { reason }) => assert!(reason.contains("condition"), "{reason}"),
                other => panic!("expected ConfigError for {bad:?}, got {:?}", other),
            }
        }
    }

    #[test]
    fn grammar_is_shared_across_parses() {
        let first = Condition::parse("amount > 500").unwrap();
        let second = Condition::parse("amount > 500").unwrap();
        assert_eq!(first, second);
        assert!(GRAMMAR.is_match("order.total <= $1,000"));
        assert!(!GRAMMAR.is_match("amount"));
    }

    #[test]
    fn display_round_trips_shape() {
        let c = Condition::parse("amount>=$5").unwrap();
        assert_eq!(c.to_string(), "amount >= $5");
        assert_eq!(c.field(), "amount");
    }
}
