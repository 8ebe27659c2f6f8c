use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Typed operand used by rule conditions and request attributes.
///
/// Serialized untagged so rule payloads read naturally: `700`, `"self_employed"`, `true`,
/// `["business", "vacation"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Boolean(bool),
    Number(f64),
    Text(String),
    TextSet(Vec<String>),
}

impl RuleValue {
    pub fn text(value: impl Into<String>) -> Self {
        RuleValue::Text(value.into())
    }

    pub fn text_set<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RuleValue::TextSet(values.into_iter().map(Into::into).collect())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            RuleValue::Number(value) if value.is_finite() => Some(*value),
            _ => None,
        }
    }

    pub const fn kind(&self) -> ValueKind {
        match self {
            RuleValue::Boolean(_) => ValueKind::Boolean,
            RuleValue::Number(_) => ValueKind::Number,
            RuleValue::Text(_) => ValueKind::Text,
            RuleValue::TextSet(_) => ValueKind::TextSet,
        }
    }

    fn loosely_equals(&self, other: &RuleValue) -> bool {
        match (self, other) {
            (RuleValue::Boolean(left), RuleValue::Boolean(right)) => left == right,
            (RuleValue::Number(left), RuleValue::Number(right)) => numbers_equal(*left, *right),
            (RuleValue::Text(left), RuleValue::Text(right)) => left == right,
            (RuleValue::TextSet(left), RuleValue::TextSet(right)) => {
                left.iter().collect::<BTreeSet<_>>() == right.iter().collect::<BTreeSet<_>>()
            }
            _ => false,
        }
    }
}

impl From<f64> for RuleValue {
    fn from(value: f64) -> Self {
        RuleValue::Number(value)
    }
}

impl From<bool> for RuleValue {
    fn from(value: bool) -> Self {
        RuleValue::Boolean(value)
    }
}

impl From<&str> for RuleValue {
    fn from(value: &str) -> Self {
        RuleValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Boolean,
    Number,
    Text,
    TextSet,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::Text => "text",
            ValueKind::TextSet => "text set",
        };
        f.write_str(label)
    }
}

/// Comparison applied between a fact and the rule's literal operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Gt,
    Lt,
    Eq,
    Gte,
    Lte,
    In,
    Contains,
}

impl Operator {
    pub const fn label(self) -> &'static str {
        match self {
            Operator::Gt => "gt",
            Operator::Lt => "lt",
            Operator::Eq => "eq",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::Contains => "contains",
        }
    }

    /// Checks whether `operand` is a literal this operator can ever be satisfied by.
    pub fn accepts_operand(self, operand: &RuleValue) -> Result<(), String> {
        let kind = operand.kind();
        let accepted = match self {
            Operator::Gt | Operator::Lt | Operator::Gte | Operator::Lte => {
                operand.as_number().is_some()
            }
            Operator::Eq => !matches!(operand, RuleValue::Number(value) if !value.is_finite()),
            Operator::In => kind == ValueKind::TextSet,
            Operator::Contains => kind == ValueKind::Text,
        };

        if accepted {
            Ok(())
        } else {
            Err(format!(
                "operator '{}' cannot compare against a {} value",
                self.label(),
                kind
            ))
        }
    }

    /// Evaluate `fact <op> operand`. Type mismatches evaluate to `false` rather than erroring.
    pub fn evaluate(self, fact: &RuleValue, operand: &RuleValue) -> bool {
        match self {
            Operator::Gt => compare_numbers(fact, operand, |left, right| left > right),
            Operator::Lt => compare_numbers(fact, operand, |left, right| left < right),
            Operator::Gte => compare_numbers(fact, operand, |left, right| {
                left > right || numbers_equal(left, right)
            }),
            Operator::Lte => compare_numbers(fact, operand, |left, right| {
                left < right || numbers_equal(left, right)
            }),
            Operator::Eq => fact.loosely_equals(operand),
            Operator::In => match (fact, operand) {
                (RuleValue::Text(value), RuleValue::TextSet(set)) => set.contains(value),
                _ => false,
            },
            Operator::Contains => match (fact, operand) {
                (RuleValue::Text(haystack), RuleValue::Text(needle)) => {
                    haystack.contains(needle.as_str())
                }
                (RuleValue::TextSet(members), RuleValue::Text(needle)) => members.contains(needle),
                _ => false,
            },
        }
    }
}

fn compare_numbers(fact: &RuleValue, operand: &RuleValue, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (fact.as_number(), operand.as_number()) {
        (Some(left), Some(right)) => cmp(left, right),
        _ => false,
    }
}

fn numbers_equal(left: f64, right: f64) -> bool {
    let scale = left.abs().max(right.abs()).max(1.0);
    (left - right).abs() <= f64::EPSILON * scale * 16.0
}
