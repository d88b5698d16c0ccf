//! Conditions — field predicates that gate an automation after its trigger
//! fires.
//!
//! Conditions evaluate against the event's field context
//! ([`ChangeEvent::condition_context`](crate::event::ChangeEvent::condition_context)),
//! never against the live store: evaluation is pure and cannot fail. A rule
//! that cannot be interpreted (unknown operator, non-numeric operand for a
//! numeric comparison) simply evaluates to `false`.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::activity::{FieldValue, Snapshot};

/// How the rules of a group combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOperator {
    /// Every rule must pass.
    And,
    /// At least one rule must pass.
    Or,
}

impl std::fmt::Display for GroupOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => f.write_str("and"),
            Self::Or => f.write_str("or"),
        }
    }
}

/// Comparison applied to a single field.
///
/// Stored rules may carry operators added by newer versions; those
/// deserialize as [`Unknown`](Self::Unknown) and evaluate to `false` instead
/// of failing the whole automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    IsEmpty,
    IsNotEmpty,
    GreaterThan,
    LessThan,
    Exists,
    #[serde(other)]
    Unknown,
}

/// A single field predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionRule {
    /// Context field the rule reads.
    pub field: String,
    /// Comparison to apply.
    pub operator: ConditionOperator,
    /// Right-hand operand; unused by presence/emptiness operators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ConditionRule {
    /// Predicate without a right-hand operand (`is_empty`, `exists`, …).
    #[must_use]
    pub fn on(field: impl Into<String>, operator: ConditionOperator) -> Self {
        Self {
            field: field.into(),
            operator,
            value: None,
        }
    }

    /// Predicate comparing a field against `value`.
    #[must_use]
    pub fn comparing(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: Some(value.into()),
        }
    }

    /// Evaluate the rule against a field context.
    ///
    /// Missing fields behave as empty values; the textual operators compare
    /// against the empty string, the numeric ones fail.
    #[must_use]
    pub fn evaluate(&self, context: &Snapshot) -> bool {
        let field = context.get(&self.field);
        let expected = self.value.as_deref().unwrap_or("");
        let actual = field
            .and_then(FieldValue::as_text)
            .unwrap_or(Cow::Borrowed(""));

        match self.operator {
            ConditionOperator::Equals => actual == expected,
            ConditionOperator::NotEquals => actual != expected,
            ConditionOperator::Contains => actual.contains(expected),
            ConditionOperator::StartsWith => actual.starts_with(expected),
            ConditionOperator::EndsWith => actual.ends_with(expected),
            ConditionOperator::In => Self::in_set(&actual, expected),
            ConditionOperator::NotIn => !Self::in_set(&actual, expected),
            ConditionOperator::IsEmpty => field.is_none_or(FieldValue::is_empty),
            ConditionOperator::IsNotEmpty => field.is_some_and(|value| !value.is_empty()),
            ConditionOperator::GreaterThan => {
                Self::compare_numbers(field, expected, |lhs, rhs| lhs > rhs)
            }
            ConditionOperator::LessThan => {
                Self::compare_numbers(field, expected, |lhs, rhs| lhs < rhs)
            }
            ConditionOperator::Exists => context.contains(&self.field),
            ConditionOperator::Unknown => false,
        }
    }

    /// Membership in a comma-separated set, entries trimmed, blanks dropped.
    fn in_set(actual: &str, raw_set: &str) -> bool {
        raw_set
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .any(|entry| entry == actual)
    }

    fn compare_numbers(
        field: Option<&FieldValue>,
        expected: &str,
        cmp: impl Fn(f64, f64) -> bool,
    ) -> bool {
        let lhs = field.and_then(FieldValue::as_number);
        let rhs = expected.trim().parse::<f64>().ok();
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => cmp(lhs, rhs),
            _ => false,
        }
    }
}

impl std::fmt::Display for ConditionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {:?} {value:?}", self.field, self.operator),
            None => write!(f, "{} {:?}", self.field, self.operator),
        }
    }
}

/// An AND/OR combination of field predicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub operator: GroupOperator,
    pub rules: Vec<ConditionRule>,
}

impl ConditionGroup {
    /// Group passing only when every rule passes.
    #[must_use]
    pub fn all(rules: Vec<ConditionRule>) -> Self {
        Self {
            operator: GroupOperator::And,
            rules,
        }
    }

    /// Group passing when at least one rule passes.
    #[must_use]
    pub fn any(rules: Vec<ConditionRule>) -> Self {
        Self {
            operator: GroupOperator::Or,
            rules,
        }
    }

    /// Evaluate the group against a field context.
    ///
    /// An empty group passes regardless of the operator. Evaluation
    /// short-circuits on the first decisive rule.
    #[must_use]
    pub fn evaluate(&self, context: &Snapshot) -> bool {
        if self.rules.is_empty() {
            return true;
        }
        match self.operator {
            GroupOperator::And => self.rules.iter().all(|rule| rule.evaluate(context)),
            GroupOperator::Or => self.rules.iter().any(|rule| rule.evaluate(context)),
        }
    }
}
