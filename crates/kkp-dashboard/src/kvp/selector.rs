use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use snafu::Snafu;

type Result<T, E = SelectorError> = std::result::Result<T, E>;

#[derive(Debug, Eq, PartialEq, Snafu)]
pub enum SelectorError {
    #[snafu(display("label selector with binary operator {operator:?} must have values"))]
    BinaryOperatorWithoutValues { operator: String },

    #[snafu(display("label selector with unary operator {operator:?} must not have values"))]
    UnaryOperatorWithValues { operator: String },

    #[snafu(display("label selector has an invalid operator {operator:?}"))]
    InvalidOperator { operator: String },
}

/// Extends [`LabelSelector`] with conversion to the API query form and with
/// local evaluation against a label map.
pub trait LabelSelectorExt {
    /// Converts the selector into a string usable in Kubernetes list calls.
    /// Fails if the selector contains illegal requirements, e.g. an `Exists`
    /// operator with values.
    fn to_query_string(&self) -> Result<String>;

    /// Evaluates the selector against `labels`. An empty selector matches
    /// everything.
    fn matches(&self, labels: &BTreeMap<String, String>) -> Result<bool>;
}

impl LabelSelectorExt for LabelSelector {
    fn to_query_string(&self) -> Result<String> {
        let mut parts: Vec<String> = self
            .match_labels
            .iter()
            .flatten()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();

        for requirement in self.match_expressions.iter().flatten() {
            parts.push(requirement_to_query(requirement)?);
        }

        Ok(parts.join(","))
    }

    fn matches(&self, labels: &BTreeMap<String, String>) -> Result<bool> {
        let labels_match = self
            .match_labels
            .iter()
            .flatten()
            .all(|(key, value)| labels.get(key) == Some(value));

        if !labels_match {
            return Ok(false);
        }

        for requirement in self.match_expressions.iter().flatten() {
            if !requirement_matches(requirement, labels)? {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

fn requirement_to_query(requirement: &LabelSelectorRequirement) -> Result<String> {
    let values = requirement.values.as_deref().unwrap_or_default();
    match requirement.operator.as_str() {
        operator @ ("In" | "NotIn") => {
            if values.is_empty() {
                return BinaryOperatorWithoutValuesSnafu { operator }.fail();
            }
            Ok(format!(
                "{} {} ({})",
                requirement.key,
                operator.to_ascii_lowercase(),
                values.join(", ")
            ))
        }
        operator @ ("Exists" | "DoesNotExist") => {
            if !values.is_empty() {
                return UnaryOperatorWithValuesSnafu { operator }.fail();
            }
            if operator == "Exists" {
                Ok(requirement.key.clone())
            } else {
                Ok(format!("!{key}", key = requirement.key))
            }
        }
        operator => InvalidOperatorSnafu { operator }.fail(),
    }
}

fn requirement_matches(
    requirement: &LabelSelectorRequirement,
    labels: &BTreeMap<String, String>,
) -> Result<bool> {
    let values = requirement.values.as_deref().unwrap_or_default();
    let actual = labels.get(&requirement.key);
    match requirement.operator.as_str() {
        operator @ ("In" | "NotIn") => {
            if values.is_empty() {
                return BinaryOperatorWithoutValuesSnafu { operator }.fail();
            }
            let contained = actual.is_some_and(|actual| values.contains(actual));
            Ok(if operator == "In" { contained } else { !contained })
        }
        operator @ ("Exists" | "DoesNotExist") => {
            if !values.is_empty() {
                return UnaryOperatorWithValuesSnafu { operator }.fail();
            }
            Ok((operator == "Exists") == actual.is_some())
        }
        operator => InvalidOperatorSnafu { operator }.fail(),
    }
}
