// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Condition expressions and generic match rules.
//!
//! On the wire a condition is either a bare bool or the heterogeneous
//! array form `["check_result", job, expected]`; a deferred iteration axis
//! is `["get_result", job, sep]`. Both are parsed once into tagged
//! variants and carried through the model in that form.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

const CHECK_RESULT_TAG: &str = "check_result";
const GET_RESULT_TAG: &str = "get_result";

/// Boolean gate on a task, evaluated before its container jobs are created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Literal decision, known at instantiation time.
    Bool(bool),
    /// Equality test against the captured output of an upstream job.
    CheckResult { job: String, expected: String },
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Condition::Bool(b) => serializer.serialize_bool(*b),
            Condition::CheckResult { job, expected } => {
                [CHECK_RESULT_TAG, job.as_str(), expected.as_str()].serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Bool(b) => Ok(Condition::Bool(b)),
            serde_json::Value::Array(items) => match items.as_slice() {
                [serde_json::Value::String(tag), serde_json::Value::String(job), serde_json::Value::String(expected)]
                    if tag == CHECK_RESULT_TAG =>
                {
                    Ok(Condition::CheckResult {
                        job: job.clone(),
                        expected: expected.clone(),
                    })
                }
                _ => Err(D::Error::custom(
                    "condition array must be [\"check_result\", job, expected]",
                )),
            },
            other => Err(D::Error::custom(format!(
                "condition must be a bool or a check_result array, got {other}"
            ))),
        }
    }
}

/// One axis of a `vars_iter` expansion.
#[derive(Debug, Clone, PartialEq)]
pub enum VarsIterEntry {
    /// A concrete list of values participating in the Cartesian product.
    List(Vec<serde_json::Value>),
    /// Deferred axis: split the captured output of `job` on `sep` once the
    /// job completes, then participate in the product.
    GetResult { job: String, sep: String },
}

impl Serialize for VarsIterEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            VarsIterEntry::List(values) => values.serialize(serializer),
            VarsIterEntry::GetResult { job, sep } => {
                [GET_RESULT_TAG, job.as_str(), sep.as_str()].serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for VarsIterEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<serde_json::Value>::deserialize(deserializer)?;
        if let [serde_json::Value::String(tag), serde_json::Value::String(job), serde_json::Value::String(sep)] =
            items.as_slice()
        {
            if tag == GET_RESULT_TAG {
                return Ok(VarsIterEntry::GetResult {
                    job: job.clone(),
                    sep: sep.clone(),
                });
            }
        }
        Ok(VarsIterEntry::List(items))
    }
}

/// Operator of a generic-condition match rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
    Gt,
    Lt,
    Equal,
    DoubleEqual,
    NotEqual,
}

impl fmt::Display for MatchOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchOperator::In => "In",
            MatchOperator::NotIn => "NotIn",
            MatchOperator::Exists => "Exists",
            MatchOperator::DoesNotExist => "DoesNotExist",
            MatchOperator::Gt => "Gt",
            MatchOperator::Lt => "Lt",
            MatchOperator::Equal => "Equal",
            MatchOperator::DoubleEqual => "DoubleEqual",
            MatchOperator::NotEqual => "NotEqual",
        };
        write!(f, "{name}")
    }
}

/// A single rule evaluated against the parsed output map of a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRule {
    pub key: String,
    pub operator: MatchOperator,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl MatchRule {
    /// Evaluate this rule against a parsed `key:value` map.
    ///
    /// `Exists` holds when the key is present, `DoesNotExist` when it is
    /// absent; every other operator requires the key to be present and
    /// compares against its value. `Gt`/`Lt` compare numerically and are
    /// unsatisfied on non-numeric input.
    pub fn is_satisfied(&self, output: &HashMap<String, String>) -> bool {
        let value = output.get(&self.key);
        match self.operator {
            MatchOperator::Exists => value.is_some(),
            MatchOperator::DoesNotExist => value.is_none(),
            MatchOperator::In => value.is_some_and(|v| self.values.iter().any(|x| x == v)),
            MatchOperator::NotIn => value.is_some_and(|v| !self.values.iter().any(|x| x == v)),
            MatchOperator::Equal | MatchOperator::DoubleEqual => {
                value.is_some_and(|v| self.values.iter().any(|x| x == v))
            }
            MatchOperator::NotEqual => {
                value.is_some_and(|v| !self.values.iter().any(|x| x == v))
            }
            MatchOperator::Gt => compare_numeric(value, self.values.first(), |a, b| a > b),
            MatchOperator::Lt => compare_numeric(value, self.values.first(), |a, b| a < b),
        }
    }
}

fn compare_numeric(
    value: Option<&String>,
    bound: Option<&String>,
    cmp: fn(f64, f64) -> bool,
) -> bool {
    match (
        value.and_then(|v| v.parse::<f64>().ok()),
        bound.and_then(|b| b.parse::<f64>().ok()),
    ) {
        (Some(v), Some(b)) => cmp(v, b),
        _ => false,
    }
}

/// Rule-set predicate evaluated against the output of a dependency job.
///
/// The predicate holds when any rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericCondition {
    pub depend_job_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_rules: Vec<MatchRule>,
}

impl GenericCondition {
    /// Evaluate the rule set against raw job output.
    pub fn is_satisfied(&self, output: &str) -> bool {
        let map = parse_result_map(output);
        self.match_rules.iter().any(|rule| rule.is_satisfied(&map))
    }
}

/// Parse job output of the form `key1:value1,key2:value2` into a map.
///
/// Entries without a `:` are ignored; keys and values are trimmed.
pub fn parse_result_map(output: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for pair in output.split(',') {
        if let Some((key, value)) = pair.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                map.insert(key.to_string(), value.trim().to_string());
            }
        }
    }
    map
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
