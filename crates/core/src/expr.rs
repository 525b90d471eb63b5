// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expression primitives: variable substitution, range expansion,
//! Cartesian products and command rendering.

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

/// Regex pattern for `${name}` references. Names may be any non-`}` sequence.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
pub static VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}").expect("constant regex pattern is valid"));

#[allow(clippy::expect_used)]
static FULL_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$\{([^}]*)\}$").expect("constant regex pattern is valid"));

#[allow(clippy::expect_used)]
static RANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^range\(([^,]+)\s*,\s*([^,)]+)\s*(?:,\s*([^,)]+)\s*)?\)$")
        .expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static GET_RESULT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^get_result\(\s*([^,)]+?)\s*(?:,\s*(?:"([^"]*)"|'([^']*)'|(\$\{[^}]*\}))\s*)?\)$"#)
        .expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static CHECK_RESULT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^check_result\(\s*([^,)]+?)\s*(?:,\s*(?:"([^"]*)"|'([^']*)'|(\$\{[^}]*\}))\s*)?\)$"#,
    )
    .expect("constant regex pattern is valid")
});

/// Errors raised while instantiating expressions.
#[derive(Debug, Error)]
pub enum ExprError {
    #[error("{context}: range parameter {text:?} is not a number")]
    RangeNotNumeric { context: String, text: String },
    #[error("{context}: range start must be smaller than end")]
    RangeBounds { context: String },
    #[error("{context}: range step must be larger than 0")]
    RangeStep { context: String },
    #[error("{context}: {text:?} is not a range call")]
    NotARange { context: String, text: String },
}

/// Replace every `${name}` reference in `s` with its value from `data`.
///
/// Unresolved references are left literal; this is the defined fallback,
/// not an error.
pub fn replace_variant(s: &str, data: &HashMap<String, String>) -> String {
    VAR_PATTERN
        .replace_all(s, |caps: &regex::Captures| match data.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .to_string()
}

/// True if the whole string is a single `${name}` reference.
pub fn is_variant(s: &str) -> bool {
    FULL_VAR_PATTERN.is_match(s)
}

/// Extract the name from a `${name}` reference.
pub fn variant_name(s: &str) -> Option<&str> {
    FULL_VAR_PATTERN
        .captures(s)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Coerce a JSON value to its workflow string form.
///
/// Numbers render without a trailing fraction (`25.0` becomes `"25"`),
/// matching how they appear in rendered commands.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else if let Some(f) = n.as_f64() {
                f.to_string()
            } else {
                n.to_string()
            }
        }
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A parsed `range(start, end, step?)` call, parameters still textual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeCall {
    pub start: String,
    pub end: String,
    pub step: Option<String>,
}

/// True if the string has the shape of a `range(start, end, step?)` call.
pub fn is_range_call(s: &str) -> bool {
    RANGE_PATTERN.is_match(s)
}

/// Extract the textual parameters of a `range` call.
pub fn parse_range_call(s: &str) -> Option<RangeCall> {
    let caps = RANGE_PATTERN.captures(s)?;
    Some(RangeCall {
        start: caps[1].trim().to_string(),
        end: caps[2].trim().to_string(),
        step: caps.get(3).map(|m| m.as_str().trim().to_string()),
    })
}

/// Expand a `range` call after variable substitution.
///
/// The result is `start, start+step, …, <end` (exclusive upper bound).
pub fn expand_range(
    context: &str,
    call: &RangeCall,
    data: &HashMap<String, String>,
) -> Result<Vec<Value>, ExprError> {
    let parse = |text: &str| -> Result<f64, ExprError> {
        let replaced = replace_variant(text, data);
        replaced
            .parse::<f64>()
            .map_err(|_| ExprError::RangeNotNumeric {
                context: context.to_string(),
                text: replaced,
            })
    };

    let start = parse(&call.start)?;
    let end = parse(&call.end)?;
    let step = match &call.step {
        Some(text) => parse(text)?,
        None => 1.0,
    };

    if start >= end {
        return Err(ExprError::RangeBounds {
            context: context.to_string(),
        });
    }
    if step <= 0.0 {
        return Err(ExprError::RangeStep {
            context: context.to_string(),
        });
    }

    let mut numbers = Vec::new();
    let mut current = start;
    while current < end {
        numbers.push(number_value(current));
        current += step;
    }
    Ok(numbers)
}

fn number_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Value::from(f as i64)
    } else {
        Value::from(f)
    }
}

/// Cross product of iteration axes; axis 0 varies slowest.
///
/// `[[1, 2], [3, 4], [5]]` becomes `[[1,3,5], [1,4,5], [2,3,5], [2,4,5]]`.
pub fn cartesian_product(axes: &[Vec<Value>]) -> Vec<Vec<Value>> {
    if axes.is_empty() || axes.iter().any(Vec::is_empty) {
        return Vec::new();
    }
    let mut rows: Vec<Vec<Value>> = vec![Vec::new()];
    for axis in axes {
        let mut next = Vec::with_capacity(rows.len() * axis.len());
        for row in &rows {
            for value in axis {
                let mut extended = row.clone();
                extended.push(value.clone());
                next.push(extended);
            }
        }
        rows = next;
    }
    rows
}

/// Render one command per row by substituting positional parameters.
///
/// The j-th element of a row binds `${j+1}`; `${item}` binds the row index.
pub fn render_commands(template: &str, rows: &[Vec<Value>]) -> Vec<String> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let mut data = HashMap::with_capacity(row.len() + 1);
            for (j, value) in row.iter().enumerate() {
                data.insert((j + 1).to_string(), to_display_string(value));
            }
            data.insert("item".to_string(), index.to_string());
            replace_variant(template, &data)
        })
        .collect()
}

/// Split captured job output on a separator for deferred expansion.
///
/// An empty separator yields the whole output as a single element; empty
/// fragments are dropped.
pub fn split_output(output: &str, sep: &str) -> Vec<Value> {
    if sep.is_empty() {
        return vec![Value::from(output)];
    }
    output
        .split(sep)
        .filter(|fragment| !fragment.is_empty())
        .map(Value::from)
        .collect()
}

/// Decode the `\n`, `\t` and `\r` escapes accepted in separator and
/// expected-value arguments.
pub fn decode_escapes(s: &str) -> String {
    s.replace("\\n", "\n").replace("\\t", "\t").replace("\\r", "\r")
}

/// True if the string has the shape of a `get_result(job, sep?)` call.
pub fn is_get_result_call(s: &str) -> bool {
    GET_RESULT_PATTERN.is_match(s)
}

/// Extract `(job, sep)` from a `get_result` call. A missing separator
/// yields the empty string.
pub fn parse_get_result_call(s: &str) -> Option<(String, String)> {
    parse_result_call(&GET_RESULT_PATTERN, s)
}

/// True if the string has the shape of a `check_result(job, exp)` call.
pub fn is_check_result_call(s: &str) -> bool {
    CHECK_RESULT_PATTERN.is_match(s)
}

/// Extract `(job, expected)` from a `check_result` call.
pub fn parse_check_result_call(s: &str) -> Option<(String, String)> {
    parse_result_call(&CHECK_RESULT_PATTERN, s)
}

fn parse_result_call(pattern: &Regex, s: &str) -> Option<(String, String)> {
    let caps = pattern.captures(s)?;
    let job = caps[1].trim().to_string();
    let arg = caps
        .get(2)
        .or_else(|| caps.get(3))
        .or_else(|| caps.get(4))
        .map(|m| m.as_str())
        .unwrap_or("");
    Some((job, decode_escapes(arg)))
}

#[cfg(test)]
#[path = "expr_tests.rs"]
mod tests;
