//! Named extractor settings

use crate::core::{DetectorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A single setting value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
}

impl ParamValue {
    fn kind(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Real(_) => "real",
            ParamValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Real(v) => write!(f, "{v}"),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

/// Parses the most specific kind: bool, then int, then real, else text
impl FromStr for ParamValue {
    type Err = DetectorError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(v) = s.parse::<bool>() {
            return Ok(ParamValue::Bool(v));
        }
        if let Ok(v) = s.parse::<i64>() {
            return Ok(ParamValue::Int(v));
        }
        if let Ok(v) = s.parse::<f64>() {
            return Ok(ParamValue::Real(v));
        }
        Ok(ParamValue::Text(s.to_string()))
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Real(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// String-keyed settings of a feature extractor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParametersMap {
    values: BTreeMap<String, ParamValue>,
}

impl ParametersMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<V: Into<ParamValue>>(&mut self, key: &str, value: V) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn with<V: Into<ParamValue>>(mut self, key: &str, value: V) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parse and insert a `key=value` assignment
    pub fn set_assignment(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            DetectorError::InvalidParameter(format!("Expected key=value, got {assignment}"))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(DetectorError::InvalidParameter(format!(
                "Empty key in {assignment}"
            )));
        }
        self.set(key, value.parse::<ParamValue>()?);
        Ok(())
    }

    /// Reject keys outside `allowed`
    pub fn check_keys(&self, allowed: &[&str]) -> Result<()> {
        match self.values.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(key) => Err(DetectorError::InvalidParameter(format!(
                "Unknown parameter {key}"
            ))),
            None => Ok(()),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(ParamValue::Bool(v)) => Ok(*v),
            Some(other) => Err(wrong_kind(key, "bool", other)),
        }
    }

    pub fn get_int(&self, key: &str, default: i64) -> Result<i64> {
        match self.get(key) {
            None => Ok(default),
            Some(ParamValue::Int(v)) => Ok(*v),
            Some(other) => Err(wrong_kind(key, "int", other)),
        }
    }

    /// Integers are accepted where a real is expected
    pub fn get_real(&self, key: &str, default: f64) -> Result<f64> {
        match self.get(key) {
            None => Ok(default),
            Some(ParamValue::Real(v)) => Ok(*v),
            Some(ParamValue::Int(v)) => Ok(*v as f64),
            Some(other) => Err(wrong_kind(key, "real", other)),
        }
    }

    pub fn get_text(&self, key: &str, default: &str) -> Result<String> {
        match self.get(key) {
            None => Ok(default.to_string()),
            Some(ParamValue::Text(v)) => Ok(v.clone()),
            Some(other) => Err(wrong_kind(key, "text", other)),
        }
    }
}

fn wrong_kind(key: &str, expected: &str, found: &ParamValue) -> DetectorError {
    DetectorError::InvalidParameter(format!(
        "Parameter {key} must be {expected}, got {} {found}",
        found.kind()
    ))
}

impl fmt::Display for ParametersMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.values {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        Ok(())
    }
}
