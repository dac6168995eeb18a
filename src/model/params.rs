//! Hyperparameter values and grids
//!
//! Parameters are addressed by name so a search can set them on any
//! estimator implementing `HyperParams`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RfeError};

/// A single hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// Interpret as a non-negative integer, or fail with a message naming the parameter
    pub fn as_usize(&self, name: &str) -> Result<usize> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Ok(*v as usize),
            other => Err(RfeError::InvalidConfig(format!(
                "Parameter '{}' expects a non-negative integer, got {}",
                name, other
            ))),
        }
    }

    /// `None` maps to `Ok(None)`; otherwise as `as_usize`
    pub fn as_optional_usize(&self, name: &str) -> Result<Option<usize>> {
        match self {
            ParamValue::None => Ok(None),
            other => other.as_usize(name).map(Some),
        }
    }

    pub fn as_u64(&self, name: &str) -> Result<u64> {
        self.as_usize(name).map(|v| v as u64)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::None => write!(f, "none"),
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl FromStr for ParamValue {
    type Err = RfeError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RfeError::InvalidConfig("Empty parameter value".into()));
        }

        let value = match s.to_lowercase().as_str() {
            "none" | "null" => ParamValue::None,
            "true" => ParamValue::Bool(true),
            "false" => ParamValue::Bool(false),
            _ => {
                if let Ok(i) = s.parse::<i64>() {
                    ParamValue::Int(i)
                } else if let Ok(x) = s.parse::<f64>() {
                    ParamValue::Float(x)
                } else {
                    ParamValue::Str(s.to_string())
                }
            }
        };

        Ok(value)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ParamValue::None)
    }
}

/// Candidate values per parameter name.
///
/// Keys are kept sorted; a grid point is indexed with the last key varying fastest.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParamGrid {
    params: BTreeMap<String, Vec<ParamValue>>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the candidates for one parameter
    pub fn with<V: Into<ParamValue>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.params
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of grid points (product of candidate counts)
    pub fn size(&self) -> usize {
        if self.params.is_empty() {
            return 0;
        }
        self.params.values().map(|v| v.len()).product()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.params.keys()
    }

    /// Decode a flat grid index into a parameter assignment
    pub fn point(&self, mut index: usize) -> BTreeMap<String, ParamValue> {
        let mut point = BTreeMap::new();
        for (name, values) in self.params.iter().rev() {
            let len = values.len();
            point.insert(name.clone(), values[index % len].clone());
            index /= len;
        }
        point
    }
}

impl FromStr for ParamGrid {
    type Err = RfeError;

    /// Parse `name=v1,v2;name2=v3`
    fn from_str(s: &str) -> Result<Self> {
        let mut grid = ParamGrid::new();

        for entry in s.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, values) = entry.split_once('=').ok_or_else(|| {
                RfeError::InvalidConfig(format!(
                    "Invalid grid entry '{}': expected name=v1,v2",
                    entry
                ))
            })?;

            let name = name.trim();
            if name.is_empty() {
                return Err(RfeError::InvalidConfig(format!(
                    "Invalid grid entry '{}': missing parameter name",
                    entry
                )));
            }

            let values: Vec<ParamValue> = values
                .split(',')
                .map(str::parse)
                .collect::<Result<_>>()?;
            grid.params.insert(name.to_string(), values);
        }

        if grid.is_empty() {
            return Err(RfeError::InvalidConfig("Parameter grid is empty".into()));
        }

        Ok(grid)
    }
}

/// Estimators whose hyperparameters can be read and set by name
pub trait HyperParams {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()>;

    fn params(&self) -> BTreeMap<String, ParamValue>;

    /// Apply several parameters, stopping at the first failure
    fn set_params(&mut self, params: &BTreeMap<String, ParamValue>) -> Result<()> {
        for (name, value) in params {
            self.set_param(name, value)?;
        }
        Ok(())
    }
}

pub(crate) fn unknown_param(estimator: &str, name: &str) -> RfeError {
    RfeError::InvalidConfig(format!(
        "Invalid parameter '{}' for estimator {}",
        name, estimator
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_value_parsing() {
        assert_eq!("3".parse::<ParamValue>().unwrap(), ParamValue::Int(3));
        assert_eq!("0.5".parse::<ParamValue>().unwrap(), ParamValue::Float(0.5));
        assert_eq!("None".parse::<ParamValue>().unwrap(), ParamValue::None);
        assert_eq!("true".parse::<ParamValue>().unwrap(), ParamValue::Bool(true));
        assert_eq!(
            "gini".parse::<ParamValue>().unwrap(),
            ParamValue::Str("gini".into())
        );
        assert!("".parse::<ParamValue>().is_err());
    }

    #[test]
    fn test_as_usize_rejects_negative() {
        assert_eq!(ParamValue::Int(4).as_usize("max_depth").unwrap(), 4);
        let err = ParamValue::Int(-1).as_usize("max_depth").unwrap_err();
        assert!(err.to_string().contains("max_depth"));
        assert_eq!(ParamValue::None.as_optional_usize("max_depth").unwrap(), None);
    }

    #[test]
    fn test_grid_size_and_point_order() {
        let grid = ParamGrid::new()
            .with("min_samples_split", [1i64, 2])
            .with("criterion", ["gini"]);

        assert_eq!(grid.size(), 2);

        // Keys sorted: criterion, min_samples_split; last key varies fastest
        let p0 = grid.point(0);
        let p1 = grid.point(1);
        assert_eq!(p0["criterion"], ParamValue::Str("gini".into()));
        assert_eq!(p0["min_samples_split"], ParamValue::Int(1));
        assert_eq!(p1["min_samples_split"], ParamValue::Int(2));
    }

    #[test]
    fn test_grid_from_str() {
        let grid: ParamGrid = "max_depth=1,2,none; criterion=gini,entropy".parse().unwrap();
        assert_eq!(grid.size(), 6);
        let names: Vec<&String> = grid.names().collect();
        assert_eq!(names, vec!["criterion", "max_depth"]);
    }

    #[test]
    fn test_grid_from_str_errors() {
        assert!("max_depth".parse::<ParamGrid>().is_err());
        assert!("=1,2".parse::<ParamGrid>().is_err());
        assert!("".parse::<ParamGrid>().is_err());
    }
}
