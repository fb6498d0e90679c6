//! Search space definition for hyperparameters

use crate::error::{FraudError, Result};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type of parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterType {
    /// Continuous float parameter
    Float { low: f64, high: f64, log_scale: bool },
    /// Integer parameter, both bounds inclusive
    Int { low: i64, high: i64 },
}

/// A single hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: ParameterType,
}

impl Parameter {
    pub fn float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Float {
                low,
                high,
                log_scale: false,
            },
        }
    }

    pub fn log_float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Float {
                low,
                high,
                log_scale: true,
            },
        }
    }

    pub fn int(name: impl Into<String>, low: i64, high: i64) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Int { low, high },
        }
    }

    fn validate(&self) -> Result<()> {
        let ok = match &self.param_type {
            ParameterType::Float { low, high, log_scale } => {
                low.is_finite() && high.is_finite() && low <= high && (!log_scale || *low > 0.0)
            }
            ParameterType::Int { low, high } => low <= high,
        };
        if ok {
            Ok(())
        } else {
            Err(FraudError::ConfigError(format!(
                "invalid bounds for parameter {}",
                self.name
            )))
        }
    }

    /// Sample a random value
    pub fn sample(&self, rng: &mut impl Rng) -> ParameterValue {
        match &self.param_type {
            ParameterType::Float { low, high, log_scale } => {
                let val = if *log_scale {
                    let (log_low, log_high) = (low.ln(), high.ln());
                    (rng.gen::<f64>() * (log_high - log_low) + log_low).exp()
                } else {
                    rng.gen::<f64>() * (high - low) + low
                };
                ParameterValue::Float(val)
            }
            ParameterType::Int { low, high } => ParameterValue::Int(rng.gen_range(*low..=*high)),
        }
    }

    /// Position of a value inside the bounds, mapped to [0, 1]
    pub fn to_unit(&self, value: &ParameterValue) -> f64 {
        let v = value.as_float();
        let unit = match &self.param_type {
            ParameterType::Float { low, high, log_scale: true } => {
                span_fraction(v.ln(), low.ln(), high.ln())
            }
            ParameterType::Float { low, high, .. } => span_fraction(v, *low, *high),
            ParameterType::Int { low, high } => span_fraction(v, *low as f64, *high as f64),
        };
        unit.clamp(0.0, 1.0)
    }
}

fn span_fraction(v: f64, low: f64, high: f64) -> f64 {
    if high > low {
        (v - low) / (high - low)
    } else {
        0.5
    }
}

/// Sampled parameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
}

impl ParameterValue {
    pub fn as_float(&self) -> f64 {
        match self {
            ParameterValue::Float(v) => *v,
            ParameterValue::Int(v) => *v as f64,
        }
    }

    pub fn as_int(&self) -> i64 {
        match self {
            ParameterValue::Int(v) => *v,
            ParameterValue::Float(v) => v.round() as i64,
        }
    }
}

/// Sampled configuration, keyed by parameter name
pub type TrialParams = BTreeMap<String, ParameterValue>;

/// Search space for hyperparameter optimization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    parameters: Vec<Parameter>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, param: Parameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn float(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(Parameter::float(name, low, high))
    }

    pub fn log_float(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(Parameter::log_float(name, low, high))
    }

    pub fn int(self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.add(Parameter::int(name, low, high))
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn param_names(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.name.clone()).collect()
    }

    /// Check every parameter's bounds
    pub fn validate(&self) -> Result<()> {
        self.parameters.iter().try_for_each(Parameter::validate)
    }

    /// Sample a random configuration, parameters drawn in declaration order
    pub fn sample(&self, rng: &mut impl Rng) -> TrialParams {
        self.parameters
            .iter()
            .map(|p| (p.name.clone(), p.sample(rng)))
            .collect()
    }

    /// Unit-cube coordinates of a configuration; missing parameters sit at 0.5
    pub fn to_unit_vec(&self, params: &TrialParams) -> Vec<f64> {
        self.parameters
            .iter()
            .map(|p| params.get(&p.name).map_or(0.5, |v| p.to_unit(v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_search_space_builder() {
        let space = SearchSpace::new()
            .float("learning_rate", 0.01, 0.1)
            .int("n_estimators", 100, 600)
            .log_float("reg", 1e-3, 1.0);
        assert_eq!(space.len(), 3);
        assert!(space.validate().is_ok());
        assert!(SearchSpace::new().int("bad", 5, 1).validate().is_err());
    }

    #[test]
    fn test_sampling_stays_in_bounds() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let space = SearchSpace::new().float("lr", 0.01, 0.1).int("depth", 3, 7);
        for _ in 0..100 {
            let params = space.sample(&mut rng);
            let lr = params["lr"].as_float();
            let depth = params["depth"].as_int();
            assert!((0.01..=0.1).contains(&lr));
            assert!((3..=7).contains(&depth));
            assert!(matches!(params["depth"], ParameterValue::Int(_)));
        }
    }

    #[test]
    fn test_to_unit_uses_bounds() {
        let space = SearchSpace::new().int("n", 100, 600).float("g", 0.0, 1.0);
        let mut params = TrialParams::new();
        params.insert("n".to_string(), ParameterValue::Int(350));
        assert_eq!(space.to_unit_vec(&params), vec![0.5, 0.5]);
        params.insert("g".to_string(), ParameterValue::Float(0.25));
        assert_eq!(space.to_unit_vec(&params), vec![0.5, 0.25]);
    }

    #[test]
    fn test_sampling_is_seeded() {
        let space = SearchSpace::new().float("x", 0.0, 1.0).int("y", 1, 10);
        let a = space.sample(&mut Xoshiro256PlusPlus::seed_from_u64(7));
        let b = space.sample(&mut Xoshiro256PlusPlus::seed_from_u64(7));
        assert_eq!(a, b);
    }
}
