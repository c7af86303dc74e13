//! Search space definitions.

use serde::{Deserialize, Serialize};

use at_types::{Configuration, DomainError, ParamValue};

/// The domain one parameter is drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Domain {
    /// Finite set of named levels (e.g. universes, neutralization modes).
    Categorical { choices: Vec<String> },
    /// Integer range [low, high] inclusive.
    Int { low: i64, high: i64 },
    /// Continuous uniform range [low, high].
    Float { low: f64, high: f64 },
}

impl Domain {
    fn kind(&self) -> &'static str {
        match self {
            Self::Categorical { .. } => "categorical",
            Self::Int { .. } => "integer",
            Self::Float { .. } => "float",
        }
    }
}

/// A single tunable dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Parameter name as the simulation service expects it (e.g. "delay").
    pub name: String,
    pub domain: Domain,
}

/// The full search space: an ordered list of parameter definitions.
///
/// Pure and stateless beyond the declarations it was constructed with; all
/// operations are side-effect-free.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterSpace {
    pub dimensions: Vec<ParameterDef>,
}

impl ParameterSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_categorical<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        choices: impl IntoIterator<Item = S>,
    ) -> Self {
        self.dimensions.push(ParameterDef {
            name: name.into(),
            domain: Domain::Categorical {
                choices: choices.into_iter().map(Into::into).collect(),
            },
        });
        self
    }

    pub fn add_int(mut self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.dimensions.push(ParameterDef {
            name: name.into(),
            domain: Domain::Int { low, high },
        });
        self
    }

    pub fn add_float(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.dimensions.push(ParameterDef {
            name: name.into(),
            domain: Domain::Float { low, high },
        });
        self
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn domain_of(&self, name: &str) -> Option<&Domain> {
        self.dimensions
            .iter()
            .find(|d| d.name == name)
            .map(|d| &d.domain)
    }

    /// Total number of distinct configurations, when every dimension is
    /// discrete. `None` if any dimension is continuous.
    pub fn cardinality(&self) -> Option<u64> {
        let mut total: u64 = 1;
        for dim in &self.dimensions {
            let size = match &dim.domain {
                Domain::Categorical { choices } => choices.len() as u64,
                Domain::Int { low, high } => (high - low + 1) as u64,
                Domain::Float { .. } => return None,
            };
            total = total.checked_mul(size)?;
        }
        Some(total)
    }

    /// Check that `config` assigns every dimension a value inside its
    /// declared domain, with no extra parameters.
    pub fn validate(&self, config: &Configuration) -> Result<(), DomainError> {
        for dim in &self.dimensions {
            let value = config
                .get(&dim.name)
                .ok_or_else(|| DomainError::MissingParameter {
                    name: dim.name.clone(),
                })?;
            self.validate_value(&dim.name, &dim.domain, value)?;
        }
        for (name, _) in config.iter() {
            if self.domain_of(name).is_none() {
                return Err(DomainError::UnknownParameter { name: name.clone() });
            }
        }
        Ok(())
    }

    fn validate_value(
        &self,
        name: &str,
        domain: &Domain,
        value: &ParamValue,
    ) -> Result<(), DomainError> {
        match (domain, value) {
            (Domain::Categorical { choices }, ParamValue::Text(v)) => {
                if choices.iter().any(|c| c == v) {
                    Ok(())
                } else {
                    Err(DomainError::UnknownChoice {
                        name: name.to_string(),
                        value: v.clone(),
                    })
                }
            }
            (Domain::Int { low, high }, ParamValue::Int(v)) => {
                if (low..=high).contains(&v) {
                    Ok(())
                } else {
                    Err(DomainError::OutOfRange {
                        name: name.to_string(),
                        value: v.to_string(),
                        low: low.to_string(),
                        high: high.to_string(),
                    })
                }
            }
            (Domain::Float { low, high }, ParamValue::Float(v)) => {
                if v.is_finite() && *v >= *low && *v <= *high {
                    Ok(())
                } else {
                    Err(DomainError::OutOfRange {
                        name: name.to_string(),
                        value: v.to_string(),
                        low: low.to_string(),
                        high: high.to_string(),
                    })
                }
            }
            (domain, _) => Err(DomainError::TypeMismatch {
                name: name.to_string(),
                expected: domain.kind().to_string(),
            }),
        }
    }

    /// Encode a configuration into the sampler's internal vector
    /// representation (categorical values become choice indices).
    pub fn encode(&self, config: &Configuration) -> Result<Vec<f64>, DomainError> {
        self.validate(config)?;
        let mut vector = Vec::with_capacity(self.dimensions.len());
        for dim in &self.dimensions {
            let value = config
                .get(&dim.name)
                .ok_or_else(|| DomainError::MissingParameter {
                    name: dim.name.clone(),
                })?;
            let encoded = match (&dim.domain, value) {
                (Domain::Categorical { choices }, ParamValue::Text(v)) => choices
                    .iter()
                    .position(|c| c == v)
                    .ok_or_else(|| DomainError::UnknownChoice {
                        name: dim.name.clone(),
                        value: v.clone(),
                    })? as f64,
                (Domain::Int { .. }, ParamValue::Int(v)) => *v as f64,
                (Domain::Float { .. }, ParamValue::Float(v)) => *v,
                (domain, _) => {
                    return Err(DomainError::TypeMismatch {
                        name: dim.name.clone(),
                        expected: domain.kind().to_string(),
                    })
                }
            };
            vector.push(encoded);
        }
        Ok(vector)
    }

    /// Decode an internal vector back into a fully specified configuration.
    pub fn decode(&self, vector: &[f64]) -> Result<Configuration, DomainError> {
        if vector.len() != self.dimensions.len() {
            return Err(DomainError::LengthMismatch {
                expected: self.dimensions.len(),
                actual: vector.len(),
            });
        }
        let mut config = Configuration::new();
        for (dim, &raw) in self.dimensions.iter().zip(vector) {
            let value = match &dim.domain {
                Domain::Categorical { choices } => {
                    let idx = raw.round();
                    if idx < 0.0 || idx >= choices.len() as f64 {
                        return Err(DomainError::OutOfRange {
                            name: dim.name.clone(),
                            value: raw.to_string(),
                            low: "0".to_string(),
                            high: choices.len().saturating_sub(1).to_string(),
                        });
                    }
                    ParamValue::Text(choices[idx as usize].clone())
                }
                Domain::Int { low, high } => {
                    let v = raw.round() as i64;
                    if v < *low || v > *high {
                        return Err(DomainError::OutOfRange {
                            name: dim.name.clone(),
                            value: v.to_string(),
                            low: low.to_string(),
                            high: high.to_string(),
                        });
                    }
                    ParamValue::Int(v)
                }
                Domain::Float { low, high } => {
                    if !raw.is_finite() || raw < *low || raw > *high {
                        return Err(DomainError::OutOfRange {
                            name: dim.name.clone(),
                            value: raw.to_string(),
                            low: low.to_string(),
                            high: high.to_string(),
                        });
                    }
                    ParamValue::Float(raw)
                }
            };
            config.set(dim.name.clone(), value);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_space() -> ParameterSpace {
        ParameterSpace::new()
            .add_categorical("universe", ["TOP3000", "TOP1000", "TOP500"])
            .add_categorical("neutralization", ["INDUSTRY", "MARKET", "SECTOR"])
            .add_int("delay", 0, 1)
            .add_categorical("maxTrade", ["ON", "OFF"])
    }

    #[test]
    fn cardinality_of_discrete_space() {
        assert_eq!(settings_space().cardinality(), Some(3 * 3 * 2 * 2));
    }

    #[test]
    fn cardinality_none_with_continuous_dimension() {
        let space = settings_space().add_float("decay", 0.0, 1.0);
        assert_eq!(space.cardinality(), None);
    }

    #[test]
    fn domain_of_lookup() {
        let space = settings_space();
        assert!(matches!(
            space.domain_of("delay"),
            Some(Domain::Int { low: 0, high: 1 })
        ));
        assert!(space.domain_of("decay").is_none());
    }

    #[test]
    fn validate_accepts_full_in_domain_config() {
        let config = Configuration::new()
            .with("universe", "TOP1000")
            .with("neutralization", "MARKET")
            .with("delay", 1i64)
            .with("maxTrade", "OFF");
        assert!(settings_space().validate(&config).is_ok());
    }

    #[test]
    fn validate_rejects_unknown_choice() {
        let config = Configuration::new()
            .with("universe", "TOP9000")
            .with("neutralization", "MARKET")
            .with("delay", 0i64)
            .with("maxTrade", "ON");
        assert!(matches!(
            settings_space().validate(&config),
            Err(DomainError::UnknownChoice { .. })
        ));
    }

    #[test]
    fn validate_rejects_missing_parameter() {
        let config = Configuration::new().with("universe", "TOP500");
        assert!(matches!(
            settings_space().validate(&config),
            Err(DomainError::MissingParameter { .. })
        ));
    }

    #[test]
    fn validate_rejects_out_of_range_int() {
        let config = Configuration::new()
            .with("universe", "TOP500")
            .with("neutralization", "SECTOR")
            .with("delay", 3i64)
            .with("maxTrade", "ON");
        assert!(matches!(
            settings_space().validate(&config),
            Err(DomainError::OutOfRange { .. })
        ));
    }

    #[test]
    fn validate_rejects_extra_parameter() {
        let config = Configuration::new()
            .with("universe", "TOP500")
            .with("neutralization", "SECTOR")
            .with("delay", 0i64)
            .with("maxTrade", "ON")
            .with("decay", 4i64);
        assert!(matches!(
            settings_space().validate(&config),
            Err(DomainError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn encode_decode_round_trip() {
        let space = settings_space();
        let config = Configuration::new()
            .with("universe", "TOP500")
            .with("neutralization", "INDUSTRY")
            .with("delay", 1i64)
            .with("maxTrade", "OFF");
        let vector = space.encode(&config).unwrap();
        assert_eq!(vector.len(), 4);
        let back = space.decode(&vector).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert!(matches!(
            settings_space().decode(&[0.0, 1.0]),
            Err(DomainError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn decode_rejects_out_of_range_index() {
        let space = ParameterSpace::new().add_categorical("maxTrade", ["ON", "OFF"]);
        assert!(space.decode(&[5.0]).is_err());
    }
}
