//! Process-wide settings passed to every entity call.

use serde::{Deserialize, Serialize};

/// Step data and finite-difference settings
///
/// Deserialized from JSON settings; missing keys fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessInfo {
    pub step: usize,
    pub time: f64,
    pub delta_time: f64,
    /// Raw finite-difference step for sensitivity analysis
    pub perturbation_size: f64,
    /// Scale the raw step with the entity's correction factor
    pub adapt_perturbation_size: bool,
}

impl Default for ProcessInfo {
    fn default() -> Self {
        Self {
            step: 0,
            time: 0.0,
            delta_time: 1.0,
            perturbation_size: 1e-6,
            adapt_perturbation_size: true,
        }
    }
}

impl ProcessInfo {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| crate::FemError::Configuration(format!("invalid process info: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let info = ProcessInfo::from_json(r#"{ "perturbation_size": 1e-4 }"#).unwrap();
        assert_eq!(info.perturbation_size, 1e-4);
        assert!(info.adapt_perturbation_size);
        assert_eq!(info.delta_time, 1.0);
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(ProcessInfo::from_json(r#"{ "step": "one" }"#).is_err());
    }
}
