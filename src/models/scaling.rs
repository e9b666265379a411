//! Feature scaling parameters fitted during training

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::Path;

/// Keys every scaling parameters artifact must provide
pub const REQUIRED_KEYS: [&str; 6] = [
    "age_mean",
    "age_std",
    "glucose_mean",
    "glucose_std",
    "bmi_mean",
    "bmi_std",
];

/// Mean and standard deviation for each standardized feature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingParams {
    pub age_mean: f64,
    pub age_std: f64,
    pub glucose_mean: f64,
    pub glucose_std: f64,
    pub bmi_mean: f64,
    pub bmi_std: f64,
}

/// Scaling parameters together with every key found in the artifact
#[derive(Debug, Clone)]
pub struct LoadedScaling {
    pub params: ScalingParams,
    /// Keys present in the file, in file order
    pub keys: Vec<String>,
}

impl ScalingParams {
    /// Read and validate a `scaling_params.json` artifact
    pub fn load<P: AsRef<Path>>(path: P) -> Result<LoadedScaling> {
        Self::from_map(&Self::read_object(path)?)
    }

    /// Read the artifact as a JSON object without checking its keys
    pub fn read_object<P: AsRef<Path>>(path: P) -> Result<Map<String, Value>> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scaling params from {}", path.display()))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("Scaling params at {} are not valid JSON", path.display()))?;

        match value {
            Value::Object(map) => Ok(map),
            other => anyhow::bail!(
                "Scaling params at {} must be a JSON object, found {}",
                path.display(),
                json_kind(&other)
            ),
        }
    }

    /// Build parameters from an already-parsed JSON object
    pub fn from_map(map: &Map<String, Value>) -> Result<LoadedScaling> {
        let get = |key: &str| -> Result<f64> {
            match map.get(key) {
                None => anyhow::bail!("Missing scaling parameter `{key}`"),
                Some(Value::Null) => anyhow::bail!("Scaling parameter `{key}` is null"),
                Some(v) => v
                    .as_f64()
                    .filter(|x| x.is_finite())
                    .with_context(|| format!("Scaling parameter `{key}` is not a finite number")),
            }
        };

        let params = Self {
            age_mean: get("age_mean")?,
            age_std: get("age_std")?,
            glucose_mean: get("glucose_mean")?,
            glucose_std: get("glucose_std")?,
            bmi_mean: get("bmi_mean")?,
            bmi_std: get("bmi_std")?,
        };
        params.validate()?;

        Ok(LoadedScaling {
            params,
            keys: map.keys().cloned().collect(),
        })
    }

    /// Reject standard deviations that would make standardization blow up
    pub fn validate(&self) -> Result<()> {
        for (key, std) in [
            ("age_std", self.age_std),
            ("glucose_std", self.glucose_std),
            ("bmi_std", self.bmi_std),
        ] {
            if !(std.is_finite() && std > 0.0) {
                anyhow::bail!("Scaling parameter `{key}` must be positive, got {std}");
            }
        }
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params_json() -> Value {
        json!({
            "age_mean": 43.2,
            "age_std": 22.6,
            "glucose_mean": 106.1,
            "glucose_std": 45.3,
            "bmi_mean": 28.9,
            "bmi_std": 7.8
        })
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaling_params.json");
        let mut value = params_json();
        value["fitted_on"] = json!("train split");
        std::fs::write(&path, value.to_string()).unwrap();

        let loaded = ScalingParams::load(&path).unwrap();

        assert_eq!(loaded.params.age_mean, 43.2);
        assert_eq!(loaded.params.bmi_std, 7.8);
        assert_eq!(loaded.keys.len(), 7);
        assert_eq!(loaded.keys[0], "age_mean");
        assert_eq!(loaded.keys[6], "fitted_on");
    }

    #[test]
    fn test_missing_key() {
        let mut value = params_json();
        value.as_object_mut().unwrap().remove("glucose_std");

        let err = ScalingParams::from_map(value.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("glucose_std"));
    }

    #[test]
    fn test_null_value() {
        let mut value = params_json();
        value["bmi_mean"] = Value::Null;

        let err = ScalingParams::from_map(value.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("null"));
    }

    #[test]
    fn test_non_numeric_value() {
        let mut value = params_json();
        value["age_mean"] = json!("43");

        assert!(ScalingParams::from_map(value.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_zero_std_rejected() {
        let mut value = params_json();
        value["age_std"] = json!(0.0);

        let err = ScalingParams::from_map(value.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("age_std"));
    }

    #[test]
    fn test_non_object_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaling_params.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let err = ScalingParams::load(&path).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }
}
