//! Patient record submitted for stroke-risk prediction

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Clinical attributes of a single patient, as posted to `/predict`.
///
/// All fields are required. The two booleans are the one-hot columns the
/// models were trained on ("work type = children", "smoking status = smokes").
///
/// Flags are read leniently: integer fields take integral floats such as
/// `1.0`, and boolean fields take `0`/`1` and `"true"`/`"false"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Age in years
    pub age: f64,

    /// Hypertension flag (0 = no, 1 = yes)
    #[serde(deserialize_with = "lenient_int")]
    pub hypertension: i64,

    /// Heart disease flag (0 = no, 1 = yes)
    #[serde(deserialize_with = "lenient_int")]
    pub heart_disease: i64,

    /// Average blood glucose level (mg/dL)
    pub avg_glucose_level: f64,

    /// Body-mass index
    pub bmi: f64,

    /// Work type is "children"
    #[serde(deserialize_with = "lenient_bool")]
    pub work_children: bool,

    /// Smoking status is "smokes"
    #[serde(deserialize_with = "lenient_bool")]
    pub smoke_smokes: bool,
}

impl PatientRecord {
    /// Create a record with the numeric measurements and all flags cleared
    pub fn new(age: f64, avg_glucose_level: f64, bmi: f64) -> Self {
        Self {
            age,
            hypertension: 0,
            heart_disease: 0,
            avg_glucose_level,
            bmi,
            work_children: false,
            smoke_smokes: false,
        }
    }
}

/// Any JSON scalar a flag may arrive as
#[derive(Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FlagValue {
    fn describe(&self) -> String {
        match self {
            FlagValue::Bool(b) => format!("boolean `{b}`"),
            FlagValue::Int(i) => format!("integer `{i}`"),
            FlagValue::Float(f) => format!("floating point `{f}`"),
            FlagValue::Text(s) => format!("string {s:?}"),
        }
    }
}

fn integral(value: f64) -> Option<i64> {
    (value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64)
        .then_some(value as i64)
}

fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = FlagValue::deserialize(deserializer)?;
    let parsed = match &value {
        FlagValue::Int(i) => Some(*i),
        FlagValue::Bool(b) => Some(i64::from(*b)),
        FlagValue::Float(f) => integral(*f),
        FlagValue::Text(s) => s.trim().parse::<i64>().ok(),
    };
    parsed.ok_or_else(|| {
        de::Error::custom(format!("invalid value: {}, expected an integer", value.describe()))
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = FlagValue::deserialize(deserializer)?;
    let parsed = match &value {
        FlagValue::Bool(b) => Some(*b),
        FlagValue::Int(0) => Some(false),
        FlagValue::Int(1) => Some(true),
        FlagValue::Float(f) => match integral(*f) {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        FlagValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
            "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
            _ => None,
        },
        FlagValue::Int(_) => None,
    };
    parsed.ok_or_else(|| {
        de::Error::custom(format!("invalid value: {}, expected a boolean", value.describe()))
    })
}
