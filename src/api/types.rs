//! Wire types exchanged with the ML backend.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub type DatasetId = i64;
pub type ModelId = i64;

/// Feature name to raw input value, as typed by the user.
pub type InputData = BTreeMap<String, String>;

/// An uploaded dataset. Its headers are the universe of selectable columns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: DatasetId,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub row_count: Option<u64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub headers: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelType {
    #[default]
    Classification,
    Regression,
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Classification => "Classification",
            Self::Regression => "Regression",
        })
    }
}

/// A trained model. `feature_names` never contains `target_variable`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: ModelId,
    #[serde(default)]
    pub model_name: String,
    pub model_type: ModelType,
    #[serde(default)]
    pub target_variable: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub training_date: Option<String>,
}

impl Model {
    /// Accuracy as a percentage label, `N/A` when the backend did not report one.
    pub fn accuracy_label(&self) -> String {
        match self.accuracy {
            Some(accuracy) => format!("{:.2}%", accuracy * 100.0),
            None => "N/A".to_string(),
        }
    }
}

/// A validated training submission.
///
/// Only [`crate::workflow::ConfigurationBuilder::build_request`] constructs one, so the
/// feature list is always non-empty, unique and free of the target variable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRequest {
    dataset_id: DatasetId,
    model_name: String,
    model_type: ModelType,
    target_variable: String,
    feature_names: Vec<String>,
}

impl TrainingRequest {
    pub(crate) fn new(
        dataset_id: DatasetId,
        model_name: String,
        model_type: ModelType,
        target_variable: String,
        feature_names: Vec<String>,
    ) -> Self {
        Self {
            dataset_id,
            model_name,
            model_type,
            target_variable,
            feature_names,
        }
    }

    pub fn dataset_id(&self) -> DatasetId {
        self.dataset_id
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn target_variable(&self) -> &str {
        &self.target_variable
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    #[serde(deserialize_with = "scalar_as_string")]
    pub prediction: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub probabilities: Option<BTreeMap<String, f64>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureContribution {
    pub feature_name: String,
    pub contribution: f64,
    pub direction: Direction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    #[serde(default)]
    pub explanation_text: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub feature_contributions: Vec<FeatureContribution>,
    #[serde(default)]
    pub input_data: InputData,
}

#[derive(Clone, Debug, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Strip the `{success, message, data}` envelope some endpoints wrap results in.
pub(crate) fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("success") && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn scalar_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Null => Ok(String::new()),
        other => Ok(other.to_string()),
    }
}
