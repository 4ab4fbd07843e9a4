use thiserror::Error;

/// Local, pre-network rejection. Never routed through message resolution.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill in all required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("Please select a CSV file")]
    NotCsv,
}

impl ValidationError {
    /// Build a missing-fields error, or `None` when nothing is missing.
    pub(crate) fn from_missing(missing: Vec<String>) -> Option<Self> {
        (!missing.is_empty()).then_some(Self::MissingFields(missing))
    }

    /// Names of the fields that were left empty.
    pub fn missing_fields(&self) -> &[String] {
        match self {
            Self::MissingFields(fields) => fields,
            Self::NotCsv => &[],
        }
    }
}

/// A detail lookup (dataset or model) failed; the selection is kept for retry.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LookupError {
    pub message: String,
}
