use abtest::{Arm, ArmRole, ConfidenceLevel, Evaluation, EvaluationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const REPORT_VERSION: u32 = 1;

// Rows stay raw so one malformed experiment cannot reject the whole manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchManifest {
    pub experiments: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentEntry {
    pub name: String,
    pub control: ArmCounts,
    pub treatment: ArmCounts,
    #[serde(default)]
    pub confidence_level: Option<Value>,
}

impl ExperimentEntry {
    pub fn confidence(&self) -> Result<ConfidenceLevel, EvaluationError> {
        match &self.confidence_level {
            None | Some(Value::Null) => Ok(ConfidenceLevel::NinetyFive),
            Some(Value::String(raw)) => raw.parse(),
            Some(Value::Number(raw)) => match raw.as_f64() {
                Some(value) => ConfidenceLevel::try_from(value),
                None => Err(EvaluationError::UnsupportedConfidenceLevel {
                    value: raw.to_string(),
                }),
            },
            Some(other) => Err(EvaluationError::UnsupportedConfidenceLevel {
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ArmCounts {
    pub visitors: i64,
    pub conversions: i64,
}

impl ArmCounts {
    pub fn to_arm(self, role: ArmRole) -> Result<Arm, EvaluationError> {
        let visitors = u64::try_from(self.visitors).map_err(|_| EvaluationError::InvalidInput {
            arm: role,
            reason: format!("visitors must be greater than zero, got {}", self.visitors),
        })?;
        let conversions =
            u64::try_from(self.conversions).map_err(|_| EvaluationError::InvalidInput {
                arm: role,
                reason: format!("conversions must not be negative, got {}", self.conversions),
            })?;

        Arm::new(role, visitors, conversions)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentOutcome {
    pub name: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub report_version: u32,
    pub generated_at: String,
    pub input_path: String,
    pub input_sha256: String,
    pub experiment_count: usize,
    pub failed_count: usize,
    pub results: Vec<ExperimentOutcome>,
}
