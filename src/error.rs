use thiserror::Error;

use crate::model::ArmRole;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("invalid {arm} input: {reason}")]
    InvalidInput { arm: ArmRole, reason: String },

    #[error("unsupported confidence level {value}; choose from 90, 95, or 99")]
    UnsupportedConfidenceLevel { value: String },

    #[error("distribution parameters rejected: {reason}")]
    Distribution { reason: String },
}

pub type Result<T> = std::result::Result<T, EvaluationError>;
