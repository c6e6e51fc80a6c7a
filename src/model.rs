use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{EvaluationError, Result};

const FRACTION_TOLERANCE: f64 = 1e-9;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmRole {
    Control,
    Treatment,
}

impl ArmRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::Treatment => "treatment",
        }
    }
}

impl fmt::Display for ArmRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Arm {
    visitors: u64,
    conversions: u64,
}

impl Arm {
    pub fn new(role: ArmRole, visitors: u64, conversions: u64) -> Result<Self> {
        if visitors == 0 {
            return Err(EvaluationError::InvalidInput {
                arm: role,
                reason: "visitors must be greater than zero".to_string(),
            });
        }

        if conversions > visitors {
            return Err(EvaluationError::InvalidInput {
                arm: role,
                reason: format!("conversions ({conversions}) exceed visitors ({visitors})"),
            });
        }

        Ok(Self {
            visitors,
            conversions,
        })
    }

    pub fn visitors(&self) -> u64 {
        self.visitors
    }

    pub fn conversions(&self) -> u64 {
        self.conversions
    }

    pub fn rate(&self) -> f64 {
        self.conversions as f64 / self.visitors as f64
    }

    pub fn rate_variance(&self) -> f64 {
        let rate = self.rate();
        rate * (1.0 - rate) / self.visitors as f64
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum ConfidenceLevel {
    #[serde(rename = "90%")]
    Ninety,
    #[serde(rename = "95%")]
    NinetyFive,
    #[serde(rename = "99%")]
    NinetyNine,
}

impl ConfidenceLevel {
    pub const ALL: [ConfidenceLevel; 3] = [Self::Ninety, Self::NinetyFive, Self::NinetyNine];

    pub fn percent(self) -> u8 {
        match self {
            Self::Ninety => 90,
            Self::NinetyFive => 95,
            Self::NinetyNine => 99,
        }
    }

    pub fn fraction(self) -> f64 {
        f64::from(self.percent()) / 100.0
    }

    pub fn upper_tail_probability(self) -> f64 {
        match self {
            Self::Ninety => 0.95,
            Self::NinetyFive => 0.975,
            Self::NinetyNine => 0.995,
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

impl TryFrom<f64> for ConfidenceLevel {
    type Error = EvaluationError;

    fn try_from(value: f64) -> Result<Self> {
        if value.is_finite() {
            let fraction = if value > 1.0 { value / 100.0 } else { value };
            for level in Self::ALL {
                if (level.fraction() - fraction).abs() < FRACTION_TOLERANCE {
                    return Ok(level);
                }
            }
        }

        Err(EvaluationError::UnsupportedConfidenceLevel {
            value: value.to_string(),
        })
    }
}

impl FromStr for ConfidenceLevel {
    type Err = EvaluationError;

    fn from_str(raw: &str) -> Result<Self> {
        let unsupported = || EvaluationError::UnsupportedConfidenceLevel {
            value: raw.to_string(),
        };

        let trimmed = raw.trim();
        let (number, is_percent) = match trimmed.strip_suffix('%') {
            Some(stripped) => (stripped.trim_end(), true),
            None => (trimmed, false),
        };

        let value = number.parse::<f64>().map_err(|_| unsupported())?;
        if is_percent {
            // "0.95%" is not 95%.
            if value <= 1.0 {
                return Err(unsupported());
            }
        }

        Self::try_from(value).map_err(|_| unsupported())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    TreatmentBetter,
    ControlBetter,
    Indeterminate,
}

impl Verdict {
    pub fn mirrored(self) -> Self {
        match self {
            Self::TreatmentBetter => Self::ControlBetter,
            Self::ControlBetter => Self::TreatmentBetter,
            Self::Indeterminate => Self::Indeterminate,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::TreatmentBetter => "Experiment Group is Better",
            Self::ControlBetter => "Control Group is Better",
            Self::Indeterminate => "Indeterminate",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub verdict: Verdict,
    pub confidence_level: ConfidenceLevel,
    pub control: Arm,
    pub treatment: Arm,
    pub control_rate: f64,
    pub treatment_rate: f64,
    pub rate_difference: f64,
    pub relative_lift: Option<f64>,
    pub pooled_standard_error: f64,
    pub statistic: f64,
    pub degrees_of_freedom: u64,
    /// `None` when the pooled standard error is zero.
    pub critical_value: Option<f64>,
    pub p_value: f64,
    pub difference_interval: (f64, f64),
}
