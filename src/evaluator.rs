use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use tracing::debug;

use crate::error::{EvaluationError, Result};
use crate::model::{Arm, ArmRole, ConfidenceLevel, Evaluation, Verdict};

// Above this many degrees of freedom the standard normal replaces Student's t.
pub const NORMAL_APPROXIMATION_DF: u64 = 100_000;

pub fn evaluate(
    control_visitors: u64,
    control_conversions: u64,
    treatment_visitors: u64,
    treatment_conversions: u64,
    confidence_level: f64,
) -> Result<Verdict> {
    let level = ConfidenceLevel::try_from(confidence_level)?;
    let control = Arm::new(ArmRole::Control, control_visitors, control_conversions)?;
    let treatment = Arm::new(ArmRole::Treatment, treatment_visitors, treatment_conversions)?;

    evaluate_arms(&control, &treatment, level).map(|evaluation| evaluation.verdict)
}

pub fn evaluate_arms(control: &Arm, treatment: &Arm, level: ConfidenceLevel) -> Result<Evaluation> {
    let control_rate = control.rate();
    let treatment_rate = treatment.rate();
    let rate_difference = treatment_rate - control_rate;
    let relative_lift = (control_rate > 0.0).then(|| rate_difference / control_rate);

    let pooled_standard_error = (control.rate_variance() + treatment.rate_variance()).sqrt();
    let degrees_of_freedom = control
        .visitors()
        .saturating_add(treatment.visitors())
        .saturating_sub(2);

    if pooled_standard_error == 0.0 {
        debug!(
            control_rate,
            treatment_rate,
            "pooled standard error is zero; verdict is indeterminate"
        );
        return Ok(Evaluation {
            verdict: Verdict::Indeterminate,
            confidence_level: level,
            control: *control,
            treatment: *treatment,
            control_rate,
            treatment_rate,
            rate_difference,
            relative_lift,
            pooled_standard_error,
            statistic: 0.0,
            degrees_of_freedom,
            critical_value: None,
            p_value: 1.0,
            difference_interval: (rate_difference, rate_difference),
        });
    }

    let statistic = rate_difference / pooled_standard_error;
    let reference = ReferenceDistribution::for_degrees_of_freedom(degrees_of_freedom)?;
    let critical_value = reference.inverse_cdf(level.upper_tail_probability());
    let p_value = (2.0 * reference.sf(statistic.abs())).clamp(0.0, 1.0);
    let margin = critical_value * pooled_standard_error;

    let verdict = classify(statistic, critical_value);

    debug!(
        statistic,
        critical_value,
        degrees_of_freedom,
        level = %level,
        verdict = %verdict,
        "evaluated experiment"
    );

    Ok(Evaluation {
        verdict,
        confidence_level: level,
        control: *control,
        treatment: *treatment,
        control_rate,
        treatment_rate,
        rate_difference,
        relative_lift,
        pooled_standard_error,
        statistic,
        degrees_of_freedom,
        critical_value: Some(critical_value),
        p_value,
        difference_interval: (
            (rate_difference - margin).max(-1.0),
            (rate_difference + margin).min(1.0),
        ),
    })
}

pub fn critical_value(level: ConfidenceLevel, degrees_of_freedom: u64) -> Result<f64> {
    let reference = ReferenceDistribution::for_degrees_of_freedom(degrees_of_freedom)?;
    Ok(reference.inverse_cdf(level.upper_tail_probability()))
}

fn classify(statistic: f64, critical_value: f64) -> Verdict {
    if statistic > critical_value {
        Verdict::TreatmentBetter
    } else if statistic < -critical_value {
        Verdict::ControlBetter
    } else {
        Verdict::Indeterminate
    }
}

enum ReferenceDistribution {
    StudentsT(StudentsT),
    Normal(Normal),
}

impl ReferenceDistribution {
    fn for_degrees_of_freedom(degrees_of_freedom: u64) -> Result<Self> {
        if degrees_of_freedom > NORMAL_APPROXIMATION_DF {
            let normal = Normal::new(0.0, 1.0).map_err(|err| EvaluationError::Distribution {
                reason: err.to_string(),
            })?;
            return Ok(Self::Normal(normal));
        }

        let students_t = StudentsT::new(0.0, 1.0, degrees_of_freedom as f64).map_err(|err| {
            EvaluationError::Distribution {
                reason: format!("students t with {degrees_of_freedom} degrees of freedom: {err}"),
            }
        })?;
        Ok(Self::StudentsT(students_t))
    }

    fn inverse_cdf(&self, probability: f64) -> f64 {
        match self {
            Self::StudentsT(dist) => dist.inverse_cdf(probability),
            Self::Normal(dist) => dist.inverse_cdf(probability),
        }
    }

    fn sf(&self, x: f64) -> f64 {
        match self {
            Self::StudentsT(dist) => dist.sf(x),
            Self::Normal(dist) => dist.sf(x),
        }
    }
}
