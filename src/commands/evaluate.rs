use std::io::{self, Write};

use abtest::{Arm, ArmRole, Evaluation, evaluate_arms};
use anyhow::{Context, Result};
use tracing::info;

use crate::cli::EvaluateArgs;

pub fn run(args: EvaluateArgs) -> Result<()> {
    let control = Arm::new(
        ArmRole::Control,
        args.control_visitors,
        args.control_conversions,
    )?;
    let treatment = Arm::new(
        ArmRole::Treatment,
        args.treatment_visitors,
        args.treatment_conversions,
    )?;

    let evaluation = evaluate_arms(&control, &treatment, args.confidence)
        .context("failed to evaluate experiment")?;

    info!(
        verdict = %evaluation.verdict,
        confidence = %evaluation.confidence_level,
        statistic = evaluation.statistic,
        "evaluation complete"
    );

    if args.json {
        write_json_response(&evaluation)
    } else {
        write_text_response(&evaluation)
    }
}

fn write_json_response(evaluation: &Evaluation) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    write_json(&mut output, evaluation)?;
    output.flush()?;
    Ok(())
}

fn write_json<W: Write>(output: &mut W, evaluation: &Evaluation) -> Result<()> {
    serde_json::to_writer_pretty(&mut *output, evaluation)
        .context("failed to serialize evaluation json output")?;
    writeln!(output)?;
    Ok(())
}

fn write_text_response(evaluation: &Evaluation) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    write_text(&mut output, evaluation)?;
    output.flush()?;
    Ok(())
}

fn write_text<W: Write>(output: &mut W, evaluation: &Evaluation) -> Result<()> {
    writeln!(output, "A/B Test Result: {}", evaluation.verdict)?;
    writeln!(
        output,
        "Rates: control={:.4} ({}/{}) treatment={:.4} ({}/{})",
        evaluation.control_rate,
        evaluation.control.conversions(),
        evaluation.control.visitors(),
        evaluation.treatment_rate,
        evaluation.treatment.conversions(),
        evaluation.treatment.visitors(),
    )?;
    writeln!(
        output,
        "Difference: {:+.4} lift={} interval=[{:+.4}, {:+.4}]",
        evaluation.rate_difference,
        format_lift(evaluation.relative_lift),
        evaluation.difference_interval.0,
        evaluation.difference_interval.1,
    )?;
    writeln!(
        output,
        "Test: statistic={:.4} critical={} df={} confidence={} p_value={:.6}",
        evaluation.statistic,
        evaluation
            .critical_value
            .map(|value| format!("{value:.4}"))
            .unwrap_or_else(|| "n/a".to_string()),
        evaluation.degrees_of_freedom,
        evaluation.confidence_level,
        evaluation.p_value,
    )?;
    Ok(())
}

fn format_lift(lift: Option<f64>) -> String {
    match lift {
        Some(value) => format!("{:+.2}%", value * 100.0),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use abtest::{Arm, ArmRole, ConfidenceLevel, evaluate_arms};

    use super::{format_lift, run, write_json, write_text};
    use crate::cli::EvaluateArgs;

    fn args(control_visitors: u64, json: bool) -> EvaluateArgs {
        EvaluateArgs {
            control_visitors,
            control_conversions: 100,
            treatment_visitors: 1000,
            treatment_conversions: 180,
            confidence: ConfidenceLevel::Ninety,
            json,
        }
    }

    #[test]
    fn run_succeeds_for_text_and_json_output() {
        run(args(1000, false)).expect("text run should succeed");
        run(args(1000, true)).expect("json run should succeed");
    }

    #[test]
    fn run_reports_invalid_arm() {
        let error = run(args(0, false)).expect_err("zero visitors should fail");
        assert!(
            error.to_string().contains("invalid control input"),
            "unexpected error: {}",
            error
        );
    }

    #[test]
    fn json_output_carries_verdict_and_critical_value() {
        let control = Arm::new(ArmRole::Control, 1000, 100).expect("control");
        let treatment = Arm::new(ArmRole::Treatment, 1000, 180).expect("treatment");
        let evaluation =
            evaluate_arms(&control, &treatment, ConfidenceLevel::Ninety).expect("evaluation");

        let mut buffer = Vec::new();
        write_json(&mut buffer, &evaluation).expect("json output");
        assert!(buffer.ends_with(b"}\n"));

        let value: serde_json::Value =
            serde_json::from_slice(&buffer).expect("output should be valid json");
        assert_eq!(value["verdict"], "treatment_better");
        assert_eq!(value["confidence_level"], "90%");
        assert_eq!(value["degrees_of_freedom"], 1998);
        let critical = value["critical_value"]
            .as_f64()
            .expect("critical value is a number");
        let expected = evaluation.critical_value.expect("critical value present");
        assert!((critical - expected).abs() < 1e-12, "critical={critical}");
        assert_eq!(value["control"]["visitors"], 1000);
    }

    #[test]
    fn text_output_leads_with_the_verdict_message() {
        let control = Arm::new(ArmRole::Control, 1000, 100).expect("control");
        let treatment = Arm::new(ArmRole::Treatment, 1000, 180).expect("treatment");
        let evaluation =
            evaluate_arms(&control, &treatment, ConfidenceLevel::Ninety).expect("evaluation");

        let mut buffer = Vec::new();
        write_text(&mut buffer, &evaluation).expect("text output");
        let text = String::from_utf8(buffer).expect("utf-8 output");

        let first_line = text.lines().next().expect("at least one line");
        assert_eq!(first_line, "A/B Test Result: Experiment Group is Better");
        assert!(text.contains("df=1998"));
        assert!(text.contains("confidence=90%"));
        assert!(text.contains("lift=+80.00%"));
    }

    #[test]
    fn degenerate_variance_prints_missing_critical_value() {
        let control = Arm::new(ArmRole::Control, 10, 0).expect("control");
        let treatment = Arm::new(ArmRole::Treatment, 10, 0).expect("treatment");
        let evaluation =
            evaluate_arms(&control, &treatment, ConfidenceLevel::NinetyFive).expect("evaluation");

        let mut buffer = Vec::new();
        write_text(&mut buffer, &evaluation).expect("text output");
        let text = String::from_utf8(buffer).expect("utf-8 output");

        assert!(text.starts_with("A/B Test Result: Indeterminate"));
        assert!(text.contains("critical=n/a"));
        assert!(text.contains("lift=n/a"));
    }

    #[test]
    fn format_lift_renders_signed_percentages() {
        assert_eq!(format_lift(Some(-0.125)), "-12.50%");
        assert_eq!(format_lift(None), "n/a");
    }
}
