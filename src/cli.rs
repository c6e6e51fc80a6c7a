use std::path::PathBuf;

use abtest::ConfidenceLevel;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "abtest",
    version,
    about = "Two-proportion significance testing for A/B experiments"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Evaluate(EvaluateArgs),
    Batch(BatchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[arg(long)]
    pub control_visitors: u64,

    #[arg(long)]
    pub control_conversions: u64,

    #[arg(long)]
    pub treatment_visitors: u64,

    #[arg(long)]
    pub treatment_conversions: u64,

    /// 90, 95 or 99; fractions such as 0.95 are accepted too.
    #[arg(long, default_value = "95")]
    pub confidence: ConfidenceLevel,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}
