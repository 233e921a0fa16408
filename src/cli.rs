use std::path::PathBuf;

use clap::Parser;

/// Evaluates streaming jitter-detection sketches and delay-compensation
/// optimizers against a packet trace.
///
/// Loads a binary trace, runs the ground-truth oracle and every approximate
/// detector (FDFilter, DelaySketch, JitterSketch, JitterSketchS1Opt) over it,
/// scores each against the oracle, then runs the OLDC and JitterSketch-gated
/// optimizers through the jitter-control buffer pool and reports the delay
/// variation each one removes.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Evaluates streaming jitter-detection sketches and delay-compensation\n\
optimizers against a packet trace.\n\
\n\
EXAMPLES:\n\
  # Run the full detector and optimizer comparison described in config.ini:\n\
  jitter-sketch config.ini\n\
\n\
  # Emit the same report as machine-readable JSON:\n\
  jitter-sketch config.ini --stats-json\n\
\n\
  # Verbose per-flow logging on top of the summary report:\n\
  jitter-sketch config.ini --verbose"
)]
pub struct Args {
    /// Path to the INI configuration file (§6). Must name a `data_file` and
    /// may override any detector's dimensions or memory budget.
    #[arg(value_name = "CONFIG_PATH")]
    pub config: PathBuf,

    /// Emit the final report as JSON instead of the colored human summary.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub stats_json: bool,

    /// Raise the log verbosity by one level (info -> debug -> trace).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub fn parse_args() -> Args {
    Args::parse()
}
