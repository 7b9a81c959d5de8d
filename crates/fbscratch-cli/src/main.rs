//! fbscratch CLI: replay and validate frame-buffer scratch traces.

use clap::{Parser, Subcommand};
use fbscratch_core::config::ScratchConfig;
use fbscratch_exec::{parse_yaml_trace, Outcome, Replayer, StepDetail};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fbscratch")]
#[command(about = "Frame-buffer scratch arena: replay allocation traces against a simulated region", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a trace YAML file and report the arena state
    Run {
        /// Path to the trace YAML file
        #[arg(short, long)]
        trace: PathBuf,

        /// Region length in bytes (overrides env and trace)
        #[arg(long)]
        region_len: Option<usize>,

        /// Mark stack capacity (overrides env and trace)
        #[arg(long)]
        max_marks: Option<usize>,

        /// Print the full manifest as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a trace YAML file (syntax and hint names)
    Validate {
        /// Path to the trace YAML file
        #[arg(short, long)]
        trace: PathBuf,
    },

    /// Print the effective configuration (defaults + environment) as JSON
    Config,
}

fn main() {
    #[cfg(feature = "tracing")]
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            trace,
            region_len,
            max_marks,
            json,
        } => match run_trace(&trace, region_len, max_marks, json) {
            Ok(true) => {}
            Ok(false) => std::process::exit(2),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Commands::Validate { trace } => {
            if let Err(e) = validate_trace(&trace) {
                eprintln!("Validation failed: {}", e);
                std::process::exit(1);
            }
            println!("✓ Trace is valid");
        }
        Commands::Config => match serde_json::to_string_pretty(&ScratchConfig::from_env()) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    }
}

/// Replay `trace_path`. Returns `Ok(false)` when the replay aborted.
fn run_trace(
    trace_path: &PathBuf,
    region_len: Option<usize>,
    max_marks: Option<usize>,
    json: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let yaml_content = fs::read_to_string(trace_path)?;
    let mut trace = parse_yaml_trace(&yaml_content)?;
    apply_cli_overrides(&mut trace, region_len, max_marks);

    let replayer = Replayer::new(ScratchConfig::from_env());
    let manifest = replayer.run(&trace)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(manifest.is_completed());
    }

    println!("Trace Replay");
    println!("============");
    println!(
        "Region: [{:#x}, {:#x}) ({} bytes)",
        manifest.region_start,
        manifest.base,
        manifest.base - manifest.region_start
    );
    println!("Trace hash: {}", manifest.trace_hash);
    println!();
    for step in &manifest.steps {
        let detail = match &step.detail {
            StepDetail::Allocated { addr, len } => format!("{} bytes at {:#x}", len, addr),
            StepDetail::Skipped => "zero-size, skipped".to_string(),
            StepDetail::Freed { bytes } => format!("released {} bytes", bytes),
            StepDetail::Marked => "mark".to_string(),
            StepDetail::Pinned => "pinned".to_string(),
            StepDetail::Floor { addr } => format!("floor -> {:#x}", addr),
            StepDetail::Reset => "reset".to_string(),
        };
        println!(
            "  {:>3}. {:<14} {:<28} cursor {:#x}, marks {}, free {}",
            step.index + 1,
            step.op,
            detail,
            step.cursor,
            step.marks,
            step.available
        );
    }
    println!();
    println!("Peak usage: {} bytes", manifest.stats.peak_bytes);
    println!("Pinned: {} bytes", manifest.pinned_bytes);
    println!("Still held: {} bytes", manifest.leaked_bytes());

    match &manifest.outcome {
        Outcome::Completed => {
            println!("✓ Trace replayed successfully");
            Ok(true)
        }
        Outcome::Aborted {
            step, op, error, ..
        } => {
            println!("✗ Aborted at step {} ({}): {}", step + 1, op, error);
            Ok(false)
        }
    }
}

fn validate_trace(trace_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let yaml_content = fs::read_to_string(trace_path)?;
    let trace = parse_yaml_trace(&yaml_content)?;
    let cfg = Replayer::new(ScratchConfig::from_env()).config_for(&trace);
    cfg.validate()?;
    Ok(())
}

/// CLI flags win over the trace's own region block.
fn apply_cli_overrides(
    trace: &mut fbscratch_exec::Trace,
    region_len: Option<usize>,
    max_marks: Option<usize>,
) {
    if region_len.is_none() && max_marks.is_none() {
        return;
    }
    let region = trace.region.get_or_insert_with(Default::default);
    if let Some(len) = region_len {
        region.len = Some(len);
    }
    if let Some(marks) = max_marks {
        region.max_marks = Some(marks);
    }
}

#[cfg(test)]
mod tests {
    use super::apply_cli_overrides;
    use fbscratch_exec::{parse_yaml_trace, RegionDef};

    #[test]
    fn cli_overrides_higher_priority_than_trace() {
        let mut trace = parse_yaml_trace(
            r#"
region: { start: 1000, len: 1000, max_marks: 8 }
steps:
  - op: mark
"#,
        )
        .unwrap();
        apply_cli_overrides(&mut trace, Some(2000), None);
        let region = trace.region.unwrap();
        assert_eq!(region.len, Some(2000));
        assert_eq!(region.max_marks, Some(8));
        assert_eq!(region.start, Some(1000));
    }

    #[test]
    fn overrides_create_region_block_when_missing() {
        let mut trace = parse_yaml_trace("steps: []").unwrap();
        apply_cli_overrides(&mut trace, None, Some(3));
        let region: RegionDef = trace.region.unwrap();
        assert_eq!(region.max_marks, Some(3));
        assert_eq!(region.len, None);
    }
}
