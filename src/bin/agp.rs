//! agp - command-line consumer for EndoMetrics Core
//!
//! Reads a CGM export file, runs the analysis pipeline, and prints the
//! report as JSON.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Parser, ValueEnum};
use endometrics_core::filter::{FilterSpec, RangeSelector};
use endometrics_core::pipeline::{analyze_upload, AnalysisRequest};
use endometrics_core::types::Device;
use endometrics_core::CRATE_VERSION;

/// Analyze a CGM export into glycemic-variability metrics
#[derive(Parser)]
#[command(name = "agp")]
#[command(version = CRATE_VERSION)]
#[command(about = "Compute dAGP metrics from a CGM export", long_about = None)]
struct Cli {
    /// Input file path (use - for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Device that produced the export
    #[arg(short, long, value_enum)]
    device: DeviceArg,

    /// Analysis range counted back from the last reading
    #[arg(short, long, default_value = "3m")]
    range: String,

    /// Restrict to one day of the week (e.g. monday)
    #[arg(long)]
    weekday: Option<String>,

    /// Start of an inclusive time-of-day window (HH:MM)
    #[arg(long, requires = "end_time")]
    start_time: Option<String>,

    /// End of an inclusive time-of-day window (HH:MM)
    #[arg(long, requires = "start_time")]
    end_time: Option<String>,

    /// Skip the baseline window and comparison
    #[arg(long)]
    no_baseline: bool,

    /// Output format
    #[arg(long, default_value = "json-pretty")]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum DeviceArg {
    Libre,
    Dexcom,
    Nightscout,
}

impl From<DeviceArg> for Device {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Libre => Device::Libre,
            DeviceArg::Dexcom => Device::Dexcom,
            DeviceArg::Nightscout => Device::Nightscout,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    JsonPretty,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let raw = if cli.input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(&cli.input)?
    };

    let range = RangeSelector::from_str(&cli.range)?;
    let weekday = cli
        .weekday
        .as_deref()
        .map(|s| {
            chrono::Weekday::from_str(s).map_err(|_| format!("unknown weekday '{s}'"))
        })
        .transpose()?;
    let time_of_day = match (cli.start_time.as_deref(), cli.end_time.as_deref()) {
        (Some(start), Some(end)) => Some((parse_time(start)?, parse_time(end)?)),
        _ => None,
    };

    let spec = FilterSpec::new(range, weekday, time_of_day)?;
    let device = Device::from(cli.device);
    let request = if cli.no_baseline {
        AnalysisRequest::without_baseline(device, spec)
    } else {
        AnalysisRequest::new(device, spec)
    };

    let report = analyze_upload(&raw, &request)?;

    let output = match cli.format {
        OutputFormat::Json => serde_json::to_string(&report)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&report)?,
    };
    println!("{output}");

    Ok(())
}

fn parse_time(s: &str) -> Result<chrono::NaiveTime, String> {
    chrono::NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| format!("invalid time '{s}', expected HH:MM"))
}
