use clap::Parser;
use anyhow::Result;
use std::path::PathBuf;
use log::debug;

/// Publishing index event queue simulator
#[derive(Parser, Debug, Clone)]
#[command(name = "eventq")]
#[command(about = "Drive site-publishing index updates through a single-consumer polling event queue")]
#[command(version)]
pub struct Args {
    /// Number of producer threads (defaults to the number of CPUs)
    #[arg(short, long, value_name = "COUNT")]
    pub producers: Option<usize>,

    /// Total index updates to enqueue across all producers
    #[arg(short, long, value_name = "COUNT", default_value_t = 1000)]
    pub events: usize,

    /// Maximum updates applied per batch
    #[arg(long, value_name = "SIZE")]
    pub batch_size: Option<usize>,

    /// Worker poll timeout in milliseconds (0 uses the default)
    #[arg(long, value_name = "MS")]
    pub poll_timeout_ms: Option<u64>,

    /// Simulated index write time per batch in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub index_delay_ms: u64,

    /// Report format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub output: String,

    /// Verbose output (debug level logging)
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (error level logging only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug output (trace level logging)
    #[arg(long)]
    pub debug: bool,

    /// Log format: text or json (defaults to the config file, then text)
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<String>,

    /// Log file path for file output
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level for file output (independent of console level)
    #[arg(long, value_name = "LEVEL")]
    pub log_file_level: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Configuration section name
    #[arg(long, value_name = "SECTION")]
    pub config_name: Option<String>,
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    let args = Args::parse();
    debug!("Parsed CLI arguments: {:?}", args);
    args
}

/// Validate CLI argument combinations
pub fn validate_args(args: &Args) -> Result<()> {
    let log_flags_count = [args.verbose, args.quiet, args.debug]
        .iter()
        .filter(|&&flag| flag)
        .count();

    if log_flags_count > 1 {
        return Err(anyhow::anyhow!(
            "Conflicting log level flags: only one of --verbose, --quiet, or --debug may be specified"
        ));
    }

    if let Some(ref format) = args.log_format {
        match format.to_lowercase().as_str() {
            "text" | "json" => {},
            _ => return Err(anyhow::anyhow!(
                "Invalid log format '{}'. Valid options: text, json", format
            )),
        }
    }

    match args.output.to_lowercase().as_str() {
        "text" | "json" => {},
        _ => return Err(anyhow::anyhow!(
            "Invalid output format '{}'. Valid options: text, json", args.output
        )),
    }

    if let Some(ref level) = args.log_file_level {
        match level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" | "off" => {},
            _ => return Err(anyhow::anyhow!(
                "Invalid log file level '{}'. Valid levels: error, warn, info, debug, trace, off", level
            )),
        }
    }

    if args.log_file_level.is_some() && args.log_file.is_none() {
        return Err(anyhow::anyhow!(
            "--log-file-level requires --log-file to be specified"
        ));
    }

    if args.producers == Some(0) {
        return Err(anyhow::anyhow!("--producers must be at least 1"));
    }

    if args.batch_size == Some(0) {
        return Err(anyhow::anyhow!("--batch-size must be at least 1"));
    }

    Ok(())
}
