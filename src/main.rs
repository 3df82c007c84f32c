use anyhow::Result;
use std::process;
use log::error;

use eventq::{app, cli, logging};

fn main() {
    if let Err(e) = run() {
        error!("Application error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = cli::parse_args();

    cli::validate_args(&args)?;

    let config_manager = app::load_configuration(&args)?;

    let log_config = app::configure_logging(&args, &config_manager)?;
    logging::init_logger(log_config)?;

    let queue_config = app::build_queue_config(&args, &config_manager)?;
    let report = app::run_simulation(&args, queue_config)?;

    println!("{}", app::render_report(&report, &args.output)?);
    Ok(())
}
