#![warn(clippy::uninlined_format_args)]

mod config;
mod report;
mod script;

use std::{borrow::Cow, env, fs, io, process};

use billsplit_application::BillSplit;
use config::AppConfig;
use script::run_script;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Cow<'static, str>>;

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
}

fn run() -> CliResult<()> {
    let Some(path) = env::args().nth(1) else {
        return Err("Usage: billsplit <file>".into());
    };

    let config = AppConfig::from_env().map_err(|err| format!("Invalid configuration: {err}"))?;
    let source =
        fs::read_to_string(&path).map_err(|err| format!("Failed to read '{path}': {err}"))?;

    let mut bill_split = BillSplit::new(config.solver.solver(), config.settlement)
        .map_err(|err| format!("Invalid configuration: {err}"))?;
    tracing::debug!(path = %path, solver = config.solver.solver().name(), "Running script");

    for block in run_script(&source, &mut bill_split).map_err(|err| err.to_string())? {
        println!("{block}");
    }
    Ok(())
}
