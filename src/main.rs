mod cli;

use std::process::ExitCode;

use colored::Colorize;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let command_line_interface = cli::CommandLineInterface::load();
    let default_level = if command_line_interface.verbose() { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .without_time()
        .init();
    match command_line_interface.run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
