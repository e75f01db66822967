use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;

use nerdctld_config::{Config, DaemonArgs};

fn main() -> ExitCode {
    let args = DaemonArgs::parse();
    let outcome = Config::from_args(args)
        .map_err(|error| error.to_string())
        .and_then(|config| nerdctld::run_daemon(config).map_err(|error| error.to_string()));
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            // A failed write to stderr has nowhere else to be reported.
            drop(writeln!(io::stderr().lock(), "nerdctld: {message}"));
            ExitCode::FAILURE
        }
    }
}
