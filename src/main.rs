//! Certstore CLI - one-shot add/check/show/list/stats against the certificate store

use std::process::ExitCode;
use certstore::cli;

fn main() -> ExitCode {
    ExitCode::from(cli::run_with_args(std::env::args()))
}
