//! Dupewarden - policy-driven duplicate file cleaner.
//!
//! Entry point for the dupewarden CLI.

use clap::Parser;
use dupewarden::{cli::Cli, error::ExitCode, logging::init_logging};

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging from the verbosity flags
    init_logging(cli.verbose, cli.quiet);

    // Run the application logic
    match dupewarden::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            // Determine appropriate exit code for errors
            let exit_code = if err
                .downcast_ref::<dupewarden::cache::CacheError>()
                .is_some()
            {
                ExitCode::CacheError
            } else {
                ExitCode::ConfigError
            };

            // Report the error
            eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err);

            std::process::exit(exit_code.as_i32());
        }
    }
}
