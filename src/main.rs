//! `picconf` - parameter deck loader for particle-in-cell simulations

use clap::Parser;

use picconf::cli::args::Cli;
use picconf::cli::commands;
use picconf::error::{ExitCode, PicConfError};
use picconf::observability::{LogFormat, init_logging};

fn main() {
    let cli = Cli::parse();

    init_logging(LogFormat::Human, cli.verbose, cli.quiet, cli.color);

    match commands::dispatch(cli) {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            if let PicConfError::Config(config) = &e {
                for issue in config.issues() {
                    eprintln!("  {issue}");
                }
            }
            std::process::exit(e.exit_code());
        }
    }
}
