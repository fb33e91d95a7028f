//! Rigfile CLI.

use clap::Parser;
use rigfile::cli::Cli;

/// Environment variable that overrides the `-v`/`-q` log filter.
const LOG_ENV: &str = "RIGFILE_LOG";

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => log::LevelFilter::Error,
        (false, 0) => log::LevelFilter::Info,
        (false, 1) => log::LevelFilter::Debug,
        (false, _) => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_env(env_logger::Env::new().filter(LOG_ENV))
        .format_timestamp(None)
        .format_target(verbose >= 2)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = rigfile::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(e.exit_code());
    }
}
