use std::process::ExitCode;

use clap::Parser;
use hostdeps::{cli::Cli, logging};

fn main() -> ExitCode {
    // Usage errors exit with 1 like every other failure, help and version with 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    logging::init_logging(cli.verbose);

    let res = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| cli.run(&cwd));
    if let Err(err) = res {
        eprintln!("hostdeps error: {:#}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
