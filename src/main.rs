use clap::Parser;
use tradecaller::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
