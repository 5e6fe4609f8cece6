use clap::{Parser, Subcommand};

mod commands;

use commands::node::{CheckArgs, RunArgs};

/// Hive actor node launcher
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Log verbosity when RUST_LOG is not set (-v debug, -vv trace)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a node and run it until every service has exited
    Run(RunArgs),

    /// Validate a configuration file and print the effective values
    Check(CheckArgs),
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp_millis()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Run(args) => commands::node::execute_run(args),
        Commands::Check(args) => commands::node::execute_check(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
