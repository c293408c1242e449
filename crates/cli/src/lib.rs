pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "nebo",
    about = "Nebo operator CLI",
    long_about = "Inspect nebo configuration, check upstream readiness, and run account lookups from a terminal.",
    after_help = "Examples:\n  nebo doctor --json\n  nebo config\n  nebo lookup shopify"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Slack verification, and upstream credential readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run a reconciled account lookup, the same one `/nebo <term>` answers")]
    Lookup {
        #[arg(help = "Search term; a platform name lists that platform's accounts by MRR")]
        term: String,
        #[arg(long, help = "Only query the CRM, like `/neboidss`")]
        crm_only: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Lookup { term, crm_only } => commands::lookup::run(&term, crm_only),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
