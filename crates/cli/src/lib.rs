pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "boostline",
    about = "Boostline checkout operator CLI",
    long_about = "Price carts, inspect persisted orders, and validate runtime configuration.",
    after_help = "Examples:\n  boostline price cart.json --promotion promo.json\n  boostline order record.json --json\n  boostline doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Price a cart file into per-platform checkout groups")]
    Price {
        #[arg(help = "Path to a JSON array of cart lines")]
        cart: PathBuf,
        #[arg(long, help = "Path to a JSON promotion to apply")]
        promotion: Option<PathBuf>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Rehydrate a persisted order record into a display summary")]
    Order {
        #[arg(help = "Path to an order record JSON file")]
        record: PathBuf,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config,
    #[command(about = "Validate config, storage readiness, and collaborator client setup")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Price { cart, promotion, json } => {
            commands::price::run(&cart, promotion.as_deref(), json)
        }
        Command::Order { record, json } => commands::order::run(&record, json),
        Command::Config => commands::CommandResult::raw(commands::config::run()),
        Command::Doctor { json } => commands::CommandResult::raw(commands::doctor::run(json)),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
