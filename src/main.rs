//! AuraFin CLI entry point.

use af::cli::commands;
use af::cli::{Cli, Commands};
use af::error::Error;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    // JSON when asked for, or when stdout is piped
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    if cli.no_color || json {
        colored::control::set_override(false);
    }

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info,reqwest=info,hyper=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let db = cli.db.as_ref();

    match &cli.command {
        Commands::Auth { command } => commands::auth::execute(command, db, json),

        // Records
        Commands::Query(args) => commands::records::execute_query(args, db, json),
        Commands::Insert { table, data } => {
            commands::records::execute_insert(table, data, db, json)
        }
        Commands::Update {
            table,
            field,
            value,
            data,
        } => commands::records::execute_update(table, field, value, data, db, json),
        Commands::Delete {
            table,
            field,
            value,
        } => commands::records::execute_delete(table, field, value, db, json),

        // Finance views
        Commands::Dashboard { tip } => commands::finance::execute_dashboard(*tip, db, json),
        Commands::Transactions(args) => commands::finance::execute_transactions(args, db, json),
        Commands::Expenses { month, tab } => {
            commands::finance::execute_expenses(month.as_deref(), tab, db, json)
        }
        Commands::Tax => commands::finance::execute_tax(db, json),
        Commands::Card { command } => commands::finance::execute_card(command, db, json),

        Commands::Receipt { command } => commands::receipt::execute(command, db, json),
        Commands::Ai { command } => commands::ai::execute(command, db, json),
        Commands::Webhook { command } => commands::webhook::execute(command, db, json),

        Commands::Version => commands::version::execute(db, json),
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
