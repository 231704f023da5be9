mod catalog;
mod cli;
mod error;
mod exporter;
mod fmt;
mod importer;
mod models;
#[cfg(feature = "pdf")]
mod pdf;
mod records;
mod reports;
mod session;
mod settings;
mod store;
mod users;

use clap::{CommandFactory, Parser};

use cli::{BudgetCommands, CategoriesCommands, Cli, Commands};
use session::{NewTransaction, TransactionEdit};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let user = cli.user;

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Register { username } => cli::account::register(&username),
        Commands::Login { username } => cli::account::login(&username),
        Commands::Logout => cli::account::logout(),
        Commands::Add {
            kind,
            category,
            description,
            amount,
            date,
            notes,
        } => cli::transactions::add(
            user,
            NewTransaction {
                date,
                kind,
                category,
                description,
                amount,
                notes,
            },
        ),
        Commands::List {
            search,
            kind,
            from,
            to,
            limit,
        } => cli::transactions::list(user, search, &kind, from, to, limit),
        Commands::Delete {
            id: Some(id),
            ..
        } => cli::transactions::delete(user, &id),
        Commands::Delete {
            id: None,
            search,
            kind,
            from,
            to,
        } => cli::transactions::delete_filtered(user, search, kind, from, to),
        Commands::Edit {
            id,
            date,
            kind,
            category,
            description,
            amount,
            notes,
        } => cli::transactions::edit(
            user,
            &id,
            TransactionEdit {
                date,
                kind,
                category,
                description,
                amount,
                notes,
            },
        ),
        Commands::Dashboard { watch, interval } => cli::dashboard::run(user, watch, interval),
        Commands::Budget { command } => match command {
            BudgetCommands::Set { category, amount } => cli::budget::set(user, &category, amount),
            BudgetCommands::List => cli::budget::list(user),
            BudgetCommands::Clear => cli::budget::clear(user),
        },
        Commands::Categories { command } => match command {
            CategoriesCommands::Add { label, kind } => cli::categories::add(user, &label, &kind),
            CategoriesCommands::List { kind } => cli::categories::list(user, kind),
        },
        Commands::Report { command } => cli::report::run(user, command),
        Commands::Export { command } => cli::export::run(user, command),
        Commands::Import { file } => cli::import::run(user, &file),
        Commands::Backup { output } => cli::backup::run(output),
        Commands::Demo => cli::demo::run(),
        Commands::Reset { yes } => cli::reset::run(yes),
        Commands::Prefs { command } => cli::prefs::run(command),
        Commands::Status => cli::status::run(),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "tally", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
