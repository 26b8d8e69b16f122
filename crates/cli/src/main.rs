use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::Settings;

#[derive(Parser)]
#[command(
    name = "tidemark",
    version,
    about = "Versioned schema migrations with a persistent ledger"
)]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    /// Config file (defaults to ./tidemark.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding migration files
    #[arg(long, global = true)]
    migrations_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every migration and its ledger state
    Status {
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply pending migrations in version order
    Migrate {
        /// Stop after this version (inclusive)
        #[arg(long)]
        target: Option<String>,
    },
    /// Create a new migration file with stub up and down sections
    Create {
        /// Short description, e.g. "add users table"
        description: String,
    },
    /// Roll back an applied migration
    Rollback {
        /// Version to roll back; the highest applied one when omitted
        #[arg(long)]
        version: Option<String>,
    },
    /// Apply the baseline schema (if configured) and create the ledger table
    InitDb,
    /// Drop the schema and re-initialize; asks for typed confirmation
    ResetDb {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Serve the HTTP admin API
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 3000)]
        port: u16,
        /// Token admin clients must present
        #[arg(long, env = "TIDEMARK_ADMIN_TOKEN", hide_env_values = true)]
        admin_token: Option<String>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::resolve(
        cli.config.as_deref(),
        cli.database_url,
        cli.migrations_dir,
    )?;

    match cli.command {
        Commands::Status { json } => commands::status::run(&settings, json).await,
        Commands::Migrate { target } => {
            commands::migrate::run(&settings, target.as_deref()).await
        }
        Commands::Create { description } => commands::create::run(&settings, &description),
        Commands::Rollback { version } => {
            commands::rollback::run(&settings, version.as_deref()).await
        }
        Commands::InitDb => commands::db::init(&settings).await,
        Commands::ResetDb { yes } => commands::db::reset(&settings, yes).await,
        Commands::Serve {
            host,
            port,
            admin_token,
        } => commands::serve::run(&settings, &host, port, admin_token).await,
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn parses_migrate_with_target() {
        let cli = Cli::try_parse_from(["tidemark", "migrate", "--target", "004"]).unwrap();
        match cli.command {
            Commands::Migrate { target } => assert_eq!(target.as_deref(), Some("004")),
            _ => panic!("expected migrate"),
        }
    }

    #[test]
    fn parses_reset_db_with_yes() {
        let cli = Cli::try_parse_from(["tidemark", "reset-db", "--yes"]).unwrap();
        match cli.command {
            Commands::ResetDb { yes } => assert!(yes),
            _ => panic!("expected reset-db"),
        }
    }

    #[test]
    fn create_requires_a_description() {
        assert!(Cli::try_parse_from(["tidemark", "create"]).is_err());
        let cli = Cli::try_parse_from(["tidemark", "create", "add users table"]).unwrap();
        match cli.command {
            Commands::Create { description } => assert_eq!(description, "add users table"),
            _ => panic!("expected create"),
        }
    }

    #[test]
    #[serial]
    fn database_url_comes_from_the_environment() {
        std::env::set_var("DATABASE_URL", "postgres://env/app");
        let cli = Cli::try_parse_from(["tidemark", "status"]).unwrap();
        assert_eq!(cli.database_url.as_deref(), Some("postgres://env/app"));
        std::env::remove_var("DATABASE_URL");
    }

    #[test]
    #[serial]
    fn flag_beats_the_environment() {
        std::env::set_var("DATABASE_URL", "postgres://env/app");
        let cli = Cli::try_parse_from([
            "tidemark",
            "status",
            "--database-url",
            "postgres://flag/app",
        ])
        .unwrap();
        assert_eq!(cli.database_url.as_deref(), Some("postgres://flag/app"));
        std::env::remove_var("DATABASE_URL");
    }
}
