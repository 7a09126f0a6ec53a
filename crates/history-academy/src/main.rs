// history-academy/src/main.rs

#[cfg(feature = "cli")]
mod cli {
    use anyhow::{Context, Result};
    use clap::{Parser, Subcommand};
    use history_academy::store::{migration, TABLES};
    use history_academy::{telemetry, Database, StoreConfig};
    use std::path::PathBuf;
    use tracing::info;

    #[derive(Parser, Debug)]
    #[command(name = "history-academy", version, about = "Administer the history academy database")]
    struct Cli {
        /// Database file; overrides HISTORY_ACADEMY_DB_PATH.
        #[arg(long, global = true)]
        db: Option<PathBuf>,

        /// Increase log verbosity (-v, -vv).
        #[arg(short, long, action = clap::ArgAction::Count, global = true)]
        verbose: u8,

        #[command(subcommand)]
        command: Command,
    }

    #[derive(Subcommand, Debug)]
    enum Command {
        /// Apply pending migrations and report the schema version.
        Migrate,
        /// Print row counts per table.
        Stats {
            /// Emit JSON instead of a table.
            #[arg(long)]
            json: bool,
        },
        /// Run ANALYZE, incremental vacuum and integrity checks.
        Check,
        /// List managed tables.
        Tables,
    }

    fn open_database(db: Option<PathBuf>) -> Result<Database> {
        let mut config = StoreConfig::from_env()?;
        if let Some(db) = db {
            config.db_path = db;
            config.in_memory = false;
        }
        config.print_config();

        Database::open(&config)
            .with_context(|| format!("Failed to open database at {}", config.db_path.display()))
    }

    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        telemetry::init_tracing(cli.verbose);

        match cli.command {
            Command::Tables => {
                for table in TABLES {
                    println!("{}", table);
                }
            }
            Command::Migrate => {
                let db = open_database(cli.db)?;
                let version = db.schema_version()?;
                info!("Schema is at version {} (latest {})", version, migration::latest_version());
                println!("schema version {}", version);
            }
            Command::Stats { json } => {
                let stats = open_database(cli.db)?.get_stats()?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                } else {
                    for entry in &stats.tables {
                        println!("{:<22} {:>8}", entry.table, entry.rows);
                    }
                    println!("{:<22} {:>8}", "total", stats.total_rows());
                    println!("schema version {}, {} bytes", stats.schema_version, stats.database_size_bytes);
                }
            }
            Command::Check => {
                let report = open_database(cli.db)?.run_maintenance()?;
                for problem in &report.integrity_problems {
                    println!("integrity: {}", problem);
                }
                if report.foreign_key_violations > 0 {
                    println!("foreign key violations: {}", report.foreign_key_violations);
                }
                if !report.is_healthy() {
                    anyhow::bail!("database check failed");
                }
                println!("ok");
            }
        }

        Ok(())
    }
}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    cli::run()
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Enable with --features cli");
}
