use clap::{Parser, Subcommand};
use migration::MigratorTrait;
use sea_orm::Database;
use tasks_server::task::{PostgresTaskRepository, TaskRepository};

/// Maintenance commands for the tasks database.
#[derive(Parser, Debug)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
enum Commands {
    /// Apply database migrations.
    Migrate,
    /// Delete all task rows, for test/reset purposes.
    Clean,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let args = Cli::parse();
    let config = tasks_server::config::Config::from_env()?;
    let db = Database::connect(&config.connection_target).await?;

    match args.command {
        Commands::Migrate => {
            migration::Migrator::up(&db, None).await?;
            println!("Migration completed successfully!");
        }
        Commands::Clean => {
            let repository = PostgresTaskRepository::new(db);
            let deleted = repository.delete_all_tasks().await?;
            println!("Tasks table cleared successfully! ({} rows deleted)", deleted);
        }
    }

    Ok(())
}
