use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;

use orkut_server::config::Settings;
use orkut_server::db::seed::{SeedSummary, DEMO_PASSWORD};
use orkut_server::db::Database;
use orkut_server::session::SessionManager;

/// Orkut database administration
///
/// Creates and inspects the SQLite database used by orkut-server.
#[derive(Parser, Debug)]
#[command(name = "orkut-admin")]
#[command(about = "Maintenance tools for the Orkut database", long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "./orkut.db")]
    database: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database file and apply the schema
    Init,
    /// Add demo users, friendships, scraps, posts and a community
    Seed,
    /// Print the number of rows in each table
    Stats,
    /// Delete expired login sessions
    PurgeSessions,
}

/// Open an existing database and make sure it carries the schema
fn connect_database(path: &str) -> Result<Database> {
    if !Path::new(path).exists() {
        anyhow::bail!("Database file not found: {} (run `orkut-admin init` first)", path);
    }

    let db = Database::new(path).context("Failed to open database connection")?;

    let conn = db.connection()?;
    for table in ["users", "sessions"] {
        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                [table],
                |row| row.get::<_, i32>(0).map(|count| count > 0),
            )
            .with_context(|| format!("Failed to check for {} table", table))?;
        if !exists {
            anyhow::bail!("Database schema is invalid - {} table not found", table);
        }
    }
    drop(conn);

    Ok(db)
}

fn init(path: &str) -> Result<Database> {
    let db = Database::new(path).context("Failed to create database")?;
    db.initialize()?;
    Ok(db)
}

fn display_seed(summary: &SeedSummary) {
    if *summary == SeedSummary::default() {
        println!("Demo data already present - nothing to do.");
        return;
    }
    println!("Seeded demo data");
    println!("================");
    println!("Users: {}", summary.users);
    println!("Friendships: {}", summary.friendships);
    println!("Scraps: {}", summary.scraps);
    println!("Posts: {}", summary.posts);
    println!("Communities: {}", summary.communities);
    println!();
    println!("Every demo account uses the password '{}'.", DEMO_PASSWORD);
}

fn display_stats(counts: &[(&str, i64)]) {
    let width = counts.iter().map(|(table, _)| table.len()).max().unwrap_or(0);
    println!("Table row counts");
    println!("================");
    for (table, count) in counts {
        println!("{:<width$}  {}", table, count, width = width);
    }
}

fn purge_sessions(db: Database) -> Result<usize> {
    let settings = Settings::new().context("Failed to load settings")?;
    let manager = SessionManager::new(db, &settings.auth.jwt_secret, settings.auth.session_days);
    manager.cleanup_expired_sessions()
}

fn main() -> Result<()> {
    let args = Args::parse();
    println!("Database: {}", args.database);
    println!();

    match args.command {
        Command::Init => {
            init(&args.database)?;
            println!("Schema applied.");
        }
        Command::Seed => {
            let db = connect_database(&args.database)?;
            display_seed(&db.seed_demo_data()?);
        }
        Command::Stats => {
            let db = connect_database(&args.database)?;
            display_stats(&db.table_counts()?);
        }
        Command::PurgeSessions => {
            let db = connect_database(&args.database)?;
            let removed = purge_sessions(db)?;
            println!("Removed {} expired sessions.", removed);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn db_path(temp_dir: &TempDir) -> String {
        temp_dir.path().join("orkut.db").to_string_lossy().into_owned()
    }

    #[test]
    fn test_args_parse_subcommands() {
        let args = Args::try_parse_from(["orkut-admin", "--database", "x.db", "purge-sessions"]).unwrap();
        assert_eq!(args.database, "x.db");
        assert!(matches!(args.command, Command::PurgeSessions));

        assert!(Args::try_parse_from(["orkut-admin", "explode"]).is_err());
    }

    #[test]
    fn test_connect_requires_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = connect_database(&db_path(&temp_dir)).err().unwrap();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_init_then_seed_and_count() {
        let temp_dir = TempDir::new().unwrap();
        let path = db_path(&temp_dir);
        init(&path).unwrap();

        let db = connect_database(&path).unwrap();
        let summary = db.seed_demo_data().unwrap();
        assert!(summary.users > 0);

        let counts = db.table_counts().unwrap();
        let users = counts.iter().find(|(t, _)| *t == "users").map(|(_, c)| *c);
        assert_eq!(users, Some(summary.users as i64));
    }

    #[test]
    fn test_connect_rejects_foreign_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = db_path(&temp_dir);
        // an empty SQLite database without our tables
        Database::new(&path).unwrap().connection().unwrap();

        let err = connect_database(&path).err().unwrap();
        assert!(err.to_string().contains("schema is invalid"));
    }
}
