//! Thin CLI over the locatedb index: search, update, and stats.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::DateTime;
use clap::{CommandFactory, Parser};

use locatedb::{IndexManager, LocateError, QueryOptions, QueryOutcome, UpdateOptions};

#[derive(Parser, Debug)]
#[command(
    name = "rlocate",
    version,
    about = "Find files by name using a persistent filesystem index"
)]
struct Cli {
    /// Search pattern (supports * and ? wildcards)
    pattern: Option<String>,

    /// Database file path
    #[arg(short = 'd', long)]
    database: Option<PathBuf>,

    /// Limit number of results
    #[arg(short = 'l', long, default_value_t = 1000)]
    limit: usize,

    /// Only show count of matches
    #[arg(short = 'c', long)]
    count: bool,

    /// Ignore case distinctions
    #[arg(short = 'i', long)]
    ignore_case: bool,

    /// Match only the base name
    #[arg(short = 'b', long)]
    basename: bool,

    /// Show database statistics
    #[arg(short = 's', long)]
    stats: bool,

    /// Update the database before searching
    #[arg(short = 'u', long)]
    update: bool,

    /// Paths to index with --update (default: home and system paths)
    #[arg(long = "root", value_name = "PATH")]
    roots: Vec<PathBuf>,

    /// Report skipped entries while indexing
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Follow symbolic links while indexing
    #[arg(long)]
    follow_symlinks: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {error}");
            if matches!(error, LocateError::Corrupt(_)) {
                eprintln!("The index failed integrity checks. Run 'rlocate --update' to rebuild it.");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, LocateError> {
    let db_path = match &cli.database {
        Some(path) => path.clone(),
        None => default_database_path()?,
    };
    log::debug!("using database {}", db_path.display());

    if cli.stats {
        let manager = open_existing(&db_path)?;
        let stats = manager.stats();
        println!("Database: {}", db_path.display());
        println!("Records: {}", stats.record_count);
        println!("Roots: {}", stats.root_count);
        println!(
            "Updated: {}",
            stats
                .generation_timestamp
                .map(format_timestamp)
                .unwrap_or_else(|| "never".to_string())
        );
        println!("Size: {}", format_size(stats.size_bytes_on_disk));
        return Ok(ExitCode::SUCCESS);
    }

    if cli.update {
        // A corrupt database is rebuilt from scratch here: --update is the
        // explicit rebuild the integrity error asks for.
        let manager = match IndexManager::open(&db_path) {
            Ok(manager) => manager,
            Err(LocateError::Corrupt(reason)) => {
                eprintln!("Rebuilding corrupt index ({reason})");
                IndexManager::create(&db_path)?
            }
            Err(error) => return Err(error),
        };

        let roots = if cli.roots.is_empty() {
            default_roots()
        } else {
            cli.roots.clone()
        };
        if cli.verbose {
            eprintln!("Indexing filesystem...");
            for root in &roots {
                eprintln!("  {}", root.display());
            }
        }

        let options = UpdateOptions {
            follow_symlinks: cli.follow_symlinks,
            verbose: cli.verbose,
            ..UpdateOptions::default()
        };
        match manager.update(roots, &options)? {
            Some(summary) => {
                eprintln!(
                    "Indexed {} entries ({} skipped) in {:.1}s",
                    summary.records_indexed,
                    summary.errors_skipped,
                    summary.duration.as_secs_f64()
                );
                eprintln!("Database: {}", db_path.display());
                eprintln!("Size: {}", format_size(manager.stats().size_bytes_on_disk));
            }
            None => {
                eprintln!("Update cancelled");
                return Ok(ExitCode::FAILURE);
            }
        }

        if cli.pattern.is_none() {
            return Ok(ExitCode::SUCCESS);
        }
    }

    let Some(pattern) = &cli.pattern else {
        Cli::command()
            .print_help()
            .map_err(|error| LocateError::Internal(error.to_string()))?;
        return Ok(ExitCode::from(2));
    };

    let manager = open_existing(&db_path)?;
    let options = QueryOptions {
        case_sensitive: !cli.ignore_case,
        basename_only: cli.basename,
        limit: Some(cli.limit),
        count_only: cli.count,
        ..QueryOptions::default()
    };

    match manager.query(pattern, &options)? {
        Some(QueryOutcome::Count(count)) => println!("{count}"),
        Some(QueryOutcome::Records(records)) => {
            for record in &records {
                println!("{}", record.full_path);
            }
        }
        None => return Ok(ExitCode::FAILURE),
    }

    Ok(ExitCode::SUCCESS)
}

/// Opens the database, failing with a hint when it does not exist yet.
fn open_existing(db_path: &PathBuf) -> Result<IndexManager, LocateError> {
    if !db_path.exists() {
        return Err(LocateError::Internal(format!(
            "database does not exist: {}. Run 'rlocate --update' first.",
            db_path.display()
        )));
    }
    IndexManager::open(db_path)
}

/// `~/.local/var/rlocate/index.db`, the single file the store owns.
fn default_database_path() -> Result<PathBuf, LocateError> {
    let home = dirs::home_dir()
        .ok_or_else(|| LocateError::Internal("cannot determine home directory".to_string()))?;
    Ok(home
        .join(".local")
        .join("var")
        .join("rlocate")
        .join("index.db"))
}

/// Default index roots: home plus the common system prefixes, filtered to
/// the ones that exist on this machine.
fn default_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Some(home) = dirs::home_dir() {
        roots.push(home);
    }
    for path in ["/usr", "/opt", "/var"] {
        roots.push(PathBuf::from(path));
    }
    roots.retain(|path| path.exists());
    roots
}

fn format_timestamp(unix_secs: u64) -> String {
    DateTime::from_timestamp(unix_secs as i64, 0)
        .map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| unix_secs.to_string())
}

fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if value < 1024.0 {
            return format!("{value:.1} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1} TB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(0), "0.0 B");
        assert_eq!(format_size(512), "512.0 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn cli_parses_search_flags() {
        let cli = Cli::parse_from(["rlocate", "-i", "-b", "-l", "10", "pattern"]);
        assert!(cli.ignore_case);
        assert!(cli.basename);
        assert_eq!(cli.limit, 10);
        assert_eq!(cli.pattern.as_deref(), Some("pattern"));
    }

    #[test]
    fn cli_parses_update_roots() {
        let cli = Cli::parse_from(["rlocate", "-u", "--root", "/a", "--root", "/b"]);
        assert!(cli.update);
        assert_eq!(cli.roots, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
    }
}
