//! dbshift Migration CLI Tool
//!
//! Moves a PostgreSQL schema between versions from the command line. Exits 0 on
//! success or when the database is already at the requested version, 1 otherwise.

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use dbshift::migration::{
    open_catalog, CatalogLayout, LogObserver, MigrationError, Migrator, Operation, Plan,
    SqlVersionStore, Version,
};
use dbshift::{connect, MayPostgresExecutor, ShiftConfig};
use std::path::PathBuf;
use std::process;

/// Coroutine stack size in words; stages run deep inside the driver and `regex`.
const COROUTINE_STACK_SIZE: usize = 0x10000;

#[derive(Parser, Debug)]
#[command(name = "dbshift-migrate")]
#[command(about = "Move a PostgreSQL schema between versions")]
#[command(version = "0.1.0")]
struct Cli {
    /// Database connection URL
    #[arg(long, short = 'c', visible_alias = "connection-string", global = true)]
    database_url: Option<String>,

    /// Version catalog path
    #[arg(long, short = 'p', visible_alias = "version-path", global = true)]
    catalog: Option<PathBuf>,

    /// Catalog layout on disk
    #[arg(long, value_enum, global = true)]
    layout: Option<LayoutArg>,

    /// Table holding the current version
    #[arg(long, global = true)]
    version_table: Option<String>,

    /// Configuration file
    #[arg(long, default_value = "config/config.toml", global = true)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Commands {
    /// Upgrade to VERSION, or to the latest available version
    Up {
        version: Option<String>,

        /// Show what would be executed without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Downgrade to VERSION, which stays installed
    Down {
        version: String,

        /// Show what would be executed without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Undo every version and remove the version table
    Delete {
        /// Show what would be executed without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the current version and exit
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn operation(&self) -> Option<Operation> {
        match self {
            Commands::Up { version, .. } => {
                Some(Operation::Upgrade(version.as_deref().map(Version::from)))
            }
            Commands::Down { version, .. } => {
                Some(Operation::Downgrade(Version::from(version.as_str())))
            }
            Commands::Delete { .. } => Some(Operation::Uninstall),
            Commands::Status { .. } => None,
        }
    }

    fn is_dry_run(&self) -> bool {
        match self {
            Commands::Up { dry_run, .. }
            | Commands::Down { dry_run, .. }
            | Commands::Delete { dry_run } => *dry_run,
            Commands::Status { .. } => false,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum LayoutArg {
    Directory,
    Plain,
}

impl From<LayoutArg> for CatalogLayout {
    fn from(layout: LayoutArg) -> Self {
        match layout {
            LayoutArg::Directory => CatalogLayout::Directory,
            LayoutArg::Plain => CatalogLayout::Plain,
        }
    }
}

/// Everything a run needs, after flags, environment and config file are merged
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    database_url: String,
    catalog_path: PathBuf,
    layout: CatalogLayout,
    version_table: String,
}

/// Flags win, then `DBSHIFT_DATABASE_URL` / `DATABASE_URL`, then the config file.
fn resolve_settings(
    cli: &Cli,
    config: ShiftConfig,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let database_url = cli
        .database_url
        .clone()
        .or_else(|| env("DBSHIFT_DATABASE_URL"))
        .or_else(|| env("DATABASE_URL"))
        .or(config.database_url)
        .ok_or_else(|| {
            anyhow!(
                "Database URL not provided. Use --database-url or set DBSHIFT_DATABASE_URL or DATABASE_URL environment variable."
            )
        })?;

    Ok(Settings {
        database_url,
        catalog_path: cli.catalog.clone().unwrap_or(config.catalog_path),
        layout: cli.layout.map_or(config.layout, CatalogLayout::from),
        version_table: cli.version_table.clone().unwrap_or(config.version_table),
    })
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() {
    dotenv::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    init_logging(cli.verbose, cli.quiet);

    let code = match run(cli) {
        Ok(()) => 0,
        Err(e) => match e.downcast_ref::<MigrationError>() {
            Some(err) if err.is_nothing_to_do() => {
                println!("{}", err.to_string().yellow());
                0
            }
            _ => {
                eprintln!("{} {:#}", "❌ Error:".red().bold(), e);
                1
            }
        },
    };
    process::exit(code);
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ShiftConfig::load_from(&cli.config).context("Failed to load configuration")?;
    let settings = resolve_settings(&cli, config, |key| std::env::var(key).ok())?;
    let command = cli.command;
    let quiet = cli.quiet;

    // The driver's I/O is scheduled by the may runtime, so the run gets its own coroutine.
    may::config().set_stack_size(COROUTINE_STACK_SIZE);
    let handle = may::go!(move || execute(&settings, &command, quiet));
    handle
        .join()
        .map_err(|_| anyhow!("Migration coroutine panicked"))?
}

fn execute(settings: &Settings, command: &Commands, quiet: bool) -> anyhow::Result<()> {
    let client = connect(&settings.database_url).context("Error connecting to database")?;
    let executor = MayPostgresExecutor::new(client);
    if !executor
        .check_health()
        .context("Database health check failed")?
    {
        bail!("Database health check returned an unexpected value");
    }

    let catalog = open_catalog(settings.layout, &settings.catalog_path);
    let store = SqlVersionStore::new(settings.version_table.as_str())?;
    let migrator = Migrator::new(&executor, catalog, store).with_observer(LogObserver);

    let Some(operation) = command.operation() else {
        let json = matches!(command, Commands::Status { json: true });
        return print_status(&migrator, json);
    };

    if command.is_dry_run() {
        let plan = migrator.plan(&operation)?;
        print_plan(&operation, &plan);
        return Ok(());
    }

    let report = migrator.run(operation)?;
    if !quiet {
        match &report.current {
            Some(version) => println!(
                "{} {} stage(s) applied, now at version {}",
                "✅".green(),
                report.applied_count(),
                version.to_string().bold()
            ),
            None => println!(
                "{} {} stage(s) undone, version information removed",
                "✅".green(),
                report.applied_count()
            ),
        }
    }
    Ok(())
}

fn print_status<C, S>(migrator: &Migrator<'_, C, S>, json: bool) -> anyhow::Result<()>
where
    C: dbshift::migration::VersionCatalog,
    S: dbshift::migration::VersionStore,
{
    let status = migrator.status()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    match &status.current {
        Some(current) => {
            println!("Current version deployed: {}", current.to_string().bold());
            if !status.is_known() {
                println!(
                    "{}",
                    "  Warning: this version is not in the catalog".yellow()
                );
            }
        }
        None => println!("{}", MigrationError::NoInstallation.to_string().yellow()),
    }

    if status.pending.is_empty() {
        println!("⏳ Pending versions: None");
    } else {
        println!("⏳ Pending versions ({}):", status.pending.len());
        for version in &status.pending {
            println!("  ⏳ {}", version);
        }
    }
    Ok(())
}

fn print_plan(operation: &Operation, plan: &Plan) {
    println!(
        "Would {} by running {} stage(s) {}:",
        operation.action(),
        plan.versions.len(),
        plan.direction
    );
    for (i, version) in plan.versions.iter().enumerate() {
        println!("  {}. {}", i + 1, version);
    }
}
