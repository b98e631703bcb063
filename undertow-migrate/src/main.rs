//! Undertow Migration CLI Tool
//!
//! Plans, applies and inspects declarative schema migrations against a
//! PostgreSQL database. Suitable for CI/CD pipelines: `plan` only writes the
//! statements it would run.

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::io;
use std::path::PathBuf;
use std::process;
use undertow::config::DEFAULT_CONFIG_FILE;
use undertow::migration::{Introspector, Migrator, WriteDriver};
use undertow::{connect_executor, Dialect, MigrateOptions, Postgres};
use undertow_migrate::schema_file::load_schema;
use undertow_migrate::summary::render_report;
use undertow_migrate::{resolve_database_url, DATABASE_URL_VARS};

#[derive(Parser)]
#[command(name = "undertow-migrate")]
#[command(about = "Declarative schema migration for PostgreSQL")]
#[command(version = "0.1.0")]
struct Cli {
    /// Database connection URL
    #[arg(long)]
    database_url: Option<String>,

    /// Options file (the `[migrate]` section is read)
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the statements that would bring the database to the schema file
    Plan {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Bring the database to the schema file
    Apply {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Dump live tables as JSON
    Inspect {
        /// Tables to read
        #[arg(required = true)]
        tables: Vec<String>,

        /// Schema to read (default: the connection's current schema)
        #[arg(long)]
        schema: Option<String>,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// Target schema file (.toml or .json)
    #[arg(long)]
    schema: PathBuf,

    /// Drop live columns missing from the schema file
    #[arg(long)]
    drop_columns: bool,

    /// Drop live indexes missing from the schema file
    #[arg(long)]
    drop_indexes: bool,

    /// Give every table a disjoint 2^32 id range
    #[arg(long)]
    universal_id: bool,

    /// Rename legacy foreign-key columns
    #[arg(long)]
    with_fixture: bool,

    /// Skip foreign keys
    #[arg(long)]
    no_foreign_keys: bool,

    /// Run every statement in one transaction
    #[arg(long)]
    transactional: bool,
}

impl TargetArgs {
    /// Flags switch options on; they never switch off what the config file enables.
    fn apply_to(&self, options: MigrateOptions) -> MigrateOptions {
        let drop_columns = options.drop_columns || self.drop_columns;
        let drop_indexes = options.drop_indexes || self.drop_indexes;
        let universal_id = options.universal_id || self.universal_id;
        let with_fixture = options.with_fixture || self.with_fixture;
        let with_foreign_keys = options.with_foreign_keys && !self.no_foreign_keys;
        let transactional = options.transactional || self.transactional;
        options
            .drop_columns(drop_columns)
            .drop_indexes(drop_indexes)
            .universal_id(universal_id)
            .with_fixture(with_fixture)
            .with_foreign_keys(with_foreign_keys)
            .transactional(transactional)
    }
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    if let Err(e) = run(cli) {
        eprintln!("{} {e:#}", "error:".red().bold());
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli
        .config
        .to_str()
        .ok_or_else(|| anyhow!("config path {} is not valid UTF-8", cli.config.display()))?;
    let options = MigrateOptions::load_from(config).with_context(|| format!("loading {config}"))?;

    let database_url = resolve_database_url(cli.database_url, |name| std::env::var(name).ok()).ok_or_else(|| {
        anyhow!(
            "database URL not provided; use --database-url or set {}",
            DATABASE_URL_VARS.join(" or ")
        )
    })?;
    let conn = connect_executor(&database_url).context("connecting to the database")?;

    match cli.command {
        Commands::Plan { target } => {
            let tables = load_schema(&target.schema)?;
            let driver = WriteDriver::new(&conn, io::stdout().lock());
            let report = Migrator::postgres(&driver, target.apply_to(options)).create(&tables)?;
            driver.finish()?;
            if !cli.quiet {
                eprint!("{}", render_report(&report));
            }
        }
        Commands::Apply { target } => {
            let tables = load_schema(&target.schema)?;
            let report = Migrator::postgres(&conn, target.apply_to(options)).create(&tables)?;
            if !cli.quiet {
                print!("{}", render_report(&report));
                println!("{}", "✅ Success".green());
            }
        }
        Commands::Inspect { tables, schema } => {
            let options = match schema {
                Some(schema) => options.schema(schema),
                None => options,
            };
            options.validate()?;
            let mut dialect = Postgres::from_options(&options);
            dialect.init(&conn)?;
            let live = Introspector::new(&dialect, &conn).export(&tables)?;
            println!("{}", serde_json::to_string_pretty(&live)?);
        }
    }
    Ok(())
}
