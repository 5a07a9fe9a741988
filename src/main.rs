use clap::{ArgAction, Parser, Subcommand};
use smokedb::{fixture, logging, Case, ConfigOverrides, Harness, HarnessConfig, OutputFormat};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "smokedb")]
#[command(about = "smokedb - smoke tests for embedded SQLite database files")]
#[command(version)]
struct Cli {
    /// Config file path (TOML)
    #[arg(short, long, global = true, env = "SMOKEDB_CONFIG")]
    config: Option<PathBuf>,

    /// Fixture database read by the read case
    #[arg(long, global = true, env = "SMOKEDB_FIXTURE")]
    fixture: Option<PathBuf>,

    /// Scratch database for the write and bulk cases
    #[arg(long, global = true, env = "SMOKEDB_WRITE_FILE")]
    write_file: Option<PathBuf>,

    /// Scratch database for the delete case
    #[arg(long, global = true, env = "SMOKEDB_DELETE_FILE")]
    delete_file: Option<PathBuf>,

    /// Table holding the key/value records
    #[arg(long, global = true, env = "SMOKEDB_TABLE")]
    table: Option<String>,

    /// Remove scratch files before each case opens them
    #[arg(long, global = true)]
    reset_scratch: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run smoke cases (all of them when no --case is given)
    Run {
        /// Case to run: read, write, delete or bulk (repeatable)
        #[arg(long = "case", value_name = "CASE")]
        cases: Vec<Case>,

        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Create the fixture database holding the read probe
    Fixture {
        /// Replace an existing fixture
        #[arg(long)]
        force: bool,
    },
    /// Show page count, tables and records of a database file
    Inspect {
        /// Database file to inspect
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let env_level = std::env::var(logging::LOG_ENV).ok();
    let level = logging::level_from_flags(cli.verbose, cli.quiet, env_level.as_deref());
    if let Err(e) = logging::init(level) {
        eprintln!("Error: {e}");
    }

    match run_command(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

/// Returns whether the command succeeded; `Err` is for failures before any case ran
fn run_command(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let overrides = ConfigOverrides {
        fixture_path: cli.fixture,
        write_path: cli.write_file,
        delete_path: cli.delete_file,
        table: cli.table,
        reset_scratch: cli.reset_scratch.then_some(true),
    };
    let config = HarnessConfig::load(cli.config.as_deref(), overrides)?;

    let command = cli.command.unwrap_or(Commands::Run {
        cases: Vec::new(),
        format: OutputFormat::Table,
    });

    match command {
        Commands::Run { cases, format } => {
            let harness = Harness::new(config);
            let report = if cases.is_empty() {
                harness.run_all()
            } else {
                harness.run(&cases)
            };
            println!("{}", report.render(format)?);
            Ok(report.passed())
        }
        Commands::Fixture { force } => {
            let path = config.fixture_path()?;
            fixture::create_fixture(
                path,
                &config.table,
                &config.probes.read,
                &config.engine,
                force,
            )?;
            println!(
                "Created {} ({} = {})",
                path.display(),
                config.probes.read.key,
                config.probes.read.value
            );
            Ok(true)
        }
        Commands::Inspect { path } => {
            let inspection = fixture::inspect(&path, &config.table, &config.engine)?;
            print!("{inspection}");
            Ok(true)
        }
    }
}
