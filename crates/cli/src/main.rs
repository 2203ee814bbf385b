// payee CLI - headless payee standardization, classification and duplicate detection

mod duplicates;
mod exit_codes;
mod payees;
mod table;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use payeekit_config::{get_api_key, Settings};
use payeekit_dedup::DedupError;
use payeekit_oracle::{OracleClient, OracleOptions};
use payeekit_recon::ReconError;

use exit_codes::{
    EXIT_CLASSIFY_ORACLE, EXIT_CONFIG_INVALID, EXIT_CONFIG_MISSING_KEY, EXIT_ENGINE_INVARIANT,
    EXIT_ERROR, EXIT_INPUT_INVALID, EXIT_SUCCESS,
};

#[derive(Parser)]
#[command(name = "payee")]
#[command(about = "Standardize, classify and deduplicate payee names in tabular data")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/payeekit/settings.toml)
    #[arg(long, global = true, env = "PAYEEKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Log pass boundaries to stderr (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how payee names standardize
    #[command(after_help = "\
Examples:
  payee standardize 'Dr. John Smith Jr.' 'ACME, INC.'
  payee standardize 'john.doe@example.com' --json")]
    Standardize {
        /// Raw payee names
        #[arg(required = true)]
        names: Vec<String>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Map rows onto unique payees without classifying
    #[command(after_help = "\
Examples:
  payee map vendors.csv --column Payee
  payee map vendors.csv --column Payee --json")]
    Map {
        /// Input CSV with a header row
        input: PathBuf,

        /// Column holding the payee name
        #[arg(long, short = 'c')]
        column: String,

        /// Output JSON to stdout instead of a human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Classify every row's payee as Business or Individual
    #[command(after_help = "\
Examples:
  payee classify vendors.csv --column Payee --output classified.json
  payee classify vendors.csv --column Payee --json --strict

The oracle API key is read from the system keychain, then PAYEEKIT_ORACLE_KEY.")]
    Classify {
        /// Input CSV with a header row
        input: PathBuf,

        /// Column holding the payee name
        #[arg(long, short = 'c')]
        column: String,

        /// Output JSON to stdout instead of a human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Exit 30 when any row failed classification
        #[arg(long)]
        strict: bool,

        /// Do not consult or fill the classification cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Find payee names that refer to the same entity
    #[command(after_help = "\
Examples:
  payee duplicates vendors.csv --column Payee --no-ai
  payee duplicates vendors.csv --column Payee --json")]
    Duplicates {
        /// Input CSV with a header row
        input: PathBuf,

        /// Column holding the payee name
        #[arg(long, short = 'c')]
        column: String,

        /// Resolve ambiguous pairs algorithmically instead of asking the AI judge
        #[arg(long)]
        no_ai: bool,

        /// Output JSON to stdout instead of a human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Inspect and validate settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Validate a settings file without running anything
    Validate {
        /// Path to the settings TOML file
        file: PathBuf,
    },

    /// Print the effective settings as TOML
    Show,

    /// Print the default settings file location
    Path,
}

fn long_version() -> &'static str {
    concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")")
}

fn init_logging(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Standardize { names, json } => payees::cmd_standardize(names, json),
        Commands::Map { input, column, json, output } => {
            payees::cmd_map(&input, &column, json, output)
        }
        Commands::Classify { input, column, json, output, strict, no_cache } => {
            payees::cmd_classify(config, &input, &column, json, output, strict, no_cache)
        }
        Commands::Duplicates { input, column, no_ai, json, output } => {
            duplicates::cmd_duplicates(config, &input, &column, no_ai, json, output)
        }
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Validate { file } => cmd_config_validate(&file),
            ConfigCommands::Show => cmd_config_show(config),
            ConfigCommands::Path => {
                println!("{}", Settings::config_path().display());
                Ok(())
            }
        },
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Exit code for an engine error: bad input, bad config, or a broken invariant.
    pub fn recon(err: ReconError) -> Self {
        let code = match &err {
            ReconError::EmptyInput | ReconError::MissingColumn { .. } => EXIT_INPUT_INVALID,
            ReconError::InvalidChunkSize(_)
            | ReconError::ConfigParse(_)
            | ReconError::ConfigValidation(_) => EXIT_CONFIG_INVALID,
            ReconError::Cancelled => EXIT_ERROR,
            _ => EXIT_ENGINE_INVARIANT,
        };
        let hint = match &err {
            ReconError::MissingColumn { .. } => Some("column names are case-sensitive; check the CSV header row".to_string()),
            ReconError::EmptyInput => Some("the CSV needs a header row and at least one data row".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    pub fn dedup(err: DedupError) -> Self {
        let code = match &err {
            DedupError::EmptyInput | DedupError::DuplicateId(_) => EXIT_INPUT_INVALID,
            DedupError::InvalidThresholds { .. }
            | DedupError::ConfigParse(_)
            | DedupError::ConfigValidation(_) => EXIT_CONFIG_INVALID,
            DedupError::Cancelled => EXIT_ERROR,
        };
        Self::new(code, err.to_string())
    }
}

pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, CliError> {
    Settings::load(explicit).map_err(|e| CliError::new(EXIT_CONFIG_INVALID, e.to_string()))
}

/// Build the oracle client from settings and the key store.
pub fn oracle_client(settings: &Settings) -> Result<OracleClient, CliError> {
    let provider = &settings.oracle.provider;
    let lookup = get_api_key(provider);
    let key = lookup.key.ok_or_else(|| {
        CliError::new(EXIT_CONFIG_MISSING_KEY, format!("no API key for oracle provider '{provider}'"))
            .with_hint(format!(
                "store one in the system keychain or set {}",
                payeekit_config::keys::env_var_name(provider)
            ))
    })?;
    log::info!("using oracle key from {}", lookup.source.as_str());

    let options = OracleOptions {
        poll_interval: settings.oracle.poll_interval(),
        max_wait: settings.oracle.max_wait(),
        ..OracleOptions::default()
    };
    OracleClient::new(&settings.oracle.api_base, &key, options)
        .map_err(|e| CliError::new(EXIT_CLASSIFY_ORACLE, e.to_string()))
}

// ============================================================================
// config
// ============================================================================

fn cmd_config_validate(file: &Path) -> Result<(), CliError> {
    let settings = Settings::load_from(file)
        .map_err(|e| CliError::new(EXIT_CONFIG_INVALID, e.to_string()))?;
    eprintln!(
        "{}: ok (chunk size {}, thresholds {}/{}, AI judge {})",
        file.display(),
        settings.classification.max_unique_per_chunk,
        settings.duplicates.low_threshold,
        settings.duplicates.high_threshold,
        if settings.duplicates.ai_enabled { "on" } else { "off" },
    );
    Ok(())
}

fn cmd_config_show(explicit: Option<&Path>) -> Result<(), CliError> {
    let settings = load_settings(explicit)?;
    let text = settings
        .to_toml()
        .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write!(handle, "{text}").map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))
}
