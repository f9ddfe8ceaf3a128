//! CLI module - Command line interface definitions and handlers

pub mod commands;
pub mod interactive;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::archive::{store, Archive};
use crate::config::Config;
use crate::container::Marker;
use crate::sniff::SignatureRegistry;

/// rpa-splice - Inspect and edit marker-delimited containers
///
/// Splits a container on its marker, identifies each chunk by magic number,
/// and lets you add, replace, delete and extract chunks.
#[derive(Parser, Debug)]
#[command(name = "rpa-splice")]
#[command(author = "Ryan Cashmoney <tunclon@proton.me>")]
#[command(version)]
#[command(about = "Inspect and edit marker-delimited containers", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Container marker as text
    #[arg(long, global = true, conflicts_with = "marker_hex")]
    pub marker: Option<String>,

    /// Container marker as hex (e.g. 7C7C)
    #[arg(long, global = true)]
    pub marker_hex: Option<String>,

    /// Output format for machine parsing
    #[arg(long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the chunks of an archive
    List(ListArgs),

    /// Show hashes and format details for chunks
    Info(InfoArgs),

    /// Write chunks out as files
    Extract(ExtractArgs),

    /// Append files as new chunks
    Add(AddArgs),

    /// Replace one chunk with a file
    Replace(ReplaceArgs),

    /// Delete chunks
    Delete(DeleteArgs),

    /// Identify files by magic number
    Sniff(SniffArgs),

    /// Show or write the signature table
    Signatures(SignaturesArgs),

    /// Show or create the config file
    Config(ConfigArgs),

    /// Menu-driven editing session (default)
    Interactive(InteractiveArgs),
}

#[derive(Debug, Clone, Parser)]
pub struct ListArgs {
    /// Archive to read
    #[arg(required = true)]
    pub archive: PathBuf,
}

#[derive(Debug, Clone, Parser)]
pub struct InfoArgs {
    /// Archive to read
    #[arg(required = true)]
    pub archive: PathBuf,

    /// Chunk indices (one shows details, several or none show a summary)
    pub indices: Vec<usize>,
}

#[derive(Debug, Clone, Parser)]
pub struct ExtractArgs {
    /// Archive to read
    #[arg(required = true)]
    pub archive: PathBuf,

    /// Destination directory (default: [extract] default_dest)
    pub dest: Option<PathBuf>,

    /// Only these chunk indices (e.g. 0,3,4)
    #[arg(long, short, value_delimiter = ',')]
    pub index: Option<Vec<usize>>,

    /// Only chunks whose name matches this glob (e.g. *.png)
    #[arg(long, short)]
    pub pattern: Option<String>,

    /// Create manifest file with hashes
    #[arg(long, short)]
    pub manifest: bool,

    /// Dry run - show what would be extracted
    #[arg(long, short = 'n')]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Parser)]
pub struct AddArgs {
    /// Archive to extend (created if missing)
    #[arg(required = true)]
    pub archive: PathBuf,

    /// Files (or directories with --recursive) to append
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Descend into directories
    #[arg(long, short)]
    pub recursive: bool,

    /// Write the result here instead of over the archive
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, Parser)]
pub struct ReplaceArgs {
    /// Archive to edit
    #[arg(required = true)]
    pub archive: PathBuf,

    /// Chunk index to replace
    #[arg(required = true)]
    pub index: usize,

    /// Replacement file
    #[arg(required = true)]
    pub file: PathBuf,

    /// Don't ask about size changes
    #[arg(long, short)]
    pub yes: bool,

    /// Write the result here instead of over the archive
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, Parser)]
pub struct DeleteArgs {
    /// Archive to edit
    #[arg(required = true)]
    pub archive: PathBuf,

    /// Chunk indices to delete
    #[arg(required = true, value_delimiter = ',')]
    pub indices: Vec<usize>,

    /// Don't ask for confirmation
    #[arg(long, short)]
    pub yes: bool,

    /// Write the result here instead of over the archive
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, Parser)]
pub struct SniffArgs {
    /// Files to identify
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Parser)]
pub struct SignaturesArgs {
    /// Write the active table to the configured signatures path
    #[arg(long)]
    pub init: bool,
}

#[derive(Debug, Clone, Parser)]
pub struct ConfigArgs {
    /// Create the config file if it doesn't exist
    #[arg(long)]
    pub init: bool,
}

#[derive(Debug, Clone, Parser, Default)]
pub struct InteractiveArgs {
    /// Archive to open on start
    pub archive: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable (default)
    #[default]
    Human,
    /// JSON output
    Json,
}

/// Settings resolved from config file and global flags
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub marker: Marker,
    pub registry: SignatureRegistry,
    pub output: OutputFormat,
}

impl AppContext {
    /// Load config, then apply command-line overrides
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
        let config = load_config(&config_path);

        let marker = match (&cli.marker_hex, &cli.marker) {
            (Some(hex), _) => Marker::from_hex(hex).context("Invalid --marker-hex")?,
            (None, Some(text)) => Marker::new(text.as_bytes().to_vec()).context("Invalid --marker")?,
            (None, None) => config.resolve_marker()?,
        };

        let registry = SignatureRegistry::load(&config.signatures_path(&config_path));
        tracing::debug!(
            "Marker {} ({} bytes), {} signatures from {}",
            marker,
            marker.len(),
            registry.len(),
            registry.source()
        );

        Ok(Self {
            config,
            config_path,
            marker,
            registry,
            output: cli.output.unwrap_or_default(),
        })
    }

    /// Where `signatures --init` writes and where the table is read from
    pub fn signatures_path(&self) -> PathBuf {
        self.config.signatures_path(&self.config_path)
    }

    /// Empty archive with this context's marker and signatures
    pub fn new_archive(&self) -> Archive {
        Archive::new(self.marker.clone(), self.registry.clone())
    }

    pub fn open_archive(&self, path: &Path) -> Result<Archive> {
        store::open(path, self.marker.clone(), self.registry.clone())
            .with_context(|| format!("Failed to open archive: {}", path.display()))
    }
}

/// `rpa_splice=<level>` filter directive, or `None` if `level` isn't a level
pub fn log_directive(level: &str) -> Option<tracing_subscriber::filter::Directive> {
    format!("rpa_splice={}", level).parse().ok()
}

/// Missing or broken config files fall back to defaults
fn load_config(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }
    match Config::load_from(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("{:#}; using defaults", e);
            Config::default()
        }
    }
}
