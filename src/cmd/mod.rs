mod convert;
mod glob_util;
mod status;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqldump-csv")]
#[command(version)]
#[command(
    about = "Convert MySQL dump files into table schemas and chunked CSV files",
    long_about = None
)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Verbose output (same as --log-level debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert dump files into <table>.schema and <table>.NNN.csv files
    Convert {
        /// Dump files or glob patterns (e.g., dumps/*.sql.gz); reads stdin if omitted.
        /// Supports .gz, .bz2, .xz, .zst compression
        files: Vec<PathBuf>,

        /// Output directory for schema and CSV files
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// YAML config file (chunk_size, compress, allow, deny, strip_ip_suffix)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Chunk size ceiling in bytes
        #[arg(long)]
        chunk_size: Option<u64>,

        /// Write gzip-compressed chunks (<table>.NNN.csv.gz)
        #[arg(short = 'z', long)]
        compress: bool,

        /// Only convert tables whose whole name matches this regex
        #[arg(long)]
        allow: Option<String>,

        /// Skip tables whose whole name matches this regex
        #[arg(long)]
        deny: Option<String>,

        /// Strip ", a.b.c.d" sequences from quoted values
        #[arg(long)]
        strip_ip_suffix: bool,

        /// Show progress during processing
        #[arg(short, long)]
        progress: bool,

        /// Continue with the next input when one fails
        #[arg(long)]
        keep_going: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the tables in an output directory and whether they are fresh
    Status {
        /// Output directory of a previous convert run
        #[arg(default_value = "output")]
        dir: PathBuf,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Install the stderr log subscriber.
pub fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else {
        cli.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Convert {
            files,
            output,
            config,
            chunk_size,
            compress,
            allow,
            deny,
            strip_ip_suffix,
            progress,
            keep_going,
            json,
        } => {
            let overrides = convert::Overrides {
                chunk_size,
                compress,
                allow,
                deny,
                strip_ip_suffix,
            };
            convert::run(files, output, config, overrides, progress, keep_going, json)
        }
        Commands::Status { dir, json } => status::run(dir, json),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "sqldump-csv", &mut io::stdout());
            Ok(())
        }
    }
}
