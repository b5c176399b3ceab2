use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// artifact-transform - Run artifact transforms with deterministic cache keys
///
/// Executes a transform (e.g. "unpack archive" -> directory) against one or
/// more input artifacts, validates its outputs, and reports the fingerprint
/// based cache key a build cache would store the result under.
#[derive(Parser, Debug)]
#[command(name = "artifact-transform")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run artifact transforms with deterministic cache keys", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Common configuration arguments shared across commands
#[derive(Args, Debug, Clone, Default)]
pub struct CommonConfigArgs {
    /// Config file path
    #[arg(short = 'c', long, env = "ARTIFACT_TRANSFORM_CONFIG")]
    pub config: Option<String>,

    /// Root directory for transform outputs
    #[arg(long, env = "ARTIFACT_TRANSFORM_OUTPUT_ROOT")]
    pub config_output_root: Option<String>,

    /// Maximum concurrent executions (0 = number of CPUs)
    #[arg(long, env = "ARTIFACT_TRANSFORM_MAX_PARALLEL")]
    pub config_max_parallel: Option<usize>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, env = "ARTIFACT_TRANSFORM_LOG_LEVEL")]
    pub config_log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a transform for each input
    Run(RunArgs),

    /// Compute cache keys without executing
    Identify(IdentifyArgs),

    /// Fingerprint files or directories
    Fingerprint(FingerprintArgs),

    /// List available transform implementations
    List,

    /// Configuration management utilities
    Config(ConfigArgs),
}

/// Selects and configures a transform step
#[derive(Args, Debug, Clone)]
pub struct TransformArgs {
    /// Transform implementation id (see `list`)
    #[arg(short = 't', long)]
    pub transform: String,

    /// Primary input artifact(s)
    #[arg(short = 'i', long = "input", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Transform parameter as a JSON literal, in order (repeatable)
    #[arg(short = 'p', long = "param")]
    pub params: Vec<String>,

    /// Variant attribute of the inputs as key=value (repeatable)
    #[arg(short = 'a', long = "attr")]
    pub attributes: Vec<String>,

    /// Glob of dependency artifacts, for transforms that consume them (repeatable)
    #[arg(short = 'd', long = "dependencies")]
    pub dependencies: Vec<String>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: CommonConfigArgs,

    #[command(flatten)]
    pub transform: TransformArgs,
}

#[derive(Args, Debug)]
pub struct IdentifyArgs {
    #[command(flatten)]
    pub common: CommonConfigArgs,

    #[command(flatten)]
    pub transform: TransformArgs,
}

#[derive(Args, Debug)]
pub struct FingerprintArgs {
    #[command(flatten)]
    pub common: CommonConfigArgs,

    /// Files or directories to fingerprint together
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Path normalization (absolute-path|relative-path|name-only|ignored-path)
    #[arg(short = 'n', long)]
    pub normalization: Option<String>,

    /// Require every input to be a directory
    #[arg(long)]
    pub directory: bool,

    /// Print the full fingerprint as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print an example configuration file
    Example,

    /// Validate the configuration file
    Validate {
        #[command(flatten)]
        common: CommonConfigArgs,
    },

    /// Print the effective configuration
    Show {
        #[command(flatten)]
        common: CommonConfigArgs,
    },
}
