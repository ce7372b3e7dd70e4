mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::DeployArgs;
use crate::output::{OutputFormat, print_error};

/// metapack - deployment manifest generator for metadata repositories
#[derive(Parser)]
#[command(name = "metapack")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  /// Type registry document (defaults to the built-in registry)
  #[arg(long, global = true, env = "METAPACK_REGISTRY")]
  registry: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build the deploy package (and optional rollback) for the current commit
  Deploy(DeployArgs),

  /// Build a manifest from explicit paths
  Manifest {
    /// Build a destructiveChanges manifest
    #[arg(long)]
    destructive: bool,

    /// Write the manifest to this file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,

    /// Repository-relative file paths
    #[arg(required = true)]
    paths: Vec<String>,
  },

  /// Show how paths are classified
  Classify {
    /// Repository-relative file paths
    #[arg(required = true)]
    paths: Vec<String>,
  },

  /// List the registry's declared types
  Types,
}

fn init_logging(verbose: bool) {
  let default_level = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let registry = cli.registry.as_deref();
  let result: Result<()> = match cli.command {
    Commands::Deploy(args) => cmd::cmd_deploy(args, registry, cli.output),
    Commands::Manifest {
      destructive,
      out,
      paths,
    } => cmd::cmd_manifest(&paths, destructive, out.as_deref(), registry),
    Commands::Classify { paths } => cmd::cmd_classify(&paths, registry, cli.output),
    Commands::Types => cmd::cmd_types(registry, cli.output),
  };

  if let Err(e) = result {
    print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}
