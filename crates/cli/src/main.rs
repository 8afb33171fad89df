mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::builder::NonEmptyStringValueParser;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use romgen_lib::consts::LATEST_CORES_URL;
use romgen_lib::settings::Profile;

use crate::output::OutputFormat;

/// romgen - build one branded package per payload variant
#[derive(Parser)]
#[command(name = "romgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging (ignored when RUST_LOG is set)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProfileArg {
  Legacy,
  Grouped,
}

impl From<ProfileArg> for Profile {
  fn from(arg: ProfileArg) -> Self {
    match arg {
      ProfileArg::Legacy => Profile::Legacy,
      ProfileArg::Grouped => Profile::Grouped,
    }
  }
}

#[derive(Subcommand)]
enum Commands {
  /// Build and archive every discovered variant
  Build {
    /// Project root (default: $ROMGEN_PROJECT or the current directory)
    #[arg(short, long)]
    project: Option<PathBuf>,

    /// Input layout and output naming profile
    #[arg(long, value_enum)]
    profile: Option<ProfileArg>,

    /// Stop at the first failed variant
    #[arg(long)]
    fail_fast: bool,

    /// Only build variants with this id (repeatable)
    #[arg(long = "only", value_name = "ID")]
    only: Vec<String>,

    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// List discovered variants without building
  List {
    /// Project root (default: $ROMGEN_PROJECT or the current directory)
    #[arg(short, long)]
    project: Option<PathBuf>,

    /// Input layout and output naming profile
    #[arg(long, value_enum)]
    profile: Option<ProfileArg>,

    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Put back the resource document left behind by an interrupted run
  Restore {
    /// Project root (default: $ROMGEN_PROJECT or the current directory)
    #[arg(short, long)]
    project: Option<PathBuf>,
  },

  /// Download a prebuilt core for every ABI into the project's native libraries
  Cores {
    /// Core name, e.g. mgba
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    core: String,

    /// Project root (default: $ROMGEN_PROJECT or the current directory)
    #[arg(short, long)]
    project: Option<PathBuf>,

    /// Buildbot directory holding one subdirectory per ABI
    #[arg(long, default_value = LATEST_CORES_URL)]
    base_url: String,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Build {
      project,
      profile,
      fail_fast,
      only,
      output,
    } => cmd::cmd_build(project, profile.map(Into::into), fail_fast, &only, output),
    Commands::List {
      project,
      profile,
      output,
    } => cmd::cmd_list(project, profile.map(Into::into), output),
    Commands::Restore { project } => cmd::cmd_restore(project),
    Commands::Cores {
      core,
      project,
      base_url,
    } => cmd::cmd_cores(&core, project, &base_url),
  }
}
