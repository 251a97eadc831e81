use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the rpack file packager.
#[derive(Parser, Debug)]
#[command(
    name = "rpack",
    version,
    about = "Materialize versioned file packs through a sandboxed script",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Run a pack config and commit its outputs")]
pub struct RunArgs {
    /// Pack config file (NAME.rpack.yaml)
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Override working dir, defaults to the location of the config file
    #[arg(long, short = 'w', value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Force execution: overwrite files, ignore integrity warnings
    #[arg(long, short = 'f')]
    pub force: bool,

    /// Stop before committing; leave results in the staging directory
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Check integrity of the files managed by a pack config")]
pub struct CheckArgs {
    /// Pack config file (NAME.rpack.yaml)
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Override working dir, defaults to the location of the config file
    #[arg(long, short = 'w', value_name = "DIR")]
    pub working_dir: Option<PathBuf>,
}
