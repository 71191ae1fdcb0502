use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "capscan")]
#[command(about = "Catalogue image datasets and their caption sidecars", long_about = None)]
pub struct Cli {
    /// Configuration file to use instead of ./Config.toml
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan folders, save one report per folder and update the run history
    Scan(ScanArgs),
    /// Print the run history
    History,
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Default, Args)]
pub struct ScanArgs {
    /// Folders to scan; falls back to the batch file, then configured roots,
    /// then an interactive prompt
    pub roots: Vec<PathBuf>,

    /// File listing one folder per line
    #[arg(long, short = 'b')]
    pub batch_file: Option<PathBuf>,

    /// Open the run log and saved report after each folder
    #[arg(long)]
    pub open: bool,

    /// Print the first rows of every report section
    #[arg(long)]
    pub preview: bool,
}
