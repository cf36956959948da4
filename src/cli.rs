use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "pyrefine")]
#[command(
    about = "Fast structural analysis and safe mechanical cleanup for Python source files"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without executing
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report issues in Python files
    Analyze(AnalyzeArgs),

    /// Profile the functions of one file
    Functions(FileReportArgs),

    /// Show refactoring suggestions for one file
    Suggest(FileReportArgs),

    /// Apply the safe rewrite pipeline
    Fix(FixArgs),

    /// Propose a split of one large file
    Split(SplitArgs),

    /// Initialize a pyrefine.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Table,
}

#[derive(Debug, Parser)]
pub struct AnalyzeArgs {
    /// Files or directories to analyze
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Output JSON (shorthand for --format json)
    #[arg(long)]
    pub json: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Include hidden files and directories when walking
    #[arg(long)]
    pub hidden: bool,
}

impl AnalyzeArgs {
    /// Effective format; `--json` wins over `--format`.
    pub fn format(&self) -> OutputFormat {
        if self.json { OutputFormat::Json } else { self.format }
    }

    pub fn json_output(&self) -> bool {
        self.format() == OutputFormat::Json
    }
}

#[derive(Debug, Args)]
pub struct FileReportArgs {
    /// Python file to inspect
    pub file: PathBuf,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct FixArgs {
    /// Files or directories to rewrite
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Insert placeholder docstrings where they are missing
    #[arg(long)]
    pub add_docstrings: bool,

    /// Add a split advisory comment to files over the size threshold
    #[arg(long)]
    pub annotate_large: bool,

    /// Print a unified diff instead of writing files
    #[arg(long)]
    pub diff: bool,

    /// Include hidden files and directories when walking
    #[arg(long)]
    pub hidden: bool,
}

#[derive(Debug, Parser)]
pub struct SplitArgs {
    /// Python file to plan a split for
    pub file: PathBuf,

    /// Output JSON
    #[arg(long)]
    pub json: bool,

    /// Create the proposed files next to the input (never overwrites)
    #[arg(long)]
    pub write: bool,
}

#[derive(Debug, Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
