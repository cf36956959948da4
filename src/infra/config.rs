use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Default ignore patterns (in addition to .gitignore)
    pub ignore_patterns: Vec<String>,

    /// Thresholds for the analysis passes
    pub analysis: AnalysisConfig,

    /// Optional rewrite stages
    pub fix: FixOptions,
}

/// Thresholds passed explicitly into every analysis call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig
{
    pub line_length: usize,
    pub function_length: usize,
    pub class_length: usize,
    pub parameter_count: usize,
    pub nesting_depth: usize,
    pub complexity: usize,
    pub file_size: usize,
    pub duplicate_window: usize,
    pub duplicate_min_run: usize,

    /// Classes longer than this get their own file in a split plan
    pub split_class_length: usize,

    /// Stop complexity counting at nested def/class/lambda bodies
    pub isolate_nested_functions: bool,
}

impl Default for AnalysisConfig
{
    fn default() -> Self
    {
        Self {
            line_length: 120,
            function_length: 50,
            class_length: 200,
            parameter_count: 6,
            nesting_depth: 4,
            complexity: 10,
            file_size: 500,
            duplicate_window: 10,
            duplicate_min_run: 3,
            split_class_length: 100,
            isolate_nested_functions: false,
        }
    }
}

/// Opt-in rewrite stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixOptions
{
    pub add_docstrings: bool,
    pub annotate_large_files: bool,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            ignore_patterns: vec![
                "**/.git/**".to_string(),
                "**/.venv/**".to_string(),
                "**/venv/**".to_string(),
                "**/build/**".to_string(),
                "**/dist/**".to_string(),
                "**/__pycache__/**".to_string(),
                "**/.tox/**".to_string(),
            ],
            analysis: AnalysisConfig::default(),
            fix: FixOptions::default(),
        }
    }
}

pub fn load_config() -> Result<Config>
{
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    let config_paths = ["pyrefine.toml", "pyrefine.yaml", "pyrefine.json", ".pyrefine.toml"];

    for path in &config_paths
    {
        if Path::new(path).exists()
        {
            builder = builder.add_source(config::File::with_name(path));
            break;
        }
    }

    // Add environment variables with PYREFINE_ prefix
    // e.g. PYREFINE_ANALYSIS__LINE_LENGTH=100
    builder = builder.add_source(
        config::Environment::with_prefix("PYREFINE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join("pyrefine.toml");

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    if ctx.dry_run
    {
        println!("{toml_string}");
        return Ok(());
    }

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn defaults_match_documented_thresholds()
    {
        let cfg = AnalysisConfig::default();
        assert_eq!(cfg.line_length, 120);
        assert_eq!(cfg.function_length, 50);
        assert_eq!(cfg.class_length, 200);
        assert_eq!(cfg.parameter_count, 6);
        assert_eq!(cfg.nesting_depth, 4);
        assert_eq!(cfg.complexity, 10);
        assert_eq!(cfg.file_size, 500);
        assert_eq!(cfg.duplicate_window, 10);
        assert_eq!(cfg.duplicate_min_run, 3);
        assert!(!cfg.isolate_nested_functions);
        assert_eq!(FixOptions::default(), FixOptions {
            add_docstrings: false,
            annotate_large_files: false
        });
    }

    #[test]
    fn partial_toml_fills_missing_fields()
    {
        let cfg: Config = toml::from_str("[analysis]\nline_length = 88\n").expect("toml");
        assert_eq!(cfg.analysis.line_length, 88);
        assert_eq!(cfg.analysis.function_length, 50);
        assert!(!cfg.fix.add_docstrings);
    }

    #[test]
    fn init_writes_and_refuses_overwrite() -> Result<()>
    {
        let dir = tempfile::TempDir::new()?;
        let ctx = AppContext { quiet: true, no_color: true, dry_run: false };
        init(InitArgs { path: dir.path().to_path_buf(), force: false }, &ctx)?;

        let written = std::fs::read_to_string(dir.path().join("pyrefine.toml"))?;
        let parsed: Config = toml::from_str(&written)?;
        assert_eq!(parsed.analysis, AnalysisConfig::default());

        let again = init(InitArgs { path: dir.path().to_path_buf(), force: false }, &ctx);
        assert!(again.is_err());
        Ok(())
    }
}
