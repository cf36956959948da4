//! Per-file analysis: raw-text checks, parse, tree passes, function
//! records, and suggestions. Every degraded outcome is returned as data.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::cli::{AnalyzeArgs, AppContext, FileReportArgs};
use crate::core::duplicates::find_duplicates;
use crate::core::functions::{FunctionRecord, profile_functions};
use crate::core::issue::{Issue, IssueKind, Severity};
use crate::core::report;
use crate::core::scanner::{scan_text, scan_tree};
use crate::core::suggest::{Suggestion, generate_suggestions};
use crate::core::syntax::{ParseFailure, SourceParser, SyntaxFailure, SyntaxNode};
use crate::infra::config::{AnalysisConfig, load_config};
use crate::infra::io::read_source;
use crate::infra::line_index::PositionIndex;
use crate::infra::walk::FileWalker;
use crate::parsers::PythonParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SyntaxFailure,
    PartialAnalysisFailure,
    RewriteStageFailure,
}

/// A recoverable failure reported alongside results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    /// Pass or rewrite stage that failed.
    pub stage: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Failure {
    fn syntax(err: &SyntaxFailure) -> Self {
        Self {
            kind: FailureKind::SyntaxFailure,
            stage: "parse".to_string(),
            line: err.line,
            column: err.column,
            message: err.message.clone(),
        }
    }
}

/// Faults that prevent analysis from producing any result.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("parser unavailable: {0}")]
    ParserUnavailable(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub issues: Vec<Issue>,
    pub functions: Vec<FunctionRecord>,
    pub suggestions: Vec<Suggestion>,
    pub failures: Vec<Failure>,
}

impl Analysis {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// The syntax failure that stopped analysis, if any.
    pub fn syntax_failure(&self) -> Option<&Failure> {
        self.failures
            .iter()
            .find(|f| f.kind == FailureKind::SyntaxFailure)
    }
}

/// Analyze `text` with the Python front-end.
pub fn analyze_source(text: &str, cfg: &AnalysisConfig) -> Result<Analysis, EngineError> {
    analyze_with(&PythonParser::new(), text, cfg)
}

#[instrument(level = "debug", skip_all, fields(bytes = text.len()))]
pub fn analyze_with(
    parser: &dyn SourceParser,
    text: &str,
    cfg: &AnalysisConfig,
) -> Result<Analysis, EngineError> {
    let pos = PositionIndex::new(text);
    let parsed = parser.parse(text);
    let string_lines = parsed
        .as_ref()
        .map(SyntaxNode::string_interior_lines)
        .unwrap_or_default();
    let mut analysis = Analysis {
        issues: scan_text(&pos, &string_lines, cfg),
        ..Analysis::default()
    };

    let root = match parsed {
        Ok(root) => root,
        Err(ParseFailure::Syntax(err)) => {
            debug!(line = err.line, column = err.column, "syntax failure");
            analysis.issues.push(Issue::new(
                IssueKind::SyntaxError,
                Severity::Error,
                err.line,
                err.column,
                format!("Syntax error: {}", err.message),
            ));
            analysis.failures.push(Failure::syntax(&err));
            return Ok(analysis);
        }
        Err(ParseFailure::Unavailable(msg)) => return Err(EngineError::ParserUnavailable(msg)),
    };

    let mut findings = scan_tree(&root, &pos, cfg);
    let pass_failure = findings.failure.take();
    analysis.issues.extend(findings.into_issues());
    if let Some(err) = pass_failure {
        debug!(pass = %err.pass, line = err.line, "pass stopped early");
        analysis.issues.push(Issue::new(
            IssueKind::AnalysisError,
            Severity::Error,
            err.line,
            1,
            format!("Analysis failed: {}", err.reason),
        ));
        analysis.failures.push(Failure {
            kind: FailureKind::PartialAnalysisFailure,
            stage: err.pass.to_string(),
            line: err.line,
            column: 1,
            message: err.reason,
        });
    }

    analysis.functions = profile_functions(&root, cfg.isolate_nested_functions);
    let duplicates = find_duplicates(pos.lines(), cfg.duplicate_window, cfg.duplicate_min_run);
    analysis.suggestions =
        generate_suggestions(pos.line_count(), &analysis.functions, &duplicates, cfg);

    debug!(
        issues = analysis.issues.len(),
        functions = analysis.functions.len(),
        suggestions = analysis.suggestions.len(),
        "analysis complete"
    );
    Ok(analysis)
}

/// Analysis of one file on disk, with its source kept for diagnostics.
pub struct FileAnalysis {
    pub path: PathBuf,
    pub source: String,
    pub analysis: Analysis,
}

pub fn analyze_file(path: &Path, cfg: &AnalysisConfig) -> Result<FileAnalysis> {
    let source = read_source(path)?;
    let analysis = analyze_source(&source, cfg)
        .with_context(|| format!("Failed to analyze {}", path.display()))?;
    Ok(FileAnalysis {
        path: path.to_path_buf(),
        source,
        analysis,
    })
}

/// `pyrefine analyze`: exit status 1 when any error-severity issue exists
/// or a file could not be read. Unreadable files are reported and skipped.
pub fn run(args: AnalyzeArgs, ctx: &AppContext) -> Result<ExitCode> {
    // Load configuration with graceful fallback
    let config = load_config().unwrap_or_default();

    let walker = FileWalker::new(&config.ignore_patterns)?.with_include_hidden(args.hidden);
    let files = walker.collect_sources(&args.paths);

    if files.is_empty() {
        if !ctx.quiet {
            println!("No Python files found");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let progress = if ctx.quiet || args.json_output() {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .context("progress template")?
                .progress_chars("#>-"),
        );
        pb
    };

    // Analyze in parallel; collect preserves file order
    let results: Vec<Result<FileAnalysis>> = files
        .par_iter()
        .map(|file| {
            let out = analyze_file(file, &config.analysis);
            progress.inc(1);
            out
        })
        .collect();

    progress.finish_and_clear();

    let mut reports = Vec::with_capacity(results.len());
    let mut unreadable = 0usize;
    for result in results {
        match result {
            Ok(file) => reports.push(file),
            Err(err) => {
                warn!(error = %err, "file skipped");
                report::print_file_error(&err, ctx);
                unreadable += 1;
            }
        }
    }
    report::print_analysis(&reports, args.format(), ctx)?;

    let failed = unreadable > 0 || reports.iter().any(|r| r.analysis.has_errors());
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// `pyrefine functions FILE`
pub fn run_functions(args: FileReportArgs, ctx: &AppContext) -> Result<()> {
    let config = load_config().unwrap_or_default();
    let report = analyze_file(&args.file, &config.analysis)?;
    report::print_functions(&report, args.json, ctx)
}

/// `pyrefine suggest FILE`
pub fn run_suggest(args: FileReportArgs, ctx: &AppContext) -> Result<()> {
    let config = load_config().unwrap_or_default();
    let report = analyze_file(&args.file, &config.analysis)?;
    report::print_suggestions(&report, args.json, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::suggest::{Priority, SuggestionKind};
    use crate::core::syntax::{NodeKind, Span};

    fn cfg() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    #[test]
    fn syntax_failure_keeps_text_issues_only() {
        let src = "x = 1   \ndef broken(:\n    pass\n";
        let a = analyze_source(src, &cfg()).expect("engine");
        let kinds: Vec<IssueKind> = a.issues.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![IssueKind::TrailingWhitespace, IssueKind::SyntaxError]);
        assert_eq!(a.issues[1].severity, Severity::Error);
        assert_eq!(a.issues[1].line, 2);
        assert!(a.functions.is_empty());
        assert!(a.suggestions.is_empty());
        assert_eq!(a.failures.len(), 1);
        assert!(a.has_errors());
        assert!(a.syntax_failure().is_some());
    }

    #[test]
    fn string_whitespace_is_reported_but_left_to_the_author() {
        let src = "s = \"\"\"keep  \n\n\n  this\"\"\"\n";
        let a = analyze_source(src, &cfg()).expect("engine");
        let whitespace: Vec<&Issue> = a
            .issues
            .iter()
            .filter(|i| {
                matches!(
                    i.kind,
                    IssueKind::TrailingWhitespace | IssueKind::MultipleBlankLines
                )
            })
            .collect();
        assert_eq!(whitespace.len(), 2);
        assert!(whitespace.iter().all(|i| !i.auto_fixable));
    }

    #[test]
    fn large_file_gets_one_split_suggestion() {
        let src = "x = 1\n".repeat(501);
        let a = analyze_source(&src, &cfg()).expect("engine");
        let splits: Vec<&Suggestion> = a
            .suggestions
            .iter()
            .filter(|s| s.kind == SuggestionKind::SplitFile)
            .collect();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].priority, Priority::High);
    }

    #[test]
    fn sixty_line_function_scenario() {
        let mut src = String::from("def process(items, flag):\n");
        src.push_str("    \"\"\"Process items.\"\"\"\n");
        src.push_str("    if flag and items:\n");
        src.push_str("        pass\n");
        src.push_str("    for item in items:\n");
        src.push_str("        pass\n");
        for i in 0..53 {
            src.push_str(&format!("    value_{i} = {i}\n"));
        }
        src.push_str("    return None\n");

        let a = analyze_source(&src, &cfg()).expect("engine");
        assert_eq!(a.functions.len(), 1);
        assert_eq!(a.functions[0].line_count, 60);
        assert_eq!(a.functions[0].complexity, 4);
        assert!(a.issues.iter().any(|i| i.kind == IssueKind::LargeFunction));
        assert!(
            !a.suggestions
                .iter()
                .any(|s| s.kind == SuggestionKind::ReduceComplexity)
        );
    }

    #[test]
    fn analysis_is_deterministic() {
        let src = "import sys\nimport os\n\nclass myClass:\n    def doIt(self):\n        a = 1\n        b = 2\n        c = 3\n        a = 1\n        b = 2\n        c = 3\n";
        let first = analyze_source(src, &cfg()).expect("engine");
        let second = analyze_source(src, &cfg()).expect("engine");
        assert_eq!(first, second);
    }

    struct NamelessParser;

    impl SourceParser for NamelessParser {
        fn parse(&self, _source: &str) -> Result<SyntaxNode, ParseFailure> {
            let span = Span {
                start_line: 1,
                start_column: 1,
                end_line: 2,
                end_column: 9,
            };
            let def = crate::core::syntax::ClassDef {
                name: String::new(),
                docstring: None,
                body: crate::core::syntax::BodyLayout {
                    header_end_line: 1,
                    first_statement_line: 2,
                    first_statement_column: 5,
                },
                outer_start_line: 1,
            };
            Ok(SyntaxNode {
                kind: NodeKind::Module,
                span,
                children: vec![SyntaxNode {
                    kind: NodeKind::ClassDef(def),
                    span,
                    children: Vec::new(),
                }],
            })
        }
    }

    #[test]
    fn pass_failure_is_reported_as_data() {
        let a = analyze_with(&NamelessParser, "class :\n    pass\n", &cfg()).expect("engine");
        assert_eq!(a.failures.len(), 1);
        assert_eq!(a.failures[0].kind, FailureKind::PartialAnalysisFailure);
        assert_eq!(a.failures[0].stage, "structure");
        assert_eq!(a.issues.last().map(|i| i.kind), Some(IssueKind::AnalysisError));
    }

    struct BrokenParser;

    impl SourceParser for BrokenParser {
        fn parse(&self, _source: &str) -> Result<SyntaxNode, ParseFailure> {
            Err(ParseFailure::Unavailable("no grammar".into()))
        }
    }

    #[test]
    fn unavailable_parser_is_an_engine_error() {
        assert!(matches!(
            analyze_with(&BrokenParser, "x = 1\n", &cfg()),
            Err(EngineError::ParserUnavailable(_))
        ));
    }
}
