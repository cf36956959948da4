//! **pyrefine** - Fast structural analysis and safe mechanical cleanup for Python sources
//!
//! One tree-sitter parse per file feeds every pass: structure, naming, import order,
//! nesting, function profiles, duplicates, and suggestions. The rewrite pipeline is
//! text-in/text-out and idempotent.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Analysis engine and rewrite pipeline
pub mod core {
    /// Closed node-kind tree shared by every pass
    pub mod syntax;
    pub use syntax::{NodeKind, SourceParser, Span, SyntaxNode};

    /// Issue records and their kinds
    pub mod issue;
    pub use issue::{Issue, IssueKind, Severity};

    /// Identifier shape checks and case conversion
    pub mod naming;

    /// Cyclomatic complexity of function-like nodes
    pub mod complexity;

    /// Import classification and the canonical block order
    pub mod imports;

    /// Raw-text and tree passes that emit issues
    pub mod scanner;

    /// Line-window duplicate detection over raw text
    pub mod duplicates;
    pub use duplicates::DuplicateMatch;

    /// Per-function metadata
    pub mod functions;
    pub use functions::FunctionRecord;

    /// Prioritized refactoring suggestions
    pub mod suggest;
    pub use suggest::{Priority, Suggestion, SuggestionKind};

    /// Per-file orchestration and the failure taxonomy
    pub mod analyze;
    pub use analyze::{Analysis, Failure, FailureKind, analyze_source, run as analyze_run};

    /// Text, table, and JSON rendering with miette diagnostics
    pub mod report;

    /// Idempotent rewrite pipeline
    pub mod rewrite;
    pub use rewrite::{Rewrite, RewriteOutcome, rewrite_source, run as fix_run};

    /// Split plans for large modules
    pub mod split;
    pub use split::{SplitPlan, plan_split, run as split_run};
}

/// Language front-ends lowering concrete trees into `core::syntax`
pub mod parsers {
    /// tree-sitter-python adapter
    pub mod python_parser;
    pub use python_parser::PythonParser;
}

/// Infrastructure - Configuration, I/O, and utilities
pub mod infra {
    /// Configuration management with TOML support
    pub mod config;
    pub use self::config::{AnalysisConfig, Config, FixOptions, init as config_init, load_config};

    /// Memory-mapped file I/O for large files (>1MB threshold) and atomic writes
    pub mod io;
    pub use io::{FileContent, read_file_smart};

    /// CRLF/LF-robust line indexing and line-array editing
    pub mod line_index;
    pub use line_index::{NewlineIndex, PositionIndex, SourceLines};

    /// Gitignore-aware discovery of Python files
    pub mod walk;
    pub use walk::FileWalker;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use self::core::analyze::{run_functions as functions_run, run_suggest as suggest_run};
pub use self::core::{analyze_run, fix_run, split_run};
pub use infra::{AnalysisConfig, Config, FileWalker, FixOptions, load_config};
pub use parsers::PythonParser;

// Core types for external consumers
pub use self::core::{
    Analysis, Failure, FailureKind, FunctionRecord, Issue, IssueKind, Priority, Rewrite,
    RewriteOutcome, Severity, SplitPlan, Suggestion, SuggestionKind, analyze_source, plan_split,
    rewrite_source,
};
