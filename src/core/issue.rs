//! Issue records: single facts about a file, located against the exact
//! text they were computed from.

use serde::{Deserialize, Serialize};

/// Severity levels, most severe first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Suggestion,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Suggestion => write!(f, "suggestion"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    SyntaxError,
    AnalysisError,
    LineTooLong,
    TrailingWhitespace,
    MultipleBlankLines,
    LargeFunction,
    LargeClass,
    MissingDocstring,
    NamingConvention,
    ImportOrder,
    LongParameterList,
    DeepNesting,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::SyntaxError => "syntax_error",
            IssueKind::AnalysisError => "analysis_error",
            IssueKind::LineTooLong => "line_too_long",
            IssueKind::TrailingWhitespace => "trailing_whitespace",
            IssueKind::MultipleBlankLines => "multiple_blank_lines",
            IssueKind::LargeFunction => "large_function",
            IssueKind::LargeClass => "large_class",
            IssueKind::MissingDocstring => "missing_docstring",
            IssueKind::NamingConvention => "naming_convention",
            IssueKind::ImportOrder => "import_order",
            IssueKind::LongParameterList => "long_parameter_list",
            IssueKind::DeepNesting => "deep_nesting",
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected fact about the code. Line and column are 1-based.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub line: usize,
    pub column: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion_text: Option<String>,
    pub auto_fixable: bool,
}

impl Issue {
    pub fn new(
        kind: IssueKind,
        severity: Severity,
        line: usize,
        column: usize,
        message: String,
    ) -> Self {
        Self {
            kind,
            severity,
            line,
            column,
            message,
            suggestion_text: None,
            auto_fixable: false,
        }
    }

    pub fn with_suggestion(mut self, text: impl Into<String>) -> Self {
        self.suggestion_text = Some(text.into());
        self
    }

    pub fn fixable(mut self) -> Self {
        self.auto_fixable = true;
        self
    }
}
