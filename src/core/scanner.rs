//! Structural scanner: raw-text checks plus one tree traversal that files
//! findings into per-pass buckets (structure, naming, smells). The import
//! pass runs on the leading import block after the traversal.

use std::collections::HashSet;

use tracing::trace;

use crate::core::imports::ImportBlock;
use crate::core::issue::{Issue, IssueKind, Severity};
use crate::core::naming::{self, NamingViolation};
use crate::core::syntax::{NodeKind, Span, SyntaxNode};
use crate::infra::config::AnalysisConfig;
use crate::infra::line_index::PositionIndex;

/// Analysis sub-pass identifiers, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    Text,
    Structure,
    Naming,
    Imports,
    Smells,
    Functions,
    Suggestions,
}

impl std::fmt::Display for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Pass::Text => "text",
            Pass::Structure => "structure",
            Pass::Naming => "naming",
            Pass::Imports => "imports",
            Pass::Smells => "smells",
            Pass::Functions => "functions",
            Pass::Suggestions => "suggestions",
        };
        f.write_str(s)
    }
}

/// Unexpected condition inside one sub-pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{pass} pass failed at line {line}: {reason}")]
pub struct PassError {
    pub pass: Pass,
    pub line: usize,
    pub reason: String,
}

/// Line length, trailing whitespace, and blank-line runs.
///
/// `string_lines` holds lines inside multi-line string literals. Whitespace
/// there is still reported but is never marked auto-fixable, since the
/// rewrite pipeline leaves string contents alone.
pub fn scan_text(
    pos: &PositionIndex,
    string_lines: &HashSet<usize>,
    cfg: &AnalysisConfig,
) -> Vec<Issue> {
    let lines = pos.lines();
    let mut out = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let n = idx + 1;
        let width = line.chars().count();

        if width > cfg.line_length {
            out.push(
                Issue::new(
                    IssueKind::LineTooLong,
                    Severity::Warning,
                    n,
                    cfg.line_length + 1,
                    format!("Line too long ({width} > {} characters)", cfg.line_length),
                )
                .with_suggestion("Break line into multiple lines")
                .fixable(),
            );
        }

        let trimmed = line.trim_end();
        if trimmed.len() != line.len() {
            let issue = Issue::new(
                IssueKind::TrailingWhitespace,
                Severity::Suggestion,
                n,
                trimmed.chars().count() + 1,
                "Trailing whitespace".to_string(),
            )
            .with_suggestion("Remove trailing whitespace");
            out.push(if string_lines.contains(&n) {
                issue
            } else {
                issue.fixable()
            });
        }

        if idx > 0 && line.trim().is_empty() && lines[idx - 1].trim().is_empty() {
            let issue = Issue::new(
                IssueKind::MultipleBlankLines,
                Severity::Suggestion,
                n,
                1,
                "Multiple consecutive blank lines".to_string(),
            )
            .with_suggestion("Use single blank line");
            let in_string = string_lines.contains(&n) && string_lines.contains(&(n - 1));
            out.push(if in_string { issue } else { issue.fixable() });
        }
    }

    out
}

/// Findings of the tree passes, bucketed by pass.
#[derive(Debug, Default)]
pub struct TreeFindings {
    pub structure: Vec<Issue>,
    pub naming: Vec<Issue>,
    pub imports: Vec<Issue>,
    pub smells: Vec<Issue>,
    /// Set when a pass stopped early; buckets keep what was collected.
    pub failure: Option<PassError>,
}

impl TreeFindings {
    /// Concatenate buckets in reporting order.
    pub fn into_issues(self) -> Vec<Issue> {
        let mut out = self.structure;
        out.extend(self.naming);
        out.extend(self.imports);
        out.extend(self.smells);
        out
    }
}

/// Walk the tree once, then check the import block.
pub fn scan_tree(root: &SyntaxNode, pos: &PositionIndex, cfg: &AnalysisConfig) -> TreeFindings {
    let mut scanner = Scanner {
        cfg,
        found: TreeFindings::default(),
    };

    if let Err(e) = scanner.visit(root, false) {
        scanner.found.failure = Some(e);
        return scanner.found;
    }

    if let Some(block) = ImportBlock::find(root, pos)
        && block.imports.len() > 1
        && !block.is_ordered()
    {
        let mut issue = Issue::new(
            IssueKind::ImportOrder,
            Severity::Suggestion,
            block.first_line,
            1,
            "Imports not ordered according to PEP 8".to_string(),
        )
        .with_suggestion("Organize imports: stdlib, third-party, local");
        issue.auto_fixable = block.splice_safe;
        scanner.found.imports.push(issue);
    }

    scanner.found
}

struct Scanner<'c> {
    cfg: &'c AnalysisConfig,
    found: TreeFindings,
}

impl Scanner<'_> {
    /// `in_anomaly` is true below a node already reported as too deep.
    fn visit(&mut self, node: &SyntaxNode, in_anomaly: bool) -> Result<(), PassError> {
        let mut below_anomaly = in_anomaly;

        match &node.kind {
            NodeKind::FunctionDef(def) => {
                require_name(&def.name, Pass::Structure, node.span)?;
                self.check_function(def, node.span);
            }
            NodeKind::ClassDef(def) => {
                require_name(&def.name, Pass::Structure, node.span)?;
                self.check_class(def, node.span);
            }
            NodeKind::StoreName(name) => {
                if let Some(v) = naming::check_variable_name(name) {
                    self.found
                        .naming
                        .push(naming_issue("Variable", name, &v, node.span));
                }
            }
            NodeKind::If
            | NodeKind::While
            | NodeKind::For { .. }
            | NodeKind::With { .. }
            | NodeKind::Try => {
                if !in_anomaly {
                    let depth = nesting_depth(node);
                    if depth > self.cfg.nesting_depth {
                        trace!(line = node.span.start_line, depth, "deep nesting");
                        self.found.smells.push(
                            Issue::new(
                                IssueKind::DeepNesting,
                                Severity::Warning,
                                node.span.start_line,
                                node.span.start_column,
                                format!("Code nested too deeply (depth: {depth})"),
                            )
                            .with_suggestion("Extract nested logic into functions"),
                        );
                        below_anomaly = true;
                    }
                }
            }
            NodeKind::Module
            | NodeKind::ExceptHandler
            | NodeKind::BoolOp { .. }
            | NodeKind::Call { .. }
            | NodeKind::Import(_)
            | NodeKind::Assign
            | NodeKind::Lambda
            | NodeKind::Other(_) => {}
        }

        for child in &node.children {
            self.visit(child, below_anomaly)?;
        }
        Ok(())
    }

    fn check_function(&mut self, def: &crate::core::syntax::FunctionDef, span: Span) {
        let lines = span.line_count();
        if lines > self.cfg.function_length {
            self.found.structure.push(
                Issue::new(
                    IssueKind::LargeFunction,
                    Severity::Warning,
                    span.start_line,
                    span.start_column,
                    format!("Function '{}' is too long ({lines} lines)", def.name),
                )
                .with_suggestion("Break function into smaller functions"),
            );
        }
        if def.docstring.is_none() {
            self.found
                .structure
                .push(missing_docstring("Function", &def.name, span));
        }
        if let Some(v) = naming::check_function_name(&def.name) {
            self.found
                .naming
                .push(naming_issue("Function", &def.name, &v, span));
        }
        let count = def.parameters.len();
        if count > self.cfg.parameter_count {
            self.found.smells.push(
                Issue::new(
                    IssueKind::LongParameterList,
                    Severity::Warning,
                    span.start_line,
                    span.start_column,
                    format!("Function '{}' has too many parameters ({count})", def.name),
                )
                .with_suggestion("Consider using a dataclass or reducing parameters"),
            );
        }
    }

    fn check_class(&mut self, def: &crate::core::syntax::ClassDef, span: Span) {
        let lines = span.line_count();
        if lines > self.cfg.class_length {
            self.found.structure.push(
                Issue::new(
                    IssueKind::LargeClass,
                    Severity::Warning,
                    span.start_line,
                    span.start_column,
                    format!("Class '{}' is too long ({lines} lines)", def.name),
                )
                .with_suggestion("Consider breaking class into smaller classes"),
            );
        }
        if def.docstring.is_none() {
            self.found
                .structure
                .push(missing_docstring("Class", &def.name, span));
        }
        if let Some(v) = naming::check_class_name(&def.name) {
            self.found
                .naming
                .push(naming_issue("Class", &def.name, &v, span));
        }
    }
}

fn require_name(name: &str, pass: Pass, span: Span) -> Result<(), PassError> {
    if name.is_empty() {
        return Err(PassError {
            pass,
            line: span.start_line,
            reason: "definition without an identifier".to_string(),
        });
    }
    Ok(())
}

fn missing_docstring(what: &str, name: &str, span: Span) -> Issue {
    Issue::new(
        IssueKind::MissingDocstring,
        Severity::Suggestion,
        span.start_line,
        span.start_column,
        format!("{what} '{name}' missing docstring"),
    )
    .with_suggestion("Add descriptive docstring")
    .fixable()
}

/// Naming issues are fixable in principle; the rewriter never renames.
fn naming_issue(what: &str, name: &str, v: &NamingViolation, span: Span) -> Issue {
    Issue::new(
        IssueKind::NamingConvention,
        Severity::Suggestion,
        span.start_line,
        span.start_column,
        format!("{what} '{name}' should use {}", v.expected),
    )
    .with_suggestion(format!("Rename to '{}'", v.rename))
    .fixable()
}

fn is_nesting_construct(node: &SyntaxNode) -> bool {
    match node.kind {
        NodeKind::If
        | NodeKind::While
        | NodeKind::For { .. }
        | NodeKind::With { .. }
        | NodeKind::Try => true,
        NodeKind::Module
        | NodeKind::FunctionDef(_)
        | NodeKind::ClassDef(_)
        | NodeKind::ExceptHandler
        | NodeKind::BoolOp { .. }
        | NodeKind::Call { .. }
        | NodeKind::Import(_)
        | NodeKind::Assign
        | NodeKind::StoreName(_)
        | NodeKind::Lambda
        | NodeKind::Other(_) => false,
    }
}

/// Longest chain of control-flow constructs below `node`, 0 if none.
/// Intermediate nodes (blocks, clauses) are transparent; scopes are not.
pub fn nesting_depth(node: &SyntaxNode) -> usize {
    let mut best = 0;
    let mut stack: Vec<&SyntaxNode> = node.children.iter().collect();
    while let Some(child) = stack.pop() {
        if child.is_scope() {
            continue;
        }
        if is_nesting_construct(child) {
            best = best.max(1 + nesting_depth(child));
        } else {
            stack.extend(child.children.iter());
        }
    }
    best
}
