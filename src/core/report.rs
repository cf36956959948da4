//! Terminal rendering for analysis results: text, table, or JSON.

use std::path::Path;

use anyhow::{Context, Result};
use miette::{Diagnostic, NamedSource, SourceSpan};
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::cli::{AppContext, OutputFormat};
use crate::core::analyze::{Failure, FileAnalysis};
use crate::core::issue::{Issue, Severity};
use crate::core::suggest::Priority;
use crate::infra::line_index::NewlineIndex;

/// Syntax error rendered with the offending source line.
#[derive(Debug, Diagnostic, thiserror::Error)]
#[error("Syntax error in {path}: {message}")]
#[diagnostic(code(pyrefine::syntax))]
pub struct SyntaxDiagnostic {
    pub path: String,
    pub message: String,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("parser stopped here")]
    pub span: SourceSpan,

    #[help]
    pub help: String,
}

impl SyntaxDiagnostic {
    pub fn new(path: &Path, source: &str, failure: &Failure) -> Self {
        let name = path.display().to_string();
        Self {
            path: name.clone(),
            message: failure.message.clone(),
            span: span_at(source, failure.line, failure.column),
            src: NamedSource::new(name, source.to_string()),
            help: "Only raw-text checks ran; fix the syntax error to enable the other passes"
                .to_string(),
        }
    }
}

/// One-byte span at a 1-based line/column, clamped to the text.
fn span_at(source: &str, line: usize, column: usize) -> SourceSpan {
    let idx = NewlineIndex::build(source.as_bytes());
    let offset = idx
        .start_byte_of_line(line)
        .map(|start| start + column.saturating_sub(1))
        .unwrap_or(source.len())
        .min(source.len());
    let len = usize::from(offset < source.len());
    (offset, len).into()
}

/// A file that could not be processed; the rest of the batch carries on.
pub fn print_file_error(err: &anyhow::Error, ctx: &AppContext) {
    if ctx.no_color {
        eprintln!("error: {err:#}");
    } else {
        eprintln!("{} {err:#}", "error:".red().bold());
    }
}

fn severity_label(sev: Severity, no_color: bool) -> String {
    let text = sev.to_string();
    if no_color {
        return text;
    }
    match sev {
        Severity::Error => text.red().bold().to_string(),
        Severity::Warning => text.yellow().to_string(),
        Severity::Suggestion => text.cyan().to_string(),
    }
}

fn priority_label(p: Priority, no_color: bool) -> String {
    let text = p.to_string();
    if no_color {
        return text;
    }
    match p {
        Priority::High => text.red().to_string(),
        Priority::Medium => text.yellow().to_string(),
        Priority::Low => text.dimmed().to_string(),
    }
}

#[derive(Serialize)]
struct FileJson<'a> {
    path: String,
    issues: &'a [Issue],
    failures: &'a [Failure],
}

#[derive(Tabled)]
struct IssueRow {
    file: String,
    line: usize,
    column: usize,
    severity: String,
    kind: String,
    message: String,
}

pub fn print_analysis(
    reports: &[FileAnalysis],
    format: OutputFormat,
    ctx: &AppContext,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let files: Vec<FileJson> = reports
                .iter()
                .map(|r| FileJson {
                    path: r.path.display().to_string(),
                    issues: &r.analysis.issues,
                    failures: &r.analysis.failures,
                })
                .collect();
            let json = serde_json::to_string_pretty(&files).context("serialize issues")?;
            println!("{json}");
        }
        OutputFormat::Table => {
            let rows: Vec<IssueRow> = reports
                .iter()
                .flat_map(|r| {
                    r.analysis.issues.iter().map(move |i| IssueRow {
                        file: r.path.display().to_string(),
                        line: i.line,
                        column: i.column,
                        severity: i.severity.to_string(),
                        kind: i.kind.to_string(),
                        message: i.message.clone(),
                    })
                })
                .collect();
            if !rows.is_empty() {
                println!("{}", Table::new(rows));
            }
            print_summary(reports, ctx);
        }
        OutputFormat::Text => {
            for r in reports {
                print_file_text(r, ctx);
            }
            print_summary(reports, ctx);
        }
    }
    Ok(())
}

fn print_file_text(report: &FileAnalysis, ctx: &AppContext) {
    if report.analysis.issues.is_empty() {
        return;
    }

    let header = report.path.display().to_string();
    if ctx.no_color {
        println!("{header}");
    } else {
        println!("{}", header.bold());
    }

    if let Some(failure) = report.analysis.syntax_failure() {
        let diag = SyntaxDiagnostic::new(&report.path, &report.source, failure);
        eprintln!("{:?}", miette::Report::new(diag));
    }

    for issue in &report.analysis.issues {
        println!(
            "  {}:{} {} [{}] {}",
            issue.line,
            issue.column,
            severity_label(issue.severity, ctx.no_color),
            issue.kind,
            issue.message
        );
        if let Some(hint) = &issue.suggestion_text {
            println!("      → {hint}");
        }
    }
}

fn print_summary(reports: &[FileAnalysis], ctx: &AppContext) {
    if ctx.quiet {
        return;
    }
    let issues: usize = reports.iter().map(|r| r.analysis.issues.len()).sum();
    let fixable: usize = reports
        .iter()
        .flat_map(|r| &r.analysis.issues)
        .filter(|i| i.auto_fixable)
        .count();
    let line = format!(
        "{} files analyzed, {issues} issues ({fixable} auto-fixable)",
        reports.len()
    );
    if ctx.no_color || issues > 0 {
        println!("{line}");
    } else {
        println!("{} {line}", "✓".green());
    }
}

#[derive(Tabled)]
struct FunctionRow {
    name: String,
    lines: String,
    length: usize,
    complexity: usize,
    params: usize,
    method: bool,
    docstring: bool,
}

pub fn print_functions(report: &FileAnalysis, json: bool, ctx: &AppContext) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(&report.analysis.functions)
            .context("serialize functions")?;
        println!("{out}");
        return Ok(());
    }

    if let Some(failure) = report.analysis.syntax_failure() {
        let diag = SyntaxDiagnostic::new(&report.path, &report.source, failure);
        eprintln!("{:?}", miette::Report::new(diag));
        return Ok(());
    }

    let rows: Vec<FunctionRow> = report
        .analysis
        .functions
        .iter()
        .map(|f| FunctionRow {
            name: f.name.clone(),
            lines: format!("{}-{}", f.start_line, f.end_line),
            length: f.line_count,
            complexity: f.complexity,
            params: f.parameter_names.len(),
            method: f.is_method,
            docstring: f.docstring.is_some(),
        })
        .collect();

    if rows.is_empty() {
        if !ctx.quiet {
            println!("No functions found in {}", report.path.display());
        }
    } else {
        println!("{}", Table::new(rows));
    }
    Ok(())
}

pub fn print_suggestions(report: &FileAnalysis, json: bool, ctx: &AppContext) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(&report.analysis.suggestions)
            .context("serialize suggestions")?;
        println!("{out}");
        return Ok(());
    }

    if report.analysis.suggestions.is_empty() {
        if !ctx.quiet {
            println!("No suggestions for {}", report.path.display());
        }
        return Ok(());
    }

    for s in &report.analysis.suggestions {
        let auto = if s.auto_applicable { " (auto)" } else { "" };
        println!(
            "{:>5} {} [{}]{} {}",
            s.line,
            priority_label(s.priority, ctx.no_color),
            s.kind,
            auto,
            s.message
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analyze::FailureKind;

    #[test]
    fn span_points_at_reported_column() {
        let src = "x = 1\ndef f(:\n";
        let span = span_at(src, 2, 7);
        assert_eq!(span.offset(), 12);
        assert_eq!(span.len(), 1);
    }

    #[test]
    fn span_is_clamped_past_end() {
        let span = span_at("x\n", 9, 1);
        assert_eq!(span.offset(), 2);
        assert_eq!(span.len(), 0);
    }

    #[test]
    fn diagnostic_carries_path_and_message() {
        let failure = Failure {
            kind: FailureKind::SyntaxFailure,
            stage: "parse".into(),
            line: 1,
            column: 1,
            message: "invalid syntax".into(),
        };
        let diag = SyntaxDiagnostic::new(Path::new("m.py"), "(\n", &failure);
        assert_eq!(diag.to_string(), "Syntax error in m.py: invalid syntax");
    }
}
