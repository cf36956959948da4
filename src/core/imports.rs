//! Import classification and ordering.
//!
//! Imports fall into three ordered buckets (standard library, third party,
//! local). The canonical block lists each bucket sorted and de-duplicated by
//! literal statement text, with one blank line between non-empty buckets.
//! Detector and fixer share the block definition below so anything flagged
//! is exactly what the fixer rewrites.

use itertools::Itertools;

use crate::core::syntax::{ImportStmt, NodeKind, SyntaxNode};
use crate::infra::line_index::PositionIndex;

/// Top-level module names treated as standard library. Sorted.
const STDLIB_MODULES: &[&str] = &[
    "__future__",
    "abc",
    "argparse",
    "array",
    "ast",
    "asyncio",
    "base64",
    "bisect",
    "builtins",
    "calendar",
    "collections",
    "concurrent",
    "configparser",
    "contextlib",
    "contextvars",
    "copy",
    "csv",
    "ctypes",
    "dataclasses",
    "datetime",
    "decimal",
    "difflib",
    "email",
    "enum",
    "errno",
    "fnmatch",
    "fractions",
    "functools",
    "gc",
    "getpass",
    "glob",
    "gzip",
    "hashlib",
    "heapq",
    "hmac",
    "html",
    "http",
    "importlib",
    "inspect",
    "io",
    "ipaddress",
    "itertools",
    "json",
    "logging",
    "math",
    "mimetypes",
    "multiprocessing",
    "operator",
    "os",
    "pathlib",
    "pickle",
    "platform",
    "pprint",
    "queue",
    "random",
    "re",
    "secrets",
    "select",
    "shlex",
    "shutil",
    "signal",
    "socket",
    "sqlite3",
    "ssl",
    "stat",
    "statistics",
    "string",
    "struct",
    "subprocess",
    "sys",
    "tempfile",
    "textwrap",
    "threading",
    "time",
    "timeit",
    "traceback",
    "types",
    "typing",
    "unittest",
    "urllib",
    "uuid",
    "warnings",
    "weakref",
    "xml",
    "zipfile",
    "zlib",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImportBucket {
    Stdlib,
    ThirdParty,
    Local,
}

pub fn is_stdlib_module(root: &str) -> bool {
    STDLIB_MODULES.binary_search(&root).is_ok()
}

pub fn classify(stmt: &ImportStmt) -> ImportBucket {
    if stmt.level > 0 {
        return ImportBucket::Local;
    }
    match stmt.root_module() {
        Some(root) if is_stdlib_module(root) => ImportBucket::Stdlib,
        Some(_) => ImportBucket::ThirdParty,
        None => ImportBucket::Local,
    }
}

/// One import statement of the leading block, keyed by its literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportLine {
    pub bucket: ImportBucket,
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// The leading import block of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBlock {
    pub imports: Vec<ImportLine>,
    pub first_line: usize,
    pub last_line: usize,
    /// False when a statement shares a line with an import, which makes
    /// line-level splicing unsafe.
    pub splice_safe: bool,
}

impl ImportBlock {
    /// Locate the block: the first top-level import plus every following
    /// top-level import separated from it only by blank lines.
    pub fn find(root: &SyntaxNode, pos: &PositionIndex) -> Option<ImportBlock> {
        let stmts = &root.children;
        let first = stmts
            .iter()
            .position(|s| matches!(s.kind, NodeKind::Import(_)))?;

        let mut splice_safe =
            first == 0 || stmts[first - 1].span.end_line < stmts[first].span.start_line;
        let mut imports: Vec<ImportLine> = Vec::new();
        let mut last_end = 0usize;

        for stmt in &stmts[first..] {
            match &stmt.kind {
                NodeKind::Import(imp) => {
                    if !imports.is_empty() {
                        if stmt.span.start_line <= last_end {
                            splice_safe = false;
                            break;
                        }
                        if !only_blank_between(pos, last_end, stmt.span.start_line) {
                            break;
                        }
                    }
                    let text = pos
                        .text_of_lines(stmt.span.start_line, stmt.span.end_line)
                        .unwrap_or("")
                        .to_string();
                    imports.push(ImportLine {
                        bucket: classify(imp),
                        text,
                        start_line: stmt.span.start_line,
                        end_line: stmt.span.end_line,
                    });
                    last_end = stmt.span.end_line;
                }
                // Trailing comment on the import's own line stays with it.
                NodeKind::Other("comment") if stmt.span.start_line == last_end => continue,
                NodeKind::Module
                | NodeKind::FunctionDef(_)
                | NodeKind::ClassDef(_)
                | NodeKind::If
                | NodeKind::While
                | NodeKind::For { .. }
                | NodeKind::Try
                | NodeKind::ExceptHandler
                | NodeKind::With { .. }
                | NodeKind::BoolOp { .. }
                | NodeKind::Call { .. }
                | NodeKind::Assign
                | NodeKind::StoreName(_)
                | NodeKind::Lambda
                | NodeKind::Other(_) => {
                    if stmt.span.start_line <= last_end {
                        splice_safe = false;
                    }
                    break;
                }
            }
        }

        let first_line = imports.first()?.start_line;
        Some(ImportBlock {
            first_line,
            last_line: last_end,
            imports,
            splice_safe,
        })
    }

    /// Statement texts in file order.
    pub fn actual_order(&self) -> Vec<&str> {
        self.imports.iter().map(|i| i.text.as_str()).collect()
    }

    /// Bucket-then-lexicographic order, de-duplicated.
    pub fn expected_order(&self) -> Vec<&str> {
        self.canonical_groups().into_iter().flatten().collect()
    }

    pub fn is_ordered(&self) -> bool {
        self.actual_order() == self.expected_order()
    }

    fn canonical_groups(&self) -> Vec<Vec<&str>> {
        [ImportBucket::Stdlib, ImportBucket::ThirdParty, ImportBucket::Local]
            .into_iter()
            .map(|bucket| {
                self.imports
                    .iter()
                    .filter(|i| i.bucket == bucket)
                    .map(|i| i.text.as_str())
                    .sorted()
                    .dedup()
                    .collect::<Vec<_>>()
            })
            .filter(|group| !group.is_empty())
            .collect()
    }

    /// Canonical replacement lines for the block's line range.
    pub fn canonical_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (i, group) in self.canonical_groups().into_iter().enumerate() {
            if i > 0 {
                out.push(String::new());
            }
            for text in group {
                out.extend(text.lines().map(str::to_string));
            }
        }
        out
    }
}

fn only_blank_between(pos: &PositionIndex, after_line: usize, before_line: usize) -> bool {
    (after_line + 1..before_line).all(|n| pos.line(n).is_none_or(|l| l.trim().is_empty()))
}
