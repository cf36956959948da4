//! Filepath: src/core/syntax.rs
//! Language-neutral syntax tree consumed by every analysis pass.
//!
//! The parser front-end lowers its concrete tree into [`SyntaxNode`]s with a
//! closed [`NodeKind`] set. Passes dispatch with exhaustive `match`es, so a
//! new variant does not compile until each pass decides how to treat it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// 1-based line/column span of a node. Columns count bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Span {
    /// Inclusive line count, never below 1.
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// Function or method definition header data.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub is_async: bool,
    pub parameters: Vec<String>,
    pub docstring: Option<String>,
    pub body: BodyLayout,
    /// First line of the definition including decorators.
    pub outer_start_line: usize,
}

/// Class definition header data.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub docstring: Option<String>,
    pub body: BodyLayout,
    /// First line of the definition including decorators.
    pub outer_start_line: usize,
}

/// Where a definition's header ends and its body begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyLayout {
    /// Line holding the `:` that closes the header.
    pub header_end_line: usize,
    /// Line of the first body statement.
    pub first_statement_line: usize,
    /// 1-based byte column of the first body statement.
    pub first_statement_column: usize,
}

impl BodyLayout {
    /// True when the body starts on its own line below the header.
    pub fn is_block(&self) -> bool {
        self.first_statement_line > self.header_end_line
    }
}

/// An `import x` or `from x import y` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStmt {
    /// Imported module names for `import a, b.c`; empty for the `from` form.
    pub names: Vec<String>,
    /// Module of the `from` form (None for `from . import x`).
    pub module: Option<String>,
    /// Leading dots of a relative import; 0 for absolute imports.
    pub level: usize,
    pub is_from: bool,
}

impl ImportStmt {
    /// The dotted root used for bucket classification.
    pub fn root_module(&self) -> Option<&str> {
        let full = if self.is_from {
            self.module.as_deref()?
        } else {
            self.names.first()?.as_str()
        };
        full.split('.').next()
    }
}

/// Closed set of node kinds the engine understands.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Module,
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
    If,
    While,
    For { is_async: bool },
    Try,
    ExceptHandler,
    With { is_async: bool },
    /// Short-circuit `and`/`or` chain with N operands.
    BoolOp { operands: usize },
    /// Call expression; `callee` is set when the callee is a bare name.
    Call { callee: Option<String> },
    Import(ImportStmt),
    /// Plain or annotated `=` assignment statement.
    Assign,
    /// Identifier written to (assignment, loop, `with ... as`, walrus).
    StoreName(String),
    Lambda,
    /// Any other grammar node; carries the front-end kind for tracing.
    Other(&'static str),
}

/// One node of the lowered tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub span: Span,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    /// Pre-order iterator over this node and all descendants.
    pub fn walk(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    /// 1-based lines whose terminator sits inside a multi-line string literal.
    pub fn string_interior_lines(&self) -> HashSet<usize> {
        self.walk()
            .filter(|n| matches!(n.kind, NodeKind::Other("string")))
            .flat_map(|n| n.span.start_line..n.span.end_line)
            .collect()
    }

    /// True for nodes that open a new scope (def, class, lambda).
    pub fn is_scope(&self) -> bool {
        match &self.kind {
            NodeKind::FunctionDef(_) | NodeKind::ClassDef(_) | NodeKind::Lambda => true,
            NodeKind::Module
            | NodeKind::If
            | NodeKind::While
            | NodeKind::For { .. }
            | NodeKind::Try
            | NodeKind::ExceptHandler
            | NodeKind::With { .. }
            | NodeKind::BoolOp { .. }
            | NodeKind::Call { .. }
            | NodeKind::Import(_)
            | NodeKind::Assign
            | NodeKind::StoreName(_)
            | NodeKind::Other(_) => false,
        }
    }
}

/// Depth-first, source-ordered traversal.
pub struct PreOrder<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Structured syntax error reported by the front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("Syntax error: {message} (line {line}, column {column})")]
pub struct SyntaxFailure {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Front-end contract: raw text in, lowered tree or syntax error out.
pub trait SourceParser: Send + Sync {
    fn parse(&self, source: &str) -> Result<SyntaxNode, ParseFailure>;
}

/// Why a parse produced no tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error(transparent)]
    Syntax(#[from] SyntaxFailure),
    /// The parser could not be configured or gave up without a tree.
    #[error("parser unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(kind: NodeKind, line: usize) -> SyntaxNode {
        SyntaxNode {
            kind,
            span: Span {
                start_line: line,
                start_column: 1,
                end_line: line,
                end_column: 2,
            },
            children: Vec::new(),
        }
    }

    #[test]
    fn walk_is_pre_order() {
        let mut root = leaf(NodeKind::Module, 1);
        let mut branch = leaf(NodeKind::If, 1);
        branch.children.push(leaf(NodeKind::StoreName("a".into()), 2));
        root.children.push(branch);
        root.children.push(leaf(NodeKind::Assign, 3));

        let lines: Vec<usize> = root.walk().map(|n| n.span.start_line).collect();
        assert_eq!(lines, vec![1, 1, 2, 3]);
    }

    #[test]
    fn span_line_count_is_inclusive() {
        let span = Span {
            start_line: 3,
            start_column: 1,
            end_line: 62,
            end_column: 5,
        };
        assert_eq!(span.line_count(), 60);
    }

    #[test]
    fn root_module_uses_first_dotted_segment() {
        let imp = ImportStmt {
            names: vec!["os.path".into()],
            module: None,
            level: 0,
            is_from: false,
        };
        assert_eq!(imp.root_module(), Some("os"));

        let rel = ImportStmt {
            names: Vec::new(),
            module: None,
            level: 1,
            is_from: true,
        };
        assert_eq!(rel.root_module(), None);
    }
}
