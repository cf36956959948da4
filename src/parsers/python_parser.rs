//! Filepath: src/parsers/python_parser.rs
//! ------------------------------------------------------------------
//! Python front-end built on Tree-sitter 0.25.x.
//! Goals:
//!   - Lower the concrete tree into the closed `NodeKind` set.
//!   - Resolve store context (assignment targets) while lowering.
//!   - Extract PEP 257 docstrings (first statement string).
//!   - Report the first ERROR/MISSING node as a syntax failure.
//!
//! Notes:
//!   - We always pass the same byte slice that Parser parsed.
//!   - Docstrings support single/triple quotes and common
//!     prefixes (r, u). f-strings and bytes are not docstrings.
//!     Concatenated string docstrings are joined segment-wise.
//!   - `elif` clauses become `If` children of their `if`.
//! ------------------------------------------------------------------

use tree_sitter::{Language, Node, Parser};

use crate::core::syntax::{
    BodyLayout, ClassDef, FunctionDef, ImportStmt, NodeKind, ParseFailure, SourceParser, Span,
    SyntaxFailure, SyntaxNode,
};

/// Parses Python source into the engine's syntax tree.
pub struct PythonParser {
    /// Python language handle for Tree-sitter.
    language: Language,
}

impl PythonParser {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }
}

impl Default for PythonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser for PythonParser {
    fn parse(&self, source: &str) -> Result<SyntaxNode, ParseFailure> {
        // Create a parser instance and set the language.
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| ParseFailure::Unavailable(format!("set Python language: {e}")))?;

        // Parse the source; fail if no tree is produced.
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ParseFailure::Unavailable("parser returned no tree".to_string()))?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(first_error(root).into());
        }

        let lowering = Lowering {
            src: source,
            bytes: source.as_bytes(),
        };
        Ok(lowering.lower(root, false))
    }
}

/// Locate the first ERROR or MISSING node in source order.
fn first_error(root: Node) -> SyntaxFailure {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            let message = if node.is_missing() {
                format!("missing '{}'", node.kind())
            } else {
                "invalid syntax".to_string()
            };
            return SyntaxFailure {
                line: pos.row + 1,
                column: pos.column + 1,
                message,
            };
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let kids: Vec<Node> = node.children(&mut cursor).collect();
            stack.extend(kids.into_iter().rev());
        }
    }
    SyntaxFailure {
        line: 1,
        column: 1,
        message: "invalid syntax".to_string(),
    }
}

/// Convert tree-sitter points into a 1-based span. A node that ends at
/// column 0 of a later row ends on the previous line.
fn span_of(node: Node) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    let (end_line, end_column) = if end.column == 0 && end.row > start.row {
        (end.row, 1)
    } else {
        (end.row + 1, end.column + 1)
    };
    Span {
        start_line: start.row + 1,
        start_column: start.column + 1,
        end_line,
        end_column,
    }
}

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == token);
    found
}

struct Lowering<'s> {
    src: &'s str,
    bytes: &'s [u8],
}

impl<'s> Lowering<'s> {
    fn text(&self, node: Node) -> &'s str {
        self.src.get(node.byte_range()).unwrap_or("")
    }

    /// Lower `node`; `store` marks identifiers as written-to.
    fn lower(&self, node: Node, store: bool) -> SyntaxNode {
        let span = span_of(node);
        match node.kind() {
            "module" => self.node(NodeKind::Module, span, self.lower_children(node, None)),
            "function_definition" => {
                let def = self.function_def(node);
                self.node(NodeKind::FunctionDef(def), span, self.lower_children(node, None))
            }
            "class_definition" => {
                let def = self.class_def(node);
                self.node(NodeKind::ClassDef(def), span, self.lower_children(node, None))
            }
            "if_statement" | "elif_clause" => {
                self.node(NodeKind::If, span, self.lower_children(node, None))
            }
            "while_statement" => self.node(NodeKind::While, span, self.lower_children(node, None)),
            "for_statement" => {
                let is_async = has_token(node, "async");
                let target = node.child_by_field_name("left").map(|n| n.id());
                self.node(NodeKind::For { is_async }, span, self.lower_children(node, target))
            }
            "try_statement" => self.node(NodeKind::Try, span, self.lower_children(node, None)),
            "except_clause" | "except_group_clause" => {
                self.node(NodeKind::ExceptHandler, span, self.lower_children(node, None))
            }
            "with_statement" => {
                let is_async = has_token(node, "async");
                self.node(NodeKind::With { is_async }, span, self.lower_children(node, None))
            }
            "with_item" => {
                // `with open(p) as fh:` keeps the alias under an as_pattern.
                let children = named_children(node)
                    .into_iter()
                    .map(|c| {
                        if c.kind() == "as_pattern" {
                            let alias = c.child_by_field_name("alias").map(|n| n.id());
                            self.node(
                                NodeKind::Other("as_pattern"),
                                span_of(c),
                                self.lower_children(c, alias),
                            )
                        } else {
                            self.lower(c, false)
                        }
                    })
                    .collect();
                self.node(NodeKind::Other("with_item"), span, children)
            }
            "boolean_operator" => self.bool_op(node, span),
            "call" => {
                let callee = node
                    .child_by_field_name("function")
                    .filter(|f| f.kind() == "identifier")
                    .map(|f| self.text(f).to_string());
                self.node(NodeKind::Call { callee }, span, self.lower_children(node, None))
            }
            "import_statement" => {
                let mut cursor = node.walk();
                let names = node
                    .children_by_field_name("name", &mut cursor)
                    .map(|n| self.dotted_name_of(n))
                    .collect();
                let stmt = ImportStmt {
                    names,
                    module: None,
                    level: 0,
                    is_from: false,
                };
                self.node(NodeKind::Import(stmt), span, Vec::new())
            }
            "import_from_statement" => {
                let stmt = self.import_from(node);
                self.node(NodeKind::Import(stmt), span, Vec::new())
            }
            "future_import_statement" => {
                let stmt = ImportStmt {
                    names: Vec::new(),
                    module: Some("__future__".to_string()),
                    level: 0,
                    is_from: true,
                };
                self.node(NodeKind::Import(stmt), span, Vec::new())
            }
            "expression_statement" => {
                // Hoist a lone assignment so statement-level spans line up.
                let kids = named_children(node);
                match kids.as_slice() {
                    [only] if only.kind() == "assignment" => {
                        let mut assign = self.lower(*only, false);
                        assign.span = span;
                        assign
                    }
                    _ => self.node(
                        NodeKind::Other("expression_statement"),
                        span,
                        kids.into_iter().map(|c| self.lower(c, false)).collect(),
                    ),
                }
            }
            "assignment" => {
                let target = node.child_by_field_name("left").map(|n| n.id());
                self.node(NodeKind::Assign, span, self.lower_children(node, target))
            }
            "augmented_assignment" | "for_in_clause" => {
                let target = node.child_by_field_name("left").map(|n| n.id());
                let kind = if node.kind() == "for_in_clause" {
                    "for_in_clause"
                } else {
                    "augmented_assignment"
                };
                self.node(NodeKind::Other(kind), span, self.lower_children(node, target))
            }
            "named_expression" => {
                let target = node.child_by_field_name("name").map(|n| n.id());
                self.node(
                    NodeKind::Other("named_expression"),
                    span,
                    self.lower_children(node, target),
                )
            }
            "lambda" => self.node(NodeKind::Lambda, span, self.lower_children(node, None)),
            "identifier" if store => {
                self.node(NodeKind::StoreName(self.text(node).to_string()), span, Vec::new())
            }
            // Destructuring targets pass the store context through.
            "pattern_list" | "tuple_pattern" | "list_pattern" | "list_splat_pattern"
            | "parenthesized_expression" | "tuple" | "list" | "expression_list"
            | "as_pattern_target"
                if store =>
            {
                let children = named_children(node)
                    .into_iter()
                    .map(|c| self.lower(c, true))
                    .collect();
                self.node(NodeKind::Other(node.kind()), span, children)
            }
            other => self.node(NodeKind::Other(other), span, self.lower_children(node, None)),
        }
    }

    fn node(&self, kind: NodeKind, span: Span, children: Vec<SyntaxNode>) -> SyntaxNode {
        SyntaxNode {
            kind,
            span,
            children,
        }
    }

    /// Lower all named children; the child whose id equals `store_id`
    /// is lowered in store context.
    fn lower_children(&self, node: Node, store_id: Option<usize>) -> Vec<SyntaxNode> {
        named_children(node)
            .into_iter()
            .map(|c| self.lower(c, Some(c.id()) == store_id))
            .collect()
    }

    /// Flatten a same-operator chain (`a and b and c`) into one N-ary node.
    fn bool_op(&self, node: Node, span: Span) -> SyntaxNode {
        let op = node
            .child_by_field_name("operator")
            .map(|o| o.kind())
            .unwrap_or("");
        let mut operands = Vec::new();
        self.collect_operands(node, op, &mut operands);
        let children: Vec<SyntaxNode> = operands
            .into_iter()
            .map(|c| self.lower(c, false))
            .collect();
        self.node(
            NodeKind::BoolOp {
                operands: children.len(),
            },
            span,
            children,
        )
    }

    fn collect_operands<'t>(&self, node: Node<'t>, op: &str, out: &mut Vec<Node<'t>>) {
        for side in ["left", "right"] {
            let Some(child) = node.child_by_field_name(side) else {
                continue;
            };
            let same_op = child.kind() == "boolean_operator"
                && child.child_by_field_name("operator").map(|o| o.kind()) == Some(op);
            if same_op {
                self.collect_operands(child, op, out);
            } else {
                out.push(child);
            }
        }
    }

    fn function_def(&self, node: Node) -> FunctionDef {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let parameters = node
            .child_by_field_name("parameters")
            .map(|p| self.parameter_names(p))
            .unwrap_or_default();
        FunctionDef {
            name,
            is_async: has_token(node, "async"),
            parameters,
            docstring: python_docstring_extract(node, self.bytes),
            body: body_layout(node),
            outer_start_line: outer_start_line(node),
        }
    }

    fn class_def(&self, node: Node) -> ClassDef {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        ClassDef {
            name,
            docstring: python_docstring_extract(node, self.bytes),
            body: body_layout(node),
            outer_start_line: outer_start_line(node),
        }
    }

    /// Every named parameter in order; splats and bare separators skipped.
    fn parameter_names(&self, params: Node) -> Vec<String> {
        let mut out = Vec::new();
        for p in named_children(params) {
            let ident = match p.kind() {
                "identifier" => Some(p),
                "typed_parameter" => p.named_child(0).filter(|c| c.kind() == "identifier"),
                "default_parameter" | "typed_default_parameter" => p
                    .child_by_field_name("name")
                    .filter(|c| c.kind() == "identifier"),
                _ => None,
            };
            if let Some(ident) = ident {
                out.push(self.text(ident).to_string());
            }
        }
        out
    }

    fn dotted_name_of(&self, node: Node) -> String {
        // `import a.b as c` nests the dotted name under aliased_import.
        let target = if node.kind() == "aliased_import" {
            node.child_by_field_name("name").unwrap_or(node)
        } else {
            node
        };
        self.text(target).to_string()
    }

    fn import_from(&self, node: Node) -> ImportStmt {
        let (module, level) = match node.child_by_field_name("module_name") {
            Some(m) if m.kind() == "relative_import" => {
                let mut level = 0;
                let mut module = None;
                for c in named_children(m) {
                    match c.kind() {
                        "import_prefix" => {
                            level = self.text(c).chars().filter(|ch| *ch == '.').count()
                        }
                        "dotted_name" => module = Some(self.text(c).to_string()),
                        _ => {}
                    }
                }
                (module, level)
            }
            Some(m) => (Some(self.text(m).to_string()), 0),
            None => (None, 0),
        };
        ImportStmt {
            names: Vec::new(),
            module,
            level,
            is_from: true,
        }
    }
}

/// First line of a definition, including a wrapping decorator list.
fn outer_start_line(node: Node) -> usize {
    match node.parent() {
        Some(p) if p.kind() == "decorated_definition" => p.start_position().row + 1,
        _ => node.start_position().row + 1,
    }
}

/// Locate the header-closing `:` and the first body statement.
fn body_layout(node: Node) -> BodyLayout {
    let mut cursor = node.walk();
    let colon = node
        .children(&mut cursor)
        .filter(|c| c.kind() == ":")
        .last()
        .map(|c| c.start_position())
        .unwrap_or_else(|| node.start_position());

    let first = node
        .child_by_field_name("body")
        .and_then(|body| {
            named_children(body)
                .into_iter()
                .find(|c| c.kind() != "comment")
                .or(Some(body))
        })
        .map(|n| n.start_position())
        .unwrap_or(colon);

    BodyLayout {
        header_end_line: colon.row + 1,
        first_statement_line: first.row + 1,
        first_statement_column: first.column + 1,
    }
}

/// Extract a PEP 257 docstring from a function/class:
/// first statement in the body must be a string literal.
/// Supports single/triple quotes, r/u prefixes, and
/// concatenated string sequences.
fn python_docstring_extract(node: Node, bytes: &[u8]) -> Option<String> {
    // Obtain the block/suite node that contains statements.
    let body = node.child_by_field_name("body")?;

    // Grab the first *named* statement, skipping comments.
    let first_stmt = named_children(body)
        .into_iter()
        .find(|c| c.kind() != "comment")?;
    if first_stmt.kind() != "expression_statement" {
        return None;
    }

    // The first expression should be a string literal or a
    // concatenated_string (implicit adjacent literal concat).
    let lit = first_stmt.named_child(0)?;
    match lit.kind() {
        "string" => docstring_segment(lit, bytes),
        "concatenated_string" => {
            // Join each string segment after unquoting.
            let mut acc = String::new();
            for seg in named_children(lit) {
                if seg.kind() != "string" {
                    return None;
                }
                acc.push_str(&docstring_segment(seg, bytes)?);
            }
            Some(acc)
        }
        _ => None,
    }
}

/// Unquote one string literal, rejecting f-strings and bytes.
fn docstring_segment(lit: Node, bytes: &[u8]) -> Option<String> {
    let raw = lit.utf8_text(bytes).ok()?;
    let prefix = &raw[..leading_alpha_len(raw)];
    if prefix.chars().any(|c| matches!(c, 'f' | 'F' | 'b' | 'B')) {
        return None;
    }
    Some(unquote_python_string(raw))
}

/// Strip Python string prefixes/quotes and perform a light
/// unescape plus dedent for triple-quoted strings.
fn unquote_python_string(s: &str) -> String {
    // Trim leading/trailing whitespace around the literal.
    let ss = s.trim();

    // Compute prefix length (r, u; case-insensitive).
    let pref_len = leading_alpha_len(ss);
    let (prefix, rest) = ss.split_at(pref_len);

    // Determine if raw (contains 'r' or 'R').
    let is_raw = prefix.chars().any(|c| c == 'r' || c == 'R');

    // Handle triple quotes first.
    if rest.len() >= 6 {
        for q in [r#"""""#, "'''"] {
            if rest.starts_with(q) && rest.ends_with(q) {
                return dedent_and_unescape(&rest[3..rest.len() - 3], is_raw);
            }
        }
    }

    // Handle single-quoted strings.
    if rest.len() >= 2
        && ((rest.starts_with('"') && rest.ends_with('"'))
            || (rest.starts_with('\'') && rest.ends_with('\'')))
    {
        return basic_unescape(&rest[1..rest.len() - 1], is_raw);
    }

    // Fallback: return as-is.
    rest.to_string()
}

/// Return the count of leading ASCII alphabetic chars.
/// Used to slice off string literal prefixes.
fn leading_alpha_len(s: &str) -> usize {
    s.chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .map(char::len_utf8)
        .sum()
}

/// Dedent triple-quoted content and unescape if not raw.
/// Also strips a single leading/trailing blank line.
fn dedent_and_unescape(s: &str, is_raw: bool) -> String {
    // Split into lines and drop symmetric blank edges.
    let mut lines: Vec<&str> = s.lines().collect();
    if lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    // Common leading spaces across non-empty lines.
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.chars().take_while(|c| *c == ' ').count())
        .min()
        .unwrap_or(0);

    let out = lines
        .iter()
        .map(|l| if l.len() >= indent { &l[indent..] } else { l.trim_start() })
        .collect::<Vec<_>>()
        .join("\n");

    basic_unescape(&out, is_raw)
}

/// Minimal unescape for common sequences when not raw.
/// Intended for docstrings, not general Python parsing.
fn basic_unescape(s: &str, is_raw: bool) -> String {
    if is_raw {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut it = s.chars();
    while let Some(c) = it.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match it.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(n) => {
                out.push('\\');
                out.push(n);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> SyntaxNode {
        PythonParser::new().parse(src).expect("parse")
    }

    fn functions(root: &SyntaxNode) -> Vec<&FunctionDef> {
        root.walk()
            .filter_map(|n| match &n.kind {
                NodeKind::FunctionDef(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    fn store_names(root: &SyntaxNode) -> Vec<String> {
        root.walk()
            .filter_map(|n| match &n.kind {
                NodeKind::StoreName(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn docstrings_public_private_and_missing() {
        let src = r#"
def hello():
    """Greeting"""
    return 1

def _hidden():
    x = 1
    "not a docstring"
    return x

def fmt():
    f"""{1}"""
"#;
        let root = parse(src);
        let fns = functions(&root);
        assert_eq!(fns[0].docstring.as_deref(), Some("Greeting"));
        assert!(fns[1].docstring.is_none());
        assert!(fns[2].docstring.is_none());
    }

    #[test]
    fn triple_quoted_docstrings_are_dedented() {
        let src = "class C:\n    \"\"\"\n    Line one.\n      Indented.\n    \"\"\"\n";
        let root = parse(src);
        let class = root
            .walk()
            .find_map(|n| match &n.kind {
                NodeKind::ClassDef(c) => Some(c),
                _ => None,
            })
            .expect("class");
        assert_eq!(class.docstring.as_deref(), Some("Line one.\n  Indented."));
    }

    #[test]
    fn parameters_skip_splats_and_separators() {
        let root = parse("def f(a, /, b: int, c=1, *args, d: str = 'x', **kw):\n    pass\n");
        assert_eq!(functions(&root)[0].parameters, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn store_context_covers_targets_but_not_attributes() {
        let src = "a, (b, c) = x\nself.y = 1\nfor i, j in z:\n    k += 1\nwith open(p) as fh:\n    pass\nq = [n for n in r]\n";
        let names = store_names(&parse(src));
        assert_eq!(names, vec!["a", "b", "c", "i", "j", "k", "fh", "q", "n"]);
    }

    #[test]
    fn boolean_chains_flatten_per_operator() {
        let root = parse("x = a and b and c or d\n");
        let ops: Vec<usize> = root
            .walk()
            .filter_map(|n| match n.kind {
                NodeKind::BoolOp { operands } => Some(operands),
                _ => None,
            })
            .collect();
        assert_eq!(ops, vec![2, 3]);
    }

    #[test]
    fn imports_record_module_and_level() {
        let root = parse("import os.path, sys\nfrom ..pkg import x\nfrom . import y\n");
        let imports: Vec<&ImportStmt> = root
            .walk()
            .filter_map(|n| match &n.kind {
                NodeKind::Import(i) => Some(i),
                _ => None,
            })
            .collect();
        assert_eq!(imports[0].names, vec!["os.path", "sys"]);
        assert_eq!(imports[1].module.as_deref(), Some("pkg"));
        assert_eq!(imports[1].level, 2);
        assert_eq!(imports[2].module, None);
        assert_eq!(imports[2].level, 1);
    }

    #[test]
    fn body_layout_distinguishes_inline_bodies() {
        let root = parse("def f(a,\n      b):\n    return a\n\ndef g(): pass\n");
        let fns = functions(&root);
        assert_eq!(fns[0].body.header_end_line, 2);
        assert_eq!(fns[0].body.first_statement_line, 3);
        assert!(fns[0].body.is_block());
        assert!(!fns[1].body.is_block());
    }

    #[test]
    fn syntax_errors_are_structured() {
        let err = PythonParser::new()
            .parse("def broken(:\n    pass\n")
            .unwrap_err();
        match err {
            ParseFailure::Syntax(s) => assert_eq!(s.line, 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn function_span_ends_on_last_statement_line() {
        let root = parse("def f():\n    a = 1\n    return a\n\n\nx = 2\n");
        let span = root
            .walk()
            .find(|n| matches!(n.kind, NodeKind::FunctionDef(_)))
            .map(|n| n.span)
            .expect("fn");
        assert_eq!((span.start_line, span.end_line), (1, 3));
    }
}
