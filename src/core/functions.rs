//! Per-function metadata built from one definition node.

use serde::{Deserialize, Serialize};

use crate::core::complexity::cyclomatic_complexity;
use crate::core::syntax::{NodeKind, SyntaxNode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub line_count: usize,
    pub complexity: usize,
    pub parameter_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    pub called_names: Vec<String>,
    pub is_method: bool,
}

/// Every function definition in source order, nested ones included.
pub fn profile_functions(root: &SyntaxNode, isolate_nested: bool) -> Vec<FunctionRecord> {
    let mut out = Vec::new();
    collect(root, false, isolate_nested, &mut out);
    out
}

/// `in_class` tells whether the nearest enclosing definition is a class.
fn collect(node: &SyntaxNode, in_class: bool, isolate_nested: bool, out: &mut Vec<FunctionRecord>) {
    for child in &node.children {
        match &child.kind {
            NodeKind::FunctionDef(def) => {
                out.push(FunctionRecord {
                    name: def.name.clone(),
                    start_line: child.span.start_line,
                    end_line: child.span.end_line,
                    line_count: child.span.line_count(),
                    complexity: cyclomatic_complexity(child, isolate_nested),
                    parameter_names: def.parameters.clone(),
                    docstring: def.docstring.clone(),
                    called_names: called_names(child),
                    is_method: in_class,
                });
                collect(child, false, isolate_nested, out);
            }
            NodeKind::ClassDef(_) => collect(child, true, isolate_nested, out),
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
            | NodeKind::Lambda
            | NodeKind::Other(_) => collect(child, in_class, isolate_nested, out),
        }
    }
}

fn called_names(func: &SyntaxNode) -> Vec<String> {
    func.walk()
        .filter_map(|n| match &n.kind {
            NodeKind::Call { callee } => callee.clone(),
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
            | NodeKind::Import(_)
            | NodeKind::Assign
            | NodeKind::StoreName(_)
            | NodeKind::Lambda
            | NodeKind::Other(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::syntax::SourceParser;
    use crate::parsers::PythonParser;

    fn profile(src: &str) -> Vec<FunctionRecord> {
        let root = PythonParser::new().parse(src).expect("parse");
        profile_functions(&root, false)
    }

    #[test]
    fn records_span_parameters_and_calls() {
        let src = r#"
def load(path, *args, mode="r", **kw):
    """Load a file."""
    data = read(path)
    obj.method()
    return parse(clean(data))
"#;
        let recs = profile(src);
        assert_eq!(recs.len(), 1);
        let r = &recs[0];
        assert_eq!(r.name, "load");
        assert_eq!((r.start_line, r.end_line, r.line_count), (2, 6, 5));
        assert_eq!(r.parameter_names, vec!["path", "mode"]);
        assert_eq!(r.docstring.as_deref(), Some("Load a file."));
        assert_eq!(r.called_names, vec!["read", "parse", "clean"]);
        assert_eq!(r.complexity, 1);
        assert!(!r.is_method);
    }

    #[test]
    fn method_flag_follows_nearest_definition() {
        let src = r#"
class Service:
    def run(self):
        def helper():
            pass
        return helper()

    async def stop(self):
        pass
"#;
        let recs = profile(src);
        let flags: Vec<(&str, bool)> = recs
            .iter()
            .map(|r| (r.name.as_str(), r.is_method))
            .collect();
        assert_eq!(flags, vec![("run", true), ("helper", false), ("stop", true)]);
    }

    #[test]
    fn decorated_function_starts_at_def_line() {
        let recs = profile("@cache\ndef f():\n    pass\n");
        assert_eq!(recs[0].start_line, 2);
    }
}
