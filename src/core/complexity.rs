//! Cyclomatic complexity of a function-like node.
//!
//! Base 1, +1 per `if`/`elif`/`while`/`for`/`except`/`with`, +(N-1) per
//! N-operand `and`/`or` chain. Nested function bodies count toward the
//! enclosing function unless `isolate_nested` is set.

use crate::core::syntax::{NodeKind, SyntaxNode};

/// Complexity contributed by a single node, excluding its children.
fn own_increment(node: &SyntaxNode) -> usize {
    match &node.kind {
        NodeKind::If
        | NodeKind::While
        | NodeKind::For { .. }
        | NodeKind::ExceptHandler
        | NodeKind::With { .. } => 1,
        NodeKind::BoolOp { operands } => operands.saturating_sub(1),
        NodeKind::Module
        | NodeKind::FunctionDef(_)
        | NodeKind::ClassDef(_)
        | NodeKind::Try
        | NodeKind::Call { .. }
        | NodeKind::Import(_)
        | NodeKind::Assign
        | NodeKind::StoreName(_)
        | NodeKind::Lambda
        | NodeKind::Other(_) => 0,
    }
}

/// Compute the complexity of `func`. Always ≥ 1.
pub fn cyclomatic_complexity(func: &SyntaxNode, isolate_nested: bool) -> usize {
    let mut total = 1;
    let mut stack: Vec<&SyntaxNode> = func.children.iter().collect();
    while let Some(node) = stack.pop() {
        if isolate_nested && node.is_scope() {
            continue;
        }
        total += own_increment(node);
        stack.extend(node.children.iter());
    }
    total
}
