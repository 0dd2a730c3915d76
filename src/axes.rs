//! Pure functions collecting structural candidates relative to a context node.

use crate::adapter::AstNode;

/// The context node itself followed by every descendant, depth-first preorder
/// (a node before its children, children in adapter order). Traversal runs on
/// an explicit work-stack; recursion depth does not scale with tree depth.
pub fn collect_self_and_descendants<'a, N: AstNode<'a>>(node: N, results: &mut Vec<N>) {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        results.push(current);
        let children: Vec<N> = current.children().collect();
        // First child must come off the stack first to keep preorder.
        stack.extend(children.into_iter().rev());
    }
}

pub fn collect_children<'a, N: AstNode<'a>>(node: N, results: &mut Vec<N>) {
    results.extend(node.children());
}

/// The single sibling immediately following `node` in its parent's child
/// order, if any.
pub fn collect_adjacent_sibling<'a, N: AstNode<'a>>(node: N, results: &mut Vec<N>) {
    if let Some(parent) = node.parent() {
        let mut found_self = false;
        for sibling in parent.children() {
            if found_self {
                results.push(sibling);
                break;
            }
            if sibling == node {
                found_self = true;
            }
        }
    }
}

/// Every sibling strictly after `node` in its parent's child order.
pub fn collect_general_siblings<'a, N: AstNode<'a>>(node: N, results: &mut Vec<N>) {
    if let Some(parent) = node.parent() {
        let mut found_self = false;
        for sibling in parent.children() {
            if found_self {
                results.push(sibling);
            }
            if sibling == node {
                found_self = true;
            }
        }
    }
}
