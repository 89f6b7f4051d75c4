//! Validated syntax trees.
//!
//! Nodes own their children, so cycles and sharing can only enter through
//! externally supplied data (a host handing over JSON, or a reader bug).
//! Those show up as repeated node ids, which [`SyntaxTree::new`] rejects
//! together with the structural rules downstream stages rely on.

use crate::node::{Node, NodeId, NodeKind, Span};
use serde::Serialize;
use std::collections::HashSet;

/// A tree that violates the rooted-tree invariant or a structural rule.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("malformed syntax tree: {message} (at {span})")]
pub struct MalformedTree {
    pub message: String,
    pub span: Span,
}

impl MalformedTree {
    fn at(node: &Node, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: node.span,
        }
    }
}

/// A `Module`-rooted tree that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntaxTree {
    root: Node,
}

impl SyntaxTree {
    /// Validate `root` and wrap it.
    pub fn new(root: Node) -> Result<Self, MalformedTree> {
        validate(&root)?;
        Ok(Self { root })
    }

    /// Deserialize a tree from JSON and validate it.
    ///
    /// Unknown variant tags fail here, as malformed input.
    pub fn from_json(json: &str) -> Result<Self, MalformedTree> {
        let root: Node = serde_json::from_str(json).map_err(|err| MalformedTree {
            message: format!("invalid tree encoding: {err}"),
            span: Span::point(err.line() as u32, err.column() as u32),
        })?;
        Self::new(root)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn into_root(self) -> Node {
        self.root
    }

    /// Statements directly under the module.
    pub fn body(&self) -> &[Node] {
        match &self.root.kind {
            NodeKind::Module { body } => body,
            _ => &[],
        }
    }

    /// Canonical JSON encoding, used for fingerprinting trees without source text.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.root).unwrap_or_default()
    }
}

/// Check the invariants on a whole tree.
pub fn validate(root: &Node) -> Result<(), MalformedTree> {
    if !matches!(root.kind, NodeKind::Module { .. }) {
        return Err(MalformedTree::at(
            root,
            format!("root must be a Module, found {}", root.kind_name()),
        ));
    }
    let mut seen = HashSet::new();
    check(root, Position::Root, &mut seen)
}

/// Where a node sits relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Root,
    Statement,
    Expression,
    Parameter,
    Decorator,
    AssignTarget,
    LoopTarget,
}

fn check(node: &Node, position: Position, seen: &mut HashSet<NodeId>) -> Result<(), MalformedTree> {
    if !seen.insert(node.id) {
        return Err(MalformedTree::at(
            node,
            format!(
                "node {} ({}) appears more than once; subtrees may not be shared",
                node.id,
                node.kind_name()
            ),
        ));
    }

    match position {
        Position::Root => {}
        Position::Statement if !node.is_statement() => {
            return Err(MalformedTree::at(
                node,
                format!("{} is not valid in statement position", node.kind_name()),
            ));
        }
        Position::Expression if !node.is_expression() => {
            return Err(MalformedTree::at(
                node,
                format!("{} is not valid in expression position", node.kind_name()),
            ));
        }
        Position::Parameter if !matches!(node.kind, NodeKind::Parameter { .. }) => {
            return Err(MalformedTree::at(
                node,
                format!("expected Parameter, found {}", node.kind_name()),
            ));
        }
        Position::Decorator if !matches!(node.kind, NodeKind::Decorator { .. }) => {
            return Err(MalformedTree::at(
                node,
                format!("expected Decorator, found {}", node.kind_name()),
            ));
        }
        Position::AssignTarget
            if !matches!(
                node.kind,
                NodeKind::Identifier { .. } | NodeKind::Attribute { .. } | NodeKind::Subscript { .. }
            ) =>
        {
            return Err(MalformedTree::at(
                node,
                format!("cannot assign to {}", node.kind_name()),
            ));
        }
        Position::LoopTarget if !matches!(node.kind, NodeKind::Identifier { .. }) => {
            return Err(MalformedTree::at(
                node,
                format!("loop target must be an Identifier, found {}", node.kind_name()),
            ));
        }
        _ => {}
    }

    use Position::*;
    match &node.kind {
        NodeKind::Module { body } => {
            if position != Root {
                return Err(MalformedTree::at(node, "Module may only appear as the root"));
            }
            check_all(body, Statement, seen)
        }
        NodeKind::ClassDef {
            bases,
            decorators,
            body,
            ..
        } => {
            check_all(decorators, Decorator, seen)?;
            check_all(bases, Expression, seen)?;
            check_all(body, Statement, seen)
        }
        NodeKind::FunctionDef {
            params,
            returns,
            decorators,
            body,
            ..
        } => {
            check_all(decorators, Decorator, seen)?;
            check_all(params, Parameter, seen)?;
            check_opt(returns.as_deref(), Expression, seen)?;
            check_all(body, Statement, seen)
        }
        NodeKind::Parameter {
            annotation,
            default,
            ..
        } => {
            check_opt(annotation.as_deref(), Expression, seen)?;
            check_opt(default.as_deref(), Expression, seen)
        }
        NodeKind::Assign { target, value } | NodeKind::AugAssign { target, value, .. } => {
            check(target, AssignTarget, seen)?;
            check(value, Expression, seen)
        }
        NodeKind::If { test, body, orelse } => {
            check(test, Expression, seen)?;
            check_all(body, Statement, seen)?;
            check_all(orelse, Statement, seen)
        }
        NodeKind::For { target, iter, body } => {
            check(target, LoopTarget, seen)?;
            check(iter, Expression, seen)?;
            check_all(body, Statement, seen)
        }
        NodeKind::While { test, body } => {
            check(test, Expression, seen)?;
            check_all(body, Statement, seen)
        }
        NodeKind::Return { value } => check_opt(value.as_deref(), Expression, seen),
        NodeKind::ExprStmt { value } => check(value, Expression, seen),
        NodeKind::Pass | NodeKind::Break | NodeKind::Continue => Ok(()),
        NodeKind::Call { func, args } => {
            check(func, Expression, seen)?;
            check_all(args, Expression, seen)
        }
        NodeKind::Attribute { value, .. } => check(value, Expression, seen),
        NodeKind::Subscript { value, index } => {
            check(value, Expression, seen)?;
            check(index, Expression, seen)
        }
        NodeKind::BinaryOp { left, right, .. } | NodeKind::Compare { left, right, .. } => {
            check(left, Expression, seen)?;
            check(right, Expression, seen)
        }
        NodeKind::UnaryOp { operand, .. } => check(operand, Expression, seen),
        NodeKind::Constant { .. } | NodeKind::Identifier { .. } => Ok(()),
        NodeKind::ListLiteral { elements } => check_all(elements, Expression, seen),
        NodeKind::DictLiteral { entries } => {
            for entry in entries {
                check(&entry.key, Expression, seen)?;
                check(&entry.value, Expression, seen)?;
            }
            Ok(())
        }
        NodeKind::Comprehension {
            element,
            target,
            iter,
            condition,
            ..
        } => {
            check(iter, Expression, seen)?;
            check(target, LoopTarget, seen)?;
            check_opt(condition.as_deref(), Expression, seen)?;
            check(element, Expression, seen)
        }
        NodeKind::FString { parts } => check_all(parts, Expression, seen),
        NodeKind::Decorator { expr } => check(expr, Expression, seen),
    }
}

fn check_all(
    nodes: &[Node],
    position: Position,
    seen: &mut HashSet<NodeId>,
) -> Result<(), MalformedTree> {
    nodes.iter().try_for_each(|n| check(n, position, seen))
}

fn check_opt(
    node: Option<&Node>,
    position: Position,
    seen: &mut HashSet<NodeId>,
) -> Result<(), MalformedTree> {
    node.map_or(Ok(()), |n| check(n, position, seen))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_module() {
        let tree = SyntaxTree::new(Node::module(vec![Node::assign(
            Node::ident("x"),
            Node::int(1),
        )]))
        .unwrap();
        assert_eq!(tree.body().len(), 1);
    }

    #[test]
    fn test_root_must_be_module() {
        let err = SyntaxTree::new(Node::int(1)).unwrap_err();
        assert!(err.message.contains("root must be a Module"));
    }

    #[test]
    fn test_shared_subtree_rejected() {
        let value = Node::int(1).at(4, 8);
        let shared = value.clone();
        let root = Node::module(vec![
            Node::assign(Node::ident("a"), value),
            Node::assign(Node::ident("b"), shared),
        ]);
        let err = SyntaxTree::new(root).unwrap_err();
        assert!(err.message.contains("more than once"));
        assert_eq!(err.span.line, 4);
    }

    #[test]
    fn test_nested_module_rejected() {
        let root = Node::module(vec![Node::module(vec![])]);
        let err = SyntaxTree::new(root).unwrap_err();
        assert!(err.message.contains("statement position"));
    }

    #[test]
    fn test_invalid_assign_target() {
        let root = Node::module(vec![Node::assign(Node::int(1), Node::int(2))]);
        let err = SyntaxTree::new(root).unwrap_err();
        assert!(err.message.contains("cannot assign to Constant"));
    }

    #[test]
    fn test_statement_in_expression_position() {
        let root = Node::module(vec![Node::expr_stmt(Node::pass())]);
        assert!(SyntaxTree::new(root).is_err());
    }

    #[test]
    fn test_from_json_unknown_variant() {
        let json = r#"{"id": 1, "kind": {"Lambda": {"body": []}}}"#;
        let err = SyntaxTree::from_json(json).unwrap_err();
        assert!(err.message.contains("invalid tree encoding"));
    }

    #[test]
    fn test_from_json_roundtrip() {
        let tree = SyntaxTree::new(Node::module(vec![Node::expr_stmt(Node::call_name(
            "print",
            vec![Node::string("hi")],
        ))]))
        .unwrap();
        let back = SyntaxTree::from_json(&tree.to_json()).unwrap();
        assert_eq!(tree, back);
    }
}
