//! The node model: a closed set of syntax variants, each owning its children.
//!
//! Every [`Node`] carries a [`NodeId`] and a [`Span`]. Ids identify a node
//! within one tree (bindings point back at their first assignment through
//! them); spans are only used for diagnostics.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of a node inside one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Id given to nodes created by plugins after the tree was validated.
    pub const SYNTHETIC: NodeId = NodeId(0);

    /// A process-wide unique id.
    pub fn fresh() -> Self {
        NodeId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn is_synthetic(self) -> bool {
        self == Self::SYNTHETIC
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source position of a node. Lines are 1-indexed, columns 0-indexed.
///
/// A zero line means the position is unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            line,
            column,
            end_line,
            end_column,
        }
    }

    /// A span covering a single position.
    pub fn point(line: u32, column: u32) -> Self {
        Self::new(line, column, line, column)
    }

    pub fn is_known(&self) -> bool {
        self.line > 0
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.is_known() {
            return f.write_str("<unknown>");
        }
        if self.line == self.end_line {
            write!(f, "{}:{}-{}", self.line, self.column, self.end_column)
        } else {
            write!(
                f,
                "{}:{}-{}:{}",
                self.line, self.column, self.end_line, self.end_column
            )
        }
    }
}

/// Literal constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
}

/// Binary operators, including the short-circuit boolean ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
    And,
    Or,
}

impl BinOp {
    /// Operator spelling in the origin language.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::LShift => "<<",
            BinOp::RShift => ">>",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComprehensionKind {
    /// `[elt for x in it]`
    List,
    /// `(elt for x in it)`, including the bare form passed as a call argument.
    Generator,
}

/// One `key: value` pair of a dictionary literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictEntry {
    pub key: Node,
    pub value: Node,
}

/// A syntax node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub span: Span,
    pub kind: NodeKind,
}

/// The closed set of node variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Module {
        body: Vec<Node>,
    },
    ClassDef {
        name: String,
        #[serde(default)]
        bases: Vec<Node>,
        #[serde(default)]
        decorators: Vec<Node>,
        body: Vec<Node>,
    },
    FunctionDef {
        name: String,
        params: Vec<Node>,
        /// Return annotation expression (`-> int`).
        #[serde(default)]
        returns: Option<Box<Node>>,
        #[serde(default)]
        decorators: Vec<Node>,
        body: Vec<Node>,
    },
    Parameter {
        name: String,
        #[serde(default)]
        annotation: Option<Box<Node>>,
        #[serde(default)]
        default: Option<Box<Node>>,
    },
    Assign {
        target: Box<Node>,
        value: Box<Node>,
    },
    /// `x += value`
    AugAssign {
        target: Box<Node>,
        op: BinOp,
        value: Box<Node>,
    },
    If {
        test: Box<Node>,
        body: Vec<Node>,
        #[serde(default)]
        orelse: Vec<Node>,
    },
    For {
        target: Box<Node>,
        iter: Box<Node>,
        body: Vec<Node>,
    },
    While {
        test: Box<Node>,
        body: Vec<Node>,
    },
    Return {
        #[serde(default)]
        value: Option<Box<Node>>,
    },
    ExprStmt {
        value: Box<Node>,
    },
    Pass,
    Break,
    Continue,
    Call {
        func: Box<Node>,
        args: Vec<Node>,
    },
    Attribute {
        value: Box<Node>,
        attr: String,
    },
    Subscript {
        value: Box<Node>,
        index: Box<Node>,
    },
    BinaryOp {
        left: Box<Node>,
        op: BinOp,
        right: Box<Node>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Node>,
    },
    /// A single comparison. Chains are split by readers into `and`-joined pairs.
    Compare {
        left: Box<Node>,
        op: CmpOp,
        right: Box<Node>,
    },
    Constant {
        value: Literal,
    },
    Identifier {
        name: String,
    },
    ListLiteral {
        elements: Vec<Node>,
    },
    DictLiteral {
        entries: Vec<DictEntry>,
    },
    Comprehension {
        kind: ComprehensionKind,
        element: Box<Node>,
        target: Box<Node>,
        iter: Box<Node>,
        #[serde(default)]
        condition: Option<Box<Node>>,
    },
    /// Interpolated string. Parts are `Constant(Str)` text runs or expressions.
    FString {
        parts: Vec<Node>,
    },
    Decorator {
        expr: Box<Node>,
    },
}

impl Node {
    /// A node with a fresh id and an unknown span.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::fresh(),
            span: Span::default(),
            kind,
        }
    }

    /// A node created after validation (by a plugin), inheriting a span.
    pub fn synthetic(kind: NodeKind, span: Span) -> Self {
        Self {
            id: NodeId::SYNTHETIC,
            span,
            kind,
        }
    }

    /// Set a single-line span starting at `line:column`.
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.span = Span::point(line, column);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    pub fn module(body: Vec<Node>) -> Self {
        Self::new(NodeKind::Module { body })
    }

    pub fn class(name: impl Into<String>, body: Vec<Node>) -> Self {
        Self::new(NodeKind::ClassDef {
            name: name.into(),
            bases: Vec::new(),
            decorators: Vec::new(),
            body,
        })
    }

    pub fn class_with_bases(name: impl Into<String>, bases: Vec<Node>, body: Vec<Node>) -> Self {
        Self::new(NodeKind::ClassDef {
            name: name.into(),
            bases,
            decorators: Vec::new(),
            body,
        })
    }

    pub fn function(name: impl Into<String>, params: Vec<Node>, body: Vec<Node>) -> Self {
        Self::new(NodeKind::FunctionDef {
            name: name.into(),
            params,
            returns: None,
            decorators: Vec::new(),
            body,
        })
    }

    /// Attach a return annotation to a `FunctionDef`. Other nodes are unchanged.
    pub fn returning(mut self, annotation: Node) -> Self {
        if let NodeKind::FunctionDef { returns, .. } = &mut self.kind {
            *returns = Some(Box::new(annotation));
        }
        self
    }

    /// Attach decorators to a `ClassDef` or `FunctionDef`. Other nodes are unchanged.
    pub fn decorated(mut self, with: Vec<Node>) -> Self {
        match &mut self.kind {
            NodeKind::ClassDef { decorators, .. } | NodeKind::FunctionDef { decorators, .. } => {
                *decorators = with;
            }
            _ => {}
        }
        self
    }

    pub fn param(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Parameter {
            name: name.into(),
            annotation: None,
            default: None,
        })
    }

    pub fn param_default(name: impl Into<String>, default: Node) -> Self {
        Self::new(NodeKind::Parameter {
            name: name.into(),
            annotation: None,
            default: Some(Box::new(default)),
        })
    }

    pub fn param_typed(name: impl Into<String>, annotation: Node) -> Self {
        Self::new(NodeKind::Parameter {
            name: name.into(),
            annotation: Some(Box::new(annotation)),
            default: None,
        })
    }

    pub fn assign(target: Node, value: Node) -> Self {
        Self::new(NodeKind::Assign {
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    pub fn aug_assign(target: Node, op: BinOp, value: Node) -> Self {
        Self::new(NodeKind::AugAssign {
            target: Box::new(target),
            op,
            value: Box::new(value),
        })
    }

    pub fn if_stmt(test: Node, body: Vec<Node>, orelse: Vec<Node>) -> Self {
        Self::new(NodeKind::If {
            test: Box::new(test),
            body,
            orelse,
        })
    }

    pub fn for_loop(target: Node, iter: Node, body: Vec<Node>) -> Self {
        Self::new(NodeKind::For {
            target: Box::new(target),
            iter: Box::new(iter),
            body,
        })
    }

    pub fn while_loop(test: Node, body: Vec<Node>) -> Self {
        Self::new(NodeKind::While {
            test: Box::new(test),
            body,
        })
    }

    pub fn return_stmt(value: Option<Node>) -> Self {
        Self::new(NodeKind::Return {
            value: value.map(Box::new),
        })
    }

    pub fn expr_stmt(value: Node) -> Self {
        Self::new(NodeKind::ExprStmt {
            value: Box::new(value),
        })
    }

    pub fn pass() -> Self {
        Self::new(NodeKind::Pass)
    }

    pub fn break_stmt() -> Self {
        Self::new(NodeKind::Break)
    }

    pub fn continue_stmt() -> Self {
        Self::new(NodeKind::Continue)
    }

    pub fn decorator(expr: Node) -> Self {
        Self::new(NodeKind::Decorator {
            expr: Box::new(expr),
        })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub fn call(func: Node, args: Vec<Node>) -> Self {
        Self::new(NodeKind::Call {
            func: Box::new(func),
            args,
        })
    }

    /// Call of a plain name, e.g. `print(x)`.
    pub fn call_name(name: impl Into<String>, args: Vec<Node>) -> Self {
        Self::call(Self::ident(name), args)
    }

    /// Method call `receiver.method(args)`.
    pub fn method_call(receiver: Node, method: impl Into<String>, args: Vec<Node>) -> Self {
        Self::call(Self::attr(receiver, method), args)
    }

    pub fn attr(value: Node, attr: impl Into<String>) -> Self {
        Self::new(NodeKind::Attribute {
            value: Box::new(value),
            attr: attr.into(),
        })
    }

    pub fn subscript(value: Node, index: Node) -> Self {
        Self::new(NodeKind::Subscript {
            value: Box::new(value),
            index: Box::new(index),
        })
    }

    pub fn binary(left: Node, op: BinOp, right: Node) -> Self {
        Self::new(NodeKind::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    pub fn unary(op: UnaryOp, operand: Node) -> Self {
        Self::new(NodeKind::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn compare(left: Node, op: CmpOp, right: Node) -> Self {
        Self::new(NodeKind::Compare {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    pub fn constant(value: Literal) -> Self {
        Self::new(NodeKind::Constant { value })
    }

    pub fn int(value: i64) -> Self {
        Self::constant(Literal::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Self::constant(Literal::Float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::constant(Literal::Str(value.into()))
    }

    pub fn boolean(value: bool) -> Self {
        Self::constant(Literal::Bool(value))
    }

    pub fn none() -> Self {
        Self::constant(Literal::None)
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Identifier { name: name.into() })
    }

    pub fn list(elements: Vec<Node>) -> Self {
        Self::new(NodeKind::ListLiteral { elements })
    }

    pub fn dict(entries: Vec<(Node, Node)>) -> Self {
        Self::new(NodeKind::DictLiteral {
            entries: entries
                .into_iter()
                .map(|(key, value)| DictEntry { key, value })
                .collect(),
        })
    }

    pub fn comprehension(
        kind: ComprehensionKind,
        element: Node,
        target: Node,
        iter: Node,
        condition: Option<Node>,
    ) -> Self {
        Self::new(NodeKind::Comprehension {
            kind,
            element: Box::new(element),
            target: Box::new(target),
            iter: Box::new(iter),
            condition: condition.map(Box::new),
        })
    }

    pub fn fstring(parts: Vec<Node>) -> Self {
        Self::new(NodeKind::FString { parts })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Variant name, used in diagnostics and plugin matching.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Module { .. } => "Module",
            NodeKind::ClassDef { .. } => "ClassDef",
            NodeKind::FunctionDef { .. } => "FunctionDef",
            NodeKind::Parameter { .. } => "Parameter",
            NodeKind::Assign { .. } => "Assign",
            NodeKind::AugAssign { .. } => "AugAssign",
            NodeKind::If { .. } => "If",
            NodeKind::For { .. } => "For",
            NodeKind::While { .. } => "While",
            NodeKind::Return { .. } => "Return",
            NodeKind::ExprStmt { .. } => "ExprStmt",
            NodeKind::Pass => "Pass",
            NodeKind::Break => "Break",
            NodeKind::Continue => "Continue",
            NodeKind::Call { .. } => "Call",
            NodeKind::Attribute { .. } => "Attribute",
            NodeKind::Subscript { .. } => "Subscript",
            NodeKind::BinaryOp { .. } => "BinaryOp",
            NodeKind::UnaryOp { .. } => "UnaryOp",
            NodeKind::Compare { .. } => "Compare",
            NodeKind::Constant { .. } => "Constant",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::ListLiteral { .. } => "ListLiteral",
            NodeKind::DictLiteral { .. } => "DictLiteral",
            NodeKind::Comprehension { .. } => "Comprehension",
            NodeKind::FString { .. } => "FString",
            NodeKind::Decorator { .. } => "Decorator",
        }
    }

    /// True for nodes that produce a value.
    pub fn is_expression(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Call { .. }
                | NodeKind::Attribute { .. }
                | NodeKind::Subscript { .. }
                | NodeKind::BinaryOp { .. }
                | NodeKind::UnaryOp { .. }
                | NodeKind::Compare { .. }
                | NodeKind::Constant { .. }
                | NodeKind::Identifier { .. }
                | NodeKind::ListLiteral { .. }
                | NodeKind::DictLiteral { .. }
                | NodeKind::Comprehension { .. }
                | NodeKind::FString { .. }
        )
    }

    /// True for nodes that may appear in a statement list.
    pub fn is_statement(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::ClassDef { .. }
                | NodeKind::FunctionDef { .. }
                | NodeKind::Assign { .. }
                | NodeKind::AugAssign { .. }
                | NodeKind::If { .. }
                | NodeKind::For { .. }
                | NodeKind::While { .. }
                | NodeKind::Return { .. }
                | NodeKind::ExprStmt { .. }
                | NodeKind::Pass
                | NodeKind::Break
                | NodeKind::Continue
        )
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Identifier { name } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match &self.kind {
            NodeKind::Constant { value } => Some(value),
            _ => None,
        }
    }

    /// Name called by a plain-name call (`len(x)` → `len`).
    pub fn called_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Call { func, .. } => func.as_identifier(),
            _ => None,
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<&Node> {
        let mut out: Vec<&Node> = Vec::new();
        match &self.kind {
            NodeKind::Module { body } => out.extend(body),
            NodeKind::ClassDef {
                bases,
                decorators,
                body,
                ..
            } => {
                out.extend(decorators);
                out.extend(bases);
                out.extend(body);
            }
            NodeKind::FunctionDef {
                params,
                returns,
                decorators,
                body,
                ..
            } => {
                out.extend(decorators);
                out.extend(params);
                out.extend(returns.as_deref());
                out.extend(body);
            }
            NodeKind::Parameter {
                annotation,
                default,
                ..
            } => {
                out.extend(annotation.as_deref());
                out.extend(default.as_deref());
            }
            NodeKind::Assign { target, value } | NodeKind::AugAssign { target, value, .. } => {
                out.push(target);
                out.push(value);
            }
            NodeKind::If { test, body, orelse } => {
                out.push(test);
                out.extend(body);
                out.extend(orelse);
            }
            NodeKind::For { target, iter, body } => {
                out.push(target);
                out.push(iter);
                out.extend(body);
            }
            NodeKind::While { test, body } => {
                out.push(test);
                out.extend(body);
            }
            NodeKind::Return { value } => out.extend(value.as_deref()),
            NodeKind::ExprStmt { value } => out.push(value),
            NodeKind::Pass | NodeKind::Break | NodeKind::Continue => {}
            NodeKind::Call { func, args } => {
                out.push(func);
                out.extend(args);
            }
            NodeKind::Attribute { value, .. } => out.push(value),
            NodeKind::Subscript { value, index } => {
                out.push(value);
                out.push(index);
            }
            NodeKind::BinaryOp { left, right, .. } | NodeKind::Compare { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            NodeKind::UnaryOp { operand, .. } => out.push(operand),
            NodeKind::Constant { .. } | NodeKind::Identifier { .. } => {}
            NodeKind::ListLiteral { elements } => out.extend(elements),
            NodeKind::DictLiteral { entries } => {
                for entry in entries {
                    out.push(&entry.key);
                    out.push(&entry.value);
                }
            }
            NodeKind::Comprehension {
                element,
                target,
                iter,
                condition,
                ..
            } => {
                out.push(iter);
                out.push(target);
                out.extend(condition.as_deref());
                out.push(element);
            }
            NodeKind::FString { parts } => out.extend(parts),
            NodeKind::Decorator { expr } => out.push(expr),
        }
        out
    }

    /// Direct children, mutably, in the same order as [`Node::children`].
    pub fn children_mut(&mut self) -> Vec<&mut Node> {
        let mut out: Vec<&mut Node> = Vec::new();
        match &mut self.kind {
            NodeKind::Module { body } => out.extend(body.iter_mut()),
            NodeKind::ClassDef {
                bases,
                decorators,
                body,
                ..
            } => {
                out.extend(decorators.iter_mut());
                out.extend(bases.iter_mut());
                out.extend(body.iter_mut());
            }
            NodeKind::FunctionDef {
                params,
                returns,
                decorators,
                body,
                ..
            } => {
                out.extend(decorators.iter_mut());
                out.extend(params.iter_mut());
                out.extend(returns.as_deref_mut());
                out.extend(body.iter_mut());
            }
            NodeKind::Parameter {
                annotation,
                default,
                ..
            } => {
                out.extend(annotation.as_deref_mut());
                out.extend(default.as_deref_mut());
            }
            NodeKind::Assign { target, value } | NodeKind::AugAssign { target, value, .. } => {
                out.push(target);
                out.push(value);
            }
            NodeKind::If { test, body, orelse } => {
                out.push(test);
                out.extend(body.iter_mut());
                out.extend(orelse.iter_mut());
            }
            NodeKind::For { target, iter, body } => {
                out.push(target);
                out.push(iter);
                out.extend(body.iter_mut());
            }
            NodeKind::While { test, body } => {
                out.push(test);
                out.extend(body.iter_mut());
            }
            NodeKind::Return { value } => out.extend(value.as_deref_mut()),
            NodeKind::ExprStmt { value } => out.push(value),
            NodeKind::Pass | NodeKind::Break | NodeKind::Continue => {}
            NodeKind::Call { func, args } => {
                out.push(func);
                out.extend(args.iter_mut());
            }
            NodeKind::Attribute { value, .. } => out.push(value),
            NodeKind::Subscript { value, index } => {
                out.push(value);
                out.push(index);
            }
            NodeKind::BinaryOp { left, right, .. } | NodeKind::Compare { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            NodeKind::UnaryOp { operand, .. } => out.push(operand),
            NodeKind::Constant { .. } | NodeKind::Identifier { .. } => {}
            NodeKind::ListLiteral { elements } => out.extend(elements.iter_mut()),
            NodeKind::DictLiteral { entries } => {
                for entry in entries.iter_mut() {
                    out.push(&mut entry.key);
                    out.push(&mut entry.value);
                }
            }
            NodeKind::Comprehension {
                element,
                target,
                iter,
                condition,
                ..
            } => {
                out.push(iter);
                out.push(target);
                out.extend(condition.as_deref_mut());
                out.push(element);
            }
            NodeKind::FString { parts } => out.extend(parts.iter_mut()),
            NodeKind::Decorator { expr } => out.push(expr),
        }
        out
    }

    /// Depth-first pre-order walk over this node and all descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn size(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }

    /// Clone the subtree, giving every node a fresh id.
    pub fn deep_copy(&self) -> Node {
        let mut copy = self.clone();
        copy.renumber();
        copy
    }

    fn renumber(&mut self) {
        self.id = NodeId::fresh();
        for child in self.children_mut() {
            child.renumber();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_are_unique() {
        let a = Node::int(1);
        let b = Node::int(1);
        assert_ne!(a.id, b.id);
        assert!(!a.id.is_synthetic());
    }

    #[test]
    fn test_children_order_for_assignment() {
        let node = Node::assign(Node::ident("x"), Node::int(3));
        let kinds: Vec<_> = node.children().iter().map(|c| c.kind_name()).collect();
        assert_eq!(kinds, vec!["Identifier", "Constant"]);
    }

    #[test]
    fn test_walk_visits_every_node() {
        let module = Node::module(vec![Node::function(
            "f",
            vec![Node::param("a")],
            vec![Node::return_stmt(Some(Node::binary(
                Node::ident("a"),
                BinOp::Add,
                Node::int(1),
            )))],
        )]);
        // Module, FunctionDef, Parameter, Return, BinaryOp, Identifier, Constant
        assert_eq!(module.size(), 7);
    }

    #[test]
    fn test_deep_copy_renumbers() {
        let original = Node::list(vec![Node::int(1), Node::int(2)]);
        let copy = original.deep_copy();
        assert_eq!(original.kind_name(), copy.kind_name());
        assert_ne!(original.id, copy.id);
        assert_ne!(original.children()[0].id, copy.children()[0].id);
    }

    #[test]
    fn test_span_display() {
        assert_eq!(Span::new(3, 4, 3, 9).to_string(), "3:4-9");
        assert_eq!(Span::new(3, 4, 5, 1).to_string(), "3:4-5:1");
        assert_eq!(Span::default().to_string(), "<unknown>");
    }

    #[test]
    fn test_json_roundtrip_preserves_ids() {
        let node = Node::call_name("print", vec![Node::string("hi")]).at(2, 0);
        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(node, back);
    }

    #[test]
    fn test_decorated_and_returning() {
        let f = Node::function("f", vec![], vec![])
            .returning(Node::ident("int"))
            .decorated(vec![Node::decorator(Node::ident("staticmethod"))]);
        match &f.kind {
            NodeKind::FunctionDef {
                returns,
                decorators,
                ..
            } => {
                assert!(returns.is_some());
                assert_eq!(decorators.len(), 1);
            }
            _ => panic!("expected FunctionDef"),
        }
    }
}
