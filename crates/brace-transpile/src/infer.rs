//! Heuristic type inference.
//!
//! One forward pass per scope over the tree in declaration order. Each
//! binding takes the type of its first assignment; a later assignment of a
//! different type widens it to `ObjectUnknown`, once, and it never narrows
//! again. Nothing flows between functions except declared or already inferred
//! return types, and call arguments never refine parameters.
//!
//! The result is a best guess for rendering type names. It is not sound and
//! is not meant to be.

use crate::config::Config;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::mapping::{ConstructKey, MappingTable};
use crate::plugin::{ExtensionPoint, HookContext, PluginChain};
use crate::types::{InferredType, ReturnType};
use brace_syntax::{BinOp, Literal, Node, NodeId, NodeKind, UnaryOp};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

pub type ScopeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScopeKind {
    Module,
    Class,
    Function,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding {
    pub name: String,
    pub scope: ScopeId,
    pub ty: InferredType,
    /// Node of the first assignment (an `Assign`, `For`, `Comprehension` or
    /// `Parameter`).
    pub first: NodeId,
    /// Downgraded by a conflicting assignment.
    pub widened: bool,
    /// A typed declaration has been rendered for this binding. Loop headers
    /// declare their variable only for the loop.
    declared: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Scope {
    pub kind: ScopeKind,
    pub name: String,
    pub parent: Option<ScopeId>,
    bindings: Vec<Binding>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Scope {
    /// Bindings in order of first assignment.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.index.get(name).map(|&i| &self.bindings[i])
    }
}

/// Inference results, read by the renderer.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    enabled: bool,
    scopes: Vec<Scope>,
    scope_of_node: HashMap<NodeId, ScopeId>,
    declarations: HashSet<NodeId>,
    returns: HashMap<NodeId, ReturnType>,
    expr_types: HashMap<NodeId, InferredType>,
    resolved: HashMap<NodeId, (ScopeId, String)>,
    classes: HashSet<String>,
    functions: HashMap<String, ReturnType>,
    methods: HashMap<(ScopeId, String), ReturnType>,
}

impl TypeTable {
    /// Whether type queries answer anything but `ObjectUnknown`.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Scope opened by a `Module`, `ClassDef` or `FunctionDef` node.
    pub fn scope_for(&self, node: NodeId) -> Option<ScopeId> {
        self.scope_of_node.get(&node).copied()
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn binding(&self, scope: ScopeId, name: &str) -> Option<&Binding> {
        self.scopes.get(scope).and_then(|s| s.get(name))
    }

    /// Final type of `name` in `scope`.
    pub fn binding_type(&self, scope: ScopeId, name: &str) -> InferredType {
        if !self.enabled {
            return InferredType::ObjectUnknown;
        }
        self.scopes
            .get(scope)
            .and_then(|s| s.get(name))
            .map(|b| b.ty.clone())
            .unwrap_or(InferredType::ObjectUnknown)
    }

    /// Type of an expression node. Identifiers and `self.attr` report their
    /// binding's final type.
    pub fn type_of(&self, node: &Node) -> InferredType {
        if !self.enabled {
            return InferredType::ObjectUnknown;
        }
        if let Some((scope, name)) = self.resolved.get(&node.id) {
            return self.binding_type(*scope, name);
        }
        self.expr_types
            .get(&node.id)
            .cloned()
            .unwrap_or(InferredType::ObjectUnknown)
    }

    /// True when `node` (an `Assign`) renders as a typed declaration.
    pub fn is_declaration(&self, node: NodeId) -> bool {
        self.declarations.contains(&node)
    }

    pub fn return_type(&self, function: NodeId) -> ReturnType {
        match self.returns.get(&function) {
            None | Some(ReturnType::Void) => ReturnType::Void,
            Some(ReturnType::Value(_)) if !self.enabled => {
                ReturnType::Value(InferredType::ObjectUnknown)
            }
            Some(ret) => ret.clone(),
        }
    }

    /// Whether `name` is a class defined in the tree.
    pub fn is_class(&self, name: &str) -> bool {
        self.classes.contains(name)
    }

    /// Whether `name` is a module-level function defined in the tree.
    pub fn is_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

/// Run inference over a `Module` tree.
pub fn infer(
    root: &Node,
    config: &Config,
    mapping: &MappingTable,
    plugins: &PluginChain,
    diags: &mut Diagnostics,
) -> TypeTable {
    let mut inferencer = Inferencer {
        table: TypeTable {
            enabled: config.enable_type_inference,
            ..TypeTable::default()
        },
        config,
        mapping,
        plugins,
        diags,
        stack: Vec::new(),
        first_nodes: HashMap::new(),
    };
    inferencer.module(root);
    tracing::debug!(
        scopes = inferencer.table.scopes.len(),
        declarations = inferencer.table.declarations.len(),
        "inference finished"
    );
    inferencer.table
}

struct Frame {
    scope: ScopeId,
    kind: ScopeKind,
    /// Types of `return <value>` statements, for functions.
    returns: Vec<InferredType>,
    /// Name of the receiver parameter and the class scope, for methods.
    receiver: Option<(String, ScopeId)>,
}

struct Inferencer<'a, 'd> {
    table: TypeTable,
    config: &'a Config,
    mapping: &'a MappingTable,
    plugins: &'a PluginChain,
    diags: &'d mut Diagnostics,
    stack: Vec<Frame>,
    first_nodes: HashMap<NodeId, &'a Node>,
}

/// How an assignment introduces its target.
#[derive(Clone, Copy, PartialEq, Eq)]
enum BindKind {
    /// `x = value`: declares on first use.
    Assign,
    /// Loop and comprehension targets, and `x += value`.
    Implicit,
    /// Function parameters, declared by the signature.
    Parameter,
}

impl<'a> Inferencer<'a, '_> {
    fn module(&mut self, root: &'a Node) {
        if let NodeKind::Module { body } = &root.kind {
            self.open(ScopeKind::Module, "<module>", root);
            self.block(body);
            self.close();
        }
    }

    fn open(&mut self, kind: ScopeKind, name: &str, node: &Node) -> ScopeId {
        let id = self.table.scopes.len();
        self.table.scopes.push(Scope {
            kind,
            name: name.to_string(),
            parent: self.stack.last().map(|f| f.scope),
            bindings: Vec::new(),
            index: HashMap::new(),
        });
        self.table.scope_of_node.insert(node.id, id);
        self.stack.push(Frame {
            scope: id,
            kind,
            returns: Vec::new(),
            receiver: None,
        });
        id
    }

    fn close(&mut self) -> Option<Frame> {
        let frame = self.stack.pop()?;
        self.finalize(frame.scope);
        Some(frame)
    }

    /// Run `AfterInference` hooks over the scope's bindings; the results are
    /// the frozen types.
    fn finalize(&mut self, scope: ScopeId) {
        if !self.table.enabled || !self.plugins.has_hooks(ExtensionPoint::AfterInference) {
            return;
        }
        let config = self.config;
        for i in 0..self.table.scopes[scope].bindings.len() {
            let binding = &self.table.scopes[scope].bindings[i];
            let name = binding.name.clone();
            let ty = binding.ty.clone();
            let node = self.first_nodes.get(&binding.first).copied();

            let mut ctx = HookContext::new(ExtensionPoint::AfterInference, config).with_binding(&name);
            if let Some(node) = node {
                ctx = ctx.with_node(node);
            }
            let ty = self.plugins.after_inference(ty, &ctx, self.diags);
            self.table.scopes[scope].bindings[i].ty = ty;
        }
    }

    fn current(&self) -> (ScopeId, ScopeKind) {
        self.stack
            .last()
            .map(|f| (f.scope, f.kind))
            .unwrap_or((0, ScopeKind::Module))
    }

    /// Class scope of `name` when it is the receiver of the enclosing method.
    fn receiver_class(&self, name: &str) -> Option<ScopeId> {
        self.stack
            .iter()
            .rev()
            .find(|f| f.kind == ScopeKind::Function)
            .and_then(|f| f.receiver.as_ref())
            .filter(|(receiver, _)| receiver == name)
            .map(|(_, class)| *class)
    }

    fn receiver_attr(&self, node: &Node) -> Option<ScopeId> {
        node.as_identifier().and_then(|name| self.receiver_class(name))
    }

    /// Find `name` following the origin language's rule: enclosing functions
    /// and the module, skipping class bodies other than the innermost scope.
    fn resolve(&self, name: &str) -> Option<(ScopeId, InferredType)> {
        for (depth, frame) in self.stack.iter().rev().enumerate() {
            if frame.kind == ScopeKind::Class && depth > 0 {
                continue;
            }
            if let Some(binding) = self.table.scopes[frame.scope].get(name) {
                return Some((frame.scope, binding.ty.clone()));
            }
        }
        None
    }

    fn bind(&mut self, scope: ScopeId, name: &str, ty: InferredType, node: &'a Node, kind: BindKind) {
        let enabled = self.table.enabled;
        let s = &mut self.table.scopes[scope];
        if let Some(&i) = s.index.get(name) {
            let binding = &mut s.bindings[i];
            if !binding.ty.is_unknown() && binding.ty != ty {
                let from = std::mem::replace(&mut binding.ty, InferredType::ObjectUnknown);
                binding.widened = true;
                if enabled {
                    tracing::debug!(name, %from, to = %ty, "binding widened");
                    self.diags.push(
                        Diagnostic::new(
                            DiagnosticCode::TypeWidened,
                            format!("`{name}` was {from}, now assigned {ty}; declared as Object"),
                        )
                        .at(node.span),
                    );
                }
            }
            if kind == BindKind::Assign && !binding.declared {
                binding.declared = true;
                if s.kind != ScopeKind::Class {
                    self.table.declarations.insert(node.id);
                }
            }
            return;
        }

        let declared = kind != BindKind::Implicit;
        s.index.insert(name.to_string(), s.bindings.len());
        s.bindings.push(Binding {
            name: name.to_string(),
            scope,
            ty,
            first: node.id,
            widened: false,
            declared,
        });
        if kind == BindKind::Assign && s.kind != ScopeKind::Class {
            self.table.declarations.insert(node.id);
        }
        self.first_nodes.insert(node.id, node);
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn block(&mut self, body: &'a [Node]) {
        for stmt in body {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, node: &'a Node) {
        match &node.kind {
            NodeKind::ClassDef {
                name,
                bases,
                decorators,
                body,
            } => {
                for base in bases {
                    self.expr(base);
                }
                self.decorators(decorators);
                self.table.classes.insert(name.clone());
                self.open(ScopeKind::Class, name, node);
                self.block(body);
                self.close();
            }
            NodeKind::FunctionDef { .. } => self.function(node),
            NodeKind::Assign { target, value } => {
                let ty = self.expr(value);
                self.assign_target(node, target, ty, BindKind::Assign);
            }
            NodeKind::AugAssign { target, op, value } => {
                let rhs = self.expr(value);
                let current = self.expr(target);
                let ty = self.binary_type(*op, &current, &rhs);
                self.assign_target(node, target, ty, BindKind::Implicit);
            }
            NodeKind::If { test, body, orelse } => {
                self.expr(test);
                self.block(body);
                self.block(orelse);
            }
            NodeKind::For { target, iter, body } => {
                let element = self.iteration_type(iter);
                self.loop_target(node, target, element);
                self.block(body);
            }
            NodeKind::While { test, body } => {
                self.expr(test);
                self.block(body);
            }
            NodeKind::Return { value } => {
                let ty = value.as_deref().map(|v| self.expr(v));
                if let Some(ty) = ty
                    && let Some(frame) = self.stack.last_mut()
                    && frame.kind == ScopeKind::Function
                {
                    frame.returns.push(ty);
                }
            }
            NodeKind::ExprStmt { value } => {
                self.expr(value);
            }
            NodeKind::Pass | NodeKind::Break | NodeKind::Continue => {}
            NodeKind::Module { .. } | NodeKind::Parameter { .. } | NodeKind::Decorator { .. } => {}
            _ => {
                self.expr(node);
            }
        }
    }

    fn decorators(&mut self, decorators: &'a [Node]) {
        for decorator in decorators {
            if let NodeKind::Decorator { expr } = &decorator.kind {
                self.expr(expr);
            }
        }
    }

    fn function(&mut self, node: &'a Node) {
        let NodeKind::FunctionDef {
            name,
            params,
            returns,
            decorators,
            body,
        } = &node.kind
        else {
            return;
        };
        self.decorators(decorators);

        let (enclosing, enclosing_kind) = self.current();
        let is_method = enclosing_kind == ScopeKind::Class;
        let is_static = decorators.iter().any(|d| decorator_name(d) == Some("staticmethod"));

        let scope = self.open(ScopeKind::Function, name, node);
        for (i, param) in params.iter().enumerate() {
            let NodeKind::Parameter {
                name: param_name,
                annotation,
                default,
            } = &param.kind
            else {
                continue;
            };
            if i == 0 && is_method && !is_static {
                if let Some(frame) = self.stack.last_mut() {
                    frame.receiver = Some((param_name.clone(), enclosing));
                }
                continue;
            }
            let default_ty = default.as_deref().map(|d| (d, self.expr(d)));
            let ty = annotation
                .as_deref()
                .and_then(InferredType::from_annotation)
                .or_else(|| match default_ty {
                    Some((d, ty)) if is_literal_default(d) => Some(ty),
                    _ => None,
                })
                .unwrap_or(InferredType::ObjectUnknown);
            self.bind(scope, param_name, ty, param, BindKind::Parameter);
        }
        self.block(body);
        let Some(frame) = self.close() else {
            return;
        };

        let magic = is_method
            .then(|| {
                self.mapping
                    .lookup(&ConstructKey::magic(name), 0, &InferredType::ObjectUnknown)
            })
            .flatten()
            .and_then(|t| t.returns.clone());
        let ret = match returns.as_deref() {
            Some(annotation) if is_none_annotation(annotation) => ReturnType::Void,
            Some(annotation) => ReturnType::Value(
                InferredType::from_annotation(annotation).unwrap_or(InferredType::ObjectUnknown),
            ),
            None if frame.returns.is_empty() => ReturnType::Void,
            None => match magic {
                Some(ty) => ReturnType::Value(ty),
                None => {
                    let mut returned = frame.returns.iter();
                    let first = returned.next().cloned().unwrap_or(InferredType::ObjectUnknown);
                    ReturnType::Value(returned.fold(first, |acc, ty| acc.join(ty)))
                }
            },
        };

        self.table.returns.insert(node.id, ret.clone());
        match enclosing_kind {
            ScopeKind::Module => {
                self.table.functions.insert(name.clone(), ret);
            }
            ScopeKind::Class => {
                self.table.methods.insert((enclosing, name.clone()), ret);
            }
            ScopeKind::Function => {}
        }
    }

    fn assign_target(&mut self, stmt: &'a Node, target: &'a Node, ty: InferredType, kind: BindKind) {
        match &target.kind {
            NodeKind::Identifier { name } => {
                let (scope, _) = self.current();
                self.bind(scope, name, ty, stmt, kind);
                self.table.resolved.insert(target.id, (scope, name.clone()));
            }
            NodeKind::Attribute { value, attr } if self.receiver_attr(value).is_some() => {
                if let Some(class) = self.receiver_attr(value) {
                    self.bind(class, attr, ty, stmt, kind);
                    self.table.resolved.insert(target.id, (class, attr.clone()));
                }
            }
            _ => {
                self.expr(target);
            }
        }
    }

    fn loop_target(&mut self, owner: &'a Node, target: &'a Node, element: InferredType) {
        if let Some(name) = target.as_identifier() {
            let (scope, _) = self.current();
            self.bind(scope, name, element.clone(), owner, BindKind::Implicit);
            self.table.resolved.insert(target.id, (scope, name.to_string()));
        }
        self.table.expr_types.insert(target.id, element);
    }

    fn iteration_type(&mut self, iter: &'a Node) -> InferredType {
        let ty = self.expr(iter);
        if iter.called_name() == Some("range") {
            InferredType::Integer
        } else {
            ty.element()
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr(&mut self, node: &'a Node) -> InferredType {
        let ty = self.expr_inner(node);
        self.table.expr_types.insert(node.id, ty.clone());
        ty
    }

    fn expr_inner(&mut self, node: &'a Node) -> InferredType {
        use InferredType::*;
        match &node.kind {
            NodeKind::Constant { value } => InferredType::of_literal(value),
            NodeKind::Identifier { name } => match self.resolve(name) {
                Some((scope, ty)) => {
                    self.table.resolved.insert(node.id, (scope, name.clone()));
                    ty
                }
                None => ObjectUnknown,
            },
            NodeKind::Attribute { value, attr } => {
                self.expr(value);
                match self.receiver_attr(value) {
                    Some(class) => match self.table.scopes[class].get(attr) {
                        Some(binding) => {
                            let ty = binding.ty.clone();
                            self.table.resolved.insert(node.id, (class, attr.clone()));
                            ty
                        }
                        None => ObjectUnknown,
                    },
                    None => ObjectUnknown,
                }
            }
            NodeKind::Subscript { value, index } => {
                let container = self.expr(value);
                self.expr(index);
                match container {
                    ListOf(element) => *element,
                    MapOf(_, value) => *value,
                    Text => Text,
                    _ => ObjectUnknown,
                }
            }
            NodeKind::BinaryOp { left, op, right } => {
                let l = self.expr(left);
                let r = self.expr(right);
                let computed = self.binary_type(*op, &l, &r);
                self.mapping
                    .lookup(&ConstructKey::Binary(*op), 2, &l)
                    .and_then(|t| t.returns.clone())
                    .unwrap_or(computed)
            }
            NodeKind::UnaryOp { op, operand } => {
                let ty = self.expr(operand);
                match op {
                    UnaryOp::Not => Boolean,
                    _ if ty.is_numeric() => ty,
                    _ => ObjectUnknown,
                }
            }
            NodeKind::Compare { left, right, .. } => {
                self.expr(left);
                self.expr(right);
                Boolean
            }
            NodeKind::Call { func, args } => self.call(func, args),
            NodeKind::ListLiteral { elements } => {
                let types: Vec<_> = elements.iter().map(|e| self.expr(e)).collect();
                InferredType::list_of(types.into_iter().next().unwrap_or(ObjectUnknown))
            }
            NodeKind::DictLiteral { entries } => {
                let mut first = None;
                for entry in entries {
                    let key = self.expr(&entry.key);
                    let value = self.expr(&entry.value);
                    first.get_or_insert((key, value));
                }
                let (key, value) = first.unwrap_or((ObjectUnknown, ObjectUnknown));
                InferredType::map_of(key, value)
            }
            NodeKind::Comprehension {
                element,
                target,
                iter,
                condition,
                ..
            } => {
                let item = self.iteration_type(iter);
                self.loop_target(node, target, item);
                if let Some(condition) = condition {
                    self.expr(condition);
                }
                InferredType::list_of(self.expr(element))
            }
            NodeKind::FString { parts } => {
                for part in parts {
                    self.expr(part);
                }
                Text
            }
            NodeKind::Module { .. }
            | NodeKind::ClassDef { .. }
            | NodeKind::FunctionDef { .. }
            | NodeKind::Parameter { .. }
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
            | NodeKind::Decorator { .. } => ObjectUnknown,
        }
    }

    fn call(&mut self, func: &'a Node, args: &'a [Node]) -> InferredType {
        use InferredType::*;
        let arg_types: Vec<_> = args.iter().map(|a| self.expr(a)).collect();
        let first = arg_types.first().cloned().unwrap_or(ObjectUnknown);

        match &func.kind {
            NodeKind::Identifier { name } => {
                self.table.expr_types.insert(func.id, ObjectUnknown);
                if self.table.classes.contains(name) {
                    return ObjectUnknown;
                }
                if self.resolve(name).is_none()
                    && let Some(ret) = self.table.functions.get(name)
                {
                    return match ret {
                        ReturnType::Value(ty) => ty.clone(),
                        ReturnType::Void => ObjectUnknown,
                    };
                }
                if let Some(ty) = self
                    .mapping
                    .lookup(&ConstructKey::builtin(name), args.len(), &first)
                    .and_then(|t| t.returns.clone())
                {
                    return ty;
                }
                match (name.as_str(), arg_types.as_slice()) {
                    ("any" | "all" | "isinstance" | "callable", _) => Boolean,
                    ("sum", [items]) if items.element().is_numeric() => items.element(),
                    ("max" | "min", [items]) => items.element(),
                    ("max" | "min", [a, b]) => a.join(b),
                    ("abs", [x]) => x.clone(),
                    ("sorted" | "reversed", [items]) => {
                        InferredType::list_of(items.element())
                    }
                    ("input" | "repr" | "chr" | "hex" | "bin" | "oct", _) => Text,
                    ("ord" | "hash" | "id", _) => Integer,
                    _ => ObjectUnknown,
                }
            }
            NodeKind::Attribute { value, attr } => {
                let receiver = self.expr(value);
                self.table.expr_types.insert(func.id, ObjectUnknown);
                if let Some(class) = self.receiver_attr(value)
                    && let Some(ReturnType::Value(ty)) =
                        self.table.methods.get(&(class, attr.clone()))
                {
                    return ty.clone();
                }
                if let Some(ty) = self
                    .mapping
                    .lookup(&ConstructKey::method(attr), args.len(), &receiver)
                    .and_then(|t| t.returns.clone())
                {
                    return ty;
                }
                match (attr.as_str(), &receiver) {
                    ("pop", ListOf(element)) => (**element).clone(),
                    ("get" | "pop", MapOf(_, value)) => (**value).clone(),
                    ("copy", _) => receiver.clone(),
                    _ => ObjectUnknown,
                }
            }
            _ => {
                self.expr(func);
                ObjectUnknown
            }
        }
    }

    fn binary_type(&self, op: BinOp, l: &InferredType, r: &InferredType) -> InferredType {
        use InferredType::*;
        match op {
            BinOp::And | BinOp::Or => l.join(r),
            BinOp::Add if *l == Text && *r == Text => Text,
            BinOp::Add if matches!(l, ListOf(_)) && l == r => l.clone(),
            BinOp::Mul if *l == Text && *r == Integer => Text,
            BinOp::Div if l.is_numeric() && r.is_numeric() => Float,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Mod | BinOp::FloorDiv | BinOp::Pow
                if l.is_numeric() && r.is_numeric() =>
            {
                if *l == Integer && *r == Integer {
                    Integer
                } else {
                    Float
                }
            }
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::LShift | BinOp::RShift
                if *l == Integer && *r == Integer =>
            {
                Integer
            }
            _ => ObjectUnknown,
        }
    }
}

/// Plain name of a decorator (`@staticmethod` → `staticmethod`).
pub fn decorator_name(decorator: &Node) -> Option<&str> {
    match &decorator.kind {
        NodeKind::Decorator { expr } => match &expr.kind {
            NodeKind::Identifier { name } => Some(name.as_str()),
            NodeKind::Call { func, .. } => func.as_identifier(),
            NodeKind::Attribute { attr, .. } => Some(attr.as_str()),
            _ => None,
        },
        _ => None,
    }
}

fn is_none_annotation(node: &Node) -> bool {
    matches!(node.as_literal(), Some(Literal::None)) || node.as_identifier() == Some("None")
}

/// Defaults that fix a parameter's type: constants, signed numbers and
/// collection displays.
fn is_literal_default(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Constant { .. } | NodeKind::ListLiteral { .. } | NodeKind::DictLiteral { .. } => true,
        NodeKind::UnaryOp {
            op: UnaryOp::Neg | UnaryOp::Pos,
            operand,
        } => matches!(
            operand.as_literal(),
            Some(Literal::Int(_) | Literal::Float(_))
        ),
        _ => false,
    }
}
