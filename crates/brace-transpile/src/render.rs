//! Target-dialect rendering.
//!
//! The renderer walks the tree once, keeping a stack of [`ScopeState`]s that
//! mirrors the nesting it is in. Every statement and expression passes
//! through the `BeforeRender` and `AfterRender` hooks. Expressions that need
//! statements of their own (comprehensions, reductions) hoist a prelude that
//! is emitted right before the statement containing them.

use crate::config::Config;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::infer::{ScopeId, TypeTable, decorator_name};
use crate::mapping::{
    ConstructKey, LIST_IMPORTS, MAP_IMPORTS, MappingTable, REDUCTIONS, Template, is_origin_builtin,
};
use crate::plugin::{ExtensionPoint, HookContext, PluginChain};
use crate::types::{InferredType, ReturnType};
use brace_syntax::{BinOp, CmpOp, ComprehensionKind, Literal, Node, NodeId, NodeKind, UnaryOp};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::{BTreeSet, HashSet};
use std::fmt::Write as _;

/// Control-flow block kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BlockKind {
    If,
    For,
    While,
}

/// Renderer state, one per open brace-delimited scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScopeState {
    ModuleLevel,
    ClassBody,
    FunctionBody,
    BlockBody(BlockKind),
}

/// Render a `Module` tree to target-dialect text.
pub fn render(
    root: &Node,
    types: &TypeTable,
    mapping: &MappingTable,
    plugins: &PluginChain,
    config: &Config,
    diags: &mut Diagnostics,
) -> String {
    let mut renderer = Renderer {
        config,
        types,
        mapping,
        plugins,
        diags,
        imports: BTreeSet::new(),
        states: Vec::new(),
        scopes: Vec::new(),
        classes: Vec::new(),
        receiver: None,
        depth: 0,
        tmp: 0,
        prelude: Vec::new(),
        loops: HashSet::new(),
    };
    root.walk(&mut |n| {
        if matches!(n.kind, NodeKind::For { .. }) {
            renderer.loops.insert(n.id);
        }
    });
    renderer.module(root)
}

/// Per-item value of a hoisted loop.
enum Item<'n> {
    Expr(&'n Node),
    Var(String),
}

struct Renderer<'a, 'd> {
    config: &'a Config,
    types: &'a TypeTable,
    mapping: &'a MappingTable,
    plugins: &'a PluginChain,
    diags: &'d mut Diagnostics,
    imports: BTreeSet<String>,
    states: Vec<ScopeState>,
    /// Inference scopes of the enclosing module, classes and functions.
    scopes: Vec<ScopeId>,
    classes: Vec<String>,
    /// Receiver parameter of the enclosing method (`self`).
    receiver: Option<String>,
    depth: usize,
    tmp: usize,
    /// Indented lines to emit before the current statement.
    prelude: Vec<String>,
    /// Ids of every `for` statement in the tree.
    loops: HashSet<NodeId>,
}

impl Renderer<'_, '_> {
    // ------------------------------------------------------------------
    // Hooks and bookkeeping
    // ------------------------------------------------------------------

    fn before_render<'n>(&mut self, node: &'n Node) -> Cow<'n, Node> {
        if !self.plugins.has_hooks(ExtensionPoint::BeforeRender) {
            return Cow::Borrowed(node);
        }
        let ctx = HookContext::new(ExtensionPoint::BeforeRender, self.config)
            .with_scopes(&self.states)
            .with_node(node);
        let replaced = self.plugins.before_render(node.clone(), &ctx, self.diags);
        if replaced == *node {
            Cow::Borrowed(node)
        } else {
            Cow::Owned(replaced)
        }
    }

    fn after_render(&mut self, text: String, node: &Node) -> String {
        if !self.plugins.has_hooks(ExtensionPoint::AfterRender) {
            return text;
        }
        let ctx = HookContext::new(ExtensionPoint::AfterRender, self.config)
            .with_scopes(&self.states)
            .with_node(node);
        self.plugins.after_render(text, &ctx, self.diags)
    }

    fn line(&self, extra: usize, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let width = (self.depth + extra) * self.config.indent_size;
        format!("{:width$}{text}", "")
    }

    fn hoist(&mut self, text: &str) {
        let line = self.line(0, text);
        self.prelude.push(line);
    }

    fn fresh_tmp(&mut self) -> String {
        let name = format!("__tmp{}", self.tmp);
        self.tmp += 1;
        name
    }

    fn use_template(&mut self, template: &Template) {
        self.imports.extend(template.imports.iter().cloned());
    }

    fn type_name(&mut self, ty: &InferredType) -> String {
        ty.collect_imports(&mut self.imports);
        ty.render()
    }

    fn scope(&self) -> ScopeId {
        self.scopes.last().copied().unwrap_or(0)
    }

    fn unmapped(&mut self, node: &Node, message: String) {
        tracing::debug!(line = node.span.line, %message, "unmapped construct");
        self.diags
            .push(Diagnostic::new(DiagnosticCode::UnmappedConstruct, message).at(node.span));
    }

    /// Render with extra indentation, returning the prelude produced on the way
    /// instead of queueing it.
    fn nested<T>(&mut self, extra: usize, f: impl FnOnce(&mut Self) -> T) -> (T, Vec<String>) {
        let saved = std::mem::take(&mut self.prelude);
        self.depth += extra;
        let out = f(self);
        self.depth -= extra;
        let produced = std::mem::replace(&mut self.prelude, saved);
        (out, produced)
    }

    // ------------------------------------------------------------------
    // Module and blocks
    // ------------------------------------------------------------------

    fn module(&mut self, root: &Node) -> String {
        let NodeKind::Module { body } = &root.kind else {
            return String::new();
        };
        self.states.push(ScopeState::ModuleLevel);
        self.scopes.push(self.types.scope_for(root.id).unwrap_or(0));
        let lines = self.statements(body, false);
        self.scopes.pop();
        self.states.pop();

        let mut sections = Vec::new();
        if !self.config.package_name.is_empty() {
            sections.push(format!("package {};", self.config.package_name));
        }
        if self.config.emit_imports && !self.imports.is_empty() {
            let imports: Vec<_> = self.imports.iter().map(|i| format!("import {i};")).collect();
            sections.push(imports.join("\n"));
        }
        if !lines.is_empty() {
            sections.push(lines.join("\n"));
        }
        let mut out = sections.join("\n\n");
        out.push('\n');
        out
    }

    /// Render statements at the current depth. Definitions are separated from
    /// their neighbours by a blank line.
    fn statements(&mut self, body: &[Node], skip_fields: bool) -> Vec<String> {
        let mut out = Vec::new();
        let mut previous_def = false;
        for stmt in body {
            if skip_fields && is_field_assign(stmt) {
                continue;
            }
            let is_def = matches!(
                stmt.kind,
                NodeKind::ClassDef { .. } | NodeKind::FunctionDef { .. }
            );
            let text = self.stmt(stmt);
            if text.is_empty() {
                continue;
            }
            if !out.is_empty() && (is_def || previous_def) {
                out.push(String::new());
            }
            out.push(text);
            previous_def = is_def;
        }
        out
    }

    fn block(&mut self, body: &[Node], state: ScopeState) -> Vec<String> {
        self.states.push(state);
        self.depth += 1;
        let lines = self.statements(body, false);
        self.depth -= 1;
        self.states.pop();
        lines
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn stmt(&mut self, node: &Node) -> String {
        let node = self.before_render(node);
        let saved = std::mem::take(&mut self.prelude);
        let text = self.stmt_inner(&node);
        let mut lines = std::mem::replace(&mut self.prelude, saved);
        if !text.is_empty() {
            lines.push(text);
        }
        let text = lines.join("\n");
        self.after_render(text, &node)
    }

    fn stmt_inner(&mut self, node: &Node) -> String {
        match &node.kind {
            NodeKind::ClassDef {
                name,
                bases,
                decorators,
                body,
            } => self.class(node, name, bases, decorators, body),
            NodeKind::FunctionDef { .. } => self.function(node),
            NodeKind::Assign { target, value } => self.assign(node, target, value),
            NodeKind::AugAssign { target, op, value } => self.aug_assign(target, *op, value),
            NodeKind::If { test, body, orelse } => self.if_chain(test, body, orelse),
            NodeKind::For { target, iter, body } => {
                let name = target.as_identifier().unwrap_or("_");
                // A loop header declaration ends with the loop, so a later
                // loop over the same name declares again.
                let declare = self
                    .types
                    .binding(self.scope(), name)
                    .is_none_or(|b| b.first == node.id || self.loops.contains(&b.first));
                let ty = self.types.type_of(target);
                let header = self.loop_header(name, &ty, declare, iter);
                let mut lines = vec![self.line(0, &format!("{header} {{"))];
                lines.extend(self.block(body, ScopeState::BlockBody(BlockKind::For)));
                lines.push(self.line(0, "}"));
                lines.join("\n")
            }
            NodeKind::While { test, body } => {
                let (cond, produced) = self.nested(1, |r| r.condition(test));
                let mut lines = Vec::new();
                if produced.is_empty() {
                    lines.push(self.line(0, &format!("while {cond} {{")));
                } else {
                    // The test needs statements of its own; rerun them on
                    // every iteration.
                    lines.push(self.line(0, "while (true) {"));
                    lines.extend(produced);
                    lines.push(self.line(1, &format!("if {} {{", negate(&cond))));
                    lines.push(self.line(2, "break;"));
                    lines.push(self.line(1, "}"));
                }
                lines.extend(self.block(body, ScopeState::BlockBody(BlockKind::While)));
                lines.push(self.line(0, "}"));
                lines.join("\n")
            }
            NodeKind::Return { value: None } => self.line(0, "return;"),
            NodeKind::Return { value: Some(value) } => {
                let value = self.expr(value);
                self.line(0, &format!("return {value};"))
            }
            NodeKind::ExprStmt { value } => match value.as_literal() {
                Some(Literal::Str(text)) => self.doc_comment(text),
                _ => {
                    let value = self.expr(value);
                    self.line(0, &format!("{value};"))
                }
            },
            NodeKind::Pass => String::new(),
            NodeKind::Break => self.line(0, "break;"),
            NodeKind::Continue => self.line(0, "continue;"),
            NodeKind::Module { .. } | NodeKind::Parameter { .. } | NodeKind::Decorator { .. } => {
                String::new()
            }
            _ => {
                let value = self.expr(node);
                self.line(0, &format!("{value};"))
            }
        }
    }

    fn doc_comment(&self, text: &str) -> String {
        let text = text.trim();
        if !text.contains('\n') {
            return self.line(0, &format!("/** {text} */"));
        }
        let mut lines = vec![self.line(0, "/**")];
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                lines.push(self.line(0, " *"));
            } else {
                lines.push(self.line(0, &format!(" * {line}")));
            }
        }
        lines.push(self.line(0, " */"));
        lines.join("\n")
    }

    fn access(&self, name: &str) -> &'static str {
        if !self.config.add_access_modifiers {
            ""
        } else if is_private(name) {
            "private "
        } else {
            "public "
        }
    }

    fn class(
        &mut self,
        node: &Node,
        name: &str,
        bases: &[Node],
        decorators: &[Node],
        body: &[Node],
    ) -> String {
        let mut lines = Vec::new();
        for decorator in decorators {
            if let Some(annotation) = decorator_name(decorator) {
                lines.push(self.line(0, &format!("@{annotation}")));
            }
        }
        let extends = match bases.first() {
            Some(base) if base.as_identifier() != Some("object") => {
                format!(" extends {}", self.expr(base))
            }
            _ => String::new(),
        };
        let access = self.access(name);
        lines.push(self.line(0, &format!("{access}class {name}{extends} {{")));

        let scope = self.types.scope_for(node.id);
        let class_scope = scope.unwrap_or_else(|| self.scope());
        self.states.push(ScopeState::ClassBody);
        self.scopes.push(class_scope);
        self.classes.push(name.to_string());
        self.depth += 1;

        let (docstring, rest) = match body.split_first() {
            Some((first, rest)) if is_docstring(first) => (Some(first), rest),
            _ => (None, body),
        };
        let mut members = Vec::new();
        if let Some(doc) = docstring {
            members.push(self.stmt(doc));
        }
        let fields = match scope {
            Some(scope) => self.fields(scope, rest),
            None => Vec::new(),
        };
        let has_fields = !fields.is_empty();
        members.extend(fields);
        let methods = self.statements(rest, true);
        if has_fields && !methods.is_empty() {
            members.push(String::new());
        }
        members.extend(methods);

        self.depth -= 1;
        self.classes.pop();
        self.scopes.pop();
        self.states.pop();

        lines.extend(members);
        lines.push(self.line(0, "}"));
        lines.join("\n")
    }

    /// Field declarations for every class-scope binding, in first-assignment
    /// order. Class-body assignments keep their value as the initializer.
    fn fields(&mut self, scope: ScopeId, body: &[Node]) -> Vec<String> {
        let bindings: Vec<_> = self
            .types
            .scope(scope)
            .bindings()
            .iter()
            .map(|b| (b.name.clone(), b.first))
            .collect();
        let mut lines = Vec::new();
        for (name, first) in bindings {
            let ty = self.types.binding_type(scope, &name);
            let ty = self.type_name(&ty);
            let access = self.access(&name);
            let Some(stmt) = body.iter().find(|s| s.id == first) else {
                lines.push(self.line(0, &format!("{access}{ty} {name};")));
                continue;
            };
            // Class-body assignments are statements the hooks see.
            let stmt = self.before_render(stmt);
            let text = match &stmt.kind {
                NodeKind::Assign { value, .. } => {
                    let value = self.expr(value);
                    format!("{access}{ty} {name} = {value};")
                }
                _ => format!("{access}{ty} {name};"),
            };
            let mut field = std::mem::take(&mut self.prelude);
            field.push(self.line(0, &text));
            let field = field.join("\n");
            lines.push(self.after_render(field, &stmt));
        }
        lines
    }

    fn function(&mut self, node: &Node) -> String {
        let NodeKind::FunctionDef {
            name,
            params,
            decorators,
            body,
            ..
        } = &node.kind
        else {
            return String::new();
        };
        let in_class = self.states.last() == Some(&ScopeState::ClassBody);
        let mut is_static = !in_class;
        let mut lines = Vec::new();
        for decorator in decorators {
            match decorator_name(decorator) {
                Some("staticmethod") | Some("classmethod") => is_static = true,
                Some(annotation) => lines.push(self.line(0, &format!("@{annotation}"))),
                None => {}
            }
        }
        let is_static_method = in_class && decorators.iter().any(|d| decorator_name(d) == Some("staticmethod"));

        let scope = self.types.scope_for(node.id);
        let fn_scope = scope.unwrap_or_else(|| self.scope());
        let mut rendered_params = Vec::new();
        let mut receiver = None;
        for (i, param) in params.iter().enumerate() {
            let NodeKind::Parameter { name: param_name, .. } = &param.kind else {
                continue;
            };
            if i == 0 && in_class && !is_static_method {
                receiver = Some(param_name.clone());
                continue;
            }
            let ty = self.types.binding_type(fn_scope, param_name);
            let ty = self.type_name(&ty);
            rendered_params.push(format!("{ty} {param_name}"));
        }

        let mut modifiers = self.access(name).to_string();
        if is_static {
            modifiers.push_str("static ");
        }
        let signature = match self.classes.last() {
            Some(class) if in_class && name == "__init__" => class.clone(),
            _ => {
                let ret = match self.types.return_type(node.id) {
                    ReturnType::Void => "void".to_string(),
                    ReturnType::Value(ty) => self.type_name(&ty),
                };
                format!("{ret} {}", self.method_name(name, in_class))
            }
        };
        lines.push(self.line(
            0,
            &format!("{modifiers}{signature}({}) {{", rendered_params.join(", ")),
        ));

        let receiver = receiver.or_else(|| self.receiver.clone());
        let saved_receiver = std::mem::replace(&mut self.receiver, receiver);
        self.scopes.push(fn_scope);
        lines.extend(self.block(body, ScopeState::FunctionBody));
        self.scopes.pop();
        self.receiver = saved_receiver;

        lines.push(self.line(0, "}"));
        lines.join("\n")
    }

    /// Method name with dunder renames applied.
    fn method_name(&mut self, name: &str, in_class: bool) -> String {
        if !in_class {
            return name.to_string();
        }
        match self
            .mapping
            .lookup(&ConstructKey::magic(name), 0, &InferredType::ObjectUnknown)
        {
            Some(template) => {
                self.use_template(template);
                template.pattern.clone()
            }
            None => name.to_string(),
        }
    }

    fn assign(&mut self, node: &Node, target: &Node, value: &Node) -> String {
        let value_text = self.expr(value);
        match &target.kind {
            NodeKind::Identifier { name } if self.types.is_declaration(node.id) => {
                let ty = self.types.type_of(target);
                let ty = self.type_name(&ty);
                self.line(0, &format!("{ty} {name} = {value_text};"))
            }
            NodeKind::Subscript { value: container, index } => {
                let container_ty = self.types.type_of(container);
                let method = match container_ty {
                    InferredType::MapOf(..) => "put",
                    _ => "set",
                };
                let container = self.expr(container);
                let index = self.index(&container_ty, &container, index);
                self.line(0, &format!("{container}.{method}({index}, {value_text});"))
            }
            _ => {
                let target = self.expr(target);
                self.line(0, &format!("{target} = {value_text};"))
            }
        }
    }

    fn aug_assign(&mut self, target: &Node, op: BinOp, value: &Node) -> String {
        let value_text = self.expr(value);
        if let NodeKind::Subscript { value: container, index } = &target.kind {
            let ty = self.types.type_of(target);
            let container_ty = self.types.type_of(container);
            let container = self.expr(container);
            let index = self.index(&container_ty, &container, index);
            let current = format!("{container}.get({index})");
            let combined = self.binary(op, &ty, current, value_text);
            let method = match container_ty {
                InferredType::MapOf(..) => "put",
                _ => "set",
            };
            return self.line(0, &format!("{container}.{method}({index}, {combined});"));
        }
        let target_text = self.expr(target);
        match op {
            BinOp::Pow | BinOp::FloorDiv | BinOp::And | BinOp::Or => {
                let ty = self.types.type_of(target);
                let combined = self.binary(op, &ty, target_text.clone(), value_text);
                self.line(0, &format!("{target_text} = {combined};"))
            }
            _ => self.line(0, &format!("{target_text} {}= {value_text};", op.symbol())),
        }
    }

    fn if_chain(&mut self, test: &Node, body: &[Node], orelse: &[Node]) -> String {
        let cond = self.condition(test);
        self.if_rest(&cond, body, orelse)
    }

    /// `if` with an already rendered condition, followed by its `else if`
    /// and `else` branches.
    fn if_rest(&mut self, cond: &str, body: &[Node], orelse: &[Node]) -> String {
        let mut lines = vec![self.line(0, &format!("if {cond} {{"))];
        lines.extend(self.block(body, ScopeState::BlockBody(BlockKind::If)));
        let mut orelse = orelse;
        while !orelse.is_empty() {
            if orelse.len() == 1
                && let NodeKind::If { test, body, orelse: rest } = &orelse[0].kind
            {
                let (cond, produced) = self.nested(1, |r| r.condition(test));
                if produced.is_empty() {
                    lines.push(self.line(0, &format!("}} else if {cond} {{")));
                    lines.extend(self.block(body, ScopeState::BlockBody(BlockKind::If)));
                    orelse = rest.as_slice();
                    continue;
                }
                // Statements computing this test may only run once the
                // earlier tests failed.
                lines.push(self.line(0, "} else {"));
                lines.extend(produced);
                self.states.push(ScopeState::BlockBody(BlockKind::If));
                self.depth += 1;
                let nested = self.if_rest(&cond, body, rest);
                self.depth -= 1;
                self.states.pop();
                lines.push(nested);
                break;
            } else {
                lines.push(self.line(0, "} else {"));
                lines.extend(self.block(orelse, ScopeState::BlockBody(BlockKind::If)));
                break;
            }
        }
        lines.push(self.line(0, "}"));
        lines.join("\n")
    }

    /// Parenthesized condition for `if` and `while` headers.
    fn condition(&mut self, test: &Node) -> String {
        let text = self.expr(test);
        parenthesize(text)
    }

    /// `for (...)` header: a counted loop for `range(..)`, an enhanced `for`
    /// otherwise.
    fn loop_header(&mut self, name: &str, ty: &InferredType, declare: bool, iter: &Node) -> String {
        if let NodeKind::Call { func, args } = &iter.kind
            && func.as_identifier() == Some("range")
            && (1..=3).contains(&args.len())
        {
            let (start, stop) = match args.len() {
                1 => ("0".to_string(), self.expr(&args[0])),
                _ => (self.expr(&args[0]), self.expr(&args[1])),
            };
            let (cmp, update) = match args.get(2) {
                None => ("<", format!("{name}++")),
                Some(step) => match constant_int(step) {
                    Some(1) => ("<", format!("{name}++")),
                    Some(-1) => (">", format!("{name}--")),
                    Some(v) if v < 0 => (">", format!("{name} -= {}", v.unsigned_abs())),
                    _ => {
                        let step = self.expr(step);
                        ("<", format!("{name} += {step}"))
                    }
                },
            };
            let decl = if declare { "int " } else { "" };
            return format!("for ({decl}{name} = {start}; {name} {cmp} {stop}; {update})");
        }
        let iter_text = self.iterable(iter);
        let ty = self.type_name(ty);
        format!("for ({ty} {name} : {iter_text})")
    }

    fn iterable(&mut self, iter: &Node) -> String {
        let text = self.expr(iter);
        match self.types.type_of(iter) {
            InferredType::MapOf(..) => format!("{text}.keySet()"),
            InferredType::Text => format!("{text}.split(\"\")"),
            _ => text,
        }
    }

    /// Queue `header { [if (cond) {] body [}] }` as prelude.
    fn hoist_loop(
        &mut self,
        header: &str,
        condition: Option<&Node>,
        item: Item<'_>,
        body: impl FnOnce(&str) -> Vec<(usize, String)>,
    ) {
        let mut lines = vec![self.line(0, &format!("{header} {{"))];
        let mut inner = 1;
        if let Some(condition) = condition {
            let (cond, produced) = self.nested(1, |r| r.condition(condition));
            lines.extend(produced);
            lines.push(self.line(1, &format!("if {cond} {{")));
            inner = 2;
        }
        let value = match item {
            Item::Expr(node) => {
                let (value, produced) = self.nested(inner, |r| r.expr(node));
                lines.extend(produced);
                value
            }
            Item::Var(name) => name,
        };
        for (extra, text) in body(&value) {
            lines.push(self.line(inner + extra, &text));
        }
        if condition.is_some() {
            lines.push(self.line(1, "}"));
        }
        lines.push(self.line(0, "}"));
        self.prelude.extend(lines);
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr(&mut self, node: &Node) -> String {
        let node = self.before_render(node);
        let text = self.expr_inner(&node);
        self.after_render(text, &node)
    }

    fn exprs(&mut self, nodes: &[Node]) -> Vec<String> {
        nodes.iter().map(|n| self.expr(n)).collect()
    }

    fn expr_inner(&mut self, node: &Node) -> String {
        match &node.kind {
            NodeKind::Constant { value } => literal(value),
            NodeKind::Identifier { name } => {
                if self.receiver.as_deref() == Some(name.as_str()) {
                    "this".to_string()
                } else {
                    name.clone()
                }
            }
            NodeKind::Attribute { value, attr } => {
                let value = self.expr(value);
                format!("{value}.{attr}")
            }
            NodeKind::Subscript { value, index } => self.subscript(value, index),
            NodeKind::BinaryOp { left, op, right } => {
                let ty = self.types.type_of(left);
                let l = self.expr(left);
                let r = self.expr(right);
                self.binary(*op, &ty, l, r)
            }
            NodeKind::UnaryOp { op, operand } => {
                let ty = self.types.type_of(operand);
                let mut text = self.expr(operand);
                // `- -x` must not collapse into `--x`.
                if text.starts_with(['-', '+']) {
                    text = format!("({text})");
                }
                match self.mapping.lookup(&ConstructKey::Unary(*op), 1, &ty) {
                    Some(template) => {
                        self.use_template(template);
                        template.apply(&[text], &[])
                    }
                    None => format!("{}{text}", unary_symbol(*op)),
                }
            }
            NodeKind::Compare { left, op, right } => {
                let operand = match op {
                    CmpOp::In | CmpOp::NotIn => self.types.type_of(right),
                    _ => self.types.type_of(left),
                };
                let l = self.expr(left);
                let r = self.expr(right);
                match self.mapping.lookup(&ConstructKey::Compare(*op), 2, &operand) {
                    Some(template) => {
                        self.use_template(template);
                        template.apply(&[l, r], &[])
                    }
                    None => compare_fallback(*op, &l, &r),
                }
            }
            NodeKind::Call { func, args } => self.call(node, func, args),
            NodeKind::ListLiteral { elements } => {
                self.imports.extend(LIST_IMPORTS.iter().map(|s| s.to_string()));
                let elements = self.exprs(elements);
                if elements.is_empty() {
                    "new ArrayList<>()".to_string()
                } else {
                    let adds: String = elements.iter().map(|e| format!(" add({e});")).collect();
                    format!("new ArrayList<>() {{{{{adds} }}}}")
                }
            }
            NodeKind::DictLiteral { entries } => {
                self.imports.extend(MAP_IMPORTS.iter().map(|s| s.to_string()));
                let mut puts = String::new();
                for entry in entries {
                    let key = self.expr(&entry.key);
                    let value = self.expr(&entry.value);
                    let _ = write!(puts, " put({key}, {value});");
                }
                if puts.is_empty() {
                    "new HashMap<>()".to_string()
                } else {
                    format!("new HashMap<>() {{{{{puts} }}}}")
                }
            }
            NodeKind::Comprehension {
                kind,
                element,
                target,
                iter,
                condition,
            } => self.comprehension(node, *kind, element, target, iter, condition.as_deref()),
            NodeKind::FString { parts } => self.fstring(parts),
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
            | NodeKind::Decorator { .. } => String::new(),
        }
    }

    fn binary(&mut self, op: BinOp, left_ty: &InferredType, l: String, r: String) -> String {
        match self.mapping.lookup(&ConstructKey::Binary(op), 2, left_ty) {
            Some(template) => {
                self.use_template(template);
                template.apply(&[l, r], &[])
            }
            None => format!("({l} {} {r})", op.symbol()),
        }
    }

    fn subscript(&mut self, value: &Node, index: &Node) -> String {
        let container_ty = self.types.type_of(value);
        let container = self.expr(value);
        let index_text = self.index(&container_ty, &container, index);
        match container_ty {
            InferredType::Text => format!("String.valueOf({container}.charAt({index_text}))"),
            _ => format!("{container}.get({index_text})"),
        }
    }

    /// Index expression, counting negative constants from the end.
    fn index(&mut self, container_ty: &InferredType, container: &str, index: &Node) -> String {
        match constant_int(index) {
            Some(i) if i < 0 && !matches!(container_ty, InferredType::MapOf(..)) => {
                let size = match container_ty {
                    InferredType::Text => "length",
                    _ => "size",
                };
                format!("{container}.{size}() - {}", i.unsigned_abs())
            }
            _ => self.expr(index),
        }
    }

    fn fstring(&mut self, parts: &[Node]) -> String {
        let mut format = String::new();
        let mut plain = String::new();
        let mut args = Vec::new();
        for part in parts {
            match part.as_literal() {
                Some(Literal::Str(text)) => {
                    format.push_str(&text.replace('%', "%%"));
                    plain.push_str(text);
                }
                _ => {
                    format.push_str("%s");
                    args.push(self.expr(part));
                }
            }
        }
        if args.is_empty() {
            return quote(&plain);
        }
        match self
            .mapping
            .lookup(&ConstructKey::Interpolation, args.len(), &InferredType::Text)
        {
            Some(template) => {
                self.use_template(template);
                template.apply(&args, &[("format", &quote(&format))])
            }
            None => format!("String.format({}, {})", quote(&format), args.join(", ")),
        }
    }

    fn call(&mut self, node: &Node, func: &Node, args: &[Node]) -> String {
        match &func.kind {
            NodeKind::Identifier { name } => self.call_name(node, name, args),
            NodeKind::Attribute { value, attr } => {
                if value.called_name() == Some("super") {
                    let args = self.exprs(args).join(", ");
                    return if attr == "__init__" {
                        format!("super({args})")
                    } else {
                        let method = self.method_name(attr, true);
                        format!("super.{method}({args})")
                    };
                }
                if value.as_identifier().is_some() && value.as_identifier() == self.receiver.as_deref() {
                    let method = self.method_name(attr, true);
                    let args = self.exprs(args).join(", ");
                    return format!("this.{method}({args})");
                }
                let receiver_ty = self.types.type_of(value);
                let receiver = self.expr(value);
                let args_text = self.exprs(args);
                match self
                    .mapping
                    .lookup(&ConstructKey::method(attr), args.len(), &receiver_ty)
                {
                    Some(template) => {
                        self.use_template(template);
                        template.apply(&args_text, &[("recv", &receiver)])
                    }
                    None => format!("{receiver}.{attr}({})", args_text.join(", ")),
                }
            }
            _ => {
                let func = self.expr(func);
                let args = self.exprs(args).join(", ");
                format!("{func}({args})")
            }
        }
    }

    fn call_name(&mut self, node: &Node, name: &str, args: &[Node]) -> String {
        if self.types.is_class(name) {
            let args = self.exprs(args).join(", ");
            return format!("new {name}({args})");
        }
        if name == "super" && args.is_empty() {
            return "super".to_string();
        }
        // User definitions shadow builtins of the same name.
        if self.types.is_function(name) {
            let args = self.exprs(args).join(", ");
            return format!("{name}({args})");
        }
        let operand = args
            .first()
            .map(|a| self.types.type_of(a))
            .unwrap_or(InferredType::ObjectUnknown);
        let template = self
            .mapping
            .lookup(&ConstructKey::builtin(name), args.len(), &operand);
        if template.is_none() && REDUCTIONS.contains(&name) && args.len() == 1 {
            return self.reduction(node, name, &args[0]);
        }
        let args_text = self.exprs(args);
        match template {
            Some(template) => {
                self.use_template(template);
                let spaced = args_text.join(" + \" \" + ");
                template.apply(&args_text, &[("spaced", &spaced)])
            }
            None if is_origin_builtin(name) => {
                self.unmapped(node, format!("no mapping for builtin `{name}` with {} argument(s)", args.len()));
                format!("{name}({}) /* unmapped */", args_text.join(", "))
            }
            None => format!("{name}({})", args_text.join(", ")),
        }
    }

    /// `sum`, `any`, `all`, `max`, `min` over one iterable, as an explicit
    /// accumulator loop. A generator argument is fused into the loop.
    fn reduction(&mut self, node: &Node, name: &str, arg: &Node) -> String {
        self.unmapped(
            node,
            format!("`{name}` has no direct equivalent; rendered as an explicit loop"),
        );
        let acc = self.fresh_tmp();
        let result = self.types.type_of(node);

        let (init, body): (String, Box<dyn FnOnce(&str) -> Vec<(usize, String)>>) = match name {
            "sum" => {
                let ty = if result.is_numeric() { result } else { InferredType::Float };
                let zero = if ty == InferredType::Integer { "0" } else { "0.0" };
                let acc = acc.clone();
                (
                    format!("{} {acc} = {zero};", ty.render()),
                    Box::new(move |v: &str| vec![(0, format!("{acc} += {v};"))]),
                )
            }
            "any" | "all" => {
                let any = name == "any";
                let (start, found) = if any { ("false", "true") } else { ("true", "false") };
                let acc = acc.clone();
                (
                    format!("boolean {acc} = {start};"),
                    Box::new(move |v: &str| {
                        let test = if any { parenthesize(v.to_string()) } else { negate(v) };
                        vec![
                            (0, format!("if {test} {{")),
                            (1, format!("{acc} = {found};")),
                            (1, "break;".to_string()),
                            (0, "}".to_string()),
                        ]
                    }),
                )
            }
            _ => {
                let cmp = if name == "max" { ">" } else { "<" };
                let acc = acc.clone();
                (
                    format!("{} {acc} = null;", result.boxed()),
                    Box::new(move |v: &str| {
                        vec![
                            (0, format!("if ({acc} == null || {v} {cmp} {acc}) {{")),
                            (1, format!("{acc} = {v};")),
                            (0, "}".to_string()),
                        ]
                    }),
                )
            }
        };
        self.types.type_of(node).collect_imports(&mut self.imports);

        match &arg.kind {
            NodeKind::Comprehension {
                element,
                target,
                iter,
                condition,
                ..
            } => {
                let var = target.as_identifier().unwrap_or("_");
                let ty = self.types.type_of(target);
                self.hoist(&init);
                let header = self.loop_header(var, &ty, true, iter);
                self.hoist_loop(&header, condition.as_deref(), Item::Expr(element), body);
            }
            _ => {
                let var = self.fresh_tmp();
                let ty = if arg.called_name() == Some("range") {
                    InferredType::Integer
                } else {
                    self.types.type_of(arg).element()
                };
                self.hoist(&init);
                let header = self.loop_header(&var, &ty, true, arg);
                self.hoist_loop(&header, None, Item::Var(var), body);
            }
        }
        acc
    }

    fn comprehension(
        &mut self,
        node: &Node,
        kind: ComprehensionKind,
        element: &Node,
        target: &Node,
        iter: &Node,
        condition: Option<&Node>,
    ) -> String {
        if kind == ComprehensionKind::Generator {
            self.unmapped(
                node,
                "generator expression has no lazy equivalent; rendered as an eager list".to_string(),
            );
        }
        let init = match self.mapping.lookup(
            &ConstructKey::Comprehension(ComprehensionKind::List),
            0,
            &InferredType::ObjectUnknown,
        ) {
            Some(template) => {
                self.use_template(template);
                template.apply(&[], &[])
            }
            None => "new ArrayList<>()".to_string(),
        };
        let ty = match self.types.type_of(node) {
            ty @ InferredType::ListOf(_) => ty,
            _ => InferredType::list_of(InferredType::ObjectUnknown),
        };
        let ty = self.type_name(&ty);
        let acc = self.fresh_tmp();
        self.hoist(&format!("{ty} {acc} = {init};"));

        let var = target.as_identifier().unwrap_or("_");
        let var_ty = self.types.type_of(target);
        let header = self.loop_header(var, &var_ty, true, iter);
        let add = acc.clone();
        self.hoist_loop(&header, condition, Item::Expr(element), move |v| {
            vec![(0, format!("{add}.add({v});"))]
        });
        acc
    }
}

fn is_private(name: &str) -> bool {
    name.starts_with('_') && !(name.starts_with("__") && name.ends_with("__"))
}

fn is_docstring(node: &Node) -> bool {
    matches!(&node.kind, NodeKind::ExprStmt { value } if matches!(value.as_literal(), Some(Literal::Str(_))))
}

/// Class-body assignment rendered as a field declaration.
fn is_field_assign(node: &Node) -> bool {
    matches!(&node.kind, NodeKind::Assign { target, .. } if target.as_identifier().is_some())
}

fn constant_int(node: &Node) -> Option<i64> {
    match &node.kind {
        NodeKind::Constant {
            value: Literal::Int(v),
        } => Some(*v),
        NodeKind::UnaryOp {
            op: UnaryOp::Neg,
            operand,
        } => match operand.as_literal() {
            Some(Literal::Int(v)) => v.checked_neg(),
            _ => None,
        },
        _ => None,
    }
}

/// Comparison with no mapping entry for the operand type.
fn compare_fallback(op: CmpOp, l: &str, r: &str) -> String {
    let symbol = match op {
        CmpOp::Eq | CmpOp::Is => "==",
        CmpOp::NotEq | CmpOp::IsNot => "!=",
        CmpOp::Lt => "<",
        CmpOp::LtE => "<=",
        CmpOp::Gt => ">",
        CmpOp::GtE => ">=",
        CmpOp::In => return format!("{r}.contains({l})"),
        CmpOp::NotIn => return format!("!{r}.contains({l})"),
    };
    format!("({l} {symbol} {r})")
}

fn unary_symbol(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::Pos => "+",
        UnaryOp::Not => "!",
        UnaryOp::Invert => "~",
    }
}

fn literal(value: &Literal) -> String {
    match value {
        Literal::Int(v) if i32::try_from(*v).is_ok() => v.to_string(),
        Literal::Int(v) => format!("{v}L"),
        Literal::Float(v) if v.is_nan() => "Double.NaN".to_string(),
        Literal::Float(v) if v.is_infinite() && *v > 0.0 => "Double.POSITIVE_INFINITY".to_string(),
        Literal::Float(v) if v.is_infinite() => "Double.NEGATIVE_INFINITY".to_string(),
        Literal::Float(v) => format!("{v:?}"),
        Literal::Str(s) => quote(s),
        Literal::Bool(b) => b.to_string(),
        Literal::None => "null".to_string(),
    }
}

/// Double-quoted string literal with escapes.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Whether `text` is one parenthesized group, `(a) + (b)` is not.
fn is_wrapped(text: &str) -> bool {
    if !text.starts_with('(') || !text.ends_with(')') {
        return false;
    }
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == text.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

fn parenthesize(text: String) -> String {
    if is_wrapped(&text) {
        text
    } else {
        format!("({text})")
    }
}

fn negate(text: &str) -> String {
    if is_wrapped(text) {
        format!("(!{text})")
    } else {
        format!("(!({text}))")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::infer;
    use brace_syntax::SyntaxTree;

    fn render_with(body: Vec<Node>, config: &Config) -> (String, Diagnostics) {
        let tree = SyntaxTree::new(Node::module(body)).unwrap();
        let mapping = MappingTable::builtin();
        let plugins = PluginChain::empty();
        let mut diags = Diagnostics::new();
        let types = infer(tree.root(), config, &mapping, &plugins, &mut diags);
        let text = render(tree.root(), &types, &mapping, &plugins, config, &mut diags);
        (text, diags)
    }

    fn render_body(body: Vec<Node>) -> (String, Diagnostics) {
        render_with(body, &Config::default())
    }

    #[test]
    fn test_wrapped_detection() {
        assert!(is_wrapped("(a < b)"));
        assert!(is_wrapped("((a) + (b))"));
        assert!(!is_wrapped("(a) + (b)"));
        assert!(!is_wrapped("x"));
        assert!(is_wrapped("(s.equals(\")\"))"));
    }

    #[test]
    fn test_compare_fallback_symbols() {
        assert_eq!(compare_fallback(CmpOp::Eq, "a", "b"), "(a == b)");
        assert_eq!(compare_fallback(CmpOp::IsNot, "a", "null"), "(a != null)");
        assert_eq!(compare_fallback(CmpOp::GtE, "a", "b"), "(a >= b)");
        assert_eq!(compare_fallback(CmpOp::NotIn, "x", "xs"), "!xs.contains(x)");
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a\"b\\c\n"), r#""a\"b\\c\n""#);
    }

    #[test]
    fn test_literals() {
        assert_eq!(literal(&Literal::Int(3_000_000_000)), "3000000000L");
        assert_eq!(literal(&Literal::Float(1.0)), "1.0");
        assert_eq!(literal(&Literal::None), "null");
    }

    #[test]
    fn test_class_with_constructor() {
        let class = Node::class(
            "Point",
            vec![
                Node::assign(Node::ident("count"), Node::int(0)),
                Node::function(
                    "__init__",
                    vec![
                        Node::param("self"),
                        Node::param_typed("x", Node::ident("int")),
                        Node::param_typed("y", Node::ident("int")),
                    ],
                    vec![
                        Node::assign(Node::attr(Node::ident("self"), "x"), Node::ident("x")),
                        Node::assign(Node::attr(Node::ident("self"), "y"), Node::ident("y")),
                    ],
                ),
            ],
        );
        let (text, diags) = render_body(vec![class]);
        assert!(diags.is_empty());
        insta::assert_snapshot!(text, @r"
        package generated;

        public class Point {
            public int count = 0;
            public int x;
            public int y;

            public Point(int x, int y) {
                this.x = x;
                this.y = y;
            }
        }
        ");
    }

    #[test]
    fn test_len_by_operand_type() {
        let (text, _) = render_body(vec![
            Node::assign(Node::ident("name"), Node::string("abc")),
            Node::assign(Node::ident("items"), Node::list(vec![Node::int(1), Node::int(2)])),
            Node::assign(Node::ident("n"), Node::call_name("len", vec![Node::ident("name")])),
            Node::assign(Node::ident("m"), Node::call_name("len", vec![Node::ident("items")])),
        ]);
        insta::assert_snapshot!(text, @r#"
        package generated;

        import java.util.ArrayList;
        import java.util.List;

        String name = "abc";
        List<Integer> items = new ArrayList<>() {{ add(1); add(2); }};
        int n = name.length();
        int m = items.size();
        "#);
    }

    #[test]
    fn test_elif_chain() {
        let f = Node::function(
            "classify",
            vec![Node::param_typed("n", Node::ident("int"))],
            vec![Node::if_stmt(
                Node::compare(Node::ident("n"), CmpOp::Lt, Node::int(0)),
                vec![Node::return_stmt(Some(Node::string("neg")))],
                vec![Node::if_stmt(
                    Node::compare(Node::ident("n"), CmpOp::Eq, Node::int(0)),
                    vec![Node::return_stmt(Some(Node::string("zero")))],
                    vec![Node::return_stmt(Some(Node::string("pos")))],
                )],
            )],
        )
        .returning(Node::ident("str"));
        let (text, _) = render_body(vec![f]);
        insta::assert_snapshot!(text, @r#"
        package generated;

        public static String classify(int n) {
            if (n < 0) {
                return "neg";
            } else if (n == 0) {
                return "zero";
            } else {
                return "pos";
            }
        }
        "#);
    }

    #[test]
    fn test_sum_becomes_loop_with_one_diagnostic() {
        let call = Node::call_name("sum", vec![Node::ident("nums")]).at(2, 8);
        let (text, diags) = render_body(vec![
            Node::assign(
                Node::ident("nums"),
                Node::list(vec![Node::int(1), Node::int(2), Node::int(3)]),
            ),
            Node::assign(Node::ident("total"), call),
        ]);
        insta::assert_snapshot!(text, @r"
        package generated;

        import java.util.ArrayList;
        import java.util.List;

        List<Integer> nums = new ArrayList<>() {{ add(1); add(2); add(3); }};
        int __tmp0 = 0;
        for (int __tmp1 : nums) {
            __tmp0 += __tmp1;
        }
        int total = __tmp0;
        ");
        assert_eq!(diags.count(DiagnosticCode::UnmappedConstruct), 1);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.span.map(|s| s.line), Some(2));
    }

    #[test]
    fn test_list_comprehension_over_range() {
        let comp = Node::comprehension(
            ComprehensionKind::List,
            Node::binary(Node::ident("x"), BinOp::Mul, Node::ident("x")),
            Node::ident("x"),
            Node::call_name("range", vec![Node::int(5)]),
            None,
        );
        let (text, diags) = render_body(vec![Node::assign(Node::ident("squares"), comp)]);
        assert!(diags.is_empty());
        insta::assert_snapshot!(text, @r"
        package generated;

        import java.util.ArrayList;
        import java.util.List;

        List<Integer> __tmp0 = new ArrayList<>();
        for (int x = 0; x < 5; x++) {
            __tmp0.add((x * x));
        }
        List<Integer> squares = __tmp0;
        ");
    }

    #[test]
    fn test_unmapped_builtin_is_marked() {
        let (text, diags) = render_body(vec![Node::expr_stmt(
            Node::call_name("zip", vec![Node::ident("a"), Node::ident("b")]).at(1, 0),
        )]);
        assert!(text.contains("zip(a, b) /* unmapped */;"));
        assert_eq!(diags.count(DiagnosticCode::UnmappedConstruct), 1);
    }

    #[test]
    fn test_user_functions_are_not_diagnosed() {
        let (text, diags) = render_body(vec![Node::expr_stmt(Node::call_name(
            "helper",
            vec![Node::int(1)],
        ))]);
        assert!(text.ends_with("helper(1);\n"));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_print_fstring() {
        let (text, _) = render_body(vec![
            Node::assign(Node::ident("name"), Node::string("Ada")),
            Node::expr_stmt(Node::call_name(
                "print",
                vec![Node::fstring(vec![
                    Node::string("Hi "),
                    Node::ident("name"),
                    Node::string(" 100%"),
                ])],
            )),
        ]);
        assert!(text.contains(r#"System.out.println(String.format("Hi %s 100%%", name));"#));
    }

    #[test]
    fn test_inference_disabled_declares_object() {
        let config = Config {
            enable_type_inference: false,
            package_name: String::new(),
            ..Config::default()
        };
        let (text, _) = render_with(
            vec![
                Node::assign(Node::ident("x"), Node::int(1)),
                Node::assign(Node::ident("x"), Node::int(2)),
            ],
            &config,
        );
        assert_eq!(text, "Object x = 1;\nx = 2;\n");
    }

    #[test]
    fn test_private_members_and_static_methods() {
        let class = Node::class(
            "Util",
            vec![
                Node::function("_hidden", vec![Node::param("self")], vec![Node::pass()]),
                Node::function("make", vec![], vec![Node::return_stmt(Some(Node::int(1)))])
                    .decorated(vec![Node::decorator(Node::ident("staticmethod"))]),
            ],
        );
        let (text, _) = render_body(vec![class]);
        assert!(text.contains("    private void _hidden() {\n    }"));
        assert!(text.contains("    public static int make() {"));
    }

    #[test]
    fn test_indent_size() {
        let config = Config {
            indent_size: 2,
            package_name: String::new(),
            ..Config::default()
        };
        let (text, _) = render_with(
            vec![Node::while_loop(Node::boolean(true), vec![Node::break_stmt()])],
            &config,
        );
        assert_eq!(text, "while (true) {\n  break;\n}\n");
    }
}
