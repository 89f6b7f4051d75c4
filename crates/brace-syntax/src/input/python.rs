//! Tree-sitter based Python reader.

use crate::node::{BinOp, CmpOp, ComprehensionKind, Node, Span, UnaryOp};
use crate::traits::{ReadError, Reader};
use crate::tree::SyntaxTree;
use tree_sitter::{Node as TsNode, Parser};

/// Static instance of the Python reader.
pub static PYTHON_READER: PythonReader = PythonReader;

/// Python reader using tree-sitter.
pub struct PythonReader;

impl Reader for PythonReader {
    fn language(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn read(&self, source: &str) -> Result<SyntaxTree, ReadError> {
        read_python(source)
    }
}

/// Parse Python source into a validated syntax tree.
pub fn read_python(source: &str) -> Result<SyntaxTree, ReadError> {
    let mut parser = Parser::new();
    parser
        .set_language(&arborium_python::language().into())
        .map_err(|err| ReadError::Parse(err.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ReadError::Parse("failed to parse".into()))?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(ReadError::Parse(format!(
            "syntax error in source near line {}",
            first_error_line(root)
        )));
    }

    let ctx = ReadContext { source };
    let body = ctx.read_statements(root)?;
    let module = Node::module(body).with_span(span_of(root));
    Ok(SyntaxTree::new(module)?)
}

fn first_error_line(node: TsNode) -> u32 {
    if node.is_error() || node.is_missing() {
        return node.start_position().row as u32 + 1;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            return first_error_line(child);
        }
    }
    node.start_position().row as u32 + 1
}

fn span_of(node: TsNode) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    Span::new(
        start.row as u32 + 1,
        start.column as u32,
        end.row as u32 + 1,
        end.column as u32,
    )
}

fn unsupported(node: TsNode, construct: impl Into<String>) -> ReadError {
    ReadError::Unsupported {
        construct: construct.into(),
        line: node.start_position().row as u32 + 1,
    }
}

fn missing(node: TsNode, what: &str) -> ReadError {
    ReadError::Parse(format!(
        "{} missing {} at line {}",
        node.kind(),
        what,
        node.start_position().row + 1
    ))
}

struct ReadContext<'a> {
    source: &'a str,
}

impl<'a> ReadContext<'a> {
    fn node_text(&self, node: TsNode) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn field<'t>(&self, node: TsNode<'t>, name: &str) -> Result<TsNode<'t>, ReadError> {
        node.child_by_field_name(name)
            .ok_or_else(|| missing(node, name))
    }

    fn first_named<'t>(&self, node: TsNode<'t>) -> Option<TsNode<'t>> {
        let mut cursor = node.walk();
        node.children(&mut cursor)
            .find(|c| c.is_named() && c.kind() != "comment")
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn read_statements(&self, node: TsNode) -> Result<Vec<Node>, ReadError> {
        let mut stmts = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.is_named() {
                if let Some(stmt) = self.read_stmt(child)? {
                    stmts.push(stmt);
                }
            }
        }
        Ok(stmts)
    }

    fn read_stmt(&self, node: TsNode) -> Result<Option<Node>, ReadError> {
        let span = span_of(node);
        let stmt = match node.kind() {
            "comment" => return Ok(None),

            // Imports carry no renderable structure.
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                return Ok(None);
            }

            "expression_statement" => {
                let inner = self
                    .first_named(node)
                    .ok_or_else(|| missing(node, "expression"))?;
                let mut cursor = node.walk();
                if node.named_children(&mut cursor).count() > 1 {
                    return Err(unsupported(node, "tuple expression statement"));
                }
                match inner.kind() {
                    "assignment" => self.read_assignment(inner)?,
                    "augmented_assignment" => self.read_augmented_assignment(inner)?,
                    _ => Node::expr_stmt(self.read_expr(inner)?),
                }
            }
            "assignment" => self.read_assignment(node)?,
            "augmented_assignment" => self.read_augmented_assignment(node)?,

            // The grammar drops the expression_statement wrapper for bare
            // expressions (calls, docstrings, ...).
            "call"
            | "attribute"
            | "identifier"
            | "subscript"
            | "string"
            | "concatenated_string"
            | "binary_operator"
            | "boolean_operator"
            | "comparison_operator"
            | "not_operator"
            | "unary_operator"
            | "parenthesized_expression"
            | "list_comprehension"
            | "generator_expression" => Node::expr_stmt(self.read_expr(node)?),

            "if_statement" => self.read_if_statement(node)?,
            "while_statement" => {
                if node.child_by_field_name("alternative").is_some() {
                    return Err(unsupported(node, "while/else"));
                }
                let test = self.read_expr(self.field(node, "condition")?)?;
                let body = self.read_statements(self.field(node, "body")?)?;
                Node::while_loop(test, body)
            }
            "for_statement" => {
                if node.child_by_field_name("alternative").is_some() {
                    return Err(unsupported(node, "for/else"));
                }
                let target = self.read_target(self.field(node, "left")?)?;
                let iter = self.read_expr(self.field(node, "right")?)?;
                let body = self.read_statements(self.field(node, "body")?)?;
                Node::for_loop(target, iter, body)
            }

            "return_statement" => {
                let value = self
                    .first_named(node)
                    .map(|n| self.read_expr(n))
                    .transpose()?;
                Node::return_stmt(value)
            }
            "pass_statement" => Node::pass(),
            "break_statement" => Node::break_stmt(),
            "continue_statement" => Node::continue_stmt(),

            "function_definition" => self.read_function_definition(node, Vec::new())?,
            "class_definition" => self.read_class_definition(node, Vec::new())?,
            "decorated_definition" => {
                let mut decorators = Vec::new();
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    if child.kind() == "decorator" {
                        let expr = self
                            .first_named(child)
                            .ok_or_else(|| missing(child, "expression"))?;
                        decorators
                            .push(Node::decorator(self.read_expr(expr)?).with_span(span_of(child)));
                    }
                }
                let definition = self.field(node, "definition")?;
                match definition.kind() {
                    "function_definition" => {
                        self.read_function_definition(definition, decorators)?
                    }
                    "class_definition" => self.read_class_definition(definition, decorators)?,
                    other => return Err(unsupported(definition, other)),
                }
            }

            other => return Err(unsupported(node, other)),
        };
        Ok(Some(stmt.with_span(span)))
    }

    fn read_target(&self, node: TsNode) -> Result<Node, ReadError> {
        match node.kind() {
            "identifier" => Ok(Node::ident(self.node_text(node)).with_span(span_of(node))),
            other => Err(unsupported(node, format!("{other} as loop target"))),
        }
    }

    fn read_assignment(&self, node: TsNode) -> Result<Node, ReadError> {
        let left = self.field(node, "left")?;
        let right = node
            .child_by_field_name("right")
            .ok_or_else(|| unsupported(node, "annotation without value"))?;
        if right.kind() == "assignment" {
            return Err(unsupported(node, "chained assignment"));
        }
        let target = match left.kind() {
            "identifier" | "attribute" | "subscript" => self.read_expr(left)?,
            other => return Err(unsupported(left, format!("{other} as assignment target"))),
        };
        Ok(Node::assign(target, self.read_expr(right)?))
    }

    fn read_augmented_assignment(&self, node: TsNode) -> Result<Node, ReadError> {
        let left = self.field(node, "left")?;
        let right = self.field(node, "right")?;
        let op_node = self.field(node, "operator")?;
        let op_text = self.node_text(op_node);
        let op = binary_op(op_text.trim_end_matches('='))
            .ok_or_else(|| unsupported(op_node, op_text))?;
        Ok(Node::aug_assign(
            self.read_expr(left)?,
            op,
            self.read_expr(right)?,
        ))
    }

    fn read_if_statement(&self, node: TsNode) -> Result<Node, ReadError> {
        let test = self.read_expr(self.field(node, "condition")?)?;
        let body = self.read_statements(self.field(node, "consequence")?)?;

        // tree-sitter lists elif/else clauses flat; fold them right-to-left.
        let mut cursor = node.walk();
        let alternatives: Vec<_> = node
            .children_by_field_name("alternative", &mut cursor)
            .collect();
        let mut orelse = Vec::new();
        for alt in alternatives.into_iter().rev() {
            match alt.kind() {
                "else_clause" => {
                    orelse = self.read_statements(self.field(alt, "body")?)?;
                }
                "elif_clause" => {
                    let test = self.read_expr(self.field(alt, "condition")?)?;
                    let body = self.read_statements(self.field(alt, "consequence")?)?;
                    let nested = Node::if_stmt(test, body, orelse).with_span(span_of(alt));
                    orelse = vec![nested];
                }
                other => return Err(unsupported(alt, other)),
            }
        }
        Ok(Node::if_stmt(test, body, orelse))
    }

    fn read_function_definition(
        &self,
        node: TsNode,
        decorators: Vec<Node>,
    ) -> Result<Node, ReadError> {
        if node.child(0).is_some_and(|c| c.kind() == "async") {
            return Err(unsupported(node, "async function"));
        }
        let name = self.node_text(self.field(node, "name")?);
        let params = self.read_parameters(self.field(node, "parameters")?)?;
        let body = self.read_statements(self.field(node, "body")?)?;
        let mut function = Node::function(name, params, body).decorated(decorators);
        if let Some(returns) = node.child_by_field_name("return_type") {
            function = function.returning(self.read_annotation(returns)?);
        }
        Ok(function)
    }

    fn read_class_definition(&self, node: TsNode, decorators: Vec<Node>) -> Result<Node, ReadError> {
        let name = self.node_text(self.field(node, "name")?);
        let mut bases = Vec::new();
        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            let mut cursor = superclasses.walk();
            for child in superclasses.named_children(&mut cursor) {
                match child.kind() {
                    "comment" => {}
                    "keyword_argument" => return Err(unsupported(child, "class keyword argument")),
                    _ => bases.push(self.read_expr(child)?),
                }
            }
        }
        let body = self.read_statements(self.field(node, "body")?)?;
        Ok(Node::class_with_bases(name, bases, body).decorated(decorators))
    }

    fn read_parameters(&self, node: TsNode) -> Result<Vec<Node>, ReadError> {
        let mut params = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            let span = span_of(child);
            let param = match child.kind() {
                "comment" => continue,
                "identifier" => Node::param(self.node_text(child)),
                "default_parameter" => Node::param_default(
                    self.node_text(self.field(child, "name")?),
                    self.read_expr(self.field(child, "value")?)?,
                ),
                "typed_parameter" => {
                    let name = self
                        .first_named(child)
                        .filter(|n| n.kind() == "identifier")
                        .ok_or_else(|| unsupported(child, "splat parameter"))?;
                    Node::param_typed(
                        self.node_text(name),
                        self.read_annotation(self.field(child, "type")?)?,
                    )
                }
                "typed_default_parameter" => {
                    let mut param = Node::param_default(
                        self.node_text(self.field(child, "name")?),
                        self.read_expr(self.field(child, "value")?)?,
                    );
                    let annotation = self.read_annotation(self.field(child, "type")?)?;
                    if let crate::NodeKind::Parameter { annotation: slot, .. } = &mut param.kind {
                        *slot = Some(Box::new(annotation));
                    }
                    param
                }
                other => return Err(unsupported(child, other)),
            };
            params.push(param.with_span(span));
        }
        Ok(params)
    }

    fn read_annotation(&self, node: TsNode) -> Result<Node, ReadError> {
        match node.kind() {
            "type" => {
                let inner = self
                    .first_named(node)
                    .ok_or_else(|| missing(node, "type expression"))?;
                self.read_annotation(inner)
            }
            // Generic annotations: `Dict[str, int]` keeps its arguments as a
            // list literal index, `List[int]` as a plain index.
            "subscript" | "generic_type" => {
                let mut cursor = node.walk();
                let children: Vec<_> = node
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() != "comment")
                    .collect();
                let Some((head, rest)) = children.split_first() else {
                    return Err(missing(node, "generic name"));
                };
                let mut args = Vec::new();
                for arg in rest {
                    if arg.kind() == "type_parameter" {
                        let mut inner_cursor = arg.walk();
                        for inner in arg.named_children(&mut inner_cursor) {
                            args.push(self.read_annotation(inner)?);
                        }
                    } else {
                        args.push(self.read_annotation(*arg)?);
                    }
                }
                let index = if args.len() == 1 {
                    args.remove(0)
                } else {
                    Node::list(args).with_span(span_of(node))
                };
                Ok(Node::subscript(self.read_annotation(*head)?, index).with_span(span_of(node)))
            }
            _ => self.read_expr(node),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn read_expr(&self, node: TsNode) -> Result<Node, ReadError> {
        let span = span_of(node);
        let expr = match node.kind() {
            "integer" => {
                let text = self.node_text(node).replace('_', "");
                let value = parse_int(&text)
                    .ok_or_else(|| ReadError::Parse(format!("invalid integer literal: {text}")))?;
                Node::int(value)
            }
            "float" => {
                let text = self.node_text(node).replace('_', "");
                if text.ends_with(['j', 'J']) {
                    return Err(unsupported(node, "complex literal"));
                }
                let value: f64 = text
                    .parse()
                    .map_err(|_| ReadError::Parse(format!("invalid float literal: {text}")))?;
                Node::float(value)
            }
            "string" => self.read_string(node)?,
            "true" => Node::boolean(true),
            "false" => Node::boolean(false),
            "none" => Node::none(),
            "identifier" => Node::ident(self.node_text(node)),

            "binary_operator" | "boolean_operator" => {
                let op_node = self.field(node, "operator")?;
                let op_text = self.node_text(op_node);
                let op = binary_op(op_text).ok_or_else(|| unsupported(op_node, op_text))?;
                Node::binary(
                    self.read_expr(self.field(node, "left")?)?,
                    op,
                    self.read_expr(self.field(node, "right")?)?,
                )
            }
            "comparison_operator" => self.read_comparison(node)?,
            "not_operator" => Node::unary(
                UnaryOp::Not,
                self.read_expr(self.field(node, "argument")?)?,
            ),
            "unary_operator" => {
                let op_node = self.field(node, "operator")?;
                let op = match self.node_text(op_node) {
                    "-" => UnaryOp::Neg,
                    "+" => UnaryOp::Pos,
                    "~" => UnaryOp::Invert,
                    other => return Err(unsupported(op_node, other)),
                };
                Node::unary(op, self.read_expr(self.field(node, "argument")?)?)
            }

            "call" => self.read_call(node)?,
            "attribute" => Node::attr(
                self.read_expr(self.field(node, "object")?)?,
                self.node_text(self.field(node, "attribute")?),
            ),
            "subscript" => {
                let mut cursor = node.walk();
                if node.children_by_field_name("subscript", &mut cursor).count() > 1 {
                    return Err(unsupported(node, "tuple subscript"));
                }
                let index = self.field(node, "subscript")?;
                if index.kind() == "slice" {
                    return Err(unsupported(index, "slice"));
                }
                Node::subscript(
                    self.read_expr(self.field(node, "value")?)?,
                    self.read_expr(index)?,
                )
            }

            "list" => {
                let mut elements = Vec::new();
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    match child.kind() {
                        "comment" => {}
                        "list_splat" => return Err(unsupported(child, "list splat")),
                        _ => elements.push(self.read_expr(child)?),
                    }
                }
                Node::list(elements)
            }
            "dictionary" => {
                let mut entries = Vec::new();
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    match child.kind() {
                        "comment" => {}
                        "pair" => entries.push((
                            self.read_expr(self.field(child, "key")?)?,
                            self.read_expr(self.field(child, "value")?)?,
                        )),
                        other => return Err(unsupported(child, other)),
                    }
                }
                Node::dict(entries)
            }
            "list_comprehension" => self.read_comprehension(node, ComprehensionKind::List)?,
            "generator_expression" => {
                self.read_comprehension(node, ComprehensionKind::Generator)?
            }

            "parenthesized_expression" => {
                let inner = self
                    .first_named(node)
                    .ok_or_else(|| missing(node, "expression"))?;
                // Keep the inner node's own span.
                return self.read_expr(inner);
            }

            other => return Err(unsupported(node, other)),
        };
        Ok(expr.with_span(span))
    }

    fn read_comparison(&self, node: TsNode) -> Result<Node, ReadError> {
        let mut operands = Vec::new();
        let mut ops = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "comment" {
                continue;
            }
            if child.is_named() {
                operands.push(child);
            } else {
                let text = child.kind();
                ops.push(compare_op(text).ok_or_else(|| unsupported(child, text))?);
            }
        }
        if operands.len() != ops.len() + 1 || ops.is_empty() {
            return Err(missing(node, "operands"));
        }

        // a < b < c becomes (a < b) and (b < c); the shared operand is re-read
        // so each occurrence gets its own node.
        let mut result: Option<Node> = None;
        for (i, op) in ops.into_iter().enumerate() {
            let pair = Node::compare(
                self.read_expr(operands[i])?,
                op,
                self.read_expr(operands[i + 1])?,
            )
            .with_span(Span::new(
                span_of(operands[i]).line,
                span_of(operands[i]).column,
                span_of(operands[i + 1]).end_line,
                span_of(operands[i + 1]).end_column,
            ));
            result = Some(match result {
                None => pair,
                Some(prev) => Node::binary(prev, BinOp::And, pair),
            });
        }
        result.ok_or_else(|| missing(node, "operator"))
    }

    fn read_call(&self, node: TsNode) -> Result<Node, ReadError> {
        let func = self.read_expr(self.field(node, "function")?)?;
        let arguments = self.field(node, "arguments")?;
        let args = match arguments.kind() {
            // f(x for x in xs)
            "generator_expression" => {
                vec![self.read_comprehension(arguments, ComprehensionKind::Generator)?]
            }
            _ => {
                let mut args = Vec::new();
                let mut cursor = arguments.walk();
                for child in arguments.named_children(&mut cursor) {
                    match child.kind() {
                        "comment" => {}
                        "keyword_argument" => {
                            return Err(unsupported(child, "keyword argument"));
                        }
                        "list_splat" | "dictionary_splat" => {
                            return Err(unsupported(child, "argument unpacking"));
                        }
                        _ => args.push(self.read_expr(child)?),
                    }
                }
                args
            }
        };
        Ok(Node::call(func, args))
    }

    fn read_comprehension(&self, node: TsNode, kind: ComprehensionKind) -> Result<Node, ReadError> {
        let element = self.read_expr(self.field(node, "body")?)?;
        let mut target = None;
        let mut iter = None;
        let mut condition = None;
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "for_in_clause" => {
                    if target.is_some() {
                        return Err(unsupported(child, "nested comprehension clause"));
                    }
                    target = Some(self.read_target(self.field(child, "left")?)?);
                    iter = Some(self.read_expr(self.field(child, "right")?)?);
                }
                "if_clause" => {
                    if condition.is_some() {
                        return Err(unsupported(child, "multiple comprehension conditions"));
                    }
                    let test = self
                        .first_named(child)
                        .ok_or_else(|| missing(child, "condition"))?;
                    condition = Some(self.read_expr(test)?);
                }
                _ => {}
            }
        }
        let (target, iter) = target
            .zip(iter)
            .ok_or_else(|| missing(node, "for clause"))?;
        Ok(Node::comprehension(kind, element, target, iter, condition).with_span(span_of(node)))
    }

    fn read_string(&self, node: TsNode) -> Result<Node, ReadError> {
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        let start = children
            .iter()
            .find(|c| c.kind() == "string_start")
            .copied();
        let end = children.iter().rev().find(|c| c.kind() == "string_end").copied();
        let (Some(start), Some(end)) = (start, end) else {
            return Err(missing(node, "string delimiters"));
        };

        let prefix = self.node_text(start).to_ascii_lowercase();
        let is_raw = prefix.contains('r');
        let is_format = prefix.contains('f');
        if prefix.contains('b') {
            return Err(unsupported(node, "bytes literal"));
        }

        // Literal runs are the gaps between interpolations, taken by byte range
        // so that grammar versions with and without `string_content` agree.
        let mut parts = Vec::new();
        let mut cursor_byte = start.end_byte();
        for child in &children {
            if child.kind() != "interpolation" {
                continue;
            }
            let text = &self.source[cursor_byte..child.start_byte()];
            if !text.is_empty() {
                parts.push(Node::string(literal_text(text, is_raw, is_format)));
            }
            let expr = child
                .child_by_field_name("expression")
                .or_else(|| self.first_named(*child))
                .ok_or_else(|| missing(*child, "expression"))?;
            parts.push(self.read_expr(expr)?);
            cursor_byte = child.end_byte();
        }
        let tail = &self.source[cursor_byte..end.start_byte()];

        if !is_format {
            return Ok(Node::string(literal_text(tail, is_raw, false)));
        }
        if !tail.is_empty() {
            parts.push(Node::string(literal_text(tail, is_raw, true)));
        }
        Ok(Node::fstring(parts))
    }
}

fn literal_text(raw: &str, is_raw: bool, is_format: bool) -> String {
    let text = if is_raw {
        raw.to_string()
    } else {
        unescape(raw)
    };
    if is_format {
        text.replace("{{", "{").replace("}}", "}")
    } else {
        text
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            // Line continuation inside a string.
            Some('\n') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn parse_int(text: &str) -> Option<i64> {
    let lower = text.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else {
        lower.parse().ok()
    }
}

fn binary_op(text: &str) -> Option<BinOp> {
    Some(match text {
        "+" => BinOp::Add,
        "-" => BinOp::Sub,
        "*" => BinOp::Mul,
        "/" => BinOp::Div,
        "//" => BinOp::FloorDiv,
        "%" => BinOp::Mod,
        "**" => BinOp::Pow,
        "&" => BinOp::BitAnd,
        "|" => BinOp::BitOr,
        "^" => BinOp::BitXor,
        "<<" => BinOp::LShift,
        ">>" => BinOp::RShift,
        "and" => BinOp::And,
        "or" => BinOp::Or,
        _ => return None,
    })
}

fn compare_op(text: &str) -> Option<CmpOp> {
    Some(match text {
        "==" => CmpOp::Eq,
        "!=" | "<>" => CmpOp::NotEq,
        "<" => CmpOp::Lt,
        "<=" => CmpOp::LtE,
        ">" => CmpOp::Gt,
        ">=" => CmpOp::GtE,
        "in" => CmpOp::In,
        "not in" => CmpOp::NotIn,
        "is" => CmpOp::Is,
        "is not" => CmpOp::IsNot,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Literal, NodeKind};

    fn body(source: &str) -> Vec<Node> {
        read_python(source)
            .expect("parse failed")
            .body()
            .to_vec()
    }

    #[test]
    fn test_simple_assignment() {
        let stmts = body("x = 42");
        assert_eq!(stmts.len(), 1);
        match &stmts[0].kind {
            NodeKind::Assign { target, value } => {
                assert_eq!(target.as_identifier(), Some("x"));
                assert_eq!(value.as_literal(), Some(&Literal::Int(42)));
            }
            other => panic!("expected Assign, got {other:?}"),
        }
        assert_eq!(stmts[0].span.line, 1);
    }

    #[test]
    fn test_function_call() {
        let stmts = body("print(\"hello\", 42)");
        match &stmts[0].kind {
            NodeKind::ExprStmt { value } => {
                assert_eq!(value.called_name(), Some("print"));
                assert_eq!(value.children().len(), 3);
            }
            other => panic!("expected ExprStmt, got {other:?}"),
        }
    }

    #[test]
    fn test_class_with_init() {
        let stmts = body("class Point:\n    def __init__(self, x=0):\n        self.x = x\n");
        match &stmts[0].kind {
            NodeKind::ClassDef { name, body, .. } => {
                assert_eq!(name, "Point");
                match &body[0].kind {
                    NodeKind::FunctionDef { name, params, .. } => {
                        assert_eq!(name, "__init__");
                        assert_eq!(params.len(), 2);
                    }
                    other => panic!("expected FunctionDef, got {other:?}"),
                }
            }
            other => panic!("expected ClassDef, got {other:?}"),
        }
    }

    #[test]
    fn test_elif_chain_nests() {
        let stmts = body("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n");
        match &stmts[0].kind {
            NodeKind::If { orelse, .. } => {
                assert_eq!(orelse.len(), 1);
                match &orelse[0].kind {
                    NodeKind::If { orelse, .. } => assert_eq!(orelse.len(), 1),
                    other => panic!("expected nested If, got {other:?}"),
                }
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn test_fstring_parts() {
        let stmts = body("msg = f\"Hello, {name}!\"");
        match &stmts[0].kind {
            NodeKind::Assign { value, .. } => match &value.kind {
                NodeKind::FString { parts } => {
                    assert_eq!(parts.len(), 3);
                    assert_eq!(parts[1].as_identifier(), Some("name"));
                    assert_eq!(parts[2].as_literal(), Some(&Literal::Str("!".into())));
                }
                other => panic!("expected FString, got {other:?}"),
            },
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn test_chained_comparison_splits() {
        let stmts = body("ok = 0 < x < 10");
        match &stmts[0].kind {
            NodeKind::Assign { value, .. } => {
                assert!(matches!(value.kind, NodeKind::BinaryOp { op: BinOp::And, .. }));
            }
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_expressions_in_blocks() {
        let stmts = body("def f(xs):\n    \"\"\"Doc.\"\"\"\n    xs.append(1)\n    if xs:\n        print(xs)\n");
        let NodeKind::FunctionDef { body, .. } = &stmts[0].kind else {
            panic!("expected FunctionDef");
        };
        assert_eq!(body.len(), 3);
        assert!(body[..2]
            .iter()
            .all(|s| matches!(s.kind, NodeKind::ExprStmt { .. })));
        let NodeKind::If { body, .. } = &body[2].kind else {
            panic!("expected If");
        };
        assert!(matches!(&body[0].kind, NodeKind::ExprStmt { value } if value.called_name() == Some("print")));
    }

    #[test]
    fn test_imports_are_dropped() {
        let stmts = body("import os\nfrom typing import List\nx = 1\n");
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn test_unsupported_construct() {
        let err = read_python("try:\n    x = 1\nexcept ValueError:\n    pass\n").unwrap_err();
        assert!(matches!(err, ReadError::Unsupported { line: 1, .. }));
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(
            read_python("def broken(:\n"),
            Err(ReadError::Parse(_))
        ));
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\nb\\c\q"), "a\nb\\c\\q");
    }
}
