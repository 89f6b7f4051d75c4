//! The inferred-type lattice.
//!
//! `ObjectUnknown` is the top element. Two different types join to
//! `ObjectUnknown`; there is no subtyping between the others, so `int` and
//! `double` do not meet at a numeric type. That keeps widening a single step.

use brace_syntax::{Literal, Node, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InferredType {
    Integer,
    Float,
    Boolean,
    Text,
    ListOf(Box<InferredType>),
    MapOf(Box<InferredType>, Box<InferredType>),
    ObjectUnknown,
}

impl InferredType {
    pub fn list_of(element: InferredType) -> Self {
        InferredType::ListOf(Box::new(element))
    }

    pub fn map_of(key: InferredType, value: InferredType) -> Self {
        InferredType::MapOf(Box::new(key), Box::new(value))
    }

    /// Type of a literal constant. `None` has no useful type.
    pub fn of_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Int(_) => InferredType::Integer,
            Literal::Float(_) => InferredType::Float,
            Literal::Str(_) => InferredType::Text,
            Literal::Bool(_) => InferredType::Boolean,
            Literal::None => InferredType::ObjectUnknown,
        }
    }

    /// Least upper bound in the lattice.
    pub fn join(&self, other: &InferredType) -> InferredType {
        if self == other {
            self.clone()
        } else {
            InferredType::ObjectUnknown
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, InferredType::ObjectUnknown)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, InferredType::Integer | InferredType::Float)
    }

    /// Type produced by iterating a value of this type.
    pub fn element(&self) -> InferredType {
        match self {
            InferredType::ListOf(element) => (**element).clone(),
            InferredType::MapOf(key, _) => (**key).clone(),
            InferredType::Text => InferredType::Text,
            _ => InferredType::ObjectUnknown,
        }
    }

    /// Type of a parameter or return annotation expression.
    ///
    /// Recognizes the builtin names and `List[T]` / `Dict[K, V]` generics
    /// (the reader encodes the `K, V` pair as a two-element list literal).
    /// Anything else, including user classes, is `None`.
    pub fn from_annotation(annotation: &Node) -> Option<InferredType> {
        match &annotation.kind {
            NodeKind::Identifier { name } => match name.as_str() {
                "int" => Some(InferredType::Integer),
                "float" => Some(InferredType::Float),
                "bool" => Some(InferredType::Boolean),
                "str" => Some(InferredType::Text),
                "list" | "List" => Some(InferredType::list_of(InferredType::ObjectUnknown)),
                "dict" | "Dict" => Some(InferredType::map_of(
                    InferredType::ObjectUnknown,
                    InferredType::ObjectUnknown,
                )),
                _ => None,
            },
            NodeKind::Constant {
                value: Literal::Str(name),
            } => InferredType::from_annotation(&Node::ident(name.as_str())),
            NodeKind::Subscript { value, index } => {
                let arg = |node: &Node| {
                    InferredType::from_annotation(node).unwrap_or(InferredType::ObjectUnknown)
                };
                match value.as_identifier()? {
                    "list" | "List" => Some(InferredType::list_of(arg(index))),
                    "dict" | "Dict" => match &index.kind {
                        NodeKind::ListLiteral { elements } if elements.len() == 2 => {
                            Some(InferredType::map_of(arg(&elements[0]), arg(&elements[1])))
                        }
                        _ => Some(InferredType::map_of(
                            InferredType::ObjectUnknown,
                            InferredType::ObjectUnknown,
                        )),
                    },
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Name in declaration position (`int`, `List<Integer>`).
    pub fn render(&self) -> String {
        match self {
            InferredType::Integer => "int".into(),
            InferredType::Float => "double".into(),
            InferredType::Boolean => "boolean".into(),
            _ => self.boxed(),
        }
    }

    /// Name in generic-argument position (`Integer`, `Double`).
    pub fn boxed(&self) -> String {
        match self {
            InferredType::Integer => "Integer".into(),
            InferredType::Float => "Double".into(),
            InferredType::Boolean => "Boolean".into(),
            InferredType::Text => "String".into(),
            InferredType::ListOf(element) => format!("List<{}>", element.boxed()),
            InferredType::MapOf(key, value) => format!("Map<{}, {}>", key.boxed(), value.boxed()),
            InferredType::ObjectUnknown => "Object".into(),
        }
    }

    /// Imports needed to name this type.
    pub fn collect_imports(&self, imports: &mut BTreeSet<String>) {
        match self {
            InferredType::ListOf(element) => {
                imports.insert("java.util.List".into());
                element.collect_imports(imports);
            }
            InferredType::MapOf(key, value) => {
                imports.insert("java.util.Map".into());
                key.collect_imports(imports);
                value.collect_imports(imports);
            }
            _ => {}
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Inferred result of a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnType {
    Void,
    Value(InferredType),
}

impl ReturnType {
    pub fn render(&self) -> String {
        match self {
            ReturnType::Void => "void".into(),
            ReturnType::Value(ty) => ty.render(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_primitive_and_boxed() {
        let ty = InferredType::map_of(InferredType::Text, InferredType::list_of(InferredType::Integer));
        assert_eq!(ty.render(), "Map<String, List<Integer>>");
        assert_eq!(InferredType::Float.render(), "double");
        assert_eq!(InferredType::Float.boxed(), "Double");
    }

    #[test]
    fn test_join_is_flat() {
        assert_eq!(InferredType::Integer.join(&InferredType::Integer), InferredType::Integer);
        assert_eq!(
            InferredType::Integer.join(&InferredType::Float),
            InferredType::ObjectUnknown
        );
        let empty = InferredType::list_of(InferredType::ObjectUnknown);
        let ints = InferredType::list_of(InferredType::Integer);
        assert_eq!(empty.join(&ints), InferredType::ObjectUnknown);
    }

    #[test]
    fn test_annotations() {
        assert_eq!(
            InferredType::from_annotation(&Node::ident("str")),
            Some(InferredType::Text)
        );
        let generic = Node::subscript(
            Node::ident("Dict"),
            Node::list(vec![Node::ident("str"), Node::ident("int")]),
        );
        assert_eq!(
            InferredType::from_annotation(&generic),
            Some(InferredType::map_of(InferredType::Text, InferredType::Integer))
        );
        assert_eq!(InferredType::from_annotation(&Node::ident("Point")), None);
    }

    #[test]
    fn test_imports() {
        let mut imports = BTreeSet::new();
        InferredType::list_of(InferredType::map_of(InferredType::Text, InferredType::Text))
            .collect_imports(&mut imports);
        assert_eq!(
            imports.into_iter().collect::<Vec<_>>(),
            vec!["java.util.List", "java.util.Map"]
        );
    }
}
