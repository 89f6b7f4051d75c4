//! Templates for origin constructs.
//!
//! A [`MappingTable`] answers "how does this builtin / method / operator look
//! in the target dialect". Entries are grouped by [`ConstructKey`]; within a
//! key the most specific [`Selector`] that matches the call site wins, and a
//! later entry beats an earlier one of equal specificity, so plugin entries
//! override built-ins.

use crate::types::InferredType;
use brace_syntax::{BinOp, CmpOp, ComprehensionKind, UnaryOp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a template is for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstructKey {
    /// Call of a builtin name, e.g. `len(x)`.
    Builtin(String),
    /// Method call, e.g. `s.upper()`.
    Method(String),
    Binary(BinOp),
    Unary(UnaryOp),
    Compare(CmpOp),
    /// Dunder method definition name, e.g. `__str__`.
    MagicMethod(String),
    /// f-string.
    Interpolation,
    Comprehension(ComprehensionKind),
}

impl ConstructKey {
    pub fn builtin(name: &str) -> Self {
        ConstructKey::Builtin(name.to_string())
    }

    pub fn method(name: &str) -> Self {
        ConstructKey::Method(name.to_string())
    }

    pub fn magic(name: &str) -> Self {
        ConstructKey::MagicMethod(name.to_string())
    }
}

/// Coarse classification of the operand a selector tests.
///
/// Which operand is tested depends on the construct: the first argument of a
/// builtin, the receiver of a method, the left side of a binary operator, the
/// container (right side) of `in`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandKind {
    #[default]
    Any,
    Text,
    Numeric,
    List,
    Map,
}

impl OperandKind {
    pub fn matches(self, ty: &InferredType) -> bool {
        match self {
            OperandKind::Any => true,
            OperandKind::Text => matches!(ty, InferredType::Text),
            OperandKind::Numeric => ty.is_numeric(),
            OperandKind::List => matches!(ty, InferredType::ListOf(_)),
            OperandKind::Map => matches!(ty, InferredType::MapOf(..)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
    /// Exact argument count, or any.
    pub arity: Option<usize>,
    pub operand: OperandKind,
}

impl Selector {
    fn matches(&self, arity: usize, operand: &InferredType) -> bool {
        self.arity.is_none_or(|n| n == arity) && self.operand.matches(operand)
    }

    fn specificity(&self) -> u8 {
        u8::from(self.arity.is_some()) + u8::from(self.operand != OperandKind::Any)
    }
}

/// Target-dialect text with placeholders.
///
/// `{0}`, `{1}`, … are positional operands, `{args}` is all operands joined
/// with `, `, and any other `{name}` is looked up in the named values passed
/// to [`Template::apply`] (`{recv}` for method receivers, `{format}` for
/// interpolation). Unknown placeholders are kept literally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub pattern: String,
    #[serde(default)]
    pub returns: Option<InferredType>,
    #[serde(default)]
    pub imports: Vec<String>,
}

impl Template {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            returns: None,
            imports: Vec::new(),
        }
    }

    pub fn returning(mut self, ty: InferredType) -> Self {
        self.returns = Some(ty);
        self
    }

    pub fn importing(mut self, path: &str) -> Self {
        self.imports.push(path.to_string());
        self
    }

    pub fn apply(&self, operands: &[String], named: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.pattern.len() + 16);
        let mut rest = self.pattern.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                return out;
            };
            let name = &after[..close];
            match self.substitute(name, operands, named) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            }
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        out
    }

    fn substitute(&self, name: &str, operands: &[String], named: &[(&str, &str)]) -> Option<String> {
        if name == "args" {
            return Some(operands.join(", "));
        }
        if let Ok(index) = name.parse::<usize>() {
            return operands.get(index).cloned();
        }
        named
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub key: ConstructKey,
    #[serde(default)]
    pub selector: Selector,
    pub template: Template,
}

impl MappingEntry {
    pub fn new(key: ConstructKey, template: Template) -> Self {
        Self {
            key,
            selector: Selector::default(),
            template,
        }
    }

    pub fn arity(mut self, arity: usize) -> Self {
        self.selector.arity = Some(arity);
        self
    }

    pub fn operand(mut self, operand: OperandKind) -> Self {
        self.selector.operand = operand;
        self
    }

    pub fn returning(mut self, ty: InferredType) -> Self {
        self.template = self.template.returning(ty);
        self
    }

    pub fn importing(mut self, path: &str) -> Self {
        self.template = self.template.importing(path);
        self
    }
}

/// Keyed registry of templates. Immutable once a pipeline is built.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    entries: HashMap<ConstructKey, Vec<MappingEntry>>,
}

impl MappingTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for entry in builtin_entries() {
            table.insert(entry);
        }
        table
    }

    /// Built-ins followed by `extra`, which take precedence on ties.
    pub fn with_entries(extra: impl IntoIterator<Item = MappingEntry>) -> Self {
        let mut table = Self::builtin();
        for entry in extra {
            table.insert(entry);
        }
        table
    }

    pub fn insert(&mut self, entry: MappingEntry) {
        self.entries.entry(entry.key.clone()).or_default().push(entry);
    }

    pub fn lookup(
        &self,
        key: &ConstructKey,
        arity: usize,
        operand: &InferredType,
    ) -> Option<&Template> {
        self.entries
            .get(key)?
            .iter()
            .filter(|e| e.selector.matches(arity, operand))
            // max_by_key keeps the last of equal maxima: later entries win.
            .max_by_key(|e| e.selector.specificity())
            .map(|e| &e.template)
    }

    pub fn contains(&self, key: &ConstructKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reductions rendered as an explicit accumulator loop when unmapped.
pub const REDUCTIONS: &[&str] = &["sum", "any", "all", "max", "min"];

/// Names of the origin language's builtin functions.
///
/// A call to one of these with no matching template is an unmapped
/// construct; a call to any other name is a user function.
pub const ORIGIN_BUILTINS: &[&str] = &[
    "abs", "all", "any", "bin", "bool", "callable", "chr", "dict", "divmod", "enumerate",
    "filter", "float", "format", "frozenset", "getattr", "hasattr", "hash", "hex", "id",
    "input", "int", "isinstance", "issubclass", "iter", "len", "list", "map", "max", "min",
    "next", "oct", "open", "ord", "pow", "print", "range", "repr", "reversed", "round", "set",
    "setattr", "slice", "sorted", "str", "sum", "tuple", "type", "vars", "zip",
];

pub fn is_origin_builtin(name: &str) -> bool {
    ORIGIN_BUILTINS.contains(&name)
}

const LIST: &str = "java.util.List";
const ARRAY_LIST: &str = "java.util.ArrayList";
const MAP: &str = "java.util.Map";
const HASH_MAP: &str = "java.util.HashMap";
const ARRAYS: &str = "java.util.Arrays";
const INT_STREAM: &str = "java.util.stream.IntStream";

fn builtin_entries() -> Vec<MappingEntry> {
    use InferredType::*;
    use OperandKind as Op;

    let b = |name: &str, pattern: &str| MappingEntry::new(ConstructKey::builtin(name), Template::new(pattern));
    let m = |name: &str, pattern: &str| MappingEntry::new(ConstructKey::method(name), Template::new(pattern));
    let magic = |name: &str, target: &str| MappingEntry::new(ConstructKey::magic(name), Template::new(target));
    let bin = |op: BinOp, pattern: &str| MappingEntry::new(ConstructKey::Binary(op), Template::new(pattern));
    let cmp = |op: CmpOp, pattern: &str| {
        MappingEntry::new(ConstructKey::Compare(op), Template::new(pattern)).returning(Boolean)
    };
    let un = |op: UnaryOp, pattern: &str| MappingEntry::new(ConstructKey::Unary(op), Template::new(pattern));

    vec![
        // Console output.
        b("print", "System.out.println({spaced})"),
        b("print", "System.out.println({0})").arity(1),
        b("print", "System.out.println()").arity(0),
        // Sizes: character count for text, element count otherwise.
        b("len", "{0}.size()").arity(1).returning(Integer),
        b("len", "{0}.length()").arity(1).operand(Op::Text).returning(Integer),
        // Ranges outside a `for` header.
        b("range", "IntStream.range(0, {0})").arity(1).importing(INT_STREAM),
        b("range", "IntStream.range({0}, {1})").arity(2).importing(INT_STREAM),
        b("range", "IntStream.iterate({0}, i -> i < {1}, i -> i + {2})")
            .arity(3)
            .importing(INT_STREAM),
        // Math.
        b("abs", "Math.abs({0})").arity(1).operand(Op::Numeric),
        b("round", "Math.round({0})").arity(1).returning(Integer),
        b("max", "Math.max({0}, {1})").arity(2),
        b("min", "Math.min({0}, {1})").arity(2),
        b("pow", "Math.pow({0}, {1})").arity(2).returning(Float),
        // Constructors with declared result types.
        b("int", "(int) ({0})").arity(1).returning(Integer),
        b("int", "Integer.parseInt({0})").arity(1).operand(Op::Text).returning(Integer),
        b("float", "(double) ({0})").arity(1).returning(Float),
        b("float", "Double.parseDouble({0})").arity(1).operand(Op::Text).returning(Float),
        b("str", "String.valueOf({0})").arity(1).returning(Text),
        b("str", "\"\"").arity(0).returning(Text),
        b("bool", "Boolean.valueOf({0})").arity(1).returning(Boolean),
        b("list", "new ArrayList<>()")
            .arity(0)
            .returning(InferredType::list_of(ObjectUnknown))
            .importing(ARRAY_LIST),
        b("list", "new ArrayList<>({0})")
            .arity(1)
            .returning(InferredType::list_of(ObjectUnknown))
            .importing(ARRAY_LIST),
        b("dict", "new HashMap<>()")
            .arity(0)
            .returning(InferredType::map_of(ObjectUnknown, ObjectUnknown))
            .importing(HASH_MAP),
        // String methods.
        m("upper", "{recv}.toUpperCase()").arity(0).returning(Text),
        m("lower", "{recv}.toLowerCase()").arity(0).returning(Text),
        m("strip", "{recv}.trim()").arity(0).returning(Text),
        m("startswith", "{recv}.startsWith({0})").arity(1).returning(Boolean),
        m("endswith", "{recv}.endsWith({0})").arity(1).returning(Boolean),
        m("replace", "{recv}.replace({0}, {1})").arity(2).returning(Text),
        m("split", "Arrays.asList({recv}.split(\"\\\\s+\"))")
            .arity(0)
            .returning(InferredType::list_of(Text))
            .importing(ARRAYS),
        m("split", "Arrays.asList({recv}.split({0}))")
            .arity(1)
            .returning(InferredType::list_of(Text))
            .importing(ARRAYS),
        m("join", "String.join({recv}, {0})").arity(1).returning(Text),
        m("find", "{recv}.indexOf({0})").arity(1).operand(Op::Text).returning(Integer),
        // Collection methods.
        m("append", "{recv}.add({0})").arity(1),
        m("extend", "{recv}.addAll({0})").arity(1),
        m("insert", "{recv}.add({0}, {1})").arity(2),
        m("pop", "{recv}.remove({recv}.size() - 1)").arity(0),
        m("pop", "{recv}.remove({0})").arity(1),
        m("remove", "{recv}.remove({0})").arity(1),
        m("clear", "{recv}.clear()").arity(0),
        m("copy", "new ArrayList<>({recv})").arity(0).operand(Op::List).importing(ARRAY_LIST),
        m("copy", "new HashMap<>({recv})").arity(0).operand(Op::Map).importing(HASH_MAP),
        m("index", "{recv}.indexOf({0})").arity(1).returning(Integer),
        m("count", "Collections.frequency({recv}, {0})")
            .arity(1)
            .operand(Op::List)
            .returning(Integer)
            .importing("java.util.Collections"),
        m("keys", "{recv}.keySet()").arity(0),
        m("values", "{recv}.values()").arity(0),
        m("items", "{recv}.entrySet()").arity(0),
        m("get", "{recv}.get({0})").arity(1),
        m("get", "{recv}.getOrDefault({0}, {1})").arity(2),
        // Dunder methods renamed at their definition.
        magic("__str__", "toString").returning(Text),
        magic("__repr__", "toString").returning(Text),
        magic("__eq__", "equals").returning(Boolean),
        magic("__hash__", "hashCode").returning(Integer),
        magic("__len__", "size").returning(Integer),
        magic("__getitem__", "get"),
        magic("__setitem__", "set"),
        magic("__contains__", "contains").returning(Boolean),
        magic("__iter__", "iterator"),
        magic("__next__", "next"),
        magic("__lt__", "compareTo"),
        magic("__add__", "plus"),
        magic("__sub__", "minus"),
        magic("__mul__", "multiply"),
        magic("__truediv__", "divide"),
        // Operators. Every binary form carries its own parentheses.
        bin(BinOp::Add, "({0} + {1})"),
        bin(BinOp::Sub, "({0} - {1})"),
        bin(BinOp::Mul, "({0} * {1})"),
        bin(BinOp::Mul, "{0}.repeat({1})").operand(Op::Text).returning(Text),
        bin(BinOp::Div, "({0} / {1})"),
        bin(BinOp::Mod, "({0} % {1})"),
        bin(BinOp::FloorDiv, "Math.floorDiv({0}, {1})"),
        bin(BinOp::Pow, "Math.pow({0}, {1})").returning(Float),
        bin(BinOp::BitAnd, "({0} & {1})"),
        bin(BinOp::BitOr, "({0} | {1})"),
        bin(BinOp::BitXor, "({0} ^ {1})"),
        bin(BinOp::LShift, "({0} << {1})"),
        bin(BinOp::RShift, "({0} >> {1})"),
        bin(BinOp::And, "({0} && {1})").returning(Boolean),
        bin(BinOp::Or, "({0} || {1})"),
        cmp(CmpOp::Eq, "({0} == {1})"),
        cmp(CmpOp::Eq, "{0}.equals({1})").operand(Op::Text),
        cmp(CmpOp::NotEq, "({0} != {1})"),
        cmp(CmpOp::NotEq, "!{0}.equals({1})").operand(Op::Text),
        cmp(CmpOp::Lt, "({0} < {1})"),
        cmp(CmpOp::LtE, "({0} <= {1})"),
        cmp(CmpOp::Gt, "({0} > {1})"),
        cmp(CmpOp::GtE, "({0} >= {1})"),
        cmp(CmpOp::In, "{1}.contains({0})"),
        cmp(CmpOp::In, "{1}.containsKey({0})").operand(Op::Map),
        cmp(CmpOp::NotIn, "!{1}.contains({0})"),
        cmp(CmpOp::NotIn, "!{1}.containsKey({0})").operand(Op::Map),
        cmp(CmpOp::Is, "({0} == {1})"),
        cmp(CmpOp::IsNot, "({0} != {1})"),
        un(UnaryOp::Neg, "-{0}"),
        un(UnaryOp::Pos, "+{0}"),
        un(UnaryOp::Not, "!{0}").returning(Boolean),
        un(UnaryOp::Invert, "~{0}"),
        // Interpolation: `%s` per interpolated part, left to right.
        MappingEntry::new(
            ConstructKey::Interpolation,
            Template::new("String.format({format}, {args})").returning(Text),
        ),
        // List comprehensions become an accumulator loop; the template is the
        // accumulator's initial value.
        MappingEntry::new(
            ConstructKey::Comprehension(ComprehensionKind::List),
            Template::new("new ArrayList<>()")
                .importing(LIST)
                .importing(ARRAY_LIST),
        ),
    ]
}

/// Collection imports used by literal construction.
pub(crate) const LIST_IMPORTS: [&str; 2] = [LIST, ARRAY_LIST];
pub(crate) const MAP_IMPORTS: [&str; 2] = [MAP, HASH_MAP];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_selects_by_operand_type() {
        let table = MappingTable::builtin();
        let key = ConstructKey::builtin("len");
        let text = table.lookup(&key, 1, &InferredType::Text).unwrap();
        assert_eq!(text.apply(&["name".into()], &[]), "name.length()");
        let list = table
            .lookup(&key, 1, &InferredType::list_of(InferredType::Integer))
            .unwrap();
        assert_eq!(list.apply(&["xs".into()], &[]), "xs.size()");
        let unknown = table.lookup(&key, 1, &InferredType::ObjectUnknown).unwrap();
        assert_eq!(unknown.pattern, "{0}.size()");
    }

    #[test]
    fn test_arity_selects_entry() {
        let table = MappingTable::builtin();
        let key = ConstructKey::builtin("max");
        assert!(table.lookup(&key, 1, &InferredType::ObjectUnknown).is_none());
        assert!(table.lookup(&key, 2, &InferredType::Integer).is_some());
    }

    #[test]
    fn test_later_entry_overrides_on_tie() {
        let table = MappingTable::with_entries([MappingEntry::new(
            ConstructKey::builtin("print"),
            Template::new("log.info({0})"),
        )
        .arity(1)]);
        let key = ConstructKey::builtin("print");
        let template = table.lookup(&key, 1, &InferredType::Text).unwrap();
        assert_eq!(template.pattern, "log.info({0})");
        // Other arities still use the built-in entries.
        let template = table.lookup(&key, 0, &InferredType::ObjectUnknown).unwrap();
        assert_eq!(template.pattern, "System.out.println()");
    }

    #[test]
    fn test_apply_placeholders() {
        let template = Template::new("{recv}.getOrDefault({0}, {1}) /* {missing} */");
        assert_eq!(
            template.apply(&["k".into(), "0".into()], &[("recv", "counts")]),
            "counts.getOrDefault(k, 0) /* {missing} */"
        );
        let format = Template::new("String.format({format}, {args})");
        assert_eq!(
            format.apply(&["a".into(), "b".into()], &[("format", "\"%s-%s\"")]),
            "String.format(\"%s-%s\", a, b)"
        );
    }

    #[test]
    fn test_unmapped_builtins() {
        let table = MappingTable::builtin();
        for name in ["sum", "zip", "sorted", "enumerate"] {
            assert!(is_origin_builtin(name));
            assert!(!table.contains(&ConstructKey::builtin(name)));
        }
        assert!(!is_origin_builtin("compute_total"));
        assert!(!table.contains(&ConstructKey::Comprehension(ComprehensionKind::Generator)));
    }
}
