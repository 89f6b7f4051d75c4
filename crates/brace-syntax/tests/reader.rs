//! Reader tests over whole Python modules.

#![cfg(feature = "read-python")]

use brace_syntax::{
    ComprehensionKind, Literal, NodeKind, ReadError, Reader, SyntaxTree, reader_for_extension,
};

fn parse(code: &str) -> SyntaxTree {
    reader_for_extension("py")
        .expect("python reader registered")
        .read(code)
        .expect("parse failed")
}

#[test]
fn class_module_structure() {
    let tree = parse(
        r#"
class Counter:
    """Counts things."""
    total = 0

    def __init__(self, start: int = 0):
        self.count = start

    @staticmethod
    def zero() -> int:
        return 0
"#,
    );
    assert_eq!(tree.body().len(), 1);
    let NodeKind::ClassDef { name, body, .. } = &tree.body()[0].kind else {
        panic!("expected ClassDef");
    };
    assert_eq!(name, "Counter");
    // docstring, field, __init__, zero
    assert_eq!(body.len(), 4);
    assert!(matches!(&body[0].kind, NodeKind::ExprStmt { value }
        if value.as_literal() == Some(&Literal::Str("Counts things.".into()))));

    let NodeKind::FunctionDef { params, .. } = &body[2].kind else {
        panic!("expected __init__");
    };
    let NodeKind::Parameter {
        name,
        annotation,
        default,
    } = &params[1].kind
    else {
        panic!("expected Parameter");
    };
    assert_eq!(name, "start");
    assert_eq!(annotation.as_ref().and_then(|a| a.as_identifier()), Some("int"));
    assert_eq!(default.as_ref().and_then(|d| d.as_literal()), Some(&Literal::Int(0)));

    let NodeKind::FunctionDef {
        decorators, returns, ..
    } = &body[3].kind
    else {
        panic!("expected zero");
    };
    assert_eq!(decorators.len(), 1);
    assert_eq!(returns.as_ref().and_then(|r| r.as_identifier()), Some("int"));
}

#[test]
fn generator_argument_and_comprehension() {
    let tree = parse("total = sum(x * 2 for x in items if x > 0)\nsquares = [n * n for n in nums]\n");
    let NodeKind::Assign { value, .. } = &tree.body()[0].kind else {
        panic!("expected Assign");
    };
    assert_eq!(value.called_name(), Some("sum"));
    let NodeKind::Call { args, .. } = &value.kind else {
        panic!("expected Call");
    };
    assert!(matches!(
        &args[0].kind,
        NodeKind::Comprehension {
            kind: ComprehensionKind::Generator,
            condition: Some(_),
            ..
        }
    ));

    let NodeKind::Assign { value, .. } = &tree.body()[1].kind else {
        panic!("expected Assign");
    };
    assert!(matches!(
        &value.kind,
        NodeKind::Comprehension {
            kind: ComprehensionKind::List,
            condition: None,
            ..
        }
    ));
}

#[test]
fn spans_point_at_source_lines() {
    let tree = parse("x = 1\n\ny = [1, 2]\n");
    assert_eq!(tree.body()[0].span.line, 1);
    assert_eq!(tree.body()[1].span.line, 3);
    assert_eq!(tree.body()[1].span.column, 0);
}

#[test]
fn keyword_arguments_are_unsupported() {
    let reader = reader_for_extension("py").unwrap();
    let err = reader.read("\n\nprint(x, end=\"\")\n").unwrap_err();
    match err {
        ReadError::Unsupported { construct, line } => {
            assert_eq!(construct, "keyword argument");
            assert_eq!(line, 3);
        }
        other => panic!("expected Unsupported, got {other:?}"),
    }
}

#[test]
fn tree_survives_json_roundtrip() {
    let tree = parse("def f(a, b=2):\n    return a + b\n");
    let back = SyntaxTree::from_json(&tree.to_json()).unwrap();
    assert_eq!(tree, back);
}
