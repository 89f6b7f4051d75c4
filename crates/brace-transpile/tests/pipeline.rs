//! End-to-end conversions from Python source.

use brace_syntax::{Node, NodeKind, PYTHON_READER, Reader};
use brace_transpile::infer::infer;
use brace_transpile::{
    Config, ConstructKey, ConversionCache, DiagnosticCode, Diagnostics, HookContext, HookOutcome,
    InferredType, MappingEntry, MappingTable, Pipeline, PluginChain, PluginError, ScopeKind,
    Template,
};
use std::sync::Arc;

fn pipeline() -> Pipeline {
    Pipeline::new(Config::default(), PluginChain::empty()).unwrap()
}

fn convert(source: &str) -> brace_transpile::Conversion {
    pipeline().convert_source(source, &PYTHON_READER).unwrap()
}

fn rename_x(to: &'static str) -> impl Fn(&Node, &HookContext<'_>) -> Result<HookOutcome<Node>, PluginError> + Send + Sync {
    move |node: &Node, _: &HookContext<'_>| match &node.kind {
        NodeKind::Identifier { name } if name == "x" => {
            let mut next = node.clone();
            next.kind = NodeKind::Identifier { name: to.into() };
            Ok(HookOutcome::Replace(next))
        }
        _ => Ok(HookOutcome::Keep),
    }
}

#[test]
fn test_class_with_initializer() {
    let source = "\
class Counter:
    def __init__(self, start: int):
        self.count = start

    def increment(self) -> int:
        self.count += 1
        return self.count
";
    let out = convert(source);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    insta::assert_snapshot!(out.text, @r"
    package generated;

    public class Counter {
        public int count;

        public Counter(int start) {
            this.count = start;
        }

        public int increment() {
            this.count += 1;
            return this.count;
        }
    }
    ");
}

#[test]
fn test_access_modifiers_follow_config() {
    let config = Config {
        add_access_modifiers: false,
        ..Config::default()
    };
    let pipeline = Pipeline::new(config, PluginChain::empty()).unwrap();
    let out = pipeline
        .convert_source(
            "class Box:\n    def __init__(self):\n        self.size = 3\n",
            &PYTHON_READER,
        )
        .unwrap();
    assert!(out.text.contains("class Box {"));
    assert!(out.text.contains("    int size;"));
    assert!(out.text.contains("    Box() {"));
    assert!(!out.text.contains("public"));
}

#[test]
fn test_len_selects_accessor_by_type() {
    let out = convert("name = 'abc'\nitems = [1, 2]\nn = len(name)\nm = len(items)\n");
    assert!(out.text.contains("int n = name.length();"));
    assert!(out.text.contains("int m = items.size();"));
    assert!(out.diagnostics.is_empty());
}

#[test]
fn test_empty_list_then_int_list_widens() {
    let config = Config::default();
    let mapping = MappingTable::builtin();
    let plugins = PluginChain::empty();
    let module_type = |source: &str| {
        let tree = PYTHON_READER.read(source).unwrap();
        let mut diags = Diagnostics::new();
        let table = infer(tree.root(), &config, &mapping, &plugins, &mut diags);
        let module = table
            .scopes()
            .iter()
            .position(|s| s.kind == ScopeKind::Module)
            .unwrap();
        let binding = table.binding(module, "xs").unwrap().clone();
        (binding, diags)
    };

    let (empty, diags) = module_type("xs = []\n");
    assert_eq!(empty.ty, InferredType::list_of(InferredType::ObjectUnknown));
    assert!(!empty.widened);
    assert!(diags.is_empty());

    let (widened, diags) = module_type("xs = []\nxs = [1, 2]\n");
    assert_eq!(widened.ty, InferredType::ObjectUnknown);
    assert!(widened.widened);
    assert_eq!(diags.count(DiagnosticCode::TypeWidened), 1);
}

#[test]
fn test_widening_never_narrows_again() {
    let out = convert("x = 1\nx = 'one'\nx = 2\nx = 3\n");
    assert!(out.text.contains("Object x = 1;\nx = \"one\";\nx = 2;\nx = 3;\n"));
    assert_eq!(out.diagnostics.count(DiagnosticCode::TypeWidened), 1);
}

#[test]
fn test_inference_disabled_renders_object() {
    let config = Config {
        enable_type_inference: false,
        ..Config::default()
    };
    let pipeline = Pipeline::new(config, PluginChain::empty()).unwrap();
    let out = pipeline
        .convert_source("count = 1\nlabel = 'a'\n", &PYTHON_READER)
        .unwrap();
    assert!(out.text.contains("Object count = 1;"));
    assert!(out.text.contains("Object label = \"a\";"));
    assert!(out.diagnostics.is_empty());
}

#[test]
fn test_unmapped_construct_reported_once_with_span() {
    let out = convert("a = [1]\nb = [2]\npairs = zip(a, b)\n");
    assert!(out.text.contains("zip(a, b) /* unmapped */"));
    let unmapped: Vec<_> = out
        .diagnostics
        .iter()
        .filter(|d| d.code == DiagnosticCode::UnmappedConstruct)
        .collect();
    assert_eq!(unmapped.len(), 1);
    let span = unmapped[0].span.unwrap();
    assert_eq!((span.line, span.column), (3, 8));
}

#[test]
fn test_plugin_fault_leaves_baseline_output() {
    let source = "x = 41\nprint(x)\n";
    let baseline = convert(source);

    let mut builder = PluginChain::builder();
    builder.before_render("broken", 0, |node: &Node, _: &HookContext<'_>| {
        if matches!(node.kind, NodeKind::ExprStmt { .. }) {
            Err(PluginError::new("no handler for statements"))
        } else {
            Ok(HookOutcome::Keep)
        }
    });
    let faulty = Pipeline::new(Config::default(), builder.build())
        .unwrap()
        .convert_source(source, &PYTHON_READER)
        .unwrap();

    assert_eq!(faulty.text, baseline.text);
    assert_eq!(faulty.diagnostics.count(DiagnosticCode::PluginFault), 1);
    let fault = faulty.diagnostics.iter().next().unwrap();
    assert_eq!(fault.span.map(|s| s.line), Some(2));
}

#[test]
fn test_equal_priority_conflict_is_deterministic() {
    let mut builder = PluginChain::builder();
    builder.before_render("first", 0, rename_x("first"));
    builder.before_render("second", 0, rename_x("second"));
    let pipeline = Pipeline::new(Config::default(), builder.build()).unwrap();
    let tree = PYTHON_READER.read("print(x)\n").unwrap();
    for _ in 0..5 {
        let (text, diags) = pipeline.run(&tree).unwrap();
        assert!(text.contains("System.out.println(second);"));
        assert_eq!(diags.count(DiagnosticCode::PluginConflict), 1);
    }
}

#[test]
fn test_plugin_mapping_overrides_builtin() {
    let mut builder = PluginChain::builder();
    builder.mapping_entry(
        MappingEntry::new(ConstructKey::builtin("print"), Template::new("log.info({0})")).arity(1),
    );
    let pipeline = Pipeline::new(Config::default(), builder.build()).unwrap();
    let out = pipeline
        .convert_source("print('hi')\nprint()\n", &PYTHON_READER)
        .unwrap();
    assert!(out.text.contains("log.info(\"hi\");"));
    assert!(out.text.contains("System.out.println();"));
}

#[test]
fn test_cache_returns_identical_text() {
    let pipeline = pipeline();
    let source = "total = 0\nfor i in range(10):\n    total += i\n";
    let first = pipeline.convert_source(source, &PYTHON_READER).unwrap();
    let second = pipeline.convert_source(source, &PYTHON_READER).unwrap();
    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.text, second.text);
    assert_eq!(first.diagnostics, second.diagnostics);

    let stats = pipeline.cache().stats();
    assert_eq!((stats.hits, stats.misses, stats.len), (1, 1, 1));
}

#[test]
fn test_shared_cache_never_mixes_configurations() {
    let cache = Arc::new(ConversionCache::new(16));
    let four = pipeline().with_cache(Arc::clone(&cache));
    let two = Pipeline::new(
        Config {
            indent_size: 2,
            ..Config::default()
        },
        PluginChain::empty(),
    )
    .unwrap()
    .with_cache(Arc::clone(&cache));

    let source = "while True:\n    break\n";
    let a = four.convert_source(source, &PYTHON_READER).unwrap();
    let b = two.convert_source(source, &PYTHON_READER).unwrap();
    assert!(a.text.contains("\n    break;\n"));
    assert!(b.text.contains("\n  break;\n"));
    assert!(!b.cached);
}

#[test]
fn test_read_errors_are_not_cached() {
    let pipeline = pipeline();
    assert!(pipeline.convert_source("def broken(:\n", &PYTHON_READER).is_err());
    assert!(pipeline.cache().is_empty());
}

#[test]
fn test_while_condition_recomputed_each_iteration() {
    let out = convert("xs = [1]\nwhile sum(xs) < 10:\n    xs.append(1)\n");
    let text = &out.text;
    assert!(!text.contains("while (__tmp0"), "{text}");
    let header = text.find("while (true) {").unwrap();
    let accumulate = text.find("__tmp0 += ").unwrap();
    let exit = text.find("break;").unwrap();
    let append = text.find("xs.add(1);").unwrap();
    assert!(header < accumulate && accumulate < exit && exit < append, "{text}");
}

#[test]
fn test_elif_prelude_runs_after_earlier_tests() {
    let out = convert(
        "xs = [1, 2]\nif len(xs) > 3:\n    print(1)\nelif sum(xs) > 2:\n    print(2)\nelse:\n    print(3)\n",
    );
    let text = &out.text;
    let first_test = text.find("if ((xs.size()").or_else(|| text.find("if (xs.size()")).unwrap();
    let accumulate = text.find("__tmp0 += ").unwrap();
    assert!(first_test < accumulate, "{text}");
    assert!(!text.contains("else if"), "{text}");
    assert!(text.contains("System.out.println(3);"));
}

#[test]
fn test_subscript_aug_assign_renders_index_once() {
    let out = convert("counts = [0, 0]\nxs = [1]\ncounts[sum(xs)] += 1\n");
    assert!(
        out.text.contains("counts.set(__tmp0, (counts.get(__tmp0) + 1));"),
        "{}",
        out.text
    );
    assert_eq!(out.diagnostics.count(DiagnosticCode::UnmappedConstruct), 1);
    assert!(!out.text.contains("__tmp2"));
}

#[test]
fn test_repeated_range_loops_each_declare() {
    let out = convert("for i in range(3):\n    print(i)\nfor i in range(5):\n    print(i)\n");
    assert!(out.text.contains("for (int i = 0; i < 3; i++) {"));
    assert!(out.text.contains("for (int i = 0; i < 5; i++) {"));
}

#[test]
fn test_double_negation_stays_negation() {
    let out = convert("x = 1\ny = -(-x)\n");
    assert!(out.text.contains("int y = -(-x);"), "{}", out.text);
    assert!(!out.text.contains("--"));
}

#[test]
fn test_signed_and_collection_defaults_type_parameters() {
    let out = convert("def f(a=-1, b=[], c=+2.5):\n    return a\n");
    assert!(
        out.text.contains("f(int a, List<Object> b, double c) {"),
        "{}",
        out.text
    );
}

#[test]
fn test_render_hooks_see_class_fields() {
    let mut builder = PluginChain::builder();
    builder.after_render("tag", 0, |fragment: &String, _: &HookContext<'_>| {
        if fragment.trim_start().starts_with("public int limit") {
            Ok(HookOutcome::Replace(format!("{fragment} // tagged")))
        } else {
            Ok(HookOutcome::Keep)
        }
    });
    let pipeline = Pipeline::new(Config::default(), builder.build()).unwrap();
    let out = pipeline
        .convert_source("class Settings:\n    limit = 10\n", &PYTHON_READER)
        .unwrap();
    assert!(out.text.contains("    public int limit = 10; // tagged\n"), "{}", out.text);
}

#[test]
fn test_user_function_shadows_builtin() {
    let out = convert("def sum(xs):\n    return 0\n\ntotal = sum([1, 2])\n");
    assert!(out.text.contains("int total = sum("), "{}", out.text);
    assert!(!out.text.contains("__tmp"));
    assert_eq!(out.diagnostics.count(DiagnosticCode::UnmappedConstruct), 0);
}

#[test]
fn test_conversion_reports_elapsed_time() {
    let pipeline = pipeline();
    let out = pipeline.convert_source("x = 1\n", &PYTHON_READER).unwrap();
    assert!(out.elapsed > std::time::Duration::ZERO);
    assert_eq!(pipeline.cache().stats().computed, 1);
}
