//! The conversion pipeline.
//!
//! ```text
//! SyntaxTree ─▶ BeforeInference hooks ─▶ fold (opt-in) ─▶ infer ─▶ render ─▶ text
//!                                                                  ▲
//!                                                 mapping table + render hooks
//! ```
//!
//! Each conversion owns its tree copy, type table and diagnostics; the
//! pipeline itself is shared read-only and only the cache is mutated.

use crate::cache::{ContextKey, ConversionCache, Fingerprint};
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::error::ConvertError;
use crate::fold::fold_constants;
use crate::infer::infer;
use crate::mapping::MappingTable;
use crate::plugin::{ExtensionPoint, HookContext, PluginChain};
use crate::render::render;
use brace_syntax::{Node, NodeId, NodeKind, Reader, Span, SyntaxTree, validate};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Output of one conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub text: String,
    pub diagnostics: Diagnostics,
    /// Served from the cache.
    pub cached: bool,
    /// Wall time of the call, including cache lookup.
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
    plugins: PluginChain,
    mapping: MappingTable,
    cache: Arc<ConversionCache>,
    context: ContextKey,
}

impl Pipeline {
    /// Validate `config` and prepare a pipeline with its own cache.
    pub fn new(config: Config, plugins: PluginChain) -> Result<Self, ConvertError> {
        config.validate()?;
        let mapping = MappingTable::with_entries(plugins.mapping_entries().iter().cloned());
        let cache = Arc::new(ConversionCache::new(config.cache_capacity));
        let context = ContextKey::compute(&config, &plugins);
        tracing::debug!(
            plugins = plugins.plugins().len(),
            mappings = mapping.len(),
            cache_capacity = config.cache_capacity,
            "pipeline ready"
        );
        Ok(Self {
            config,
            plugins,
            mapping,
            cache,
            context,
        })
    }

    /// Share `cache` with other pipelines.
    pub fn with_cache(mut self, cache: Arc<ConversionCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn plugins(&self) -> &PluginChain {
        &self.plugins
    }

    pub fn mapping(&self) -> &MappingTable {
        &self.mapping
    }

    pub fn cache(&self) -> &Arc<ConversionCache> {
        &self.cache
    }

    /// Convert a validated tree. The cache key is the tree's JSON encoding.
    pub fn convert(&self, tree: &SyntaxTree) -> Result<Conversion, ConvertError> {
        let fingerprint = Fingerprint::compute(tree.to_json().as_bytes(), &self.context);
        self.cached(fingerprint, || self.run(tree))
    }

    /// Read `source` with `reader` and convert it. The cache key is the raw
    /// source, so a hit skips reading entirely.
    pub fn convert_source(&self, source: &str, reader: &dyn Reader) -> Result<Conversion, ConvertError> {
        let fingerprint = Fingerprint::compute(source.as_bytes(), &self.context);
        self.cached(fingerprint, || {
            let tree = reader.read(source)?;
            self.run(&tree)
        })
    }

    fn cached(
        &self,
        fingerprint: Fingerprint,
        compute: impl FnOnce() -> Result<(String, Diagnostics), ConvertError>,
    ) -> Result<Conversion, ConvertError> {
        let started = Instant::now();
        self.cache.bind_context(self.context);
        let (entry, cached) = self.cache.get_or_compute(fingerprint, compute)?;
        Ok(Conversion {
            text: entry.text.clone(),
            diagnostics: entry.diagnostics.clone(),
            cached,
            elapsed: started.elapsed(),
        })
    }

    /// Run every stage without consulting the cache.
    pub fn run(&self, tree: &SyntaxTree) -> Result<(String, Diagnostics), ConvertError> {
        let mut diags = Diagnostics::new();
        let mut root = tree.root().clone();

        if self.plugins.has_hooks(ExtensionPoint::BeforeInference) {
            root = self.before_inference(root, &mut diags);
            assign_ids(&mut root);
            validate(&root)?;
        }
        tracing::debug!(nodes = root.size(), "tree prepared");

        if self.config.fold_constants {
            let folded = fold_constants(&mut root);
            tracing::debug!(folded, "constants folded");
        }

        let types = infer(&root, &self.config, &self.mapping, &self.plugins, &mut diags);
        let text = render(&root, &types, &self.mapping, &self.plugins, &self.config, &mut diags);
        tracing::debug!(
            bytes = text.len(),
            diagnostics = diags.len(),
            "conversion finished"
        );
        Ok((text, diags))
    }

    /// Top-down: a replacement's children are visited, not the original's.
    fn before_inference(&self, node: Node, diags: &mut Diagnostics) -> Node {
        let ctx = HookContext::new(ExtensionPoint::BeforeInference, &self.config);
        let mut node = self.plugins.before_inference(node, &ctx, diags);
        for child in node.children_mut() {
            let placeholder = Node::synthetic(NodeKind::Pass, Span::default());
            let original = std::mem::replace(child, placeholder);
            *child = self.before_inference(original, diags);
        }
        node
    }
}

/// Give plugin-created nodes real ids.
fn assign_ids(node: &mut Node) {
    if node.id.is_synthetic() {
        node.id = NodeId::fresh();
    }
    for child in node.children_mut() {
        assign_ids(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::HookOutcome;

    fn tree(body: Vec<Node>) -> SyntaxTree {
        SyntaxTree::new(Node::module(body)).unwrap()
    }

    #[test]
    fn test_pipeline_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Pipeline>();
        assert_send_sync::<Conversion>();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = Config {
            indent_size: 0,
            ..Config::default()
        };
        let err = Pipeline::new(config, PluginChain::empty()).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn test_second_conversion_is_cached() {
        let pipeline = Pipeline::new(Config::default(), PluginChain::empty()).unwrap();
        let input = tree(vec![Node::assign(Node::ident("x"), Node::int(1))]);
        let first = pipeline.convert(&input).unwrap();
        let second = pipeline.convert(&input).unwrap();
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.text, second.text);
    }

    #[test]
    fn test_folding_only_when_enabled() {
        let body = || vec![Node::assign(Node::ident("x"), Node::binary(Node::int(1), brace_syntax::BinOp::Add, Node::int(2)))];
        let plain = Pipeline::new(Config::default(), PluginChain::empty()).unwrap();
        assert!(plain.convert(&tree(body())).unwrap().text.contains("int x = (1 + 2);"));

        let config = Config {
            fold_constants: true,
            ..Config::default()
        };
        let folding = Pipeline::new(config, PluginChain::empty()).unwrap();
        assert!(folding.convert(&tree(body())).unwrap().text.contains("int x = 3;"));
    }

    #[test]
    fn test_before_inference_replacement_gets_fresh_ids() {
        let mut builder = PluginChain::builder();
        builder.before_inference("rename", 0, |node: &Node, _ctx: &HookContext<'_>| {
            match &node.kind {
                NodeKind::Identifier { name } if name == "old" => Ok(HookOutcome::Replace(
                    Node::synthetic(NodeKind::Identifier { name: "renamed".into() }, node.span),
                )),
                _ => Ok(HookOutcome::Keep),
            }
        });
        let pipeline = Pipeline::new(Config::default(), builder.build()).unwrap();
        let input = tree(vec![
            Node::assign(Node::ident("old"), Node::int(1)),
            Node::expr_stmt(Node::call_name("print", vec![Node::ident("old")])),
        ]);
        let out = pipeline.convert(&input).unwrap();
        assert!(out.text.contains("int renamed = 1;"));
        assert!(out.text.contains("System.out.println(renamed);"));
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_replacing_root_with_non_module_fails() {
        let mut builder = PluginChain::builder();
        builder.before_inference("broken", 0, |node: &Node, _ctx: &HookContext<'_>| {
            if matches!(node.kind, NodeKind::Module { .. }) {
                Ok(HookOutcome::Replace(Node::synthetic(NodeKind::Pass, node.span)))
            } else {
                Ok(HookOutcome::Keep)
            }
        });
        let pipeline = Pipeline::new(Config::default(), builder.build()).unwrap();
        let err = pipeline.convert(&tree(vec![])).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedInput { .. }));
        assert!(pipeline.cache().is_empty());
    }
}
