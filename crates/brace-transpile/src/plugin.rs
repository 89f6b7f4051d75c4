//! Plugin chain: ordered hooks around inference and rendering.
//!
//! Hooks are plain function values registered per [`ExtensionPoint`]. A hook
//! sees the current value immutably and answers [`HookOutcome::Keep`] or
//! [`HookOutcome::Replace`]; replacements flow into the next hook and then
//! into the pipeline stage. Hooks never touch pipeline state directly.
//!
//! Dispatch order is ascending priority, then registration order. Within one
//! priority the last replacement wins and every overridden replacement is
//! reported as a `PluginConflict`. A hook that returns an error or panics is
//! skipped for that value and reported as a `PluginFault`.

use crate::config::Config;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::mapping::MappingEntry;
use crate::render::ScopeState;
use crate::types::InferredType;
use brace_syntax::{Node, Span};
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Where in the pipeline a hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtensionPoint {
    /// Every node, top-down, before inference. Value: the node.
    BeforeInference,
    /// Every binding as its scope closes. Value: the binding's type.
    AfterInference,
    /// Every statement and expression before it is rendered. Value: the node.
    BeforeRender,
    /// Every rendered statement and expression. Value: the rendered text.
    AfterRender,
}

/// Result of a hook invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome<T> {
    Keep,
    Replace(T),
}

/// Error a hook returns to signal that it could not handle a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct PluginError(pub String);

impl PluginError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Read-only view of the pipeline handed to hooks.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    pub point: ExtensionPoint,
    pub config: &'a Config,
    /// Renderer scope stack, innermost last. Empty outside rendering.
    pub scopes: &'a [ScopeState],
    /// The node the value belongs to: the binding's first assignment for
    /// `AfterInference`, the rendered node for `AfterRender`.
    pub node: Option<&'a Node>,
    /// Binding name for `AfterInference`.
    pub binding: Option<&'a str>,
}

impl<'a> HookContext<'a> {
    pub fn new(point: ExtensionPoint, config: &'a Config) -> Self {
        Self {
            point,
            config,
            scopes: &[],
            node: None,
            binding: None,
        }
    }

    pub fn with_scopes(mut self, scopes: &'a [ScopeState]) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_node(mut self, node: &'a Node) -> Self {
        self.node = Some(node);
        self
    }

    pub fn with_binding(mut self, name: &'a str) -> Self {
        self.binding = Some(name);
        self
    }

    /// Innermost renderer scope.
    pub fn scope(&self) -> Option<ScopeState> {
        self.scopes.last().copied()
    }
}

pub type Handler<T> =
    Arc<dyn Fn(&T, &HookContext<'_>) -> Result<HookOutcome<T>, PluginError> + Send + Sync>;

struct Hook<T> {
    plugin: String,
    priority: i32,
    seq: usize,
    handler: Handler<T>,
}

impl<T> Clone for Hook<T> {
    fn clone(&self) -> Self {
        Self {
            plugin: self.plugin.clone(),
            priority: self.priority,
            seq: self.seq,
            handler: Arc::clone(&self.handler),
        }
    }
}

/// Identity of a plugin, part of every cache fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
}

impl PluginInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A bundle of hooks and mapping entries installed together.
pub trait Plugin {
    fn info(&self) -> PluginInfo;

    /// Register this plugin's hooks and mapping entries.
    fn install(&self, builder: &mut PluginChainBuilder);
}

/// Immutable, shareable set of hooks.
#[derive(Clone, Default)]
pub struct PluginChain {
    before_inference: Vec<Hook<Node>>,
    after_inference: Vec<Hook<InferredType>>,
    before_render: Vec<Hook<Node>>,
    after_render: Vec<Hook<String>>,
    mapping: Vec<MappingEntry>,
    plugins: Vec<PluginInfo>,
}

impl std::fmt::Debug for PluginChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginChain")
            .field("plugins", &self.plugins)
            .field("before_inference", &self.before_inference.len())
            .field("after_inference", &self.after_inference.len())
            .field("before_render", &self.before_render.len())
            .field("after_render", &self.after_render.len())
            .field("mapping", &self.mapping.len())
            .finish()
    }
}

impl PluginChain {
    pub fn builder() -> PluginChainBuilder {
        PluginChainBuilder::default()
    }

    /// A chain with no hooks.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Ordered `(name, version)` of every registered plugin.
    pub fn identity(&self) -> Vec<(String, String)> {
        self.plugins
            .iter()
            .map(|p| (p.name.clone(), p.version.clone()))
            .collect()
    }

    pub fn plugins(&self) -> &[PluginInfo] {
        &self.plugins
    }

    /// Mapping entries contributed by plugins, in registration order.
    pub fn mapping_entries(&self) -> &[MappingEntry] {
        &self.mapping
    }

    pub fn has_hooks(&self, point: ExtensionPoint) -> bool {
        match point {
            ExtensionPoint::BeforeInference => !self.before_inference.is_empty(),
            ExtensionPoint::AfterInference => !self.after_inference.is_empty(),
            ExtensionPoint::BeforeRender => !self.before_render.is_empty(),
            ExtensionPoint::AfterRender => !self.after_render.is_empty(),
        }
    }

    pub fn before_inference(
        &self,
        node: Node,
        ctx: &HookContext<'_>,
        diags: &mut Diagnostics,
    ) -> Node {
        let span = node.span;
        dispatch(&self.before_inference, node, ctx, span, diags)
    }

    pub fn after_inference(
        &self,
        ty: InferredType,
        ctx: &HookContext<'_>,
        diags: &mut Diagnostics,
    ) -> InferredType {
        let span = ctx.node.map(|n| n.span).unwrap_or_default();
        dispatch(&self.after_inference, ty, ctx, span, diags)
    }

    pub fn before_render(&self, node: Node, ctx: &HookContext<'_>, diags: &mut Diagnostics) -> Node {
        let span = node.span;
        dispatch(&self.before_render, node, ctx, span, diags)
    }

    pub fn after_render(
        &self,
        fragment: String,
        ctx: &HookContext<'_>,
        diags: &mut Diagnostics,
    ) -> String {
        let span = ctx.node.map(|n| n.span).unwrap_or_default();
        dispatch(&self.after_render, fragment, ctx, span, diags)
    }
}

fn dispatch<T>(
    hooks: &[Hook<T>],
    value: T,
    ctx: &HookContext<'_>,
    span: Span,
    diags: &mut Diagnostics,
) -> T {
    let mut current = value;
    // (priority, plugin) of the last replacement in the current priority group
    let mut replaced: Option<(i32, &str)> = None;

    for hook in hooks {
        let result = catch_unwind(AssertUnwindSafe(|| (hook.handler)(&current, ctx)));
        match result {
            Ok(Ok(HookOutcome::Keep)) => {}
            Ok(Ok(HookOutcome::Replace(next))) => {
                if let Some((priority, previous)) = replaced
                    && priority == hook.priority
                {
                    tracing::warn!(
                        plugin = %hook.plugin,
                        overridden = %previous,
                        priority,
                        "conflicting plugin replacements"
                    );
                    diags.push(
                        Diagnostic::new(
                            DiagnosticCode::PluginConflict,
                            format!(
                                "plugin `{}` overrides the replacement made by `{}` at priority {} ({:?})",
                                hook.plugin, previous, priority, ctx.point
                            ),
                        )
                        .at(span),
                    );
                }
                replaced = Some((hook.priority, hook.plugin.as_str()));
                current = next;
            }
            Ok(Err(err)) => {
                tracing::warn!(plugin = %hook.plugin, error = %err, "plugin hook failed");
                diags.push(
                    Diagnostic::new(
                        DiagnosticCode::PluginFault,
                        format!("plugin `{}` failed at {:?}: {}", hook.plugin, ctx.point, err),
                    )
                    .at(span),
                );
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(plugin = %hook.plugin, panic = %message, "plugin hook panicked");
                diags.push(
                    Diagnostic::new(
                        DiagnosticCode::PluginFault,
                        format!(
                            "plugin `{}` panicked at {:?}: {}",
                            hook.plugin, ctx.point, message
                        ),
                    )
                    .at(span),
                );
            }
        }
    }
    current
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Collects hooks, then freezes them into a [`PluginChain`].
#[derive(Default)]
pub struct PluginChainBuilder {
    chain: PluginChain,
    seq: usize,
}

impl PluginChainBuilder {
    /// Register plugin identity. Hooks naming an unregistered plugin register
    /// it implicitly with version `0.0.0`.
    pub fn plugin(&mut self, info: PluginInfo) -> &mut Self {
        if let Some(existing) = self.chain.plugins.iter_mut().find(|p| p.name == info.name) {
            *existing = info;
        } else {
            self.chain.plugins.push(info);
        }
        self
    }

    /// Register `plugin`'s identity and let it install its hooks.
    pub fn install(&mut self, plugin: &dyn Plugin) -> &mut Self {
        self.plugin(plugin.info());
        plugin.install(self);
        self
    }

    pub fn before_inference<F>(&mut self, plugin: &str, priority: i32, handler: F) -> &mut Self
    where
        F: Fn(&Node, &HookContext<'_>) -> Result<HookOutcome<Node>, PluginError>
            + Send
            + Sync
            + 'static,
    {
        let hook = self.hook(plugin, priority, Arc::new(handler));
        self.chain.before_inference.push(hook);
        self
    }

    pub fn after_inference<F>(&mut self, plugin: &str, priority: i32, handler: F) -> &mut Self
    where
        F: Fn(&InferredType, &HookContext<'_>) -> Result<HookOutcome<InferredType>, PluginError>
            + Send
            + Sync
            + 'static,
    {
        let hook = self.hook(plugin, priority, Arc::new(handler));
        self.chain.after_inference.push(hook);
        self
    }

    pub fn before_render<F>(&mut self, plugin: &str, priority: i32, handler: F) -> &mut Self
    where
        F: Fn(&Node, &HookContext<'_>) -> Result<HookOutcome<Node>, PluginError>
            + Send
            + Sync
            + 'static,
    {
        let hook = self.hook(plugin, priority, Arc::new(handler));
        self.chain.before_render.push(hook);
        self
    }

    pub fn after_render<F>(&mut self, plugin: &str, priority: i32, handler: F) -> &mut Self
    where
        F: Fn(&String, &HookContext<'_>) -> Result<HookOutcome<String>, PluginError>
            + Send
            + Sync
            + 'static,
    {
        let hook = self.hook(plugin, priority, Arc::new(handler));
        self.chain.after_render.push(hook);
        self
    }

    /// Contribute a mapping entry. Entries override built-ins with the same
    /// key and selector.
    pub fn mapping_entry(&mut self, entry: MappingEntry) -> &mut Self {
        self.chain.mapping.push(entry);
        self
    }

    pub fn build(mut self) -> PluginChain {
        sort_hooks(&mut self.chain.before_inference);
        sort_hooks(&mut self.chain.after_inference);
        sort_hooks(&mut self.chain.before_render);
        sort_hooks(&mut self.chain.after_render);
        self.chain
    }

    fn hook<T>(&mut self, plugin: &str, priority: i32, handler: Handler<T>) -> Hook<T> {
        if !self.chain.plugins.iter().any(|p| p.name == plugin) {
            self.chain.plugins.push(PluginInfo::new(plugin, "0.0.0"));
        }
        self.seq += 1;
        Hook {
            plugin: plugin.to_string(),
            priority,
            seq: self.seq,
            handler,
        }
    }
}

fn sort_hooks<T>(hooks: &mut [Hook<T>]) {
    hooks.sort_by_key(|h| (h.priority, h.seq));
}
