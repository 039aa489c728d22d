//! Identity-preserving adaptation of raw protocol objects into typed views.
//!
//! An [`AdaptedGraph`] represents one logical object graph. Raw nodes are
//! turned into views lazily, the first time a traversal reaches them, and the
//! resulting view is kept against the raw node's identity so that reaching the
//! same node twice yields the same view (see [`View::same_view`]). Shared
//! substructure and cycles in the payload therefore survive adaptation.
//!
//! A [`ViewBuilder`] adds mix-ins: capability providers that synthesize
//! capabilities the raw node does not carry, for example identifiers an older
//! backend never populated. Mix-ins only decorate the views produced by the
//! `build` call they were registered for.

use core::hash::BuildHasherDefault;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, Weak};

use seahash::SeaHasher;

use crate::error::{BuildlinkError, Result};
use crate::identity::{BuildIdentity, ProjectIdentifier, ProjectPath};
use crate::model::ViewKind;
use crate::raw::{NodeId, RawKey, RawObject, RawValue};

pub type ViewHasher = BuildHasherDefault<SeaHasher>;

const MIN_PRUNE_AT: usize = 64;

// ------------- Capabilities -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ProjectIdentifier,
    BuildIdentifier,
}

impl Capability {
    /// Name of the raw field carrying this capability when the backend supplies it.
    pub fn field(&self) -> &'static str {
        match self {
            Self::ProjectIdentifier => "projectIdentifier",
            Self::BuildIdentifier => "buildIdentifier",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Supplied {
    ProjectIdentifier(ProjectIdentifier),
    BuildIdentifier(BuildIdentity),
}

/// Client-side supplement for capabilities missing from raw nodes.
pub trait CapabilityProvider: Send + Sync + fmt::Debug {
    fn supplies(&self, capability: Capability) -> bool;
    fn provide(&self, capability: Capability, view: &ViewNode) -> Result<Supplied>;
    /// Identifies the provider's configuration. Builds decorated with equal
    /// keys share views, so distinct configurations must give distinct keys.
    fn key(&self) -> String {
        format!("{self:?}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MixInTarget {
    Kind(ViewKind),
    Any,
}

impl MixInTarget {
    fn matches(&self, kind: ViewKind) -> bool {
        match self {
            Self::Kind(k) => *k == kind,
            Self::Any => true,
        }
    }
}

#[derive(Debug, Clone)]
struct MixIn {
    target: MixInTarget,
    provider: Arc<dyn CapabilityProvider>,
}

/// Registered mix-ins in order, each as its target and provider key.
#[derive(Debug, PartialEq, Eq, Hash)]
struct DecorationKey(Vec<(MixInTarget, String)>);

#[derive(Debug)]
struct Decoration {
    mixins: Vec<MixIn>,
    key: Arc<DecorationKey>,
}

impl Decoration {
    fn new(mixins: Vec<MixIn>) -> Self {
        let key = DecorationKey(mixins.iter().map(|m| (m.target, m.provider.key())).collect());
        Self { mixins, key: Arc::new(key) }
    }
    // first registered provider wins
    fn provider_for(&self, kind: ViewKind, capability: Capability) -> Option<&Arc<dyn CapabilityProvider>> {
        self.mixins
            .iter()
            .find(|m| m.target.matches(kind) && m.provider.supplies(capability))
            .map(|m| &m.provider)
    }
}

// ------------- Views -------------
/// A typed projection of a raw node.
pub trait View: Sized + Clone + Send + Sync {
    const KIND: ViewKind;
    fn from_node(node: Arc<ViewNode>) -> Self;
    fn node(&self) -> &Arc<ViewNode>;
    /// Reference equality: both handles denote the same adapted instance.
    fn same_view(&self, other: &Self) -> bool {
        Arc::ptr_eq(self.node(), other.node())
    }
    fn raw(&self) -> &RawObject {
        self.node().raw()
    }
}

#[derive(Hash, PartialEq, Eq)]
struct ViewKey {
    raw: RawKey,
    kind: ViewKind,
    decoration: Arc<DecorationKey>,
}

struct ViewCache {
    views: HashMap<ViewKey, Weak<ViewNode>, ViewHasher>,
    prune_at: usize,
}

struct GraphState {
    cache: Mutex<ViewCache>,
}

impl GraphState {
    fn view(
        self: &Arc<Self>,
        kind: ViewKind,
        raw: RawObject,
        decoration: &Arc<Decoration>,
    ) -> Result<Arc<ViewNode>> {
        let key = ViewKey { raw: raw.key(), kind, decoration: Arc::clone(&decoration.key) };
        let mut cache = self.cache.lock()?;
        if let Some(kept) = cache.views.get(&key).and_then(Weak::upgrade) {
            return Ok(kept);
        }
        let node = Arc::new(ViewNode {
            kind,
            raw,
            decoration: Arc::clone(decoration),
            graph: Arc::clone(self),
        });
        cache.views.insert(key, Arc::downgrade(&node));
        if cache.views.len() >= cache.prune_at {
            cache.views.retain(|_, view| view.strong_count() > 0);
            cache.prune_at = MIN_PRUNE_AT.max(cache.views.len() * 2);
        }
        Ok(node)
    }
}

/// The shared state behind one adapted view.
pub struct ViewNode {
    kind: ViewKind,
    raw: RawObject,
    decoration: Arc<Decoration>,
    graph: Arc<GraphState>,
}

impl ViewNode {
    pub fn kind(&self) -> ViewKind {
        self.kind
    }
    pub fn raw(&self) -> &RawObject {
        &self.raw
    }
    fn unsupported(&self, capability: &str) -> BuildlinkError {
        BuildlinkError::UnsupportedCapability {
            view: self.kind.to_string(),
            capability: capability.to_string(),
        }
    }
    fn invalid(&self, name: &str, expected: &str, found: &RawValue) -> BuildlinkError {
        BuildlinkError::InvalidPayload(format!(
            "{}.{} should be {}, found {}",
            self.kind,
            name,
            expected,
            found.shape()
        ))
    }
    pub fn has_field(&self, name: &str) -> bool {
        self.raw.field(name).is_some()
    }
    pub fn field(&self, name: &str) -> Result<&RawValue> {
        self.raw.field(name).ok_or_else(|| self.unsupported(name))
    }
    pub fn string(&self, name: &str) -> Result<String> {
        match self.field(name)? {
            RawValue::Str(s) => Ok(s.clone()),
            other => Err(self.invalid(name, "a string", other)),
        }
    }
    pub fn optional_string(&self, name: &str) -> Result<Option<String>> {
        match self.field(name)? {
            RawValue::Null => Ok(None),
            RawValue::Str(s) => Ok(Some(s.clone())),
            other => Err(self.invalid(name, "a string or null", other)),
        }
    }
    pub fn strings(&self, name: &str) -> Result<Vec<String>> {
        match self.field(name)? {
            RawValue::List(items) => items
                .iter()
                .map(|item| match item {
                    RawValue::Str(s) => Ok(s.clone()),
                    other => Err(self.invalid(name, "a list of strings", other)),
                })
                .collect(),
            other => Err(self.invalid(name, "a list", other)),
        }
    }
    pub fn project_path(&self, name: &str) -> Result<ProjectPath> {
        ProjectPath::parse(&self.string(name)?)
    }
    fn adapt_ref<T: View>(&self, node: NodeId) -> Result<T> {
        let raw = self.raw.follow(node)?;
        self.graph.view(T::KIND, raw, &self.decoration).map(T::from_node)
    }
    pub fn object<T: View>(&self, name: &str) -> Result<T> {
        match self.field(name)? {
            RawValue::Ref { node } => self.adapt_ref(*node),
            other => Err(self.invalid(name, "a reference", other)),
        }
    }
    pub fn optional_object<T: View>(&self, name: &str) -> Result<Option<T>> {
        match self.field(name)? {
            RawValue::Null => Ok(None),
            RawValue::Ref { node } => self.adapt_ref(*node).map(Some),
            other => Err(self.invalid(name, "a reference or null", other)),
        }
    }
    pub fn objects<T: View>(&self, name: &str) -> Result<Vec<T>> {
        match self.field(name)? {
            RawValue::List(items) => items
                .iter()
                .map(|item| match item {
                    RawValue::Ref { node } => self.adapt_ref(*node),
                    other => Err(self.invalid(name, "a list of references", other)),
                })
                .collect(),
            other => Err(self.invalid(name, "a list", other)),
        }
    }
    /// The raw node referenced by `name`, if the backend populated it.
    pub fn raw_ref(&self, name: &str) -> Result<Option<RawObject>> {
        match self.raw.field(name) {
            None | Some(RawValue::Null) => Ok(None),
            Some(RawValue::Ref { node }) => self.raw.follow(*node).map(Some),
            Some(other) => Err(self.invalid(name, "a reference", other)),
        }
    }
    /// Asks the mix-ins decorating this view for a capability.
    pub fn supplied(&self, capability: Capability) -> Result<Supplied> {
        match self.decoration.provider_for(self.kind, capability) {
            Some(provider) => provider.provide(capability, self),
            None => Err(self.unsupported(capability.field())),
        }
    }
}

impl fmt::Debug for ViewNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ViewNode")
            .field("kind", &self.kind)
            .field("raw", &self.raw)
            .field("decoration", &self.decoration.key)
            .finish()
    }
}

// ------------- Graph -------------
/// One logical object graph of adapted views.
#[derive(Clone)]
pub struct AdaptedGraph {
    state: Arc<GraphState>,
    plain: Arc<Decoration>,
}

impl AdaptedGraph {
    pub fn new() -> Self {
        Self {
            state: Arc::new(GraphState {
                cache: Mutex::new(ViewCache { views: HashMap::default(), prune_at: MIN_PRUNE_AT }),
            }),
            plain: Arc::new(Decoration::new(Vec::new())),
        }
    }
    /// Adapts `raw` without any mix-ins.
    pub fn adapt<T: View>(&self, raw: RawObject) -> Result<T> {
        self.state.view(T::KIND, raw, &self.plain).map(T::from_node)
    }
    pub fn builder<T: View>(&self) -> ViewBuilder<T> {
        ViewBuilder { graph: self.clone(), mixins: Vec::new(), _view: PhantomData }
    }
    /// Number of views currently alive in this graph.
    pub fn live_views(&self) -> Result<usize> {
        let cache = self.state.cache.lock()?;
        Ok(cache.views.values().filter(|view| view.strong_count() > 0).count())
    }
}

impl Default for AdaptedGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AdaptedGraph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AdaptedGraph").finish_non_exhaustive()
    }
}

pub struct ViewBuilder<T: View> {
    graph: AdaptedGraph,
    mixins: Vec<MixIn>,
    _view: PhantomData<fn() -> T>,
}

impl<T: View> ViewBuilder<T> {
    pub fn mix_in_to(&mut self, kind: ViewKind, provider: Arc<dyn CapabilityProvider>) -> &mut Self {
        self.mixins.push(MixIn { target: MixInTarget::Kind(kind), provider });
        self
    }
    pub fn mix_in_to_all(&mut self, provider: Arc<dyn CapabilityProvider>) -> &mut Self {
        self.mixins.push(MixIn { target: MixInTarget::Any, provider });
        self
    }
    pub fn build(&self, raw: RawObject) -> Result<T> {
        let decoration = Arc::new(Decoration::new(self.mixins.clone()));
        self.graph.state.view(T::KIND, raw, &decoration).map(T::from_node)
    }
}
