//! Raw protocol payload, as handed over by a transport before adaptation.
//!
//! Raw nodes live in an arena ([`RawGraph`]) and reference each other by
//! [`NodeId`], so payloads can contain shared substructure and cycles. Every
//! arena gets a process-unique [`GraphId`]; the pair (`GraphId`, `NodeId`) is
//! the identity of a raw node.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{BuildlinkError, Result};

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

fn next_graph_id() -> GraphId {
    GraphId(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<RawValue>),
    Ref {
        #[serde(rename = "$ref")]
        node: NodeId,
    },
}

impl RawValue {
    pub fn node(node: NodeId) -> Self {
        Self::Ref { node }
    }
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }
    pub fn nodes(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self::List(nodes.into_iter().map(Self::node).collect())
    }
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Ref { .. } => "reference",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, RawValue>,
}

impl RawNode {
    pub fn field(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(name)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RawGraph {
    #[serde(skip, default = "next_graph_id")]
    id: GraphId,
    nodes: Vec<RawNode>,
}

impl RawGraph {
    pub fn new(nodes: Vec<RawNode>) -> Result<Self> {
        let graph = Self { id: next_graph_id(), nodes };
        graph.validate()?;
        Ok(graph)
    }
    pub fn from_json(json: &str) -> Result<Self> {
        let graph: RawGraph = serde_json::from_str(json)
            .map_err(|e| BuildlinkError::InvalidPayload(format!("raw graph: {e}")))?;
        graph.validate()?;
        Ok(graph)
    }
    /// Every reference must point inside the arena.
    pub fn validate(&self) -> Result<()> {
        fn check(value: &RawValue, len: usize) -> Result<()> {
            match value {
                RawValue::Ref { node } if node.0 >= len => Err(BuildlinkError::InvalidPayload(
                    format!("dangling reference to node {node}"),
                )),
                RawValue::List(items) => items.iter().try_for_each(|item| check(item, len)),
                _ => Ok(()),
            }
        }
        self.nodes
            .iter()
            .flat_map(|node| node.fields.values())
            .try_for_each(|value| check(value, self.nodes.len()))
    }
    pub fn id(&self) -> GraphId {
        self.id
    }
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    pub fn node(&self, id: NodeId) -> Option<&RawNode> {
        self.nodes.get(id.0)
    }
}

#[derive(Debug, Default)]
pub struct RawGraphBuilder {
    nodes: Vec<RawNode>,
}

impl RawGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add(&mut self, type_name: &str) -> NodeId {
        self.nodes.push(RawNode { type_name: type_name.to_string(), fields: BTreeMap::new() });
        NodeId(self.nodes.len() - 1)
    }
    /// Fields may be set after allocation, which is how cycles are built.
    pub fn set(&mut self, node: NodeId, field: &str, value: RawValue) -> &mut Self {
        if let Some(raw) = self.nodes.get_mut(node.0) {
            raw.fields.insert(field.to_string(), value);
        }
        self
    }
    pub fn build(self) -> Result<Arc<RawGraph>> {
        RawGraph::new(self.nodes).map(Arc::new)
    }
}

// ------------- Raw object -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawKey {
    pub graph: GraphId,
    pub node: NodeId,
}

/// A handle to one node of a shared arena.
#[derive(Clone)]
pub struct RawObject {
    graph: Arc<RawGraph>,
    node: NodeId,
}

impl RawObject {
    pub fn new(graph: Arc<RawGraph>, node: NodeId) -> Result<Self> {
        if graph.node(node).is_none() {
            return Err(BuildlinkError::InvalidPayload(format!(
                "node {} is outside a graph of {} nodes",
                node,
                graph.len()
            )));
        }
        Ok(Self { graph, node })
    }
    pub fn key(&self) -> RawKey {
        RawKey { graph: self.graph.id(), node: self.node }
    }
    pub fn node_id(&self) -> NodeId {
        self.node
    }
    pub fn graph(&self) -> &Arc<RawGraph> {
        &self.graph
    }
    pub fn raw(&self) -> &RawNode {
        // validated at construction, and arenas are immutable
        &self.graph.nodes[self.node.0]
    }
    pub fn type_name(&self) -> &str {
        &self.raw().type_name
    }
    pub fn field(&self, name: &str) -> Option<&RawValue> {
        self.raw().field(name)
    }
    /// Follows a reference held by this node's graph.
    pub fn follow(&self, node: NodeId) -> Result<RawObject> {
        RawObject::new(Arc::clone(&self.graph), node)
    }
}

impl PartialEq for RawObject {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}
impl Eq for RawObject {}

impl fmt::Debug for RawObject {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "RawObject({} {} in {:?})", self.type_name(), self.node, self.graph.id())
    }
}

// ------------- Raw result -------------
#[derive(Debug, Clone)]
pub enum RawResult {
    Success(RawObject),
    /// The backend does not know how to build this model for this target.
    Unsupported { reason: Option<String> },
}
