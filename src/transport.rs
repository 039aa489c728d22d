//! The boundary to whatever moves requests to the build engine.
//!
//! A transport answers one model request at a time. It may block on a network
//! or IPC round trip; callers that give up on a request flip the shared
//! [`CancelToken`], which transports should observe where they can.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use tracing::debug;

use crate::error::{BuildlinkError, Result};
use crate::mapping::ModelIdentifier;
use crate::raw::{NodeId, RawGraph, RawObject, RawResult};

/// Cancellation token shared between a caller and an in-flight request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub trait BuildTransport: Send + Sync {
    /// Requests one model. `target` is `None` for the whole build.
    ///
    /// Answer `RawResult::Unsupported` when the backend cannot build this model
    /// for this target; reserve `Err` for malfunctions.
    fn get_model(
        &self,
        target: Option<&RawObject>,
        identifier: &ModelIdentifier,
        cancel: &CancelToken,
    ) -> Result<RawResult>;
}

impl<T: BuildTransport + ?Sized> BuildTransport for Arc<T> {
    fn get_model(
        &self,
        target: Option<&RawObject>,
        identifier: &ModelIdentifier,
        cancel: &CancelToken,
    ) -> Result<RawResult> {
        (**self).get_model(target, identifier, cancel)
    }
}

// ------------- Fixture replay -------------
#[derive(Debug, Deserialize)]
struct FixtureEntry {
    identifier: ModelIdentifier,
    #[serde(default)]
    target: Option<NodeId>,
    root: NodeId,
}

#[derive(Debug, Deserialize)]
struct FixtureDocument {
    graph: RawGraph,
    models: Vec<FixtureEntry>,
}

/// Replays recorded answers. Every answer points into the same arena, so
/// consecutive requests see shared substructure.
#[derive(Debug)]
pub struct FixtureTransport {
    graph: Arc<RawGraph>,
    entries: Vec<FixtureEntry>,
}

impl FixtureTransport {
    pub fn from_json(json: &str) -> Result<Self> {
        let document: FixtureDocument = serde_json::from_str(json)
            .map_err(|e| BuildlinkError::InvalidPayload(format!("fixture: {e}")))?;
        document.graph.validate()?;
        let graph = Arc::new(document.graph);
        for entry in &document.models {
            for node in entry.target.iter().chain(std::iter::once(&entry.root)) {
                RawObject::new(Arc::clone(&graph), *node)?;
            }
        }
        Ok(Self { graph, entries: document.models })
    }
    pub fn graph(&self) -> &Arc<RawGraph> {
        &self.graph
    }
    /// A handle to one node of the fixture arena, usable as a request target.
    pub fn object(&self, node: NodeId) -> Result<RawObject> {
        RawObject::new(Arc::clone(&self.graph), node)
    }
}

impl BuildTransport for FixtureTransport {
    fn get_model(
        &self,
        target: Option<&RawObject>,
        identifier: &ModelIdentifier,
        cancel: &CancelToken,
    ) -> Result<RawResult> {
        if cancel.is_cancelled() {
            return Err(BuildlinkError::Cancelled);
        }
        // targets from another arena can never match a recorded answer
        let target = match target {
            Some(raw) if raw.graph().id() != self.graph.id() => {
                return Ok(RawResult::Unsupported {
                    reason: Some("target does not belong to this build".into()),
                });
            }
            Some(raw) => Some(raw.node_id()),
            None => None,
        };
        let found = self
            .entries
            .iter()
            .find(|entry| &entry.identifier == identifier && entry.target == target);
        debug!(%identifier, ?target, found = found.is_some(), "fixture lookup");
        match found {
            Some(entry) => Ok(RawResult::Success(self.object(entry.root)?)),
            None => Ok(RawResult::Unsupported { reason: None }),
        }
    }
}
