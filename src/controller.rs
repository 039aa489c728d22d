//! Model retrieval client.
//!
//! A [`BuildController`] resolves the requested view kind to a protocol
//! identifier, asks the transport for the raw model and adapts the answer into
//! its session graph. Every request issued through one controller lands in the
//! same [`AdaptedGraph`], so overlapping answers share views.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::adapter::{AdaptedGraph, View};
use crate::compat::{CompatibilityContext, FixedProjectIdentifierProvider, ProjectIdentifierMixin};
use crate::error::{BuildlinkError, Result};
use crate::identity::{ProjectIdentifier, ProjectPath};
use crate::mapping::ModelMapping;
use crate::model::{BuildStructure, TargetElement, ViewKind};
use crate::raw::{RawObject, RawResult};
use crate::transport::{BuildTransport, CancelToken};

/// Outcome of one request, keeping "the backend does not have it" apart from
/// every failure.
enum Retrieval<M> {
    Found(M),
    Unknown { reason: Option<String> },
}

pub struct BuildController<T: BuildTransport> {
    transport: T,
    mapping: Arc<ModelMapping>,
    graph: AdaptedGraph,
    compatibility: Option<CompatibilityContext>,
}

impl<T: BuildTransport> BuildController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            mapping: ModelMapping::standard(),
            graph: AdaptedGraph::new(),
            compatibility: None,
        }
    }
    pub fn with_mapping(mut self, mapping: Arc<ModelMapping>) -> Self {
        self.mapping = mapping;
        self
    }
    pub fn with_compatibility(mut self, compatibility: CompatibilityContext) -> Self {
        self.compatibility = Some(compatibility);
        self
    }
    pub fn compatibility(&self) -> Option<&CompatibilityContext> {
        self.compatibility.as_ref()
    }
    /// The session graph shared by every request.
    pub fn graph(&self) -> &AdaptedGraph {
        &self.graph
    }
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn get_model<M: View>(&self) -> Result<M> {
        self.get_model_cancellable(None, &CancelToken::new())
    }
    pub fn get_model_for<M: View>(&self, target: &TargetElement) -> Result<M> {
        self.get_model_cancellable(Some(target), &CancelToken::new())
    }
    pub fn get_model_cancellable<M: View>(
        &self,
        target: Option<&TargetElement>,
        cancel: &CancelToken,
    ) -> Result<M> {
        match self.retrieve(target, cancel)? {
            Retrieval::Found(model) => Ok(model),
            Retrieval::Unknown { reason } => Err(BuildlinkError::UnknownModel {
                model: M::KIND.to_string(),
                reason,
            }),
        }
    }

    pub fn find_model<M: View>(&self) -> Result<Option<M>> {
        self.find_model_cancellable(None, &CancelToken::new())
    }
    pub fn find_model_for<M: View>(&self, target: &TargetElement) -> Result<Option<M>> {
        self.find_model_cancellable(Some(target), &CancelToken::new())
    }
    pub fn find_model_cancellable<M: View>(
        &self,
        target: Option<&TargetElement>,
        cancel: &CancelToken,
    ) -> Result<Option<M>> {
        match self.retrieve(target, cancel)? {
            Retrieval::Found(model) => Ok(Some(model)),
            Retrieval::Unknown { reason } => {
                debug!(model = %M::KIND, ?reason, "model not available, returning none");
                Ok(None)
            }
        }
    }

    pub fn get_build_model(&self) -> Result<BuildStructure> {
        self.get_model()
    }

    fn retrieve<M: View>(
        &self,
        target: Option<&TargetElement>,
        cancel: &CancelToken,
    ) -> Result<Retrieval<M>> {
        // an unmapped kind is a client bug and never reaches the transport
        let identifier = self.mapping.resolve(M::KIND)?;
        let raw_target = target.map(TargetElement::unpack);
        if cancel.is_cancelled() {
            return Err(BuildlinkError::Cancelled);
        }
        debug!(model = %M::KIND, %identifier, target = ?raw_target, "requesting model");
        let result = self.transport.get_model(raw_target.as_ref(), identifier, cancel)?;
        if cancel.is_cancelled() {
            return Err(BuildlinkError::Cancelled);
        }
        let raw = match result {
            RawResult::Success(raw) => raw,
            RawResult::Unsupported { reason } => {
                warn!(model = %M::KIND, %identifier, ?reason, "backend does not support model");
                return Ok(Retrieval::Unknown { reason });
            }
        };
        self.adapt(target, raw).map(Retrieval::Found)
    }

    fn adapt<M: View>(&self, target: Option<&TargetElement>, raw: RawObject) -> Result<M> {
        let Some(compatibility) = &self.compatibility else {
            return self.graph.adapt(raw);
        };
        let project = ProjectIdentifier::new(compatibility.build().clone(), target_path(target)?);
        info!(model = %M::KIND, project = %project, "applying project identifier mix-ins");
        let mixin = Arc::new(ProjectIdentifierMixin::new(compatibility.build().clone()));
        let mut builder = self.graph.builder::<M>();
        builder
            .mix_in_to(ViewKind::Project, mixin.clone())
            .mix_in_to(ViewKind::BasicProject, mixin)
            .mix_in_to_all(Arc::new(FixedProjectIdentifierProvider::new(project)));
        builder.build(raw)
    }
}

/// Project path a request is scoped to: the target's own path, then the path
/// of a project it wraps, then the root.
pub fn target_path(target: Option<&TargetElement>) -> Result<ProjectPath> {
    let Some(target) = target else {
        return Ok(ProjectPath::root());
    };
    if let Some(path) = target.direct_path()? {
        return Ok(path);
    }
    if let Some(path) = target.wrapped_path()? {
        return Ok(path);
    }
    Ok(ProjectPath::root())
}
