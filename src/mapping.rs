//! Maps requested model types to the protocol identifiers understood by the
//! remote side. Lookup is by exact view kind only.

use std::fmt;
use std::sync::Arc;

use bimap::BiMap;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::error::{BuildlinkError, Result};
use crate::model::ViewKind;

lazy_static! {
    static ref DEFAULT_MAPPING: Arc<ModelMapping> = Arc::new(ModelMapping::defaults());
}

/// Version-stable protocol token naming one model type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelIdentifier(String);

impl ModelIdentifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelMapping {
    kept: BiMap<ViewKind, ModelIdentifier>,
}

impl ModelMapping {
    pub fn empty() -> Self {
        Self::default()
    }
    /// The shared mapping covering every requestable model.
    pub fn standard() -> Arc<ModelMapping> {
        Arc::clone(&DEFAULT_MAPPING)
    }
    fn defaults() -> Self {
        let mut mapping = Self::empty();
        for kind in [
            ViewKind::BuildStructure,
            ViewKind::Project,
            ViewKind::BuildEnvironment,
            ViewKind::ProjectPublications,
        ] {
            // names are distinct by construction
            let _ = mapping.register(kind, ModelIdentifier::new(format!("buildlink.model.{}", kind)));
        }
        mapping
    }
    /// Neither the kind nor the identifier may already be registered.
    pub fn register(&mut self, kind: ViewKind, identifier: ModelIdentifier) -> Result<()> {
        self.kept.insert_no_overwrite(kind, identifier).map_err(|(kind, identifier)| {
            BuildlinkError::InvariantViolation(format!(
                "cannot map '{}' to '{}': one of them is already registered",
                kind, identifier
            ))
        })
    }
    pub fn resolve(&self, kind: ViewKind) -> Result<&ModelIdentifier> {
        self.kept
            .get_by_left(&kind)
            .ok_or_else(|| BuildlinkError::UnknownModelType(kind.to_string()))
    }
    pub fn model_type_of(&self, identifier: &ModelIdentifier) -> Option<ViewKind> {
        self.kept.get_by_right(identifier).copied()
    }
    pub fn supported(&self) -> impl Iterator<Item = (&ViewKind, &ModelIdentifier)> {
        self.kept.iter()
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}
