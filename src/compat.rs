//! Capability providers that backfill identity older backends never report.

use std::path::{Path, PathBuf};

use crate::adapter::{Capability, CapabilityProvider, Supplied, ViewNode};
use crate::error::{BuildlinkError, Result};
use crate::identity::{BuildIdentity, ProjectIdentifier};

/// The consumer's own view of the build it is connected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityContext {
    build: BuildIdentity,
}

impl CompatibilityContext {
    pub fn new(build_name: impl Into<String>, root_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self { build: BuildIdentity::named(build_name, root_dir)? })
    }
    /// Names the build after the last component of its root directory.
    pub fn for_root_dir(root_dir: impl Into<PathBuf>) -> Result<Self> {
        let root_dir = root_dir.into();
        let name = root_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                BuildlinkError::InvariantViolation(format!(
                    "cannot derive a build name from '{}'",
                    root_dir.display()
                ))
            })?;
        Self::new(name, root_dir)
    }
    pub fn build(&self) -> &BuildIdentity {
        &self.build
    }
    pub fn root_dir(&self) -> Option<&Path> {
        match &self.build {
            BuildIdentity::Named { root_dir, .. } => Some(root_dir),
            BuildIdentity::Current => None,
        }
    }
}

/// Gives project views an identifier built from their own path.
#[derive(Debug, Clone)]
pub struct ProjectIdentifierMixin {
    build: BuildIdentity,
}

impl ProjectIdentifierMixin {
    pub fn new(build: BuildIdentity) -> Self {
        Self { build }
    }
}

impl CapabilityProvider for ProjectIdentifierMixin {
    fn supplies(&self, capability: Capability) -> bool {
        capability == Capability::ProjectIdentifier
    }
    fn provide(&self, capability: Capability, view: &ViewNode) -> Result<Supplied> {
        match capability {
            Capability::ProjectIdentifier => {
                let path = view.project_path("path")?;
                Ok(Supplied::ProjectIdentifier(ProjectIdentifier::new(self.build.clone(), path)))
            }
            other => Err(BuildlinkError::UnsupportedCapability {
                view: view.kind().to_string(),
                capability: other.field().to_string(),
            }),
        }
    }
}

/// Supplies one fixed project identifier, and its build, to any view.
#[derive(Debug, Clone)]
pub struct FixedProjectIdentifierProvider {
    project: ProjectIdentifier,
}

impl FixedProjectIdentifierProvider {
    pub fn new(project: ProjectIdentifier) -> Self {
        Self { project }
    }
    pub fn project_identifier(&self) -> &ProjectIdentifier {
        &self.project
    }
    pub fn build_identifier(&self) -> &BuildIdentity {
        self.project.build_identifier()
    }
}

impl CapabilityProvider for FixedProjectIdentifierProvider {
    fn supplies(&self, capability: Capability) -> bool {
        matches!(capability, Capability::ProjectIdentifier | Capability::BuildIdentifier)
    }
    fn provide(&self, capability: Capability, _view: &ViewNode) -> Result<Supplied> {
        Ok(match capability {
            Capability::ProjectIdentifier => Supplied::ProjectIdentifier(self.project.clone()),
            Capability::BuildIdentifier => Supplied::BuildIdentifier(self.build_identifier().clone()),
        })
    }
}
