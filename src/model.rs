//! Typed views over the models a build can supply.
//!
//! Every view is a thin handle over an adapted [`ViewNode`]; operations read
//! the raw node lazily and fail with `UnsupportedCapability` when the backend
//! did not supply the field and no mix-in provides it.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapter::{Capability, Supplied, View, ViewHasher, ViewNode};
use crate::error::{BuildlinkError, Result};
use crate::identity::{BuildIdentity, ProjectIdentifier, ProjectPath};
use crate::raw::{RawKey, RawObject, RawValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewKind {
    BuildStructure,
    BasicProject,
    Project,
    Task,
    BuildEnvironment,
    ProjectPublications,
    Publication,
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

macro_rules! view {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug)]
        pub struct $name(Arc<ViewNode>);

        impl View for $name {
            const KIND: ViewKind = ViewKind::$name;
            fn from_node(node: Arc<ViewNode>) -> Self {
                Self(node)
            }
            fn node(&self) -> &Arc<ViewNode> {
                &self.0
            }
        }
    };
}

view!(
    /// Topology of one build: its projects and included builds.
    BuildStructure
);
view!(
    /// Lightweight project handle, as listed by [`BuildStructure`].
    BasicProject
);
view!(
    /// Full project model with tasks.
    Project
);
view!(Task);
view!(BuildEnvironment);
view!(
    /// What a project publishes.
    ProjectPublications
);
view!(Publication);

// ------------- Identity capabilities -------------
fn build_identity_from_raw(raw: &RawObject) -> Result<BuildIdentity> {
    let text = |field: &str| -> Result<Option<String>> {
        match raw.field(field) {
            None | Some(RawValue::Null) => Ok(None),
            Some(RawValue::Str(s)) => Ok(Some(s.clone())),
            Some(other) => Err(BuildlinkError::InvalidPayload(format!(
                "build identifier field '{}' should be a string, found {}",
                field,
                other.shape()
            ))),
        }
    };
    let identity = match (text("name")?, text("rootDir")?) {
        (None, None) => Ok(BuildIdentity::Current),
        (Some(name), Some(root_dir)) => BuildIdentity::named(name, root_dir),
        // older backends only report the root directory
        (None, Some(root_dir)) => {
            let root_dir = PathBuf::from(root_dir);
            let name = root_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| root_dir.display().to_string());
            BuildIdentity::named(name, root_dir)
        }
        (Some(name), None) => Err(BuildlinkError::InvalidPayload(format!(
            "build identifier '{name}' has no root directory"
        ))),
    };
    identity.map_err(|e| match e {
        BuildlinkError::InvariantViolation(msg) => BuildlinkError::InvalidPayload(msg),
        other => other,
    })
}

fn project_identifier_from_raw(raw: &RawObject) -> Result<ProjectIdentifier> {
    let build = match raw.field("buildIdentifier") {
        Some(RawValue::Ref { node }) => build_identity_from_raw(&raw.follow(*node)?)?,
        None | Some(RawValue::Null) => BuildIdentity::Current,
        Some(other) => {
            return Err(BuildlinkError::InvalidPayload(format!(
                "project identifier's build identifier should be a reference, found {}",
                other.shape()
            )));
        }
    };
    let path = match raw.field("projectPath") {
        Some(RawValue::Str(s)) => ProjectPath::parse(s)?,
        _ => {
            return Err(BuildlinkError::InvalidPayload(
                "project identifier without a project path".into(),
            ));
        }
    };
    Ok(ProjectIdentifier::new(build, path))
}

fn project_identifier(node: &ViewNode) -> Result<ProjectIdentifier> {
    if let Some(raw) = node.raw_ref(Capability::ProjectIdentifier.field())? {
        return project_identifier_from_raw(&raw);
    }
    match node.supplied(Capability::ProjectIdentifier)? {
        Supplied::ProjectIdentifier(id) => Ok(id),
        other => Err(BuildlinkError::InvariantViolation(format!(
            "provider answered project identifier with {other:?}"
        ))),
    }
}

fn build_identifier(node: &ViewNode) -> Result<BuildIdentity> {
    if let Some(raw) = node.raw_ref(Capability::BuildIdentifier.field())? {
        return build_identity_from_raw(&raw);
    }
    match node.supplied(Capability::BuildIdentifier)? {
        Supplied::BuildIdentifier(id) => Ok(id),
        other => Err(BuildlinkError::InvariantViolation(format!(
            "provider answered build identifier with {other:?}"
        ))),
    }
}

// ------------- Operations -------------
impl BuildStructure {
    pub fn build_identifier(&self) -> Result<BuildIdentity> {
        build_identifier(&self.0)
    }
    pub fn root_project(&self) -> Result<BasicProject> {
        self.0.object("rootProject")
    }
    pub fn projects(&self) -> Result<Vec<BasicProject>> {
        self.0.objects("projects")
    }
    pub fn included_builds(&self) -> Result<Vec<BuildStructure>> {
        self.0.objects("includedBuilds")
    }
}

impl BasicProject {
    pub fn name(&self) -> Result<String> {
        self.0.string("name")
    }
    pub fn path(&self) -> Result<ProjectPath> {
        self.0.project_path("path")
    }
    pub fn project_directory(&self) -> Result<PathBuf> {
        self.0.string("projectDirectory").map(PathBuf::from)
    }
    pub fn parent(&self) -> Result<Option<BasicProject>> {
        self.0.optional_object("parent")
    }
    pub fn children(&self) -> Result<Vec<BasicProject>> {
        self.0.objects("children")
    }
    pub fn project_identifier(&self) -> Result<ProjectIdentifier> {
        project_identifier(&self.0)
    }
    /// This project and its descendants in depth-first order, each with its
    /// depth below `self`. A project reached twice, e.g. through a cycle in
    /// `children`, is listed once.
    pub fn subtree(&self) -> Result<Vec<(usize, BasicProject)>> {
        let mut seen: HashSet<RawKey, ViewHasher> = HashSet::default();
        let mut listed = Vec::new();
        let mut pending = vec![(0, self.clone())];
        while let Some((depth, project)) = pending.pop() {
            if !seen.insert(project.raw().key()) {
                continue;
            }
            let children = project.children()?;
            pending.extend(children.into_iter().rev().map(|child| (depth + 1, child)));
            listed.push((depth, project));
        }
        Ok(listed)
    }
}

impl Project {
    pub fn name(&self) -> Result<String> {
        self.0.string("name")
    }
    pub fn path(&self) -> Result<ProjectPath> {
        self.0.project_path("path")
    }
    pub fn description(&self) -> Result<Option<String>> {
        self.0.optional_string("description")
    }
    pub fn build_directory(&self) -> Result<Option<PathBuf>> {
        self.0.optional_string("buildDirectory").map(|dir| dir.map(PathBuf::from))
    }
    pub fn parent(&self) -> Result<Option<Project>> {
        self.0.optional_object("parent")
    }
    pub fn children(&self) -> Result<Vec<Project>> {
        self.0.objects("children")
    }
    pub fn tasks(&self) -> Result<Vec<Task>> {
        self.0.objects("tasks")
    }
    pub fn project_identifier(&self) -> Result<ProjectIdentifier> {
        project_identifier(&self.0)
    }
}

impl Task {
    pub fn name(&self) -> Result<String> {
        self.0.string("name")
    }
    /// Full task path, such as `:sub1:build`.
    pub fn path(&self) -> Result<String> {
        self.0.string("path")
    }
    pub fn description(&self) -> Result<Option<String>> {
        self.0.optional_string("description")
    }
    pub fn project(&self) -> Result<Project> {
        self.0.object("project")
    }
}

impl BuildEnvironment {
    pub fn build_identifier(&self) -> Result<BuildIdentity> {
        build_identifier(&self.0)
    }
    pub fn engine_version(&self) -> Result<String> {
        self.0.string("engineVersion")
    }
    pub fn jvm_arguments(&self) -> Result<Vec<String>> {
        self.0.strings("jvmArguments")
    }
}

impl ProjectPublications {
    pub fn project_identifier(&self) -> Result<ProjectIdentifier> {
        project_identifier(&self.0)
    }
    pub fn publications(&self) -> Result<Vec<Publication>> {
        self.0.objects("publications")
    }
}

impl Publication {
    pub fn group(&self) -> Result<String> {
        self.0.string("group")
    }
    pub fn module(&self) -> Result<String> {
        self.0.string("module")
    }
    pub fn version(&self) -> Result<String> {
        self.0.string("version")
    }
}

// ------------- Target elements -------------
/// The addressable elements a model request can be scoped to.
#[derive(Clone, Debug)]
pub enum TargetElement {
    Project(Project),
    BasicProject(BasicProject),
    /// Scoped to the project owning the task.
    Task(Task),
    Build(BuildStructure),
    Other(RawObject),
}

impl TargetElement {
    /// The raw protocol object behind the element.
    pub fn unpack(&self) -> RawObject {
        match self {
            Self::Project(view) => view.raw().clone(),
            Self::BasicProject(view) => view.raw().clone(),
            Self::Task(view) => view.raw().clone(),
            Self::Build(view) => view.raw().clone(),
            Self::Other(raw) => raw.clone(),
        }
    }
    /// Path of the project this element denotes, if it carries one directly.
    pub fn direct_path(&self) -> Result<Option<ProjectPath>> {
        match self {
            Self::Project(view) => view.path().map(Some),
            Self::BasicProject(view) => view.path().map(Some),
            _ => Ok(None),
        }
    }
    /// Path carried by a project the element wraps.
    pub fn wrapped_path(&self) -> Result<Option<ProjectPath>> {
        match self {
            Self::Task(view) => view.project()?.path().map(Some),
            _ => Ok(None),
        }
    }
}

impl From<Project> for TargetElement {
    fn from(view: Project) -> Self {
        Self::Project(view)
    }
}
impl From<BasicProject> for TargetElement {
    fn from(view: BasicProject) -> Self {
        Self::BasicProject(view)
    }
}
impl From<Task> for TargetElement {
    fn from(view: Task) -> Self {
        Self::Task(view)
    }
}
impl From<BuildStructure> for TargetElement {
    fn from(view: BuildStructure) -> Self {
        Self::Build(view)
    }
}
