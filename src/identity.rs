//! Build and project identity.
//!
//! A [`BuildIdentity`] says which build a piece of data belongs to: either the
//! *current* build (the one in whose context the data was produced) or a
//! *named* build located at an absolute root directory. A [`ProjectIdentifier`]
//! pairs a build identity with a colon-delimited [`ProjectPath`].

use std::fmt;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{BuildlinkError, Result};

lazy_static! {
    // ":" for the root, otherwise one or more ":segment" parts
    static ref PROJECT_PATH: Regex = Regex::new(r"^(?::|(?::[^:\s]+)+)$").unwrap();
}

/// Anything that can describe which build it refers to.
///
/// Independently built components may carry their own identifier types; the
/// codec accepts any implementation and checks that it is canonical before
/// writing it.
pub trait BuildIdentifier {
    fn is_current_build(&self) -> bool;
    fn name(&self) -> Option<&str>;
    fn root_dir(&self) -> Option<&Path>;
}

/// Named identities come from [`BuildIdentity::named`] or the codec, both of
/// which check the root directory. There is no serde path around them:
///
/// ```compile_fail
/// let relative: buildlink::identity::BuildIdentity =
///     serde_json::from_str(r#"{"Named":{"name":"b","root_dir":"rel"}}"#).unwrap();
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BuildIdentity {
    Current,
    Named { name: String, root_dir: PathBuf },
}

impl BuildIdentity {
    pub fn current() -> Self {
        Self::Current
    }
    pub fn named(name: impl Into<String>, root_dir: impl Into<PathBuf>) -> Result<Self> {
        let name = name.into();
        let root_dir = root_dir.into();
        if name.is_empty() {
            return Err(BuildlinkError::InvariantViolation(
                "a named build requires a non-empty name".into(),
            ));
        }
        if root_dir.as_os_str().is_empty() || !root_dir.is_absolute() {
            return Err(BuildlinkError::InvariantViolation(format!(
                "root directory of build '{}' must be absolute, got '{}'",
                name,
                root_dir.display()
            )));
        }
        Ok(Self::Named { name, root_dir })
    }
}

impl BuildIdentifier for BuildIdentity {
    fn is_current_build(&self) -> bool {
        matches!(self, Self::Current)
    }
    fn name(&self) -> Option<&str> {
        match self {
            Self::Current => None,
            Self::Named { name, .. } => Some(name),
        }
    }
    fn root_dir(&self) -> Option<&Path> {
        match self {
            Self::Current => None,
            Self::Named { root_dir, .. } => Some(root_dir),
        }
    }
}

impl fmt::Display for BuildIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Current => write!(f, "<current build>"),
            Self::Named { name, root_dir } => write!(f, "{}, {}", name, root_dir.display()),
        }
    }
}

// ------------- Project path -------------
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectPath(String);

impl ProjectPath {
    pub const ROOT: &'static str = ":";

    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }
    pub fn parse(path: &str) -> Result<Self> {
        if PROJECT_PATH.is_match(path) {
            Ok(Self(path.to_string()))
        } else {
            Err(BuildlinkError::InvalidPayload(format!("'{path}' is not a project path")))
        }
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }
    /// Last segment of the path, `None` for the root.
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.0.rsplit(':').next()
        }
    }
    pub fn parent(&self) -> Option<ProjectPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(':') {
            Some(0) | None => Some(Self::root()),
            Some(i) => Some(Self(self.0[..i].to_string())),
        }
    }
    pub fn child(&self, name: &str) -> Result<ProjectPath> {
        if self.is_root() {
            Self::parse(&format!(":{name}"))
        } else {
            Self::parse(&format!("{}:{}", self.0, name))
        }
    }
}

impl fmt::Display for ProjectPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ------------- Project identifier -------------
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProjectIdentifier {
    build: BuildIdentity,
    project_path: ProjectPath,
}

impl ProjectIdentifier {
    pub fn new(build: BuildIdentity, project_path: ProjectPath) -> Self {
        Self { build, project_path }
    }
    pub fn build_identifier(&self) -> &BuildIdentity {
        &self.build
    }
    pub fn project_path(&self) -> &ProjectPath {
        &self.project_path
    }
}

impl fmt::Display for ProjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.build, self.project_path)
    }
}
