#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use buildlink::error::{BuildlinkError, Result};
use buildlink::mapping::ModelIdentifier;
use buildlink::raw::{NodeId, RawGraphBuilder, RawObject, RawResult, RawValue};
use buildlink::transport::{BuildTransport, CancelToken};

/// Root project `:` with `:sub1` and `:sub2`, listed by a build node.
/// Node 0 is the build, 1 the root project, 2 and 3 the children.
pub fn two_project_build() -> RawObject {
    let mut graph = RawGraphBuilder::new();
    let build = graph.add("DefaultGradleBuild");
    let root = graph.add("DefaultBasicGradleProject");
    let sub1 = graph.add("DefaultBasicGradleProject");
    let sub2 = graph.add("DefaultBasicGradleProject");
    graph
        .set(build, "rootProject", RawValue::node(root))
        .set(build, "projects", RawValue::nodes([root, sub1, sub2]))
        .set(build, "includedBuilds", RawValue::List(vec![]))
        .set(root, "name", RawValue::str("repo"))
        .set(root, "path", RawValue::str(":"))
        .set(root, "projectDirectory", RawValue::str("/repo"))
        .set(root, "parent", RawValue::Null)
        .set(root, "children", RawValue::nodes([sub1, sub2]));
    for (node, name) in [(sub1, "sub1"), (sub2, "sub2")] {
        graph
            .set(node, "name", RawValue::str(name))
            .set(node, "path", RawValue::str(format!(":{name}")))
            .set(node, "projectDirectory", RawValue::str(format!("/repo/{name}")))
            .set(node, "parent", RawValue::node(root))
            .set(node, "children", RawValue::List(vec![]));
    }
    let graph = graph.build().expect("graph");
    RawObject::new(graph, build).expect("root")
}

/// A full project `:app` with one task pointing back at it.
pub fn project_with_task() -> (RawObject, RawObject) {
    let mut graph = RawGraphBuilder::new();
    let project = graph.add("DefaultGradleProject");
    let task = graph.add("DefaultGradleTask");
    graph
        .set(project, "name", RawValue::str("app"))
        .set(project, "path", RawValue::str(":app"))
        .set(project, "description", RawValue::Null)
        .set(project, "buildDirectory", RawValue::str("/repo/app/build"))
        .set(project, "parent", RawValue::Null)
        .set(project, "children", RawValue::List(vec![]))
        .set(project, "tasks", RawValue::nodes([task]))
        .set(task, "name", RawValue::str("build"))
        .set(task, "path", RawValue::str(":app:build"))
        .set(task, "description", RawValue::str("Assembles and tests"))
        .set(task, "project", RawValue::node(project));
    let graph = graph.build().expect("graph");
    (
        RawObject::new(Arc::clone(&graph), project).expect("project"),
        RawObject::new(graph, task).expect("task"),
    )
}

pub fn node(raw: &RawObject, id: usize) -> RawObject {
    raw.follow(NodeId(id)).expect("node")
}

#[derive(Debug, Clone)]
pub struct Call {
    pub target: Option<RawObject>,
    pub identifier: ModelIdentifier,
}

/// Answers from a closure and records every call.
pub struct ScriptedTransport<F> {
    answer: F,
    pub calls: Mutex<Vec<Call>>,
}

impl<F> ScriptedTransport<F>
where
    F: Fn(Option<&RawObject>, &ModelIdentifier) -> Result<RawResult> + Send + Sync,
{
    pub fn new(answer: F) -> Self {
        Self { answer, calls: Mutex::new(Vec::new()) }
    }
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl<F> BuildTransport for ScriptedTransport<F>
where
    F: Fn(Option<&RawObject>, &ModelIdentifier) -> Result<RawResult> + Send + Sync,
{
    fn get_model(
        &self,
        target: Option<&RawObject>,
        identifier: &ModelIdentifier,
        cancel: &CancelToken,
    ) -> Result<RawResult> {
        self.calls.lock().unwrap().push(Call { target: target.cloned(), identifier: identifier.clone() });
        if cancel.is_cancelled() {
            return Err(BuildlinkError::Cancelled);
        }
        (self.answer)(target, identifier)
    }
}

pub fn unsupported() -> Result<RawResult> {
    Ok(RawResult::Unsupported { reason: Some("not in this version".into()) })
}
