use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use buildlink::adapter::AdaptedGraph;
use buildlink::compat::{FixedProjectIdentifierProvider, ProjectIdentifierMixin};
use buildlink::identity::{BuildIdentity, ProjectIdentifier, ProjectPath};
use buildlink::model::{BasicProject, BuildStructure, ViewKind};
use buildlink::raw::{RawGraph, RawGraphBuilder, RawObject, RawValue};

// ------------- Fixture -------------
/// A root project with `width` children, each with `width` grandchildren.
fn project_tree(width: usize) -> (Arc<RawGraph>, RawObject) {
    let mut graph = RawGraphBuilder::new();
    let build = graph.add("DefaultGradleBuild");
    let root = graph.add("DefaultBasicGradleProject");
    graph
        .set(root, "name", RawValue::str("repo"))
        .set(root, "path", RawValue::str(":"))
        .set(root, "parent", RawValue::Null);
    let mut all = vec![root];
    let mut children = Vec::new();
    for i in 0..width {
        let child = graph.add("DefaultBasicGradleProject");
        let mut grandchildren = Vec::new();
        for j in 0..width {
            let leaf = graph.add("DefaultBasicGradleProject");
            graph
                .set(leaf, "name", RawValue::str(format!("leaf{j}")))
                .set(leaf, "path", RawValue::str(format!(":mod{i}:leaf{j}")))
                .set(leaf, "parent", RawValue::node(child))
                .set(leaf, "children", RawValue::List(vec![]));
            grandchildren.push(leaf);
        }
        graph
            .set(child, "name", RawValue::str(format!("mod{i}")))
            .set(child, "path", RawValue::str(format!(":mod{i}")))
            .set(child, "parent", RawValue::node(root))
            .set(child, "children", RawValue::nodes(grandchildren.iter().copied()));
        all.push(child);
        all.extend(grandchildren);
        children.push(child);
    }
    graph
        .set(root, "children", RawValue::nodes(children))
        .set(build, "rootProject", RawValue::node(root))
        .set(build, "projects", RawValue::nodes(all))
        .set(build, "includedBuilds", RawValue::List(vec![]));
    let graph = graph.build().expect("graph");
    let raw = RawObject::new(Arc::clone(&graph), build).expect("build");
    (graph, raw)
}

fn walk(project: &BasicProject) -> usize {
    let children = project.children().expect("children");
    1 + children.iter().map(walk).sum::<usize>()
}

// ------------- Benchmarks -------------
fn adapt_and_walk(c: &mut Criterion) {
    let (_graph, raw) = project_tree(30);
    c.bench_function("adapt and walk 931 projects", |b| {
        b.iter(|| {
            let adapted = AdaptedGraph::new();
            let build: BuildStructure = adapted.adapt(raw.clone()).expect("adapt");
            black_box(walk(&build.root_project().expect("root")))
        })
    });

    c.bench_function("re-adapt shared session", |b| {
        let adapted = AdaptedGraph::new();
        let keep: BuildStructure = adapted.adapt(raw.clone()).expect("adapt");
        black_box(keep.projects().expect("projects").len());
        b.iter(|| {
            let build: BuildStructure = adapted.adapt(raw.clone()).expect("adapt");
            black_box(build.projects().expect("projects").len())
        })
    });

    let context = BuildIdentity::named("repo", "/repo").expect("identity");
    c.bench_function("mixed-in identifiers for every project", |b| {
        b.iter(|| {
            let adapted = AdaptedGraph::new();
            let mixin = Arc::new(ProjectIdentifierMixin::new(context.clone()));
            let mut builder = adapted.builder::<BuildStructure>();
            builder
                .mix_in_to(ViewKind::BasicProject, mixin)
                .mix_in_to_all(Arc::new(FixedProjectIdentifierProvider::new(
                    ProjectIdentifier::new(context.clone(), ProjectPath::root()),
                )));
            let build = builder.build(raw.clone()).expect("adapt");
            let projects = build.projects().expect("projects");
            for project in &projects {
                black_box(project.project_identifier().expect("identifier"));
            }
        })
    });
}

criterion_group!(benches, adapt_and_walk);
criterion_main!(benches);
