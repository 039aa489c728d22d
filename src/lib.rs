//! Buildlink – the consumer side of a cross-version build model protocol.
//!
//! A consumer (an IDE, a script, another tool) asks a build engine for
//! structured *models*: the build's project topology, a project's tasks, the
//! build environment. The engine may be a different version than the consumer
//! expects, so neither side shares concrete type definitions. Instead:
//! * A requested view kind is resolved to a version-stable protocol token
//!   ([`mapping::ModelIdentifier`]) by a [`mapping::ModelMapping`].
//! * A [`transport::BuildTransport`] carries the request and returns a raw,
//!   untyped object graph ([`raw::RawGraph`]), or says the model is unsupported.
//! * The raw graph is adapted into typed views ([`model`]) by an
//!   [`adapter::AdaptedGraph`], which preserves object identity: the same raw
//!   node always yields the same view within one graph.
//! * Identity the backend never reported (project and build identifiers) is
//!   backfilled client-side by mix-ins ([`compat`]).
//!
//! ## Modules
//! * [`identity`] – [`identity::BuildIdentity`], project paths and identifiers.
//! * [`codec`] – The stable byte encoding of build identity.
//! * [`raw`] – Arena of raw protocol nodes.
//! * [`mapping`] – View kind to protocol identifier registry.
//! * [`adapter`] – Identity-preserving, lazy adaptation and mix-ins.
//! * [`model`] – The typed views and request targets.
//! * [`compat`] – Capability providers for older backends.
//! * [`transport`] – The transport boundary, cancellation and a fixture replayer.
//! * [`controller`] – [`controller::BuildController`], the retrieval client.
//! * [`settings`] – Layered client settings.
//!
//! ## Errors
//! Only [`error::BuildlinkError::UnknownModel`] has a sanctioned local
//! recovery: the `find_model*` operations turn it into `None`. Every other
//! error kind propagates unchanged.
//!
//! ## Quick Start
//! ```
//! use buildlink::controller::BuildController;
//! use buildlink::compat::CompatibilityContext;
//! use buildlink::transport::FixtureTransport;
//!
//! let fixture = r#"{
//!   "graph": { "nodes": [
//!     { "type": "Build", "fields": { "rootProject": {"$ref": 1}, "projects": [{"$ref": 1}, {"$ref": 2}] } },
//!     { "type": "Project", "fields": { "name": "repo", "path": ":", "children": [{"$ref": 2}] } },
//!     { "type": "Project", "fields": { "name": "app", "path": ":app", "children": [] } }
//!   ] },
//!   "models": [ { "identifier": "buildlink.model.BuildStructure", "root": 0 } ]
//! }"#;
//! let controller = BuildController::new(FixtureTransport::from_json(fixture).unwrap())
//!     .with_compatibility(CompatibilityContext::new("repo", "/repo").unwrap());
//! let build = controller.get_build_model().unwrap();
//! let app = &build.projects().unwrap()[1];
//! assert_eq!(app.project_identifier().unwrap().to_string(), "(repo, /repo, :app)");
//! ```

pub mod adapter;
pub mod codec;
pub mod compat;
pub mod controller;
pub mod error;
pub mod identity;
pub mod mapping;
pub mod model;
pub mod raw;
pub mod settings;
pub mod transport;
