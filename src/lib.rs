//! # Trellis: Interface-Driven Resource Navigation
//!
//! Trellis serves a population of atoms and relation tuples through *interfaces*: trees of
//! relational expressions that say, for each kind of resource, which related atoms may be
//! read, created, updated or deleted. Clients address data by walking a path through an
//! interface tree and apply read and write verbs to whatever the path ends in.
//!
//! ## Core Concepts
//!
//! ### Concepts and Atoms
//! A concept is a named type, either an object (identity-bearing) or a scalar (strings,
//! numbers, dates). An atom is an identifier typed by a concept, written `id[Concept]`.
//!
//! ### Relations
//! A relation `name[Src*Tgt]` is a set of (source, target) tuples, optionally univalent
//! (at most one target per source) or injective.
//!
//! ### Interfaces
//! An interface is a tree of steps. Each expression step maps a source atom to target
//! atoms (identity, a single, possibly flipped, relation, or a composition), carries CRUD
//! flags and may have children or reference another interface. Text steps carry fixed text.
//!
//! ### Resources and Resource Lists
//! A [`Resource`] is one object atom reached through a step; a [`ResourceList`] is the
//! target set of one step from one resource. A path alternates between the two:
//!
//! ```text
//! resource/Person/p1 / People / Projects / prj1 / ProjectName
//! └── entry resource ┘ └ list ┘ └─ list ─┘ └res┘ └── list ───┘
//! ```
//!
//! Identity steps do not consume a path segment: the list of an identity step collapses
//! into its single target.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ HTTP API Layer (Axum routes)            │
//! ├─────────────────────────────────────────┤
//! │ Transactions (snapshot, invariants)     │
//! ├─────────────────────────────────────────┤
//! │ Resource / ResourceList / path walker   │
//! ├─────────────────────────────────────────┤
//! │ Model (concepts, relations, interfaces) │
//! ├─────────────────────────────────────────┤
//! │ Atom Store (trait-based abstraction)    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! # use std::sync::Arc;
//! # use serde_json::json;
//! # use trellis::{
//! #     HookRegistry, InMemoryAtomStore, InterfaceDefinition, Model, ModelDefinition, Options,
//! #     RecursionGuard, RequestContext,
//! # };
//! let model: ModelDefinition = serde_json::from_value(json!({
//!     "concepts": [
//!         {"name": "Person", "type": "OBJECT"},
//!         {"name": "Name", "type": "ALPHANUMERIC"}
//!     ],
//!     "relations": [{"signature": "name[Person*Name]", "uni": true}]
//! }))
//! .unwrap();
//! let interfaces: Vec<InterfaceDefinition> = serde_json::from_value(json!([{
//!     "id": "People",
//!     "label": "People",
//!     "ifcObject": {
//!         "type": "ObjExpression", "id": "People", "crud": "CRUD",
//!         "expr": {"kind": "ident"}, "srcConcept": "Person",
//!         "subinterfaces": {"ifcObjects": [{
//!             "type": "ObjExpression", "id": "Name", "crud": "cRUd", "isUni": true,
//!             "expr": {"kind": "relation", "relation": "name[Person*Name]"}
//!         }]}
//!     }
//! }]))
//! .unwrap();
//!
//! let model = Arc::new(Model::from_definitions(model, interfaces).unwrap());
//! let store = Arc::new(InMemoryAtomStore::new());
//! let ctx = RequestContext::new(model, store, Arc::new(HookRegistry::new()));
//!
//! // Walking into People creates p1, since People permits create.
//! let p1 = ctx.resource("Person", "p1").unwrap();
//! p1.walk_path_to_resource_list("People/Name")
//!     .unwrap()
//!     .set(&json!("Ann"))
//!     .unwrap();
//!
//! let name = p1.walk_path_to_resource_list("People/Name").unwrap();
//! let value = name
//!     .get(&Options::default(), None, &RecursionGuard::new())
//!     .unwrap();
//! assert_eq!(value, json!("Ann"));
//! ```

mod api;
mod concept;
mod config;
mod context;
mod data_store;
mod errors;
mod hooks;
mod interface;
mod memo;
mod model;
mod options;
mod relation;
mod resource;
mod resource_list;
mod transaction;
mod view;

// CLI utility modules

/// Command-line interface utilities for program termination and output formatting.
pub mod cli_utils;

/// HTTP client utilities for talking to a trellis server.
pub mod http_utils;

/// Tracing subscriber setup for the binaries.
pub mod logging;

pub use api::{AppState, MutationResponse, QueryParams, create_resource_router};
pub use concept::{Atom, Concept, ConceptType};
pub use config::ServerConfig;
pub use context::{RequestContext, UploadedFile};
pub use data_store::{AtomStore, InMemoryAtomStore, Link, Population, StoreSnapshot, TargetRow};
pub use errors::{DataStoreError, ErrorKind, ModelError, ResourceError};
pub use hooks::{CreationHook, FileUploadHook, HookRegistry};
pub use interface::{
    Crud, ExprNode, Expression, ExpressionDefinition, Interface, InterfaceDefinition,
    InterfaceNode, ObjectDefinition, Reference, Step, StepDefinition, SubinterfacesDefinition,
    TextNode,
};
pub use memo::Memo;
pub use model::{Model, ModelDefinition, load_document};
pub use options::{Options, RecursionGuard};
pub use relation::{Relation, RelationDefinition};
pub use resource::{FieldValue, Resource, Walked};
pub use resource_list::ResourceList;
pub use transaction::{
    InvariantRules, NoInvariants, Notifications, RequestType, StoreTransaction,
    TransactionOutcome, Violation,
};
pub use view::{SegmentKind, View, ViewSegment};
