#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use trellis::{
    AppState, AtomStore, HookRegistry, InMemoryAtomStore, Model, Population, RequestContext,
    ServerConfig, load_document,
};

/// Path of a file under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// The people-and-projects model.
pub fn model() -> Arc<Model> {
    Arc::new(Model::load(&fixture("model.json"), &fixture("interfaces.json")).unwrap())
}

/// A fresh store holding the fixture population.
pub fn store(model: &Model) -> Arc<dyn AtomStore> {
    let store: Arc<dyn AtomStore> = Arc::new(InMemoryAtomStore::new());
    let population: Population = load_document(&fixture("population.yaml")).unwrap();
    population.load_into(model, store.as_ref()).unwrap();
    store
}

/// A request context over a fresh fixture store.
pub fn context(roles: &[&str]) -> RequestContext {
    let model = model();
    let store = store(&model);
    RequestContext::new(model, store, Arc::new(HookRegistry::new()))
        .with_roles(roles.iter().map(|r| r.to_string()).collect())
}

/// Server configuration over the fixtures, storing uploads below `root`.
pub fn server_config(root: &Path) -> ServerConfig {
    ServerConfig {
        model_file: fixture("model.json"),
        interfaces_file: fixture("interfaces.json"),
        population_file: Some(fixture("population.yaml")),
        absolute_path: root.to_path_buf(),
        upload_path: "uploads".to_string(),
        ..ServerConfig::default()
    }
}

/// Application state over the fixtures, storing uploads below `root`.
pub fn app_state(root: &Path) -> AppState {
    AppState::from_config(&server_config(root)).unwrap()
}
