//! # HTTP Binding
//!
//! Binds the resource operations to HTTP routes:
//!
//! ```text
//! GET    /resource                          concept names (403 in production)
//! GET    /resource/{concept}                all atoms of an object concept
//! PUT    /resource/{concept}                501
//! GET    /resource/{concept}/{id}           the entry resource
//! PATCH  /resource/{concept}/{id}           patch document against the entry resource
//! GET    /resource/{concept}/{id}/{path}    resource or list at path
//! PUT    /resource/{concept}/{id}/{path}    replace list content or resource fields
//! PATCH  /resource/{concept}/{id}/{path}    patch document against the resource at path
//! POST   /resource/{concept}/{id}/{path}    create a target (JSON or multipart)
//! DELETE /resource/{concept}/{id}/{path}    delete or unlink the resource at path
//! ```
//!
//! Reads and writes share a process-wide lock; writes are exclusive. Every write runs inside
//! a [`StoreTransaction`] and reports the transaction outcome next to its content.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::Uri;
use axum::http::header::CONTENT_TYPE;
use axum::response::Json;
use axum::routing::get;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::hooks::FileUploadHook;
use crate::model::load_document;
use crate::transaction::{
    InvariantRules, NoInvariants, Notifications, RequestType, StoreTransaction,
};
use crate::{
    AtomStore, HookRegistry, InMemoryAtomStore, Model, ModelError, Options, Population,
    RecursionGuard, RequestContext, ResourceError, ServerConfig, UploadedFile, Walked,
};

/////////////////////////////////////////////// AppState ///////////////////////////////////////////////

/// Shared state of the resource router.
#[derive(Clone)]
pub struct AppState {
    model: Arc<Model>,
    store: Arc<dyn AtomStore>,
    hooks: Arc<HookRegistry>,
    rules: Arc<dyn InvariantRules>,
    lock: Arc<RwLock<()>>,
    production_env: bool,
    default_roles: Vec<String>,
}

impl AppState {
    pub fn new(model: Arc<Model>, store: Arc<dyn AtomStore>, hooks: Arc<HookRegistry>) -> Self {
        Self {
            model,
            store,
            hooks,
            rules: Arc::new(NoInvariants),
            lock: Arc::new(RwLock::new(())),
            production_env: false,
            default_roles: Vec::new(),
        }
    }

    /// Loads the model and population named by `config` into a fresh in-memory store and
    /// registers a [`FileUploadHook`] for every file-object concept.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ModelError> {
        let model = Model::load(
            &config.resolve(&config.model_file),
            &config.resolve(&config.interfaces_file),
        )?;
        let store: Arc<dyn AtomStore> = Arc::new(InMemoryAtomStore::new());
        if let Some(population_file) = &config.population_file {
            let population: Population = load_document(&config.resolve(population_file))?;
            population.load_into(&model, store.as_ref())?;
        }
        let mut hooks = HookRegistry::new();
        for concept in model.file_object_concepts() {
            hooks.register(
                concept.name.clone(),
                Arc::new(FileUploadHook::new(
                    config.upload_dir(),
                    config.upload_path.clone(),
                )),
            );
        }
        Ok(Self::new(Arc::new(model), store, Arc::new(hooks))
            .with_production_env(config.production_env)
            .with_default_roles(config.default_roles.clone()))
    }

    pub fn with_invariant_rules(mut self, rules: Arc<dyn InvariantRules>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_production_env(mut self, production_env: bool) -> Self {
        self.production_env = production_env;
        self
    }

    pub fn with_default_roles(mut self, roles: Vec<String>) -> Self {
        self.default_roles = roles;
        self
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn store(&self) -> &Arc<dyn AtomStore> {
        &self.store
    }

    fn context(&self, params: &QueryParams) -> RequestContext {
        RequestContext::new(self.model.clone(), self.store.clone(), self.hooks.clone())
            .with_roles(params.roles(&self.default_roles))
    }
}

////////////////////////////////////////////// QueryParams /////////////////////////////////////////////

/// Query parameters understood by every route.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    pub role_ids: Option<String>,
    pub meta_data: Option<String>,
    pub nav_ifc: Option<String>,
    pub incl_linkto_data: Option<String>,
    pub incl_ref_ifcs: Option<String>,
    pub force_list: Option<String>,
    pub depth: Option<String>,
    pub request_type: Option<String>,
    pub success_message: Option<String>,
}

impl QueryParams {
    /// The comma-separated `roleIds`, or `default` when none are given.
    pub fn roles(&self, default: &[String]) -> Vec<String> {
        let roles: Vec<String> = self
            .role_ids
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();
        if roles.is_empty() {
            default.to_vec()
        } else {
            roles
        }
    }

    /// Serialization options; absent flags are off.
    pub fn options(&self) -> Result<Options, ResourceError> {
        let defaults = Options::minimal();
        let depth = match self.depth.as_deref().map(str::trim) {
            None | Some("") => defaults.depth,
            Some(d) => Some(
                d.parse::<u32>()
                    .map_err(|_| ResourceError::bad_request(format!("Invalid depth '{}'", d)))?,
            ),
        };
        Ok(Options {
            include_meta_data: flag(&self.meta_data, defaults.include_meta_data),
            include_nav_ifcs: flag(&self.nav_ifc, defaults.include_nav_ifcs),
            include_ref_ifcs: flag(&self.incl_ref_ifcs, defaults.include_ref_ifcs),
            include_linkto_data: flag(&self.incl_linkto_data, defaults.include_linkto_data),
            force_list: flag(&self.force_list, defaults.force_list),
            depth,
        })
    }

    pub fn request_type(&self) -> Result<RequestType, ResourceError> {
        match self.request_type.as_deref() {
            Some(s) if !s.trim().is_empty() => s.parse(),
            _ => Ok(RequestType::default()),
        }
    }
}

/// `1`, `true`, `on` and `yes` are true; any other value is false.
fn flag(value: &Option<String>, default: bool) -> bool {
    match value {
        None => default,
        Some(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "on" | "yes"
        ),
    }
}

//////////////////////////////////////////// MutationResponse //////////////////////////////////////////

/// The body of every successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patches: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    pub notifications: Notifications,
    pub invariant_rules_hold: bool,
    pub request_type: RequestType,
}

/////////////////////////////////////////////// Handlers ///////////////////////////////////////////////

async fn list_concepts(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ResourceError> {
    if state.production_env {
        return Err(ResourceError::forbidden(
            "List of all resource types is not available in production environment",
        ));
    }
    Ok(Json(state.model.concept_names()))
}

async fn list_atoms(
    State(state): State<AppState>,
    Path(concept): Path<String>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Value>, ResourceError> {
    let _guard = state.lock.read().await;
    let ctx = state.context(&params);
    read_atoms(&ctx, &concept, &params.options()?).map(Json)
}

async fn replace_atoms(Path(_concept): Path<String>) -> Result<Json<Value>, ResourceError> {
    Err(ResourceError::not_implemented("Not implemented yet"))
}

async fn get_entry(
    State(state): State<AppState>,
    Path((concept, id)): Path<(String, String)>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Value>, ResourceError> {
    let _guard = state.lock.read().await;
    let ctx = state.context(&params);
    read_entry(&ctx, &concept, &id, &params.options()?).map(Json)
}

async fn patch_entry(
    State(state): State<AppState>,
    Path((concept, id)): Path<(String, String)>,
    Query(params): Query<QueryParams>,
    Json(body): Json<Value>,
) -> Result<Json<MutationResponse>, ResourceError> {
    let _guard = state.lock.write().await;
    mutate(
        &state,
        &params,
        None,
        format!("{} updated", concept),
        Some(&body),
        |ctx, options| {
            let resource = ctx.resource(&concept, &id)?.patch(&body)?;
            Ok(Some(resource.get(options, options.depth, &RecursionGuard::new())?))
        },
    )
    .map(Json)
}

async fn get_path(
    State(state): State<AppState>,
    Path((concept, id, _)): Path<(String, String, String)>,
    Query(params): Query<QueryParams>,
    uri: Uri,
) -> Result<Json<Value>, ResourceError> {
    let tail = TailPath::from_uri(&uri)?;
    let _guard = state.lock.read().await;
    let ctx = state.context(&params);
    read_path(&ctx, &concept, &id, &tail, &params.options()?).map(Json)
}

async fn put_path(
    State(state): State<AppState>,
    Path((concept, id, _)): Path<(String, String, String)>,
    Query(params): Query<QueryParams>,
    uri: Uri,
    Json(body): Json<Value>,
) -> Result<Json<MutationResponse>, ResourceError> {
    let tail = TailPath::from_uri(&uri)?;
    let _guard = state.lock.write().await;
    mutate(
        &state,
        &params,
        None,
        format!("{} updated", concept),
        None,
        |ctx, options| {
            let guard = RecursionGuard::new();
            let resource = ctx.resource(&concept, &id)?;
            let content = match resource.walk_segments(&tail.segments())? {
                Walked::List(list) => {
                    list.put(&body)?;
                    list.get(options, options.depth, &guard)?
                }
                Walked::Resource(resource) => resource
                    .put(Some(&body))?
                    .get(options, options.depth, &guard)?,
            };
            Ok(Some(content))
        },
    )
    .map(Json)
}

async fn patch_path(
    State(state): State<AppState>,
    Path((concept, id, _)): Path<(String, String, String)>,
    Query(params): Query<QueryParams>,
    uri: Uri,
    Json(body): Json<Value>,
) -> Result<Json<MutationResponse>, ResourceError> {
    let tail = TailPath::from_uri(&uri)?;
    let _guard = state.lock.write().await;
    mutate(
        &state,
        &params,
        None,
        format!("{} updated", concept),
        Some(&body),
        |ctx, options| {
            let resource = ctx
                .resource(&concept, &id)?
                .walk_segments(&tail.segments())?
                .into_resource(&tail.display())?
                .patch(&body)?;
            Ok(Some(resource.get(options, options.depth, &RecursionGuard::new())?))
        },
    )
    .map(Json)
}

async fn post_path(
    State(state): State<AppState>,
    Path((concept, id, _)): Path<(String, String, String)>,
    Query(params): Query<QueryParams>,
    uri: Uri,
    request: Request,
) -> Result<Json<MutationResponse>, ResourceError> {
    let tail = TailPath::from_uri(&uri)?;
    let (body, upload) = read_post_body(&state, request).await?;
    let spooled = upload.as_ref().map(|u| u.tmp_path.clone());
    let result = {
        let _guard = state.lock.write().await;
        mutate(
            &state,
            &params,
            upload,
            format!("{} created", concept),
            None,
            |ctx, options| {
                let created = ctx
                    .resource(&concept, &id)?
                    .walk_segments(&tail.segments())?
                    .into_list(&tail.display())?
                    .post(&body)?;
                Ok(Some(created.get(options, options.depth, &RecursionGuard::new())?))
            },
        )
    };
    if let Some(tmp) = spooled {
        remove_spooled(&tmp).await;
    }
    result.map(Json)
}

async fn delete_path(
    State(state): State<AppState>,
    Path((concept, id, _)): Path<(String, String, String)>,
    Query(params): Query<QueryParams>,
    uri: Uri,
) -> Result<Json<MutationResponse>, ResourceError> {
    let tail = TailPath::from_uri(&uri)?;
    let _guard = state.lock.write().await;
    mutate(
        &state,
        &params,
        None,
        format!("{} deleted", concept),
        None,
        |ctx, _| {
            ctx.resource(&concept, &id)?
                .walk_segments(&tail.segments())?
                .into_resource(&tail.display())?
                .delete()?;
            Ok(None)
        },
    )
    .map(Json)
}

/////////////////////////////////////////////// Helpers ////////////////////////////////////////////////

fn read_atoms(
    ctx: &RequestContext,
    concept: &str,
    options: &Options,
) -> Result<Value, ResourceError> {
    let c = ctx.model().concept_or_not_found(concept)?;
    if !c.is_object() {
        return Err(ResourceError::bad_request(format!(
            "Concept '{}' is not an object concept",
            concept
        )));
    }
    let guard = RecursionGuard::new();
    let mut atoms = Vec::new();
    for id in ctx.store().atoms(concept)? {
        atoms.push(ctx.resource(concept, &id)?.get(options, Some(0), &guard)?);
    }
    Ok(Value::Array(atoms))
}

fn read_entry(
    ctx: &RequestContext,
    concept: &str,
    id: &str,
    options: &Options,
) -> Result<Value, ResourceError> {
    let resource = ctx.resource(concept, id)?;
    if !ctx.store().exists(resource.atom())? {
        return Err(ResourceError::not_found(format!(
            "Resource '{}' not found",
            resource.atom()
        )));
    }
    let content = resource.get(options, options.depth, &RecursionGuard::new())?;
    Ok(force_list(content, options))
}

/// The `*path` tail of a request URI, split before percent-decoding so an encoded `/`
/// stays inside its segment.
struct TailPath {
    segments: Vec<String>,
}

impl TailPath {
    fn from_uri(uri: &Uri) -> Result<Self, ResourceError> {
        let segments = uri
            .path()
            .split('/')
            .filter(|s| !s.is_empty())
            .skip(3)
            .map(|raw| {
                percent_decode_str(raw)
                    .decode_utf8()
                    .map(|s| s.into_owned())
                    .map_err(|_| {
                        ResourceError::bad_request(format!("Invalid path segment '{}'", raw))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    fn segments(&self) -> Vec<&str> {
        self.segments.iter().map(String::as_str).collect()
    }

    fn display(&self) -> String {
        self.segments.join("/")
    }
}

/// Reads the resource or list at `tail`. Reads never create atoms.
fn read_path(
    ctx: &RequestContext,
    concept: &str,
    id: &str,
    tail: &TailPath,
    options: &Options,
) -> Result<Value, ResourceError> {
    let guard = RecursionGuard::new();
    match ctx.resource(concept, id)?.find_segments(&tail.segments())? {
        Walked::Resource(resource) => Ok(force_list(
            resource.get(options, options.depth, &guard)?,
            options,
        )),
        Walked::List(list) => list.get(options, options.depth, &guard),
    }
}

fn force_list(content: Value, options: &Options) -> Value {
    if options.force_list && !content.is_array() {
        Value::Array(vec![content])
    } else {
        content
    }
}

/// Runs `op` inside a transaction and wraps its content with the transaction outcome.
fn mutate<F>(
    state: &AppState,
    params: &QueryParams,
    upload: Option<UploadedFile>,
    default_message: String,
    patches: Option<&Value>,
    op: F,
) -> Result<MutationResponse, ResourceError>
where
    F: FnOnce(&RequestContext, &Options) -> Result<Option<Value>, ResourceError>,
{
    let options = params.options()?;
    let request_type = params.request_type()?;
    let mut ctx = state.context(params);
    if let Some(upload) = upload {
        ctx = ctx.with_upload(upload);
    }

    let mut tx = StoreTransaction::open(ctx.store())?;
    tx.set_request_type(request_type);
    let content = match op(&ctx, &options) {
        Ok(content) => content,
        Err(err) => {
            if let Err(rollback) = tx.rollback() {
                tracing::error!(error = %rollback, "rollback failed");
            }
            ctx.discard_stored_files();
            return Err(err);
        }
    };

    let message = params.success_message.clone().unwrap_or(default_message);
    let outcome = match tx.close(&message, ctx.model(), state.rules.as_ref()) {
        Ok(outcome) => outcome,
        Err(err) => {
            ctx.discard_stored_files();
            return Err(err);
        }
    };
    if !outcome.committed {
        ctx.discard_stored_files();
    }
    Ok(MutationResponse {
        patches: patches.cloned(),
        content,
        notifications: outcome.notifications,
        invariant_rules_hold: outcome.invariant_rules_hold,
        request_type: outcome.request_type,
    })
}

static UPLOAD_COUNTER: AtomicU64 = AtomicU64::new(0);

fn spool_path() -> PathBuf {
    std::env::temp_dir().join(format!(
        "trellis-upload-{}-{}",
        std::process::id(),
        UPLOAD_COUNTER.fetch_add(1, Ordering::Relaxed)
    ))
}

async fn remove_spooled(tmp: &std::path::Path) {
    if let Err(err) = tokio::fs::remove_file(tmp).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %tmp.display(), error = %err, "could not remove spooled upload");
        }
    }
}

/// Reads a `POST` body: plain JSON, or multipart with a `file` part and a JSON `body` part.
///
/// An empty body is the empty object. Bodies are bounded by the router's body limit.
async fn read_post_body(
    state: &AppState,
    request: Request,
) -> Result<(Value, Option<UploadedFile>), ResourceError> {
    let multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if !multipart {
        let bytes = Bytes::from_request(request, state)
            .await
            .map_err(|e| ResourceError::bad_request(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok((json!({}), None));
        }
        let body = serde_json::from_slice(&bytes)
            .map_err(|e| ResourceError::bad_request(format!("Invalid JSON body: {}", e)))?;
        return Ok((body, None));
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| ResourceError::bad_request(e.body_text()))?;
    let mut body = json!({});
    let mut upload = None;
    match read_parts(&mut multipart, &mut body, &mut upload).await {
        Ok(()) => Ok((body, upload)),
        Err(err) => {
            if let Some(upload) = upload {
                remove_spooled(&upload.tmp_path).await;
            }
            Err(err)
        }
    }
}

/// Reads the multipart fields into `body` and `upload`; `upload` is set as soon as a file
/// was spooled, also when a later field fails.
async fn read_parts(
    multipart: &mut Multipart,
    body: &mut Value,
    upload: &mut Option<UploadedFile>,
) -> Result<(), ResourceError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ResourceError::bad_request(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                if upload.is_some() {
                    return Err(ResourceError::bad_request(
                        "Exactly one file expected in file upload",
                    ));
                }
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ResourceError::bad_request(e.body_text()))?;
                let tmp_path = spool_path();
                *upload = Some(UploadedFile {
                    tmp_path: tmp_path.clone(),
                    original_name,
                });
                tokio::fs::write(&tmp_path, &bytes).await.map_err(|e| {
                    ResourceError::internal(format!("Error in file upload: {}", e))
                })?;
            }
            Some("body") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ResourceError::bad_request(e.body_text()))?;
                if !text.trim().is_empty() {
                    *body = serde_json::from_str(&text).map_err(|e| {
                        ResourceError::bad_request(format!("Invalid JSON body: {}", e))
                    })?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

//////////////////////////////////////////////// Router ////////////////////////////////////////////////

/// Creates the resource router.
pub fn create_resource_router(state: AppState) -> Router {
    Router::new()
        .route("/resource", get(list_concepts))
        .route("/resource/:concept", get(list_atoms).put(replace_atoms))
        .route("/resource/:concept/:id", get(get_entry).patch(patch_entry))
        .route(
            "/resource/:concept/:id/*path",
            get(get_path)
                .put(put_path)
                .patch(patch_path)
                .post(post_path)
                .delete(delete_path),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        for v in ["1", "true", "TRUE", "on", "Yes"] {
            assert!(flag(&Some(v.to_string()), false));
        }
        for v in ["0", "false", "off", "no", "maybe", ""] {
            assert!(!flag(&Some(v.to_string()), true));
        }
        assert!(flag(&None, true));
        assert!(!flag(&None, false));
    }

    #[test]
    fn params_build_options_and_roles() {
        let params = QueryParams {
            role_ids: Some("Administrator, Reader,".to_string()),
            meta_data: Some("0".to_string()),
            force_list: Some("yes".to_string()),
            depth: Some("2".to_string()),
            ..QueryParams::default()
        };
        let options = params.options().unwrap();
        assert!(!options.include_meta_data);
        assert!(!options.include_nav_ifcs);
        assert!(options.force_list);
        assert_eq!(options.depth, Some(2));
        assert_eq!(params.roles(&[]), vec!["Administrator", "Reader"]);
        assert_eq!(
            QueryParams::default().roles(&["Guest".to_string()]),
            vec!["Guest"]
        );

        let bad = QueryParams {
            depth: Some("deep".to_string()),
            ..QueryParams::default()
        };
        assert_eq!(
            bad.options().unwrap_err().kind(),
            crate::ErrorKind::BadRequest
        );
        let feedback = QueryParams {
            request_type: Some("feedback".to_string()),
            ..QueryParams::default()
        };
        assert_eq!(feedback.request_type().unwrap(), RequestType::Feedback);
    }
}
