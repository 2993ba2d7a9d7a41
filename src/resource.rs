//! # Resources and the Path Walker
//!
//! A [`Resource`] is one object atom seen through one interface step. Resources are built
//! per request while walking a path and dropped with the request; they own their lazily
//! computed label, view and serialization data, nothing else.
//!
//! ## Paths
//!
//! ```text
//! resource/Person/p1                              entry resource
//! resource/Person/p1/People/Projects/prj1         parent path / step id / atom id
//! resource/Person/p1                              identity step: parent path unchanged
//! session                                         entry resource of the session concept
//! ```
//!
//! ## Walking
//!
//! [`Resource::walk_path`] alternates between resources and lists. From a resource the next
//! segment names a step and yields a [`ResourceList`]; from a list the next segment names a
//! target and yields a resource, except for identity steps, which collapse to their single
//! target without consuming a segment.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{Map, Value, json};

use crate::concept::json_type_name;
use crate::view::flatten;
use crate::{
    Atom, Concept, ExprNode, InterfaceNode, Memo, Options, RecursionGuard, RequestContext,
    ResourceError, ResourceList, SegmentKind,
};

/////////////////////////////////////////////// FieldValue /////////////////////////////////////////////

/// The value of one field of a resource, as read by [`Resource::field`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A univalent field without a value.
    Null,
    /// A scalar value, typed by its concept.
    Scalar(Value),
    /// The identifier of an object atom.
    Id(String),
    /// The values of a multivalent field.
    List(Vec<FieldValue>),
}

impl FieldValue {
    fn from_json(value: &Value, object_target: bool) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Array(items) => FieldValue::List(
                items
                    .iter()
                    .map(|item| FieldValue::from_json(item, object_target))
                    .collect(),
            ),
            Value::String(id) if object_target => FieldValue::Id(id.clone()),
            Value::Object(map) if object_target => match map.get("_id_") {
                Some(Value::String(id)) => FieldValue::Id(id.clone()),
                _ => FieldValue::Scalar(value.clone()),
            },
            other => FieldValue::Scalar(other.clone()),
        }
    }
}

///////////////////////////////////////////////// Walked ///////////////////////////////////////////////

/// Where a path walk ended.
#[derive(Debug)]
pub enum Walked<'a> {
    Resource(Rc<Resource<'a>>),
    List(ResourceList<'a>),
}

impl<'a> Walked<'a> {
    /// The resource the walk ended on; a terminal identity list collapses to its target.
    pub fn into_resource(self, path: &str) -> Result<Rc<Resource<'a>>, ResourceError> {
        match self {
            Walked::Resource(resource) => Ok(resource),
            Walked::List(list) if list.node().is_ident() => list.one(None),
            Walked::List(_) => Err(ResourceError::bad_request(format!(
                "Provided path '{}' MUST end with a resource identifier",
                path
            ))),
        }
    }

    /// The list the walk ended on.
    pub fn into_list(self, path: &str) -> Result<ResourceList<'a>, ResourceError> {
        match self {
            Walked::List(list) => Ok(list),
            Walked::Resource(_) => Err(ResourceError::bad_request(format!(
                "Provided path '{}' MUST NOT end with a resource identifier",
                path
            ))),
        }
    }
}

/// Splits a slash-separated path, dropping empty segments.
fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

//////////////////////////////////////////////// Resource //////////////////////////////////////////////

/// An object atom reached at a specific point of an interface tree.
pub struct Resource<'a> {
    ctx: &'a RequestContext,
    atom: Atom,
    concept: &'a Concept,
    /// The step that produced this resource; `None` for entry resources.
    node: Option<&'a ExprNode>,
    parent: Option<Rc<Resource<'a>>>,
    path: String,
    query_data: RefCell<Option<HashMap<String, Option<String>>>>,
    label: Memo<String>,
    view: Memo<Option<Value>>,
    ifc_data: RefCell<Option<Map<String, Value>>>,
    incl_meta: Cell<bool>,
    incl_nav: Cell<bool>,
}

impl<'a> Resource<'a> {
    fn build(
        ctx: &'a RequestContext,
        id: String,
        concept: &'a Concept,
        node: Option<&'a ExprNode>,
        parent: Option<Rc<Resource<'a>>>,
        query_data: Option<HashMap<String, Option<String>>>,
    ) -> Result<Rc<Self>, ResourceError> {
        if !concept.is_object() {
            return Err(ResourceError::bad_request(format!(
                "Cannot instantiate resource, because its type '{}' is a non-object concept",
                concept
            )));
        }
        let path = match (&parent, node) {
            (Some(parent), Some(node)) if node.is_ident() => parent.path.clone(),
            (Some(parent), Some(node)) => format!("{}/{}/{}", parent.path, node.id(), id),
            _ if concept.is_session => "session".to_string(),
            _ => format!("resource/{}/{}", concept.name, id),
        };
        Ok(Rc::new(Self {
            ctx,
            atom: Atom::new(id, concept.name.clone()),
            concept,
            node,
            parent,
            path,
            query_data: RefCell::new(query_data),
            label: Memo::new(),
            view: Memo::new(),
            ifc_data: RefCell::new(None),
            incl_meta: Cell::new(false),
            incl_nav: Cell::new(false),
        }))
    }

    /// The entry resource `id[concept]`, the start of every walk.
    pub(crate) fn entry(
        ctx: &'a RequestContext,
        concept: &'a Concept,
        id: &str,
    ) -> Result<Rc<Self>, ResourceError> {
        Self::build(ctx, id.to_string(), concept, None, None, None)
    }

    /// A target of `node` reached from `parent`.
    pub(crate) fn child(
        ctx: &'a RequestContext,
        id: String,
        node: &'a ExprNode,
        parent: Rc<Resource<'a>>,
        query_data: Option<HashMap<String, Option<String>>>,
    ) -> Result<Rc<Self>, ResourceError> {
        let concept = ctx.model().concept(node.tgt_concept()).ok_or_else(|| {
            ResourceError::internal(format!("Concept '{}' is not defined", node.tgt_concept()))
        })?;
        Self::build(ctx, id, concept, Some(node), Some(parent), query_data)
    }

    pub(crate) fn ctx(&self) -> &'a RequestContext {
        self.ctx
    }

    pub fn id(&self) -> &str {
        &self.atom.id
    }

    pub fn atom(&self) -> &Atom {
        &self.atom
    }

    pub fn concept(&self) -> &'a Concept {
        self.concept
    }

    /// The step that produced this resource; `None` for entry resources.
    pub fn node(&self) -> Option<&'a ExprNode> {
        self.node
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The resource this one was reached from.
    pub fn parent(&self) -> Result<&Rc<Resource<'a>>, ResourceError> {
        self.parent
            .as_ref()
            .ok_or_else(|| ResourceError::bad_request("Parent resource not provided"))
    }

    /// Prefilled target of the step `id`, if the query that produced this resource had it.
    ///
    /// The outer option tells whether the column exists, the inner whether it has a value.
    pub(crate) fn query_column(&self, id: &str) -> Option<Option<String>> {
        self.query_data
            .borrow()
            .as_ref()
            .and_then(|data| data.get(id).cloned())
    }

    /// Forgets the prefilled target of step `id` after the step's targets changed.
    pub(crate) fn clear_query_column(&self, id: &str) {
        if let Some(data) = self.query_data.borrow_mut().as_mut() {
            data.remove(id);
        }
    }

    /// Drops the cached label, view, serialization and query data.
    pub fn invalidate(&self) {
        self.label.invalidate();
        self.view.invalidate();
        *self.ifc_data.borrow_mut() = None;
        *self.query_data.borrow_mut() = None;
    }

    ////////////////////////////////////////////// Views //////////////////////////////////////////////

    fn view_projection(&self) -> Result<Option<Value>, ResourceError> {
        self.view.get_or_try_init(|| {
            let model = self.ctx.model();
            let Some(view) = model.view_for(self.node, self.concept) else {
                return Ok(None);
            };
            let mut values = Vec::with_capacity(view.segments.len());
            for segment in &view.segments {
                let value = match (segment.kind, &segment.relation) {
                    (SegmentKind::Exp, Some(signature)) => {
                        let relation = model.relation(signature)?;
                        self.ctx
                            .store()
                            .targets(relation, self.id(), segment.flipped)?
                            .join(", ")
                    }
                    _ => segment.text.clone().unwrap_or_default(),
                };
                values.push(value);
            }
            Ok(Some(view.project(values)))
        })
    }

    /// The display label: the flattened view, or the id when the view is empty.
    pub fn label(&self) -> Result<String, ResourceError> {
        self.label.get_or_try_init(|| {
            let text = self
                .view_projection()?
                .map(|p| flatten(&p))
                .unwrap_or_default();
            if text.trim().is_empty() {
                Ok(self.id().to_string())
            } else {
                Ok(text)
            }
        })
    }

    /// The keyed view projection, `None` for sequential or absent views.
    pub fn view_data(&self) -> Result<Option<Value>, ResourceError> {
        Ok(self.view_projection()?.filter(Value::is_object))
    }

    ///////////////////////////////////////////// Navigation /////////////////////////////////////////////

    /// The step `ifc_id` below this resource; `None` for text objects.
    fn subinterface(&self, ifc_id: &str) -> Result<Option<&'a ExprNode>, ResourceError> {
        let model = self.ctx.model();
        match self.node {
            None => Ok(Some(model.entry_interface(&self.concept.name, ifc_id)?)),
            Some(node) => Ok(model.subinterface(node, ifc_id)?.as_expression()),
        }
    }

    /// The list of targets of step `ifc_id`.
    pub fn all(self: &Rc<Self>, ifc_id: &str) -> Result<ResourceList<'a>, ResourceError> {
        match self.subinterface(ifc_id)? {
            Some(node) => ResourceList::new(Rc::clone(self), node, false),
            None => Err(ResourceError::bad_request(format!(
                "'{}' below '{}' is a text object without targets",
                ifc_id, self.path
            ))),
        }
    }

    /// One target of step `ifc_id`.
    pub fn one(
        self: &Rc<Self>,
        ifc_id: &str,
        tgt_id: Option<&str>,
    ) -> Result<Rc<Resource<'a>>, ResourceError> {
        self.all(ifc_id)?.one(tgt_id)
    }

    /// Walks `path` from this resource.
    ///
    /// A missing atom is created first when the first step permits create and the caller may
    /// use it, otherwise the walk fails. An empty path yields the resource itself.
    pub fn walk_path(self: &Rc<Self>, path: &str) -> Result<Walked<'a>, ResourceError> {
        self.walk_segments(&split_path(path))
    }

    /// [`Resource::walk_path`] over pre-split, already decoded segments.
    pub fn walk_segments(
        self: &Rc<Self>,
        segments: &[&str],
    ) -> Result<Walked<'a>, ResourceError> {
        self.materialize(segments.first().copied())?;
        self.walk(segments)
    }

    /// Like [`Resource::walk_segments`], but never creates the atom: a missing atom is Not Found.
    pub fn find_segments(
        self: &Rc<Self>,
        segments: &[&str],
    ) -> Result<Walked<'a>, ResourceError> {
        if !self.ctx.store().exists(&self.atom)? {
            return Err(self.not_found());
        }
        self.walk(segments)
    }

    fn not_found(&self) -> ResourceError {
        ResourceError::not_found(format!("Resource '{}' not found", self.atom))
    }

    /// Creates the atom if it is missing and `first` permits it.
    ///
    /// The caller's roles are checked against an interface root before anything is created.
    fn materialize(&self, first: Option<&str>) -> Result<(), ResourceError> {
        let store = self.ctx.store();
        if store.exists(&self.atom)? {
            return Ok(());
        }
        let node = match (self.node, first) {
            (Some(node), _) => node,
            (None, Some(first)) => self
                .ctx
                .model()
                .entry_interface(&self.concept.name, first)
                .map_err(|_| self.not_found())?,
            (None, None) => return Err(self.not_found()),
        };
        if node.is_root() && !node.is_accessible_for(self.ctx.roles()) {
            return Err(ResourceError::unauthorized(format!(
                "Unauthorized to access interface {}",
                node.label()
            )));
        }
        if !node.crud_c() {
            return Err(self.not_found());
        }
        store.create(&self.atom)?;
        Ok(())
    }

    fn walk(self: &Rc<Self>, segments: &[&str]) -> Result<Walked<'a>, ResourceError> {
        let mut segments = segments.iter().copied().filter(|s| !s.is_empty()).peekable();
        let mut current = Walked::Resource(Rc::clone(self));
        loop {
            current = match current {
                Walked::Resource(resource) => match segments.next() {
                    None => return Ok(Walked::Resource(resource)),
                    Some(segment) => Walked::List(resource.all(segment)?),
                },
                Walked::List(list) => {
                    if segments.peek().is_none() {
                        return Ok(Walked::List(list));
                    }
                    if list.node().is_ident() {
                        Walked::Resource(list.one(None)?)
                    } else {
                        Walked::Resource(list.one(segments.next())?)
                    }
                }
            };
        }
    }

    /// Walks `path`, which must end on a resource.
    ///
    /// A path ending on an identity step collapses to its single target first.
    pub fn walk_path_to_resource(
        self: &Rc<Self>,
        path: &str,
    ) -> Result<Rc<Resource<'a>>, ResourceError> {
        self.walk_path(path)?.into_resource(path)
    }

    /// Walks `path`, which must end on a list.
    pub fn walk_path_to_resource_list(
        self: &Rc<Self>,
        path: &str,
    ) -> Result<ResourceList<'a>, ResourceError> {
        self.walk_path(path)?.into_list(path)
    }

    ///////////////////////////////////////////////// Read ////////////////////////////////////////////////

    fn expansion_guard(
        &self,
        node: &ExprNode,
        options: &Options,
        guard: &RecursionGuard,
    ) -> Option<RecursionGuard> {
        match node.reference() {
            None => Some(guard.clone()),
            Some(reference) => {
                let wanted = if reference.link_to {
                    options.include_linkto_data
                } else {
                    options.include_ref_ifcs
                };
                if wanted {
                    guard.enter(&reference.interface, self.id())
                } else {
                    None
                }
            }
        }
    }

    fn expand(
        self: &Rc<Self>,
        options: &Options,
        depth: Option<u32>,
        guard: &RecursionGuard,
    ) -> Result<Option<Map<String, Value>>, ResourceError> {
        let Some(node) = self.node else {
            return Ok(None);
        };
        let children = self.ctx.model().children(node);
        if depth == Some(0) || children.is_empty() {
            return Ok(None);
        }
        let Some(guard) = self.expansion_guard(node, options, guard) else {
            return Ok(None);
        };
        let child_depth = Options::child_depth(depth);
        let child_options = options.nested();
        let mut content = Map::new();
        for child in children {
            match child {
                InterfaceNode::Text(text) => {
                    content.insert(text.id().to_string(), Value::String(text.txt().to_string()));
                }
                InterfaceNode::Expression(sub) => {
                    if !sub.crud_r() {
                        continue;
                    }
                    let list = ResourceList::new(Rc::clone(self), sub, false)?;
                    content.insert(
                        sub.id().to_string(),
                        list.get(&child_options, child_depth, &guard)?,
                    );
                }
            }
        }
        Ok(Some(content))
    }

    /// Serializes the resource and its readable children.
    ///
    /// Children expand until `depth` reaches zero. References expand only when the options
    /// ask for them and the (interface, atom) pair is not already on the branch.
    pub fn get(
        self: &Rc<Self>,
        options: &Options,
        depth: Option<u32>,
        guard: &RecursionGuard,
    ) -> Result<Value, ResourceError> {
        let data = self.expand(options, depth, guard)?;
        *self.ifc_data.borrow_mut() = data;
        self.incl_meta.set(options.include_meta_data);
        self.incl_nav.set(options.include_nav_ifcs);
        self.to_json()
    }

    /// The serialized form from what was computed so far.
    ///
    /// Without metadata and without computed content the resource is its bare id.
    pub fn to_json(&self) -> Result<Value, ResourceError> {
        let mut content = Map::new();
        if self.incl_meta.get() {
            content.insert("_id_".to_string(), Value::String(self.id().to_string()));
            content.insert("_label_".to_string(), Value::String(self.label()?));
            content.insert("_path_".to_string(), Value::String(self.path.clone()));
            if let Some(view) = self.view_data()? {
                content.insert("_view_".to_string(), view);
            }
        }
        if self.incl_nav.get() {
            let ifcs: Vec<Value> = self
                .ctx
                .model()
                .navigable_interfaces(&self.concept.name, self.ctx.roles())
                .map(|ifc| json!({"id": ifc.id(), "label": ifc.label()}))
                .collect();
            content.insert("_ifcs_".to_string(), Value::Array(ifcs));
        }
        match self.ifc_data.borrow().as_ref() {
            Some(data) => content.extend(data.clone()),
            None if content.is_empty() => return Ok(Value::String(self.id().to_string())),
            None => {}
        }
        Ok(Value::Object(content))
    }

    fn load_fields(self: &Rc<Self>) -> Result<(), ResourceError> {
        if self.ifc_data.borrow().is_none() {
            let data = self.expand(&Options::bare(), Some(1), &RecursionGuard::new())?;
            *self.ifc_data.borrow_mut() = data;
        }
        Ok(())
    }

    /// Reads field `ifc_id`, loading one level of content on first access.
    ///
    /// Returns `None` when the field has no content, e.g. because it is not readable.
    pub fn field(self: &Rc<Self>, ifc_id: &str) -> Result<Option<FieldValue>, ResourceError> {
        let node = self.node.ok_or_else(|| {
            ResourceError::bad_request(format!("Resource '{}' has no fields", self.path))
        })?;
        let object_target = match self.ctx.model().subinterface(node, ifc_id)? {
            InterfaceNode::Expression(sub) => {
                let object = self
                    .ctx
                    .model()
                    .concept(sub.tgt_concept())
                    .map(Concept::is_object)
                    .unwrap_or(false);
                object && !(sub.is_leaf() && sub.is_prop())
            }
            InterfaceNode::Text(_) => false,
        };
        self.load_fields()?;
        let data = self.ifc_data.borrow();
        Ok(data
            .as_ref()
            .and_then(|d| d.get(ifc_id))
            .map(|value| FieldValue::from_json(value, object_target)))
    }

    /// True when field `ifc_id` has a non-null value.
    pub fn has_field(self: &Rc<Self>, ifc_id: &str) -> Result<bool, ResourceError> {
        self.load_fields()?;
        Ok(self
            .ifc_data
            .borrow()
            .as_ref()
            .and_then(|d| d.get(ifc_id))
            .is_some_and(|v| !v.is_null()))
    }

    /// Serializes the list of step `ifc_id`.
    pub fn get_list(
        self: &Rc<Self>,
        ifc_id: &str,
        options: &Options,
        depth: Option<u32>,
    ) -> Result<Value, ResourceError> {
        self.all(ifc_id)?
            .get(options, depth, &RecursionGuard::new())
    }

    //////////////////////////////////////////////// Write ////////////////////////////////////////////////

    /// Updates the resource attribute by attribute.
    ///
    /// An absent or `null` body changes nothing. Keys of the form `_x_` are skipped, unknown
    /// keys are logged and skipped, text objects are skipped.
    pub fn put(self: &Rc<Self>, body: Option<&Value>) -> Result<Rc<Self>, ResourceError> {
        let map = match body {
            None | Some(Value::Null) => return Ok(Rc::clone(self)),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(ResourceError::bad_request(format!(
                    "Object expected but {} provided while updating {}",
                    json_type_name(other),
                    self.path
                )));
            }
        };
        for (key, value) in map {
            if key.len() >= 2 && key.starts_with('_') && key.ends_with('_') {
                continue;
            }
            let node = match self.subinterface(key) {
                Ok(Some(node)) => node,
                Ok(None) => continue,
                Err(_) => {
                    tracing::warn!(attribute = %key, resource = %self.path, "unknown attribute in PUT data");
                    continue;
                }
            };
            ResourceList::new(Rc::clone(self), node, false)?.put(value)?;
        }
        self.invalidate();
        Ok(Rc::clone(self))
    }

    /// Applies an ordered list of `replace`, `add` and `remove` operations below this resource.
    ///
    /// `remove` without `value` unlinks the resource at `path` from its parent; with `value`
    /// it removes the value from the list at `path`. Processing stops at the first failure.
    pub fn patch(self: &Rc<Self>, patches: &Value) -> Result<Rc<Self>, ResourceError> {
        let Value::Array(entries) = patches else {
            return Err(ResourceError::bad_request(format!(
                "Array of patch operations expected but {} provided",
                json_type_name(patches)
            )));
        };
        for (index, patch) in entries.iter().enumerate() {
            let Value::Object(patch) = patch else {
                return Err(ResourceError::bad_request(format!(
                    "Patch #{} must be an object",
                    index
                )));
            };
            let op = patch.get("op").ok_or_else(|| {
                ResourceError::bad_request(format!(
                    "No 'op' (i.e. operation) specified for patch #{}",
                    index
                ))
            })?;
            let path = patch.get("path").ok_or_else(|| {
                ResourceError::bad_request(format!("No 'path' specified for patch #{}", index))
            })?;
            let path = path.as_str().ok_or_else(|| {
                ResourceError::bad_request(format!("'path' of patch #{} must be a string", index))
            })?;
            let value = patch.get("value");
            match op.as_str() {
                Some("replace") => {
                    let value = value.ok_or_else(|| {
                        ResourceError::bad_request(format!(
                            "Cannot patch replace. No 'value' specified for patch #{}",
                            index
                        ))
                    })?;
                    self.walk_path_to_resource_list(path)?.replace(value)?;
                }
                Some("add") => {
                    let value = value.ok_or_else(|| {
                        ResourceError::bad_request(format!(
                            "Cannot patch add. No 'value' specified for patch #{}",
                            index
                        ))
                    })?;
                    self.walk_path_to_resource_list(path)?.add(value)?;
                }
                Some("remove") => match value {
                    None => self.walk_path_to_resource(path)?.remove_from_parent()?,
                    Some(value) => self.walk_path_to_resource_list(path)?.remove(value)?,
                },
                _ => {
                    return Err(ResourceError::not_implemented(format!(
                        "Unknown patch operation '{}' for patch #{}. Supported are: 'replace', 'add' and 'remove'",
                        op.as_str().unwrap_or_default(),
                        index
                    )));
                }
            }
        }
        self.invalidate();
        Ok(Rc::clone(self))
    }

    fn remove_from_parent(&self) -> Result<(), ResourceError> {
        let parent = self.parent()?;
        let node = self.node.ok_or_else(|| {
            ResourceError::bad_request(format!("'{}' is not a target of a list", self.path))
        })?;
        ResourceList::new(Rc::clone(parent), node, true)?
            .remove(&Value::String(self.id().to_string()))
    }

    /// Deletes the resource through the step that produced it.
    ///
    /// Editable steps unlink the resource from its parent; other steps delete the atom.
    pub fn delete(&self) -> Result<(), ResourceError> {
        let node = match self.node {
            Some(node) if node.crud_d() => node,
            _ => {
                return Err(ResourceError::method_not_allowed(format!(
                    "Delete not allowed for {}",
                    self.path
                )));
            }
        };
        let store = self.ctx.store();
        match (node.editable_step(), &self.parent) {
            (Some(step), Some(parent)) => {
                store
                    .link(parent.atom(), &self.atom, &step.relation, step.flipped)
                    .delete()?;
                parent.clear_query_column(node.id());
            }
            _ => {
                store.delete_atom(&self.atom)?;
            }
        }
        self.invalidate();
        Ok(())
    }

    /// Creates a new target of step `ifc_id` from `body`.
    pub fn post(self: &Rc<Self>, ifc_id: &str, body: &Value) -> Result<Rc<Resource<'a>>, ResourceError> {
        self.all(ifc_id)?.post(body)
    }

    /// Sets the univalent step `ifc_id` to `value`.
    pub fn set(self: &Rc<Self>, ifc_id: &str, value: &Value) -> Result<(), ResourceError> {
        self.all(ifc_id)?.set(value)
    }

    /// Clears the univalent step `ifc_id`.
    pub fn unset(self: &Rc<Self>, ifc_id: &str) -> Result<(), ResourceError> {
        self.all(ifc_id)?.set(&Value::Null)
    }

    /// Adds `value` to step `ifc_id`.
    pub fn push(self: &Rc<Self>, ifc_id: &str, value: &Value) -> Result<(), ResourceError> {
        self.all(ifc_id)?.add(value)
    }
}

impl std::fmt::Display for Resource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.atom)
    }
}

impl std::fmt::Debug for Resource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("atom", &self.atom)
            .field("path", &self.path)
            .finish()
    }
}
