//! # Resource Lists
//!
//! A [`ResourceList`] is one traversal of an interface step: the targets reachable from a
//! source [`Resource`] through an [`ExprNode`]. It resolves and caches the targets, enforces
//! cardinality and CRUD flags, and carries every collection verb:
//!
//! | Verb | Requires | Effect |
//! |---|---|---|
//! | `get` | `crudR` | serialized targets, collapsed by cardinality |
//! | `post` | `crudC` | new target atom, linked when the step is editable and `crudU` |
//! | `put` | per item | whole-value (univalent) or whole-list (multivalent) replace |
//! | `set`, `replace` | univalent | one value, `null` clears, booleans for properties |
//! | `add`, `remove` | editable, `crudU` | link or unlink one literal target |
//! | `remove_all` | editable, `crudU` | unlink every target |
//!
//! Constructing a list for an interface root fails with Unauthorized when the caller's
//! active roles do not intersect the interface roles, before any verb is considered.

use std::rc::Rc;

use serde_json::Value;

use crate::concept::json_type_name;
use crate::{
    Atom, Concept, ExprNode, Memo, Options, RecursionGuard, RequestContext, Resource,
    ResourceError, Step, TargetRow,
};

/// The targets of one interface step from one source resource.
pub struct ResourceList<'a> {
    src: Rc<Resource<'a>>,
    node: &'a ExprNode,
    tgt_concept: &'a Concept,
    targets: Memo<Vec<Rc<Resource<'a>>>>,
    skipped_access_check: bool,
}

impl<'a> ResourceList<'a> {
    /// Creates the list of `node`'s targets from `src`.
    ///
    /// Root nodes check the caller's roles unless `skip_access_check` is set; internal
    /// traversals below an already checked root use the skip.
    pub fn new(
        src: Rc<Resource<'a>>,
        node: &'a ExprNode,
        skip_access_check: bool,
    ) -> Result<Self, ResourceError> {
        let ctx = src.ctx();
        if node.is_root() && !skip_access_check && !node.is_accessible_for(ctx.roles()) {
            return Err(ResourceError::unauthorized(format!(
                "Unauthorized to access interface {}",
                node.label()
            )));
        }
        let tgt_concept = ctx.model().concept(node.tgt_concept()).ok_or_else(|| {
            ResourceError::internal(format!("Concept '{}' is not defined", node.tgt_concept()))
        })?;
        Ok(Self {
            src,
            node,
            tgt_concept,
            targets: Memo::new(),
            skipped_access_check: skip_access_check,
        })
    }

    fn ctx(&self) -> &'a RequestContext {
        self.src.ctx()
    }

    pub fn src(&self) -> &Rc<Resource<'a>> {
        &self.src
    }

    pub fn node(&self) -> &'a ExprNode {
        self.node
    }

    /// The path of the list: the source path followed by the step id.
    pub fn path(&self) -> String {
        format!("{}/{}", self.src.path(), self.node.id())
    }

    /// True when the role check was bypassed at construction.
    pub fn skipped_access_check(&self) -> bool {
        self.skipped_access_check
    }

    ///////////////////////////////////////////// Targets /////////////////////////////////////////////

    fn rows(&self) -> Result<Vec<TargetRow>, ResourceError> {
        if !self.node.is_ident() {
            if let Some(column) = self.src.query_column(self.node.id()) {
                return Ok(column
                    .into_iter()
                    .map(|tgt| TargetRow {
                        tgt,
                        ..TargetRow::default()
                    })
                    .collect());
            }
        }
        let ctx = self.ctx();
        Ok(ctx.store().query_targets(
            self.node,
            ctx.model().children(self.node),
            self.src.atom(),
        )?)
    }

    /// The target resources, resolved once per list.
    pub fn resources(&self) -> Result<Vec<Rc<Resource<'a>>>, ResourceError> {
        self.targets.get_or_try_init(|| {
            self.rows()?
                .into_iter()
                .map(|row| {
                    Resource::child(
                        self.ctx(),
                        row.tgt,
                        self.node,
                        Rc::clone(&self.src),
                        Some(row.columns),
                    )
                })
                .collect()
        })
    }

    /// The target atoms. Scalar targets are never cached.
    pub fn atoms(&self) -> Result<Vec<Atom>, ResourceError> {
        if self.tgt_concept.is_object() {
            return Ok(self
                .resources()?
                .iter()
                .map(|r| r.atom().clone())
                .collect());
        }
        Ok(self
            .rows()?
            .into_iter()
            .map(|row| Atom::new(row.tgt, self.tgt_concept.name.clone()))
            .collect())
    }

    /// Drops the cached targets so the next access queries the store again.
    pub fn refresh(&self) {
        self.targets.invalidate();
        self.src.clear_query_column(self.node.id());
    }

    /// One target by id; without an id the source's own id, as for identity steps.
    pub fn one(&self, tgt_id: Option<&str>) -> Result<Rc<Resource<'a>>, ResourceError> {
        let id = tgt_id.unwrap_or_else(|| self.src.id());
        self.resources()?
            .into_iter()
            .find(|r| r.id() == id)
            .ok_or_else(|| {
                ResourceError::not_found(format!(
                    "Resource '{}' not found in '{}'",
                    id,
                    self.path()
                ))
            })
    }

    /////////////////////////////////////////////// Read ///////////////////////////////////////////////

    /// Serializes the targets.
    ///
    /// Object targets go through [`Resource::get`]; a leaf property step yields a boolean.
    /// Univalent steps collapse to `null` or their single element unless `force_list` is set.
    pub fn get(
        &self,
        options: &Options,
        depth: Option<u32>,
        guard: &RecursionGuard,
    ) -> Result<Value, ResourceError> {
        tracing::debug!(list = %self.path(), "get");
        if !self.node.crud_r() {
            return Err(ResourceError::method_not_allowed(format!(
                "Read not allowed for {}",
                self.path()
            )));
        }

        let mut result = Vec::new();
        if self.tgt_concept.is_object() {
            for resource in self.resources()? {
                result.push(resource.get(options, depth, guard)?);
            }
            if self.node.is_leaf() && self.node.is_prop() {
                return Ok(Value::Bool(!result.is_empty()));
            }
        } else {
            for atom in self.atoms()? {
                result.push(self.tgt_concept.render(&atom.id));
            }
        }

        if self.node.is_uni() && !options.force_list {
            Ok(result.into_iter().next().unwrap_or(Value::Null))
        } else {
            Ok(Value::Array(result))
        }
    }

    ////////////////////////////////////////////// Create //////////////////////////////////////////////

    /// Creates a new target from `body` and returns it.
    ///
    /// An `_id_` in the body names the new atom and must not exist yet. The new atom is
    /// linked when the step is editable and `crudU`, populated with `body` through
    /// [`Resource::put`], and handed to the creation hooks of its concept.
    pub fn post(&self, body: &Value) -> Result<Rc<Resource<'a>>, ResourceError> {
        if !self.node.crud_c() {
            return Err(ResourceError::method_not_allowed(format!(
                "Create not allowed for {}",
                self.path()
            )));
        }
        let Value::Object(map) = body else {
            return Err(ResourceError::bad_request(format!(
                "Object expected but {} provided while creating resource in {}",
                json_type_name(body),
                self.path()
            )));
        };
        let ctx = self.ctx();
        let store = ctx.store();

        let id = match map.get("_id_") {
            Some(value) if !value.is_null() => {
                let id = self.tgt_concept.atom_id(value)?;
                if store.exists(&Atom::new(id.clone(), self.tgt_concept.name.clone()))? {
                    return Err(ResourceError::bad_request(format!(
                        "Cannot create resource '{}' that already exists",
                        id
                    )));
                }
                id
            }
            _ => store.new_atom_id(&self.tgt_concept.name),
        };
        let atom = Atom::new(id.clone(), self.tgt_concept.name.clone());
        let resource = Resource::child(ctx, id.clone(), self.node, Rc::clone(&self.src), None)?;

        if self.node.is_editable() && self.node.crud_u() {
            self.add(&Value::String(id))?;
        } else {
            store.create(&atom)?;
        }

        resource.put(Some(body))?;
        ctx.hooks().run(ctx, &atom)?;
        self.refresh();
        Ok(resource)
    }

    ////////////////////////////////////////////// Update //////////////////////////////////////////////

    /// Replaces the whole value (univalent) or the whole list (multivalent).
    pub fn put(&self, value: &Value) -> Result<(), ResourceError> {
        let object_target = self.tgt_concept.is_object();
        if self.node.is_uni() {
            if value.is_array() {
                return Err(ResourceError::bad_request(format!(
                    "Non-array expected but array provided while updating {}",
                    self.path()
                )));
            }
            if !object_target {
                return self.set(value);
            }
            match value {
                Value::Null => self.set(value),
                Value::Object(map) => match map.get("_id_") {
                    Some(id) => self.set(id),
                    None => Err(ResourceError::bad_request(format!(
                        "No object identifier (_id_) provided while updating {}",
                        self.path()
                    ))),
                },
                other => Err(ResourceError::bad_request(format!(
                    "Object (or null) expected but {} provided while updating {}",
                    json_type_name(other),
                    self.path()
                ))),
            }
        } else {
            let Value::Array(items) = value else {
                return Err(ResourceError::bad_request(format!(
                    "Array expected but {} provided while updating {}",
                    json_type_name(value),
                    self.path()
                )));
            };
            self.remove_all()?;
            for item in items {
                if !object_target {
                    self.add(item)?;
                    continue;
                }
                let Value::Object(map) = item else {
                    return Err(ResourceError::bad_request(format!(
                        "Object expected but {} provided while updating {}",
                        json_type_name(item),
                        self.path()
                    )));
                };
                let id = map.get("_id_").ok_or_else(|| {
                    ResourceError::bad_request(format!(
                        "No object identifier (_id_) provided while updating {}",
                        self.path()
                    ))
                })?;
                self.add(id)?;
            }
            Ok(())
        }
    }

    /// [`ResourceList::set`] for univalent steps, as used by patch documents.
    pub fn replace(&self, value: &Value) -> Result<(), ResourceError> {
        if !self.node.is_uni() {
            return Err(ResourceError::bad_request(format!(
                "Cannot use replace for non-univalent interface {}. Use add or remove instead",
                self.path()
            )));
        }
        self.set(value)
    }

    /// Sets the single value of a univalent step.
    ///
    /// Property steps take `true` or `false`; other steps take a literal, or `null` to clear.
    pub fn set(&self, value: &Value) -> Result<(), ResourceError> {
        if !self.node.is_uni() {
            return Err(ResourceError::bad_request(format!(
                "Cannot use set() for non-univalent interface {}. Use add or remove instead",
                self.path()
            )));
        }
        let src = Value::String(self.src.id().to_string());
        if self.node.is_prop() {
            return match value {
                Value::Bool(true) => self.add(&src),
                Value::Bool(false) => self.remove(&src),
                _ => Err(ResourceError::bad_request(format!(
                    "Boolean expected, non-boolean provided while updating {}",
                    self.path()
                ))),
            };
        }
        if value.is_null() {
            return self.remove_all();
        }
        let tgt = self.target_atom(value)?;
        let step = self.editable_step()?;
        for existing in self.atoms()? {
            if existing.id != tgt.id {
                self.unlink(step, &existing)?;
            }
        }
        self.add(value)
    }

    /// Links one literal target.
    pub fn add(&self, value: &Value) -> Result<(), ResourceError> {
        let tgt = self.target_atom(value)?;
        let step = self.editable_step()?;
        let store = self.ctx().store();
        if self.tgt_concept.is_object() && !self.node.crud_c() && !store.exists(&tgt)? {
            return Err(ResourceError::method_not_allowed(format!(
                "Create not allowed for {}",
                self.path()
            )));
        }
        store.create(&tgt)?;
        store
            .link(self.src.atom(), &tgt, &step.relation, step.flipped)
            .add()?;
        self.refresh();
        Ok(())
    }

    /// Unlinks one literal target.
    pub fn remove(&self, value: &Value) -> Result<(), ResourceError> {
        let tgt = self.target_atom(value)?;
        let step = self.editable_step()?;
        self.unlink(step, &tgt)?;
        self.refresh();
        Ok(())
    }

    /// Unlinks every current target.
    pub fn remove_all(&self) -> Result<(), ResourceError> {
        let step = self.editable_step()?;
        for tgt in self.atoms()? {
            self.unlink(step, &tgt)?;
        }
        self.refresh();
        Ok(())
    }

    fn unlink(&self, step: &Step, tgt: &Atom) -> Result<(), ResourceError> {
        self.ctx()
            .store()
            .link(self.src.atom(), tgt, &step.relation, step.flipped)
            .delete()?;
        Ok(())
    }

    fn editable_step(&self) -> Result<&'a Step, ResourceError> {
        let step = self.node.editable_step().ok_or_else(|| {
            ResourceError::method_not_allowed(format!(
                "Interface is not editable {}",
                self.path()
            ))
        })?;
        if !self.node.crud_u() {
            return Err(ResourceError::method_not_allowed(format!(
                "Update not allowed for {}",
                self.path()
            )));
        }
        Ok(step)
    }

    fn target_atom(&self, value: &Value) -> Result<Atom, ResourceError> {
        match value {
            Value::Null => Err(ResourceError::bad_request(format!(
                "Value not provided while updating {}",
                self.path()
            ))),
            Value::Array(_) | Value::Object(_) => Err(ResourceError::bad_request(format!(
                "Literal expected but {} provided while updating {}",
                json_type_name(value),
                self.path()
            ))),
            _ => Ok(Atom::new(
                self.tgt_concept.atom_id(value)?,
                self.tgt_concept.name.clone(),
            )),
        }
    }
}

impl std::fmt::Debug for ResourceList<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceList")
            .field("path", &self.path())
            .field("node", &self.node.path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_utils::test_helpers::sample_context;
    use crate::{AtomStore, ErrorKind};

    fn opts() -> Options {
        Options {
            include_meta_data: false,
            include_nav_ifcs: false,
            ..Options::default()
        }
    }

    #[test]
    fn root_list_requires_role() {
        let ctx = sample_context(&[]);
        let p1 = ctx.resource("Person", "p1").unwrap();
        let err = p1.all("Admin").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let admin = sample_context(&["Administrator"]);
        let p1 = admin.resource("Person", "p1").unwrap();
        assert!(p1.all("Admin").is_ok());
    }

    #[test]
    fn skip_bypasses_role_check() {
        let ctx = sample_context(&[]);
        let p1 = ctx.resource("Person", "p1").unwrap();
        let node = ctx.model().interface("Admin").unwrap().root();
        let list = ResourceList::new(p1, node, true).unwrap();
        assert!(list.skipped_access_check());
    }

    #[test]
    fn cardinality_collapse() {
        let ctx = sample_context(&[]);
        let me = ctx
            .resource("Person", "p1")
            .unwrap()
            .walk_path_to_resource("People")
            .unwrap();
        let guard = RecursionGuard::new();
        assert_eq!(me.all("Name").unwrap().get(&opts(), None, &guard).unwrap(), json!("Ann"));
        assert_eq!(
            me.all("Tags").unwrap().get(&opts(), None, &guard).unwrap(),
            json!(["a", "b", "c"])
        );
        assert_eq!(me.all("Age").unwrap().get(&opts(), None, &guard).unwrap(), json!(36));

        let bob = ctx
            .resource("Person", "p2")
            .unwrap()
            .walk_path_to_resource("People")
            .unwrap();
        assert_eq!(bob.all("Age").unwrap().get(&opts(), None, &guard).unwrap(), Value::Null);
        assert_eq!(bob.all("Tags").unwrap().get(&opts(), None, &guard).unwrap(), json!([]));

        let forced = Options {
            force_list: true,
            ..opts()
        };
        assert_eq!(bob.all("Age").unwrap().get(&forced, None, &guard).unwrap(), json!([]));
    }

    #[test]
    fn property_round_trip() {
        let ctx = sample_context(&[]);
        let me = ctx
            .resource("Person", "p2")
            .unwrap()
            .walk_path_to_resource("People")
            .unwrap();
        let guard = RecursionGuard::new();
        let active = me.all("Active").unwrap();
        assert_eq!(active.get(&opts(), None, &guard).unwrap(), json!(false));
        active.set(&json!(true)).unwrap();
        assert_eq!(active.get(&opts(), None, &guard).unwrap(), json!(true));
        active.set(&json!(false)).unwrap();
        assert_eq!(active.get(&opts(), None, &guard).unwrap(), json!(false));
        let err = active.set(&json!("yes")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn set_and_replace_require_univalence() {
        let ctx = sample_context(&[]);
        let me = ctx
            .resource("Person", "p1")
            .unwrap()
            .walk_path_to_resource("People")
            .unwrap();
        let tags = me.all("Tags").unwrap();
        assert_eq!(tags.set(&json!("x")).unwrap_err().kind(), ErrorKind::BadRequest);
        let err = tags.replace(&json!("x")).unwrap_err();
        assert!(err.message().contains("Use add or remove instead"));

        let name = me.all("Name").unwrap();
        name.replace(&json!("Annie")).unwrap();
        assert_eq!(
            name.get(&opts(), None, &RecursionGuard::new()).unwrap(),
            json!("Annie")
        );
        name.set(&Value::Null).unwrap();
        assert_eq!(
            name.get(&opts(), None, &RecursionGuard::new()).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn add_validates_literals_and_permissions() {
        let ctx = sample_context(&[]);
        let me = ctx
            .resource("Person", "p1")
            .unwrap()
            .walk_path_to_resource("People")
            .unwrap();
        let tags = me.all("Tags").unwrap();
        assert_eq!(tags.add(&json!({"x": 1})).unwrap_err().kind(), ErrorKind::BadRequest);
        assert_eq!(tags.add(&json!([1])).unwrap_err().kind(), ErrorKind::BadRequest);
        assert_eq!(tags.add(&Value::Null).unwrap_err().kind(), ErrorKind::BadRequest);

        let details = me.all("Details").unwrap();
        let err = details.add(&json!("p1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MethodNotAllowed);
        assert!(err.message().contains("not editable"));

        // Leader is editable but may not create new persons.
        let project = me.all("Projects").unwrap().one(Some("prj1")).unwrap();
        let leader = project.all("Leader").unwrap();
        let err = leader.add(&json!("ghost")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MethodNotAllowed);
        leader.add(&json!("p2")).unwrap();
        assert_eq!(leader.atoms().unwrap()[0].id, "p2");
    }

    #[test]
    fn read_requires_crud_r() {
        let ctx = sample_context(&[]);
        let me = ctx
            .resource("Person", "p1")
            .unwrap()
            .walk_path_to_resource("People")
            .unwrap();
        let secret = me.all("Secret").unwrap();
        let err = secret
            .get(&opts(), None, &RecursionGuard::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MethodNotAllowed);
        assert_eq!(err.message(), "Read not allowed for resource/Person/p1/Secret");
    }

    #[test]
    fn put_dispatches_on_cardinality() {
        let ctx = sample_context(&[]);
        let me = ctx
            .resource("Person", "p1")
            .unwrap()
            .walk_path_to_resource("People")
            .unwrap();
        let guard = RecursionGuard::new();

        let tags = me.all("Tags").unwrap();
        tags.put(&json!(["z", "y"])).unwrap();
        assert_eq!(tags.get(&opts(), None, &guard).unwrap(), json!(["z", "y"]));
        assert_eq!(tags.put(&json!("z")).unwrap_err().kind(), ErrorKind::BadRequest);

        let name = me.all("Name").unwrap();
        assert_eq!(name.put(&json!(["a"])).unwrap_err().kind(), ErrorKind::BadRequest);
        name.put(&json!("Ada")).unwrap();
        assert_eq!(name.get(&opts(), None, &guard).unwrap(), json!("Ada"));

        let projects = me.all("Projects").unwrap();
        let err = projects.put(&json!([{"name": "x"}])).unwrap_err();
        assert!(err.message().contains("_id_"));
        projects.put(&json!([{"_id_": "prj2"}])).unwrap();
        let ids: Vec<String> = projects.atoms().unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["prj2"]);
    }

    #[test]
    fn post_creates_and_links() {
        let ctx = sample_context(&[]);
        let me = ctx
            .resource("Person", "p1")
            .unwrap()
            .walk_path_to_resource("People")
            .unwrap();
        let projects = me.all("Projects").unwrap();
        let created = projects.post(&json!({"ProjectName": "Mercury"})).unwrap();
        assert!(created.id().starts_with("Project_"));
        assert!(projects.one(Some(created.id())).is_ok());

        let err = projects.post(&json!({"_id_": "prj1"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert!(err.message().contains("already exists"));

        let explicit = projects.post(&json!({"_id_": "prj9"})).unwrap();
        assert_eq!(explicit.path(), "resource/Person/p1/Projects/prj9");
        assert!(
            ctx.store()
                .exists(&Atom::new("prj9", "Project"))
                .unwrap()
        );
    }

    #[test]
    fn post_to_scalar_list_changes_nothing() {
        let ctx = sample_context(&[]);
        let me = ctx
            .resource("Person", "p1")
            .unwrap()
            .walk_path_to_resource("People")
            .unwrap();
        let keywords = me.all("Keywords").unwrap();
        let err = keywords.post(&json!({})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert!(err.message().contains("non-object concept"));
        let tags: Vec<String> = keywords.atoms().unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(tags, vec!["a", "b", "c"]);
        assert_eq!(ctx.store().atoms("Tag").unwrap().len(), 3);
    }

    #[test]
    fn one_reports_missing_target() {
        let ctx = sample_context(&[]);
        let me = ctx
            .resource("Person", "p1")
            .unwrap()
            .walk_path_to_resource("People")
            .unwrap();
        let err = me.all("Projects").unwrap().one(Some("nope")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
