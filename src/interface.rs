//! # Interface Definitions
//!
//! Interfaces are compiled, immutable trees of access rules. Each node describes one hop
//! from a source atom to a set of target atoms: which expression to follow, which concept
//! the targets have, whether at most one target is expected, and which CRUD verbs are
//! allowed on the hop.
//!
//! Nodes come in two kinds:
//!
//! - **Expression nodes** navigate a relation (or the identity, or a composition of
//!   relations) and may have children.
//! - **Text nodes** render a fixed literal. They are always leaves and carry no CRUD.
//!
//! ```text
//! Interface "People" (roles: [])
//! └── People        I[Person]            CRUD  (identity step, root)
//!     ├── Name      name[Person*Name]    cRUd  uni
//!     ├── Projects  projects[Person*Project] CRUD
//!     │   └── Title projectName[Project*Name] cRUd uni
//!     └── Intro     "Welcome"            (text)
//! ```
//!
//! The tree is loaded once and shared read-only by every request.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Concept, ModelError, Relation, ResourceError};

///////////////////////////////////////////// Definitions //////////////////////////////////////////////

/// A top-level interface as it appears in the interfaces document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceDefinition {
    /// Interface identifier used in paths.
    pub id: String,
    /// Human readable name.
    pub label: String,
    /// Intended for machine clients rather than user interfaces.
    #[serde(default, rename = "isAPI")]
    pub is_api: bool,
    /// Roles allowed to use the interface; empty means public.
    #[serde(default)]
    pub interface_roles: Vec<String>,
    /// The root object.
    pub ifc_object: ObjectDefinition,
}

/// A raw interface object record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDefinition {
    /// `ObjExpression` or `ObjText`.
    #[serde(rename = "type")]
    pub object_type: String,
    /// Identifier, unique among siblings.
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    /// CRUD string such as `cRud`; an uppercase letter allows the verb.
    #[serde(default)]
    pub crud: Option<String>,
    #[serde(default)]
    pub expr: Option<ExpressionDefinition>,
    #[serde(default)]
    pub src_concept: Option<String>,
    #[serde(default)]
    pub tgt_concept: Option<String>,
    #[serde(default)]
    pub is_uni: bool,
    #[serde(default)]
    pub is_prop: bool,
    #[serde(default)]
    pub view: Option<String>,
    /// Literal of text objects.
    #[serde(default)]
    pub txt: Option<String>,
    #[serde(default)]
    pub subinterfaces: Option<SubinterfacesDefinition>,
}

/// The children of an interface object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubinterfacesDefinition {
    /// Reuse the children of another interface instead of declaring them.
    #[serde(default)]
    pub ref_sub_interface_id: Option<String>,
    /// The reference is a navigation link rather than an embedding.
    #[serde(default)]
    pub is_link_to: bool,
    #[serde(default)]
    pub ifc_objects: Vec<ObjectDefinition>,
}

/// The expression of an expression object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExpressionDefinition {
    /// `I[Concept]`.
    Ident,
    /// A single, possibly flipped, relation.
    Relation {
        relation: String,
        #[serde(default)]
        flipped: bool,
    },
    /// Relations composed left to right.
    Compose { steps: Vec<StepDefinition> },
}

/// One relation hop in a composed expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub relation: String,
    #[serde(default)]
    pub flipped: bool,
}

////////////////////////////////////////////////// Crud ////////////////////////////////////////////////

/// CRUD capabilities of an interface step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Crud {
    pub create: bool,
    pub read: bool,
    pub update: bool,
    pub delete: bool,
}

impl Crud {
    /// Read only.
    pub const READ_ONLY: Crud = Crud {
        create: false,
        read: true,
        update: false,
        delete: false,
    };

    /// Parses a four-letter CRUD string; an uppercase letter allows the verb.
    pub fn parse(s: &str) -> Result<Self, ModelError> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() != 4 {
            return Err(ModelError::Invalid(format!("invalid crud string '{}'", s)));
        }
        let mut flags = [false; 4];
        for (i, (c, expected)) in chars.iter().zip(['c', 'r', 'u', 'd']).enumerate() {
            if c.to_ascii_lowercase() != expected {
                return Err(ModelError::Invalid(format!("invalid crud string '{}'", s)));
            }
            flags[i] = c.is_ascii_uppercase();
        }
        Ok(Crud {
            create: flags[0],
            read: flags[1],
            update: flags[2],
            delete: flags[3],
        })
    }
}

impl std::fmt::Display for Crud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = |allowed: bool, c: char| {
            if allowed {
                c.to_ascii_uppercase()
            } else {
                c
            }
        };
        write!(
            f,
            "{}{}{}{}",
            letter(self.create, 'c'),
            letter(self.read, 'r'),
            letter(self.update, 'u'),
            letter(self.delete, 'd')
        )
    }
}

/////////////////////////////////////////////// Expression /////////////////////////////////////////////

/// A relation hop with direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub relation: Relation,
    pub flipped: bool,
}

impl Step {
    /// The concept this hop starts from.
    pub fn src(&self) -> &str {
        if self.flipped {
            self.relation.tgt()
        } else {
            self.relation.src()
        }
    }

    /// The concept this hop arrives at.
    pub fn tgt(&self) -> &str {
        if self.flipped {
            self.relation.src()
        } else {
            self.relation.tgt()
        }
    }
}

/// A compiled interface expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Ident,
    Relation(Step),
    Compose(Vec<Step>),
}

impl Expression {
    /// The hops of this expression, empty for the identity.
    pub fn steps(&self) -> &[Step] {
        match self {
            Expression::Ident => &[],
            Expression::Relation(step) => std::slice::from_ref(step),
            Expression::Compose(steps) => steps,
        }
    }
}

/////////////////////////////////////////////// Reference //////////////////////////////////////////////

/// A reference to the children of another interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub interface: String,
    pub link_to: bool,
}

//////////////////////////////////////////////// Nodes /////////////////////////////////////////////////

/// A node of an interface tree.
#[derive(Debug, Clone)]
pub enum InterfaceNode {
    Expression(ExprNode),
    Text(TextNode),
}

impl InterfaceNode {
    /// Builds a node from a raw record.
    ///
    /// Fails with [`ModelError::UnsupportedNodeType`] for unknown type strings.
    pub fn from_definition(
        def: &ObjectDefinition,
        parent_path: &str,
        relations: &HashMap<String, Relation>,
        concepts: &HashMap<String, Concept>,
    ) -> Result<Self, ModelError> {
        match def.object_type.as_str() {
            "ObjExpression" => Ok(InterfaceNode::Expression(ExprNode::from_definition(
                def,
                parent_path,
                None,
                relations,
                concepts,
            )?)),
            "ObjText" => Ok(InterfaceNode::Text(TextNode::from_definition(
                def,
                parent_path,
            ))),
            other => Err(ModelError::UnsupportedNodeType(other.to_string())),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            InterfaceNode::Expression(e) => &e.id,
            InterfaceNode::Text(t) => &t.id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            InterfaceNode::Expression(e) => &e.label,
            InterfaceNode::Text(t) => &t.label,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            InterfaceNode::Expression(e) => &e.path,
            InterfaceNode::Text(t) => &t.path,
        }
    }

    /// The expression node, or `None` for text.
    pub fn as_expression(&self) -> Option<&ExprNode> {
        match self {
            InterfaceNode::Expression(e) => Some(e),
            InterfaceNode::Text(_) => None,
        }
    }
}

/// A fixed literal leaf.
#[derive(Debug, Clone)]
pub struct TextNode {
    id: String,
    label: String,
    path: String,
    txt: String,
}

impl TextNode {
    fn from_definition(def: &ObjectDefinition, parent_path: &str) -> Self {
        TextNode {
            id: def.id.clone(),
            label: def.label.clone().unwrap_or_else(|| def.id.clone()),
            path: join_path(parent_path, &def.id),
            txt: def.txt.clone().unwrap_or_default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn txt(&self) -> &str {
        &self.txt
    }
}

/// A node that navigates an expression.
#[derive(Debug, Clone)]
pub struct ExprNode {
    id: String,
    label: String,
    path: String,
    src_concept: String,
    tgt_concept: String,
    expr: Expression,
    crud: Crud,
    is_uni: bool,
    is_prop: bool,
    view: Option<String>,
    /// Set on interface roots only.
    roles: Option<Vec<String>>,
    reference: Option<Reference>,
    children: Vec<InterfaceNode>,
}

impl ExprNode {
    /// Builds the root object of an interface; the root must be an expression node.
    pub fn root(
        def: &InterfaceDefinition,
        relations: &HashMap<String, Relation>,
        concepts: &HashMap<String, Concept>,
    ) -> Result<Self, ModelError> {
        match def.ifc_object.object_type.as_str() {
            "ObjExpression" => ExprNode::from_definition(
                &def.ifc_object,
                "",
                Some(def.interface_roles.clone()),
                relations,
                concepts,
            ),
            "ObjText" => Err(ModelError::RootNotExpression(def.id.clone())),
            other => Err(ModelError::UnsupportedNodeType(other.to_string())),
        }
    }

    fn from_definition(
        def: &ObjectDefinition,
        parent_path: &str,
        roles: Option<Vec<String>>,
        relations: &HashMap<String, Relation>,
        concepts: &HashMap<String, Concept>,
    ) -> Result<Self, ModelError> {
        let path = join_path(parent_path, &def.id);
        let expr = compile_expression(def.expr.as_ref(), &path, relations)?;

        let steps = expr.steps();
        let src_concept = match (&def.src_concept, steps.first()) {
            (Some(c), _) => c.clone(),
            (None, Some(step)) => step.src().to_string(),
            (None, None) => {
                return Err(ModelError::Invalid(format!(
                    "identity expression at '{}' must declare srcConcept",
                    path
                )));
            }
        };
        let tgt_concept = match (&def.tgt_concept, steps.last()) {
            (Some(c), _) => c.clone(),
            (None, Some(step)) => step.tgt().to_string(),
            (None, None) => src_concept.clone(),
        };
        for name in [&src_concept, &tgt_concept] {
            if !concepts.contains_key(name) {
                return Err(ModelError::UnknownConcept(name.clone()));
            }
        }
        if matches!(expr, Expression::Ident) && src_concept != tgt_concept {
            return Err(ModelError::Invalid(format!(
                "identity expression at '{}' must have equal source and target concepts",
                path
            )));
        }

        let crud = match &def.crud {
            Some(s) => Crud::parse(s)?,
            None => Crud::READ_ONLY,
        };

        let (reference, children) = match &def.subinterfaces {
            Some(subs) => {
                let reference = subs.ref_sub_interface_id.as_ref().map(|id| Reference {
                    interface: id.clone(),
                    link_to: subs.is_link_to,
                });
                let mut children: Vec<InterfaceNode> = Vec::with_capacity(subs.ifc_objects.len());
                for child in &subs.ifc_objects {
                    if children.iter().any(|c| c.id() == child.id) {
                        return Err(ModelError::Duplicate(join_path(&path, &child.id)));
                    }
                    children.push(InterfaceNode::from_definition(
                        child, &path, relations, concepts,
                    )?);
                }
                (reference, children)
            }
            None => (None, Vec::new()),
        };

        let scalar_target = concepts
            .get(&tgt_concept)
            .map(|c| !c.is_object())
            .unwrap_or(false);
        if scalar_target && (reference.is_some() || !children.is_empty()) {
            return Err(ModelError::Invalid(format!(
                "'{}' targets scalar concept '{}' and cannot have subinterfaces",
                path, tgt_concept
            )));
        }

        Ok(ExprNode {
            id: def.id.clone(),
            label: def.label.clone().unwrap_or_else(|| def.id.clone()),
            path,
            src_concept,
            tgt_concept,
            expr,
            crud,
            is_uni: def.is_uni,
            is_prop: def.is_prop,
            view: def.view.clone(),
            roles,
            reference,
            children,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The path of this node within its interface, e.g. `People/Projects`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn src_concept(&self) -> &str {
        &self.src_concept
    }

    pub fn tgt_concept(&self) -> &str {
        &self.tgt_concept
    }

    pub fn expression(&self) -> &Expression {
        &self.expr
    }

    pub fn crud(&self) -> Crud {
        self.crud
    }

    pub fn crud_c(&self) -> bool {
        self.crud.create
    }

    pub fn crud_r(&self) -> bool {
        self.crud.read
    }

    pub fn crud_u(&self) -> bool {
        self.crud.update
    }

    pub fn crud_d(&self) -> bool {
        self.crud.delete
    }

    /// The step does not change which atom is viewed.
    pub fn is_ident(&self) -> bool {
        matches!(self.expr, Expression::Ident)
    }

    /// The step is a boolean-valued property relation.
    pub fn is_prop(&self) -> bool {
        self.is_prop
    }

    pub fn is_uni(&self) -> bool {
        self.is_uni
    }

    /// No children of its own and no reference to another interface.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty() && self.reference.is_none()
    }

    /// The top object of an interface.
    pub fn is_root(&self) -> bool {
        self.roles.is_some()
    }

    /// Tuples can be added to and removed from the step's relation.
    pub fn is_editable(&self) -> bool {
        matches!(self.expr, Expression::Relation(_))
    }

    /// The relation hop of an editable step.
    pub fn editable_step(&self) -> Option<&Step> {
        match &self.expr {
            Expression::Relation(step) => Some(step),
            _ => None,
        }
    }

    pub fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    pub fn reference(&self) -> Option<&Reference> {
        self.reference.as_ref()
    }

    /// Children declared on this node, in order.
    pub fn children(&self) -> &[InterfaceNode] {
        &self.children
    }

    /// True unless this is a root node whose roles do not intersect `active_roles`.
    ///
    /// Only roots are restricted; nodes below a root inherit access once the root passed.
    pub fn is_accessible_for(&self, active_roles: &[String]) -> bool {
        match &self.roles {
            None => true,
            Some(roles) if roles.is_empty() => true,
            Some(roles) => roles.iter().any(|r| active_roles.contains(r)),
        }
    }

    /// Looks up a declared child by id.
    pub fn child(&self, id: &str) -> Result<&InterfaceNode, ResourceError> {
        self.children.iter().find(|c| c.id() == id).ok_or_else(|| {
            ResourceError::not_found(format!(
                "Subinterface '{}' not found in '{}'",
                id, self.path
            ))
        })
    }
}

impl std::fmt::Display for ExprNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// A compiled top-level interface.
#[derive(Debug, Clone)]
pub struct Interface {
    id: String,
    label: String,
    is_api: bool,
    root: ExprNode,
}

impl Interface {
    pub fn from_definition(
        def: &InterfaceDefinition,
        relations: &HashMap<String, Relation>,
        concepts: &HashMap<String, Concept>,
    ) -> Result<Self, ModelError> {
        Ok(Interface {
            id: def.id.clone(),
            label: def.label.clone(),
            is_api: def.is_api,
            root: ExprNode::root(def, relations, concepts)?,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_api(&self) -> bool {
        self.is_api
    }

    pub fn root(&self) -> &ExprNode {
        &self.root
    }

    pub fn src_concept(&self) -> &str {
        self.root.src_concept()
    }

    pub fn tgt_concept(&self) -> &str {
        self.root.tgt_concept()
    }
}

fn join_path(parent: &str, id: &str) -> String {
    if parent.is_empty() {
        id.to_string()
    } else {
        format!("{}/{}", parent, id)
    }
}

fn compile_step(
    relation: &str,
    flipped: bool,
    relations: &HashMap<String, Relation>,
) -> Result<Step, ModelError> {
    let signature = Relation::parse(relation)?.signature().to_string();
    let relation = relations
        .get(&signature)
        .cloned()
        .ok_or(ModelError::UnknownRelation(signature))?;
    Ok(Step { relation, flipped })
}

fn compile_expression(
    def: Option<&ExpressionDefinition>,
    path: &str,
    relations: &HashMap<String, Relation>,
) -> Result<Expression, ModelError> {
    match def {
        None => Err(ModelError::Invalid(format!(
            "expression object '{}' has no expression",
            path
        ))),
        Some(ExpressionDefinition::Ident) => Ok(Expression::Ident),
        Some(ExpressionDefinition::Relation { relation, flipped }) => Ok(Expression::Relation(
            compile_step(relation, *flipped, relations)?,
        )),
        Some(ExpressionDefinition::Compose { steps }) => {
            if steps.is_empty() {
                return Err(ModelError::Invalid(format!(
                    "composition at '{}' has no steps",
                    path
                )));
            }
            let steps = steps
                .iter()
                .map(|s| compile_step(&s.relation, s.flipped, relations))
                .collect::<Result<Vec<_>, _>>()?;
            for pair in steps.windows(2) {
                if pair[0].tgt() != pair[1].src() {
                    return Err(ModelError::Invalid(format!(
                        "composition at '{}' does not chain: {} then {}",
                        path, pair[0].relation, pair[1].relation
                    )));
                }
            }
            Ok(Expression::Compose(steps))
        }
    }
}
