//! # Model Snapshot
//!
//! The [`Model`] bundles everything that is compiled once at startup and read by every
//! request: concepts, relations, views and interfaces. It is constructed explicitly and
//! shared behind an `Arc`; nothing in it changes after load.
//!
//! Two documents feed a model:
//!
//! - the **model file** with `concepts`, `relations` and `views`;
//! - the **interfaces file**, a list of interface definitions.
//!
//! Either may be JSON or YAML. The format is chosen by file extension (`.yaml`/`.yml` are
//! YAML, everything else JSON).

use std::collections::HashMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{
    Concept, ExprNode, Interface, InterfaceDefinition, InterfaceNode, ModelError, Relation,
    RelationDefinition, ResourceError, SegmentKind, View,
};

/// The declarations of the model file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub concepts: Vec<Concept>,
    #[serde(default)]
    pub relations: Vec<RelationDefinition>,
    #[serde(default)]
    pub views: Vec<View>,
}

/// Reads a JSON or YAML document, chosen by the extension of `path`.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ModelError::Io(format!("{}: {}", path.display(), e)))?;
    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if yaml {
        serde_yml::from_str(&content)
            .map_err(|e| ModelError::Parse(format!("{}: {}", path.display(), e)))
    } else {
        serde_json::from_str(&content)
            .map_err(|e| ModelError::Parse(format!("{}: {}", path.display(), e)))
    }
}

/// The read-only snapshot of concepts, relations, views and interfaces.
#[derive(Debug, Clone)]
pub struct Model {
    concepts: HashMap<String, Concept>,
    relations: HashMap<String, Relation>,
    views: HashMap<String, View>,
    interfaces: Vec<Interface>,
}

impl Model {
    /// Loads the model and interfaces documents from disk.
    pub fn load(model_file: &Path, interfaces_file: &Path) -> Result<Self, ModelError> {
        let model: ModelDefinition = load_document(model_file)?;
        let interfaces: Vec<InterfaceDefinition> = load_document(interfaces_file)?;
        Self::from_definitions(model, interfaces)
    }

    /// Compiles and cross-checks a set of definitions.
    pub fn from_definitions(
        model: ModelDefinition,
        interfaces: Vec<InterfaceDefinition>,
    ) -> Result<Self, ModelError> {
        let mut concepts = HashMap::new();
        for concept in model.concepts {
            if concepts.contains_key(&concept.name) {
                return Err(ModelError::Duplicate(concept.name));
            }
            concepts.insert(concept.name.clone(), concept);
        }
        if concepts.values().filter(|c| c.is_session).count() > 1 {
            return Err(ModelError::Invalid(
                "more than one session concept declared".to_string(),
            ));
        }

        let mut relations = HashMap::new();
        for def in &model.relations {
            let relation = Relation::from_definition(def)?;
            for concept in [relation.src(), relation.tgt()] {
                if !concepts.contains_key(concept) {
                    return Err(ModelError::UnknownConcept(concept.to_string()));
                }
            }
            if relations.contains_key(relation.signature()) {
                return Err(ModelError::Duplicate(relation.signature().to_string()));
            }
            relations.insert(relation.signature().to_string(), relation);
        }

        let mut views = HashMap::new();
        for view in model.views {
            if !concepts.contains_key(&view.concept) {
                return Err(ModelError::UnknownConcept(view.concept.clone()));
            }
            for segment in &view.segments {
                if segment.kind != SegmentKind::Exp {
                    continue;
                }
                let signature = segment.relation.as_deref().ok_or_else(|| {
                    ModelError::Invalid(format!(
                        "expression segment of view '{}' names no relation",
                        view.id
                    ))
                })?;
                let signature = Relation::parse(signature)?.signature().to_string();
                if !relations.contains_key(&signature) {
                    return Err(ModelError::UnknownRelation(signature));
                }
            }
            if views.contains_key(&view.id) {
                return Err(ModelError::Duplicate(view.id));
            }
            views.insert(view.id.clone(), view);
        }
        for concept in concepts.values() {
            if let Some(view) = &concept.default_view {
                if !views.contains_key(view) {
                    return Err(ModelError::UnknownView(view.clone()));
                }
            }
        }

        let mut compiled: Vec<Interface> = Vec::with_capacity(interfaces.len());
        for def in &interfaces {
            if compiled.iter().any(|i| i.id() == def.id) {
                return Err(ModelError::Duplicate(def.id.clone()));
            }
            compiled.push(Interface::from_definition(def, &relations, &concepts)?);
        }

        let model = Model {
            concepts,
            relations,
            views,
            interfaces: compiled,
        };
        for ifc in &model.interfaces {
            model.check_node(ifc.root())?;
        }
        Ok(model)
    }

    fn check_node(&self, node: &ExprNode) -> Result<(), ModelError> {
        if let Some(view) = node.view() {
            if !self.views.contains_key(view) {
                return Err(ModelError::UnknownView(view.to_string()));
            }
        }
        if let Some(reference) = node.reference() {
            let target = self
                .interface(&reference.interface)
                .ok_or_else(|| ModelError::UnknownInterface(reference.interface.clone()))?;
            if target.src_concept() != node.tgt_concept() {
                return Err(ModelError::Invalid(format!(
                    "'{}' targets '{}' but references interface '{}' for '{}'",
                    node.path(),
                    node.tgt_concept(),
                    target.id(),
                    target.src_concept()
                )));
            }
        }
        for child in node.children() {
            if let InterfaceNode::Expression(child) = child {
                self.check_node(child)?;
            }
        }
        Ok(())
    }

    ////////////////////////////////////////////// Concepts //////////////////////////////////////////////

    /// Looks up a concept by name.
    pub fn concept(&self, name: &str) -> Option<&Concept> {
        self.concepts.get(name)
    }

    /// Looks up a concept by name, failing with Not Found.
    pub fn concept_or_not_found(&self, name: &str) -> Result<&Concept, ResourceError> {
        self.concept(name)
            .ok_or_else(|| ResourceError::not_found(format!("Concept '{}' is not defined", name)))
    }

    /// All concept names, sorted.
    pub fn concept_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.concepts.keys().cloned().collect();
        names.sort();
        names
    }

    /// Concepts whose atoms represent uploaded files.
    pub fn file_object_concepts(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values().filter(|c| c.is_file_object)
    }

    ///////////////////////////////////////////// Relations //////////////////////////////////////////////

    /// Looks up a relation by signature.
    pub fn relation(&self, signature: &str) -> Result<&Relation, ModelError> {
        let normalized = Relation::parse(signature)?;
        self.relations
            .get(normalized.signature())
            .ok_or_else(|| ModelError::UnknownRelation(normalized.signature().to_string()))
    }

    /// Finds the relation named `name` from `src` to `tgt`.
    pub fn relation_between(&self, name: &str, src: &str, tgt: &str) -> Option<&Relation> {
        self.relations.get(&format!("{}[{}*{}]", name, src, tgt))
    }

    //////////////////////////////////////////////// Views ///////////////////////////////////////////////

    /// Looks up a view by id.
    pub fn view(&self, id: &str) -> Option<&View> {
        self.views.get(id)
    }

    /// The view applying to the targets of `node`: the node's own or the concept default.
    pub fn view_for(&self, node: Option<&ExprNode>, concept: &Concept) -> Option<&View> {
        node.and_then(|n| n.view())
            .or(concept.default_view.as_deref())
            .and_then(|id| self.views.get(id))
    }

    ///////////////////////////////////////////// Interfaces /////////////////////////////////////////////

    /// All interfaces, in declaration order.
    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    /// Looks up an interface by id.
    pub fn interface(&self, id: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.id() == id)
    }

    /// Looks up an interface by label.
    pub fn interface_by_label(&self, label: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.label() == label)
    }

    /// Interfaces whose source concept is `concept`.
    pub fn interfaces_for_concept<'a>(
        &'a self,
        concept: &'a str,
    ) -> impl Iterator<Item = &'a Interface> + 'a {
        self.interfaces
            .iter()
            .filter(move |i| i.src_concept() == concept)
    }

    /// Interfaces for `concept` that the active roles may use, excluding API interfaces.
    pub fn navigable_interfaces<'a>(
        &'a self,
        concept: &'a str,
        roles: &'a [String],
    ) -> impl Iterator<Item = &'a Interface> + 'a {
        self.interfaces_for_concept(concept)
            .filter(move |i| !i.is_api() && i.root().is_accessible_for(roles))
    }

    /// The children of `node`, following a reference to another interface.
    pub fn children<'a>(&'a self, node: &'a ExprNode) -> &'a [InterfaceNode] {
        match node.reference().and_then(|r| self.interface(&r.interface)) {
            Some(target) => target.root().children(),
            None => node.children(),
        }
    }

    /// Looks up a child of `node` by id, following references.
    pub fn subinterface<'a>(
        &'a self,
        node: &'a ExprNode,
        id: &str,
    ) -> Result<&'a InterfaceNode, ResourceError> {
        self.children(node)
            .iter()
            .find(|c| c.id() == id)
            .ok_or_else(|| {
                ResourceError::not_found(format!(
                    "Subinterface '{}' not found in '{}'",
                    id,
                    node.path()
                ))
            })
    }

    /// Looks up the root of a top-level interface usable from `concept`.
    pub fn entry_interface(&self, concept: &str, id: &str) -> Result<&ExprNode, ResourceError> {
        self.interfaces
            .iter()
            .find(|i| i.src_concept() == concept && i.id() == id)
            .map(Interface::root)
            .ok_or_else(|| {
                ResourceError::not_found(format!(
                    "Interface '{}' not found for concept '{}'",
                    id, concept
                ))
            })
    }
}
