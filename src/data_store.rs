//! # Atom Storage Abstraction
//!
//! The engine never talks to a relational store directly. Everything it needs from storage
//! goes through the [`AtomStore`] trait:
//!
//! - **Atom existence**: does `id[Concept]` exist, create it (idempotently), delete it;
//! - **Link mutation**: add or delete a tuple of a relation, optionally flipped;
//! - **Target queries**: the ordered targets of an interface step for one source atom,
//!   with single-column shortcuts for univalent leaf children prefilled;
//! - **Snapshots**: capture and restore the whole population, which backs transactions.
//!
//! ## Storage Model
//!
//! ```text
//! Atoms:  Concept ──> [id, id, ...]                  (insertion ordered)
//! Links:  name[Src*Tgt] ──> [(src, tgt), ...]       (insertion ordered, no duplicates)
//! ```
//!
//! Univalent relations keep at most one target per source: adding a second tuple for the
//! same source replaces the first. Injective relations do the same per target.
//!
//! ## Implementations
//!
//! - **InMemoryAtomStore**: thread-safe in-memory storage using `Mutex<HashMap>`.
//!
//! ```rust
//! use trellis::{Atom, AtomStore, InMemoryAtomStore, Relation};
//!
//! let store = InMemoryAtomStore::new();
//! let name = Relation::parse("name[Person*Name]").unwrap();
//! let ann = Atom::new("p1", "Person");
//!
//! store.create(&ann).unwrap();
//! store.add_link(&name, "p1", "Ann").unwrap();
//! assert_eq!(store.targets(&name, "p1", false).unwrap(), vec!["Ann".to_string()]);
//! assert!(store.exists(&Atom::new("Ann", "Name")).unwrap());
//! ```

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{Atom, DataStoreError, ExprNode, Expression, InterfaceNode, Model, ModelError, Relation};

//////////////////////////////////////////////// TargetRow /////////////////////////////////////////////

/// One target of an interface step, with prefilled single-column values.
///
/// `columns` maps a child step id to its single target (or `None` when the child has no
/// target). A child present in `columns` does not need its own query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetRow {
    pub tgt: String,
    pub columns: HashMap<String, Option<String>>,
}

/////////////////////////////////////////////// StoreSnapshot //////////////////////////////////////////

/// A complete copy of a store's population.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    atoms: HashMap<String, Vec<String>>,
    links: HashMap<String, RelationPopulation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RelationPopulation {
    relation: Relation,
    pairs: Vec<(String, String)>,
}

/////////////////////////////////////////////////// AtomStore //////////////////////////////////////////

/// The storage contract consumed by resources and resource lists.
///
/// Implementors must be thread-safe; the engine shares one store across all requests.
pub trait AtomStore: Send + Sync {
    /// Checks whether an atom exists.
    fn exists(&self, atom: &Atom) -> Result<bool, DataStoreError>;

    /// Creates an atom. Creating an existing atom is not an error.
    fn create(&self, atom: &Atom) -> Result<Atom, DataStoreError>;

    /// Deletes an atom and every tuple it participates in.
    ///
    /// # Returns
    /// * `Ok(true)` - Atom existed and was deleted
    /// * `Ok(false)` - Atom did not exist
    fn delete_atom(&self, atom: &Atom) -> Result<bool, DataStoreError>;

    /// Lists the atoms of a concept in creation order.
    fn atoms(&self, concept: &str) -> Result<Vec<String>, DataStoreError>;

    /// Allocates a fresh identifier for a new atom of `concept`.
    fn new_atom_id(&self, concept: &str) -> String;

    /// Adds the tuple `(src, tgt)` to `relation`, creating both atoms if needed.
    ///
    /// Univalent and injective relations replace conflicting tuples.
    fn add_link(&self, relation: &Relation, src: &str, tgt: &str) -> Result<(), DataStoreError>;

    /// Removes the tuple `(src, tgt)` from `relation`.
    ///
    /// # Returns
    /// * `Ok(true)` - Tuple existed and was removed
    /// * `Ok(false)` - Tuple did not exist
    fn delete_link(&self, relation: &Relation, src: &str, tgt: &str)
    -> Result<bool, DataStoreError>;

    /// The atoms related to `id` through `relation`; sources instead of targets when flipped.
    fn targets(
        &self,
        relation: &Relation,
        id: &str,
        flipped: bool,
    ) -> Result<Vec<String>, DataStoreError>;

    /// Captures the whole population.
    fn snapshot(&self) -> Result<StoreSnapshot, DataStoreError>;

    /// Replaces the whole population with a snapshot.
    fn restore(&self, snapshot: StoreSnapshot) -> Result<(), DataStoreError>;

    /// Evaluates `node`'s expression from `src`, yielding ordered, distinct targets.
    ///
    /// `children` are the steps below `node`; univalent leaf relation steps among them get
    /// their single target prefilled in [`TargetRow::columns`].
    fn query_targets(
        &self,
        node: &ExprNode,
        children: &[InterfaceNode],
        src: &Atom,
    ) -> Result<Vec<TargetRow>, DataStoreError> {
        let tgts = match node.expression() {
            Expression::Ident => vec![src.id.clone()],
            expr => {
                let mut current = vec![src.id.clone()];
                for step in expr.steps() {
                    let mut next: Vec<String> = Vec::new();
                    for id in &current {
                        for tgt in self.targets(&step.relation, id, step.flipped)? {
                            if !next.contains(&tgt) {
                                next.push(tgt);
                            }
                        }
                    }
                    current = next;
                }
                current
            }
        };
        let shortcuts: Vec<&ExprNode> = children
            .iter()
            .filter_map(InterfaceNode::as_expression)
            .filter(|c| c.is_uni() && c.is_leaf() && !c.is_prop() && c.is_editable())
            .collect();
        let mut rows = Vec::with_capacity(tgts.len());
        for tgt in tgts {
            let mut columns = HashMap::new();
            for child in &shortcuts {
                if let Some(step) = child.editable_step() {
                    let value = self
                        .targets(&step.relation, &tgt, step.flipped)?
                        .into_iter()
                        .next();
                    columns.insert(child.id().to_string(), value);
                }
            }
            rows.push(TargetRow { tgt, columns });
        }
        Ok(rows)
    }
}

impl<'s> dyn AtomStore + 's {
    /// Creates a handle for the tuple between `src` and `tgt` in `relation`.
    ///
    /// When `flipped`, `src` sits on the relation's target side.
    pub fn link<'a>(&'a self, src: &Atom, tgt: &Atom, relation: &Relation, flipped: bool) -> Link<'a> {
        let (left, right) = if flipped { (tgt, src) } else { (src, tgt) };
        Link {
            store: self,
            relation: relation.clone(),
            src: left.id.clone(),
            tgt: right.id.clone(),
        }
    }
}

/// A tuple of a relation that can be added or deleted.
pub struct Link<'a> {
    store: &'a dyn AtomStore,
    relation: Relation,
    src: String,
    tgt: String,
}

impl Link<'_> {
    /// Adds the tuple.
    pub fn add(&self) -> Result<(), DataStoreError> {
        self.store.add_link(&self.relation, &self.src, &self.tgt)
    }

    /// Deletes the tuple.
    pub fn delete(&self) -> Result<bool, DataStoreError> {
        self.store.delete_link(&self.relation, &self.src, &self.tgt)
    }
}

impl std::fmt::Display for Link<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{}) {}", self.src, self.tgt, self.relation)
    }
}

////////////////////////////////////////////// Population //////////////////////////////////////////////

/// Atoms and tuples to preload into a store.
///
/// ```yaml
/// atoms:
///   Person: [p1, p2]
/// links:
///   "name[Person*Name]": [[p1, Ann], [p2, Bob]]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Population {
    #[serde(default)]
    pub atoms: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub links: HashMap<String, Vec<(String, String)>>,
}

impl Population {
    /// Loads the population into `store`, checking concepts and relations against `model`.
    pub fn load_into(&self, model: &Model, store: &dyn AtomStore) -> Result<(), ModelError> {
        let mut concepts: Vec<&String> = self.atoms.keys().collect();
        concepts.sort();
        for concept in concepts {
            if model.concept(concept).is_none() {
                return Err(ModelError::UnknownConcept(concept.clone()));
            }
            for id in &self.atoms[concept] {
                store
                    .create(&Atom::new(id.clone(), concept.clone()))
                    .map_err(|e| ModelError::Invalid(e.to_string()))?;
            }
        }
        let mut signatures: Vec<&String> = self.links.keys().collect();
        signatures.sort();
        for signature in signatures {
            let relation = model.relation(signature)?;
            for (src, tgt) in &self.links[signature] {
                store
                    .add_link(relation, src, tgt)
                    .map_err(|e| ModelError::Invalid(e.to_string()))?;
            }
        }
        Ok(())
    }
}

////////////////////////////////////////////// InMemoryAtomStore ///////////////////////////////////////

/// Thread-safe in-memory implementation of [`AtomStore`].
#[derive(Debug, Default)]
pub struct InMemoryAtomStore {
    atoms: Mutex<HashMap<String, Vec<String>>>,
    links: Mutex<HashMap<String, RelationPopulation>>,
    counter: AtomicU64,
}

impl InMemoryAtomStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_atom(atoms: &mut HashMap<String, Vec<String>>, id: &str, concept: &str) {
        let ids = atoms.entry(concept.to_string()).or_default();
        if !ids.iter().any(|i| i == id) {
            ids.push(id.to_string());
        }
    }
}

impl AtomStore for InMemoryAtomStore {
    fn exists(&self, atom: &Atom) -> Result<bool, DataStoreError> {
        let atoms = self.atoms.lock().unwrap();
        Ok(atoms
            .get(&atom.concept)
            .map(|ids| ids.contains(&atom.id))
            .unwrap_or(false))
    }

    fn create(&self, atom: &Atom) -> Result<Atom, DataStoreError> {
        let mut atoms = self.atoms.lock().unwrap();
        Self::ensure_atom(&mut atoms, &atom.id, &atom.concept);
        Ok(atom.clone())
    }

    fn delete_atom(&self, atom: &Atom) -> Result<bool, DataStoreError> {
        let mut atoms = self.atoms.lock().unwrap();
        let Some(ids) = atoms.get_mut(&atom.concept) else {
            return Ok(false);
        };
        let before = ids.len();
        ids.retain(|id| id != &atom.id);
        if ids.len() == before {
            return Ok(false);
        }
        drop(atoms);

        let mut links = self.links.lock().unwrap();
        for population in links.values_mut() {
            let src_side = population.relation.src() == atom.concept;
            let tgt_side = population.relation.tgt() == atom.concept;
            population.pairs.retain(|(src, tgt)| {
                !((src_side && src == &atom.id) || (tgt_side && tgt == &atom.id))
            });
        }
        Ok(true)
    }

    fn atoms(&self, concept: &str) -> Result<Vec<String>, DataStoreError> {
        let atoms = self.atoms.lock().unwrap();
        Ok(atoms.get(concept).cloned().unwrap_or_default())
    }

    fn new_atom_id(&self, concept: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}_{}_{}", concept, Utc::now().timestamp_micros(), n)
    }

    fn add_link(&self, relation: &Relation, src: &str, tgt: &str) -> Result<(), DataStoreError> {
        {
            let mut atoms = self.atoms.lock().unwrap();
            Self::ensure_atom(&mut atoms, src, relation.src());
            Self::ensure_atom(&mut atoms, tgt, relation.tgt());
        }
        let mut links = self.links.lock().unwrap();
        let population = links
            .entry(relation.signature().to_string())
            .or_insert_with(|| RelationPopulation {
                relation: relation.clone(),
                pairs: Vec::new(),
            });
        if population.pairs.iter().any(|(s, t)| s == src && t == tgt) {
            return Ok(());
        }
        if relation.is_uni() {
            population.pairs.retain(|(s, _)| s != src);
        }
        if relation.is_inj() {
            population.pairs.retain(|(_, t)| t != tgt);
        }
        population.pairs.push((src.to_string(), tgt.to_string()));
        Ok(())
    }

    fn delete_link(
        &self,
        relation: &Relation,
        src: &str,
        tgt: &str,
    ) -> Result<bool, DataStoreError> {
        let mut links = self.links.lock().unwrap();
        let Some(population) = links.get_mut(relation.signature()) else {
            return Ok(false);
        };
        let before = population.pairs.len();
        population.pairs.retain(|(s, t)| !(s == src && t == tgt));
        Ok(population.pairs.len() != before)
    }

    fn targets(
        &self,
        relation: &Relation,
        id: &str,
        flipped: bool,
    ) -> Result<Vec<String>, DataStoreError> {
        let links = self.links.lock().unwrap();
        let Some(population) = links.get(relation.signature()) else {
            return Ok(Vec::new());
        };
        Ok(population
            .pairs
            .iter()
            .filter_map(|(src, tgt)| {
                if flipped {
                    (tgt == id).then(|| src.clone())
                } else {
                    (src == id).then(|| tgt.clone())
                }
            })
            .collect())
    }

    fn snapshot(&self) -> Result<StoreSnapshot, DataStoreError> {
        let atoms = self.atoms.lock().unwrap().clone();
        let links = self.links.lock().unwrap().clone();
        Ok(StoreSnapshot { atoms, links })
    }

    fn restore(&self, snapshot: StoreSnapshot) -> Result<(), DataStoreError> {
        *self.atoms.lock().unwrap() = snapshot.atoms;
        *self.links.lock().unwrap() = snapshot.links;
        Ok(())
    }
}
