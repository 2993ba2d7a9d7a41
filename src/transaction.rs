//! # Transactions
//!
//! Every mutating request runs inside a [`StoreTransaction`]. Opening one snapshots the store;
//! closing it evaluates the [`InvariantRules`] against the mutated population and then either
//! keeps the changes or restores the snapshot:
//!
//! | Request type | Invariants hold | Invariants violated |
//! |---|---|---|
//! | `promise`    | commit          | roll back           |
//! | `feedback`   | roll back       | roll back           |
//!
//! A request that fails before closing rolls back through [`StoreTransaction::rollback`].
//! Mutations of concurrent requests must not interleave, so callers hold a write lock for
//! the lifetime of the transaction.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data_store::StoreSnapshot;
use crate::{AtomStore, Model, ResourceError};

////////////////////////////////////////////// RequestType /////////////////////////////////////////////

/// How a mutating request treats its changes once invariants were evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    /// Commit when the invariants hold.
    #[default]
    Promise,
    /// Report only; never commit.
    Feedback,
}

impl Display for RequestType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RequestType::Promise => write!(f, "promise"),
            RequestType::Feedback => write!(f, "feedback"),
        }
    }
}

impl FromStr for RequestType {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "promise" => Ok(RequestType::Promise),
            "feedback" => Ok(RequestType::Feedback),
            _ => Err(ResourceError::bad_request(format!(
                "Unknown request type '{}'. Supported are: 'feedback', 'promise'",
                s
            ))),
        }
    }
}

///////////////////////////////////////////// InvariantRules ///////////////////////////////////////////

/// A broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: String,
    pub message: String,
}

/// The invariants a population must satisfy before a transaction may commit.
pub trait InvariantRules: Send + Sync {
    /// Returns every violated invariant; empty when all hold.
    fn violations(&self, model: &Model, store: &dyn AtomStore) -> Vec<Violation>;
}

/// No invariants; every population is acceptable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInvariants;

impl InvariantRules for NoInvariants {
    fn violations(&self, _: &Model, _: &dyn AtomStore) -> Vec<Violation> {
        Vec::new()
    }
}

impl<F> InvariantRules for F
where
    F: Fn(&Model, &dyn AtomStore) -> Vec<Violation> + Send + Sync,
{
    fn violations(&self, model: &Model, store: &dyn AtomStore) -> Vec<Violation> {
        self(model, store)
    }
}

////////////////////////////////////////////// Notifications ///////////////////////////////////////////

/// Messages reported back to the client with a mutating response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notifications {
    pub successes: Vec<String>,
    pub invariants: Vec<Violation>,
}

/// The result of closing a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutcome {
    pub invariant_rules_hold: bool,
    pub request_type: RequestType,
    pub committed: bool,
    pub notifications: Notifications,
}

//////////////////////////////////////////// StoreTransaction //////////////////////////////////////////

/// A snapshot-backed transaction over an [`AtomStore`].
pub struct StoreTransaction<'a> {
    store: &'a dyn AtomStore,
    snapshot: StoreSnapshot,
    request_type: RequestType,
}

impl<'a> StoreTransaction<'a> {
    /// Opens a transaction by snapshotting `store`.
    pub fn open(store: &'a dyn AtomStore) -> Result<Self, ResourceError> {
        Ok(Self {
            store,
            snapshot: store.snapshot()?,
            request_type: RequestType::default(),
        })
    }

    pub fn set_request_type(&mut self, request_type: RequestType) {
        self.request_type = request_type;
    }

    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    /// Evaluates `rules` and commits or rolls back according to the request type.
    pub fn close(
        self,
        success_message: &str,
        model: &Model,
        rules: &dyn InvariantRules,
    ) -> Result<TransactionOutcome, ResourceError> {
        let violations = rules.violations(model, self.store);
        let hold = violations.is_empty();
        let commit = hold && self.request_type == RequestType::Promise;
        let mut notifications = Notifications {
            successes: Vec::new(),
            invariants: violations,
        };
        if commit {
            notifications.successes.push(success_message.to_string());
        } else {
            self.store.restore(self.snapshot)?;
        }
        tracing::info!(
            request_type = %self.request_type,
            invariant_rules_hold = hold,
            committed = commit,
            "closed transaction"
        );
        Ok(TransactionOutcome {
            invariant_rules_hold: hold,
            request_type: self.request_type,
            committed: commit,
            notifications,
        })
    }

    /// Restores the snapshot taken when the transaction opened.
    pub fn rollback(self) -> Result<(), ResourceError> {
        tracing::debug!(request_type = %self.request_type, "rolling back transaction");
        self.store.restore(self.snapshot)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::{sample_model, sample_store};
    use crate::{Atom, ErrorKind};

    fn bob_must_not_exist(model: &Model, store: &dyn AtomStore) -> Vec<Violation> {
        let name = model.relation("name[Person*Name]").unwrap();
        let mut out = Vec::new();
        for person in store.atoms("Person").unwrap() {
            if store.targets(name, &person, false).unwrap() == vec!["Bob".to_string()] {
                out.push(Violation {
                    rule: "NoBob".to_string(),
                    message: format!("{} is called Bob", person),
                });
            }
        }
        out
    }

    #[test]
    fn request_type_parses() {
        assert_eq!("promise".parse::<RequestType>().unwrap(), RequestType::Promise);
        assert_eq!("Feedback".parse::<RequestType>().unwrap(), RequestType::Feedback);
        let err = "maybe".parse::<RequestType>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(RequestType::default(), RequestType::Promise);
    }

    #[test]
    fn promise_commits_when_invariants_hold() {
        let model = sample_model();
        let store = sample_store(&model);
        let tx = StoreTransaction::open(store.as_ref()).unwrap();
        store.create(&Atom::new("p3", "Person")).unwrap();
        let outcome = tx.close("Person created", &model, &NoInvariants).unwrap();
        assert!(outcome.invariant_rules_hold);
        assert!(outcome.committed);
        assert_eq!(outcome.notifications.successes, vec!["Person created"]);
        assert!(store.exists(&Atom::new("p3", "Person")).unwrap());
    }

    #[test]
    fn violated_invariants_roll_back() {
        let model = sample_model();
        let store = sample_store(&model);
        let tx = StoreTransaction::open(store.as_ref()).unwrap();
        store.create(&Atom::new("p3", "Person")).unwrap();
        let outcome = tx.close("ok", &model, &bob_must_not_exist).unwrap();
        assert!(!outcome.invariant_rules_hold);
        assert!(!outcome.committed);
        assert_eq!(outcome.notifications.invariants.len(), 1);
        assert!(outcome.notifications.successes.is_empty());
        assert!(!store.exists(&Atom::new("p3", "Person")).unwrap());
    }

    #[test]
    fn feedback_never_commits() {
        let model = sample_model();
        let store = sample_store(&model);
        let mut tx = StoreTransaction::open(store.as_ref()).unwrap();
        tx.set_request_type(RequestType::Feedback);
        store.create(&Atom::new("p3", "Person")).unwrap();
        let outcome = tx.close("ok", &model, &NoInvariants).unwrap();
        assert!(outcome.invariant_rules_hold);
        assert!(!outcome.committed);
        assert_eq!(outcome.request_type, RequestType::Feedback);
        assert!(!store.exists(&Atom::new("p3", "Person")).unwrap());
    }

    #[test]
    fn explicit_rollback_restores_snapshot() {
        let model = sample_model();
        let store = sample_store(&model);
        let before = store.snapshot().unwrap();
        let tx = StoreTransaction::open(store.as_ref()).unwrap();
        store.delete_atom(&Atom::new("p1", "Person")).unwrap();
        tx.rollback().unwrap();
        assert_eq!(store.snapshot().unwrap(), before);
    }
}
