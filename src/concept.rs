//! # Concepts and Atoms
//!
//! A concept is a named type. Object concepts carry independent identity and can head a
//! [`Resource`](crate::Resource); scalar concepts (strings, numbers, dates) cannot.
//!
//! An atom is an identifier paired with the name of its concept. Atoms are value objects:
//! whether an atom exists is a fact of the [`AtomStore`](crate::AtomStore), not of the value.

use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ResourceError;

///////////////////////////////////////////// ConceptType //////////////////////////////////////////////

/// The representation type of a concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConceptType {
    /// Identity-bearing concept.
    Object,
    /// Short text.
    Alphanumeric,
    /// Long text.
    Bigalphanumeric,
    /// Very long text.
    Hugealphanumeric,
    /// Secret text.
    Password,
    /// `true` / `false`.
    Boolean,
    /// Whole number.
    Integer,
    /// Floating point number.
    Float,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// RFC 3339 timestamp.
    Datetime,
}

/////////////////////////////////////////////// Concept ////////////////////////////////////////////////

/// A named type in the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    /// The concept name, unique within the model.
    pub name: String,
    /// The representation type.
    #[serde(rename = "type")]
    pub concept_type: ConceptType,
    /// Marks the concept whose atoms are user sessions.
    #[serde(default)]
    pub is_session: bool,
    /// Marks a concept whose atoms represent uploaded files.
    #[serde(default)]
    pub is_file_object: bool,
    /// The view used for labels when an interface step does not name one.
    #[serde(default)]
    pub default_view: Option<String>,
}

impl Concept {
    /// Creates an object concept.
    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, ConceptType::Object)
    }

    /// Creates a concept of the given type.
    pub fn new(name: impl Into<String>, concept_type: ConceptType) -> Self {
        Self {
            name: name.into(),
            concept_type,
            is_session: false,
            is_file_object: false,
            default_view: None,
        }
    }

    /// True for identity-bearing concepts.
    pub fn is_object(&self) -> bool {
        self.concept_type == ConceptType::Object
    }

    /// Checks that `value` is a valid identifier for an atom of this concept and returns
    /// its canonical string form.
    ///
    /// Only scalars are accepted; objects and arrays are rejected, as is `null`.
    pub fn atom_id(&self, value: &Value) -> Result<String, ResourceError> {
        let raw = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => {
                return Err(ResourceError::bad_request("Value not provided"));
            }
            Value::Array(_) | Value::Object(_) => {
                return Err(ResourceError::bad_request(format!(
                    "Literal expected but {} provided for concept '{}'",
                    json_type_name(value),
                    self.name
                )));
            }
        };
        self.validate_literal(&raw)?;
        Ok(raw)
    }

    fn validate_literal(&self, raw: &str) -> Result<(), ResourceError> {
        let ok = match self.concept_type {
            ConceptType::Integer => raw.parse::<i64>().is_ok(),
            ConceptType::Float => raw.parse::<f64>().is_ok(),
            ConceptType::Boolean => raw == "true" || raw == "false",
            ConceptType::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok(),
            ConceptType::Datetime => DateTime::parse_from_rfc3339(raw).is_ok(),
            _ => true,
        };
        if ok {
            Ok(())
        } else {
            Err(ResourceError::bad_request(format!(
                "'{}' is not a valid value for concept '{}' of type {:?}",
                raw, self.name, self.concept_type
            )))
        }
    }

    /// Renders an atom identifier of this concept as JSON.
    ///
    /// Numbers and booleans become JSON numbers and booleans, everything else a string.
    pub fn render(&self, id: &str) -> Value {
        match self.concept_type {
            ConceptType::Integer => id
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(id.to_string())),
            ConceptType::Float => id
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(id.to_string())),
            ConceptType::Boolean => match id {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::String(id.to_string()),
            },
            _ => Value::String(id.to_string()),
        }
    }
}

impl Display for Concept {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name)
    }
}

//////////////////////////////////////////////// Atom //////////////////////////////////////////////////

/// An identified instance of a concept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Atom {
    /// The atom identifier.
    pub id: String,
    /// The name of the atom's concept.
    pub concept: String,
}

impl Atom {
    /// Creates an atom value.
    pub fn new(id: impl Into<String>, concept: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            concept: concept.into(),
        }
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}[{}]", self.id, self.concept)
    }
}

/// Names the JSON type of a value for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn atom_display() {
        assert_eq!(Atom::new("p1", "Person").to_string(), "p1[Person]");
    }

    #[test]
    fn atom_id_rejects_structures() {
        let c = Concept::new("Name", ConceptType::Alphanumeric);
        assert_eq!(c.atom_id(&json!("Ann")).unwrap(), "Ann");
        let err = c.atom_id(&json!({"_id_": "x"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        let err = c.atom_id(&json!(["x"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        let err = c.atom_id(&Value::Null).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn typed_literals_are_validated() {
        let int = Concept::new("Age", ConceptType::Integer);
        assert_eq!(int.atom_id(&json!(42)).unwrap(), "42");
        assert!(int.atom_id(&json!("forty")).is_err());

        let date = Concept::new("Birthday", ConceptType::Date);
        assert!(date.atom_id(&json!("2020-02-29")).is_ok());
        assert!(date.atom_id(&json!("2021-02-29")).is_err());

        let ts = Concept::new("Seen", ConceptType::Datetime);
        assert!(ts.atom_id(&json!("2024-01-01T12:00:00Z")).is_ok());
        assert!(ts.atom_id(&json!("yesterday")).is_err());
    }

    #[test]
    fn render_follows_concept_type() {
        assert_eq!(Concept::new("Age", ConceptType::Integer).render("7"), json!(7));
        assert_eq!(Concept::new("Ratio", ConceptType::Float).render("0.5"), json!(0.5));
        assert_eq!(Concept::new("Flag", ConceptType::Boolean).render("true"), json!(true));
        assert_eq!(Concept::new("Name", ConceptType::Alphanumeric).render("7"), json!("7"));
    }

    #[test]
    fn concept_type_deserializes_uppercase() {
        let c: Concept = serde_json::from_value(json!({
            "name": "FileObject",
            "type": "OBJECT",
            "isFileObject": true
        }))
        .unwrap();
        assert!(c.is_object());
        assert!(c.is_file_object);
        assert!(!c.is_session);
    }
}
