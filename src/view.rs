//! View projections.
//!
//! A view turns an atom into display data: a sequence of fixed texts and relation lookups.
//! When every segment is labelled the projection is keyed (`{"first": .., "last": ..}`);
//! otherwise it is sequential and only feeds the display label.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The kind of a view segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    /// A fixed piece of text.
    Text,
    /// The targets of a relation from the viewed atom.
    Exp,
}

/// One segment of a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSegment {
    /// Key of the segment in keyed projections.
    #[serde(default)]
    pub label: Option<String>,
    /// Text or expression segment.
    pub kind: SegmentKind,
    /// Literal text for text segments.
    #[serde(default)]
    pub text: Option<String>,
    /// Relation signature for expression segments.
    #[serde(default)]
    pub relation: Option<String>,
    /// Follow the relation from target to source.
    #[serde(default)]
    pub flipped: bool,
}

/// A named view on a concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// The view identifier.
    pub id: String,
    /// The concept the view applies to.
    pub concept: String,
    /// The ordered segments.
    pub segments: Vec<ViewSegment>,
}

impl View {
    /// True when every segment is labelled, so the projection is a keyed structure.
    pub fn is_keyed(&self) -> bool {
        !self.segments.is_empty() && self.segments.iter().all(|s| s.label.is_some())
    }

    /// Assembles the projection from already evaluated segment values.
    ///
    /// `values` holds one string per segment, in order.
    pub fn project(&self, values: Vec<String>) -> Value {
        if self.is_keyed() {
            let mut map = Map::new();
            for (segment, value) in self.segments.iter().zip(values) {
                if let Some(label) = &segment.label {
                    map.insert(label.clone(), Value::String(value));
                }
            }
            Value::Object(map)
        } else {
            Value::Array(values.into_iter().map(Value::String).collect())
        }
    }
}

/// Concatenates a projection into a display string.
pub fn flatten(projection: &Value) -> String {
    match projection {
        Value::Object(map) => map.values().map(flatten).collect(),
        Value::Array(items) => items.iter().map(flatten).collect(),
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn segment(label: Option<&str>, text: &str) -> ViewSegment {
        ViewSegment {
            label: label.map(str::to_string),
            kind: SegmentKind::Text,
            text: Some(text.to_string()),
            relation: None,
            flipped: false,
        }
    }

    #[test]
    fn keyed_projection() {
        let view = View {
            id: "PersonName".to_string(),
            concept: "Person".to_string(),
            segments: vec![segment(Some("first"), ""), segment(Some("last"), "")],
        };
        assert!(view.is_keyed());
        let p = view.project(vec!["Ada".to_string(), "Lovelace".to_string()]);
        assert_eq!(p, json!({"first": "Ada", "last": "Lovelace"}));
    }

    #[test]
    fn sequential_projection() {
        let view = View {
            id: "PersonName".to_string(),
            concept: "Person".to_string(),
            segments: vec![segment(None, "Mr. "), segment(Some("last"), "")],
        };
        assert!(!view.is_keyed());
        let p = view.project(vec!["Mr. ".to_string(), "Bean".to_string()]);
        assert_eq!(flatten(&p), "Mr. Bean");
    }
}
