//! Relations between concepts.
//!
//! A relation is identified by its signature `name[Src*Tgt]`. The same name may be declared
//! between different concept pairs; the signature disambiguates them.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// The declaration of a relation as it appears in model documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationDefinition {
    /// The signature, e.g. `name[Person*Name]`.
    pub signature: String,
    /// Each source atom has at most one target.
    #[serde(default)]
    pub uni: bool,
    /// Each target atom has at most one source.
    #[serde(default)]
    pub inj: bool,
}

/// A parsed relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    signature: String,
    name: String,
    src: String,
    tgt: String,
    uni: bool,
    inj: bool,
}

fn signature_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([^\[\]\s*]+)\s*\[\s*([^\[\]\s*]+)\s*\*\s*([^\[\]\s*]+)\s*\]\s*$")
            .expect("relation signature regex is valid")
    })
}

impl Relation {
    /// Parses a signature `name[Src*Tgt]`.
    pub fn parse(signature: &str) -> Result<Self, ModelError> {
        let caps = signature_regex()
            .captures(signature)
            .ok_or_else(|| ModelError::InvalidSignature(signature.to_string()))?;
        let name = caps[1].to_string();
        let src = caps[2].to_string();
        let tgt = caps[3].to_string();
        Ok(Relation {
            signature: format!("{}[{}*{}]", name, src, tgt),
            name,
            src,
            tgt,
            uni: false,
            inj: false,
        })
    }

    /// Builds a relation from its model declaration.
    pub fn from_definition(def: &RelationDefinition) -> Result<Self, ModelError> {
        let mut rel = Self::parse(&def.signature)?;
        rel.uni = def.uni;
        rel.inj = def.inj;
        Ok(rel)
    }

    /// The normalized signature.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The relation name without concepts.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The source concept name.
    pub fn src(&self) -> &str {
        &self.src
    }

    /// The target concept name.
    pub fn tgt(&self) -> &str {
        &self.tgt
    }

    /// Each source has at most one target.
    pub fn is_uni(&self) -> bool {
        self.uni
    }

    /// Each target has at most one source.
    pub fn is_inj(&self) -> bool {
        self.inj
    }

    /// True when source and target are the same concept.
    pub fn is_endo(&self) -> bool {
        self.src == self.tgt
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_signature() {
        let rel = Relation::parse("filePath[FileObject*FilePath]").unwrap();
        assert_eq!(rel.name(), "filePath");
        assert_eq!(rel.src(), "FileObject");
        assert_eq!(rel.tgt(), "FilePath");
        assert_eq!(rel.signature(), "filePath[FileObject*FilePath]");
        assert!(!rel.is_endo());
    }

    #[test]
    fn parse_normalizes_whitespace() {
        let rel = Relation::parse(" active [ Person * Person ] ").unwrap();
        assert_eq!(rel.signature(), "active[Person*Person]");
        assert!(rel.is_endo());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            Relation::parse("name"),
            Err(ModelError::InvalidSignature(_))
        ));
        assert!(Relation::parse("name[A*]").is_err());
        assert!(Relation::parse("name[A*B]extra").is_err());
    }

    #[test]
    fn definition_carries_flags() {
        let rel = Relation::from_definition(&RelationDefinition {
            signature: "leader[Project*Person]".to_string(),
            uni: true,
            inj: false,
        })
        .unwrap();
        assert!(rel.is_uni());
        assert!(!rel.is_inj());
    }
}
