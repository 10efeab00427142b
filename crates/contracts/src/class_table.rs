//! Class tables - statically declared annotation and binary classes

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// One declared class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ClassInfo {
    #[validate(length(min = 1))]
    pub id: String,

    #[serde(default)]
    pub description: String,
}

impl ClassInfo {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
        }
    }
}

/// Read-only, position-indexed class lookup
pub trait ClassTable {
    fn class(&self, index: usize) -> Option<&ClassInfo>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ClassTable for [ClassInfo] {
    fn class(&self, index: usize) -> Option<&ClassInfo> {
        self.get(index)
    }

    fn len(&self) -> usize {
        <[ClassInfo]>::len(self)
    }
}

impl ClassTable for Vec<ClassInfo> {
    fn class(&self, index: usize) -> Option<&ClassInfo> {
        self.get(index)
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}

/// Which table a class index is resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassTableKind {
    Annotation,
    Binary,
}

impl fmt::Display for ClassTableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Annotation => f.write_str("annotation"),
            Self::Binary => f.write_str("binary"),
        }
    }
}

/// Decoder type metadata: the class tables shared by every instance of the type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DecoderType {
    #[validate(length(min = 1))]
    pub id: String,

    /// Annotation classes, referenced by position
    #[serde(default)]
    #[validate(nested)]
    pub annotations: Vec<ClassInfo>,

    /// Binary classes, referenced by position
    #[serde(default)]
    #[validate(nested)]
    pub binary: Vec<ClassInfo>,
}

impl DecoderType {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            annotations: Vec::new(),
            binary: Vec::new(),
        }
    }

    /// Add annotation classes as `(id, description)` pairs
    pub fn with_annotations<'a>(
        mut self,
        classes: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        self.annotations
            .extend(classes.into_iter().map(|(id, d)| ClassInfo::new(id, d)));
        self
    }

    /// Add binary classes as `(id, description)` pairs
    pub fn with_binary<'a>(
        mut self,
        classes: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        self.binary
            .extend(classes.into_iter().map(|(id, d)| ClassInfo::new(id, d)));
        self
    }

    pub fn table(&self, kind: ClassTableKind) -> &dyn ClassTable {
        match kind {
            ClassTableKind::Annotation => &self.annotations,
            ClassTableKind::Binary => &self.binary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_position() {
        let uart = DecoderType::new("uart")
            .with_annotations([("rx-data", "RX data"), ("tx-data", "TX data")])
            .with_binary([("rx", "RX dump")]);

        let ann = uart.table(ClassTableKind::Annotation);
        assert_eq!(ann.len(), 2);
        assert_eq!(ann.class(1).map(|c| c.id.as_str()), Some("tx-data"));
        assert!(ann.class(2).is_none());

        let bin = uart.table(ClassTableKind::Binary);
        assert_eq!(bin.class(0).map(|c| c.id.as_str()), Some("rx"));
    }

    #[test]
    fn test_empty_class_id_invalid() {
        let bad = DecoderType::new("x").with_annotations([("", "nameless")]);
        assert!(bad.validate().is_err());
    }
}
