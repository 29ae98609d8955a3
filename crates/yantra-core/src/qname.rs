//! Qualified names and schema-tree paths.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A node name qualified by the namespace of its defining module.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct QName {
    namespace: Arc<str>,
    local: Arc<str>,
}

impl QName {
    pub fn new(namespace: &str, local: &str) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// Same namespace, different local name.
    pub fn sibling(&self, local: &str) -> Self {
        Self {
            namespace: Arc::clone(&self.namespace),
            local: local.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}){}", self.namespace, self.local)
    }
}

/// Ordered list of qualified names locating a node in the schema tree,
/// root first.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct SchemaPath(Vec<QName>);

impl SchemaPath {
    /// The empty path, addressing the model root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_segments(segments: Vec<QName>) -> Self {
        Self(segments)
    }

    /// Path of a child of `self`.
    pub fn child(&self, segment: QName) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    pub fn segments(&self) -> &[QName] {
        &self.0
    }

    pub fn last(&self) -> Option<&QName> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn parent(&self) -> Option<Self> {
        match self.0.split_last() {
            Some((_, rest)) => Some(Self(rest.to_vec())),
            None => None,
        }
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_child_appends() {
        let ns = "urn:example:a";
        let p = SchemaPath::root()
            .child(QName::new(ns, "top"))
            .child(QName::new(ns, "inner"));
        assert_eq!(p.len(), 2);
        assert_eq!(p.last().unwrap().local_name(), "inner");
        assert_eq!(p.parent().unwrap().len(), 1);
        assert!(SchemaPath::root().parent().is_none());
    }

    #[test]
    fn display_forms() {
        let q = QName::new("urn:example:a", "top");
        assert_eq!(q.to_string(), "(urn:example:a)top");
        assert_eq!(SchemaPath::root().to_string(), "/");
        assert_eq!(
            SchemaPath::root().child(q).to_string(),
            "/(urn:example:a)top"
        );
    }
}
