//! Scoped key-value stores used to publish and resolve cross-references.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use yantra_core::{QName, SourceRef};

use crate::error::SourceError;
use crate::tree::CtxId;

/// The closed set of namespace kinds.
///
/// Each kind carries a visibility contract ([`ScopeRule`]); the statement
/// policies decide *where* to publish, the tree's lookup walks accordingly.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum NamespaceKind {
    /// Module name -> root context. Global.
    Module,
    /// Submodule name -> root context. Global.
    Submodule,
    /// Submodule name -> name of the module it belongs to. Global.
    BelongsTo,
    /// Feature name -> defining context. Global.
    Feature,
    /// Identity name -> defining context. Global.
    Identity,
    /// Import prefix -> imported module's root context. Source-root scoped.
    Prefix,
    /// Grouping name -> defining context. Visible to the publishing scope
    /// and its descendants.
    Grouping,
    /// Typedef name -> defining context. Same visibility as groupings.
    Typedef,
    /// Child schema node name -> child context. Local to the parent node.
    SchemaTree,
    /// Submodule name -> submodule root, recorded on the including module.
    IncludedSubmodule,
}

/// How a lookup starting at some context travels.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScopeRule {
    /// Resolved against the build-global store only.
    Global,
    /// The starting context's store, then each ancestor in turn.
    WalkUp,
    /// The starting context's store only.
    Local,
}

impl NamespaceKind {
    pub fn scope_rule(self) -> ScopeRule {
        match self {
            NamespaceKind::Module
            | NamespaceKind::Submodule
            | NamespaceKind::BelongsTo
            | NamespaceKind::Feature
            | NamespaceKind::Identity => ScopeRule::Global,
            NamespaceKind::Prefix | NamespaceKind::Grouping | NamespaceKind::Typedef => {
                ScopeRule::WalkUp
            }
            NamespaceKind::SchemaTree | NamespaceKind::IncludedSubmodule => ScopeRule::Local,
        }
    }
}

impl fmt::Display for NamespaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NamespaceKind::Module => "module",
            NamespaceKind::Submodule => "submodule",
            NamespaceKind::BelongsTo => "belongs-to",
            NamespaceKind::Feature => "feature",
            NamespaceKind::Identity => "identity",
            NamespaceKind::Prefix => "prefix",
            NamespaceKind::Grouping => "grouping",
            NamespaceKind::Typedef => "typedef",
            NamespaceKind::SchemaTree => "schema node",
            NamespaceKind::IncludedSubmodule => "included submodule",
        })
    }
}

/// A published value: either a context reference or a plain resolved value.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum NamespaceValue {
    Context(CtxId),
    Name(QName),
    Text(Arc<str>),
}

impl NamespaceValue {
    pub fn as_context(&self) -> Option<CtxId> {
        match self {
            NamespaceValue::Context(ctx) => Some(*ctx),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            NamespaceValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// One context's namespace store: per-kind key->value maps with binding
/// locations kept for duplicate reporting. Insertion order is preserved so
/// builds are deterministic.
#[derive(Debug, Default)]
pub struct NamespaceStore {
    entries: IndexMap<(NamespaceKind, String), (NamespaceValue, SourceRef)>,
}

impl NamespaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key`, failing if it is already bound in this store.
    pub fn put(
        &mut self,
        kind: NamespaceKind,
        key: &str,
        value: NamespaceValue,
        at: &SourceRef,
    ) -> Result<(), SourceError> {
        if let Some((_, existing_at)) = self.entries.get(&(kind, key.to_owned())) {
            return Err(SourceError::new(
                format!("duplicate {} `{}`", kind, key),
                at,
            )
            .with_related(existing_at));
        }
        self.entries
            .insert((kind, key.to_owned()), (value, at.clone()));
        Ok(())
    }

    pub fn get(&self, kind: NamespaceKind, key: &str) -> Option<&NamespaceValue> {
        self.entries.get(&(kind, key.to_owned())).map(|(v, _)| v)
    }

    /// Binding location of a key, for duplicate/shadowing reports.
    pub fn binding_ref(&self, kind: NamespaceKind, key: &str) -> Option<&SourceRef> {
        self.entries.get(&(kind, key.to_owned())).map(|(_, at)| at)
    }

    /// All entries of one kind, in insertion order.
    pub fn iter_kind(
        &self,
        kind: NamespaceKind,
    ) -> impl Iterator<Item = (&str, &NamespaceValue)> {
        self.entries
            .iter()
            .filter(move |((k, _), _)| *k == kind)
            .map(|((_, key), (value, _))| (key.as_str(), value))
    }

    /// Every entry, in insertion order.
    pub fn entries(
        &self,
    ) -> impl Iterator<Item = (NamespaceKind, &str, &NamespaceValue, &SourceRef)> {
        self.entries
            .iter()
            .map(|((kind, key), (value, at))| (*kind, key.as_str(), value, at))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: u32) -> SourceRef {
        SourceRef::new("a.yang", line, 1)
    }

    #[test]
    fn put_then_get() {
        let mut store = NamespaceStore::new();
        store
            .put(
                NamespaceKind::Grouping,
                "g",
                NamespaceValue::Context(CtxId::from_raw(7)),
                &at(1),
            )
            .unwrap();

        assert_eq!(
            store.get(NamespaceKind::Grouping, "g").unwrap().as_context(),
            Some(CtxId::from_raw(7))
        );
        // Different kind, same key: distinct binding.
        assert!(store.get(NamespaceKind::Typedef, "g").is_none());
    }

    #[test]
    fn duplicate_names_both_locations() {
        let mut store = NamespaceStore::new();
        store
            .put(
                NamespaceKind::Grouping,
                "g",
                NamespaceValue::Context(CtxId::from_raw(1)),
                &at(2),
            )
            .unwrap();
        let err = store
            .put(
                NamespaceKind::Grouping,
                "g",
                NamespaceValue::Context(CtxId::from_raw(2)),
                &at(9),
            )
            .unwrap_err();

        assert!(err.message().contains("duplicate grouping `g`"));
        assert_eq!(err.source_ref().line(), 9);
        assert_eq!(err.related().unwrap().line(), 2);
    }

    #[test]
    fn iter_kind_preserves_order() {
        let mut store = NamespaceStore::new();
        for (i, name) in ["b", "a", "c"].iter().enumerate() {
            store
                .put(
                    NamespaceKind::SchemaTree,
                    name,
                    NamespaceValue::Context(CtxId::from_raw(i as u32)),
                    &at(i as u32 + 1),
                )
                .unwrap();
        }
        let keys: Vec<_> = store
            .iter_kind(NamespaceKind::SchemaTree)
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }
}
