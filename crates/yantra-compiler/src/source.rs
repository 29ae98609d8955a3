//! Build input: the set of source documents and feature selection.

use indexmap::IndexSet;
use yantra_core::RawStatement;

/// The documents one build compiles, split into main sources (whose
/// modules the caller asked for) and library sources (available to satisfy
/// imports and includes). Both are compiled uniformly; the split only
/// controls which roots end up in the resulting schema context.
#[derive(Default)]
pub struct SourceSet {
    main: Vec<RawStatement>,
    library: Vec<RawStatement>,
    /// `None` means every feature is supported.
    supported_features: Option<IndexSet<String>>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_main(mut self, source: RawStatement) -> Self {
        self.main.push(source);
        self
    }

    pub fn add_library(mut self, source: RawStatement) -> Self {
        self.library.push(source);
        self
    }

    /// Restrict the build to the named features. Statements guarded by an
    /// `if-feature` naming anything else are dropped before compilation.
    pub fn with_supported_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_features = Some(features.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty() && self.library.is_empty()
    }

    /// All sources with feature pruning applied, main sources first. The
    /// boolean marks main sources.
    pub(crate) fn pruned_sources(&self) -> Vec<(RawStatement, bool)> {
        let mut out = Vec::with_capacity(self.main.len() + self.library.len());
        for source in &self.main {
            out.push((self.prune(source), true));
        }
        for source in &self.library {
            out.push((self.prune(source), false));
        }
        out
    }

    fn prune(&self, stmt: &RawStatement) -> RawStatement {
        match &self.supported_features {
            None => stmt.clone(),
            Some(features) => prune_unsupported(stmt, features)
                .unwrap_or_else(|| RawStatement::new(stmt.keyword(), stmt.argument(), stmt.source_ref().clone())),
        }
    }
}

/// Rebuild `stmt` without subtrees guarded by an unsupported feature.
/// Returns `None` when `stmt` itself is guarded away. The `if-feature`
/// statements of surviving nodes are kept; they still document the guard.
fn prune_unsupported(stmt: &RawStatement, features: &IndexSet<String>) -> Option<RawStatement> {
    for child in stmt.children() {
        if child.keyword() == "if-feature" {
            let guarded = child.argument().unwrap_or_default();
            if !features.contains(guarded) {
                return None;
            }
        }
    }
    let mut rebuilt = RawStatement::new(stmt.keyword(), stmt.argument(), stmt.source_ref().clone());
    for child in stmt.children() {
        if let Some(kept) = prune_unsupported(child, features) {
            rebuilt = rebuilt.with_child(kept);
        }
    }
    Some(rebuilt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use yantra_core::SourceRef;

    fn at(line: u32) -> SourceRef {
        SourceRef::new("m.yang", line, 1)
    }

    fn module_with_guarded_leaf() -> RawStatement {
        RawStatement::new("module", Some("m"), at(1))
            .with_child(RawStatement::new("feature", Some("fancy"), at(2)))
            .with_child(
                RawStatement::new("leaf", Some("plain"), at(3))
                    .with_child(RawStatement::new("type", Some("string"), at(4))),
            )
            .with_child(
                RawStatement::new("leaf", Some("guarded"), at(5))
                    .with_child(RawStatement::new("if-feature", Some("fancy"), at(6)))
                    .with_child(RawStatement::new("type", Some("string"), at(7))),
            )
    }

    #[test]
    fn no_feature_set_keeps_everything() {
        let set = SourceSet::new().add_main(module_with_guarded_leaf());
        let (pruned, is_main) = set.pruned_sources().remove(0);
        assert!(is_main);
        assert_eq!(pruned.children().len(), 3);
    }

    #[test]
    fn unsupported_feature_drops_guarded_subtree() {
        let set = SourceSet::new()
            .add_main(module_with_guarded_leaf())
            .with_supported_features(Vec::<String>::new());
        let (pruned, _) = set.pruned_sources().remove(0);
        assert!(pruned.find_child("feature").is_some());
        assert_eq!(
            pruned
                .children()
                .iter()
                .filter(|c| c.keyword() == "leaf")
                .count(),
            1
        );
        assert_eq!(pruned.find_child("leaf").unwrap().argument(), Some("plain"));
    }

    #[test]
    fn supported_feature_keeps_guard_statement() {
        let set = SourceSet::new()
            .add_main(module_with_guarded_leaf())
            .with_supported_features(["fancy"]);
        let (pruned, _) = set.pruned_sources().remove(0);
        let guarded = pruned
            .children()
            .iter()
            .find(|c| c.argument() == Some("guarded"))
            .unwrap();
        assert!(guarded.find_child("if-feature").is_some());
    }

    #[test]
    fn main_sources_come_first() {
        let lib = RawStatement::new("module", Some("lib"), at(1));
        let main = RawStatement::new("module", Some("main"), at(1));
        let set = SourceSet::new().add_library(lib).add_main(main);
        let order: Vec<_> = set
            .pruned_sources()
            .iter()
            .map(|(s, m)| (s.argument().unwrap().to_owned(), *m))
            .collect();
        assert_eq!(order, [("main".to_owned(), true), ("lib".to_owned(), false)]);
    }
}
