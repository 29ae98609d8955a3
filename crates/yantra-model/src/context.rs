//! The schema context root: lookups over the compiled model.

use std::sync::Arc;

use indexmap::IndexMap;
use yantra_core::{QName, SchemaPath};

use crate::EffectiveStatement;

/// Lookup failures on a compiled schema context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("module `{0}` is not part of this context")]
    UnknownModule(String),

    #[error("no module declares namespace `{0}`")]
    UnknownNamespace(String),

    #[error("prefix `{prefix}` is not bound in module `{module}`")]
    UnknownPrefix { module: String, prefix: String },

    #[error("path segment `{0}` does not exist")]
    UnknownPathSegment(QName),
}

/// A compiled module: its identifying attributes plus the frozen effective
/// statement tree rooted at the `module` statement.
#[derive(Debug, Clone)]
pub struct Module {
    name: String,
    namespace: String,
    revision: Option<String>,
    prefix: Option<String>,
    statement: Arc<EffectiveStatement>,
    /// Import prefix -> imported module name.
    prefix_bindings: IndexMap<String, String>,
    /// Names of submodules pulled in via `include`.
    includes: Vec<String>,
}

impl Module {
    pub fn new(name: &str, namespace: &str, statement: Arc<EffectiveStatement>) -> Self {
        Self {
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            revision: None,
            prefix: None,
            statement,
            prefix_bindings: IndexMap::new(),
            includes: Vec::new(),
        }
    }

    pub fn with_revision(mut self, revision: Option<&str>) -> Self {
        self.revision = revision.map(str::to_owned);
        self
    }

    pub fn with_prefix(mut self, prefix: Option<&str>) -> Self {
        self.prefix = prefix.map(str::to_owned);
        self
    }

    pub fn with_prefix_binding(mut self, prefix: &str, module: &str) -> Self {
        self.prefix_bindings.insert(prefix.to_owned(), module.to_owned());
        self
    }

    pub fn with_include(mut self, submodule: &str) -> Self {
        self.includes.push(submodule.to_owned());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Most recent revision date, if the module declares one.
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn statement(&self) -> &Arc<EffectiveStatement> {
        &self.statement
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn prefix_bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefix_bindings
            .iter()
            .map(|(p, m)| (p.as_str(), m.as_str()))
    }
}

/// The immutable root of a successful build.
///
/// Main-source modules come first, in caller order, followed by library
/// modules. Lookups by bare name resolve to the most recent revision.
#[derive(Debug, Clone)]
pub struct SchemaContext {
    modules: Vec<Module>,
}

impl SchemaContext {
    pub fn new(modules: Vec<Module>) -> Self {
        Self { modules }
    }

    /// All modules, in insertion order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    /// Module by name; with several revisions present, the most recent
    /// wins (revision dates compare lexicographically).
    pub fn module(&self, name: &str) -> Result<&Module, LookupError> {
        self.modules
            .iter()
            .filter(|m| m.name == name)
            .max_by(|a, b| a.revision.cmp(&b.revision))
            .ok_or_else(|| LookupError::UnknownModule(name.to_owned()))
    }

    /// Module by exact name and revision.
    pub fn module_at(&self, name: &str, revision: Option<&str>) -> Result<&Module, LookupError> {
        self.modules
            .iter()
            .find(|m| m.name == name && m.revision.as_deref() == revision)
            .ok_or_else(|| LookupError::UnknownModule(name.to_owned()))
    }

    pub fn module_by_namespace(&self, namespace: &str) -> Result<&Module, LookupError> {
        self.modules
            .iter()
            .find(|m| m.namespace == namespace)
            .ok_or_else(|| LookupError::UnknownNamespace(namespace.to_owned()))
    }

    /// Effective statement addressed by a schema-tree path.
    pub fn find_path(&self, path: &SchemaPath) -> Result<&Arc<EffectiveStatement>, LookupError> {
        let mut segments = path.segments().iter();
        let first = segments
            .next()
            .ok_or_else(|| LookupError::UnknownNamespace(String::new()))?;

        let module = self.module_by_namespace(first.namespace())?;
        let mut current = module
            .statement
            .schema_child(first)
            .ok_or_else(|| LookupError::UnknownPathSegment(first.clone()))?;

        for segment in segments {
            current = current
                .schema_child(segment)
                .ok_or_else(|| LookupError::UnknownPathSegment(segment.clone()))?;
        }
        Ok(current)
    }

    /// Resolve a prefix as seen from within `module`: the module's own
    /// prefix refers to itself, import prefixes to the imported module.
    pub fn resolve_prefix(&self, module: &str, prefix: &str) -> Result<&Module, LookupError> {
        let ctx = self.module(module)?;
        if ctx.prefix.as_deref() == Some(prefix) {
            return Ok(ctx);
        }
        match ctx.prefix_bindings.get(prefix) {
            Some(target) => self.module(target),
            None => Err(LookupError::UnknownPrefix {
                module: module.to_owned(),
                prefix: prefix.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yantra_core::{Argument, StatementName};

    fn module_stmt(name: &str, ns: &str, children: Vec<Arc<EffectiveStatement>>) -> Module {
        let stmt = EffectiveStatement::builder(StatementName::core("module"))
            .argument(Argument::Identifier(name.into()))
            .substatements(children)
            .build();
        Module::new(name, ns, stmt)
    }

    fn container(ns: &str, name: &str, children: Vec<Arc<EffectiveStatement>>) -> Arc<EffectiveStatement> {
        let path = SchemaPath::root().child(QName::new(ns, name));
        EffectiveStatement::builder(StatementName::core("container"))
            .argument(Argument::Identifier(name.into()))
            .path(path)
            .substatements(children)
            .build()
    }

    #[test]
    fn module_lookup_prefers_latest_revision() {
        let old = module_stmt("a", "urn:a", vec![]).with_revision(Some("2020-01-01"));
        let new = module_stmt("a", "urn:a", vec![]).with_revision(Some("2024-06-30"));
        let ctx = SchemaContext::new(vec![old, new]);

        assert_eq!(ctx.module("a").unwrap().revision(), Some("2024-06-30"));
        assert_eq!(
            ctx.module_at("a", Some("2020-01-01")).unwrap().revision(),
            Some("2020-01-01")
        );
        assert_eq!(
            ctx.module("missing").unwrap_err(),
            LookupError::UnknownModule("missing".into())
        );
    }

    #[test]
    fn prefix_resolution() {
        let a = module_stmt("a", "urn:a", vec![])
            .with_prefix(Some("a"))
            .with_prefix_binding("bp", "b");
        let b = module_stmt("b", "urn:b", vec![]).with_prefix(Some("b"));
        let ctx = SchemaContext::new(vec![a, b]);

        assert_eq!(ctx.resolve_prefix("a", "a").unwrap().name(), "a");
        assert_eq!(ctx.resolve_prefix("a", "bp").unwrap().name(), "b");
        assert!(matches!(
            ctx.resolve_prefix("a", "zz"),
            Err(LookupError::UnknownPrefix { .. })
        ));
    }

    #[test]
    fn path_lookup_descends_schema_children() {
        // Build a nested schema: module a { container top { container inner }}.
        // Paths mirror what the freeze pass computes.
        let ns = "urn:a";
        let inner_path = SchemaPath::root()
            .child(QName::new(ns, "top"))
            .child(QName::new(ns, "inner"));
        let inner = EffectiveStatement::builder(StatementName::core("container"))
            .argument(Argument::Identifier("inner".into()))
            .path(inner_path.clone())
            .build();
        let top = container(ns, "top", vec![inner]);
        let ctx = SchemaContext::new(vec![module_stmt("a", ns, vec![top])]);

        let found = ctx.find_path(&inner_path).unwrap();
        assert_eq!(found.argument_str(), Some("inner"));

        let missing = inner_path.child(QName::new(ns, "ghost"));
        assert_eq!(
            ctx.find_path(&missing).unwrap_err(),
            LookupError::UnknownPathSegment(QName::new(ns, "ghost"))
        );
    }
}
