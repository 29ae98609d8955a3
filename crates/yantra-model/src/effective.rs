//! The immutable effective statement tree.

use std::fmt;
use std::sync::Arc;

use yantra_core::{Argument, QName, SchemaPath, StatementName};

use crate::StmtFlags;

/// A fully resolved statement in the effective model.
///
/// Built once by the compiler's freeze pass and shared by reference among
/// all consumers. Copies produced by grouping expansion carry an `original`
/// back-reference to the grouping definition's own effective statement.
#[derive(Clone, Debug)]
pub struct EffectiveStatement {
    name: StatementName,
    argument: Argument,
    substatements: Vec<Arc<EffectiveStatement>>,
    flags: StmtFlags,
    path: SchemaPath,
    original: Option<Arc<EffectiveStatement>>,
}

impl EffectiveStatement {
    pub fn builder(name: StatementName) -> EffectiveStatementBuilder {
        EffectiveStatementBuilder {
            name,
            argument: Argument::None,
            substatements: Vec::new(),
            flags: StmtFlags::new(),
            path: SchemaPath::root(),
            original: None,
        }
    }

    pub fn name(&self) -> &StatementName {
        &self.name
    }

    pub fn argument(&self) -> &Argument {
        &self.argument
    }

    /// Identifier or string payload of the argument, if it carries text.
    pub fn argument_str(&self) -> Option<&str> {
        self.argument.as_str()
    }

    pub fn substatements(&self) -> &[Arc<EffectiveStatement>] {
        &self.substatements
    }

    pub fn flags(&self) -> StmtFlags {
        self.flags
    }

    pub fn path(&self) -> &SchemaPath {
        &self.path
    }

    /// The grouping definition this statement was copied from, if any.
    pub fn original(&self) -> Option<&Arc<EffectiveStatement>> {
        self.original.as_ref()
    }

    /// Qualified name of this node in the schema tree, if it is a schema
    /// node (its path is non-empty).
    pub fn schema_name(&self) -> Option<&QName> {
        self.path.last()
    }

    /// First substatement with the given keyword.
    pub fn find_substatement(&self, keyword: &str) -> Option<&Arc<EffectiveStatement>> {
        self.substatements
            .iter()
            .find(|s| s.name.keyword() == keyword)
    }

    /// All substatements with the given keyword, in declaration order.
    pub fn substatements_of(
        &self,
        keyword: &str,
    ) -> impl Iterator<Item = &Arc<EffectiveStatement>> {
        self.substatements
            .iter()
            .filter(move |s| s.name.keyword() == keyword)
    }

    /// Direct child whose schema name matches `segment`.
    pub fn schema_child(&self, segment: &QName) -> Option<&Arc<EffectiveStatement>> {
        self.substatements
            .iter()
            .find(|s| s.schema_name() == Some(segment))
    }

    /// Structural equality: same identity, argument, flags, path, and
    /// recursively equal substatements. `original` links are deliberately
    /// excluded; two copies of a grouping at different sites are *not*
    /// structurally equal because their paths differ.
    pub fn structurally_equal(&self, other: &EffectiveStatement) -> bool {
        self.name == other.name
            && self.argument == other.argument
            && self.flags == other.flags
            && self.path == other.path
            && self.substatements.len() == other.substatements.len()
            && self
                .substatements
                .iter()
                .zip(&other.substatements)
                .all(|(a, b)| a.structurally_equal(b))
    }
}

impl fmt::Display for EffectiveStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.argument {
            Argument::None => write!(f, "{}", self.name),
            arg => write!(f, "{} {}", self.name, arg),
        }
    }
}

/// Builder used by the compiler's freeze pass.
#[derive(Debug)]
pub struct EffectiveStatementBuilder {
    name: StatementName,
    argument: Argument,
    substatements: Vec<Arc<EffectiveStatement>>,
    flags: StmtFlags,
    path: SchemaPath,
    original: Option<Arc<EffectiveStatement>>,
}

impl EffectiveStatementBuilder {
    pub fn argument(mut self, argument: Argument) -> Self {
        self.argument = argument;
        self
    }

    pub fn substatements(mut self, substatements: Vec<Arc<EffectiveStatement>>) -> Self {
        self.substatements = substatements;
        self
    }

    pub fn flags(mut self, flags: StmtFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn path(mut self, path: SchemaPath) -> Self {
        self.path = path;
        self
    }

    pub fn original(mut self, original: Arc<EffectiveStatement>) -> Self {
        self.original = Some(original);
        self
    }

    pub fn build(self) -> Arc<EffectiveStatement> {
        Arc::new(EffectiveStatement {
            name: self.name,
            argument: self.argument,
            substatements: self.substatements,
            flags: self.flags,
            path: self.path,
            original: self.original,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(keyword: &str, arg: &str) -> Arc<EffectiveStatement> {
        EffectiveStatement::builder(StatementName::core(keyword))
            .argument(Argument::Identifier(arg.into()))
            .build()
    }

    #[test]
    fn substatement_lookup() {
        let stmt = EffectiveStatement::builder(StatementName::core("container"))
            .argument(Argument::Identifier("top".into()))
            .substatements(vec![leaf("leaf", "a"), leaf("leaf", "b"), leaf("presence", "p")])
            .build();

        assert_eq!(
            stmt.find_substatement("presence").unwrap().argument_str(),
            Some("p")
        );
        assert_eq!(stmt.substatements_of("leaf").count(), 2);
        assert!(stmt.find_substatement("config").is_none());
    }

    #[test]
    fn structural_equality_ignores_original() {
        let orig = leaf("leaf", "a");
        let a = EffectiveStatement::builder(StatementName::core("leaf"))
            .argument(Argument::Identifier("a".into()))
            .original(Arc::clone(&orig))
            .build();
        let b = leaf("leaf", "a");
        assert!(a.structurally_equal(&b));
    }

    #[test]
    fn display_includes_argument() {
        assert_eq!(leaf("grouping", "g").to_string(), "grouping g");
    }
}
