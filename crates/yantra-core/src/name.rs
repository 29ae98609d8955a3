//! Statement keyword identities.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identity of a statement kind: an optional extension namespace, the
/// keyword itself, and the name of the argument the keyword accepts.
///
/// Cheap to clone (`Arc<str>` internals) and used as a map key everywhere:
/// in the statement registry, in substatement cardinality tables, and in
/// effective-statement lookups.
///
/// Equality and hashing cover the namespace and keyword only; the argument
/// name is descriptive metadata supplied by the statement registry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatementName {
    namespace: Option<Arc<str>>,
    keyword: Arc<str>,
    argument: Option<Arc<str>>,
}

impl StatementName {
    /// A keyword in the core language namespace.
    pub fn core(keyword: &str) -> Self {
        Self {
            namespace: None,
            keyword: keyword.into(),
            argument: None,
        }
    }

    /// A keyword in an extension namespace.
    pub fn qualified(namespace: &str, keyword: &str) -> Self {
        Self {
            namespace: Some(namespace.into()),
            keyword: keyword.into(),
            argument: None,
        }
    }

    /// Attach the argument name this keyword accepts.
    pub fn with_argument(mut self, argument: &str) -> Self {
        self.argument = Some(argument.into());
        self
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Name of the argument this keyword accepts, if any.
    pub fn argument_name(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// Whether this keyword takes an argument at all.
    pub fn takes_argument(&self) -> bool {
        self.argument.is_some()
    }
}

impl PartialEq for StatementName {
    fn eq(&self, other: &Self) -> bool {
        self.keyword == other.keyword && self.namespace == other.namespace
    }
}

impl Eq for StatementName {}

impl std::hash::Hash for StatementName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.keyword.hash(state);
    }
}

impl fmt::Display for StatementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "({}){}", ns, self.keyword),
            None => f.write_str(&self.keyword),
        }
    }
}
