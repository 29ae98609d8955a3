//! Raw statement input nodes and typed argument values.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{QName, SourceRef};

/// A statement as emitted by the (external) grammar layer: a keyword, an
/// optional raw argument string, and ordered substatements.
///
/// Raw statements are immutable once constructed. Argument text is not yet
/// typed; the compiler's per-keyword policy parses it into an [`Argument`]
/// when the build tree is populated.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct RawStatement {
    keyword: String,
    argument: Option<String>,
    children: Vec<RawStatement>,
    at: SourceRef,
}

impl RawStatement {
    pub fn new(keyword: &str, argument: Option<&str>, at: SourceRef) -> Self {
        Self {
            keyword: keyword.to_owned(),
            argument: argument.map(str::to_owned),
            children: Vec::new(),
            at,
        }
    }

    /// Append a substatement, builder style.
    pub fn with_child(mut self, child: RawStatement) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = RawStatement>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    pub fn children(&self) -> &[RawStatement] {
        &self.children
    }

    pub fn source_ref(&self) -> &SourceRef {
        &self.at
    }

    /// First direct substatement with the given keyword.
    pub fn find_child(&self, keyword: &str) -> Option<&RawStatement> {
        self.children.iter().find(|c| c.keyword == keyword)
    }
}

/// Typed argument value of a statement, produced by the statement kind's
/// argument parser.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Argument {
    /// The keyword takes no argument.
    None,
    /// Free-form string (descriptions, contact info, revision dates).
    Str(Arc<str>),
    /// A bare identifier (module names, grouping names, prefixes).
    Identifier(Arc<str>),
    /// A resolved qualified name.
    QName(QName),
    Int(i64),
    Bool(bool),
    Status(Status),
    OrderedBy(OrderedBy),
}

impl Argument {
    /// The identifier or string payload, if this argument carries text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Argument::Str(s) | Argument::Identifier(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_qname(&self) -> Option<&QName> {
        match self {
            Argument::QName(q) => Some(q),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Argument::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Argument::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_status(&self) -> Option<Status> {
        match self {
            Argument::Status(s) => Some(*s),
            _ => None,
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::None => f.write_str(""),
            Argument::Str(s) | Argument::Identifier(s) => f.write_str(s),
            Argument::QName(q) => write!(f, "{q}"),
            Argument::Int(i) => write!(f, "{i}"),
            Argument::Bool(b) => write!(f, "{b}"),
            Argument::Status(s) => write!(f, "{s}"),
            Argument::OrderedBy(o) => write!(f, "{o}"),
        }
    }
}

/// Lifecycle status of a definition.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Current,
    Deprecated,
    Obsolete,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Current => "current",
            Status::Deprecated => "deprecated",
            Status::Obsolete => "obsolete",
        })
    }
}

/// List entry ordering declared by an `ordered-by` statement.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum OrderedBy {
    #[default]
    System,
    User,
}

impl fmt::Display for OrderedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderedBy::System => "system",
            OrderedBy::User => "user",
        })
    }
}
