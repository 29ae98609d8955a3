//! Core data structures for the yantra schema compiler.
//!
//! Shared by the producer (`yantra-compiler`) and the consumers of the
//! compiled model (`yantra-model`):
//! - `name` - namespace-qualified statement keyword identities
//! - `qname` - qualified node names and schema-tree paths
//! - `source` - source location references
//! - `stmt` - raw statement input nodes and typed argument values

mod name;
mod qname;
mod source;
mod stmt;

pub use name::StatementName;
pub use qname::{QName, SchemaPath};
pub use source::SourceRef;
pub use stmt::{Argument, OrderedBy, RawStatement, Status};
