//! Effective-model types for the yantra schema compiler.
//!
//! This crate defines the *output* of a build:
//! - `flags` - derived per-statement flag bitset
//! - `effective` - the immutable effective statement tree
//! - `context` - the schema context root with module/path/prefix lookups
//!
//! Consumers (codecs, data validators) operate only on these types; the
//! build-time machinery lives in `yantra-compiler` and is never exposed.

mod context;
mod effective;
mod flags;

pub use context::{LookupError, Module, SchemaContext};
pub use effective::{EffectiveStatement, EffectiveStatementBuilder};
pub use flags::StmtFlags;
