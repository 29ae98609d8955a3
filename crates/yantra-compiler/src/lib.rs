//! Yantra compiler: the statement inference reactor.
//!
//! Compilation pipeline for schema sources:
//! - `source` - build input assembly and feature selection
//! - `registry` - keyword to policy resolution per language profile
//! - `tree` - the mutable build-tree arena
//! - `namespace` - scoped publication and lookup of cross-references
//! - `infer` - deferred actions with prerequisites
//! - `reactor` - phase lockstep and the fixed-point scheduler
//! - `freeze` - conversion into the immutable effective model
//! - `stmts` - the built-in statement kinds

mod error;
mod freeze;
mod infer;
mod namespace;
mod phase;
mod reactor;
mod registry;
mod source;
mod stmts;
mod support;
mod tree;

#[cfg(test)]
mod test_utils;

#[cfg(test)]
mod reactor_tests;

pub use error::{BuildError, InferenceError, SourceError, UnresolvedError};
pub use infer::{ActionBuilder, PrereqHandle, Prerequisite, ResolvedSet, Scope};
pub use namespace::{NamespaceKind, NamespaceStore, NamespaceValue, ScopeRule};
pub use phase::ModelPhase;
pub use reactor::{Reactor, ReactorCtx};
pub use registry::{LanguageProfile, StatementRegistry};
pub use source::SourceSet;
pub use support::{
    ArgKind, CopyPolicy, EffectiveParts, StatementSupport, SubstatementValidator,
    SubstatementValidatorBuilder,
};
pub use tree::{BuildTree, CtxId, SourceIdx, StmtOrigin};

use yantra_model::SchemaContext;

/// Compile a source set with the default statement registry.
pub fn compile(sources: &SourceSet) -> Result<SchemaContext, BuildError> {
    Reactor::new().build(sources)
}
