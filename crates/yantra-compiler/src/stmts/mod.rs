//! Built-in statement kinds.
//!
//! Everything keyword-specific lives in this module tree; the engine
//! never matches on keywords. `defaults` assembles the full policy set
//! for one language profile.

use std::sync::Arc;

use crate::registry::LanguageProfile;
use crate::support::{ArgKind, StatementSupport, SubstatementValidator};
use crate::tree::{BuildTree, CtxId};

mod grouping;
mod meta;
mod module;
mod rpc;
mod schema;
mod submodule;
mod uses;

pub(crate) use meta::SimpleSupport;

pub(crate) fn defaults(profile: LanguageProfile) -> Vec<Arc<dyn StatementSupport>> {
    let mut supports: Vec<Arc<dyn StatementSupport>> = vec![
        Arc::new(module::ModuleSupport::new()),
        Arc::new(module::ImportSupport::new(profile)),
        Arc::new(module::IncludeSupport::new(profile)),
        Arc::new(submodule::SubmoduleSupport::new()),
        Arc::new(grouping::DefinitionSupport::grouping()),
        Arc::new(grouping::DefinitionSupport::typedef()),
        Arc::new(uses::UsesSupport::new()),
        Arc::new(rpc::RpcSupport::new()),
        Arc::new(schema::SchemaNodeSupport::container()),
        Arc::new(schema::SchemaNodeSupport::leaf()),
        Arc::new(schema::SchemaNodeSupport::leaf_list()),
        Arc::new(schema::SchemaNodeSupport::list()),
        Arc::new(schema::SchemaNodeSupport::input()),
        Arc::new(schema::SchemaNodeSupport::output()),
        Arc::new(
            SimpleSupport::new("refine", "target-node", ArgKind::Str).with_validator(
                SubstatementValidator::builder()
                    .optional("description")
                    .optional("reference")
                    .optional("config")
                    .optional("mandatory")
                    .optional("presence")
                    .build(),
            ),
        ),
    ];
    supports.extend(meta::defaults());
    supports
}

/// Identifier argument of a statement whose kind types its argument as an
/// identifier; guaranteed present once loading succeeded.
fn declared_name(tree: &BuildTree, ctx: CtxId) -> String {
    match tree.argument_str(ctx) {
        Some(name) => name.to_owned(),
        None => unreachable!("identifier argument was typed at load"),
    }
}
