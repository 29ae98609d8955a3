//! `rpc`: an operation node with implicit parameter slots.

use yantra_core::{Argument, SourceRef, StatementName};

use crate::error::{BuildError, SourceError};
use crate::reactor::ReactorCtx;
use crate::support::{ArgKind, StatementSupport, SubstatementValidator};
use crate::tree::CtxId;

use super::schema::publish_schema_slot;

pub(crate) struct RpcSupport {
    name: StatementName,
    validator: SubstatementValidator,
}

impl RpcSupport {
    pub(crate) fn new() -> Self {
        Self {
            name: StatementName::core("rpc").with_argument("name"),
            validator: SubstatementValidator::builder()
                .optional("description")
                .optional("reference")
                .optional("status")
                .optional("input")
                .optional("output")
                .any("if-feature")
                .any("grouping")
                .any("typedef")
                .build(),
        }
    }
}

impl StatementSupport for RpcSupport {
    fn name(&self) -> &StatementName {
        &self.name
    }

    fn parse_argument(&self, raw: Option<&str>, at: &SourceRef) -> Result<Argument, SourceError> {
        ArgKind::Identifier.parse(&self.name, raw, at)
    }

    fn validator(&self) -> Option<&SubstatementValidator> {
        Some(&self.validator)
    }

    fn is_schema_node(&self) -> bool {
        true
    }

    fn on_pre_linkage(&self, rx: &mut ReactorCtx<'_>, ctx: CtxId) -> Result<(), BuildError> {
        publish_schema_slot(rx, ctx)
    }

    /// Every rpc carries an `input` and an `output` slot in the effective
    /// model, whether or not the source declared them.
    fn on_full_declaration(&self, rx: &mut ReactorCtx<'_>, ctx: CtxId) -> Result<(), BuildError> {
        for slot in ["input", "output"] {
            if rx.tree().find_child(ctx, slot).is_none() {
                rx.append_implicit_child(ctx, slot, None)?;
            }
        }
        Ok(())
    }
}
