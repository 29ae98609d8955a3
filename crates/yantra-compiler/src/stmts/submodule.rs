//! `submodule`: a source fragment folded into the module it belongs to.

use yantra_core::{Argument, SourceRef, StatementName};

use crate::error::{BuildError, SourceError};
use crate::namespace::{NamespaceKind, NamespaceValue};
use crate::reactor::ReactorCtx;
use crate::support::{ArgKind, CopyPolicy, StatementSupport, SubstatementValidator};
use crate::tree::CtxId;

use super::declared_name;

pub(crate) struct SubmoduleSupport {
    name: StatementName,
    validator: SubstatementValidator,
}

impl SubmoduleSupport {
    pub(crate) fn new() -> Self {
        Self {
            name: StatementName::core("submodule").with_argument("name"),
            validator: SubstatementValidator::builder()
                .required("belongs-to")
                .optional("yang-version")
                .optional("organization")
                .optional("contact")
                .optional("description")
                .optional("reference")
                .any("include")
                .any("revision")
                .any("feature")
                .any("identity")
                .any("grouping")
                .any("typedef")
                .any("container")
                .any("leaf")
                .any("leaf-list")
                .any("list")
                .any("rpc")
                .any("uses")
                .build(),
        }
    }
}

impl StatementSupport for SubmoduleSupport {
    fn name(&self) -> &StatementName {
        &self.name
    }

    fn parse_argument(&self, raw: Option<&str>, at: &SourceRef) -> Result<Argument, SourceError> {
        ArgKind::Identifier.parse(&self.name, raw, at)
    }

    fn validator(&self) -> Option<&SubstatementValidator> {
        Some(&self.validator)
    }

    fn copy_policy(&self) -> CopyPolicy {
        CopyPolicy::RejectCopy
    }

    /// Publish the submodule's name and its declared owner. Includes in
    /// other sources resolve against both entries during linkage.
    fn on_pre_linkage(&self, rx: &mut ReactorCtx<'_>, ctx: CtxId) -> Result<(), BuildError> {
        let name = declared_name(rx.tree(), ctx);
        let at = rx.tree().source_ref(ctx).clone();
        rx.tree_mut().put_global(
            NamespaceKind::Submodule,
            &name,
            NamespaceValue::Context(ctx),
            &at,
        )?;

        // A missing or argument-less `belongs-to` is flagged later by the
        // declaration validator.
        let owner = rx
            .tree()
            .find_child(ctx, "belongs-to")
            .and_then(|b| rx.tree().argument_str(b).map(str::to_owned));
        if let Some(owner) = owner {
            rx.tree_mut().put_global(
                NamespaceKind::BelongsTo,
                &name,
                NamespaceValue::Text(owner.into()),
                &at,
            )?;
        }
        Ok(())
    }
}
