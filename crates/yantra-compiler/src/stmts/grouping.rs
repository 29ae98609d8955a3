//! Reusable definitions: `grouping` and `typedef`.
//!
//! Both publish into the *enclosing* statement's store, making the
//! definition visible to the whole enclosing scope and everything below
//! it. Redefining a name already visible from an outer scope is an error,
//! not a shadowing; the check here only sees outer definitions published
//! earlier, the reactor re-checks every entry once declarations converge.

use yantra_core::{Argument, SourceRef, StatementName};

use crate::error::{BuildError, SourceError};
use crate::namespace::{NamespaceKind, NamespaceValue};
use crate::reactor::ReactorCtx;
use crate::support::{ArgKind, StatementSupport, SubstatementValidator};
use crate::tree::CtxId;

use super::declared_name;

pub(crate) struct DefinitionSupport {
    name: StatementName,
    kind: NamespaceKind,
    validator: SubstatementValidator,
}

impl DefinitionSupport {
    pub(crate) fn grouping() -> Self {
        Self {
            name: StatementName::core("grouping").with_argument("name"),
            kind: NamespaceKind::Grouping,
            validator: SubstatementValidator::builder()
                .optional("description")
                .optional("reference")
                .optional("status")
                .any("grouping")
                .any("typedef")
                .any("container")
                .any("leaf")
                .any("leaf-list")
                .any("list")
                .any("uses")
                .build(),
        }
    }

    pub(crate) fn typedef() -> Self {
        Self {
            name: StatementName::core("typedef").with_argument("name"),
            kind: NamespaceKind::Typedef,
            validator: SubstatementValidator::builder()
                .required("type")
                .optional("units")
                .optional("description")
                .optional("reference")
                .optional("status")
                .build(),
        }
    }
}

fn outer_conflict(
    rx: &ReactorCtx<'_>,
    parent: CtxId,
    kind: NamespaceKind,
    name: &str,
    at: &SourceRef,
) -> Option<SourceError> {
    let outer = rx.tree().parent(parent)?;
    let (_, existing) = rx.tree().lookup_entry(outer, kind, name)?;
    Some(
        SourceError::new(
            format!("{} `{}` is already visible from an enclosing scope", kind, name),
            at,
        )
        .with_related(existing),
    )
}

impl StatementSupport for DefinitionSupport {
    fn name(&self) -> &StatementName {
        &self.name
    }

    fn parse_argument(&self, raw: Option<&str>, at: &SourceRef) -> Result<Argument, SourceError> {
        ArgKind::Identifier.parse(&self.name, raw, at)
    }

    fn validator(&self) -> Option<&SubstatementValidator> {
        Some(&self.validator)
    }

    fn on_pre_linkage(&self, rx: &mut ReactorCtx<'_>, ctx: CtxId) -> Result<(), BuildError> {
        let name = declared_name(rx.tree(), ctx);
        let at = rx.tree().source_ref(ctx).clone();
        let Some(parent) = rx.tree().parent(ctx) else {
            return Ok(());
        };

        // Outer definitions already published are caught immediately;
        // ones arriving later are left to the reactor's converged sweep.
        if let Some(err) = outer_conflict(rx, parent, self.kind, &name, &at) {
            return Err(err.into());
        }
        rx.tree_mut()
            .put_ns_at(parent, self.kind, &name, NamespaceValue::Context(ctx), &at)?;
        Ok(())
    }
}
