//! Data-bearing schema nodes: containers, leaves, lists, and the rpc
//! parameter slots.

use yantra_core::{Argument, SourceRef, StatementName};

use crate::error::{BuildError, SourceError};
use crate::namespace::{NamespaceKind, NamespaceValue};
use crate::reactor::ReactorCtx;
use crate::support::{
    ArgKind, StatementSupport, SubstatementValidator, SubstatementValidatorBuilder,
};
use crate::tree::CtxId;

fn data_node_rules() -> SubstatementValidatorBuilder {
    SubstatementValidator::builder()
        .optional("description")
        .optional("reference")
        .optional("status")
        .optional("config")
        .any("if-feature")
}

pub(crate) struct SchemaNodeSupport {
    name: StatementName,
    arg: ArgKind,
    validator: SubstatementValidator,
}

impl SchemaNodeSupport {
    pub(crate) fn container() -> Self {
        Self {
            name: StatementName::core("container").with_argument("name"),
            arg: ArgKind::Identifier,
            validator: data_node_rules()
                .optional("presence")
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

    pub(crate) fn leaf() -> Self {
        Self {
            name: StatementName::core("leaf").with_argument("name"),
            arg: ArgKind::Identifier,
            validator: data_node_rules()
                .required("type")
                .optional("units")
                .optional("mandatory")
                .build(),
        }
    }

    pub(crate) fn leaf_list() -> Self {
        Self {
            name: StatementName::core("leaf-list").with_argument("name"),
            arg: ArgKind::Identifier,
            validator: data_node_rules()
                .required("type")
                .optional("units")
                .optional("ordered-by")
                .optional("min-elements")
                .optional("max-elements")
                .build(),
        }
    }

    pub(crate) fn list() -> Self {
        Self {
            name: StatementName::core("list").with_argument("name"),
            arg: ArgKind::Identifier,
            validator: data_node_rules()
                .optional("key")
                .optional("ordered-by")
                .optional("min-elements")
                .optional("max-elements")
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

    /// Argument-less parameter slot of an rpc.
    fn parameter_slot(keyword: &str) -> Self {
        Self {
            name: StatementName::core(keyword),
            arg: ArgKind::None,
            validator: SubstatementValidator::builder()
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

    pub(crate) fn input() -> Self {
        Self::parameter_slot("input")
    }

    pub(crate) fn output() -> Self {
        Self::parameter_slot("output")
    }
}

impl StatementSupport for SchemaNodeSupport {
    fn name(&self) -> &StatementName {
        &self.name
    }

    fn parse_argument(&self, raw: Option<&str>, at: &SourceRef) -> Result<Argument, SourceError> {
        self.arg.parse(&self.name, raw, at)
    }

    fn validator(&self) -> Option<&SubstatementValidator> {
        Some(&self.validator)
    }

    fn is_schema_node(&self) -> bool {
        true
    }

    /// Claim this node's slot in the parent's schema-child namespace.
    /// Sibling name collisions, declared or expanded, surface here.
    fn on_pre_linkage(&self, rx: &mut ReactorCtx<'_>, ctx: CtxId) -> Result<(), BuildError> {
        publish_schema_slot(rx, ctx)
    }
}

pub(crate) fn publish_schema_slot(rx: &mut ReactorCtx<'_>, ctx: CtxId) -> Result<(), BuildError> {
    let Some(parent) = rx.tree().parent(ctx) else {
        return Ok(());
    };
    let key = match rx.tree().argument_str(ctx) {
        Some(name) => name.to_owned(),
        None => rx.tree().name(ctx).keyword().to_owned(),
    };
    let at = rx.tree().source_ref(ctx).clone();
    rx.tree_mut().put_ns_at(
        parent,
        NamespaceKind::SchemaTree,
        &key,
        NamespaceValue::Context(ctx),
        &at,
    )?;
    Ok(())
}
