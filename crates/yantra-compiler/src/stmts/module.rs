//! `module`, `import`, and `include`.

use yantra_core::{Argument, SourceRef, StatementName};

use crate::error::{BuildError, InferenceError, SourceError};
use crate::infer::{ActionBuilder, Scope};
use crate::namespace::{NamespaceKind, NamespaceValue};
use crate::phase::ModelPhase;
use crate::reactor::ReactorCtx;
use crate::registry::LanguageProfile;
use crate::support::{ArgKind, CopyPolicy, StatementSupport, SubstatementValidator};
use crate::tree::CtxId;

use super::declared_name;

pub(crate) struct ModuleSupport {
    name: StatementName,
    validator: SubstatementValidator,
}

impl ModuleSupport {
    pub(crate) fn new() -> Self {
        Self {
            name: StatementName::core("module").with_argument("name"),
            validator: SubstatementValidator::builder()
                .required("namespace")
                .required("prefix")
                .optional("yang-version")
                .optional("organization")
                .optional("contact")
                .optional("description")
                .optional("reference")
                .any("import")
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

impl StatementSupport for ModuleSupport {
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

    /// Make the module discoverable by name before anything links.
    fn on_pre_linkage(&self, rx: &mut ReactorCtx<'_>, ctx: CtxId) -> Result<(), BuildError> {
        let name = declared_name(rx.tree(), ctx);
        let at = rx.tree().source_ref(ctx).clone();
        rx.tree_mut()
            .put_global(NamespaceKind::Module, &name, NamespaceValue::Context(ctx), &at)?;
        Ok(())
    }

    /// Bind the module's own prefix to itself. A missing `prefix` child is
    /// left for the declaration validator to flag.
    fn on_linkage(&self, rx: &mut ReactorCtx<'_>, ctx: CtxId) -> Result<(), BuildError> {
        let Some(prefix_ctx) = rx.tree().find_child(ctx, "prefix") else {
            return Ok(());
        };
        let Some(prefix) = rx.tree().argument_str(prefix_ctx).map(str::to_owned) else {
            return Ok(());
        };
        let at = rx.tree().source_ref(prefix_ctx).clone();
        rx.tree_mut()
            .put_ns_at(ctx, NamespaceKind::Prefix, &prefix, NamespaceValue::Context(ctx), &at)?;
        Ok(())
    }
}

pub(crate) struct ImportSupport {
    name: StatementName,
    validator: SubstatementValidator,
}

impl ImportSupport {
    pub(crate) fn new(profile: LanguageProfile) -> Self {
        let mut rules = SubstatementValidator::builder()
            .required("prefix")
            .optional("revision-date");
        if profile == LanguageProfile::Current {
            rules = rules.optional("description").optional("reference");
        }
        Self {
            name: StatementName::core("import").with_argument("module"),
            validator: rules.build(),
        }
    }
}

impl StatementSupport for ImportSupport {
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

    /// Wait for the imported module to finish linkage, then bind the
    /// declared prefix on the importing root. The root's own linkage is
    /// held open until the binding lands.
    fn on_linkage(&self, rx: &mut ReactorCtx<'_>, ctx: CtxId) -> Result<(), BuildError> {
        let Some(root) = rx.tree().parent(ctx) else {
            return Ok(());
        };
        let target = declared_name(rx.tree(), ctx);
        let at = rx.tree().source_ref(ctx).clone();
        let prefix = rx
            .tree()
            .find_child(ctx, "prefix")
            .and_then(|p| rx.tree().argument_str(p).map(str::to_owned));

        let mut builder = ActionBuilder::new(ModelPhase::SourceLinkage, &at);
        let handle = builder.requires_item(
            Scope::Global,
            NamespaceKind::Module,
            &target,
            ModelPhase::SourceLinkage,
        );
        builder.mutates(root, ModelPhase::SourceLinkage);

        let fail_at = at.clone();
        let fail_target = target.clone();
        builder.or_fail(move |_| {
            InferenceError::new(
                format!("imported module `{}` was not found", fail_target),
                &fail_at,
            )
        });
        builder.apply(move |rx, resolved| {
            let imported = resolved.ctx(handle);
            if let Some(prefix) = prefix {
                rx.tree_mut().put_ns_at(
                    root,
                    NamespaceKind::Prefix,
                    &prefix,
                    NamespaceValue::Context(imported),
                    &at,
                )?;
            }
            Ok(())
        });
        rx.register(ctx, builder);
        Ok(())
    }
}

pub(crate) struct IncludeSupport {
    name: StatementName,
    validator: SubstatementValidator,
}

impl IncludeSupport {
    pub(crate) fn new(profile: LanguageProfile) -> Self {
        let mut rules = SubstatementValidator::builder().optional("revision-date");
        if profile == LanguageProfile::Current {
            rules = rules.optional("description").optional("reference");
        }
        Self {
            name: StatementName::core("include").with_argument("submodule"),
            validator: rules.build(),
        }
    }
}

impl StatementSupport for IncludeSupport {
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

    /// Wait for the named submodule, check it belongs to the including
    /// root, record the inclusion, and fold the submodule's body into the
    /// root so its definitions and schema nodes live in the module's
    /// scope.
    fn on_linkage(&self, rx: &mut ReactorCtx<'_>, ctx: CtxId) -> Result<(), BuildError> {
        let Some(root) = rx.tree().parent(ctx) else {
            return Ok(());
        };
        let target = declared_name(rx.tree(), ctx);
        let at = rx.tree().source_ref(ctx).clone();

        let mut builder = ActionBuilder::new(ModelPhase::SourceLinkage, &at);
        let handle = builder.requires_item(
            Scope::Global,
            NamespaceKind::Submodule,
            &target,
            ModelPhase::SourceLinkage,
        );
        builder.mutates(root, ModelPhase::SourceLinkage);

        let fail_at = at.clone();
        let fail_target = target.clone();
        builder.or_fail(move |_| {
            InferenceError::new(
                format!("included submodule `{}` was not found", fail_target),
                &fail_at,
            )
        });
        builder.apply(move |rx, resolved| {
            let sub_root = resolved.ctx(handle);
            // A module includes its own submodules; a submodule includes
            // siblings owned by the same module.
            let root_name = rx.tree().argument_str(root).unwrap_or_default().to_owned();
            let including = if rx.tree().name(root).keyword() == "module" {
                root_name
            } else {
                rx.tree()
                    .global_ns()
                    .get(NamespaceKind::BelongsTo, &root_name)
                    .and_then(NamespaceValue::as_text)
                    .unwrap_or_default()
                    .to_owned()
            };
            let declared_parent = rx
                .tree()
                .global_ns()
                .get(NamespaceKind::BelongsTo, &target)
                .and_then(NamespaceValue::as_text)
                .unwrap_or_default()
                .to_owned();
            if declared_parent != including {
                return Err(SourceError::new(
                    format!(
                        "submodule `{}` belongs to module `{}`, not `{}`",
                        target, declared_parent, including
                    ),
                    &at,
                )
                .with_related(rx.tree().source_ref(sub_root))
                .into());
            }
            rx.tree_mut().put_ns_at(
                root,
                NamespaceKind::IncludedSubmodule,
                &target,
                NamespaceValue::Context(sub_root),
                &at,
            )?;

            // Linkage plumbing and metadata stay with the submodule; its
            // definitions and schema nodes become part of the module. The
            // copies republish into the module's scope, so a module-level
            // `uses` resolves groupings its submodules declare. Features
            // and identities are global already and are not re-folded.
            for child in rx.tree().children_vec(sub_root) {
                if !matches!(
                    rx.tree().name(child).keyword(),
                    "grouping" | "typedef" | "container" | "leaf" | "leaf-list" | "list"
                        | "rpc" | "uses"
                ) {
                    continue;
                }
                let copy = rx.tree_mut().copy_subtree(child, root)?;
                rx.process_copied_subtree(copy)?;
            }
            Ok(())
        });
        rx.register(ctx, builder);
        Ok(())
    }
}
