//! `uses`: grouping expansion and refinement.

use yantra_core::{Argument, SourceRef, StatementName};

use crate::error::{BuildError, InferenceError, SourceError};
use crate::infer::{ActionBuilder, Scope};
use crate::namespace::{NamespaceKind, NamespaceValue};
use crate::phase::ModelPhase;
use crate::reactor::ReactorCtx;
use crate::support::{ArgKind, StatementSupport, SubstatementValidator};
use crate::tree::{BuildTree, CtxId};

pub(crate) struct UsesSupport {
    name: StatementName,
    validator: SubstatementValidator,
}

impl UsesSupport {
    pub(crate) fn new() -> Self {
        Self {
            name: StatementName::core("uses").with_argument("name"),
            validator: SubstatementValidator::builder()
                .optional("description")
                .optional("reference")
                .optional("status")
                .any("refine")
                .any("if-feature")
                .build(),
        }
    }
}

impl StatementSupport for UsesSupport {
    fn name(&self) -> &StatementName {
        &self.name
    }

    fn parse_argument(&self, raw: Option<&str>, at: &SourceRef) -> Result<Argument, SourceError> {
        ArgKind::NodeName.parse(&self.name, raw, at)
    }

    fn validator(&self) -> Option<&SubstatementValidator> {
        Some(&self.validator)
    }

    /// Defer expansion until the target grouping is fully declared. The
    /// enclosing statement is held open so the copies land before its
    /// declaration phase is sealed.
    fn on_full_declaration(&self, rx: &mut ReactorCtx<'_>, ctx: CtxId) -> Result<(), BuildError> {
        let Some(parent) = rx.tree().parent(ctx) else {
            return Ok(());
        };
        // The prefix rides in the qualified name's namespace slot until it
        // is resolved against the declaring root's bindings.
        let (prefix, local) = match rx.tree().argument(ctx) {
            Argument::QName(q) => (Some(q.namespace().to_owned()), q.local_name().to_owned()),
            other => (None, other.as_str().unwrap_or_default().to_owned()),
        };
        let at = rx.tree().source_ref(ctx).clone();

        // A copied uses re-expands at its new site, but the grouping name
        // still means what it meant where the uses was declared.
        let lookup_base = rx.tree().original_of(ctx).unwrap_or(ctx);
        let lookup_parent = rx.tree().parent(lookup_base).unwrap_or(parent);

        // A grouping that contains this uses would expand forever; all
        // groupings are published by now, so the cycle is visible here.
        if prefix.is_none() {
            let candidate = rx
                .tree()
                .lookup(lookup_parent, NamespaceKind::Grouping, &local)
                .and_then(NamespaceValue::as_context);
            if let Some(candidate) = candidate {
                let mut ancestor = Some(lookup_base);
                while let Some(cur) = ancestor {
                    if cur == candidate {
                        return Err(SourceError::new(
                            format!("uses `{}` expands a grouping that contains it", local),
                            &at,
                        )
                        .into());
                    }
                    ancestor = rx.tree().parent(cur);
                }
            }
        }

        let mut builder = ActionBuilder::new(ModelPhase::FullDeclaration, &at);
        builder.mutates(parent, ModelPhase::FullDeclaration);

        let fail_at = at.clone();
        let fail_target = match &prefix {
            Some(prefix) => format!("{}:{}", prefix, local),
            None => local.clone(),
        };
        builder.or_fail(move |_| {
            InferenceError::new(
                format!("grouping `{}` was not found", fail_target),
                &fail_at,
            )
        });

        match prefix {
            None => {
                let handle = builder.requires_item(
                    Scope::Ctx(lookup_parent),
                    NamespaceKind::Grouping,
                    &local,
                    ModelPhase::FullDeclaration,
                );
                builder.apply(move |rx, resolved| expand_uses(rx, ctx, resolved.ctx(handle)));
            }
            Some(prefix) => {
                // The prefix resolves to another module's root; the
                // grouping must sit in that root's own scope and the whole
                // module must be declared before it is copied from.
                let root = rx.tree().root_of(lookup_base);
                let handle = builder.requires_item(
                    Scope::Ctx(root),
                    NamespaceKind::Prefix,
                    &prefix,
                    ModelPhase::FullDeclaration,
                );
                builder.apply(move |rx, resolved| {
                    let imported = resolved.ctx(handle);
                    let grouping = rx
                        .tree()
                        .store(imported)
                        .get(NamespaceKind::Grouping, &local)
                        .and_then(NamespaceValue::as_context);
                    match grouping {
                        Some(grouping) => expand_uses(rx, ctx, grouping),
                        None => Err(SourceError::new(
                            format!(
                                "grouping `{}` was not found in module `{}`",
                                local,
                                rx.tree().argument_str(imported).unwrap_or_default()
                            ),
                            &at,
                        )
                        .into()),
                    }
                });
            }
        }
        rx.register(ctx, builder);
        Ok(())
    }
}

/// Copy the grouping's body under the uses' parent, replay the phase
/// machinery over the copies, then apply refinements.
fn expand_uses(rx: &mut ReactorCtx<'_>, uses: CtxId, grouping: CtxId) -> Result<(), BuildError> {
    let Some(parent) = rx.tree().parent(uses) else {
        return Ok(());
    };
    // The lookup may land on a copy (a grouping folded in from a
    // submodule); the body is taken from the ultimate definition so the
    // skip below only drops expansion products.
    let grouping = rx.tree().original_of(grouping).unwrap_or(grouping);

    let mut copies = Vec::new();
    for child in rx.tree().children_vec(grouping) {
        // Definition metadata describes the grouping, not its expansions;
        // expansion products inside the grouping regenerate via their own
        // copied uses statements.
        if matches!(
            rx.tree().name(child).keyword(),
            "description" | "reference" | "status"
        ) || rx.tree().original_of(child).is_some()
        {
            continue;
        }
        copies.push(rx.tree_mut().copy_subtree(child, parent)?);
    }
    for copy in &copies {
        rx.process_copied_subtree(*copy)?;
    }

    for child in rx.tree().children_vec(uses) {
        if rx.tree().name(child).keyword() == "refine" {
            apply_refine(rx, parent, child)?;
        }
    }
    Ok(())
}

fn find_named_child(tree: &BuildTree, parent: CtxId, segment: &str) -> Option<CtxId> {
    tree.children(parent).iter().copied().find(|c| {
        match tree.argument_str(*c) {
            Some(name) => name == segment,
            None => tree.name(*c).keyword() == segment,
        }
    })
}

/// Resolve a slash-separated refine path among the expanded nodes and
/// overwrite the targeted properties. Only nodes this expansion copied in
/// may be refined; a declared sibling caught by the path is an error.
fn apply_refine(rx: &mut ReactorCtx<'_>, scope: CtxId, refine: CtxId) -> Result<(), BuildError> {
    let path = rx.tree().argument_str(refine).unwrap_or_default().to_owned();
    let at = rx.tree().source_ref(refine).clone();

    let mut target = scope;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        target = match find_named_child(rx.tree(), target, segment) {
            Some(found) => found,
            None => {
                return Err(SourceError::new(
                    format!("refine target `{}` does not exist", path),
                    &at,
                )
                .into());
            }
        };
    }
    if target == scope {
        return Err(SourceError::new("refine requires a non-empty path", &at).into());
    }
    if rx.tree().original_of(target).is_none() {
        return Err(SourceError::new(
            format!("refine target `{}` was not introduced by this expansion", path),
            &at,
        )
        .with_related(rx.tree().source_ref(target))
        .into());
    }

    for property in rx.tree().children_vec(refine) {
        let keyword = rx.tree().name(property).keyword().to_owned();
        if let Some(existing) = rx.tree().find_child(target, &keyword) {
            rx.tree_mut().detach_child(target, existing);
        }
        rx.tree_mut().copy_subtree(property, target)?;
    }
    Ok(())
}
