//! Freezing the converged build tree into effective statements.
//!
//! Two passes. The first walks each source top-down and precomputes the
//! layout every node will carry: its schema path and its flag bitset,
//! both of which depend on ancestors. The second freezes bottom-up with
//! memoization, so a grouping definition referenced by many copies is
//! frozen once and every copy's `original` link shares it.

use std::sync::Arc;

use yantra_core::{QName, SchemaPath};
use yantra_model::{EffectiveStatement, StmtFlags};

use crate::support::EffectiveParts;
use crate::tree::{BuildTree, CtxId};

/// Precomputed per-context schema paths and flags, indexed by arena slot.
pub(crate) struct FreezeLayout {
    paths: Vec<SchemaPath>,
    flags: Vec<StmtFlags>,
}

impl FreezeLayout {
    /// `namespaces` maps source index to the namespace string qualifying
    /// that source's path segments. Copies are charged to the source they
    /// were copied *into*, so grouping expansion qualifies nodes with the
    /// using module's namespace.
    pub(crate) fn compute(tree: &BuildTree, namespaces: &[String]) -> Self {
        let mut paths = vec![SchemaPath::root(); tree.len()];
        let mut flags = vec![StmtFlags::new(); tree.len()];

        for root in tree.roots() {
            let mut stack = vec![*root];
            while let Some(ctx) = stack.pop() {
                let (parent_path, parent_config) = match tree.parent(ctx) {
                    Some(parent) => (
                        paths[parent.index()].clone(),
                        flags[parent.index()].is_config(),
                    ),
                    None => (SchemaPath::root(), true),
                };

                flags[ctx.index()] = flags_of(tree, ctx, parent_config);
                paths[ctx.index()] = if tree.support(ctx).is_schema_node() {
                    let segment = match tree.argument_str(ctx) {
                        Some(name) => name,
                        // Argument-less schema slots (`input`, `output`)
                        // are addressed by keyword.
                        None => tree.name(ctx).keyword(),
                    };
                    let namespace = &namespaces[tree.source_of(ctx)];
                    parent_path.child(QName::new(namespace, segment))
                } else {
                    parent_path
                };

                for child in tree.children(ctx) {
                    stack.push(*child);
                }
            }
        }
        Self { paths, flags }
    }

    pub(crate) fn path(&self, ctx: CtxId) -> &SchemaPath {
        &self.paths[ctx.index()]
    }

    pub(crate) fn flags(&self, ctx: CtxId) -> StmtFlags {
        self.flags[ctx.index()]
    }
}

fn flags_of(tree: &BuildTree, ctx: CtxId, parent_config: bool) -> StmtFlags {
    let mut flags = StmtFlags::new();

    if let Some(status) = tree
        .find_child(ctx, "status")
        .and_then(|c| tree.argument(c).as_status())
    {
        flags = flags.with_status(status);
    }
    flags = match tree
        .find_child(ctx, "config")
        .and_then(|c| tree.argument(c).as_bool())
    {
        Some(declared) => flags.with_explicit_config(declared),
        None => flags.with_inherited_config(parent_config),
    };
    if tree.find_child(ctx, "presence").is_some() {
        flags = flags.with_presence(true);
    }
    if tree
        .find_child(ctx, "mandatory")
        .and_then(|c| tree.argument(c).as_bool())
        == Some(true)
    {
        flags = flags.with_mandatory(true);
    }
    flags
}

/// Freeze `ctx` and everything beneath it, memoized in the tree. Copies
/// freeze their ultimate original first so the `original` link points at
/// a finished statement; originals are always declared contexts, so the
/// recursion cannot revisit a copy lineage.
pub(crate) fn freeze_ctx(
    tree: &mut BuildTree,
    ctx: CtxId,
    layout: &FreezeLayout,
) -> Arc<EffectiveStatement> {
    if let Some(frozen) = tree.effective_of(ctx) {
        return Arc::clone(frozen);
    }

    let original = tree
        .original_of(ctx)
        .map(|original| freeze_ctx(tree, original, layout));
    let substatements = tree
        .children_vec(ctx)
        .into_iter()
        .map(|child| freeze_ctx(tree, child, layout))
        .collect();

    let parts = EffectiveParts {
        name: tree.name(ctx).clone(),
        argument: tree.argument(ctx).clone(),
        substatements,
        flags: layout.flags(ctx),
        path: layout.path(ctx).clone(),
        original,
    };
    let support = tree.support(ctx);
    let effective = support.build_effective(tree, ctx, parts);
    tree.set_effective(ctx, Arc::clone(&effective));
    effective
}
