//! The build scheduler: phase lockstep and the fixed-point action loop.
//!
//! A build walks four phases. The first three run a hook sweep over every
//! source followed by a fixed-point loop that fires whatever registered
//! actions have become resolvable and re-attempts per-context phase
//! completion, until all roots complete the phase or no further progress
//! is possible. The last phase freezes the converged tree into the
//! immutable schema context.

use std::mem;

use yantra_model::{Module, SchemaContext};

use crate::error::{BuildError, InferenceError, SourceError, UnresolvedError};
use crate::freeze::{self, FreezeLayout};
use crate::infer::{ActionBuilder, ModelAction};
use crate::namespace::{NamespaceKind, NamespaceValue, ScopeRule};
use crate::phase::ModelPhase;
use crate::registry::{LanguageProfile, StatementRegistry};
use crate::source::SourceSet;
use crate::tree::{BuildTree, CtxId, SourceIdx};
use yantra_core::RawStatement;

/// Compiles source sets into schema contexts. Reusable across builds;
/// each build gets a fresh tree.
pub struct Reactor {
    registry: StatementRegistry,
}

impl Reactor {
    pub fn new() -> Self {
        Self {
            registry: StatementRegistry::with_defaults(),
        }
    }

    /// A reactor over a caller-assembled registry, for grammars extended
    /// with additional statement kinds.
    pub fn with_registry(registry: StatementRegistry) -> Self {
        Self { registry }
    }

    pub fn build(&self, sources: &SourceSet) -> Result<SchemaContext, BuildError> {
        let mut rx = ReactorCtx {
            tree: BuildTree::new(),
            registry: &self.registry,
            profiles: Vec::new(),
            stage: ModelPhase::SourcePreLinkage,
            queued: Vec::new(),
        };

        // Main sources load first; the schema context folds modules in
        // root order, so caller ordering is preserved.
        for (raw, _is_main) in sources.pruned_sources() {
            rx.load_source(&raw)?;
        }

        for stage in [
            ModelPhase::SourcePreLinkage,
            ModelPhase::SourceLinkage,
            ModelPhase::FullDeclaration,
        ] {
            rx.stage = stage;
            for root in rx.tree.roots().to_vec() {
                rx.sweep(root)?;
            }
            rx.run_phase_actions()?;
        }
        rx.check_shadowing()?;

        rx.stage = ModelPhase::EffectiveModel;
        rx.run_phase_actions()?;
        rx.freeze_into_context()
    }
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new()
    }
}

/// The mutable build state handed to statement policies: the tree under
/// construction plus the action queue. Policies publish namespace entries,
/// synthesize implicit statements, and register deferred actions through
/// this.
pub struct ReactorCtx<'a> {
    pub(crate) tree: BuildTree,
    registry: &'a StatementRegistry,
    /// Language profile per source, decided before any policy runs.
    profiles: Vec<LanguageProfile>,
    stage: ModelPhase,
    queued: Vec<ModelAction>,
}

impl ReactorCtx<'_> {
    pub fn tree(&self) -> &BuildTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut BuildTree {
        &mut self.tree
    }

    /// The phase currently being driven.
    pub fn stage(&self) -> ModelPhase {
        self.stage
    }

    pub fn profile_of(&self, ctx: CtxId) -> LanguageProfile {
        self.profiles[self.tree.source_of(ctx)]
    }

    /// Register a deferred action on behalf of `from`. Declared mutations
    /// are charged to their contexts immediately so the affected phase
    /// cannot complete under the action.
    pub fn register(&mut self, from: CtxId, builder: ActionBuilder) {
        let action = builder.into_action(self.tree.source_of(from));
        for (ctx, phase) in &action.mutates {
            self.tree.add_mutation(*ctx, *phase);
        }
        self.queued.push(action);
    }

    /// Synthesize a statement the source never declared, under `parent`.
    pub fn append_implicit_child(
        &mut self,
        parent: CtxId,
        keyword: &str,
        argument: Option<&str>,
    ) -> Result<CtxId, BuildError> {
        let at = self.tree.source_ref(parent).clone();
        let support = self
            .registry
            .resolve(self.profile_of(parent), keyword, &at)?;
        let argument = support.parse_argument(argument, &at)?;
        Ok(self.tree.append_implicit_child(parent, support, argument, at))
    }

    /// Run the phase machinery over a freshly copied subtree: copies enter
    /// the tree mid-build, after the sweeps that would have visited them,
    /// so their hooks (and, past declaration, their validators) are
    /// replayed here up to the current stage.
    pub fn process_copied_subtree(&mut self, root: CtxId) -> Result<(), BuildError> {
        let mut stack = vec![root];
        while let Some(ctx) = stack.pop() {
            let support = self.tree.support(ctx);
            if self.stage >= ModelPhase::FullDeclaration {
                if let Some(validator) = support.validator() {
                    validator.validate(&self.tree, ctx)?;
                }
            }
            support.on_pre_linkage(self, ctx)?;
            if self.stage >= ModelPhase::SourceLinkage {
                support.on_linkage(self, ctx)?;
            }
            if self.stage >= ModelPhase::FullDeclaration {
                support.on_full_declaration(self, ctx)?;
            }
            for child in self.tree.children_vec(ctx).into_iter().rev() {
                stack.push(child);
            }
        }
        Ok(())
    }

    /// Materialize one source document into the tree.
    fn load_source(&mut self, raw: &RawStatement) -> Result<CtxId, BuildError> {
        if !matches!(raw.keyword(), "module" | "submodule") {
            return Err(SourceError::new(
                format!(
                    "source root must be `module` or `submodule`, found `{}`",
                    raw.keyword()
                ),
                raw.source_ref(),
            )
            .into());
        }
        let profile = LanguageProfile::of_source(raw)?;
        let source = self.profiles.len();
        self.profiles.push(profile);

        let root = self.load_statement(raw, None, profile, source)?;
        Ok(root)
    }

    fn load_statement(
        &mut self,
        raw: &RawStatement,
        parent: Option<CtxId>,
        profile: LanguageProfile,
        source: SourceIdx,
    ) -> Result<CtxId, BuildError> {
        let support = self
            .registry
            .resolve(profile, raw.keyword(), raw.source_ref())?;
        let argument = support.parse_argument(raw.argument(), raw.source_ref())?;
        let ctx = match parent {
            None => self
                .tree
                .new_root(support, argument, raw.source_ref().clone(), source),
            Some(parent) => self
                .tree
                .create_child(parent, support, argument, raw.source_ref().clone()),
        };
        for child in raw.children() {
            self.load_statement(child, Some(ctx), profile, source)?;
        }
        Ok(ctx)
    }

    /// Pre-order hook sweep for the current stage. Children are read after
    /// the hook runs so statements a hook synthesizes are visited too.
    fn sweep(&mut self, root: CtxId) -> Result<(), BuildError> {
        let mut stack = vec![root];
        while let Some(ctx) = stack.pop() {
            let support = self.tree.support(ctx);
            match self.stage {
                ModelPhase::SourcePreLinkage => support.on_pre_linkage(self, ctx)?,
                ModelPhase::SourceLinkage => support.on_linkage(self, ctx)?,
                ModelPhase::FullDeclaration => {
                    if let Some(validator) = support.validator() {
                        validator.validate(&self.tree, ctx)?;
                    }
                    support.on_full_declaration(self, ctx)?;
                }
                ModelPhase::EffectiveModel => {}
            }
            for child in self.tree.children_vec(ctx).into_iter().rev() {
                stack.push(child);
            }
        }
        Ok(())
    }

    /// Fixed-point loop for the current stage: fire every resolvable
    /// action, attempt completion of every root, repeat until the stage
    /// converges. A pass with no fired action and no completion while work
    /// remains means the remaining prerequisites can never be satisfied.
    fn run_phase_actions(&mut self) -> Result<(), BuildError> {
        let stage = self.stage;
        let mut pending: Vec<ModelAction> = Vec::new();

        loop {
            let (now, later): (Vec<_>, Vec<_>) = mem::take(&mut self.queued)
                .into_iter()
                .partition(|a| a.phase <= stage);
            self.queued = later;
            pending.extend(now);

            let mut progress = false;
            let mut still = Vec::new();
            for action in pending {
                match action.try_resolve(&self.tree) {
                    Some(resolved) => {
                        action.fire(self, &resolved)?;
                        progress = true;
                    }
                    None => still.push(action),
                }
            }
            pending = still;

            for root in self.tree.roots().to_vec() {
                if !self.tree.has_completed(root, stage) && self.tree.try_complete(root, stage) {
                    progress = true;
                }
            }

            let all_complete = self
                .tree
                .roots()
                .iter()
                .all(|root| self.tree.has_completed(*root, stage));
            let more_queued = self.queued.iter().any(|a| a.phase <= stage);
            if all_complete && pending.is_empty() && !more_queued {
                return Ok(());
            }
            if !progress && !more_queued {
                return Err(self.converge_failure(stage, pending));
            }
        }
    }

    /// Walk-up definitions must not redefine a name already visible from
    /// an enclosing scope. Document-order cases are caught eagerly as the
    /// inner definition publishes; this sweep runs once the declaration
    /// phase has converged, so definitions that arrived later, whether in
    /// document order or via grouping expansion, are covered too.
    fn check_shadowing(&self) -> Result<(), BuildError> {
        for idx in 0..self.tree.len() {
            let ctx = CtxId::from_raw(idx as u32);
            let Some(parent) = self.tree.parent(ctx) else {
                continue;
            };
            for (kind, key, value, at) in self.tree.store(ctx).entries() {
                if kind.scope_rule() != ScopeRule::WalkUp {
                    continue;
                }
                let Some((outer_value, outer_at)) = self.tree.lookup_entry(parent, kind, key)
                else {
                    continue;
                };
                // Expansion republishes the definitions it copies; a
                // definition seen next to its own copy is the same
                // definition, not a conflict.
                if let (Some(inner), Some(outer)) =
                    (value.as_context(), outer_value.as_context())
                {
                    let inner_def = self.tree.original_of(inner).unwrap_or(inner);
                    let outer_def = self.tree.original_of(outer).unwrap_or(outer);
                    if inner_def == outer_def {
                        continue;
                    }
                }
                return Err(SourceError::new(
                    format!("{} `{}` is already visible from an enclosing scope", kind, key),
                    at,
                )
                .with_related(outer_at)
                .into());
            }
        }
        Ok(())
    }

    fn converge_failure(&self, stage: ModelPhase, pending: Vec<ModelAction>) -> BuildError {
        let mut failures: Vec<InferenceError> =
            pending.into_iter().map(|a| a.fail(&self.tree)).collect();
        if failures.is_empty() {
            // No action is stuck, yet some root cannot complete: only
            // unbalanced mutations can cause this.
            for root in self.tree.roots() {
                if !self.tree.has_completed(*root, stage) {
                    failures.push(InferenceError::new(
                        format!(
                            "source `{}` did not converge",
                            self.tree.argument_str(*root).unwrap_or_default()
                        ),
                        self.tree.source_ref(*root),
                    ));
                }
            }
        }
        if failures.len() == 1 {
            BuildError::Inference(failures.remove(0))
        } else {
            BuildError::Unresolved(UnresolvedError::new(stage, failures))
        }
    }

    /// Freeze every source and assemble the schema context. Main-source
    /// modules land first, in caller order; submodule roots are folded
    /// into their including modules rather than listed.
    fn freeze_into_context(mut self) -> Result<SchemaContext, BuildError> {
        let namespaces = self.resolve_namespaces()?;
        let layout = FreezeLayout::compute(&self.tree, &namespaces);

        let roots = self.tree.roots().to_vec();
        let mut modules = Vec::new();
        for root in roots {
            let effective = freeze::freeze_ctx(&mut self.tree, root, &layout);
            if self.tree.name(root).keyword() != "module" {
                continue;
            }

            let name = effective.argument_str().unwrap_or_default().to_owned();
            let namespace = effective
                .find_substatement("namespace")
                .and_then(|ns| ns.argument_str())
                .unwrap_or_default()
                .to_owned();
            let revision = effective
                .substatements_of("revision")
                .filter_map(|r| r.argument_str())
                .max()
                .map(str::to_owned);
            let prefix = effective
                .find_substatement("prefix")
                .and_then(|p| p.argument_str())
                .map(str::to_owned);

            let mut module = Module::new(&name, &namespace, effective.clone())
                .with_revision(revision.as_deref())
                .with_prefix(prefix.as_deref());
            for import in effective.substatements_of("import") {
                let Some(target) = import.argument_str() else {
                    continue;
                };
                if let Some(prefix) = import
                    .find_substatement("prefix")
                    .and_then(|p| p.argument_str())
                {
                    module = module.with_prefix_binding(prefix, target);
                }
            }
            // Inclusions were recorded on the root when the include
            // actions fired; the folded content is already in the tree.
            for (submodule, _) in self
                .tree
                .store(root)
                .iter_kind(NamespaceKind::IncludedSubmodule)
            {
                module = module.with_include(submodule);
            }
            modules.push(module);
        }
        Ok(SchemaContext::new(modules))
    }

    /// XML-namespace string per source, used to qualify schema path
    /// segments. A module declares its own; a submodule inherits the one
    /// of the module it belongs to.
    fn resolve_namespaces(&self) -> Result<Vec<String>, BuildError> {
        let mut namespaces = vec![String::new(); self.profiles.len()];
        for root in self.tree.roots() {
            let module_ctx = if self.tree.name(*root).keyword() == "module" {
                *root
            } else {
                let sub_name = self.tree.argument_str(*root).unwrap_or_default();
                let parent_name = self
                    .tree
                    .global_ns()
                    .get(NamespaceKind::BelongsTo, sub_name)
                    .and_then(NamespaceValue::as_text)
                    .unwrap_or_default()
                    .to_owned();
                match self
                    .tree
                    .global_ns()
                    .get(NamespaceKind::Module, &parent_name)
                    .and_then(NamespaceValue::as_context)
                {
                    Some(ctx) => ctx,
                    None => {
                        return Err(SourceError::new(
                            format!(
                                "submodule `{}` belongs to module `{}` which is not part of this build",
                                sub_name, parent_name
                            ),
                            self.tree.source_ref(*root),
                        )
                        .into());
                    }
                }
            };
            if let Some(ns_ctx) = self.tree.find_child(module_ctx, "namespace") {
                if let Some(uri) = self.tree.argument_str(ns_ctx) {
                    namespaces[self.tree.source_of(*root)] = uri.to_owned();
                }
            }
        }
        Ok(namespaces)
    }
}
