//! Deferred inference: prerequisites and model actions.
//!
//! An action is a plain value on a work-list: a target phase, a list of
//! prerequisites, an apply closure and a failure closure. The scheduler's
//! fixed-point loop re-evaluates pending actions whenever any context
//! makes progress; an action fires exactly once, and one still pending
//! when its phase can make no further progress is failed with a named
//! error.

use yantra_core::SourceRef;

use crate::error::{BuildError, InferenceError};
use crate::namespace::{NamespaceKind, NamespaceValue};
use crate::phase::ModelPhase;
use crate::reactor::ReactorCtx;
use crate::tree::{BuildTree, CtxId, SourceIdx};

/// Where a namespace-item prerequisite starts its lookup.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Scope {
    /// The build-global store.
    Global,
    /// A context, following the namespace kind's scope rule.
    Ctx(CtxId),
}

/// A single requirement of a model action.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Prerequisite {
    /// A known context must complete a phase.
    CtxPhase { ctx: CtxId, phase: ModelPhase },
    /// A namespace entry must exist and, if it names a context, that
    /// context must have completed the phase.
    Item {
        scope: Scope,
        kind: NamespaceKind,
        key: String,
        phase: ModelPhase,
    },
}

impl Prerequisite {
    fn resolve(&self, tree: &BuildTree) -> Option<NamespaceValue> {
        match self {
            Prerequisite::CtxPhase { ctx, phase } => tree
                .has_completed(*ctx, *phase)
                .then_some(NamespaceValue::Context(*ctx)),
            Prerequisite::Item {
                scope,
                kind,
                key,
                phase,
            } => {
                let value = match scope {
                    Scope::Global => tree.global_ns().get(*kind, key),
                    Scope::Ctx(start) => tree.lookup(*start, *kind, key),
                }?;
                if let NamespaceValue::Context(target) = value {
                    if !tree.has_completed(*target, *phase) {
                        return None;
                    }
                }
                Some(value.clone())
            }
        }
    }

    pub fn describe(&self, tree: &BuildTree) -> String {
        match self {
            Prerequisite::CtxPhase { ctx, phase } => format!(
                "statement `{}` (at {}) to complete {}",
                tree.name(*ctx).keyword(),
                tree.source_ref(*ctx),
                phase
            ),
            Prerequisite::Item { kind, key, phase, .. } => {
                format!("{} `{}` to be available at {}", kind, key, phase)
            }
        }
    }
}

/// Handle into an action's resolved prerequisite values.
#[derive(Clone, Copy, Debug)]
pub struct PrereqHandle(usize);

/// The values an action's prerequisites resolved to, index-aligned with
/// the handles returned during registration.
pub struct ResolvedSet {
    values: Vec<NamespaceValue>,
}

impl ResolvedSet {
    pub fn get(&self, handle: PrereqHandle) -> &NamespaceValue {
        &self.values[handle.0]
    }

    /// The context a prerequisite resolved to. Panics if the prerequisite
    /// resolved to a plain value; that is a policy programming error, not
    /// an input error.
    pub fn ctx(&self, handle: PrereqHandle) -> CtxId {
        match &self.values[handle.0] {
            NamespaceValue::Context(ctx) => *ctx,
            other => unreachable!("prerequisite resolved to non-context value {:?}", other),
        }
    }
}

type ApplyFn = Box<dyn FnOnce(&mut ReactorCtx<'_>, &ResolvedSet) -> Result<(), BuildError>>;
type FailFn = Box<dyn FnOnce(&[String]) -> InferenceError>;

/// Builder for a model action, handed out by the reactor context.
pub struct ActionBuilder {
    phase: ModelPhase,
    at: SourceRef,
    prereqs: Vec<Prerequisite>,
    mutates: Vec<(CtxId, ModelPhase)>,
    apply: Option<ApplyFn>,
    fail: Option<FailFn>,
}

impl ActionBuilder {
    /// `phase` is the phase in whose fixed-point loop the action runs;
    /// `at` is the requesting statement's location, used in failure
    /// reports.
    pub fn new(phase: ModelPhase, at: &SourceRef) -> Self {
        Self {
            phase,
            at: at.clone(),
            prereqs: Vec::new(),
            mutates: Vec::new(),
            apply: None,
            fail: None,
        }
    }

    /// Require a known context to complete a phase.
    pub fn requires_ctx(&mut self, ctx: CtxId, phase: ModelPhase) -> PrereqHandle {
        self.prereqs.push(Prerequisite::CtxPhase { ctx, phase });
        PrereqHandle(self.prereqs.len() - 1)
    }

    /// Require a namespace entry to become available at a phase.
    pub fn requires_item(
        &mut self,
        scope: Scope,
        kind: NamespaceKind,
        key: &str,
        phase: ModelPhase,
    ) -> PrereqHandle {
        self.prereqs.push(Prerequisite::Item {
            scope,
            kind,
            key: key.to_owned(),
            phase,
        });
        PrereqHandle(self.prereqs.len() - 1)
    }

    /// Declare that the action will mutate `ctx` during `phase`; the
    /// context cannot complete that phase until the action has run.
    pub fn mutates(&mut self, ctx: CtxId, phase: ModelPhase) {
        self.mutates.push((ctx, phase));
    }

    /// The callback run once all prerequisites are resolved.
    pub fn apply(
        &mut self,
        f: impl FnOnce(&mut ReactorCtx<'_>, &ResolvedSet) -> Result<(), BuildError> + 'static,
    ) {
        debug_assert!(self.apply.is_none(), "apply registered twice");
        self.apply = Some(Box::new(f));
    }

    /// The callback producing the error if the build concludes without
    /// resolving every prerequisite. Receives descriptions of the
    /// unresolved ones.
    pub fn or_fail(&mut self, f: impl FnOnce(&[String]) -> InferenceError + 'static) {
        debug_assert!(self.fail.is_none(), "failure handler registered twice");
        self.fail = Some(Box::new(f));
    }

    pub(crate) fn into_action(self, source: SourceIdx) -> ModelAction {
        ModelAction {
            phase: self.phase,
            at: self.at,
            source,
            prereqs: self.prereqs,
            mutates: self.mutates,
            apply: self.apply,
            fail: self.fail,
        }
    }
}

/// A registered, not-yet-fired action on the scheduler's work-list.
pub(crate) struct ModelAction {
    pub(crate) phase: ModelPhase,
    pub(crate) at: SourceRef,
    pub(crate) source: SourceIdx,
    pub(crate) prereqs: Vec<Prerequisite>,
    pub(crate) mutates: Vec<(CtxId, ModelPhase)>,
    apply: Option<ApplyFn>,
    fail: Option<FailFn>,
}

impl ModelAction {
    /// Check all prerequisites against the current tree state.
    pub(crate) fn try_resolve(&self, tree: &BuildTree) -> Option<ResolvedSet> {
        let mut values = Vec::with_capacity(self.prereqs.len());
        for prereq in &self.prereqs {
            values.push(prereq.resolve(tree)?);
        }
        Some(ResolvedSet { values })
    }

    /// Fire the action. Called at most once, after `try_resolve` succeeds.
    pub(crate) fn fire(
        mut self,
        rx: &mut ReactorCtx<'_>,
        resolved: &ResolvedSet,
    ) -> Result<(), BuildError> {
        let result = match self.apply.take() {
            Some(apply) => apply(rx, resolved),
            None => Ok(()),
        };
        for (ctx, phase) in &self.mutates {
            rx.tree.clear_mutation(*ctx, *phase);
        }
        result
    }

    /// Give up on the action, producing its named inference error.
    pub(crate) fn fail(mut self, tree: &BuildTree) -> InferenceError {
        let unresolved: Vec<String> = self
            .prereqs
            .iter()
            .filter(|p| p.resolve(tree).is_none())
            .map(|p| p.describe(tree))
            .collect();
        match self.fail.take() {
            Some(fail) => fail(&unresolved),
            None => InferenceError::new(
                format!("unresolved prerequisite(s): {}", unresolved.join("; ")),
                &self.at,
            ),
        }
    }
}
