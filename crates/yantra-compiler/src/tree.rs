//! The mutable build tree: an arena of in-progress statement contexts.
//!
//! Parent links are plain indices (non-owning), child links are an owned
//! index list, so the mutable, mutually-linked tree needs no reference
//! counting and "who is my parent" stays O(1). Any relationship beyond
//! containment ("copied from") is a labelled index, never ownership.

use std::sync::Arc;

use yantra_core::{Argument, SourceRef, StatementName};
use yantra_model::EffectiveStatement;

use crate::error::SourceError;
use crate::namespace::{NamespaceKind, NamespaceStore, NamespaceValue, ScopeRule};
use crate::phase::ModelPhase;
use crate::support::{CopyPolicy, StatementSupport};

/// Index of a statement context in the build tree arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CtxId(u32);

impl CtxId {
    #[inline]
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of the source a context belongs to.
pub type SourceIdx = usize;

/// How a context came to exist.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StmtOrigin {
    /// Backed by a declared statement from a source document.
    Declared,
    /// Synthesized by a phase hook (e.g. an rpc's implicit `input`).
    Implicit,
    /// Produced by grouping expansion; `original` is the context this one
    /// was ultimately copied from.
    Copy { original: CtxId },
}

/// One mutable build-time statement node.
struct StatementContext {
    parent: Option<CtxId>,
    children: Vec<CtxId>,
    support: Arc<dyn StatementSupport>,
    argument: Argument,
    at: SourceRef,
    origin: StmtOrigin,
    source: SourceIdx,
    namespaces: NamespaceStore,
    /// Highest phase this context has fully completed.
    phase: Option<ModelPhase>,
    /// Registered-but-unapplied mutations per phase; a context cannot
    /// complete a phase while a mutation targeting it is outstanding.
    mutations: [u32; 4],
    effective: Option<Arc<EffectiveStatement>>,
}

/// The arena of all contexts in one build, plus the build-global
/// namespace store (module/submodule identifiers visible across sources).
pub struct BuildTree {
    nodes: Vec<StatementContext>,
    roots: Vec<CtxId>,
    global: NamespaceStore,
}

impl BuildTree {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            global: NamespaceStore::new(),
        }
    }

    fn push(
        &mut self,
        parent: Option<CtxId>,
        support: Arc<dyn StatementSupport>,
        argument: Argument,
        at: SourceRef,
        origin: StmtOrigin,
        source: SourceIdx,
        phase: Option<ModelPhase>,
    ) -> CtxId {
        let id = CtxId(self.nodes.len() as u32);
        self.nodes.push(StatementContext {
            parent,
            children: Vec::new(),
            support,
            argument,
            at,
            origin,
            source,
            namespaces: NamespaceStore::new(),
            phase,
            mutations: [0; 4],
            effective: None,
        });
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(id);
        }
        id
    }

    /// Root context for one source document.
    pub fn new_root(
        &mut self,
        support: Arc<dyn StatementSupport>,
        argument: Argument,
        at: SourceRef,
        source: SourceIdx,
    ) -> CtxId {
        let id = self.push(None, support, argument, at, StmtOrigin::Declared, source, None);
        self.roots.push(id);
        id
    }

    /// Add a declared child. Only legal while the parent's phase 0 is
    /// still open; calling this later is a programming error.
    pub fn create_child(
        &mut self,
        parent: CtxId,
        support: Arc<dyn StatementSupport>,
        argument: Argument,
        at: SourceRef,
    ) -> CtxId {
        assert!(
            self.nodes[parent.index()].phase.is_none(),
            "create_child on a context past pre-linkage"
        );
        let source = self.nodes[parent.index()].source;
        self.push(Some(parent), support, argument, at, StmtOrigin::Declared, source, None)
    }

    /// Insert a statement not present in the source, on behalf of a phase
    /// hook (e.g. a default rpc `input`). The child starts at the
    /// parent's current phase marker.
    pub fn append_implicit_child(
        &mut self,
        parent: CtxId,
        support: Arc<dyn StatementSupport>,
        argument: Argument,
        at: SourceRef,
    ) -> CtxId {
        let node = &self.nodes[parent.index()];
        assert!(
            node.phase < Some(ModelPhase::EffectiveModel),
            "append_implicit_child on a frozen context"
        );
        let (source, phase) = (node.source, node.phase);
        self.push(Some(parent), support, argument, at, StmtOrigin::Implicit, source, phase)
    }

    /// Deep-copy `src` (and its subtree) under `new_parent`, producing a
    /// fresh lineage whose `original` links point at the ultimate
    /// originals. Namespace entries are not copied; copies republish when
    /// their own hooks run.
    pub fn copy_subtree(&mut self, src: CtxId, new_parent: CtxId) -> Result<CtxId, SourceError> {
        if self.support(src).copy_policy() == CopyPolicy::RejectCopy {
            return Err(SourceError::new(
                format!("statement `{}` cannot be copied", self.name(src).keyword()),
                self.source_ref(src),
            ));
        }

        let original = match self.origin(src) {
            StmtOrigin::Copy { original } => original,
            _ => src,
        };
        let parent_node = &self.nodes[new_parent.index()];
        let (source, phase) = (parent_node.source, parent_node.phase);
        let node = &self.nodes[src.index()];
        let (support, argument, at) =
            (Arc::clone(&node.support), node.argument.clone(), node.at.clone());

        let copy = self.push(
            Some(new_parent),
            support,
            argument,
            at,
            StmtOrigin::Copy { original },
            source,
            phase,
        );
        for child in self.children_vec(src) {
            // Expansion products are not carried along; the copied `uses`
            // and `refine` statements regenerate them at the new site.
            if matches!(self.origin(child), StmtOrigin::Copy { .. }) {
                continue;
            }
            self.copy_subtree(child, copy)?;
        }
        Ok(copy)
    }

    /// Detach `child` from `parent`'s child list (refinement replacing a
    /// copied substatement). The node stays in the arena but is no longer
    /// reachable from any root.
    pub fn detach_child(&mut self, parent: CtxId, child: CtxId) {
        self.nodes[parent.index()].children.retain(|c| *c != child);
    }

    // --- accessors ---

    pub fn roots(&self) -> &[CtxId] {
        &self.roots
    }

    pub fn support(&self, ctx: CtxId) -> Arc<dyn StatementSupport> {
        Arc::clone(&self.nodes[ctx.index()].support)
    }

    pub fn name(&self, ctx: CtxId) -> &StatementName {
        self.nodes[ctx.index()].support.name()
    }

    pub fn argument(&self, ctx: CtxId) -> &Argument {
        &self.nodes[ctx.index()].argument
    }

    pub fn argument_str(&self, ctx: CtxId) -> Option<&str> {
        self.nodes[ctx.index()].argument.as_str()
    }

    pub fn source_ref(&self, ctx: CtxId) -> &SourceRef {
        &self.nodes[ctx.index()].at
    }

    pub fn parent(&self, ctx: CtxId) -> Option<CtxId> {
        self.nodes[ctx.index()].parent
    }

    pub fn children(&self, ctx: CtxId) -> &[CtxId] {
        &self.nodes[ctx.index()].children
    }

    /// Owned child list, for callers that mutate the tree while walking.
    pub fn children_vec(&self, ctx: CtxId) -> Vec<CtxId> {
        self.nodes[ctx.index()].children.clone()
    }

    pub fn origin(&self, ctx: CtxId) -> StmtOrigin {
        self.nodes[ctx.index()].origin
    }

    pub fn original_of(&self, ctx: CtxId) -> Option<CtxId> {
        match self.origin(ctx) {
            StmtOrigin::Copy { original } => Some(original),
            _ => None,
        }
    }

    pub fn source_of(&self, ctx: CtxId) -> SourceIdx {
        self.nodes[ctx.index()].source
    }

    /// First direct child with the given keyword.
    pub fn find_child(&self, ctx: CtxId, keyword: &str) -> Option<CtxId> {
        self.nodes[ctx.index()]
            .children
            .iter()
            .copied()
            .find(|c| self.name(*c).keyword() == keyword)
    }

    /// Root context of the source `ctx` belongs to.
    pub fn root_of(&self, ctx: CtxId) -> CtxId {
        let mut current = ctx;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Pre-order snapshot of a subtree.
    pub fn walk(&self, root: CtxId) -> Vec<CtxId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(ctx) = stack.pop() {
            out.push(ctx);
            for child in self.children(ctx).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    // --- phase tracking ---

    pub fn phase_of(&self, ctx: CtxId) -> Option<ModelPhase> {
        self.nodes[ctx.index()].phase
    }

    pub fn has_completed(&self, ctx: CtxId, phase: ModelPhase) -> bool {
        self.nodes[ctx.index()].phase >= Some(phase)
    }

    pub fn add_mutation(&mut self, ctx: CtxId, phase: ModelPhase) {
        self.nodes[ctx.index()].mutations[phase.index()] += 1;
    }

    pub fn clear_mutation(&mut self, ctx: CtxId, phase: ModelPhase) {
        let slot = &mut self.nodes[ctx.index()].mutations[phase.index()];
        debug_assert!(*slot > 0, "unbalanced mutation release");
        *slot = slot.saturating_sub(1);
    }

    /// Try to mark `ctx` (and recursively its subtree) as having finished
    /// `phase`. A context completes once all its children have and no
    /// registered mutation for the phase is outstanding.
    pub fn try_complete(&mut self, ctx: CtxId, phase: ModelPhase) -> bool {
        if self.has_completed(ctx, phase) {
            return true;
        }
        let mut done = true;
        for child in self.children_vec(ctx) {
            done &= self.try_complete(child, phase);
        }
        done &= self.nodes[ctx.index()].mutations[phase.index()] == 0;
        if done {
            self.nodes[ctx.index()].phase = Some(phase);
        }
        done
    }

    // --- namespaces ---

    pub fn global_ns(&self) -> &NamespaceStore {
        &self.global
    }

    /// Publish into the build-global store.
    pub fn put_global(
        &mut self,
        kind: NamespaceKind,
        key: &str,
        value: NamespaceValue,
        at: &SourceRef,
    ) -> Result<(), SourceError> {
        self.global.put(kind, key, value, at)
    }

    /// Publish into `ctx`'s own store.
    pub fn put_ns(
        &mut self,
        ctx: CtxId,
        kind: NamespaceKind,
        key: &str,
        value: NamespaceValue,
    ) -> Result<(), SourceError> {
        let at = self.nodes[ctx.index()].at.clone();
        self.put_ns_at(ctx, kind, key, value, &at)
    }

    /// Publish into `ctx`'s own store, recording `at` as the binding site.
    pub fn put_ns_at(
        &mut self,
        ctx: CtxId,
        kind: NamespaceKind,
        key: &str,
        value: NamespaceValue,
        at: &SourceRef,
    ) -> Result<(), SourceError> {
        self.nodes[ctx.index()].namespaces.put(kind, key, value, at)
    }

    pub fn store(&self, ctx: CtxId) -> &NamespaceStore {
        &self.nodes[ctx.index()].namespaces
    }

    /// Resolve `key` as seen from `start`, following the kind's scope
    /// rule. Returns `None` for "absent"; absence is never an error here,
    /// callers decide.
    pub fn lookup(&self, start: CtxId, kind: NamespaceKind, key: &str) -> Option<&NamespaceValue> {
        self.lookup_entry(start, kind, key).map(|(value, _)| value)
    }

    /// Like [`Self::lookup`] but also yields the binding location.
    pub fn lookup_entry(
        &self,
        start: CtxId,
        kind: NamespaceKind,
        key: &str,
    ) -> Option<(&NamespaceValue, &SourceRef)> {
        match kind.scope_rule() {
            ScopeRule::Global => Self::entry_in(&self.global, kind, key),
            ScopeRule::Local => Self::entry_in(&self.nodes[start.index()].namespaces, kind, key),
            ScopeRule::WalkUp => {
                let mut current = Some(start);
                while let Some(ctx) = current {
                    let node = &self.nodes[ctx.index()];
                    if let Some(found) = Self::entry_in(&node.namespaces, kind, key) {
                        return Some(found);
                    }
                    current = node.parent;
                }
                None
            }
        }
    }

    fn entry_in<'a>(
        store: &'a NamespaceStore,
        kind: NamespaceKind,
        key: &str,
    ) -> Option<(&'a NamespaceValue, &'a SourceRef)> {
        Some((store.get(kind, key)?, store.binding_ref(kind, key)?))
    }

    // --- effective memoization ---

    pub fn effective_of(&self, ctx: CtxId) -> Option<&Arc<EffectiveStatement>> {
        self.nodes[ctx.index()].effective.as_ref()
    }

    pub fn set_effective(&mut self, ctx: CtxId, effective: Arc<EffectiveStatement>) {
        let slot = &mut self.nodes[ctx.index()].effective;
        debug_assert!(slot.is_none(), "context frozen twice");
        *slot = Some(effective);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for BuildTree {
    fn default() -> Self {
        Self::new()
    }
}
