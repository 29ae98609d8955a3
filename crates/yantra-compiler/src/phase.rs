//! Model processing phases.

use std::fmt;

/// The ordered phases every statement context passes through.
///
/// The scheduler drives the whole forest through these in lockstep: no
/// context enters a phase before every context it depends on has finished
/// the previous one.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ModelPhase {
    /// Source identifiers (module/submodule names, belongs-to targets)
    /// are harvested so other sources can link against them.
    SourcePreLinkage,
    /// Imports and includes are resolved across sources.
    SourceLinkage,
    /// Substatement cardinality is validated, groupings expand, implicit
    /// substatements are appended.
    FullDeclaration,
    /// Every context is frozen into its effective form.
    EffectiveModel,
}

impl ModelPhase {
    /// All phases, in execution order.
    pub const ALL: [ModelPhase; 4] = [
        ModelPhase::SourcePreLinkage,
        ModelPhase::SourceLinkage,
        ModelPhase::FullDeclaration,
        ModelPhase::EffectiveModel,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn previous(self) -> Option<ModelPhase> {
        match self {
            ModelPhase::SourcePreLinkage => None,
            ModelPhase::SourceLinkage => Some(ModelPhase::SourcePreLinkage),
            ModelPhase::FullDeclaration => Some(ModelPhase::SourceLinkage),
            ModelPhase::EffectiveModel => Some(ModelPhase::FullDeclaration),
        }
    }
}

impl fmt::Display for ModelPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelPhase::SourcePreLinkage => "source pre-linkage",
            ModelPhase::SourceLinkage => "source linkage",
            ModelPhase::FullDeclaration => "full declaration",
            ModelPhase::EffectiveModel => "effective model",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_ordering() {
        let phases = ModelPhase::ALL;
        for pair in phases.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[1].previous(), Some(pair[0]));
        }
        assert!(ModelPhase::SourcePreLinkage.previous().is_none());
    }
}
