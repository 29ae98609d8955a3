//! Build failure taxonomy.
//!
//! All three kinds are fatal to the whole build: there is no partial or
//! degraded effective model, and nothing is retried.

use std::fmt;

use yantra_core::SourceRef;

use crate::phase::ModelPhase;

/// A statement is locally malformed: bad argument syntax, a forbidden
/// substatement, or a duplicate name within an already-visible scope.
///
/// Raised synchronously by the phase hook that detects it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct SourceError {
    message: String,
    at: SourceRef,
    /// Second involved location, e.g. the earlier binding of a duplicated
    /// or shadowed name.
    related: Option<SourceRef>,
}

impl SourceError {
    pub fn new(message: impl Into<String>, at: &SourceRef) -> Self {
        Self {
            message: message.into(),
            at: at.clone(),
            related: None,
        }
    }

    pub fn with_related(mut self, related: &SourceRef) -> Self {
        self.related = Some(related.clone());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_ref(&self) -> &SourceRef {
        &self.at
    }

    pub fn related(&self) -> Option<&SourceRef> {
        self.related.as_ref()
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {})", self.message, self.at)?;
        if let Some(related) = &self.related {
            write!(f, "; see also {}", related)?;
        }
        Ok(())
    }
}

/// A deferred inference prerequisite could not be resolved even though the
/// model structurally converged, e.g. a `uses` naming a grouping that is
/// never declared anywhere reachable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (at {at})")]
pub struct InferenceError {
    message: String,
    at: SourceRef,
}

impl InferenceError {
    pub fn new(message: impl Into<String>, at: &SourceRef) -> Self {
        Self {
            message: message.into(),
            at: at.clone(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_ref(&self) -> &SourceRef {
        &self.at
    }
}

/// The fixed-point loop in some phase stopped firing actions while
/// contexts or actions remained pending. Carries every stuck prerequisite,
/// not just the first, so circular or missing cross-source dependencies
/// are diagnosable in one pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct UnresolvedError {
    phase: ModelPhase,
    failures: Vec<InferenceError>,
}

impl UnresolvedError {
    pub fn new(phase: ModelPhase, failures: Vec<InferenceError>) -> Self {
        Self { phase, failures }
    }

    pub fn phase(&self) -> ModelPhase {
        self.phase
    }

    pub fn failures(&self) -> &[InferenceError] {
        &self.failures
    }
}

impl fmt::Display for UnresolvedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "phase `{}` failed to converge with {} unresolved prerequisite(s)",
            self.phase,
            self.failures.len()
        )?;
        for failure in &self.failures {
            write!(f, "\n  - {}", failure)?;
        }
        Ok(())
    }
}

/// Any way a build can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Unresolved(#[from] UnresolvedError),
}
