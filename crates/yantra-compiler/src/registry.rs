//! Keyword -> policy resolution, per language profile.

use indexmap::IndexMap;
use std::sync::Arc;
use yantra_core::{RawStatement, SourceRef};

use crate::error::SourceError;
use crate::stmts;
use crate::support::StatementSupport;

/// Which revision of the statement grammar a source declares.
///
/// The profiles differ only in validation strictness for a handful of
/// statements; both are served by one registry with per-profile tables
/// rather than separate support implementations.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum LanguageProfile {
    /// The original grammar; the default when a source declares nothing.
    Legacy,
    /// The revised grammar: permits `description` and `reference` under
    /// `import` and `include`.
    Current,
}

impl LanguageProfile {
    pub const ALL: [LanguageProfile; 2] = [LanguageProfile::Legacy, LanguageProfile::Current];

    /// Determine the profile from a source's root statement. The version
    /// declaration is read before any policy runs, since it decides which
    /// policy table the whole source is compiled against.
    pub fn of_source(root: &RawStatement) -> Result<Self, SourceError> {
        let Some(version) = root.find_child("yang-version") else {
            return Ok(LanguageProfile::Legacy);
        };
        match version.argument() {
            Some("1") => Ok(LanguageProfile::Legacy),
            Some("1.1") => Ok(LanguageProfile::Current),
            other => Err(SourceError::new(
                format!(
                    "unsupported language version `{}`",
                    other.unwrap_or_default()
                ),
                version.source_ref(),
            )),
        }
    }
}

/// The closed table of statement policies for both profiles.
pub struct StatementRegistry {
    supports: IndexMap<(LanguageProfile, String), Arc<dyn StatementSupport>>,
}

impl StatementRegistry {
    pub fn new() -> Self {
        Self {
            supports: IndexMap::new(),
        }
    }

    /// Registry with every built-in statement kind installed.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for profile in LanguageProfile::ALL {
            for support in stmts::defaults(profile) {
                registry.register(profile, support);
            }
        }
        registry
    }

    pub fn register(&mut self, profile: LanguageProfile, support: Arc<dyn StatementSupport>) {
        let keyword = support.name().keyword().to_owned();
        self.supports.insert((profile, keyword), support);
    }

    pub fn get(&self, profile: LanguageProfile, keyword: &str) -> Option<Arc<dyn StatementSupport>> {
        self.supports
            .get(&(profile, keyword.to_owned()))
            .map(Arc::clone)
    }

    /// Resolve a keyword or fail with the statement's location.
    pub fn resolve(
        &self,
        profile: LanguageProfile,
        keyword: &str,
        at: &SourceRef,
    ) -> Result<Arc<dyn StatementSupport>, SourceError> {
        self.get(profile, keyword).ok_or_else(|| {
            SourceError::new(format!("unknown statement `{}`", keyword), at)
        })
    }
}

impl Default for StatementRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
