//! Source location references.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Location of a statement in its source document.
///
/// The grammar layer attaches one of these to every raw statement; the
/// compiler threads it through to error messages and keeps it on copies
/// produced by grouping expansion (a copy reports the grouping's own
/// location, which is where the offending text actually lives).
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct SourceRef {
    source: Arc<str>,
    line: u32,
    column: u32,
}

impl SourceRef {
    pub fn new(source: &str, line: u32, column: u32) -> Self {
        Self {
            source: source.into(),
            line,
            column,
        }
    }

    /// Name of the source document (typically a file name).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.line, self.column)
    }
}
