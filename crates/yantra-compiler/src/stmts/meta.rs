//! Metadata statements with no build-time behavior, plus `feature`.

use std::sync::Arc;

use yantra_core::{Argument, SourceRef, StatementName};

use crate::error::{BuildError, SourceError};
use crate::namespace::{NamespaceKind, NamespaceValue};
use crate::reactor::ReactorCtx;
use crate::support::{ArgKind, CopyPolicy, StatementSupport, SubstatementValidator};
use crate::tree::CtxId;

use super::declared_name;

/// A statement kind whose entire policy is declarative: argument typing,
/// cardinality rules, and copyability. Covers most metadata keywords.
pub(crate) struct SimpleSupport {
    name: StatementName,
    arg: ArgKind,
    copy: CopyPolicy,
    validator: Option<SubstatementValidator>,
}

impl SimpleSupport {
    /// `argument` is the declared name of the keyword's argument, carried
    /// as registry metadata and used in diagnostics.
    pub(crate) fn new(keyword: &str, argument: &str, arg: ArgKind) -> Self {
        Self {
            name: StatementName::core(keyword).with_argument(argument),
            arg,
            copy: CopyPolicy::DeclaredCopy,
            validator: None,
        }
    }

    pub(crate) fn rejecting_copy(mut self) -> Self {
        self.copy = CopyPolicy::RejectCopy;
        self
    }

    pub(crate) fn with_validator(mut self, validator: SubstatementValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// No substatements allowed at all.
    fn leaf(keyword: &str, argument: &str, arg: ArgKind) -> Self {
        Self::new(keyword, argument, arg).with_validator(SubstatementValidator::builder().build())
    }
}

impl StatementSupport for SimpleSupport {
    fn name(&self) -> &StatementName {
        &self.name
    }

    fn parse_argument(&self, raw: Option<&str>, at: &SourceRef) -> Result<Argument, SourceError> {
        self.arg.parse(&self.name, raw, at)
    }

    fn validator(&self) -> Option<&SubstatementValidator> {
        self.validator.as_ref()
    }

    fn copy_policy(&self) -> CopyPolicy {
        self.copy
    }
}

/// `feature` and `identity`: named declarations published build-wide, so
/// any source can refer to them.
struct GlobalDefSupport {
    name: StatementName,
    kind: NamespaceKind,
    validator: SubstatementValidator,
}

impl GlobalDefSupport {
    fn feature() -> Self {
        Self {
            name: StatementName::core("feature").with_argument("name"),
            kind: NamespaceKind::Feature,
            validator: SubstatementValidator::builder()
                .optional("description")
                .optional("reference")
                .optional("status")
                .any("if-feature")
                .build(),
        }
    }

    fn identity() -> Self {
        Self {
            name: StatementName::core("identity").with_argument("name"),
            kind: NamespaceKind::Identity,
            validator: SubstatementValidator::builder()
                .optional("description")
                .optional("reference")
                .optional("status")
                .optional("base")
                .any("if-feature")
                .build(),
        }
    }
}

impl StatementSupport for GlobalDefSupport {
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

    fn on_pre_linkage(&self, rx: &mut ReactorCtx<'_>, ctx: CtxId) -> Result<(), BuildError> {
        let name = declared_name(rx.tree(), ctx);
        let at = rx.tree().source_ref(ctx).clone();
        rx.tree_mut()
            .put_global(self.kind, &name, NamespaceValue::Context(ctx), &at)?;
        Ok(())
    }
}

pub(crate) fn defaults() -> Vec<Arc<dyn StatementSupport>> {
    vec![
        Arc::new(SimpleSupport::leaf("description", "text", ArgKind::Str)),
        Arc::new(SimpleSupport::leaf("reference", "text", ArgKind::Str)),
        Arc::new(SimpleSupport::leaf("status", "value", ArgKind::Status)),
        Arc::new(SimpleSupport::leaf("config", "value", ArgKind::Bool)),
        Arc::new(SimpleSupport::leaf("presence", "value", ArgKind::Str)),
        Arc::new(SimpleSupport::leaf("mandatory", "value", ArgKind::Bool)),
        Arc::new(SimpleSupport::leaf("organization", "text", ArgKind::Str)),
        Arc::new(SimpleSupport::leaf("contact", "text", ArgKind::Str)),
        Arc::new(SimpleSupport::leaf("key", "value", ArgKind::Str)),
        Arc::new(SimpleSupport::leaf("ordered-by", "value", ArgKind::OrderedBy)),
        Arc::new(SimpleSupport::leaf("if-feature", "name", ArgKind::Identifier)),
        Arc::new(SimpleSupport::leaf("base", "name", ArgKind::NodeName)),
        Arc::new(SimpleSupport::leaf("min-elements", "value", ArgKind::Int)),
        Arc::new(SimpleSupport::leaf("max-elements", "value", ArgKind::Int)),
        // `type` substatements (ranges, patterns) are outside the compiled
        // grammar; the argument is kept as raw text since it may carry a
        // prefix.
        Arc::new(SimpleSupport::leaf("type", "name", ArgKind::Str)),
        Arc::new(SimpleSupport::leaf("units", "name", ArgKind::Str)),
        Arc::new(SimpleSupport::leaf("namespace", "uri", ArgKind::Str).rejecting_copy()),
        Arc::new(SimpleSupport::leaf("prefix", "value", ArgKind::Identifier).rejecting_copy()),
        Arc::new(SimpleSupport::leaf("yang-version", "value", ArgKind::Str).rejecting_copy()),
        Arc::new(SimpleSupport::leaf("revision-date", "date", ArgKind::Date).rejecting_copy()),
        Arc::new(
            SimpleSupport::new("revision", "date", ArgKind::Date)
                .rejecting_copy()
                .with_validator(
                    SubstatementValidator::builder()
                        .optional("description")
                        .optional("reference")
                        .build(),
                ),
        ),
        Arc::new(
            SimpleSupport::new("belongs-to", "module", ArgKind::Identifier)
                .rejecting_copy()
                .with_validator(SubstatementValidator::builder().required("prefix").build()),
        ),
        Arc::new(GlobalDefSupport::feature()),
        Arc::new(GlobalDefSupport::identity()),
    ]
}
