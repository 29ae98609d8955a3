//! The per-statement-kind policy contract.

use std::sync::Arc;

use indexmap::IndexMap;
use yantra_core::{Argument, OrderedBy, QName, SourceRef, StatementName, Status};
use yantra_model::EffectiveStatement;

use crate::error::{BuildError, SourceError};
use crate::reactor::ReactorCtx;
use crate::tree::{BuildTree, CtxId};

/// Whether a context produced by grouping expansion may later have
/// additional declared substatements merged in (refinements).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CopyPolicy {
    /// The statement may not be copied at all (module-level plumbing that
    /// can never legally appear inside a grouping).
    RejectCopy,
    /// Copies behave like declared statements and accept refinements.
    DeclaredCopy,
}

/// How a keyword's argument text is typed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ArgKind {
    /// The keyword takes no argument.
    None,
    /// Free-form string.
    Str,
    /// A single identifier: letters, digits, `_`, `-`, `.`, not empty,
    /// not starting with a digit.
    Identifier,
    /// A reference to a named definition, optionally qualified by an
    /// import prefix (`prefix:name`). Qualified references parse to a
    /// [`QName`] whose first component carries the prefix until linkage
    /// resolves it.
    NodeName,
    /// A signed integer.
    Int,
    /// `true` / `false`.
    Bool,
    /// `current` / `deprecated` / `obsolete`.
    Status,
    /// `system` / `user`.
    OrderedBy,
    /// A revision date, `YYYY-MM-DD`.
    Date,
}

impl ArgKind {
    /// Parse raw argument text according to this kind. `name` carries the
    /// keyword and the declared argument name, both used in diagnostics.
    pub fn parse(
        self,
        name: &StatementName,
        raw: Option<&str>,
        at: &SourceRef,
    ) -> Result<Argument, SourceError> {
        debug_assert_eq!(
            name.takes_argument(),
            self != ArgKind::None,
            "argument metadata of `{}` disagrees with its parser kind",
            name.keyword()
        );
        let keyword = name.keyword();
        let missing = || {
            let what = match name.argument_name() {
                Some(arg) => format!("statement `{}` requires a `{}` argument", keyword, arg),
                None => format!("statement `{}` requires an argument", keyword),
            };
            SourceError::new(what, at)
        };
        match self {
            ArgKind::None => match raw {
                None => Ok(Argument::None),
                Some(text) => Err(SourceError::new(
                    format!("statement `{}` does not take an argument, found `{}`", keyword, text),
                    at,
                )),
            },
            ArgKind::Str => Ok(Argument::Str(raw.ok_or_else(missing)?.into())),
            ArgKind::Identifier => {
                let text = raw.ok_or_else(missing)?;
                if !is_identifier(text) {
                    return Err(SourceError::new(
                        format!("`{}` is not a valid identifier for `{}`", text, keyword),
                        at,
                    ));
                }
                Ok(Argument::Identifier(text.into()))
            }
            ArgKind::NodeName => {
                let text = raw.ok_or_else(missing)?;
                match text.split_once(':') {
                    Some((prefix, local)) if is_identifier(prefix) && is_identifier(local) => {
                        Ok(Argument::QName(QName::new(prefix, local)))
                    }
                    None if is_identifier(text) => Ok(Argument::Identifier(text.into())),
                    _ => Err(SourceError::new(
                        format!("`{}` is not a valid reference for `{}`", text, keyword),
                        at,
                    )),
                }
            }
            ArgKind::Int => {
                let text = raw.ok_or_else(missing)?;
                match text.parse::<i64>() {
                    Ok(value) => Ok(Argument::Int(value)),
                    Err(_) => Err(SourceError::new(
                        format!("`{}` is not a valid integer for `{}`", text, keyword),
                        at,
                    )),
                }
            }
            ArgKind::Bool => match raw.ok_or_else(missing)? {
                "true" => Ok(Argument::Bool(true)),
                "false" => Ok(Argument::Bool(false)),
                text => Err(SourceError::new(
                    format!("`{}` is not a valid boolean for `{}`", text, keyword),
                    at,
                )),
            },
            ArgKind::Status => match raw.ok_or_else(missing)? {
                "current" => Ok(Argument::Status(Status::Current)),
                "deprecated" => Ok(Argument::Status(Status::Deprecated)),
                "obsolete" => Ok(Argument::Status(Status::Obsolete)),
                text => Err(SourceError::new(
                    format!("`{}` is not a valid status", text),
                    at,
                )),
            },
            ArgKind::OrderedBy => match raw.ok_or_else(missing)? {
                "system" => Ok(Argument::OrderedBy(OrderedBy::System)),
                "user" => Ok(Argument::OrderedBy(OrderedBy::User)),
                text => Err(SourceError::new(
                    format!("`{}` is not a valid ordering", text),
                    at,
                )),
            },
            ArgKind::Date => {
                let text = raw.ok_or_else(missing)?;
                if !is_revision_date(text) {
                    return Err(SourceError::new(
                        format!("`{}` is not a valid revision date (expected YYYY-MM-DD)", text),
                        at,
                    ));
                }
                Ok(Argument::Str(text.into()))
            }
        }
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn is_revision_date(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && [0, 1, 2, 3, 5, 6, 8, 9]
            .iter()
            .all(|&i| bytes[i].is_ascii_digit())
}

/// Inputs handed to [`StatementSupport::build_effective`] by the freeze
/// pass, already fully computed.
pub struct EffectiveParts {
    pub name: StatementName,
    pub argument: Argument,
    pub substatements: Vec<Arc<EffectiveStatement>>,
    pub flags: yantra_model::StmtFlags,
    pub path: yantra_core::SchemaPath,
    pub original: Option<Arc<EffectiveStatement>>,
}

/// Policy object for one statement kind.
///
/// The engine is entirely generic; everything keyword-specific (argument
/// typing, substatement cardinality, linkage behavior, copy semantics)
/// lives behind this trait. Adding a statement kind means registering a
/// new implementation, not touching the engine.
pub trait StatementSupport {
    fn name(&self) -> &StatementName;

    /// Type the raw argument text.
    fn parse_argument(&self, raw: Option<&str>, at: &SourceRef) -> Result<Argument, SourceError>;

    /// Substatement cardinality rules, if the kind constrains them.
    fn validator(&self) -> Option<&SubstatementValidator> {
        None
    }

    fn copy_policy(&self) -> CopyPolicy {
        CopyPolicy::DeclaredCopy
    }

    /// Whether this statement occupies a slot in the schema tree (and thus
    /// contributes a segment to schema paths).
    fn is_schema_node(&self) -> bool {
        false
    }

    fn on_pre_linkage(&self, rx: &mut ReactorCtx<'_>, ctx: CtxId) -> Result<(), BuildError> {
        let _ = (rx, ctx);
        Ok(())
    }

    fn on_linkage(&self, rx: &mut ReactorCtx<'_>, ctx: CtxId) -> Result<(), BuildError> {
        let _ = (rx, ctx);
        Ok(())
    }

    fn on_full_declaration(&self, rx: &mut ReactorCtx<'_>, ctx: CtxId) -> Result<(), BuildError> {
        let _ = (rx, ctx);
        Ok(())
    }

    /// Freeze the context into its effective form. The default assembles
    /// the parts as-is; kinds with bespoke effective representations
    /// override this.
    fn build_effective(&self, tree: &BuildTree, ctx: CtxId, parts: EffectiveParts) -> Arc<EffectiveStatement> {
        let _ = (tree, ctx);
        let mut builder = EffectiveStatement::builder(parts.name)
            .argument(parts.argument)
            .substatements(parts.substatements)
            .flags(parts.flags)
            .path(parts.path);
        if let Some(original) = parts.original {
            builder = builder.original(original);
        }
        builder.build()
    }
}

/// Cardinality bounds for one substatement keyword.
#[derive(Clone, Copy, Debug)]
struct Cardinality {
    min: u32,
    max: Option<u32>,
}

/// Declarative substatement validation: which keywords may appear under a
/// statement, and how many times.
#[derive(Debug, Default)]
pub struct SubstatementValidator {
    rules: IndexMap<String, Cardinality>,
}

impl SubstatementValidator {
    pub fn builder() -> SubstatementValidatorBuilder {
        SubstatementValidatorBuilder {
            rules: IndexMap::new(),
        }
    }

    /// Check the direct children of `ctx` against the rules. The first
    /// violation aborts; later phases cannot proceed on a malformed tree.
    pub fn validate(&self, tree: &BuildTree, ctx: CtxId) -> Result<(), SourceError> {
        let parent_kw = tree.name(ctx).keyword().to_owned();
        let mut counts: IndexMap<&str, u32> = IndexMap::new();

        for child in tree.children(ctx).iter().copied() {
            let kw = tree.name(child).keyword();
            match self.rules.get(kw) {
                Some(_) => *counts.entry(kw).or_insert(0) += 1,
                None => {
                    return Err(SourceError::new(
                        format!(
                            "statement `{}` is not valid as a substatement of `{}`",
                            kw, parent_kw
                        ),
                        tree.source_ref(child),
                    ));
                }
            }
        }

        for (kw, cardinality) in &self.rules {
            let count = counts.get(kw.as_str()).copied().unwrap_or(0);
            if count < cardinality.min {
                return Err(SourceError::new(
                    format!(
                        "statement `{}` requires at least {} `{}` substatement(s), found {}",
                        parent_kw, cardinality.min, kw, count
                    ),
                    tree.source_ref(ctx),
                ));
            }
            if let Some(max) = cardinality.max {
                if count > max {
                    return Err(SourceError::new(
                        format!(
                            "statement `{}` allows at most {} `{}` substatement(s), found {}",
                            parent_kw, max, kw, count
                        ),
                        tree.source_ref(ctx),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Builder for [`SubstatementValidator`].
pub struct SubstatementValidatorBuilder {
    rules: IndexMap<String, Cardinality>,
}

impl SubstatementValidatorBuilder {
    fn rule(mut self, keyword: &str, min: u32, max: Option<u32>) -> Self {
        self.rules.insert(keyword.to_owned(), Cardinality { min, max });
        self
    }

    /// Exactly one occurrence.
    pub fn required(self, keyword: &str) -> Self {
        self.rule(keyword, 1, Some(1))
    }

    /// Zero or one occurrence.
    pub fn optional(self, keyword: &str) -> Self {
        self.rule(keyword, 0, Some(1))
    }

    /// Any number of occurrences.
    pub fn any(self, keyword: &str) -> Self {
        self.rule(keyword, 0, None)
    }

    pub fn build(self) -> SubstatementValidator {
        SubstatementValidator { rules: self.rules }
    }
}
