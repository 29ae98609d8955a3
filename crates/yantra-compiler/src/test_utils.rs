//! Shared builders for compiler tests.

use yantra_core::{RawStatement, SourceRef};

pub(crate) fn at(line: u32) -> SourceRef {
    SourceRef::new("test.yang", line, 1)
}

pub(crate) fn stmt(keyword: &str, argument: Option<&str>, line: u32) -> RawStatement {
    RawStatement::new(keyword, argument, at(line))
}

/// A minimal well-formed module: namespace `urn:<name>`, prefix `<name>`.
pub(crate) fn module(name: &str) -> RawStatement {
    stmt("module", Some(name), 1)
        .with_child(stmt("namespace", Some(&format!("urn:{name}")), 2))
        .with_child(stmt("prefix", Some(name), 3))
}

/// A minimal submodule declaring its owner.
pub(crate) fn submodule(name: &str, owner: &str) -> RawStatement {
    stmt("submodule", Some(name), 1).with_child(
        stmt("belongs-to", Some(owner), 2).with_child(stmt("prefix", Some(owner), 3)),
    )
}

pub(crate) fn leaf(name: &str, line: u32) -> RawStatement {
    stmt("leaf", Some(name), line).with_child(stmt("type", Some("string"), line))
}

pub(crate) fn container(name: &str, line: u32) -> RawStatement {
    stmt("container", Some(name), line)
}
