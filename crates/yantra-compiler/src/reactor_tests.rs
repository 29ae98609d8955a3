use yantra_core::QName;

use crate::test_utils::{container, leaf, module, stmt, submodule};
use crate::{compile, BuildError, ModelPhase, SourceSet};

#[test]
fn empty_source_set_builds_empty_context() {
    let ctx = compile(&SourceSet::new()).unwrap();
    assert_eq!(ctx.modules().count(), 0);
}

#[test]
fn minimal_module_round_trip() {
    let source = module("m")
        .with_child(stmt("revision", Some("2024-01-01"), 4))
        .with_child(stmt("revision", Some("2025-02-02"), 5))
        .with_child(stmt("organization", Some("example corp"), 6));
    let ctx = compile(&SourceSet::new().add_main(source)).unwrap();

    let m = ctx.module("m").unwrap();
    assert_eq!(m.name(), "m");
    assert_eq!(m.namespace(), "urn:m");
    assert_eq!(m.prefix(), Some("m"));
    assert_eq!(m.revision(), Some("2025-02-02"));
}

#[test]
fn unknown_statement_is_rejected_at_load() {
    let source = module("m").with_child(stmt("frobnicate", Some("x"), 4));
    let err = compile(&SourceSet::new().add_main(source)).unwrap_err();
    match err {
        BuildError::Source(err) => {
            assert!(err.message().contains("unknown statement `frobnicate`"));
            assert_eq!(err.source_ref().line(), 4);
        }
        other => panic!("expected source error, got {other}"),
    }
}

#[test]
fn argument_typing_is_enforced_at_load() {
    let source = module("m").with_child(
        container("c", 4).with_child(stmt("config", Some("yes"), 5)),
    );
    let err = compile(&SourceSet::new().add_main(source)).unwrap_err();
    assert!(err.to_string().contains("not a valid boolean"));
}

#[test]
fn validator_rejects_misplaced_substatement() {
    let source = module("m").with_child(
        leaf("l", 4).with_child(stmt("presence", Some("p"), 5)),
    );
    let err = compile(&SourceSet::new().add_main(source)).unwrap_err();
    assert!(err
        .to_string()
        .contains("statement `presence` is not valid as a substatement of `leaf`"));
}

#[test]
fn validator_enforces_required_substatements() {
    let source = stmt("module", Some("m"), 1).with_child(stmt("prefix", Some("m"), 2));
    let err = compile(&SourceSet::new().add_main(source)).unwrap_err();
    assert!(err
        .to_string()
        .contains("requires at least 1 `namespace` substatement"));
}

#[test]
fn import_binds_prefix_across_sources() {
    let app = module("app").with_child(
        stmt("import", Some("lib"), 4).with_child(stmt("prefix", Some("lp"), 5)),
    );
    let lib = module("lib");
    let ctx = compile(&SourceSet::new().add_main(app).add_library(lib)).unwrap();

    // Main module first, library after.
    let names: Vec<_> = ctx.modules().map(|m| m.name().to_owned()).collect();
    assert_eq!(names, ["app", "lib"]);
    assert_eq!(ctx.resolve_prefix("app", "lp").unwrap().name(), "lib");
}

#[test]
fn missing_import_is_a_named_failure() {
    let app = module("app").with_child(
        stmt("import", Some("lib"), 4).with_child(stmt("prefix", Some("lp"), 5)),
    );
    let err = compile(&SourceSet::new().add_main(app)).unwrap_err();
    match err {
        BuildError::Inference(err) => {
            assert!(err.message().contains("imported module `lib` was not found"));
            assert_eq!(err.source_ref().line(), 4);
        }
        other => panic!("expected inference error, got {other}"),
    }
}

#[test]
fn import_cycle_reports_both_sides() {
    let a = module("a").with_child(
        stmt("import", Some("b"), 4).with_child(stmt("prefix", Some("b"), 5)),
    );
    let b = module("b").with_child(
        stmt("import", Some("a"), 4).with_child(stmt("prefix", Some("a"), 5)),
    );
    let err = compile(&SourceSet::new().add_main(a).add_main(b)).unwrap_err();
    match err {
        BuildError::Unresolved(err) => {
            assert_eq!(err.phase(), ModelPhase::SourceLinkage);
            assert_eq!(err.failures().len(), 2);
        }
        other => panic!("expected unresolved error, got {other}"),
    }
}

#[test]
fn include_folds_submodule_into_module() {
    let m = module("m").with_child(stmt("include", Some("s"), 4));
    let s = submodule("s", "m");
    let ctx = compile(&SourceSet::new().add_main(m).add_library(s)).unwrap();

    assert_eq!(ctx.modules().count(), 1);
    assert_eq!(ctx.module("m").unwrap().includes(), ["s"]);
}

#[test]
fn include_checks_ownership() {
    let m = module("m").with_child(stmt("include", Some("s"), 4));
    let other = module("other");
    let s = submodule("s", "other");
    let err = compile(
        &SourceSet::new()
            .add_main(m)
            .add_library(other)
            .add_library(s),
    )
    .unwrap_err();
    assert!(err
        .to_string()
        .contains("submodule `s` belongs to module `other`, not `m`"));
}

#[test]
fn included_definitions_land_in_the_module_tree() {
    let m = module("m").with_child(stmt("include", Some("s"), 4));
    let s = submodule("s", "m")
        .with_child(container("sub", 4).with_child(leaf("item", 5)));
    let ctx = compile(&SourceSet::new().add_main(m).add_library(s)).unwrap();

    // The submodule's schema nodes are part of the module's effective
    // tree, qualified by the module's namespace.
    let sub = ctx
        .module("m")
        .unwrap()
        .statement()
        .find_substatement("container")
        .unwrap()
        .clone();
    assert_eq!(sub.argument_str(), Some("sub"));
    assert_eq!(sub.schema_name(), Some(&QName::new("urn:m", "sub")));

    let path = yantra_core::SchemaPath::root()
        .child(QName::new("urn:m", "sub"))
        .child(QName::new("urn:m", "item"));
    let item = ctx.find_path(&path).unwrap();
    assert_eq!(item.argument_str(), Some("item"));
}

#[test]
fn module_level_uses_reaches_a_submodule_grouping() {
    let m = module("m")
        .with_child(stmt("include", Some("s"), 4))
        .with_child(stmt("uses", Some("g"), 5));
    let s = submodule("s", "m")
        .with_child(stmt("grouping", Some("g"), 4).with_child(leaf("item", 5)));
    let ctx = compile(&SourceSet::new().add_main(m).add_library(s)).unwrap();

    let item = ctx
        .module("m")
        .unwrap()
        .statement()
        .find_substatement("leaf")
        .unwrap()
        .clone();
    assert_eq!(item.argument_str(), Some("item"));
    assert_eq!(item.schema_name(), Some(&QName::new("urn:m", "item")));
}

#[test]
fn missing_include_is_a_named_failure() {
    let m = module("m").with_child(stmt("include", Some("s"), 4));
    let err = compile(&SourceSet::new().add_main(m)).unwrap_err();
    assert!(err
        .to_string()
        .contains("included submodule `s` was not found"));
}

#[test]
fn circular_submodule_includes_fail_to_converge() {
    let s1 = submodule("s1", "m").with_child(stmt("include", Some("s2"), 4));
    let s2 = submodule("s2", "m").with_child(stmt("include", Some("s1"), 4));
    let err = compile(&SourceSet::new().add_library(s1).add_library(s2)).unwrap_err();
    match err {
        BuildError::Unresolved(err) => {
            assert_eq!(err.phase(), ModelPhase::SourceLinkage);
            assert_eq!(err.failures().len(), 2);
        }
        other => panic!("expected unresolved error, got {other}"),
    }
}

#[test]
fn rpc_grows_implicit_parameter_slots() {
    let source = module("m").with_child(stmt("rpc", Some("ping"), 4));
    let ctx = compile(&SourceSet::new().add_main(source)).unwrap();

    let m = ctx.module("m").unwrap();
    let rpc = m.statement().find_substatement("rpc").unwrap();
    let input = rpc.find_substatement("input").unwrap();
    let output = rpc.find_substatement("output").unwrap();
    assert_eq!(input.schema_name(), Some(&QName::new("urn:m", "input")));
    assert_eq!(
        output.path().segments(),
        &[QName::new("urn:m", "ping"), QName::new("urn:m", "output")]
    );
}

#[test]
fn declared_rpc_slots_are_not_duplicated() {
    let source = module("m").with_child(
        stmt("rpc", Some("ping"), 4)
            .with_child(stmt("input", None, 5).with_child(leaf("payload", 6))),
    );
    let ctx = compile(&SourceSet::new().add_main(source)).unwrap();

    let rpc = ctx
        .module("m")
        .unwrap()
        .statement()
        .find_substatement("rpc")
        .unwrap()
        .clone();
    assert_eq!(rpc.substatements_of("input").count(), 1);
    assert_eq!(rpc.substatements_of("output").count(), 1);
    let input = rpc.find_substatement("input").unwrap();
    assert!(input.find_substatement("leaf").is_some());
}

#[test]
fn schema_paths_address_the_tree() {
    let source = module("m")
        .with_child(container("top", 4).with_child(leaf("name", 5)));
    let ctx = compile(&SourceSet::new().add_main(source)).unwrap();

    let path = yantra_core::SchemaPath::root()
        .child(QName::new("urn:m", "top"))
        .child(QName::new("urn:m", "name"));
    let found = ctx.find_path(&path).unwrap();
    assert_eq!(found.name().keyword(), "leaf");
    assert_eq!(found.argument_str(), Some("name"));
    assert_eq!(found.path(), &path);
}

#[test]
fn flags_capture_config_status_and_presence() {
    let source = module("m").with_child(
        container("top", 4)
            .with_child(stmt("config", Some("false"), 5))
            .with_child(stmt("presence", Some("explicit"), 6))
            .with_child(
                leaf("name", 7).with_child(stmt("status", Some("deprecated"), 8)),
            ),
    );
    let ctx = compile(&SourceSet::new().add_main(source)).unwrap();

    let top = ctx
        .module("m")
        .unwrap()
        .statement()
        .find_substatement("container")
        .unwrap()
        .clone();
    assert!(!top.flags().is_config());
    assert!(top.flags().is_config_explicit());
    assert!(top.flags().is_presence());

    let name = top.find_substatement("leaf").unwrap();
    assert!(!name.flags().is_config());
    assert!(!name.flags().is_config_explicit());
    assert_eq!(name.flags().status(), yantra_core::Status::Deprecated);
}

#[test]
fn unsupported_features_prune_guarded_statements() {
    let source = || {
        module("m")
            .with_child(stmt("feature", Some("adv"), 4))
            .with_child(leaf("plain", 5))
            .with_child(leaf("guarded", 6).with_child(stmt("if-feature", Some("adv"), 6)))
    };

    let all = compile(&SourceSet::new().add_main(source())).unwrap();
    assert_eq!(
        all.module("m")
            .unwrap()
            .statement()
            .substatements_of("leaf")
            .count(),
        2
    );

    let none = compile(
        &SourceSet::new()
            .add_main(source())
            .with_supported_features(Vec::<String>::new()),
    )
    .unwrap();
    let m = none.module("m").unwrap();
    assert_eq!(m.statement().substatements_of("leaf").count(), 1);
    assert_eq!(
        m.statement().find_substatement("leaf").unwrap().argument_str(),
        Some("plain")
    );
}

#[test]
fn import_metadata_is_profile_gated() {
    let import_with_docs = || {
        stmt("import", Some("lib"), 5)
            .with_child(stmt("prefix", Some("lp"), 6))
            .with_child(stmt("description", Some("why"), 7))
    };

    let legacy = module("app").with_child(import_with_docs());
    let err = compile(&SourceSet::new().add_main(legacy).add_library(module("lib"))).unwrap_err();
    assert!(err
        .to_string()
        .contains("statement `description` is not valid as a substatement of `import`"));

    let current = module("app")
        .with_child(stmt("yang-version", Some("1.1"), 4))
        .with_child(import_with_docs());
    compile(&SourceSet::new().add_main(current).add_library(module("lib"))).unwrap();
}

#[test]
fn unsupported_language_version_is_rejected() {
    let source = module("m").with_child(stmt("yang-version", Some("2"), 4));
    let err = compile(&SourceSet::new().add_main(source)).unwrap_err();
    assert!(err.to_string().contains("unsupported language version `2`"));
}

#[test]
fn duplicate_schema_siblings_collide() {
    let source = module("m")
        .with_child(leaf("x", 4))
        .with_child(stmt("container", Some("x"), 7));
    let err = compile(&SourceSet::new().add_main(source)).unwrap_err();
    match err {
        BuildError::Source(err) => {
            assert!(err.message().contains("duplicate schema node `x`"));
            assert_eq!(err.source_ref().line(), 7);
            assert_eq!(err.related().unwrap().line(), 4);
        }
        other => panic!("expected source error, got {other}"),
    }
}

#[test]
fn rebuilds_are_deterministic() {
    let source = || {
        module("m").with_child(
            container("top", 4)
                .with_child(leaf("a", 5))
                .with_child(leaf("b", 6)),
        )
    };
    let first = compile(&SourceSet::new().add_main(source())).unwrap();
    let second = compile(&SourceSet::new().add_main(source())).unwrap();
    assert!(first
        .module("m")
        .unwrap()
        .statement()
        .structurally_equal(second.module("m").unwrap().statement()));
}

#[test]
fn element_bounds_are_typed_integers() {
    let source = module("m").with_child(
        stmt("leaf-list", Some("tags"), 4)
            .with_child(stmt("type", Some("string"), 5))
            .with_child(stmt("min-elements", Some("1"), 6))
            .with_child(stmt("max-elements", Some("8"), 7)),
    );
    let ctx = compile(&SourceSet::new().add_main(source)).unwrap();

    let tags = ctx
        .module("m")
        .unwrap()
        .statement()
        .find_substatement("leaf-list")
        .unwrap()
        .clone();
    let bound = |kw: &str| tags.find_substatement(kw).unwrap().argument().as_int();
    assert_eq!(bound("min-elements"), Some(1));
    assert_eq!(bound("max-elements"), Some(8));

    let bad = module("b").with_child(
        stmt("list", Some("l"), 4).with_child(stmt("min-elements", Some("many"), 5)),
    );
    let err = compile(&SourceSet::new().add_main(bad)).unwrap_err();
    assert!(err.to_string().contains("not a valid integer"));
}

#[test]
fn deferred_actions_wait_for_their_phase() {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    use yantra_core::{Argument, SourceRef, StatementName};

    use crate::{
        ActionBuilder, ArgKind, LanguageProfile, Reactor, ReactorCtx, SourceError,
        StatementRegistry, StatementSupport,
    };

    // Registers an action for the declaration phase during pre-linkage
    // and records what the build looked like when it fired.
    struct StageRecorder {
        name: StatementName,
        fired: Rc<RefCell<Option<(ModelPhase, bool)>>>,
    }

    impl StatementSupport for StageRecorder {
        fn name(&self) -> &StatementName {
            &self.name
        }

        fn parse_argument(
            &self,
            raw: Option<&str>,
            at: &SourceRef,
        ) -> Result<Argument, SourceError> {
            ArgKind::Str.parse(&self.name, raw, at)
        }

        fn on_pre_linkage(
            &self,
            rx: &mut ReactorCtx<'_>,
            ctx: crate::CtxId,
        ) -> Result<(), BuildError> {
            let at = rx.tree().source_ref(ctx).clone();
            let fired = Rc::clone(&self.fired);
            let mut builder = ActionBuilder::new(ModelPhase::FullDeclaration, &at);
            builder.apply(move |rx, _| {
                let linked = rx
                    .tree()
                    .roots()
                    .iter()
                    .all(|r| rx.tree().has_completed(*r, ModelPhase::SourceLinkage));
                *fired.borrow_mut() = Some((rx.stage(), linked));
                Ok(())
            });
            rx.register(ctx, builder);
            Ok(())
        }
    }

    let fired = Rc::new(RefCell::new(None));
    let mut registry = StatementRegistry::with_defaults();
    registry.register(
        LanguageProfile::Legacy,
        Arc::new(StageRecorder {
            name: StatementName::core("contact").with_argument("text"),
            fired: Rc::clone(&fired),
        }),
    );

    let source = module("m").with_child(stmt("contact", Some("ops"), 4));
    Reactor::with_registry(registry)
        .build(&SourceSet::new().add_main(source))
        .unwrap();

    // The action has no prerequisites, yet it is held until its own
    // phase: by then linkage has completed on every root.
    let recorded = *fired.borrow();
    let (stage, linked) = recorded.unwrap();
    assert_eq!(stage, ModelPhase::FullDeclaration);
    assert!(linked);
}

#[test]
fn identities_reach_the_effective_model() {
    let source = module("m")
        .with_child(stmt("identity", Some("animal"), 4))
        .with_child(
            stmt("identity", Some("cat"), 5).with_child(stmt("base", Some("animal"), 6)),
        );
    let ctx = compile(&SourceSet::new().add_main(source)).unwrap();

    let m = ctx.module("m").unwrap();
    assert_eq!(m.statement().substatements_of("identity").count(), 2);
    let cat = m
        .statement()
        .substatements_of("identity")
        .find(|i| i.argument_str() == Some("cat"))
        .unwrap();
    assert_eq!(
        cat.find_substatement("base").unwrap().argument_str(),
        Some("animal")
    );
}

#[test]
fn identity_names_are_unique_build_wide() {
    let a = module("a").with_child(stmt("identity", Some("animal"), 4));
    let b = module("b").with_child(stmt("identity", Some("animal"), 4));
    let err = compile(&SourceSet::new().add_main(a).add_main(b)).unwrap_err();
    assert!(err.to_string().contains("duplicate identity `animal`"));
}

#[test]
fn sources_survive_a_serde_round_trip() {
    let source = module("m").with_child(leaf("x", 4));
    let json = serde_json::to_string(&source).unwrap();
    let back: yantra_core::RawStatement = serde_json::from_str(&json).unwrap();

    let ctx = compile(&SourceSet::new().add_main(back)).unwrap();
    assert!(ctx
        .module("m")
        .unwrap()
        .statement()
        .find_substatement("leaf")
        .is_some());
}

#[test]
fn source_order_does_not_change_the_model() {
    let app = || {
        module("app").with_child(
            stmt("import", Some("lib"), 4).with_child(stmt("prefix", Some("lp"), 5)),
        )
    };
    let lib = || module("lib").with_child(leaf("item", 4));

    let forward = compile(&SourceSet::new().add_main(app()).add_library(lib())).unwrap();
    let reversed = compile(&SourceSet::new().add_library(lib()).add_main(app())).unwrap();

    for name in ["app", "lib"] {
        assert!(forward
            .module(name)
            .unwrap()
            .statement()
            .structurally_equal(reversed.module(name).unwrap().statement()));
    }
}
