//! Source linkage: import and include binding, revision selection, library
//! sources and submodule folding.

use yang_reactor::{BuildFailure, EffectiveModel, ModelPhase, Reactor, Revision, SourceRole, SourceSet};

fn build(sources: &[(SourceRole, &str)]) -> Result<EffectiveModel, BuildFailure> {
    let mut set = SourceSet::new();
    for (i, (role, text)) in sources.iter().enumerate() {
        set.add_text(*role, &format!("source{}.yang", i), text).unwrap();
    }
    Reactor::default().build(&set)
}

fn base_at(revision: &str) -> String {
    format!(
        r#"
        module base {{
            namespace "urn:base";
            prefix b;
            revision {revision};
            typedef counter {{ type uint32; }}
        }}
        "#
    )
}

const BASE_REVISIONLESS: &str = r#"
module base {
    namespace "urn:base";
    prefix b;
    typedef counter { type uint32; }
}
"#;

fn importer(name: &str, revision: Option<&str>) -> String {
    let revision = revision
        .map(|r| format!("revision-date {r};"))
        .unwrap_or_default();
    format!(
        r#"
        module {name} {{
            namespace "urn:{name}";
            prefix {name};
            import base {{ prefix b; {revision} }}
            leaf hits {{ type b:counter; }}
        }}
        "#
    )
}

#[test]
fn test_import_binds_required_revision() {
    let old = base_at("2020-01-01");
    let new = base_at("2021-01-01");
    let user = importer("user", Some("2020-01-01"));
    let model = build(&[
        (SourceRole::Library, &old),
        (SourceRole::Library, &new),
        (SourceRole::Main, &user),
    ])
    .unwrap();

    let user = model.find_module_by_name("user").unwrap();
    let bound = &user.imports()[0].module;
    assert_eq!(bound.revision, Some(Revision::parse("2020-01-01").unwrap()));
}

#[test]
fn test_import_without_revision_binds_latest() {
    let old = base_at("2020-01-01");
    let new = base_at("2021-01-01");
    let user = importer("user", None);
    let model = build(&[
        (SourceRole::Library, &new),
        (SourceRole::Library, &old),
        (SourceRole::Main, &user),
    ])
    .unwrap();

    let user = model.find_module_by_name("user").unwrap();
    assert_eq!(
        user.imports()[0].module.revision,
        Some(Revision::parse("2021-01-01").unwrap())
    );
}

fn latest_named<'m>(model: &'m EffectiveModel, prefix: &str) -> Option<&'m Revision> {
    let name = format!("{prefix}e");
    model.find_module_by_name(&name)?.revision()
}

#[test]
fn test_module_lookup_by_name_picks_latest_revision() {
    let old = base_at("2020-01-01");
    let new = base_at("2021-01-01");
    let model = build(&[(SourceRole::Main, &new), (SourceRole::Main, &old)]).unwrap();

    assert_eq!(model.find_modules_by_name("base").count(), 2);
    let latest = latest_named(&model, "bas");
    assert_eq!(latest, Some(&Revision::parse("2021-01-01").unwrap()));
}

#[test]
fn test_library_sources_are_not_reported() {
    let user = importer("user", None);
    let model = build(&[
        (SourceRole::Library, BASE_REVISIONLESS),
        (SourceRole::Main, &user),
    ])
    .unwrap();

    let names: Vec<_> = model.modules().map(|m| m.name().to_string()).collect();
    assert_eq!(names, vec!["user"]);
    assert!(model.find_module_by_name("base").is_none());

    let hits = model
        .find_module_by_name("user")
        .and_then(|m| m.find_data_child("hits"))
        .unwrap();
    let ty = hits.type_definition().unwrap();
    assert_eq!(ty.builtin_type().as_str(), "uint32");
    assert!(ty.chain().any(|t| t.name().local == "counter"));
}

#[test]
fn test_revisionless_source_satisfies_one_required_revision() {
    let user = importer("user", Some("2020-01-01"));
    let model = build(&[
        (SourceRole::Main, BASE_REVISIONLESS),
        (SourceRole::Main, &user),
    ])
    .unwrap();
    assert_eq!(model.modules().count(), 2);
}

#[test]
fn test_conflicting_required_revisions_fail() {
    let first = importer("first", Some("2020-01-01"));
    let second = importer("second", Some("2021-01-01"));
    let failure = build(&[
        (SourceRole::Main, BASE_REVISIONLESS),
        (SourceRole::Main, &first),
        (SourceRole::Main, &second),
    ])
    .unwrap_err();
    assert_eq!(failure.phase, ModelPhase::SourceLinkage);
    let message = failure.cause.to_string();
    assert!(message.contains("base is required at revision 2020-01-01 and at revision 2021-01-01"));
}

#[test]
fn test_missing_import_fails_linkage() {
    let user = importer("user", Some("2020-01-01"));
    let failure = build(&[(SourceRole::Main, &user)]).unwrap_err();
    assert_eq!(failure.phase, ModelPhase::SourceLinkage);
    assert!(
        failure
            .cause
            .to_string()
            .contains("imported module base@2020-01-01 was not found")
    );
}

#[test]
fn test_import_cycle_reports_both_edges() {
    let a = r#"
        module a {
            namespace "urn:a";
            prefix a;
            import b { prefix b; }
        }
    "#;
    let b = r#"
        module b {
            namespace "urn:b";
            prefix b;
            import a { prefix a; }
        }
    "#;
    let failure = build(&[(SourceRole::Main, a), (SourceRole::Main, b)]).unwrap_err();
    assert_eq!(failure.phase, ModelPhase::SourceLinkage);
    assert_eq!(failure.cause_count(), 2);
    let messages: Vec<String> = failure.causes().map(|c| c.to_string()).collect();
    assert!(messages[0].contains("dependency cycle through a -> b"));
    assert!(messages[1].contains("dependency cycle through b -> a"));
}

#[test]
fn test_duplicate_source_fails() {
    let failure = build(&[
        (SourceRole::Main, BASE_REVISIONLESS),
        (SourceRole::Main, BASE_REVISIONLESS),
    ])
    .unwrap_err();
    assert_eq!(failure.phase, ModelPhase::SourceLinkage);
    assert!(failure.cause.to_string().contains("source base is supplied more than once"));
}

const PARENT: &str = r#"
module parent {
    namespace "urn:parent";
    prefix p;
    include child;
    container main {
        uses shared;
    }
}
"#;

const CHILD: &str = r#"
submodule child {
    belongs-to parent { prefix p; }
    grouping shared {
        leaf flag { type boolean; }
    }
    container extra {
        leaf note { type string; }
    }
}
"#;

#[test]
fn test_submodule_content_folds_into_its_module() {
    let model = build(&[(SourceRole::Main, PARENT), (SourceRole::Main, CHILD)]).unwrap();
    let names: Vec<_> = model.modules().map(|m| m.name().to_string()).collect();
    assert_eq!(names, vec!["parent"]);

    let parent = model.find_module_by_name("parent").unwrap();
    assert_eq!(parent.submodules().len(), 1);
    assert_eq!(parent.submodules()[0].name(), "child");

    let extra = parent.find_data_child("extra").unwrap();
    assert_eq!(extra.qname().unwrap().module.namespace, "urn:parent");
    let flag = parent
        .find_data_child("main")
        .and_then(|m| m.find_child("flag"))
        .unwrap();
    assert_eq!(flag.qname().unwrap().module.namespace, "urn:parent");
}

#[test]
fn test_main_submodule_reports_its_parent() {
    let model = build(&[(SourceRole::Library, PARENT), (SourceRole::Main, CHILD)]).unwrap();
    let names: Vec<_> = model.modules().map(|m| m.name().to_string()).collect();
    assert_eq!(names, vec!["parent"]);
}

#[test]
fn test_missing_include_fails() {
    let failure = build(&[(SourceRole::Main, PARENT)]).unwrap_err();
    assert_eq!(failure.phase, ModelPhase::SourceLinkage);
    assert!(failure.cause.to_string().contains("included submodule child was not found"));
}
