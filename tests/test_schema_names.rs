//! Schema tree name uniqueness across submodules and choice cases.

use yang_reactor::{BuildFailure, EffectiveModel, ModelPhase, Reactor, SourceRole, SourceSet};

fn build(sources: &[&str]) -> Result<EffectiveModel, BuildFailure> {
    let mut set = SourceSet::new();
    for (i, text) in sources.iter().enumerate() {
        set.add_text(SourceRole::Main, &format!("source{}.yang", i), text).unwrap();
    }
    Reactor::default().build(&set)
}

fn submodule(name: &str, body: &str) -> String {
    format!(
        r#"
        submodule {name} {{
            belongs-to top {{ prefix t; }}
            {body}
        }}
        "#
    )
}

fn top(body: &str) -> String {
    format!(
        r#"
        module top {{
            namespace "urn:top";
            prefix t;
            include one;
            include two;
            {body}
        }}
        "#
    )
}

fn assert_duplicate(failure: &BuildFailure, name: &str) {
    assert_eq!(failure.phase, ModelPhase::FullDeclaration);
    let expected = format!("duplicate schema node '{}'", name);
    assert!(
        failure.causes().any(|c| c.to_string().contains(&expected)),
        "{}",
        failure
    );
}

#[test]
fn test_module_and_submodule_share_top_level() {
    let module = top("container x;");
    let one = submodule("one", "container x;");
    let two = submodule("two", "");
    let failure = build(&[&module, &one, &two]).unwrap_err();
    assert_duplicate(&failure, "x");
}

#[test]
fn test_two_submodules_share_top_level() {
    let module = top("");
    let one = submodule("one", "leaf y { type string; }");
    let two = submodule("two", "leaf y { type int8; }");
    let failure = build(&[&module, &one, &two]).unwrap_err();
    assert_duplicate(&failure, "y");
}

#[test]
fn test_distinct_submodule_names_build() {
    let module = top("container x;");
    let one = submodule("one", "leaf y { type string; }");
    let two = submodule("two", "leaf z { type string; }");
    let model = build(&[&module, &one, &two]).unwrap();
    let names: Vec<String> = model
        .find_module_by_name("top")
        .unwrap()
        .child_nodes()
        .filter_map(|n| n.qname().map(|q| q.local.to_string()))
        .collect();
    assert_eq!(names, vec!["x", "y", "z"]);
}

#[test]
fn test_nodes_in_different_cases_collide() {
    let source = r#"
        module pick {
            namespace "urn:pick";
            prefix p;
            choice ch {
                case one { leaf x { type string; } }
                case two { leaf x { type string; } }
            }
        }
    "#;
    let failure = build(&[source]).unwrap_err();
    assert_duplicate(&failure, "x");
}

#[test]
fn test_shorthand_case_does_not_collide_with_its_node() {
    let source = r#"
        module pick {
            namespace "urn:pick";
            prefix p;
            choice ch {
                leaf x { type string; }
                case two { leaf y { type string; } }
            }
        }
    "#;
    assert!(build(&[source]).is_ok());
}
