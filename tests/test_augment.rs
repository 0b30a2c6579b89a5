//! Augment splicing: placement, collisions, mandatory nodes and targets that
//! only appear after other inference.

use yang_reactor::effective::Origin;
use yang_reactor::{BuildFailure, EffectiveModel, EffectiveStatement, ModelPhase, Reactor, SourceRole, SourceSet};

fn build(sources: &[&str]) -> Result<EffectiveModel, BuildFailure> {
    let mut set = SourceSet::new();
    for (i, text) in sources.iter().enumerate() {
        set.add_text(SourceRole::Main, &format!("source{}.yang", i), text).unwrap();
    }
    Reactor::default().build(&set)
}

fn names(node: &EffectiveStatement) -> Vec<String> {
    node.child_nodes()
        .filter_map(|c| c.qname().map(|q| q.local.to_string()))
        .collect()
}

const NET: &str = r#"
module net {
    yang-version 1.1;
    namespace "urn:net";
    prefix n;

    grouping addressing {
        container address {
            leaf ip { type string; }
        }
    }

    container config {
        leaf hostname { type string; }
        choice transport {
            case tcp {
                leaf tcp-port { type uint16; }
            }
        }
        uses addressing;
    }
}
"#;

#[test]
fn test_mandatory_node_from_other_module_fails() {
    let extra = r#"
        module extra {
            yang-version 1.1;
            namespace "urn:extra";
            prefix x;
            import net { prefix n; }
            augment "/n:config" {
                leaf required { type string; mandatory true; }
            }
        }
    "#;
    let failure = build(&[NET, extra]).unwrap_err();
    assert_eq!(failure.phase, ModelPhase::FullDeclaration);
    assert!(
        failure
            .cause
            .to_string()
            .contains("cannot add node 'required' because it is mandatory")
    );
}

#[test]
fn test_conditional_augment_may_add_mandatory_node() {
    let extra = r#"
        module extra {
            yang-version 1.1;
            namespace "urn:extra";
            prefix x;
            import net { prefix n; }
            augment "/n:config" {
                when "n:hostname = 'edge'";
                leaf required { type string; mandatory true; }
            }
        }
    "#;
    let model = build(&[NET, extra]).unwrap();
    let config = model
        .find_module_by_name("net")
        .and_then(|m| m.find_data_child("config"))
        .unwrap();
    let required = config.find_child("required").unwrap();
    assert!(required.is_mandatory());
    assert_eq!(required.qname().unwrap().module.namespace, "urn:extra");
}

#[test]
fn test_same_module_may_add_mandatory_node() {
    let source = r#"
        module local {
            namespace "urn:local";
            prefix l;
            container settings {
                leaf a { type string; }
            }
            augment "/l:settings" {
                leaf b { type string; mandatory true; }
            }
        }
    "#;
    let model = build(&[source]).unwrap();
    let settings = model
        .find_module_by_name("local")
        .and_then(|m| m.find_data_child("settings"))
        .unwrap();
    assert_eq!(names(settings), vec!["a", "b"]);
}

#[test]
fn test_name_collision_fails() {
    let source = r#"
        module clash {
            namespace "urn:clash";
            prefix c;
            container settings {
                leaf a { type string; }
            }
            augment "/c:settings" {
                leaf a { type int8; }
            }
        }
    "#;
    let failure = build(&[source]).unwrap_err();
    assert!(
        failure
            .cause
            .to_string()
            .contains("cannot add node named 'a' because this name is already used in target")
    );
}

#[test]
fn test_choice_target_wraps_shorthand_in_case() {
    let extra = r#"
        module extra {
            namespace "urn:extra";
            prefix x;
            import net { prefix n; }
            augment "/n:config/n:transport" {
                leaf udp-port { type uint16; }
            }
        }
    "#;
    let model = build(&[NET, extra]).unwrap();
    let transport = model
        .find_module_by_name("net")
        .and_then(|m| m.find_data_child("config"))
        .and_then(|c| c.find_child("transport"))
        .unwrap();
    assert_eq!(names(transport), vec!["tcp", "udp-port"]);

    let case = transport.find_child("udp-port").unwrap();
    assert_eq!(case.keyword(), Some(yang_reactor::Keyword::Case));
    assert_eq!(case.origin(), Origin::AddedByAugmentation);
    let leaf = case.find_child("udp-port").unwrap();
    assert_eq!(leaf.keyword(), Some(yang_reactor::Keyword::Leaf));
    assert_eq!(leaf.qname().unwrap().module.namespace, "urn:extra");
}

#[test]
fn test_target_created_by_uses() {
    let extra = r#"
        module extra {
            namespace "urn:extra";
            prefix x;
            import net { prefix n; }
            augment "/n:config/n:address" {
                leaf mask { type uint8; }
            }
        }
    "#;
    let model = build(&[extra, NET]).unwrap();
    let address = model
        .find_module_by_name("net")
        .and_then(|m| m.find_data_child("config"))
        .and_then(|c| c.find_child("address"))
        .unwrap();
    assert_eq!(address.origin(), Origin::AddedByUses);
    assert_eq!(names(address), vec!["ip", "mask"]);
    assert_eq!(address.available_augmentations().len(), 1);
}

#[test]
fn test_target_created_by_another_augment() {
    let first = r#"
        module first {
            namespace "urn:first";
            prefix f;
            import net { prefix n; }
            augment "/n:config" {
                container stats {
                    leaf sent { type uint64; }
                }
            }
        }
    "#;
    let second = r#"
        module second {
            namespace "urn:second";
            prefix s;
            import net { prefix n; }
            import first { prefix f; }
            augment "/n:config/f:stats" {
                leaf received { type uint64; }
            }
        }
    "#;
    let model = build(&[second, NET, first]).unwrap();
    let stats = model
        .find_module_by_name("net")
        .and_then(|m| m.find_data_child("config"))
        .and_then(|c| c.find_child("stats"))
        .unwrap();
    assert_eq!(names(stats), vec!["sent", "received"]);
    assert_eq!(
        stats.find_child("received").unwrap().qname().unwrap().module.namespace,
        "urn:second"
    );
}

#[test]
fn test_leaf_cannot_be_augmented() {
    let extra = r#"
        module extra {
            namespace "urn:extra";
            prefix x;
            import net { prefix n; }
            augment "/n:config/n:hostname" {
                leaf nested { type string; }
            }
        }
    "#;
    let failure = build(&[NET, extra]).unwrap_err();
    assert!(
        failure
            .cause
            .to_string()
            .contains("augment target 'hostname' is a leaf, which cannot be augmented")
    );
}
