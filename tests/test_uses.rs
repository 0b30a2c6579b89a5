//! Grouping instantiation: copies, sharing, refine and uses-augment.

use std::sync::Arc;

use yang_reactor::effective::Origin;
use yang_reactor::{BuildFailure, EffectiveModel, Keyword, ModelPhase, Reactor, SourceRole, SourceSet};

fn build(sources: &[&str]) -> Result<EffectiveModel, BuildFailure> {
    let mut set = SourceSet::new();
    for (i, text) in sources.iter().enumerate() {
        set.add_text(SourceRole::Main, &format!("source{}.yang", i), text).unwrap();
    }
    Reactor::default().build(&set)
}

fn names<'a>(nodes: impl Iterator<Item = &'a Arc<yang_reactor::EffectiveStatement>>) -> Vec<String> {
    nodes.filter_map(|n| n.qname().map(|q| q.local.to_string())).collect()
}

const ENDPOINTS: &str = r#"
module endpoints {
    yang-version 1.1;
    namespace "urn:endpoints";
    prefix ep;

    grouping endpoint {
        leaf address { type string; }
        leaf port { type uint16; }
    }

    container server {
        leaf name { type string; }
        uses endpoint;
        leaf enabled { type boolean; }
    }
    container client {
        uses endpoint;
    }
    container backup {
        uses endpoint {
            refine port {
                description "Backup port.";
                default 8080;
            }
        }
    }
}
"#;

#[test]
fn test_uses_inserts_at_uses_position() {
    let model = build(&[ENDPOINTS]).unwrap();
    let module = model.find_module_by_name("endpoints").unwrap();
    let server = module.find_data_child("server").unwrap();
    assert_eq!(names(server.child_nodes()), vec!["name", "address", "port", "enabled"]);

    let address = server.find_child("address").unwrap();
    assert_eq!(address.origin(), Origin::AddedByUses);
    assert!(address.is_added_by_uses());
    assert_eq!(address.qname().unwrap().module.namespace, "urn:endpoints");
}

#[test]
fn test_unrefined_copies_share_structure() {
    let model = build(&[ENDPOINTS]).unwrap();
    let module = model.find_module_by_name("endpoints").unwrap();
    let server = module.find_data_child("server").unwrap();
    let client = module.find_data_child("client").unwrap();

    let server_port = server.find_child("port").unwrap();
    let client_port = client.find_child("port").unwrap();
    assert!(Arc::ptr_eq(server_port.substatements(), client_port.substatements()));
    assert!(Arc::ptr_eq(server_port, client_port));
}

#[test]
fn test_refined_copy_is_distinct() {
    let model = build(&[ENDPOINTS]).unwrap();
    let module = model.find_module_by_name("endpoints").unwrap();
    let client = module.find_data_child("client").unwrap();
    let backup = module.find_data_child("backup").unwrap();

    let client_port = client.find_child("port").unwrap();
    let backup_port = backup.find_child("port").unwrap();
    assert!(!Arc::ptr_eq(client_port, backup_port));
    assert_eq!(client_port.qname(), backup_port.qname());
    assert_eq!(
        backup_port
            .find_substatement(Keyword::Default)
            .and_then(|d| d.raw_argument()),
        Some("8080")
    );
    assert!(client_port.find_substatement(Keyword::Default).is_none());

    // The untouched sibling keeps sharing.
    assert!(Arc::ptr_eq(
        client.find_child("address").unwrap(),
        backup.find_child("address").unwrap()
    ));
}

#[test]
fn test_copies_take_the_using_module_namespace() {
    let shared = r#"
        module shared {
            namespace "urn:shared";
            prefix sh;
            grouping stamp {
                leaf created { type string; }
            }
        }
    "#;
    let user = r#"
        module user {
            namespace "urn:user";
            prefix u;
            import shared { prefix sh; }
            container record {
                uses sh:stamp;
            }
        }
    "#;
    let model = build(&[shared, user]).unwrap();
    let record = model
        .find_module_by_name("user")
        .and_then(|m| m.find_data_child("record"))
        .unwrap();
    let created = record.find_child("created").unwrap();
    assert_eq!(created.qname().unwrap().module.namespace, "urn:user");
    assert_eq!(created.type_definition().unwrap().builtin_type().as_str(), "string");
}

#[test]
fn test_nested_uses_expand_inside_out() {
    let source = r#"
        module nested {
            namespace "urn:nested";
            prefix n;
            grouping inner {
                leaf depth { type uint8; }
            }
            grouping outer {
                container box {
                    uses inner;
                }
                leaf label { type string; }
            }
            container top {
                uses outer;
            }
        }
    "#;
    let model = build(&[source]).unwrap();
    let top = model
        .find_module_by_name("nested")
        .and_then(|m| m.find_data_child("top"))
        .unwrap();
    assert_eq!(names(top.child_nodes()), vec!["box", "label"]);
    let depth = top.find_child("box").and_then(|b| b.find_child("depth")).unwrap();
    assert_eq!(depth.origin(), Origin::AddedByUses);
}

#[test]
fn test_uses_augment_adds_to_copies() {
    let source = r#"
        module widget {
            yang-version 1.1;
            namespace "urn:widget";
            prefix w;
            grouping frame {
                container panel {
                    leaf color { type string; }
                }
            }
            container device {
                uses frame {
                    augment "panel" {
                        leaf size { type uint32; mandatory true; }
                    }
                }
            }
        }
    "#;
    let model = build(&[source]).unwrap();
    let panel = model
        .find_module_by_name("widget")
        .and_then(|m| m.find_data_child("device"))
        .and_then(|d| d.find_child("panel"))
        .unwrap();
    assert_eq!(names(panel.child_nodes()), vec!["color", "size"]);
    assert_eq!(panel.find_child("size").unwrap().origin(), Origin::AddedByUsesAugmentation);
    assert_eq!(panel.available_augmentations().len(), 1);
}

#[test]
fn test_refine_missing_target_fails() {
    let source = r#"
        module refine-missing {
            namespace "urn:rm";
            prefix rm;
            grouping g { leaf a { type string; } }
            container c {
                uses g {
                    refine b { description "none"; }
                }
            }
        }
    "#;
    let failure = build(&[source]).unwrap_err();
    assert_eq!(failure.phase, ModelPhase::FullDeclaration);
    assert!(failure.cause.to_string().contains("refine target 'b' not found"));
}

#[test]
fn test_refine_property_must_fit_target() {
    let source = r#"
        module refine-invalid {
            namespace "urn:ri";
            prefix ri;
            grouping g { leaf a { type string; } }
            container c {
                uses g {
                    refine a { presence "not for leaves"; }
                }
            }
        }
    "#;
    let failure = build(&[source]).unwrap_err();
    assert!(failure.cause.to_string().contains("refine cannot apply 'presence' to leaf 'a'"));
}

#[test]
fn test_grouping_cycle_reports_each_edge() {
    let source = r#"
        module loops {
            namespace "urn:loops";
            prefix l;
            grouping a { uses b; }
            grouping b { uses a; }
            container c { uses a; }
        }
    "#;
    let failure = build(&[source]).unwrap_err();
    assert_eq!(failure.phase, ModelPhase::FullDeclaration);
    assert_eq!(failure.cause_count(), 2);
    assert!(failure.causes().all(|c| c.to_string().contains("part of a cycle")));
}

#[test]
fn test_duplicate_grouping_is_reported() {
    let source = r#"
        module twice {
            namespace "urn:twice";
            prefix t;
            grouping g { leaf a { type string; } }
            grouping g { leaf b { type string; } }
        }
    "#;
    let failure = build(&[source]).unwrap_err();
    assert!(failure.cause.to_string().contains("duplicate grouping 'g'"));
}
