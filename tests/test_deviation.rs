//! Deviations: not-supported, add, replace, delete and the permitted
//! deviation filter.

use yang_reactor::{
    BuildFailure, BuildOptions, EffectiveModel, EffectiveStatement, Keyword, QNameModule, Reactor,
    SourceRole, SourceSet,
};

use std::sync::Arc;

const DEVICE: &str = r#"
module device {
    yang-version 1.1;
    namespace "urn:device";
    prefix d;

    grouping limits {
        leaf max-sessions {
            type uint16;
            default 16;
        }
    }

    container system {
        leaf hostname {
            type string;
            must "string-length(.) > 0";
        }
        leaf contact { type string; }
        leaf-list servers {
            type string;
            default "ntp1";
            default "ntp2";
        }
        uses limits;
    }
}
"#;

fn build_with(options: BuildOptions, deviations: &str) -> Result<EffectiveModel, BuildFailure> {
    let mut set = SourceSet::new();
    set.add_text(SourceRole::Main, "device.yang", DEVICE).unwrap();
    set.add_text(SourceRole::Main, "deviations.yang", deviations).unwrap();
    Reactor::new(options).build(&set)
}

fn build(deviations: &str) -> Result<EffectiveModel, BuildFailure> {
    build_with(BuildOptions::default(), deviations)
}

fn deviating(body: &str) -> String {
    format!(
        r#"
        module device-dev {{
            yang-version 1.1;
            namespace "urn:device-dev";
            prefix dd;
            import device {{ prefix d; }}
            {body}
        }}
        "#
    )
}

fn system(model: &EffectiveModel) -> Arc<EffectiveStatement> {
    model
        .find_module_by_name("device")
        .and_then(|m| m.find_data_child("system"))
        .cloned()
        .unwrap()
}

fn raw(node: &EffectiveStatement, keyword: Keyword) -> Option<String> {
    node.find_substatement(keyword)
        .and_then(|s| s.raw_argument())
        .map(str::to_string)
}

#[test]
fn test_not_supported_removes_node() {
    let dev = deviating(r#"deviation "/d:system/d:contact" { deviate not-supported; }"#);
    let model = build(&dev).unwrap();
    let system = system(&model);
    assert!(system.find_child("contact").is_none());
    assert!(system.find_child("hostname").is_some());
}

#[test]
fn test_not_supported_reaches_uses_copies() {
    let dev = deviating(r#"deviation "/d:system/d:max-sessions" { deviate not-supported; }"#);
    let model = build(&dev).unwrap();
    assert!(system(&model).find_child("max-sessions").is_none());
}

#[test]
fn test_add_units() {
    let dev = deviating(r#"deviation "/d:system/d:contact" { deviate add { units "chars"; } }"#);
    let model = build(&dev).unwrap();
    let contact = system(&model).find_child("contact").cloned().unwrap();
    assert_eq!(raw(&contact, Keyword::Units).as_deref(), Some("chars"));
}

#[test]
fn test_add_existing_singleton_fails() {
    let dev = deviating(r#"deviation "/d:system/d:max-sessions" { deviate add { default 32; } }"#);
    let failure = build(&dev).unwrap_err();
    assert!(
        failure
            .cause
            .to_string()
            .contains("deviate add cannot add 'default' to 'max-sessions' because it already exists")
    );
}

#[test]
fn test_add_default_to_leaf_list_appends() {
    let dev = deviating(r#"deviation "/d:system/d:servers" { deviate add { default "ntp3"; } }"#);
    let model = build(&dev).unwrap();
    let servers = system(&model).find_child("servers").cloned().unwrap();
    let defaults: Vec<_> = servers
        .find_substatements(Keyword::Default)
        .filter_map(|d| d.raw_argument())
        .collect();
    assert_eq!(defaults, vec!["ntp1", "ntp2", "ntp3"]);
}

#[test]
fn test_replace_type() {
    let dev = deviating(r#"deviation "/d:system/d:max-sessions" { deviate replace { type uint32; } }"#);
    let model = build(&dev).unwrap();
    let leaf = system(&model).find_child("max-sessions").cloned().unwrap();
    assert_eq!(leaf.type_definition().unwrap().builtin_type().as_str(), "uint32");
    assert_eq!(raw(&leaf, Keyword::Default).as_deref(), Some("16"));
}

#[test]
fn test_replace_absent_config_adds_it() {
    let dev = deviating(r#"deviation "/d:system/d:contact" { deviate replace { config false; } }"#);
    let model = build(&dev).unwrap();
    let contact = system(&model).find_child("contact").cloned().unwrap();
    assert_eq!(contact.config(), Some(false));
}

#[test]
fn test_replace_absent_units_fails() {
    let dev = deviating(r#"deviation "/d:system/d:contact" { deviate replace { units "x"; } }"#);
    let failure = build(&dev).unwrap_err();
    assert!(failure.cause.to_string().contains("cannot replace 'units' of 'contact'"));
}

#[test]
fn test_replace_leaf_list_default_is_rejected() {
    let dev = deviating(r#"deviation "/d:system/d:servers" { deviate replace { default "x"; } }"#);
    let failure = build(&dev).unwrap_err();
    assert!(
        failure
            .cause
            .to_string()
            .contains("deviate replace cannot apply 'default' to leaf-list 'servers'")
    );
}

#[test]
fn test_delete_must() {
    let dev = deviating(
        r#"deviation "/d:system/d:hostname" { deviate delete { must "string-length(.) > 0"; } }"#,
    );
    let model = build(&dev).unwrap();
    let hostname = system(&model).find_child("hostname").cloned().unwrap();
    assert!(hostname.find_substatement(Keyword::Must).is_none());
}

#[test]
fn test_delete_missing_value_fails() {
    let dev = deviating(r#"deviation "/d:system/d:servers" { deviate delete { default "ntp9"; } }"#);
    let failure = build(&dev).unwrap_err();
    assert!(
        failure
            .cause
            .to_string()
            .contains("cannot remove 'default ntp9' from 'servers' because it does not exist")
    );
}

#[test]
fn test_property_must_fit_target() {
    let dev = deviating(r#"deviation "/d:system" { deviate add { units "x"; } }"#);
    let failure = build(&dev).unwrap_err();
    assert!(
        failure
            .cause
            .to_string()
            .contains("deviate add cannot apply 'units' to container 'system'")
    );
}

#[test]
fn test_unpermitted_deviation_is_skipped() {
    let options = BuildOptions::default().with_supported_deviations(
        QNameModule::new("urn:device", None),
        [QNameModule::new("urn:someone-else", None)],
    );
    let dev = deviating(r#"deviation "/d:system/d:contact" { deviate not-supported; }"#);
    let model = build_with(options, &dev).unwrap();
    assert!(system(&model).find_child("contact").is_some());
}

#[test]
fn test_permitted_deviation_applies() {
    let options = BuildOptions::default().with_supported_deviations(
        QNameModule::new("urn:device", None),
        [QNameModule::new("urn:device-dev", None)],
    );
    let dev = deviating(r#"deviation "/d:system/d:contact" { deviate not-supported; }"#);
    let model = build_with(options, &dev).unwrap();
    assert!(system(&model).find_child("contact").is_none());
}

#[test]
fn test_self_deviation_fails() {
    let source = r#"
        module selfish {
            namespace "urn:selfish";
            prefix s;
            leaf a { type string; }
            deviation "/s:a" { deviate not-supported; }
        }
    "#;
    let mut set = SourceSet::new();
    set.add_text(SourceRole::Main, "selfish.yang", source).unwrap();
    let failure = Reactor::default().build(&set).unwrap_err();
    assert!(
        failure
            .cause
            .to_string()
            .contains("deviation target '/s:a' is defined in the deviating module itself")
    );
}

#[test]
fn test_missing_deviation_target_is_reported() {
    let dev = deviating(r#"deviation "/d:system/d:absent" { deviate not-supported; }"#);
    let failure = build(&dev).unwrap_err();
    assert!(
        failure
            .cause
            .to_string()
            .contains("deviation target '/d:system/d:absent' not found")
    );
}

#[test]
fn test_deviation_reaches_augmented_nodes() {
    let deviator = r#"
        module box-dev {
            yang-version 1.1;
            namespace "urn:box-dev";
            prefix bd;
            import box { prefix b; }
            import box-aug { prefix a; }
            deviation "/b:box/a:extra" { deviate not-supported; }
            deviation "/b:box/a:size" { deviate add { units "bytes"; } }
        }
    "#;
    let base = r#"
        module box {
            yang-version 1.1;
            namespace "urn:box";
            prefix b;
            container box {
                leaf label { type string; }
            }
        }
    "#;
    let augmenter = r#"
        module box-aug {
            yang-version 1.1;
            namespace "urn:box-aug";
            prefix a;
            import box { prefix b; }
            augment "/b:box" {
                leaf extra { type string; }
                leaf size { type uint32; }
            }
        }
    "#;
    let mut set = SourceSet::new();
    set.add_text(SourceRole::Main, "box-dev.yang", deviator).unwrap();
    set.add_text(SourceRole::Main, "box.yang", base).unwrap();
    set.add_text(SourceRole::Main, "box-aug.yang", augmenter).unwrap();
    let model = Reactor::default().build(&set).unwrap();

    let container = model
        .find_module_by_name("box")
        .and_then(|m| m.find_data_child("box"))
        .cloned()
        .unwrap();
    assert!(container.find_child("extra").is_none());
    assert!(container.find_child("label").is_some());
    let size = container.find_child("size").cloned().unwrap();
    assert_eq!(size.qname().unwrap().module.namespace, "urn:box-aug");
    assert_eq!(raw(&size, Keyword::Units).as_deref(), Some("bytes"));
}
