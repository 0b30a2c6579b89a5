//! Property tests over generated modules.
//!
//! Checks ordering guarantees that should hold for any input: declared
//! children keep their order, enum values count up from zero, augments
//! land in supply order whatever order the sources arrive in, and guarded
//! leaves follow the supported-feature set.
#![cfg(feature = "proptest")]

use proptest::prelude::*;
use yang_reactor::{
    BuildOptions, EffectiveModel, QName, QNameModule, Reactor, SourceRole, SourceSet,
};

// ============================================================================
// PROPTEST STRATEGIES
// ============================================================================

/// Distinct identifiers in generation order.
fn arb_names(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[a-z][a-z0-9]{0,7}", 1..max)
        .prop_map(|set| set.into_iter().map(|s| format!("n-{}", s)).collect())
}

fn build(sources: &[String]) -> EffectiveModel {
    let mut set = SourceSet::new();
    for (i, text) in sources.iter().enumerate() {
        set.add_text(SourceRole::Main, &format!("source{}.yang", i), text).unwrap();
    }
    Reactor::default().build(&set).unwrap()
}

fn target_module() -> String {
    r#"
    module target {
        namespace "urn:target";
        prefix t;
        container box {
            leaf first { type string; }
        }
    }
    "#
    .to_string()
}

fn augmenting_module(index: usize) -> String {
    format!(
        r#"
        module aug{index} {{
            namespace "urn:aug{index}";
            prefix a{index};
            import target {{ prefix t; }}
            augment "/t:box" {{
                leaf extra{index} {{ type uint8; }}
            }}
        }}
        "#
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_declared_leaves_keep_order(names in arb_names(12)) {
        let leaves: String = names
            .iter()
            .map(|n| format!("leaf {} {{ type string; }}\n", n))
            .collect();
        let source = format!(
            "module gen {{ namespace \"urn:gen\"; prefix g; container c {{ {} }} }}",
            leaves
        );
        let model = build(&[source]);
        let container = model
            .find_module_by_name("gen")
            .and_then(|m| m.find_data_child("c"))
            .unwrap();
        let built: Vec<String> = container
            .child_nodes()
            .filter_map(|n| n.qname().map(|q| q.local.to_string()))
            .collect();
        prop_assert_eq!(built, names);
    }

    #[test]
    fn test_enum_values_count_from_zero(names in arb_names(10)) {
        let enums: String = names.iter().map(|n| format!("enum {};\n", n)).collect();
        let source = format!(
            "module gen {{ namespace \"urn:gen\"; prefix g; leaf e {{ type enumeration {{ {} }} }} }}",
            enums
        );
        let model = build(&[source]);
        let leaf = model
            .find_module_by_name("gen")
            .and_then(|m| m.find_data_child("e"))
            .unwrap();
        let ty = leaf.type_definition().unwrap();
        let values: Vec<i32> = ty.inherited_enums().iter().map(|e| e.value).collect();
        let expected: Vec<i32> = (0..names.len() as i32).collect();
        prop_assert_eq!(values, expected);
    }

    #[test]
    fn test_augments_follow_supply_order(
        order in Just((0..5usize).collect::<Vec<_>>()).prop_shuffle(),
        target_slot in 0..6usize,
    ) {
        let mut sources: Vec<String> = order.iter().map(|&i| augmenting_module(i)).collect();
        sources.insert(target_slot.min(sources.len()), target_module());
        let model = build(&sources);

        let box_node = model
            .find_module_by_name("target")
            .and_then(|m| m.find_data_child("box"))
            .unwrap();
        let built: Vec<String> = box_node
            .child_nodes()
            .filter_map(|n| n.qname().map(|q| q.local.to_string()))
            .collect();
        let mut expected = vec!["first".to_string()];
        expected.extend(order.iter().map(|i| format!("extra{}", i)));
        prop_assert_eq!(built, expected);
        prop_assert_eq!(box_node.available_augmentations().len(), order.len());
    }

    #[test]
    fn test_guarded_leaves_follow_supported_features(
        supported in prop::collection::vec(any::<bool>(), 1..6),
    ) {
        let count = supported.len();
        let features: String = (0..count).map(|i| format!("feature f{};\n", i)).collect();
        let leaves: String = (0..count)
            .map(|i| format!("leaf l{i} {{ if-feature f{i}; type string; }}\n"))
            .collect();
        let source = format!(
            "module gen {{ namespace \"urn:gen\"; prefix g; {} container c {{ {} }} }}",
            features, leaves
        );
        let enabled: Vec<QName> = supported
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(|(i, _)| QName::new(QNameModule::new("urn:gen", None), format!("f{}", i)))
            .collect();

        let mut set = SourceSet::new();
        set.add_text(SourceRole::Main, "gen.yang", &source).unwrap();
        let options = BuildOptions::default().with_supported_features(enabled);
        let model = Reactor::new(options).build(&set).unwrap();

        let container = model
            .find_module_by_name("gen")
            .and_then(|m| m.find_data_child("c"))
            .unwrap();
        let built: Vec<String> = container
            .child_nodes()
            .filter_map(|n| n.qname().map(|q| q.local.to_string()))
            .collect();
        let expected: Vec<String> = supported
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(|(i, _)| format!("l{}", i))
            .collect();
        prop_assert_eq!(built, expected);
    }
}
