//! Tests for flattening and re-nesting trees

use std::collections::BTreeMap;

use rstest::{fixture, rstest};

use nestkit::domain::DEFAULT_SEPARATOR;
use nestkit::util::testing;
use nestkit::{flatten, unflatten, DomainError, ElementType, Elements, Flattener, Leaf, Node};

fn leaf(v: i64) -> Node {
    Node::Leaf(Leaf::from(v))
}

#[fixture]
fn experiment() -> Node {
    testing::init_test_setup();
    let weights = Leaf::new(
        ElementType::Float { bytes: 4 },
        vec![2, 3],
        Elements::Float(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]),
    )
    .unwrap();
    Node::group([
        (
            "model",
            Node::group([
                ("depth", leaf(4)),
                ("weights", Node::Leaf(weights)),
                ("name", Node::Leaf(Leaf::from("core"))),
            ]),
        ),
        (
            "trainer",
            Node::group([
                ("epochs", leaf(100)),
                ("schedule", Node::group([("gamma", Node::Leaf(Leaf::from(0.5)))])),
            ]),
        ),
        ("seed", leaf(42)),
    ])
}

#[rstest]
fn given_experiment_when_flatten_with_nested_names_then_keys_are_joined_paths(experiment: Node) {
    let flat = flatten(&experiment, true).unwrap();

    let keys: Vec<_> = flat.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "model_depth",
            "model_name",
            "model_weights",
            "seed",
            "trainer_epochs",
            "trainer_schedule_gamma",
        ]
    );
    assert_eq!(flat["model_weights"].shape(), &[2, 3]);
}

#[rstest]
fn given_experiment_when_flatten_with_flat_names_then_keys_are_leaf_names(experiment: Node) {
    let flat = flatten(&experiment, false).unwrap();

    let keys: Vec<_> = flat.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["depth", "epochs", "gamma", "name", "seed", "weights"]
    );
}

#[rstest]
fn given_experiment_when_flatten_then_unflatten_restores_tree(experiment: Node) {
    let flat = flatten(&experiment, true).unwrap();
    let rebuilt = unflatten(&flat, DEFAULT_SEPARATOR).unwrap();
    assert_eq!(rebuilt, experiment);
}

#[rstest]
#[case::spec_example(
    Node::group([("a", leaf(1)), ("b", Node::group([("a", leaf(2))]))]),
    false,
    "a"
)]
#[case::deep_collision(
    Node::group([
        ("x", Node::group([("y", Node::group([("z", leaf(1))]))])),
        ("w", Node::group([("z", leaf(2))])),
    ]),
    false,
    "z"
)]
#[case::joined_collision(
    Node::group([("a_b", leaf(1)), ("a", Node::group([("b", leaf(2))]))]),
    true,
    "a_b"
)]
#[case::ordered_vs_named(
    Node::group([("xs_0", leaf(1)), ("xs", Node::ordered([Leaf::from(2i64)]))]),
    true,
    "xs_0"
)]
fn given_colliding_keys_when_flatten_then_duplicate_key(
    #[case] tree: Node,
    #[case] keep_nested_name: bool,
    #[case] key: &str,
) {
    assert_eq!(
        flatten(&tree, keep_nested_name),
        Err(DomainError::DuplicateKey(key.to_string()))
    );
}

#[rstest]
#[case(true)]
#[case(false)]
fn given_single_level_tree_when_flatten_then_same_mapping(#[case] keep_nested_name: bool) {
    let mut entries = BTreeMap::new();
    entries.insert("alpha".to_string(), Leaf::from(1i64));
    entries.insert("beta".to_string(), Leaf::from("two"));
    let tree = Node::group(entries.clone());

    assert_eq!(flatten(&tree, keep_nested_name).unwrap(), entries);
}

#[test]
fn given_ordered_group_of_groups_when_flatten_then_index_then_name() {
    let tree = Node::group([(
        "runs",
        Node::ordered([
            Node::group([("loss", Node::Leaf(Leaf::from(0.3)))]),
            Node::group([("loss", Node::Leaf(Leaf::from(0.2)))]),
        ]),
    )]);

    let flat = flatten(&tree, true).unwrap();

    assert_eq!(flat["runs_0_loss"], Leaf::from(0.3));
    assert_eq!(flat["runs_1_loss"], Leaf::from(0.2));
}

#[test]
fn given_separator_when_flatten_then_keys_use_it_and_unflatten_matches() {
    let tree = Node::group([("a", Node::group([("b_c", leaf(1))]))]);
    let flattener = Flattener::new("/", true);

    let flat = flattener.flatten(&tree).unwrap();

    assert!(flat.contains_key("a/b_c"));
    assert_eq!(unflatten(&flat, flattener.separator()).unwrap(), tree);
}
