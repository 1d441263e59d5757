#![allow(missing_docs)]
#![cfg(not(feature = "loom"))]

// Grad mode is process-wide, so this binary holds a single test.

mod common;

use common::{Identity, TestConfig, TestValue};
use fngraph::{
    Edge, EdgeCollector, GradMode, Node, NoGradGuard, collect_next_edges, create_gradient_edge,
    types::EdgeList,
};

#[test]
fn disabled_grad_mode_skips_edge_collection() {
    let producer = Node::<TestConfig>::new(Identity, EdgeList::new());
    let mut x = TestValue::new(1.0, &[4]);
    create_gradient_edge(&mut x, producer.clone());
    let batch = vec![TestValue::undefined(), x.clone()];

    assert!(GradMode::is_enabled());
    let mixed = EdgeCollector::<TestConfig>::new()
        .value(&x)
        .values(&batch)
        .finish();
    assert_eq!(
        mixed,
        vec![
            Edge::new(producer.clone(), 0),
            Edge::default(),
            Edge::new(producer.clone(), 0)
        ]
    );

    {
        let _guard = NoGradGuard::new();
        assert!(!GradMode::is_enabled());
        assert!(collect_next_edges::<TestConfig>([&x]).is_empty());
        assert!(
            EdgeCollector::<TestConfig>::new()
                .value(&x)
                .values(&batch)
                .finish()
                .is_empty()
        );

        let _nested = NoGradGuard::new();
        assert!(!GradMode::is_enabled());
    }
    assert!(GradMode::is_enabled());
    assert_eq!(collect_next_edges::<TestConfig>([&x]).len(), 1);

    assert!(GradMode::set_enabled(false));
    assert!(!GradMode::set_enabled(true));
}
