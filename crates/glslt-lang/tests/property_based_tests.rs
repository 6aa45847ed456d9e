//! Property-based tests for index consistency under tree edits.
use std::collections::BTreeSet;

use glslt_lang::{Frontend, Node, NodeId, Root, RootSupplier, Shape};
use proptest::prelude::*;
use strum::IntoEnumIterator;

#[derive(Debug, Clone)]
enum Edit {
    Rename(usize, String),
    Detach(usize),
    Delete(usize),
    Swap(usize, usize),
    Clone(usize),
}

mod strategies {
    use super::*;

    /// Identifier names that never collide with GLSL keywords or builtin types.
    pub fn name() -> impl Strategy<Value = String> {
        "[a-c]{1,3}".prop_map(|s| format!("n_{s}"))
    }

    pub fn edit() -> impl Strategy<Value = Edit> {
        prop_oneof![
            (any::<usize>(), name()).prop_map(|(i, name)| Edit::Rename(i, name)),
            any::<usize>().prop_map(Edit::Detach),
            any::<usize>().prop_map(Edit::Delete),
            (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Edit::Swap(a, b)),
            any::<usize>().prop_map(Edit::Clone),
        ]
    }

    pub fn source() -> impl Strategy<Value = String> {
        prop::collection::vec((name(), prop::option::of(name())), 1..6).prop_map(|members| {
            let members = members
                .into_iter()
                .map(|(name, init)| match init {
                    Some(init) => format!("{name} = {init} + 1"),
                    None => name,
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("int {members}; void f() {{ int x = (1, 2, 3); }}")
        })
    }
}

fn pick(nodes: &[Node], index: usize) -> Option<Node> {
    if nodes.is_empty() {
        None
    } else {
        Some(nodes[index % nodes.len()].clone())
    }
}

fn apply(root: &Root, edit: &Edit, kept: &mut Vec<Node>) {
    let identifiers = root.all_of_type(Shape::Identifier);
    let expressions = root.all_of_type(Shape::LiteralExpression);

    match edit {
        Edit::Rename(i, name) => {
            if let Some(node) = pick(&identifiers, *i) {
                node.set_name(name.as_str()).unwrap();
            }
        }
        Edit::Detach(i) => {
            if let Some(node) = pick(&expressions, *i) {
                node.detach().unwrap();
                kept.push(node);
            }
        }
        Edit::Delete(i) => {
            if let Some(node) = pick(&expressions, *i) {
                node.delete().unwrap();
            }
        }
        Edit::Swap(a, b) => {
            if let (Some(a), Some(b)) = (pick(&identifiers, *a), pick(&identifiers, *b)) {
                Node::swap(&a, &b).unwrap();
            }
        }
        Edit::Clone(i) => {
            if let Some(node) = pick(&expressions, *i) {
                kept.push(node.clone_into(root).unwrap());
            }
        }
    }
}

fn reachable(root: &Root, extra: &[Node]) -> BTreeSet<NodeId> {
    root.tree()
        .into_iter()
        .chain(extra.iter().filter(|node| node.root().as_ref() == Some(root)).cloned())
        .flat_map(|node| node.subtree())
        .map(|node| node.id())
        .collect()
}

proptest! {
    #[test]
    fn indices_match_registered_nodes(
        source in strategies::source(),
        edits in prop::collection::vec(strategies::edit(), 0..20),
        session in any::<bool>(),
    ) {
        let root = RootSupplier::PREFIX.supply();
        Frontend::default().parse_translation_unit(&root, &source).unwrap();
        let mut kept = Vec::new();

        if session {
            root.with_index_session(|| {
                for edit in &edits {
                    apply(&root, edit, &mut kept);
                }
            });
        } else {
            for edit in &edits {
                apply(&root, edit, &mut kept);
            }
        }

        let expected = reachable(&root, &kept);
        let indexed: BTreeSet<NodeId> = Shape::iter()
            .flat_map(|shape| root.all_of_type(shape))
            .map(|node| node.id())
            .collect();
        prop_assert_eq!(&indexed, &expected);

        for identifier in root.all_of_type(Shape::Identifier) {
            let name = identifier.name().unwrap();
            prop_assert!(root.all_named(&name).contains(&identifier));
            prop_assert!(root.matching_prefix(&name).unwrap().any(|node| node == identifier));
        }
    }

    #[test]
    fn deep_clone_preserves_shapes(source in strategies::source()) {
        let root = Root::default();
        let tree = Frontend::default().parse_translation_unit(&root, &source).unwrap();
        let copy = tree.deep_clone().unwrap();

        let original: Vec<Shape> = tree.subtree().iter().map(Node::shape).collect();
        let cloned: Vec<Shape> = copy.subtree().iter().map(Node::shape).collect();
        prop_assert_eq!(original, cloned);
        prop_assert!(copy.subtree().iter().all(|node| node.root().is_none()));
    }
}
