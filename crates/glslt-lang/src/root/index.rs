use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::trie::PrefixTrie;
use crate::ast::kind::Shape;
use crate::ast::node::{Node, NodeId, WeakNode};

/// Registered nodes keyed by id, so iteration follows creation order.
pub(crate) type Entries = BTreeMap<NodeId, WeakNode>;

pub(crate) fn live(entries: &Entries) -> impl Iterator<Item = Node> + '_ {
    entries.values().filter_map(WeakNode::upgrade)
}

fn sweep_entries(entries: &mut Entries) -> usize {
    let before = entries.len();
    entries.retain(|_, node| node.is_live());
    before - entries.len()
}

#[derive(Debug, Default)]
pub(crate) struct Indices {
    by_shape: FxHashMap<Shape, Entries>,
    by_name: FxHashMap<SmolStr, Entries>,
    prefixes: Option<PrefixTrie>,
}

impl Indices {
    pub fn new(prefix_index: bool) -> Self {
        Self {
            prefixes: prefix_index.then(PrefixTrie::default),
            ..Default::default()
        }
    }

    pub fn has_prefix_index(&self) -> bool {
        self.prefixes.is_some()
    }

    pub fn insert(&mut self, node: &Node) {
        let id = node.id();

        self.by_shape
            .entry(node.shape())
            .or_default()
            .insert(id, node.downgrade());

        if let Some(name) = node.name() {
            if let Some(trie) = &mut self.prefixes {
                trie.insert(&name, node);
            }
            self.by_name
                .entry(name)
                .or_default()
                .insert(id, node.downgrade());
        }
    }

    pub fn remove(&mut self, node: &Node) {
        let id = node.id();
        let shape = node.shape();

        if let Some(entries) = self.by_shape.get_mut(&shape) {
            entries.remove(&id);
            if entries.is_empty() {
                self.by_shape.remove(&shape);
            }
        }

        if let Some(name) = node.name() {
            if let Some(entries) = self.by_name.get_mut(&name) {
                entries.remove(&id);
                if entries.is_empty() {
                    self.by_name.remove(&name);
                }
            }
            if let Some(trie) = &mut self.prefixes {
                trie.remove(&name, id);
            }
        }
    }

    pub fn of_shape(&self, shape: Shape) -> Vec<Node> {
        self.by_shape
            .get(&shape)
            .map(|entries| live(entries).collect())
            .unwrap_or_default()
    }

    pub fn named(&self, name: &str) -> Vec<Node> {
        self.by_name
            .get(name)
            .map(|entries| live(entries).collect())
            .unwrap_or_default()
    }

    pub fn with_prefix(&self, prefix: &str) -> Vec<Node> {
        self.prefixes
            .as_ref()
            .map(|trie| trie.collect(prefix))
            .unwrap_or_default()
    }

    /// Drops entries whose nodes no longer exist. Returns how many were removed.
    pub fn sweep(&mut self) -> usize {
        let mut removed = 0;

        self.by_shape.retain(|_, entries| {
            removed += sweep_entries(entries);
            !entries.is_empty()
        });
        self.by_name.retain(|_, entries| {
            sweep_entries(entries);
            !entries.is_empty()
        });
        if let Some(trie) = &mut self.prefixes {
            trie.sweep();
        }

        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::kind::NodeKind;

    #[test]
    fn test_insert_and_remove() {
        let mut indices = Indices::new(true);
        let a = Node::identifier("a");
        let b = Node::identifier("ab");

        indices.insert(&a);
        indices.insert(&b);

        assert_eq!(indices.of_shape(Shape::Identifier), vec![a.clone(), b.clone()]);
        assert_eq!(indices.named("a"), vec![a.clone()]);
        assert_eq!(indices.with_prefix("a").len(), 2);

        indices.remove(&a);

        assert_eq!(indices.of_shape(Shape::Identifier), vec![b.clone()]);
        assert!(indices.named("a").is_empty());
        assert_eq!(indices.with_prefix("a"), vec![b]);
    }

    #[test]
    fn test_sweep_drops_dead_nodes() {
        let mut indices = Indices::new(false);
        let kept = Node::new(NodeKind::EmptyStatement);
        indices.insert(&kept);
        indices.insert(&Node::new(NodeKind::EmptyStatement));

        assert_eq!(indices.sweep(), 1);
        assert_eq!(indices.of_shape(Shape::EmptyStatement), vec![kept]);
    }

    #[test]
    fn test_prefix_lookup_without_trie() {
        let mut indices = Indices::new(false);
        indices.insert(&Node::identifier("a"));

        assert!(!indices.has_prefix_index());
        assert!(indices.with_prefix("a").is_empty());
    }
}
