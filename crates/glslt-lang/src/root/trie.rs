use std::collections::BTreeMap;

use super::index::{Entries, live};
use crate::ast::node::{Node, NodeId};

#[derive(Debug, Default)]
struct TrieNode {
    children: BTreeMap<char, TrieNode>,
    entries: Entries,
}

impl TrieNode {
    fn is_empty(&self) -> bool {
        self.children.is_empty() && self.entries.is_empty()
    }
}

/// Character trie over identifier names.
#[derive(Debug, Default)]
pub(crate) struct PrefixTrie {
    root: TrieNode,
}

impl PrefixTrie {
    pub fn insert(&mut self, name: &str, node: &Node) {
        let mut current = &mut self.root;
        for c in name.chars() {
            current = current.children.entry(c).or_default();
        }
        current.entries.insert(node.id(), node.downgrade());
    }

    pub fn remove(&mut self, name: &str, id: NodeId) -> bool {
        let chars: Vec<char> = name.chars().collect();
        remove_in(&mut self.root, &chars, id)
    }

    /// Every live node whose name starts with `prefix`, in lexicographic order
    /// of names.
    pub fn collect(&self, prefix: &str) -> Vec<Node> {
        let mut current = &self.root;
        for c in prefix.chars() {
            match current.children.get(&c) {
                Some(next) => current = next,
                None => return Vec::new(),
            }
        }

        let mut nodes = Vec::new();
        let mut stack = vec![current];
        while let Some(trie_node) = stack.pop() {
            nodes.extend(live(&trie_node.entries));
            stack.extend(trie_node.children.values().rev());
        }
        nodes
    }

    pub fn sweep(&mut self) {
        sweep_in(&mut self.root);
    }
}

fn remove_in(trie_node: &mut TrieNode, rest: &[char], id: NodeId) -> bool {
    match rest.split_first() {
        None => trie_node.entries.remove(&id).is_some(),
        Some((c, tail)) => {
            let Some(child) = trie_node.children.get_mut(c) else {
                return false;
            };
            let removed = remove_in(child, tail, id);
            if child.is_empty() {
                trie_node.children.remove(c);
            }
            removed
        }
    }
}

fn sweep_in(trie_node: &mut TrieNode) {
    trie_node.entries.retain(|_, node| node.is_live());
    trie_node.children.retain(|_, child| {
        sweep_in(child);
        !child.is_empty()
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn names(nodes: Vec<Node>) -> Vec<String> {
        nodes
            .into_iter()
            .filter_map(|node| node.name().map(|name| name.to_string()))
            .collect()
    }

    #[rstest]
    #[case("a", vec!["a", "ab", "abc"])]
    #[case("ab", vec!["ab", "abc"])]
    #[case("b", vec!["b"])]
    #[case("", vec!["a", "ab", "abc", "b"])]
    #[case("z", vec![])]
    fn test_collect(#[case] prefix: &str, #[case] expected: Vec<&str>) {
        let nodes = ["abc", "b", "a", "ab"].map(Node::identifier);
        let mut trie = PrefixTrie::default();
        for node in &nodes {
            trie.insert(&node.name().unwrap(), node);
        }

        assert_eq!(names(trie.collect(prefix)), expected);
    }

    #[test]
    fn test_remove_prunes_empty_branches() {
        let node = Node::identifier("abc");
        let mut trie = PrefixTrie::default();
        trie.insert("abc", &node);

        assert!(trie.remove("abc", node.id()));
        assert!(!trie.remove("abc", node.id()));
        assert!(trie.root.is_empty());
    }
}
