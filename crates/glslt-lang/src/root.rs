mod index;
mod trie;

use std::cell::Cell;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

use itertools::Itertools;
use smol_str::SmolStr;

use crate::ast::error::TreeError;
use crate::ast::kind::Shape;
use crate::ast::node::{Membership, Node, WeakNode};
use crate::{Shared, SharedCell};
use index::Indices;

static NEXT_ROOT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RootId(u64);

impl Display for RootId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "root#{}", self.0)
    }
}

/// Chooses which optional indices a new [`Root`] maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RootSupplier {
    pub prefix_index: bool,
}

impl RootSupplier {
    pub const DEFAULT: RootSupplier = RootSupplier {
        prefix_index: false,
    };
    pub const PREFIX: RootSupplier = RootSupplier { prefix_index: true };

    pub fn supply(&self) -> Root {
        Root::new(*self)
    }
}

pub(crate) struct RootInner {
    id: RootId,
    supplier: RootSupplier,
    tree: SharedCell<Option<Node>>,
    indices: SharedCell<Indices>,
    session_depth: Cell<usize>,
    pending: SharedCell<Vec<WeakNode>>,
}

/// Owns a tree and keeps indices over every node registered with it.
///
/// Indices hold weak references; nodes stay alive through the tree or through
/// handles held by the caller. While an index session is open, registrations
/// are queued and applied when the outermost session ends or when a query runs.
#[derive(Clone)]
pub struct Root(pub(crate) Shared<RootInner>);

impl PartialEq for Root {
    fn eq(&self, other: &Self) -> bool {
        Shared::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Root {}

impl Debug for Root {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root")
            .field("id", &self.0.id)
            .field("supplier", &self.0.supplier)
            .finish()
    }
}

impl Default for Root {
    fn default() -> Self {
        Root::new(RootSupplier::DEFAULT)
    }
}

impl Root {
    pub fn new(supplier: RootSupplier) -> Self {
        Root(Shared::new(RootInner {
            id: RootId(NEXT_ROOT_ID.fetch_add(1, Ordering::Relaxed)),
            supplier,
            tree: SharedCell::new(None),
            indices: SharedCell::new(Indices::new(supplier.prefix_index)),
            session_depth: Cell::new(0),
            pending: SharedCell::new(Vec::new()),
        }))
    }

    pub fn id(&self) -> RootId {
        self.0.id
    }

    pub fn supplier(&self) -> RootSupplier {
        self.0.supplier
    }

    pub fn has_prefix_index(&self) -> bool {
        self.0.indices.borrow().has_prefix_index()
    }

    pub fn tree(&self) -> Option<Node> {
        self.0.tree.borrow().clone()
    }

    /// Makes `node` the tree of this root and registers its subtree. The
    /// previous tree, if any, is unregistered and returned.
    pub fn set_tree(&self, node: &Node) -> Result<Option<Node>, TreeError> {
        node.ensure_live()?;
        if node.parent().is_some() {
            return Err(TreeError::AlreadyHasParent);
        }

        let previous = self.tree();
        if previous.as_ref() == Some(node) {
            return Ok(None);
        }

        node.relinquish_tree();
        self.put_tree(node.clone());
        if let Some(previous) = &previous {
            previous.release_from_root();
        }
        self.attach_subtree(node);

        Ok(previous)
    }

    pub(crate) fn take_tree(&self) -> Option<Node> {
        self.0.tree.borrow_mut().take()
    }

    pub(crate) fn put_tree(&self, node: Node) {
        *self.0.tree.borrow_mut() = Some(node);
    }

    pub fn is_session_active(&self) -> bool {
        self.0.session_depth.get() > 0
    }

    /// Moves the subtree under `node` into this root, unregistering it from
    /// whatever root it belonged to before.
    pub(crate) fn attach_subtree(&self, node: &Node) {
        let nodes = node.subtree();

        for member in &nodes {
            if let Some(previous) = member.root() {
                if previous != *self {
                    previous.unregister(member);
                }
            }
            member.set_membership(Membership::Attached(Shared::downgrade(&self.0)));
        }

        if self.is_session_active() {
            self.0.pending.borrow_mut().push(node.downgrade());
        } else {
            let mut indices = self.0.indices.borrow_mut();
            for member in &nodes {
                indices.insert(member);
            }
        }

        tracing::trace!(root = %self.id(), nodes = nodes.len(), "attached subtree");
    }

    pub(crate) fn register(&self, node: &Node) {
        if self.is_session_active() {
            self.0.pending.borrow_mut().push(node.downgrade());
        } else {
            self.0.indices.borrow_mut().insert(node);
        }
    }

    pub(crate) fn unregister(&self, node: &Node) {
        self.0.indices.borrow_mut().remove(node);
    }

    /// Runs `f` with index updates deferred. Sessions nest; the indices are
    /// brought up to date when the outermost one ends, even if `f` panics.
    pub fn with_index_session<T>(&self, f: impl FnOnce() -> T) -> T {
        self.0.session_depth.set(self.0.session_depth.get() + 1);
        let _session = scopeguard::guard((), |_| self.end_session());
        f()
    }

    /// Opens an index session in which standalone trees can be registered with
    /// this root.
    pub fn index_separate_trees<T>(&self, f: impl FnOnce(&Registrar<'_>) -> T) -> T {
        self.with_index_session(|| f(&Registrar { root: self }))
    }

    fn end_session(&self) {
        let depth = self.0.session_depth.get().saturating_sub(1);
        self.0.session_depth.set(depth);

        if depth == 0 {
            let registered = self.flush();
            let swept = self.0.indices.borrow_mut().sweep();
            tracing::debug!(root = %self.id(), registered, swept, "index session closed");
        }
    }

    /// Applies queued registrations. Nodes that moved to another root or were
    /// dropped in the meantime are skipped.
    fn flush(&self) -> usize {
        let pending = std::mem::take(&mut *self.0.pending.borrow_mut());
        if pending.is_empty() {
            return 0;
        }

        let mut indices = self.0.indices.borrow_mut();
        let mut registered = 0;
        for member in pending
            .iter()
            .filter_map(WeakNode::upgrade)
            .flat_map(|node| node.subtree())
            .filter(|node| node.is_attached_to(self))
        {
            indices.insert(&member);
            registered += 1;
        }
        registered
    }

    pub fn all_of_type(&self, shape: Shape) -> Vec<Node> {
        self.flush();
        self.0.indices.borrow().of_shape(shape)
    }

    pub fn count_of_type(&self, shape: Shape) -> usize {
        self.all_of_type(shape).len()
    }

    pub fn exactly_one_of_type(&self, shape: Shape) -> Result<Node, TreeError> {
        exactly_one(shape.to_string(), self.all_of_type(shape))
    }

    pub fn has_identifier(&self, name: &str) -> bool {
        !self.all_named(name).is_empty()
    }

    /// Identifier nodes currently named `name`.
    pub fn all_named(&self, name: &str) -> Vec<Node> {
        self.flush();
        self.0.indices.borrow().named(name)
    }

    pub fn exactly_one_named(&self, name: &str) -> Result<Node, TreeError> {
        exactly_one(format!("`{name}`"), self.all_named(name))
    }

    /// Identifier nodes whose names start with `prefix`. Requires a root
    /// supplied with a prefix index.
    pub fn matching_prefix(&self, prefix: &str) -> Result<PrefixMatches, TreeError> {
        if !self.has_prefix_index() {
            return Err(TreeError::PrefixIndexUnavailable);
        }

        Ok(PrefixMatches {
            root: self.clone(),
            prefix: prefix.into(),
            snapshot: None,
        })
    }

    fn prefix_snapshot(&self, prefix: &str) -> Vec<Node> {
        self.flush();
        self.0.indices.borrow().with_prefix(prefix)
    }
}

fn exactly_one(query: String, nodes: Vec<Node>) -> Result<Node, TreeError> {
    nodes
        .into_iter()
        .exactly_one()
        .map_err(|rest| TreeError::ExactlyOne {
            query: SmolStr::from(query),
            found: rest.count(),
        })
}

/// Handle passed to [`Root::index_separate_trees`] callbacks.
pub struct Registrar<'a> {
    root: &'a Root,
}

impl Registrar<'_> {
    pub fn root(&self) -> &Root {
        self.root
    }

    /// Registers a standalone tree with the root without placing it into the
    /// root's tree.
    pub fn register(&self, node: &Node) -> Result<Node, TreeError> {
        node.ensure_live()?;
        if node.parent().is_some() {
            return Err(TreeError::AlreadyHasParent);
        }
        if let Some(other) = node.root() {
            if other != *self.root {
                return Err(TreeError::CrossRoot);
            }
        }

        self.root.attach_subtree(node);
        Ok(node.clone())
    }
}

/// Lazily evaluated prefix query.
///
/// The matching set is captured on the first call to `next`, so renaming
/// nodes during iteration neither skips nor repeats entries. Nodes that left
/// the root after the capture are not yielded.
#[derive(Debug, Clone)]
pub struct PrefixMatches {
    root: Root,
    prefix: SmolStr,
    snapshot: Option<std::vec::IntoIter<Node>>,
}

impl PrefixMatches {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Discards the captured set; the next call to `next` queries again.
    pub fn restart(&mut self) {
        self.snapshot = None;
    }
}

impl Iterator for PrefixMatches {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        let root = &self.root;
        let prefix = &self.prefix;
        let snapshot = self
            .snapshot
            .get_or_insert_with(|| root.prefix_snapshot(prefix).into_iter());

        snapshot.find(|node| node.is_attached_to(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::kind::{NodeKind, Role};
    use rstest::rstest;

    fn tree_of(names: &[&str]) -> Node {
        Node::build(
            NodeKind::SequenceExpression,
            names.iter().map(|name| (Role::Expressions, Node::reference(*name))),
        )
        .unwrap()
    }

    #[test]
    fn test_set_tree_registers_nodes() {
        let root = Root::default();
        let tree = tree_of(&["a", "b", "a"]);

        assert_eq!(root.set_tree(&tree), Ok(None));

        assert_eq!(root.count_of_type(Shape::ReferenceExpression), 3);
        assert_eq!(root.all_named("a").len(), 2);
        assert!(root.has_identifier("b"));
        assert_eq!(tree.root(), Some(root.clone()));
    }

    #[test]
    fn test_replacing_tree_unregisters_previous() {
        let root = Root::default();
        let first = tree_of(&["a"]);
        root.set_tree(&first).unwrap();

        let previous = root.set_tree(&tree_of(&["b"])).unwrap();

        assert_eq!(previous, Some(first.clone()));
        assert_eq!(first.root(), None);
        assert!(!root.has_identifier("a"));
        assert!(root.has_identifier("b"));
    }

    #[rstest]
    #[case(&["a"], Ok(()))]
    #[case(&["a", "a"], Err(TreeError::ExactlyOne { query: "`a`".into(), found: 2 }))]
    #[case(&["b"], Err(TreeError::ExactlyOne { query: "`a`".into(), found: 0 }))]
    fn test_exactly_one_named(#[case] names: &[&str], #[case] expected: Result<(), TreeError>) {
        let root = Root::default();
        root.set_tree(&tree_of(names)).unwrap();

        assert_eq!(root.exactly_one_named("a").map(|_| ()), expected);
    }

    #[test]
    fn test_session_defers_registration() {
        let root = Root::default();
        let tree = tree_of(&["a"]);
        root.set_tree(&tree).unwrap();

        root.with_index_session(|| {
            tree.push_child(Role::Expressions, Node::reference("b")).unwrap();
            assert!(root.is_session_active());
            assert!(root.has_identifier("b"));
        });

        assert!(!root.is_session_active());
        assert!(root.has_identifier("b"));
    }

    #[test]
    fn test_nested_sessions_close_once() {
        let root = Root::default();
        root.with_index_session(|| {
            root.with_index_session(|| assert!(root.is_session_active()));
            assert!(root.is_session_active());
        });
        assert!(!root.is_session_active());
    }

    #[test]
    fn test_session_closes_on_panic() {
        let root = Root::default();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            root.with_index_session(|| panic!("boom"));
        }));

        assert!(result.is_err());
        assert!(!root.is_session_active());
    }

    #[test]
    fn test_registrar_rejects_foreign_nodes() {
        let root = Root::default();
        let other = Root::default();
        let foreign = tree_of(&["a"]);
        other.set_tree(&foreign).unwrap();
        let parent = tree_of(&["b"]);
        let child = parent.children()[0].clone();

        root.index_separate_trees(|registrar| {
            assert_eq!(registrar.register(&foreign), Err(TreeError::CrossRoot));
            assert_eq!(registrar.register(&child), Err(TreeError::AlreadyHasParent));

            let standalone = tree_of(&["c"]);
            assert_eq!(registrar.register(&standalone), Ok(standalone.clone()));
            assert!(registrar.root().has_identifier("c"));
        });
    }

    #[test]
    fn test_matching_prefix_requires_prefix_index() {
        let root = RootSupplier::DEFAULT.supply();
        assert_eq!(
            root.matching_prefix("a").map(|_| ()),
            Err(TreeError::PrefixIndexUnavailable)
        );
    }

    #[test]
    fn test_matching_prefix_is_restartable() {
        let root = RootSupplier::PREFIX.supply();
        root.set_tree(&tree_of(&["a", "ab", "b"])).unwrap();

        let mut matches = root.matching_prefix("a").unwrap();
        assert_eq!(matches.by_ref().count(), 2);
        assert_eq!(matches.next(), None);

        matches.restart();
        assert_eq!(matches.count(), 2);
    }

    #[test]
    fn test_matching_prefix_skips_detached_nodes() {
        let root = RootSupplier::PREFIX.supply();
        let tree = tree_of(&["a", "ab"]);
        root.set_tree(&tree).unwrap();

        let mut matches = root.matching_prefix("a").unwrap();
        let first = matches.next().unwrap();
        assert_eq!(first.name().as_deref(), Some("a"));

        tree.children()[1].detach().unwrap();
        assert_eq!(matches.next(), None);
    }
}
