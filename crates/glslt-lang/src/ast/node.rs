use std::cell::{Ref, RefMut};
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::rc::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::error::TreeError;
use super::kind::{NodeKind, Role, Shape, SlotSpec};
use crate::literal::Literal;
use crate::root::{Root, RootInner};
use crate::{Shared, SharedCell};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique node identity. Ids grow monotonically, so ordering by id is
/// ordering by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Slot {
    One(Option<Node>),
    Many(Vec<Node>),
}

impl Slot {
    fn empty(spec: &SlotSpec) -> Self {
        if spec.many {
            Slot::Many(Vec::new())
        } else {
            Slot::One(None)
        }
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        match self {
            Slot::One(node) => node.as_slice(),
            Slot::Many(nodes) => nodes,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) enum Membership {
    #[default]
    Unattached,
    Attached(Weak<RootInner>),
    Deleted,
}

/// Public view of a node's membership.
#[derive(Debug, Clone, PartialEq)]
pub enum MembershipState {
    Unattached,
    Attached(Root),
    Deleted,
}

pub(crate) struct NodeData {
    id: NodeId,
    kind: NodeKind,
    slots: Vec<Slot>,
    parent: Option<Weak<SharedCell<NodeData>>>,
    membership: Membership,
    line: Option<u32>,
}

/// Where a node currently sits.
enum Location {
    Slot {
        parent: Node,
        slot: usize,
        index: Option<usize>,
    },
    Tree(Root),
    Free,
}

/// A handle to a tree node. Cloning the handle does not copy the node; use
/// [`Node::deep_clone`] for that.
#[derive(Clone)]
pub struct Node(Shared<SharedCell<NodeData>>);

#[derive(Clone, Debug)]
pub struct WeakNode(Weak<SharedCell<NodeData>>);

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }

    pub(crate) fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Shared::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Shared::as_ptr(&self.0).hash(state);
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let data = self.data();
        f.debug_struct("Node")
            .field("id", &data.id)
            .field("kind", &data.kind)
            .finish()
    }
}

impl Node {
    pub fn new(kind: NodeKind) -> Node {
        let slots = kind.shape().layout().iter().map(Slot::empty).collect();

        Node(Shared::new(SharedCell::new(NodeData {
            id: NodeId::next(),
            kind,
            slots,
            parent: None,
            membership: Membership::Unattached,
            line: None,
        })))
    }

    /// Creates a node and places `children` into the slots named by their roles.
    /// Children for list slots are appended in iteration order.
    pub fn build(
        kind: NodeKind,
        children: impl IntoIterator<Item = (Role, Node)>,
    ) -> Result<Node, TreeError> {
        let node = Node::new(kind);

        for (role, child) in children {
            let (_, spec) = node.slot_spec(role)?;
            if spec.many {
                node.push_child(role, child)?;
            } else {
                node.set_child(role, Some(child))?;
            }
        }

        Ok(node)
    }

    pub fn identifier(name: impl Into<SmolStr>) -> Node {
        Node::new(NodeKind::Identifier(name.into()))
    }

    pub fn reference(name: impl Into<SmolStr>) -> Node {
        Node::with_fresh_slots(
            NodeKind::ReferenceExpression,
            vec![Slot::One(Some(Node::identifier(name)))],
        )
    }

    pub fn literal_expression(literal: Literal) -> Node {
        Node::new(NodeKind::LiteralExpression(literal))
    }

    pub fn int_literal(value: i64) -> Node {
        Node::literal_expression(Literal::int(value))
    }

    /// Builds a node from slots whose nodes were all created by the caller and
    /// are not linked anywhere yet.
    fn with_fresh_slots(kind: NodeKind, slots: Vec<Slot>) -> Node {
        let node = Node::new(kind);
        for child in slots.iter().flat_map(Slot::nodes) {
            child.data_mut().parent = Some(Shared::downgrade(&node.0));
        }
        node.data_mut().slots = slots;
        node
    }

    fn data(&self) -> Ref<'_, NodeData> {
        self.0.borrow()
    }

    fn data_mut(&self) -> RefMut<'_, NodeData> {
        self.0.borrow_mut()
    }

    pub fn id(&self) -> NodeId {
        self.data().id
    }

    pub fn kind(&self) -> Ref<'_, NodeKind> {
        Ref::map(self.data(), |data| &data.kind)
    }

    pub fn shape(&self) -> Shape {
        self.data().kind.shape()
    }

    pub fn is(&self, shape: Shape) -> bool {
        self.shape() == shape
    }

    /// Logical source line recorded by the parser, if any.
    pub fn line(&self) -> Option<u32> {
        self.data().line
    }

    pub fn set_line(&self, line: Option<u32>) {
        self.data_mut().line = line;
    }

    /// The name carried by an identifier node.
    pub fn name(&self) -> Option<SmolStr> {
        match &self.data().kind {
            NodeKind::Identifier(name) => Some(name.clone()),
            _ => None,
        }
    }

    /// The value carried by a literal expression.
    pub fn literal(&self) -> Option<Literal> {
        match &self.data().kind {
            NodeKind::LiteralExpression(literal) => Some(literal.clone()),
            _ => None,
        }
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Shared::downgrade(&self.0))
    }

    pub fn parent(&self) -> Option<Node> {
        self.data()
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Node)
    }

    /// All children in slot order. Empty single slots are skipped.
    pub fn children(&self) -> Vec<Node> {
        self.data()
            .slots
            .iter()
            .flat_map(|slot| slot.nodes().iter().cloned())
            .collect()
    }

    pub fn child(&self, role: Role) -> Option<Node> {
        let index = self.shape().slot_index(role)?;
        self.data().slots[index].nodes().first().cloned()
    }

    pub fn children_of(&self, role: Role) -> Vec<Node> {
        match self.shape().slot_index(role) {
            Some(index) => self.data().slots[index].nodes().to_vec(),
            None => Vec::new(),
        }
    }

    /// The role of the slot holding this node in its parent.
    pub fn role_in_parent(&self) -> Option<Role> {
        match self.location() {
            Location::Slot { parent, slot, .. } => {
                parent.shape().layout().get(slot).map(|spec| spec.role)
            }
            _ => None,
        }
    }

    /// The position of this node within its parent's list slot.
    pub fn index_in_parent(&self) -> Option<usize> {
        match self.location() {
            Location::Slot { index, .. } => index,
            _ => None,
        }
    }

    pub fn root(&self) -> Option<Root> {
        match &self.data().membership {
            Membership::Attached(root) => root.upgrade().map(Root),
            _ => None,
        }
    }

    pub fn membership(&self) -> MembershipState {
        match &self.data().membership {
            Membership::Attached(root) => root
                .upgrade()
                .map(|root| MembershipState::Attached(Root(root)))
                .unwrap_or(MembershipState::Unattached),
            Membership::Unattached => MembershipState::Unattached,
            Membership::Deleted => MembershipState::Deleted,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self.data().membership, Membership::Deleted)
    }

    pub(crate) fn is_attached_to(&self, root: &Root) -> bool {
        match &self.data().membership {
            Membership::Attached(weak) => std::ptr::eq(weak.as_ptr(), Shared::as_ptr(&root.0)),
            _ => false,
        }
    }

    pub(crate) fn set_membership(&self, membership: Membership) {
        self.data_mut().membership = membership;
    }

    pub(crate) fn ensure_live(&self) -> Result<(), TreeError> {
        if self.is_deleted() {
            Err(TreeError::Deleted)
        } else {
            Ok(())
        }
    }

    pub fn nearest_ancestor(&self, predicate: impl Fn(&Node) -> bool) -> Option<Node> {
        let mut current = self.parent();

        while let Some(node) = current {
            if predicate(&node) {
                return Some(node);
            }
            current = node.parent();
        }

        None
    }

    pub fn nearest_ancestor_of(&self, shape: Shape) -> Option<Node> {
        self.nearest_ancestor(|node| node.is(shape))
    }

    pub fn has_ancestor(&self, ancestor: &Node) -> bool {
        self.nearest_ancestor(|node| node == ancestor).is_some()
    }

    /// This node followed by all of its descendants in pre-order.
    pub fn subtree(&self) -> Vec<Node> {
        let mut nodes = Vec::new();
        let mut stack = vec![self.clone()];

        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            nodes.push(node);
        }

        nodes
    }

    fn slot_spec(&self, role: Role) -> Result<(usize, SlotSpec), TreeError> {
        let shape = self.shape();
        shape
            .layout()
            .iter()
            .enumerate()
            .find(|(_, spec)| spec.role == role)
            .map(|(index, spec)| (index, *spec))
            .ok_or(TreeError::NoSuchSlot { shape, role })
    }

    fn list_slot(&self, role: Role) -> Result<usize, TreeError> {
        let (slot, spec) = self.slot_spec(role)?;
        if spec.many {
            Ok(slot)
        } else {
            Err(TreeError::NotAList {
                shape: self.shape(),
                role,
            })
        }
    }

    fn ensure_insertable(&self, child: &Node) -> Result<(), TreeError> {
        self.ensure_live()?;
        child.ensure_live()?;

        if child.parent().is_some() {
            return Err(TreeError::AlreadyHasParent);
        }
        if child == self || self.has_ancestor(child) {
            return Err(TreeError::Cycle);
        }

        Ok(())
    }

    /// Puts `child` into a single slot, returning the detached previous occupant.
    pub fn set_child(&self, role: Role, child: Option<Node>) -> Result<Option<Node>, TreeError> {
        let (slot, spec) = self.slot_spec(role)?;
        if spec.many {
            return Err(TreeError::NotASingleSlot {
                shape: self.shape(),
                role,
            });
        }
        self.ensure_live()?;
        if let Some(child) = &child {
            self.ensure_insertable(child)?;
        }

        let previous = match &mut self.data_mut().slots[slot] {
            Slot::One(current) => std::mem::replace(current, child.clone()),
            Slot::Many(_) => None,
        };

        if let Some(previous) = &previous {
            previous.release();
        }
        if let Some(child) = &child {
            self.adopt(child);
        }

        Ok(previous)
    }

    pub fn insert_child(&self, role: Role, index: usize, child: Node) -> Result<(), TreeError> {
        let slot = self.list_slot(role)?;
        self.ensure_insertable(&child)?;
        let shape = self.shape();

        {
            let mut data = self.data_mut();
            let Slot::Many(children) = &mut data.slots[slot] else {
                return Err(TreeError::NotAList { shape, role });
            };
            if index > children.len() {
                return Err(TreeError::IndexOutOfBounds {
                    index,
                    len: children.len(),
                });
            }
            children.insert(index, child.clone());
        }

        self.adopt(&child);
        Ok(())
    }

    pub fn push_child(&self, role: Role, child: Node) -> Result<(), TreeError> {
        let len = self.children_of(role).len();
        self.insert_child(role, len, child)
    }

    /// Detaches and returns the child at `index` of a list slot.
    pub fn remove_child(&self, role: Role, index: usize) -> Result<Node, TreeError> {
        let slot = self.list_slot(role)?;
        self.ensure_live()?;
        let shape = self.shape();

        let child = {
            let mut data = self.data_mut();
            match &mut data.slots[slot] {
                Slot::Many(children) if index < children.len() => children.remove(index),
                Slot::Many(children) => {
                    return Err(TreeError::IndexOutOfBounds {
                        index,
                        len: children.len(),
                    });
                }
                Slot::One(_) => return Err(TreeError::NotAList { shape, role }),
            }
        };

        child.release();
        Ok(child)
    }

    pub fn clear_children(&self, role: Role) -> Result<Vec<Node>, TreeError> {
        let slot = self.list_slot(role)?;
        self.ensure_live()?;

        let children = match &mut self.data_mut().slots[slot] {
            Slot::Many(children) => std::mem::take(children),
            Slot::One(_) => Vec::new(),
        };

        for child in &children {
            child.release();
        }
        Ok(children)
    }

    /// Removes this node from its parent (or from its root, if it is the root's
    /// tree) and unregisters its whole subtree. The node stays usable as a
    /// standalone tree.
    pub fn detach(&self) -> Result<(), TreeError> {
        self.ensure_live()?;

        let location = self.location();
        vacate(&location);
        self.release();

        Ok(())
    }

    /// Detaches this node and permanently invalidates it and its subtree.
    pub fn delete(&self) -> Result<(), TreeError> {
        self.detach()?;
        self.mark_deleted();
        Ok(())
    }

    pub fn detach_and_delete(&self) -> Result<(), TreeError> {
        self.delete()
    }

    fn mark_deleted(&self) {
        for node in self.subtree() {
            node.set_membership(Membership::Deleted);
        }
    }

    /// Puts `other` where this node is. This node ends up detached.
    /// Replacing a node by itself does nothing.
    pub fn replace_by(&self, other: &Node) -> Result<(), TreeError> {
        if self == other {
            return Ok(());
        }
        self.ensure_live()?;
        other.ensure_live()?;

        if other.parent().is_some() {
            return Err(TreeError::AlreadyHasParent);
        }
        if self.has_ancestor(other) {
            return Err(TreeError::Cycle);
        }

        let location = self.location();
        if matches!(location, Location::Free) {
            return Err(TreeError::NoParent);
        }

        other.relinquish_tree();
        put(&location, other);
        self.release();
        settle(&location, other);

        Ok(())
    }

    pub fn replace_by_and_delete(&self, other: &Node) -> Result<(), TreeError> {
        if self == other {
            return Ok(());
        }
        self.replace_by(other)?;
        self.mark_deleted();
        Ok(())
    }

    /// Exchanges the positions of two nodes, which may live under different
    /// parents or in different roots.
    pub fn swap(a: &Node, b: &Node) -> Result<(), TreeError> {
        if a == b {
            return Ok(());
        }
        a.ensure_live()?;
        b.ensure_live()?;

        if a.has_ancestor(b) || b.has_ancestor(a) {
            return Err(TreeError::NestedSwap);
        }

        let location_a = a.location();
        let location_b = b.location();

        put(&location_a, b);
        put(&location_b, a);
        settle(&location_a, b);
        settle(&location_b, a);

        Ok(())
    }

    /// Copies this subtree. The copy is unattached and shares nothing with the
    /// original.
    pub fn deep_clone(&self) -> Result<Node, TreeError> {
        self.ensure_live()?;

        let originals = self.subtree();
        let mut copies: FxHashMap<NodeId, Node> = FxHashMap::default();

        for original in &originals {
            let data = original.data();
            let copy = Node::new(data.kind.clone());
            copy.set_line(data.line);
            copies.insert(data.id, copy);
        }

        for original in &originals {
            let data = original.data();
            let copy = &copies[&data.id];
            let slots = data
                .slots
                .iter()
                .map(|slot| match slot {
                    Slot::One(child) => Slot::One(child.as_ref().map(|c| copies[&c.id()].clone())),
                    Slot::Many(children) => {
                        Slot::Many(children.iter().map(|c| copies[&c.id()].clone()).collect())
                    }
                })
                .collect::<Vec<_>>();

            for child in slots.iter().flat_map(Slot::nodes) {
                child.data_mut().parent = Some(Shared::downgrade(&copy.0));
            }
            copy.data_mut().slots = slots;
        }

        Ok(copies[&self.id()].clone())
    }

    /// Copies this subtree and registers the copy in `root` without placing it
    /// into the root's tree. The root only holds weak references, so the
    /// returned handle keeps the copy alive.
    pub fn clone_into(&self, root: &Root) -> Result<Node, TreeError> {
        let copy = self.deep_clone()?;
        root.attach_subtree(&copy);
        Ok(copy)
    }

    /// Replaces the payload of this node with another payload of the same shape.
    pub fn set_kind(&self, kind: NodeKind) -> Result<(), TreeError> {
        self.ensure_live()?;

        let expected = self.shape();
        let found = kind.shape();
        if expected != found {
            return Err(TreeError::WrongKind { expected, found });
        }

        let root = self.root().filter(|_| expected == Shape::Identifier);
        if let Some(root) = &root {
            root.unregister(self);
        }
        self.data_mut().kind = kind;
        if let Some(root) = &root {
            root.register(self);
        }

        Ok(())
    }

    pub fn set_name(&self, name: impl Into<SmolStr>) -> Result<(), TreeError> {
        if !self.is(Shape::Identifier) {
            return Err(TreeError::WrongKind {
                expected: Shape::Identifier,
                found: self.shape(),
            });
        }
        self.set_kind(NodeKind::Identifier(name.into()))
    }

    pub fn set_literal(&self, literal: Literal) -> Result<(), TreeError> {
        if !self.is(Shape::LiteralExpression) {
            return Err(TreeError::WrongKind {
                expected: Shape::LiteralExpression,
                found: self.shape(),
            });
        }
        self.set_kind(NodeKind::LiteralExpression(literal))
    }

    /// Applies `f` to an integer literal. Returns `false` for other literals.
    pub fn change_integer(&self, f: impl FnOnce(i64) -> i64) -> Result<bool, TreeError> {
        let updated = self
            .literal()
            .and_then(|literal| literal.as_int().and_then(|value| literal.with_int(f(value))));

        match updated {
            Some(literal) => self.set_literal(literal).map(|_| true),
            None => Ok(false),
        }
    }

    fn location(&self) -> Location {
        if let Some(parent) = self.parent() {
            let found = parent
                .data()
                .slots
                .iter()
                .enumerate()
                .find_map(|(slot, entry)| match entry {
                    Slot::One(Some(child)) if child == self => Some((slot, None)),
                    Slot::Many(children) => children
                        .iter()
                        .position(|child| child == self)
                        .map(|index| (slot, Some(index))),
                    _ => None,
                });

            if let Some((slot, index)) = found {
                return Location::Slot {
                    parent,
                    slot,
                    index,
                };
            }
        }

        match self.root() {
            Some(root) if root.tree().as_ref() == Some(self) => Location::Tree(root),
            _ => Location::Free,
        }
    }

    /// Links `child` under this node and moves its subtree into this node's root.
    fn adopt(&self, child: &Node) {
        child.relinquish_tree();
        child.data_mut().parent = Some(Shared::downgrade(&self.0));

        match self.root() {
            Some(root) => root.attach_subtree(child),
            None => child.release_from_root(),
        }
    }

    /// Unlinks this node from its parent pointer and unregisters its subtree.
    fn release(&self) {
        self.data_mut().parent = None;
        self.release_from_root();
    }

    /// Gives up the tree slot of this node's root if this node occupies it.
    pub(crate) fn relinquish_tree(&self) {
        if let Some(root) = self.root() {
            if root.tree().as_ref() == Some(self) {
                root.take_tree();
            }
        }
    }

    pub(crate) fn release_from_root(&self) {
        self.relinquish_tree();

        for node in self.subtree() {
            if let Some(root) = node.root() {
                root.unregister(&node);
            }
            node.set_membership(Membership::Unattached);
        }
    }
}

fn vacate(location: &Location) {
    match location {
        Location::Slot {
            parent,
            slot,
            index,
        } => {
            let mut data = parent.data_mut();
            match (&mut data.slots[*slot], index) {
                (Slot::One(child), None) => {
                    child.take();
                }
                (Slot::Many(children), Some(index)) => {
                    children.remove(*index);
                }
                _ => {}
            }
        }
        Location::Tree(root) => {
            root.take_tree();
        }
        Location::Free => {}
    }
}

fn put(location: &Location, node: &Node) {
    match location {
        Location::Slot {
            parent,
            slot,
            index,
        } => {
            let mut data = parent.data_mut();
            match (&mut data.slots[*slot], index) {
                (Slot::One(child), None) => *child = Some(node.clone()),
                (Slot::Many(children), Some(index)) => children[*index] = node.clone(),
                _ => {}
            }
        }
        Location::Tree(root) => root.put_tree(node.clone()),
        Location::Free => {}
    }
}

fn settle(location: &Location, node: &Node) {
    match location {
        Location::Slot { parent, .. } => parent.adopt(node),
        Location::Tree(root) => {
            node.data_mut().parent = None;
            root.attach_subtree(node);
        }
        Location::Free => node.release(),
    }
}
