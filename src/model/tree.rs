use std::ops::{Index, IndexMut};

use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Handle to a node somewhere in the forest.
    pub struct NodeId;
}

/// Arena of ordered n-ary trees.
///
/// Children are held as an ordered `Vec` on each node, matching the
/// parallel children/sizes model of split containers. Parent links point
/// upward only and are used for notification and traversal, never for
/// ownership; the arena owns every node.
#[derive(Debug)]
pub struct Forest<T> {
    nodes: SlotMap<NodeId, Node<T>>,
}

#[derive(Debug)]
struct Node<T> {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    value: T,
}

impl<T> Default for Forest<T> {
    fn default() -> Self { Self::new() }
}

impl<T> Forest<T> {
    pub fn new() -> Self {
        Forest { nodes: SlotMap::default() }
    }

    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn contains(&self, id: NodeId) -> bool { self.nodes.contains_key(id) }

    pub fn get(&self, id: NodeId) -> Option<&T> { self.nodes.get(id).map(|n| &n.value) }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes.get_mut(id).map(|n| &mut n.value)
    }

    /// Inserts a new root node.
    pub fn insert_root(&mut self, value: T) -> NodeId {
        self.nodes.insert(Node { parent: None, children: Vec::new(), value })
    }

    /// Inserts a new node as a child of `parent` at `index` (clamped).
    #[track_caller]
    pub fn insert_child(&mut self, parent: NodeId, index: usize, value: T) -> NodeId {
        let id = self.insert_root(value);
        self.attach(id, parent, index);
        id
    }

    pub fn push_child(&mut self, parent: NodeId, value: T) -> NodeId {
        let index = self.children(parent).len();
        self.insert_child(parent, index, value)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn child_count(&self, id: NodeId) -> usize { self.children(id).len() }

    /// Position of `id` in its parent's child list.
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.contains(id) && self.parent(id).is_none()
    }

    /// Root of the tree containing `id`.
    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// All ancestors of `id`, starting with `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut next = self.contains(id).then_some(id);
        std::iter::from_fn(move || {
            let node = next;
            next = node.and_then(|n| self.parent(n));
            node
        })
    }

    /// Unlinks `id` from its parent, making it a root. Returns the old
    /// parent and child index, if any.
    pub fn detach(&mut self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let index = self.child_index(id)?;
        self.nodes[parent].children.remove(index);
        self.nodes[id].parent = None;
        Some((parent, index))
    }

    /// Links the root node `id` under `parent` at `index` (clamped).
    ///
    /// Attaching a node into its own subtree would create a cycle; that is
    /// a programming error and panics in debug builds.
    #[track_caller]
    pub fn attach(&mut self, id: NodeId, parent: NodeId, index: usize) {
        debug_assert!(self.parent(id).is_none(), "attach called on a non-root node");
        debug_assert!(
            self.ancestors(parent).all(|a| a != id),
            "attach would create a cycle"
        );
        let index = index.min(self.children(parent).len());
        self.nodes[parent].children.insert(index, id);
        self.nodes[id].parent = Some(parent);
    }

    /// Removes `id` and its whole subtree, returning the removed values in
    /// postorder.
    pub fn remove_subtree(&mut self, id: NodeId) -> Vec<T> {
        if !self.contains(id) {
            return Vec::new();
        }
        self.detach(id);
        let order = self.postorder(id);
        order
            .into_iter()
            .filter_map(|n| self.nodes.remove(n).map(|n| n.value))
            .collect()
    }

    /// Preorder traversal of the subtree rooted at `id`.
    pub fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    /// Postorder traversal of the subtree rooted at `id`.
    pub fn postorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        // (node, visited-children) stack to avoid recursion.
        let mut stack = vec![(id, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                out.push(node);
            } else {
                stack.push((node, true));
                stack.extend(self.children(node).iter().rev().map(|&c| (c, false)));
            }
        }
        out
    }

    /// Roots of every tree in the arena, in arbitrary order.
    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }
}

impl<T> Index<NodeId> for Forest<T> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: NodeId) -> &T { &self.nodes[index].value }
}

impl<T> IndexMut<NodeId> for Forest<T> {
    #[track_caller]
    fn index_mut(&mut self, index: NodeId) -> &mut T { &mut self.nodes[index].value }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A forest with the following structure:
    /// ```text
    ///         [tree]              [other]
    ///        __root__           other_root
    ///       /    |   \
    /// child1  child2  child3
    ///            |
    ///           gc1
    /// ```
    struct TestForest {
        forest: Forest<&'static str>,
        root: NodeId,
        child1: NodeId,
        child2: NodeId,
        child3: NodeId,
        gc1: NodeId,
        other_root: NodeId,
    }

    impl TestForest {
        fn new() -> Self {
            let mut forest = Forest::new();
            let root = forest.insert_root("root");
            let child1 = forest.push_child(root, "child1");
            let child2 = forest.push_child(root, "child2");
            let child3 = forest.push_child(root, "child3");
            let gc1 = forest.push_child(child2, "gc1");
            let other_root = forest.insert_root("other_root");
            TestForest { forest, root, child1, child2, child3, gc1, other_root }
        }
    }

    #[test]
    fn children_are_ordered() {
        let t = TestForest::new();
        assert_eq!(&[t.child1, t.child2, t.child3], t.forest.children(t.root));
        assert_eq!(&[t.gc1], t.forest.children(t.child2));
        assert!(t.forest.children(t.gc1).is_empty());
    }

    #[test]
    fn insert_child_at_index() {
        let mut t = TestForest::new();
        let first = t.forest.insert_child(t.root, 0, "first");
        let mid = t.forest.insert_child(t.root, 2, "mid");
        assert_eq!(
            &[first, t.child1, mid, t.child2, t.child3],
            t.forest.children(t.root)
        );
        assert_eq!(Some(2), t.forest.child_index(mid));
    }

    #[test]
    fn insert_child_index_is_clamped() {
        let mut t = TestForest::new();
        let last = t.forest.insert_child(t.root, 99, "last");
        assert_eq!(Some(3), t.forest.child_index(last));
    }

    #[test]
    fn ancestors_include_self() {
        let t = TestForest::new();
        let ancestors: Vec<_> = t.forest.ancestors(t.gc1).collect();
        assert_eq!(vec![t.gc1, t.child2, t.root], ancestors);
        assert_eq!(t.root, t.forest.root_of(t.gc1));
        assert_eq!(t.other_root, t.forest.root_of(t.other_root));
    }

    #[test]
    fn detach_makes_node_a_root() {
        let mut t = TestForest::new();
        let removed = t.forest.detach(t.child2);
        assert_eq!(Some((t.root, 1)), removed);
        assert!(t.forest.is_root(t.child2));
        assert_eq!(&[t.child1, t.child3], t.forest.children(t.root));
        // Subtree moves with the detached node.
        assert_eq!(&[t.gc1], t.forest.children(t.child2));
    }

    #[test]
    fn detach_then_attach_elsewhere() {
        let mut t = TestForest::new();
        t.forest.detach(t.child1);
        t.forest.attach(t.child1, t.child2, 0);
        assert_eq!(&[t.child1, t.gc1], t.forest.children(t.child2));
        assert_eq!(Some(t.child2), t.forest.parent(t.child1));
        assert_eq!(&[t.child2, t.child3], t.forest.children(t.root));
    }

    #[test]
    fn remove_subtree_removes_descendants() {
        let mut t = TestForest::new();
        let values = t.forest.remove_subtree(t.child2);
        assert_eq!(vec!["gc1", "child2"], values);
        assert!(!t.forest.contains(t.child2));
        assert!(!t.forest.contains(t.gc1));
        assert_eq!(&[t.child1, t.child3], t.forest.children(t.root));
        assert_eq!(4, t.forest.len());
    }

    #[test]
    fn traversal_orders() {
        let t = TestForest::new();
        assert_eq!(
            vec![t.root, t.child1, t.child2, t.gc1, t.child3],
            t.forest.preorder(t.root)
        );
        assert_eq!(
            vec![t.child1, t.gc1, t.child2, t.child3, t.root],
            t.forest.postorder(t.root)
        );
        assert_eq!(vec![t.child1], t.forest.preorder(t.child1));
    }

    #[test]
    fn roots_lists_every_tree() {
        let t = TestForest::new();
        let mut roots = t.forest.roots();
        roots.sort();
        let mut expected = vec![t.root, t.other_root];
        expected.sort();
        assert_eq!(expected, roots);
    }

    #[test]
    fn stale_ids_are_inert() {
        let mut t = TestForest::new();
        t.forest.remove_subtree(t.child2);
        assert!(t.forest.get(t.gc1).is_none());
        assert!(t.forest.children(t.gc1).is_empty());
        assert_eq!(None, t.forest.parent(t.gc1));
        assert_eq!(0, t.forest.ancestors(t.gc1).count());
        assert!(t.forest.remove_subtree(t.gc1).is_empty());
    }
}
