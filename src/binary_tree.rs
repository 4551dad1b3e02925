//! A binary tree stored in a flat vector. Children are referenced by their
//! position in the vector, which keeps the whole tree serializable as-is.

use serde_derive::{Deserialize, Serialize};

/// Position of a node inside a [BinaryTree](struct.BinaryTree.html).
pub type TreeIndex = usize;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BinaryTreeNode<T> {
    /// Payload of the node.
    pub value: T,

    /// Position of this node in the arena.
    index: TreeIndex,

    /// Position of the left child. 0 means no child, since 0 is the root.
    left: TreeIndex,

    /// Position of the right child. 0 means no child.
    right: TreeIndex,
}

impl<T> BinaryTreeNode<T> {
    /// Wrap a value into a detached node.
    ///
    /// # Example
    /// ```
    /// use taxi_fare::binary_tree::BinaryTreeNode;
    /// let node = BinaryTreeNode::new(3.5);
    /// assert_eq!(node.value, 3.5);
    /// assert!(node.is_leaf());
    /// ```
    pub fn new(value: T) -> Self {
        BinaryTreeNode {
            value,
            index: 0,
            left: 0,
            right: 0,
        }
    }

    pub fn index(&self) -> TreeIndex {
        self.index
    }

    /// A node without any child.
    pub fn is_leaf(&self) -> bool {
        self.left == 0 && self.right == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryTree<T> {
    nodes: Vec<BinaryTreeNode<T>>,
}

impl<T> Default for BinaryTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BinaryTree<T> {
    pub fn new() -> Self {
        BinaryTree { nodes: Vec::new() }
    }

    /// Insert the root node and return its index.
    ///
    /// # Example
    /// ```
    /// use taxi_fare::binary_tree::{BinaryTree, BinaryTreeNode};
    /// let mut tree: BinaryTree<f32> = BinaryTree::new();
    /// let root_index = tree.add_root(BinaryTreeNode::new(10.0));
    /// assert_eq!(root_index, tree.get_root_index());
    /// ```
    pub fn add_root(&mut self, root: BinaryTreeNode<T>) -> TreeIndex {
        self.add_node(0, false, root)
    }

    pub fn get_root_index(&self) -> TreeIndex {
        0
    }

    pub fn get_root(&self) -> Option<&BinaryTreeNode<T>> {
        self.nodes.first()
    }

    pub fn get_left_child(&self, node: &BinaryTreeNode<T>) -> Option<&BinaryTreeNode<T>> {
        if node.left == 0 {
            None
        } else {
            self.nodes.get(node.left)
        }
    }

    pub fn get_right_child(&self, node: &BinaryTreeNode<T>) -> Option<&BinaryTreeNode<T>> {
        if node.right == 0 {
            None
        } else {
            self.nodes.get(node.right)
        }
    }

    pub fn get_node(&self, index: TreeIndex) -> Option<&BinaryTreeNode<T>> {
        self.nodes.get(index)
    }

    pub fn get_node_mut(&mut self, index: TreeIndex) -> Option<&mut BinaryTreeNode<T>> {
        self.nodes.get_mut(index)
    }

    /// Attach `child` on the left of `parent` and return the child's index.
    ///
    /// # Example
    /// ```
    /// use taxi_fare::binary_tree::{BinaryTree, BinaryTreeNode};
    /// let mut tree: BinaryTree<u8> = BinaryTree::new();
    /// let root_index = tree.add_root(BinaryTreeNode::new(1));
    /// tree.add_left_node(root_index, BinaryTreeNode::new(2));
    /// let root = tree.get_root().unwrap();
    /// assert_eq!(tree.get_left_child(root).unwrap().value, 2);
    /// assert!(tree.get_right_child(root).is_none());
    /// ```
    pub fn add_left_node(&mut self, parent: TreeIndex, child: BinaryTreeNode<T>) -> TreeIndex {
        self.add_node(parent, true, child)
    }

    pub fn add_right_node(&mut self, parent: TreeIndex, child: BinaryTreeNode<T>) -> TreeIndex {
        self.add_node(parent, false, child)
    }

    // The first inserted node always becomes the root, whatever `parent` says.
    fn add_node(
        &mut self,
        parent: TreeIndex,
        is_left: bool,
        mut child: BinaryTreeNode<T>,
    ) -> TreeIndex {
        let position = self.nodes.len();
        child.index = position;
        self.nodes.push(child);

        if position == 0 {
            return position;
        }
        if let Some(n) = self.nodes.get_mut(parent) {
            if is_left {
                n.left = position;
            } else {
                n.right = position;
            }
        }
        position
    }

    /// Render the tree depth first, one node per line, children indented
    /// under their parent.
    pub fn dump(&self) -> String
    where
        T: std::fmt::Debug,
    {
        let mut out = String::new();
        let mut stack: Vec<(usize, Option<&BinaryTreeNode<T>>)> = vec![(0, self.get_root())];
        while let Some((depth, node_opt)) = stack.pop() {
            if let Some(node) = node_opt {
                for _ in 0..depth {
                    out.push_str("    ");
                }
                out.push_str(&format!("----{:?}\n", node.value));
                stack.push((depth + 1, self.get_right_child(node)));
                stack.push((depth + 1, self.get_left_child(node)));
            }
        }
        out
    }

    pub fn print(&self)
    where
        T: std::fmt::Debug,
    {
        print!("{}", self.dump());
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_tree() {
        let mut tree: BinaryTree<f32> = BinaryTree::new();
        let root_index = tree.add_root(BinaryTreeNode::new(10.0));

        let n1_index = tree.add_left_node(root_index, BinaryTreeNode::new(5.0));
        let n2_index = tree.add_right_node(root_index, BinaryTreeNode::new(6.0));
        tree.add_left_node(n2_index, BinaryTreeNode::new(7.0));
        tree.add_right_node(n2_index, BinaryTreeNode::new(8.0));
        tree.add_left_node(n1_index, BinaryTreeNode::new(9.0));

        assert_eq!(tree.len(), 6);
        let expected = [
            "----10.0",
            "    ----5.0",
            "        ----9.0",
            "    ----6.0",
            "        ----7.0",
            "        ----8.0",
        ];
        assert_eq!(tree.dump(), format!("{}\n", expected.join("\n")));
        tree.print();
    }

    #[test]
    fn children_of_a_leaf() {
        let mut tree: BinaryTree<i32> = BinaryTree::new();
        assert!(tree.is_empty());
        assert!(tree.get_root().is_none());

        let root_index = tree.add_root(BinaryTreeNode::new(1));
        let root = tree.get_node(root_index).unwrap();
        assert!(root.is_leaf());
        assert!(tree.get_left_child(root).is_none());

        let child = tree.add_right_node(root_index, BinaryTreeNode::new(2));
        assert_eq!(tree.get_node(child).unwrap().index(), child);
        assert!(!tree.get_root().unwrap().is_leaf());

        tree.get_node_mut(child).unwrap().value = 3;
        let root = tree.get_root().unwrap();
        assert_eq!(tree.get_right_child(root).unwrap().value, 3);
    }
}
