//! Module implement the ordered index as a left-leaning red-black tree,
//! each node augmented with its subtree cardinality.
//!
//! Mutations take exclusive ownership of the subtree they descend into
//! and return the new subtree root to the caller, so rebalancing is
//! folded into the unwind of a single recursive traversal. There is no
//! separate fix-it-up pass over the tree. Rotations and colour flips
//! carry the cached subtree sizes along with the links.

use log::debug;

use std::{borrow::Borrow, cmp::Ordering, fmt, mem};

use crate::{node::Node, Depth, Error, Result, Stats};

/// Maximum tree depth tolerated by [Index::validate].
pub const MAX_TREE_DEPTH: usize = 100;

/// Single instance of an in-memory ordered index, a left-leaning
/// red-black tree of `{key,value}` entries.
///
/// Keys must be unique and totally ordered, values are opaque payloads.
/// Along with the ordered-map contract, cached subtree sizes give
/// order-statistic queries, [Index::select] and [Index::rank], in
/// logarithmic time.
///
/// [Index] is not thread safe, applications requiring concurrent access
/// must provide external synchronization.
pub struct Index<K, V> {
    name: String,
    root: Option<Box<Node<K, V>>>,
    n_count: usize, // number of entries in the tree, mirrors root.size
}

impl<K, V> Drop for Index<K, V> {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            Self::drop_tree(root)
        }
    }
}

impl<K, V> Default for Index<K, V> {
    fn default() -> Index<K, V> {
        Index::new("rbos")
    }
}

impl<K, V> Clone for Index<K, V>
where
    K: Clone,
    V: Clone,
{
    fn clone(&self) -> Index<K, V> {
        Index {
            name: self.name.clone(),
            root: self.root.clone(),
            n_count: self.n_count,
        }
    }
}

/// Construction and maintenance API.
impl<K, V> Index<K, V> {
    /// Create an empty index, identified by `name`. Applications can
    /// choose unique names.
    pub fn new<S>(name: S) -> Index<K, V>
    where
        S: AsRef<str>,
    {
        let name = name.as_ref().to_string();
        debug!(target: "rbos", "creating index {:?}", name);

        Index {
            name,
            root: None,
            n_count: 0,
        }
    }

    /// Identify this index instance.
    #[inline]
    pub fn to_name(&self) -> String {
        self.name.clone()
    }

    /// Return number of entries in the index, this is an O(1) call.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_count
    }

    /// Return whether the index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_count == 0
    }

    /// Drop all entries, resetting the index to its empty state.
    pub fn clear(&mut self) {
        debug!(target: "rbos", "clearing index {:?}, {} entries", self.name, self.n_count);
        if let Some(root) = self.root.take() {
            Self::drop_tree(root)
        }
        self.n_count = 0;
    }

    // Tear the tree down breadth-first. Letting Box chain the drops
    // recurses as deep as the tree, this keeps the stack flat.
    fn drop_tree(node: Box<Node<K, V>>) {
        let mut stack = vec![node];
        while let Some(mut node) = stack.pop() {
            if let Some(left) = node.left.take() {
                stack.push(left)
            }
            if let Some(right) = node.right.take() {
                stack.push(right)
            }
        }
    }
}

/// Write operations.
impl<K, V> Index<K, V>
where
    K: Ord,
{
    /// Set `key`, `value` into the index. If an entry exists with the same
    /// key its value is replaced in place and returned, the tree structure
    /// is left untouched. Otherwise a new red leaf is linked in and the
    /// unwind rebalances every node along the search path.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        let root = self.root.take();
        let (mut root, old_value) = Self::upsert(root, key, value);
        root.set_black();

        self.root = Some(root);
        if old_value.is_none() {
            self.n_count += 1;
        }
        old_value
    }

    /// Remove `key` from the index, returning its value. Removing an
    /// absent key is a no-op and leaves the tree structurally unchanged.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        // the delete descent mutates the tree ahead of the search, probe
        // for presence first so that absent keys leave no trace.
        self.get(key)?;

        let root = self.root.take();
        let (root, old_node) = match Self::do_remove(root, key) {
            (None, old_node) => (None, old_node),
            (Some(mut root), old_node) => {
                root.set_black();
                (Some(root), old_node)
            }
        };
        self.root = root;

        old_node.map(|node| {
            self.n_count -= 1;
            node.value
        })
    }

    /// Remove the entry with the smallest key, return `None` on empty
    /// index.
    pub fn remove_min(&mut self) -> Option<(K, V)> {
        let root = self.root.take();
        let (root, min) = Self::do_remove_min(root);
        self.root = root.map(|mut root| {
            root.set_black();
            root
        });

        min.map(|node| {
            self.n_count -= 1;
            (node.key, node.value)
        })
    }

    /// Remove the entry with the largest key, return `None` on empty
    /// index.
    pub fn remove_max(&mut self) -> Option<(K, V)> {
        let root = self.root.take();
        let (root, max) = Self::do_remove_max(root);
        self.root = root.map(|mut root| {
            root.set_black();
            root
        });

        max.map(|node| {
            self.n_count -= 1;
            (node.key, node.value)
        })
    }

    fn upsert(node: Option<Box<Node<K, V>>>, key: K, value: V) -> (Box<Node<K, V>>, Option<V>) {
        let mut node = match node {
            Some(node) => node,
            None => return (Box::new(Node::new(key, value)), None),
        };

        match node.key.cmp(&key) {
            Ordering::Greater => {
                let (left, old_value) = Self::upsert(node.left.take(), key, value);
                node.left = Some(left);
                node.update_size();
                (Self::walkuprot_23(node), old_value)
            }
            Ordering::Less => {
                let (right, old_value) = Self::upsert(node.right.take(), key, value);
                node.right = Some(right);
                node.update_size();
                (Self::walkuprot_23(node), old_value)
            }
            Ordering::Equal => {
                // pure value replacement, colour and links stay put.
                let old_value = mem::replace(&mut node.value, value);
                (node, Some(old_value))
            }
        }
    }

    fn do_remove<Q>(
        node: Option<Box<Node<K, V>>>,
        key: &Q,
    ) -> (Option<Box<Node<K, V>>>, Option<Box<Node<K, V>>>)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node = match node {
            None => return (None, None),
            Some(node) => node,
        };

        if node.key.borrow().gt(key) {
            if node.left.is_none() {
                (Some(node), None)
            } else {
                let ok = !is_red(node.as_left_ref());
                if ok && !is_red(node.left.as_ref().unwrap().as_left_ref()) {
                    node = Self::move_red_left(node);
                }
                let (left, old_node) = Self::do_remove(node.left.take(), key);
                node.left = left;
                node.update_size();
                (Some(Self::fixup(node)), old_node)
            }
        } else {
            if is_red(node.as_left_ref()) {
                node = Self::rotate_right(node);
            }

            if !node.key.borrow().lt(key) && node.right.is_none() {
                return (None, Some(node));
            }

            let ok = node.right.is_some() && !is_red(node.as_right_ref());
            if ok && !is_red(node.right.as_ref().unwrap().as_left_ref()) {
                node = Self::move_red_right(node);
            }

            if !node.key.borrow().lt(key) {
                // matched, splice in the in-order successor from the right
                // subtree, it adopts this node's links and colour.
                let (right, min) = Self::do_remove_min(node.right.take());
                let mut newnode = match min {
                    Some(min) => min,
                    None => panic!("do_remove(): fatal logic, call the programmer"),
                };
                newnode.left = node.left.take();
                newnode.right = right;
                newnode.colour = node.colour;
                newnode.update_size();
                (Some(Self::fixup(newnode)), Some(node))
            } else {
                let (right, old_node) = Self::do_remove(node.right.take(), key);
                node.right = right;
                node.update_size();
                (Some(Self::fixup(node)), old_node)
            }
        }
    }

    fn do_remove_min(
        node: Option<Box<Node<K, V>>>,
    ) -> (Option<Box<Node<K, V>>>, Option<Box<Node<K, V>>>) {
        let mut node = match node {
            None => return (None, None),
            Some(node) => node,
        };

        if node.left.is_none() {
            return (None, Some(node));
        }

        let left = node.as_left_ref();
        if !is_red(left) && !is_red(left.unwrap().as_left_ref()) {
            node = Self::move_red_left(node);
        }
        let (left, min) = Self::do_remove_min(node.left.take());
        node.left = left;
        node.update_size();
        (Some(Self::fixup(node)), min)
    }

    fn do_remove_max(
        node: Option<Box<Node<K, V>>>,
    ) -> (Option<Box<Node<K, V>>>, Option<Box<Node<K, V>>>) {
        let mut node = match node {
            None => return (None, None),
            Some(node) => node,
        };

        if is_red(node.as_left_ref()) {
            node = Self::rotate_right(node);
        }

        if node.right.is_none() {
            return (None, Some(node));
        }

        let right = node.as_right_ref();
        if !is_red(right) && !is_red(right.unwrap().as_left_ref()) {
            node = Self::move_red_right(node);
        }
        let (right, max) = Self::do_remove_max(node.right.take());
        node.right = right;
        node.update_size();
        (Some(Self::fixup(node)), max)
    }

    //--------- rotation routines for 2-3 algorithm ----------------

    fn walkuprot_23(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
        if is_red(node.as_right_ref()) && !is_red(node.as_left_ref()) {
            node = Self::rotate_left(node);
        }
        let left = node.as_left_ref();
        if is_red(left) && is_red(left.unwrap().as_left_ref()) {
            node = Self::rotate_right(node);
        }
        if is_red(node.as_left_ref()) && is_red(node.as_right_ref()) {
            Self::flip(&mut node)
        }
        node
    }

    //              (i)                       (i)
    //               |                         |
    //              node                       x
    //              /  \                      / \
    //             /    (r)                 (r)  \
    //            /       \                 /     \
    //          left       x             node      xr
    //                    / \            /  \
    //                  xl   xr       left   xl
    //
    fn rotate_left(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
        if is_black(node.as_right_ref()) {
            panic!("rotate_left(): rotating a black link ? call the programmer");
        }
        let mut x = node.right.take().unwrap();
        node.right = x.left.take();
        x.colour = node.colour;
        node.set_red();
        node.update_size();
        x.left = Some(node);
        x.update_size();
        x
    }

    //              (i)                       (i)
    //               |                         |
    //              node                       x
    //              /  \                      / \
    //            (r)   \                   (r)  \
    //           /       \                 /      \
    //          x       right             xl      node
    //         / \                                / \
    //       xl   xr                             xr  right
    //
    fn rotate_right(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
        if is_black(node.as_left_ref()) {
            panic!("rotate_right(): rotating a black link ? call the programmer");
        }
        let mut x = node.left.take().unwrap();
        node.left = x.right.take();
        x.colour = node.colour;
        node.set_red();
        node.update_size();
        x.right = Some(node);
        x.update_size();
        x
    }

    //        (x)                   (!x)
    //         |                     |
    //        node                  node
    //        / \                   / \
    //      (y) (y)              (!y) (!y)
    //     /      \              /      \
    //   left    right         left    right
    //
    // Swap the node's colour with its two children's. The calling
    // discipline in upsert/remove guarantees both children are present
    // and equal coloured, anything else is a programming error.
    fn flip(node: &mut Node<K, V>) {
        let (left, right) = match (node.left.as_mut(), node.right.as_mut()) {
            (Some(left), Some(right)) => (left, right),
            _ => panic!("flip(): child missing ? call the programmer"),
        };
        if left.colour != right.colour {
            panic!("flip(): dissimilar children ? call the programmer");
        }
        left.toggle_link();
        right.toggle_link();
        node.toggle_link();
    }

    fn fixup(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
        if is_red(node.as_right_ref()) {
            node = Self::rotate_left(node);
        }
        let left = node.as_left_ref();
        if is_red(left) && is_red(left.unwrap().as_left_ref()) {
            node = Self::rotate_right(node);
        }
        if is_red(node.as_left_ref()) && is_red(node.as_right_ref()) {
            Self::flip(&mut node)
        }
        node
    }

    fn move_red_left(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
        Self::flip(&mut node);
        if is_red(node.right.as_ref().unwrap().as_left_ref()) {
            node.right = Some(Self::rotate_right(node.right.take().unwrap()));
            node = Self::rotate_left(node);
            Self::flip(&mut node);
        }
        node
    }

    fn move_red_right(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
        Self::flip(&mut node);
        if is_red(node.left.as_ref().unwrap().as_left_ref()) {
            node = Self::rotate_right(node);
            Self::flip(&mut node);
        }
        node
    }
}

/// Read operations.
impl<K, V> Index<K, V>
where
    K: Ord,
{
    /// Get the value for `key`. Missing keys are a normal outcome,
    /// returned as `None`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        Self::do_get(self.root.as_deref(), key)
    }

    /// Return whether `key` is present in the index.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Return the entry with the smallest key, `None` on empty index.
    pub fn min(&self) -> Option<(&K, &V)> {
        let mut node = self.root.as_deref()?;
        while let Some(left) = node.as_left_ref() {
            node = left;
        }
        Some((&node.key, &node.value))
    }

    /// Return the entry with the largest key, `None` on empty index.
    pub fn max(&self) -> Option<(&K, &V)> {
        let mut node = self.root.as_deref()?;
        while let Some(right) = node.as_right_ref() {
            node = right;
        }
        Some((&node.key, &node.value))
    }

    /// Return the entry with the largest key strictly smaller than `key`.
    /// Return `None` if `key` is missing from the index, or if `key` is
    /// the minimum.
    pub fn predecessor<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        // remember the last ancestor the search turned right at, it is
        // the predecessor when the matched node has no left subtree.
        let mut before: Option<&Node<K, V>> = None;
        let mut node = self.root.as_deref();
        while let Some(nref) = node {
            match nref.key.borrow().cmp(key) {
                Ordering::Less => {
                    before = Some(nref);
                    node = nref.as_right_ref();
                }
                Ordering::Greater => node = nref.as_left_ref(),
                Ordering::Equal => {
                    let pred = match nref.as_left_ref() {
                        Some(mut left) => {
                            while let Some(right) = left.as_right_ref() {
                                left = right;
                            }
                            Some(left)
                        }
                        None => before,
                    };
                    return pred.map(|p| (&p.key, &p.value));
                }
            }
        }
        None
    }

    /// Return the entry with the smallest key strictly larger than `key`.
    /// Return `None` if `key` is missing from the index, or if `key` is
    /// the maximum.
    pub fn successor<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut before: Option<&Node<K, V>> = None;
        let mut node = self.root.as_deref();
        while let Some(nref) = node {
            match nref.key.borrow().cmp(key) {
                Ordering::Greater => {
                    before = Some(nref);
                    node = nref.as_left_ref();
                }
                Ordering::Less => node = nref.as_right_ref(),
                Ordering::Equal => {
                    let succ = match nref.as_right_ref() {
                        Some(mut right) => {
                            while let Some(left) = right.as_left_ref() {
                                right = left;
                            }
                            Some(right)
                        }
                        None => before,
                    };
                    return succ.map(|s| (&s.key, &s.value));
                }
            }
        }
        None
    }

    /// Return the entry holding the `rank`-th smallest key, 0-based.
    /// Steered by the cached subtree sizes, never touches more than one
    /// root-to-leaf path.
    pub fn select(&self, mut rank: usize) -> Option<(&K, &V)> {
        let mut node = self.root.as_deref();
        while let Some(nref) = node {
            let lsize = nref.left_size();
            match rank.cmp(&lsize) {
                Ordering::Less => node = nref.as_left_ref(),
                Ordering::Equal => return Some((&nref.key, &nref.value)),
                Ordering::Greater => {
                    rank = rank - lsize - 1;
                    node = nref.as_right_ref();
                }
            }
        }
        None
    }

    /// Return the number of keys strictly smaller than `key`, provided
    /// `key` is present. Inverse of [Index::select].
    pub fn rank<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut rank = 0;
        let mut node = self.root.as_deref();
        while let Some(nref) = node {
            match nref.key.borrow().cmp(key) {
                Ordering::Greater => node = nref.as_left_ref(),
                Ordering::Less => {
                    rank += nref.left_size() + 1;
                    node = nref.as_right_ref();
                }
                Ordering::Equal => return Some(rank + nref.left_size()),
            }
        }
        None
    }

    fn do_get<'a, Q>(node: Option<&'a Node<K, V>>, key: &Q) -> Option<&'a V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let nref = node?;
        match nref.key.borrow().cmp(key) {
            Ordering::Less => Self::do_get(nref.as_right_ref(), key),
            Ordering::Greater => Self::do_get(nref.as_left_ref(), key),
            Ordering::Equal => Some(&nref.value),
        }
    }
}

impl<K, V> Index<K, V>
where
    K: Ord + fmt::Debug,
{
    /// Validate the tree against the red-black and order-statistic rules:
    ///
    /// * Root node is always black.
    /// * Verify the sort order between a node and its left/right child.
    /// * Make sure there are no consecutive reds.
    /// * Make sure number of blacks are same on both left and right arm.
    /// * Make sure every cached subtree size matches its actual
    ///   cardinality, and the cached count matches the root's.
    /// * Make sure the maximum depth does not exceed [MAX_TREE_DEPTH].
    ///
    /// Additionally return [Stats] gathered while walking the tree.
    pub fn validate(&self) -> Result<Stats> {
        let root = self.root.as_deref();

        if is_red(root) {
            err_at!(Fatal, msg: "root node must be black")?;
        }

        let mut depths = Depth::default();
        let (n_blacks, depth) = (0, 0);
        let (blacks, n_count) =
            Self::validate_tree(root, is_red(root), n_blacks, depth, &mut depths)?;
        if n_count != self.n_count {
            err_at!(SizeFault, msg: "cached n_count {} != {}", self.n_count, n_count)?;
        }

        let mut stats = Stats::new(&self.name);
        stats.node_size = mem::size_of::<Node<K, V>>();
        stats.n_count = self.n_count;
        stats.blacks = Some(blacks);
        stats.depths = Some(depths);

        debug!(
            target: "rbos",
            "validated index {:?}, n_count:{} blacks:{}", self.name, n_count, blacks
        );

        Ok(stats)
    }

    fn validate_tree(
        node: Option<&Node<K, V>>,
        fromred: bool,
        mut n_blacks: usize,
        depth: usize,
        depths: &mut Depth,
    ) -> Result<(usize, usize)> {
        let red = is_red(node);

        let node = match node {
            Some(_) if fromred && red => {
                err_at!(ConsecutiveReds, msg: "consecutive reds at depth {}", depth)?
            }
            Some(node) => node,
            None => {
                depths.sample(depth);
                return Ok((n_blacks, 0));
            }
        };

        if !red {
            n_blacks += 1;
        }

        if depth > MAX_TREE_DEPTH {
            err_at!(Fatal, msg: "tree exceeds max depth {}", depth)?;
        }

        // confirm sort order in the tree.
        if let Some(left) = node.as_left_ref() {
            if left.key.ge(&node.key) {
                err_at!(SortError, msg: "left:{:?} parent:{:?}", left.key, node.key)?;
            }
        }
        if let Some(right) = node.as_right_ref() {
            if right.key.le(&node.key) {
                err_at!(SortError, msg: "right:{:?} parent:{:?}", right.key, node.key)?;
            }
        }

        let (lb, lc) = Self::validate_tree(node.as_left_ref(), red, n_blacks, depth + 1, depths)?;
        let (rb, rc) = Self::validate_tree(node.as_right_ref(), red, n_blacks, depth + 1, depths)?;

        if lb != rb {
            err_at!(UnbalancedBlacks, msg: "unbalanced blacks l:{} r:{}", lb, rb)?;
        }

        let n_count = lc + rc + 1;
        if node.size != n_count {
            err_at!(SizeFault, msg: "node {:?} cached size {} != {}", node.key, node.size, n_count)?;
        }

        Ok((lb, n_count))
    }
}

#[inline]
fn is_red<K, V>(node: Option<&Node<K, V>>) -> bool {
    node.map_or(false, |node| !node.is_black())
}

#[inline]
fn is_black<K, V>(node: Option<&Node<K, V>>) -> bool {
    node.map_or(true, Node::is_black)
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;
