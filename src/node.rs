/// Colour of a node. Absent children are treated as [Colour::Black] for
/// every rule evaluation.
///
/// Represented as a two-variant enum, instead of a boolean, so that
/// invalid third states are unrepresentable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Colour {
    Red,
    Black,
}

// Node corresponds to a single entry in Index instance.
#[derive(Clone)]
pub struct Node<K, V> {
    pub key: K,
    pub value: V,
    pub colour: Colour,    // store: colour of the incoming link
    pub size: usize,       // store: 1 + size(left) + size(right)
    pub left: Option<Box<Node<K, V>>>,
    pub right: Option<Box<Node<K, V>>>,
}

impl<K, V> Node<K, V> {
    /// New nodes enter the tree as red leaves, always.
    pub fn new(key: K, value: V) -> Node<K, V> {
        Node {
            key,
            value,
            colour: Colour::Red,
            size: 1,
            left: None,
            right: None,
        }
    }

    #[inline]
    pub fn set_red(&mut self) {
        self.colour = Colour::Red
    }

    #[inline]
    pub fn set_black(&mut self) {
        self.colour = Colour::Black
    }

    #[inline]
    pub fn toggle_link(&mut self) {
        self.colour = match self.colour {
            Colour::Red => Colour::Black,
            Colour::Black => Colour::Red,
        }
    }

    #[inline]
    pub fn is_black(&self) -> bool {
        self.colour == Colour::Black
    }

    #[inline]
    pub fn as_left_ref(&self) -> Option<&Node<K, V>> {
        self.left.as_deref()
    }

    #[inline]
    pub fn as_right_ref(&self) -> Option<&Node<K, V>> {
        self.right.as_deref()
    }

    #[inline]
    pub fn left_size(&self) -> usize {
        self.left.as_ref().map_or(0, |n| n.size)
    }

    /// Recompute the cached subtree cardinality from the children's
    /// caches. Children must be up to date, this is not recursive.
    #[inline]
    pub fn update_size(&mut self) {
        let l = self.left.as_ref().map_or(0, |n| n.size);
        let r = self.right.as_ref().map_or(0, |n| n.size);
        self.size = l + r + 1;
    }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
