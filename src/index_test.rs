use arbitrary::{Arbitrary, Unstructured};
use rand::{prelude::random, rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};

use std::{collections::BTreeMap, ops::Bound};

use super::*;
use crate::node::Colour;

// pre-order walk, (key, colour, cached-size) triples pin the exact shape.
fn tree_shape<K, V>(node: Option<&Node<K, V>>, acc: &mut Vec<(K, Colour, usize)>)
where
    K: Clone,
{
    if let Some(node) = node {
        acc.push((node.key.clone(), node.colour, node.size));
        tree_shape(node.as_left_ref(), acc);
        tree_shape(node.as_right_ref(), acc);
    }
}

#[test]
fn test_index_ordered_queries() {
    let mut index: Index<i32, i32> = Index::new("test_ordered");
    assert_eq!(index.is_empty(), true);
    assert_eq!(index.to_name(), "test_ordered".to_string());
    assert_eq!(index.min(), None);
    assert_eq!(index.max(), None);

    for key in [5, 3, 8, 1, 4, 7, 9] {
        assert_eq!(index.set(key, key * 10), None);
    }

    assert_eq!(index.len(), 7);
    assert_eq!(index.min(), Some((&1, &10)));
    assert_eq!(index.max(), Some((&9, &90)));
    assert_eq!(index.successor(&5), Some((&7, &70)));
    assert_eq!(index.predecessor(&5), Some((&4, &40)));

    // extreme elements have no neighbour in that direction.
    assert_eq!(index.predecessor(&1), None);
    assert_eq!(index.successor(&9), None);
    // missing keys have no neighbours at all.
    assert_eq!(index.predecessor(&6), None);
    assert_eq!(index.successor(&6), None);

    assert_eq!(index.get(&8), Some(&80));
    assert_eq!(index.contains(&8), true);
    assert_eq!(index.contains(&6), false);

    for (rank, key) in [1, 3, 4, 5, 7, 8, 9].iter().enumerate() {
        assert_eq!(index.select(rank).map(|(k, _)| *k), Some(*key));
        assert_eq!(index.rank(key), Some(rank));
    }
    assert_eq!(index.select(7), None);
    assert_eq!(index.rank(&6), None);

    let stats = index.validate().unwrap();
    assert_eq!(stats.n_count, 7);
    assert!(stats.blacks.is_some());
}

#[test]
fn test_index_set_overwrite() {
    let mut index: Index<String, u64> = Index::new("test_overwrite");
    assert_eq!(index.set("x".to_string(), 1), None);
    assert_eq!(index.set("x".to_string(), 2), Some(1));
    assert_eq!(index.len(), 1);
    assert_eq!(index.get("x"), Some(&2));
    index.validate().unwrap();

    let index: Index<u8, u8> = Index::default();
    assert_eq!(index.is_empty(), true);
}

#[test]
fn test_index_remove() {
    let mut index: Index<String, u64> = Index::new("test_remove");
    for (i, key) in ["b", "a", "c"].iter().enumerate() {
        index.set(key.to_string(), i as u64);
    }

    // two-child removal, successor swaps in.
    assert_eq!(index.remove("b"), Some(0));
    assert_eq!(index.get("b"), None);
    assert_eq!(index.len(), 2);
    index.validate().unwrap();

    let keys: Vec<String> = (0..index.len())
        .map(|i| index.select(i).unwrap().0.clone())
        .collect();
    assert_eq!(keys, vec!["a".to_string(), "c".to_string()]);

    // removing an absent key must leave the tree untouched.
    let mut shape = vec![];
    tree_shape(index.root.as_deref(), &mut shape);
    assert_eq!(index.remove("z"), None);
    assert_eq!(index.len(), 2);
    let mut shape_after = vec![];
    tree_shape(index.root.as_deref(), &mut shape_after);
    assert_eq!(shape, shape_after);

    assert_eq!(index.remove("a"), Some(1));
    assert_eq!(index.remove("c"), Some(2));
    assert_eq!(index.remove("c"), None);
    assert_eq!(index.len(), 0);
    assert_eq!(index.min(), None);
    assert_eq!(index.max(), None);
    index.validate().unwrap();
}

#[test]
fn test_index_remove_min_max() {
    let seed: u64 = random();
    println!("test_index_remove_min_max seed:{}", seed);
    let mut rng = SmallRng::seed_from_u64(seed);

    let mut index: Index<u32, u32> = Index::new("test_remove_min_max");
    assert_eq!(index.remove_min(), None);
    assert_eq!(index.remove_max(), None);

    let mut keys: Vec<u32> = (0..500).collect();
    keys.shuffle(&mut rng);
    for key in keys {
        index.set(key, key);
    }
    index.validate().unwrap();

    for i in 0..250 {
        assert_eq!(index.remove_min(), Some((i, i)));
        assert_eq!(index.remove_max(), Some((499 - i, 499 - i)));
        if i % 50 == 0 {
            index.validate().unwrap();
        }
    }
    assert_eq!(index.len(), 0);
    assert_eq!(index.remove_min(), None);
    assert_eq!(index.remove_max(), None);
}

#[test]
fn test_index_random() {
    let seed: u64 = random();
    // let seed: u64 = 3061716992344767567;
    println!("test_index_random seed:{}", seed);
    let mut rng = SmallRng::seed_from_u64(seed);

    let mut index: Index<u8, u64> = Index::new("test_random");
    let mut btmap: BTreeMap<u8, u64> = BTreeMap::new();

    let n_ops = 10_000;
    for i in 0..n_ops {
        let key: u8 = rng.gen();
        match rng.gen::<usize>() % 3 {
            0 | 1 => {
                let value: u64 = rng.gen();
                assert_eq!(index.set(key, value), btmap.insert(key, value));
            }
            _ => assert_eq!(index.remove(&key), btmap.remove(&key)),
        }
        assert_eq!(index.len(), btmap.len());
        if i % 1000 == 0 {
            index.validate().unwrap();
        }
    }

    index.validate().unwrap();

    assert_eq!(index.min(), btmap.iter().next());
    assert_eq!(index.max(), btmap.iter().next_back());

    for (rank, (key, value)) in btmap.iter().enumerate() {
        assert_eq!(index.select(rank), Some((key, value)));
        assert_eq!(index.rank(key), Some(rank));
        assert_eq!(index.get(key), Some(value));

        assert_eq!(index.predecessor(key), btmap.range(..*key).next_back());
        let succ = (Bound::Excluded(*key), Bound::Unbounded);
        assert_eq!(index.successor(key), btmap.range(succ).next());
    }

    // missing keys are a normal miss, not an error.
    for _i in 0..1000 {
        let key: u8 = rng.gen();
        if !btmap.contains_key(&key) {
            assert_eq!(index.get(&key), None);
            assert_eq!(index.predecessor(&key), None);
            assert_eq!(index.successor(&key), None);
            assert_eq!(index.rank(&key), None);
        }
    }

    index.clear();
    assert_eq!(index.len(), 0);
    assert_eq!(index.is_empty(), true);
    index.validate().unwrap();
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    Set(u8, u64),
    Remove(u8),
    RemoveMin,
    RemoveMax,
}

#[test]
fn test_index_arbitrary_ops() {
    let seed: u64 = random();
    println!("test_index_arbitrary_ops seed:{}", seed);
    let mut rng = SmallRng::seed_from_u64(seed);

    let mut index: Index<u8, u64> = Index::new("test_arbitrary");
    let mut btmap: BTreeMap<u8, u64> = BTreeMap::new();

    for _i in 0..5_000 {
        let bytes = rng.gen::<[u8; 32]>();
        let mut uns = Unstructured::new(&bytes);

        match uns.arbitrary::<Op>().unwrap() {
            Op::Set(key, value) => {
                assert_eq!(index.set(key, value), btmap.insert(key, value));
            }
            Op::Remove(key) => {
                assert_eq!(index.remove(&key), btmap.remove(&key));
            }
            Op::RemoveMin => {
                let key = btmap.keys().next().cloned();
                let exp = key.map(|k| (k, btmap.remove(&k).unwrap()));
                assert_eq!(index.remove_min(), exp);
            }
            Op::RemoveMax => {
                let key = btmap.keys().next_back().cloned();
                let exp = key.map(|k| (k, btmap.remove(&k).unwrap()));
                assert_eq!(index.remove_max(), exp);
            }
        }
    }

    let stats = index.validate().unwrap();
    assert_eq!(stats.n_count, btmap.len());
    println!("{}", stats);
}

#[test]
fn test_validate_detects_corruption() {
    let mut index: Index<u32, u32> = Index::new("test_corrupt");
    for key in 0..64 {
        index.set(key, key);
    }
    index.validate().unwrap();

    {
        // stale size cache.
        let mut index = index.clone();
        index.root.as_mut().unwrap().size += 1;
        assert!(matches!(index.validate(), Err(Error::SizeFault(_, _))));
    }
    {
        // red root.
        let mut index = index.clone();
        index.root.as_mut().unwrap().set_red();
        assert!(matches!(index.validate(), Err(Error::Fatal(_, _))));
    }
    {
        // red node under a red node.
        let mut index = index.clone();
        let left = index.root.as_mut().unwrap().left.as_mut().unwrap();
        left.set_red();
        left.left.as_mut().unwrap().set_red();
        assert!(matches!(index.validate(), Err(Error::ConsecutiveReds(_, _))));
    }
    {
        // keys out of order.
        let mut index = index.clone();
        let root = index.root.as_mut().unwrap();
        let mut left = root.left.take().unwrap();
        std::mem::swap(&mut root.key, &mut left.key);
        root.left = Some(left);
        assert!(matches!(index.validate(), Err(Error::SortError(_, _))));
    }
    {
        // hand built tree, blacks differ between the arms.
        let mut root: Box<Node<u32, u32>> = Box::new(Node::new(10, 10));
        root.set_black();
        let mut left = Box::new(Node::new(5, 5));
        left.set_black();
        root.left = Some(left);
        root.update_size();

        let mut index: Index<u32, u32> = Index::new("test_unbalanced");
        index.root = Some(root);
        index.n_count = 2;
        assert!(matches!(index.validate(), Err(Error::UnbalancedBlacks(_, _))));
    }
}

#[test]
#[should_panic(expected = "rotate_left")]
fn test_rotate_black_link_panics() {
    let mut node: Box<Node<u32, u32>> = Box::new(Node::new(10, 1));
    let mut right = Box::new(Node::new(20, 2));
    right.set_black();
    node.right = Some(right);
    Index::<u32, u32>::rotate_left(node);
}

#[test]
#[should_panic(expected = "flip")]
fn test_flip_dissimilar_children_panics() {
    let mut node: Node<u32, u32> = Node::new(10, 1);
    let mut left = Box::new(Node::new(5, 1));
    left.set_black();
    node.left = Some(left);
    node.right = Some(Box::new(Node::new(15, 1)));
    Index::<u32, u32>::flip(&mut node);
}
