//! Package implement an in-memory index for `{key,value}` entries using
//! [left-leaning-red-black][llrb] tree, augmented for order-statistic
//! queries.
//!
//! Every node carries a cached subtree cardinality, maintained across
//! mutations, so that rank/select style queries and `len()` come cheap.
//! Each mutation is a single root-to-leaf-and-back traversal, rebalancing
//! on the unwind via rotations and colour flips. There are no parent
//! pointers, each node exclusively owns its children.
//!
//! [Index] is single threaded. Applications requiring concurrent access
//! shall wrap it under external synchronization.
//!
//! [llrb]: https://en.wikipedia.org/wiki/Left-leaning_red-black_tree

use std::{error, fmt, result};

/// Type alias for Result return type, used by this package.
pub type Result<T> = result::Result<T, Error>;

/// Error variants that can be returned by this package's API.
///
/// First parameter within each variant gives the error location in source
/// code, as `file:line`, second parameter gives the failure detail.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Fatal case, tree state is broken beyond the specific rules below.
    Fatal(String, String),
    /// Fatal case, a red node is linked under another red node.
    ConsecutiveReds(String, String),
    /// Fatal case, number of black nodes differ between left and right arm.
    UnbalancedBlacks(String, String),
    /// Fatal case, index entries are not in sort order.
    SortError(String, String),
    /// Fatal case, cached subtree size disagrees with actual cardinality.
    SizeFault(String, String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        use Error::*;

        match self {
            Fatal(p, m) => write!(f, "Fatal,{},{}", p, m),
            ConsecutiveReds(p, m) => write!(f, "ConsecutiveReds,{},{}", p, m),
            UnbalancedBlacks(p, m) => write!(f, "UnbalancedBlacks,{},{}", p, m),
            SortError(p, m) => write!(f, "SortError,{},{}", p, m),
            SizeFault(p, m) => write!(f, "SizeFault,{},{}", p, m),
        }
    }
}

impl error::Error for Error {}

macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let prefix = format!("{}:{}", file!(), line!());
        Err(Error::$v(prefix, format!($($arg),+)))
    }};
}

mod depth;
mod index;
mod node;
mod stats;

pub use crate::depth::Depth;
pub use crate::index::{Index, MAX_TREE_DEPTH};
pub use crate::stats::Stats;
