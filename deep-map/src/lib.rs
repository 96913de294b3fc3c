//! Identity-aware deep mapping over nested, shared and cyclic structures.
//!
//! [`map`] applies a mapper to every node of a [`Value`], parent before child,
//! calling it once per distinct composite no matter how many places refer to
//! it. Shared nodes stay shared in the output and cycles stay cycles:
//!
//! ```rust
//! use deep_map::{Node, Value};
//!
//! let list = Node::new_array();
//! list.push(1);
//! list.push(list.clone());
//!
//! let mapped = deep_map::map(&Value::from(list), |node| match node {
//!     Value::Int(n) => Value::Int(n * 100),
//!     other => other.clone(),
//! });
//!
//! assert_eq!(mapped.get(0usize), Some(Value::Int(100)));
//! assert!(Value::same(&mapped.get(1usize).unwrap(), &mapped));
//! ```
//!
//! The traversal runs on an explicit stack, so deeply nested input does not
//! exhaust the call stack.
mod frame;
mod identity;
mod map;
mod value;

#[cfg(feature = "json")]
mod error;
#[cfg(feature = "json")]
mod json;

#[cfg(feature = "json")]
pub use error::ToJsonError;
pub use frame::{
    expand_and_collapse, try_expand_and_collapse, CompositeFrame, MappableFrame, PartiallyApplied,
};
pub use map::{deep_copy, identity, map, try_map, DeepMap};
pub use value::{Composite, Key, Kind, Node, NodeId, Object, Value};
