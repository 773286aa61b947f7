//! Immutable, path-addressed updates of nested mappings and sequences.
//!
//! Every operation takes an existing structure and a dot-delimited path and
//! returns a new structure. Only the containers on the way down to the
//! target are copied; everything else is shared by reference with the
//! input, which is never modified.
//!
//! ```
//! use path_next::{get_path, set_path, Value};
//!
//! let old = Value::map([("a", Value::map([("b", Value::from(1))]))]);
//! let new = set_path(&old, "a.c", Value::from(2)).unwrap();
//!
//! assert_eq!(get_path(&new, "a.c").unwrap(), Some(Value::from(2)));
//! assert_eq!(get_path(&old, "a.c").unwrap(), None);
//! ```

pub mod error;
pub mod freeze;
pub mod ops;
pub mod path;
pub mod tree;

pub use error::{ErrorKind, PathError, Result};
pub use freeze::deep_freeze;
pub use ops::{delete_path, filter_path, get_path, map_path, push_path, set_path, transform_path};
pub use path::PATH_DELIMITER;
pub use tree::{Container, Kind, Map, Scalar, Seq, Value};
