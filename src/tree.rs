use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{PathError, Result};

/// Canonical array index: no sign, no padding, no leading zeros.
static INDEX_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(0|[1-9][0-9]*)$").unwrap());

/// Entries of a mapping container.
pub type Map = BTreeMap<String, Value>;

/// Elements of a sequence container.
pub type Seq = Vec<Value>;

/// A leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

/// The shape of a value, resolved once per path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Mapping,
    Sequence,
    Scalar,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Mapping => f.write_str("mapping"),
            Kind::Sequence => f.write_str("sequence"),
            Kind::Scalar => f.write_str("scalar"),
        }
    }
}

struct Node<T> {
    items: RefCell<T>,
    frozen: Cell<bool>,
}

/// A shared, freezable container.
///
/// Cloning a `Container` clones the handle: both clones refer to the same
/// node, so a mutation through one is visible through the other.
pub struct Container<T>(Rc<Node<T>>);

impl<T> Clone for Container<T> {
    fn clone(&self) -> Self {
        Container(Rc::clone(&self.0))
    }
}

impl<T> Container<T> {
    /// Wrap `items` in a new, unfrozen container.
    pub fn new(items: T) -> Self {
        Container(Rc::new(Node {
            items: RefCell::new(items),
            frozen: Cell::new(false),
        }))
    }

    /// Read access to the entries. Panics only if a mutation through
    /// `Value::insert`/`remove`/`push` is in progress on the same container.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.items.borrow()
    }

    /// True once `deep_freeze` has reached this container.
    pub fn is_frozen(&self) -> bool {
        self.0.frozen.get()
    }

    /// Reference identity, not content equality.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn freeze(&self) {
        self.0.frozen.set(true);
    }

    pub(crate) fn addr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }

    fn borrow_mut(&self, kind: Kind) -> Result<RefMut<'_, T>> {
        if self.is_frozen() {
            return Err(PathError::Frozen { kind });
        }
        Ok(self.0.items.borrow_mut())
    }
}

impl<T: Clone> Container<T> {
    /// A new, unfrozen container holding the same direct entries.
    pub fn shallow_copy(&self) -> Self {
        Container::new(self.borrow().clone())
    }
}

/// A nested structure: a scalar, a mapping, or a sequence.
#[derive(Clone)]
pub enum Value {
    Scalar(Scalar),
    Map(Container<Map>),
    Seq(Container<Seq>),
}

impl Value {
    /// The null scalar.
    pub fn null() -> Self {
        Value::Scalar(Scalar::Null)
    }

    pub fn empty_map() -> Self {
        Value::Map(Container::new(Map::new()))
    }

    pub fn empty_seq() -> Self {
        Value::Seq(Container::new(Seq::new()))
    }

    /// Build a mapping from key/value pairs.
    pub fn map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Map(Container::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Build a sequence from elements.
    pub fn seq<I>(elements: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::Seq(Container::new(elements.into_iter().collect()))
    }

    /// Shape tag used by every shape decision.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Scalar(_) => Kind::Scalar,
            Value::Map(_) => Kind::Mapping,
            Value::Seq(_) => Kind::Sequence,
        }
    }

    pub fn is_container(&self) -> bool {
        !matches!(self.kind(), Kind::Scalar)
    }

    /// True when both values are the same container. Scalars have no identity.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
            (Value::Seq(a), Value::Seq(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Scalars are always immutable and report frozen.
    pub fn is_frozen(&self) -> bool {
        match self {
            Value::Scalar(_) => true,
            Value::Map(c) => c.is_frozen(),
            Value::Seq(c) => c.is_frozen(),
        }
    }

    /// Direct child lookup. A key on a scalar, a missing key, or a
    /// non-index key on a sequence are all absent.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Scalar(_) => None,
            Value::Map(c) => c.borrow().get(key).cloned(),
            Value::Seq(c) => parse_index(key).and_then(|i| c.borrow().get(i).cloned()),
        }
    }

    /// Set a direct child in place, returning the previous value.
    ///
    /// On a sequence, `key` must be an index in `0..=len`; `len` appends.
    pub fn insert(&self, key: &str, value: Value) -> Result<Option<Value>> {
        match self {
            Value::Scalar(_) => Err(PathError::not_an_object("insert")),
            Value::Map(c) => Ok(c.borrow_mut(Kind::Mapping)?.insert(key.to_string(), value)),
            Value::Seq(c) => {
                let mut items = c.borrow_mut(Kind::Sequence)?;
                let len = items.len();
                match parse_index(key) {
                    Some(i) if i < len => Ok(Some(std::mem::replace(&mut items[i], value))),
                    Some(i) if i == len => {
                        items.push(value);
                        Ok(None)
                    }
                    _ => Err(PathError::InvalidIndex {
                        key: key.to_string(),
                        len,
                    }),
                }
            }
        }
    }

    /// Remove a direct child in place. Removing from a sequence shifts the
    /// following elements down; a missing key is a no-op.
    pub fn remove(&self, key: &str) -> Result<Option<Value>> {
        match self {
            Value::Scalar(_) => Err(PathError::not_an_object("remove")),
            Value::Map(c) => Ok(c.borrow_mut(Kind::Mapping)?.remove(key)),
            Value::Seq(c) => {
                let mut items = c.borrow_mut(Kind::Sequence)?;
                match parse_index(key) {
                    Some(i) if i < items.len() => Ok(Some(items.remove(i))),
                    _ => Ok(None),
                }
            }
        }
    }

    /// Append to a sequence in place.
    pub fn push(&self, value: Value) -> Result<()> {
        match self {
            Value::Seq(c) => {
                c.borrow_mut(Kind::Sequence)?.push(value);
                Ok(())
            }
            _ => Err(PathError::not_an_array("push", "the target")),
        }
    }

    /// Enumerable keys: mapping keys in order, or sequence indices.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Value::Scalar(_) => Vec::new(),
            Value::Map(c) => c.borrow().keys().cloned().collect(),
            Value::Seq(c) => (0..c.borrow().len()).map(|i| i.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Value::Scalar(_) => 0,
            Value::Map(c) => c.borrow().len(),
            Value::Seq(c) => c.borrow().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Scalar(Scalar::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Scalar(Scalar::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    /// A new container with the same direct entries. Absent values and
    /// scalars copy to an empty mapping so writes can create intermediate
    /// levels on demand.
    pub(crate) fn shallow_copy(value: Option<&Value>) -> Value {
        match value {
            Some(Value::Map(c)) => Value::Map(c.shallow_copy()),
            Some(Value::Seq(c)) => Value::Seq(c.shallow_copy()),
            Some(Value::Scalar(_)) | None => Value::empty_map(),
        }
    }

    /// Snapshot of the direct children, for traversals that must not hold
    /// a borrow while they recurse.
    pub(crate) fn children(&self) -> Vec<Value> {
        match self {
            Value::Scalar(_) => Vec::new(),
            Value::Map(c) => c.borrow().values().cloned().collect(),
            Value::Seq(c) => c.borrow().clone(),
        }
    }
}

/// Interpret a path segment as a sequence index.
pub(crate) fn parse_index(key: &str) -> Option<usize> {
    if !INDEX_PATTERN.is_match(key) {
        return None;
    }
    key.parse().ok()
}

/// Deep equality. Identical containers are equal without looking inside,
/// and a pair of containers already being compared is assumed equal, so
/// cyclic structures compare in finite time.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        eq_in(self, other, &mut HashSet::new())
    }
}

fn eq_in(a: &Value, b: &Value, comparing: &mut HashSet<(*const (), *const ())>) -> bool {
    match (a, b) {
        (Value::Scalar(x), Value::Scalar(y)) => x == y,
        (Value::Map(x), Value::Map(y)) => {
            if x.ptr_eq(y) || !comparing.insert((x.addr(), y.addr())) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x
                    .iter()
                    .zip(y.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && eq_in(va, vb, comparing))
        }
        (Value::Seq(x), Value::Seq(y)) => {
            if x.ptr_eq(y) || !comparing.insert((x.addr(), y.addr())) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(va, vb)| eq_in(va, vb, comparing))
        }
        _ => false,
    }
}

/// Debug view that prints `<cycle>` for a container already open on the
/// current formatting path.
struct Shown<'a> {
    value: &'a Value,
    open: &'a RefCell<Vec<*const ()>>,
}

impl<'a> Shown<'a> {
    fn child<'b>(&'b self, value: &'b Value) -> Shown<'b> {
        Shown {
            value,
            open: self.open,
        }
    }
}

impl fmt::Debug for Shown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addr = match self.value {
            Value::Scalar(s) => return write!(f, "{:?}", s),
            Value::Map(c) => c.addr(),
            Value::Seq(c) => c.addr(),
        };
        if self.open.borrow().contains(&addr) {
            return f.write_str("<cycle>");
        }

        self.open.borrow_mut().push(addr);
        let result = match self.value {
            Value::Map(c) => f
                .debug_map()
                .entries(c.borrow().iter().map(|(k, v)| (k, self.child(v))))
                .finish(),
            Value::Seq(c) => f
                .debug_list()
                .entries(c.borrow().iter().map(|v| self.child(v)))
                .finish(),
            Value::Scalar(_) => Ok(()),
        };
        self.open.borrow_mut().pop();
        result
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = RefCell::new(Vec::new());
        Shown { value: self, open: &open }.fmt(f)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::null()
    }
}

// ── Conversions ─────────────────────────────────────────────────────

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(Scalar::Boolean(b))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Scalar(Scalar::Number(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Scalar(Scalar::Number(n as f64))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Scalar(Scalar::Number(n as f64))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(Scalar::String(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(elements: Vec<Value>) -> Self {
        Value::Seq(Container::new(elements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_segments_are_canonical() {
        assert_eq!(parse_index("0"), Some(0));
        assert_eq!(parse_index("12"), Some(12));
        assert_eq!(parse_index("01"), None);
        assert_eq!(parse_index("-1"), None);
        assert_eq!(parse_index("+1"), None);
        assert_eq!(parse_index(" 1"), None);
        assert_eq!(parse_index(""), None);
        assert_eq!(parse_index("99999999999999999999999999"), None);
    }

    #[test]
    fn clones_share_the_container() {
        let a = Value::map([("x", Value::from(1))]);
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        b.insert("y", Value::from(2)).unwrap();
        assert_eq!(a.get("y"), Some(Value::from(2)));
    }

    #[test]
    fn shallow_copy_is_a_new_container_with_shared_children() {
        let inner = Value::seq([Value::from("a")]);
        let outer = Value::map([("inner", inner.clone())]);
        let copy = Value::shallow_copy(Some(&outer));
        assert!(!copy.ptr_eq(&outer));
        assert_eq!(copy, outer);
        assert!(copy.get("inner").unwrap().ptr_eq(&inner));
    }

    #[test]
    fn shallow_copy_of_scalar_or_absent_is_empty_map() {
        assert_eq!(Value::shallow_copy(None), Value::empty_map());
        assert_eq!(Value::shallow_copy(Some(&Value::from(3))), Value::empty_map());
    }

    #[test]
    fn sequence_insert_replaces_or_appends() {
        let s = Value::seq([Value::from("a")]);
        assert_eq!(s.insert("0", Value::from("b")).unwrap(), Some(Value::from("a")));
        assert_eq!(s.insert("1", Value::from("c")).unwrap(), None);
        assert_eq!(s, Value::seq([Value::from("b"), Value::from("c")]));
        assert_eq!(
            s.insert("5", Value::null()),
            Err(PathError::InvalidIndex {
                key: "5".to_string(),
                len: 2
            })
        );
        assert!(matches!(
            s.insert("name", Value::null()),
            Err(PathError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn sequence_remove_shifts_and_ignores_missing() {
        let s = Value::seq([Value::from(1), Value::from(2), Value::from(3)]);
        assert_eq!(s.remove("0").unwrap(), Some(Value::from(1)));
        assert_eq!(s.remove("7").unwrap(), None);
        assert_eq!(s.remove("x").unwrap(), None);
        assert_eq!(s.keys(), vec!["0".to_string(), "1".to_string()]);
    }

    #[test]
    fn frozen_container_rejects_mutation() {
        let m = Value::map([("a", Value::from(1))]);
        if let Value::Map(c) = &m {
            c.freeze();
        }
        assert_eq!(
            m.insert("b", Value::from(2)),
            Err(PathError::Frozen {
                kind: Kind::Mapping
            })
        );
        assert!(m.remove("a").is_err());
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn equality_on_distinct_cycles_terminates() {
        let a = Value::map([("n", Value::from(1))]);
        a.insert("me", a.clone()).unwrap();
        let b = Value::map([("n", Value::from(1))]);
        b.insert("me", b.clone()).unwrap();
        let c = Value::map([("n", Value::from(2))]);
        c.insert("me", c.clone()).unwrap();

        assert!(a == b);
        assert!(a != c);
    }

    #[test]
    fn debug_marks_cycles() {
        let a = Value::map([("n", Value::from(1))]);
        a.insert("me", a.clone()).unwrap();
        let list = Value::seq([a.clone(), a.clone()]);

        assert_eq!(format!("{:?}", a), r#"{"me": <cycle>, "n": Number(1.0)}"#);
        assert_eq!(
            format!("{:?}", list),
            r#"[{"me": <cycle>, "n": Number(1.0)}, {"me": <cycle>, "n": Number(1.0)}]"#
        );
    }

    #[test]
    fn equality_on_self_cycle_terminates() {
        let m = Value::empty_map();
        m.insert("me", m.clone()).unwrap();
        assert!(m == m.clone());
    }
}
