use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::frame::CompositeFrame;

/// A dynamically typed value: either a scalar or a shared handle to a composite.
///
/// Cloning a `Value::Composite` clones the handle, not the composite, so two clones
/// refer to the same node. That is what makes shared and circular structures expressible.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Composite(Node),
}

/// The discriminator used by the traversal: everything but `Array` and `Object` is a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Array,
    Object,
}

impl Kind {
    pub fn is_composite(self) -> bool {
        matches!(self, Kind::Array | Kind::Object)
    }
}

/// Member key of a composite: an index into an array or a name in an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Index(usize),
    Name(String),
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_owned())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(index) => write!(f, "[{index}]"),
            Key::Name(name) => write!(f, ".{name}"),
        }
    }
}

/// Identity of a composite node: the address of its shared allocation.
///
/// Only meaningful while the node is alive; holders that key on it must keep the node alive too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:x}", self.0)
    }
}

/// Shared, mutable handle to a composite.
///
/// # Leaks
///
/// Nodes are reference counted. A node that can reach itself keeps itself alive,
/// so a cycle built with [`Node::push`] or [`Node::insert`] is never freed, even
/// after every outside handle is dropped.
#[derive(Clone)]
pub struct Node(Rc<RefCell<Composite>>);

impl Node {
    pub fn new(composite: Composite) -> Self {
        Node(Rc::new(RefCell::new(composite)))
    }

    pub fn new_array() -> Self {
        Node::new(Composite::Array(Vec::new()))
    }

    pub fn new_object() -> Self {
        Node::new(Composite::Object(Object::new()))
    }

    pub fn id(&self) -> NodeId {
        NodeId(Rc::as_ptr(&self.0) as *const () as usize)
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn borrow(&self) -> Ref<'_, Composite> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Composite> {
        self.0.borrow_mut()
    }

    pub fn kind(&self) -> Kind {
        self.borrow().kind()
    }

    /// Append a member to an array node.
    ///
    /// # Panics
    ///
    /// Panics if this node is an object.
    pub fn push(&self, value: impl Into<Value>) {
        match &mut *self.borrow_mut() {
            Composite::Array(items) => items.push(value.into()),
            Composite::Object(_) => panic!("push on object node {}", self.id()),
        }
    }

    /// Insert a member into an object node, returning the value it replaced.
    /// A replaced key keeps its original position.
    ///
    /// # Panics
    ///
    /// Panics if this node is an array.
    pub fn insert(&self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        match &mut *self.borrow_mut() {
            Composite::Object(object) => object.insert(name, value.into()),
            Composite::Array(_) => panic!("insert on array node {}", self.id()),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ancestors = RefCell::new(Vec::new());
        DebugComposite {
            node: self,
            ancestors: &ancestors,
        }
        .fmt(f)
    }
}

/// The contents of a composite node.
#[derive(Clone)]
pub enum Composite {
    Array(Vec<Value>),
    Object(Object),
}

impl Composite {
    pub fn kind(&self) -> Kind {
        match self {
            Composite::Array(_) => Kind::Array,
            Composite::Object(_) => Kind::Object,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Composite::Array(items) => items.len(),
            Composite::Object(object) => object.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &Key) -> Option<&Value> {
        match (self, key) {
            (Composite::Array(items), Key::Index(index)) => items.get(*index),
            (Composite::Object(object), Key::Name(name)) => object.get(name),
            _ => None,
        }
    }

    /// Snapshot of the members in natural order: index order for arrays, insertion
    /// order for objects. The snapshot holds no borrow of the node it came from.
    pub fn members(&self) -> Vec<(Key, Value)> {
        match self {
            Composite::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| (Key::Index(index), item.clone()))
                .collect(),
            Composite::Object(object) => object
                .iter()
                .map(|(name, item)| (Key::Name(name.to_owned()), item.clone()))
                .collect(),
        }
    }

    /// An empty composite of the same kind, sized for this one's members.
    pub(crate) fn empty_like(&self) -> Composite {
        match self {
            Composite::Array(items) => Composite::Array(Vec::with_capacity(items.len())),
            Composite::Object(object) => Composite::Object(Object::with_capacity(object.len())),
        }
    }

    /// Append a member taken from a `members` snapshot of a composite of the same kind.
    pub(crate) fn attach(&mut self, key: Key, value: Value) {
        match (self, key) {
            (Composite::Array(items), Key::Index(index)) => {
                debug_assert_eq!(index, items.len());
                items.push(value);
            }
            (Composite::Object(object), Key::Name(name)) => object.append(name, value),
            (composite, key) => {
                unreachable!("{key} is not a member of {:?}", composite.kind())
            }
        }
    }
}

/// String-keyed map that enumerates in insertion order.
#[derive(Clone, Default)]
pub struct Object {
    entries: Vec<(String, Value)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Object {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    // Snapshot keys are already unique, so attaching skips the lookup.
    pub(crate) fn append(&mut self, name: String, value: Value) {
        debug_assert!(self.get(&name).is_none());
        self.entries.push((name, value));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut object = Object::new();
        for (name, value) in iter {
            object.insert(name, value);
        }
        object
    }
}

impl Value {
    /// A fresh array node holding `items`.
    pub fn array<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Value {
        Value::Composite(Node::new(Composite::Array(
            items.into_iter().map(Into::into).collect(),
        )))
    }

    /// A fresh object node holding `entries`, in the given order.
    pub fn object<K: Into<String>, V: Into<Value>>(
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Value {
        Value::Composite(Node::new(Composite::Object(
            entries
                .into_iter()
                .map(|(name, value)| (name, value.into()))
                .collect(),
        )))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::String(_) => Kind::String,
            Value::Composite(node) => node.kind(),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Composite(_))
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Composite(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Clone of the member at `key`, if this is a composite that has one.
    pub fn get(&self, key: impl Into<Key>) -> Option<Value> {
        let node = self.as_node()?;
        let composite = node.borrow();
        composite.get(&key.into()).cloned()
    }

    /// Identity equality for composites, value equality for scalars.
    pub fn same(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Composite(a), Value::Composite(b)) => a.ptr_eq(b),
            (Value::Composite(_), _) | (_, Value::Composite(_)) => false,
            (a, b) => scalar_eq(a, b),
        }
    }

    /// One layer of this value: scalars become leaves, composites expose their members.
    pub fn to_frame(&self) -> CompositeFrame<Value> {
        match self {
            Value::Composite(node) => match &*node.borrow() {
                Composite::Array(items) => CompositeFrame::Array(items.clone()),
                Composite::Object(object) => CompositeFrame::Object(
                    object
                        .iter()
                        .map(|(name, value)| (name.to_owned(), value.clone()))
                        .collect(),
                ),
            },
            scalar => CompositeFrame::Leaf(scalar.clone()),
        }
    }

    /// Build a value from one layer. Composite layers become fresh nodes.
    pub fn from_frame(frame: CompositeFrame<Value>) -> Value {
        match frame {
            CompositeFrame::Leaf(scalar) => scalar,
            CompositeFrame::Array(items) => Value::Composite(Node::new(Composite::Array(items))),
            CompositeFrame::Object(entries) => {
                Value::Composite(Node::new(Composite::Object(entries.into_iter().collect())))
            }
        }
    }

    /// The first composite found to be its own descendant, if any.
    pub fn find_cycle(&self) -> Option<NodeId> {
        enum Visit {
            Enter(Node),
            Exit(NodeId),
        }

        let Value::Composite(root) = self else {
            return None;
        };

        let mut on_path = FxHashSet::default();
        let mut done = FxHashSet::default();
        let mut stack = vec![Visit::Enter(root.clone())];

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(node) => {
                    let id = node.id();
                    if on_path.contains(&id) {
                        return Some(id);
                    }
                    if done.contains(&id) {
                        continue;
                    }
                    on_path.insert(id);
                    stack.push(Visit::Exit(id));
                    for (_, child) in node.borrow().members().into_iter().rev() {
                        if let Value::Composite(child) = child {
                            stack.push(Visit::Enter(child));
                        }
                    }
                }
                Visit::Exit(id) => {
                    on_path.remove(&id);
                    done.insert(id);
                }
            }
        }
        None
    }

    pub fn has_cycle(&self) -> bool {
        self.find_cycle().is_some()
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        _ => false,
    }
}

/// Structural equality. Cycles are compared by assuming that a pair of nodes
/// already under comparison is equal, so two cyclic values are equal when
/// every finite unrolling of them is.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        let mut assumed = FxHashSet::default();
        let mut pending = vec![(self.clone(), other.clone())];

        while let Some((a, b)) = pending.pop() {
            let (a, b) = match (a, b) {
                (Value::Composite(a), Value::Composite(b)) => (a, b),
                (a, b) => {
                    if scalar_eq(&a, &b) {
                        continue;
                    }
                    return false;
                }
            };
            if a.ptr_eq(&b) || !assumed.insert((a.id(), b.id())) {
                continue;
            }

            let (a, b) = (a.borrow(), b.borrow());
            if a.kind() != b.kind() || a.len() != b.len() {
                return false;
            }
            for ((key_a, child_a), (key_b, child_b)) in a.members().into_iter().zip(b.members()) {
                if key_a != key_b {
                    return false;
                }
                pending.push((child_a, child_b));
            }
        }
        true
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ancestors = RefCell::new(Vec::new());
        DebugValue {
            value: self,
            ancestors: &ancestors,
        }
        .fmt(f)
    }
}

// Debug output that prints a back-reference to an enclosing node as `<cycle #id>`.
struct DebugValue<'a> {
    value: &'a Value,
    ancestors: &'a RefCell<Vec<NodeId>>,
}

struct DebugComposite<'a> {
    node: &'a Node,
    ancestors: &'a RefCell<Vec<NodeId>>,
}

impl fmt::Debug for DebugValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Composite(node) => DebugComposite {
                node,
                ancestors: self.ancestors,
            }
            .fmt(f),
        }
    }
}

impl fmt::Debug for DebugComposite<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.node.id();
        if self.ancestors.borrow().contains(&id) {
            return write!(f, "<cycle {id}>");
        }

        self.ancestors.borrow_mut().push(id);
        let composite = self.node.borrow();
        let res = match &*composite {
            Composite::Array(items) => f
                .debug_list()
                .entries(items.iter().map(|value| DebugValue {
                    value,
                    ancestors: self.ancestors,
                }))
                .finish(),
            Composite::Object(object) => f
                .debug_map()
                .entries(object.iter().map(|(name, value)| {
                    (
                        name,
                        DebugValue {
                            value,
                            ancestors: self.ancestors,
                        },
                    )
                }))
                .finish(),
        };
        self.ancestors.borrow_mut().pop();
        res
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Composite(node)
    }
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(value: Option<V>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
