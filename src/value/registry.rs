//! Factory registry for decoding polymorphic values.
//!
//! The registry maps type identifiers (names and their hashes) to
//! factories producing default-initialized instances. It is an explicit
//! object handed into each decode call; nothing here is global.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{name_hash, Value, ValueRef};

/// Factory producing a fresh, default-initialized instance whose fields
/// the decoder then fills in.
pub type ValueFactory = Rc<dyn Fn() -> ValueRef>;

/// Registry of value factories, keyed by type name and by type hash.
///
/// # Example
///
/// ```ignore
/// let mut factories = ValueFactoryRegistry::new();
/// factories.register::<Item>();
/// let decoded = cursor.read_value(&factories)?;
/// ```
#[derive(Default)]
pub struct ValueFactoryRegistry {
    by_name: HashMap<String, ValueFactory>,
    by_hash: HashMap<u64, ValueFactory>,
}

impl ValueFactoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `T` under its own type name.
    pub fn register<T>(&mut self)
    where
        T: Value + Default + 'static,
    {
        let type_name = T::default().type_name();
        self.register_with(type_name, || Rc::new(RefCell::new(T::default())));
    }

    /// Register a custom factory under an explicit type name.
    /// A later registration for the same name replaces the earlier one.
    pub fn register_with(
        &mut self,
        type_name: &str,
        factory: impl Fn() -> ValueRef + 'static,
    ) {
        let factory: ValueFactory = Rc::new(factory);
        self.by_hash.insert(name_hash(type_name), factory.clone());
        self.by_name.insert(type_name.to_string(), factory);
    }

    /// Instantiate the type registered under `type_name`.
    pub fn create_by_name(&self, type_name: &str) -> Option<ValueRef> {
        self.by_name.get(type_name).map(|factory| factory())
    }

    /// Instantiate the type registered under `hash`.
    pub fn create_by_hash(&self, hash: u64) -> Option<ValueRef> {
        self.by_hash.get(&hash).map(|factory| factory())
    }

    /// Whether a type name is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.by_name.contains_key(type_name)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
