//! Name-keyed, registration-ordered stores.
//!
//! [`Registry`] is a single ordered associative container: one
//! `IndexMap` provides both name lookup and iteration in registration
//! order, so there is no second order-keyed map to keep in sync and no
//! insertion index derived from the map size.

use indexmap::IndexMap;

use crate::error::{EntityKind, RegistryError};

/// A name-keyed store preserving registration order.
///
/// Registration is exactly-once per name: re-registering is an error,
/// never an overwrite. Iteration order equals registration order.
#[derive(Clone, Debug)]
pub struct Registry<T> {
    kind: EntityKind,
    entries: IndexMap<String, T>,
}

impl<T> Registry<T> {
    /// Create an empty registry for entities of the given kind.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            entries: IndexMap::new(),
        }
    }

    /// What kind of entity this registry holds.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Register `value` under `name`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if `name` is already present.
    pub fn register(&mut self, name: &str, value: T) -> Result<(), RegistryError> {
        if self.entries.contains_key(name) {
            return Err(RegistryError::DuplicateName {
                kind: self.kind,
                name: name.to_string(),
            });
        }
        self.entries.insert(name.to_string(), value);
        Ok(())
    }

    /// Fetch the entry registered under `name`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if `name` was never registered.
    pub fn fetch(&self, name: &str) -> Result<&T, RegistryError> {
        self.entries.get(name).ok_or_else(|| RegistryError::NotFound {
            kind: self.kind,
            name: name.to_string(),
        })
    }

    /// Fetch the entry registered under `name`, mutably.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if `name` was never registered.
    pub fn fetch_mut(&mut self, name: &str) -> Result<&mut T, RegistryError> {
        let kind = self.kind;
        self.entries.get_mut(name).ok_or_else(|| RegistryError::NotFound {
            kind,
            name: name.to_string(),
        })
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Zero-based registration position of `name`, if registered.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.get_index_of(name)
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate entries mutably, in registration order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut T)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
