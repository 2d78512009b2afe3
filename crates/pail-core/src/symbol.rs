//! The symbol registry: stable names for function states.
//!
//! Every field, coefficient, and system function is reachable under a
//! stable symbol. Derived names follow a fixed convention: the base
//! name resolves to the current state, `<name>_n` to the previous
//! accepted timestep, and `<name>_i` to the in-iteration estimate.
//! Forms written against these names pick up the right state without
//! knowing where the function lives.

use indexmap::IndexMap;

use crate::error::{EntityKind, RegistryError};
use crate::function::FunctionRef;

/// Derived symbol for the previous-timestep state of `name`.
pub fn old_symbol(name: &str) -> String {
    format!("{name}_n")
}

/// Derived symbol for the in-iteration state of `name`.
pub fn iterated_symbol(name: &str) -> String {
    format!("{name}_i")
}

/// A symbol's binding state.
///
/// A placeholder reserves the name during population, before the
/// function exists (coefficients declared ahead of their expression
/// evaluation); callers can distinguish it from a bound entry.
#[derive(Clone, Debug)]
pub enum SymbolEntry {
    /// Registered, no function attached yet.
    Placeholder,
    /// Registered with a function attached.
    Bound(FunctionRef),
}

impl SymbolEntry {
    /// Whether a function is attached.
    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound(_))
    }

    /// The attached function, if any.
    pub fn function(&self) -> Option<&FunctionRef> {
        match self {
            Self::Placeholder => None,
            Self::Bound(f) => Some(f),
        }
    }
}

/// Maps symbols to function states and derived symbols to their base.
///
/// Registration is exactly-once: re-registering a symbol or an alias
/// is an error, never an overwrite. A placeholder may be upgraded to
/// bound exactly once via [`bind()`](SymbolRegistry::bind).
#[derive(Clone, Debug, Default)]
pub struct SymbolRegistry {
    symbols: IndexMap<String, SymbolEntry>,
    aliases: IndexMap<String, String>,
}

impl SymbolRegistry {
    /// Create an empty symbol registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` under `name`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if `name` is already present
    /// (placeholder or bound).
    pub fn register(&mut self, name: &str, function: FunctionRef) -> Result<(), RegistryError> {
        self.insert(name, SymbolEntry::Bound(function))
    }

    /// Register `name` with no function attached.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if `name` is already present.
    pub fn register_placeholder(&mut self, name: &str) -> Result<(), RegistryError> {
        self.insert(name, SymbolEntry::Placeholder)
    }

    /// Attach `function` to a previously registered placeholder.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if `name` was never registered;
    /// [`RegistryError::DuplicateName`] if it is already bound.
    pub fn bind(&mut self, name: &str, function: FunctionRef) -> Result<(), RegistryError> {
        match self.symbols.get_mut(name) {
            None => Err(RegistryError::NotFound {
                kind: EntityKind::Symbol,
                name: name.to_string(),
            }),
            Some(entry @ SymbolEntry::Placeholder) => {
                *entry = SymbolEntry::Bound(function);
                Ok(())
            }
            Some(SymbolEntry::Bound(_)) => Err(RegistryError::DuplicateName {
                kind: EntityKind::Symbol,
                name: name.to_string(),
            }),
        }
    }

    /// Fetch the entry registered under `name`.
    ///
    /// The entry may still be a placeholder; callers that need a
    /// function use [`fetch_function()`](SymbolRegistry::fetch_function).
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if `name` was never registered.
    pub fn fetch(&self, name: &str) -> Result<&SymbolEntry, RegistryError> {
        self.symbols.get(name).ok_or_else(|| RegistryError::NotFound {
            kind: EntityKind::Symbol,
            name: name.to_string(),
        })
    }

    /// Fetch the function bound under `name`, or `None` for a placeholder.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if `name` was never registered.
    pub fn fetch_function(&self, name: &str) -> Result<Option<FunctionRef>, RegistryError> {
        Ok(self.fetch(name)?.function().cloned())
    }

    /// Whether `name` is registered (placeholder or bound).
    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Register the alias `name` → `base_name`.
    ///
    /// The mapping is one-directional: it resolves a possibly-derived
    /// symbol back to its root concept.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if an alias for `name` exists.
    pub fn register_alias(&mut self, base_name: &str, name: &str) -> Result<(), RegistryError> {
        if self.aliases.contains_key(name) {
            return Err(RegistryError::DuplicateName {
                kind: EntityKind::BaseSymbol,
                name: name.to_string(),
            });
        }
        self.aliases.insert(name.to_string(), base_name.to_string());
        Ok(())
    }

    /// Resolve `name` to its base symbol.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if no alias was registered for `name`.
    pub fn base_symbol(&self, name: &str) -> Result<&str, RegistryError> {
        self.aliases
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| RegistryError::NotFound {
                kind: EntityKind::BaseSymbol,
                name: name.to_string(),
            })
    }

    /// Whether an alias is registered for `name`.
    pub fn contains_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// Iterate registered symbols in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SymbolEntry)> {
        self.symbols.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn insert(&mut self, name: &str, entry: SymbolEntry) -> Result<(), RegistryError> {
        if self.symbols.contains_key(name) {
            return Err(RegistryError::DuplicateName {
                kind: EntityKind::Symbol,
                name: name.to_string(),
            });
        }
        self.symbols.insert(name.to_string(), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::Function;

    #[test]
    fn derived_symbol_convention() {
        assert_eq!(old_symbol("u"), "u_n");
        assert_eq!(iterated_symbol("u"), "u_i");
    }

    #[test]
    fn register_twice_rejected() {
        let mut reg = SymbolRegistry::new();
        reg.register("u", Function::new("u", 1).into_shared()).unwrap();
        let err = reg
            .register("u", Function::new("u", 1).into_shared())
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName { .. }));
    }

    #[test]
    fn placeholder_distinguishable_from_bound() {
        let mut reg = SymbolRegistry::new();
        reg.register_placeholder("kappa").unwrap();
        reg.register("u", Function::new("u", 1).into_shared()).unwrap();

        assert!(!reg.fetch("kappa").unwrap().is_bound());
        assert!(reg.fetch("u").unwrap().is_bound());
        assert!(reg.fetch_function("kappa").unwrap().is_none());
        assert!(reg.fetch_function("u").unwrap().is_some());
    }

    #[test]
    fn bind_upgrades_placeholder_once() {
        let mut reg = SymbolRegistry::new();
        reg.register_placeholder("kappa").unwrap();
        reg.bind("kappa", Function::new("kappa", 2).into_shared())
            .unwrap();
        assert!(reg.fetch("kappa").unwrap().is_bound());

        let err = reg
            .bind("kappa", Function::new("kappa", 2).into_shared())
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName { .. }));
    }

    #[test]
    fn bind_unregistered_rejected() {
        let mut reg = SymbolRegistry::new();
        let err = reg
            .bind("ghost", Function::new("ghost", 1).into_shared())
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
    }

    #[test]
    fn fetch_unregistered_rejected() {
        let reg = SymbolRegistry::new();
        assert!(matches!(
            reg.fetch("u"),
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[test]
    fn aliases_resolve_to_base() {
        let mut reg = SymbolRegistry::new();
        reg.register_alias("u", "u").unwrap();
        reg.register_alias("u", "u_n").unwrap();
        reg.register_alias("u", "u_i").unwrap();

        assert_eq!(reg.base_symbol("u_n").unwrap(), "u");
        assert_eq!(reg.base_symbol("u_i").unwrap(), "u");
        assert!(matches!(
            reg.base_symbol("v"),
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[test]
    fn duplicate_alias_rejected() {
        let mut reg = SymbolRegistry::new();
        reg.register_alias("u", "u_n").unwrap();
        let err = reg.register_alias("v", "u_n").unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName { .. }));
    }
}
