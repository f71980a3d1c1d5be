#![forbid(unsafe_code)]

//! Explicit adapter registration with a stated conflict policy.
//!
//! Registration rejects a duplicate key unless the caller passes
//! [`RegisterMode::Override`]. There is no shared mutable global to patch;
//! embedders own their registry instance and wire it where needed.

use rustc_hash::FxHashMap;

/// Conflict policy for one registration call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterMode {
    /// Fail with [`RegistryError::DuplicateKey`] when the key exists.
    Reject,
    /// Replace an existing entry for the key.
    Override,
}

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateKey { key: String },
}

impl core::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DuplicateKey { key } => {
                write!(f, "registry key '{key}' already exists (pass Override to replace)")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// A name-keyed registry of adapters or descriptors.
#[derive(Debug, Clone, Default)]
pub struct AdapterRegistry<T> {
    entries: FxHashMap<String, T>,
}

impl<T> AdapterRegistry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    /// Register `value` under `key` according to the conflict policy.
    pub fn register(&mut self, key: &str, value: T, mode: RegisterMode) -> Result<(), RegistryError> {
        if mode == RegisterMode::Reject && self.entries.contains_key(key) {
            return Err(RegistryError::DuplicateKey {
                key: key.to_owned(),
            });
        }
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered keys in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn duplicate_key_is_rejected_by_default() {
        let mut registry = AdapterRegistry::new();
        registry
            .register("pdfjs", 1, RegisterMode::Reject)
            .expect("first registration");
        let err = registry
            .register("pdfjs", 2, RegisterMode::Reject)
            .expect_err("duplicate must be rejected");
        assert_eq!(
            err,
            RegistryError::DuplicateKey {
                key: "pdfjs".to_owned()
            }
        );
        assert_eq!(registry.get("pdfjs"), Some(&1));
    }

    #[test]
    fn override_replaces_existing_entry() {
        let mut registry = AdapterRegistry::new();
        registry
            .register("pdfjs", 1, RegisterMode::Reject)
            .expect("first registration");
        registry
            .register("pdfjs", 2, RegisterMode::Override)
            .expect("override registration");
        assert_eq!(registry.get("pdfjs"), Some(&2));
        assert_eq!(registry.names(), vec!["pdfjs"]);
    }
}
