//! # Name Registry
//!
//! Name → object tables used to resolve the symbolic references in the
//! configuration tree (data converters, exception interceptors, interceptors,
//! finalizers, clients, workers).
//!
//! ## Overview
//!
//! Each table is tagged with the [`ReferenceKind`] it stores, so resolution
//! failures and name clashes report what kind of object was being looked up.
//! Registration is explicit and happens once during assembly:
//!
//! - registering an existing name fails with `DuplicateName`
//! - resolving an unknown name fails with `UnresolvedReference`
//!
//! ## Usage
//!
//! ```rust
//! use temporal_assembly::error::ReferenceKind;
//! use temporal_assembly::registry::NameRegistry;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut finalizers: NameRegistry<str> = NameRegistry::new(ReferenceKind::Finalizer);
//! finalizers.register("app.cleanup", Arc::from("cleanup"))?;
//!
//! assert_eq!(&*finalizers.resolve("app.cleanup")?, "cleanup");
//! assert!(finalizers.resolve("app.missing").is_err());
//! # Ok(())
//! # }
//! ```

use crate::error::{AssemblyError, AssemblyResult, ReferenceKind};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Table of named, shared objects of one kind
pub struct NameRegistry<T: ?Sized> {
    kind: ReferenceKind,
    entries: BTreeMap<String, Arc<T>>,
}

impl<T: ?Sized> NameRegistry<T> {
    pub fn new(kind: ReferenceKind) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    /// Register `value` under `name`; names are unique per registry
    pub fn register(&mut self, name: impl Into<String>, value: Arc<T>) -> AssemblyResult<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(AssemblyError::duplicate(self.kind, name));
        }
        debug!(kind = %self.kind, name = %name, "Registered named object");
        self.entries.insert(name, value);
        Ok(())
    }

    /// Resolve a reference, failing on unknown names
    pub fn resolve(&self, name: &str) -> AssemblyResult<Arc<T>> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| AssemblyError::unresolved(self.kind, name))
    }

    /// Resolve every name in order, failing on the first unknown one
    pub fn resolve_all(&self, names: &[String]) -> AssemblyResult<Vec<Arc<T>>> {
        names.iter().map(|name| self.resolve(name)).collect()
    }

    /// Lookup for optional references
    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: ?Sized> Clone for NameRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            entries: self.entries.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for NameRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameRegistry")
            .field("kind", &self.kind)
            .field("names", &self.names())
            .finish()
    }
}
