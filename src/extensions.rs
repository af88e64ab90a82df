//! Extension registry
//!
//! Two ways to change what the walker produces for a type:
//!
//! - per-type overrides ([`Extension`]): a handler that replaces the default
//!   derivation, or a hijack that adjusts the derived node afterwards;
//! - polymorphism groups ([`Interfaces`]): an interface type and its concrete
//!   implementations, expanded as `anyOf`.
//!
//! Registries belong to one [`Schemas`](crate::Schemas); there is no
//! process-wide default.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::checksum::Checksum;
use crate::reflect::TypeDesc;
use crate::schema::{Ref, Schema};

/// Produces the full schema of a type
pub type HandlerFn = Arc<dyn Fn() -> Schema + Send + Sync>;

/// Adjusts the derived schema of a type
pub type HijackFn = Arc<dyn Fn(&mut Schema) + Send + Sync>;

/// Per-type override
#[derive(Clone)]
pub enum Extension {
    /// Consulted before default derivation; its result is used as is
    Handler(HandlerFn),
    /// Run against the node after default derivation
    Hijack(HijackFn),
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extension::Handler(_) => f.write_str("Handler"),
            Extension::Hijack(_) => f.write_str("Hijack"),
        }
    }
}

/// Overrides keyed by type identity
#[derive(Debug, Clone, Default)]
pub struct Extensions {
    entries: HashMap<Checksum, Extension>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an override, replacing any earlier one for the same type.
    pub fn insert(&mut self, r: &Ref, ext: Extension) {
        self.entries.insert(r.hash.clone(), ext);
    }

    pub fn get(&self, r: &Ref) -> Option<&Extension> {
        self.entries.get(&r.hash)
    }

    pub fn handler(&self, r: &Ref) -> Option<&HandlerFn> {
        match self.get(r)? {
            Extension::Handler(h) => Some(h),
            Extension::Hijack(_) => None,
        }
    }

    pub fn hijack(&self, r: &Ref) -> Option<&HijackFn> {
        match self.get(r)? {
            Extension::Hijack(h) => Some(h),
            Extension::Handler(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Polymorphism Groups
// =============================================================================

/// An interface type with its implementations
#[derive(Debug, Clone)]
pub struct Group {
    pub interface: TypeDesc,
    /// Ordered by [`TypeDesc::key`] so `anyOf` output is deterministic
    implementations: BTreeMap<String, TypeDesc>,
}

impl Group {
    pub fn new(interface: TypeDesc) -> Self {
        Self {
            interface,
            implementations: BTreeMap::new(),
        }
    }

    /// Add an implementation. Implementations must be named types.
    pub fn add(&mut self, implementation: TypeDesc) -> &mut Self {
        self.implementations.insert(implementation.key(), implementation);
        self
    }

    pub fn implementations(&self) -> impl Iterator<Item = &TypeDesc> {
        self.implementations.values()
    }

    pub fn len(&self) -> usize {
        self.implementations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.implementations.is_empty()
    }
}

/// Polymorphism groups keyed by interface
#[derive(Debug, Clone, Default)]
pub struct Interfaces {
    groups: BTreeMap<String, Group>,
}

impl Interfaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the group of an interface.
    pub fn register(&mut self, interface: TypeDesc) -> &mut Group {
        self.groups
            .entry(interface.key())
            .or_insert_with(|| Group::new(interface))
    }

    /// Shortcut for `register(interface).add(implementation)`.
    pub fn implement(&mut self, interface: TypeDesc, implementation: TypeDesc) {
        self.register(interface).add(implementation);
    }

    /// The group of a type, if it is a registered interface.
    pub fn get(&self, ty: &TypeDesc) -> Option<&Group> {
        if ty.name.is_empty() {
            return None;
        }
        self.groups.get(&ty.key())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
