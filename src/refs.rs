//! Reference resolution
//!
//! Assigns every distinct type a stable ID. IDs are the bare type name with
//! generic arguments stripped; when different types share a bare name they
//! are numbered in first-seen order: `Node`, `Node1`, `Node2`, ...

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::checksum::Checksum;
use crate::reflect::{Kind, TypeDesc};
use crate::schema::Ref;

fn generic_suffix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\[.+\]|<.+>)$").expect("generic pattern is valid"))
}

/// Strip trailing generic arguments: `Page<User>` and `Page[User]` become `Page`.
pub fn trim_generic(name: &str) -> String {
    generic_suffix().replace(name, "").into_owned()
}

/// Assigns IDs to types
#[derive(Debug, Clone)]
pub struct RefResolver {
    prefix: String,
    /// bare name -> hash -> index in first-seen order
    names: HashMap<String, HashMap<Checksum, usize>>,
}

impl RefResolver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            names: HashMap::new(),
        }
    }

    /// Prefix of every `$ref` path
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Resolve the identifier of a type, registering it on first sight.
    pub fn resolve(&mut self, ty: &TypeDesc) -> Ref {
        if let Some(iface) = pointee_interface(ty) {
            return self.resolve(&iface);
        }
        self.resolve_name(&ty.package, &ty.name)
    }

    pub fn resolve_name(&mut self, package: &str, name: &str) -> Ref {
        let hash = Checksum::of_type(package, name);
        let base = trim_generic(name);

        let list = self.names.entry(base.clone()).or_default();
        let next = list.len();
        let index = *list.entry(hash.clone()).or_insert(next);

        self.build(package, name, hash, base, index)
    }

    /// Identifier of an already seen type, without registering anything.
    pub fn lookup(&self, ty: &TypeDesc) -> Option<Ref> {
        if let Some(iface) = pointee_interface(ty) {
            return self.lookup(&iface);
        }

        let hash = Checksum::of_type(&ty.package, &ty.name);
        let base = trim_generic(&ty.name);
        let index = *self.names.get(&base)?.get(&hash)?;

        Some(self.build(&ty.package, &ty.name, hash, base, index))
    }

    fn build(&self, package: &str, name: &str, hash: Checksum, base: String, index: usize) -> Ref {
        let id = if index == 0 {
            base
        } else {
            format!("{}{}", base, index)
        };

        Ref {
            defs: self.prefix.clone(),
            package: package.to_string(),
            name: name.to_string(),
            hash,
            id,
        }
    }
}

fn pointee_interface(ty: &TypeDesc) -> Option<TypeDesc> {
    match &ty.kind {
        Kind::Pointer(elem) => {
            let elem = elem.get();
            matches!(elem.kind, Kind::Interface).then_some(elem)
        }
        _ => None,
    }
}
