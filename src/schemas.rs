//! Schema set
//!
//! [`Schemas`] owns one definition table together with the state that
//! produced it: the reference resolver, per-type extensions and polymorphism
//! groups. Every entry point that derives a type goes through the walker and
//! leaves the result in the table.
//!
//! ```
//! use jschema::{Field, Reflect, Schemas, TypeDesc};
//!
//! struct User {
//!     name: String,
//!     email: Option<String>,
//! }
//!
//! impl Reflect for User {
//!     fn reflect() -> TypeDesc {
//!         TypeDesc::structure("app", "User")
//!             .field(Field::of::<String>("name").tag(r#"min:"1""#))
//!             .field(Field::of::<Option<String>>("email").tag(r#"json:",omitempty" format:"email""#))
//!     }
//! }
//!
//! let mut schemas = Schemas::new("");
//! let user = schemas.define::<User>().unwrap();
//! assert_eq!(user.to_json().unwrap()["$ref"], "#/$defs/User");
//! assert!(schemas.peek::<User>().is_some());
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::checksum::Checksum;
use crate::config::{SchemaConfig, SchemaOptions};
use crate::error::{Result, SchemaError};
use crate::extensions::{Extension, Extensions, Group, Interfaces};
use crate::graph::DefinitionGraph;
use crate::reflect::{Reflect, TypeDesc};
use crate::refs::RefResolver;
use crate::schema::{Ref, Schema, SchemaType, Types};
use crate::walker::Walker;

/// Reference prefix of standalone documents
pub const STANDALONE_PREFIX: &str = "#/$defs";

/// Definition table and derivation state
#[derive(Debug, Clone)]
pub struct Schemas {
    resolver: RefResolver,
    types: Types,
    extensions: Extensions,
    interfaces: Interfaces,
    options: SchemaOptions,
}

impl Default for Schemas {
    fn default() -> Self {
        Self::new("")
    }
}

impl Schemas {
    /// Create an empty set. `prefix` is used for every `$ref` path, e.g. with
    /// `#/components/schemas` a reference looks like
    /// `#/components/schemas/Node`. An empty prefix means `#/$defs`.
    pub fn new(prefix: &str) -> Self {
        Self::with_options(SchemaOptions::with_prefix(prefix))
    }

    pub fn with_options(mut options: SchemaOptions) -> Self {
        if options.ref_prefix.is_empty() {
            options.ref_prefix = SchemaOptions::default().ref_prefix;
        }

        Self {
            resolver: RefResolver::new(options.ref_prefix.clone()),
            types: Types::new(),
            extensions: Extensions::new(),
            interfaces: Interfaces::new(),
            options,
        }
    }

    /// Create a set that starts with prepared polymorphism groups.
    pub fn with_interfaces(prefix: &str, interfaces: Interfaces) -> Self {
        let mut schemas = Self::new(prefix);
        schemas.interfaces = interfaces;
        schemas
    }

    pub fn from_config(config: &SchemaConfig) -> Self {
        Self::with_options(config.schemas.clone())
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    pub fn prefix(&self) -> &str {
        self.resolver.prefix()
    }

    // =========================================================================
    // Derivation
    // =========================================================================

    /// Derive the schema of `T`. Named types are stored in the table and a
    /// reference is returned.
    pub fn define<T: Reflect + ?Sized>(&mut self) -> Result<Schema> {
        self.define_type(&T::reflect())
    }

    /// Derive the schema of a type description.
    ///
    /// # Errors
    ///
    /// Fails on a field annotation that is not valid data for the field's
    /// type. Definitions added by the failed call are removed again.
    pub fn define_type(&mut self, ty: &TypeDesc) -> Result<Schema> {
        let mut walker = Walker::new(
            &mut self.resolver,
            &mut self.types,
            &self.extensions,
            &self.interfaces,
            &self.options,
        );
        let result = walker.define(ty);
        let added = walker.into_added();

        if let Err(e) = &result {
            warn!(ty = %ty.key(), error = %e, rolled_back = added.len(), "derivation failed");
            for id in &added {
                self.types.remove(id);
            }
        } else if !added.is_empty() {
            debug!(ty = %ty.key(), added = added.len(), "derivation done");
        }

        result
    }

    pub fn resolve<T: Reflect + ?Sized>(&mut self) -> Ref {
        self.resolve_type(&T::reflect())
    }

    /// Identifier of a type, registering its name on first sight.
    pub fn resolve_type(&mut self, ty: &TypeDesc) -> Ref {
        self.resolver.resolve(ty)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// The stored schema of `T`, without deriving anything.
    pub fn peek<T: Reflect + ?Sized>(&self) -> Option<&Schema> {
        self.peek_type(&T::reflect())
    }

    pub fn peek_type(&self, ty: &TypeDesc) -> Option<&Schema> {
        let r = self.resolver.lookup(ty)?;
        self.types.get(&r.id)
    }

    /// Follow a reference node to its definition. Inline nodes are returned
    /// as they are.
    pub fn peek_schema<'s>(&'s self, scm: &'s Schema) -> Option<&'s Schema> {
        match &scm.reference {
            Some(r) => self.types.get(&r.id),
            None => Some(scm),
        }
    }

    pub fn peek_mut<T: Reflect + ?Sized>(&mut self) -> Option<&mut Schema> {
        self.peek_type_mut(&T::reflect())
    }

    pub fn peek_type_mut(&mut self, ty: &TypeDesc) -> Option<&mut Schema> {
        let r = self.resolver.lookup(ty)?;
        self.types.get_mut(&r.id)
    }

    /// Replace the stored schema of a type, keeping its title and description.
    /// The type is derived first if needed.
    pub fn set_schema(&mut self, ty: &TypeDesc, scm: Schema) -> Result<()> {
        self.define_type(ty)?;
        let entry = self
            .peek_type_mut(ty)
            .ok_or_else(|| SchemaError::NotDefined(ty.key()))?;

        let title = entry.title.take();
        let description = entry.description.take();
        *entry = scm;
        entry.title = title;
        entry.description = description;
        Ok(())
    }

    /// Overwrite the description of an already defined type.
    pub fn description(&mut self, ty: &TypeDesc, text: impl Into<String>) -> Result<()> {
        let entry = self
            .peek_type_mut(ty)
            .ok_or_else(|| SchemaError::NotDefined(ty.key()))?;
        entry.description = Some(text.into());
        Ok(())
    }

    // =========================================================================
    // Extensions
    // =========================================================================

    /// Adjust the derived schema of `T` after default derivation.
    pub fn hijack<T: Reflect + ?Sized>(&mut self, f: impl Fn(&mut Schema) + Send + Sync + 'static) {
        self.hijack_type(&T::reflect(), f);
    }

    pub fn hijack_type(&mut self, ty: &TypeDesc, f: impl Fn(&mut Schema) + Send + Sync + 'static) {
        let r = self.resolver.resolve(ty);
        self.extensions.insert(&r, Extension::Hijack(Arc::new(f)));
    }

    /// Produce the whole schema of `T` instead of deriving it.
    pub fn handle<T: Reflect + ?Sized>(&mut self, f: impl Fn() -> Schema + Send + Sync + 'static) {
        self.handle_type(&T::reflect(), f);
    }

    pub fn handle_type(&mut self, ty: &TypeDesc, f: impl Fn() -> Schema + Send + Sync + 'static) {
        let r = self.resolver.resolve(ty);
        self.extensions.insert(&r, Extension::Handler(Arc::new(f)));
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Render chrono date-times as `date-time` strings and naive dates as
    /// `date` strings.
    pub fn hijack_time(&mut self) {
        self.hijack::<chrono::DateTime<chrono::Utc>>(|scm| {
            scm.r#type = Some(SchemaType::String);
            scm.format = Some("date-time".to_string());
            scm.additional_properties = None;
        });
        self.hijack::<chrono::NaiveDate>(|scm| {
            scm.r#type = Some(SchemaType::String);
            scm.format = Some("date".to_string());
            scm.additional_properties = None;
        });
    }

    /// Let `serde_json::Value` accept anything regardless of the interface mode.
    pub fn hijack_json_value(&mut self) {
        self.hijack::<Value>(|scm| {
            scm.r#type = None;
            scm.items = None;
        });
    }

    // =========================================================================
    // Polymorphism
    // =========================================================================

    /// Get or create the polymorphism group of an interface. Implementations
    /// added to the group are expanded as `anyOf` when the interface is
    /// first derived.
    pub fn register_interface(&mut self, interface: TypeDesc) -> &mut Group {
        self.interfaces.register(interface)
    }

    pub fn implement(&mut self, interface: TypeDesc, implementation: TypeDesc) {
        self.interfaces.implement(interface, implementation);
    }

    pub fn interfaces(&self) -> &Interfaces {
        &self.interfaces
    }

    /// Append an implementation to the `anyOf` of an interface, in call order.
    /// Works after the interface has been derived.
    ///
    /// Returns the schema of the implementation.
    pub fn define_implementation(&mut self, interface: &TypeDesc, implementation: &TypeDesc) -> Result<Schema> {
        self.define_type(interface)?;
        let alt = self.define_type(implementation)?;

        let entry = self
            .peek_type_mut(interface)
            .ok_or_else(|| SchemaError::NotDefined(interface.key()))?;
        entry.r#type = None;
        entry.any_of.push(alt.clone());

        Ok(alt)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// A node that accepts any of the given types.
    pub fn any_of(&mut self, types: &[TypeDesc]) -> Result<Schema> {
        let any_of = types
            .iter()
            .map(|ty| self.define_type(ty))
            .collect::<Result<Vec<_>>>()?;

        Ok(Schema {
            any_of,
            ..Schema::default()
        })
    }

    /// The schema of `T` pinned to exactly `value`.
    pub fn constant<T: Reflect + Serialize>(&mut self, value: &T) -> Result<Schema> {
        let mut scm = self.define::<T>()?;
        scm.enum_values = vec![serde_json::to_value(value)?];
        Ok(scm)
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Copy of the definition table
    pub fn json(&self) -> Types {
        self.types.clone()
    }

    pub fn types(&self) -> &Types {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.types)?)
    }

    /// Checksum of the exported table
    pub fn fingerprint(&self) -> Result<Checksum> {
        Ok(Checksum::from_json(&self.to_json()?))
    }

    /// A self-contained copy of `scm`: the whole table is embedded under
    /// `$defs` and every reference is rewritten to [`STANDALONE_PREFIX`].
    pub fn to_standalone(&self, scm: &Schema) -> Schema {
        self.detach(scm, self.types.clone())
    }

    /// Like [`to_standalone`](Self::to_standalone), but embeds only the
    /// definitions reachable from `scm`.
    pub fn to_standalone_pruned(&self, scm: &Schema) -> Schema {
        let reachable = self.graph().reachable_from(scm);
        let defs = self
            .types
            .iter()
            .filter(|(id, _)| reachable.contains(*id))
            .map(|(id, def)| (id.clone(), def.clone()))
            .collect();
        self.detach(scm, defs)
    }

    fn detach(&self, scm: &Schema, defs: Types) -> Schema {
        let mut out = scm.clone();
        out.defs = defs;
        out.change_defs(STANDALONE_PREFIX);
        out
    }

    /// Define `T` and return it as a standalone document.
    pub fn schema_for<T: Reflect + ?Sized>(&mut self) -> Result<Schema> {
        let scm = self.define::<T>()?;
        Ok(self.to_standalone(&scm))
    }

    pub fn schema_for_type(&mut self, ty: &TypeDesc) -> Result<Schema> {
        let scm = self.define_type(ty)?;
        Ok(self.to_standalone(&scm))
    }

    /// Reference graph of the current table
    pub fn graph(&self) -> DefinitionGraph {
        DefinitionGraph::build(&self.types)
    }
}

impl fmt::Display for Schemas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string_pretty(&self.types).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}
