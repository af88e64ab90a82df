//! Type walker
//!
//! Converts a [`TypeDesc`] into a [`Schema`], registering every named type
//! it meets in the definition table. The order of checks for one type is:
//!
//! 1. already in the table: return a reference
//! 2. insert a placeholder, so cycles end at step 1
//! 3. replacement handler
//! 4. enum values
//! 5. polymorphism group
//! 6. structural kind
//! 7. hijack
//!
//! Named types end up in the table and the caller gets a reference; anonymous
//! shapes are returned inline.

use tracing::{debug, trace, warn};

use crate::config::{InterfaceMode, NumericMode, SchemaOptions};
use crate::error::{Result, SchemaError};
use crate::extensions::{Extensions, Interfaces};
use crate::reflect::{EnumValues, Field, Kind, TypeDesc};
use crate::refs::RefResolver;
use crate::schema::{Ref, Schema, SchemaType, Types};
use crate::tags::{self, TagKey, Tags, ITEM_PREFIX};

/// One derivation pass over the state of a [`Schemas`](crate::Schemas)
pub struct Walker<'a> {
    resolver: &'a mut RefResolver,
    types: &'a mut Types,
    extensions: &'a Extensions,
    interfaces: &'a Interfaces,
    options: &'a SchemaOptions,
    /// IDs inserted during this pass, in insertion order
    added: Vec<String>,
    /// Keys of the embedded structs being flattened
    embedding: Vec<String>,
}

impl<'a> Walker<'a> {
    pub fn new(
        resolver: &'a mut RefResolver,
        types: &'a mut Types,
        extensions: &'a Extensions,
        interfaces: &'a Interfaces,
        options: &'a SchemaOptions,
    ) -> Self {
        Self {
            resolver,
            types,
            extensions,
            interfaces,
            options,
            added: Vec::new(),
            embedding: Vec::new(),
        }
    }

    /// IDs this pass added to the table.
    pub fn into_added(self) -> Vec<String> {
        self.added
    }

    /// Derive the schema of a type.
    pub fn define(&mut self, ty: &TypeDesc) -> Result<Schema> {
        // A nullable interface shares the identity of the interface.
        if let Kind::Pointer(elem) = &ty.kind {
            let elem = elem.get();
            if matches!(elem.kind, Kind::Interface) {
                let inner = self.define(&elem)?;
                return Ok(nullable(inner));
            }
        }

        let r = self.resolver.resolve(ty);
        if self.types.contains_key(&r.id) {
            trace!(id = %r.id, "reference hit");
            return Ok(Schema::reference(r));
        }

        let mut scm = Schema::default();
        if !r.package.is_empty() {
            scm.title = Some(r.name.clone());
            scm.description = Some(r.to_string());
        }

        if r.unique() {
            debug!(id = %r.id, ty = %r, "defining");
            self.types.insert(r.id.clone(), scm.clone());
            self.added.push(r.id.clone());
        }

        let extensions = self.extensions;
        if let Some(handler) = extensions.handler(&r) {
            return Ok(self.finish(&r, handler()));
        }

        if let Some(values) = &ty.enum_values {
            scm.enum_values = self.enum_list(values);
            return Ok(self.finish(&r, scm));
        }

        let interfaces = self.interfaces;
        if let Some(group) = interfaces.get(ty) {
            scm.r#type = None;
            for implementation in group.implementations() {
                let alt = self.define(implementation)?;
                scm.any_of.push(alt);
            }
        } else {
            self.define_kind(ty, &mut scm)?;
        }

        if let Some(hijack) = extensions.hijack(&r) {
            hijack(&mut scm);
        }

        Ok(self.finish(&r, scm))
    }

    fn define_kind(&mut self, ty: &TypeDesc, scm: &mut Schema) -> Result<()> {
        match &ty.kind {
            Kind::Interface => {
                scm.r#type = match self.options.interfaces {
                    InterfaceMode::Permissive => None,
                    InterfaceMode::Object => Some(SchemaType::Object),
                };
            }
            Kind::Bool => scm.r#type = Some(SchemaType::Boolean),
            Kind::String => scm.r#type = Some(SchemaType::String),
            Kind::Int(_) | Kind::Uint(_) => {
                scm.r#type = Some(match self.options.numeric {
                    NumericMode::Split => SchemaType::Integer,
                    NumericMode::Number => SchemaType::Number,
                });
            }
            Kind::Float | Kind::Complex => scm.r#type = Some(SchemaType::Number),
            Kind::Slice(elem) => {
                scm.r#type = Some(SchemaType::Array);
                scm.items = Some(Box::new(self.define(&elem.get())?));
            }
            Kind::Array(elem, len) => {
                scm.r#type = Some(SchemaType::Array);
                scm.items = Some(Box::new(self.define(&elem.get())?));
                scm.min_items = Some(*len);
                scm.max_items = Some(*len);
            }
            Kind::Map(_, value) => {
                scm.r#type = Some(SchemaType::Object);
                let value = self.define(&value.get())?;
                scm.pattern_properties.insert(String::new(), value);
            }
            Kind::Struct(fields) => {
                scm.r#type = Some(SchemaType::Object);
                scm.additional_properties = Some(false);
                for field in fields {
                    if let Some(prop) = self.define_field(field)? {
                        scm.merge_props(prop);
                    }
                }
            }
            Kind::Pointer(elem) => {
                let mut wrapped = nullable(self.define(&elem.get())?);
                wrapped.title = wrapped.title.or_else(|| scm.title.take());
                wrapped.description = wrapped.description.or_else(|| scm.description.take());
                *scm = wrapped;
            }
            Kind::Other(name) => {
                warn!(kind = %name, ty = %ty.key(), "no JSON mapping for kind");
                scm.r#type = Some(SchemaType::Unknown);
            }
        }
        Ok(())
    }

    /// Derive the property a struct field contributes: `{properties, required}`.
    ///
    /// Returns `None` for fields that never appear in JSON.
    pub fn define_field(&mut self, field: &Field) -> Result<Option<Schema>> {
        if !field.exported {
            return Ok(None);
        }

        let tag = field.tags.json().unwrap_or_default();
        if tag.ignore {
            return Ok(None);
        }

        let ty = field.ty.get();
        let target = ty.indirect();

        if field.embedded && tag.name.is_none() && matches!(target.kind, Kind::Struct(_)) {
            return self.flatten(&target).map(Some);
        }

        let mut prop = self.define(&ty)?;
        load_tags(&*self.types, &mut prop, &field.name, &field.tags, &ty, "")?;

        if let (Some(elem), Some(items)) = (ty.element(), prop.items.as_deref_mut()) {
            load_tags(&*self.types, items, &field.name, &field.tags, &elem, ITEM_PREFIX)?;
        }

        if tag.string {
            prop.r#type = Some(SchemaType::String);
        }

        let name = tag.name.unwrap_or_else(|| field.name.clone());

        let mut scm = Schema::default();
        if !tag.omitempty {
            scm.required.add([name.clone()]);
        }
        scm.properties.insert(name, prop);
        Ok(Some(scm))
    }

    /// Merge the fields of an embedded struct into one property set.
    fn flatten(&mut self, target: &TypeDesc) -> Result<Schema> {
        let key = target.key();
        let mut merged = Schema::default();

        if self.embedding.contains(&key) {
            warn!(ty = %key, "embedding cycle, skipped");
            return Ok(merged);
        }

        self.embedding.push(key);
        let mut outcome = Ok(());
        for field in target.fields() {
            match self.define_field(field) {
                Ok(Some(prop)) => merged.merge_props(prop),
                Ok(None) => {}
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }
        self.embedding.pop();

        outcome.map(|()| merged)
    }

    fn enum_list(&self, values: &EnumValues) -> Vec<serde_json::Value> {
        let mut list = values.to_values();
        if self.options.sort_enums {
            list.sort_by_cached_key(|v| v.to_string());
        }
        list
    }

    /// Store the node of a named type and hand out a reference, or return
    /// an anonymous node as is.
    fn finish(&mut self, r: &Ref, scm: Schema) -> Schema {
        if r.unique() {
            self.types.insert(r.id.clone(), scm);
            Schema::reference(r.clone())
        } else {
            scm
        }
    }
}

/// Represent "value or null".
///
/// A reference becomes `anyOf: [ref, null]`. An inline node keeps its keywords
/// with `type` cleared and gets `anyOf: [node, null]`.
pub fn nullable(inner: Schema) -> Schema {
    let mut outer = inner;
    match outer.reference.take() {
        Some(r) => {
            outer.any_of = vec![Schema::reference(r), Schema::null()];
        }
        None => {
            let full = outer.clone();
            outer.r#type = None;
            outer.any_of = vec![full, Schema::null()];
        }
    }
    outer
}

/// The `type` that decides which bounds apply to a node.
fn effective_type(types: &Types, scm: &Schema) -> Option<SchemaType> {
    if let Some(t) = scm.r#type {
        return Some(t);
    }
    if let Some(r) = &scm.reference {
        return types.get(&r.id).and_then(|def| def.r#type);
    }
    scm.any_of.first().and_then(|alt| effective_type(types, alt))
}

/// Layer field annotations onto a node. `prefix` selects the annotation set,
/// see [`ITEM_PREFIX`].
fn load_tags(
    types: &Types,
    scm: &mut Schema,
    field: &str,
    tags: &Tags,
    ty: &TypeDesc,
    prefix: &str,
) -> Result<()> {
    let invalid = |key: TagKey, reason: String| SchemaError::InvalidTag {
        field: field.to_string(),
        tag: format!("{}{}", prefix, key.as_str()),
        reason,
    };

    if let Some(text) = tags.lookup(prefix, TagKey::Description) {
        scm.description = Some(text.to_string());
    }
    if let Some(text) = tags.lookup(prefix, TagKey::Format) {
        scm.format = Some(text.to_string());
    }
    if let Some(text) = tags.lookup(prefix, TagKey::Default) {
        let value = tags::parse_literal(text, ty).map_err(|e| invalid(TagKey::Default, e))?;
        scm.default = Some(value);
    }
    if let Some(text) = tags.lookup(prefix, TagKey::Example) {
        let value = tags::parse_literal(text, ty).map_err(|e| invalid(TagKey::Example, e))?;
        scm.example = Some(value);
    }
    if let Some(text) = tags.lookup(prefix, TagKey::Examples) {
        scm.examples = tags::parse_examples(text, ty).map_err(|e| invalid(TagKey::Examples, e))?;
    }

    let min = tags.lookup(prefix, TagKey::Min);
    let max = tags.lookup(prefix, TagKey::Max);

    match effective_type(types, scm) {
        Some(SchemaType::String) => {
            if let Some(pattern) = tags.lookup(prefix, TagKey::Pattern) {
                scm.pattern = Some(pattern.to_string());
            }
            scm.min_len = min.and_then(to_num).or(scm.min_len);
            scm.max_len = max.and_then(to_num).or(scm.max_len);
        }
        Some(SchemaType::Array) => {
            if scm.min_items.is_none() {
                scm.min_items = min.and_then(|v| v.trim().parse().ok());
            }
            if scm.max_items.is_none() {
                scm.max_items = max.and_then(|v| v.trim().parse().ok());
            }
        }
        Some(SchemaType::Integer | SchemaType::Number) | None => {
            scm.min = min.and_then(to_num).or(scm.min);
            scm.max = max.and_then(to_num).or(scm.max);
        }
        // Refinements layered on a reference
        Some(_) if scm.is_ref() => {
            scm.min = min.and_then(to_num).or(scm.min);
            scm.max = max.and_then(to_num).or(scm.max);
        }
        Some(_) => {}
    }

    Ok(())
}

fn to_num(text: &str) -> Option<f64> {
    text.trim().parse().ok()
}
