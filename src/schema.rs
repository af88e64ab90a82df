//! Schema node model
//!
//! [`Schema`] is a strict subset of JSON Schema. Unset fields are omitted
//! when serialized, so a default node renders as `{}` (accepts anything).

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::checksum::Checksum;

/// Properties of an object, keyed by property name
pub type Properties = BTreeMap<String, Schema>;

/// Definition table, keyed by disambiguated ID
pub type Types = BTreeMap<String, Schema>;

/// Value of the `type` keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Object,
    Array,
    Boolean,
    Null,
    /// Marks a kind that has no JSON mapping. Not a JSON Schema type.
    Unknown,
}

// =============================================================================
// Ref
// =============================================================================

/// Identifier of one named type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ref {
    /// Prefix of the reference path, e.g. `#/$defs`
    pub defs: String,
    pub package: String,
    pub name: String,
    /// Hash of package and name
    pub hash: Checksum,
    /// Disambiguated ID, unique within one [`Schemas`](crate::Schemas)
    pub id: String,
}

impl Ref {
    /// The `$ref` value
    pub fn path(&self) -> String {
        format!("{}/{}", self.defs, self.id)
    }

    /// Only types with both a namespace and a name get a definition entry.
    pub fn unique(&self) -> bool {
        !self.package.is_empty() && !self.name.is_empty()
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.name)
    }
}

impl Serialize for Ref {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.path())
    }
}

// =============================================================================
// Required
// =============================================================================

/// Ordered list of required property names without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Required(Vec<String>);

impl Required {
    /// Add names that are not in the list yet, keeping first-seen order.
    pub fn add<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.has(&name) {
                self.0.push(name);
            }
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn remove(&mut self, name: &str) {
        self.0.retain(|n| n != name);
    }
}

impl Deref for Required {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

// =============================================================================
// Schema
// =============================================================================

/// One node of a JSON Schema document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Value>,

    // Any type validation
    #[serde(rename = "anyOf", skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Schema>,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<Ref>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub r#type: Option<SchemaType>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
    #[serde(rename = "patternProperties", skip_serializing_if = "BTreeMap::is_empty")]
    pub pattern_properties: Properties,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    // Number validation
    #[serde(rename = "maximum", skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(rename = "minimum", skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    // String validation
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_len: Option<f64>,
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_len: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    // Array validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,

    // Object validation
    #[serde(skip_serializing_if = "Required::is_empty")]
    pub required: Required,
    #[serde(rename = "additionalProperties", skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,

    #[serde(rename = "$defs", skip_serializing_if = "BTreeMap::is_empty")]
    pub defs: Types,
}

impl Schema {
    /// A bare reference node
    pub fn reference(r: Ref) -> Self {
        Self {
            reference: Some(r),
            ..Self::default()
        }
    }

    pub fn typed(t: SchemaType) -> Self {
        Self {
            r#type: Some(t),
            ..Self::default()
        }
    }

    pub fn null() -> Self {
        Self::typed(SchemaType::Null)
    }

    pub fn is_ref(&self) -> bool {
        self.reference.is_some()
    }

    /// Rewrite the prefix of every reference in this tree.
    pub fn change_defs(&mut self, to: &str) {
        if let Some(r) = &mut self.reference {
            r.defs = to.to_string();
        }
        for s in &mut self.any_of {
            s.change_defs(to);
        }
        for s in self.properties.values_mut() {
            s.change_defs(to);
        }
        for s in self.pattern_properties.values_mut() {
            s.change_defs(to);
        }
        if let Some(items) = &mut self.items {
            items.change_defs(to);
        }
        for s in self.defs.values_mut() {
            s.change_defs(to);
        }
    }

    /// Merge properties of `other` that this node does not have yet, and
    /// its required names.
    pub fn merge_props(&mut self, other: Schema) {
        for (name, prop) in other.properties {
            self.properties.entry(name).or_insert(prop);
        }
        self.required.add(other.required.iter().cloned());
    }

    /// Visit every reference in this tree, embedded definitions included.
    pub fn visit_refs<'a>(&'a self, f: &mut impl FnMut(&'a Ref)) {
        if let Some(r) = &self.reference {
            f(r);
        }
        self.any_of.iter().for_each(|s| s.visit_refs(f));
        self.properties.values().for_each(|s| s.visit_refs(f));
        self.pattern_properties.values().for_each(|s| s.visit_refs(f));
        if let Some(items) = &self.items {
            items.visit_refs(f);
        }
        self.defs.values().for_each(|s| s.visit_refs(f));
    }

    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
