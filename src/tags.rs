//! Field annotations
//!
//! Fields carry annotations in the familiar `key:"value"` form, e.g.
//!
//! ```text
//! json:"id,omitempty" description:"the id" default:"1" min:"0"
//! ```
//!
//! This module only reads them: it tokenizes the literal, interprets the
//! `json` key and turns `default`/`example` texts into JSON values that fit
//! the field's type. Applying them to a schema is the walker's job.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::reflect::{Kind, TypeDesc};

/// Prefix for annotations that target the element schema of an array.
pub const ITEM_PREFIX: &str = "item-";

/// Annotation keys understood by the walker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKey {
    Description,
    Format,
    Default,
    Example,
    Examples,
    Pattern,
    Min,
    Max,
}

impl TagKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKey::Description => "description",
            TagKey::Format => "format",
            TagKey::Default => "default",
            TagKey::Example => "example",
            TagKey::Examples => "examples",
            TagKey::Pattern => "pattern",
            TagKey::Min => "min",
            TagKey::Max => "max",
        }
    }
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"([^\s:"]+):"((?:[^"\\]|\\.)*)""#).expect("tag pattern is valid")
    })
}

/// Ordered annotations of one field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    entries: Vec<(String, String)>,
}

impl Tags {
    /// Parse a `key:"value" key2:"value2"` literal.
    ///
    /// Malformed segments are skipped. Values are unquoted with JSON string
    /// escapes; a value that is not a valid escape sequence is kept verbatim.
    pub fn parse(literal: &str) -> Self {
        let entries = tag_pattern()
            .captures_iter(literal)
            .map(|caps| {
                let key = caps[1].to_string();
                let quoted = &caps[2];
                let value = serde_json::from_str::<String>(&format!("\"{}\"", quoted))
                    .unwrap_or_else(|_| quoted.to_string());
                (key, value)
            })
            .collect();
        Self { entries }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    pub fn extend(&mut self, other: Tags) {
        self.entries.extend(other.entries);
    }

    /// Value of a key. The last occurrence wins.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of a well-known key, optionally prefixed (see [`ITEM_PREFIX`]).
    pub fn lookup(&self, prefix: &str, key: TagKey) -> Option<&str> {
        if prefix.is_empty() {
            self.get(key.as_str())
        } else {
            self.get(&format!("{}{}", prefix, key.as_str()))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The interpreted `json` annotation, if any.
    pub fn json(&self) -> Option<JsonTag> {
        self.get("json").map(JsonTag::parse)
    }
}

/// Interpretation of the `json` annotation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonTag {
    /// Property name override
    pub name: Option<String>,
    pub ignore: bool,
    /// The property may be absent
    pub omitempty: bool,
    /// The value is encoded as a JSON string
    pub string: bool,
}

impl JsonTag {
    pub fn parse(value: &str) -> Self {
        if value == "-" {
            return Self {
                ignore: true,
                ..Self::default()
            };
        }

        let (name, options) = value.split_once(',').unwrap_or((value, ""));
        let has = |option: &str| options.split(',').any(|o| o == option);

        Self {
            name: (!name.is_empty()).then(|| name.to_string()),
            ignore: false,
            omitempty: has("omitempty"),
            string: has("string"),
        }
    }
}

// =============================================================================
// Literal Values
// =============================================================================

/// Turn an annotation text into a JSON value valid for `ty`.
///
/// The text is first read as JSON. If that is not valid data for the type it
/// is read again as a plain string, so `default:"hello"` works for string
/// fields without extra quoting.
pub fn parse_literal(text: &str, ty: &TypeDesc) -> Result<Value, String> {
    let first = match serde_json::from_str::<Value>(text) {
        Ok(value) => match conforms(&value, ty) {
            Ok(()) => return Ok(value),
            Err(reason) => reason,
        },
        Err(e) => e.to_string(),
    };

    let value = Value::String(text.to_string());
    match conforms(&value, ty) {
        Ok(()) => Ok(value),
        Err(_) => Err(first),
    }
}

/// Read an `examples` annotation: a JSON array of values valid for `ty`.
pub fn parse_examples(text: &str, ty: &TypeDesc) -> Result<Vec<Value>, String> {
    let list = match serde_json::from_str::<Value>(text).map_err(|e| e.to_string())? {
        Value::Array(list) => list,
        other => return Err(format!("expected a JSON array, got {}", other)),
    };
    for value in &list {
        conforms(value, ty)?;
    }
    Ok(list)
}

/// Check that `value` is valid data for `ty`.
pub fn conforms(value: &Value, ty: &TypeDesc) -> Result<(), String> {
    if let Some(values) = &ty.enum_values {
        return if values.contains(value) {
            Ok(())
        } else {
            Err(format!("{} is not a value of {}", value, ty.key()))
        };
    }

    let mismatch = || format!("cannot use {} as {}", value, ty.kind.name());

    match &ty.kind {
        Kind::Bool => value.is_boolean().then_some(()).ok_or_else(mismatch),
        Kind::Int(bits) => match value.as_i64().map(i128::from).or_else(|| value.as_u64().map(i128::from)) {
            Some(n) if fits_signed(n, *bits) => Ok(()),
            Some(_) => Err(format!("{} overflows a {}-bit signed integer", value, bits)),
            None => Err(mismatch()),
        },
        Kind::Uint(bits) => match value.as_u64() {
            Some(n) if fits_unsigned(n, *bits) => Ok(()),
            Some(_) => Err(format!("{} overflows a {}-bit unsigned integer", value, bits)),
            None => Err(mismatch()),
        },
        Kind::Float | Kind::Complex => value.is_number().then_some(()).ok_or_else(mismatch),
        Kind::String => value.is_string().then_some(()).ok_or_else(mismatch),
        Kind::Interface => Ok(()),
        Kind::Pointer(elem) => match value {
            Value::Null => Ok(()),
            _ => conforms(value, &elem.get()),
        },
        Kind::Slice(elem) => match value {
            Value::Null => Ok(()),
            Value::Array(list) => {
                let elem = elem.get();
                list.iter().try_for_each(|v| conforms(v, &elem))
            }
            _ => Err(mismatch()),
        },
        Kind::Array(elem, len) => match value {
            Value::Array(list) if list.len() <= *len => {
                let elem = elem.get();
                list.iter().try_for_each(|v| conforms(v, &elem))
            }
            Value::Array(list) => Err(format!(
                "array of {} elements does not fit length {}",
                list.len(),
                len
            )),
            _ => Err(mismatch()),
        },
        Kind::Map(_, elem) => match value {
            Value::Null => Ok(()),
            Value::Object(map) => {
                let elem = elem.get();
                map.values().try_for_each(|v| conforms(v, &elem))
            }
            _ => Err(mismatch()),
        },
        Kind::Struct(fields) => match value {
            // Decoding null into a struct leaves it untouched.
            Value::Null => Ok(()),
            Value::Object(map) => map.iter().try_for_each(|(key, v)| {
                match find_field(fields, key, &mut Vec::new()) {
                    Some(field_ty) => conforms(v, &field_ty),
                    None => Ok(()),
                }
            }),
            _ => Err(mismatch()),
        },
        Kind::Other(_) => Err(mismatch()),
    }
}

fn fits_signed(n: i128, bits: u32) -> bool {
    if bits >= 128 {
        return true;
    }
    let half = 1i128 << (bits - 1);
    (-half..half).contains(&n)
}

fn fits_unsigned(n: u64, bits: u32) -> bool {
    bits >= 64 || n < (1u64 << bits)
}

/// Find the type of the property `key`, looking into embedded structs.
/// Unknown keys are ignored by decoders, so they are not an error.
///
/// `embedding` holds the structs being searched; a struct that embeds itself
/// is searched once.
fn find_field(fields: &[crate::reflect::Field], key: &str, embedding: &mut Vec<String>) -> Option<TypeDesc> {
    for field in fields.iter().filter(|f| f.exported) {
        let tag = field.tags.json().unwrap_or_default();
        if tag.ignore {
            continue;
        }
        let target = field.ty.get().indirect();
        if field.embedded && tag.name.is_none() && matches!(target.kind, Kind::Struct(_)) {
            let embedded = target.key();
            if embedding.contains(&embedded) {
                continue;
            }
            embedding.push(embedded);
            let found = find_field(target.fields(), key, embedding);
            embedding.pop();
            if found.is_some() {
                return found;
            }
            continue;
        }
        let name = tag.name.as_deref().unwrap_or(&field.name);
        if name.eq_ignore_ascii_case(key) {
            return Some(field.ty.get());
        }
    }
    None
}
