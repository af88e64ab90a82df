//! Type descriptions
//!
//! Rust has no runtime reflection, so every type that takes part in schema
//! derivation describes its own shape through [`Reflect`]. A description is
//! a [`TypeDesc`]: an optional namespace and name, a structural [`Kind`] and,
//! for enum-like types, the ordered list of legal values.
//!
//! Nested types are referenced through [`TypeRef`], which is evaluated
//! lazily. That is what lets a self-referential type such as
//!
//! ```
//! use jschema::{Field, Reflect, TypeDesc};
//!
//! struct Node {
//!     id: i64,
//!     children: Vec<Option<Box<Node>>>,
//! }
//!
//! impl Reflect for Node {
//!     fn reflect() -> TypeDesc {
//!         TypeDesc::structure("app", "Node")
//!             .field(Field::of::<i64>("ID"))
//!             .field(Field::of::<Vec<Option<Box<Node>>>>("Children"))
//!     }
//! }
//! ```
//!
//! describe itself without building an infinite value.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SchemaError};
use crate::tags::Tags;

/// Types that can describe their own structural shape.
pub trait Reflect {
    fn reflect() -> TypeDesc;
}

// =============================================================================
// Type Reference
// =============================================================================

/// Lazily evaluated handle to a [`TypeDesc`].
#[derive(Clone)]
pub struct TypeRef(Arc<dyn Fn() -> TypeDesc + Send + Sync>);

impl TypeRef {
    /// Reference the description of a [`Reflect`] type.
    pub fn of<T: Reflect + ?Sized>() -> Self {
        let f: fn() -> TypeDesc = T::reflect;
        Self(Arc::new(f))
    }

    /// Reference a description produced on demand.
    pub fn lazy(f: impl Fn() -> TypeDesc + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Evaluate the description.
    pub fn get(&self) -> TypeDesc {
        (self.0)()
    }
}

impl From<TypeDesc> for TypeRef {
    fn from(desc: TypeDesc) -> Self {
        Self(Arc::new(move || desc.clone()))
    }
}

impl fmt::Debug for TypeRef {
    // Evaluating here could recurse forever on cyclic types.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TypeRef(..)")
    }
}

// =============================================================================
// Kind
// =============================================================================

/// Structural kind of a type
#[derive(Debug, Clone)]
pub enum Kind {
    Bool,
    /// Signed integers of the given bit width
    Int(u32),
    /// Unsigned integers of the given bit width
    Uint(u32),
    Float,
    Complex,
    String,
    /// Growable sequence
    Slice(TypeRef),
    /// Fixed size sequence
    Array(TypeRef, usize),
    /// Key and value type. Only string keyed maps are meaningful in JSON.
    Map(TypeRef, TypeRef),
    Struct(Vec<Field>),
    /// Nullable indirection (`Option<T>`)
    Pointer(TypeRef),
    /// Open sum type; its implementations come from a polymorphism group
    Interface,
    /// Anything without a JSON mapping, e.g. a function or a channel
    Other(String),
}

impl Kind {
    pub fn name(&self) -> &str {
        match self {
            Kind::Bool => "bool",
            Kind::Int(_) => "int",
            Kind::Uint(_) => "uint",
            Kind::Float => "float",
            Kind::Complex => "complex",
            Kind::String => "string",
            Kind::Slice(_) => "slice",
            Kind::Array(..) => "array",
            Kind::Map(..) => "map",
            Kind::Struct(_) => "struct",
            Kind::Pointer(_) => "pointer",
            Kind::Interface => "interface",
            Kind::Other(name) => name,
        }
    }
}

// =============================================================================
// Enum Values
// =============================================================================

/// Legal values of an enum-like type, in the order the type reports them
#[derive(Debug, Clone, PartialEq)]
pub enum EnumValues {
    /// Wire encoded values
    Raw(Vec<Value>),
    Strings(Vec<String>),
}

impl EnumValues {
    /// Serialize every value the way it goes over the wire.
    pub fn serialized<T: Serialize>(values: &[T]) -> Result<Self> {
        let list = values
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::Raw(list))
    }

    /// Parse raw JSON texts.
    pub fn from_raw(raw: &[&str]) -> Result<Self> {
        let list = raw
            .iter()
            .map(|r| serde_json::from_str(r))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::Raw(list))
    }

    pub fn strings<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::Strings(values.into_iter().map(Into::into).collect())
    }

    pub fn to_values(&self) -> Vec<Value> {
        match self {
            Self::Raw(list) => list.clone(),
            Self::Strings(list) => list.iter().cloned().map(Value::String).collect(),
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        match self {
            Self::Raw(list) => list.contains(value),
            Self::Strings(list) => value
                .as_str()
                .is_some_and(|s| list.iter().any(|v| v == s)),
        }
    }
}

// =============================================================================
// Field
// =============================================================================

/// A struct field
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: TypeRef,
    pub tags: Tags,
    /// Embedded fields are flattened into the parent struct
    pub embedded: bool,
    /// Private fields never appear in the schema
    pub exported: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            tags: Tags::default(),
            embedded: false,
            exported: true,
        }
    }

    pub fn of<T: Reflect + ?Sized>(name: impl Into<String>) -> Self {
        Self::new(name, TypeRef::of::<T>())
    }

    /// Parse annotations such as `json:"id,omitempty" description:"the id"`.
    pub fn tag(mut self, literal: &str) -> Self {
        self.tags.extend(Tags::parse(literal));
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags.extend(tags);
        self
    }

    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    pub fn private(mut self) -> Self {
        self.exported = false;
        self
    }
}

// =============================================================================
// Type Description
// =============================================================================

/// Structural description of a type
#[derive(Debug, Clone)]
pub struct TypeDesc {
    /// Namespace, empty for anonymous and builtin types
    pub package: String,
    /// Bare name, may carry generic arguments such as `Page<User>`
    pub name: String,
    pub kind: Kind,
    pub enum_values: Option<EnumValues>,
}

impl TypeDesc {
    /// An unnamed type of the given kind
    pub fn anonymous(kind: Kind) -> Self {
        Self {
            package: String::new(),
            name: String::new(),
            kind,
            enum_values: None,
        }
    }

    pub fn named(mut self, package: impl Into<String>, name: impl Into<String>) -> Self {
        self.package = package.into();
        self.name = name.into();
        self
    }

    pub fn structure(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self::anonymous(Kind::Struct(Vec::new())).named(package, name)
    }

    pub fn anonymous_struct(fields: Vec<Field>) -> Self {
        Self::anonymous(Kind::Struct(fields))
    }

    pub fn interface(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self::anonymous(Kind::Interface).named(package, name)
    }

    /// A named enum-like type over a base kind.
    pub fn enumeration(
        package: impl Into<String>,
        name: impl Into<String>,
        base: Kind,
        values: EnumValues,
    ) -> Self {
        Self::anonymous(base).named(package, name).with_enum(values)
    }

    pub fn slice(elem: impl Into<TypeRef>) -> Self {
        Self::anonymous(Kind::Slice(elem.into()))
    }

    pub fn array(elem: impl Into<TypeRef>, len: usize) -> Self {
        Self::anonymous(Kind::Array(elem.into(), len))
    }

    pub fn map(key: impl Into<TypeRef>, value: impl Into<TypeRef>) -> Self {
        Self::anonymous(Kind::Map(key.into(), value.into()))
    }

    pub fn pointer(elem: impl Into<TypeRef>) -> Self {
        Self::anonymous(Kind::Pointer(elem.into()))
    }

    /// Append a field. Ignored unless the kind is a struct.
    pub fn field(mut self, field: Field) -> Self {
        if let Kind::Struct(fields) = &mut self.kind {
            fields.push(field);
        }
        self
    }

    pub fn with_enum(mut self, values: EnumValues) -> Self {
        self.enum_values = Some(values);
        self
    }

    /// Stable key used to order polymorphism groups.
    pub fn key(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }

    pub fn fields(&self) -> &[Field] {
        match &self.kind {
            Kind::Struct(fields) => fields,
            _ => &[],
        }
    }

    /// The pointee for pointers, the type itself otherwise.
    pub fn indirect(&self) -> TypeDesc {
        match &self.kind {
            Kind::Pointer(elem) => elem.get(),
            _ => self.clone(),
        }
    }

    /// Element type of slices and arrays, looking through one pointer.
    pub fn element(&self) -> Option<TypeDesc> {
        match self.indirect().kind {
            Kind::Slice(elem) | Kind::Array(elem, _) => Some(elem.get()),
            _ => None,
        }
    }
}

/// Enum values built from a `Serialize` list.
///
/// # Errors
///
/// Fails if a value cannot be serialized to JSON.
pub fn enumeration_of<T: Serialize>(
    package: impl Into<String>,
    name: impl Into<String>,
    base: Kind,
    values: &[T],
) -> Result<TypeDesc> {
    let name = name.into();
    let values = EnumValues::serialized(values).map_err(|e| SchemaError::InvalidEnum {
        name: name.clone(),
        reason: e.to_string(),
    })?;
    Ok(TypeDesc::enumeration(package, name, base, values))
}

// =============================================================================
// Builtin Implementations
// =============================================================================

macro_rules! reflect_builtin {
    (sized $kind:path => $($t:ty),+) => {
        $(
            impl Reflect for $t {
                fn reflect() -> TypeDesc {
                    let mut desc = TypeDesc::anonymous($kind(<$t>::BITS));
                    desc.name = stringify!($t).to_string();
                    desc
                }
            }
        )+
    };
    ($kind:expr => $($t:ty),+) => {
        $(
            impl Reflect for $t {
                fn reflect() -> TypeDesc {
                    let mut desc = TypeDesc::anonymous($kind);
                    desc.name = stringify!($t).to_string();
                    desc
                }
            }
        )+
    };
}

reflect_builtin!(Kind::Bool => bool);
reflect_builtin!(sized Kind::Int => i8, i16, i32, i64, i128, isize);
reflect_builtin!(sized Kind::Uint => u8, u16, u32, u64, u128, usize);
reflect_builtin!(Kind::Float => f32, f64);
reflect_builtin!(Kind::String => char, str, String);

impl<T: Reflect> Reflect for Vec<T> {
    fn reflect() -> TypeDesc {
        TypeDesc::slice(TypeRef::of::<T>())
    }
}

impl<T: Reflect> Reflect for VecDeque<T> {
    fn reflect() -> TypeDesc {
        TypeDesc::slice(TypeRef::of::<T>())
    }
}

impl<T: Reflect, S> Reflect for HashSet<T, S> {
    fn reflect() -> TypeDesc {
        TypeDesc::slice(TypeRef::of::<T>())
    }
}

impl<T: Reflect> Reflect for BTreeSet<T> {
    fn reflect() -> TypeDesc {
        TypeDesc::slice(TypeRef::of::<T>())
    }
}

impl<T: Reflect> Reflect for [T] {
    fn reflect() -> TypeDesc {
        TypeDesc::slice(TypeRef::of::<T>())
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn reflect() -> TypeDesc {
        TypeDesc::array(TypeRef::of::<T>(), N)
    }
}

impl<K: Reflect, V: Reflect, S> Reflect for HashMap<K, V, S> {
    fn reflect() -> TypeDesc {
        TypeDesc::map(TypeRef::of::<K>(), TypeRef::of::<V>())
    }
}

impl<K: Reflect, V: Reflect> Reflect for BTreeMap<K, V> {
    fn reflect() -> TypeDesc {
        TypeDesc::map(TypeRef::of::<K>(), TypeRef::of::<V>())
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn reflect() -> TypeDesc {
        TypeDesc::pointer(TypeRef::of::<T>())
    }
}

impl<T: Reflect + ?Sized> Reflect for Box<T> {
    fn reflect() -> TypeDesc {
        T::reflect()
    }
}

impl<T: Reflect + ?Sized> Reflect for Rc<T> {
    fn reflect() -> TypeDesc {
        T::reflect()
    }
}

impl<T: Reflect + ?Sized> Reflect for Arc<T> {
    fn reflect() -> TypeDesc {
        T::reflect()
    }
}

impl Reflect for Value {
    fn reflect() -> TypeDesc {
        TypeDesc::interface("serde_json", "Value")
    }
}

// Every time zone serializes the same way, so they share one identity.
impl<Tz: chrono::TimeZone> Reflect for chrono::DateTime<Tz> {
    fn reflect() -> TypeDesc {
        TypeDesc::structure("chrono", "DateTime")
    }
}

impl Reflect for chrono::NaiveDate {
    fn reflect() -> TypeDesc {
        TypeDesc::structure("chrono", "NaiveDate")
    }
}
