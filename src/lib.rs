//! jschema
//!
//! Derives JSON Schema documents from type descriptions.
//!
//! ## Features
//!
//! - **Deduplicated definitions**: every named type is defined once and
//!   referenced through `$ref`
//! - **Cycle safe**: self and mutually referential types terminate
//! - **Stable identifiers**: name collisions get numbered IDs in first-seen order
//! - **Extensions**: per-type handlers and hijacks, enums, polymorphic interfaces
//! - **Standalone export**: self-contained documents with embedded `$defs`
//!
//! ## Architecture
//!
//! ```text
//! Reflect::reflect() ──► TypeDesc
//!                          │
//!                          ▼
//! Schemas::define ──► Walker ──► RefResolver (IDs)
//!                          │ ──► Extensions / Interfaces
//!                          │ ──► Tags (field annotations)
//!                          ▼
//!                    definition table ──► to_standalone / graph
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod extensions;
pub mod graph;
pub mod reflect;
pub mod refs;
pub mod schema;
pub mod schemas;
pub mod tags;
pub mod walker;

pub use checksum::Checksum;
pub use config::{
    ExportConfig, InterfaceMode, NumericMode, OutputFormat, SchemaConfig, SchemaOptions,
    DEFAULT_REF_PREFIX,
};
pub use error::{Result, SchemaError};
pub use extensions::{Extension, Extensions, Group, Interfaces};
pub use graph::DefinitionGraph;
pub use reflect::{enumeration_of, EnumValues, Field, Kind, Reflect, TypeDesc, TypeRef};
pub use refs::{trim_generic, RefResolver};
pub use schema::{Properties, Ref, Required, Schema, SchemaType, Types};
pub use schemas::{Schemas, STANDALONE_PREFIX};
pub use tags::{JsonTag, TagKey, Tags, ITEM_PREFIX};
