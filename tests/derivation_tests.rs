//! Derivation tests
//!
//! End-to-end checks of the definition table produced for small type graphs.

use jschema::{
    EnumValues, Field, InterfaceMode, Kind, NumericMode, Reflect, Schema, SchemaError, SchemaOptions,
    SchemaType, Schemas, TypeDesc, TypeRef,
};
use serde::Serialize;
use serde_json::{json, Value};

const PKG: &str = "app";

fn table(schemas: &Schemas) -> Value {
    schemas.to_json().unwrap()
}

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum Level {
    One,
    Three,
    Two,
}

impl Reflect for Level {
    fn reflect() -> TypeDesc {
        TypeDesc::enumeration(PKG, "Level", Kind::String, EnumValues::strings(["one", "two", "three"]))
    }
}

struct Node1;

impl Reflect for Node1 {
    fn reflect() -> TypeDesc {
        TypeDesc::structure(PKG, "Node1")
            .field(Field::of::<String>("Str").tag(r#"format:"email" pattern:"." min:"1" max:"10""#))
            .field(Field::of::<i32>("Num").tag(r#"json:"num,omitempty""#))
            .field(Field::of::<bool>("Bool").tag(r#"json:"bool""#))
            .field(Field::of::<String>("Ignore").tag(r#"json:"-""#))
            .field(Field::of::<Vec<Node1>>("Slice"))
            .field(Field::of::<[f64; 2]>("Arr").tag(r#"item-min:"0""#))
            .field(Field::of::<Option<Node2>>("Obj"))
            .field(Field::of::<Level>("Enum"))
            .field(Field::of::<Option<Level>>("EnumPtr"))
            .field(Field::of::<i32>("private").private())
    }
}

struct Node2;

impl Reflect for Node2 {
    fn reflect() -> TypeDesc {
        TypeDesc::structure(PKG, "Node2")
            .field(Field::of::<std::collections::HashMap<String, f64>>("Map"))
            .field(Field::new("Any", TypeDesc::anonymous(Kind::Interface)))
    }
}

struct Node;

impl Reflect for Node {
    fn reflect() -> TypeDesc {
        TypeDesc::structure(PKG, "Node")
            .field(Field::of::<i64>("ID"))
            .field(Field::of::<Vec<Option<Box<Node>>>>("Children"))
    }
}

fn plain(name: &str) -> TypeDesc {
    TypeDesc::structure(PKG, name)
}

// =============================================================================
// Structural Derivation
// =============================================================================

#[test]
fn test_common_schema() {
    let mut s = Schemas::new("");

    s.define::<Node1>().unwrap();
    s.define::<Node2>().unwrap();

    assert_eq!(
        s.define::<Node1>().unwrap().to_json().unwrap(),
        json!({"$ref": "#/$defs/Node1"})
    );

    assert_eq!(
        table(&s),
        json!({
            "Level": {
                "title": "Level",
                "description": "app.Level",
                "enum": ["one", "two", "three"],
            },
            "Node1": {
                "title": "Node1",
                "description": "app.Node1",
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "Arr": {
                        "type": "array",
                        "items": {"type": "number", "minimum": 0.0},
                        "minItems": 2,
                        "maxItems": 2,
                    },
                    "Enum": {"$ref": "#/$defs/Level"},
                    "EnumPtr": {"anyOf": [{"$ref": "#/$defs/Level"}, {"type": "null"}]},
                    "Obj": {"anyOf": [{"$ref": "#/$defs/Node2"}, {"type": "null"}]},
                    "Slice": {"type": "array", "items": {"$ref": "#/$defs/Node1"}},
                    "Str": {
                        "type": "string",
                        "format": "email",
                        "pattern": ".",
                        "minLength": 1.0,
                        "maxLength": 10.0,
                    },
                    "bool": {"type": "boolean"},
                    "num": {"type": "integer"},
                },
                "required": ["Str", "bool", "Slice", "Arr", "Obj", "Enum", "EnumPtr"],
            },
            "Node2": {
                "title": "Node2",
                "description": "app.Node2",
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "Any": {},
                    "Map": {"type": "object", "patternProperties": {"": {"type": "number"}}},
                },
                "required": ["Map", "Any"],
            },
        })
    );
}

#[test]
fn test_node_end_to_end() {
    let mut s = Schemas::new("");
    let root = s.define::<Node>().unwrap();

    assert_eq!(root.to_json().unwrap(), json!({"$ref": "#/$defs/Node"}));
    assert_eq!(s.len(), 1);
    assert_eq!(
        table(&s)["Node"],
        json!({
            "title": "Node",
            "description": "app.Node",
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "ID": {"type": "integer"},
                "Children": {
                    "type": "array",
                    "items": {"anyOf": [{"$ref": "#/$defs/Node"}, {"type": "null"}]},
                },
            },
            "required": ["ID", "Children"],
        })
    );
}

#[test]
fn test_node_numbers_only() {
    let mut s = Schemas::with_options(SchemaOptions {
        numeric: NumericMode::Number,
        ..SchemaOptions::default()
    });
    s.define::<Node>().unwrap();
    assert_eq!(table(&s)["Node"]["properties"]["ID"], json!({"type": "number"}));
}

#[test]
fn test_self_reference() {
    fn a() -> TypeDesc {
        plain("A").field(Field::new("A", TypeRef::lazy(|| TypeDesc::pointer(TypeRef::lazy(a)))))
    }

    let mut s = Schemas::new("");
    let out = s.define_type(&a()).unwrap();

    assert_eq!(out.to_json().unwrap(), json!({"$ref": "#/$defs/A"}));
    assert_eq!(
        table(&s)["A"]["properties"]["A"],
        json!({"anyOf": [{"$ref": "#/$defs/A"}, {"type": "null"}]})
    );
}

#[test]
fn test_pointer_wrapping_inline() {
    let mut s = Schemas::new("");
    let scm = s.define::<Option<Vec<String>>>().unwrap();

    assert_eq!(
        scm.to_json().unwrap(),
        json!({
            "items": {"type": "string"},
            "anyOf": [
                {"type": "array", "items": {"type": "string"}},
                {"type": "null"},
            ],
        })
    );
}

#[test]
fn test_required_set() {
    let ty = plain("Pair")
        .field(Field::of::<String>("A"))
        .field(Field::of::<String>("B").tag(r#"json:",omitempty""#));

    let mut s = Schemas::new("");
    s.define_type(&ty).unwrap();
    assert_eq!(table(&s)["Pair"]["required"], json!(["A"]));
}

#[test]
fn test_embedded_struct() {
    let inner = plain("Inner").field(Field::of::<f64>("Val"));
    let outer = plain("Outer").field(Field::new("Inner", inner).embedded());

    let mut s = Schemas::new("");
    s.define_type(&outer).unwrap();

    assert_eq!(
        table(&s),
        json!({
            "Outer": {
                "title": "Outer",
                "description": "app.Outer",
                "type": "object",
                "additionalProperties": false,
                "properties": {"Val": {"type": "number"}},
                "required": ["Val"],
            },
        })
    );
}

#[test]
fn test_embedded_optional_struct() {
    let inner = plain("Inner").field(Field::of::<f64>("Val"));
    let outer = plain("Outer").field(Field::new("Inner", TypeDesc::pointer(inner)).embedded());

    let mut s = Schemas::new("");
    s.define_type(&outer).unwrap();

    let out = table(&s);
    assert_eq!(out["Outer"]["properties"], json!({"Val": {"type": "number"}}));
    assert_eq!(out["Outer"]["required"], json!(["Val"]));
    assert!(out.get("Inner").is_none());
}

#[test]
fn test_embedded_struct_with_rename_is_nested() {
    let inner = plain("Inner").field(Field::of::<f64>("Val"));
    let outer = plain("Outer").field(Field::new("Inner", inner).embedded().tag(r#"json:"inner""#));

    let mut s = Schemas::new("");
    s.define_type(&outer).unwrap();

    assert_eq!(table(&s)["Outer"]["properties"], json!({"inner": {"$ref": "#/$defs/Inner"}}));
}

#[test]
fn test_unmapped_kind_is_marked() {
    let ty = plain("Job")
        .field(Field::new("Run", TypeDesc::anonymous(Kind::Other("fn".to_string()))))
        .field(Field::of::<u16>("Retries"));

    let mut s = Schemas::new("");
    s.define_type(&ty).unwrap();

    let props = &table(&s)["Job"]["properties"];
    assert_eq!(props["Run"], json!({"type": "unknown"}));
    assert_eq!(props["Retries"], json!({"type": "integer"}));
}

#[test]
fn test_bare_interface_modes() {
    let ty = plain("Holder").field(Field::new("Any", TypeDesc::anonymous(Kind::Interface)));

    let mut permissive = Schemas::new("");
    permissive.define_type(&ty).unwrap();
    assert_eq!(table(&permissive)["Holder"]["properties"]["Any"], json!({}));

    let mut strict = Schemas::with_options(SchemaOptions {
        interfaces: InterfaceMode::Object,
        ..SchemaOptions::default()
    });
    strict.define_type(&ty).unwrap();
    assert_eq!(table(&strict)["Holder"]["properties"]["Any"], json!({"type": "object"}));
}

// =============================================================================
// Identity
// =============================================================================

#[test]
fn test_idempotence() {
    let mut s = Schemas::new("");
    let first = s.define::<Node1>().unwrap();
    let before = s.json();

    let second = s.define::<Node1>().unwrap();

    assert_eq!(first, second);
    assert_eq!(before, s.json());
}

#[test]
fn test_name_conflict() {
    let mut s = Schemas::new("");

    s.define::<chrono::DateTime<chrono::Utc>>().unwrap();
    s.define_type(&plain("DateTime").field(Field::of::<String>("Name"))).unwrap();

    assert_eq!(
        table(&s),
        json!({
            "DateTime": {
                "title": "DateTime",
                "description": "chrono.DateTime",
                "type": "object",
                "additionalProperties": false,
            },
            "DateTime1": {
                "title": "DateTime",
                "description": "app.DateTime",
                "type": "object",
                "additionalProperties": false,
                "properties": {"Name": {"type": "string"}},
                "required": ["Name"],
            },
        })
    );

    // Re-deriving keeps the assigned IDs.
    let again = s.define_type(&plain("DateTime")).unwrap();
    assert_eq!(again.to_json().unwrap(), json!({"$ref": "#/$defs/DateTime1"}));
    assert_eq!(s.resolve::<chrono::DateTime<chrono::Utc>>().id, "DateTime");
}

#[test]
fn test_generic_refs() {
    let a = plain("A");
    let c_string = plain("C<String>");
    let c_int = plain("C<i64>");
    let b = plain("B")
        .field(Field::new("A", a.clone()))
        .field(Field::new("C", c_string))
        .field(Field::new("C2", c_int));

    let mut s = Schemas::new("");
    s.define_type(&b).unwrap();

    assert_eq!(s.peek_type(&a).unwrap().title.as_deref(), Some("A"));

    let out = table(&s);
    assert_eq!(
        out["B"]["properties"],
        json!({
            "A": {"$ref": "#/$defs/A"},
            "C": {"$ref": "#/$defs/C"},
            "C2": {"$ref": "#/$defs/C1"},
        })
    );
    assert_eq!(out["C"]["title"], "C<String>");
    assert_eq!(out["C1"]["title"], "C<i64>");
    assert_eq!(out["C1"]["description"], "app.C<i64>");
}

// =============================================================================
// Extensions
// =============================================================================

#[test]
fn test_hijack_replaces_node() {
    let a = plain("A").field(Field::of::<String>("Str"));
    let b = plain("B").field(Field::new("A", a.clone()));

    let mut s = Schemas::new("");
    s.hijack_type(&a, |scm| {
        *scm = Schema {
            title: Some("AA".to_string()),
            description: Some("type A".to_string()),
            ..Schema::typed(SchemaType::Number)
        };
    });
    s.define_type(&b).unwrap();

    assert_eq!(
        table(&s),
        json!({
            "A": {"title": "AA", "description": "type A", "type": "number"},
            "B": {
                "title": "B",
                "description": "app.B",
                "type": "object",
                "additionalProperties": false,
                "properties": {"A": {"$ref": "#/$defs/A"}},
                "required": ["A"],
            },
        })
    );
}

#[test]
fn test_handler_runs_before_enum() {
    let mut s = Schemas::new("");
    s.handle::<Level>(|| Schema::typed(SchemaType::String));
    s.define::<Level>().unwrap();

    assert_eq!(table(&s)["Level"], json!({"type": "string"}));
}

#[test]
fn test_raw_enum() {
    let ty = TypeDesc::enumeration(PKG, "Enum", Kind::Int(64), EnumValues::from_raw(&["\"1\"", "\"2\""]).unwrap());

    let mut s = Schemas::new("");
    s.define_type(&ty).unwrap();

    assert_eq!(
        table(&s),
        json!({"Enum": {"title": "Enum", "description": "app.Enum", "enum": ["1", "2"]}})
    );
}

#[test]
fn test_sorted_enum() {
    let mut s = Schemas::with_options(SchemaOptions {
        sort_enums: true,
        ..SchemaOptions::default()
    });
    s.define::<Level>().unwrap();
    assert_eq!(table(&s)["Level"]["enum"], json!(["one", "three", "two"]));
}

#[test]
fn test_time() {
    let mut s = Schemas::new("");
    s.hijack_time();
    s.define::<chrono::DateTime<chrono::Utc>>().unwrap();
    s.define::<chrono::NaiveDate>().unwrap();

    assert_eq!(
        table(&s),
        json!({
            "DateTime": {
                "title": "DateTime",
                "description": "chrono.DateTime",
                "type": "string",
                "format": "date-time",
            },
            "NaiveDate": {
                "title": "NaiveDate",
                "description": "chrono.NaiveDate",
                "type": "string",
                "format": "date",
            },
        })
    );
}

#[test]
fn test_json_value() {
    let holder = plain("A").field(Field::of::<Value>("A"));

    let mut s = Schemas::with_options(SchemaOptions {
        interfaces: InterfaceMode::Object,
        ..SchemaOptions::default()
    });
    s.hijack_json_value();
    s.define_type(&holder).unwrap();

    assert_eq!(
        table(&s),
        json!({
            "A": {
                "title": "A",
                "description": "app.A",
                "type": "object",
                "additionalProperties": false,
                "properties": {"A": {"$ref": "#/$defs/Value"}},
                "required": ["A"],
            },
            "Value": {"title": "Value", "description": "serde_json.Value"},
        })
    );
}

#[test]
fn test_constant() {
    let mut s = Schemas::new("");
    let scm = s.constant(&Level::Three).unwrap();
    assert_eq!(scm.to_json().unwrap(), json!({"$ref": "#/$defs/Level", "enum": ["three"]}));

    let scm = s.constant(&7u8).unwrap();
    assert_eq!(scm.to_json().unwrap(), json!({"type": "integer", "enum": [7]}));
}

// =============================================================================
// Field Annotations
// =============================================================================

#[test]
fn test_default_tag() {
    let x = plain("X")
        .field(Field::of::<i32>("A").tag(r#"default:"1""#))
        .field(Field::of::<Option<i32>>("B").tag(r#"default:"1""#))
        .field(Field::of::<u32>("C").tag(r#"default:"1""#))
        .field(Field::of::<Option<u32>>("D").tag(r#"default:"null""#))
        .field(Field::of::<Vec<u32>>("E").tag(r#"default:"[1,2,3]""#))
        .field(Field::of::<String>("F").tag(r#"default:"hello" example:"world""#))
        .field(Field::of::<Level>("G").tag(r#"default:"two""#))
        .field(Field::of::<i32>("H").tag(r#"examples:"[1, 2]""#));

    let mut s = Schemas::new("");
    s.define_type(&x).unwrap();
    let props = &table(&s)["X"]["properties"];

    assert_eq!(props["A"]["default"], json!(1));
    assert_eq!(props["B"]["default"], json!(1));
    assert_eq!(props["C"]["default"], json!(1));
    assert_eq!(props["D"]["default"], Value::Null);
    assert_eq!(props["E"]["default"], json!([1, 2, 3]));
    assert_eq!(props["F"]["default"], json!("hello"));
    assert_eq!(props["F"]["example"], json!("world"));
    assert_eq!(props["G"], json!({"$ref": "#/$defs/Level", "default": "two"}));
    assert_eq!(props["H"]["examples"], json!([1, 2]));
}

#[test]
fn test_override_ref() {
    let a = plain("A").field(Field::of::<i32>("A"));
    let b = plain("B").field(Field::new("A", a).tag(r#"description:"B" max:"10""#));

    let mut s = Schemas::new("");
    s.define_type(&b).unwrap();

    let out = table(&s);
    assert_eq!(
        out["B"]["properties"]["A"],
        json!({"description": "B", "maximum": 10.0, "$ref": "#/$defs/A"})
    );
    // The shared definition is untouched.
    assert_eq!(out["A"]["description"], "app.A");
    assert!(out["A"].get("maximum").is_none());
}

#[test]
fn test_invalid_default_aborts() {
    let good = plain("Good").field(Field::of::<String>("Name"));
    let bad = plain("Bad")
        .field(Field::new("Inner", plain("Inner")))
        .field(Field::of::<u8>("Count").tag(r#"default:"lots""#));

    let mut s = Schemas::new("");
    s.define_type(&good).unwrap();

    let err = s.define_type(&bad).unwrap_err();
    assert!(matches!(err, SchemaError::InvalidTag { .. }));
    assert!(err.to_string().contains("field Count"));
    assert!(err.to_string().contains("default"));

    // Earlier definitions survive, the failed pass leaves nothing behind.
    assert_eq!(s.types().keys().collect::<Vec<_>>(), vec!["Good"]);
}

#[test]
fn test_invalid_example_on_item() {
    let ty = plain("List").field(Field::of::<Vec<bool>>("Flags").tag(r#"item-default:"maybe""#));

    let mut s = Schemas::new("");
    match s.define_type(&ty) {
        Err(SchemaError::InvalidTag { field, tag, .. }) => {
            assert_eq!(field, "Flags");
            assert_eq!(tag, "item-default");
        }
        other => panic!("Expected InvalidTag, got {:?}", other),
    }
}
