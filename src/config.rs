//! Configuration management
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (jschema.toml)
//! - Environment variables (JSCHEMA__*)
//!
//! ## Example config file (jschema.toml):
//! ```toml
//! [schemas]
//! ref_prefix = "#/components/schemas"
//! numeric = "split"
//! interfaces = "permissive"
//! sort_enums = false
//!
//! [export]
//! output_format = "pretty"
//! standalone = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reflect::{EnumValues, Field, Kind, Reflect, TypeDesc};

/// Default prefix of `$ref` paths
pub const DEFAULT_REF_PREFIX: &str = "#/$defs";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Derivation settings
    #[serde(default)]
    pub schemas: SchemaOptions,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,
}

/// Derivation policy of one [`Schemas`](crate::Schemas)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaOptions {
    /// Prefix of every `$ref` path
    #[serde(default = "default_ref_prefix")]
    pub ref_prefix: String,

    /// How integer kinds are typed
    #[serde(default)]
    pub numeric: NumericMode,

    /// What an interface without implementations becomes
    #[serde(default)]
    pub interfaces: InterfaceMode,

    /// Sort enum values by their JSON text instead of keeping declaration order
    #[serde(default)]
    pub sort_enums: bool,
}

/// Typing of integer kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NumericMode {
    /// Integers are `integer`, floats are `number`
    #[default]
    Split,
    /// Everything numeric is `number`
    Number,
}

/// Schema of an interface that has no registered implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceMode {
    /// No `type`, accepts any value
    #[default]
    Permissive,
    /// `type: object`
    Object,
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output format (pretty or compact)
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Emit self-contained documents with embedded `$defs`
    #[serde(default = "default_true")]
    pub standalone: bool,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

fn default_ref_prefix() -> String {
    DEFAULT_REF_PREFIX.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            ref_prefix: default_ref_prefix(),
            numeric: NumericMode::default(),
            interfaces: InterfaceMode::default(),
            sort_enums: false,
        }
    }
}

impl SchemaOptions {
    /// Default options with a custom prefix. An empty prefix means the default.
    pub fn with_prefix(prefix: &str) -> Self {
        let ref_prefix = if prefix.is_empty() {
            default_ref_prefix()
        } else {
            prefix.to_string()
        };
        Self {
            ref_prefix,
            ..Self::default()
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Pretty,
            standalone: true,
        }
    }
}

impl ExportConfig {
    /// Render a value in the configured format.
    pub fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        let text = match self.output_format {
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
            OutputFormat::Compact => serde_json::to_string(value)?,
        };
        Ok(text)
    }
}

impl SchemaConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["jschema.toml", ".jschema.toml", "config/jschema.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "jschema") {
            let xdg_config = config_dir.config_dir().join("jschema.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (JSCHEMA__*)
        builder = builder.add_source(
            Environment::with_prefix("JSCHEMA")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// =============================================================================
// Self Description
// =============================================================================

const PACKAGE: &str = module_path!();

impl Reflect for SchemaConfig {
    fn reflect() -> TypeDesc {
        TypeDesc::structure(PACKAGE, "SchemaConfig")
            .field(Field::of::<SchemaOptions>("schemas").tag(r#"json:",omitempty" description:"Derivation settings""#))
            .field(Field::of::<ExportConfig>("export").tag(r#"json:",omitempty" description:"Export settings""#))
    }
}

impl Reflect for SchemaOptions {
    fn reflect() -> TypeDesc {
        TypeDesc::structure(PACKAGE, "SchemaOptions")
            .field(
                Field::of::<String>("ref_prefix")
                    .tag(r##"json:",omitempty" description:"Prefix of every $ref path" default:"#/$defs""##),
            )
            .field(Field::of::<NumericMode>("numeric").tag(r#"json:",omitempty" default:"split""#))
            .field(Field::of::<InterfaceMode>("interfaces").tag(r#"json:",omitempty" default:"permissive""#))
            .field(Field::of::<bool>("sort_enums").tag(r#"json:",omitempty" default:"false""#))
    }
}

impl Reflect for ExportConfig {
    fn reflect() -> TypeDesc {
        TypeDesc::structure(PACKAGE, "ExportConfig")
            .field(Field::of::<OutputFormat>("output_format").tag(r#"json:",omitempty" default:"pretty""#))
            .field(Field::of::<bool>("standalone").tag(r#"json:",omitempty" default:"true""#))
    }
}

impl Reflect for NumericMode {
    fn reflect() -> TypeDesc {
        TypeDesc::enumeration(PACKAGE, "NumericMode", Kind::String, EnumValues::strings(["split", "number"]))
    }
}

impl Reflect for InterfaceMode {
    fn reflect() -> TypeDesc {
        TypeDesc::enumeration(
            PACKAGE,
            "InterfaceMode",
            Kind::String,
            EnumValues::strings(["permissive", "object"]),
        )
    }
}

impl Reflect for OutputFormat {
    fn reflect() -> TypeDesc {
        TypeDesc::enumeration(PACKAGE, "OutputFormat", Kind::String, EnumValues::strings(["pretty", "compact"]))
    }
}
