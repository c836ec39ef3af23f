//! Configuration loading and management
//!
//! A YAML document declares executor limits, named schemas and the types they
//! are assembled from:
//!
//! ```yaml
//! executor:
//!   max_query_depth: 10
//!   validation: true
//! schemas:
//!   default:
//!     query: Query
//!     types: [PostInput]
//! types:
//!   Query:
//!     type: object
//!     config:
//!       fields:
//!         ping: { type: String, resolve: ping }
//!   PostInput:
//!     type: input-object
//!     config:
//!       fields:
//!         title:
//!           type: String!
//!           validation: { not_blank: true, length: { max: 120 } }
//! ```
//!
//! Types are registered lazily: [`SchemaConfig::register_types`] checks every
//! definition up front, but a [`Type`] is only built (and its resolvers looked
//! up) the first time a schema asks for it.

use crate::core::error::{ConfigError, GqlResult};
use crate::resolver::{ResolverMap, SolutionOptions, TypeResolver};
use crate::schema::types::is_valid_name;
use crate::schema::{
    Constraint, EnumType, FieldDefinition, InputObjectType, InputValue, ObjectType, ScalarType,
    Type, TypeRef,
};
use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;

fn default_true() -> bool {
    true
}

/// Executor knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum selection depth (`0` or absent disables the limit)
    #[serde(default)]
    pub max_query_depth: Option<usize>,

    /// Maximum query complexity (`0` or absent disables the limit)
    #[serde(default)]
    pub max_query_complexity: Option<usize>,

    /// Allow `__schema` / `__type` queries
    #[serde(default = "default_true")]
    pub introspection: bool,

    /// Attach the validator extension to every built schema
    #[serde(default)]
    pub validation: bool,

    /// Report execution time under `extensions.debug`
    #[serde(default)]
    pub show_debug_info: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_query_depth: None,
            max_query_complexity: None,
            introspection: true,
            validation: false,
            show_debug_info: false,
        }
    }
}

/// A named schema, by type alias
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDefinitionConfig {
    pub query: Option<String>,

    #[serde(default)]
    pub mutation: Option<String>,

    #[serde(default)]
    pub subscription: Option<String>,

    /// Extra types that are not reachable from the roots
    #[serde(default)]
    pub types: Vec<String>,

    /// Whether a runtime reset drops the built schema
    #[serde(default)]
    pub resettable: bool,
}

/// One entry of the `types` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TypeDefinitionConfig {
    Object {
        #[serde(default)]
        aliases: Vec<String>,
        config: ObjectConfig,
    },
    InputObject {
        #[serde(default)]
        aliases: Vec<String>,
        config: InputObjectConfig,
    },
    Enum {
        #[serde(default)]
        aliases: Vec<String>,
        config: EnumConfig,
    },
    Scalar {
        #[serde(default)]
        aliases: Vec<String>,
        #[serde(default)]
        config: ScalarConfig,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldConfig>,
}

/// Output field: `title: String` or the full form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldConfig {
    Short(String),
    Full(FieldDefinitionConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinitionConfig {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub args: IndexMap<String, InputFieldConfig>,
    /// Name of an entry in the resolver map
    #[serde(default)]
    pub resolve: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputObjectConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub fields: IndexMap<String, InputFieldConfig>,
    /// Constraints on the object as a whole
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Argument or input field: `title: String!` or the full form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputFieldConfig {
    Short(String),
    Full(InputFieldDefinitionConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputFieldDefinitionConfig {
    #[serde(rename = "type", default)]
    pub ty: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "defaultValue", alias = "default_value", default)]
    pub default_value: Option<Value>,
    /// Hidden fields are left out of the built type
    #[serde(default = "default_true")]
    pub public: bool,
    #[serde(default)]
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScalarConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Constraint declarations for an input value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub not_blank: bool,
    #[serde(default)]
    pub length: Option<Bounds<usize>>,
    #[serde(default)]
    pub range: Option<Bounds<f64>>,
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub choice: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bounds<T> {
    #[serde(default)]
    pub min: Option<T>,
    #[serde(default)]
    pub max: Option<T>,
}

impl ValidationConfig {
    /// Convert to constraints, compiling patterns to catch mistakes early
    pub fn constraints(&self, context: &str) -> Result<Vec<Constraint>, ConfigError> {
        let mut constraints = Vec::new();

        if self.not_blank {
            constraints.push(Constraint::NotBlank);
        }
        if let Some(length) = &self.length {
            constraints.push(Constraint::Length {
                min: length.min,
                max: length.max,
            });
        }
        if let Some(range) = &self.range {
            constraints.push(Constraint::Range {
                min: range.min,
                max: range.max,
            });
        }
        if let Some(pattern) = &self.regex {
            regex::Regex::new(pattern).map_err(|e| ConfigError::InvalidValue {
                field: format!("{}.validation.regex", context),
                value: pattern.clone(),
                message: e.to_string(),
            })?;
            constraints.push(Constraint::Regex {
                pattern: pattern.clone(),
            });
        }
        if let Some(choices) = &self.choice {
            constraints.push(Constraint::Choice {
                choices: choices.clone(),
            });
        }

        Ok(constraints)
    }
}

/// Complete configuration: executor knobs, schemas and types
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub schemas: IndexMap<String, SchemaDefinitionConfig>,

    #[serde(default)]
    pub types: IndexMap<String, TypeDefinitionConfig>,
}

impl SchemaConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.display().to_string()),
            message: e.to_string(),
        })?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Merge several configurations
    ///
    /// Schemas and types are keyed by name, later configurations win. The
    /// executor section of the last configuration is kept.
    pub fn merge(configs: Vec<SchemaConfig>) -> SchemaConfig {
        let mut merged = SchemaConfig::default();

        for config in configs {
            merged.executor = config.executor;
            merged.schemas.extend(config.schemas);
            merged.types.extend(config.types);
        }

        merged
    }

    /// Check every schema and type definition
    pub fn validate(&self) -> GqlResult<()> {
        for (name, schema) in &self.schemas {
            if schema.query.is_none() {
                return Err(ConfigError::MissingField {
                    field: "query".to_string(),
                    context: format!("schema \"{}\"", name),
                }
                .into());
            }
        }

        for (key, definition) in &self.types {
            definition.blueprint(key)?;
        }

        Ok(())
    }

    /// Declare every configured type on `types`
    ///
    /// Each type is registered under its GraphQL name, with its configuration
    /// key and declared aliases as aliases. Field resolvers named by `resolve`
    /// are looked up in `resolvers` when the type is first built.
    pub fn register_types(&self, types: &TypeResolver, resolvers: &Arc<ResolverMap>) -> GqlResult<()> {
        for (key, definition) in &self.types {
            let blueprint = definition.blueprint(key)?;
            let name = blueprint.ty.name().to_string();

            let mut aliases = definition.aliases().to_vec();
            if key != &name {
                aliases.push(key.clone());
            }

            let mut options = SolutionOptions::new();
            options.insert("kind".to_string(), json!(blueprint.ty.kind()));
            options.insert("config_key".to_string(), json!(key));

            let resolvers = Arc::clone(resolvers);
            tracing::debug!(type_name = %name, aliases = ?aliases, "Registering configured type");
            types.add_type(name, move || blueprint.build(&resolvers), aliases, options);
        }

        Ok(())
    }
}

/// A type checked at registration time, waiting for its resolvers
#[derive(Debug, Clone)]
struct Blueprint {
    ty: Type,
    /// field name -> resolver name
    resolvers: IndexMap<String, String>,
}

impl Blueprint {
    fn build(&self, resolvers: &ResolverMap) -> Arc<Type> {
        let mut ty = self.ty.clone();

        if let Type::Object(object) = &mut ty {
            for (field_name, resolver_name) in &self.resolvers {
                let Some(field) = object.fields.get_mut(field_name) else {
                    continue;
                };
                match resolvers.get_solution(resolver_name) {
                    Some(resolver) => field.resolver = Some(resolver),
                    None => tracing::warn!(
                        type_name = %object.name,
                        field = %field_name,
                        resolver = %resolver_name,
                        "Resolver not found, falling back to the default field resolver"
                    ),
                }
            }
        }

        Arc::new(ty)
    }
}

impl TypeDefinitionConfig {
    pub fn aliases(&self) -> &[String] {
        match self {
            TypeDefinitionConfig::Object { aliases, .. }
            | TypeDefinitionConfig::InputObject { aliases, .. }
            | TypeDefinitionConfig::Enum { aliases, .. }
            | TypeDefinitionConfig::Scalar { aliases, .. } => aliases,
        }
    }

    fn blueprint(&self, key: &str) -> Result<Blueprint, ConfigError> {
        match self {
            TypeDefinitionConfig::Object { config, .. } => {
                let name = type_name(config.name.as_deref(), key)?;
                if config.fields.is_empty() {
                    return Err(empty_fields(&name));
                }

                let mut object = ObjectType::new(&name);
                object.description = config.description.clone();
                let mut resolvers = IndexMap::new();

                for (field_name, field) in &config.fields {
                    let context = format!("{}.{}", name, field_name);
                    check_name(field_name, &context)?;
                    let definition = match field {
                        FieldConfig::Short(ty) => {
                            FieldDefinition::new(field_name, type_ref(ty, &context)?)
                        }
                        FieldConfig::Full(full) => {
                            let mut definition =
                                FieldDefinition::new(field_name, type_ref(&full.ty, &context)?);
                            definition.description = full.description.clone();
                            for (arg_name, arg) in &full.args {
                                let arg_context = format!("{}({})", context, arg_name);
                                if let Some(arg) = input_value(arg_name, arg, &arg_context)? {
                                    definition = definition.argument(arg);
                                }
                            }
                            if let Some(resolve) = &full.resolve {
                                resolvers.insert(field_name.clone(), resolve.clone());
                            }
                            definition
                        }
                    };
                    object = object.field(definition);
                }

                Ok(Blueprint {
                    ty: Type::Object(object),
                    resolvers,
                })
            }
            TypeDefinitionConfig::InputObject { config, .. } => {
                let name = type_name(config.name.as_deref(), key)?;
                if config.fields.is_empty() {
                    return Err(empty_fields(&name));
                }

                let mut input = InputObjectType::new(&name);
                input.description = config.description.clone();
                input.constraints = config.validation.constraints(&name)?;

                for (field_name, field) in &config.fields {
                    let context = format!("{}.{}", name, field_name);
                    if let Some(value) = input_value(field_name, field, &context)? {
                        input = input.field(value);
                    }
                }

                Ok(Blueprint {
                    ty: Type::InputObject(input),
                    resolvers: IndexMap::new(),
                })
            }
            TypeDefinitionConfig::Enum { config, .. } => {
                let name = type_name(config.name.as_deref(), key)?;
                if config.values.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: format!("{}.values", name),
                        value: String::new(),
                        message: "an enum needs at least one value".to_string(),
                    });
                }
                for value in &config.values {
                    check_name(value, &format!("{}.values", name))?;
                }

                let mut enum_type = EnumType::new(&name, config.values.iter().cloned());
                enum_type.description = config.description.clone();
                Ok(Blueprint {
                    ty: Type::Enum(enum_type),
                    resolvers: IndexMap::new(),
                })
            }
            TypeDefinitionConfig::Scalar { config, .. } => {
                let name = type_name(config.name.as_deref(), key)?;
                let mut scalar = ScalarType::new(&name);
                scalar.description = config.description.clone();
                Ok(Blueprint {
                    ty: Type::Scalar(scalar),
                    resolvers: IndexMap::new(),
                })
            }
        }
    }
}

fn type_name(explicit: Option<&str>, key: &str) -> Result<String, ConfigError> {
    let name = explicit.unwrap_or(key);
    check_name(name, "name")?;
    Ok(name.to_string())
}

fn check_name(name: &str, context: &str) -> Result<(), ConfigError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: context.to_string(),
            value: name.to_string(),
            message: "names must match /^[_a-zA-Z][_a-zA-Z0-9]*$/".to_string(),
        })
    }
}

fn empty_fields(name: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: format!("{}.fields", name),
        value: String::new(),
        message: "at least one field is required".to_string(),
    }
}

fn type_ref(raw: &str, context: &str) -> Result<TypeRef, ConfigError> {
    TypeRef::parse(raw).map_err(|e| match e {
        ConfigError::InvalidValue { value, message, .. } => ConfigError::InvalidValue {
            field: format!("{}.type", context),
            value,
            message,
        },
        other => other,
    })
}

/// Build an input value; hidden fields yield `None`
fn input_value(
    name: &str,
    config: &InputFieldConfig,
    context: &str,
) -> Result<Option<InputValue>, ConfigError> {
    check_name(name, context)?;

    match config {
        InputFieldConfig::Short(ty) => Ok(Some(InputValue::new(name, type_ref(ty, context)?))),
        InputFieldConfig::Full(full) => {
            let ty = full.ty.as_deref().ok_or_else(|| ConfigError::MissingField {
                field: "type".to_string(),
                context: context.to_string(),
            })?;
            let ty = type_ref(ty, context)?;

            if !full.public {
                return Ok(None);
            }

            let mut value = InputValue::new(name, ty);
            value.description = full.description.clone();
            value.default_value = full.default_value.clone();
            value.constraints = full.validation.constraints(context)?;
            Ok(Some(value))
        }
    }
}
