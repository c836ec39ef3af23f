//! Type system used to assemble executable schemas
//!
//! Types reference each other by name ([`TypeRef::Named`]); the schema resolves
//! names lazily through its type loader, so declaring a type never forces the
//! types it mentions to be built.

use crate::core::error::ConfigError;
use crate::resolver::field::FieldResolver;
use crate::schema::validation::Constraint;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

/// Names of the scalars every schema knows about
pub const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

/// Reference to a type as written in a field or argument declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    /// Wrap in a non-null marker (idempotent)
    pub fn non_null(self) -> Self {
        match self {
            TypeRef::NonNull(_) => self,
            other => TypeRef::NonNull(Box::new(other)),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    /// Innermost named type
    pub fn named_type(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.named_type(),
        }
    }

    /// Parse the SDL notation (`String`, `[Int!]!`, ...)
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |message: &str| ConfigError::InvalidValue {
            field: "type".to_string(),
            value: raw.to_string(),
            message: message.to_string(),
        };

        let trimmed = raw.trim();
        if let Some(inner) = trimmed.strip_suffix('!') {
            let inner = Self::parse(inner).map_err(|_| invalid("malformed non-null type"))?;
            if inner.is_non_null() {
                return Err(invalid("double non-null marker"));
            }
            return Ok(inner.non_null());
        }

        if let Some(rest) = trimmed.strip_prefix('[') {
            let inner = rest
                .strip_suffix(']')
                .ok_or_else(|| invalid("unbalanced list brackets"))?;
            let inner = Self::parse(inner).map_err(|_| invalid("malformed list item type"))?;
            return Ok(TypeRef::list(inner));
        }

        if is_valid_name(trimmed) {
            Ok(TypeRef::named(trimmed))
        } else {
            Err(invalid("not a valid GraphQL type name"))
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{}", name),
            TypeRef::List(inner) => write!(f, "[{}]", inner),
            TypeRef::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

impl FromStr for TypeRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Whether `name` matches `/^[_a-zA-Z][_a-zA-Z0-9]*$/`
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

/// Argument or input-object field declaration
#[derive(Debug, Clone)]
pub struct InputValue {
    pub name: String,
    pub ty: TypeRef,
    pub description: Option<String>,
    pub default_value: Option<Value>,
    pub constraints: Vec<Constraint>,
}

impl InputValue {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            description: None,
            default_value: None,
            constraints: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// Output field declaration
#[derive(Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub ty: TypeRef,
    pub description: Option<String>,
    pub args: IndexMap<String, InputValue>,
    pub resolver: Option<Arc<dyn FieldResolver>>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            description: None,
            args: IndexMap::new(),
            resolver: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn argument(mut self, arg: InputValue) -> Self {
        self.args.insert(arg.name.clone(), arg);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn FieldResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }
}

impl fmt::Debug for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("args", &self.args)
            .field("has_resolver", &self.resolver.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDefinition>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }
}

#[derive(Debug, Clone)]
pub struct InputObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, InputValue>,
    /// Constraints applied to the object value as a whole
    pub constraints: Vec<Constraint>,
}

impl InputObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
            constraints: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, field: InputValue) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

#[derive(Debug, Clone)]
pub struct EnumType {
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<String>,
}

impl EnumType {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: None,
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScalarType {
    pub name: String,
    pub description: Option<String>,
}

impl ScalarType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// A named schema type
#[derive(Debug, Clone)]
pub enum Type {
    Object(ObjectType),
    InputObject(InputObjectType),
    Enum(EnumType),
    Scalar(ScalarType),
}

impl Type {
    pub fn name(&self) -> &str {
        match self {
            Type::Object(t) => &t.name,
            Type::InputObject(t) => &t.name,
            Type::Enum(t) => &t.name,
            Type::Scalar(t) => &t.name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Type::Object(t) => t.description.as_deref(),
            Type::InputObject(t) => t.description.as_deref(),
            Type::Enum(t) => t.description.as_deref(),
            Type::Scalar(t) => t.description.as_deref(),
        }
    }

    /// Introspection kind (`OBJECT`, `INPUT_OBJECT`, ...)
    pub fn kind(&self) -> &'static str {
        match self {
            Type::Object(_) => "OBJECT",
            Type::InputObject(_) => "INPUT_OBJECT",
            Type::Enum(_) => "ENUM",
            Type::Scalar(_) => "SCALAR",
        }
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            Type::Object(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_input_object(&self) -> Option<&InputObjectType> {
        match self {
            Type::InputObject(t) => Some(t),
            _ => None,
        }
    }

    /// Shared instance of a built-in scalar
    pub fn builtin_scalar(name: &str) -> Option<Arc<Type>> {
        static SCALARS: OnceLock<IndexMap<&'static str, Arc<Type>>> = OnceLock::new();

        SCALARS
            .get_or_init(|| {
                BUILTIN_SCALARS
                    .iter()
                    .map(|name| (*name, Arc::new(Type::Scalar(ScalarType::new(*name)))))
                    .collect()
            })
            .get(name)
            .cloned()
    }
}

impl From<ObjectType> for Type {
    fn from(t: ObjectType) -> Self {
        Type::Object(t)
    }
}

impl From<InputObjectType> for Type {
    fn from(t: InputObjectType) -> Self {
        Type::InputObject(t)
    }
}

impl From<EnumType> for Type {
    fn from(t: EnumType) -> Self {
        Type::Enum(t)
    }
}

impl From<ScalarType> for Type {
    fn from(t: ScalarType) -> Self {
        Type::Scalar(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_type() {
        assert_eq!(TypeRef::parse("String").unwrap(), TypeRef::named("String"));
    }

    #[test]
    fn test_parse_wrapped_types() {
        let parsed = TypeRef::parse("[Post!]!").unwrap();
        assert_eq!(
            parsed,
            TypeRef::list(TypeRef::named("Post").non_null()).non_null()
        );
        assert_eq!(parsed.named_type(), "Post");
        assert_eq!(parsed.to_string(), "[Post!]!");
    }

    #[test]
    fn test_parse_rejects_malformed_types() {
        assert!(TypeRef::parse("[String").is_err());
        assert!(TypeRef::parse("String!!").is_err());
        assert!(TypeRef::parse("9Lives").is_err());
        assert!(TypeRef::parse("").is_err());
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("_private"));
        assert!(is_valid_name("Post2"));
        assert!(!is_valid_name("with-dash"));
        assert!(!is_valid_name(""));
    }

    #[test]
    fn test_builtin_scalars_are_shared() {
        let a = Type::builtin_scalar("Int").expect("builtin");
        let b = Type::builtin_scalar("Int").expect("builtin");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.kind(), "SCALAR");
        assert!(Type::builtin_scalar("Date").is_none());
    }

    #[test]
    fn test_object_builder_keeps_field_order() {
        let object = ObjectType::new("Post")
            .field(FieldDefinition::new("title", TypeRef::named("String")))
            .field(FieldDefinition::new("id", TypeRef::named("ID").non_null()));

        let names: Vec<&str> = object.fields.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["title", "id"]);
        assert_eq!(Type::from(object).kind(), "OBJECT");
    }
}
