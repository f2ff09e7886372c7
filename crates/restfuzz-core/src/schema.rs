//! Typed model of an HTTP API surface.
//!
//! The model is produced once by schema ingestion and is immutable afterwards.
//! Type shapes form a closed set ([`Type`]) that consumers match exhaustively;
//! references between named definitions are kept symbolic ([`Type::Reference`])
//! and resolved lazily by the generator engine.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::value::Value;

/// Primitive kinds a schema can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Boolean,
    DateTime,
}

impl PrimitiveKind {
    /// Returns true for the integer kinds.
    pub fn is_integer(&self) -> bool {
        matches!(self, PrimitiveKind::Int32 | PrimitiveKind::Int64)
    }

    /// Returns true for the floating point kinds.
    pub fn is_float(&self) -> bool {
        matches!(self, PrimitiveKind::Float32 | PrimitiveKind::Float64)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveKind::Int32 => write!(f, "int32"),
            PrimitiveKind::Int64 => write!(f, "int64"),
            PrimitiveKind::Float32 => write!(f, "float"),
            PrimitiveKind::Float64 => write!(f, "double"),
            PrimitiveKind::String => write!(f, "string"),
            PrimitiveKind::Boolean => write!(f, "boolean"),
            PrimitiveKind::DateTime => write!(f, "date-time"),
        }
    }
}

/// Declared bounds on a primitive.
///
/// `minimum`/`maximum` apply to numeric kinds, the length bounds to strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl Constraints {
    /// Set the string length bounds.
    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    /// Set the numeric bounds.
    pub fn with_range(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }
}

/// A primitive type with its constraints and optional enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveType {
    pub kind: PrimitiveKind,
    pub constraints: Constraints,
    pub enum_values: Option<Vec<Value>>,
}

/// An object type.
///
/// An object without declared properties is a loosely-typed map whose values
/// follow `additional_properties` when present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectType {
    pub properties: BTreeMap<String, Type>,
    pub additional_properties: Option<Box<Type>>,
}

/// An array type with optional size bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    pub item: Box<Type>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
}

/// The shape of a value described by the schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Object(ObjectType),
    Array(ArrayType),
    /// Named pointer to another definition.
    Reference(String),
    Primitive(PrimitiveType),
}

impl Type {
    /// A primitive of the given kind with no constraints.
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Type::Primitive(PrimitiveType {
            kind,
            constraints: Constraints::default(),
            enum_values: None,
        })
    }

    pub fn string() -> Self {
        Self::primitive(PrimitiveKind::String)
    }

    pub fn int32() -> Self {
        Self::primitive(PrimitiveKind::Int32)
    }

    pub fn int64() -> Self {
        Self::primitive(PrimitiveKind::Int64)
    }

    pub fn boolean() -> Self {
        Self::primitive(PrimitiveKind::Boolean)
    }

    /// A reference to the definition called `name`.
    pub fn reference(name: impl Into<String>) -> Self {
        Type::Reference(name.into())
    }

    /// An unbounded array of `item`.
    pub fn array(item: Type) -> Self {
        Type::Array(ArrayType {
            item: Box::new(item),
            min_items: None,
            max_items: None,
        })
    }

    /// An object with the given properties.
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Type)>,
        K: Into<String>,
    {
        Type::Object(ObjectType {
            properties: properties.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            additional_properties: None,
        })
    }

    /// Collect the names of every definition this type references, in
    /// traversal order.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Type::Object(object) => {
                for property in object.properties.values() {
                    property.collect_references(out);
                }
                if let Some(ref additional) = object.additional_properties {
                    additional.collect_references(out);
                }
            }
            Type::Array(array) => array.item.collect_references(out),
            Type::Reference(name) => out.push(name),
            Type::Primitive(_) => {}
        }
    }
}

/// HTTP methods the fuzzer can exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(ConfigurationError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Where a parameter travels in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Path,
    Query,
    Header,
    Form,
    Body,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Path => write!(f, "path"),
            Location::Query => write!(f, "query"),
            Location::Header => write!(f, "header"),
            Location::Form => write!(f, "form"),
            Location::Body => write!(f, "body"),
        }
    }
}

/// The declared shape of a non-body parameter, as written in the API
/// description. The engine decides whether the combination is supported.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleSchema {
    /// Declared `type` (`string`, `integer`, `number`, `file`, `array`, ...).
    pub type_name: String,
    pub format: Option<String>,
    pub enum_values: Option<Vec<Value>>,
    pub constraints: Constraints,
    /// Item schema for `array` parameters.
    pub items: Option<Box<SimpleSchema>>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
}

impl SimpleSchema {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            format: None,
            enum_values: None,
            constraints: Constraints::default(),
            items: None,
            min_items: None,
            max_items: None,
        }
    }

    pub fn string() -> Self {
        Self::new("string")
    }

    /// `integer` with format `int32`.
    pub fn int32() -> Self {
        Self::new("integer").with_format("int32")
    }

    /// `integer` with format `int64`.
    pub fn int64() -> Self {
        Self::new("integer").with_format("int64")
    }

    /// An `array` of the given item schema.
    pub fn array(items: SimpleSchema) -> Self {
        let mut schema = Self::new("array");
        schema.items = Some(Box::new(items));
        schema
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }
}

/// Schema attached to a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterSchema {
    /// A body parameter carries a full type.
    Body(Type),
    /// Every other location carries a simple schema.
    Simple(SimpleSchema),
}

/// One declared endpoint parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: Location,
    pub schema: ParameterSchema,
}

impl Parameter {
    pub fn new(name: impl Into<String>, location: Location, schema: ParameterSchema) -> Self {
        Self {
            name: name.into(),
            location,
            schema,
        }
    }

    pub fn path(name: impl Into<String>, schema: SimpleSchema) -> Self {
        Self::new(name, Location::Path, ParameterSchema::Simple(schema))
    }

    pub fn query(name: impl Into<String>, schema: SimpleSchema) -> Self {
        Self::new(name, Location::Query, ParameterSchema::Simple(schema))
    }

    pub fn header(name: impl Into<String>, schema: SimpleSchema) -> Self {
        Self::new(name, Location::Header, ParameterSchema::Simple(schema))
    }

    pub fn form(name: impl Into<String>, schema: SimpleSchema) -> Self {
        Self::new(name, Location::Form, ParameterSchema::Simple(schema))
    }

    pub fn body(name: impl Into<String>, ty: Type) -> Self {
        Self::new(name, Location::Body, ParameterSchema::Body(ty))
    }
}

/// An operation on a path.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub method: Method,
    /// Path template with `{name}` placeholders.
    pub path: String,
    pub parameters: Vec<Parameter>,
    /// Declared status codes, `default` excluded.
    pub declared_responses: BTreeSet<u16>,
}

impl Endpoint {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            parameters: Vec::new(),
            declared_responses: BTreeSet::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_response(mut self, code: u16) -> Self {
        self.declared_responses.insert(code);
        self
    }

    /// Parameters declared at the given location, in declaration order.
    pub fn parameters_at(&self, location: Location) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(move |p| p.location == location)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// The complete API description consumed by the fuzzer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiModel {
    pub definitions: BTreeMap<String, Type>,
    pub endpoints: Vec<Endpoint>,
}

impl ApiModel {
    /// Find an endpoint by exact method and path template.
    pub fn find_endpoint(&self, method: Method, path: &str) -> Option<&Endpoint> {
        self.endpoints
            .iter()
            .find(|e| e.method == method && e.path == path)
    }
}
