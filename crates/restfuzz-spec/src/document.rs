//! Serde model of the Swagger 2.0 subset the loader understands.
//!
//! Unknown fields are ignored; only what drives request generation is kept.

use std::collections::BTreeMap;

use serde::Deserialize;

/// A Swagger 2.0 document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwaggerDocument {
    /// Declared version; YAML may give it as a number.
    pub swagger: Option<serde_json::Value>,
    #[serde(default)]
    pub definitions: BTreeMap<String, SchemaObject>,
    /// Shared parameters, referenced as `#/parameters/<name>`.
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterObject>,
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
}

/// A schema: a definition, a body parameter schema or a nested property.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaObject {
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub format: Option<String>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<serde_json::Value>>,
    pub properties: Option<BTreeMap<String, SchemaObject>>,
    pub additional_properties: Option<AdditionalProperties>,
    pub items: Option<Box<SchemaObject>>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
}

/// `additionalProperties` is either a flag or a value schema.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Flag(bool),
    Schema(Box<SchemaObject>),
}

/// The operations declared on one path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
    /// Parameters shared by every operation on the path.
    #[serde(default)]
    pub parameters: Vec<ParameterOrRef>,
    pub get: Option<Operation>,
    pub post: Option<Operation>,
    pub put: Option<Operation>,
    pub patch: Option<Operation>,
    pub delete: Option<Operation>,
    pub head: Option<Operation>,
    pub options: Option<Operation>,
}

/// One operation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub operation_id: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterOrRef>,
    /// Keyed by status code or `default`; the response bodies are ignored.
    #[serde(default)]
    pub responses: BTreeMap<String, serde_json::Value>,
}

/// A parameter, inline or by reference.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ParameterOrRef {
    Reference {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Parameter(ParameterObject),
}

/// An inline parameter.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterObject {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    #[serde(default)]
    pub required: bool,
    /// Body parameters only.
    pub schema: Option<SchemaObject>,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub format: Option<String>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<serde_json::Value>>,
    pub items: Option<Box<SchemaObject>>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
}
