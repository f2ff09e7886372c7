//! Conversion of Swagger 2.0 documents into the schema model.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::{debug, info, instrument, warn};

use restfuzz_core::{
    ApiModel, ArrayType, ConfigurationError, Constraints, Endpoint, Location, Method, ObjectType,
    Parameter, ParameterSchema, PrimitiveKind, PrimitiveType, SimpleSchema, Type, Value,
};

use crate::document::{
    AdditionalProperties, Operation, ParameterObject, ParameterOrRef, PathItem, SchemaObject,
    SwaggerDocument,
};
use crate::error::LoadError;

/// Load an API description from a local path or an `http(s)` URL.
#[instrument]
pub async fn load(location: &str) -> Result<ApiModel, LoadError> {
    let text = if is_url(location) {
        fetch(location).await?
    } else {
        read_file(Path::new(location))?
    };
    parse_document(&text)
}

/// Load an API description from a local file.
pub fn load_file(path: impl AsRef<Path>) -> Result<ApiModel, LoadError> {
    parse_document(&read_file(path.as_ref())?)
}

/// Parse JSON or YAML text and convert it.
pub fn parse_document(text: &str) -> Result<ApiModel, LoadError> {
    let document = parse_swagger(text)?;
    Ok(convert(&document)?)
}

/// Parse JSON or YAML text into the document model.
pub fn parse_swagger(text: &str) -> Result<SwaggerDocument, LoadError> {
    let json: serde_json::Value = if text.trim_start().starts_with('{') {
        serde_json::from_str(text).map_err(|e| LoadError::parse(e.to_string()))?
    } else {
        // YAML maps may have integer keys (`200:`); JSON turns them into strings.
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| LoadError::parse(e.to_string()))?;
        serde_json::to_value(yaml).map_err(|e| LoadError::parse(e.to_string()))?
    };
    serde_json::from_value(json).map_err(|e| LoadError::parse(e.to_string()))
}

/// Convert a parsed document into the schema model.
///
/// Endpoints come out ordered by path, then method. `HEAD` and `OPTIONS`
/// operations are rejected.
pub fn convert(document: &SwaggerDocument) -> Result<ApiModel, ConfigurationError> {
    match document.swagger.as_ref().map(version_string) {
        Some(version) if version == "2.0" => {}
        Some(version) => warn!(%version, "expected a Swagger 2.0 document"),
        None => warn!("document has no `swagger` version field"),
    }

    let mut definitions = BTreeMap::new();
    for (name, schema) in &document.definitions {
        let context = format!("definition `{}`", name);
        definitions.insert(name.clone(), schema_type(schema, &context)?);
    }

    let mut endpoints = Vec::new();
    for (path, item) in &document.paths {
        if item.head.is_some() {
            return Err(ConfigurationError::UnsupportedMethod(format!("HEAD {}", path)));
        }
        if item.options.is_some() {
            return Err(ConfigurationError::UnsupportedMethod(format!("OPTIONS {}", path)));
        }

        let operations = [
            (Method::Get, &item.get),
            (Method::Post, &item.post),
            (Method::Put, &item.put),
            (Method::Patch, &item.patch),
            (Method::Delete, &item.delete),
        ];
        for (method, operation) in operations {
            if let Some(operation) = operation {
                endpoints.push(endpoint(document, path, method, item, operation)?);
            }
        }
    }

    info!(
        definitions = definitions.len(),
        endpoints = endpoints.len(),
        "loaded API description"
    );
    Ok(ApiModel {
        definitions,
        endpoints,
    })
}

fn version_string(version: &serde_json::Value) -> String {
    match version {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

async fn fetch(url: &str) -> Result<String, LoadError> {
    let fetch_error = |source| LoadError::Fetch {
        url: url.to_string(),
        source,
    };

    let response = reqwest::get(url).await.map_err(fetch_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(LoadError::FetchStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    debug!(url, "fetched API description");
    response.text().await.map_err(fetch_error)
}

fn endpoint(
    document: &SwaggerDocument,
    path: &str,
    method: Method,
    item: &PathItem,
    operation: &Operation,
) -> Result<Endpoint, ConfigurationError> {
    let label = format!("{} {}", method, path);

    let mut parameters: Vec<Parameter> = Vec::new();
    for declared in item.parameters.iter().chain(&operation.parameters) {
        let parameter = convert_parameter(resolve_parameter(document, declared, &label)?, &label)?;
        // Operation parameters override path parameters of the same name and location.
        match parameters
            .iter_mut()
            .find(|p| p.name == parameter.name && p.location == parameter.location)
        {
            Some(existing) => *existing = parameter,
            None => parameters.push(parameter),
        }
    }

    let mut declared_responses = BTreeSet::new();
    for code in operation.responses.keys() {
        if code == "default" {
            continue;
        }
        match code.parse::<u16>() {
            Ok(code) => {
                declared_responses.insert(code);
            }
            Err(_) => warn!(endpoint = %label, code = %code, "ignoring non-numeric response code"),
        }
    }

    Ok(Endpoint {
        method,
        path: path.to_string(),
        parameters,
        declared_responses,
    })
}

fn resolve_parameter<'a>(
    document: &'a SwaggerDocument,
    declared: &'a ParameterOrRef,
    label: &str,
) -> Result<&'a ParameterObject, ConfigurationError> {
    match declared {
        ParameterOrRef::Parameter(parameter) => Ok(parameter),
        ParameterOrRef::Reference { reference } => {
            let name = reference.strip_prefix("#/parameters/").ok_or_else(|| {
                ConfigurationError::unsupported_schema(
                    format!("endpoint {}", label),
                    format!("parameter reference `{}` does not point into #/parameters", reference),
                )
            })?;
            document.parameters.get(name).ok_or_else(|| {
                ConfigurationError::dangling_reference(name, format!("endpoint {}", label))
            })
        }
    }
}

fn convert_parameter(
    parameter: &ParameterObject,
    label: &str,
) -> Result<Parameter, ConfigurationError> {
    let unsupported = |reason: String| {
        ConfigurationError::unsupported_parameter(label, &parameter.name, reason)
    };

    let location = match parameter.location.as_str() {
        "path" => Location::Path,
        "query" => Location::Query,
        "header" => Location::Header,
        "formData" => Location::Form,
        "body" => Location::Body,
        other => return Err(unsupported(format!("location `{}`", other))),
    };

    let schema = if location == Location::Body {
        let schema = parameter
            .schema
            .as_ref()
            .ok_or_else(|| unsupported("body parameter without schema".to_string()))?;
        let context = format!("body parameter `{}` of {}", parameter.name, label);
        ParameterSchema::Body(schema_type(schema, &context)?)
    } else {
        let type_name = parameter
            .type_name
            .clone()
            .ok_or_else(|| unsupported("parameter without type".to_string()))?;
        ParameterSchema::Simple(SimpleSchema {
            type_name,
            format: parameter.format.clone(),
            enum_values: enum_values(&parameter.enum_values),
            constraints: Constraints {
                min_length: parameter.min_length,
                max_length: parameter.max_length,
                minimum: parameter.minimum,
                maximum: parameter.maximum,
            },
            items: parameter.items.as_deref().map(simple_items).map(Box::new),
            min_items: parameter.min_items,
            max_items: parameter.max_items,
        })
    };

    Ok(Parameter::new(parameter.name.clone(), location, schema))
}

/// Item schema of an array parameter.
fn simple_items(schema: &SchemaObject) -> SimpleSchema {
    SimpleSchema {
        type_name: schema.type_name.clone().unwrap_or_default(),
        format: schema.format.clone(),
        enum_values: enum_values(&schema.enum_values),
        constraints: constraints(schema),
        items: schema.items.as_deref().map(simple_items).map(Box::new),
        min_items: schema.min_items,
        max_items: schema.max_items,
    }
}

fn schema_type(schema: &SchemaObject, context: &str) -> Result<Type, ConfigurationError> {
    if let Some(reference) = &schema.reference {
        let name = reference.strip_prefix("#/definitions/").ok_or_else(|| {
            ConfigurationError::unsupported_schema(
                context,
                format!("reference `{}` does not point into #/definitions", reference),
            )
        })?;
        return Ok(Type::reference(name));
    }

    match schema.type_name.as_deref() {
        Some("object") | None => {
            let mut properties = BTreeMap::new();
            for (name, property) in schema.properties.iter().flatten() {
                let context = format!("{} property `{}`", context, name);
                properties.insert(name.clone(), schema_type(property, &context)?);
            }
            let additional_properties = match &schema.additional_properties {
                Some(AdditionalProperties::Schema(values)) => {
                    let context = format!("{} additional properties", context);
                    Some(Box::new(schema_type(values, &context)?))
                }
                Some(AdditionalProperties::Flag(_)) | None => None,
            };
            Ok(Type::Object(ObjectType {
                properties,
                additional_properties,
            }))
        }
        Some("array") => {
            let items = schema.items.as_deref().ok_or_else(|| {
                ConfigurationError::unsupported_schema(context, "array without items")
            })?;
            let item = schema_type(items, &format!("{} items", context))?;
            Ok(Type::Array(ArrayType {
                item: Box::new(item),
                min_items: schema.min_items,
                max_items: schema.max_items,
            }))
        }
        Some(type_name) => {
            let kind = primitive_kind(type_name, schema.format.as_deref()).ok_or_else(|| {
                ConfigurationError::unsupported_schema(context, format!("type `{}`", type_name))
            })?;
            Ok(Type::Primitive(PrimitiveType {
                kind,
                constraints: constraints(schema),
                enum_values: enum_values(&schema.enum_values),
            }))
        }
    }
}

fn primitive_kind(type_name: &str, format: Option<&str>) -> Option<PrimitiveKind> {
    let kind = match (type_name, format) {
        ("string", Some("date-time")) => PrimitiveKind::DateTime,
        ("string", _) => PrimitiveKind::String,
        ("integer", Some("int64")) => PrimitiveKind::Int64,
        ("integer", _) => PrimitiveKind::Int32,
        ("number", Some("float")) => PrimitiveKind::Float32,
        ("number", _) => PrimitiveKind::Float64,
        ("boolean", _) => PrimitiveKind::Boolean,
        _ => return None,
    };
    Some(kind)
}

fn constraints(schema: &SchemaObject) -> Constraints {
    Constraints {
        min_length: schema.min_length,
        max_length: schema.max_length,
        minimum: schema.minimum,
        maximum: schema.maximum,
    }
}

fn enum_values(values: &Option<Vec<serde_json::Value>>) -> Option<Vec<Value>> {
    values
        .as_ref()
        .map(|values| values.iter().map(Value::from_json).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PETSTORE: &str = r##"{
      "swagger": "2.0",
      "definitions": {
        "Pet": {
          "type": "object",
          "properties": {
            "id": {"type": "integer", "format": "int64"},
            "name": {"type": "string", "minLength": 1, "maxLength": 10},
            "status": {"type": "string", "enum": ["available", "sold"]},
            "tags": {"type": "array", "items": {"$ref": "#/definitions/Tag"}},
            "labels": {"type": "object", "additionalProperties": {"type": "string"}}
          }
        },
        "Tag": {"type": "object", "properties": {"name": {"type": "string"}}}
      },
      "parameters": {
        "Limit": {"name": "limit", "in": "query", "type": "integer", "format": "int32", "minimum": 1, "maximum": 50}
      },
      "paths": {
        "/pets": {
          "get": {
            "parameters": [{"$ref": "#/parameters/Limit"}],
            "responses": {"200": {"description": "ok"}, "default": {"description": "error"}}
          },
          "post": {
            "parameters": [{"name": "pet", "in": "body", "schema": {"$ref": "#/definitions/Pet"}}],
            "responses": {"201": {"description": "created"}, "400": {"description": "bad"}}
          }
        },
        "/pets/{petId}": {
          "parameters": [{"name": "petId", "in": "path", "required": true, "type": "integer", "format": "int64"}],
          "get": {"responses": {"200": {"description": "ok"}, "404": {"description": "missing"}}},
          "delete": {
            "parameters": [{"name": "api_key", "in": "header", "type": "string"}],
            "responses": {"204": {"description": "gone"}}
          }
        }
      }
    }"##;

    const UPLOAD_YAML: &str = r#"
swagger: 2.0
paths:
  /upload:
    post:
      parameters:
        - name: file
          in: formData
          type: file
        - name: X-Tags
          in: header
          type: array
          items:
            type: string
      responses:
        200:
          description: ok
        default:
          description: error
"#;

    #[test]
    fn test_convert_json_document() {
        let model = parse_document(PETSTORE).unwrap();

        let ids: Vec<String> = model.endpoints.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            ids,
            vec!["GET /pets", "POST /pets", "GET /pets/{petId}", "DELETE /pets/{petId}"]
        );

        let list = model.find_endpoint(Method::Get, "/pets").unwrap();
        assert_eq!(list.declared_responses, BTreeSet::from([200]));
        let limit = &list.parameters[0];
        assert_eq!(limit.name, "limit");
        assert_eq!(limit.location, Location::Query);
        match &limit.schema {
            ParameterSchema::Simple(simple) => {
                assert_eq!(simple.constraints.minimum, Some(1.0));
                assert_eq!(simple.constraints.maximum, Some(50.0));
            }
            other => panic!("unexpected {:?}", other),
        }

        let create = model.find_endpoint(Method::Post, "/pets").unwrap();
        assert_eq!(
            create.parameters[0].schema,
            ParameterSchema::Body(Type::reference("Pet"))
        );

        let delete = model.find_endpoint(Method::Delete, "/pets/{petId}").unwrap();
        let names: Vec<_> = delete.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["petId", "api_key"]);
    }

    #[test]
    fn test_convert_definitions() {
        let model = parse_document(PETSTORE).unwrap();
        let Type::Object(pet) = &model.definitions["Pet"] else {
            panic!("Pet must be an object");
        };

        assert_eq!(pet.properties["id"], Type::int64());
        assert_eq!(pet.properties["tags"], Type::array(Type::reference("Tag")));
        match &pet.properties["status"] {
            Type::Primitive(p) => assert_eq!(
                p.enum_values,
                Some(vec![Value::from("available"), Value::from("sold")])
            ),
            other => panic!("unexpected {:?}", other),
        }
        match &pet.properties["labels"] {
            Type::Object(labels) => {
                assert!(labels.properties.is_empty());
                assert_eq!(labels.additional_properties.as_deref(), Some(&Type::string()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_yaml_with_numeric_keys() {
        let model = parse_document(UPLOAD_YAML).unwrap();
        let upload = model.find_endpoint(Method::Post, "/upload").unwrap();

        assert_eq!(upload.declared_responses, BTreeSet::from([200]));
        assert_eq!(upload.parameters[0].location, Location::Form);
        match &upload.parameters[1].schema {
            ParameterSchema::Simple(simple) => {
                assert_eq!(simple.type_name, "array");
                assert_eq!(simple.items.as_ref().unwrap().type_name, "string");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_head_is_fatal() {
        let doc = r#"{"swagger": "2.0", "paths": {"/ping": {"head": {"responses": {"200": {}}}}}}"#;
        let err = parse_document(doc).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Configuration(ConfigurationError::UnsupportedMethod(ref m)) if m == "HEAD /ping"
        ));
    }

    #[test]
    fn test_dangling_parameter_reference() {
        let doc = r##"{"paths": {"/a": {"get": {"parameters": [{"$ref": "#/parameters/Missing"}]}}}}"##;
        let err = parse_document(doc).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Configuration(ConfigurationError::DanglingReference { ref name, .. }) if name == "Missing"
        ));
    }

    #[test]
    fn test_unknown_location_is_unsupported() {
        let doc = r#"{"paths": {"/a": {"get": {"parameters": [{"name": "sid", "in": "cookie", "type": "string"}]}}}}"#;
        let err = parse_document(doc).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Configuration(ConfigurationError::UnsupportedParameter { .. })
        ));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(parse_document("{ not json"), Err(LoadError::Parse(_))));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(UPLOAD_YAML.as_bytes()).unwrap();

        let model = load_file(file.path()).unwrap();
        assert_eq!(model.endpoints.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let err = load_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[tokio::test]
    async fn test_load_from_path_location() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PETSTORE.as_bytes()).unwrap();

        let location = file.path().to_str().unwrap().to_string();
        let model = load(&location).await.unwrap();
        assert_eq!(model.definitions.len(), 2);
    }
}
