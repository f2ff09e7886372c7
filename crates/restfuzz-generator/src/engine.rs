//! Builds samplers from the schema model.
//!
//! Every named definition becomes one `Sampler<Value>`. References between
//! definitions are never expanded at construction: a reference becomes an
//! indirection sampler that looks the name up in a shared table on every
//! draw. The table is filled once, after all definitions are built, so
//! self-referential and mutually recursive definitions need no special
//! treatment. A definition that requires itself through references alone is
//! rejected up front. Every other cycle is cut by the nesting budget
//! (`GeneratorConfig::max_depth`): once a draw is that many references deep,
//! nullable fields come out absent and references sample to null.

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

use restfuzz_core::{
    ArrayType, ConfigurationError, Endpoint, EndpointIdentity, Location, ObjectType, Parameter,
    ParameterSchema, PrimitiveKind, PrimitiveType, SimpleSchema, Type, Value,
};

use crate::combinators::{constant, list_of, sequence};
use crate::config::GeneratorConfig;
use crate::endpoint::{EndpointSampler, ParameterSamplers};
use crate::primitives::{current_instant, primitive_sampler, string_sampler};
use crate::sampler::Sampler;

type DefinitionTable = HashMap<String, Sampler<Value>>;

/// Named fields sampled together into one map.
type FieldSamplers = Vec<(String, Sampler<Option<Value>>)>;

thread_local! {
    /// References entered by the draw in progress on this thread.
    static NESTING: Cell<usize> = const { Cell::new(0) };
}

fn nesting() -> usize {
    NESTING.with(Cell::get)
}

/// One level of reference nesting, released on drop.
struct NestingGuard;

impl NestingGuard {
    fn enter() -> Self {
        NESTING.with(|depth| depth.set(depth.get() + 1));
        NestingGuard
    }
}

impl Drop for NestingGuard {
    fn drop(&mut self) {
        NESTING.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Turns definitions and endpoints into samplers.
pub struct GeneratorEngine {
    table: Arc<OnceLock<DefinitionTable>>,
    names: BTreeSet<String>,
    config: GeneratorConfig,
    now: String,
}

impl GeneratorEngine {
    /// Build the definition table with the default configuration.
    pub fn new(definitions: &BTreeMap<String, Type>) -> Result<Self, ConfigurationError> {
        Self::with_config(definitions, GeneratorConfig::default())
    }

    /// Build the definition table.
    ///
    /// Fails on the first reference to a name missing from `definitions`.
    pub fn with_config(
        definitions: &BTreeMap<String, Type>,
        config: GeneratorConfig,
    ) -> Result<Self, ConfigurationError> {
        check_unguarded_cycles(definitions)?;

        let engine = Self {
            table: Arc::new(OnceLock::new()),
            names: definitions.keys().cloned().collect(),
            config,
            now: current_instant(),
        };

        let mut samplers = DefinitionTable::with_capacity(definitions.len());
        for (name, ty) in definitions {
            let context = format!("definition `{}`", name);
            samplers.insert(name.clone(), engine.type_sampler(ty, &context)?);
            debug!(definition = %name, "built definition sampler");
        }

        // The lock was created above and nothing else has seen it yet.
        let _ = engine.table.set(samplers);

        info!(definitions = definitions.len(), "definition samplers ready");
        Ok(engine)
    }

    /// The sampler of a named definition.
    pub fn definition(&self, name: &str) -> Option<Sampler<Value>> {
        self.table.get().and_then(|table| table.get(name)).cloned()
    }

    /// Names of every known definition, sorted.
    pub fn definition_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Build the samplers of every parameter group of `endpoint`.
    pub fn parameter_samplers(
        &self,
        endpoint: &Endpoint,
    ) -> Result<ParameterSamplers, ConfigurationError> {
        let label = endpoint.to_string();
        let mut body: Option<(&str, Sampler<Value>)> = None;
        let mut groups: HashMap<Location, FieldSamplers> = HashMap::new();

        for parameter in &endpoint.parameters {
            let context = format!("parameter `{}` of {}", parameter.name, label);
            match (parameter.location, &parameter.schema) {
                (Location::Body, ParameterSchema::Body(ty)) => {
                    if let Some((first, _)) = body {
                        return Err(ConfigurationError::MultipleBodyParameters {
                            endpoint: label,
                            first: first.to_string(),
                            second: parameter.name.clone(),
                        });
                    }
                    body = Some((parameter.name.as_str(), self.type_sampler(ty, &context)?));
                }
                (Location::Body, ParameterSchema::Simple(_)) => {
                    return Err(ConfigurationError::unsupported_parameter(
                        &label,
                        &parameter.name,
                        "body parameters need a schema",
                    ));
                }
                (location, ParameterSchema::Body(_)) => {
                    return Err(ConfigurationError::unsupported_parameter(
                        &label,
                        &parameter.name,
                        format!("{} parameters cannot carry a body schema", location),
                    ));
                }
                (location, ParameterSchema::Simple(simple)) => {
                    let ty = simple_type(&label, parameter, simple)?;
                    let sampler = self.type_sampler(&ty, &context)?;
                    // A URL cannot omit a path segment.
                    let sampler = if location == Location::Path {
                        sampler.map(Some)
                    } else {
                        sampler.nullable(self.config.absent_probability)
                    };
                    groups
                        .entry(location)
                        .or_default()
                        .push((parameter.name.clone(), sampler));
                }
            }
        }

        let mut group =
            |location: Location| group_sampler(groups.remove(&location).unwrap_or_default());
        Ok(ParameterSamplers {
            query: group(Location::Query),
            path: group(Location::Path),
            header: group(Location::Header),
            form: group(Location::Form),
            body: body.map(|(_, sampler)| sampler),
        })
    }

    /// Package the parameter samplers of `endpoint` with its identity on
    /// the server at `base_url`.
    pub fn endpoint_sampler(
        &self,
        endpoint: &Endpoint,
        base_url: &str,
    ) -> Result<EndpointSampler, ConfigurationError> {
        let parameters = self.parameter_samplers(endpoint)?;
        debug!(endpoint = %endpoint, "built endpoint sampler");
        Ok(EndpointSampler::new(
            EndpointIdentity::new(endpoint.method, base_url, endpoint.path.clone()),
            endpoint.declared_responses.clone(),
            parameters,
        ))
    }

    fn type_sampler(&self, ty: &Type, context: &str) -> Result<Sampler<Value>, ConfigurationError> {
        match ty {
            Type::Primitive(primitive) => Ok(primitive_sampler(primitive, &self.config, &self.now)),
            Type::Reference(name) => self.resolve(name, context),
            Type::Array(array) => match array.item.as_ref() {
                // An array of references yields one referenced value.
                Type::Reference(name) => self.resolve(name, context),
                item => {
                    let item = self.field_sampler(item, context)?;
                    let min = array.min_items.unwrap_or(0);
                    let max = array
                        .max_items
                        .unwrap_or_else(|| self.config.default_max_items.max(min));
                    Ok(list_of(item, min, max)
                        .map(|items| Value::Array(items.into_iter().map(or_null).collect())))
                }
            },
            Type::Object(object) if object.properties.is_empty() => {
                self.map_sampler(object.additional_properties.as_deref(), context)
            }
            Type::Object(object) => self.object_sampler(object, context),
        }
    }

    /// A property sampler: references are used as is, everything else may be
    /// absent, and is always absent once the nesting budget is spent.
    fn field_sampler(
        &self,
        ty: &Type,
        context: &str,
    ) -> Result<Sampler<Option<Value>>, ConfigurationError> {
        match ty {
            Type::Reference(name) => Ok(self.resolve(name, context)?.map(Some)),
            _ => {
                let field = self
                    .type_sampler(ty, context)?
                    .nullable(self.config.absent_probability);
                let max_depth = self.config.max_depth;
                Ok(Sampler::new(move |rng| {
                    if nesting() >= max_depth {
                        None
                    } else {
                        field.sample(rng)
                    }
                }))
            }
        }
    }

    fn object_sampler(
        &self,
        object: &ObjectType,
        context: &str,
    ) -> Result<Sampler<Value>, ConfigurationError> {
        let mut names = Vec::with_capacity(object.properties.len());
        let mut fields = Vec::with_capacity(object.properties.len());
        for (name, ty) in &object.properties {
            let context = format!("{} property `{}`", context, name);
            fields.push(self.field_sampler(ty, &context)?);
            names.push(name.clone());
        }

        Ok(sequence(fields).map(move |values| {
            Value::Object(
                names
                    .iter()
                    .cloned()
                    .zip(values.into_iter().map(or_null))
                    .collect(),
            )
        }))
    }

    /// A loosely-typed map with a fixed number of distinct keys.
    fn map_sampler(
        &self,
        additional: Option<&Type>,
        context: &str,
    ) -> Result<Sampler<Value>, ConfigurationError> {
        let values = match additional {
            Some(ty) => self.field_sampler(ty, context)?.map(or_null),
            None => string_sampler(0, self.config.default_max_length).map(Value::String),
        };
        let keys = string_sampler(0, self.config.default_max_length);
        let size = self.config.map_size;

        Ok(Sampler::new(move |rng| {
            let mut map = BTreeMap::new();
            // Short keys collide; give up after a fixed number of tries.
            let mut attempts = 0;
            while map.len() < size && attempts < size * 16 {
                attempts += 1;
                let key = keys.sample(rng);
                if !map.contains_key(&key) {
                    map.insert(key, values.sample(rng));
                }
            }
            Value::Object(map)
        }))
    }

    /// An indirection sampler for the definition called `name`. Samples to
    /// null once the draw is `max_depth` references deep.
    fn resolve(&self, name: &str, context: &str) -> Result<Sampler<Value>, ConfigurationError> {
        if !self.names.contains(name) {
            return Err(ConfigurationError::dangling_reference(name, context));
        }

        let table = Arc::clone(&self.table);
        let name = name.to_string();
        let max_depth = self.config.max_depth;
        Ok(Sampler::new(move |rng| {
            if nesting() >= max_depth {
                return Value::Null;
            }
            match table.get().and_then(|table| table.get(&name)) {
                Some(sampler) => {
                    let _level = NestingGuard::enter();
                    sampler.sample(rng)
                }
                // Only reachable while the table is still being built.
                None => Value::Null,
            }
        }))
    }
}

impl fmt::Debug for GeneratorEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorEngine")
            .field("definitions", &self.names)
            .field("config", &self.config)
            .finish()
    }
}

fn or_null(value: Option<Value>) -> Value {
    value.unwrap_or(Value::Null)
}

fn group_sampler(fields: FieldSamplers) -> Sampler<BTreeMap<String, Value>> {
    if fields.is_empty() {
        return constant(BTreeMap::new());
    }

    let (names, samplers): (Vec<String>, Vec<_>) = fields.into_iter().unzip();
    sequence(samplers).map(move |values| {
        names
            .iter()
            .zip(values)
            .filter_map(|(name, value)| value.map(|v| (name.clone(), v)))
            .collect()
    })
}

/// Definitions sampled on every draw of `ty`. Nullable properties are
/// skipped since they can stop the recursion.
fn required_references(ty: &Type) -> Vec<&str> {
    match ty {
        Type::Reference(name) => vec![name.as_str()],
        Type::Array(array) => match array.item.as_ref() {
            Type::Reference(name) => vec![name.as_str()],
            _ => Vec::new(),
        },
        Type::Object(object) if object.properties.is_empty() => {
            match object.additional_properties.as_deref() {
                Some(Type::Reference(name)) => vec![name.as_str()],
                _ => Vec::new(),
            }
        }
        Type::Object(object) => object
            .properties
            .values()
            .filter_map(|ty| match ty {
                Type::Reference(name) => Some(name.as_str()),
                _ => None,
            })
            .collect(),
        Type::Primitive(_) => Vec::new(),
    }
}

/// Reject definitions that reach themselves through required references
/// only (`A = B`, `B = [A]`, `Node { next: Node }`); sampling one would
/// never produce a value.
fn check_unguarded_cycles(definitions: &BTreeMap<String, Type>) -> Result<(), ConfigurationError> {
    for start in definitions.keys() {
        let mut seen = BTreeSet::new();
        let mut pending = vec![start.as_str()];
        while let Some(current) = pending.pop() {
            let Some(ty) = definitions.get(current) else {
                continue;
            };
            for next in required_references(ty) {
                if next == start {
                    return Err(ConfigurationError::unsupported_schema(
                        format!("definition `{}`", start),
                        "definition requires itself through non-nullable references",
                    ));
                }
                if seen.insert(next) {
                    pending.push(next);
                }
            }
        }
    }
    Ok(())
}

/// Map a simple parameter schema to a type, rejecting combinations outside
/// the supported set.
fn simple_type(
    endpoint: &str,
    parameter: &Parameter,
    schema: &SimpleSchema,
) -> Result<Type, ConfigurationError> {
    let unsupported =
        |reason: String| ConfigurationError::unsupported_parameter(endpoint, &parameter.name, reason);
    let location = parameter.location;
    let format = schema.format.as_deref();

    let kind = match (schema.type_name.as_str(), format) {
        ("string", Some("date-time")) => PrimitiveKind::DateTime,
        ("string", _) => PrimitiveKind::String,
        ("integer", None | Some("int32")) => PrimitiveKind::Int32,
        ("integer", Some("int64")) => PrimitiveKind::Int64,
        ("number", Some("float")) => PrimitiveKind::Float32,
        ("number", None | Some("double")) => PrimitiveKind::Float64,
        ("file", _) if location == Location::Form => PrimitiveKind::String,
        ("file", _) => return Err(unsupported("file parameters must be form data".into())),
        ("array", _) if location == Location::Header => {
            let items = schema
                .items
                .as_deref()
                .ok_or_else(|| unsupported("array parameter without items".into()))?;
            if items.type_name == "array" {
                return Err(unsupported("nested array parameters".into()));
            }
            let item = simple_type(endpoint, parameter, items)?;
            return Ok(Type::Array(ArrayType {
                item: Box::new(item),
                min_items: schema.min_items,
                max_items: schema.max_items,
            }));
        }
        ("array", _) => {
            return Err(unsupported(format!(
                "array parameters are only supported in headers, not {}",
                location
            )))
        }
        (other, Some(format)) => {
            return Err(unsupported(format!("type `{}` with format `{}`", other, format)))
        }
        (other, None) => return Err(unsupported(format!("type `{}`", other))),
    };

    Ok(Type::Primitive(PrimitiveType {
        kind,
        constraints: schema.constraints.clone(),
        enum_values: schema.enum_values.clone(),
    }))
}
