//! Concrete requests and their assembly from sampled parameters.

use std::collections::BTreeMap;
use std::fmt;

use url::form_urlencoded;

use crate::error::SpecificationError;
use crate::schema::Method;
use crate::value::Value;

/// Method, server and path template of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointIdentity {
    pub method: Method,
    /// Server base URL, e.g. `http://localhost:8080`.
    pub base_url: String,
    /// Path template with `{name}` placeholders.
    pub path: String,
}

impl EndpointIdentity {
    pub fn new(method: Method, base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method,
            base_url: base_url.into(),
            path: path.into(),
        }
    }

    /// Base URL joined with the unsubstituted path template.
    pub fn url_template(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.path)
    }
}

impl fmt::Display for EndpointIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// One sample of every parameter group of an endpoint.
///
/// Absent parameters have already been dropped from the maps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBundle {
    pub query: BTreeMap<String, Value>,
    pub path: BTreeMap<String, Value>,
    pub header: BTreeMap<String, Value>,
    pub form: BTreeMap<String, Value>,
    pub body: Option<Value>,
}

/// A fully materialized request, ready to send.
///
/// The `Display` form is a `curl` command reproducing the request.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcreteRequest {
    pub method: Method,
    /// URL with every path placeholder substituted, without the query string.
    pub url: String,
    pub body: Option<Value>,
    pub query: BTreeMap<String, String>,
    pub path: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub form: BTreeMap<String, String>,
}

impl ConcreteRequest {
    /// Percent-encoded query string, empty when there are no query parameters.
    pub fn query_string(&self) -> String {
        encode_pairs(&self.query)
    }

    /// URL including the encoded query string.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            self.url.clone()
        } else {
            format!("{}?{}", self.url, self.query_string())
        }
    }

    /// `application/x-www-form-urlencoded` payload, if the request has form fields.
    pub fn form_body(&self) -> Option<String> {
        if self.form.is_empty() {
            None
        } else {
            Some(encode_pairs(&self.form))
        }
    }

    /// JSON payload, if the request has a body.
    pub fn body_json(&self) -> Option<String> {
        self.body.as_ref().map(Value::to_string)
    }
}

fn encode_pairs(pairs: &BTreeMap<String, String>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in pairs {
        serializer.append_pair(name, value);
    }
    serializer.finish()
}

/// Turns sampled parameter bundles into validated requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestBuilder;

impl RequestBuilder {
    /// Validate the bundle against the endpoint's method and render it.
    ///
    /// Validation happens here, before anything is sent.
    pub fn build(
        identity: &EndpointIdentity,
        bundle: ParameterBundle,
    ) -> Result<ConcreteRequest, SpecificationError> {
        let body = bundle.body.filter(|b| !b.is_null());
        let endpoint = identity.to_string();

        if identity.method == Method::Get {
            if body.is_some() {
                return Err(SpecificationError::GetWithBody { endpoint });
            }
            if !bundle.form.is_empty() {
                return Err(SpecificationError::GetWithForm { endpoint });
            }
        }
        if body.is_some() && !bundle.form.is_empty() {
            return Err(SpecificationError::BodyAndForm { endpoint });
        }

        let path = render_map(bundle.path);
        let mut url = identity.url_template();
        for (name, value) in &path {
            url = url.replace(&format!("{{{}}}", name), value);
        }

        Ok(ConcreteRequest {
            method: identity.method,
            url,
            body,
            query: render_map(bundle.query),
            path,
            headers: render_map(bundle.header),
            form: render_map(bundle.form),
        })
    }
}

fn render_map(values: BTreeMap<String, Value>) -> BTreeMap<String, String> {
    values
        .into_iter()
        .map(|(name, value)| (name, value.render()))
        .collect()
}
