//! Per-endpoint samplers.

use std::collections::{BTreeMap, BTreeSet};

use restfuzz_core::{
    ConcreteRequest, EndpointIdentity, ParameterBundle, RequestBuilder, SpecificationError, Value,
};

use crate::sampler::{RandomSource, Sampler};

/// One sampler per parameter group of an endpoint.
///
/// Group samplers yield only the parameters that are present in a draw.
#[derive(Debug, Clone)]
pub struct ParameterSamplers {
    pub query: Sampler<BTreeMap<String, Value>>,
    pub path: Sampler<BTreeMap<String, Value>>,
    pub header: Sampler<BTreeMap<String, Value>>,
    pub form: Sampler<BTreeMap<String, Value>>,
    pub body: Option<Sampler<Value>>,
}

impl ParameterSamplers {
    /// Draw every group once.
    pub fn sample(&self, rng: &mut RandomSource) -> ParameterBundle {
        ParameterBundle {
            query: self.query.sample(rng),
            path: self.path.sample(rng),
            header: self.header.sample(rng),
            form: self.form.sample(rng),
            body: self.body.as_ref().map(|body| body.sample(rng)),
        }
    }
}

/// Everything needed to draw requests for one endpoint.
#[derive(Debug, Clone)]
pub struct EndpointSampler {
    identity: EndpointIdentity,
    declared_responses: BTreeSet<u16>,
    parameters: ParameterSamplers,
}

impl EndpointSampler {
    pub fn new(
        identity: EndpointIdentity,
        declared_responses: BTreeSet<u16>,
        parameters: ParameterSamplers,
    ) -> Self {
        Self {
            identity,
            declared_responses,
            parameters,
        }
    }

    pub fn identity(&self) -> &EndpointIdentity {
        &self.identity
    }

    /// Status codes the API description declares for this endpoint.
    pub fn declared_responses(&self) -> &BTreeSet<u16> {
        &self.declared_responses
    }

    pub fn parameters(&self) -> &ParameterSamplers {
        &self.parameters
    }

    /// Draw one parameter bundle.
    pub fn sample_bundle(&self, rng: &mut RandomSource) -> ParameterBundle {
        self.parameters.sample(rng)
    }

    /// Draw one bundle and assemble it into a request.
    pub fn sample_request(
        &self,
        rng: &mut RandomSource,
    ) -> Result<ConcreteRequest, SpecificationError> {
        RequestBuilder::build(&self.identity, self.sample_bundle(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GeneratorEngine;
    use rand::SeedableRng;
    use restfuzz_core::{Endpoint, Method, Parameter, SimpleSchema, Type};

    #[test]
    fn test_sample_request_substitutes_path() {
        let engine = GeneratorEngine::new(&BTreeMap::new()).unwrap();
        let endpoint = Endpoint::new(Method::Get, "/items/{id}")
            .with_parameter(Parameter::path("id", SimpleSchema::int32()))
            .with_response(404);

        let sampler = engine
            .endpoint_sampler(&endpoint, "http://localhost:8080")
            .unwrap();
        assert_eq!(sampler.identity().to_string(), "GET /items/{id}");
        assert!(sampler.declared_responses().contains(&404));

        let mut rng = RandomSource::seed_from_u64(11);
        for _ in 0..50 {
            let request = sampler.sample_request(&mut rng).unwrap();
            let id = &request.path["id"];
            assert_eq!(request.url, format!("http://localhost:8080/items/{}", id));
            assert!(id.parse::<i32>().is_ok());
        }
    }

    #[test]
    fn test_get_with_body_fails_at_build_time() {
        let engine = GeneratorEngine::new(&BTreeMap::new()).unwrap();
        let endpoint = Endpoint::new(Method::Get, "/search")
            .with_parameter(Parameter::body("filter", Type::int32()));

        let sampler = engine.endpoint_sampler(&endpoint, "http://localhost").unwrap();
        let mut rng = RandomSource::seed_from_u64(2);
        let err = sampler.sample_request(&mut rng).unwrap_err();
        assert!(matches!(err, SpecificationError::GetWithBody { .. }));
    }
}
