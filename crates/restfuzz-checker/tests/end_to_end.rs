//! Full loop against a local stub server: sampling, request assembly, HTTP
//! transport and classification.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use rand::SeedableRng;
use tokio::net::TcpListener;

use restfuzz_checker::{Executor, RunError, Verdict};
use restfuzz_core::{Endpoint, Method, Parameter, SimpleSchema};
use restfuzz_generator::{GeneratorEngine, RandomSource};
use restfuzz_transport::{HttpTransport, TransportConfig};

type Seen = Arc<Mutex<Vec<i64>>>;

async fn get_item(Path(id): Path<i64>, State(seen): State<Seen>) -> StatusCode {
    seen.lock().unwrap().push(id);
    if id < 0 {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    }
}

/// Start the stub on an ephemeral port and return its base URL.
async fn start_stub(seen: Seen) -> String {
    let app = Router::new()
        .route("/items/:id", get(get_item))
        .with_state(seen);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn items_endpoint() -> Endpoint {
    Endpoint::new(Method::Get, "/items/{id}")
        .with_parameter(Parameter::path("id", SimpleSchema::int32()))
        .with_response(404)
}

#[tokio::test]
async fn test_get_item_passes_and_urls_carry_sampled_ids() {
    let seen = Seen::default();
    let base_url = start_stub(Arc::clone(&seen)).await;

    let engine = GeneratorEngine::new(&BTreeMap::new()).unwrap();
    let sampler = engine.endpoint_sampler(&items_endpoint(), &base_url).unwrap();
    let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
    let mut executor = Executor::new(transport, false);
    let mut rng = RandomSource::seed_from_u64(2024);

    let result = executor.run(&sampler, 50, &mut rng).await.unwrap();

    assert!(result.is_pass(), "{}", result);
    assert_eq!(result.trials, 50);
    assert!(result.counterexample.is_none());
    assert!(result.history.iter().all(|t| t.verdict == Verdict::Pass));

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 50);
    for (trial, id) in result.history.iter().zip(&seen) {
        assert_eq!(trial.url, format!("{}/items/{}", base_url, id));
        assert_eq!(trial.status, if *id < 0 { 404 } else { 200 });
        assert!(i32::try_from(*id).is_ok());
    }
}

#[tokio::test]
async fn test_undeclared_status_fails_with_transcript() {
    let seen = Seen::default();
    let base_url = start_stub(Arc::clone(&seen)).await;

    // Nothing declared: every negative id answers an undeclared 404.
    let endpoint = Endpoint::new(Method::Get, "/items/{id}")
        .with_parameter(Parameter::path("id", SimpleSchema::int32()));
    let engine = GeneratorEngine::new(&BTreeMap::new()).unwrap();
    let sampler = engine.endpoint_sampler(&endpoint, &base_url).unwrap();
    let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
    let mut executor = Executor::new(transport, false);
    let mut rng = RandomSource::seed_from_u64(7);

    let result = executor.run(&sampler, 200, &mut rng).await.unwrap();

    assert!(result.is_fail());
    let ce = result.counterexample.unwrap();
    assert_eq!(ce.status_code, 404);
    let last_id = *seen.lock().unwrap().last().unwrap();
    assert!(last_id < 0);
    assert_eq!(
        ce.transcript,
        format!("curl -v -X GET '{}/items/{}'", base_url, last_id)
    );
}

#[tokio::test]
async fn test_unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let engine = GeneratorEngine::new(&BTreeMap::new()).unwrap();
    let sampler = engine.endpoint_sampler(&items_endpoint(), &base_url).unwrap();
    let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
    let mut executor = Executor::new(transport, false);
    let mut rng = RandomSource::seed_from_u64(1);

    let err = executor.run(&sampler, 5, &mut rng).await.unwrap_err();
    assert!(matches!(err, RunError::Transport { trial: 1, .. }));
}
