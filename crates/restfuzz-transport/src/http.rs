//! HTTP transport backed by `reqwest`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use restfuzz_core::{ConcreteRequest, Method};

use crate::error::{TransportError, TransportResult};
use crate::Transport;

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Proxy every request is routed through.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Per-request timeout in seconds. Requests wait indefinitely when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout_secs: None,
            user_agent: concat!("restfuzz/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Sends concrete requests over HTTP and reports the status code.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build the underlying client.
    ///
    /// Without a configured proxy the client ignores proxy environment
    /// variables; the caller decides which proxy applies.
    pub fn new(config: &TransportConfig) -> TransportResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());

        builder = match config.proxy.as_deref() {
            Some(url) => {
                let proxy = reqwest::Proxy::all(url)
                    .map_err(|e| TransportError::invalid_proxy(url, e.to_string()))?;
                info!(proxy = %url, "routing requests through proxy");
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder.build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ConcreteRequest) -> TransportResult<u16> {
        let mut builder = self
            .client
            .request(reqwest_method(request.method), request.full_url());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let body = if let Some(body) = request.body_json() {
            Some(("application/json", body))
        } else {
            request
                .form_body()
                .map(|form| ("application/x-www-form-urlencoded", form))
        };
        let body_bytes = body.as_ref().map_or(0, |(_, body)| body.len());
        if let Some((content_type, body)) = body {
            builder = builder.header(CONTENT_TYPE, content_type).body(body);
        }

        debug!(
            method = %request.method,
            url = %request.full_url(),
            headers = ?request.headers,
            body_bytes,
            "sending request"
        );

        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| classify(e, started.elapsed()))?;
        let status = response.status().as_u16();

        debug!(
            method = %request.method,
            url = %request.url,
            status,
            headers = ?response.headers(),
            content_length = ?response.content_length(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "response received"
        );
        Ok(status)
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn classify(err: reqwest::Error, elapsed: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::timeout(elapsed.as_millis() as u64)
    } else if err.is_connect() {
        TransportError::connection_failed(err.to_string())
    } else if err.is_builder() {
        TransportError::invalid_request(err.to_string())
    } else {
        TransportError::Http(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    use restfuzz_core::Value;

    fn request(method: Method, url: String) -> ConcreteRequest {
        ConcreteRequest {
            method,
            url,
            body: None,
            query: BTreeMap::new(),
            path: BTreeMap::new(),
            headers: BTreeMap::new(),
            form: BTreeMap::new(),
        }
    }

    /// Accept one connection, record the raw request and answer with `status`.
    async fn one_shot_server(status: u16) -> (String, Arc<Mutex<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(String::new()));
        let recorder = Arc::clone(&seen);

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .filter_map(|l| l.split_once(':'))
                        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if raw.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            *recorder.lock().await = String::from_utf8_lossy(&raw).to_string();
            let reply = format!(
                "HTTP/1.1 {} Test\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                status
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
        });

        (format!("http://{}", addr), seen)
    }

    #[tokio::test]
    async fn test_sends_json_body_and_headers() {
        let (base, seen) = one_shot_server(418).await;
        let transport = HttpTransport::new(&TransportConfig::default()).unwrap();

        let mut req = request(Method::Post, format!("{}/pets", base));
        req.query.insert("limit".to_string(), "5".to_string());
        req.headers.insert("X-Trace".to_string(), "abc".to_string());
        req.body = Some(Value::from("rex"));

        let status = transport.send(&req).await.unwrap();
        assert_eq!(status, 418);

        let raw = seen.lock().await.clone();
        assert!(raw.starts_with("POST /pets?limit=5 HTTP/1.1"), "{}", raw);
        let lower = raw.to_ascii_lowercase();
        assert!(lower.contains("x-trace: abc"));
        assert!(lower.contains("content-type: application/json"));
        assert!(raw.ends_with("\"rex\""));
    }

    #[tokio::test]
    async fn test_sends_form() {
        let (base, seen) = one_shot_server(200).await;
        let transport = HttpTransport::new(&TransportConfig::default()).unwrap();

        let mut req = request(Method::Put, format!("{}/upload", base));
        req.form.insert("name".to_string(), "a b".to_string());

        assert_eq!(transport.send(&req).await.unwrap(), 200);
        let raw = seen.lock().await.clone();
        assert!(raw
            .to_ascii_lowercase()
            .contains("content-type: application/x-www-form-urlencoded"));
        assert!(raw.ends_with("name=a+b"));
    }

    /// Log output captured in memory.
    #[derive(Clone, Default)]
    struct CapturedLog(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_debug_trace_carries_headers_and_body_size() {
        let log = CapturedLog::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer({
                let log = log.clone();
                move || log.clone()
            })
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        let (base, _) = one_shot_server(418).await;
        let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
        let mut req = request(Method::Post, format!("{}/pets", base));
        req.headers.insert("X-Trace".to_string(), "abc".to_string());
        req.body = Some(Value::from("rex"));
        transport.send(&req).await.unwrap();

        let output = String::from_utf8_lossy(&log.0.lock().unwrap()).into_owned();
        let sending = output
            .lines()
            .find(|line| line.contains("sending request"))
            .unwrap_or_else(|| panic!("no request trace in {}", output));
        assert!(sending.contains("X-Trace"), "{}", sending);
        assert!(sending.contains("abc"), "{}", sending);
        assert!(sending.contains("body_bytes=5"), "{}", sending);

        let received = output
            .lines()
            .find(|line| line.contains("response received"))
            .unwrap_or_else(|| panic!("no response trace in {}", output));
        assert!(received.contains("status=418"), "{}", received);
        assert!(received.contains("connection"), "{}", received);
        assert!(received.contains("content_length=Some(0)"), "{}", received);
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
        let err = transport
            .send(&request(Method::Get, format!("http://{}/items/1", addr)))
            .await
            .unwrap_err();
        assert!(err.is_unavailable(), "{:?}", err);
    }

    #[test]
    fn test_invalid_proxy() {
        let config = TransportConfig {
            proxy: Some("http://exa mple:80".to_string()),
            ..Default::default()
        };
        let err = HttpTransport::new(&config).unwrap_err();
        assert!(matches!(err, TransportError::InvalidProxy { .. }));
    }
}
