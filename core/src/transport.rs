//! Executes an `HttpRequest` and returns the `HttpResponse`.
//!
//! The client is written against the [`Transport`] trait. [`UreqTransport`]
//! is the blocking network implementation; any
//! `Fn(&HttpRequest) -> Result<HttpResponse, ApiError>` closure is also a
//! transport, which is how tests script responses.
//!
//! Non-2xx statuses are data, not errors, at this layer. Only a failure to
//! obtain a response at all becomes `ApiError::Transport`.

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub trait Transport {
    /// Perform exactly one round-trip.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, ApiError>,
{
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    /// Agent that reports 4xx/5xx as responses so the client can read the
    /// server's `message`.
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let path = request.path.as_str();
        let headers = request.headers.as_slice();
        let body = request.body.as_deref();

        let result = match (request.method, body) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(path), headers).call(),
            (HttpMethod::Delete, _) => with_headers(self.agent.delete(path), headers).call(),
            (HttpMethod::Post, Some(body)) => with_headers(self.agent.post(path), headers).send(body),
            (HttpMethod::Post, None) => with_headers(self.agent.post(path), headers).send_empty(),
            (HttpMethod::Put, Some(body)) => with_headers(self.agent.put(path), headers).send(body),
            (HttpMethod::Put, None) => with_headers(self.agent.put(path), headers).send_empty(),
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_transports() {
        let transport = |req: &HttpRequest| {
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: format!(r#"{{"success":true,"data":"{}"}}"#, req.method.as_str()),
            })
        };
        let req = HttpRequest {
            method: HttpMethod::Delete,
            path: "http://localhost/x".to_string(),
            headers: Vec::new(),
            body: None,
        };
        let resp = transport.execute(&req).unwrap();
        assert!(resp.body.contains("DELETE"));
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let req = HttpRequest {
            method: HttpMethod::Get,
            path: format!("http://{addr}/health"),
            headers: Vec::new(),
            body: None,
        };
        let err = UreqTransport::new().execute(&req).unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
