//! Request builder, envelope parser, and the generic request operation.
//!
//! # Design
//! Each call runs in three phases:
//! 1. `build_request` turns an endpoint plus [`RequestOptions`] into a plain
//!    `HttpRequest`, adding `Content-Type: application/json`, the bearer
//!    token when one is supplied, and finally the caller's headers (which
//!    win on a name clash).
//! 2. The [`Transport`] performs exactly one round-trip.
//! 3. `parse_envelope` turns the `HttpResponse` into an [`Envelope`], or an
//!    `ApiError::Http` carrying the server's message for non-2xx statuses.
//!
//! `request` composes the three and reads the session token once when the
//! call requires authentication. Nothing is retried or cached.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::envelope::Envelope;
use crate::error::{ApiError, FALLBACK_HTTP_MESSAGE};
use crate::http::{set_header, HttpMethod, HttpRequest, HttpResponse};
use crate::session::{MemoryStorage, Session, Storage};
use crate::transport::Transport;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3001/api";

/// Envelope of endpoints whose payload callers do not inspect.
pub type Ack = Envelope<Value>;

/// Method, body, and extra headers for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(HttpMethod::Get)
    }
}

impl RequestOptions {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            body: None,
            headers: Vec::new(),
        }
    }

    /// `method` with `body` serialized as JSON.
    pub fn json<B: Serialize + ?Sized>(method: HttpMethod, body: &B) -> Result<Self, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(Self::new(method).with_body(body))
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Client for the Agenda REST API.
///
/// Generic over the transport executing requests and the storage holding
/// the session token.
#[derive(Debug)]
pub struct AgendaClient<T, S = MemoryStorage> {
    base_url: String,
    transport: T,
    session: Session<S>,
}

impl<T: Transport, S: Storage> AgendaClient<T, S> {
    pub fn new(base_url: &str, transport: T, storage: S) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            session: Session::new(storage),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build the `HttpRequest` for `endpoint`. `bearer` is the token to
    /// attach, already resolved against the auth requirement.
    pub fn build_request(
        &self,
        endpoint: &str,
        options: RequestOptions,
        bearer: Option<&str>,
    ) -> HttpRequest {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(token) = bearer {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        for (name, value) in &options.headers {
            set_header(&mut headers, name, value);
        }

        HttpRequest {
            method: options.method,
            path: format!("{}{endpoint}", self.base_url),
            headers,
            body: options.body,
        }
    }

    /// Parse a response body into an envelope. Non-2xx statuses become
    /// `ApiError::Http` with the body's `message`, or the fallback text.
    pub fn parse_envelope<D: DeserializeOwned>(
        &self,
        response: HttpResponse,
    ) -> Result<Envelope<D>, ApiError> {
        if !response.is_success() {
            let message = serde_json::from_str::<Value>(&response.body)
                .ok()
                .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| FALLBACK_HTTP_MESSAGE.to_string());
            return Err(ApiError::Http {
                status: response.status,
                message,
            });
        }
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// The generic request operation. Errors are logged once and returned.
    pub fn request<D: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
        require_auth: bool,
    ) -> Result<Envelope<D>, ApiError> {
        let result = self.round_trip(endpoint, options, require_auth);
        if let Err(err) = &result {
            error!(endpoint, error = %err, "API error");
        }
        result
    }

    fn round_trip<D: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
        require_auth: bool,
    ) -> Result<Envelope<D>, ApiError> {
        let bearer = if require_auth {
            self.session.token()?
        } else {
            None
        };
        let request = self.build_request(endpoint, options, bearer.as_deref());
        debug!(method = request.method.as_str(), path = %request.path, "sending request");

        let response = self.transport.execute(&request)?;
        debug!(status = response.status, "received response");
        self.parse_envelope(response)
    }

    // -----------------------------------------------------------------------
    // Authenticated shorthands
    // -----------------------------------------------------------------------

    pub fn get<D: DeserializeOwned>(&self, endpoint: &str) -> Result<Envelope<D>, ApiError> {
        self.request(endpoint, RequestOptions::new(HttpMethod::Get), true)
    }

    pub fn post<B, D>(&self, endpoint: &str, body: &B) -> Result<Envelope<D>, ApiError>
    where
        B: Serialize + ?Sized,
        D: DeserializeOwned,
    {
        self.request(endpoint, RequestOptions::json(HttpMethod::Post, body)?, true)
    }

    pub fn put<B, D>(&self, endpoint: &str, body: &B) -> Result<Envelope<D>, ApiError>
    where
        B: Serialize + ?Sized,
        D: DeserializeOwned,
    {
        self.request(endpoint, RequestOptions::json(HttpMethod::Put, body)?, true)
    }

    pub fn delete(&self, endpoint: &str) -> Result<Ack, ApiError> {
        self.request(endpoint, RequestOptions::new(HttpMethod::Delete), true)
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    pub fn health_check(&self) -> Result<Ack, ApiError> {
        self.get("/health")
    }

    pub fn info(&self) -> Result<Ack, ApiError> {
        self.get("/info")
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    /// Transport replaying queued responses and recording every request.
    #[derive(Debug, Default)]
    pub struct Scripted {
        responses: RefCell<VecDeque<HttpResponse>>,
        seen: RefCell<Vec<HttpRequest>>,
    }

    impl Scripted {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, status: u16, body: &str) -> Self {
            self.responses.borrow_mut().push_back(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.to_string(),
            });
            self
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.seen.borrow().clone()
        }

        pub fn last(&self) -> HttpRequest {
            self.seen.borrow().last().cloned().expect("no request was sent")
        }
    }

    impl Transport for Scripted {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            self.seen.borrow_mut().push(request.clone());
            self.responses
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| ApiError::Transport("no scripted response".to_string()))
        }
    }

    pub const BASE_URL: &str = "http://localhost:3001/api";

    pub fn client(transport: Scripted) -> AgendaClient<Scripted> {
        AgendaClient::new(BASE_URL, transport, MemoryStorage::new())
    }
}
