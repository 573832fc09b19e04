//! HTTP connection seam
//!
//! The persister only needs to create a request for a method and URI and
//! send it. Implementations classify error responses so callers can tell a
//! 4xx status (`RaplError::ClientError`) from transport failures.

pub mod config;
pub mod http;
pub mod memory;

use crate::core::{RaplError, Result};
use ::http::{Method, StatusCode};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

pub use self::http::HttpConnection;
pub use config::ConnectionConfig;
pub use memory::InMemoryConnection;

/// An outgoing request. `uri` is relative to the connection's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
}

impl Request {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: Vec::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Sets a header, replacing any previous value with the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: String,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }

    /// Turns 4xx and 5xx responses into errors.
    pub fn error_for_status(self, uri: &str) -> Result<Response> {
        if self.status.is_client_error() {
            Err(RaplError::ClientError {
                status: self.status,
                uri: uri.to_string(),
                body: self.body,
            })
        } else if self.status.is_server_error() {
            Err(RaplError::ServerError {
                status: self.status,
                uri: uri.to_string(),
                body: self.body,
            })
        } else {
            Ok(self)
        }
    }
}

/// Middleware hooked around every request a connection sends.
pub trait RequestSubscriber: Send + Sync {
    fn before_send(&self, _request: &mut Request) {}

    fn after_response(&self, _request: &Request, _response: &Response) {}
}

/// Subscriber list shared by connection implementations.
#[derive(Default)]
pub struct Subscribers {
    inner: RwLock<Vec<Arc<dyn RequestSubscriber>>>,
}

impl Subscribers {
    pub fn add(&self, subscriber: Arc<dyn RequestSubscriber>) -> Result<()> {
        self.inner.write()?.push(subscriber);
        Ok(())
    }

    pub fn before_send(&self, request: &mut Request) -> Result<()> {
        for subscriber in self.inner.read()?.iter() {
            subscriber.before_send(request);
        }
        Ok(())
    }

    pub fn after_response(&self, request: &Request, response: &Response) -> Result<()> {
        for subscriber in self.inner.read()?.iter() {
            subscriber.after_response(request, response);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
pub trait Connection: Send + Sync {
    fn create_request(&self, method: Method, uri: &str) -> Request {
        Request::new(method, uri)
    }

    /// Sends `request`. Error statuses come back as `ClientError` or
    /// `ServerError`, never as an `Ok` response.
    async fn send_request(&self, request: Request) -> Result<Response>;

    fn add_subscriber(&self, subscriber: Arc<dyn RequestSubscriber>) -> Result<()>;
}
