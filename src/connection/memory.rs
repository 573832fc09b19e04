use super::{Connection, Request, RequestSubscriber, Response, Subscribers};
use crate::core::Result;
use async_trait::async_trait;
use http::{Method, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-process `Connection` serving canned responses keyed by method and URI.
///
/// Unknown URIs answer `404 Not Found`. Every request that reaches the
/// connection is recorded so tests can assert on what was sent.
#[derive(Default)]
pub struct InMemoryConnection {
    responses: Mutex<HashMap<(Method, String), Response>>,
    requests: Mutex<Vec<Request>>,
    subscribers: Subscribers,
}

impl InMemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` with `200 OK` for `GET uri`.
    pub fn with_json(self, uri: &str, body: impl Into<String>) -> Self {
        self.with_response(Method::GET, uri, Response::new(StatusCode::OK, body))
    }

    pub fn with_status(self, uri: &str, status: StatusCode) -> Self {
        self.with_response(Method::GET, uri, Response::new(status, ""))
    }

    pub fn with_response(self, method: Method, uri: &str, response: Response) -> Self {
        self.set_response(method, uri, response);
        self
    }

    pub fn set_response(&self, method: Method, uri: &str, response: Response) {
        let mut responses = self
            .responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        responses.insert((method, uri.to_string()), response);
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Result<Vec<Request>> {
        Ok(self.requests.lock()?.clone())
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Connection for InMemoryConnection {
    async fn send_request(&self, mut request: Request) -> Result<Response> {
        self.subscribers.before_send(&mut request)?;
        self.requests.lock()?.push(request.clone());

        let response = self
            .responses
            .lock()?
            .get(&(request.method().clone(), request.uri().to_string()))
            .cloned()
            .unwrap_or_else(|| Response::new(StatusCode::NOT_FOUND, ""));

        self.subscribers.after_response(&request, &response)?;
        response.error_for_status(request.uri())
    }

    fn add_subscriber(&self, subscriber: Arc<dyn RequestSubscriber>) -> Result<()> {
        self.subscribers.add(subscriber)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        sent: AtomicUsize,
        received: AtomicUsize,
    }

    impl RequestSubscriber for Counter {
        fn before_send(&self, request: &mut Request) {
            self.sent.fetch_add(1, Ordering::SeqCst);
            request.set_header("X-Trace", "1");
        }

        fn after_response(&self, _request: &Request, _response: &Response) {
            self.received.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_canned_response() {
        let connection = InMemoryConnection::new().with_json("books/1.json", r#"{"id":1}"#);
        let request = connection.create_request(Method::GET, "books/1.json");
        let response = connection.send_request(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), r#"{"id":1}"#);
    }

    #[tokio::test]
    async fn test_unknown_uri_is_not_found() {
        let connection = InMemoryConnection::new();
        let err = connection
            .send_request(Request::new(Method::GET, "books/9.json"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(connection.request_count(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_every_request() {
        let connection = InMemoryConnection::new().with_status("secret.json", StatusCode::FORBIDDEN);
        let counter = Arc::new(Counter {
            sent: AtomicUsize::new(0),
            received: AtomicUsize::new(0),
        });
        connection.add_subscriber(counter.clone()).unwrap();

        let err = connection
            .send_request(Request::new(Method::GET, "secret.json"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(counter.sent.load(Ordering::SeqCst), 1);
        assert_eq!(counter.received.load(Ordering::SeqCst), 1);

        let recorded = connection.requests().unwrap();
        assert_eq!(recorded[0].header("x-trace"), Some("1"));
    }
}
