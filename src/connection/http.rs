use super::{Connection, ConnectionConfig, Request, RequestSubscriber, Response, Subscribers};
use crate::core::{RaplError, Result};
use async_trait::async_trait;
use http::StatusCode;
use log::{debug, warn};
use std::sync::Arc;

/// `Connection` backed by a pooled reqwest client.
pub struct HttpConnection {
    config: ConnectionConfig,
    client: reqwest::Client,
    subscribers: Subscribers,
}

impl HttpConnection {
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            config,
            client,
            subscribers: Subscribers::default(),
        })
    }

    pub fn from_url(url: &str) -> Result<Self> {
        Self::new(ConnectionConfig::from_url(url)?)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

#[async_trait]
impl Connection for HttpConnection {
    fn create_request(&self, method: http::Method, uri: &str) -> Request {
        let mut request = Request::new(method, uri);
        for (name, value) in &self.config.default_headers {
            request.set_header(name.clone(), value.clone());
        }
        request
    }

    async fn send_request(&self, mut request: Request) -> Result<Response> {
        self.subscribers.before_send(&mut request)?;

        let url = self.config.join(request.uri());
        let method = reqwest::Method::from_bytes(request.method().as_str().as_bytes())
            .map_err(|e| RaplError::InvalidArgument(e.to_string()))?;

        debug!("{} {}", request.method(), url);

        let mut outgoing = self.client.request(method, &url);
        for (name, value) in request.headers() {
            outgoing = outgoing.header(name.as_str(), value.as_str());
        }

        let reply = outgoing.send().await?;
        let status = StatusCode::from_u16(reply.status().as_u16())
            .map_err(|e| RaplError::Transport(e.to_string()))?;
        let headers: Vec<(String, String)> = reply
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = reply.text().await?;

        debug!("{} {} -> {}", request.method(), url, status);
        if status.is_server_error() {
            warn!("Server error {} for {}", status, url);
        }

        let mut response = Response::new(status, body);
        for (name, value) in headers {
            response = response.with_header(name, value);
        }

        self.subscribers.after_response(&request, &response)?;
        response.error_for_status(request.uri())
    }

    fn add_subscriber(&self, subscriber: Arc<dyn RequestSubscriber>) -> Result<()> {
        self.subscribers.add(subscriber)
    }
}
