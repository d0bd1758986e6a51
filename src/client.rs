//! Typed HTTP client for the ESP WsTopology service.
//!
//! Requests are POSTed as JSON to `<esp>/WsTopology/<Method>.json` with the
//! body wrapped in `<Method>Request`. ESP reports failures either with a
//! non-2xx status or with an `Exceptions` block inside a 2xx body; both
//! become errors.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::Config;
use crate::domain::backend::{TopologyBackend, TopologyMethod};
use crate::domain::error::{self, TopologyError};
use crate::domain::response::{records, scalar_text};

pub struct WsTopologyClient {
    base_url: String,
    http: Client,
    credentials: Option<(String, Option<String>)>,
}

impl WsTopologyClient {
    /// Without `timeout_secs` a hung ESP call waits until the server answers.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Self::build(&config.esp_url, config.timeout_secs.map(Duration::from_secs))?;
        Ok(match &config.username {
            Some(user) => client.with_credentials(user, config.password.as_deref()),
            None => client,
        })
    }

    pub fn with_credentials(mut self, username: &str, password: Option<&str>) -> Self {
        self.credentials = Some((username.to_string(), password.map(str::to_string)));
        self
    }

    fn build(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("building HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            credentials: None,
        })
    }

    fn url(&self, method: TopologyMethod) -> String {
        format!("{}/WsTopology/{}.json", self.base_url, method.as_str())
    }
}

#[async_trait]
impl TopologyBackend for WsTopologyClient {
    async fn query(&self, method: TopologyMethod, request: Value) -> error::Result<Value> {
        let url = self.url(method);
        let mut body = Map::new();
        body.insert(method.request_key(), request);

        let mut req = self.http.post(&url).json(&body);
        if let Some((user, password)) = &self.credentials {
            req = req.basic_auth(user, password.as_ref());
        }

        let resp = req.send().await.map_err(|source| TopologyError::Transport {
            url: url.clone(),
            source,
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TopologyError::Status { url, status });
        }

        let value: Value = resp.json().await.map_err(|source| TopologyError::Decode {
            method: method.as_str(),
            source,
        })?;

        if let Some(message) = exception_message(&value, method) {
            return Err(TopologyError::Exception {
                method: method.as_str(),
                message,
            });
        }

        debug!(method = method.as_str(), "WsTopology call completed");
        Ok(value)
    }
}

/// Messages from an `Exceptions` block at the top level or inside the
/// method's response object. A block listing no `Exception` entries is not
/// a failure.
fn exception_message(value: &Value, method: TopologyMethod) -> Option<String> {
    let exceptions = value
        .get("Exceptions")
        .or_else(|| value.get(method.response_key())?.get("Exceptions"))?;

    let entries = records(exceptions.get("Exception")?);
    if entries.is_empty() {
        return None;
    }

    let messages: Vec<String> = entries
        .into_iter()
        .map(|e| match e.get("Message") {
            Some(message) => scalar_text(message),
            None => Value::Object(e.clone()).to_string(),
        })
        .collect();
    Some(messages.join("; "))
}
