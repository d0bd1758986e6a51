//! Scripted in-memory backend for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::backend::{TopologyBackend, TopologyMethod};
use super::error::{Result, TopologyError};

#[derive(Default)]
pub struct ScriptedBackend {
    responses: HashMap<TopologyMethod, Value>,
    failures: HashMap<TopologyMethod, String>,
    delays: HashMap<TopologyMethod, Duration>,
    requests: Mutex<Vec<(TopologyMethod, Value)>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, method: TopologyMethod, response: Value) -> Self {
        self.responses.insert(method, response);
        self
    }

    pub fn fail(mut self, method: TopologyMethod, message: &str) -> Self {
        self.failures.insert(method, message.to_string());
        self
    }

    pub fn delay(mut self, method: TopologyMethod, millis: u64) -> Self {
        self.delays.insert(method, Duration::from_millis(millis));
        self
    }

    pub fn calls(&self, method: TopologyMethod) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| *m == method)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self, method: TopologyMethod) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| *m == method)
            .map(|(_, r)| r.clone())
            .collect()
    }
}

#[async_trait]
impl TopologyBackend for ScriptedBackend {
    async fn query(&self, method: TopologyMethod, request: Value) -> Result<Value> {
        self.requests.lock().unwrap().push((method, request));

        if let Some(delay) = self.delays.get(&method) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(message) = self.failures.get(&method) {
            return Err(TopologyError::Exception {
                method: method.as_str(),
                message: message.clone(),
            });
        }
        Ok(self
            .responses
            .get(&method)
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())))
    }
}
