//! Motorsport standings tool.

use async_trait::async_trait;
use serde_json::Value;

use pitlane_types::{AppError, ErrorKind};

use super::weather::default_client;
use super::Tool;
use crate::util::map_http_err;

pub struct MotorsportTool {
    http: reqwest::Client,
    base_url: String,
}

impl MotorsportTool {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: default_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Tool for MotorsportTool {
    fn name(&self) -> &'static str {
        "motorsport"
    }

    async fn run(&self, _query: &str) -> Result<Value, AppError> {
        let response = self
            .http
            .get(format!("{}/current/driverstandings.json", self.base_url))
            .send()
            .await
            .map_err(|e| map_http_err("standings fetch", e))?;

        if !response.status().is_success() {
            return Err(AppError::new(
                ErrorKind::ToolExecutionError,
                format!("standings API returned {}", response.status()),
            ));
        }
        response.json().await.map_err(|e| map_http_err("standings decode", e))
    }
}
