//! Stock quote tool.

use async_trait::async_trait;
use serde_json::Value;

use pitlane_types::{AppError, ErrorKind};

use super::weather::default_client;
use super::Tool;
use crate::util::map_http_err;

pub struct StocksTool {
    http: reqwest::Client,
    base_url: String,
}

impl StocksTool {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: default_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Tool for StocksTool {
    fn name(&self) -> &'static str {
        "stocks"
    }

    async fn run(&self, query: &str) -> Result<Value, AppError> {
        let response = self
            .http
            .get(format!("{}/chart/{}", self.base_url, query))
            .send()
            .await
            .map_err(|e| map_http_err("quote fetch", e))?;

        if !response.status().is_success() {
            return Err(AppError::new(
                ErrorKind::ToolExecutionError,
                format!("quote API returned {} for {}", response.status(), query),
            ));
        }
        response.json().await.map_err(|e| map_http_err("quote decode", e))
    }
}
