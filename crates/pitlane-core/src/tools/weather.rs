//! Weather forecast tool.

use async_trait::async_trait;
use serde_json::Value;

use pitlane_types::{AppError, ErrorKind};

use super::Tool;
use crate::util::map_http_err;

pub struct WeatherTool {
    http: reqwest::Client,
    base_url: String,
}

impl WeatherTool {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: default_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &'static str {
        "weather"
    }

    async fn run(&self, query: &str) -> Result<Value, AppError> {
        let response = self
            .http
            .get(format!("{}/forecast", self.base_url))
            .query(&[("location", query)])
            .send()
            .await
            .map_err(|e| map_http_err("weather fetch", e))?;

        if !response.status().is_success() {
            return Err(AppError::new(
                ErrorKind::ToolExecutionError,
                format!("weather API returned {}", response.status()),
            ));
        }
        response.json().await.map_err(|e| map_http_err("weather decode", e))
    }
}

pub(super) fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .build()
        .unwrap_or_default()
}
