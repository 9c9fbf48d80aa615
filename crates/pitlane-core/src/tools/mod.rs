//! External data tools the model can invoke.
//!
//! Each tool is a thin adapter over an opaque HTTP API. Invocations go
//! through the retry helper; a tool that still fails degrades the chat
//! (the model answers without the tool context) rather than failing it.

mod motorsport;
mod stocks;
mod weather;

pub use motorsport::MotorsportTool;
pub use stocks::StocksTool;
pub use weather::WeatherTool;

use async_trait::async_trait;
use serde_json::Value;

use pitlane_types::models::ToolEndpoints;
use pitlane_types::AppError;

use crate::retry::{with_retry, RetryPolicy};

/// A model-directed call to one external data API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRequest {
    Weather { location: String },
    Motorsport,
    Stocks { symbol: String },
}

impl ToolRequest {
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::Weather { .. } => "weather",
            Self::Motorsport => "motorsport",
            Self::Stocks { .. } => "stocks",
        }
    }
}

/// One external data API.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    /// `query` carries the tool-specific argument (location, symbol, ...).
    async fn run(&self, query: &str) -> Result<Value, AppError>;
}

/// Keyword routing from a user message to a tool request.
///
/// Deliberately dumb: the model does the actual answering, this only
/// decides whether to fetch context first.
pub fn detect_tool(message: &str) -> Option<ToolRequest> {
    let lower = message.to_lowercase();

    if ["weather", "forecast", "temperature"].iter().any(|kw| lower.contains(kw)) {
        if let Some(location) = extract_location(&lower) {
            return Some(ToolRequest::Weather { location });
        }
    }

    if ["standings", "championship", "grand prix", "formula 1", "f1 "]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        return Some(ToolRequest::Motorsport);
    }

    if ["stock", "share price", "ticker"].iter().any(|kw| lower.contains(kw)) {
        if let Some(symbol) = extract_symbol(message) {
            return Some(ToolRequest::Stocks { symbol });
        }
    }

    None
}

/// Text after the last " in " up to sentence punctuation.
fn extract_location(lower: &str) -> Option<String> {
    let idx = lower.rfind(" in ")?;
    let tail = &lower[idx + 4..];
    let location: String = tail
        .chars()
        .take_while(|c| !matches!(c, '?' | '.' | ',' | '!'))
        .collect::<String>()
        .trim()
        .to_string();
    (!location.is_empty()).then_some(location)
}

/// First 1-5 letter all-caps token, e.g. "AAPL" in "AAPL stock price?".
fn extract_symbol(message: &str) -> Option<String> {
    message
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_ascii_alphanumeric()))
        .find(|word| {
            (1..=5).contains(&word.len()) && word.chars().all(|c| c.is_ascii_uppercase())
        })
        .map(str::to_string)
}

/// The three tools behind one dispatch point.
pub struct ToolRegistry {
    weather: WeatherTool,
    motorsport: MotorsportTool,
    stocks: StocksTool,
    retry: RetryPolicy,
}

impl ToolRegistry {
    pub fn new(endpoints: &ToolEndpoints) -> Self {
        Self {
            weather: WeatherTool::new(&endpoints.weather_url),
            motorsport: MotorsportTool::new(&endpoints.motorsport_url),
            stocks: StocksTool::new(&endpoints.stocks_url),
            retry: RetryPolicy::default(),
        }
    }

    /// Run one tool request with retries.
    pub async fn invoke(&self, trace_id: &str, request: &ToolRequest) -> Result<Value, AppError> {
        let (tool, query): (&dyn Tool, String) = match request {
            ToolRequest::Weather { location } => (&self.weather, location.clone()),
            ToolRequest::Motorsport => (&self.motorsport, String::new()),
            ToolRequest::Stocks { symbol } => (&self.stocks, symbol.clone()),
        };

        tracing::info!("[{}] invoking tool {} query={:?}", trace_id, tool.name(), query);
        with_retry(tool.name(), self.retry, || tool.run(&query)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_weather_with_location() {
        assert_eq!(
            detect_tool("What's the weather in Monte Carlo this weekend?"),
            Some(ToolRequest::Weather { location: "monte carlo this weekend".to_string() })
        );
        // no location phrase: no tool, the model answers cold
        assert_eq!(detect_tool("how does weather radar work"), None);
    }

    #[test]
    fn test_detect_motorsport() {
        assert_eq!(detect_tool("current driver standings please"), Some(ToolRequest::Motorsport));
        assert_eq!(
            detect_tool("who won the championship in 2007?"),
            Some(ToolRequest::Motorsport)
        );
    }

    #[test]
    fn test_detect_stocks() {
        assert_eq!(
            detect_tool("what is the AAPL stock price"),
            Some(ToolRequest::Stocks { symbol: "AAPL".to_string() })
        );
        assert_eq!(detect_tool("is the stock market open"), None);
    }

    #[test]
    fn test_plain_chat_routes_nowhere() {
        assert_eq!(detect_tool("tell me a joke"), None);
    }
}
