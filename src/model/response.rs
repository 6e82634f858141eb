use reqwest::StatusCode;
use serde_json::{Map, Value};

use crate::error::ResponseError;

/// A parsed ReportPortal response.
#[derive(Debug, Clone, PartialEq)]
pub struct RpResponse {
    status: StatusCode,
    json: Value,
}

impl RpResponse {
    /// Wrap an already parsed body.
    pub fn new(status: StatusCode, json: Value) -> Self {
        Self { status, json }
    }

    /// Parse a raw body. An empty body is treated as `{}`.
    pub fn from_body(status: StatusCode, body: &str) -> Result<Self, ResponseError> {
        let json = if body.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(body).map_err(|source| ResponseError::Json {
                source,
                body: body.to_owned(),
            })?
        };
        Ok(Self::new(status, json))
    }

    /// Read and parse the body of an async response.
    pub async fn read(response: reqwest::Response) -> Result<Self, ResponseError> {
        let status = response.status();
        let body = response.text().await.map_err(ResponseError::Body)?;
        Self::from_body(status, &body)
    }

    /// Read and parse the body of a blocking response.
    pub fn read_blocking(response: reqwest::blocking::Response) -> Result<Self, ResponseError> {
        let status = response.status();
        let body = response.text().map_err(ResponseError::Body)?;
        Self::from_body(status, &body)
    }

    /// HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The parsed body.
    pub fn json(&self) -> &Value {
        &self.json
    }

    /// Consume the response, returning the parsed body.
    pub fn into_json(self) -> Value {
        self.json
    }

    /// The `id` field. Numeric ids are returned as strings.
    pub fn id(&self) -> Option<String> {
        match self.json.get("id")? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    /// The `message` field.
    pub fn message(&self) -> Option<&str> {
        self.json.get("message")?.as_str()
    }

    /// Messages of a batch response, or of the body itself.
    pub fn messages(&self) -> Vec<String> {
        let single = std::slice::from_ref(&self.json);
        let responses = match self.json.get("responses") {
            Some(Value::Array(responses)) => responses.as_slice(),
            _ => single,
        };
        responses
            .iter()
            .filter_map(|response| response.get("message")?.as_str())
            .map(str::to_owned)
            .collect()
    }
}
