use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

/// Body of a normalized response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    /// Parsed payload of a successful call; non-JSON bodies are kept as strings
    Payload(Value),
    /// Descriptive message of a remote HTTP error
    Message(String),
}

/// Outcome of an outbound call handed back to the workflow engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResponse {
    pub status_code: u16,
    pub body: ResponseBody,
}

impl NormalizedResponse {
    /// Successful call; always reported with status 200
    pub fn ok(payload: Value) -> Self {
        Self {
            status_code: StatusCode::OK.as_u16(),
            body: ResponseBody::Payload(payload),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.body, ResponseBody::Payload(_))
    }

    /// JSON form stored as the task's output
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "statusCode": self.status_code,
            "body": match &self.body {
                ResponseBody::Payload(payload) => payload.clone(),
                ResponseBody::Message(message) => Value::String(message.clone()),
            },
        })
    }
}

/// The remote endpoint answered with a 4xx or 5xx status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHttpError {
    pub status: StatusCode,
    pub message: String,
}

impl RemoteHttpError {
    /// Use the response body as the message, falling back to the status line
    pub fn new(status: StatusCode, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("{} {}", status.as_u16(), status.canonical_reason().unwrap_or_default())
                .trim_end()
                .to_string()
        } else {
            body.to_string()
        };
        Self { status, message }
    }
}

impl From<RemoteHttpError> for NormalizedResponse {
    fn from(err: RemoteHttpError) -> Self {
        Self {
            status_code: err.status.as_u16(),
            body: ResponseBody::Message(err.message),
        }
    }
}
