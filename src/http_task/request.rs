use http::Method;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// A fully resolved outbound call, as supplied by a workflow task's input.
///
/// Deserializes from task input of the form:
///
/// ```json
/// {
///   "uri": "https://api.example.com/orders",
///   "method": "POST",
///   "headers": {"X-Request-Id": "abc"},
///   "body": {"id": 1},
///   "contentType": "application/json",
///   "accept": "application/json",
///   "readTimeOut": 5000
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescription {
    #[serde(default = "default_method", deserialize_with = "deserialize_method")]
    pub method: Method,
    pub uri: String,
    /// Headers with an absent value are not sent
    #[serde(default, deserialize_with = "deserialize_headers")]
    pub headers: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub accept: Option<String>,
    /// Per-call timeout; overrides any client-wide default
    #[serde(default, rename = "readTimeOut", deserialize_with = "deserialize_millis")]
    pub read_timeout: Option<Duration>,
}

impl RequestDescription {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: BTreeMap::new(),
            body: None,
            content_type: None,
            accept: None,
            read_timeout: None,
        }
    }

    /// Decode from workflow task input
    pub fn from_task_input(input: Value) -> crate::Result<Self> {
        Ok(serde_json::from_value(input)?)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        self.headers.insert(name.into(), value);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }
}

fn default_method() -> Method {
    Method::GET
}

fn deserialize_method<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Method, D::Error> {
    let name = String::deserialize(deserializer)?;
    Method::from_bytes(name.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| serde::de::Error::custom(format!("invalid HTTP method '{}'", name)))
}

fn deserialize_millis<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Duration>, D::Error> {
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

/// Header values may be strings, scalars or null; scalars are stringified
fn deserialize_headers<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, Option<String>>, D::Error> {
    let raw = Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                Value::Null => None,
                Value::String(s) => Some(s),
                other => Some(other.to_string()),
            };
            (name, value)
        })
        .collect())
}
