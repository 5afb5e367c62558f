use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Record of a completed exchange. Fields are read-only; a new send replaces
/// the whole value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    status: u16,
    status_text: String,
    headers: BTreeMap<String, String>,
    body: String,
    time_ms: u64,
    size: usize,
    received_at: DateTime<Utc>,
}

impl ResponseData {
    /// Normalize a raw exchange for display and history.
    ///
    /// Header names are lower-cased; when two names collide after folding the
    /// later one wins. The body is pretty-printed when it parses as JSON and
    /// otherwise wrapped as `{"raw": <text>}`, so `body` is always valid JSON.
    /// `size` is the byte length of that final body.
    pub fn capture<I, K, V>(
        status: u16,
        status_text: impl Into<String>,
        headers: I,
        body_text: &str,
        elapsed_ms: u64,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let headers = headers
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
            .collect::<BTreeMap<_, _>>();

        let body = normalize_body(body_text);
        let size = body.len();

        Self {
            status,
            status_text: status_text.into(),
            headers,
            body,
            time_ms: elapsed_ms,
            size,
            received_at: Utc::now(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn time_ms(&self) -> u64 {
        self.time_ms
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn normalize_body(text: &str) -> String {
    let value = serde_json::from_str::<Value>(text).unwrap_or_else(|_| json!({ "raw": text }));
    // Serializing a `Value` cannot fail: every map key is a string.
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| text.to_string())
}
