use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Only POST, PUT and PATCH carry a compiled body.
    pub fn allows_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl FromStr for HttpMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(AppError::validation(format!("Unsupported HTTP method: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub key: String,
    pub value: String,
    pub enabled: bool,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            key: String::new(),
            value: String::new(),
            enabled: true,
        }
    }
}

impl Header {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }

    /// Disabled rows and rows with an empty key or value never reach the wire.
    pub fn is_effective(&self) -> bool {
        self.enabled && !self.key.is_empty() && !self.value.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BodyType {
    #[default]
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "xml")]
    Xml,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "form-data")]
    FormData,
    #[serde(rename = "x-www-form-urlencoded")]
    UrlEncoded,
    #[serde(rename = "binary")]
    Binary,
    #[serde(rename = "graphql")]
    GraphQl,
}

impl BodyType {
    /// Content type a transport should send when the user set none.
    /// Multipart returns `None`: the boundary is chosen by the encoder.
    pub fn default_content_type(&self) -> Option<&'static str> {
        match self {
            BodyType::Json | BodyType::GraphQl => Some(mime::APPLICATION_JSON.as_ref()),
            BodyType::Xml => Some("application/xml"),
            BodyType::Text => Some(mime::TEXT_PLAIN.as_ref()),
            BodyType::UrlEncoded => Some(mime::APPLICATION_WWW_FORM_URLENCODED.as_ref()),
            BodyType::Binary => Some(mime::APPLICATION_OCTET_STREAM.as_ref()),
            BodyType::FormData => None,
        }
    }
}

/// Reference to file content owned by the caller; the engine never reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
    pub path: PathBuf,
}

impl FileRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, path }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormFieldKind {
    #[default]
    Text,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FormField {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub kind: FormFieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRef>,
}

impl FormField {
    pub fn text(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            kind: FormFieldKind::Text,
            file: None,
        }
    }

    pub fn file(key: impl Into<String>, file: FileRef) -> Self {
        Self {
            key: key.into(),
            value: file.name.clone(),
            kind: FormFieldKind::File,
            file: Some(file),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthConfig {
    #[default]
    None,
    Basic { username: String, password: String },
    Bearer { token: String },
}

/// The editable description of a request. Every field may hold `{{var}}`
/// placeholders except `files`. `body_type` decides which of `body`,
/// `form_data` and `files` is used when compiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestData {
    /// Empty until the request is saved to a collection.
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub body_type: BodyType,
    #[serde(default)]
    pub files: Vec<FileRef>,
    #[serde(default)]
    pub form_data: Vec<FormField>,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for RequestData {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::from("Untitled Request"),
            method: HttpMethod::default(),
            url: String::new(),
            headers: vec![Header::default()],
            body: String::new(),
            body_type: BodyType::default(),
            files: Vec::new(),
            form_data: vec![FormField::default()],
            auth: AuthConfig::None,
        }
    }
}

impl RequestData {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Default::default()
        }
    }
}
