use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::env::resolver::EnvResolver;
use crate::state::environment::Environment;
use crate::state::request_state::{
    AuthConfig, BodyType, FileRef, FormFieldKind, HttpMethod, RequestData,
};

const AUTHORIZATION: &str = "Authorization";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File(FileRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFormField {
    pub key: String,
    pub value: FormValue,
}

impl CompiledFormField {
    /// Text value, or the file name standing in for file content.
    pub fn display_value(&self) -> &str {
        match &self.value {
            FormValue::Text(text) => text,
            FormValue::File(file) => &file.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledBody {
    /// Canonical JSON text, or a `{"raw": ...}` envelope when the source did not parse.
    Json(String),
    /// XML, plain text or GraphQL, resolved verbatim.
    Raw { kind: BodyType, text: String },
    /// Multipart fields; byte assembly is left to the transport.
    FormData(Vec<CompiledFormField>),
    UrlEncoded(Vec<(String, String)>),
    Binary(FileRef),
}

impl CompiledBody {
    pub fn body_type(&self) -> BodyType {
        match self {
            CompiledBody::Json(_) => BodyType::Json,
            CompiledBody::Raw { kind, .. } => *kind,
            CompiledBody::FormData(_) => BodyType::FormData,
            CompiledBody::UrlEncoded(_) => BodyType::UrlEncoded,
            CompiledBody::Binary(_) => BodyType::Binary,
        }
    }

    /// Textual rendering used for history and display. Field lists render as
    /// a JSON object.
    pub fn to_text(&self) -> String {
        match self {
            CompiledBody::Json(text) | CompiledBody::Raw { text, .. } => text.clone(),
            CompiledBody::FormData(fields) => fields_to_object(
                fields.iter().map(|f| (f.key.as_str(), f.display_value())),
            ),
            CompiledBody::UrlEncoded(pairs) => {
                fields_to_object(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            }
            CompiledBody::Binary(file) => file.name.clone(),
        }
    }
}

fn fields_to_object<'a>(fields: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let map: Map<String, Value> = fields
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
    Value::Object(map).to_string()
}

/// A fully resolved, transport-ready request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<CompiledBody>,
}

impl CompiledRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The explicit Content-Type header, else the body's default.
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type")
            .map(str::to_string)
            .or_else(|| {
                self.body
                    .as_ref()
                    .and_then(|b| b.body_type().default_content_type())
                    .map(str::to_string)
            })
    }
}

/// Normalize a bare URL into a fully-qualified one.
/// - `:3000/path` → `http://localhost:3000/path`
/// - `localhost/...` → `http://localhost/...`
/// - anything else without a scheme → `https://...`
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return url.to_string();
    }
    if url.starts_with(':') {
        return format!("http://localhost{}", url);
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
        return format!("http://{}", url);
    }
    format!("https://{}", url)
}

/// Resolve every templated field of `request` against `env`.
///
/// Never fails: unknown placeholders stay verbatim and a JSON body that does
/// not parse is sent as a `{"raw": ...}` envelope. An empty or whitespace-only
/// JSON body sends no body at all rather than `{"raw": ""}`.
pub fn compile(request: &RequestData, env: Option<&Environment>) -> CompiledRequest {
    let resolver = EnvResolver::new(env);

    let url = resolver.resolve(&request.url);
    let unresolved = resolver.unresolved(&url);
    if !unresolved.is_empty() {
        debug!(?unresolved, "URL keeps unresolved placeholders");
    }

    let mut headers = BTreeMap::new();
    for header in request.headers.iter().filter(|h| h.is_effective()) {
        // Header names are case-insensitive; the last spelling wins.
        headers.retain(|k: &String, _| !k.eq_ignore_ascii_case(&header.key));
        headers.insert(header.key.clone(), resolver.resolve(&header.value));
    }

    if let Some(value) = auth_header(&request.auth, &resolver) {
        // Auth is applied last and overrides any same-named header.
        headers.retain(|k: &String, _| !k.eq_ignore_ascii_case(AUTHORIZATION));
        headers.insert(AUTHORIZATION.to_string(), value);
    }

    let body = if request.method.allows_body() {
        compile_body(request, &resolver)
    } else {
        if !request.body.trim().is_empty() {
            debug!(method = request.method.as_str(), "dropping body for method without payload");
        }
        None
    };

    CompiledRequest {
        method: request.method,
        url,
        headers,
        body,
    }
}

fn auth_header(auth: &AuthConfig, resolver: &EnvResolver) -> Option<String> {
    match auth {
        AuthConfig::None => None,
        AuthConfig::Basic { username, password } => {
            let username = resolver.resolve(username);
            let password = resolver.resolve(password);
            if username.is_empty() || password.is_empty() {
                debug!("basic auth skipped: username or password empty");
                return None;
            }
            let encoded = STANDARD.encode(format!("{}:{}", username, password));
            Some(format!("Basic {}", encoded))
        }
        AuthConfig::Bearer { token } => {
            let token = resolver.resolve(token);
            if token.is_empty() {
                debug!("bearer auth skipped: token empty");
                return None;
            }
            Some(format!("Bearer {}", token))
        }
    }
}

fn compile_body(request: &RequestData, resolver: &EnvResolver) -> Option<CompiledBody> {
    match request.body_type {
        BodyType::Json => {
            if request.body.trim().is_empty() {
                return None;
            }
            let resolved = resolver.resolve(&request.body);
            let value = match serde_json::from_str::<Value>(&resolved) {
                Ok(value) => value,
                Err(e) => {
                    warn!(error = %e, "JSON body does not parse; sending raw envelope");
                    json!({ "raw": resolved })
                }
            };
            Some(CompiledBody::Json(value.to_string()))
        }
        kind @ (BodyType::Xml | BodyType::Text | BodyType::GraphQl) => {
            if request.body.is_empty() {
                return None;
            }
            Some(CompiledBody::Raw {
                kind,
                text: resolver.resolve(&request.body),
            })
        }
        BodyType::FormData => {
            let mut fields: Vec<CompiledFormField> = Vec::new();
            for field in request.form_data.iter().filter(|f| !f.key.is_empty()) {
                let value = match (field.kind, &field.file) {
                    (FormFieldKind::File, Some(file)) => FormValue::File(file.clone()),
                    // A file row without a chosen file sends its text value.
                    (FormFieldKind::File, None) | (FormFieldKind::Text, _) => {
                        FormValue::Text(resolver.resolve(&field.value))
                    }
                };
                let key = field.key.clone();
                match fields.iter_mut().find(|f| f.key == key) {
                    Some(existing) => existing.value = value,
                    None => fields.push(CompiledFormField { key, value }),
                }
            }
            Some(CompiledBody::FormData(fields))
        }
        BodyType::UrlEncoded => {
            let mut pairs: Vec<(String, String)> = Vec::new();
            for field in request.form_data.iter().filter(|f| !f.key.is_empty()) {
                let value = match field.kind {
                    FormFieldKind::Text => resolver.resolve(&field.value),
                    FormFieldKind::File => field.value.clone(),
                };
                match pairs.iter_mut().find(|(k, _)| *k == field.key) {
                    Some(existing) => existing.1 = value,
                    None => pairs.push((field.key.clone(), value)),
                }
            }
            Some(CompiledBody::UrlEncoded(pairs))
        }
        BodyType::Binary => request.files.first().cloned().map(CompiledBody::Binary),
    }
}

/// Render a compiled request as a `curl` command line.
pub fn to_curl(request: &CompiledRequest) -> String {
    let mut parts = vec![
        "curl".to_string(),
        "-X".to_string(),
        request.method.as_str().to_string(),
        shell_quote(&request.url),
    ];

    for (key, value) in &request.headers {
        parts.push("-H".to_string());
        parts.push(shell_quote(&format!("{}: {}", key, value)));
    }

    match &request.body {
        None => {}
        Some(CompiledBody::Json(text)) | Some(CompiledBody::Raw { text, .. }) => {
            parts.push("--data-raw".to_string());
            parts.push(shell_quote(text));
        }
        Some(CompiledBody::FormData(fields)) => {
            for field in fields {
                let arg = match &field.value {
                    FormValue::Text(text) => format!("{}={}", field.key, text),
                    FormValue::File(file) => format!("{}=@{}", field.key, file.path.display()),
                };
                parts.push("-F".to_string());
                parts.push(shell_quote(&arg));
            }
        }
        Some(CompiledBody::UrlEncoded(pairs)) => {
            for (key, value) in pairs {
                parts.push("--data-urlencode".to_string());
                parts.push(shell_quote(&format!("{}={}", key, value)));
            }
        }
        Some(CompiledBody::Binary(file)) => {
            parts.push("--data-binary".to_string());
            parts.push(shell_quote(&format!("@{}", file.path.display())));
        }
    }

    parts.join(" ")
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::request_state::{FormField, Header};

    fn dev() -> Environment {
        Environment::new("Dev")
            .with_var("baseUrl", "https://api-dev.example.com")
            .with_var("token", "abc123")
            .with_var("user", "alice")
            .with_var("pass", "s3cret")
    }

    fn post(body_type: BodyType, body: &str) -> RequestData {
        RequestData {
            body_type,
            body: body.into(),
            ..RequestData::new(HttpMethod::Post, "{{baseUrl}}/items")
        }
    }

    fn json_body(req: &CompiledRequest) -> Value {
        match &req.body {
            Some(CompiledBody::Json(text)) => serde_json::from_str(text).unwrap(),
            other => panic!("expected JSON body, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url(":3000/a"), "http://localhost:3000/a");
        assert_eq!(normalize_url("localhost/a"), "http://localhost/a");
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url("http://x.dev"), "http://x.dev");
    }

    #[test]
    fn test_url_resolved_exactly() {
        let env = dev();
        let req = RequestData::new(HttpMethod::Get, "{{baseUrl}}/users");
        assert_eq!(compile(&req, Some(&env)).url, "https://api-dev.example.com/users");
    }

    #[test]
    fn test_get_never_has_body() {
        let env = dev();
        for body_type in [BodyType::Json, BodyType::Text, BodyType::FormData, BodyType::Binary] {
            let req = RequestData {
                method: HttpMethod::Get,
                form_data: vec![FormField::text("a", "b")],
                ..post(body_type, "{\"a\":1}")
            };
            assert_eq!(compile(&req, Some(&env)).body, None);
        }
    }

    #[test]
    fn test_headers_filter_and_resolve() {
        let env = dev();
        let mut disabled = Header::new("X-Off", "1");
        disabled.enabled = false;
        let req = RequestData {
            headers: vec![
                Header::new("X-Token", "{{token}}"),
                Header::new("", "orphan"),
                Header::new("X-Empty", ""),
                disabled,
                Header::new("X-Token", "second"),
            ],
            ..RequestData::new(HttpMethod::Get, "/")
        };
        let compiled = compile(&req, Some(&env));
        assert_eq!(compiled.headers.len(), 1);
        assert_eq!(compiled.headers["X-Token"], "second");
    }

    #[test]
    fn test_headers_case_insensitive_last_wins() {
        let req = RequestData {
            headers: vec![
                Header::new("Content-Type", "text/plain"),
                Header::new("content-type", "application/json"),
            ],
            ..RequestData::new(HttpMethod::Get, "/")
        };
        let compiled = compile(&req, None);
        assert_eq!(compiled.headers.len(), 1);
        assert_eq!(compiled.headers.get("content-type").map(String::as_str), Some("application/json"));
        assert_eq!(compiled.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_bearer_resolved() {
        let env = dev();
        let req = RequestData {
            auth: AuthConfig::Bearer { token: "{{token}}".into() },
            ..RequestData::new(HttpMethod::Get, "/")
        };
        let compiled = compile(&req, Some(&env));
        assert_eq!(compiled.header("Authorization"), Some("Bearer abc123"));
    }

    #[test]
    fn test_basic_auth_fields_resolved() {
        let env = dev();
        let req = RequestData {
            auth: AuthConfig::Basic {
                username: "{{user}}".into(),
                password: "{{pass}}".into(),
            },
            ..RequestData::new(HttpMethod::Get, "/")
        };
        let compiled = compile(&req, Some(&env));
        let expected = format!("Basic {}", STANDARD.encode("alice:s3cret"));
        assert_eq!(compiled.header("authorization"), Some(expected.as_str()));
    }

    #[test]
    fn test_basic_auth_needs_both_fields() {
        let req = RequestData {
            auth: AuthConfig::Basic {
                username: "alice".into(),
                password: String::new(),
            },
            ..RequestData::new(HttpMethod::Get, "/")
        };
        assert!(compile(&req, None).header("Authorization").is_none());
    }

    #[test]
    fn test_auth_overrides_explicit_header() {
        let env = dev();
        let req = RequestData {
            headers: vec![Header::new("authorization", "Token old")],
            auth: AuthConfig::Bearer { token: "{{token}}".into() },
            ..RequestData::new(HttpMethod::Get, "/")
        };
        let compiled = compile(&req, Some(&env));
        assert_eq!(compiled.headers.len(), 1);
        assert_eq!(compiled.headers["Authorization"], "Bearer abc123");
    }

    #[test]
    fn test_empty_bearer_keeps_explicit_header() {
        let req = RequestData {
            headers: vec![Header::new("Authorization", "Token kept")],
            auth: AuthConfig::Bearer { token: String::new() },
            ..RequestData::new(HttpMethod::Get, "/")
        };
        assert_eq!(compile(&req, None).headers["Authorization"], "Token kept");
    }

    #[test]
    fn test_json_body_canonical() {
        let compiled = compile(&post(BodyType::Json, "{ \"a\" : 1 }"), None);
        assert_eq!(json_body(&compiled), json!({ "a": 1 }));
        assert_eq!(compiled.body, Some(CompiledBody::Json("{\"a\":1}".into())));
    }

    #[test]
    fn test_json_body_resolves_before_parsing() {
        let env = dev();
        let compiled = compile(&post(BodyType::Json, "{\"token\":\"{{token}}\"}"), Some(&env));
        assert_eq!(json_body(&compiled), json!({ "token": "abc123" }));
    }

    #[test]
    fn test_malformed_json_wrapped() {
        let compiled = compile(&post(BodyType::Json, "not json"), None);
        assert_eq!(json_body(&compiled), json!({ "raw": "not json" }));
    }

    #[test]
    fn test_empty_json_body_omitted() {
        assert_eq!(compile(&post(BodyType::Json, "  "), None).body, None);
    }

    #[test]
    fn test_raw_bodies_resolved_verbatim() {
        let env = dev();
        let compiled = compile(&post(BodyType::Xml, "<u>{{user}}</u>"), Some(&env));
        assert_eq!(
            compiled.body,
            Some(CompiledBody::Raw {
                kind: BodyType::Xml,
                text: "<u>alice</u>".into()
            })
        );
        assert_eq!(compiled.content_type().as_deref(), Some("application/xml"));
    }

    #[test]
    fn test_form_data_fields() {
        let env = dev();
        let file = FileRef::new("/tmp/avatar.png");
        let req = RequestData {
            form_data: vec![
                FormField::text("name", "{{user}}"),
                FormField::text("", "skipped"),
                FormField::file("avatar", file.clone()),
            ],
            ..post(BodyType::FormData, "")
        };
        let compiled = compile(&req, Some(&env));
        let Some(CompiledBody::FormData(fields)) = &compiled.body else {
            panic!("expected form data");
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].value, FormValue::Text("alice".into()));
        assert_eq!(fields[1].value, FormValue::File(file));
        assert_eq!(fields[1].display_value(), "avatar.png");
        assert_eq!(
            compiled.body.as_ref().map(CompiledBody::to_text).as_deref(),
            Some("{\"avatar\":\"avatar.png\",\"name\":\"alice\"}")
        );
    }

    #[test]
    fn test_url_encoded_last_key_wins() {
        let req = RequestData {
            form_data: vec![FormField::text("a", "1"), FormField::text("a", "2")],
            ..post(BodyType::UrlEncoded, "")
        };
        assert_eq!(
            compile(&req, None).body,
            Some(CompiledBody::UrlEncoded(vec![("a".into(), "2".into())]))
        );
    }

    #[test]
    fn test_binary_uses_first_file() {
        let file = FileRef::new("/tmp/blob.bin");
        let req = RequestData {
            files: vec![file.clone()],
            ..post(BodyType::Binary, "{{ignored}}")
        };
        assert_eq!(compile(&req, None).body, Some(CompiledBody::Binary(file)));
        assert_eq!(compile(&post(BodyType::Binary, ""), None).body, None);
    }

    #[test]
    fn test_curl_rendering() {
        let env = dev();
        let req = RequestData {
            headers: vec![Header::new("Accept", "application/json")],
            auth: AuthConfig::Bearer { token: "{{token}}".into() },
            ..post(BodyType::Json, "{\"q\":\"it's\"}")
        };
        insta::assert_snapshot!(
            to_curl(&compile(&req, Some(&env))),
            @r#"curl -X POST 'https://api-dev.example.com/items' -H 'Accept: application/json' -H 'Authorization: Bearer abc123' --data-raw '{"q":"it'\''s"}'"#
        );
    }
}
