use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::transport::{Headers, HttpRequest, Method, Transport};
use crate::config::Config;
use crate::error::{ClientError, Result};

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const SESSION_ID_HEADER: &str = "X-Session-ID";
const UNKNOWN_USER: &str = "unknown";

/// Wraps a [`Transport`] with the backend's header and status conventions.
///
/// Every call is fire-once: no retries, no client-side timeout.
pub struct ApiClient {
    transport: Box<dyn Transport>,
    config: Config,
    user_id: Option<String>,
}

impl ApiClient {
    pub fn new(config: Config, user_id: Option<String>, transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            config,
            user_id,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Default headers, then caller headers on top, then the bearer token.
    pub fn build_headers(&self, extra_headers: &Headers) -> Headers {
        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert(
            USER_ID_HEADER.to_string(),
            self.user_id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| UNKNOWN_USER.to_string()),
        );

        for (name, value) in extra_headers {
            headers.insert(name.clone(), value.clone());
        }

        if self.config.has_token() {
            headers.insert(
                "Authorization".to_string(),
                format!("Bearer {}", self.config.token),
            );
        }

        headers
    }

    /// Issue `method path` and return the parsed JSON body of a 2xx answer.
    pub async fn request(
        &self,
        path: &str,
        method: Method,
        data: Option<&Value>,
        extra_headers: &Headers,
    ) -> Result<Value> {
        let url = self.config.url_for(path);
        let body = data
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ClientError::Encode(e.to_string()))?;

        let request = HttpRequest {
            method,
            url: url.clone(),
            headers: self.build_headers(extra_headers),
            body,
        };

        debug!("{} {}", method, url);
        let response = self.transport.send(request).await.map_err(|e| {
            warn!("{} {} failed: {}", method, url, e);
            e
        })?;

        if !response.is_success() {
            warn!("{} {} returned HTTP {}", method, url, response.status);
            return Err(ClientError::HttpStatus {
                status: response.status,
                body: parse_error_body(&response.body),
            });
        }

        debug!("{} {} returned HTTP {}", method, url, response.status);
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(|e| {
            warn!("{} {} returned a body that is not JSON: {}", method, url, e);
            ClientError::Decode(e.to_string())
        })
    }

    /// Like [`request`](Self::request) but with typed request and response bodies.
    pub async fn request_as<B, T>(
        &self,
        path: &str,
        method: Method,
        data: Option<&B>,
        extra_headers: &Headers,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let data = data
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| ClientError::Encode(e.to_string()))?;
        let value = self.request(path, method, data.as_ref(), extra_headers).await?;
        serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Error bodies are kept as JSON when they parse, otherwise as a JSON string.
fn parse_error_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// `X-Session-ID` header for an optional session id.
pub fn session_headers(session_id: Option<&str>) -> Headers {
    let mut headers = Headers::new();
    if let Some(session_id) = session_id.filter(|id| !id.is_empty()) {
        headers.insert(SESSION_ID_HEADER.to_string(), session_id.to_string());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use serde::Deserialize;
    use serde_json::json;

    fn client_with(transport: &ScriptedTransport, token: &str, user: Option<&str>) -> ApiClient {
        let config = Config::new()
            .with_base_url("http://backend.test")
            .with_token(token);
        ApiClient::new(
            config,
            user.map(str::to_string),
            Box::new(transport.clone()),
        )
    }

    #[test]
    fn test_default_headers() {
        let transport = ScriptedTransport::new();
        let client = client_with(&transport, "", Some("dev_1"));
        let headers = client.build_headers(&Headers::new());

        assert_eq!(headers.get("Content-Type").map(String::as_str), Some("application/json"));
        assert_eq!(headers.get(USER_ID_HEADER).map(String::as_str), Some("dev_1"));
        assert!(!headers.contains_key("Authorization"));
    }

    #[test]
    fn test_missing_identity_is_unknown() {
        let transport = ScriptedTransport::new();
        let client = client_with(&transport, "", None);
        let headers = client.build_headers(&Headers::new());
        assert_eq!(headers.get(USER_ID_HEADER).map(String::as_str), Some("unknown"));
    }

    #[test]
    fn test_extra_headers_win_and_token_added() {
        let transport = ScriptedTransport::new();
        let client = client_with(&transport, "tok", Some("dev_1"));

        let mut extra = session_headers(Some("s1"));
        extra.insert(USER_ID_HEADER.to_string(), "override".to_string());
        let headers = client.build_headers(&extra);

        assert_eq!(headers.get(SESSION_ID_HEADER).map(String::as_str), Some("s1"));
        assert_eq!(headers.get(USER_ID_HEADER).map(String::as_str), Some("override"));
        assert_eq!(headers.get("Authorization").map(String::as_str), Some("Bearer tok"));
    }

    #[test]
    fn test_session_headers_skip_empty() {
        assert!(session_headers(None).is_empty());
        assert!(session_headers(Some("")).is_empty());
        assert_eq!(session_headers(Some("abc")).len(), 1);
    }

    #[tokio::test]
    async fn test_request_success_returns_body() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({"ok": true}));
        let client = client_with(&transport, "", Some("dev_1"));

        let body = client
            .request("/profile", Method::Post, Some(&json!({"nickname": "a"})), &Headers::new())
            .await
            .unwrap();
        assert_eq!(body, json!({"ok": true}));

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "http://backend.test/profile");
        assert_eq!(sent[0].method, Method::Post);
        let sent_body: Value = serde_json::from_str(sent[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(sent_body, json!({"nickname": "a"}));
    }

    #[tokio::test]
    async fn test_request_without_data_sends_no_body() {
        let transport = ScriptedTransport::new();
        transport.push_raw(204, "");
        let client = client_with(&transport, "", Some("dev_1"));

        let body = client
            .request("/history", Method::Get, None, &Headers::new())
            .await
            .unwrap();
        assert_eq!(body, Value::Null);
        assert_eq!(transport.requests()[0].body, None);
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let transport = ScriptedTransport::new();
        transport.push_json(400, json!({"detail": "exists"}));
        transport.push_raw(502, "Bad Gateway");
        let client = client_with(&transport, "", Some("dev_1"));

        let err = client
            .request("/profile", Method::Post, None, &Headers::new())
            .await
            .unwrap_err();
        match err {
            ClientError::HttpStatus { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, json!({"detail": "exists"}));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = client
            .request("/profile", Method::Get, None, &Headers::new())
            .await
            .unwrap_err();
        match err {
            ClientError::HttpStatus { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, json!("Bad Gateway"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let transport = ScriptedTransport::new();
        transport.push_failure("connection refused");
        let client = client_with(&transport, "", None);

        let err = client
            .request("/history", Method::Get, None, &Headers::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_success_with_invalid_json_is_decode_error() {
        let transport = ScriptedTransport::new();
        transport.push_raw(200, "<html>");
        let client = client_with(&transport, "", None);

        let err = client
            .request("/history", Method::Get, None, &Headers::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn test_request_as_decodes_typed_body() {
        #[derive(Deserialize)]
        struct Reply {
            reply: String,
        }

        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({"reply": "hi"}));
        let client = client_with(&transport, "", None);

        let reply: Reply = client
            .request_as("/chat_with_context", Method::Post, Some(&json!({"message": "x"})), &Headers::new())
            .await
            .unwrap();
        assert_eq!(reply.reply, "hi");
    }

    #[tokio::test]
    async fn test_unserializable_body_is_encode_error_and_not_sent() {
        // JSON object keys must be strings.
        let mut body = std::collections::BTreeMap::new();
        body.insert((1u8, 2u8), "x");

        let transport = ScriptedTransport::new();
        let client = client_with(&transport, "", None);

        let err = client
            .request_as::<_, Value>("/profile", Method::Post, Some(&body), &Headers::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Encode(_)));
        assert!(err.to_string().contains("encode request body"));
        assert_eq!(transport.request_count(), 0);
    }
}
