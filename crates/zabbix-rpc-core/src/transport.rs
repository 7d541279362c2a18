//! One JSON-RPC 2.0 call over HTTP to a Zabbix server, in either of the
//! two auth conventions Zabbix has used across its major versions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, RpcError, TransportError};
use crate::http_client::HttpClient;

/// Which convention a call should use to carry the session token: as a
/// field in the JSON-RPC request body (Zabbix <= 6.x), or as an HTTP
/// `Authorization: Bearer` header (Zabbix 7.x+).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthConvention {
    /// Embed the token as the JSON-RPC `"auth"` field.
    Body,
    /// Carry the token in an `Authorization: Bearer` header instead.
    Header,
}

/// Wire shape of a single JSON-RPC 2.0 request to the Zabbix API.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl From<JsonRpcError> for RpcError {
    fn from(e: JsonRpcError) -> Self {
        RpcError {
            code: e.code,
            message: e.message,
            data: e.data.map(|d| d.to_string()),
        }
    }
}

/// Wire shape of a JSON-RPC 2.0 response envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
    #[serde(default)]
    pub id: Option<u64>,
}

/// Derive the `api_jsonrpc.php` endpoint from an instance's configured
/// base URL, tolerating both a bare host and a URL that already ends in
/// the endpoint file.
pub fn api_endpoint(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("api_jsonrpc.php") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/api_jsonrpc.php")
    }
}

/// Issue one JSON-RPC call and decode its envelope.
///
/// `auth` is the session token (if any) to attach using `convention`. A
/// JSON-RPC error object is surfaced as `Err(ClientError::Rpc(_))`; HTTP
/// transport failures and non-2xx statuses are surfaced as
/// `Err(ClientError::Transport(_))`.
pub async fn call<H: HttpClient>(
    client: &H,
    endpoint: &str,
    method: &str,
    params: Value,
    id: u64,
    convention: AuthConvention,
    auth: Option<&str>,
) -> Result<Value, ClientError>
where
    H::Error: 'static,
{
    let body_auth = match convention {
        AuthConvention::Body => auth.map(|t| t.to_string()),
        AuthConvention::Header => None,
    };

    let request_body = JsonRpcRequest {
        jsonrpc: "2.0",
        method: method.to_string(),
        params,
        id,
        auth: body_auth,
    };

    let payload = serde_json::to_vec(&request_body)
        .map_err(|e| ClientError::Transport(TransportError::InvalidRequest(e.to_string())))?;

    let mut builder = http::Request::builder()
        .method(http::Method::POST)
        .uri(endpoint)
        .header(http::header::CONTENT_TYPE, "application/json");

    if let (AuthConvention::Header, Some(token)) = (convention, auth) {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = builder
        .body(payload)
        .map_err(|e| ClientError::Transport(TransportError::InvalidRequest(e.to_string())))?;

    let response = client
        .send_http(request)
        .await
        .map_err(|e| ClientError::Transport(TransportError::Other(Box::new(e))))?;

    let status = response.status();
    let body = response.into_body();

    if !status.is_success() {
        return Err(ClientError::Transport(TransportError::Other(Box::new(
            std::io::Error::other(format!("HTTP {status}")),
        ))));
    }

    let envelope: JsonRpcResponse =
        serde_json::from_slice(&body).map_err(TransportError::Decode)?;

    if let Some(err) = envelope.error {
        return Err(ClientError::Rpc(err.into()));
    }

    Ok(envelope.result.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_endpoint_from_bare_host() {
        assert_eq!(
            api_endpoint("https://zabbix.example.com"),
            "https://zabbix.example.com/api_jsonrpc.php"
        );
    }

    #[test]
    fn derives_endpoint_trims_trailing_slash() {
        assert_eq!(
            api_endpoint("https://zabbix.example.com/"),
            "https://zabbix.example.com/api_jsonrpc.php"
        );
    }

    #[test]
    fn derives_endpoint_idempotent_when_already_full() {
        assert_eq!(
            api_endpoint("https://zabbix.example.com/api_jsonrpc.php"),
            "https://zabbix.example.com/api_jsonrpc.php"
        );
    }

    #[test]
    fn decodes_rpc_error() {
        let raw = br#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"Invalid params","data":"Session terminated"},"id":1}"#;
        let envelope: JsonRpcResponse = serde_json::from_slice(raw).unwrap();
        let err = envelope.error.unwrap();
        assert_eq!(err.code, -32602);
        let rpc: RpcError = err.into();
        assert!(rpc.indicates_session_expiry());
    }
}
