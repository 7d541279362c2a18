//! A single upstream Zabbix server: credentials, HTTP transport, session
//! state, and the version-adaptive invocation logic.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Value, json};
use tokio::sync::{Mutex, RwLock};

use zabbix_rpc_core::error::{AuthError, ClientError, RpcError, RpcResult};
use zabbix_rpc_core::transport::{self, AuthConvention};
use zabbix_rpc_core::{HttpClient, VersionInfo};

use crate::adapter;
use crate::config::InstanceConfig;
use crate::params::ParamSpec;

/// How a client authenticates: with a username/password pair that it logs
/// in with itself, or with a pre-issued static API token it never refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    /// Log in with `user.login` to obtain a session token.
    Password,
    /// Use a caller-supplied static token; never attempt `user.login`.
    Token,
}

#[derive(Debug, Default)]
struct AuthState {
    token: Option<String>,
    prefer_header_auth: bool,
}

/// A single upstream Zabbix server connection.
///
/// `auth_token`/`auth_style`/`prefer_header_auth` are grouped behind one
/// mutex since they change together on login and on auth-style
/// preference flips; `cached_version` is a separate lock because version
/// detection happens independently and much less often than invocation.
pub struct Client<H: HttpClient> {
    name: String,
    url: String,
    endpoint: String,
    user: Option<String>,
    pass: Option<String>,
    auth_style: AuthStyle,
    server_timezone: Option<String>,
    http: H,
    auth: Mutex<AuthState>,
    cached_version: RwLock<Option<VersionInfo>>,
    last_error: RwLock<Option<String>>,
    next_id: AtomicU64,
}

impl<H: HttpClient> Client<H>
where
    H::Error: 'static,
{
    /// Construct a client from a validated instance record and an HTTP
    /// transport. Does not perform any network I/O.
    pub fn new(config: InstanceConfig, http: H) -> Self {
        let auth_style = if config.token.is_some() {
            AuthStyle::Token
        } else {
            AuthStyle::Password
        };
        let endpoint = transport::api_endpoint(&config.url);
        Self {
            name: config.name,
            url: config.url,
            endpoint,
            user: config.username,
            pass: config.password,
            auth_style,
            server_timezone: config.server_timezone,
            http,
            auth: Mutex::new(AuthState {
                token: config.token,
                prefer_header_auth: false,
            }),
            cached_version: RwLock::new(None),
            last_error: RwLock::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// The instance name this client was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured base URL (as given, before deriving the JSON-RPC
    /// endpoint path).
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Configured username, if this is a password-authenticated client.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Whether this client authenticates with a password (vs. a static
    /// token). Re-login-on-expiry only ever applies to password clients.
    pub fn auth_style(&self) -> AuthStyle {
        self.auth_style
    }

    /// Configured server timezone, if any.
    pub fn server_timezone(&self) -> Option<&str> {
        self.server_timezone.as_deref()
    }

    /// Clear the cached server version, forcing the next call that needs
    /// it to re-detect.
    pub async fn clear_cached_version(&self) {
        *self.cached_version.write().await = None;
    }

    /// Best-effort, non-blocking snapshot of whether this client currently
    /// holds a session token. Used by pool introspection, which must never
    /// block on a lock an in-flight call holds — a momentary lock
    /// contention is reported as "not connected" rather than awaited.
    pub fn connected(&self) -> bool {
        self.auth
            .try_lock()
            .map(|a| a.token.is_some())
            .unwrap_or(false)
    }

    /// Best-effort, non-blocking snapshot of the cached server version, for
    /// the same reason as [`Client::connected`].
    pub fn cached_version_snapshot(&self) -> Option<VersionInfo> {
        self.cached_version.try_read().ok().and_then(|v| v.clone())
    }

    /// The message from the most recent failed operation, if any.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    async fn record_result<T>(&self, result: &RpcResult<T>) {
        let mut last_error = self.last_error.write().await;
        match result {
            Ok(_) => *last_error = None,
            Err(e) => *last_error = Some(e.to_string()),
        }
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn raw_call(
        &self,
        method: &str,
        params: Value,
        convention: AuthConvention,
        token: Option<&str>,
    ) -> RpcResult<Value> {
        transport::call(
            &self.http,
            &self.endpoint,
            method,
            params,
            self.next_request_id(),
            convention,
            token,
        )
        .await
    }

    /// Log in and store the resulting session token. For token-authenticated
    /// clients, verifies the configured token instead of calling `user.login`.
    pub async fn login(&self) -> RpcResult<()> {
        let result = self.login_inner().await;
        self.record_result(&result).await;
        result
    }

    async fn login_inner(&self) -> RpcResult<()> {
        let mut auth = self.auth.lock().await;
        match self.auth_style {
            AuthStyle::Token => {
                if auth.token.is_none() {
                    return Err(ClientError::Auth(AuthError::TokenRejected(
                        "no token configured".into(),
                    )));
                }
                // Probe the token against an unauthenticated-safe endpoint.
                let convention = if auth.prefer_header_auth {
                    AuthConvention::Header
                } else {
                    AuthConvention::Body
                };
                self.raw_call(
                    "apiinfo.version",
                    json!([]),
                    convention,
                    auth.token.as_deref(),
                )
                .await
                .map_err(|e| match e {
                    ClientError::Rpc(_) | ClientError::Transport(_) => {
                        ClientError::Auth(AuthError::TokenRejected(e.to_string()))
                    }
                    other => other,
                })?;
                Ok(())
            }
            AuthStyle::Password => {
                let user = self.user.clone().ok_or(ClientError::Auth(
                    AuthError::LoginFailed("no username configured".into()),
                ))?;
                let pass = self.pass.clone().unwrap_or_default();
                let params = json!({ "user": user, "password": pass });
                let result = self
                    .raw_call("user.login", params, AuthConvention::Body, None)
                    .await
                    .map_err(|e| ClientError::Auth(AuthError::LoginFailed(e.to_string())))?;
                let token = result
                    .as_str()
                    .ok_or_else(|| {
                        ClientError::Auth(AuthError::LoginFailed(
                            "user.login did not return a session token string".into(),
                        ))
                    })?
                    .to_string();
                auth.token = Some(token);
                tracing::info!(instance = %self.name, "logged in");
                Ok(())
            }
        }
    }

    /// Log out and clear the stored session token. A no-op for
    /// token-authenticated clients and for clients with no active session.
    pub async fn logout(&self) -> RpcResult<()> {
        let mut auth = self.auth.lock().await;
        if self.auth_style == AuthStyle::Token {
            return Ok(());
        }
        let Some(token) = auth.token.take() else {
            return Ok(());
        };
        let convention = if auth.prefer_header_auth {
            AuthConvention::Header
        } else {
            AuthConvention::Body
        };
        let _ = self
            .raw_call("user.logout", json!([]), convention, Some(&token))
            .await;
        Ok(())
    }

    /// Return the cached server version, detecting it first if unknown.
    pub async fn detect_version(&self) -> RpcResult<VersionInfo> {
        let result = self.detect_version_inner().await;
        self.record_result(&result).await;
        result
    }

    async fn detect_version_inner(&self) -> RpcResult<VersionInfo> {
        if let Some(v) = self.cached_version.read().await.clone() {
            return Ok(v);
        }
        let token = self.auth.lock().await.token.clone();
        let raw = match self
            .raw_call(
                "apiinfo.version",
                json!([]),
                AuthConvention::Body,
                token.as_deref(),
            )
            .await
        {
            Ok(v) => v,
            Err(_body_failed) => {
                self.raw_call(
                    "apiinfo.version",
                    json!([]),
                    AuthConvention::Header,
                    token.as_deref(),
                )
                .await?
            }
        };
        let version_str = raw.as_str().ok_or_else(|| {
            ClientError::Transport(zabbix_rpc_core::error::TransportError::InvalidRequest(
                "apiinfo.version did not return a string".into(),
            ))
        })?;
        let version = VersionInfo::parse(version_str)?;
        *self.cached_version.write().await = Some(version.clone());
        Ok(version)
    }

    /// Version-adaptive, auth-style-learning, session-expiry-retrying
    /// invocation of a Zabbix API method.
    ///
    /// If version detection fails, the call proceeds with the caller's
    /// parameters unmodified (fail-open) rather than refusing to invoke.
    pub async fn invoke(&self, method: &str, spec: &dyn ParamSpec) -> RpcResult<Value> {
        let mut params = spec.build_params();
        if let Ok(version) = self.detect_version().await {
            adapter::adapt_params(method, &version, &mut params);
        }
        self.invoke_with_params(method, params).await
    }

    /// Like [`Client::invoke`] but for delete-style bare-array params that
    /// never go through the adapter (Zabbix `*.delete` methods take the
    /// same array shape across every supported version).
    pub async fn invoke_delete(&self, method: &str, params: Value) -> RpcResult<Value> {
        self.invoke_with_params(method, params).await
    }

    async fn invoke_with_params(&self, method: &str, params: Value) -> RpcResult<Value> {
        let result = self.invoke_with_params_inner(method, params).await;
        self.record_result(&result).await;
        result
    }

    async fn invoke_with_params_inner(&self, method: &str, params: Value) -> RpcResult<Value> {
        tracing::debug!(instance = %self.name, method, "invoking");
        let result = self.try_both_conventions(method, params.clone()).await;
        match result {
            Err(ClientError::Rpc(rpc)) if self.should_retry_after(&rpc) => {
                tracing::warn!(
                    instance = %self.name,
                    method,
                    code = rpc.code,
                    "session expired, re-logging in and retrying once"
                );
                self.login().await?;
                self.try_both_conventions(method, params).await
            }
            other => other,
        }
    }

    fn should_retry_after(&self, rpc: &RpcError) -> bool {
        self.auth_style == AuthStyle::Password && rpc.indicates_session_expiry()
    }

    /// Try the preferred auth convention; on an RPC-level error, try the
    /// other convention. If the fallback succeeds, flip the preference so
    /// subsequent calls go straight to what actually worked. Transport
    /// errors are not retried with the other convention — they indicate a
    /// connectivity problem, not an auth-convention mismatch.
    async fn try_both_conventions(&self, method: &str, params: Value) -> RpcResult<Value> {
        let (preferred, token) = {
            let auth = self.auth.lock().await;
            let convention = if auth.prefer_header_auth {
                AuthConvention::Header
            } else {
                AuthConvention::Body
            };
            (convention, auth.token.clone())
        };

        let first = self
            .raw_call(method, params.clone(), preferred, token.as_deref())
            .await;

        match first {
            Ok(v) => Ok(v),
            Err(ClientError::Transport(e)) => Err(ClientError::Transport(e)),
            Err(_rpc_or_other) => {
                let fallback = other_convention(preferred);
                let second = self
                    .raw_call(method, params, fallback, token.as_deref())
                    .await;
                if second.is_ok() {
                    tracing::warn!(
                        instance = %self.name,
                        method,
                        ?fallback,
                        "auth convention fallback succeeded, switching preference"
                    );
                    let mut auth = self.auth.lock().await;
                    auth.prefer_header_auth = matches!(fallback, AuthConvention::Header);
                }
                second
            }
        }
    }
}

fn other_convention(c: AuthConvention) -> AuthConvention {
    match c {
        AuthConvention::Body => AuthConvention::Header,
        AuthConvention::Header => AuthConvention::Body,
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Client<reqwest::Client> {
    /// Build a live client backed by `reqwest`, applying `config`'s HTTP
    /// timeout (the 120-second default when `timeout_seconds` is unset or
    /// non-positive, see [`InstanceConfig::http_timeout`]).
    pub fn connect(config: InstanceConfig) -> RpcResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(zabbix_rpc_core::error::TransportError::from)?;
        Ok(Self::new(config, http))
    }
}
