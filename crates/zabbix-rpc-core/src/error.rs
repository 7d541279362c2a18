//! Error taxonomy for the Zabbix JSON-RPC transport and client layers.

/// Errors raised while parsing a Zabbix `apiinfo.version` string.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ParseError {
    /// The version string had fewer than two dot-separated components.
    #[error("version string {0:?} has no recognizable major.minor components")]
    TooFewComponents(String),

    /// The major component was not a valid integer.
    #[error("version string {0:?} has a non-numeric major component")]
    InvalidMajor(String),

    /// The minor component was not a valid integer.
    #[error("version string {0:?} has a non-numeric minor component")]
    InvalidMinor(String),
}

/// Transport-level errors that occur during HTTP communication with an
/// upstream Zabbix server.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum TransportError {
    /// Failed to establish connection to server
    #[error("connection error: {0}")]
    Connect(String),

    /// Request timed out
    #[error("request timeout")]
    Timeout,

    /// Request construction failed (malformed URI, headers, etc.)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response body was not well-formed JSON, or not a well-formed
    /// JSON-RPC envelope.
    #[error("malformed response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// Other transport error
    #[error("transport error: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "reqwest-client")]
impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_builder() || e.is_request() {
            Self::InvalidRequest(e.to_string())
        } else {
            Self::Other(Box::new(e))
        }
    }
}

/// A JSON-RPC 2.0 error object returned by the upstream server, surfaced as
/// a typed Rust error.
#[derive(Debug, Clone, thiserror::Error, miette::Diagnostic)]
#[error("RPC error {code}: {message}")]
pub struct RpcError {
    /// The JSON-RPC `error.code` field.
    pub code: i64,
    /// The JSON-RPC `error.message` field.
    pub message: String,
    /// The JSON-RPC `error.data` field, if present.
    pub data: Option<String>,
}

impl RpcError {
    /// Zabbix's "no permissions / invalid params" code. Observed in
    /// practice to also indicate an expired or invalid auth session.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Zabbix's "application error" code, also observed on session expiry.
    pub const APPLICATION_ERROR: i64 = -32500;

    /// Whether this error is one of the codes that indicate the current
    /// session has expired and a single re-login-and-retry is warranted.
    pub fn indicates_session_expiry(&self) -> bool {
        matches!(self.code, Self::INVALID_PARAMS | Self::APPLICATION_ERROR)
    }
}

/// Authentication and session errors.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum AuthError {
    /// Login (`user.login`) failed outright.
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// A static API token was supplied but rejected by the server.
    #[error("token authentication failed: {0}")]
    TokenRejected(String),

    /// An operation that requires an authenticated session was attempted
    /// before one was established.
    #[error("client is not authenticated")]
    NotAuthenticated,
}

/// Top-level error returned by a single client's `invoke`/`login`/`logout`.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ClientError {
    /// Transport-level failure (connection, timeout, malformed body).
    #[error("transport error: {0}")]
    Transport(
        #[from]
        #[diagnostic_source]
        TransportError,
    ),

    /// The server returned a JSON-RPC error object.
    #[error("{0}")]
    Rpc(
        #[from]
        #[diagnostic_source]
        RpcError,
    ),

    /// Authentication failed.
    #[error("authentication error: {0}")]
    Auth(
        #[from]
        #[diagnostic_source]
        AuthError,
    ),

    /// A version string could not be parsed.
    #[error("version parse error: {0}")]
    Parse(
        #[from]
        #[diagnostic_source]
        ParseError,
    ),
}

/// Result type for a single client call.
pub type RpcResult<T> = std::result::Result<T, ClientError>;

/// Errors raised by the client pool rather than by any individual client.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum PoolError {
    /// The instance roster already contains a client under this name.
    #[error("an instance named {0:?} is already registered")]
    DuplicateName(String),

    /// The pool has reached its configured capacity.
    #[error("pool is at capacity ({0} instances)")]
    Full(usize),

    /// No instance is registered under the requested name.
    #[error("no instance named {0:?} is registered")]
    NotFound(String),

    /// The caller's deadline elapsed before a client became available.
    #[error("timed out waiting for an available client")]
    AcquireTimeout,

    /// The pool has been closed and no longer accepts lease requests.
    #[error("pool is closed")]
    Closed,

    /// A per-client error surfaced while the pool was driving a call on
    /// the caller's behalf (e.g. during health check or eager login).
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Errors raised while loading or validating an instance roster.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        /// Path that failed to read.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The YAML document was not well-formed, or did not match the
    /// expected instance-roster shape.
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An instance record was missing a required field.
    #[error("instance {index} is missing required field {field:?}")]
    MissingField {
        /// Zero-based index of the offending record.
        index: usize,
        /// Name of the missing field.
        field: &'static str,
    },

    /// Two instance records used the same name.
    #[error("duplicate instance name {0:?}")]
    DuplicateName(String),

    /// An `auth_type` value other than `password` or `token`.
    #[error("instance {name:?} has unknown auth_type {value:?}")]
    UnknownAuthType {
        /// Name of the offending instance.
        name: String,
        /// The unrecognized value.
        value: String,
    },
}
