//! Core wire-level types shared by every Zabbix instance client: the
//! version parser, the JSON-RPC transport, the HTTP client abstraction,
//! and the error taxonomy.

pub mod error;
pub mod http_client;
pub mod transport;
pub mod version;

pub use error::{ClientError, RpcResult};
pub use http_client::HttpClient;
pub use transport::{AuthConvention, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use version::VersionInfo;
