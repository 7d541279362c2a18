//! Loading and validating the YAML instance roster.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use zabbix_rpc_core::error::ConfigError;

/// HTTP timeout applied when `timeout_seconds` is unset or non-positive,
/// matching the original client's default.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// A validated instance record, ready to hand to [`crate::client::Client::new`]
/// or [`crate::pool::ClientPool::new`].
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    pub name: String,
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub server_timezone: Option<String>,
    pub is_default: bool,
    /// HTTP request timeout in seconds. `0` (or unset in YAML) means "use
    /// the default" rather than "no timeout" — see [`InstanceConfig::http_timeout`].
    pub timeout_seconds: u64,
}

impl InstanceConfig {
    /// Resolve the configured timeout: positive values are used as-is,
    /// zero or unset falls back to a 120-second default.
    pub fn http_timeout(&self) -> Duration {
        if self.timeout_seconds > 0 {
            Duration::from_secs(self.timeout_seconds)
        } else {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    instances: Vec<RawInstance>,
}

#[derive(Debug, Deserialize)]
struct RawInstance {
    name: Option<String>,
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    token: Option<String>,
    #[serde(default)]
    auth_type: Option<String>,
    #[serde(default)]
    server_timezone: Option<String>,
    #[serde(default)]
    default: bool,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

/// Read and parse a YAML instance roster from disk.
pub fn load_instances(path: impl AsRef<Path>) -> Result<Vec<InstanceConfig>, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_instances(&contents)
}

/// Parse and validate a YAML instance roster from a string.
pub fn parse_instances(yaml: &str) -> Result<Vec<InstanceConfig>, ConfigError> {
    let raw: RawConfig = serde_yaml::from_str(yaml)?;
    let mut seen = HashSet::new();
    let mut instances = Vec::with_capacity(raw.instances.len());

    for (index, inst) in raw.instances.into_iter().enumerate() {
        let name = inst
            .name
            .filter(|n| !n.is_empty())
            .ok_or(ConfigError::MissingField { index, field: "name" })?;
        let url = inst
            .url
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingField { index, field: "url" })?;

        if !seen.insert(name.clone()) {
            return Err(ConfigError::DuplicateName(name));
        }

        let auth_type = inst.auth_type.unwrap_or_else(|| "password".to_string());
        match auth_type.as_str() {
            "password" | "token" => {}
            other => {
                return Err(ConfigError::UnknownAuthType {
                    name,
                    value: other.to_string(),
                });
            }
        }

        instances.push(InstanceConfig {
            name,
            url,
            username: inst.username,
            password: inst.password,
            token: inst.token,
            server_timezone: inst.server_timezone,
            is_default: inst.default,
            timeout_seconds: inst.timeout_seconds.unwrap_or(0),
        });
    }

    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
instances:
  - name: prod
    url: https://zbx-prod.example.com
    username: admin
    password: zabbix
    default: true
  - name: staging
    url: https://zbx-staging.example.com
    token: abc123
    auth_type: token
"#;

    #[test]
    fn parses_valid_roster() {
        let instances = parse_instances(YAML).unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].name, "prod");
        assert!(instances[0].is_default);
        assert_eq!(instances[1].token.as_deref(), Some("abc123"));
    }

    #[test]
    fn rejects_duplicate_names() {
        let yaml = r#"
instances:
  - name: prod
    url: https://a.example.com
  - name: prod
    url: https://b.example.com
"#;
        assert!(matches!(
            parse_instances(yaml),
            Err(ConfigError::DuplicateName(_))
        ));
    }

    #[test]
    fn rejects_missing_url() {
        let yaml = "instances:\n  - name: prod\n";
        assert!(matches!(
            parse_instances(yaml),
            Err(ConfigError::MissingField { field: "url", .. })
        ));
    }

    #[test]
    fn rejects_unknown_auth_type() {
        let yaml = "instances:\n  - name: prod\n    url: https://a.example.com\n    auth_type: oauth\n";
        assert!(matches!(
            parse_instances(yaml),
            Err(ConfigError::UnknownAuthType { .. })
        ));
    }

    #[test]
    fn timeout_seconds_defaults_to_zero_and_resolves_to_120s() {
        let instances = parse_instances(YAML).unwrap();
        assert_eq!(instances[0].timeout_seconds, 0);
        assert_eq!(instances[0].http_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn positive_timeout_seconds_overrides_default() {
        let yaml = "instances:\n  - name: prod\n    url: https://a.example.com\n    timeout_seconds: 30\n";
        let instances = parse_instances(yaml).unwrap();
        assert_eq!(instances[0].http_timeout(), Duration::from_secs(30));
    }
}
