//! Version-adaptive rewriting of API call parameters.
//!
//! Different Zabbix major versions accept (or reject) different parameter
//! names for the same logical request. `adapt_params` takes the wire-shape
//! `params` object a [`crate::params::ParamSpec`] produced and edits it in
//! place for the server version the caller is about to talk to. This never
//! mutates the caller's original [`ParamSpec`] — it operates on the
//! already-deep-copied `Value` that `build_params` returned.

use serde_json::Value;
use zabbix_rpc_core::VersionInfo;

/// Feature flags advisory to callers, derived from a detected version.
/// These are informational only — the adapter's parameter rewriting below
/// does not consult this struct, it re-derives its own thresholds, exactly
/// as the upstream Zabbix API versions its endpoints and parameters
/// independently of any single summary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionFeatures {
    pub problem_get: bool,
    pub sla_get: bool,
    pub authentication_endpoint: bool,
    pub connector_endpoint: bool,
    pub proxygroup_endpoint: bool,
    pub select_tags: bool,
    pub select_dependencies: bool,
    pub select_preprocessing: bool,
    pub template_select_tags: bool,
    /// Coarse convenience flags assumed available on any server recent
    /// enough to be worth talking to. Unlike the fields above, these are
    /// not version-gated — they exist only as the fallback a caller gets
    /// when version detection itself has failed, so there is nothing to
    /// threshold against.
    pub host_management: bool,
    pub item_management: bool,
    pub trigger_management: bool,
    pub template_management: bool,
    pub event_acknowledgment: bool,
}

impl Default for VersionFeatures {
    fn default() -> Self {
        Self {
            problem_get: false,
            sla_get: false,
            authentication_endpoint: false,
            connector_endpoint: false,
            proxygroup_endpoint: false,
            select_tags: false,
            select_dependencies: false,
            select_preprocessing: false,
            template_select_tags: false,
            host_management: false,
            item_management: false,
            trigger_management: false,
            template_management: false,
            event_acknowledgment: false,
        }
    }
}

/// Compute the feature map for a known version.
pub fn features_for(version: &VersionInfo) -> VersionFeatures {
    VersionFeatures {
        problem_get: version.major >= 4,
        sla_get: version.major >= 5,
        authentication_endpoint: version.major >= 7,
        connector_endpoint: version.major >= 6,
        proxygroup_endpoint: version.major >= 7,
        select_tags: version.major >= 4,
        select_dependencies: version.major >= 4,
        select_preprocessing: version.major >= 4,
        template_select_tags: version.major >= 5,
        host_management: true,
        item_management: true,
        trigger_management: true,
        template_management: true,
        event_acknowledgment: true,
    }
}

/// Feature map used when version detection has failed outright. Callers
/// fall back to this rather than refusing the call — the coarse
/// management flags are assumed true (every supported Zabbix version has
/// always had basic host/item/trigger/template management and event
/// acknowledgment), while every version-gated endpoint/parameter flag is
/// assumed false since there is no version to threshold against.
pub fn default_features() -> VersionFeatures {
    VersionFeatures {
        host_management: true,
        item_management: true,
        trigger_management: true,
        template_management: true,
        event_acknowledgment: true,
        ..VersionFeatures::default()
    }
}

/// Rewrite `params` in place for `method` given a known server `version`.
/// Unknown methods are returned unmodified.
pub fn adapt_params(method: &str, version: &VersionInfo, params: &mut Value) {
    let Some(obj) = params.as_object_mut() else {
        return;
    };

    match method {
        "host.get" => {
            if version.major < 4 {
                obj.remove("selectTags");
            }
        }
        "item.get" => {
            if version.major < 4 {
                obj.remove("selectTags");
                obj.remove("selectPreprocessing");
            }
        }
        "trigger.get" => {
            if version.major < 4 {
                obj.remove("selectTags");
                obj.remove("selectDependencies");
            }
        }
        "template.get" => {
            if version.major < 5 {
                obj.remove("selectTags");
            }
        }
        "user.get" => {
            if let Some(filter) = obj.get_mut("filter").and_then(|f| f.as_object_mut()) {
                if version.major > 5 {
                    filter.remove("alias");
                } else {
                    filter.remove("username");
                }
                if filter.is_empty() {
                    obj.remove("filter");
                }
            }
        }
        "user.create" => {
            if version.major <= 5 {
                if let Some(username) = obj.remove("username") {
                    obj.insert("alias".to_string(), username);
                }
            }
        }
        _ => {}
    }
}
