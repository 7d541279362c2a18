//! Logical parameter bundles for Zabbix API calls.
//!
//! Each caller builds one of a closed set of typed structs describing what
//! it wants (e.g. "hosts in these groups, with tags selected") and hands it
//! to [`crate::client::Client::invoke`]. A [`ParamSpec`] knows how to turn
//! itself into the JSON-RPC `params` object the wire protocol expects; the
//! version adapter (`crate::adapter`) then rewrites that object for the
//! target server's version. Every field is emitted only when set — an
//! absent/default field is omitted from the wire params entirely, matching
//! how the Zabbix API treats missing keys as "don't filter on this".

use serde_json::{Map, Value, json};

/// Capability implemented by every parameter bundle: turn the caller's
/// logical request into the JSON-RPC `params` object.
///
/// Implementations must deep-copy: the returned `Value` never aliases any
/// container the caller passed in, so the caller's original struct (and
/// any `Vec`/`Map` inside it) can be reused for a second call without the
/// adapter's later in-place rewriting leaking back into it.
pub trait ParamSpec {
    /// Build the wire-shape `params` object for a `*.get`-style call.
    fn build_params(&self) -> Value;
}

/// Bundles that also support the bare-ID-array shape Zabbix's `*.delete`
/// methods expect.
pub trait DeleteParamSpec: ParamSpec {
    /// Build the wire-shape `params` array for a `*.delete`-style call.
    fn build_delete_params(&self) -> Value;
}

fn set_if_nonempty_vec(map: &mut Map<String, Value>, key: &str, values: &[String]) {
    if !values.is_empty() {
        map.insert(key.to_string(), json!(values.to_vec()));
    }
}

fn set_if_nonempty_map(map: &mut Map<String, Value>, key: &str, values: &Map<String, Value>) {
    if !values.is_empty() {
        map.insert(key.to_string(), Value::Object(values.clone()));
    }
}

/// Logical query for `host.get`.
#[derive(Debug, Clone, Default)]
pub struct HostQuery {
    pub host_ids: Vec<String>,
    pub group_ids: Vec<String>,
    pub template_ids: Vec<String>,
    pub with_items: bool,
    pub with_triggers: bool,
    pub monitored: bool,
    pub filter: Map<String, Value>,
    pub search: Map<String, Value>,
    pub select_tags: bool,
    pub select_interfaces: bool,
    pub output: Option<Value>,
    pub limit: Option<u64>,
}

impl ParamSpec for HostQuery {
    fn build_params(&self) -> Value {
        let mut params = Map::new();
        set_if_nonempty_vec(&mut params, "hostids", &self.host_ids);
        set_if_nonempty_vec(&mut params, "groupids", &self.group_ids);
        set_if_nonempty_vec(&mut params, "templateids", &self.template_ids);
        if self.with_items {
            params.insert("with_items".into(), json!(true));
        }
        if self.with_triggers {
            params.insert("with_triggers".into(), json!(true));
        }
        if self.monitored {
            params.insert("monitored_hosts".into(), json!(true));
        }
        set_if_nonempty_map(&mut params, "filter", &self.filter);
        set_if_nonempty_map(&mut params, "search", &self.search);
        if self.select_tags {
            params.insert("selectTags".into(), json!("extend"));
        }
        if self.select_interfaces {
            params.insert("selectInterfaces".into(), json!("extend"));
        }
        if let Some(output) = &self.output {
            params.insert("output".into(), output.clone());
        }
        if let Some(limit) = self.limit {
            params.insert("limit".into(), json!(limit));
        }
        Value::Object(params)
    }
}

impl DeleteParamSpec for HostQuery {
    fn build_delete_params(&self) -> Value {
        json!(self.host_ids.clone())
    }
}

/// Logical query for `item.get`.
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    pub item_ids: Vec<String>,
    pub host_ids: Vec<String>,
    pub group_ids: Vec<String>,
    pub filter: Map<String, Value>,
    pub select_tags: bool,
    pub select_preprocessing: bool,
    pub output: Option<Value>,
    pub limit: Option<u64>,
}

impl ParamSpec for ItemQuery {
    fn build_params(&self) -> Value {
        let mut params = Map::new();
        set_if_nonempty_vec(&mut params, "itemids", &self.item_ids);
        set_if_nonempty_vec(&mut params, "hostids", &self.host_ids);
        set_if_nonempty_vec(&mut params, "groupids", &self.group_ids);
        set_if_nonempty_map(&mut params, "filter", &self.filter);
        if self.select_tags {
            params.insert("selectTags".into(), json!("extend"));
        }
        if self.select_preprocessing {
            params.insert("selectPreprocessing".into(), json!("extend"));
        }
        if let Some(output) = &self.output {
            params.insert("output".into(), output.clone());
        }
        if let Some(limit) = self.limit {
            params.insert("limit".into(), json!(limit));
        }
        Value::Object(params)
    }
}

/// Logical query for `trigger.get`.
#[derive(Debug, Clone, Default)]
pub struct TriggerQuery {
    pub trigger_ids: Vec<String>,
    pub host_ids: Vec<String>,
    pub select_tags: bool,
    pub select_dependencies: bool,
    pub output: Option<Value>,
    pub limit: Option<u64>,
}

impl ParamSpec for TriggerQuery {
    fn build_params(&self) -> Value {
        let mut params = Map::new();
        set_if_nonempty_vec(&mut params, "triggerids", &self.trigger_ids);
        set_if_nonempty_vec(&mut params, "hostids", &self.host_ids);
        if self.select_tags {
            params.insert("selectTags".into(), json!("extend"));
        }
        if self.select_dependencies {
            params.insert("selectDependencies".into(), json!("extend"));
        }
        if let Some(output) = &self.output {
            params.insert("output".into(), output.clone());
        }
        if let Some(limit) = self.limit {
            params.insert("limit".into(), json!(limit));
        }
        Value::Object(params)
    }
}

/// Logical query for `template.get`.
#[derive(Debug, Clone, Default)]
pub struct TemplateQuery {
    pub template_ids: Vec<String>,
    pub group_ids: Vec<String>,
    pub select_tags: bool,
    pub output: Option<Value>,
}

impl ParamSpec for TemplateQuery {
    fn build_params(&self) -> Value {
        let mut params = Map::new();
        set_if_nonempty_vec(&mut params, "templateids", &self.template_ids);
        set_if_nonempty_vec(&mut params, "groupids", &self.group_ids);
        if self.select_tags {
            params.insert("selectTags".into(), json!("extend"));
        }
        if let Some(output) = &self.output {
            params.insert("output".into(), output.clone());
        }
        Value::Object(params)
    }
}

/// Logical query for `user.get`. `alias` and `username` are kept distinct
/// (rather than collapsed into one field) because the version adapter
/// needs to know which spelling the caller actually asked for.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub user_ids: Vec<String>,
    pub alias: Option<String>,
    pub username: Option<String>,
    pub filter: Map<String, Value>,
    pub output: Option<Value>,
}

impl ParamSpec for UserQuery {
    fn build_params(&self) -> Value {
        let mut params = Map::new();
        set_if_nonempty_vec(&mut params, "userids", &self.user_ids);

        let mut filter = self.filter.clone();
        if let Some(alias) = &self.alias {
            filter.insert("alias".into(), json!(alias));
        }
        if let Some(username) = &self.username {
            filter.insert("username".into(), json!(username));
        }
        if !filter.is_empty() {
            params.insert("filter".into(), Value::Object(filter));
        }

        if let Some(output) = &self.output {
            params.insert("output".into(), output.clone());
        }
        Value::Object(params)
    }
}

impl DeleteParamSpec for UserQuery {
    fn build_delete_params(&self) -> Value {
        json!(self.user_ids.clone())
    }
}

/// Logical bundle for `user.create`/`user.update`.
#[derive(Debug, Clone, Default)]
pub struct UserMutate {
    pub username: String,
    pub passwd: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub usrgrps: Vec<String>,
    pub roleid: Option<String>,
}

impl ParamSpec for UserMutate {
    fn build_params(&self) -> Value {
        let mut params = Map::new();
        params.insert("username".into(), json!(self.username));
        if let Some(passwd) = &self.passwd {
            params.insert("passwd".into(), json!(passwd));
        }
        if let Some(name) = &self.name {
            params.insert("name".into(), json!(name));
        }
        if let Some(surname) = &self.surname {
            params.insert("surname".into(), json!(surname));
        }
        if !self.usrgrps.is_empty() {
            let groups: Vec<Value> = self
                .usrgrps
                .iter()
                .map(|id| json!({ "usrgrpid": id }))
                .collect();
            params.insert("usrgrps".into(), Value::Array(groups));
        }
        if let Some(roleid) = &self.roleid {
            params.insert("roleid".into(), json!(roleid));
        }
        Value::Object(params)
    }
}

/// Logical bundle for `usergroup.create`/`usergroup.update`.
///
/// `hostgroup_rights` reshapes a caller-supplied `(permission, group id)`
/// list into the `[{permission, id}]` record form Zabbix expects. This is
/// a deliberately deterministic replacement for the original Go source's
/// `rights` field (which derived its single entry from non-deterministic
/// Go map iteration order) — see the design notes for why that behavior
/// was not carried forward.
#[derive(Debug, Clone, Default)]
pub struct UserGroupMutate {
    pub name: String,
    pub users: Vec<String>,
    pub hostgroup_rights: Vec<(String, String)>,
    pub tag_filters: Vec<(String, String)>,
    pub status: Option<String>,
    pub group_ids: Vec<String>,
}

impl ParamSpec for UserGroupMutate {
    fn build_params(&self) -> Value {
        let mut params = Map::new();
        if !self.name.is_empty() {
            params.insert("name".into(), json!(self.name));
        }
        if !self.users.is_empty() {
            let users: Vec<Value> = self
                .users
                .iter()
                .filter(|id| !id.is_empty())
                .map(|id| json!({ "userid": id }))
                .collect();
            if !users.is_empty() {
                params.insert("userids".into(), Value::Array(users));
            }
        }
        if !self.hostgroup_rights.is_empty() {
            let rights: Vec<Value> = self
                .hostgroup_rights
                .iter()
                .map(|(permission, id)| json!({ "permission": permission, "id": id }))
                .collect();
            params.insert("hostgroup_rights".into(), Value::Array(rights));
        }
        if !self.tag_filters.is_empty() {
            let filters: Vec<Value> = self
                .tag_filters
                .iter()
                .map(|(tag, value)| json!({ "tag": tag, "value": value }))
                .collect();
            params.insert("tag_filters".into(), Value::Array(filters));
        }
        if let Some(status) = &self.status {
            params.insert("status".into(), json!(status));
        }
        Value::Object(params)
    }
}

impl DeleteParamSpec for UserGroupMutate {
    fn build_delete_params(&self) -> Value {
        json!(self.group_ids.clone())
    }
}

/// A generic, untyped bundle for methods that don't warrant their own
/// struct. The map is deep-copied on every `build_params` call.
#[derive(Debug, Clone, Default)]
pub struct GenericParams(pub Map<String, Value>);

impl ParamSpec for GenericParams {
    fn build_params(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_query_omits_unset_fields() {
        let q = HostQuery::default();
        assert_eq!(q.build_params(), json!({}));
    }

    #[test]
    fn host_query_build_params_does_not_alias_caller_state() {
        let mut q = HostQuery {
            host_ids: vec!["10084".into()],
            ..Default::default()
        };
        let first = q.build_params();
        q.host_ids.push("10085".into());
        let second = q.build_params();
        assert_eq!(first["hostids"], json!(["10084"]));
        assert_eq!(second["hostids"], json!(["10084", "10085"]));
    }

    #[test]
    fn user_query_sets_both_alias_and_username_when_both_present() {
        let q = UserQuery {
            alias: Some("alice".into()),
            username: Some("alice".into()),
            ..Default::default()
        };
        let params = q.build_params();
        assert_eq!(params["filter"]["alias"], json!("alice"));
        assert_eq!(params["filter"]["username"], json!("alice"));
    }

    #[test]
    fn user_group_mutate_reshapes_hostgroup_rights_deterministically() {
        let g = UserGroupMutate {
            name: "Admins".into(),
            hostgroup_rights: vec![("3".into(), "10".into()), ("2".into(), "11".into())],
            ..Default::default()
        };
        let params = g.build_params();
        assert_eq!(
            params["hostgroup_rights"],
            json!([{"permission": "3", "id": "10"}, {"permission": "2", "id": "11"}])
        );
    }

    #[test]
    fn user_group_mutate_reshapes_users_and_tag_filters() {
        let g = UserGroupMutate {
            users: vec!["5".into(), "".into(), "6".into()],
            tag_filters: vec![("env".into(), "prod".into())],
            ..Default::default()
        };
        let params = g.build_params();
        assert_eq!(params["userids"], json!([{"userid": "5"}, {"userid": "6"}]));
        assert_eq!(params["tag_filters"], json!([{"tag": "env", "value": "prod"}]));
    }

    #[test]
    fn host_query_delete_params_is_bare_id_array() {
        let q = HostQuery {
            host_ids: vec!["1".into(), "2".into()],
            ..Default::default()
        };
        assert_eq!(q.build_delete_params(), json!(["1", "2"]));
    }

    #[test]
    fn user_query_delete_params_is_bare_id_array() {
        let q = UserQuery {
            user_ids: vec!["3".into()],
            ..Default::default()
        };
        assert_eq!(q.build_delete_params(), json!(["3"]));
    }

    #[test]
    fn generic_params_deep_copies() {
        let mut map = Map::new();
        map.insert("foo".into(), json!("bar"));
        let g = GenericParams(map);
        let first = g.build_params();
        assert_eq!(first["foo"], json!("bar"));
    }
}
