//! In-memory admin API for protocol tests.
//!
//! `FakeCluster` holds the state a real cluster would: hosts with restart
//! epochs, membership, groups, certificate templates and server properties.
//! Each node talks to it through its own `NodeTransport`, which resolves
//! `localhost` to that node.

use async_trait::async_trait;
use formation_client::{
    AdminClient, AdminRequest, AdminResponse, AdminTransport, Authorization, Method, RequestBody,
};
use formation_core::{
    AdminCredential, ClusterTopology, ClusterType, FormationError, GroupDescriptor, NodeIdentity, Result,
};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::FormationConfig;

pub(crate) const DIGEST_CHALLENGE: &str = r#"Digest realm="public", qop="auth", nonce="fake-nonce", opaque="fake""#;

/// One request as the fake saw it
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub caller: String,
    pub method: Method,
    pub host: String,
    pub path: String,
    pub status: u16,
    mutating: bool,
}

impl Call {
    /// A state-changing request the server got past authentication
    pub const fn is_mutating(&self) -> bool {
        self.mutating
    }
}

/// Certificate listing is a POST that changes nothing
fn is_read_only(request: &AdminRequest) -> bool {
    matches!(&request.body, RequestBody::Json(body) if body["operation"] == "get-certificates-for-template")
}

#[derive(Debug, Default)]
struct Host {
    epoch: u32,
    /// Timestamp reads left before a triggered restart completes
    restarting: Option<u32>,
    /// Scripted timestamp bodies, served before the real epoch
    scripted: VecDeque<String>,
    initialized: bool,
    licensed: bool,
}

#[derive(Debug, Default)]
struct State {
    hosts: BTreeMap<String, Host>,
    members: BTreeMap<String, String>,
    groups: BTreeMap<String, bool>,
    templates: BTreeSet<String>,
    template_ca: BTreeSet<String>,
    certificates: Vec<(String, String, bool)>,
    servers: BTreeMap<String, serde_json::Value>,
    tls_join: bool,
    overrides: Vec<Override>,
    calls: Vec<Call>,
}

/// Scripted statuses for matching requests, optionally narrowed to one
/// host or to one template `operation`
#[derive(Debug, Default)]
struct Override {
    host: Option<String>,
    operation: Option<String>,
    method: Method,
    path: String,
    statuses: VecDeque<u16>,
}

#[derive(Debug, Default)]
pub(crate) struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Start a node process; it answers on its admin port but is not yet
    /// part of any cluster
    pub fn add_host(&self, fqdn: &str) {
        self.state().hosts.entry(fqdn.to_string()).or_default();
    }

    /// Require TLS for remote callers of secured hosts
    pub fn require_tls(&self) {
        self.state().tls_join = true;
    }

    /// Answer the next `statuses.len()` matching requests with these codes.
    /// A status of 0 refuses the connection instead.
    pub fn respond(&self, method: Method, path: &str, statuses: &[u16]) {
        self.push_override(None, method, path, statuses);
    }

    /// Like [`respond`](Self::respond), for requests addressed to `fqdn` only
    pub fn respond_on(&self, fqdn: &str, method: Method, path: &str, statuses: &[u16]) {
        self.push_override(Some(fqdn.to_string()), method, path, statuses);
    }

    /// Like [`respond`](Self::respond), for template POSTs carrying `operation`
    pub fn respond_to_operation(&self, operation: &str, statuses: &[u16]) {
        self.state().overrides.push(Override {
            operation: Some(operation.to_string()),
            method: Method::POST,
            path: String::new(),
            statuses: statuses.iter().copied().collect(),
            ..Override::default()
        });
    }

    fn push_override(&self, host: Option<String>, method: Method, path: &str, statuses: &[u16]) {
        self.state().overrides.push(Override {
            host,
            method,
            path: path.to_string(),
            statuses: statuses.iter().copied().collect(),
            ..Override::default()
        });
    }

    /// Serve these timestamp bodies for `fqdn` before its real epoch
    pub fn script_timestamps(&self, fqdn: &str, bodies: &[&str]) {
        let mut state = self.state();
        let host = state.hosts.entry(fqdn.to_string()).or_default();
        host.scripted.extend(bodies.iter().map(|b| (*b).to_string()));
    }

    /// Put a host into an initialized single-node cluster state
    pub fn seed_member(&self, fqdn: &str, group: &str) {
        let mut state = self.state();
        let host = state.hosts.entry(fqdn.to_string()).or_default();
        host.initialized = true;
        state.members.insert(fqdn.to_string(), group.to_string());
        state.groups.entry(group.to_string()).or_insert(false);
    }

    pub fn seed_template(&self, name: &str) {
        self.state().templates.insert(name.to_string());
    }

    pub fn seed_certificate(&self, template: &str, host: &str, temporary: bool) {
        self.state()
            .certificates
            .push((template.to_string(), host.to_string(), temporary));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn mutations(&self) -> usize {
        self.state().calls.iter().filter(|c| c.is_mutating()).count()
    }

    pub fn group_of(&self, fqdn: &str) -> Option<String> {
        self.state().members.get(fqdn).cloned()
    }

    pub fn group(&self, name: &str) -> Option<bool> {
        self.state().groups.get(name).copied()
    }

    pub fn epoch(&self, fqdn: &str) -> u32 {
        self.state().hosts.get(fqdn).map_or(0, |h| h.epoch)
    }

    pub fn is_initialized(&self, fqdn: &str) -> bool {
        self.state().hosts.get(fqdn).is_some_and(|h| h.initialized)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.state().templates.contains(name)
    }

    pub fn has_template_ca(&self, name: &str) -> bool {
        self.state().template_ca.contains(name)
    }

    pub fn certificates_for(&self, host: &str) -> Vec<bool> {
        self.state()
            .certificates
            .iter()
            .filter(|(_, h, _)| h == host)
            .map(|(_, _, temporary)| *temporary)
            .collect()
    }

    pub fn server(&self, name: &str) -> Option<serde_json::Value> {
        self.state().servers.get(name).cloned()
    }

    /// Build a client whose requests originate from `fqdn`
    pub fn client(self: &Arc<Self>, fqdn: &str, config: &FormationConfig) -> AdminClient {
        let transport = NodeTransport {
            cluster: Arc::clone(self),
            fqdn: fqdn.to_string(),
        };
        let mut builder = AdminClient::builder(config.credential.clone())
            .ports(config.settings.ports)
            .transport(Arc::new(transport));
        if config.topology.join_tls_enabled && !config.establishes_cluster() {
            builder = builder.secure_host(config.topology.bootstrap_host.clone());
        }
        builder.build().unwrap()
    }
}

/// A node's view of the fake cluster
pub(crate) struct NodeTransport {
    cluster: Arc<FakeCluster>,
    fqdn: String,
}

#[async_trait]
impl AdminTransport for NodeTransport {
    async fn execute(&self, request: &AdminRequest, authorization: Option<&Authorization>) -> Result<AdminResponse> {
        let host = match request.url.host_str() {
            Some("localhost") | None => self.fqdn.clone(),
            Some(host) => host.to_string(),
        };
        let path = request.url.path().to_string();

        let mut state = self.cluster.state();
        let result = route(&mut state, &self.fqdn, &host, request, authorization);

        let status = match &result {
            Ok(response) => response.status,
            Err(_) => 0,
        };
        state.calls.push(Call {
            caller: self.fqdn.clone(),
            method: request.method.clone(),
            host,
            path,
            status,
            mutating: request.is_mutating() && status != 0 && status != 401 && !is_read_only(request),
        });
        result
    }
}

fn refused(host: &str) -> FormationError {
    FormationError::Connection(format!("{host}: connection refused"))
}

fn json_response(status: u16, value: &serde_json::Value) -> AdminResponse {
    AdminResponse::with_body(status, value.to_string())
}

fn json_body<T: serde::de::DeserializeOwned>(request: &AdminRequest) -> Option<T> {
    match &request.body {
        RequestBody::Json(value) => serde_json::from_value(value.clone()).ok(),
        _ => None,
    }
}

fn form_field<'a>(request: &'a AdminRequest, name: &str) -> Option<&'a str> {
    match &request.body {
        RequestBody::Form(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str()),
        _ => None,
    }
}

fn restart(host: &mut Host) {
    host.restarting = Some(2);
}

fn route(
    state: &mut State,
    caller: &str,
    host: &str,
    request: &AdminRequest,
    authorization: Option<&Authorization>,
) -> Result<AdminResponse> {
    let path = request.url.path().to_string();
    let method = request.method.clone();
    let port = request.url.port().unwrap_or(80);

    let Some(target) = state.hosts.get(host) else {
        return Err(refused(host));
    };
    let secured = target.initialized;

    // The management and app listeners only come up once a node is
    // initialized.
    if port != 8001 && !secured {
        return Err(refused(host));
    }

    if let Some(scripted) = state.overrides.iter_mut().find(|o| {
        o.method == method
            && path.ends_with(o.path.as_str())
            && o.host.as_deref().map_or(true, |h| h == host)
            && o.operation.as_deref().map_or(true, |op| {
                json_body::<serde_json::Value>(request).is_some_and(|v| v["operation"] == op)
            })
            && !o.statuses.is_empty()
    }) {
        match scripted.statuses.pop_front() {
            Some(0) => return Err(refused(host)),
            Some(status) => return Ok(AdminResponse::status(status)),
            None => {}
        }
    }

    if secured && state.tls_join && caller != host && request.url.scheme() == "http" {
        return Ok(AdminResponse::status(403));
    }

    let unauthenticated_endpoint = matches!(
        (method.as_str(), path.as_str()),
        ("GET", "/admin/v1/server-config") | ("POST", "/admin/v1/init" | "/admin/v1/instance-admin")
    ) || (method == Method::POST && path == "/admin/v1/cluster-config" && caller == host);

    if secured && !unauthenticated_endpoint {
        let accepted = match authorization {
            Some(Authorization::Header(value)) => value.starts_with("Digest username=\"admin\""),
            Some(Authorization::Basic { username, .. }) => username == "admin",
            None => false,
        };
        if !accepted {
            return Ok(AdminResponse {
                status: 401,
                challenges: vec![DIGEST_CHALLENGE.to_string()],
                body: Vec::new(),
            });
        }
    }

    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let response = match (method.as_str(), port, segments.as_slice()) {
        ("GET", 8001, ["admin", "v1", "timestamp"]) => {
            let Some(target) = state.hosts.get_mut(host) else {
                return Err(refused(host));
            };
            if let Some(body) = target.scripted.pop_front() {
                return Ok(AdminResponse::with_body(200, body));
            }
            if let Some(left) = target.restarting {
                if left <= 1 {
                    target.epoch += 1;
                    target.restarting = None;
                } else {
                    target.restarting = Some(left - 1);
                }
            }
            AdminResponse::with_body(200, format!("2026-10-18T00:00:{:02}Z", target.epoch))
        }
        ("POST", 8001, ["admin", "v1", "init"]) => {
            let Some(target) = state.hosts.get_mut(host) else {
                return Err(refused(host));
            };
            if target.licensed {
                AdminResponse::status(200)
            } else {
                target.licensed = true;
                restart(target);
                AdminResponse::status(202)
            }
        }
        ("POST", 8001, ["admin", "v1", "instance-admin"]) => {
            if secured {
                AdminResponse::status(401)
            } else {
                if let Some(target) = state.hosts.get_mut(host) {
                    target.initialized = true;
                    restart(target);
                }
                state.members.insert(host.to_string(), "Default".to_string());
                state.groups.entry("Default".to_string()).or_insert(false);
                AdminResponse::status(202)
            }
        }
        ("GET", 8001, ["admin", "v1", "server-config"]) => AdminResponse::with_body(
            200,
            format!(r#"<host xmlns="http://marklogic.com/xdmp/clusters"><host-name>{host}</host-name></host>"#),
        ),
        ("POST", 8001, ["admin", "v1", "cluster-config"]) => match &request.body {
            RequestBody::Form(_) => {
                let group = form_field(request, "group").unwrap_or_default();
                let joiner = form_field(request, "server-config")
                    .and_then(|xml| formation_core::xml::element_text(xml, "host-name").ok().flatten());
                match joiner {
                    Some(joiner) if state.groups.contains_key(group) => {
                        AdminResponse::with_body(200, format!("PK:{joiner}:{group}"))
                    }
                    Some(_) => AdminResponse::status(404),
                    None => AdminResponse::status(400),
                }
            }
            RequestBody::Binary { data, .. } => {
                let archive = String::from_utf8_lossy(data).to_string();
                let mut parts = archive.splitn(3, ':');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some("PK"), Some(joiner), Some(group)) if joiner == host => {
                        state.members.insert(host.to_string(), group.to_string());
                        if let Some(target) = state.hosts.get_mut(host) {
                            target.initialized = true;
                            restart(target);
                        }
                        AdminResponse::status(202)
                    }
                    _ => AdminResponse::status(400),
                }
            }
            _ => AdminResponse::status(400),
        },
        ("GET", 8002, ["manage", "v2", "hosts", name, "properties"]) => match state.members.get(*name) {
            Some(group) => AdminResponse::with_body(
                200,
                format!(
                    r#"<host-properties xmlns="http://marklogic.com/manage"><host-name>{name}</host-name><group>{group}</group></host-properties>"#
                ),
            ),
            None => AdminResponse::status(404),
        },
        ("GET", 8002, ["manage", "v2", "groups", name]) => {
            AdminResponse::status(if state.groups.contains_key(*name) { 200 } else { 404 })
        }
        ("GET", 8002, ["manage", "v2", "groups", name, "properties"]) => match state.groups.get(*name) {
            Some(ssl) => json_response(200, &serde_json::json!({ "group-name": name, "xdqp-ssl-enabled": ssl })),
            None => AdminResponse::status(404),
        },
        ("PUT", 8002, ["manage", "v2", "groups", name, "properties"]) => {
            let name = (*name).to_string();
            match (state.groups.get(&name).copied(), json_body::<GroupDescriptor>(request)) {
                (Some(ssl), Some(desired)) => {
                    state.groups.remove(&name);
                    state.groups.insert(desired.name.clone(), desired.xdqp_ssl_enabled);
                    let members: Vec<String> = state
                        .members
                        .iter()
                        .filter(|(_, g)| **g == name)
                        .map(|(h, _)| h.clone())
                        .collect();
                    for member in &members {
                        state.members.insert(member.clone(), desired.name.clone());
                    }
                    if ssl == desired.xdqp_ssl_enabled {
                        AdminResponse::status(204)
                    } else {
                        for member in &members {
                            if let Some(target) = state.hosts.get_mut(member) {
                                restart(target);
                            }
                        }
                        AdminResponse::status(202)
                    }
                }
                (None, _) => AdminResponse::status(404),
                (_, None) => AdminResponse::status(400),
            }
        }
        ("POST", 8002, ["manage", "v2", "groups"]) => match json_body::<GroupDescriptor>(request) {
            Some(desired) if !state.groups.contains_key(&desired.name) => {
                state.groups.insert(desired.name, desired.xdqp_ssl_enabled);
                AdminResponse::status(201)
            }
            Some(_) => AdminResponse::status(400),
            None => AdminResponse::status(400),
        },
        ("GET", 8002, ["manage", "v2", "certificate-templates", name]) => {
            AdminResponse::status(if state.templates.contains(*name) { 200 } else { 404 })
        }
        ("POST", 8002, ["manage", "v2", "certificate-templates"]) => {
            let name = json_body::<serde_json::Value>(request)
                .and_then(|v| v["template-name"].as_str().map(str::to_string));
            match name {
                Some(name) if !state.templates.contains(&name) => {
                    state.templates.insert(name);
                    AdminResponse::status(201)
                }
                _ => AdminResponse::status(400),
            }
        }
        ("POST", 8002, ["manage", "v2", "certificate-templates", name]) => {
            let name = (*name).to_string();
            if !state.templates.contains(&name) {
                return Ok(AdminResponse::status(404));
            }
            let body = json_body::<serde_json::Value>(request).unwrap_or_default();
            match body["operation"].as_str() {
                Some("get-certificates-for-template") => {
                    let certs: String = state
                        .certificates
                        .iter()
                        .filter(|(t, _, _)| *t == name)
                        .map(|(_, h, temporary)| {
                            format!("<certificate><host-name>{h}</host-name><temporary>{temporary}</temporary></certificate>")
                        })
                        .collect();
                    AdminResponse::with_body(
                        200,
                        format!(r#"<certificate-list xmlns="http://marklogic.com/manage">{certs}</certificate-list>"#),
                    )
                }
                Some("insert-host-certificates") => {
                    state.certificates.retain(|(t, h, _)| !(*t == name && h == caller));
                    state.certificates.push((name, caller.to_string(), false));
                    AdminResponse::status(201)
                }
                _ => AdminResponse::status(400),
            }
        }
        ("PUT", 8002, ["manage", "v2", "servers", name, "properties"]) => {
            let value = json_body::<serde_json::Value>(request).unwrap_or_default();
            let entry = state
                .servers
                .entry((*name).to_string())
                .or_insert_with(|| serde_json::json!({}));
            if let (Some(entry), Some(update)) = (entry.as_object_mut(), value.as_object()) {
                for (k, v) in update {
                    entry.insert(k.clone(), v.clone());
                }
            }
            AdminResponse::status(204)
        }
        ("POST", 8000, ["v1", "eval"]) => {
            let module = form_field(request, "xquery").unwrap_or_default().to_string();
            let template = state.templates.iter().next().cloned().unwrap_or_default();
            if module.contains("generate-template-certificate-authority") {
                state.template_ca.insert(template);
            } else if module.contains("generate-temporary-certificate-if-necessary") {
                state.certificates.push((template, caller.to_string(), true));
            }
            AdminResponse::with_body(200, "[]")
        }
        _ => AdminResponse::status(404),
    };

    Ok(response)
}

/// Configuration for `hostname` in a cluster bootstrapped by `dnode-0`
pub(crate) fn node_config(hostname: &str, group: &str, cluster_type: ClusterType) -> FormationConfig {
    let suffix = format!("{group}.db.local");
    let identity = NodeIdentity::derive(hostname, Some(&suffix), cluster_type).unwrap();
    let topology = ClusterTopology::new("dnode-0.dnode.db.local", group, cluster_type);
    let credential = AdminCredential::new("admin", "admin-pw").unwrap();
    FormationConfig::new(identity, topology, credential)
}

pub(crate) const BOOTSTRAP: &str = "dnode-0.dnode.db.local";

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initialized_host_challenges_then_accepts_digest() {
        let cluster = FakeCluster::new();
        cluster.seed_member(BOOTSTRAP, "dnode");
        let config = node_config("dnode-0", "dnode", ClusterType::Bootstrap);
        let client = cluster.client(BOOTSTRAP, &config);

        let response = client.hosts().properties(BOOTSTRAP, BOOTSTRAP).unwrap().send().await.unwrap();
        assert_eq!(response.status, 200);

        let probe = client.hosts().challenge_probe(BOOTSTRAP).unwrap().send().await.unwrap();
        assert_eq!(probe.status, 401);

        let statuses: Vec<u16> = cluster.calls().iter().map(|c| c.status).collect();
        assert_eq!(statuses, vec![401, 200, 401]);
    }

    #[tokio::test]
    async fn test_uninitialized_host_refuses_management_port() {
        let cluster = FakeCluster::new();
        cluster.add_host(BOOTSTRAP);
        let config = node_config("dnode-0", "dnode", ClusterType::Bootstrap);
        let client = cluster.client(BOOTSTRAP, &config);

        let result = client.groups().get(BOOTSTRAP, "dnode").unwrap().send().await;
        assert!(matches!(result, Err(FormationError::Connection(_))));
    }
}
