//! Main admin API client implementation.

use crate::api::*;
use crate::auth::{authorize, select_challenge};
use crate::config::{AdminPort, AdminPorts, RetryConfig};
use crate::retry::RetryOutcome;
use crate::transport::{AdminRequest, AdminResponse, AdminTransport, ReqwestTransport};
use formation_core::{AdminCredential, FormationError, Result};
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default per-call timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for the database's administrative HTTP interface
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn AdminTransport>,
    credential: AdminCredential,
    ports: AdminPorts,
    secure_hosts: Vec<String>,
}

impl AdminClient {
    /// Create a builder for the given credential
    #[must_use]
    pub fn builder(credential: AdminCredential) -> AdminClientBuilder {
        AdminClientBuilder::new(credential)
    }

    /// Host and group property endpoints
    #[must_use]
    pub fn hosts(&self) -> HostsApi<'_> {
        HostsApi::new(self)
    }

    /// Group endpoints
    #[must_use]
    pub fn groups(&self) -> GroupsApi<'_> {
        GroupsApi::new(self)
    }

    /// Instance initialization endpoints
    #[must_use]
    pub fn instance(&self) -> InstanceApi<'_> {
        InstanceApi::new(self)
    }

    /// Cluster join handshake endpoints
    #[must_use]
    pub fn cluster(&self) -> ClusterApi<'_> {
        ClusterApi::new(self)
    }

    /// Certificate template endpoints
    #[must_use]
    pub fn templates(&self) -> TemplatesApi<'_> {
        TemplatesApi::new(self)
    }

    /// App server property endpoints
    #[must_use]
    pub fn servers(&self) -> ServersApi<'_> {
        ServersApi::new(self)
    }

    /// Server-side evaluation endpoint
    #[must_use]
    pub fn eval(&self) -> EvalApi<'_> {
        EvalApi::new(self)
    }

    /// The credential used for challenged requests
    #[must_use]
    pub fn credential(&self) -> &AdminCredential {
        &self.inner.credential
    }

    /// True if calls to `host` use HTTPS
    #[must_use]
    pub fn is_secure(&self, host: &str) -> bool {
        self.inner
            .secure_hosts
            .iter()
            .any(|h| h.eq_ignore_ascii_case(host))
    }

    /// Build a URL on one of a host's admin listeners.
    ///
    /// Path segments are percent-encoded individually.
    pub fn url(&self, host: &str, port: AdminPort, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let scheme = if self.is_secure(host) { "https" } else { "http" };
        self.url_with_scheme(scheme, host, port, segments, query)
    }

    pub(crate) fn url_with_scheme(
        &self,
        scheme: &str,
        host: &str,
        port: AdminPort,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Url> {
        let base = format!("{scheme}://{host}:{}/", self.inner.ports.port(port));
        let mut url = Url::parse(&base).map_err(|e| FormationError::InvalidUrl(format!("{base}: {e}")))?;

        url.path_segments_mut()
            .map_err(|()| FormationError::InvalidUrl(base.clone()))?
            .pop_if_empty()
            .extend(segments);

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    pub(crate) fn call(&self, request: AdminRequest) -> AdminCall<'_> {
        AdminCall {
            client: self,
            request,
        }
    }

    pub(crate) fn request(
        &self,
        method: Method,
        host: &str,
        port: AdminPort,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<AdminRequest> {
        Ok(AdminRequest::new(method, self.url(host, port, segments, query)?))
    }

    /// Send one request, answering a credential challenge if it is
    /// authenticated.
    pub async fn send(&self, request: &AdminRequest) -> Result<AdminResponse> {
        let transport = &self.inner.transport;
        let response = transport.execute(request, None).await?;

        if !request.authenticated || response.status != 401 {
            return Ok(response);
        }

        let Some(challenge) = select_challenge(&response.challenges) else {
            return Ok(response);
        };

        debug!(url = %request.url, ?challenge, "answering auth challenge");
        let authorization = authorize(
            &challenge,
            &self.inner.credential,
            request.method.as_str(),
            &request.request_uri(),
        );
        transport.execute(request, Some(&authorization)).await
    }
}

/// A request bound to a client, ready to send or poll
pub struct AdminCall<'a> {
    client: &'a AdminClient,
    request: AdminRequest,
}

impl<'a> AdminCall<'a> {
    /// The request that will be sent
    #[must_use]
    pub const fn request(&self) -> &AdminRequest {
        &self.request
    }

    /// Send once
    pub async fn send(self) -> Result<AdminResponse> {
        self.client.send(&self.request).await
    }

    /// Poll until the server answers with `expected`
    pub async fn retry_until(self, expected: u16, retry: &RetryConfig) -> RetryOutcome {
        self.client
            .retry_matching(&self.request, retry, |r| r.status == expected)
            .await
    }

    /// Poll until `accept` approves a response
    pub async fn retry_matching<F>(self, retry: &RetryConfig, accept: F) -> RetryOutcome
    where
        F: FnMut(&AdminResponse) -> bool + Send,
    {
        self.client.retry_matching(&self.request, retry, accept).await
    }
}

/// Builder for configuring an [`AdminClient`]
pub struct AdminClientBuilder {
    credential: AdminCredential,
    timeout: Duration,
    ports: AdminPorts,
    secure_hosts: Vec<String>,
    trusted_pem: Vec<Vec<u8>>,
    transport: Option<Arc<dyn AdminTransport>>,
}

impl AdminClientBuilder {
    /// Create a new builder with the given credential
    #[must_use]
    pub fn new(credential: AdminCredential) -> Self {
        Self {
            credential,
            timeout: DEFAULT_TIMEOUT,
            ports: AdminPorts::default(),
            secure_hosts: Vec::new(),
            trusted_pem: Vec::new(),
            transport: None,
        }
    }

    /// Set the per-call timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the admin listener ports
    #[must_use]
    pub const fn ports(mut self, ports: AdminPorts) -> Self {
        self.ports = ports;
        self
    }

    /// Talk HTTPS to this host
    #[must_use]
    pub fn secure_host(mut self, host: impl Into<String>) -> Self {
        self.secure_hosts.push(host.into());
        self
    }

    /// Trust every certificate in a PEM bundle
    #[must_use]
    pub fn trust_pem(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.trusted_pem.push(pem.into());
        self
    }

    /// Replace the HTTP transport (useful for testing)
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn AdminTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<AdminClient> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.timeout, &self.trusted_pem)?),
        };

        Ok(AdminClient {
            inner: Arc::new(ClientInner {
                transport,
                credential: self.credential,
                ports: self.ports,
                secure_hosts: self.secure_hosts,
            }),
        })
    }
}
