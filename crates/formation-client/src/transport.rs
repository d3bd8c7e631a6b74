//! The HTTP seam: requests, responses and the transport that carries them.

use async_trait::async_trait;
use formation_core::{FormationError, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{Client as HttpClient, Method};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Body of an admin request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// No body
    Empty,
    /// JSON document
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded` fields
    Form(Vec<(String, String)>),
    /// Raw bytes with an explicit content type
    Binary {
        /// MIME type sent as `Content-Type`
        content_type: String,
        /// Payload
        data: Vec<u8>,
    },
}

/// A fully-addressed admin request
#[derive(Debug, Clone)]
pub struct AdminRequest {
    /// HTTP method
    pub method: Method,
    /// Target URL
    pub url: Url,
    /// Request body
    pub body: RequestBody,
    /// Negotiate credentials if the server challenges
    pub authenticated: bool,
    /// Optional `Accept` header
    pub accept: Option<&'static str>,
}

impl AdminRequest {
    /// Create a request with no body
    #[must_use]
    pub const fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            body: RequestBody::Empty,
            authenticated: false,
            accept: None,
        }
    }

    /// Attach a body
    #[must_use]
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Mark the request as requiring the admin credential
    #[must_use]
    pub const fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }

    /// Set the `Accept` header
    #[must_use]
    pub const fn accept(mut self, mime: &'static str) -> Self {
        self.accept = Some(mime);
        self
    }

    /// True for methods that change server state
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        self.method != Method::GET && self.method != Method::HEAD && self.method != Method::OPTIONS
    }

    /// Request target as it appears in the request line (path and query)
    #[must_use]
    pub fn request_uri(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{query}", self.url.path()),
            None => self.url.path().to_string(),
        }
    }
}

/// Credentials attached to a request
#[derive(Clone, PartialEq, Eq)]
pub enum Authorization {
    /// HTTP Basic
    Basic {
        /// Username
        username: String,
        /// Password
        password: String,
    },
    /// A precomputed `Authorization` header value
    Header(String),
}

impl std::fmt::Debug for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => write!(f, "Basic({username})"),
            Self::Header(_) => write!(f, "Header(<redacted>)"),
        }
    }
}

/// What came back from the admin API
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminResponse {
    /// HTTP status code
    pub status: u16,
    /// `WWW-Authenticate` challenges, in header order
    pub challenges: Vec<String>,
    /// Raw body
    pub body: Vec<u8>,
}

impl AdminResponse {
    /// Response with a status and no body
    #[must_use]
    pub const fn status(status: u16) -> Self {
        Self {
            status,
            challenges: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Response with a status and a body
    #[must_use]
    pub fn with_body(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            challenges: Vec::new(),
            body: body.into(),
        }
    }

    /// Body decoded as UTF-8, lossily
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Body parsed as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(FormationError::Json)
    }

    /// True for any 2xx status
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Carries admin requests to a server.
///
/// Implementations report every HTTP status as `Ok`; only failures to get
/// a response at all are errors.
#[async_trait]
pub trait AdminTransport: Send + Sync {
    /// Execute one request with optional credentials
    async fn execute(
        &self,
        request: &AdminRequest,
        authorization: Option<&Authorization>,
    ) -> Result<AdminResponse>;
}

/// Production transport built on `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: HttpClient,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build a transport with a per-call timeout and extra trusted roots.
    ///
    /// `trusted_pem` holds PEM bundles; every certificate in them is added
    /// to the built-in roots.
    pub fn new(timeout: Duration, trusted_pem: &[Vec<u8>]) -> Result<Self> {
        let mut builder = HttpClient::builder()
            .timeout(timeout)
            .user_agent(format!("formation/{}", env!("CARGO_PKG_VERSION")));

        for bundle in trusted_pem {
            let blocks = pem::parse_many(bundle)
                .map_err(|e| FormationError::Certificate(e.to_string()))?;
            for block in blocks.iter().filter(|b| b.tag() == "CERTIFICATE") {
                let cert = reqwest::Certificate::from_der(block.contents())
                    .map_err(|e| FormationError::Certificate(e.to_string()))?;
                builder = builder.add_root_certificate(cert);
            }
        }

        let http = builder
            .build()
            .map_err(|e| FormationError::Http(e.to_string()))?;

        Ok(Self { http, timeout })
    }

    fn map_error(&self, err: &reqwest::Error) -> FormationError {
        if err.is_timeout() {
            FormationError::Timeout(self.timeout.as_secs())
        } else if err.is_connect() {
            FormationError::Connection(err.to_string())
        } else {
            FormationError::Http(err.to_string())
        }
    }
}

#[async_trait]
impl AdminTransport for ReqwestTransport {
    async fn execute(
        &self,
        request: &AdminRequest,
        authorization: Option<&Authorization>,
    ) -> Result<AdminResponse> {
        debug!(method = %request.method, url = %request.url, "admin request");

        let mut builder = self.http.request(request.method.clone(), request.url.clone());

        if let Some(accept) = request.accept {
            builder = builder.header(ACCEPT, accept);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Binary { content_type, data } => builder
                .header(CONTENT_TYPE, content_type.as_str())
                .body(data.clone()),
        };

        builder = match authorization {
            Some(Authorization::Basic { username, password }) => {
                builder.basic_auth(username, Some(password))
            }
            Some(Authorization::Header(value)) => builder.header(AUTHORIZATION, value.as_str()),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| self.map_error(&e))?;
        let status = response.status().as_u16();
        let challenges = response
            .headers()
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(String::from)
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_error(&e))?
            .to_vec();

        debug!(status, bytes = body.len(), "admin response");

        Ok(AdminResponse {
            status,
            challenges,
            body,
        })
    }
}
