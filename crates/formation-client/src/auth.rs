//! Credential negotiation for challenged requests.
//!
//! Mirrors "any-auth" behavior: a request is first sent bare, and the
//! server's `WWW-Authenticate` challenge decides between Digest and Basic.

use formation_core::AdminCredential;
use md5::{Digest, Md5};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::transport::Authorization;

static CNONCE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A parsed `WWW-Authenticate` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Challenge {
    Digest(DigestChallenge),
    Basic,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub qop: Option<String>,
    pub algorithm: Option<String>,
}

/// Pick the strongest scheme offered across all challenge headers
pub(crate) fn select_challenge(headers: &[String]) -> Option<Challenge> {
    let mut basic = false;
    for header in headers {
        let header = header.trim();
        let (scheme, params) = header.split_once(' ').unwrap_or((header, ""));
        if scheme.eq_ignore_ascii_case("digest") {
            return Some(Challenge::Digest(DigestChallenge::parse(params)));
        }
        if scheme.eq_ignore_ascii_case("basic") {
            basic = true;
        }
    }
    basic.then_some(Challenge::Basic)
}

/// Answer a challenge for one request
pub(crate) fn authorize(
    challenge: &Challenge,
    credential: &AdminCredential,
    method: &str,
    uri: &str,
) -> Authorization {
    match challenge {
        Challenge::Basic => Authorization::Basic {
            username: credential.username().to_string(),
            password: credential.password().to_string(),
        },
        Challenge::Digest(digest) => {
            let cnonce = fresh_cnonce(&digest.nonce);
            Authorization::Header(digest.respond(credential, method, uri, &cnonce, 1))
        }
    }
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

fn fresh_cnonce(nonce: &str) -> String {
    let count = CNONCE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let now = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    md5_hex(&format!("{nonce}:{now}:{count}"))[..16].to_string()
}

impl DigestChallenge {
    /// Parse the comma-separated `key=value` list after the scheme name
    pub fn parse(params: &str) -> Self {
        let mut challenge = Self::default();
        for (key, value) in split_params(params) {
            match key.to_ascii_lowercase().as_str() {
                "realm" => challenge.realm = value,
                "nonce" => challenge.nonce = value,
                "opaque" => challenge.opaque = Some(value),
                "qop" => challenge.qop = Some(value),
                "algorithm" => challenge.algorithm = Some(value),
                _ => {}
            }
        }
        challenge
    }

    fn offers_auth_qop(&self) -> bool {
        self.qop
            .as_deref()
            .is_some_and(|q| q.split(',').any(|v| v.trim().eq_ignore_ascii_case("auth")))
    }

    /// Build the `Authorization` header value (RFC 2617, MD5 / MD5-sess)
    pub fn respond(
        &self,
        credential: &AdminCredential,
        method: &str,
        uri: &str,
        cnonce: &str,
        nc: u32,
    ) -> String {
        let sess = self
            .algorithm
            .as_deref()
            .is_some_and(|a| a.eq_ignore_ascii_case("md5-sess"));

        let mut ha1 = md5_hex(&format!(
            "{}:{}:{}",
            credential.username(),
            self.realm,
            credential.password()
        ));
        if sess {
            ha1 = md5_hex(&format!("{ha1}:{}:{cnonce}", self.nonce));
        }
        let ha2 = md5_hex(&format!("{method}:{uri}"));
        let nc = format!("{nc:08x}");

        let qop = self.offers_auth_qop();
        let response = if qop {
            md5_hex(&format!("{ha1}:{}:{nc}:{cnonce}:auth:{ha2}", self.nonce))
        } else {
            md5_hex(&format!("{ha1}:{}:{ha2}", self.nonce))
        };

        let mut header = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{uri}\", response=\"{response}\"",
            credential.username(),
            self.realm,
            self.nonce
        );
        if let Some(algorithm) = &self.algorithm {
            header.push_str(&format!(", algorithm={algorithm}"));
        }
        if qop {
            header.push_str(&format!(", qop=auth, nc={nc}, cnonce=\"{cnonce}\""));
        }
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(", opaque=\"{opaque}\""));
        }
        header
    }
}

/// Split `a="x, y", b=z` into pairs, honoring quotes
fn split_params(input: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| *c == ',' || c.is_whitespace()) {
            chars.next();
        }
        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        if key.trim().is_empty() {
            break;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            let mut escaped = false;
            for c in chars.by_ref() {
                match (escaped, c) {
                    (false, '\\') => escaped = true,
                    (false, '"') => break,
                    _ => {
                        value.push(c);
                        escaped = false;
                    }
                }
            }
        } else {
            while let Some(c) = chars.peek() {
                if *c == ',' {
                    break;
                }
                value.push(*c);
                chars.next();
            }
        }
        pairs.push((key.trim().to_string(), value.trim().to_string()));
    }

    pairs
}
