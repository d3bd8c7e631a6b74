use std::fmt;

/// Opaque "last-startup" token reported by a node.
///
/// A node has restarted once this token differs from a previously captured
/// baseline. The token is never interpreted beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RestartEpoch(String);

impl RestartEpoch {
    /// Wrap a raw token; empty tokens are not epochs
    #[must_use]
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    /// Extract the epoch from a timestamp reply.
    ///
    /// A plain-text reply is the token itself. An XML status document
    /// carries it in its `last-startup` element.
    #[must_use]
    pub fn from_response(body: &str) -> Option<Self> {
        let body = body.trim();
        if body.starts_with('<') {
            crate::xml::element_text(body, "last-startup")
                .ok()
                .flatten()
                .and_then(Self::new)
        } else {
            Self::new(body)
        }
    }

    /// The raw token
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if `observed` proves a restart relative to this baseline
    #[must_use]
    pub fn superseded_by(baseline: Option<&Self>, observed: Option<&Self>) -> bool {
        match (baseline, observed) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(before), Some(after)) => before != after,
        }
    }
}

impl fmt::Display for RestartEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
