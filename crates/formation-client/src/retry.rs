//! Bounded fixed-interval polling of a single request.

use formation_core::{FormationError, Result};
use tracing::{debug, warn};

use crate::client::AdminClient;
use crate::config::RetryConfig;
use crate::transport::{AdminRequest, AdminResponse};

/// How a polled call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// A response was accepted
    Matched {
        /// The accepted response
        response: AdminResponse,
        /// Attempts made, including the successful one
        attempts: u32,
    },
    /// Every attempt was rejected
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Status of the last response, if any arrived
        last_status: Option<u16>,
    },
}

impl RetryOutcome {
    /// Number of attempts made
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Matched { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// Status of the final response observed
    #[must_use]
    pub const fn last_status(&self) -> Option<u16> {
        match self {
            Self::Matched { response, .. } => Some(response.status),
            Self::Exhausted { last_status, .. } => *last_status,
        }
    }

    /// True if a response was accepted
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    /// The accepted response, or a fatal error naming `operation`
    pub fn into_response(self, operation: &str, expected: u16) -> Result<AdminResponse> {
        match self {
            Self::Matched { response, .. } => Ok(response),
            Self::Exhausted {
                attempts,
                last_status,
            } => Err(FormationError::RetriesExhausted {
                operation: operation.to_string(),
                expected,
                attempts,
                last: last_status,
            }),
        }
    }
}

impl AdminClient {
    /// Send `request` until `accept` approves a response.
    ///
    /// Transport failures count as rejected attempts. Sleeps `retry.interval`
    /// between attempts, never after the last one.
    pub async fn retry_matching<F>(
        &self,
        request: &AdminRequest,
        retry: &RetryConfig,
        mut accept: F,
    ) -> RetryOutcome
    where
        F: FnMut(&AdminResponse) -> bool + Send,
    {
        let mut last_status = None;

        for attempt in 1..=retry.attempts {
            match self.send(request).await {
                Ok(response) if accept(&response) => {
                    debug!(url = %request.url, attempt, status = response.status, "poll matched");
                    return RetryOutcome::Matched {
                        response,
                        attempts: attempt,
                    };
                }
                Ok(response) => {
                    debug!(url = %request.url, attempt, status = response.status, "poll not matched");
                    last_status = Some(response.status);
                }
                Err(e) => {
                    debug!(url = %request.url, attempt, error = %e, "poll failed");
                }
            }

            if attempt < retry.attempts {
                tokio::time::sleep(retry.interval).await;
            }
        }

        warn!(url = %request.url, attempts = retry.attempts, ?last_status, "poll exhausted");
        RetryOutcome::Exhausted {
            attempts: retry.attempts,
            last_status,
        }
    }
}
