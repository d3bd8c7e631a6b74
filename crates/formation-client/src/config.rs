//! Client configuration types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed-interval retry configuration for polled calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts (not retries) before giving up
    pub attempts: u32,

    /// Delay between consecutive attempts
    pub interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfig {
    /// Create the reference configuration: 60 attempts, 1 second apart
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attempts: 60,
            interval: Duration::from_secs(1),
        }
    }

    /// Set the maximum number of attempts
    #[must_use]
    pub const fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Set the delay between attempts
    #[must_use]
    pub const fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Which admin listener a call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminPort {
    /// Application services (eval)
    App,
    /// Instance administration (init, timestamp, cluster config)
    Admin,
    /// Management API (hosts, groups, servers, certificate templates)
    Manage,
}

/// Port numbers of the admin listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminPorts {
    /// Application services port
    #[serde(default = "default_app_port")]
    pub app: u16,

    /// Instance administration port
    #[serde(default = "default_admin_port")]
    pub admin: u16,

    /// Management API port
    #[serde(default = "default_manage_port")]
    pub manage: u16,
}

impl Default for AdminPorts {
    fn default() -> Self {
        Self {
            app: default_app_port(),
            admin: default_admin_port(),
            manage: default_manage_port(),
        }
    }
}

impl AdminPorts {
    /// Resolve a listener to its port number
    #[must_use]
    pub const fn port(&self, port: AdminPort) -> u16 {
        match port {
            AdminPort::App => self.app,
            AdminPort::Admin => self.admin,
            AdminPort::Manage => self.manage,
        }
    }
}

const fn default_app_port() -> u16 {
    8000
}

const fn default_admin_port() -> u16 {
    8001
}

const fn default_manage_port() -> u16 {
    8002
}
