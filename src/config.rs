//! Configuration injected at construction
//!
//! The critical-component list and the reserved-namespace list are explicit
//! configuration rather than process-wide literals so the reducer and the
//! namespace filter stay testable in isolation.

use std::time::Duration;

/// Configuration for the status engine
#[derive(Clone, Debug)]
pub struct StatusConfig {
    /// Components whose readiness is required for overall READY status,
    /// in precedence order for surfaced messages
    pub critical_components: Vec<String>,
    /// Namespaces that can never belong to a participant
    pub reserved_namespaces: Vec<String>,
    /// How long a cached status response stays servable
    pub cache_ttl: Duration,
    /// Interval between background sweeps of expired cache entries
    pub reap_interval: Duration,
    /// Upper bound on a single status or listing operation
    pub request_timeout: Duration,
    /// Only events newer than this are reported
    pub event_window: Duration,
    /// Maximum number of events attached to a status response
    pub event_limit: usize,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            critical_components: vec![
                "controlplane".to_string(),
                "dataplane".to_string(),
                "identityhub".to_string(),
                "postgres".to_string(),
            ],
            reserved_namespaces: vec![
                "kube-system".to_string(),
                "kube-public".to_string(),
                "kube-node-lease".to_string(),
                "default".to_string(),
            ],
            cache_ttl: Duration::from_secs(10),
            reap_interval: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
            event_window: Duration::from_secs(30 * 60),
            event_limit: 10,
        }
    }
}

impl StatusConfig {
    /// Whether the named component is on the critical list
    pub fn is_critical(&self, name: &str) -> bool {
        self.critical_components.iter().any(|c| c == name)
    }

    /// Whether the namespace is reserved for cluster infrastructure
    pub fn is_reserved_namespace(&self, name: &str) -> bool {
        self.reserved_namespaces.iter().any(|ns| ns == name)
    }
}

/// Configuration for the provisioning surface
#[derive(Clone, Debug)]
pub struct ProvisionConfig {
    /// Field manager recorded on server-side applied resources
    pub field_manager: String,
    /// Interval between readiness polls after provisioning
    pub poll_interval: Duration,
    /// Deployments that must become ready before seeding starts
    pub readiness_deployments: Vec<String>,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            field_manager: "dataspace-provisioner".to_string(),
            poll_interval: Duration::from_secs(2),
            readiness_deployments: vec![
                "controlplane".to_string(),
                "identityhub".to_string(),
                "dataplane".to_string(),
            ],
        }
    }
}

/// Configuration for post-provisioning data seeding
#[derive(Clone, Debug)]
pub struct SeedConfig {
    /// API key for the identity API (base64 composite key)
    pub identity_api_key: String,
    /// API key for the management API
    pub management_api_key: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            identity_api_key: "c3VwZXItdXNlcg==.c3VwZXItc2VjcmV0LWtleQo=".to_string(),
            management_api_key: "password".to_string(),
        }
    }
}
