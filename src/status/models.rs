//! Wire-visible status types

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall provisioning status of a participant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProvisioningStatus {
    /// Resources are still being created or nothing critical is ready yet
    Provisioning,
    /// All components are running and ready
    Ready,
    /// Some components are not ready
    Degraded,
    /// Provisioning failed permanently
    Failed,
    /// The participant's namespace is being torn down
    Deleting,
    /// No namespace exists for the participant
    NotFound,
}

impl ProvisioningStatus {
    /// The wire representation of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningStatus::Provisioning => "PROVISIONING",
            ProvisioningStatus::Ready => "READY",
            ProvisioningStatus::Degraded => "DEGRADED",
            ProvisioningStatus::Failed => "FAILED",
            ProvisioningStatus::Deleting => "DELETING",
            ProvisioningStatus::NotFound => "NOT_FOUND",
        }
    }
}

impl fmt::Display for ProvisioningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replica counts for one workload resource
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaStatus {
    /// Replicas the spec asks for (1 when the spec omits a count)
    pub desired: i32,
    /// Replicas currently existing
    pub current: i32,
    /// Replicas passing readiness
    pub ready: i32,
}

/// Normalized status of one named component
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    /// Component state label: Running, Pending, Starting, Degraded or Unknown
    pub status: String,
    /// Whether the component counts as ready for the overall reduction
    pub ready: bool,
    /// Replica counts backing the label
    pub replicas: ReplicaStatus,
    /// Human-readable detail for non-ready states
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A recent Kubernetes event in the participant's namespace
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// When the event last occurred
    pub timestamp: DateTime<Utc>,
    /// Event type label (Normal, Warning)
    #[serde(rename = "type")]
    pub type_: String,
    /// Event message
    pub message: String,
}

/// Full response for a participant status query.
///
/// The unit stored in the cache; created fresh on every non-cached
/// evaluation and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantStatusResponse {
    /// The participant (and namespace) name
    pub participant_name: String,
    /// Reduced overall status
    pub status: ProvisioningStatus,
    /// When this response was assembled
    pub last_updated: DateTime<Utc>,
    /// Per-component status keyed by resource name.
    /// Always empty for NOT_FOUND and DELETING responses.
    pub components: HashMap<String, ComponentStatus>,
    /// Summary message for the overall status
    pub message: String,
    /// Recent events, most recent first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,
}

/// Listing projection of a participant's status
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    /// The participant (and namespace) name
    pub participant_name: String,
    /// Reduced overall status
    pub status: ProvisioningStatus,
    /// When the underlying response was assembled
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&ProvisioningStatus::NotFound).unwrap(),
            "\"NOT_FOUND\""
        );
        assert_eq!(
            serde_json::to_string(&ProvisioningStatus::Provisioning).unwrap(),
            "\"PROVISIONING\""
        );
        assert_eq!(ProvisioningStatus::Ready.as_str(), "READY");
    }

    #[test]
    fn response_uses_camel_case_and_omits_empty_events() {
        let response = ParticipantStatusResponse {
            participant_name: "acme".to_string(),
            status: ProvisioningStatus::NotFound,
            last_updated: Utc::now(),
            components: HashMap::new(),
            message: "Namespace acme does not exist".to_string(),
            events: Vec::new(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["participantName"], "acme");
        assert_eq!(json["status"], "NOT_FOUND");
        assert!(json.get("lastUpdated").is_some());
        assert!(json.get("events").is_none());
    }

    #[test]
    fn component_message_is_optional() {
        let component = ComponentStatus {
            status: "Running".to_string(),
            ready: true,
            replicas: ReplicaStatus {
                desired: 1,
                current: 1,
                ready: 1,
            },
            message: None,
        };

        let json = serde_json::to_value(&component).unwrap();
        assert!(json.get("message").is_none());
        assert_eq!(json["replicas"]["desired"], 1);
    }
}
