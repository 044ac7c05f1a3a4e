//! Component evaluation and overall-status reduction
//!
//! Pure functions from raw workload state to normalized component statuses,
//! and from a set of named component statuses to one overall
//! [`ProvisioningStatus`]. Nothing here touches the network or the clock.

use std::collections::HashMap;

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};

use super::models::{ComponentStatus, ProvisioningStatus, ReplicaStatus};

/// Evaluates workload resources into component statuses and reduces them
/// into an overall participant status.
///
/// The critical-component list is injected at construction; readiness of
/// every critical component is required for overall READY.
pub struct StatusEvaluator {
    critical_components: Vec<String>,
}

impl StatusEvaluator {
    /// Create an evaluator with the given ordered critical-component list
    pub fn new(critical_components: Vec<String>) -> Self {
        Self {
            critical_components,
        }
    }

    /// Evaluate one Deployment into a component status
    pub fn deployment_status(&self, deployment: &Deployment) -> ComponentStatus {
        let desired = deployment
            .spec
            .as_ref()
            .and_then(|spec| spec.replicas)
            .unwrap_or(1);
        let status = deployment.status.as_ref();
        let current = status.and_then(|s| s.replicas).unwrap_or(0);
        let ready = status.and_then(|s| s.ready_replicas).unwrap_or(0);
        let unavailable = status.and_then(|s| s.unavailable_replicas).unwrap_or(0);

        evaluate_replicas(desired, current, ready, Some(unavailable))
    }

    /// Evaluate one StatefulSet into a component status.
    ///
    /// StatefulSets expose no unavailable-replica count, so the Degraded
    /// rule does not apply to them.
    pub fn stateful_set_status(&self, sts: &StatefulSet) -> ComponentStatus {
        let desired = sts.spec.as_ref().and_then(|spec| spec.replicas).unwrap_or(1);
        let status = sts.status.as_ref();
        let current = status.map(|s| s.replicas).unwrap_or(0);
        let ready = status.and_then(|s| s.ready_replicas).unwrap_or(0);

        evaluate_replicas(desired, current, ready, None)
    }

    /// Reduce a component mapping into an overall status and message.
    ///
    /// Decision table, evaluated in order:
    /// 1. no components at all -> PROVISIONING
    /// 2. all critical ready, everything else ready -> READY
    /// 3. all critical ready, some non-critical not -> DEGRADED
    /// 4. no critical ready -> PROVISIONING
    /// 5. some but not all critical ready -> DEGRADED with a count and the
    ///    first recorded critical-component message
    pub fn overall_status(
        &self,
        components: &HashMap<String, ComponentStatus>,
    ) -> (ProvisioningStatus, String) {
        if components.is_empty() {
            return (
                ProvisioningStatus::Provisioning,
                "No components found, provisioning may be in progress".to_string(),
            );
        }

        let mut critical_not_ready = 0usize;
        let mut messages: Vec<String> = Vec::new();

        for name in &self.critical_components {
            match components.get(name) {
                None => {
                    critical_not_ready += 1;
                    messages.push(format!("Critical component {} not found", name));
                }
                Some(component) if !component.ready => {
                    critical_not_ready += 1;
                    if let Some(message) = &component.message {
                        messages.push(format!("{}: {}", name, message));
                    }
                }
                Some(_) => {}
            }
        }

        let any_non_critical_not_ready = components.iter().any(|(name, component)| {
            !component.ready && !self.critical_components.iter().any(|c| c == name)
        });

        let all_critical_ready = critical_not_ready == 0;

        if all_critical_ready && !any_non_critical_not_ready {
            (
                ProvisioningStatus::Ready,
                "All components are running and ready".to_string(),
            )
        } else if all_critical_ready {
            (
                ProvisioningStatus::Degraded,
                "All critical components ready, but some non-critical components are not ready"
                    .to_string(),
            )
        } else if critical_not_ready == self.critical_components.len() {
            // Nothing critical has come up yet, likely still being created
            (
                ProvisioningStatus::Provisioning,
                "Critical components are not yet ready".to_string(),
            )
        } else {
            let mut message = format!(
                "{} of {} critical components not ready",
                critical_not_ready,
                self.critical_components.len()
            );
            // Only the first recorded issue surfaces
            if let Some(first) = messages.first() {
                message = format!("{}: {}", message, first);
            }
            (ProvisioningStatus::Degraded, message)
        }
    }
}

/// Precedence chain shared by all workload kinds, first match wins.
///
/// Kinds without an unavailable-replica count pass `None` and skip the
/// Degraded rule.
fn evaluate_replicas(
    desired: i32,
    current: i32,
    ready: i32,
    unavailable: Option<i32>,
) -> ComponentStatus {
    let mut status = "Unknown";
    let mut is_ready = false;
    let mut message = None;

    if ready == desired && desired > 0 {
        status = "Running";
        is_ready = true;
    } else if current == 0 {
        status = "Pending";
        message = Some("No pods are running".to_string());
    } else if ready < desired {
        status = "Starting";
        message = Some(format!("{} of {} replicas ready", ready, desired));
    } else if let Some(unavailable) = unavailable.filter(|&u| u > 0) {
        status = "Degraded";
        message = Some(format!("{} replicas unavailable", unavailable));
    }

    ComponentStatus {
        status: status.to_string(),
        ready: is_ready,
        replicas: ReplicaStatus {
            desired,
            current,
            ready,
        },
        message,
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::apps::v1::{
        DeploymentSpec, DeploymentStatus, StatefulSetSpec, StatefulSetStatus,
    };

    use super::*;

    fn evaluator() -> StatusEvaluator {
        StatusEvaluator::new(vec![
            "controlplane".to_string(),
            "dataplane".to_string(),
            "identityhub".to_string(),
            "postgres".to_string(),
        ])
    }

    fn deployment(desired: Option<i32>, current: i32, ready: i32, unavailable: i32) -> Deployment {
        Deployment {
            spec: Some(DeploymentSpec {
                replicas: desired,
                ..Default::default()
            }),
            status: Some(DeploymentStatus {
                replicas: Some(current),
                ready_replicas: Some(ready),
                unavailable_replicas: Some(unavailable),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn stateful_set(desired: Option<i32>, current: i32, ready: i32) -> StatefulSet {
        StatefulSet {
            spec: Some(StatefulSetSpec {
                replicas: desired,
                ..Default::default()
            }),
            status: Some(StatefulSetStatus {
                replicas: current,
                ready_replicas: Some(ready),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn ready_component() -> ComponentStatus {
        ComponentStatus {
            status: "Running".to_string(),
            ready: true,
            replicas: ReplicaStatus {
                desired: 1,
                current: 1,
                ready: 1,
            },
            message: None,
        }
    }

    fn not_ready_component(message: Option<&str>) -> ComponentStatus {
        ComponentStatus {
            status: "Starting".to_string(),
            ready: false,
            replicas: ReplicaStatus {
                desired: 3,
                current: 2,
                ready: 1,
            },
            message: message.map(str::to_string),
        }
    }

    fn all_critical_ready() -> HashMap<String, ComponentStatus> {
        ["controlplane", "dataplane", "identityhub", "postgres"]
            .into_iter()
            .map(|name| (name.to_string(), ready_component()))
            .collect()
    }

    #[test]
    fn all_replicas_ready_is_running() {
        let component = evaluator().deployment_status(&deployment(Some(3), 3, 3, 0));
        assert_eq!(component.status, "Running");
        assert!(component.ready);
        assert_eq!(component.replicas.desired, 3);
        assert!(component.message.is_none());
    }

    #[test]
    fn zero_current_is_pending() {
        let component = evaluator().deployment_status(&deployment(Some(3), 0, 0, 0));
        assert_eq!(component.status, "Pending");
        assert!(!component.ready);
        assert_eq!(component.message.as_deref(), Some("No pods are running"));
    }

    #[test]
    fn partial_readiness_is_starting() {
        let component = evaluator().deployment_status(&deployment(Some(3), 2, 1, 0));
        assert_eq!(component.status, "Starting");
        assert_eq!(component.message.as_deref(), Some("1 of 3 replicas ready"));
    }

    #[test]
    fn unavailable_replicas_degrade_a_deployment() {
        // ready == desired is ruled out first, so Degraded needs ready > desired
        // alongside unavailable pods (rollout overlap).
        let component = evaluator().deployment_status(&deployment(Some(2), 3, 3, 1));
        assert_eq!(component.status, "Degraded");
        assert_eq!(component.message.as_deref(), Some("1 replicas unavailable"));
    }

    #[test]
    fn stateful_set_has_no_degraded_rule() {
        let component = evaluator().stateful_set_status(&stateful_set(Some(2), 3, 3));
        assert_eq!(component.status, "Unknown");
        assert!(!component.ready);
        assert!(component.message.is_none());
    }

    #[test]
    fn desired_defaults_to_one_when_spec_omits_replicas() {
        let component = evaluator().deployment_status(&deployment(None, 1, 1, 0));
        assert_eq!(component.replicas.desired, 1);
        assert_eq!(component.status, "Running");
        assert!(component.ready);
    }

    #[test]
    fn zero_desired_is_never_running() {
        let component = evaluator().deployment_status(&deployment(Some(0), 0, 0, 0));
        assert_eq!(component.status, "Pending");
        assert!(!component.ready);
    }

    #[test]
    fn stateful_set_evaluates_like_a_deployment_otherwise() {
        let component = evaluator().stateful_set_status(&stateful_set(Some(3), 2, 1));
        assert_eq!(component.status, "Starting");
        assert_eq!(component.message.as_deref(), Some("1 of 3 replicas ready"));
    }

    #[test]
    fn empty_mapping_is_provisioning() {
        let (status, message) = evaluator().overall_status(&HashMap::new());
        assert_eq!(status, ProvisioningStatus::Provisioning);
        assert_eq!(message, "No components found, provisioning may be in progress");
    }

    #[test]
    fn all_critical_ready_is_ready() {
        let (status, message) = evaluator().overall_status(&all_critical_ready());
        assert_eq!(status, ProvisioningStatus::Ready);
        assert_eq!(message, "All components are running and ready");
    }

    #[test]
    fn non_critical_failure_degrades() {
        let mut components = all_critical_ready();
        components.insert("dashboard".to_string(), not_ready_component(None));

        let (status, message) = evaluator().overall_status(&components);
        assert_eq!(status, ProvisioningStatus::Degraded);
        assert_eq!(
            message,
            "All critical components ready, but some non-critical components are not ready"
        );
    }

    #[test]
    fn all_critical_missing_is_provisioning() {
        let mut components = HashMap::new();
        components.insert("dashboard".to_string(), ready_component());

        let (status, message) = evaluator().overall_status(&components);
        assert_eq!(status, ProvisioningStatus::Provisioning);
        assert_eq!(message, "Critical components are not yet ready");
    }

    #[test]
    fn one_critical_not_ready_is_degraded_with_count() {
        let mut components = all_critical_ready();
        components.insert(
            "dataplane".to_string(),
            not_ready_component(Some("1 of 3 replicas ready")),
        );

        let (status, message) = evaluator().overall_status(&components);
        assert_eq!(status, ProvisioningStatus::Degraded);
        assert_eq!(
            message,
            "1 of 4 critical components not ready: dataplane: 1 of 3 replicas ready"
        );
    }

    #[test]
    fn first_critical_message_wins() {
        let mut components = all_critical_ready();
        components.insert(
            "controlplane".to_string(),
            not_ready_component(Some("No pods are running")),
        );
        components.insert(
            "postgres".to_string(),
            not_ready_component(Some("1 of 3 replicas ready")),
        );

        // controlplane comes first in the critical list, so its message surfaces.
        let (status, message) = evaluator().overall_status(&components);
        assert_eq!(status, ProvisioningStatus::Degraded);
        assert_eq!(
            message,
            "2 of 4 critical components not ready: controlplane: No pods are running"
        );
    }

    #[test]
    fn missing_critical_component_counts_and_reports() {
        let mut components = all_critical_ready();
        components.remove("postgres");

        let (status, message) = evaluator().overall_status(&components);
        assert_eq!(status, ProvisioningStatus::Degraded);
        assert_eq!(
            message,
            "1 of 4 critical components not ready: Critical component postgres not found"
        );
    }
}
