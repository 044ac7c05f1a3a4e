//! Participant provisioning
//!
//! Applies (or deletes) the embedded manifest bundles for a participant via
//! server-side apply, then waits in the background for the participant's
//! deployments to become ready and kicks off data seeding.

mod template;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, DeleteParams, DynamicObject, Patch, PatchParams};
use kube::core::{ApiResource, GroupVersionKind};
use kube::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::ProvisionConfig;
use crate::error::{is_not_found, Error};
use crate::seed::Seeder;

pub use template::render;

/// Connector manifests applied for every participant
const CONNECTOR_BUNDLE: &str = include_str!("../../manifests/connector.yaml");
/// Identity hub manifests applied for every participant
const IDENTITYHUB_BUNDLE: &str = include_str!("../../manifests/identityhub.yaml");

/// A request to provision or deprovision a participant
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDefinition {
    /// Participant name; doubles as its namespace
    pub participant_name: String,
    /// Decentralized identifier for the participant
    pub did: String,
    /// Ingress host used to reach the participant's APIs for seeding
    #[serde(default = "default_ingress_host")]
    pub kubernetes_ingress_host: String,
}

fn default_ingress_host() -> String {
    "localhost".to_string()
}

impl ParticipantDefinition {
    /// Check the required fields are present
    pub fn validate(&self) -> Result<(), Error> {
        if self.participant_name.trim().is_empty() {
            return Err(Error::validation("participantName is required"));
        }
        if self.did.trim().is_empty() {
            return Err(Error::validation("did is required"));
        }
        Ok(())
    }
}

/// Applies and removes participant resources on the cluster.
///
/// Provisioning is asynchronous past the initial apply: the HTTP caller gets
/// the applied resource map immediately while a detached task polls the
/// participant's deployments and seeds data once they are ready.
pub struct Provisioner {
    client: Client,
    seeder: Arc<Seeder>,
    config: ProvisionConfig,
}

impl Provisioner {
    /// Create a provisioner over the given client
    pub fn new(client: Client, seeder: Arc<Seeder>, config: ProvisionConfig) -> Self {
        Self {
            client,
            seeder,
            config,
        }
    }

    /// Apply all manifest bundles for a participant.
    ///
    /// Returns a map of resource name to kind for everything applied.
    pub async fn provision(
        &self,
        definition: &ParticipantDefinition,
    ) -> Result<BTreeMap<String, String>, Error> {
        info!(participant = %definition.participant_name, "Creating participant resources");

        let mut resources = self.apply_bundle(CONNECTOR_BUNDLE, definition).await?;
        resources.extend(self.apply_bundle(IDENTITYHUB_BUNDLE, definition).await?);

        self.spawn_readiness_wait(definition.clone());
        Ok(resources)
    }

    /// Delete all manifest bundle resources for a participant.
    ///
    /// Resources that are already gone are skipped.
    pub async fn deprovision(
        &self,
        definition: &ParticipantDefinition,
    ) -> Result<BTreeMap<String, String>, Error> {
        info!(participant = %definition.participant_name, "Deleting participant resources");

        let mut resources = self.delete_bundle(CONNECTOR_BUNDLE, definition).await?;
        resources.extend(self.delete_bundle(IDENTITYHUB_BUNDLE, definition).await?);
        Ok(resources)
    }

    async fn apply_bundle(
        &self,
        bundle: &str,
        definition: &ParticipantDefinition,
    ) -> Result<BTreeMap<String, String>, Error> {
        let documents =
            template::parse_documents(bundle, &definition.participant_name, &definition.did)?;
        let mut resources = BTreeMap::new();
        for document in documents {
            let (name, kind) = self.apply_document(document).await?;
            resources.insert(name, kind);
        }
        Ok(resources)
    }

    async fn delete_bundle(
        &self,
        bundle: &str,
        definition: &ParticipantDefinition,
    ) -> Result<BTreeMap<String, String>, Error> {
        let documents =
            template::parse_documents(bundle, &definition.participant_name, &definition.did)?;
        let mut resources = BTreeMap::new();
        for document in documents {
            let (name, kind) = self.delete_document(document).await?;
            resources.insert(name, kind);
        }
        Ok(resources)
    }

    /// Build a dynamic API handle plus name and kind for one manifest document
    fn dynamic_api(
        &self,
        value: &serde_json::Value,
    ) -> Result<(Api<DynamicObject>, String, String), Error> {
        let api_version = value["apiVersion"]
            .as_str()
            .ok_or_else(|| Error::template("missing apiVersion"))?;
        let kind = value["kind"]
            .as_str()
            .ok_or_else(|| Error::template("missing kind"))?;
        let name = value["metadata"]["name"]
            .as_str()
            .ok_or_else(|| Error::template("missing metadata.name"))?;
        let namespace = value["metadata"]["namespace"].as_str();

        let (group, version) = match api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", api_version),
        };
        let ar = ApiResource::from_gvk(&GroupVersionKind::gvk(group, version, kind));

        let api = match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        };
        Ok((api, name.to_string(), kind.to_string()))
    }

    /// Server-side apply one manifest document, taking ownership of fields
    async fn apply_document(&self, value: serde_json::Value) -> Result<(String, String), Error> {
        let (api, name, kind) = self.dynamic_api(&value)?;
        let obj: DynamicObject = serde_json::from_value(value)
            .map_err(|e| Error::template(format!("failed to parse manifest: {}", e)))?;

        debug!(kind = %kind, name = %name, "Applying manifest");
        api.patch(
            &name,
            &PatchParams::apply(&self.config.field_manager).force(),
            &Patch::Apply(&obj),
        )
        .await?;
        Ok((name, kind))
    }

    async fn delete_document(&self, value: serde_json::Value) -> Result<(String, String), Error> {
        let (api, name, kind) = self.dynamic_api(&value)?;

        debug!(kind = %kind, name = %name, "Deleting manifest");
        match api.delete(&name, &DeleteParams::default()).await {
            Ok(_) => {}
            Err(err) if is_not_found(&err) => {
                debug!(kind = %kind, name = %name, "Resource already gone");
            }
            Err(err) => return Err(err.into()),
        }
        Ok((name, kind))
    }

    /// Run the readiness check in the background and seed on success
    fn spawn_readiness_wait(&self, definition: ParticipantDefinition) {
        let client = self.client.clone();
        let seeder = Arc::clone(&self.seeder);
        let config = self.config.clone();

        info!(
            participant = %definition.participant_name,
            deployments = ?config.readiness_deployments,
            "Waiting for participant deployments"
        );
        tokio::spawn(async move {
            if let Err(err) = wait_for_deployments(
                &client,
                &definition.participant_name,
                &config.readiness_deployments,
                config.poll_interval,
            )
            .await
            {
                error!(
                    participant = %definition.participant_name,
                    error = %err,
                    "Deployment readiness check failed"
                );
                return;
            }

            info!(participant = %definition.participant_name, "Deployments ready, seeding data");
            seeder.seed_participant(&definition).await;
        });
    }
}

/// Wait for all given deployments concurrently; the first error wins
async fn wait_for_deployments(
    client: &Client,
    namespace: &str,
    deployments: &[String],
    poll_interval: Duration,
) -> Result<(), Error> {
    let waits = deployments.iter().map(|name| {
        let client = client.clone();
        async move {
            wait_for_deployment(&client, namespace, name, poll_interval).await?;
            info!(namespace = %namespace, deployment = %name, "Deployment ready");
            Ok::<(), Error>(())
        }
    });

    for result in join_all(waits).await {
        result?;
    }
    Ok(())
}

/// Poll until the deployment reaches its desired ready-replica count
async fn wait_for_deployment(
    client: &Client,
    namespace: &str,
    name: &str,
    poll_interval: Duration,
) -> Result<(), Error> {
    let api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    loop {
        let deployment = api.get(name).await?;
        let desired = deployment
            .spec
            .as_ref()
            .and_then(|spec| spec.replicas)
            .unwrap_or(1);
        let ready = deployment
            .status
            .as_ref()
            .and_then(|status| status.ready_replicas)
            .unwrap_or(0);
        if ready == desired {
            return Ok(());
        }
        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_requires_name_and_did() {
        let definition = ParticipantDefinition {
            participant_name: "acme".to_string(),
            did: "did:web:acme".to_string(),
            kubernetes_ingress_host: "localhost".to_string(),
        };
        assert!(definition.validate().is_ok());

        let mut missing_name = definition.clone();
        missing_name.participant_name = " ".to_string();
        assert!(missing_name.validate().is_err());

        let mut missing_did = definition;
        missing_did.did = String::new();
        assert!(missing_did.validate().is_err());
    }

    #[test]
    fn definition_defaults_ingress_host() {
        let definition: ParticipantDefinition =
            serde_json::from_str(r#"{"participantName": "acme", "did": "did:web:acme"}"#).unwrap();
        assert_eq!(definition.kubernetes_ingress_host, "localhost");
    }

    #[test]
    fn embedded_bundles_parse_into_valid_documents() {
        for bundle in [CONNECTOR_BUNDLE, IDENTITYHUB_BUNDLE] {
            let documents =
                template::parse_documents(bundle, "acme", "did:web:acme").unwrap();
            assert!(!documents.is_empty());
            for document in &documents {
                assert!(document["apiVersion"].is_string());
                assert!(document["kind"].is_string());
                assert!(document["metadata"]["name"].is_string());
                if document["kind"] != "Namespace" {
                    assert_eq!(document["metadata"]["namespace"], "acme");
                }
            }
        }
    }

    #[test]
    fn connector_bundle_contains_the_critical_workloads() {
        let documents =
            template::parse_documents(CONNECTOR_BUNDLE, "acme", "did:web:acme").unwrap();
        let workloads: Vec<&str> = documents
            .iter()
            .filter(|d| d["kind"] == "Deployment" || d["kind"] == "StatefulSet")
            .filter_map(|d| d["metadata"]["name"].as_str())
            .collect();
        assert!(workloads.contains(&"controlplane"));
        assert!(workloads.contains(&"dataplane"));
        assert!(workloads.contains(&"postgres"));
    }
}
