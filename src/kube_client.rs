//! Cluster read access behind an injectable trait
//!
//! Provides trait-based access to the Kubernetes resources the status engine
//! reads, enabling dependency injection and mocking for tests.

// The generated mock carries no doc comments.
#![cfg_attr(test, allow(missing_docs))]

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Event, Namespace};
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};

use crate::error::Error;

/// Default connection timeout for kube clients (5s is plenty for local API server)
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only capability set over the cluster resources a participant owns.
///
/// This abstracts the Kubernetes API surface the status engine consumes,
/// enabling proper unit testing without a real cluster.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterReader: Send + Sync {
    /// Get one namespace by name
    async fn get_namespace(&self, name: &str) -> Result<Namespace, kube::Error>;

    /// List all namespaces in the cluster
    async fn list_namespaces(&self) -> Result<Vec<Namespace>, kube::Error>;

    /// List all deployments in a namespace
    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>, kube::Error>;

    /// List all statefulsets in a namespace
    async fn list_stateful_sets(&self, namespace: &str) -> Result<Vec<StatefulSet>, kube::Error>;

    /// List all events in a namespace
    async fn list_events(&self, namespace: &str) -> Result<Vec<Event>, kube::Error>;
}

/// [`ClusterReader`] backed by a live `kube::Client`
#[derive(Clone)]
pub struct KubeReader {
    client: Client,
}

impl KubeReader {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterReader for KubeReader {
    async fn get_namespace(&self, name: &str) -> Result<Namespace, kube::Error> {
        Api::<Namespace>::all(self.client.clone()).get(name).await
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, kube::Error> {
        let list = Api::<Namespace>::all(self.client.clone())
            .list(&ListParams::default())
            .await?;
        Ok(list.items)
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>, kube::Error> {
        let list = Api::<Deployment>::namespaced(self.client.clone(), namespace)
            .list(&ListParams::default())
            .await?;
        Ok(list.items)
    }

    async fn list_stateful_sets(&self, namespace: &str) -> Result<Vec<StatefulSet>, kube::Error> {
        let list = Api::<StatefulSet>::namespaced(self.client.clone(), namespace)
            .list(&ListParams::default())
            .await?;
        Ok(list.items)
    }

    async fn list_events(&self, namespace: &str) -> Result<Vec<Event>, kube::Error> {
        let list = Api::<Event>::namespaced(self.client.clone(), namespace)
            .list(&ListParams::default())
            .await?;
        Ok(list.items)
    }
}

/// Create a kube client from an optional kubeconfig path with default timeouts.
///
/// Falls back to inferred config (in-cluster or `~/.kube/config`) when no
/// path is given.
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client, Error> {
    let mut config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .map_err(|e| Error::config(format!("failed to read kubeconfig: {}", e)))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| Error::config(format!("failed to load kubeconfig: {}", e)))?
        }
        None => Config::infer()
            .await
            .map_err(|e| Error::config(format!("failed to infer config: {}", e)))?,
    };
    config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
    config.read_timeout = Some(DEFAULT_READ_TIMEOUT);
    Client::try_from(config).map_err(Error::Kube)
}
