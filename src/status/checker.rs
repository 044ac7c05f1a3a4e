//! Status orchestration over the cluster reader
//!
//! Composes the cache, evaluator, reducer and event collector into the two
//! operations the API serves: a single participant's status and a filtered,
//! paginated listing of all participants.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::config::StatusConfig;
use crate::error::{is_not_found, Error};
use crate::kube_client::ClusterReader;

use super::cache::StatusCache;
use super::evaluator::StatusEvaluator;
use super::events::recent_events;
use super::models::{
    ComponentStatus, ParticipantStatusResponse, ParticipantSummary, ProvisioningStatus,
};

/// Derives and caches participant status from live cluster state.
///
/// Each request either hits the cache or performs one strictly sequential
/// pass: namespace existence, deletion check, workload listing, reduction,
/// event collection. Two concurrent misses for the same participant may both
/// query the API server; the backing reads are idempotent, so no
/// de-duplication is attempted.
pub struct StatusChecker {
    reader: Arc<dyn ClusterReader>,
    cache: StatusCache,
    evaluator: StatusEvaluator,
    config: StatusConfig,
}

impl StatusChecker {
    /// Create a checker (and its cache reaper) over the given reader
    pub fn new(reader: Arc<dyn ClusterReader>, config: StatusConfig) -> Self {
        let cache = StatusCache::new(config.cache_ttl, config.reap_interval);
        let evaluator = StatusEvaluator::new(config.critical_components.clone());
        Self {
            reader,
            cache,
            evaluator,
            config,
        }
    }

    /// Get the current status of a participant.
    ///
    /// Served from the cache when a fresh entry exists; otherwise derived
    /// from live cluster state and cached, including NOT_FOUND results so
    /// repeated probes for absent participants stay off the API server.
    ///
    /// The backing work is bounded by the configured request timeout; a
    /// caller racing this future against a tighter deadline wins.
    pub async fn get_status(&self, participant: &str) -> Result<ParticipantStatusResponse, Error> {
        if let Some(cached) = self.cache.get(participant).await {
            debug!(participant = %participant, "Status cache hit");
            return Ok(cached);
        }
        debug!(participant = %participant, "Status cache miss");

        match tokio::time::timeout(
            self.config.request_timeout,
            self.fetch_status(participant),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.config.request_timeout)),
        }
    }

    async fn fetch_status(&self, participant: &str) -> Result<ParticipantStatusResponse, Error> {
        let namespace = match self.reader.get_namespace(participant).await {
            Ok(namespace) => namespace,
            Err(err) if is_not_found(&err) => {
                let response = self
                    .empty_response(
                        participant,
                        ProvisioningStatus::NotFound,
                        format!("Namespace {} does not exist", participant),
                    )
                    .await;
                return Ok(response);
            }
            Err(err) => return Err(err.into()),
        };

        if namespace.metadata.deletion_timestamp.is_some() {
            let response = self
                .empty_response(
                    participant,
                    ProvisioningStatus::Deleting,
                    format!("Namespace {} is being deleted", participant),
                )
                .await;
            return Ok(response);
        }

        let components = self.component_statuses(participant).await?;
        let (status, message) = self.evaluator.overall_status(&components);

        // Event retrieval failure degrades to an empty list, never fails
        // the whole response.
        let events = match recent_events(
            self.reader.as_ref(),
            participant,
            self.config.event_window,
            self.config.event_limit,
        )
        .await
        {
            Ok(events) => events,
            Err(err) => {
                warn!(participant = %participant, error = %err, "Failed to list events");
                Vec::new()
            }
        };

        let response = ParticipantStatusResponse {
            participant_name: participant.to_string(),
            status,
            last_updated: Utc::now(),
            components,
            message,
            events,
        };
        self.cache.set(participant, response.clone()).await;
        Ok(response)
    }

    /// Build, cache and return a componentless response (NOT_FOUND, DELETING)
    async fn empty_response(
        &self,
        participant: &str,
        status: ProvisioningStatus,
        message: String,
    ) -> ParticipantStatusResponse {
        let response = ParticipantStatusResponse {
            participant_name: participant.to_string(),
            status,
            last_updated: Utc::now(),
            components: HashMap::new(),
            message,
            events: Vec::new(),
        };
        self.cache.set(participant, response.clone()).await;
        response
    }

    async fn component_statuses(
        &self,
        namespace: &str,
    ) -> Result<HashMap<String, ComponentStatus>, Error> {
        let mut components = HashMap::new();

        for deployment in self.reader.list_deployments(namespace).await? {
            let Some(name) = deployment.metadata.name.clone() else {
                continue;
            };
            components.insert(name, self.evaluator.deployment_status(&deployment));
        }

        for sts in self.reader.list_stateful_sets(namespace).await? {
            let Some(name) = sts.metadata.name.clone() else {
                continue;
            };
            components.insert(name, self.evaluator.stateful_set_status(&sts));
        }

        Ok(components)
    }

    /// List all participants, optionally filtered by exact status string,
    /// paginated with 1-based pages.
    ///
    /// Returns the page items and the total count after filtering. Namespaces
    /// that fail to probe are logged and skipped rather than failing the
    /// whole listing.
    pub async fn list_participants(
        &self,
        status_filter: Option<&str>,
        page: usize,
        limit: usize,
    ) -> Result<(Vec<ParticipantSummary>, usize), Error> {
        match tokio::time::timeout(
            self.config.request_timeout,
            self.enumerate_participants(status_filter, page, limit),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.config.request_timeout)),
        }
    }

    async fn enumerate_participants(
        &self,
        status_filter: Option<&str>,
        page: usize,
        limit: usize,
    ) -> Result<(Vec<ParticipantSummary>, usize), Error> {
        let namespaces = self.reader.list_namespaces().await?;
        let mut participants = Vec::new();

        for namespace in namespaces {
            let Some(name) = namespace.metadata.name else {
                continue;
            };
            if self.config.is_reserved_namespace(&name) {
                continue;
            }

            match self.has_participant_deployments(&name).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    warn!(namespace = %name, error = %err, "Failed to probe namespace, skipping");
                    continue;
                }
            }

            // Full status per namespace, served from the cache when fresh
            let status = match self.get_status(&name).await {
                Ok(status) => status,
                Err(err) => {
                    warn!(namespace = %name, error = %err, "Failed to get status, skipping");
                    continue;
                }
            };

            if let Some(filter) = status_filter {
                if status.status.as_str() != filter {
                    continue;
                }
            }

            participants.push(ParticipantSummary {
                participant_name: name,
                status: status.status,
                last_updated: status.last_updated,
            });
        }

        let total = participants.len();
        let start = page.saturating_sub(1).saturating_mul(limit);
        if start >= total {
            return Ok((Vec::new(), total));
        }
        let end = (start + limit).min(total);
        Ok((participants[start..end].to_vec(), total))
    }

    /// A namespace belongs to a participant when it holds at least one
    /// deployment named after a critical component.
    async fn has_participant_deployments(&self, namespace: &str) -> Result<bool, kube::Error> {
        let deployments = self.reader.list_deployments(namespace).await?;
        Ok(deployments.iter().any(|deployment| {
            deployment
                .metadata
                .name
                .as_deref()
                .is_some_and(|name| self.config.is_critical(name))
        }))
    }

    /// Drop any cached entry for the participant
    pub async fn invalidate(&self, participant: &str) {
        self.cache.invalidate(participant).await;
    }

    /// Drop all cached entries
    pub async fn clear(&self) {
        self.cache.clear().await;
    }

    /// Stop the cache reaper. Call once during shutdown.
    pub fn close(&self) {
        self.cache.stop();
    }
}
