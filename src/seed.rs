//! Post-provisioning data seeding
//!
//! Thin clients over a participant's identity and management APIs plus the
//! routine that loads a freshly provisioned participant with its initial
//! registration, assets, policies and contract definitions. Seeding runs
//! after the readiness wait and is best-effort: failures are logged, never
//! propagated into the provisioning flow.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::SeedConfig;
use crate::error::Error;
use crate::provision::ParticipantDefinition;

const ASSETS: &[&str] = &[
    include_str!("../resources/asset1.json"),
    include_str!("../resources/asset2.json"),
];

const POLICIES: &[&str] = &[
    include_str!("../resources/policy_dataprocessor.json"),
    include_str!("../resources/policy_membership.json"),
    include_str!("../resources/policy_sensitive_data.json"),
];

const CONTRACT_DEFINITIONS: &[&str] = &[
    include_str!("../resources/contractdef_require_membership.json"),
    include_str!("../resources/contractdef_require_sensitive.json"),
];

const PARTICIPANT_TEMPLATE: &str = include_str!("../resources/participant.json");

const SECRET_TEMPLATE: &str = r#"{
    "@context": [
        "https://w3id.org/edc/connector/management/v0.0.1"
    ],
    "@id": "${ID}",
    "value": "${SECRET}"
}"#;

/// Credentials returned when a participant is registered
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantCredentials {
    /// OAuth client id of the participant's STS account
    pub client_id: String,
    /// OAuth client secret of the participant's STS account
    pub client_secret: String,
    /// API key for the participant's identity API
    #[serde(default)]
    pub api_key: String,
}

/// Client for a participant's identity API
pub struct IdentityApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl IdentityApiClient {
    /// Create a client rooted at the given base URL
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Register a participant.
    ///
    /// Returns `None` when the participant already exists.
    pub async fn create_participant(
        &self,
        body: String,
    ) -> Result<Option<ParticipantCredentials>, Error> {
        let response = self
            .http
            .post(format!("{}/participants", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::seed(format!("identity api request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::seed(format!(
                "identity api returned {}",
                response.status()
            )));
        }

        let credentials = response
            .json()
            .await
            .map_err(|e| Error::seed(format!("invalid identity api response: {}", e)))?;
        Ok(Some(credentials))
    }
}

/// Client for a participant's management API
pub struct ManagementApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ManagementApiClient {
    /// Create a client rooted at the given base URL
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn send(&self, path: &str, body: String) -> Result<(), Error> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::seed(format!("management api request failed: {}", e)))?;

        // Conflicts mean the document was seeded on an earlier attempt.
        if response.status() == reqwest::StatusCode::CONFLICT {
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(Error::seed(format!(
                "management api {} returned {}",
                path,
                response.status()
            )));
        }
        Ok(())
    }

    /// Create an asset
    pub async fn create_asset(&self, body: String) -> Result<(), Error> {
        self.send("/assets", body).await
    }

    /// Create a policy definition
    pub async fn create_policy(&self, body: String) -> Result<(), Error> {
        self.send("/policydefinitions", body).await
    }

    /// Create a contract definition
    pub async fn create_contract_definition(&self, body: String) -> Result<(), Error> {
        self.send("/contractdefinitions", body).await
    }

    /// Store a secret in the participant's vault
    pub async fn create_secret(&self, body: String) -> Result<(), Error> {
        self.send("/secrets", body).await
    }
}

/// Seeds a provisioned participant with its initial business data
pub struct Seeder {
    config: SeedConfig,
}

impl Seeder {
    /// Create a seeder with the given credentials
    pub fn new(config: SeedConfig) -> Self {
        Self { config }
    }

    /// Seed everything for a freshly provisioned participant.
    ///
    /// Best-effort: each stage is logged and a failure stops the remaining
    /// stages without surfacing an error to the caller.
    pub async fn seed_participant(&self, definition: &ParticipantDefinition) {
        if let Err(err) = self.seed_connector_data(definition).await {
            warn!(
                participant = %definition.participant_name,
                error = %err,
                "Connector seeding failed"
            );
            return;
        }
        if let Err(err) = self.seed_identity_data(definition).await {
            warn!(
                participant = %definition.participant_name,
                error = %err,
                "Identity hub seeding failed"
            );
        }
    }

    async fn seed_connector_data(&self, definition: &ParticipantDefinition) -> Result<(), Error> {
        let management = ManagementApiClient::new(
            management_base_url(definition),
            self.config.management_api_key.clone(),
        );

        for asset in ASSETS {
            management.create_asset((*asset).to_string()).await?;
        }
        info!(participant = %definition.participant_name, "Assets created");

        for policy in POLICIES {
            management.create_policy((*policy).to_string()).await?;
        }
        info!(participant = %definition.participant_name, "Policies created");

        for contract_definition in CONTRACT_DEFINITIONS {
            management
                .create_contract_definition((*contract_definition).to_string())
                .await?;
        }
        info!(participant = %definition.participant_name, "Contract definitions created");

        Ok(())
    }

    async fn seed_identity_data(&self, definition: &ParticipantDefinition) -> Result<(), Error> {
        let identity = IdentityApiClient::new(
            identity_base_url(definition),
            self.config.identity_api_key.clone(),
        );

        let Some(credentials) = identity
            .create_participant(participant_body(definition))
            .await?
        else {
            info!(participant = %definition.participant_name, "Participant already registered");
            return Ok(());
        };

        let management = ManagementApiClient::new(
            management_base_url(definition),
            self.config.management_api_key.clone(),
        );
        management
            .create_secret(secret_body(&credentials))
            .await?;

        info!(participant = %definition.participant_name, "Participant created");
        Ok(())
    }
}

/// Base URL of the participant's identity API behind the ingress
fn identity_base_url(definition: &ParticipantDefinition) -> String {
    format!(
        "http://{}/{}/cs/api/identity/v1alpha",
        definition.kubernetes_ingress_host, definition.participant_name
    )
}

/// Base URL of the participant's management API behind the ingress
fn management_base_url(definition: &ParticipantDefinition) -> String {
    format!(
        "http://{}/{}/cp/api/management/v3",
        definition.kubernetes_ingress_host, definition.participant_name
    )
}

/// Render the participant registration document
fn participant_body(definition: &ParticipantDefinition) -> String {
    let namespace = &definition.participant_name;
    let identityhub_url = format!("http://identityhub.{}.svc.cluster.local:7082", namespace);
    let controlplane_url = format!("http://controlplane.{}.svc.cluster.local:8082", namespace);

    PARTICIPANT_TEMPLATE
        .replace("${PARTICIPANT_NAME}", namespace)
        .replace("${PARTICIPANT_DID}", &definition.did)
        .replace(
            "${PARTICIPANT_DID_BASE64}",
            &STANDARD.encode(definition.did.as_bytes()),
        )
        .replace("${IH_BASE_URL}", &identityhub_url)
        .replace("${EDC_BASE_URL}", &controlplane_url)
}

/// Render the STS client secret document
fn secret_body(credentials: &ParticipantCredentials) -> String {
    SECRET_TEMPLATE
        .replace("${ID}", &format!("{}-sts-client-secret", credentials.client_id))
        .replace("${SECRET}", &credentials.client_secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition() -> ParticipantDefinition {
        ParticipantDefinition {
            participant_name: "acme".to_string(),
            did: "did:web:acme".to_string(),
            kubernetes_ingress_host: "dataspace.example.com".to_string(),
        }
    }

    #[test]
    fn base_urls_route_through_the_ingress() {
        assert_eq!(
            identity_base_url(&definition()),
            "http://dataspace.example.com/acme/cs/api/identity/v1alpha"
        );
        assert_eq!(
            management_base_url(&definition()),
            "http://dataspace.example.com/acme/cp/api/management/v3"
        );
    }

    #[test]
    fn participant_body_substitutes_all_placeholders() {
        let body = participant_body(&definition());
        assert!(!body.contains("${"));
        assert!(body.contains("did:web:acme"));
        assert!(body.contains(&STANDARD.encode("did:web:acme")));
        assert!(body.contains("http://identityhub.acme.svc.cluster.local:7082"));
        assert!(body.contains("http://controlplane.acme.svc.cluster.local:8082"));

        // The rendered document must stay valid JSON.
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(parsed.is_object());
    }

    #[test]
    fn secret_body_builds_the_sts_secret_id() {
        let credentials = ParticipantCredentials {
            client_id: "acme-client".to_string(),
            client_secret: "s3cret".to_string(),
            api_key: String::new(),
        };

        let body = secret_body(&credentials);
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["@id"], "acme-client-sts-client-secret");
        assert_eq!(parsed["value"], "s3cret");
    }

    #[test]
    fn embedded_seed_documents_are_valid_json() {
        for document in ASSETS.iter().chain(POLICIES).chain(CONTRACT_DEFINITIONS) {
            let parsed: serde_json::Value = serde_json::from_str(document).unwrap();
            assert!(parsed.is_object());
        }
    }
}
