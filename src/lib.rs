//! Dataspace participant provisioner
//!
//! Provisions dataspace participants onto a Kubernetes cluster and answers
//! "what is the current health of this participant?" by aggregating live
//! Deployment and StatefulSet state into a single provisioning status.
//!
//! # Architecture
//!
//! Each participant lives in its own namespace. Provisioning applies a set of
//! templated manifests into that namespace; status checking reads the
//! namespace's workloads back and reduces them into one
//! [`status::ProvisioningStatus`], shielding the API server behind a
//! short-lived in-memory cache.
//!
//! # Modules
//!
//! - [`status`] - Status aggregation core (cache, evaluator, checker)
//! - [`kube_client`] - Cluster read access behind an injectable trait
//! - [`provision`] - Manifest templating and server-side apply
//! - [`seed`] - Post-provisioning data seeding clients
//! - [`server`] - HTTP API surface
//! - [`config`] - Configuration injected at construction
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod kube_client;
pub mod provision;
pub mod seed;
pub mod server;
pub mod status;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
