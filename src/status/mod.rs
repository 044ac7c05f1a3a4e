//! Status aggregation core
//!
//! Derives a single provisioning status per participant from the live state
//! of its namespace: each Deployment and StatefulSet is evaluated into a
//! normalized component status, the components are reduced through a
//! critical/non-critical decision table, and the assembled response is held
//! in a short-lived cache so dashboards polling the API do not hammer the
//! control plane.
//!
//! Data flows one direction: [`StatusChecker`] pulls from the cluster reader,
//! evaluates and reduces, then stores the response in the cache. Nothing in
//! this module mutates cluster state.

mod cache;
mod checker;
mod evaluator;
mod events;
mod models;

pub use cache::StatusCache;
pub use checker::StatusChecker;
pub use evaluator::StatusEvaluator;
pub use models::{
    ComponentStatus, Event, ParticipantStatusResponse, ParticipantSummary, ProvisioningStatus,
    ReplicaStatus,
};
