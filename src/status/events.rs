//! Recent-event collection for participant namespaces

use std::time::Duration;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Event as CoreEvent;

use crate::kube_client::ClusterReader;

use super::models::Event;

/// Collect recent events for a participant's namespace.
///
/// Keeps events whose last timestamp falls within `window` of now, most
/// recent first, truncated to `limit`. Failure here is not fatal to a status
/// response; the caller substitutes an empty list.
pub async fn recent_events(
    reader: &dyn ClusterReader,
    namespace: &str,
    window: Duration,
    limit: usize,
) -> Result<Vec<Event>, kube::Error> {
    let raw = reader.list_events(namespace).await?;
    let cutoff = Utc::now() - chrono::Duration::seconds(window.as_secs() as i64);
    Ok(collect_recent(raw, cutoff, limit))
}

/// Window, sort and truncate raw events.
///
/// Events without a last timestamp cannot be placed in the window and are
/// dropped.
fn collect_recent(raw: Vec<CoreEvent>, cutoff: DateTime<Utc>, limit: usize) -> Vec<Event> {
    let mut events: Vec<Event> = raw
        .into_iter()
        .filter_map(|event| {
            let timestamp = event.last_timestamp.map(|t| t.0)?;
            if timestamp <= cutoff {
                return None;
            }
            Some(Event {
                timestamp,
                type_: event.type_.unwrap_or_default(),
                message: event.message.unwrap_or_default(),
            })
        })
        .collect();

    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    events.truncate(limit);
    events
}
