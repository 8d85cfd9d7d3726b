//! Failure diagnosis for a finished Job
//!
//! Collects the events and the psql log of the most recent pod of a failed
//! job so the CI output shows why it failed. Every step is best effort: an
//! error here is logged and the job failure is still reported by the caller.

use std::fmt;

use tracing::{info, warn};

use crate::controller::api::{ClusterApi, JobPod, PodEvent};
use crate::controller::gateway::ClusterGateway;
use crate::resources::common::CONTAINER_NAME;

/// What is known about the last pod of a failed job
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub pod_name: String,
    pub pod_uid: Option<String>,
    pub events: Vec<PodEvent>,
    /// `None` when the log could not be read
    pub log: Option<String>,
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "\nPod events from {} ({}):\n",
            self.pod_name,
            self.pod_uid.as_deref().unwrap_or("unknown uid")
        )?;
        write!(f, "{}", render_events_table(&self.events))?;
        writeln!(f, "\nPod Logs:\n")?;
        match &self.log {
            Some(log) => write!(f, "{}", log),
            None => write!(f, "<log unavailable>"),
        }
    }
}

/// Pick the pod that started last.
///
/// Pods without a start time sort first. On equal start times the pod listed
/// first wins.
pub fn select_latest_pod(pods: &[JobPod]) -> Option<&JobPod> {
    pods.iter().fold(None, |latest: Option<&JobPod>, pod| match latest {
        Some(current) if pod.start_time <= current.start_time => Some(current),
        _ => Some(pod),
    })
}

/// Render events as a fixed-width table with Reason, EventTime and Message columns
pub fn render_events_table(events: &[PodEvent]) -> String {
    const HEADERS: [&str; 3] = ["Reason", "EventTime", "Message"];

    let rows: Vec<[String; 3]> = events
        .iter()
        .map(|e| {
            [
                e.reason.clone().unwrap_or_default(),
                e.timestamp.map(|t| t.to_rfc3339()).unwrap_or_default(),
                e.message.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: [&str; 3]| {
        let line = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join(" | ");
        out.push_str(line.trim_end());
        out.push('\n');
    };

    push_row(HEADERS);
    push_row(widths.map(|w| "-".repeat(w)).each_ref().map(String::as_str));
    for row in &rows {
        push_row(row.each_ref().map(String::as_str));
    }
    out
}

/// Gather diagnostics for a failed job.
///
/// Returns `None` when the job has no pods or the latest pod has no name.
pub async fn diagnose<A: ClusterApi>(
    gateway: &ClusterGateway<A>,
    namespace: &str,
    job_name: &str,
) -> Option<DiagnosticRecord> {
    let pods = match gateway.list_pods_for_job(namespace, job_name).await {
        Ok(pods) => pods,
        Err(e) => {
            warn!(job = %job_name, error = %e, "Failed to list pods for diagnosis");
            return None;
        }
    };

    let Some(pod) = select_latest_pod(&pods) else {
        info!(job = %job_name, "No pods found for job, skipping diagnosis");
        return None;
    };

    let Some(pod_name) = pod.name.clone() else {
        warn!(job = %job_name, "Latest pod has no name, skipping diagnosis");
        return None;
    };

    let events = match pod.uid.as_deref() {
        Some(uid) => match gateway.list_events_for_pod(namespace, &pod_name, uid).await {
            Ok(events) => events,
            Err(e) => {
                warn!(pod = %pod_name, error = %e, "Failed to list pod events");
                Vec::new()
            }
        },
        None => {
            warn!(pod = %pod_name, "Pod has no uid, skipping events");
            Vec::new()
        }
    };

    let log = match gateway
        .read_pod_log(namespace, &pod_name, CONTAINER_NAME)
        .await
    {
        Ok(log) => Some(log),
        Err(e) => {
            warn!(pod = %pod_name, error = %e, "Failed to read pod log");
            None
        }
    };

    Some(DiagnosticRecord {
        pod_name,
        pod_uid: pod.uid.clone(),
        events,
        log,
    })
}
