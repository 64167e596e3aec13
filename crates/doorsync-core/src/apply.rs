// ── Remote applier ──
//
// Diffs the desired weekly schedule per door against the controller and
// issues the minimum set of writes: at most one schedule update and one
// policy delete/create per door per cycle. Schedules must pre-exist on the
// controller (named "PCO Sync {door_key}"); they are never created here.
// Within a door the schedule is always updated before its policy so a
// policy never points at stale weekly contents.

use std::collections::HashMap;

use chrono_tz::Tz;
use doorsync_api::access::{PolicyCreate, PolicyResource, ScheduleUpdate};
use doorsync_api::AccessClient;
use tracing::{debug, info};

use crate::builder::SchedulePlan;
use crate::error::SyncError;
use crate::store::mapping::Mapping;
use crate::weekly;

/// What one apply pass did, door by door.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Doors whose remote schedule was replaced.
    pub schedules_updated: Vec<String>,
    /// Doors whose policy was created or recreated.
    pub policies_replaced: Vec<String>,
    /// Per-door failures; the remaining doors continued.
    pub errors: Vec<SyncError>,
}

fn schedule_name(door_key: &str) -> String {
    format!("PCO Sync {door_key}")
}

fn policy_name(door_key: &str) -> String {
    format!("PCO Sync Policy {door_key}")
}

/// Reconcile the controller with the desired plan.
///
/// Iterates every mapped door in lexicographic order. Doors with no
/// controller door ids have nothing to unlock and are skipped.
pub async fn apply_remote(
    client: &AccessClient,
    plan: &SchedulePlan,
    mapping: &Mapping,
    tz: Tz,
) -> Result<ApplyReport, SyncError> {
    let mut report = ApplyReport::default();

    let schedules = client
        .list_schedules()
        .await
        .map_err(SyncError::UpstreamUnavailable)?;
    let policies = client
        .list_policies()
        .await
        .map_err(SyncError::UpstreamUnavailable)?;

    let schedules_by_name: HashMap<&str, &doorsync_api::access::ScheduleSummary> =
        schedules.iter().map(|s| (s.name.as_str(), s)).collect();
    let policies_by_name: HashMap<&str, &doorsync_api::access::AccessPolicy> =
        policies.iter().map(|p| (p.name.as_str(), p)).collect();

    let mut door_keys: Vec<&str> = mapping.doors.iter().map(|d| d.key.as_str()).collect();
    door_keys.sort_unstable();

    for door_key in door_keys {
        let door = match mapping.doors.get(door_key) {
            Some(door) => door,
            None => continue,
        };
        if door.unifi_door_ids.is_empty() {
            debug!(door_key, "no controller door ids configured; skipping");
            continue;
        }

        if let Err(err) = apply_door(
            client,
            plan,
            door_key,
            &door.unifi_door_ids,
            &schedules_by_name,
            &policies_by_name,
            tz,
            &mut report,
        )
        .await
        {
            report.errors.push(err);
        }
    }

    Ok(report)
}

#[allow(clippy::too_many_arguments)]
async fn apply_door(
    client: &AccessClient,
    plan: &SchedulePlan,
    door_key: &str,
    unifi_door_ids: &[String],
    schedules_by_name: &HashMap<&str, &doorsync_api::access::ScheduleSummary>,
    policies_by_name: &HashMap<&str, &doorsync_api::access::AccessPolicy>,
    tz: Tz,
    report: &mut ApplyReport,
) -> Result<(), SyncError> {
    let name = schedule_name(door_key);
    let Some(summary) = schedules_by_name.get(name.as_str()) else {
        return Err(SyncError::RemoteScheduleMissing {
            door_key: door_key.to_owned(),
            schedule: name,
        });
    };

    let windows = plan
        .door_windows
        .get(door_key)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let desired = weekly::week_schedule(windows, tz);

    let remote_write = |source| SyncError::RemoteWriteFailed {
        door_key: door_key.to_owned(),
        source,
    };

    // Schedule first, then policy.
    let detail = client.get_schedule(&summary.id).await.map_err(remote_write)?;
    if detail.weekly.normalized() != desired.normalized() {
        let update = ScheduleUpdate {
            name: if detail.name.is_empty() {
                name.clone()
            } else {
                detail.name.clone()
            },
            week_schedule: desired,
            holiday_group_id: detail
                .holiday_group_id
                .clone()
                .or_else(|| summary.holiday_group_id.clone())
                .unwrap_or_default(),
            holiday_schedule: detail.holiday_schedule.clone(),
        };
        client
            .update_schedule(&summary.id, &update)
            .await
            .map_err(remote_write)?;
        info!(door_key, "remote schedule updated");
        report.schedules_updated.push(door_key.to_owned());
    }

    let mut desired_resources: Vec<PolicyResource> = unifi_door_ids
        .iter()
        .map(PolicyResource::door)
        .collect();
    desired_resources.sort();
    desired_resources.dedup();

    let pname = policy_name(door_key);
    if let Some(existing) = policies_by_name.get(pname.as_str()) {
        let mut existing_resources = existing.resources.clone();
        existing_resources.sort();
        existing_resources.dedup();

        if existing.schedule_id == summary.id && existing_resources == desired_resources {
            return Ok(()); // policy already correct
        }

        client
            .delete_policy(&existing.id)
            .await
            .map_err(remote_write)?;
    }

    client
        .create_policy(&PolicyCreate {
            name: pname,
            resource: desired_resources,
            schedule_id: summary.id.clone(),
        })
        .await
        .map_err(remote_write)?;
    info!(door_key, "access policy replaced");
    report.policies_replaced.push(door_key.to_owned());

    Ok(())
}
