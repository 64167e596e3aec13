// ── Sync orchestrator ──
//
// Drives one reconciliation cycle: load state, fetch events, gate, build,
// merge office hours, apply. Exactly one cycle runs at a time; a trigger
// arriving mid-cycle loses the gate and returns Busy. `run_once` never
// propagates an error -- failures land in the status ring buffer.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use doorsync_api::{AccessClient, EventInstance, PcoClient, PcoStats, TelegramClient};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::apply;
use crate::builder::{self, SchedulePlan};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::model::{DisplayItem, Event};
use crate::store::approvals::{self, PendingApproval};
use crate::store::cancellations::{self, CancelledInstance};
use crate::store::event_memory;
use crate::store;
use crate::store::mapping::{self, Mapping};
use crate::store::office_hours::OfficeHours;
use crate::store::overrides::Overrides;
use crate::weekly;

/// At most this many recent error strings are kept for the snapshot.
const ERROR_RING_CAPACITY: usize = 20;

/// Fixed lookback for the upcoming-events preview, independent of the
/// configured sync lookbehind.
const UPCOMING_LOOKBEHIND_HOURS: i64 = 24;

// ── Persisted apply toggle ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplyState {
    apply_to_unifi: bool,
}

// ── Status ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleCounts {
    pub events: usize,
    pub schedule_items: usize,
    pub doors: usize,
}

#[derive(Debug, Clone)]
struct SyncStatus {
    last_sync_at: Option<DateTime<Utc>>,
    last_sync_result: Option<String>,
    pco_status: String,
    unifi_status: String,
    recent_errors: Vec<String>,
    skipped_runs: u64,
    counts: CycleCounts,
    preview: Vec<DisplayItem>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            last_sync_at: None,
            last_sync_result: None,
            pco_status: "unknown".into(),
            unifi_status: "unknown".into(),
            recent_errors: Vec::new(),
            skipped_runs: 0,
            counts: CycleCounts::default(),
            preview: Vec::new(),
        }
    }
}

/// Immutable copy of the in-memory status, shaped for the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_sync_result: Option<String>,
    pub pco_status: String,
    pub unifi_status: String,
    pub recent_errors: Vec<String>,
    pub apply_to_unifi: bool,
    pub skipped_runs: u64,
    pub counts: CycleCounts,
    pub pco_stats: PcoStats,
    pub preview: Vec<DisplayItem>,
}

/// What happened to a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Another cycle was already in progress; this trigger was skipped.
    Busy,
}

/// On-demand desired-schedule computation, no remote writes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    pub now: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub limit: usize,
    pub rooms: BTreeMap<String, usize>,
    pub events: Vec<EventInstance>,
    pub schedule: SchedulePlan,
}

// ── Service ──────────────────────────────────────────────────────────

struct SyncInner {
    config: SyncConfig,
    pco: PcoClient,
    access: AccessClient,
    telegram: Option<TelegramClient>,
    status: Mutex<SyncStatus>,
    /// Single-writer gate for the sync pipeline.
    run_gate: tokio::sync::Mutex<()>,
    last_good_mapping: Mutex<Option<Arc<Mapping>>>,
    apply_to_unifi: AtomicBool,
}

/// The sync service. Cheaply cloneable; all state lives behind the `Arc`.
#[derive(Clone)]
pub struct SyncService {
    inner: Arc<SyncInner>,
}

impl SyncService {
    /// Build the service. The apply toggle initialises from the persisted
    /// sync state when present, else from the configured default.
    pub fn new(config: SyncConfig, pco: PcoClient, access: AccessClient) -> Self {
        let apply = if config.files.sync_state.exists() {
            let state: ApplyState = store::load_or_default(&config.files.sync_state);
            state.apply_to_unifi
        } else {
            config.apply_default
        };

        Self {
            inner: Arc::new(SyncInner {
                config,
                pco,
                access,
                telegram: None,
                status: Mutex::new(SyncStatus::default()),
                run_gate: tokio::sync::Mutex::new(()),
                last_good_mapping: Mutex::new(None),
                apply_to_unifi: AtomicBool::new(apply),
            }),
        }
    }

    /// Attach the optional Telegram notifier. Only callable before the
    /// service is shared.
    pub fn with_telegram(mut self, telegram: Option<TelegramClient>) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.telegram = telegram;
        }
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    // ── Apply mode ───────────────────────────────────────────────────

    pub fn apply_mode(&self) -> bool {
        self.inner.apply_to_unifi.load(Ordering::Relaxed)
    }

    /// Toggle apply mode, persisting before the new value takes effect.
    pub fn set_apply_mode(&self, apply: bool) -> Result<(), SyncError> {
        store::save_atomic(
            &self.inner.config.files.sync_state,
            &ApplyState {
                apply_to_unifi: apply,
            },
        )?;
        self.inner.apply_to_unifi.store(apply, Ordering::Relaxed);
        info!(apply, "apply mode changed");
        Ok(())
    }

    // ── Status ───────────────────────────────────────────────────────

    pub fn status_snapshot(&self) -> StatusSnapshot {
        let status = self.status().clone();
        StatusSnapshot {
            last_sync_at: status.last_sync_at,
            last_sync_result: status.last_sync_result,
            pco_status: status.pco_status,
            unifi_status: status.unifi_status,
            recent_errors: status.recent_errors,
            apply_to_unifi: self.apply_mode(),
            skipped_runs: status.skipped_runs,
            counts: status.counts,
            pco_stats: self.inner.pco.stats_snapshot(),
            preview: status.preview,
        }
    }

    fn status(&self) -> std::sync::MutexGuard<'_, SyncStatus> {
        self.inner.status.lock().expect("status lock poisoned")
    }

    async fn notify_fatal(&self, message: &str) {
        if let Some(telegram) = &self.inner.telegram {
            telegram.send(&format!("Door sync error:\n{message}")).await;
        }
    }

    fn record_error(&self, error: &dyn std::fmt::Display) {
        let line = format!("{} {error}", Utc::now().to_rfc3339());
        warn!(error = %error, "sync error recorded");
        let mut status = self.status();
        status.recent_errors.insert(0, line);
        status.recent_errors.truncate(ERROR_RING_CAPACITY);
    }

    // ── Cycle ────────────────────────────────────────────────────────

    /// Run one sync cycle, unless one is already in progress.
    pub async fn run_once(&self) -> RunOutcome {
        let Ok(_guard) = self.inner.run_gate.try_lock() else {
            self.status().skipped_runs += 1;
            info!("sync already in progress; trigger skipped");
            return RunOutcome::Busy;
        };

        self.run_cycle().await;
        RunOutcome::Completed
    }

    async fn run_cycle(&self) {
        let t0 = Utc::now();
        let tz = self.inner.config.display_zone;
        let files = self.inner.config.files.clone();
        self.status().last_sync_at = Some(t0);

        let mapping = match self.mapping_snapshot() {
            Ok(mapping) => mapping,
            Err(err) => {
                self.record_error(&err);
                self.status().last_sync_result = Some(format!("error: {err}"));
                self.notify_fatal(&err.to_string()).await;
                return;
            }
        };
        let office: OfficeHours = store::load_or_default(&files.office_hours);
        let overrides: Overrides = store::load_or_default(&files.overrides);
        let safe_hours = approvals::load_safe_hours(&files.safe_hours);
        let approved = approvals::load_approved_names(&files.approved_names);
        let mut pending = approvals::load_pending(&files.pending_approvals);
        let cancelled = cancellations::load(&files.cancelled_events);

        let (pco_ok, access_ok) = tokio::join!(
            self.inner.pco.check_connectivity(),
            self.inner.access.check_connectivity(),
        );
        {
            let mut status = self.status();
            status.pco_status = if pco_ok { "ok" } else { "error" }.into();
            status.unifi_status = if access_ok { "ok" } else { "error" }.into();
        }

        let from = t0 - self.inner.config.lookbehind;
        let to = t0 + self.inner.config.lookahead;
        let mut instances = match self.inner.pco.get_events(from, to, None).await {
            Ok(instances) => instances,
            Err(err) => {
                let err = SyncError::UpstreamUnavailable(err);
                self.record_error(&err);
                self.status().last_sync_result = Some(format!("error: {err}"));
                self.notify_fatal(&err.to_string()).await;
                return;
            }
        };

        let cancelled_ids = cancelled.ids();
        instances.retain(|i| !cancelled_ids.contains(i.id.as_str()));
        drop(cancelled_ids);

        // Expand multi-room instances at the source boundary and drop
        // room-excluded events before gating.
        let mut events: Vec<Event> = instances.iter().flat_map(|i| Event::expand(i)).collect();
        events.retain(|e| !mapping.room_excluded(&e.room));

        let known_ids: std::collections::HashSet<String> =
            pending.pending.iter().map(|p| p.id.clone()).collect();
        let passed = approvals::gate(&events, &safe_hours, &approved, &mut pending, t0, tz);
        if let Err(err) = store::save_atomic(&files.pending_approvals, &pending) {
            self.record_error(&err);
        }

        let newly_flagged: Vec<&PendingApproval> = pending
            .pending
            .iter()
            .filter(|p| !known_ids.contains(&p.id))
            .collect();
        if !newly_flagged.is_empty() {
            if let Some(telegram) = &self.inner.telegram {
                let mut lines = vec!["Door schedule approval required".to_owned(), String::new()];
                for entry in &newly_flagged {
                    lines.push(format!("- {}", entry.name));
                    lines.push(format!("  {}", entry.reason));
                }
                lines.push(String::new());
                lines.push("Review and approve at the dashboard.".to_owned());
                telegram.send(&lines.join("\n")).await;
            }
        }

        // Memory sees every observed event, held ones included.
        if let Err(err) = event_memory::update(&files.event_memory, &instances, t0) {
            self.record_error(&err);
        }

        let mut plan = builder::build(&passed, &mapping, &overrides, tz);
        weekly::merge_office_hours(&mut plan, &office, &mapping, from, to, tz);

        let apply = self.apply_mode();
        if apply {
            match apply::apply_remote(&self.inner.access, &plan, &mapping, tz).await {
                Ok(report) => {
                    for err in &report.errors {
                        self.record_error(err);
                    }
                }
                Err(err) => self.record_error(&err),
            }
        }

        let mode = if apply { "apply" } else { "dry-run" };
        let counts = CycleCounts {
            events: instances.len(),
            schedule_items: plan.items.len(),
            doors: plan.door_windows.len(),
        };
        {
            let mut status = self.status();
            status.counts = counts;
            status.last_sync_result = Some(format!(
                "ok: mode={mode} events={} scheduleItems={}",
                counts.events, counts.schedule_items,
            ));
            status.preview = plan.items;
        }
        info!(
            mode,
            events = counts.events,
            schedule_items = counts.schedule_items,
            "sync cycle complete"
        );
    }

    /// Load and validate the mapping, falling back to the last good
    /// snapshot on failure. With no last-good snapshot the error is fatal
    /// for the cycle.
    fn mapping_snapshot(&self) -> Result<Arc<Mapping>, SyncError> {
        match mapping::load(&self.inner.config.files.mapping) {
            Ok(mapping) => {
                let snapshot = Arc::new(mapping);
                *self
                    .inner
                    .last_good_mapping
                    .lock()
                    .expect("mapping lock poisoned") = Some(Arc::clone(&snapshot));
                Ok(snapshot)
            }
            Err(err) => {
                let last_good = self
                    .inner
                    .last_good_mapping
                    .lock()
                    .expect("mapping lock poisoned")
                    .clone();
                match last_good {
                    Some(snapshot) => {
                        self.record_error(&err);
                        warn!("mapping invalid; using last good snapshot");
                        Ok(snapshot)
                    }
                    None => Err(err),
                }
            }
        }
    }

    // ── Previews ─────────────────────────────────────────────────────

    /// Compute the desired schedule for an arbitrary window. Read-only:
    /// no gate evaluation, no state writes, no controller writes.
    pub async fn preview(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Preview, SyncError> {
        let tz = self.inner.config.display_zone;
        let files = &self.inner.config.files;

        let mapping = self.mapping_snapshot()?;
        let office: OfficeHours = store::load_or_default(&files.office_hours);
        let overrides: Overrides = store::load_or_default(&files.overrides);

        let now = Utc::now();
        let mut instances = self
            .inner
            .pco
            .get_events(start, end, Some(limit))
            .await
            .map_err(SyncError::UpstreamUnavailable)?;
        instances.sort_by(|a, b| (a.start_at, &a.id).cmp(&(b.start_at, &b.id)));

        let mut rooms: BTreeMap<String, usize> = BTreeMap::new();
        for instance in &instances {
            let room = instance
                .rooms
                .first()
                .cloned()
                .unwrap_or_else(|| crate::model::fallback_room(instance));
            let key = if room.is_empty() { "(none)".to_owned() } else { room };
            *rooms.entry(key).or_default() += 1;
        }

        let events: Vec<Event> = instances.iter().flat_map(|i| Event::expand(i)).collect();
        let mut plan = builder::build(&events, &mapping, &overrides, tz);
        weekly::merge_office_hours(&mut plan, &office, &mapping, start, end, tz);

        Ok(Preview {
            now,
            start,
            end,
            limit,
            rooms,
            events: instances,
            schedule: plan,
        })
    }

    /// Preview the near future: a fixed 24-hour lookback plus the
    /// configured lookahead, with already-finished items filtered out.
    pub async fn upcoming_preview(&self, limit: usize) -> Result<Preview, SyncError> {
        let now = Utc::now();
        let start = now - chrono::Duration::hours(UPCOMING_LOOKBEHIND_HOURS);
        let end = now + self.inner.config.lookahead;

        let mut preview = self.preview(start, end, limit).await?;
        preview.schedule.items.retain(|item| item.end_at > now);
        preview.events.retain(|event| event.end_at > now);
        Ok(preview)
    }

    // ── Dashboard operations ─────────────────────────────────────────

    pub fn list_pending(&self) -> Vec<PendingApproval> {
        approvals::load_pending(&self.inner.config.files.pending_approvals).pending
    }

    /// Approve a held event by id; its name passes automatically from the
    /// next cycle on.
    pub fn approve(&self, event_id: &str) -> Result<Option<String>, SyncError> {
        let files = &self.inner.config.files;
        approvals::approve(
            &files.pending_approvals,
            &files.approved_names,
            event_id,
            Utc::now(),
        )
    }

    /// Deny a held event by id; the next cycle re-evaluates it.
    pub fn deny(&self, event_id: &str) -> Result<Option<String>, SyncError> {
        approvals::deny(&self.inner.config.files.pending_approvals, event_id)
    }

    pub fn list_cancelled(&self) -> Vec<CancelledInstance> {
        cancellations::load(&self.inner.config.files.cancelled_events).instances
    }

    pub fn cancel(
        &self,
        event_id: &str,
        name: &str,
        start_at: Option<DateTime<Utc>>,
        end_at: Option<DateTime<Utc>>,
    ) -> Result<(), SyncError> {
        cancellations::add(
            &self.inner.config.files.cancelled_events,
            event_id,
            name,
            start_at,
            end_at,
            Utc::now(),
        )
    }

    pub fn restore(&self, event_id: &str) -> Result<(), SyncError> {
        cancellations::remove(&self.inner.config.files.cancelled_events, event_id)
    }

    // ── Validated operator-file writes ───────────────────────────────

    pub fn save_mapping(&self, mapping: &Mapping) -> Result<(), SyncError> {
        mapping.validate()?;
        store::save_atomic(&self.inner.config.files.mapping, mapping)
    }

    pub fn save_office_hours(&self, office: &OfficeHours) -> Result<(), SyncError> {
        store::save_atomic(&self.inner.config.files.office_hours, office)
    }

    pub fn save_overrides(&self, overrides: &Overrides) -> Result<(), SyncError> {
        overrides.validate()?;
        store::save_atomic(&self.inner.config.files.overrides, overrides)
    }

    pub fn save_safe_hours(
        &self,
        safe_hours: &approvals::SafeHours,
    ) -> Result<(), SyncError> {
        safe_hours.validate()?;
        store::save_atomic(&self.inner.config.files.safe_hours, safe_hours)
    }
}
