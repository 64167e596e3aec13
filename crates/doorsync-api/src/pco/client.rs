// Async client for the Planning Center Calendar API.
//
// Event-instance fetches are cached per (from, to, cap) window with the
// window endpoints truncated to minute precision, so repeated calls within
// the same minute reuse cached results. A minimum live-fetch interval
// prevents back-to-back fetches for the same key, and a 429 response falls
// back to the last cached value for the window when one exists.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, DurationRound, Utc};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};
use url::Url;

use super::types::{
    EventInstance, EventInstanceRow, Page, PcoStats, ResourceBookingRow,
};
use crate::transport::TransportConfig;
use crate::Error;

// ── Configuration ────────────────────────────────────────────────────

/// How to authenticate with the calendar API.
#[derive(Debug, Clone)]
pub enum PcoAuth {
    /// App-id + secret sent as HTTP Basic (preferred).
    PersonalAccessToken {
        app_id: String,
        secret: SecretString,
    },
    /// OAuth bearer token.
    OAuth { token: SecretString },
}

/// Configuration for the calendar client.
#[derive(Debug, Clone)]
pub struct PcoConfig {
    /// API origin (e.g. `https://api.planningcenteronline.com`).
    pub base_url: String,
    pub auth: PcoAuth,
    /// Scope event-instance queries to one calendar when set.
    pub calendar_id: Option<String>,
    pub per_page: u32,
    /// Hard cap on pages per window fetch.
    pub max_pages: u32,
    /// How long a cached window stays fresh.
    pub cache_ttl: Duration,
    /// Minimum spacing between live fetches for the same window key.
    pub min_fetch_interval: Duration,
    /// Case-insensitive substring the raw location must contain (early
    /// filter, applied before the per-instance room lookup).
    pub location_must_contain: Option<String>,
    pub transport: TransportConfig,
}

// ── Cache ────────────────────────────────────────────────────────────

/// Window key: endpoints truncated to the minute, plus the item cap.
type WindowKey = (DateTime<Utc>, DateTime<Utc>, usize);

struct CacheEntry {
    fetched_at: DateTime<Utc>,
    items: Vec<EventInstance>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<WindowKey, CacheEntry>,
    last_fetch: HashMap<WindowKey, DateTime<Utc>>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the Planning Center Calendar API.
pub struct PcoClient {
    http: reqwest::Client,
    base_url: Url,
    auth: PcoAuth,
    calendar_id: Option<String>,
    per_page: u32,
    max_pages: u32,
    cache_ttl: chrono::Duration,
    min_fetch_interval: chrono::Duration,
    location_must_contain: Option<String>,
    cache: tokio::sync::Mutex<CacheState>,
    stats: Mutex<PcoStats>,
}

impl PcoClient {
    pub fn new(config: PcoConfig) -> Result<Self, Error> {
        let http = config.transport.build_client()?;
        let base_url = Url::parse(&config.base_url)?;

        Ok(Self {
            http,
            base_url,
            auth: config.auth,
            calendar_id: config.calendar_id.filter(|c| !c.trim().is_empty()),
            per_page: config.per_page.max(1),
            max_pages: config.max_pages.max(1),
            cache_ttl: chrono::Duration::from_std(config.cache_ttl)
                .unwrap_or_else(|_| chrono::Duration::seconds(60)),
            min_fetch_interval: chrono::Duration::from_std(config.min_fetch_interval)
                .unwrap_or_else(|_| chrono::Duration::seconds(60)),
            location_must_contain: config
                .location_must_contain
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
            cache: tokio::sync::Mutex::new(CacheState::default()),
            stats: Mutex::new(PcoStats::default()),
        })
    }

    /// Copy of the fetch counters for status snapshots.
    pub fn stats_snapshot(&self) -> PcoStats {
        self.stats.lock().expect("stats lock poisoned").clone()
    }

    fn bump<F: FnOnce(&mut PcoStats)>(&self, f: F) {
        if let Ok(mut stats) = self.stats.lock() {
            f(&mut stats);
        }
    }

    // ── Request plumbing ─────────────────────────────────────────────

    fn url(&self, path: &str) -> Url {
        self.base_url
            .join(path)
            .expect("path should be a valid relative URL")
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            PcoAuth::PersonalAccessToken { app_id, secret } => {
                req.basic_auth(app_id, Some(secret.expose_secret()))
            }
            PcoAuth::OAuth { token } => req.bearer_auth(token.expose_secret()),
        }
    }

    fn event_instances_path(&self) -> String {
        match &self.calendar_id {
            Some(id) => format!("calendar/v2/calendars/{id}/event_instances"),
            None => "calendar/v2/event_instances".to_owned(),
        }
    }

    async fn get_page<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path);
        debug!("GET {url} params={params:?}");

        let resp = self
            .authed(self.http.get(url))
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    // ── Public API ───────────────────────────────────────────────────

    /// Cheap authenticated probe; `false` on any transport or auth failure.
    pub async fn check_connectivity(&self) -> bool {
        let url = self.url("people/v2/people");
        match self
            .authed(self.http.get(url))
            .query(&[("per_page", "1")])
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Fetch event instances whose start falls within `[from, to]`.
    ///
    /// Serves cache when fresh (or when the last live fetch for this window
    /// is too recent), paginates up to the configured page cap, resolves
    /// booked room names per instance, and falls back to cache on 429.
    pub async fn get_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        max_items: Option<usize>,
    ) -> Result<Vec<EventInstance>, Error> {
        let key = window_key(from, to, max_items);
        let now = Utc::now();

        {
            let cache = self.cache.lock().await;
            if let Some(entry) = cache.entries.get(&key) {
                let age = now - entry.fetched_at;
                if age <= self.cache_ttl {
                    self.bump(|s| {
                        s.cache_hit_returns += 1;
                        s.last_cache_hit_at = Some(now);
                    });
                    return Ok(entry.items.clone());
                }
                if let Some(last) = cache.last_fetch.get(&key) {
                    if now - *last < self.min_fetch_interval {
                        self.bump(|s| {
                            s.cache_hit_returns += 1;
                            s.min_interval_cache_returns += 1;
                            s.last_cache_hit_at = Some(now);
                        });
                        return Ok(entry.items.clone());
                    }
                }
            }
        }

        self.bump(|s| {
            s.live_window_fetches += 1;
            s.last_live_fetch_at = Some(now);
        });

        let items = match self.fetch_window(from, to, max_items).await {
            Ok(items) => items,
            Err(err) if err.is_rate_limited() => {
                let mut cache = self.cache.lock().await;
                if let Some(entry) = cache.entries.get_mut(&key) {
                    self.bump(|s| {
                        s.rate_limit_fallback_returns += 1;
                        s.last_rate_limit_fallback_at = Some(Utc::now());
                    });
                    return Ok(entry.items.clone());
                }
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let mut cache = self.cache.lock().await;
        let done = Utc::now();
        cache.last_fetch.insert(key, done);
        cache.entries.insert(
            key,
            CacheEntry {
                fetched_at: done,
                items: items.clone(),
            },
        );
        let keys = cache.entries.len();
        drop(cache);
        self.bump(|s| s.cache_keys = keys);

        Ok(items)
    }

    // ── Fetch internals ──────────────────────────────────────────────

    async fn fetch_window(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        max_items: Option<usize>,
    ) -> Result<Vec<EventInstance>, Error> {
        let path = self.event_instances_path();
        let from_s = from.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let to_s = to.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

        let mut items: Vec<EventInstance> = Vec::new();
        let mut offset: usize = 0;
        let mut pages: u32 = 0;

        loop {
            pages += 1;
            if pages > self.max_pages {
                warn!(
                    max_pages = self.max_pages,
                    fetched = items.len(),
                    "page cap reached; returning truncated event set"
                );
                break;
            }

            let params = [
                ("per_page", self.per_page.to_string()),
                ("offset", offset.to_string()),
                ("order", "starts_at".to_owned()),
                ("where[starts_at][gte]", from_s.clone()),
                ("where[starts_at][lte]", to_s.clone()),
            ];
            self.bump(|s| s.event_instance_requests += 1);
            let page: Page<EventInstanceRow> = self.get_page(&path, &params).await?;

            if page.data.is_empty() {
                break;
            }
            let received = page.data.len();

            for row in page.data {
                let Some(instance) = self.flatten_instance(row, from, to).await else {
                    continue;
                };
                items.push(instance);

                if max_items.is_some_and(|cap| items.len() >= cap) {
                    return Ok(items);
                }
            }

            if page.links.next.is_none() {
                break;
            }
            offset += received;
        }

        Ok(items)
    }

    /// Flatten one wire row into an `EventInstance`, or `None` when the row
    /// is outside the window, filtered out, or has unparseable times.
    async fn flatten_instance(
        &self,
        row: EventInstanceRow,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Option<EventInstance> {
        let attrs = row.attributes;
        let start_at = parse_instant(attrs.starts_at.as_deref())?;
        let end_at = parse_instant(attrs.ends_at.as_deref())?;
        if start_at < from || start_at > to {
            return None;
        }

        let location_raw = attrs.location.unwrap_or_default();
        if let Some(needle) = &self.location_must_contain {
            if !location_raw.to_lowercase().contains(needle) {
                return None;
            }
        }

        let rooms = self.instance_room_names(&row.id).await;

        Some(EventInstance {
            id: row.id,
            name: attrs.name.unwrap_or_default(),
            start_at,
            end_at,
            rooms,
            building: parse_building(&location_raw),
            location_raw,
        })
    }

    /// Room resource names booked for one event instance.
    ///
    /// Best-effort: any failure yields an empty list so the caller falls
    /// back to the location string.
    async fn instance_room_names(&self, instance_id: &str) -> Vec<String> {
        self.bump(|s| s.resource_booking_requests += 1);

        let path = format!("calendar/v2/event_instances/{instance_id}/resource_bookings");
        let params = [
            ("per_page", "100".to_owned()),
            ("include", "resource".to_owned()),
        ];
        let page: Page<ResourceBookingRow> = match self.get_page(&path, &params).await {
            Ok(page) => page,
            Err(err) => {
                debug!(instance_id, error = %err, "resource booking lookup failed");
                return Vec::new();
            }
        };

        let rooms_by_id: HashMap<&str, &str> = page
            .included
            .iter()
            .filter(|inc| inc.resource_type == "Resource")
            .filter(|inc| inc.attributes.kind.as_deref() == Some("Room"))
            .filter_map(|inc| {
                inc.attributes
                    .name
                    .as_deref()
                    .map(|name| (inc.id.as_str(), name))
            })
            .collect();

        let mut names: Vec<String> = Vec::new();
        for booking in &page.data {
            let resource_id = booking
                .relationships
                .as_ref()
                .and_then(|r| r.resource.as_ref())
                .and_then(|r| r.data.as_ref())
                .map(|d| d.id.as_str());
            let Some(id) = resource_id else { continue };
            if let Some(name) = rooms_by_id.get(id) {
                let name = name.trim();
                if !name.is_empty() && !names.iter().any(|n| n == name) {
                    names.push(name.to_owned());
                }
            }
        }

        names
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn window_key(from: DateTime<Utc>, to: DateTime<Utc>, max_items: Option<usize>) -> WindowKey {
    let minute = chrono::Duration::minutes(1);
    (
        from.duration_trunc(minute).unwrap_or(from),
        to.duration_trunc(minute).unwrap_or(to),
        max_items.unwrap_or(0),
    )
}

fn parse_instant(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw?.parse::<DateTime<Utc>>().ok()
}

/// Campus name from the "Campus - street address" location convention.
fn parse_building(location: &str) -> Option<String> {
    let (campus, _) = location.split_once(" - ")?;
    let campus = campus.trim();
    (!campus.is_empty()).then(|| campus.to_owned())
}
