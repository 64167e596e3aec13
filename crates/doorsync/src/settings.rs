//! Environment configuration for the sync service.
//!
//! Plain key/value pairs (the deployment wrapper loads `.env` before the
//! process starts). Defaults are layered under the environment with
//! figment, then translated into the api/core config types -- the library
//! crates never read the environment themselves.

use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Serialized};
use figment::Figment;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use doorsync_api::{AccessConfig, PcoAuth, PcoConfig, TransportConfig};
use doorsync_core::{Cadence, StateFiles, SyncConfig, SyncError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub display_timezone: String,

    /// Cron cadence; wins over the interval when non-empty.
    pub sync_cron: String,
    pub sync_interval_seconds: u64,
    pub sync_lookahead_hours: i64,
    pub sync_lookbehind_hours: i64,

    pub pco_base_url: String,
    /// "personal_access_token" or "oauth".
    pub pco_auth_type: String,
    pub pco_app_id: String,
    pub pco_secret: String,
    pub pco_access_token: String,
    pub pco_calendar_id: String,
    pub pco_location_must_contain: String,
    pub pco_events_cache_seconds: u64,
    pub pco_min_fetch_interval_seconds: u64,
    pub pco_max_pages: u32,
    pub pco_per_page: u32,

    pub unifi_access_base_url: String,
    pub unifi_access_verify_tls: bool,
    pub unifi_access_api_token: String,
    pub unifi_access_api_key_header: String,

    /// Initial apply mode when no persisted sync state exists.
    pub apply_to_unifi: bool,

    /// Optional approval-queue notifications; empty disables them.
    pub telegram_bot_token: String,
    pub telegram_chat_ids: String,

    pub room_door_mapping_file: PathBuf,
    pub office_hours_file: PathBuf,
    pub event_overrides_file: PathBuf,
    pub safe_hours_file: PathBuf,
    pub approved_event_names_file: PathBuf,
    pub event_memory_file: PathBuf,
    pub pending_approvals_file: PathBuf,
    pub cancelled_events_file: PathBuf,
    pub sync_state_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let files = StateFiles::default();
        Self {
            display_timezone: "America/New_York".into(),
            sync_cron: "*/5 * * * *".into(),
            sync_interval_seconds: 300,
            sync_lookahead_hours: 168,
            sync_lookbehind_hours: 24,
            pco_base_url: "https://api.planningcenteronline.com".into(),
            pco_auth_type: "personal_access_token".into(),
            pco_app_id: String::new(),
            pco_secret: String::new(),
            pco_access_token: String::new(),
            pco_calendar_id: String::new(),
            pco_location_must_contain: String::new(),
            pco_events_cache_seconds: 60,
            pco_min_fetch_interval_seconds: 60,
            pco_max_pages: 40,
            pco_per_page: 100,
            unifi_access_base_url: String::new(),
            unifi_access_verify_tls: false,
            unifi_access_api_token: String::new(),
            unifi_access_api_key_header: "X-API-Key".into(),
            apply_to_unifi: false,
            telegram_bot_token: String::new(),
            telegram_chat_ids: String::new(),
            room_door_mapping_file: files.mapping,
            office_hours_file: files.office_hours,
            event_overrides_file: files.overrides,
            safe_hours_file: files.safe_hours,
            approved_event_names_file: files.approved_names,
            event_memory_file: files.event_memory,
            pending_approvals_file: files.pending_approvals,
            cancelled_events_file: files.cancelled_events,
            sync_state_file: files.sync_state,
        }
    }
}

impl Settings {
    /// Defaults layered under the process environment.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Env::raw())
            .extract()
    }

    pub fn sync_config(&self) -> Result<SyncConfig, SyncError> {
        let display_zone = self.display_timezone.parse().map_err(|_| {
            SyncError::invalid(
                "DISPLAY_TIMEZONE",
                format!("'{}' is not an IANA time zone", self.display_timezone),
            )
        })?;

        Ok(SyncConfig {
            display_zone,
            lookahead: chrono::Duration::hours(self.sync_lookahead_hours),
            lookbehind: chrono::Duration::hours(self.sync_lookbehind_hours),
            apply_default: self.apply_to_unifi,
            files: StateFiles {
                mapping: self.room_door_mapping_file.clone(),
                office_hours: self.office_hours_file.clone(),
                overrides: self.event_overrides_file.clone(),
                safe_hours: self.safe_hours_file.clone(),
                approved_names: self.approved_event_names_file.clone(),
                event_memory: self.event_memory_file.clone(),
                pending_approvals: self.pending_approvals_file.clone(),
                cancelled_events: self.cancelled_events_file.clone(),
                sync_state: self.sync_state_file.clone(),
            },
        })
    }

    pub fn pco_config(&self) -> Result<PcoConfig, SyncError> {
        let auth = match self.pco_auth_type.as_str() {
            "personal_access_token" => {
                if self.pco_app_id.is_empty() || self.pco_secret.is_empty() {
                    return Err(SyncError::invalid(
                        "PCO_APP_ID/PCO_SECRET",
                        "required for personal_access_token auth",
                    ));
                }
                PcoAuth::PersonalAccessToken {
                    app_id: self.pco_app_id.clone(),
                    secret: SecretString::from(self.pco_secret.clone()),
                }
            }
            "oauth" => {
                if self.pco_access_token.is_empty() {
                    return Err(SyncError::invalid(
                        "PCO_ACCESS_TOKEN",
                        "required for oauth auth",
                    ));
                }
                PcoAuth::OAuth {
                    token: SecretString::from(self.pco_access_token.clone()),
                }
            }
            other => {
                return Err(SyncError::invalid(
                    "PCO_AUTH_TYPE",
                    format!("expected 'personal_access_token' or 'oauth', got '{other}'"),
                ));
            }
        };

        Ok(PcoConfig {
            base_url: self.pco_base_url.clone(),
            auth,
            calendar_id: Some(self.pco_calendar_id.clone()).filter(|c| !c.trim().is_empty()),
            per_page: self.pco_per_page,
            max_pages: self.pco_max_pages,
            cache_ttl: Duration::from_secs(self.pco_events_cache_seconds),
            min_fetch_interval: Duration::from_secs(self.pco_min_fetch_interval_seconds),
            location_must_contain: Some(self.pco_location_must_contain.clone())
                .filter(|s| !s.trim().is_empty()),
            transport: TransportConfig::default(),
        })
    }

    pub fn access_config(&self) -> Result<AccessConfig, SyncError> {
        if self.unifi_access_base_url.trim().is_empty() {
            return Err(SyncError::invalid(
                "UNIFI_ACCESS_BASE_URL",
                "required (controller origin, e.g. https://192.168.1.1:12445)",
            ));
        }

        Ok(AccessConfig {
            base_url: self.unifi_access_base_url.clone(),
            api_token: Some(self.unifi_access_api_token.clone())
                .filter(|t| !t.trim().is_empty())
                .map(SecretString::from),
            api_key_header: self.unifi_access_api_key_header.clone(),
            transport: TransportConfig {
                // Controllers usually run self-signed certificates.
                danger_accept_invalid_certs: !self.unifi_access_verify_tls,
                ..TransportConfig::default()
            },
        })
    }

    pub fn telegram(&self) -> Option<doorsync_api::TelegramClient> {
        doorsync_api::TelegramClient::new(
            &self.telegram_bot_token,
            &self.telegram_chat_ids,
            &TransportConfig::default(),
        )
    }

    pub fn cadence(&self) -> Result<Cadence, SyncError> {
        Cadence::resolve(
            Some(self.sync_cron.as_str()),
            Duration::from_secs(self.sync_interval_seconds),
        )
    }
}
