// Async client for the UniFi Access developer API.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::types::{
    AccessPolicy, Envelope, PolicyCreate, ScheduleDetail, ScheduleSummary, ScheduleUpdate,
};
use crate::transport::TransportConfig;
use crate::Error;

const SCHEDULES_PATH: &str = "api/v1/developer/access_policies/schedules";
const POLICIES_PATH: &str = "api/v1/developer/access_policies";

/// Configuration for connecting to one controller.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Controller origin (e.g. `https://192.168.1.1:12445`).
    pub base_url: String,
    /// API token; omitted for controllers fronted by an authenticating proxy.
    pub api_token: Option<SecretString>,
    /// Header the token travels in (`X-API-Key` unless the deployment
    /// expects `Authorization`).
    pub api_key_header: String,
    pub transport: TransportConfig,
}

/// Async client for the controller's schedule and policy surface.
pub struct AccessClient {
    http: reqwest::Client,
    base_url: Url,
}

impl AccessClient {
    /// Build a client, injecting the API token as a default header.
    ///
    /// When the configured header is `Authorization`, a bare token gets the
    /// `Bearer ` prefix the controller expects.
    pub fn new(config: AccessConfig) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            let name = HeaderName::from_bytes(config.api_key_header.as_bytes()).map_err(|e| {
                Error::Authentication {
                    message: format!("invalid API key header name: {e}"),
                }
            })?;

            let raw = token.expose_secret();
            let value = if config.api_key_header.eq_ignore_ascii_case("authorization")
                && !raw.to_lowercase().starts_with("bearer ")
            {
                format!("Bearer {raw}")
            } else {
                raw.to_owned()
            };
            let mut value = HeaderValue::from_str(&value).map_err(|e| Error::Authentication {
                message: format!("invalid API token header value: {e}"),
            })?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        let http = config.transport.build_client_with_headers(headers)?;
        let base_url = Url::parse(&config.base_url)?;

        Ok(Self { http, base_url })
    }

    // ── Request plumbing ─────────────────────────────────────────────

    fn url(&self, path: &str) -> Url {
        self.base_url
            .join(path)
            .expect("path should be a valid relative URL")
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path);
        debug!("GET {url}");
        let resp = self.http.get(url).send().await?;
        self.unwrap_envelope(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path);
        debug!("POST {url}");
        let resp = self.http.post(url).json(body).send().await?;
        self.unwrap_envelope(resp).await
    }

    async fn put<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), Error> {
        let url = self.url(path);
        debug!("PUT {url}");
        let resp = self.http.put(url).json(body).send().await?;
        self.check_envelope(resp).await
    }

    async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path);
        debug!("DELETE {url}");
        let resp = self.http.delete(url).send().await?;
        self.check_envelope(resp).await
    }

    /// Parse the `{code, msg, data}` envelope, returning `data`.
    async fn unwrap_envelope<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        if let Some(code) = &envelope.code {
            if code != "SUCCESS" {
                return Err(Error::Controller {
                    code: code.clone(),
                    message: envelope.msg.unwrap_or_default(),
                });
            }
        }

        envelope.data.ok_or_else(|| Error::Deserialization {
            message: "envelope has no data field".to_owned(),
            body,
        })
    }

    /// Like `unwrap_envelope` but for writes whose `data` we ignore.
    async fn check_envelope(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        let envelope: Envelope<serde_json::Value> =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body,
            })?;

        match envelope.code.as_deref() {
            None | Some("SUCCESS") => Ok(()),
            Some(code) => Err(Error::Controller {
                code: code.to_owned(),
                message: envelope.msg.unwrap_or_default(),
            }),
        }
    }

    // ── Public API ───────────────────────────────────────────────────

    /// Cheap reachability probe; any HTTP response counts as reachable.
    pub async fn check_connectivity(&self) -> bool {
        self.http.get(self.base_url.clone()).send().await.is_ok()
    }

    pub async fn list_schedules(&self) -> Result<Vec<ScheduleSummary>, Error> {
        self.get(SCHEDULES_PATH).await
    }

    pub async fn get_schedule(&self, schedule_id: &str) -> Result<ScheduleDetail, Error> {
        self.get(&format!("{SCHEDULES_PATH}/{schedule_id}")).await
    }

    pub async fn update_schedule(
        &self,
        schedule_id: &str,
        update: &ScheduleUpdate,
    ) -> Result<(), Error> {
        self.put(&format!("{SCHEDULES_PATH}/{schedule_id}"), update)
            .await
    }

    pub async fn list_policies(&self) -> Result<Vec<AccessPolicy>, Error> {
        self.get(&format!("{POLICIES_PATH}?page_num=1&page_size=200"))
            .await
    }

    pub async fn create_policy(&self, create: &PolicyCreate) -> Result<AccessPolicy, Error> {
        self.post(POLICIES_PATH, create).await
    }

    pub async fn delete_policy(&self, policy_id: &str) -> Result<(), Error> {
        self.delete(&format!("{POLICIES_PATH}/{policy_id}")).await
    }
}
