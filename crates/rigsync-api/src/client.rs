//! Async HTTP client for the production equipment REST API.
//!
//! Base path: {base}/productions/{production}/{resource}
//! Auth: Bearer token (see `TransportConfig`)

use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{ConflictBody, EntityRecord, UpdateResponse};

// ── Error response shape ─────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for one production's REST resources.
///
/// Every resource (`cameras`, `monitors`, ...) shares the same verbs:
/// list, get, create, versioned update, delete.
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a server URL, production id, and transport config.
    pub fn new(base_url: &str, production_id: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, production_id, http)
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(
        base_url: &str,
        production_id: &str,
        http: reqwest::Client,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url, production_id)?;
        Ok(Self { http, base_url })
    }

    /// `https://host/api` + `p1` → `https://host/api/productions/p1/`
    fn normalize_base_url(raw: &str, production_id: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/productions/{production_id}/"));
        Ok(url)
    }

    /// The production-scoped base URL (always ends in `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Resource operations ──────────────────────────────────────────

    /// List every record of one resource, in server order.
    pub async fn list(&self, resource: &str) -> Result<Vec<EntityRecord>, Error> {
        let url = self.url(resource)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        self.handle_response(resp).await
    }

    /// Fetch a single record.
    pub async fn get(&self, resource: &str, uuid: Uuid) -> Result<EntityRecord, Error> {
        let url = self.url(&format!("{resource}/{uuid}"))?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        self.handle_response(resp).await
    }

    /// Create a record. The server assigns `uuid` and the initial `version`.
    pub async fn create(
        &self,
        resource: &str,
        payload: &Map<String, Value>,
    ) -> Result<EntityRecord, Error> {
        let url = self.url(resource)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(payload).send().await?;
        self.handle_response(resp).await
    }

    /// Versioned partial update.
    ///
    /// The body is `patch` plus `"version": expected_version`. A stale
    /// version comes back as [`UpdateResponse::Conflict`], not as an error.
    pub async fn update(
        &self,
        resource: &str,
        uuid: Uuid,
        patch: &Map<String, Value>,
        expected_version: u64,
    ) -> Result<UpdateResponse, Error> {
        let url = self.url(&format!("{resource}/{uuid}"))?;
        debug!(expected_version, "PATCH {url}");

        let body = VersionedPatch {
            patch,
            version: expected_version,
        };
        let resp = self.http.patch(url).json(&body).send().await?;

        if resp.status() == StatusCode::CONFLICT {
            let raw = resp.text().await.unwrap_or_default();
            let conflict = serde_json::from_str::<ConflictBody>(&raw).unwrap_or(ConflictBody {
                error: "version_conflict".into(),
                message: (!raw.is_empty()).then_some(raw),
                current_version: None,
            });
            return Ok(UpdateResponse::Conflict(conflict));
        }

        self.handle_response(resp).await
    }

    /// Delete a record.
    pub async fn delete(&self, resource: &str, uuid: Uuid) -> Result<(), Error> {
        let url = self.url(&format!("{resource}/{uuid}"))?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: StatusCode, resp: reqwest::Response) -> Error {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Error::Unauthorized,
            StatusCode::NOT_FOUND => {
                return Error::NotFound {
                    path: resp.url().path().to_owned(),
                };
            }
            _ => {}
        }

        let raw = resp.text().await.unwrap_or_default();

        let message = match serde_json::from_str::<ErrorResponse>(&raw) {
            Ok(ErrorResponse {
                message: Some(m), ..
            }) => m,
            Ok(ErrorResponse { error: Some(e), .. }) => e,
            _ if raw.is_empty() => status.to_string(),
            _ => raw,
        };

        Error::Http {
            status: status.as_u16(),
            message,
        }
    }
}

/// `PATCH` body: the caller's fields with the expected version alongside.
#[derive(Serialize)]
struct VersionedPatch<'a> {
    #[serde(flatten)]
    patch: &'a Map<String, Value>,
    version: u64,
}
