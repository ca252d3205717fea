//! Reference API HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). Reads are
//! anonymous; writes require basic-auth credentials and an open changeset.

use std::time::Duration;

use geosync_core::document::OsmDocument;
use geosync_core::ports::{ApiError, ReferenceApi};
use geosync_io::xml;

const GENERATOR: &str = concat!("geosync/", env!("CARGO_PKG_VERSION"));

/// Basic-auth credentials for write access.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub username: String,
    pub password: String,
}

/// Reference API client (blocking).
pub struct OsmApiClient {
    http: reqwest::blocking::Client,
    api_base: String,
    credentials: Option<ApiCredentials>,
}

impl OsmApiClient {
    /// Read-only client against the given API base URL.
    pub fn new(api_base: &str) -> Self {
        let http = reqwest::blocking::Client::builder()
            .user_agent(GENERATOR)
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            credentials: None,
        }
    }

    /// Client with write access.
    pub fn with_credentials(api_base: &str, credentials: ApiCredentials) -> Self {
        let mut client = Self::new(api_base);
        client.credentials = Some(credentials);
        client
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, ApiError> {
        let resp = self
            .http
            .get(url)
            .send()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        check_status(resp)
    }

    /// Authenticated PUT with an XML body.
    fn put(&self, url: &str, body: String) -> Result<reqwest::blocking::Response, ApiError> {
        let creds = self.credentials.as_ref().ok_or(ApiError::NotAuthenticated)?;
        let resp = self
            .http
            .put(url)
            .basic_auth(&creds.username, Some(&creds.password))
            .header("Content-Type", "text/xml")
            .body(body)
            .send()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        check_status(resp)
    }
}

fn check_status(
    resp: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(ApiError::Http(status.as_u16(), body))
}

impl ReferenceApi for OsmApiClient {
    /// Current snapshot of a way, `None` when the API has no record for
    /// the id (never existed, or deleted).
    fn read_element(&self, osm_id: i64) -> Result<Option<OsmDocument>, ApiError> {
        let url = format!("{}/api/0.6/way/{osm_id}", self.api_base);
        let resp = match self.get(&url) {
            Ok(resp) => resp,
            Err(ApiError::Http(404, _)) | Err(ApiError::Http(410, _)) => return Ok(None),
            Err(err) => return Err(err),
        };
        let body = resp.text().map_err(|e| ApiError::Network(e.to_string()))?;
        let document = xml::from_xml(&body).map_err(|e| ApiError::Parse(e.to_string()))?;
        if document.primary_way().is_none() {
            return Err(ApiError::Parse(format!(
                "response for way {osm_id} carries no way element"
            )));
        }
        Ok(Some(document))
    }

    fn write_element(&self, document: &OsmDocument, changeset_id: u64) -> bool {
        let Some(way) = document.primary_way() else {
            log::warn!("document has no way to write, skipped");
            return false;
        };
        let osm_id = way.id;
        let body = match xml::to_xml(document, GENERATOR, Some(changeset_id)) {
            Ok(body) => body,
            Err(err) => {
                log::error!("cannot serialize way {osm_id}: {err}");
                return false;
            }
        };
        let url = format!("{}/api/0.6/way/{osm_id}", self.api_base);
        match self.put(&url, body) {
            Ok(_) => {
                log::debug!("way {osm_id} written under changeset {changeset_id}");
                true
            }
            Err(err) => {
                log::error!("write of way {osm_id} failed: {err}");
                false
            }
        }
    }

    fn open_changeset(&self, source: &str, comment: &str) -> Result<u64, ApiError> {
        let body = xml::changeset_payload(GENERATOR, source, comment)
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        let url = format!("{}/api/0.6/changeset/create", self.api_base);
        let resp = self.put(&url, body)?;
        let text = resp.text().map_err(|e| ApiError::Network(e.to_string()))?;
        text.trim()
            .parse()
            .map_err(|_| ApiError::Parse(format!("changeset id expected, got '{}'", text.trim())))
    }
}
