//! JSON tree store client.
//!
//! Uses reqwest to read the station directory and profiles and to create
//! reports. Every node is addressed as `<base>/<path>.json`.

use async_trait::async_trait;
use fieldalert_core::config::RemoteConfig;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use thiserror::Error;
use tracing::{debug, instrument};

use super::types::{ProfileDocument, parse_directory};
use super::{IdentityStore, RemoteError, RemoteReportStore, StationDirectory};
use crate::report::{ReportPath, ReportSnapshot, ReporterIdentity};
use crate::routing::StationRecord;

/// Client construction errors.
#[derive(Debug, Error)]
pub enum RemoteConfigError {
    #[error("remote.base_url is not configured")]
    MissingBaseUrl,

    #[error("Invalid remote.base_url: {0}")]
    InvalidBaseUrl(String),

    #[error("Invalid auth token")]
    InvalidToken,

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// reqwest-backed implementation of every remote trait.
#[derive(Debug, Clone)]
pub struct RestRemote {
    http: reqwest::Client,
    base_url: reqwest::Url,
    station_root: String,
    profile_root: String,
}

impl RestRemote {
    /// Create a client. Transport timeouts are left at reqwest's defaults.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteConfigError> {
        let base_url = config
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(RemoteConfigError::MissingBaseUrl)?;
        let base_url = reqwest::Url::parse(base_url)
            .map_err(|e| RemoteConfigError::InvalidBaseUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteConfigError::InvalidBaseUrl(base_url.into()));
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = config.auth_token.as_deref().filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| RemoteConfigError::InvalidToken)?;
            headers.insert(AUTHORIZATION, value);
        }

        // reqwest is built with rustls-no-provider; an `Err` here only means a
        // provider is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            base_url,
            station_root: config.station_root.trim_matches('/').to_string(),
            profile_root: config.profile_root.trim_matches('/').to_string(),
        })
    }

    pub fn station_root(&self) -> &str {
        &self.station_root
    }

    /// URL of the node at `root` followed by `ids`. Each id is
    /// percent-encoded as a single path segment.
    pub(crate) fn node_url(&self, root: &str, ids: &[&str]) -> String {
        let mut segments: Vec<&str> = root.split('/').filter(|s| !s.is_empty()).collect();
        segments.extend_from_slice(ids);

        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            if let Some((leaf, parents)) = segments.split_last() {
                path.extend(parents);
                path.push(&format!("{leaf}.json"));
            }
        }
        url.into()
    }

    fn check_status(resp: &reqwest::Response) -> Result<(), RemoteError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteReportStore for RestRemote {
    #[instrument(skip(self, snapshot), fields(path = %path))]
    async fn create_report(
        &self,
        path: &ReportPath,
        snapshot: &ReportSnapshot,
    ) -> Result<String, RemoteError> {
        let url = self.node_url(
            &path.station_root,
            &[
                &path.station_id,
                "AllReport",
                path.category.as_str(),
                &path.push_id,
            ],
        );
        let resp = self.http.put(&url).json(snapshot).send().await?;
        Self::check_status(&resp)?;
        debug!(push_id = %path.push_id, "Report created");
        Ok(path.push_id.clone())
    }
}

#[async_trait]
impl StationDirectory for RestRemote {
    async fn fetch_stations(&self) -> Result<Vec<StationRecord>, RemoteError> {
        let url = self.node_url(&self.station_root, &[]);
        let resp = self.http.get(&url).send().await?;
        Self::check_status(&resp)?;
        let tree: serde_json::Value = resp.json().await?;
        let stations = parse_directory(tree).map_err(|e| RemoteError::Decode(e.to_string()))?;
        debug!(count = stations.len(), "Station directory fetched");
        Ok(stations)
    }
}

#[async_trait]
impl IdentityStore for RestRemote {
    async fn fetch_profile(&self, user_id: &str) -> Result<ReporterIdentity, RemoteError> {
        let url = self.node_url(&self.profile_root, &[user_id]);
        let resp = self.http.get(&url).send().await?;
        Self::check_status(&resp)?;
        let value: serde_json::Value = resp.json().await?;
        if value.is_null() {
            return Err(RemoteError::NotFound(format!("Profile {user_id}")));
        }
        let doc: ProfileDocument =
            serde_json::from_value(value).map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(doc.into_identity(user_id))
    }
}
