use reqwest::Client;
use serde::Deserialize;

use crate::client::{DEFAULT_BASE_URL, get_text};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::Location;

/// Free-text location lookup against the provider's `find` endpoint.
#[derive(Debug, Clone)]
pub struct SearchFlow {
    http: Client,
    base_url: String,
    api_key: String,
}

impl SearchFlow {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.weather_api_key.clone())
    }

    /// Candidate locations for `query`, in provider order.
    ///
    /// Zero matches is a normal outcome and comes back as `Ok` with an
    /// empty list; `Err` always means the request or the response itself
    /// went wrong.
    pub async fn search(&self, query: &str) -> Result<Vec<Location>> {
        let url = format!("{}/find", self.base_url);

        let body = get_text(
            &self.http,
            &url,
            &[("q", query), ("type", "like"), ("APPID", self.api_key.as_str())],
        )
        .await?;

        let parsed: FindResponse =
            serde_json::from_str(&body).map_err(|e| Error::MalformedResponse(e.to_string()))?;

        Ok(parsed
            .list
            .into_iter()
            .map(|entry| Location::new(entry.name, entry.sys.country, entry.id))
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    list: Vec<FindEntry>,
}

#[derive(Debug, Deserialize)]
struct FindEntry {
    id: u64,
    name: String,
    sys: FindSys,
}

#[derive(Debug, Deserialize)]
struct FindSys {
    country: String,
}
