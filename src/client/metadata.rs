//! Server location and client trace lookups
//!
//! These are plain requests where phase timing does not matter, so they go
//! through `reqwest`.

use crate::error::{AppError, Result};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};

/// Path listing data centres as a JSON array
pub const LOCATIONS_PATH: &str = "locations";
/// Path returning `key=value` lines describing the client
pub const TRACE_PATH: &str = "cdn-cgi/trace";

/// One entry of the locations listing; other fields are ignored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerLocation {
    pub iata: String,
    pub city: String,
}

/// Client information from the trace endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientTrace {
    /// Client IP as seen by the server
    pub ip: String,
    /// Client region code
    pub loc: String,
    /// Code of the serving data centre
    pub colo: String,
    /// Every field of the trace
    #[serde(skip)]
    pub fields: HashMap<String, String>,
}

/// Map of location code to city name
pub fn parse_locations(body: &str) -> Result<HashMap<String, String>> {
    let locations: Vec<ServerLocation> = serde_json::from_str(body)
        .map_err(|e| AppError::parse(format!("Invalid locations listing: {}", e)))?;
    Ok(locations
        .into_iter()
        .map(|location| (location.iata, location.city))
        .collect())
}

/// Parse the `key=value` trace body. `ip`, `loc` and `colo` are required.
pub fn parse_trace(body: &str) -> Result<ClientTrace> {
    let fields: HashMap<String, String> = body
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect();

    let required = |key: &str| -> Result<String> {
        fields
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::parse(format!("Trace response is missing '{}'", key)))
    };

    Ok(ClientTrace {
        ip: required("ip")?,
        loc: required("loc")?,
        colo: required("colo")?,
        fields: fields.clone(),
    })
}

/// Fetches metadata from the speed-test server
#[derive(Debug, Clone)]
pub struct MetadataClient {
    client: Client,
    base: Url,
}

impl MetadataClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut builder = Client::builder()
            .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION));
        if let Some(limit) = timeout {
            builder = builder.timeout(limit);
        }

        let client = builder
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base })
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = self.base.join(path)?;
        Ok(self.client.get(url).send().await?.error_for_status()?)
    }

    /// Map of location code to city name
    pub async fn fetch_locations(&self) -> Result<HashMap<String, String>> {
        parse_locations(&self.get(LOCATIONS_PATH).await?.text().await?)
    }

    pub async fn fetch_trace(&self) -> Result<ClientTrace> {
        parse_trace(&self.get(TRACE_PATH).await?.text().await?)
    }
}
