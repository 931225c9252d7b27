// src/registry/ebsi_client.rs
//! HTTP client for the EBSI DID registry.
//!
//! Issues `GET <registry_url>/<did>` and maps the registry's answers onto
//! the crate's error taxonomy:
//! - `200` the DID document
//! - `404` `NotFound`
//! - `400` `InvalidDid`
//! - anything else, an unparseable body, or a transport failure `ResolverError`

use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use crate::models::did::{DidDocument, DID_LD_JSON};
use crate::registry::Registry;
use log::{debug, warn};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Registry client with a bounded request timeout.
#[derive(Clone, Debug)]
pub struct EbsiRegistryClient {
    http: Client,
    registry_url: String,
}

impl EbsiRegistryClient {
    /// Creates a client for the registry described by `config`.
    ///
    /// # Errors
    /// `ResolverError` if the HTTP client cannot be built.
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            registry_url: config.registry_url.trim_end_matches('/').to_string(),
        })
    }
}

impl Registry for EbsiRegistryClient {
    async fn fetch(&self, did: &str) -> Result<DidDocument> {
        let url = format!("{}/{did}", self.registry_url);
        debug!("fetching DID document from {url}");

        let response = self
            .http
            .get(&url)
            .header(ACCEPT, DID_LD_JSON)
            .send()
            .await
            .map_err(|e| {
                warn!("registry request for {did} failed: {e}");
                Error::from(e)
            })?;

        match response.status() {
            StatusCode::OK => response.json::<DidDocument>().await.map_err(|e| {
                warn!("registry returned an unparseable document for {did}: {e}");
                Error::ResolverError(format!("unparseable DID document: {e}"))
            }),
            StatusCode::NOT_FOUND => Err(Error::NotFound(did.to_string())),
            StatusCode::BAD_REQUEST => Err(Error::InvalidDid(did.to_string())),
            status => {
                warn!("registry answered {status} for {did}");
                Err(Error::ResolverError(format!("registry answered {status}")))
            }
        }
    }
}
