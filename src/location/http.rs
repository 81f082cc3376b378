//! Remote taskfile locations fetched over HTTP(S).

use super::{Location, LocationOpts, is_remote_reference};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// A taskfile served over HTTP(S).
///
/// Plain `http://` URLs are rejected at construction unless the insecure
/// option is set; `insecure` also disables TLS certificate verification.
#[derive(Debug, Clone)]
pub struct HttpLocation {
    url: Url,
    identity: String,
    client: reqwest::Client,
}

impl HttpLocation {
    pub fn new(entrypoint: &str, opts: &LocationOpts) -> Result<Self> {
        let url = Url::parse(entrypoint).map_err(|err| Error::Location {
            uri: entrypoint.to_string(),
            reason: err.to_string(),
        })?;

        if url.scheme() == "http" && !opts.insecure {
            return Err(Error::Location {
                uri: entrypoint.to_string(),
                reason: "refusing to fetch over unverified http; enable insecure connections to allow it".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(opts.insecure)
            .build()
            .map_err(|err| Error::Network {
                uri: entrypoint.to_string(),
                reason: err.to_string(),
            })?;

        let identity = url.to_string();
        Ok(Self {
            url,
            identity,
            client,
        })
    }
}

#[async_trait]
impl Location for HttpLocation {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn is_remote(&self) -> bool {
        true
    }

    async fn read(&self, timeout: Duration) -> Result<Vec<u8>> {
        let map_err = |err: reqwest::Error| {
            if err.is_timeout() {
                Error::NetworkTimeout {
                    uri: self.identity.clone(),
                    timeout,
                    checked_cache: false,
                }
            } else {
                Error::Network {
                    uri: self.identity.clone(),
                    reason: err.to_string(),
                }
            }
        };

        let response = self
            .client
            .get(self.url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(map_err)?
            .error_for_status()
            .map_err(map_err)?;

        let bytes = response.bytes().await.map_err(map_err)?;
        Ok(bytes.to_vec())
    }

    fn resolve_entrypoint(&self, reference: &str) -> Result<String> {
        if is_remote_reference(reference) {
            return Ok(reference.to_string());
        }
        // Relative references resolve against this document's URL.
        let joined = self.url.join(reference).map_err(|err| Error::Location {
            uri: reference.to_string(),
            reason: err.to_string(),
        })?;
        Ok(joined.to_string())
    }

    fn resolve_dir(&self, reference: &str) -> Result<String> {
        // Remote taskfiles execute out of a local directory; resolve it
        // against the current working directory.
        let cwd = std::env::current_dir()?;
        if reference.is_empty() {
            return Ok(cwd.to_string_lossy().into_owned());
        }
        let path = Path::new(reference);
        if path.is_absolute() {
            Ok(reference.to_string())
        } else {
            Ok(cwd.join(path).to_string_lossy().into_owned())
        }
    }
}
