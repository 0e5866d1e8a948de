// Shared transport configuration for building reqwest::Client instances.
//
// The REST client and the push channel share timeout and auth settings
// through this module.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    /// Bearer token sent as `Authorization` on every request.
    pub token: Option<SecretString>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            token: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut headers = HeaderMap::new();
        if let Some(value) = self.authorization_header()? {
            headers.insert(AUTHORIZATION, value);
        }

        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("rigsync/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// `Bearer <token>` header value, marked sensitive so it never shows up in logs.
    pub fn authorization_header(&self) -> Result<Option<HeaderValue>, Error> {
        let Some(token) = &self.token else {
            return Ok(None);
        };
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|_| Error::Unauthorized)?;
        value.set_sensitive(true);
        Ok(Some(value))
    }
}
